//! # HMS RBAC (Role-Based Access Control)
//!
//! This crate provides the pure permission-resolution core for the HMS
//! hospital-management platform, shared by the authorization guard and the
//! admin UI backend.
//!
//! ## Overview
//!
//! The hms-rbac crate handles:
//! - **Catalog**: the hierarchy of protected resources, their actions and fields
//! - **Actions**: the fixed `{view, add, edit, delete}` operation set
//! - **Grants**: role defaults, hospital overrides and user overrides
//! - **Resolution**: merging the three grant sources into an effective set
//! - **Cascade**: tri-state tree aggregation and parent-to-descendant edits
//!
//! ## Architecture
//!
//! ```text
//! ResolvedPermission = select(UserOverride > HospitalOverride > RoleDefault)
//!                      minus UserOverride.denied_actions
//!
//! Examples:
//!   "hospital.patients" + {view, edit}       - patient pages, no delete
//!   "hospital.patients.detail" + fields      - per-column view/edit gating
//! ```
//!
//! Source selection is all-or-nothing per resource: the winning source
//! replaces both the action set and the field permissions; sources are never
//! unioned. The one cross-source rule is the user-level deny list, which is
//! subtracted from whichever source wins.
//!
//! ## Usage
//!
//! ```rust
//! use std::collections::HashSet;
//! use hms_rbac::{resolve_permissions, AccessIdentity, Action, StaffRole};
//! use hms_rbac::catalog::{Catalog, Resource, ResourceCategory};
//! use hms_rbac::grants::RolePermission;
//!
//! let patients = Resource::new("hospital.patients", "Patients", ResourceCategory::Hospital);
//! let resource_id = patients.id;
//! let catalog = Catalog::from_resources(vec![patients]);
//!
//! let defaults = vec![RolePermission::new(
//!     StaffRole::Doctor,
//!     resource_id,
//!     HashSet::from([Action::View]),
//! )];
//!
//! let identity = AccessIdentity::new(uuid::Uuid::now_v7()).with_role(StaffRole::Doctor);
//! let resolved = resolve_permissions(&catalog, &identity, &defaults, &[], &[]);
//! assert!(resolved[0].allows(Action::View));
//! ```
//!
//! ## Integration with hms-access
//!
//! This crate performs no I/O. The `hms-access` crate loads catalog and
//! grant rows from its stores, feeds them through [`resolve_permissions`],
//! and caches the output with synchronous invalidation on every grant write.

pub mod actions;
pub mod cascade;
pub mod catalog;
pub mod grants;
pub mod resolver;
pub mod roles;

// Re-export main types for convenience
pub use actions::Action;
pub use cascade::{cascade_toggle, compute_check_state, CascadeWrite, CheckState};
pub use catalog::{Catalog, ElementType, Resource, ResourceCategory, ResourceField, ResourceNode};
pub use grants::{
    FieldPermissions, GrantSource, HospitalOverride, ResolvedPermission, RolePermission,
    UserOverride, FIELD_WILDCARD,
};
pub use resolver::resolve_permissions;
pub use roles::{AccessIdentity, StaffRole};
