//! # HMS Access
//!
//! Permission stores, cache layer and check API for the HMS platform.
//!
//! ## Overview
//!
//! This crate wraps the pure resolution engine from `hms-rbac` with
//! everything a running service needs:
//! - **Stores**: keyed read/write traits over the grant tables, with
//!   in-memory implementations for tests and single-process deployments
//! - **Cache**: injected TTL cache with coarse, fragment-based invalidation
//! - **Service**: `check_permission` / `get_user_permissions` for the
//!   authorization guard, plus the admin grant-write operations
//!
//! ## Read and write paths
//!
//! ```text
//! read:  guard -> AccessService -> cache lookup -> (miss) resolve -> cache -> decision
//! write: admin -> AccessService -> store upsert -> synchronous invalidation
//! ```
//!
//! Denial is a normal return value, never an error; the service errs only on
//! infrastructure failure, which the guard treats as fail-closed.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use hms_access::cache::MemoryCache;
//! use hms_access::service::AccessService;
//! use hms_access::store::{
//!     MemoryHospitalOverrideStore, MemoryResourceStore, MemoryRolePermissionStore,
//!     MemoryUserOverrideStore,
//! };
//!
//! let service = AccessService::new(
//!     Arc::new(MemoryResourceStore::new()),
//!     Arc::new(MemoryRolePermissionStore::new()),
//!     Arc::new(MemoryHospitalOverrideStore::new()),
//!     Arc::new(MemoryUserOverrideStore::new()),
//!     Arc::new(MemoryCache::new()),
//! );
//! ```

pub mod cache;
pub mod error;
pub mod service;
pub mod store;

// Re-export main types for convenience
pub use cache::{MemoryCache, NoopCache, PermissionCache, DEFAULT_TTL};
pub use error::{AccessError, AccessResult};
pub use service::{AccessDecision, AccessService, BulkOutcome, CatalogTree, DenyReason};
pub use store::{
    HospitalOverrideStore, MemoryHospitalOverrideStore, MemoryResourceStore,
    MemoryRolePermissionStore, MemoryUserOverrideStore, ResourceStore, RolePermissionStore,
    UserOverrideStore,
};
