//! # Grants
//!
//! The three grant row shapes (role defaults, hospital overrides, user
//! overrides), the shared field-permission payload, and the tagged
//! `GrantSource` the resolver selects between.
//!
//! Every write is a full-row upsert; callers read-modify-write. Role defaults
//! are only ever replaced, never deleted; overrides may be deleted, which
//! makes resolution fall through to the next-lower-precedence source.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

use crate::actions::Action;
use crate::roles::StaffRole;

/// The wildcard field code meaning "all fields of this resource".
pub const FIELD_WILDCARD: &str = "*";

/// Field-level view/edit gating for one resource grant.
///
/// Either list may contain [`FIELD_WILDCARD`].
///
/// # Examples
///
/// ```
/// use hms_rbac::grants::FieldPermissions;
///
/// let fields = FieldPermissions::all();
/// assert!(fields.allows_view("diagnosis"));
/// assert!(fields.allows_edit("diagnosis"));
///
/// let none = FieldPermissions::none();
/// assert!(!none.allows_view("diagnosis"));
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct FieldPermissions {
    /// Field codes visible to the grantee.
    #[serde(default)]
    pub viewable: HashSet<String>,
    /// Field codes the grantee may edit.
    #[serde(default)]
    pub editable: HashSet<String>,
}

impl FieldPermissions {
    /// No fields visible or editable.
    pub fn none() -> Self {
        Self::default()
    }

    /// All fields visible and editable (wildcard in both lists).
    pub fn all() -> Self {
        Self {
            viewable: HashSet::from([FIELD_WILDCARD.to_string()]),
            editable: HashSet::from([FIELD_WILDCARD.to_string()]),
        }
    }

    /// Build from explicit field code lists.
    pub fn new<I, J>(viewable: I, editable: J) -> Self
    where
        I: IntoIterator<Item = String>,
        J: IntoIterator<Item = String>,
    {
        Self {
            viewable: viewable.into_iter().collect(),
            editable: editable.into_iter().collect(),
        }
    }

    /// Check if a field may be viewed.
    pub fn allows_view(&self, field_code: &str) -> bool {
        self.viewable.contains(FIELD_WILDCARD) || self.viewable.contains(field_code)
    }

    /// Check if a field may be edited.
    pub fn allows_edit(&self, field_code: &str) -> bool {
        self.editable.contains(FIELD_WILDCARD) || self.editable.contains(field_code)
    }

    /// Check whether a field is accessible for a given action.
    ///
    /// `View` consults the viewable list; every write action consults the
    /// editable list.
    pub fn allows(&self, action: Action, field_code: &str) -> bool {
        if action.is_write() {
            self.allows_edit(field_code)
        } else {
            self.allows_view(field_code)
        }
    }
}

/// Default grant for a role on one resource.
///
/// Unique per `(role, resource_id)`. The lowest-precedence source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RolePermission {
    /// The role this default applies to. Never `SuperAdmin`.
    pub role: StaffRole,

    /// The resource this grant covers.
    pub resource_id: Uuid,

    /// Actions granted on the resource.
    pub allowed_actions: HashSet<Action>,

    /// Field-level gating.
    #[serde(default)]
    pub field_permissions: FieldPermissions,

    /// Last write timestamp (last-writer-wins upserts).
    pub updated_at: DateTime<Utc>,
}

impl RolePermission {
    /// Creates a role default with the given actions and wildcard fields.
    pub fn new(role: StaffRole, resource_id: Uuid, allowed_actions: HashSet<Action>) -> Self {
        Self {
            role,
            resource_id,
            allowed_actions,
            field_permissions: FieldPermissions::all(),
            updated_at: Utc::now(),
        }
    }

    /// Set field-level gating.
    pub fn with_fields(mut self, field_permissions: FieldPermissions) -> Self {
        self.field_permissions = field_permissions;
        self
    }
}

/// Per-hospital override of a role default.
///
/// Unique per `(hospital_id, role, resource_id)`. Fully replaces the role
/// default for that resource when present.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HospitalOverride {
    /// Hospital the override is scoped to.
    pub hospital_id: Uuid,

    /// The role this override applies to. Never `SuperAdmin`.
    pub role: StaffRole,

    /// The resource this grant covers.
    pub resource_id: Uuid,

    /// Actions granted on the resource.
    pub allowed_actions: HashSet<Action>,

    /// Field-level gating.
    #[serde(default)]
    pub field_permissions: FieldPermissions,

    /// Last write timestamp.
    pub updated_at: DateTime<Utc>,
}

impl HospitalOverride {
    /// Creates a hospital override with the given actions.
    pub fn new(
        hospital_id: Uuid,
        role: StaffRole,
        resource_id: Uuid,
        allowed_actions: HashSet<Action>,
    ) -> Self {
        Self {
            hospital_id,
            role,
            resource_id,
            allowed_actions,
            field_permissions: FieldPermissions::all(),
            updated_at: Utc::now(),
        }
    }

    /// Set field-level gating.
    pub fn with_fields(mut self, field_permissions: FieldPermissions) -> Self {
        self.field_permissions = field_permissions;
        self
    }
}

/// Per-user override, optionally hospital-scoped.
///
/// Unique per `(user_id, resource_id, hospital_id)`. `hospital_id = None`
/// applies regardless of hospital context. The highest-precedence source,
/// and the only one carrying explicit denies: `denied_actions` is subtracted
/// from whatever source wins, even when this row's own `allowed_actions`
/// was not selected.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserOverride {
    /// User the override applies to.
    pub user_id: Uuid,

    /// The resource this grant covers.
    pub resource_id: Uuid,

    /// Hospital scope; `None` applies in any hospital context.
    pub hospital_id: Option<Uuid>,

    /// Actions granted on the resource.
    pub allowed_actions: HashSet<Action>,

    /// Actions explicitly denied; wins over any allow from any source.
    #[serde(default)]
    pub denied_actions: HashSet<Action>,

    /// Field-level gating.
    #[serde(default)]
    pub field_permissions: FieldPermissions,

    /// Last write timestamp.
    pub updated_at: DateTime<Utc>,
}

impl UserOverride {
    /// Creates a globally-scoped user override with the given actions.
    pub fn new(user_id: Uuid, resource_id: Uuid, allowed_actions: HashSet<Action>) -> Self {
        Self {
            user_id,
            resource_id,
            hospital_id: None,
            allowed_actions,
            denied_actions: HashSet::new(),
            field_permissions: FieldPermissions::all(),
            updated_at: Utc::now(),
        }
    }

    /// Scope the override to one hospital.
    pub fn scoped_to(mut self, hospital_id: Uuid) -> Self {
        self.hospital_id = Some(hospital_id);
        self
    }

    /// Set explicit denies.
    pub fn with_denied(mut self, denied_actions: HashSet<Action>) -> Self {
        self.denied_actions = denied_actions;
        self
    }

    /// Set field-level gating.
    pub fn with_fields(mut self, field_permissions: FieldPermissions) -> Self {
        self.field_permissions = field_permissions;
        self
    }
}

/// The grant source selected for one resource during resolution.
///
/// Selection is all-or-nothing: whichever variant wins contributes both its
/// action set and its field permissions; sources are never unioned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GrantSource {
    /// Role default selected (no override present).
    RoleDefault {
        /// Actions from the role default.
        allowed_actions: HashSet<Action>,
        /// Fields from the role default.
        field_permissions: FieldPermissions,
    },
    /// Hospital override selected.
    Hospital {
        /// Actions from the hospital override.
        allowed_actions: HashSet<Action>,
        /// Fields from the hospital override.
        field_permissions: FieldPermissions,
    },
    /// User override selected.
    User {
        /// Actions from the user override.
        allowed_actions: HashSet<Action>,
        /// Fields from the user override.
        field_permissions: FieldPermissions,
    },
}

impl GrantSource {
    /// The selected `{allowed_actions, field_permissions}` payload.
    pub fn payload(&self) -> (&HashSet<Action>, &FieldPermissions) {
        match self {
            GrantSource::RoleDefault {
                allowed_actions,
                field_permissions,
            }
            | GrantSource::Hospital {
                allowed_actions,
                field_permissions,
            }
            | GrantSource::User {
                allowed_actions,
                field_permissions,
            } => (allowed_actions, field_permissions),
        }
    }
}

/// The effective permission for one user/hospital/resource triple.
///
/// Derived, never persisted; cached as JSON by the access layer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResolvedPermission {
    /// Resource code the permission applies to.
    pub resource_code: String,

    /// Effective actions after precedence and deny subtraction.
    pub allowed_actions: HashSet<Action>,

    /// Effective field gating from the selected source.
    pub field_permissions: FieldPermissions,
}

impl ResolvedPermission {
    /// Check if an action is allowed.
    pub fn allows(&self, action: Action) -> bool {
        self.allowed_actions.contains(&action)
    }

    /// Check if a field is accessible for an action.
    pub fn allows_field(&self, action: Action, field_code: &str) -> bool {
        self.field_permissions.allows(action, field_code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_wildcard() {
        let fields = FieldPermissions::all();
        assert!(fields.allows_view("anything"));
        assert!(fields.allows_edit("anything"));
    }

    #[test]
    fn test_field_literal_match() {
        let fields = FieldPermissions::new(
            ["diagnosis".to_string(), "name".to_string()],
            ["name".to_string()],
        );
        assert!(fields.allows_view("diagnosis"));
        assert!(!fields.allows_edit("diagnosis"));
        assert!(fields.allows_edit("name"));
        assert!(!fields.allows_view("insurance_number"));
    }

    #[test]
    fn test_field_check_by_action() {
        let fields = FieldPermissions::new(["diagnosis".to_string()], []);
        assert!(fields.allows(Action::View, "diagnosis"));
        assert!(!fields.allows(Action::Edit, "diagnosis"));
        assert!(!fields.allows(Action::Delete, "diagnosis"));
    }

    #[test]
    fn test_grant_source_payload() {
        let actions: HashSet<Action> = [Action::View].into_iter().collect();
        let source = GrantSource::Hospital {
            allowed_actions: actions.clone(),
            field_permissions: FieldPermissions::all(),
        };
        let (selected, fields) = source.payload();
        assert_eq!(selected, &actions);
        assert!(fields.allows_view("x"));
    }

    #[test]
    fn test_resolved_permission_checks() {
        let resolved = ResolvedPermission {
            resource_code: "hospital.patients".into(),
            allowed_actions: [Action::View, Action::Edit].into_iter().collect(),
            field_permissions: FieldPermissions::new(
                [FIELD_WILDCARD.to_string()],
                ["name".to_string()],
            ),
        };
        assert!(resolved.allows(Action::View));
        assert!(!resolved.allows(Action::Delete));
        assert!(resolved.allows_field(Action::View, "diagnosis"));
        assert!(!resolved.allows_field(Action::Edit, "diagnosis"));
        assert!(resolved.allows_field(Action::Edit, "name"));
    }

    #[test]
    fn test_user_override_builder() {
        let user_id = Uuid::now_v7();
        let resource_id = Uuid::now_v7();
        let hospital_id = Uuid::now_v7();

        let uo = UserOverride::new(user_id, resource_id, [Action::View].into_iter().collect())
            .scoped_to(hospital_id)
            .with_denied([Action::Delete].into_iter().collect());

        assert_eq!(uo.hospital_id, Some(hospital_id));
        assert!(uo.denied_actions.contains(&Action::Delete));
    }
}
