//! # Staff roles
//!
//! The named roles a user can hold within a hospital. Role defaults are the
//! lowest-precedence grant source; hospital and user overrides layer on top.

use serde::{Deserialize, Serialize};

use crate::actions::Action;
use crate::grants::FieldPermissions;

/// Staff role within a hospital.
///
/// `SuperAdmin` is special: it never appears in any grant row and the
/// resolution engine short-circuits it to full access before any store read.
/// Write operations against the grant stores must reject it.
///
/// # Examples
///
/// ```
/// use hms_rbac::StaffRole;
///
/// let role = StaffRole::Doctor;
/// assert_eq!(role.as_str(), "DOCTOR");
/// assert!(!role.is_super_admin());
/// assert!(StaffRole::SuperAdmin.is_super_admin());
/// ```
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StaffRole {
    /// Platform operator; unconditional bypass, never stored in grants.
    SuperAdmin,

    /// Manages one hospital (staff, configuration, billing).
    HospitalManager,

    /// Medical doctor.
    Doctor,

    /// Nursing staff.
    Nurse,

    /// Front-desk staff (appointments, patient intake).
    Receptionist,

    /// Billing and invoicing staff.
    Accountant,
}

impl StaffRole {
    /// Parse role from string representation.
    ///
    /// # Arguments
    ///
    /// * `s` - String to parse (case-insensitive)
    ///
    /// # Returns
    ///
    /// `Some(StaffRole)` if valid, `None` otherwise
    ///
    /// # Examples
    ///
    /// ```
    /// use hms_rbac::StaffRole;
    ///
    /// assert_eq!(StaffRole::parse("DOCTOR"), Some(StaffRole::Doctor));
    /// assert_eq!(StaffRole::parse("hospital_manager"), Some(StaffRole::HospitalManager));
    /// assert_eq!(StaffRole::parse("invalid"), None);
    /// ```
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "SUPER_ADMIN" | "SUPERADMIN" => Some(Self::SuperAdmin),
            "HOSPITAL_MANAGER" => Some(Self::HospitalManager),
            "DOCTOR" => Some(Self::Doctor),
            "NURSE" => Some(Self::Nurse),
            "RECEPTIONIST" => Some(Self::Receptionist),
            "ACCOUNTANT" => Some(Self::Accountant),
            _ => None,
        }
    }

    /// Get string representation of the role (wire/storage form).
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SuperAdmin => "SUPER_ADMIN",
            Self::HospitalManager => "HOSPITAL_MANAGER",
            Self::Doctor => "DOCTOR",
            Self::Nurse => "NURSE",
            Self::Receptionist => "RECEPTIONIST",
            Self::Accountant => "ACCOUNTANT",
        }
    }

    /// Get a human-readable display name for the role.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::SuperAdmin => "Super Admin",
            Self::HospitalManager => "Hospital Manager",
            Self::Doctor => "Doctor",
            Self::Nurse => "Nurse",
            Self::Receptionist => "Receptionist",
            Self::Accountant => "Accountant",
        }
    }

    /// Check if this is the super-admin bypass role.
    pub fn is_super_admin(&self) -> bool {
        matches!(self, Self::SuperAdmin)
    }

    /// Roles that can hold stored grants (everything except `SuperAdmin`).
    pub fn grantable() -> Vec<Self> {
        vec![
            Self::HospitalManager,
            Self::Doctor,
            Self::Nurse,
            Self::Receptionist,
            Self::Accountant,
        ]
    }
}

impl std::fmt::Display for StaffRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity context handed to the resolution engine for one request.
///
/// The authorization guard builds this from the authenticated session:
/// the user ID, the hospital they are currently acting in (if any), the role
/// their membership in that hospital carries, and the super-admin flag.
///
/// # Examples
///
/// ```
/// use uuid::Uuid;
/// use hms_rbac::{AccessIdentity, StaffRole};
///
/// let identity = AccessIdentity::new(Uuid::now_v7())
///     .with_hospital(Uuid::now_v7())
///     .with_role(StaffRole::Doctor);
/// assert!(!identity.is_super_admin);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessIdentity {
    /// User ID.
    pub user_id: uuid::Uuid,

    /// Hospital the user is currently acting in, if any.
    pub hospital_id: Option<uuid::Uuid>,

    /// Role from the active hospital membership. `None` means the user has
    /// no active membership and resolves to an empty permission set.
    pub role: Option<StaffRole>,

    /// Unconditional bypass flag.
    pub is_super_admin: bool,
}

impl AccessIdentity {
    /// Creates an identity with no hospital context and no role.
    pub fn new(user_id: uuid::Uuid) -> Self {
        Self {
            user_id,
            hospital_id: None,
            role: None,
            is_super_admin: false,
        }
    }

    /// Set the active hospital.
    pub fn with_hospital(mut self, hospital_id: uuid::Uuid) -> Self {
        self.hospital_id = Some(hospital_id);
        self
    }

    /// Set the membership role.
    pub fn with_role(mut self, role: StaffRole) -> Self {
        self.role = Some(role);
        self.is_super_admin = role.is_super_admin();
        self
    }

    /// Mark this identity as super admin.
    pub fn super_admin(mut self) -> Self {
        self.is_super_admin = true;
        self
    }
}

/// The full-access grant payload handed out for super admins.
pub(crate) fn super_admin_payload() -> (std::collections::HashSet<Action>, FieldPermissions) {
    (Action::all().into_iter().collect(), FieldPermissions::all())
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_role_parse() {
        assert_eq!(StaffRole::parse("DOCTOR"), Some(StaffRole::Doctor));
        assert_eq!(
            StaffRole::parse("hospital_manager"),
            Some(StaffRole::HospitalManager)
        );
        assert_eq!(StaffRole::parse("SUPER_ADMIN"), Some(StaffRole::SuperAdmin));
        assert_eq!(StaffRole::parse("invalid"), None);
    }

    #[test]
    fn test_role_round_trip() {
        for role in StaffRole::grantable() {
            assert_eq!(StaffRole::parse(role.as_str()), Some(role));
        }
    }

    #[test]
    fn test_grantable_excludes_super_admin() {
        assert!(!StaffRole::grantable().contains(&StaffRole::SuperAdmin));
    }

    #[test]
    fn test_identity_builder() {
        let user_id = Uuid::now_v7();
        let hospital_id = Uuid::now_v7();

        let identity = AccessIdentity::new(user_id)
            .with_hospital(hospital_id)
            .with_role(StaffRole::Nurse);

        assert_eq!(identity.user_id, user_id);
        assert_eq!(identity.hospital_id, Some(hospital_id));
        assert_eq!(identity.role, Some(StaffRole::Nurse));
        assert!(!identity.is_super_admin);
    }

    #[test]
    fn test_super_admin_role_sets_flag() {
        let identity = AccessIdentity::new(Uuid::now_v7()).with_role(StaffRole::SuperAdmin);
        assert!(identity.is_super_admin);
    }
}
