//! # Resolution engine
//!
//! The pure function that merges role defaults, hospital overrides and user
//! overrides into the effective permission set for one identity in one
//! hospital context.
//!
//! Precedence is user > hospital > role, selected all-or-nothing per
//! resource: the winning source contributes both its action set and its
//! field permissions; sources are never unioned. The one cross-source rule
//! is the user-level deny list, which is subtracted from the winning action
//! set even when the user override itself was not selected.
//!
//! This module performs no I/O; the access layer feeds it catalog and grant
//! rows and caches its output.

use std::collections::HashMap;
use uuid::Uuid;

use crate::catalog::{Catalog, ResourceCategory};
use crate::grants::{GrantSource, HospitalOverride, ResolvedPermission, RolePermission, UserOverride};
use crate::roles::{super_admin_payload, AccessIdentity};

/// Resolve the effective permission set for one identity.
///
/// # Arguments
///
/// * `catalog` - Active resource catalog
/// * `identity` - User, hospital context, role and super-admin flag
/// * `role_defaults` - Role default rows (any role; filtered internally)
/// * `hospital_overrides` - Hospital override rows (filtered internally)
/// * `user_overrides` - User override rows (filtered internally)
///
/// # Returns
///
/// One [`ResolvedPermission`] per resource the identity can act on.
/// Resources resolving to an empty action set are omitted; absence is not
/// an error.
///
/// Super admins resolve to every active resource (both categories) with all
/// actions and wildcard fields, without consulting any grant rows. An
/// identity with no role resolves to the empty set.
pub fn resolve_permissions(
    catalog: &Catalog,
    identity: &AccessIdentity,
    role_defaults: &[RolePermission],
    hospital_overrides: &[HospitalOverride],
    user_overrides: &[UserOverride],
) -> Vec<ResolvedPermission> {
    // Unconditional bypass, before any grant row is consulted. A missing
    // role mapping must never deny a super admin.
    if identity.is_super_admin {
        return catalog
            .active()
            .iter()
            .map(|resource| {
                let (allowed_actions, field_permissions) = super_admin_payload();
                ResolvedPermission {
                    resource_code: resource.code.clone(),
                    allowed_actions,
                    field_permissions,
                }
            })
            .collect();
    }

    // No active membership: the safe default is no grants, never all grants.
    let role = match identity.role {
        Some(role) => role,
        None => return Vec::new(),
    };

    let defaults: HashMap<Uuid, &RolePermission> = role_defaults
        .iter()
        .filter(|rp| rp.role == role)
        .map(|rp| (rp.resource_id, rp))
        .collect();

    let overrides: HashMap<Uuid, &HospitalOverride> = match identity.hospital_id {
        Some(hospital_id) => hospital_overrides
            .iter()
            .filter(|ho| ho.hospital_id == hospital_id && ho.role == role)
            .map(|ho| (ho.resource_id, ho))
            .collect(),
        None => HashMap::new(),
    };

    let user_rows: HashMap<Uuid, &UserOverride> =
        effective_user_overrides(identity, user_overrides);

    let mut resolved = Vec::new();
    for resource in catalog.active() {
        // Admin-category resources are reserved for super admins.
        if resource.category == ResourceCategory::Admin {
            continue;
        }

        let user_override = user_rows.get(&resource.id).copied();

        let source = select_source(
            defaults.get(&resource.id).copied(),
            overrides.get(&resource.id).copied(),
            user_override,
        );
        let Some(source) = source else { continue };

        let (allowed, fields) = source.payload();
        let mut allowed_actions = allowed.clone();

        // User-level denies apply on top of whichever source won.
        if let Some(uo) = user_override {
            for denied in &uo.denied_actions {
                allowed_actions.remove(denied);
            }
        }

        if allowed_actions.is_empty() {
            continue;
        }

        resolved.push(ResolvedPermission {
            resource_code: resource.code.clone(),
            allowed_actions,
            field_permissions: fields.clone(),
        });
    }

    resolved
}

/// Pick the user override row applicable per resource.
///
/// A row scoped to the identity's exact hospital wins over a global
/// (`hospital_id = None`) row for the same resource. With no hospital
/// context, only global rows apply.
fn effective_user_overrides<'a>(
    identity: &AccessIdentity,
    user_overrides: &'a [UserOverride],
) -> HashMap<Uuid, &'a UserOverride> {
    let mut rows: HashMap<Uuid, &UserOverride> = HashMap::new();
    for uo in user_overrides.iter().filter(|uo| uo.user_id == identity.user_id) {
        match uo.hospital_id {
            None => {
                rows.entry(uo.resource_id).or_insert(uo);
            }
            Some(hospital_id) if Some(hospital_id) == identity.hospital_id => {
                rows.insert(uo.resource_id, uo);
            }
            Some(_) => {}
        }
    }
    rows
}

/// All-or-nothing source selection: user > hospital > role.
///
/// A user override row existing at all makes it the source, regardless of
/// what it contains.
fn select_source(
    role_default: Option<&RolePermission>,
    hospital_override: Option<&HospitalOverride>,
    user_override: Option<&UserOverride>,
) -> Option<GrantSource> {
    if let Some(uo) = user_override {
        return Some(GrantSource::User {
            allowed_actions: uo.allowed_actions.clone(),
            field_permissions: uo.field_permissions.clone(),
        });
    }
    if let Some(ho) = hospital_override {
        return Some(GrantSource::Hospital {
            allowed_actions: ho.allowed_actions.clone(),
            field_permissions: ho.field_permissions.clone(),
        });
    }
    role_default.map(|rp| GrantSource::RoleDefault {
        allowed_actions: rp.allowed_actions.clone(),
        field_permissions: rp.field_permissions.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::Action;
    use crate::catalog::{Resource, ResourceCategory};
    use crate::grants::FieldPermissions;
    use crate::roles::StaffRole;
    use std::collections::HashSet;

    fn actions(list: &[Action]) -> HashSet<Action> {
        list.iter().copied().collect()
    }

    fn catalog_with(resources: Vec<Resource>) -> Catalog {
        Catalog::from_resources(resources)
    }

    fn find<'a>(resolved: &'a [ResolvedPermission], code: &str) -> Option<&'a ResolvedPermission> {
        resolved.iter().find(|p| p.resource_code == code)
    }

    #[test]
    fn test_role_default_passthrough() {
        let patients = Resource::new("hospital.patients", "Patients", ResourceCategory::Hospital);
        let resource_id = patients.id;
        let catalog = catalog_with(vec![patients]);

        let identity = AccessIdentity::new(Uuid::now_v7())
            .with_hospital(Uuid::now_v7())
            .with_role(StaffRole::Doctor);

        let defaults = vec![RolePermission::new(
            StaffRole::Doctor,
            resource_id,
            actions(&[Action::View, Action::Edit]),
        )];

        let resolved = resolve_permissions(&catalog, &identity, &defaults, &[], &[]);
        let grant = find(&resolved, "hospital.patients").unwrap();
        assert_eq!(grant.allowed_actions, actions(&[Action::View, Action::Edit]));
    }

    #[test]
    fn test_hospital_override_full_replacement() {
        let patients = Resource::new("hospital.patients", "Patients", ResourceCategory::Hospital);
        let resource_id = patients.id;
        let catalog = catalog_with(vec![patients]);

        let hospital_id = Uuid::now_v7();
        let identity = AccessIdentity::new(Uuid::now_v7())
            .with_hospital(hospital_id)
            .with_role(StaffRole::Doctor);

        let defaults = vec![RolePermission::new(
            StaffRole::Doctor,
            resource_id,
            actions(&[Action::View, Action::Edit, Action::Delete]),
        )];
        let overrides = vec![HospitalOverride::new(
            hospital_id,
            StaffRole::Doctor,
            resource_id,
            actions(&[Action::View]),
        )
        .with_fields(FieldPermissions::new(["name".to_string()], []))];

        let resolved = resolve_permissions(&catalog, &identity, &defaults, &overrides, &[]);
        let grant = find(&resolved, "hospital.patients").unwrap();

        // Replacement, not union: the default's edit/delete do not survive,
        // and the override's field gating replaces the default's wildcard.
        assert_eq!(grant.allowed_actions, actions(&[Action::View]));
        assert!(grant.field_permissions.allows_view("name"));
        assert!(!grant.field_permissions.allows_view("diagnosis"));
    }

    #[test]
    fn test_other_hospitals_override_ignored() {
        let patients = Resource::new("hospital.patients", "Patients", ResourceCategory::Hospital);
        let resource_id = patients.id;
        let catalog = catalog_with(vec![patients]);

        let identity = AccessIdentity::new(Uuid::now_v7())
            .with_hospital(Uuid::now_v7())
            .with_role(StaffRole::Doctor);

        let defaults = vec![RolePermission::new(
            StaffRole::Doctor,
            resource_id,
            actions(&[Action::View]),
        )];
        let overrides = vec![HospitalOverride::new(
            Uuid::now_v7(), // different hospital
            StaffRole::Doctor,
            resource_id,
            actions(&[Action::View, Action::Delete]),
        )];

        let resolved = resolve_permissions(&catalog, &identity, &defaults, &overrides, &[]);
        let grant = find(&resolved, "hospital.patients").unwrap();
        assert_eq!(grant.allowed_actions, actions(&[Action::View]));
    }

    #[test]
    fn test_user_override_wins_over_hospital_and_role() {
        let patients = Resource::new("hospital.patients", "Patients", ResourceCategory::Hospital);
        let resource_id = patients.id;
        let catalog = catalog_with(vec![patients]);

        let hospital_id = Uuid::now_v7();
        let user_id = Uuid::now_v7();
        let identity = AccessIdentity::new(user_id)
            .with_hospital(hospital_id)
            .with_role(StaffRole::Doctor);

        let defaults = vec![RolePermission::new(
            StaffRole::Doctor,
            resource_id,
            actions(&[Action::View]),
        )];
        let overrides = vec![HospitalOverride::new(
            hospital_id,
            StaffRole::Doctor,
            resource_id,
            actions(&[Action::View, Action::Edit]),
        )];
        let user_overrides = vec![UserOverride::new(
            user_id,
            resource_id,
            actions(&[Action::View, Action::Add]),
        )];

        let resolved =
            resolve_permissions(&catalog, &identity, &defaults, &overrides, &user_overrides);
        let grant = find(&resolved, "hospital.patients").unwrap();
        assert_eq!(grant.allowed_actions, actions(&[Action::View, Action::Add]));
    }

    #[test]
    fn test_deny_applies_to_non_selected_source() {
        let patients = Resource::new("hospital.patients", "Patients", ResourceCategory::Hospital);
        let resource_id = patients.id;
        let catalog = catalog_with(vec![patients]);

        let hospital_id = Uuid::now_v7();
        let user_id = Uuid::now_v7();
        let identity = AccessIdentity::new(user_id)
            .with_hospital(hospital_id)
            .with_role(StaffRole::Doctor);

        let overrides = vec![HospitalOverride::new(
            hospital_id,
            StaffRole::Doctor,
            resource_id,
            actions(&[Action::View, Action::Delete]),
        )];
        // The user override itself grants nothing but delete is denied;
        // because the row exists it also becomes the selected source.
        let user_overrides = vec![UserOverride::new(
            user_id,
            resource_id,
            actions(&[Action::View, Action::Delete]),
        )
        .with_denied(actions(&[Action::Delete]))];

        let resolved = resolve_permissions(&catalog, &identity, &[], &overrides, &user_overrides);
        let grant = find(&resolved, "hospital.patients").unwrap();
        assert!(!grant.allowed_actions.contains(&Action::Delete));
        assert!(grant.allowed_actions.contains(&Action::View));
    }

    #[test]
    fn test_deny_only_override_still_selected() {
        // A user override with empty allows suppresses the hospital grant
        // entirely: source selection is all-or-nothing.
        let patients = Resource::new("hospital.patients", "Patients", ResourceCategory::Hospital);
        let resource_id = patients.id;
        let catalog = catalog_with(vec![patients]);

        let hospital_id = Uuid::now_v7();
        let user_id = Uuid::now_v7();
        let identity = AccessIdentity::new(user_id)
            .with_hospital(hospital_id)
            .with_role(StaffRole::Doctor);

        let overrides = vec![HospitalOverride::new(
            hospital_id,
            StaffRole::Doctor,
            resource_id,
            actions(&[Action::View, Action::Edit]),
        )];
        let user_overrides = vec![UserOverride::new(user_id, resource_id, HashSet::new())
            .with_denied(actions(&[Action::Delete]))];

        let resolved = resolve_permissions(&catalog, &identity, &[], &overrides, &user_overrides);
        assert!(find(&resolved, "hospital.patients").is_none());
    }

    #[test]
    fn test_hospital_scoped_user_override_beats_global() {
        let patients = Resource::new("hospital.patients", "Patients", ResourceCategory::Hospital);
        let resource_id = patients.id;
        let catalog = catalog_with(vec![patients]);

        let hospital_id = Uuid::now_v7();
        let user_id = Uuid::now_v7();
        let identity = AccessIdentity::new(user_id)
            .with_hospital(hospital_id)
            .with_role(StaffRole::Doctor);

        let user_overrides = vec![
            UserOverride::new(user_id, resource_id, actions(&[Action::View])),
            UserOverride::new(user_id, resource_id, actions(&[Action::View, Action::Edit]))
                .scoped_to(hospital_id),
        ];

        let resolved = resolve_permissions(&catalog, &identity, &[], &[], &user_overrides);
        let grant = find(&resolved, "hospital.patients").unwrap();
        assert_eq!(grant.allowed_actions, actions(&[Action::View, Action::Edit]));
    }

    #[test]
    fn test_user_override_for_other_hospital_ignored() {
        let patients = Resource::new("hospital.patients", "Patients", ResourceCategory::Hospital);
        let resource_id = patients.id;
        let catalog = catalog_with(vec![patients]);

        let user_id = Uuid::now_v7();
        let identity = AccessIdentity::new(user_id)
            .with_hospital(Uuid::now_v7())
            .with_role(StaffRole::Doctor);

        let user_overrides = vec![
            UserOverride::new(user_id, resource_id, actions(&[Action::Delete]))
                .scoped_to(Uuid::now_v7()),
        ];

        let resolved = resolve_permissions(&catalog, &identity, &[], &[], &user_overrides);
        assert!(resolved.is_empty());
    }

    #[test]
    fn test_super_admin_bypass() {
        let catalog = catalog_with(vec![
            Resource::new("hospital.patients", "Patients", ResourceCategory::Hospital),
            Resource::new("admin.tenants", "Tenants", ResourceCategory::Admin),
        ]);

        let identity = AccessIdentity::new(Uuid::now_v7()).super_admin();

        // No grant rows at all; the bypass must not depend on them.
        let resolved = resolve_permissions(&catalog, &identity, &[], &[], &[]);
        assert_eq!(resolved.len(), 2);
        for grant in &resolved {
            assert_eq!(grant.allowed_actions, actions(&Action::all()));
            assert!(grant.field_permissions.allows_view("anything"));
            assert!(grant.field_permissions.allows_edit("anything"));
        }
    }

    #[test]
    fn test_admin_category_excluded_for_staff() {
        let tenants = Resource::new("admin.tenants", "Tenants", ResourceCategory::Admin);
        let resource_id = tenants.id;
        let catalog = catalog_with(vec![tenants]);

        let identity = AccessIdentity::new(Uuid::now_v7()).with_role(StaffRole::HospitalManager);
        let defaults = vec![RolePermission::new(
            StaffRole::HospitalManager,
            resource_id,
            actions(&[Action::View]),
        )];

        let resolved = resolve_permissions(&catalog, &identity, &defaults, &[], &[]);
        assert!(resolved.is_empty());
    }

    #[test]
    fn test_no_role_resolves_empty() {
        let catalog = catalog_with(vec![Resource::new(
            "hospital.patients",
            "Patients",
            ResourceCategory::Hospital,
        )]);
        let identity = AccessIdentity::new(Uuid::now_v7());

        let resolved = resolve_permissions(&catalog, &identity, &[], &[], &[]);
        assert!(resolved.is_empty());
    }

    #[test]
    fn test_ungranted_resource_absent() {
        let catalog = catalog_with(vec![
            Resource::new("hospital.patients", "Patients", ResourceCategory::Hospital),
            Resource::new("hospital.billing", "Billing", ResourceCategory::Hospital),
        ]);
        let patients_id = catalog.get("hospital.patients").unwrap().id;

        let identity = AccessIdentity::new(Uuid::now_v7()).with_role(StaffRole::Doctor);
        let defaults = vec![RolePermission::new(
            StaffRole::Doctor,
            patients_id,
            actions(&[Action::View]),
        )];

        let resolved = resolve_permissions(&catalog, &identity, &defaults, &[], &[]);
        assert_eq!(resolved.len(), 1);
        assert!(find(&resolved, "hospital.billing").is_none());
    }
}
