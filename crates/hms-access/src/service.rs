//! Access service
//!
//! The thin wrapper the authorization guard and the admin UI backend call:
//! `check_permission` / `get_user_permissions` on the read path, and the
//! grant write operations on the admin path. Reads go cache-first and fall
//! back to the resolution engine; every write invalidates the affected cache
//! domains synchronously before returning, so a stale cached decision is
//! never served after a permission change commits.
//!
//! Denial is a normal return value. The only errors this module produces are
//! infrastructure failures and write-boundary rejections; the guard treats
//! the former as fail-closed.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use uuid::Uuid;

use hms_rbac::cascade::{cascade_toggle, compute_check_state, CheckState};
use hms_rbac::{
    resolve_permissions, AccessIdentity, Action, Catalog, HospitalOverride, Resource, ResourceCategory,
    ResourceNode, ResolvedPermission, RolePermission, StaffRole, UserOverride,
};

use crate::cache::{keys, PermissionCache};
use crate::error::{AccessError, AccessResult};
use crate::store::{HospitalOverrideStore, ResourceStore, RolePermissionStore, UserOverrideStore};

/// Why a permission check was denied.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DenyReason {
    /// The identity resolved no grant for the resource.
    NoResource,
    /// The resource resolved, but not this action.
    ActionNotAllowed,
    /// The action resolved, but the requested field is gated.
    FieldNotAccessible,
}

impl DenyReason {
    /// Human-readable denial message.
    pub fn message(&self) -> &'static str {
        match self {
            DenyReason::NoResource => "no permission for this resource",
            DenyReason::ActionNotAllowed => "action not allowed",
            DenyReason::FieldNotAccessible => "field not accessible",
        }
    }
}

/// Outcome of a permission check.
///
/// Safe to compute on every protected request; carries no store internals.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AccessDecision {
    /// Whether the operation is permitted.
    pub allowed: bool,
    /// Set when `allowed` is false.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<DenyReason>,
}

impl AccessDecision {
    /// An allow decision.
    pub fn allow() -> Self {
        Self {
            allowed: true,
            reason: None,
        }
    }

    /// A deny decision with a reason.
    pub fn deny(reason: DenyReason) -> Self {
        Self {
            allowed: false,
            reason: Some(reason),
        }
    }
}

/// Result of a sequential bulk grant update.
///
/// There is no transaction across the batch: items applied before a failure
/// stay committed, and callers report counts.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BulkOutcome {
    /// Items written successfully.
    pub applied: usize,
    /// Items rejected or failed.
    pub failed: usize,
    /// Error codes for the failed items, in batch order.
    #[serde(default)]
    pub errors: Vec<String>,
}

/// Resource tree split by category for the admin UI.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogTree {
    /// Hospital-facing hierarchy.
    pub hospital: Vec<ResourceNode>,
    /// Platform-administration hierarchy.
    pub admin: Vec<ResourceNode>,
}

/// The permission check and grant administration service.
///
/// Stores and cache are injected so tests can run fully in memory and
/// substitute an instrumented or no-op cache.
pub struct AccessService {
    resources: Arc<dyn ResourceStore>,
    role_permissions: Arc<dyn RolePermissionStore>,
    hospital_overrides: Arc<dyn HospitalOverrideStore>,
    user_overrides: Arc<dyn UserOverrideStore>,
    cache: Arc<dyn PermissionCache>,
}

impl std::fmt::Debug for AccessService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessService").finish()
    }
}

impl AccessService {
    /// Create a service over injected stores and cache.
    pub fn new(
        resources: Arc<dyn ResourceStore>,
        role_permissions: Arc<dyn RolePermissionStore>,
        hospital_overrides: Arc<dyn HospitalOverrideStore>,
        user_overrides: Arc<dyn UserOverrideStore>,
        cache: Arc<dyn PermissionCache>,
    ) -> Self {
        Self {
            resources,
            role_permissions,
            hospital_overrides,
            user_overrides,
            cache,
        }
    }

    // ------------------------------------------------------------------
    // Catalog reads
    // ------------------------------------------------------------------

    /// Load the active catalog, cache-first.
    async fn catalog(&self) -> AccessResult<Catalog> {
        if let Some(value) = self.cache.get(keys::RESOURCES).await {
            if let Ok(rows) = serde_json::from_value::<Vec<Resource>>(value) {
                return Ok(Catalog::from_resources(rows));
            }
            // Unreadable cache entry: drop it and fall through to the store.
            self.cache.invalidate(keys::RESOURCES).await;
        }

        let rows = self.resources.list_active().await?;
        let value = serde_json::to_value(&rows).map_err(|e| AccessError::Internal(e.to_string()))?;
        self.cache.set(keys::RESOURCES, value).await;
        Ok(Catalog::from_resources(rows))
    }

    /// Flat list of active resources with their actions and fields.
    pub async fn resources(&self) -> AccessResult<Vec<Resource>> {
        let catalog = self.catalog().await?;
        Ok(catalog.active().into_iter().cloned().collect())
    }

    /// Root-to-leaf hierarchy split by category.
    pub async fn resource_tree(&self) -> AccessResult<CatalogTree> {
        let catalog = self.catalog().await?;
        Ok(CatalogTree {
            hospital: catalog
                .tree(ResourceCategory::Hospital)
                .into_iter()
                .cloned()
                .collect(),
            admin: catalog
                .tree(ResourceCategory::Admin)
                .into_iter()
                .cloned()
                .collect(),
        })
    }

    /// Insert or replace a catalog resource.
    ///
    /// Catalog edits clear the whole cache: grants against the changed
    /// resource may appear or disappear from any resolved set.
    pub async fn upsert_resource(&self, resource: Resource) -> AccessResult<()> {
        self.resources.upsert(resource).await?;
        self.cache.clear().await;
        Ok(())
    }

    /// Soft-deactivate a resource by code.
    pub async fn deactivate_resource(&self, code: &str) -> AccessResult<bool> {
        let existed = self.resources.deactivate(code).await?;
        self.cache.clear().await;
        Ok(existed)
    }

    // ------------------------------------------------------------------
    // Resolution reads
    // ------------------------------------------------------------------

    /// Resolve the effective permission set for one identity, cache-first.
    pub async fn get_user_permissions(
        &self,
        identity: &AccessIdentity,
    ) -> AccessResult<Vec<ResolvedPermission>> {
        let key = keys::user_permissions(identity.user_id, identity.hospital_id);
        if let Some(value) = self.cache.get(&key).await {
            if let Ok(resolved) = serde_json::from_value::<Vec<ResolvedPermission>>(value) {
                return Ok(resolved);
            }
            self.cache.invalidate(&key).await;
        }

        let catalog = self.catalog().await?;

        let resolved = if identity.is_super_admin {
            // The bypass consults no grant rows at all.
            resolve_permissions(&catalog, identity, &[], &[], &[])
        } else {
            let role_defaults = match identity.role {
                Some(role) => self.get_role_permissions(role).await?,
                None => Vec::new(),
            };
            let hospital_rows = match identity.hospital_id {
                Some(hospital_id) => self.hospital_overrides.list_for_hospital(hospital_id).await?,
                None => Vec::new(),
            };
            let user_rows = self.user_overrides.list_for_user(identity.user_id).await?;
            resolve_permissions(&catalog, identity, &role_defaults, &hospital_rows, &user_rows)
        };

        let value =
            serde_json::to_value(&resolved).map_err(|e| AccessError::Internal(e.to_string()))?;
        self.cache.set(&key, value).await;
        Ok(resolved)
    }

    /// Check a single `(resource, action, field?)` operation for an identity.
    ///
    /// Never errs on denial; errs only when a backing store fails, which the
    /// guard must treat as a hard, fail-closed failure.
    pub async fn check_permission(
        &self,
        identity: &AccessIdentity,
        resource_code: &str,
        action: Action,
        field: Option<&str>,
    ) -> AccessResult<AccessDecision> {
        if identity.is_super_admin {
            return Ok(AccessDecision::allow());
        }

        let resolved = self.get_user_permissions(identity).await?;
        let Some(grant) = resolved.iter().find(|p| p.resource_code == resource_code) else {
            tracing::warn!(
                user = %identity.user_id,
                resource = resource_code,
                "access denied: no permission for resource"
            );
            return Ok(AccessDecision::deny(DenyReason::NoResource));
        };

        if !grant.allows(action) {
            tracing::warn!(
                user = %identity.user_id,
                resource = resource_code,
                action = %action,
                "access denied: action not allowed"
            );
            return Ok(AccessDecision::deny(DenyReason::ActionNotAllowed));
        }

        if let Some(field_code) = field {
            if !grant.allows_field(action, field_code) {
                tracing::warn!(
                    user = %identity.user_id,
                    resource = resource_code,
                    field = field_code,
                    "access denied: field not accessible"
                );
                return Ok(AccessDecision::deny(DenyReason::FieldNotAccessible));
            }
        }

        Ok(AccessDecision::allow())
    }

    /// All role default grants for one role, cache-first.
    pub async fn get_role_permissions(&self, role: StaffRole) -> AccessResult<Vec<RolePermission>> {
        let key = keys::role_permissions(role);
        if let Some(value) = self.cache.get(&key).await {
            if let Ok(rows) = serde_json::from_value::<Vec<RolePermission>>(value) {
                return Ok(rows);
            }
            self.cache.invalidate(&key).await;
        }

        let rows = self.role_permissions.list_for_role(role).await?;
        let value = serde_json::to_value(&rows).map_err(|e| AccessError::Internal(e.to_string()))?;
        self.cache.set(&key, value).await;
        Ok(rows)
    }

    /// All hospital override rows for one hospital.
    pub async fn get_hospital_overrides(
        &self,
        hospital_id: Uuid,
    ) -> AccessResult<Vec<HospitalOverride>> {
        self.hospital_overrides.list_for_hospital(hospital_id).await
    }

    // ------------------------------------------------------------------
    // Grant writes
    // ------------------------------------------------------------------

    /// Replace one role default grant.
    pub async fn update_role_permission(&self, grant: RolePermission) -> AccessResult<()> {
        self.validate_grant(grant.role, grant.resource_id, &grant.allowed_actions)
            .await?;

        self.role_permissions.upsert(grant.clone()).await?;
        // Invalidate before returning: every user holding this role must
        // recompute on the next read.
        self.cache.invalidate(&keys::role_permissions(grant.role)).await;
        self.cache.invalidate(keys::USER_PERMISSIONS).await;
        Ok(())
    }

    /// Replace role default grants sequentially, one invalidation each.
    pub async fn update_role_permissions(&self, grants: Vec<RolePermission>) -> BulkOutcome {
        let mut outcome = BulkOutcome::default();
        for grant in grants {
            match self.update_role_permission(grant).await {
                Ok(()) => outcome.applied += 1,
                Err(err) => {
                    tracing::warn!(error = %err, "bulk role grant item failed");
                    outcome.failed += 1;
                    outcome.errors.push(err.error_code().to_string());
                }
            }
        }
        outcome
    }

    /// Insert or replace a hospital override.
    pub async fn set_hospital_override(&self, grant: HospitalOverride) -> AccessResult<()> {
        self.validate_grant(grant.role, grant.resource_id, &grant.allowed_actions)
            .await?;

        self.hospital_overrides.upsert(grant).await?;
        self.cache.invalidate(keys::USER_PERMISSIONS).await;
        Ok(())
    }

    /// Delete a hospital override; resolution falls back to the role default.
    pub async fn delete_hospital_override(
        &self,
        hospital_id: Uuid,
        role: StaffRole,
        resource_id: Uuid,
    ) -> AccessResult<bool> {
        let existed = self
            .hospital_overrides
            .delete(hospital_id, role, resource_id)
            .await?;
        self.cache.invalidate(keys::USER_PERMISSIONS).await;
        Ok(existed)
    }

    /// Insert or replace a user override.
    pub async fn set_user_override(&self, grant: UserOverride) -> AccessResult<()> {
        let resource = self.resource_for_write(grant.resource_id).await?;
        for action in &grant.allowed_actions {
            if !resource.supports(*action) {
                return Err(AccessError::ActionNotSupported {
                    resource: resource.code.clone(),
                    action: action.as_str().to_string(),
                });
            }
        }

        let user_id = grant.user_id;
        self.user_overrides.upsert(grant).await?;
        self.cache
            .invalidate(&format!("{}:{}", keys::USER_PERMISSIONS, user_id))
            .await;
        Ok(())
    }

    /// Delete a user override; resolution falls back to hospital/role grants.
    pub async fn delete_user_override(
        &self,
        user_id: Uuid,
        resource_id: Uuid,
        hospital_id: Option<Uuid>,
    ) -> AccessResult<bool> {
        let existed = self
            .user_overrides
            .delete(user_id, resource_id, hospital_id)
            .await?;
        self.cache
            .invalidate(&format!("{}:{}", keys::USER_PERMISSIONS, user_id))
            .await;
        Ok(existed)
    }

    // ------------------------------------------------------------------
    // Tree cascade
    // ------------------------------------------------------------------

    /// Tri-state value of one node for one role and action.
    ///
    /// A leaf counts as granted when the role's default grant allows the
    /// action; interior nodes aggregate bottom-up.
    pub async fn role_check_state(
        &self,
        role: StaffRole,
        resource_code: &str,
        action: Action,
    ) -> AccessResult<CheckState> {
        let catalog = self.catalog().await?;
        let node = catalog
            .node(resource_code)
            .ok_or_else(|| AccessError::UnknownResource(resource_code.to_string()))?;

        let granted = self.granted_codes(&catalog, role, action).await?;
        Ok(compute_check_state(node, action, &granted))
    }

    /// Toggle an action on a node and all its descendants for a role.
    ///
    /// Writes are applied sequentially, each with its own invalidation;
    /// partial failure leaves earlier items committed. When enabling,
    /// resources that do not declare the action are skipped rather than
    /// failing the whole cascade.
    ///
    /// # Returns
    ///
    /// The number of grant rows written.
    pub async fn apply_cascade(
        &self,
        role: StaffRole,
        resource_code: &str,
        action: Action,
        enabled: bool,
    ) -> AccessResult<usize> {
        if role.is_super_admin() {
            return Err(AccessError::ProtectedRole);
        }

        let catalog = self.catalog().await?;
        let node = catalog
            .node(resource_code)
            .ok_or_else(|| AccessError::UnknownResource(resource_code.to_string()))?;

        let mut applied = 0;
        for write in cascade_toggle(node, action, enabled) {
            if enabled {
                let declares = catalog
                    .get(&write.resource_code)
                    .map(|r| r.supports(action))
                    .unwrap_or(false);
                if !declares {
                    continue;
                }
            }

            let mut grant = match self.role_permissions.get(role, write.resource_id).await? {
                Some(existing) => existing,
                None if enabled => {
                    RolePermission::new(role, write.resource_id, HashSet::new())
                }
                // Disabling an action that was never granted is a no-op.
                None => continue,
            };

            if enabled {
                grant.allowed_actions.insert(action);
            } else {
                grant.allowed_actions.remove(&action);
            }
            grant.updated_at = chrono::Utc::now();

            self.role_permissions.upsert(grant).await?;
            self.cache.invalidate(&keys::role_permissions(role)).await;
            self.cache.invalidate(keys::USER_PERMISSIONS).await;
            applied += 1;
        }

        tracing::debug!(
            role = %role,
            resource = resource_code,
            action = %action,
            enabled,
            applied,
            "cascade applied"
        );
        Ok(applied)
    }

    /// Codes of resources whose role default allows the action.
    async fn granted_codes(
        &self,
        catalog: &Catalog,
        role: StaffRole,
        action: Action,
    ) -> AccessResult<HashSet<String>> {
        let defaults = self.get_role_permissions(role).await?;
        Ok(catalog
            .active()
            .iter()
            .filter(|resource| {
                defaults
                    .iter()
                    .any(|rp| rp.resource_id == resource.id && rp.allowed_actions.contains(&action))
            })
            .map(|resource| resource.code.clone())
            .collect())
    }

    /// Look up a grant write's target resource.
    ///
    /// Goes to the store rather than the catalog so a deactivated resource
    /// is reported as inactive, not unknown.
    async fn resource_for_write(&self, resource_id: Uuid) -> AccessResult<Resource> {
        match self.resources.find_by_id(resource_id).await? {
            Some(resource) if resource.is_active => Ok(resource),
            Some(resource) => Err(AccessError::ResourceInactive(resource.code)),
            None => Err(AccessError::UnknownResource(format!("id {resource_id}"))),
        }
    }

    /// Write-boundary validation shared by role and hospital grant writes.
    async fn validate_grant(
        &self,
        role: StaffRole,
        resource_id: Uuid,
        allowed_actions: &HashSet<Action>,
    ) -> AccessResult<()> {
        if role.is_super_admin() {
            return Err(AccessError::ProtectedRole);
        }
        let resource = self.resource_for_write(resource_id).await?;
        for action in allowed_actions {
            if !resource.supports(*action) {
                return Err(AccessError::ActionNotSupported {
                    resource: resource.code.clone(),
                    action: action.as_str().to_string(),
                });
            }
        }
        Ok(())
    }
}
