//! Permission stores
//!
//! Dumb keyed read/write abstractions over persistent storage, one per grant
//! table plus the resource table. No store performs resolution; that
//! separation keeps the engine in `hms-rbac` pure and testable without a
//! database.
//!
//! Every upsert is a full-row replace with last-writer-wins semantics; two
//! administrators editing the same grant concurrently can lose one update,
//! which is an accepted limitation. Deleting an override removes the row
//! entirely so resolution falls through to the next-lower-precedence source.
//! Role defaults are only ever replaced, never deleted.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use hms_rbac::{HospitalOverride, Resource, RolePermission, StaffRole, UserOverride};

use crate::error::AccessResult;

/// Store of catalog resources.
#[async_trait]
pub trait ResourceStore: Send + Sync {
    /// All active resources with their actions and fields.
    async fn list_active(&self) -> AccessResult<Vec<Resource>>;

    /// Look up a resource by ID, including deactivated rows.
    ///
    /// Grant writes use this to tell a deactivated resource apart from one
    /// that never existed.
    async fn find_by_id(&self, resource_id: Uuid) -> AccessResult<Option<Resource>>;

    /// Insert or replace a resource row.
    async fn upsert(&self, resource: Resource) -> AccessResult<()>;

    /// Soft-deactivate a resource by code.
    ///
    /// Existing grants referencing it stay in place; reactivating restores
    /// prior behavior.
    async fn deactivate(&self, code: &str) -> AccessResult<bool>;
}

/// Store of role default grants, keyed by `(role, resource_id)`.
#[async_trait]
pub trait RolePermissionStore: Send + Sync {
    /// Look up the default for one role on one resource.
    async fn get(&self, role: StaffRole, resource_id: Uuid) -> AccessResult<Option<RolePermission>>;

    /// All defaults for one role.
    async fn list_for_role(&self, role: StaffRole) -> AccessResult<Vec<RolePermission>>;

    /// Full-row upsert.
    async fn upsert(&self, grant: RolePermission) -> AccessResult<()>;
}

/// Store of hospital overrides, keyed by `(hospital_id, role, resource_id)`.
#[async_trait]
pub trait HospitalOverrideStore: Send + Sync {
    /// Look up one override row.
    async fn get(
        &self,
        hospital_id: Uuid,
        role: StaffRole,
        resource_id: Uuid,
    ) -> AccessResult<Option<HospitalOverride>>;

    /// All overrides for one hospital.
    async fn list_for_hospital(&self, hospital_id: Uuid) -> AccessResult<Vec<HospitalOverride>>;

    /// Full-row upsert.
    async fn upsert(&self, grant: HospitalOverride) -> AccessResult<()>;

    /// Delete a row; returns whether it existed.
    async fn delete(
        &self,
        hospital_id: Uuid,
        role: StaffRole,
        resource_id: Uuid,
    ) -> AccessResult<bool>;
}

/// Store of user overrides, keyed by `(user_id, resource_id, hospital_id)`.
#[async_trait]
pub trait UserOverrideStore: Send + Sync {
    /// Look up one override row.
    async fn get(
        &self,
        user_id: Uuid,
        resource_id: Uuid,
        hospital_id: Option<Uuid>,
    ) -> AccessResult<Option<UserOverride>>;

    /// All override rows for one user (any hospital scope).
    async fn list_for_user(&self, user_id: Uuid) -> AccessResult<Vec<UserOverride>>;

    /// Full-row upsert.
    async fn upsert(&self, grant: UserOverride) -> AccessResult<()>;

    /// Delete a row; returns whether it existed.
    async fn delete(
        &self,
        user_id: Uuid,
        resource_id: Uuid,
        hospital_id: Option<Uuid>,
    ) -> AccessResult<bool>;
}

// ============================================================================
// In-memory implementations (feature: memory)
// ============================================================================

/// In-memory resource store.
///
/// Suitable for single-process deployments and testing.
#[derive(Debug, Default)]
pub struct MemoryResourceStore {
    rows: RwLock<HashMap<String, Resource>>,
}

impl MemoryResourceStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store seeded with resources.
    pub fn with_resources(resources: Vec<Resource>) -> Self {
        Self {
            rows: RwLock::new(resources.into_iter().map(|r| (r.code.clone(), r)).collect()),
        }
    }
}

#[async_trait]
impl ResourceStore for MemoryResourceStore {
    async fn list_active(&self) -> AccessResult<Vec<Resource>> {
        let rows = self.rows.read().await;
        Ok(rows.values().filter(|r| r.is_active).cloned().collect())
    }

    async fn find_by_id(&self, resource_id: Uuid) -> AccessResult<Option<Resource>> {
        let rows = self.rows.read().await;
        Ok(rows.values().find(|r| r.id == resource_id).cloned())
    }

    async fn upsert(&self, resource: Resource) -> AccessResult<()> {
        self.rows.write().await.insert(resource.code.clone(), resource);
        Ok(())
    }

    async fn deactivate(&self, code: &str) -> AccessResult<bool> {
        let mut rows = self.rows.write().await;
        match rows.get_mut(code) {
            Some(resource) => {
                resource.is_active = false;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

/// In-memory role default store.
#[derive(Debug, Default)]
pub struct MemoryRolePermissionStore {
    rows: RwLock<HashMap<(StaffRole, Uuid), RolePermission>>,
}

impl MemoryRolePermissionStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RolePermissionStore for MemoryRolePermissionStore {
    async fn get(&self, role: StaffRole, resource_id: Uuid) -> AccessResult<Option<RolePermission>> {
        Ok(self.rows.read().await.get(&(role, resource_id)).cloned())
    }

    async fn list_for_role(&self, role: StaffRole) -> AccessResult<Vec<RolePermission>> {
        let rows = self.rows.read().await;
        Ok(rows.values().filter(|rp| rp.role == role).cloned().collect())
    }

    async fn upsert(&self, grant: RolePermission) -> AccessResult<()> {
        self.rows
            .write()
            .await
            .insert((grant.role, grant.resource_id), grant);
        Ok(())
    }
}

/// In-memory hospital override store.
#[derive(Debug, Default)]
pub struct MemoryHospitalOverrideStore {
    rows: RwLock<HashMap<(Uuid, StaffRole, Uuid), HospitalOverride>>,
}

impl MemoryHospitalOverrideStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl HospitalOverrideStore for MemoryHospitalOverrideStore {
    async fn get(
        &self,
        hospital_id: Uuid,
        role: StaffRole,
        resource_id: Uuid,
    ) -> AccessResult<Option<HospitalOverride>> {
        Ok(self
            .rows
            .read()
            .await
            .get(&(hospital_id, role, resource_id))
            .cloned())
    }

    async fn list_for_hospital(&self, hospital_id: Uuid) -> AccessResult<Vec<HospitalOverride>> {
        let rows = self.rows.read().await;
        Ok(rows
            .values()
            .filter(|ho| ho.hospital_id == hospital_id)
            .cloned()
            .collect())
    }

    async fn upsert(&self, grant: HospitalOverride) -> AccessResult<()> {
        self.rows
            .write()
            .await
            .insert((grant.hospital_id, grant.role, grant.resource_id), grant);
        Ok(())
    }

    async fn delete(
        &self,
        hospital_id: Uuid,
        role: StaffRole,
        resource_id: Uuid,
    ) -> AccessResult<bool> {
        Ok(self
            .rows
            .write()
            .await
            .remove(&(hospital_id, role, resource_id))
            .is_some())
    }
}

/// In-memory user override store.
#[derive(Debug, Default)]
pub struct MemoryUserOverrideStore {
    rows: RwLock<HashMap<(Uuid, Uuid, Option<Uuid>), UserOverride>>,
}

impl MemoryUserOverrideStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserOverrideStore for MemoryUserOverrideStore {
    async fn get(
        &self,
        user_id: Uuid,
        resource_id: Uuid,
        hospital_id: Option<Uuid>,
    ) -> AccessResult<Option<UserOverride>> {
        Ok(self
            .rows
            .read()
            .await
            .get(&(user_id, resource_id, hospital_id))
            .cloned())
    }

    async fn list_for_user(&self, user_id: Uuid) -> AccessResult<Vec<UserOverride>> {
        let rows = self.rows.read().await;
        Ok(rows
            .values()
            .filter(|uo| uo.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn upsert(&self, grant: UserOverride) -> AccessResult<()> {
        self.rows
            .write()
            .await
            .insert((grant.user_id, grant.resource_id, grant.hospital_id), grant);
        Ok(())
    }

    async fn delete(
        &self,
        user_id: Uuid,
        resource_id: Uuid,
        hospital_id: Option<Uuid>,
    ) -> AccessResult<bool> {
        Ok(self
            .rows
            .write()
            .await
            .remove(&(user_id, resource_id, hospital_id))
            .is_some())
    }
}
