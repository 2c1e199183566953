//! Permission cache
//!
//! Time-boxed memoization of resolved permission sets and the resource
//! catalog. The cache is an explicit, injected abstraction so tests can
//! substitute a no-op or instrumented implementation; nothing in the access
//! layer reaches for a module-global.
//!
//! Invalidation is coarse on purpose: keys are grouped into logical domains
//! and [`PermissionCache::invalidate`] removes every entry whose key contains
//! the given fragment. A single grant change wipes the whole resolved set for
//! the affected role or user, trading recomputation for the guarantee that a
//! stale allow is never served.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use uuid::Uuid;

use hms_rbac::StaffRole;

/// Default entry lifetime.
pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

/// Cache key builders for the logical cache domains.
pub mod keys {
    use super::*;

    /// Domain for the resource catalog.
    pub const RESOURCES: &str = "resources";

    /// Domain fragment covering every resolved user permission set.
    pub const USER_PERMISSIONS: &str = "user_permissions";

    /// Key for one role's default grants.
    pub fn role_permissions(role: StaffRole) -> String {
        format!("role_permissions:{}", role.as_str())
    }

    /// Key for one user's resolved set in one hospital context.
    pub fn user_permissions(user_id: Uuid, hospital_id: Option<Uuid>) -> String {
        match hospital_id {
            Some(hospital_id) => format!("user_permissions:{user_id}:{hospital_id}"),
            None => format!("user_permissions:{user_id}:global"),
        }
    }
}

/// Key-value cache with fragment-based invalidation.
///
/// Values are JSON so one cache serves catalog rows, role grants and
/// resolved permission sets alike.
#[async_trait]
pub trait PermissionCache: Send + Sync {
    /// Look up a fresh entry.
    async fn get(&self, key: &str) -> Option<Value>;

    /// Store an entry.
    async fn set(&self, key: &str, value: Value);

    /// Remove every entry whose key contains `fragment`.
    async fn invalidate(&self, fragment: &str);

    /// Remove everything (bulk catalog changes).
    async fn clear(&self);

    /// Get cache statistics.
    async fn stats(&self) -> CacheStats;
}

/// Cache statistics.
#[derive(Debug, Clone, Default)]
pub struct CacheStats {
    /// Lookups that returned a fresh entry.
    pub hits: u64,
    /// Lookups that missed or hit an expired entry.
    pub misses: u64,
    /// Entries currently stored (including not-yet-purged expired ones).
    pub entries: usize,
}

struct CacheEntry {
    value: Value,
    expires_at: Instant,
}

/// In-memory TTL cache.
///
/// Expired entries are treated as absent on read and purged on write, so no
/// background task is needed.
pub struct MemoryCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
    ttl: Duration,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl std::fmt::Debug for MemoryCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryCache").field("ttl", &self.ttl).finish()
    }
}

impl MemoryCache {
    /// Create a cache with the default five-minute TTL.
    pub fn new() -> Self {
        Self::with_ttl(DEFAULT_TTL)
    }

    /// Create a cache with a custom TTL.
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PermissionCache for MemoryCache {
    async fn get(&self, key: &str) -> Option<Value> {
        let entries = self.entries.read().await;
        match entries.get(key) {
            Some(entry) if entry.expires_at > Instant::now() => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(key, "cache hit");
                Some(entry.value.clone())
            }
            _ => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(key, "cache miss");
                None
            }
        }
    }

    async fn set(&self, key: &str, value: Value) {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        entries.retain(|_, entry| entry.expires_at > now);
        entries.insert(
            key.to_string(),
            CacheEntry {
                value,
                expires_at: now + self.ttl,
            },
        );
    }

    async fn invalidate(&self, fragment: &str) {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|key, _| !key.contains(fragment));
        tracing::debug!(fragment, removed = before - entries.len(), "cache invalidated");
    }

    async fn clear(&self) {
        self.entries.write().await.clear();
    }

    async fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.entries.read().await.len(),
        }
    }
}

/// Cache that stores nothing; every read misses.
///
/// Useful in tests asserting engine behavior without memoization.
#[derive(Debug, Default)]
pub struct NoopCache;

#[async_trait]
impl PermissionCache for NoopCache {
    async fn get(&self, _key: &str) -> Option<Value> {
        None
    }

    async fn set(&self, _key: &str, _value: Value) {}

    async fn invalidate(&self, _fragment: &str) {}

    async fn clear(&self) {}

    async fn stats(&self) -> CacheStats {
        CacheStats::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_set_get_round_trip() {
        let cache = MemoryCache::new();
        cache.set("resources", json!(["hospital.patients"])).await;

        assert_eq!(cache.get("resources").await, Some(json!(["hospital.patients"])));
        assert_eq!(cache.get("missing").await, None);
    }

    #[tokio::test]
    async fn test_expired_entry_misses() {
        let cache = MemoryCache::with_ttl(Duration::ZERO);
        cache.set("resources", json!(1)).await;

        assert_eq!(cache.get("resources").await, None);
    }

    #[tokio::test]
    async fn test_invalidate_by_fragment() {
        let cache = MemoryCache::new();
        let user = Uuid::now_v7();
        let other = Uuid::now_v7();
        cache.set(&keys::user_permissions(user, None), json!(1)).await;
        cache.set(&keys::user_permissions(other, None), json!(2)).await;
        cache.set(keys::RESOURCES, json!(3)).await;

        cache.invalidate(&format!("user_permissions:{user}")).await;

        assert_eq!(cache.get(&keys::user_permissions(user, None)).await, None);
        assert!(cache.get(&keys::user_permissions(other, None)).await.is_some());
        assert!(cache.get(keys::RESOURCES).await.is_some());
    }

    #[tokio::test]
    async fn test_invalidate_domain_covers_all_users() {
        let cache = MemoryCache::new();
        cache
            .set(&keys::user_permissions(Uuid::now_v7(), Some(Uuid::now_v7())), json!(1))
            .await;
        cache.set(&keys::user_permissions(Uuid::now_v7(), None), json!(2)).await;

        cache.invalidate(keys::USER_PERMISSIONS).await;
        assert_eq!(cache.stats().await.entries, 0);
    }

    #[tokio::test]
    async fn test_clear() {
        let cache = MemoryCache::new();
        cache.set(keys::RESOURCES, json!(1)).await;
        cache.set(&keys::role_permissions(StaffRole::Doctor), json!(2)).await;

        cache.clear().await;
        assert_eq!(cache.get(keys::RESOURCES).await, None);
        assert_eq!(cache.get(&keys::role_permissions(StaffRole::Doctor)).await, None);
    }

    #[tokio::test]
    async fn test_stats_count_hits_and_misses() {
        let cache = MemoryCache::new();
        cache.set(keys::RESOURCES, json!(1)).await;

        let _ = cache.get(keys::RESOURCES).await;
        let _ = cache.get("missing").await;

        let stats = cache.stats().await;
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
    }

    #[tokio::test]
    async fn test_noop_cache_never_stores() {
        let cache = NoopCache;
        cache.set(keys::RESOURCES, json!(1)).await;
        assert_eq!(cache.get(keys::RESOURCES).await, None);
    }
}
