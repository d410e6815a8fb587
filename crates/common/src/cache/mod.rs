//! Process-wide TTL caches
//!
//! Provides:
//! - A generic single-slot cache with get/set/invalidate and explicit TTLs
//! - The settings cache used to serve `SearchSettings` to the engine
//!
//! Writers invalidate before storing, so a settings update is visible to
//! every reader on its next lookup.

use crate::config::SearchSettings;
use crate::errors::Result;
use std::future::Future;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::debug;

struct Entry<T> {
    value: T,
    expires_at: Instant,
}

/// Single-slot cache with an explicit TTL per `set`
pub struct TtlCache<T> {
    name: &'static str,
    slot: RwLock<Option<Entry<T>>>,
}

impl<T: Clone> TtlCache<T> {
    /// Create an empty cache; `name` is used for logging only
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            slot: RwLock::new(None),
        }
    }

    /// Get the cached value if present and not expired
    pub async fn get(&self) -> Option<T> {
        let slot = self.slot.read().await;
        match slot.as_ref() {
            Some(entry) if entry.expires_at > Instant::now() => {
                debug!(cache = self.name, "Cache hit");
                Some(entry.value.clone())
            }
            Some(_) => {
                debug!(cache = self.name, "Cache expired");
                None
            }
            None => {
                debug!(cache = self.name, "Cache miss");
                None
            }
        }
    }

    /// Store a value with the given TTL
    pub async fn set(&self, value: T, ttl: Duration) {
        let mut slot = self.slot.write().await;
        *slot = Some(Entry {
            value,
            expires_at: Instant::now() + ttl,
        });
        debug!(cache = self.name, ttl_secs = ttl.as_secs(), "Cache set");
    }

    /// Drop the cached value
    pub async fn invalidate(&self) {
        let mut slot = self.slot.write().await;
        *slot = None;
        debug!(cache = self.name, "Cache invalidated");
    }
}

/// Cache for the process-wide [`SearchSettings`] singleton.
///
/// The TTL comes from the settings themselves
/// (`settings_cache_timeout_secs`).
pub struct SettingsCache {
    inner: TtlCache<SearchSettings>,
}

impl SettingsCache {
    pub fn new() -> Self {
        Self {
            inner: TtlCache::new("search_settings"),
        }
    }

    /// Get the active settings, calling `loader` on a miss
    pub async fn get_or_load<F, Fut>(&self, loader: F) -> Result<SearchSettings>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<SearchSettings>>,
    {
        if let Some(settings) = self.inner.get().await {
            return Ok(settings);
        }

        let settings = loader().await?;
        let ttl = Duration::from_secs(settings.settings_cache_timeout_secs);
        self.inner.set(settings.clone(), ttl).await;
        Ok(settings)
    }

    /// Store updated settings, invalidating any cached copy first
    pub async fn store(&self, settings: SearchSettings) {
        self.inner.invalidate().await;
        let ttl = Duration::from_secs(settings.settings_cache_timeout_secs);
        self.inner.set(settings, ttl).await;
    }

    pub async fn invalidate(&self) {
        self.inner.invalidate().await;
    }
}

impl Default for SettingsCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_get_or_load_caches() {
        let cache = SettingsCache::new();

        let loaded = cache
            .get_or_load(|| async { Ok(SearchSettings::default()) })
            .await
            .unwrap();
        assert_eq!(loaded, SearchSettings::default());

        // Second lookup must not invoke the loader
        let cached = cache
            .get_or_load(|| async { panic!("loader called on warm cache") })
            .await
            .unwrap();
        assert_eq!(cached, loaded);
    }

    #[tokio::test]
    async fn test_store_replaces_cached_value() {
        let cache = SettingsCache::new();
        cache
            .get_or_load(|| async { Ok(SearchSettings::default()) })
            .await
            .unwrap();

        let mut updated = SearchSettings::default();
        updated.top_k_results = 9;
        cache.store(updated.clone()).await;

        let seen = cache
            .get_or_load(|| async { panic!("loader called after store") })
            .await
            .unwrap();
        assert_eq!(seen.top_k_results, 9);
    }

    #[tokio::test]
    async fn test_ttl_expiry() {
        let cache = TtlCache::new("test");
        cache.set(42u32, Duration::from_millis(10)).await;
        assert_eq!(cache.get().await, Some(42));

        tokio::time::sleep(Duration::from_millis(25)).await;
        assert_eq!(cache.get().await, None);
    }

    #[tokio::test]
    async fn test_invalidate() {
        let cache = TtlCache::new("test");
        cache.set("value".to_string(), Duration::from_secs(60)).await;
        cache.invalidate().await;
        assert!(cache.get().await.is_none());
    }
}
