// src/cache.rs
//
// The two cache tiers of the resolution engine.
//
// - `TtlCell`: minutes-scale cache for one upstream snapshot (the
//   launch-curve catalog). On expiry exactly one refetch runs; concurrent
//   callers await the same refresh instead of each refetching.
// - `CatalogCache`: process-lifetime store of the enriched token catalog
//   behind an explicit version key. Changing the key invalidates the whole
//   tier atomically; there is no per-entry expiry.
//
// Both tiers are plain injectable instances so tests can substitute a
// fresh one per test. Cache failures degrade to "no caching this call";
// they never fail a resolution.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;
use std::time::{Duration, Instant};

use indexmap::IndexMap;
use log::{debug, warn};
use tokio::sync::Mutex;

use crate::errors::AdapterError;
use crate::identifier::TokenIdentifier;
use crate::metrics;
use crate::types::TokenRecord;

struct TtlEntry<T> {
    payload: T,
    expires_at: Instant,
}

/// Short-TTL cache cell holding one value of type `T`.
pub struct TtlCell<T> {
    name: &'static str,
    ttl: Duration,
    // Held across the refetch so expiry triggers exactly one upstream
    // call, shared by every concurrent caller.
    state: Mutex<Option<TtlEntry<T>>>,
}

impl<T: Clone> TtlCell<T> {
    pub fn new(name: &'static str, ttl: Duration) -> Self {
        Self {
            name,
            ttl,
            state: Mutex::new(None),
        }
    }

    /// Return the cached value, refetching through `fetch` when expired.
    ///
    /// A failed refetch falls back to the stale value when one exists
    /// (the previous snapshot beats no data), and `None` otherwise.
    pub async fn get_or_refresh<F, Fut>(&self, fetch: F) -> Option<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, AdapterError>>,
    {
        let mut guard = self.state.lock().await;

        if let Some(entry) = guard.as_ref() {
            if entry.expires_at > Instant::now() {
                metrics::increment_cache_hit(self.name);
                return Some(entry.payload.clone());
            }
        }
        metrics::increment_cache_miss(self.name);

        match fetch().await {
            Ok(payload) => {
                *guard = Some(TtlEntry {
                    payload: payload.clone(),
                    expires_at: Instant::now() + self.ttl,
                });
                Some(payload)
            }
            Err(e) => {
                warn!("{}: refresh failed, serving stale if any: {}", self.name, e);
                guard.as_ref().map(|entry| entry.payload.clone())
            }
        }
    }

    pub async fn invalidate(&self) {
        *self.state.lock().await = None;
    }
}

/// Process-lifetime store of the enriched token catalog.
///
/// Entries are keyed by canonical identifier and kept in insertion order
/// so `list` is stable across calls. The tier is built once (single-flight)
/// and only an explicit version-key change invalidates it.
pub struct CatalogCache {
    version_key: RwLock<String>,
    entries: RwLock<IndexMap<String, TokenRecord>>,
    built: AtomicBool,
    build_lock: Mutex<()>,
}

impl CatalogCache {
    pub fn new(version_key: &str) -> Self {
        Self {
            version_key: RwLock::new(version_key.to_string()),
            entries: RwLock::new(IndexMap::new()),
            built: AtomicBool::new(false),
            build_lock: Mutex::new(()),
        }
    }

    pub fn is_built(&self) -> bool {
        self.built.load(Ordering::Acquire)
    }

    /// Adopt `version_key`, atomically dropping the whole tier when it
    /// differs from the current key. Used when enrichment logic changes.
    pub fn set_version_key(&self, version_key: &str) {
        let mut current = self
            .version_key
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if *current != version_key {
            debug!(
                "catalog version key {} -> {}, invalidating tier",
                *current, version_key
            );
            *current = version_key.to_string();
            drop(current);
            self.built.store(false, Ordering::Release);
            self.entries
                .write()
                .unwrap_or_else(|poisoned| poisoned.into_inner())
                .clear();
        }
    }

    /// Return the catalog, building it through `build` on first call.
    /// Concurrent first calls share one build. A failed build returns
    /// whatever the tier currently holds (usually empty) and leaves the
    /// tier unbuilt so the next call retries.
    pub async fn get_or_build<F, Fut>(&self, build: F) -> Vec<TokenRecord>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = anyhow::Result<Vec<TokenRecord>>>,
    {
        if self.is_built() {
            metrics::increment_cache_hit("catalog");
            return self.list();
        }

        let _guard = self.build_lock.lock().await;
        if self.is_built() {
            metrics::increment_cache_hit("catalog");
            return self.list();
        }
        metrics::increment_cache_miss("catalog");

        match build().await {
            Ok(records) => self.install(records),
            Err(e) => {
                warn!("catalog build failed, serving current tier: {}", e);
            }
        }
        self.list()
    }

    /// Install a freshly built catalog wholesale, marking the tier built.
    pub fn install(&self, records: Vec<TokenRecord>) {
        let mut entries = self
            .entries
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        entries.clear();
        for record in records {
            entries.insert(record.identifier.canonical().to_string(), record);
        }
        metrics::set_cache_size("catalog", entries.len() as f64);
        metrics::set_catalog_size(entries.len() as f64);
        drop(entries);
        self.built.store(true, Ordering::Release);
    }

    /// Canonical-equality lookup first, then the prefix-overlap fallback.
    pub fn lookup(&self, identifier: &TokenIdentifier) -> Option<TokenRecord> {
        let entries = self
            .entries
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(record) = entries.get(identifier.canonical()) {
            metrics::increment_cache_hit("catalog_lookup");
            return Some(record.clone());
        }
        let found = entries
            .iter()
            .find(|(key, _)| identifier.matches(key))
            .map(|(_, record)| record.clone());
        if found.is_some() {
            metrics::increment_cache_hit("catalog_lookup");
        } else {
            metrics::increment_cache_miss("catalog_lookup");
        }
        found
    }

    /// Write-through of a freshly resolved record.
    pub fn upsert(&self, record: TokenRecord) {
        let mut entries = self
            .entries
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        entries.insert(record.identifier.canonical().to_string(), record);
        metrics::set_cache_size("catalog", entries.len() as f64);
    }

    pub fn list(&self) -> Vec<TokenRecord> {
        self.entries
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .values()
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_ttl_cell_caches_within_ttl() {
        let cell = TtlCell::new("test", Duration::from_secs(60));
        let calls = AtomicU32::new(0);

        for _ in 0..3 {
            let value = cell
                .get_or_refresh(|| async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, AdapterError>(42u32)
                })
                .await;
            assert_eq!(value, Some(42));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1, "only the first call fetches");
    }

    #[tokio::test]
    async fn test_ttl_cell_expiry_triggers_single_shared_refetch() {
        let cell = Arc::new(TtlCell::new("test", Duration::from_millis(10)));
        let calls = Arc::new(AtomicU32::new(0));

        // Prime, then let it expire.
        cell.get_or_refresh(|| async { Ok::<_, AdapterError>(1u32) })
            .await;
        tokio::time::sleep(Duration::from_millis(20)).await;

        let mut handles = Vec::new();
        for _ in 0..4 {
            let cell = cell.clone();
            let calls = calls.clone();
            handles.push(tokio::spawn(async move {
                cell.get_or_refresh(|| async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(30)).await;
                    Ok::<_, AdapterError>(2u32)
                })
                .await
            }));
        }
        for handle in handles {
            assert_eq!(handle.await.unwrap(), Some(2));
        }
        assert_eq!(
            calls.load(Ordering::SeqCst),
            1,
            "expiry refetch is shared across concurrent callers"
        );
    }

    #[tokio::test]
    async fn test_ttl_cell_serves_stale_on_refresh_failure() {
        let cell = TtlCell::new("test", Duration::from_millis(5));
        cell.get_or_refresh(|| async { Ok::<_, AdapterError>(7u32) })
            .await;
        tokio::time::sleep(Duration::from_millis(10)).await;

        let value = cell
            .get_or_refresh(|| async {
                Err::<u32, _>(AdapterError::Unavailable("down".into()))
            })
            .await;
        assert_eq!(value, Some(7), "stale payload beats no data");
    }

    #[tokio::test]
    async fn test_catalog_builds_once_and_invalidates_on_version_change() {
        use crate::identifier::TokenIdentifier;

        let cache = CatalogCache::new("v1");
        let calls = AtomicU32::new(0);

        let build = |n: u32| {
            let record = TokenRecord::placeholder(TokenIdentifier::new(&format!(
                "{:064x}",
                n
            )));
            vec![record]
        };

        for _ in 0..2 {
            let listed = cache
                .get_or_build(|| async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(build(1))
                })
                .await;
            assert_eq!(listed.len(), 1);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        // Same key: no invalidation. New key: tier drops and rebuilds.
        cache.set_version_key("v1");
        assert!(cache.is_built());
        cache.set_version_key("v2");
        assert!(!cache.is_built());
        assert!(cache.is_empty());

        let listed = cache
            .get_or_build(|| async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(build(2))
            })
            .await;
        assert_eq!(listed.len(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_catalog_lookup_prefix_overlap() {
        use crate::identifier::TokenIdentifier;

        let hash = "40bd4a45c414df61be3832e28ff6dcedc479744707c611fd97fea0d90619146f";
        let cache = CatalogCache::new("v1");
        cache.upsert(TokenRecord::placeholder(TokenIdentifier::new(hash)));

        assert!(cache
            .lookup(&TokenIdentifier::new(&format!("hash-{}", hash)))
            .is_some());
        assert!(cache.lookup(&TokenIdentifier::new(&hash[..20])).is_some());
        assert!(cache
            .lookup(&TokenIdentifier::new("deadbeefdeadbeefdeadbeef"))
            .is_none());
    }
}
