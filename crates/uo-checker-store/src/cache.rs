// SPDX-License-Identifier: Apache-2.0

use crate::backend::{CachedRegulation, RegulationStore};
use chrono::{SecondsFormat, Utc};
use std::sync::Arc;
use tracing::{debug, warn};
use uo_checker_model::{CacheKey, RegulationRecord};

/// Read-through cache in front of a [`RegulationStore`].
///
/// Never fails: store errors are logged and surface as a miss (reads) or
/// `false` (writes).
#[derive(Clone)]
pub struct RegulationCache {
    store: Arc<dyn RegulationStore>,
}

fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

impl RegulationCache {
    #[must_use]
    pub fn new(store: Arc<dyn RegulationStore>) -> Self {
        Self { store }
    }

    #[must_use]
    pub fn backend_tag(&self) -> &'static str {
        self.store.backend_tag()
    }

    #[must_use]
    pub fn store(&self) -> &Arc<dyn RegulationStore> {
        &self.store
    }

    pub async fn get(&self, key: &CacheKey) -> Option<RegulationRecord> {
        match self.store.get(key).await {
            Ok(Some(entry)) => {
                if let Err(e) = self.store.touch(key, &now_rfc3339()).await {
                    warn!(cache_key = %key, backend = self.backend_tag(), error = %e, "cache access bookkeeping failed");
                }
                debug!(cache_key = %key, access_count = entry.access_count + 1, "cache hit");
                Some(entry.record)
            }
            Ok(None) => {
                debug!(cache_key = %key, "cache miss");
                None
            }
            Err(e) => {
                warn!(cache_key = %key, backend = self.backend_tag(), error = %e, "cache read failed; treating as miss");
                None
            }
        }
    }

    pub async fn put(&self, key: &CacheKey, record: &RegulationRecord) -> bool {
        let entry = CachedRegulation::fresh(record.clone(), now_rfc3339());
        match self.store.put(key, &entry).await {
            Ok(()) => {
                debug!(cache_key = %key, "cached regulation record");
                true
            }
            Err(e) => {
                warn!(cache_key = %key, backend = self.backend_tag(), error = %e, "cache write failed");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryStore;
    use std::sync::atomic::Ordering;
    use uo_checker_model::RecordContext;

    fn record() -> RegulationRecord {
        RegulationRecord::fallback(
            RecordContext {
                species: "サバ",
                region: "兵庫県",
                locality: None,
                generated_by: "t",
                generated_at: "2026-01-01T00:00:00Z",
            },
            "x",
        )
    }

    #[tokio::test]
    async fn hit_bumps_access_metadata() {
        let store = Arc::new(MemoryStore::default());
        let cache = RegulationCache::new(store.clone());
        let key = CacheKey::new("兵庫県", "サバ");
        assert!(cache.put(&key, &record()).await);
        assert_eq!(cache.get(&key).await, Some(record()));
        assert_eq!(cache.get(&key).await, Some(record()));
        let entry = store.entries.lock().await.get(&key).cloned().expect("entry");
        assert_eq!(entry.access_count, 3);
        assert_eq!(store.touch_calls.load(Ordering::Relaxed), 2);
    }

    #[tokio::test]
    async fn failing_store_degrades() {
        let store = Arc::new(MemoryStore::failing());
        let cache = RegulationCache::new(store.clone());
        let key = CacheKey::new("大阪", "アジ");
        assert!(!cache.put(&key, &record()).await);
        assert_eq!(cache.get(&key).await, None);
        assert_eq!(store.get_calls.load(Ordering::Relaxed), 1);
    }
}
