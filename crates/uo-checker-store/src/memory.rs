// SPDX-License-Identifier: Apache-2.0

use crate::backend::{CachedRegulation, RegulationStore};
use crate::error::{StoreError, StoreErrorCode};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tokio::sync::Mutex;
use uo_checker_model::CacheKey;

/// In-process store for development and tests.
///
/// Counts every call and can be switched into a failing mode to exercise
/// the cache's degrade-to-miss path.
#[derive(Default)]
pub struct MemoryStore {
    pub entries: Mutex<HashMap<CacheKey, CachedRegulation>>,
    pub get_calls: AtomicU64,
    pub put_calls: AtomicU64,
    pub touch_calls: AtomicU64,
    pub fail: AtomicBool,
}

impl MemoryStore {
    #[must_use]
    pub fn failing() -> Self {
        let store = Self::default();
        store.fail.store(true, Ordering::Relaxed);
        store
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::Relaxed);
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.fail.load(Ordering::Relaxed) {
            return Err(StoreError::new(
                StoreErrorCode::Unavailable,
                "memory store is in failing mode",
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl RegulationStore for MemoryStore {
    fn backend_tag(&self) -> &'static str {
        "memory"
    }

    async fn get(&self, key: &CacheKey) -> Result<Option<CachedRegulation>, StoreError> {
        self.get_calls.fetch_add(1, Ordering::Relaxed);
        self.check()?;
        Ok(self.entries.lock().await.get(key).cloned())
    }

    async fn put(&self, key: &CacheKey, entry: &CachedRegulation) -> Result<(), StoreError> {
        self.put_calls.fetch_add(1, Ordering::Relaxed);
        self.check()?;
        self.entries.lock().await.insert(key.clone(), entry.clone());
        Ok(())
    }

    async fn touch(&self, key: &CacheKey, accessed_at: &str) -> Result<(), StoreError> {
        self.touch_calls.fetch_add(1, Ordering::Relaxed);
        self.check()?;
        if let Some(entry) = self.entries.lock().await.get_mut(key) {
            entry.last_accessed = accessed_at.to_string();
            entry.access_count = entry.access_count.saturating_add(1);
        }
        Ok(())
    }
}
