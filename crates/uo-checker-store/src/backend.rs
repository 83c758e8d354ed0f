// SPDX-License-Identifier: Apache-2.0

use crate::error::{StoreError, StoreErrorCode};
use crate::{HttpDocumentStore, MemoryStore, SqliteStore};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use uo_checker_model::{CacheKey, RegulationRecord};

/// A stored record plus the bookkeeping kept next to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedRegulation {
    pub record: RegulationRecord,
    pub created_at: String,
    pub last_accessed: String,
    pub access_count: u64,
}

impl CachedRegulation {
    #[must_use]
    pub fn fresh(record: RegulationRecord, now: impl Into<String>) -> Self {
        let now = now.into();
        Self {
            record,
            created_at: now.clone(),
            last_accessed: now,
            access_count: 1,
        }
    }
}

#[async_trait]
pub trait RegulationStore: Send + Sync + 'static {
    fn backend_tag(&self) -> &'static str;

    /// Reads an entry without touching its access metadata.
    async fn get(&self, key: &CacheKey) -> Result<Option<CachedRegulation>, StoreError>;

    /// Upserts; a concurrent write to the same key simply wins or loses.
    async fn put(&self, key: &CacheKey, entry: &CachedRegulation) -> Result<(), StoreError>;

    /// Records a read: bumps the access count and last-accessed time.
    async fn touch(&self, key: &CacheKey, accessed_at: &str) -> Result<(), StoreError>;
}

/// Which backend to open, parsed from `memory`, `sqlite:PATH` or an http(s) URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreBackendSpec {
    Memory,
    Sqlite(PathBuf),
    Http(String),
}

impl FromStr for StoreBackendSpec {
    type Err = StoreError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let raw = raw.trim();
        if raw == "memory" {
            return Ok(Self::Memory);
        }
        if let Some(path) = raw.strip_prefix("sqlite:") {
            if path.is_empty() {
                return Err(StoreError::new(
                    StoreErrorCode::Config,
                    "sqlite store needs a path: sqlite:PATH",
                ));
            }
            return Ok(Self::Sqlite(PathBuf::from(path)));
        }
        if raw.starts_with("http://") || raw.starts_with("https://") {
            return Ok(Self::Http(raw.to_string()));
        }
        if let Some(url) = raw.strip_prefix("http:") {
            if url.starts_with("http://") || url.starts_with("https://") {
                return Ok(Self::Http(url.to_string()));
            }
        }
        Err(StoreError::new(
            StoreErrorCode::Config,
            format!("unknown store backend `{raw}`; expected memory, sqlite:PATH or an http(s) URL"),
        ))
    }
}

#[derive(Debug, Clone)]
pub struct HttpStoreOptions {
    pub collection: String,
    pub bearer: Option<String>,
    pub timeout: Duration,
}

impl Default for HttpStoreOptions {
    fn default() -> Self {
        Self {
            collection: "fish_regulations".to_string(),
            bearer: None,
            timeout: Duration::from_secs(5),
        }
    }
}

pub fn open_store(
    spec: &StoreBackendSpec,
    http: &HttpStoreOptions,
) -> Result<Arc<dyn RegulationStore>, StoreError> {
    Ok(match spec {
        StoreBackendSpec::Memory => Arc::new(MemoryStore::default()),
        StoreBackendSpec::Sqlite(path) => Arc::new(SqliteStore::open(path)?),
        StoreBackendSpec::Http(url) => Arc::new(HttpDocumentStore::new(
            url,
            &http.collection,
            http.bearer.clone(),
            http.timeout,
        )?),
    })
}
