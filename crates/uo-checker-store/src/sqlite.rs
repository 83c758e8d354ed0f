// SPDX-License-Identifier: Apache-2.0

use crate::backend::{CachedRegulation, RegulationStore};
use crate::error::{StoreError, StoreErrorCode};
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use uo_checker_model::CacheKey;

const SCHEMA_SQL: &str = "
CREATE TABLE IF NOT EXISTS regulation_cache (
    cache_key     TEXT PRIMARY KEY,
    record_json   TEXT NOT NULL,
    created_at    TEXT NOT NULL,
    last_accessed TEXT NOT NULL,
    access_count  INTEGER NOT NULL DEFAULT 1
);
";

/// Persistent cache in a single SQLite file.
///
/// One connection behind a mutex; every statement runs on the blocking pool.
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| {
                StoreError::new(
                    StoreErrorCode::Io,
                    format!("create {} failed: {e}", parent.display()),
                )
            })?;
        }
        Self::init(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.busy_timeout(Duration::from_secs(5))?;
        conn.execute_batch(SCHEMA_SQL)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    async fn run<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T, StoreError> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let guard = conn.lock().map_err(|_| {
                StoreError::new(StoreErrorCode::Internal, "sqlite connection lock poisoned")
            })?;
            f(&guard)
        })
        .await
        .map_err(|e| StoreError::new(StoreErrorCode::Internal, format!("sqlite task failed: {e}")))?
    }

    /// Number of cached entries.
    pub async fn len(&self) -> Result<u64, StoreError> {
        self.run(|conn| {
            let n: i64 = conn.query_row("SELECT COUNT(*) FROM regulation_cache", [], |r| r.get(0))?;
            Ok(u64::try_from(n).unwrap_or(0))
        })
        .await
    }
}

#[async_trait]
impl RegulationStore for SqliteStore {
    fn backend_tag(&self) -> &'static str {
        "sqlite"
    }

    async fn get(&self, key: &CacheKey) -> Result<Option<CachedRegulation>, StoreError> {
        let key = key.as_str().to_string();
        self.run(move |conn| {
            let row = conn
                .query_row(
                    "SELECT record_json, created_at, last_accessed, access_count
                     FROM regulation_cache WHERE cache_key = ?1",
                    params![key],
                    |r| {
                        Ok((
                            r.get::<_, String>(0)?,
                            r.get::<_, String>(1)?,
                            r.get::<_, String>(2)?,
                            r.get::<_, i64>(3)?,
                        ))
                    },
                )
                .optional()?;
            let Some((record_json, created_at, last_accessed, count)) = row else {
                return Ok(None);
            };
            Ok(Some(CachedRegulation {
                record: serde_json::from_str(&record_json)?,
                created_at,
                last_accessed,
                access_count: u64::try_from(count).unwrap_or(0),
            }))
        })
        .await
    }

    async fn put(&self, key: &CacheKey, entry: &CachedRegulation) -> Result<(), StoreError> {
        let key = key.as_str().to_string();
        let record_json = serde_json::to_string(&entry.record)?;
        let created_at = entry.created_at.clone();
        let last_accessed = entry.last_accessed.clone();
        let count = i64::try_from(entry.access_count).unwrap_or(i64::MAX);
        self.run(move |conn| {
            conn.execute(
                "INSERT INTO regulation_cache (cache_key, record_json, created_at, last_accessed, access_count)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(cache_key) DO UPDATE SET
                   record_json = excluded.record_json,
                   created_at = excluded.created_at,
                   last_accessed = excluded.last_accessed,
                   access_count = excluded.access_count",
                params![key, record_json, created_at, last_accessed, count],
            )?;
            Ok(())
        })
        .await
    }

    async fn touch(&self, key: &CacheKey, accessed_at: &str) -> Result<(), StoreError> {
        let key = key.as_str().to_string();
        let accessed_at = accessed_at.to_string();
        self.run(move |conn| {
            conn.execute(
                "UPDATE regulation_cache
                 SET last_accessed = ?2, access_count = access_count + 1
                 WHERE cache_key = ?1",
                params![key, accessed_at],
            )?;
            Ok(())
        })
        .await
    }
}
