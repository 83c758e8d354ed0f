// SPDX-License-Identifier: Apache-2.0

#![forbid(unsafe_code)]

mod backend;
mod cache;
mod error;
mod http;
mod memory;
mod sqlite;

pub use backend::{open_store, CachedRegulation, HttpStoreOptions, RegulationStore, StoreBackendSpec};
pub use cache::RegulationCache;
pub use error::{StoreError, StoreErrorCode};
pub use http::HttpDocumentStore;
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

pub const CRATE_NAME: &str = "uo-checker-store";
