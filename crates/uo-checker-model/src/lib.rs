// SPDX-License-Identifier: Apache-2.0

#![forbid(unsafe_code)]
//! Domain model for fish regulation lookups.
//!
//! Everything here is pure: region canonicalization, cache key derivation,
//! request validation, the canonical regulation record and its fallback and
//! backfill rules. Network and storage concerns live in the store and server
//! crates.

mod cache_key;
mod fishing_rights;
mod record;
mod region;
mod request;

pub use cache_key::{species_key_part, CacheKey};
pub use fishing_rights::{FishingRightDetail, FishingRights, MAX_DETAIL_ROWS, MAX_LISTED_SPECIES};
pub use record::{
    Confidence, LegalStatus, RecordContext, RegulationRecord, UNKNOWN_EXPLANATION, UNKNOWN_TEXT,
};
pub use region::{
    canonical_prefecture, fold_diacritics, prefecture_from_city, region_key_part,
    strip_admin_suffix, PREFECTURES,
};
pub use request::{
    Coordinates, IdentificationRequest, Location, ValidationError, MAX_IMAGE_BYTES,
};

pub const CRATE_NAME: &str = "uo-checker-model";
