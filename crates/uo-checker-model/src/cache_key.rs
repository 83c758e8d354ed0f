// SPDX-License-Identifier: Apache-2.0

use crate::region::region_key_part;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Species component of a cache key: trimmed, lower-cased, spaces to hyphens.
#[must_use]
pub fn species_key_part(species: &str) -> String {
    species.trim().to_lowercase().replace(' ', "-")
}

/// Lookup key for one (region, species) pair in the regulation cache.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CacheKey(String);

impl CacheKey {
    #[must_use]
    pub fn new(region: &str, species: &str) -> Self {
        Self(format!(
            "{}-{}",
            region_key_part(region),
            species_key_part(species)
        ))
    }

    /// Wraps a key read back from storage without re-deriving it.
    #[must_use]
    pub fn from_stored(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl Display for CacheKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hyogo_mackerel_key() {
        assert_eq!(CacheKey::new("兵庫県", "サバ").as_str(), "兵庫-サバ");
    }

    #[test]
    fn english_species_is_lowercased_and_hyphenated() {
        assert_eq!(
            CacheKey::new("Osaka", " Horse Mackerel ").as_str(),
            "大阪-horse-mackerel"
        );
    }
}
