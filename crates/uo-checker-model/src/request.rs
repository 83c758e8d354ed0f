// SPDX-License-Identifier: Apache-2.0

use crate::region::{canonical_prefecture, prefecture_from_city, PREFECTURES};
use serde::{Deserialize, Serialize};

pub const MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[non_exhaustive]
pub enum ValidationError {
    #[error("image is empty")]
    EmptyImage,
    #[error("image is {size} bytes; the limit is {limit} bytes")]
    ImageTooLarge { size: usize, limit: usize },
    #[error("region must not be blank")]
    BlankRegion,
    #[error("latitude and longitude must be given together")]
    PartialCoordinates,
    #[error("coordinates out of range: lat={latitude}, lon={longitude}")]
    CoordinatesOutOfRange { latitude: f64, longitude: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, ValidationError> {
        let in_range = latitude.is_finite()
            && longitude.is_finite()
            && (-90.0..=90.0).contains(&latitude)
            && (-180.0..=180.0).contains(&longitude);
        if !in_range {
            return Err(ValidationError::CoordinatesOutOfRange {
                latitude,
                longitude,
            });
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }

    /// Both halves or neither; a lone latitude or longitude is rejected.
    pub fn from_parts(
        latitude: Option<f64>,
        longitude: Option<f64>,
    ) -> Result<Option<Self>, ValidationError> {
        match (latitude, longitude) {
            (Some(lat), Some(lon)) => Self::new(lat, lon).map(Some),
            (None, None) => Ok(None),
            _ => Err(ValidationError::PartialCoordinates),
        }
    }
}

/// Where the catch happened, echoed back to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub region: String,
    pub locality: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lat: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lon: Option<f64>,
}

impl Location {
    #[must_use]
    pub fn coordinates(&self) -> Option<Coordinates> {
        match (self.lat, self.lon) {
            (Some(latitude), Some(longitude)) => Some(Coordinates {
                latitude,
                longitude,
            }),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IdentificationRequest {
    pub image: Vec<u8>,
    pub region: String,
    pub locality: Option<String>,
    pub coordinates: Option<Coordinates>,
}

impl IdentificationRequest {
    #[must_use]
    pub fn new(image: Vec<u8>, region: impl Into<String>) -> Self {
        Self {
            image,
            region: region.into(),
            locality: None,
            coordinates: None,
        }
    }

    #[must_use]
    pub fn with_locality(mut self, locality: impl Into<String>) -> Self {
        self.locality = Some(locality.into());
        self
    }

    #[must_use]
    pub fn with_coordinates(mut self, coordinates: Coordinates) -> Self {
        self.coordinates = Some(coordinates);
        self
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.image.is_empty() {
            return Err(ValidationError::EmptyImage);
        }
        if self.image.len() > MAX_IMAGE_BYTES {
            return Err(ValidationError::ImageTooLarge {
                size: self.image.len(),
                limit: MAX_IMAGE_BYTES,
            });
        }
        if self.region.trim().is_empty() {
            return Err(ValidationError::BlankRegion);
        }
        if let Some(c) = self.coordinates {
            Coordinates::new(c.latitude, c.longitude)?;
        }
        Ok(())
    }

    /// Location with the region canonicalized once for all downstream use.
    ///
    /// When the region is not a known prefecture but the locality is a known
    /// city, the city's prefecture wins.
    #[must_use]
    pub fn normalized_location(&self) -> Location {
        let locality = self
            .locality
            .as_deref()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string);
        let mut region = canonical_prefecture(&self.region);
        let known = PREFECTURES.iter().any(|(_, kanji)| *kanji == region);
        if !known {
            if let Some(pref) = locality.as_deref().and_then(prefecture_from_city) {
                region = pref.to_string();
            }
        }
        Location {
            region,
            locality,
            lat: self.coordinates.map(|c| c.latitude),
            lon: self.coordinates.map(|c| c.longitude),
        }
    }
}
