// SPDX-License-Identifier: Apache-2.0

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use uo_checker_model::{canonical_prefecture, Coordinates, IdentificationRequest};

/// JSON body of `POST /v1/identify`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IdentifyRequestBody {
    /// Base64 image bytes; a `data:*;base64,` prefix is tolerated.
    pub image: String,
    pub region: String,
    #[serde(default)]
    pub locality: Option<String>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
}

impl IdentifyRequestBody {
    /// Decodes the image and pairs the coordinates. Content checks (empty
    /// image, size, blank region) are left to request validation.
    pub fn into_request(self) -> Result<IdentificationRequest, String> {
        let payload = match self.image.split_once(";base64,") {
            Some((prefix, rest)) if prefix.starts_with("data:") => rest,
            _ => self.image.as_str(),
        };
        let image = STANDARD
            .decode(payload.trim())
            .map_err(|e| format!("image is not valid base64: {e}"))?;
        let coordinates =
            Coordinates::from_parts(self.latitude, self.longitude).map_err(|e| e.to_string())?;
        Ok(IdentificationRequest {
            image,
            region: self.region,
            locality: self.locality,
            coordinates,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheKeyQuery {
    pub region: String,
    pub species: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheKeyResponse {
    pub cache_key: String,
    pub region: String,
    pub species: String,
}

impl CacheKeyResponse {
    #[must_use]
    pub fn derive(query: &CacheKeyQuery) -> Self {
        Self {
            cache_key: uo_checker_model::CacheKey::new(&query.region, &query.species).into_inner(),
            region: canonical_prefecture(&query.region),
            species: query.species.trim().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body(image: &str) -> IdentifyRequestBody {
        IdentifyRequestBody {
            image: image.to_string(),
            region: "兵庫県".to_string(),
            locality: None,
            latitude: None,
            longitude: None,
        }
    }

    #[test]
    fn decodes_plain_and_data_url_images() {
        assert_eq!(body("AQID").into_request().expect("plain").image, vec![1, 2, 3]);
        assert_eq!(
            body("data:image/jpeg;base64,AQID")
                .into_request()
                .expect("data url")
                .image,
            vec![1, 2, 3]
        );
    }

    #[test]
    fn rejects_bad_base64_and_half_coordinates() {
        assert!(body("***").into_request().is_err());
        let mut b = body("AQID");
        b.latitude = Some(34.6);
        assert!(b.into_request().is_err());
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let raw = r#"{"image":"AQID","region":"兵庫県","extra":1}"#;
        assert!(serde_json::from_str::<IdentifyRequestBody>(raw).is_err());
    }

    #[test]
    fn cache_key_response_echoes_canonical_region() {
        let r = CacheKeyResponse::derive(&CacheKeyQuery {
            region: "Hyogo".to_string(),
            species: " サバ ".to_string(),
        });
        assert_eq!(r.cache_key, "兵庫-サバ");
        assert_eq!(r.region, "兵庫県");
        assert_eq!(r.species, "サバ");
    }
}
