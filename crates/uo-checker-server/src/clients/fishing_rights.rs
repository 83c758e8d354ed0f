// SPDX-License-Identifier: Apache-2.0

use super::{http_client, status_error, ClientError, ClientErrorKind};
use crate::config::FishingRightsConfig;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};
use reqwest::{StatusCode, Url};
use serde_json::Value;
use tracing::instrument;
use uo_checker_model::{strip_admin_suffix, Coordinates};

#[derive(Debug, Clone, PartialEq)]
pub enum FishingRightsQuery {
    Near {
        coordinates: Coordinates,
        radius_m: u32,
    },
    /// Canonical prefecture name; the administrative suffix is dropped on the wire.
    Prefecture(String),
}

impl FishingRightsQuery {
    fn query_pairs(&self) -> Vec<(&'static str, String)> {
        match self {
            Self::Near {
                coordinates,
                radius_m,
            } => vec![
                ("lat", coordinates.latitude.to_string()),
                ("lon", coordinates.longitude.to_string()),
                ("radius", radius_m.to_string()),
            ],
            Self::Prefecture(name) => vec![("prefecture", strip_admin_suffix(name).to_string())],
        }
    }
}

#[async_trait]
pub trait FishingRightsService: Send + Sync + 'static {
    /// Raw features; an empty list means no rights were found.
    async fn lookup(&self, query: &FishingRightsQuery) -> Result<Vec<Value>, ClientError>;
}

pub struct MsilClient {
    client: reqwest::Client,
    endpoint: Url,
    subscription_key: Option<String>,
}

impl MsilClient {
    pub fn new(cfg: &FishingRightsConfig) -> Result<Self, ClientError> {
        let endpoint = Url::parse(&cfg.endpoint).map_err(|e| {
            ClientError::new(
                ClientErrorKind::Config,
                format!("invalid fishing-rights endpoint: {e}"),
            )
        })?;
        Ok(Self {
            client: http_client(cfg.timeout)?,
            endpoint,
            subscription_key: cfg.subscription_key.clone(),
        })
    }

    fn url_for(&self, query: &FishingRightsQuery) -> Url {
        let mut url = self.endpoint.clone();
        {
            let mut pairs = url.query_pairs_mut();
            for (k, v) in query.query_pairs() {
                pairs.append_pair(k, &v);
            }
        }
        url
    }

    fn headers(&self) -> Result<HeaderMap, ClientError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static(concat!("uo-checker/", env!("CARGO_PKG_VERSION"))),
        );
        if let Some(key) = &self.subscription_key {
            let value = HeaderValue::from_str(key).map_err(|e| {
                ClientError::new(ClientErrorKind::Config, format!("invalid subscription key: {e}"))
            })?;
            headers.insert("Ocp-Apim-Subscription-Key", value);
        }
        Ok(headers)
    }
}

/// Accepts a GeoJSON feature collection or a bare array.
pub(crate) fn features_of(payload: Value) -> Result<Vec<Value>, ClientError> {
    match payload {
        Value::Array(items) => Ok(items),
        Value::Object(mut map) => match map.remove("features") {
            Some(Value::Array(items)) => Ok(items),
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(_) => Err(ClientError::new(
                ClientErrorKind::Decode,
                "`features` is not an array",
            )),
        },
        _ => Err(ClientError::new(
            ClientErrorKind::Decode,
            "fishing-rights reply is neither an object nor an array",
        )),
    }
}

#[async_trait]
impl FishingRightsService for MsilClient {
    #[instrument(name = "fishing_rights_lookup", skip_all)]
    async fn lookup(&self, query: &FishingRightsQuery) -> Result<Vec<Value>, ClientError> {
        let resp = self
            .client
            .get(self.url_for(query))
            .headers(self.headers()?)
            .send()
            .await?;
        match resp.status() {
            StatusCode::NOT_FOUND => Ok(Vec::new()),
            s if s.is_success() => features_of(resp.json().await?),
            s => {
                let body = resp.text().await.unwrap_or_default();
                Err(status_error("fishing-rights lookup", s, &body))
            }
        }
    }
}
