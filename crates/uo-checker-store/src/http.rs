// SPDX-License-Identifier: Apache-2.0

use crate::backend::{CachedRegulation, RegulationStore};
use crate::error::{StoreError, StoreErrorCode};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::{StatusCode, Url};
use std::time::Duration;
use tracing::instrument;
use uo_checker_model::CacheKey;

/// JSON document store reached over HTTP.
///
/// Documents live at `{base}/{collection}/{key}`; reads are `GET`, writes
/// `PUT`, and access bookkeeping is a `POST` to `.../{key}/touch`.
/// Each request is bounded by the client timeout and never retried.
pub struct HttpDocumentStore {
    client: reqwest::Client,
    base_url: Url,
    collection: String,
    auth_bearer: Option<String>,
}

impl HttpDocumentStore {
    pub fn new(
        base_url: &str,
        collection: &str,
        auth_bearer: Option<String>,
        timeout: Duration,
    ) -> Result<Self, StoreError> {
        let base_url = Url::parse(base_url.trim_end_matches('/')).map_err(|e| {
            StoreError::new(StoreErrorCode::Config, format!("invalid store url: {e}"))
        })?;
        if base_url.cannot_be_a_base() {
            return Err(StoreError::new(
                StoreErrorCode::Config,
                format!("store url cannot carry paths: {base_url}"),
            ));
        }
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| StoreError::new(StoreErrorCode::Config, format!("http client: {e}")))?;
        Ok(Self {
            client,
            base_url,
            collection: collection.to_string(),
            auth_bearer: auth_bearer.filter(|t| !t.is_empty()),
        })
    }

    fn doc_url(&self, key: &CacheKey, action: Option<&str>) -> Result<Url, StoreError> {
        let mut url = self.base_url.clone();
        {
            let mut segments = url.path_segments_mut().map_err(|()| {
                StoreError::new(StoreErrorCode::Config, "store url cannot carry paths")
            })?;
            segments.pop_if_empty().push(&self.collection).push(key.as_str());
            if let Some(action) = action {
                segments.push(action);
            }
        }
        Ok(url)
    }

    fn auth_headers(&self) -> Result<HeaderMap, StoreError> {
        let mut headers = HeaderMap::new();
        if let Some(token) = &self.auth_bearer {
            let value = HeaderValue::from_str(&format!("Bearer {token}")).map_err(|e| {
                StoreError::new(StoreErrorCode::Config, format!("invalid auth header: {e}"))
            })?;
            headers.insert(AUTHORIZATION, value);
        }
        Ok(headers)
    }
}

fn status_error(op: &str, status: StatusCode, url: &Url) -> StoreError {
    StoreError::new(
        StoreErrorCode::Network,
        format!("{op} failed status={status} url={url}"),
    )
}

#[async_trait]
impl RegulationStore for HttpDocumentStore {
    fn backend_tag(&self) -> &'static str {
        "http"
    }

    #[instrument(name = "store_http_get", skip_all, fields(key = %key))]
    async fn get(&self, key: &CacheKey) -> Result<Option<CachedRegulation>, StoreError> {
        let url = self.doc_url(key, None)?;
        let resp = self
            .client
            .get(url.clone())
            .headers(self.auth_headers()?)
            .send()
            .await?;
        match resp.status() {
            StatusCode::NOT_FOUND => Ok(None),
            s if s.is_success() => {
                let bytes = resp.bytes().await?;
                Ok(Some(serde_json::from_slice(&bytes)?))
            }
            s => Err(status_error("get", s, &url)),
        }
    }

    #[instrument(name = "store_http_put", skip_all, fields(key = %key))]
    async fn put(&self, key: &CacheKey, entry: &CachedRegulation) -> Result<(), StoreError> {
        let url = self.doc_url(key, None)?;
        let resp = self
            .client
            .put(url.clone())
            .headers(self.auth_headers()?)
            .json(entry)
            .send()
            .await?;
        if resp.status().is_success() {
            Ok(())
        } else {
            Err(status_error("put", resp.status(), &url))
        }
    }

    #[instrument(name = "store_http_touch", skip_all, fields(key = %key))]
    async fn touch(&self, key: &CacheKey, accessed_at: &str) -> Result<(), StoreError> {
        let url = self.doc_url(key, Some("touch"))?;
        let resp = self
            .client
            .post(url.clone())
            .headers(self.auth_headers()?)
            .json(&serde_json::json!({ "lastAccessed": accessed_at }))
            .send()
            .await?;
        match resp.status() {
            s if s.is_success() || s == StatusCode::NOT_FOUND => Ok(()),
            s => Err(status_error("touch", s, &url)),
        }
    }
}
