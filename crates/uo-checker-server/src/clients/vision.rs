// SPDX-License-Identifier: Apache-2.0

use super::{http_client, json_body, ClientError, ClientErrorKind};
use crate::config::VisionConfig;
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use reqwest::Url;
use serde_json::{json, Value};
use tracing::instrument;

#[derive(Debug, Clone, PartialEq)]
pub struct Annotation {
    pub description: String,
    pub score: f64,
}

impl Annotation {
    pub fn new(description: impl Into<String>, score: f64) -> Self {
        Self {
            description: description.into(),
            score,
        }
    }
}

/// Label and web-entity guesses for one image, each sorted by descending score.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImageAnnotations {
    pub labels: Vec<Annotation>,
    pub web_entities: Vec<Annotation>,
}

impl ImageAnnotations {
    #[must_use]
    pub fn new(mut labels: Vec<Annotation>, mut web_entities: Vec<Annotation>) -> Self {
        sort_by_score(&mut labels);
        sort_by_score(&mut web_entities);
        Self {
            labels,
            web_entities,
        }
    }
}

fn sort_by_score(items: &mut [Annotation]) {
    items.sort_by(|a, b| b.score.total_cmp(&a.score));
}

#[async_trait]
pub trait VisionService: Send + Sync + 'static {
    fn backend_tag(&self) -> &'static str;

    async fn annotate(&self, image: &[u8]) -> Result<ImageAnnotations, ClientError>;
}

pub struct GoogleVisionClient {
    client: reqwest::Client,
    endpoint: Url,
    max_results: u32,
}

impl GoogleVisionClient {
    pub fn new(cfg: &VisionConfig) -> Result<Self, ClientError> {
        let mut endpoint = Url::parse(&cfg.endpoint).map_err(|e| {
            ClientError::new(ClientErrorKind::Config, format!("invalid vision endpoint: {e}"))
        })?;
        if let Some(key) = &cfg.api_key {
            endpoint.query_pairs_mut().append_pair("key", key);
        }
        Ok(Self {
            client: http_client(cfg.timeout)?,
            endpoint,
            max_results: cfg.max_results,
        })
    }
}

#[async_trait]
impl VisionService for GoogleVisionClient {
    fn backend_tag(&self) -> &'static str {
        "google-vision"
    }

    #[instrument(name = "vision_annotate", skip_all, fields(image_bytes = image.len()))]
    async fn annotate(&self, image: &[u8]) -> Result<ImageAnnotations, ClientError> {
        let body = json!({
            "requests": [{
                "image": { "content": STANDARD.encode(image) },
                "features": [
                    { "type": "LABEL_DETECTION", "maxResults": self.max_results },
                    { "type": "WEB_DETECTION", "maxResults": self.max_results },
                ],
            }],
        });
        let resp = self
            .client
            .post(self.endpoint.clone())
            .json(&body)
            .send()
            .await?;
        parse_annotate_response(&json_body(resp, "annotate").await?)
    }
}

fn annotations_at(node: Option<&Value>) -> Vec<Annotation> {
    node.and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| {
                    let description = item.get("description")?.as_str()?.trim();
                    if description.is_empty() {
                        return None;
                    }
                    let score = item.get("score").and_then(Value::as_f64).unwrap_or(0.0);
                    Some(Annotation::new(description, score))
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Reads the first response of an `images:annotate` batch.
pub(crate) fn parse_annotate_response(payload: &Value) -> Result<ImageAnnotations, ClientError> {
    let first = payload
        .pointer("/responses/0")
        .ok_or_else(|| ClientError::new(ClientErrorKind::Decode, "annotate reply has no responses"))?;
    if let Some(err) = first.get("error") {
        let message = err
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("unknown error");
        return Err(ClientError::new(
            ClientErrorKind::Status,
            format!("annotate failed: {message}"),
        ));
    }
    Ok(ImageAnnotations::new(
        annotations_at(first.get("labelAnnotations")),
        annotations_at(first.pointer("/webDetection/webEntities")),
    ))
}
