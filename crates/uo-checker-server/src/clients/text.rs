// SPDX-License-Identifier: Apache-2.0

use super::{http_client, json_body, ClientError, ClientErrorKind};
use crate::config::TextConfig;
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use serde_json::{json, Value};
use tracing::instrument;

const ANTHROPIC_VERSION: &str = "2023-06-01";

#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub prompt: String,
    pub image: Option<Vec<u8>>,
    pub max_tokens: u32,
    pub temperature: f64,
}

#[async_trait]
pub trait TextGenerationService: Send + Sync + 'static {
    /// Provenance written into generated records.
    fn service_tag(&self) -> &str;

    /// Returns the raw reply text.
    async fn generate(&self, request: &GenerationRequest) -> Result<String, ClientError>;
}

/// Sniffs the image container; anything unrecognized is sent as JPEG.
#[must_use]
pub fn image_media_type(image: &[u8]) -> &'static str {
    if image.starts_with(b"\x89PNG\r\n\x1a\n") {
        "image/png"
    } else if image.starts_with(b"GIF87a") || image.starts_with(b"GIF89a") {
        "image/gif"
    } else if image.len() >= 12 && &image[..4] == b"RIFF" && &image[8..12] == b"WEBP" {
        "image/webp"
    } else {
        "image/jpeg"
    }
}

pub struct AnthropicClient {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
}

impl AnthropicClient {
    pub fn new(cfg: &TextConfig) -> Result<Self, ClientError> {
        let api_key = cfg
            .api_key
            .clone()
            .ok_or_else(|| ClientError::new(ClientErrorKind::Config, "text api key missing"))?;
        Ok(Self {
            client: http_client(cfg.timeout)?,
            endpoint: cfg.endpoint.clone(),
            api_key,
            model: cfg.model.clone(),
        })
    }

    fn headers(&self) -> Result<HeaderMap, ClientError> {
        let mut headers = HeaderMap::new();
        let key = HeaderValue::from_str(&self.api_key).map_err(|e| {
            ClientError::new(ClientErrorKind::Config, format!("invalid api key header: {e}"))
        })?;
        headers.insert("x-api-key", key);
        headers.insert("anthropic-version", HeaderValue::from_static(ANTHROPIC_VERSION));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(headers)
    }

    fn message_body(&self, request: &GenerationRequest) -> Value {
        let mut content = Vec::new();
        if let Some(image) = &request.image {
            content.push(json!({
                "type": "image",
                "source": {
                    "type": "base64",
                    "media_type": image_media_type(image),
                    "data": STANDARD.encode(image),
                },
            }));
        }
        content.push(json!({ "type": "text", "text": request.prompt }));
        json!({
            "model": self.model,
            "max_tokens": request.max_tokens,
            "temperature": request.temperature,
            "messages": [{ "role": "user", "content": content }],
        })
    }
}

/// First text block of a messages reply.
pub(crate) fn reply_text(payload: &Value) -> Result<String, ClientError> {
    payload
        .get("content")
        .and_then(Value::as_array)
        .and_then(|blocks| {
            blocks
                .iter()
                .find(|b| b.get("type").and_then(Value::as_str) == Some("text"))
        })
        .and_then(|b| b.get("text"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| ClientError::new(ClientErrorKind::Decode, "reply has no text block"))
}

#[async_trait]
impl TextGenerationService for AnthropicClient {
    fn service_tag(&self) -> &str {
        &self.model
    }

    #[instrument(name = "text_generate", skip_all, fields(model = %self.model, with_image = request.image.is_some()))]
    async fn generate(&self, request: &GenerationRequest) -> Result<String, ClientError> {
        let resp = self
            .client
            .post(&self.endpoint)
            .headers(self.headers()?)
            .json(&self.message_body(request))
            .send()
            .await?;
        reply_text(&json_body(resp, "messages").await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> AnthropicClient {
        AnthropicClient::new(&TextConfig {
            api_key: Some("sk-test".to_string()),
            ..TextConfig::default()
        })
        .expect("client")
    }

    #[test]
    fn sniffs_common_image_types() {
        assert_eq!(image_media_type(b"\x89PNG\r\n\x1a\n...."), "image/png");
        assert_eq!(image_media_type(b"GIF89a..."), "image/gif");
        assert_eq!(image_media_type(b"RIFF\0\0\0\0WEBPVP8 "), "image/webp");
        assert_eq!(image_media_type(&[0xFF, 0xD8, 0xFF]), "image/jpeg");
        assert_eq!(image_media_type(b"RIFF"), "image/jpeg");
    }

    #[test]
    fn body_puts_image_before_prompt() {
        let body = client().message_body(&GenerationRequest {
            prompt: "質問".to_string(),
            image: Some(vec![0xFF, 0xD8]),
            max_tokens: 4096,
            temperature: 0.2,
        });
        let content = body.pointer("/messages/0/content").and_then(Value::as_array).expect("content");
        assert_eq!(content.len(), 2);
        assert_eq!(content[0]["source"]["media_type"], "image/jpeg");
        assert_eq!(content[0]["source"]["data"], "/9g=");
        assert_eq!(content[1]["text"], "質問");
        assert_eq!(body["max_tokens"], 4096);
    }

    #[test]
    fn text_only_body_and_reply_extraction() {
        let body = client().message_body(&GenerationRequest {
            prompt: "p".to_string(),
            image: None,
            max_tokens: 10,
            temperature: 0.0,
        });
        assert_eq!(body.pointer("/messages/0/content").and_then(Value::as_array).map(Vec::len), Some(1));

        let reply = json!({"content": [{"type": "text", "text": "{\"a\":1}"}]});
        assert_eq!(reply_text(&reply).expect("text"), "{\"a\":1}");
        assert!(reply_text(&json!({"content": []})).is_err());
    }

    #[test]
    fn missing_key_is_a_config_error() {
        let err = AnthropicClient::new(&TextConfig::default()).err().expect("error");
        assert_eq!(err.kind, ClientErrorKind::Config);
    }
}
