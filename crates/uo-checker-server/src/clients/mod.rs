// SPDX-License-Identifier: Apache-2.0

//! Outbound collaborators: image annotation, text generation, fishing-rights
//! lookup and term translation. Each sits behind a trait so the pipeline can
//! run against fakes.

mod fishing_rights;
mod text;
mod translate;
mod vision;

pub use fishing_rights::{FishingRightsQuery, FishingRightsService, MsilClient};
pub use text::{image_media_type, AnthropicClient, GenerationRequest, TextGenerationService};
pub use translate::{
    GlossaryTranslator, GoogleTranslateClient, TranslationService, Translator, DEFAULT_GLOSSARY,
    GENERIC_FISH_JA,
};
pub use vision::{Annotation, GoogleVisionClient, ImageAnnotations, VisionService};

use chrono::{SecondsFormat, Utc};
use reqwest::StatusCode;
use serde_json::Value;

const ERROR_BODY_SNIPPET_CHARS: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientErrorKind {
    Config,
    Timeout,
    Transport,
    Status,
    Decode,
}

impl ClientErrorKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Config => "config",
            Self::Timeout => "timeout",
            Self::Transport => "transport",
            Self::Status => "status",
            Self::Decode => "decode",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{}: {message}", .kind.as_str())]
pub struct ClientError {
    pub kind: ClientErrorKind,
    pub message: String,
}

impl ClientError {
    pub fn new(kind: ClientErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(e: reqwest::Error) -> Self {
        let kind = if e.is_timeout() {
            ClientErrorKind::Timeout
        } else if e.is_decode() {
            ClientErrorKind::Decode
        } else if e.is_builder() {
            ClientErrorKind::Config
        } else {
            ClientErrorKind::Transport
        };
        Self::new(kind, e.to_string())
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(e: serde_json::Error) -> Self {
        Self::new(ClientErrorKind::Decode, e.to_string())
    }
}

pub(crate) fn http_client(timeout: std::time::Duration) -> Result<reqwest::Client, ClientError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .map_err(|e| ClientError::new(ClientErrorKind::Config, format!("http client: {e}")))
}

/// Error for a non-success reply. Uses the JSON `error.message` when the body
/// carries one, otherwise a short prefix of the raw body.
pub(crate) fn status_error(what: &str, status: StatusCode, body: &str) -> ClientError {
    let detail = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| {
            v.pointer("/error/message")
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or_else(|| {
            let snippet: String = body.trim().chars().take(ERROR_BODY_SNIPPET_CHARS).collect();
            if snippet.is_empty() {
                "empty body".to_string()
            } else {
                snippet
            }
        });
    ClientError::new(ClientErrorKind::Status, format!("{what} status={status}: {detail}"))
}

/// Checks the status before decoding, so an HTML error page reports as a
/// status failure rather than a decode failure.
pub(crate) async fn json_body(resp: reqwest::Response, what: &str) -> Result<Value, ClientError> {
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(status_error(what, status, &body));
    }
    Ok(resp.json().await?)
}

/// Source of response and record timestamps.
pub trait Clock: Send + Sync + 'static {
    fn now_rfc3339(&self) -> String;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_rfc3339(&self) -> String {
        Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
    }
}

#[derive(Debug, Clone)]
pub struct FixedClock(pub String);

impl Clock for FixedClock {
    fn now_rfc3339(&self) -> String {
        self.0.clone()
    }
}
