// SPDX-License-Identifier: Apache-2.0

//! Scripted stand-ins for the outbound services, with call counters.

use crate::clients::{
    ClientError, ClientErrorKind, FishingRightsQuery, FishingRightsService, GenerationRequest,
    ImageAnnotations, TextGenerationService, TranslationService, VisionService,
};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;

pub struct FakeVision {
    response: Mutex<Result<ImageAnnotations, ClientError>>,
    panic_on_call: bool,
    pub calls: AtomicU64,
}

impl FakeVision {
    #[must_use]
    pub fn returning(annotations: ImageAnnotations) -> Self {
        Self {
            response: Mutex::new(Ok(annotations)),
            panic_on_call: false,
            calls: AtomicU64::new(0),
        }
    }

    #[must_use]
    pub fn failing(message: &str) -> Self {
        Self {
            response: Mutex::new(Err(ClientError::new(ClientErrorKind::Transport, message))),
            panic_on_call: false,
            calls: AtomicU64::new(0),
        }
    }

    /// Panics inside `annotate`; exercises the pipeline's task isolation.
    #[must_use]
    pub fn panicking() -> Self {
        Self {
            panic_on_call: true,
            ..Self::returning(ImageAnnotations::default())
        }
    }

    pub async fn set_response(&self, response: Result<ImageAnnotations, ClientError>) {
        *self.response.lock().await = response;
    }

    #[must_use]
    pub fn call_count(&self) -> u64 {
        self.calls.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl VisionService for FakeVision {
    fn backend_tag(&self) -> &'static str {
        "fake-vision"
    }

    async fn annotate(&self, _image: &[u8]) -> Result<ImageAnnotations, ClientError> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        if self.panic_on_call {
            panic!("fake vision exploded");
        }
        self.response.lock().await.clone()
    }
}

pub struct FakeTextService {
    replies: Mutex<VecDeque<Result<String, ClientError>>>,
    requests: Mutex<Vec<GenerationRequest>>,
    delay: Option<Duration>,
    pub calls: AtomicU64,
}

impl Default for FakeTextService {
    fn default() -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
            delay: None,
            calls: AtomicU64::new(0),
        }
    }
}

impl FakeTextService {
    fn scripted(reply: Result<String, ClientError>) -> Self {
        Self {
            replies: Mutex::new(VecDeque::from([reply])),
            ..Self::default()
        }
    }

    /// Replies with `text` on every call.
    #[must_use]
    pub fn replying(text: &str) -> Self {
        Self::scripted(Ok(text.to_string()))
    }

    #[must_use]
    pub fn failing(message: &str) -> Self {
        Self::scripted(Err(ClientError::new(ClientErrorKind::Status, message)))
    }

    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Queues replies consumed in order; the last one repeats.
    pub async fn push_reply(&self, reply: Result<String, ClientError>) {
        self.replies.lock().await.push_back(reply);
    }

    pub async fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().await.clone()
    }

    #[must_use]
    pub fn call_count(&self) -> u64 {
        self.calls.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl TextGenerationService for FakeTextService {
    fn service_tag(&self) -> &str {
        "fake-text"
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<String, ClientError> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        self.requests.lock().await.push(request.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let mut replies = self.replies.lock().await;
        let reply = if replies.len() > 1 {
            replies.pop_front()
        } else {
            replies.front().cloned()
        };
        reply.unwrap_or_else(|| {
            Err(ClientError::new(
                ClientErrorKind::Transport,
                "no scripted reply",
            ))
        })
    }
}

pub struct FakeFishingRights {
    response: Mutex<Result<Vec<Value>, ClientError>>,
    queries: Mutex<Vec<FishingRightsQuery>>,
    pub calls: AtomicU64,
}

impl FakeFishingRights {
    #[must_use]
    pub fn returning(features: Vec<Value>) -> Self {
        Self {
            response: Mutex::new(Ok(features)),
            queries: Mutex::new(Vec::new()),
            calls: AtomicU64::new(0),
        }
    }

    #[must_use]
    pub fn failing(message: &str) -> Self {
        Self {
            response: Mutex::new(Err(ClientError::new(ClientErrorKind::Timeout, message))),
            queries: Mutex::new(Vec::new()),
            calls: AtomicU64::new(0),
        }
    }

    pub async fn queries(&self) -> Vec<FishingRightsQuery> {
        self.queries.lock().await.clone()
    }

    #[must_use]
    pub fn call_count(&self) -> u64 {
        self.calls.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl FishingRightsService for FakeFishingRights {
    async fn lookup(&self, query: &FishingRightsQuery) -> Result<Vec<Value>, ClientError> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        self.queries.lock().await.push(query.clone());
        self.response.lock().await.clone()
    }
}

pub struct FakeTranslation {
    response: Result<String, ClientError>,
    pub calls: AtomicU64,
}

impl FakeTranslation {
    #[must_use]
    pub fn returning(text: &str) -> Self {
        Self {
            response: Ok(text.to_string()),
            calls: AtomicU64::new(0),
        }
    }

    #[must_use]
    pub fn failing(message: &str) -> Self {
        Self {
            response: Err(ClientError::new(ClientErrorKind::Status, message)),
            calls: AtomicU64::new(0),
        }
    }

    #[must_use]
    pub fn call_count(&self) -> u64 {
        self.calls.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl TranslationService for FakeTranslation {
    fn backend_tag(&self) -> &'static str {
        "fake-translate"
    }

    async fn translate(&self, _term: &str) -> Result<String, ClientError> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        self.response.clone()
    }
}
