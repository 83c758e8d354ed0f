// SPDX-License-Identifier: Apache-2.0

#![forbid(unsafe_code)]
//! Fish identification and regulation lookup service.
//!
//! An [`Orchestrator`] takes a photo and a location through species
//! identification, a regulation cache and text generation; [`build_router`]
//! exposes it over HTTP.

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use std::sync::atomic::{AtomicBool, AtomicU64};
use std::sync::Arc;
use std::time::Duration;
use uo_checker_store::{open_store, RegulationCache, RegulationStore};

pub mod clients;
pub mod config;
pub mod fakes;
pub mod generate;
mod http;
pub mod identify;
pub mod pipeline;

pub use clients::{Clock, FixedClock, SystemClock};
pub use config::{validate_startup_config, ConfigError, ServiceConfig};
pub use generate::{GenerationError, GenerationInput, GeneratorSettings, RegulationGenerator};
pub use identify::{match_annotations, MatchPolicy, SpeciesIdentifier};
pub use pipeline::{Orchestrator, Stage};

use clients::{
    AnthropicClient, FishingRightsService, GlossaryTranslator, GoogleTranslateClient,
    GoogleVisionClient, MsilClient, TextGenerationService, Translator, VisionService,
};

pub const CRATE_NAME: &str = "uo-checker-server";

/// Outbound collaborators the orchestrator is assembled from.
pub struct Services {
    pub vision: Arc<dyn VisionService>,
    pub text: Arc<dyn TextGenerationService>,
    pub fishing_rights: Option<Arc<dyn FishingRightsService>>,
    pub translator: Arc<dyn Translator>,
    pub store: Arc<dyn RegulationStore>,
    pub clock: Arc<dyn Clock>,
}

impl Services {
    /// Real network clients and the configured store.
    pub fn from_config(cfg: &ServiceConfig) -> Result<Self, String> {
        let vision = GoogleVisionClient::new(&cfg.vision)
            .map_err(|e| format!("vision client: {e}"))?;
        let text = AnthropicClient::new(&cfg.text).map_err(|e| format!("text client: {e}"))?;
        let fishing_rights: Option<Arc<dyn FishingRightsService>> = if cfg.fishing_rights.enabled {
            Some(Arc::new(
                MsilClient::new(&cfg.fishing_rights)
                    .map_err(|e| format!("fishing-rights client: {e}"))?,
            ))
        } else {
            None
        };
        let mut translator = GlossaryTranslator::default();
        if cfg.translate.enabled {
            let remote = GoogleTranslateClient::new(&cfg.translate)
                .map_err(|e| format!("translate client: {e}"))?;
            translator = translator.with_remote(Arc::new(remote));
        }
        let store = open_store(&cfg.store.backend_spec()?, &cfg.store.http_options())
            .map_err(|e| format!("store: {e}"))?;
        Ok(Self {
            vision: Arc::new(vision),
            text: Arc::new(text),
            fishing_rights,
            translator: Arc::new(translator),
            store,
            clock: Arc::new(SystemClock),
        })
    }
}

#[must_use]
pub fn build_orchestrator(cfg: &ServiceConfig, services: Services) -> Orchestrator {
    let identifier = SpeciesIdentifier::new(
        services.vision,
        services.translator,
        cfg.match_policy.clone(),
    );
    let generator = RegulationGenerator::new(
        services.text,
        services.fishing_rights,
        Arc::clone(&services.clock),
        GeneratorSettings {
            max_tokens: cfg.text.max_tokens,
            temperature: cfg.text.temperature,
            attach_image: cfg.text.attach_image,
            search_radius_m: cfg.fishing_rights.radius_m,
            deadline: cfg.generation_deadline,
        },
    );
    Orchestrator::new(
        Arc::new(identifier),
        RegulationCache::new(services.store),
        Arc::new(generator),
        services.clock,
        cfg.debug,
    )
}

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Orchestrator,
    pub ready: Arc<AtomicBool>,
    pub(crate) request_id_seed: Arc<AtomicU64>,
    pub max_body_bytes: usize,
    pub request_timeout: Duration,
    pub debug: bool,
}

impl AppState {
    #[must_use]
    pub fn new(orchestrator: Orchestrator, cfg: &ServiceConfig) -> Self {
        Self {
            orchestrator,
            ready: Arc::new(AtomicBool::new(false)),
            request_id_seed: Arc::new(AtomicU64::new(1)),
            max_body_bytes: cfg.max_body_bytes,
            request_timeout: cfg.request_timeout,
            debug: cfg.debug,
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(http::handlers::healthz_handler))
        .route("/readyz", get(http::handlers::readyz_handler))
        .route("/v1/version", get(http::handlers::version_handler))
        .route("/v1/openapi.json", get(http::handlers::openapi_handler))
        .route("/v1/cache-key", get(http::handlers::cache_key_handler))
        .route("/v1/identify", post(http::handlers::identify_handler))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            http::request_tracing::request_tracing_middleware,
        ))
        .layer(DefaultBodyLimit::max(state.max_body_bytes))
        .with_state(state)
}
