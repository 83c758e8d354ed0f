// SPDX-License-Identifier: Apache-2.0

use crate::clients::Clock;
use crate::generate::{GenerationInput, RegulationGenerator};
use crate::identify::SpeciesIdentifier;
use std::any::Any;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn, Instrument};
use uo_checker_api::{
    validation_message, ErrorEnvelope, ErrorKind, IdentifyResponse, IdentifySuccess,
};
use uo_checker_model::{CacheKey, IdentificationRequest};
use uo_checker_store::RegulationCache;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Validating,
    Identifying,
    CacheCheck,
    Generating,
    Persisting,
    Done,
    Failed,
}

impl Stage {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Validating => "validating",
            Self::Identifying => "identifying",
            Self::CacheCheck => "cache_check",
            Self::Generating => "generating",
            Self::Persisting => "persisting",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }
}

/// Runs one identification request through validation, species
/// identification, cache lookup, generation and persistence.
///
/// Cheap to clone; all collaborators are shared.
#[derive(Clone)]
pub struct Orchestrator {
    identifier: Arc<SpeciesIdentifier>,
    cache: RegulationCache,
    generator: Arc<RegulationGenerator>,
    clock: Arc<dyn Clock>,
    debug: bool,
}

fn panic_detail(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

impl Orchestrator {
    pub fn new(
        identifier: Arc<SpeciesIdentifier>,
        cache: RegulationCache,
        generator: Arc<RegulationGenerator>,
        clock: Arc<dyn Clock>,
        debug: bool,
    ) -> Self {
        Self {
            identifier,
            cache,
            generator,
            clock,
            debug,
        }
    }

    #[must_use]
    pub fn cache(&self) -> &RegulationCache {
        &self.cache
    }

    fn failure(&self, kind: ErrorKind, message: &str, detail: impl FnOnce() -> String) -> IdentifyResponse {
        let env = ErrorEnvelope::new(kind, message);
        if self.debug {
            env.with_debug(detail()).into()
        } else {
            env.into()
        }
    }

    /// Runs the pipeline on its own task so a panicking stage still yields a
    /// `system error` envelope.
    pub async fn handle(&self, request: IdentificationRequest) -> IdentifyResponse {
        let this = self.clone();
        let task = tokio::spawn(
            async move { this.run(request).await }.instrument(tracing::Span::current()),
        );
        match task.await {
            Ok(response) => response,
            Err(join_err) => {
                let detail = if join_err.is_panic() {
                    panic_detail(join_err.into_panic())
                } else {
                    "pipeline task cancelled".to_string()
                };
                error!(stage = Stage::Failed.as_str(), error = %detail, "pipeline aborted");
                self.failure(
                    ErrorKind::SystemError,
                    ErrorKind::SystemError.default_message(),
                    || detail,
                )
            }
        }
    }

    pub async fn run(&self, request: IdentificationRequest) -> IdentifyResponse {
        let started = Instant::now();

        debug!(stage = Stage::Validating.as_str(), image_bytes = request.image.len());
        if let Err(e) = request.validate() {
            info!(stage = Stage::Failed.as_str(), reason = %e, "request rejected");
            return self.failure(ErrorKind::InvalidInput, validation_message(&e), || e.to_string());
        }
        let location = request.normalized_location();

        debug!(stage = Stage::Identifying.as_str(), region = %location.region);
        let Some(species) = self.identifier.identify(&request.image).await else {
            info!(stage = Stage::Failed.as_str(), "fish not identified");
            return ErrorEnvelope::not_identified().into();
        };

        let key = CacheKey::new(&location.region, &species);
        debug!(stage = Stage::CacheCheck.as_str(), cache_key = %key);
        if let Some(record) = self.cache.get(&key).await {
            info!(
                stage = Stage::Done.as_str(),
                species = %species,
                cache_key = %key,
                from_cache = true,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "pipeline completed"
            );
            return IdentifySuccess {
                success: true,
                from_cache: true,
                data: record,
                identified_fish: species,
                location,
                timestamp: self.clock.now_rfc3339(),
            }
            .into();
        }

        debug!(stage = Stage::Generating.as_str(), cache_key = %key);
        let input = GenerationInput {
            species: &species,
            region: &location.region,
            locality: location.locality.as_deref(),
            coordinates: location.coordinates(),
            image: Some(&request.image),
        };
        let record = match self.generator.generate(input).await {
            Ok(record) => record,
            Err(e) => {
                warn!(stage = Stage::Failed.as_str(), cache_key = %key, error = %e, "generation failed");
                return self.failure(
                    ErrorKind::GenerationError,
                    ErrorKind::GenerationError.default_message(),
                    || e.to_string(),
                );
            }
        };

        // Fallback records describe an outage, not the regulation; the next
        // request for this key generates again.
        if record.is_fallback() {
            info!(stage = Stage::Persisting.as_str(), cache_key = %key, "fallback record not cached");
        } else {
            debug!(stage = Stage::Persisting.as_str(), cache_key = %key);
            if !self.cache.put(&key, &record).await {
                warn!(cache_key = %key, "regulation record not persisted");
            }
        }

        info!(
            stage = Stage::Done.as_str(),
            species = %species,
            cache_key = %key,
            from_cache = false,
            fallback = record.is_fallback(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "pipeline completed"
        );
        IdentifySuccess {
            success: true,
            from_cache: false,
            data: record,
            identified_fish: species,
            location,
            timestamp: self.clock.now_rfc3339(),
        }
        .into()
    }
}
