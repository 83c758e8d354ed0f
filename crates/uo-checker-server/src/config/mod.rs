// SPDX-License-Identifier: Apache-2.0

use crate::identify::MatchPolicy;
use serde::Serialize;
use std::net::SocketAddr;
use std::time::Duration;
use uo_checker_model::MAX_IMAGE_BYTES;
use uo_checker_store::{HttpStoreOptions, StoreBackendSpec};

pub const CONFIG_SCHEMA_VERSION: &str = "1";

pub const DEFAULT_TEXT_MODEL: &str = "claude-sonnet-4-5-20250929";

#[derive(Debug, Clone, Serialize)]
pub struct VisionConfig {
    pub endpoint: String,
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub max_results: u32,
    pub timeout: Duration,
}

impl Default for VisionConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://vision.googleapis.com/v1/images:annotate".to_string(),
            api_key: None,
            max_results: 20,
            timeout: Duration::from_secs(15),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TextConfig {
    pub endpoint: String,
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f64,
    pub attach_image: bool,
    pub timeout: Duration,
}

impl Default for TextConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.anthropic.com/v1/messages".to_string(),
            api_key: None,
            model: DEFAULT_TEXT_MODEL.to_string(),
            max_tokens: 4096,
            temperature: 0.2,
            attach_image: false,
            timeout: Duration::from_secs(60),
        }
    }
}

/// Term translation for species names the glossary does not know.
#[derive(Debug, Clone, Serialize)]
pub struct TranslateConfig {
    pub enabled: bool,
    pub endpoint: String,
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub timeout: Duration,
}

impl Default for TranslateConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            endpoint: "https://translation.googleapis.com/language/translate/v2".to_string(),
            api_key: None,
            timeout: Duration::from_secs(5),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FishingRightsConfig {
    pub enabled: bool,
    pub endpoint: String,
    #[serde(skip_serializing)]
    pub subscription_key: Option<String>,
    pub radius_m: u32,
    pub timeout: Duration,
}

impl Default for FishingRightsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            endpoint: "https://api.msil.go.jp/msil/v1/commonFisheryRight2024".to_string(),
            subscription_key: None,
            radius_m: 5000,
            timeout: Duration::from_secs(10),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StoreConfig {
    pub backend: String,
    pub collection: String,
    #[serde(skip_serializing)]
    pub bearer: Option<String>,
    pub timeout: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: "sqlite:data/regulation_cache.db".to_string(),
            collection: "fish_regulations".to_string(),
            bearer: None,
            timeout: Duration::from_secs(5),
        }
    }
}

impl StoreConfig {
    pub fn backend_spec(&self) -> Result<StoreBackendSpec, String> {
        self.backend.parse().map_err(|e| format!("UO_STORE: {e}"))
    }

    #[must_use]
    pub fn http_options(&self) -> HttpStoreOptions {
        HttpStoreOptions {
            collection: self.collection.clone(),
            bearer: self.bearer.clone(),
            timeout: self.timeout,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ServiceConfig {
    pub bind_addr: String,
    pub max_body_bytes: usize,
    pub request_timeout: Duration,
    pub generation_deadline: Duration,
    /// Adds failure detail to error envelopes.
    pub debug: bool,
    pub log_json: bool,
    pub vision: VisionConfig,
    pub text: TextConfig,
    pub translate: TranslateConfig,
    pub fishing_rights: FishingRightsConfig,
    pub store: StoreConfig,
    pub match_policy: MatchPolicy,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8080".to_string(),
            // base64 inflates by 4/3; leave room for the JSON wrapper.
            max_body_bytes: MAX_IMAGE_BYTES / 3 * 4 + 64 * 1024,
            request_timeout: Duration::from_secs(120),
            generation_deadline: Duration::from_secs(90),
            debug: false,
            log_json: true,
            vision: VisionConfig::default(),
            text: TextConfig::default(),
            translate: TranslateConfig::default(),
            fishing_rights: FishingRightsConfig::default(),
            store: StoreConfig::default(),
            match_policy: MatchPolicy::default(),
        }
    }
}

/// Typed reads over an environment-like lookup; malformed values fall back
/// to the default.
struct EnvReader<'a> {
    lookup: &'a dyn Fn(&str) -> Option<String>,
}

impl EnvReader<'_> {
    fn opt(&self, name: &str) -> Option<String> {
        (self.lookup)(name)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn string(&self, name: &str, default: &str) -> String {
        self.opt(name).unwrap_or_else(|| default.to_string())
    }

    fn bool(&self, name: &str, default: bool) -> bool {
        match self.opt(name).as_deref() {
            Some("1" | "true" | "TRUE" | "yes" | "on") => true,
            Some("0" | "false" | "FALSE" | "no" | "off") => false,
            _ => default,
        }
    }

    fn u32(&self, name: &str, default: u32) -> u32 {
        self.opt(name).and_then(|v| v.parse().ok()).unwrap_or(default)
    }

    fn usize(&self, name: &str, default: usize) -> usize {
        self.opt(name).and_then(|v| v.parse().ok()).unwrap_or(default)
    }

    fn f64(&self, name: &str, default: f64) -> f64 {
        self.opt(name).and_then(|v| v.parse().ok()).unwrap_or(default)
    }

    fn duration_ms(&self, name: &str, default: Duration) -> Duration {
        self.opt(name)
            .and_then(|v| v.parse::<u64>().ok())
            .map_or(default, Duration::from_millis)
    }
}

impl ServiceConfig {
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the configuration from `UO_*` variables read through `lookup`.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let env = EnvReader { lookup: &lookup };
        let d = Self::default();
        let policy = MatchPolicy::default();
        Self {
            bind_addr: env.string("UO_BIND_ADDR", &d.bind_addr),
            max_body_bytes: env.usize("UO_MAX_BODY_BYTES", d.max_body_bytes),
            request_timeout: env.duration_ms("UO_REQUEST_TIMEOUT_MS", d.request_timeout),
            generation_deadline: env.duration_ms("UO_GENERATION_DEADLINE_MS", d.generation_deadline),
            debug: env.bool("UO_DEBUG", d.debug),
            log_json: env.bool("UO_LOG_JSON", d.log_json),
            vision: VisionConfig {
                endpoint: env.string("UO_VISION_ENDPOINT", &d.vision.endpoint),
                api_key: env.opt("UO_VISION_API_KEY"),
                max_results: env.u32("UO_VISION_MAX_RESULTS", d.vision.max_results),
                timeout: env.duration_ms("UO_VISION_TIMEOUT_MS", d.vision.timeout),
            },
            text: TextConfig {
                endpoint: env.string("UO_TEXT_ENDPOINT", &d.text.endpoint),
                api_key: env
                    .opt("UO_TEXT_API_KEY")
                    .or_else(|| env.opt("ANTHROPIC_API_KEY")),
                model: env.string("UO_TEXT_MODEL", &d.text.model),
                max_tokens: env.u32("UO_TEXT_MAX_TOKENS", d.text.max_tokens),
                temperature: env.f64("UO_TEXT_TEMPERATURE", d.text.temperature),
                attach_image: env.bool("UO_TEXT_ATTACH_IMAGE", d.text.attach_image),
                timeout: env.duration_ms("UO_TEXT_TIMEOUT_MS", d.text.timeout),
            },
            translate: TranslateConfig {
                enabled: env.bool("UO_TRANSLATE_ENABLED", d.translate.enabled),
                endpoint: env.string("UO_TRANSLATE_ENDPOINT", &d.translate.endpoint),
                api_key: env
                    .opt("UO_TRANSLATE_API_KEY")
                    .or_else(|| env.opt("UO_VISION_API_KEY")),
                timeout: env.duration_ms("UO_TRANSLATE_TIMEOUT_MS", d.translate.timeout),
            },
            fishing_rights: FishingRightsConfig {
                enabled: env.bool("UO_FISHING_RIGHTS_ENABLED", d.fishing_rights.enabled),
                endpoint: env.string("UO_FISHING_RIGHTS_ENDPOINT", &d.fishing_rights.endpoint),
                subscription_key: env.opt("UO_FISHING_RIGHTS_KEY"),
                radius_m: env.u32("UO_FISHING_RIGHTS_RADIUS_M", d.fishing_rights.radius_m),
                timeout: env.duration_ms("UO_FISHING_RIGHTS_TIMEOUT_MS", d.fishing_rights.timeout),
            },
            store: StoreConfig {
                backend: env.string("UO_STORE", &d.store.backend),
                collection: env.string("UO_STORE_COLLECTION", &d.store.collection),
                bearer: env.opt("UO_STORE_BEARER"),
                timeout: env.duration_ms("UO_STORE_TIMEOUT_MS", d.store.timeout),
            },
            match_policy: MatchPolicy {
                web_keyword_min: env.f64("UO_MATCH_WEB_KEYWORD_MIN", policy.web_keyword_min),
                label_keyword_min: env.f64("UO_MATCH_LABEL_KEYWORD_MIN", policy.label_keyword_min),
                web_fish_min: env.f64("UO_MATCH_WEB_FISH_MIN", policy.web_fish_min),
                label_fish_min: env.f64("UO_MATCH_LABEL_FISH_MIN", policy.label_fish_min),
                ..policy
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid configuration: {0}")]
pub struct ConfigError(pub String);

pub fn validate_startup_config(cfg: &ServiceConfig) -> Result<(), ConfigError> {
    check_config(cfg).map_err(ConfigError)
}

fn check_config(cfg: &ServiceConfig) -> Result<(), String> {
    cfg.bind_addr
        .parse::<SocketAddr>()
        .map_err(|e| format!("UO_BIND_ADDR `{}` is not a socket address: {e}", cfg.bind_addr))?;
    if cfg.max_body_bytes == 0 {
        return Err("UO_MAX_BODY_BYTES must be > 0".to_string());
    }
    for (name, value) in [
        ("UO_REQUEST_TIMEOUT_MS", cfg.request_timeout),
        ("UO_GENERATION_DEADLINE_MS", cfg.generation_deadline),
        ("UO_VISION_TIMEOUT_MS", cfg.vision.timeout),
        ("UO_TEXT_TIMEOUT_MS", cfg.text.timeout),
        ("UO_TRANSLATE_TIMEOUT_MS", cfg.translate.timeout),
        ("UO_FISHING_RIGHTS_TIMEOUT_MS", cfg.fishing_rights.timeout),
        ("UO_STORE_TIMEOUT_MS", cfg.store.timeout),
    ] {
        if value.is_zero() {
            return Err(format!("{name} must be > 0"));
        }
    }
    if cfg.generation_deadline > cfg.request_timeout {
        return Err(
            "UO_GENERATION_DEADLINE_MS must not exceed UO_REQUEST_TIMEOUT_MS".to_string(),
        );
    }
    if cfg.vision.api_key.is_none() {
        return Err("UO_VISION_API_KEY is required".to_string());
    }
    if cfg.text.api_key.is_none() {
        return Err("UO_TEXT_API_KEY (or ANTHROPIC_API_KEY) is required".to_string());
    }
    if cfg.translate.enabled && cfg.translate.api_key.is_none() {
        return Err("UO_TRANSLATE_API_KEY (or UO_VISION_API_KEY) is required".to_string());
    }
    if cfg.vision.max_results == 0 {
        return Err("UO_VISION_MAX_RESULTS must be > 0".to_string());
    }
    if cfg.text.max_tokens == 0 {
        return Err("UO_TEXT_MAX_TOKENS must be > 0".to_string());
    }
    if !(0.0..=1.0).contains(&cfg.text.temperature) {
        return Err("UO_TEXT_TEMPERATURE must be within [0, 1]".to_string());
    }
    if cfg.fishing_rights.radius_m == 0 {
        return Err("UO_FISHING_RIGHTS_RADIUS_M must be > 0".to_string());
    }
    cfg.match_policy.validate()?;
    cfg.store.backend_spec()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> ServiceConfig {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        ServiceConfig::from_lookup(|k| vars.get(k).cloned())
    }

    fn with_keys() -> Vec<(&'static str, &'static str)> {
        vec![("UO_VISION_API_KEY", "v-key"), ("UO_TEXT_API_KEY", "t-key")]
    }

    #[test]
    fn defaults_match_documented_values() {
        let cfg = ServiceConfig::default();
        assert_eq!(cfg.text.model, DEFAULT_TEXT_MODEL);
        assert_eq!(cfg.text.max_tokens, 4096);
        assert!((cfg.text.temperature - 0.2).abs() < f64::EPSILON);
        assert_eq!(cfg.fishing_rights.radius_m, 5000);
        assert_eq!(cfg.fishing_rights.timeout, Duration::from_secs(10));
        assert!(cfg.max_body_bytes > MAX_IMAGE_BYTES);
        assert!(!cfg.debug);
    }

    #[test]
    fn reads_overrides_and_ignores_malformed_numbers() {
        let mut pairs = with_keys();
        pairs.extend([
            ("UO_DEBUG", "true"),
            ("UO_STORE", "memory"),
            ("UO_TEXT_MAX_TOKENS", "not-a-number"),
            ("UO_GENERATION_DEADLINE_MS", "2500"),
            ("UO_MATCH_LABEL_KEYWORD_MIN", "0.8"),
        ]);
        let cfg = config_from(&pairs);
        assert!(cfg.debug);
        assert_eq!(cfg.store.backend, "memory");
        assert_eq!(cfg.text.max_tokens, 4096);
        assert_eq!(cfg.generation_deadline, Duration::from_millis(2500));
        assert!((cfg.match_policy.label_keyword_min - 0.8).abs() < f64::EPSILON);
        assert!((cfg.match_policy.web_keyword_min - 0.5).abs() < f64::EPSILON);
        assert_eq!(validate_startup_config(&cfg), Ok(()));
    }

    #[test]
    fn translation_reuses_the_vision_key_unless_overridden() {
        let cfg = config_from(&with_keys());
        assert!(cfg.translate.enabled);
        assert_eq!(cfg.translate.api_key.as_deref(), Some("v-key"));

        let mut pairs = with_keys();
        pairs.extend([("UO_TRANSLATE_API_KEY", "tr-key"), ("UO_TRANSLATE_ENABLED", "off")]);
        let cfg = config_from(&pairs);
        assert_eq!(cfg.translate.api_key.as_deref(), Some("tr-key"));
        assert!(!cfg.translate.enabled);
        assert!(!serde_json::to_string(&cfg).expect("json").contains("tr-key"));
    }

    #[test]
    fn anthropic_key_variable_is_accepted() {
        let cfg = config_from(&[("UO_VISION_API_KEY", "v"), ("ANTHROPIC_API_KEY", "a")]);
        assert_eq!(cfg.text.api_key.as_deref(), Some("a"));
    }

    #[test]
    fn startup_validation_rejects_bad_settings() {
        let missing = config_from(&[]);
        assert!(validate_startup_config(&missing)
            .expect_err("keys")
            .0
            .contains("UO_VISION_API_KEY"));

        let mut pairs = with_keys();
        pairs.push(("UO_STORE", "redis://nope"));
        assert!(validate_startup_config(&config_from(&pairs))
            .expect_err("store")
            .0
            .starts_with("UO_STORE"));

        let mut pairs = with_keys();
        pairs.push(("UO_TEXT_TEMPERATURE", "1.5"));
        assert!(validate_startup_config(&config_from(&pairs)).is_err());

        let mut pairs = with_keys();
        pairs.push(("UO_GENERATION_DEADLINE_MS", "200000"));
        assert!(validate_startup_config(&config_from(&pairs)).is_err());

        let mut pairs = with_keys();
        pairs.push(("UO_BIND_ADDR", "localhost"));
        assert!(validate_startup_config(&config_from(&pairs)).is_err());
    }

    #[test]
    fn secrets_are_not_serialized() {
        let cfg = config_from(&with_keys());
        let dumped = serde_json::to_string(&cfg).expect("json");
        assert!(!dumped.contains("v-key"));
        assert!(!dumped.contains("t-key"));
    }
}
