// SPDX-License-Identifier: Apache-2.0

#![forbid(unsafe_code)]

use clap::{ArgAction, Parser, Subcommand};
use serde_json::{json, Value};
use std::fs;
use std::path::PathBuf;
use tracing::debug;
use uo_checker_api::{CacheKeyQuery, CacheKeyResponse};
use uo_checker_model::{CacheKey, Coordinates, IdentificationRequest};
use uo_checker_server::{build_orchestrator, validate_startup_config, ServiceConfig, Services};
use uo_checker_store::{open_store, StoreBackendSpec};

pub const CRATE_NAME: &str = "uo-checker-cli";

#[derive(Parser, Debug)]
#[command(name = "uo-checker")]
#[command(about = "Identify a fish from a photo and look up whether it may be kept")]
#[command(
    after_help = "Environment:\n  UO_STORE           Cache backend (memory, sqlite:PATH, http(s) URL)\n  UO_VISION_API_KEY  Image annotation key\n  UO_TEXT_API_KEY    Text generation key\n  RUST_LOG           Log filter override"
)]
pub struct Cli {
    /// Pretty-print JSON output.
    #[arg(long, global = true, default_value_t = false)]
    pub pretty: bool,
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the full identification pipeline on a local image.
    Identify {
        #[arg(long)]
        image: PathBuf,
        #[arg(long)]
        region: String,
        #[arg(long)]
        locality: Option<String>,
        #[arg(long, requires = "lon", allow_hyphen_values = true)]
        lat: Option<f64>,
        #[arg(long, requires = "lat", allow_hyphen_values = true)]
        lon: Option<f64>,
    },
    /// Print the cache key for a region and species.
    CacheKey {
        #[arg(long)]
        region: String,
        #[arg(long)]
        species: String,
    },
    Cache {
        #[command(subcommand)]
        command: CacheCommand,
    },
}

#[derive(Subcommand, Debug)]
pub enum CacheCommand {
    /// Show a cached entry without recording an access.
    Show {
        #[arg(long)]
        key: String,
        /// Overrides UO_STORE.
        #[arg(long)]
        store: Option<String>,
    },
}

/// JSON printed on stdout plus whether the command achieved its goal.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandOutput {
    pub value: Value,
    pub ok: bool,
}

impl CommandOutput {
    fn ok(value: Value) -> Self {
        Self { value, ok: true }
    }
}

pub fn render(value: &Value, pretty: bool) -> String {
    let rendered = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    };
    rendered.unwrap_or_else(|e| format!("{{\"error\":\"render failed: {e}\"}}"))
}

pub async fn run(cli: &Cli) -> Result<CommandOutput, String> {
    run_with_config(cli, &ServiceConfig::from_env()).await
}

pub async fn run_with_config(cli: &Cli, cfg: &ServiceConfig) -> Result<CommandOutput, String> {
    match &cli.command {
        Commands::Identify {
            image,
            region,
            locality,
            lat,
            lon,
        } => {
            let bytes =
                fs::read(image).map_err(|e| format!("read {} failed: {e}", image.display()))?;
            let mut request = IdentificationRequest::new(bytes, region.clone());
            if let Some(locality) = locality {
                request = request.with_locality(locality.clone());
            }
            if let Some(at) = Coordinates::from_parts(*lat, *lon).map_err(|e| e.to_string())? {
                request = request.with_coordinates(at);
            }
            validate_startup_config(cfg).map_err(|e| e.to_string())?;
            let orchestrator = build_orchestrator(cfg, Services::from_config(cfg)?);
            let response = orchestrator.handle(request).await;
            let ok = response.is_success();
            let value = serde_json::to_value(&response).map_err(|e| e.to_string())?;
            Ok(CommandOutput { value, ok })
        }
        Commands::CacheKey { region, species } => {
            let derived = CacheKeyResponse::derive(&CacheKeyQuery {
                region: region.clone(),
                species: species.clone(),
            });
            serde_json::to_value(derived)
                .map(CommandOutput::ok)
                .map_err(|e| e.to_string())
        }
        Commands::Cache {
            command: CacheCommand::Show { key, store },
        } => {
            let raw = store.as_deref().unwrap_or(&cfg.store.backend);
            let spec: StoreBackendSpec = raw.parse().map_err(|e| format!("store: {e}"))?;
            let store = open_store(&spec, &cfg.store.http_options())
                .map_err(|e| format!("store: {e}"))?;
            debug!(backend = store.backend_tag(), key = %key, "reading cache entry");
            let key = CacheKey::from_stored(key.clone());
            match store.get(&key).await.map_err(|e| e.to_string())? {
                Some(entry) => serde_json::to_value(entry)
                    .map(CommandOutput::ok)
                    .map_err(|e| e.to_string()),
                None => Ok(CommandOutput {
                    value: json!({ "error": "no cached entry", "cacheKey": key.as_str() }),
                    ok: false,
                }),
            }
        }
    }
}
