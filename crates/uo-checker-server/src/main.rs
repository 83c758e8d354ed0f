// SPDX-License-Identifier: Apache-2.0

#![forbid(unsafe_code)]

use std::net::SocketAddr;
use std::sync::atomic::Ordering;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;
use uo_checker_server::{
    build_orchestrator, build_router, validate_startup_config, AppState, ServiceConfig, Services,
};

async fn wait_for_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match (
            signal(SignalKind::terminate()),
            signal(SignalKind::interrupt()),
        ) {
            (Ok(mut sigterm), Ok(mut sigint)) => {
                tokio::select! {
                    _ = sigterm.recv() => {}
                    _ = sigint.recv() => {}
                }
                return;
            }
            (Err(e), _) | (_, Err(e)) => {
                warn!(error = %e, "signal handlers unavailable; falling back to ctrl-c");
            }
        }
    }
    let _ = tokio::signal::ctrl_c().await;
}

fn init_tracing(log_json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<(), String> {
    let cfg = ServiceConfig::from_env();
    init_tracing(cfg.log_json);
    validate_startup_config(&cfg).map_err(|e| e.to_string())?;

    let services = Services::from_config(&cfg)?;
    let store_backend = services.store.backend_tag();
    let state = AppState::new(build_orchestrator(&cfg, services), &cfg);
    let app = build_router(state.clone());

    let addr: SocketAddr = cfg
        .bind_addr
        .parse()
        .map_err(|e| format!("invalid bind addr {}: {e}", cfg.bind_addr))?;
    let socket = if addr.is_ipv4() {
        tokio::net::TcpSocket::new_v4().map_err(|e| format!("socket v4 failed: {e}"))?
    } else {
        tokio::net::TcpSocket::new_v6().map_err(|e| format!("socket v6 failed: {e}"))?
    };
    socket
        .set_reuseaddr(true)
        .map_err(|e| format!("set_reuseaddr failed: {e}"))?;
    socket.bind(addr).map_err(|e| format!("bind failed: {e}"))?;
    let listener: TcpListener = socket
        .listen(1024)
        .map_err(|e| format!("listen failed: {e}"))?;

    state.ready.store(true, Ordering::Relaxed);
    info!(
        bind = %addr,
        store = store_backend,
        model = %cfg.text.model,
        fishing_rights = cfg.fishing_rights.enabled,
        debug = cfg.debug,
        "uo-checker-server listening"
    );
    let ready = state.ready.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            wait_for_shutdown_signal().await;
            ready.store(false, Ordering::Relaxed);
            info!("shutdown signal received; draining");
        })
        .await
        .map_err(|e| format!("server failed: {e}"))
}
