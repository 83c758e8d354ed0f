// SPDX-License-Identifier: Apache-2.0

use super::response_contract::{error_envelope_response, identify_response};
use crate::AppState;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use std::sync::atomic::Ordering;
use tracing::warn;
use uo_checker_api::openapi::openapi_v1_spec;
use uo_checker_api::{
    CacheKeyQuery, CacheKeyResponse, ErrorEnvelope, ErrorKind, IdentifyRequestBody, API_VERSION,
};

fn invalid_input(state: &AppState, message: &str, detail: String) -> Response {
    let env = ErrorEnvelope::new(ErrorKind::InvalidInput, message);
    error_envelope_response(if state.debug { env.with_debug(detail) } else { env })
}

pub(crate) async fn identify_handler(
    State(state): State<AppState>,
    payload: Result<Json<IdentifyRequestBody>, JsonRejection>,
) -> Response {
    let body = match payload {
        Ok(Json(body)) => body,
        Err(rejection) if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE => {
            return error_envelope_response(ErrorEnvelope::of_kind(ErrorKind::PayloadTooLarge));
        }
        Err(rejection) => {
            return invalid_input(
                &state,
                "リクエストの形式が正しくありません。",
                rejection.body_text(),
            );
        }
    };
    let request = match body.into_request() {
        Ok(request) => request,
        Err(detail) => {
            return invalid_input(
                &state,
                "画像データまたは位置情報の形式が正しくありません。",
                detail,
            );
        }
    };
    match tokio::time::timeout(state.request_timeout, state.orchestrator.handle(request)).await {
        Ok(resp) => identify_response(resp),
        Err(_) => {
            warn!(
                timeout_ms = state.request_timeout.as_millis() as u64,
                "identify request timed out"
            );
            error_envelope_response(ErrorEnvelope::new(
                ErrorKind::SystemError,
                "処理がタイムアウトしました。しばらくしてから再度お試しください。",
            ))
        }
    }
}

pub(crate) async fn cache_key_handler(
    State(state): State<AppState>,
    query: Result<Query<CacheKeyQuery>, QueryRejection>,
) -> Response {
    let query = match query {
        Ok(Query(q)) => q,
        Err(rejection) => {
            return invalid_input(
                &state,
                "region と species を指定してください。",
                rejection.body_text(),
            );
        }
    };
    if query.region.trim().is_empty() || query.species.trim().is_empty() {
        return invalid_input(
            &state,
            "region と species を指定してください。",
            "blank region or species".to_string(),
        );
    }
    Json(CacheKeyResponse::derive(&query)).into_response()
}

pub(crate) async fn healthz_handler() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

pub(crate) async fn readyz_handler(State(state): State<AppState>) -> impl IntoResponse {
    if state.ready.load(Ordering::Relaxed) {
        (StatusCode::OK, "ready")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "not-ready")
    }
}

pub(crate) async fn version_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "service": crate::CRATE_NAME,
        "version": env!("CARGO_PKG_VERSION"),
        "api_version": API_VERSION,
        "store_backend": state.orchestrator.cache().backend_tag(),
    }))
}

pub(crate) async fn openapi_handler() -> impl IntoResponse {
    Json(openapi_v1_spec())
}
