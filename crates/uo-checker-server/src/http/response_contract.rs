// SPDX-License-Identifier: Apache-2.0

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use uo_checker_api::{ErrorEnvelope, IdentifyResponse};

#[must_use]
pub(crate) fn status_of(code: u16) -> StatusCode {
    StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

#[must_use]
pub(crate) fn identify_response(resp: IdentifyResponse) -> Response {
    (status_of(resp.http_status()), Json(resp)).into_response()
}

#[must_use]
pub(crate) fn error_envelope_response(env: ErrorEnvelope) -> Response {
    (status_of(env.error.http_status()), Json(env)).into_response()
}
