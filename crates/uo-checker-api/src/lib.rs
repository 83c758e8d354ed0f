// SPDX-License-Identifier: Apache-2.0

#![forbid(unsafe_code)]
//! Wire contract shared by the HTTP server and the CLI.

mod dto;
mod envelope;
mod errors;
pub mod openapi;

pub use dto::{CacheKeyQuery, CacheKeyResponse, IdentifyRequestBody};
pub use envelope::{ErrorEnvelope, IdentifyResponse, IdentifySuccess};
pub use errors::{validation_message, ErrorKind, NOT_IDENTIFIED_SUGGESTIONS};

pub const CRATE_NAME: &str = "uo-checker-api";
pub const API_VERSION: &str = "v1";
