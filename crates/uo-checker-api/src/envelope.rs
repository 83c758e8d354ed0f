// SPDX-License-Identifier: Apache-2.0

use crate::errors::{ErrorKind, NOT_IDENTIFIED_SUGGESTIONS};
use serde::{Deserialize, Serialize};
use uo_checker_model::{Location, RegulationRecord};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentifySuccess {
    pub success: bool,
    pub from_cache: bool,
    pub data: RegulationRecord,
    pub identified_fish: String,
    pub location: Location,
    pub timestamp: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    pub success: bool,
    pub error: ErrorKind,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestions: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debug: Option<String>,
}

impl ErrorEnvelope {
    #[must_use]
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            success: false,
            error: kind,
            message: message.into(),
            suggestions: None,
            debug: None,
        }
    }

    #[must_use]
    pub fn of_kind(kind: ErrorKind) -> Self {
        Self::new(kind, kind.default_message())
    }

    #[must_use]
    pub fn not_identified() -> Self {
        let mut env = Self::of_kind(ErrorKind::FishNotIdentified);
        env.suggestions = Some(
            NOT_IDENTIFIED_SUGGESTIONS
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
        );
        env
    }

    #[must_use]
    pub fn with_debug(mut self, detail: impl Into<String>) -> Self {
        self.debug = Some(detail.into());
        self
    }
}

/// Outcome of one identification request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IdentifyResponse {
    Success(Box<IdentifySuccess>),
    Failure(ErrorEnvelope),
}

impl IdentifyResponse {
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    #[must_use]
    pub fn http_status(&self) -> u16 {
        match self {
            Self::Success(_) => 200,
            Self::Failure(env) => env.error.http_status(),
        }
    }

    #[must_use]
    pub fn error_kind(&self) -> Option<ErrorKind> {
        match self {
            Self::Success(_) => None,
            Self::Failure(env) => Some(env.error),
        }
    }
}

impl From<IdentifySuccess> for IdentifyResponse {
    fn from(success: IdentifySuccess) -> Self {
        Self::Success(Box::new(success))
    }
}

impl From<ErrorEnvelope> for IdentifyResponse {
    fn from(env: ErrorEnvelope) -> Self {
        Self::Failure(env)
    }
}
