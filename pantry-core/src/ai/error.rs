use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::model::Usage;

/// Category of an AI extraction failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AiErrorKind {
    AiDisabled,
    InvalidInput,
    EmptyResponse,
    ValidationError,
    ConfigurationError,
    AuthenticationError,
    RateLimited,
    Timeout,
    NetworkError,
    MalformedResponse,
    ModelNotFound,
    ProviderError,
}

impl AiErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AiErrorKind::AiDisabled => "AI_DISABLED",
            AiErrorKind::InvalidInput => "INVALID_INPUT",
            AiErrorKind::EmptyResponse => "EMPTY_RESPONSE",
            AiErrorKind::ValidationError => "VALIDATION_ERROR",
            AiErrorKind::ConfigurationError => "CONFIGURATION_ERROR",
            AiErrorKind::AuthenticationError => "AUTHENTICATION_ERROR",
            AiErrorKind::RateLimited => "RATE_LIMITED",
            AiErrorKind::Timeout => "TIMEOUT",
            AiErrorKind::NetworkError => "NETWORK_ERROR",
            AiErrorKind::MalformedResponse => "MALFORMED_RESPONSE",
            AiErrorKind::ModelNotFound => "MODEL_NOT_FOUND",
            AiErrorKind::ProviderError => "PROVIDER_ERROR",
        }
    }
}

/// Terminal failure of an AI call, safe to show to an operator.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{}: {message}", .kind.as_str())]
pub struct AiFailure {
    pub kind: AiErrorKind,
    pub message: String,
}

impl AiFailure {
    pub fn new(kind: AiErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn disabled() -> Self {
        Self::new(AiErrorKind::AiDisabled, "AI extraction is disabled")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiSuccess<T> {
    pub value: T,
    pub usage: Usage,
}

pub type AiResult<T> = Result<AiSuccess<T>, AiFailure>;
