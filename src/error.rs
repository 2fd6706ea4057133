//! Error types for Health Assess.

use std::time::Duration;

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),
}

/// LLM provider errors.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("Provider {provider} request failed: {reason}")]
    RequestFailed { provider: String, reason: String },

    #[error("Provider {provider} rate limited, retry after {retry_after:?}")]
    RateLimited {
        provider: String,
        retry_after: Option<Duration>,
    },

    #[error("Invalid response from {provider}: {reason}")]
    InvalidResponse { provider: String, reason: String },

    #[error("Authentication failed for provider {provider}")]
    AuthFailed { provider: String },
}

/// Failure of the generation service.
///
/// The workflow treats every variant the same way: the fallback content is
/// substituted. The variants exist for diagnostics only.
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("provider call failed: {0}")]
    Llm(#[from] LlmError),

    #[error("generation timed out after {0:?}")]
    Timeout(Duration),

    #[error("malformed generation response: {0}")]
    Malformed(String),

    #[error("generation service unavailable: {0}")]
    Unavailable(String),
}

/// Rejected field edit or clarification answer.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ProfileError {
    #[error("{field} must be between {min} and {max}, got {value}")]
    OutOfRange {
        field: &'static str,
        min: f64,
        max: f64,
        value: f64,
    },

    #[error("{field} must be a finite, non-negative number, got {value}")]
    InvalidMeasurement { field: &'static str, value: f64 },

    #[error("no clarification question with id {0}")]
    UnknownQuestion(String),

    #[error("question {id} expects a {expected} answer")]
    AnswerTypeMismatch { id: String, expected: &'static str },

    #[error("'{value}' is not an option for question {id}")]
    UnknownOption { id: String, value: String },
}
