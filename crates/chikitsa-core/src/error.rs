//! Error types for the diagnosis conversation.

use std::time::Duration;

use crate::language::Language;

/// Failures talking to the diagnosis service.
///
/// None of these reach the presentation layer: the dispatcher turns every
/// variant into a fallback result.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("service returned status {0}")]
    Status(u16),
    #[error("malformed response: {0}")]
    Malformed(String),
    #[error("no response within {}s", .0.as_secs())]
    Timeout(Duration),
}

/// Invalid language or locale configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("unknown language: {0}")]
    UnknownLanguage(String),
    #[error("no locale entry for {}", .0.as_str())]
    MissingLocale(Language),
    #[error("invalid config file: {0}")]
    Invalid(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        ConfigError::Invalid(err.to_string())
    }
}

/// Rejected intents on the submission state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SubmitError {
    #[error("message cannot be empty")]
    EmptyInput,
    #[error("a submission is already in flight")]
    InFlight,
}
