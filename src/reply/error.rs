//! Reply generation error types

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Reply generation error with classification
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct GenerationError {
    pub kind: GenerationErrorKind,
    pub message: String,
}

impl GenerationError {
    pub fn new(kind: GenerationErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(GenerationErrorKind::Unavailable, message)
    }

    pub fn timed_out(message: impl Into<String>) -> Self {
        Self::new(GenerationErrorKind::TimedOut, message)
    }

    pub fn invalid_reply(message: impl Into<String>) -> Self {
        Self::new(GenerationErrorKind::InvalidReply, message)
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        Self::new(GenerationErrorKind::Unknown, message)
    }
}

/// Error classification, surfaced to views so they can word the failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationErrorKind {
    /// Backend unreachable or refused the request
    Unavailable,
    /// No reply within the configured timeout
    TimedOut,
    /// Backend answered with something that cannot be shown (e.g. blank text)
    InvalidReply,
    Unknown,
}
