//! Session error types

use crate::message::MessageId;
use crate::reply::GenerationError;
use crate::state_machine::TransitionError;
use thiserror::Error;

/// Errors surfaced to whoever drives a session. All are recoverable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("Message is empty")]
    EmptyInput,
    #[error("Assistant is still replying, wait for it or cancel first")]
    Busy,
    #[error("Message not found: {0}")]
    NotFound(MessageId),
    #[error("Reply failed: {0}")]
    ReplyFailed(GenerationError),
    #[error("No tokio runtime to generate the reply on")]
    NoRuntime,
    #[error("Session has been disposed")]
    Disposed,
    #[error("Invalid seed transcript: {0}")]
    InvalidSeed(String),
    #[error("Unknown session: {0}")]
    UnknownSession(String),
}

impl From<TransitionError> for SessionError {
    fn from(err: TransitionError) -> Self {
        match err {
            TransitionError::EmptyInput => SessionError::EmptyInput,
            TransitionError::Busy => SessionError::Busy,
        }
    }
}
