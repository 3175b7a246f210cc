//! Reply generation
//!
//! The session asks a [`ReplyGenerator`] for the assistant's next message.
//! The portal ships a canned stand-in; a real inference backend only has to
//! implement the same trait.

mod error;
#[cfg(test)]
pub mod testing;

pub use error::{GenerationError, GenerationErrorKind};

use crate::config::SessionConfig;
use crate::message::Message;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Content produced by a reply generator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub content: String,
    /// Whether the generator wants clinicians to look at this reply
    pub flagged: bool,
}

impl Reply {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            flagged: false,
        }
    }

    pub fn flagged(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            flagged: true,
        }
    }
}

/// Produces the assistant's next message from the conversation so far
#[async_trait]
pub trait ReplyGenerator: Send + Sync {
    async fn generate_reply(&self, history: &[Message]) -> Result<Reply, GenerationError>;

    /// Short name used in logs
    fn name(&self) -> &str;
}

#[async_trait]
impl<T: ReplyGenerator + ?Sized> ReplyGenerator for Arc<T> {
    async fn generate_reply(&self, history: &[Message]) -> Result<Reply, GenerationError> {
        (**self).generate_reply(history).await
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// Stand-in generator: the same text after a fixed delay, whatever was said
#[derive(Debug, Clone)]
pub struct CannedReplyGenerator {
    content: String,
    delay: Duration,
}

impl CannedReplyGenerator {
    pub fn new(content: impl Into<String>, delay: Duration) -> Self {
        Self {
            content: content.into(),
            delay,
        }
    }

    pub fn from_config(config: &SessionConfig) -> Self {
        Self::new(config.canned_reply.clone(), config.reply_delay)
    }
}

#[async_trait]
impl ReplyGenerator for CannedReplyGenerator {
    async fn generate_reply(&self, _history: &[Message]) -> Result<Reply, GenerationError> {
        tokio::time::sleep(self.delay).await;
        Ok(Reply::text(self.content.clone()))
    }

    fn name(&self) -> &str {
        "canned"
    }
}

/// Logging wrapper for reply generators
pub struct LoggingGenerator<G> {
    inner: G,
}

impl<G: ReplyGenerator> LoggingGenerator<G> {
    pub fn new(inner: G) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<G: ReplyGenerator> ReplyGenerator for LoggingGenerator<G> {
    async fn generate_reply(&self, history: &[Message]) -> Result<Reply, GenerationError> {
        let start = Instant::now();
        let result = self.inner.generate_reply(history).await;
        let duration = start.elapsed();

        match &result {
            Ok(reply) => {
                tracing::info!(
                    generator = %self.inner.name(),
                    duration_ms = %duration.as_millis(),
                    history_len = history.len(),
                    flagged = reply.flagged,
                    "Reply generated"
                );
            }
            Err(e) => {
                tracing::error!(
                    generator = %self.inner.name(),
                    duration_ms = %duration.as_millis(),
                    error = %e.message,
                    kind = ?e.kind,
                    "Reply generation failed"
                );
            }
        }

        result
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}
