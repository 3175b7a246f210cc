//! Mock reply generators for testing
//!
//! These mocks let session and runtime tests run without a real backend.

use super::{GenerationError, Reply, ReplyGenerator};
use crate::message::Message;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

// ============================================================================
// Mock Reply Generator
// ============================================================================

/// Mock generator that returns queued replies
pub struct MockReplyGenerator {
    replies: Mutex<VecDeque<Result<Reply, GenerationError>>>,
    /// History passed to each call
    pub histories: Mutex<Vec<Vec<Message>>>,
}

#[allow(dead_code)]
impl MockReplyGenerator {
    pub fn new() -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
            histories: Mutex::new(Vec::new()),
        }
    }

    pub fn queue_reply(&self, reply: Reply) {
        self.replies.lock().unwrap().push_back(Ok(reply));
    }

    pub fn queue_error(&self, error: GenerationError) {
        self.replies.lock().unwrap().push_back(Err(error));
    }

    pub fn recorded_histories(&self) -> Vec<Vec<Message>> {
        self.histories.lock().unwrap().clone()
    }

    fn next(&self, history: &[Message]) -> Result<Reply, GenerationError> {
        self.histories.lock().unwrap().push(history.to_vec());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(GenerationError::unavailable("No mock reply queued")))
    }
}

impl Default for MockReplyGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ReplyGenerator for MockReplyGenerator {
    async fn generate_reply(&self, history: &[Message]) -> Result<Reply, GenerationError> {
        self.next(history)
    }

    fn name(&self) -> &str {
        "mock"
    }
}

// ============================================================================
// Delayed Mock Reply Generator (for cancellation and timeout testing)
// ============================================================================

/// Mock generator with a configurable delay
pub struct DelayedMockReplyGenerator {
    inner: MockReplyGenerator,
    delay: Duration,
    /// Notified when a request starts (for test synchronization)
    pub request_started: Arc<Notify>,
}

#[allow(dead_code)]
impl DelayedMockReplyGenerator {
    pub fn new(delay: Duration) -> Self {
        Self {
            inner: MockReplyGenerator::new(),
            delay,
            request_started: Arc::new(Notify::new()),
        }
    }

    pub fn queue_reply(&self, reply: Reply) {
        self.inner.queue_reply(reply);
    }

    pub fn queue_error(&self, error: GenerationError) {
        self.inner.queue_error(error);
    }

    pub fn call_count(&self) -> usize {
        self.inner.histories.lock().unwrap().len()
    }
}

#[async_trait]
impl ReplyGenerator for DelayedMockReplyGenerator {
    async fn generate_reply(&self, history: &[Message]) -> Result<Reply, GenerationError> {
        self.request_started.notify_one();
        tokio::time::sleep(self.delay).await;
        self.inner.next(history)
    }

    fn name(&self) -> &str {
        "delayed-mock"
    }
}

// ============================================================================
// Pending Reply Generator
// ============================================================================

/// Generator that never answers; tests deliver replies by hand
#[derive(Default)]
pub struct PendingReplyGenerator;

#[async_trait]
impl ReplyGenerator for PendingReplyGenerator {
    async fn generate_reply(&self, _history: &[Message]) -> Result<Reply, GenerationError> {
        std::future::pending().await
    }

    fn name(&self) -> &str {
        "pending"
    }
}
