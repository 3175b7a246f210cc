//! Session state types

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::config::DEFAULT_REPLY_TIMEOUT;

/// Identifies one reply request within a session.
///
/// Every accepted send gets a new ticket; a reply is applied only when it
/// carries the ticket the session is still waiting on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReplyTicket(u64);

impl ReplyTicket {
    pub fn new(generation: u64) -> Self {
        Self(generation)
    }

    pub fn generation(self) -> u64 {
        self.0
    }

    #[must_use]
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for ReplyTicket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Turn-taking state of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionState {
    /// Ready for the patient's next message
    #[default]
    Idle,
    /// A reply is in flight
    AwaitingReply { ticket: ReplyTicket },
}

impl SessionState {
    pub fn phase(&self) -> Phase {
        match self {
            SessionState::Idle => Phase::Idle,
            SessionState::AwaitingReply { .. } => Phase::AwaitingReply,
        }
    }

    pub fn pending_ticket(&self) -> Option<ReplyTicket> {
        match self {
            SessionState::Idle => None,
            SessionState::AwaitingReply { ticket } => Some(*ticket),
        }
    }
}

/// What views see of the session state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Idle,
    AwaitingReply,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Idle => write!(f, "idle"),
            Phase::AwaitingReply => write!(f, "awaiting_reply"),
        }
    }
}

/// Context for a session (immutable configuration)
#[derive(Debug, Clone)]
pub struct SessionContext {
    pub session_id: String,
    pub reply_timeout: Duration,
}

impl SessionContext {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            reply_timeout: DEFAULT_REPLY_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_reply_timeout(mut self, reply_timeout: Duration) -> Self {
        self.reply_timeout = reply_timeout;
        self
    }
}
