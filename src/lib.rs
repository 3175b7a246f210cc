//! Care portal chat core
//!
//! Client-side conversation sessions between a patient and the care
//! assistant: an ordered message log, strict turn-taking while a reply is
//! pending, and flagging of messages for clinician attention.

#![allow(clippy::must_use_candidate, clippy::return_self_not_must_use)]

pub mod config;
pub mod fixtures;
pub mod message;
pub mod reply;
pub mod roster;
pub mod runtime;
pub mod session;
pub mod state_machine;

pub use config::SessionConfig;
pub use message::{Message, MessageId, Sender};
pub use reply::{CannedReplyGenerator, GenerationError, LoggingGenerator, Reply, ReplyGenerator};
pub use runtime::{SessionEvent, SessionHandle, SessionManager};
pub use session::{ConversationSession, SessionError};
pub use state_machine::Phase;
