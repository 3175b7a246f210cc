//! Effects produced by state transitions

use super::state::ReplyTicket;
use crate::message::Sender;
use crate::reply::GenerationError;

/// Effects to be executed after a state transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Append a message to the log
    AppendMessage {
        sender: Sender,
        content: String,
        flagged: bool,
    },

    /// Start generating the reply for `ticket` (spawns a background task)
    RequestReply { ticket: ReplyTicket },

    /// Abort the in-flight reply
    AbortReply,

    /// Tell the caller the pending reply failed
    ReportFailure { error: GenerationError },
}

impl Effect {
    pub fn append_patient_message(content: impl Into<String>) -> Self {
        Effect::AppendMessage {
            sender: Sender::Patient,
            content: content.into(),
            flagged: false,
        }
    }

    pub fn append_assistant_message(content: impl Into<String>, flagged: bool) -> Self {
        Effect::AppendMessage {
            sender: Sender::Assistant,
            content: content.into(),
            flagged,
        }
    }
}
