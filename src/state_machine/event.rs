//! Events that drive the session state machine

use super::state::ReplyTicket;
use crate::reply::{GenerationError, Reply};

/// Events that trigger state transitions
#[derive(Debug, Clone)]
pub enum Event {
    /// The patient submitted text; `ticket` is reserved for its reply
    PatientMessage { text: String, ticket: ReplyTicket },

    /// The generator finished
    ReplyReady { ticket: ReplyTicket, reply: Reply },
    ReplyFailed {
        ticket: ReplyTicket,
        error: GenerationError,
    },

    /// Stop waiting for the pending reply
    Cancel,
}
