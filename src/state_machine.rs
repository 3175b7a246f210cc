//! Turn-taking state machine for a chat session
//!
//! Implements the Elm Architecture pattern with pure state transitions:
//! the session feeds events in and executes the effects that come out.

mod effect;
pub mod event;
pub mod state;
pub(crate) mod transition;

#[cfg(test)]
mod proptests;

pub use effect::Effect;
pub use event::Event;
pub use state::{Phase, ReplyTicket, SessionContext, SessionState};
pub use transition::{
    accept_patient_message, transition, AcceptedMessage, TransitionError, TransitionResult,
};
