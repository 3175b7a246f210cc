//! Pure state transition function

use super::{Effect, Event, ReplyTicket, SessionContext, SessionState};
use crate::reply::GenerationError;
use thiserror::Error;

/// Result of a state transition
#[derive(Debug)]
pub struct TransitionResult {
    pub new_state: SessionState,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(state: SessionState) -> Self {
        Self {
            new_state: state,
            effects: vec![],
        }
    }

    #[must_use]
    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }

    /// Nothing changes; used for replies that arrive after their ticket was dropped
    pub fn discarded(state: &SessionState) -> Self {
        Self::new(*state)
    }
}

/// Errors that can occur during transition
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("Message is empty")]
    EmptyInput,
    #[error("Assistant is still replying, cannot accept another message")]
    Busy,
}

/// A patient message the session has agreed to take
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcceptedMessage {
    /// Trimmed text to append
    pub content: String,
    pub ticket: ReplyTicket,
}

impl AcceptedMessage {
    pub fn new_state(&self) -> SessionState {
        SessionState::AwaitingReply {
            ticket: self.ticket,
        }
    }

    pub fn request_reply(&self) -> Effect {
        Effect::RequestReply {
            ticket: self.ticket,
        }
    }

    /// The full transition: append the message, then ask for a reply
    pub fn into_result(self) -> TransitionResult {
        let new_state = self.new_state();
        let request = self.request_reply();
        TransitionResult::new(new_state)
            .with_effect(Effect::append_patient_message(self.content))
            .with_effect(request)
    }
}

/// Decide whether a patient message can be taken in `state`.
///
/// Blank input is rejected in every state, before the busy check.
pub fn accept_patient_message(
    state: &SessionState,
    text: &str,
    ticket: ReplyTicket,
) -> Result<AcceptedMessage, TransitionError> {
    let content = text.trim();
    if content.is_empty() {
        return Err(TransitionError::EmptyInput);
    }
    match state {
        SessionState::Idle => Ok(AcceptedMessage {
            content: content.to_string(),
            ticket,
        }),
        SessionState::AwaitingReply { .. } => Err(TransitionError::Busy),
    }
}

/// Pure transition function
///
/// Given the same inputs it always produces the same outputs and performs
/// no I/O; the session executes the returned effects.
pub fn transition(
    state: &SessionState,
    _context: &SessionContext,
    event: Event,
) -> Result<TransitionResult, TransitionError> {
    match (state, event) {
        // ============================================================
        // Patient messages
        // ============================================================

        (_, Event::PatientMessage { text, ticket }) => {
            accept_patient_message(state, &text, ticket).map(AcceptedMessage::into_result)
        }

        // ============================================================
        // Reply arrival
        // ============================================================

        (SessionState::AwaitingReply { ticket: pending }, Event::ReplyReady { ticket, reply })
            if *pending == ticket =>
        {
            let content = reply.content.trim();
            if content.is_empty() {
                return Ok(TransitionResult::new(SessionState::Idle).with_effect(
                    Effect::ReportFailure {
                        error: GenerationError::invalid_reply("Generator returned an empty reply"),
                    },
                ));
            }
            Ok(TransitionResult::new(SessionState::Idle)
                .with_effect(Effect::append_assistant_message(content, reply.flagged)))
        }

        (SessionState::AwaitingReply { ticket: pending }, Event::ReplyFailed { ticket, error })
            if *pending == ticket =>
        {
            Ok(TransitionResult::new(SessionState::Idle)
                .with_effect(Effect::ReportFailure { error }))
        }

        // Cancelled or superseded request: drop it without complaint
        (_, Event::ReplyReady { .. } | Event::ReplyFailed { .. }) => {
            Ok(TransitionResult::discarded(state))
        }

        // ============================================================
        // Cancellation
        // ============================================================

        (SessionState::AwaitingReply { .. }, Event::Cancel) => {
            Ok(TransitionResult::new(SessionState::Idle).with_effect(Effect::AbortReply))
        }

        (SessionState::Idle, Event::Cancel) => Ok(TransitionResult::new(SessionState::Idle)),
    }
}
