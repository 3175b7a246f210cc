//! Conversation session: message log plus turn-taking
//!
//! A session owns the ordered message log and runs the state machine.
//! `send` appends the patient's message and spawns one reply task; the
//! reply comes back through an internal channel and is applied by
//! [`ConversationSession::next_reply`], or delivered by hand through
//! [`ConversationSession::on_reply_ready`].

mod error;

pub use error::SessionError;

use crate::message::{Message, MessageId, MessageLog, Sender};
use crate::reply::{GenerationError, Reply, ReplyGenerator};
use crate::state_machine::{
    accept_patient_message, transition, Effect, Event, Phase, ReplyTicket, SessionContext,
    SessionState, TransitionResult,
};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// What executing one transition's effects produced
#[derive(Debug, Default)]
struct Applied {
    appended: Option<Message>,
    failure: Option<GenerationError>,
}

/// A single patient's chat with the assistant
pub struct ConversationSession<G>
where
    G: ReplyGenerator + 'static,
{
    context: SessionContext,
    state: SessionState,
    log: MessageLog,
    generator: Arc<G>,
    /// Ticket handed to the most recent accepted send
    last_ticket: ReplyTicket,
    reply_tx: mpsc::Sender<Event>,
    reply_rx: mpsc::Receiver<Event>,
    /// Token to cancel the running reply task
    reply_cancel_token: Option<CancellationToken>,
    disposed: bool,
}

impl<G> ConversationSession<G>
where
    G: ReplyGenerator + 'static,
{
    /// Create an idle session seeded with `seed`.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::InvalidSeed`] if the seed messages are blank,
    /// reuse an id, or are out of chronological order.
    pub fn new(
        context: SessionContext,
        generator: G,
        seed: Vec<Message>,
    ) -> Result<Self, SessionError> {
        let log = MessageLog::from_seed(seed)?;
        let (reply_tx, reply_rx) = mpsc::channel(8);

        tracing::debug!(
            session_id = %context.session_id,
            seed_len = log.len(),
            "Session created"
        );

        Ok(Self {
            context,
            state: SessionState::Idle,
            log,
            generator: Arc::new(generator),
            last_ticket: ReplyTicket::new(0),
            reply_tx,
            reply_rx,
            reply_cancel_token: None,
            disposed: false,
        })
    }

    /// Submit the patient's text.
    ///
    /// Appends the trimmed message, moves to awaiting a reply and spawns the
    /// reply task on the current tokio runtime. Returns right away with the
    /// appended message.
    ///
    /// # Errors
    ///
    /// [`SessionError::EmptyInput`] for blank text, [`SessionError::Busy`]
    /// while a reply is pending, [`SessionError::Disposed`] after disposal,
    /// [`SessionError::NoRuntime`] when called outside a tokio runtime.
    /// None of these change the session.
    pub fn send(&mut self, text: &str) -> Result<Message, SessionError> {
        self.ensure_live()?;

        let ticket = self.last_ticket.next();
        let accepted = accept_patient_message(&self.state, text, ticket).inspect_err(|e| {
            tracing::debug!(session_id = %self.context.session_id, error = %e, "Send rejected");
        })?;
        // The reply task needs a runtime; check before touching any state
        if tokio::runtime::Handle::try_current().is_err() {
            tracing::warn!(session_id = %self.context.session_id, "Send outside a tokio runtime");
            return Err(SessionError::NoRuntime);
        }

        self.last_ticket = ticket;
        let request =
            TransitionResult::new(accepted.new_state()).with_effect(accepted.request_reply());
        let message = self.append(Sender::Patient, accepted.content, false);
        self.apply(request);
        Ok(message)
    }

    /// Deliver a finished reply.
    ///
    /// Returns the appended assistant message, or `None` when the reply was
    /// discarded because its ticket is no longer pending or the session was
    /// disposed.
    ///
    /// # Errors
    ///
    /// [`SessionError::ReplyFailed`] if the reply was blank.
    pub fn on_reply_ready(
        &mut self,
        ticket: ReplyTicket,
        reply: Reply,
    ) -> Result<Option<Message>, SessionError> {
        self.resolve_reply(ticket, Ok(reply))
    }

    /// Deliver a failed reply. Stale tickets are ignored.
    ///
    /// # Errors
    ///
    /// [`SessionError::ReplyFailed`] when `ticket` is the pending one; the
    /// session is idle again and nothing was appended.
    pub fn on_reply_failed(
        &mut self,
        ticket: ReplyTicket,
        error: GenerationError,
    ) -> Result<(), SessionError> {
        self.resolve_reply(ticket, Err(error)).map(|_| ())
    }

    /// Deliver the outcome of a reply request.
    ///
    /// # Errors
    ///
    /// [`SessionError::ReplyFailed`] when the pending request failed or
    /// produced a blank reply.
    pub fn resolve_reply(
        &mut self,
        ticket: ReplyTicket,
        outcome: Result<Reply, GenerationError>,
    ) -> Result<Option<Message>, SessionError> {
        if self.disposed {
            tracing::debug!(
                session_id = %self.context.session_id,
                %ticket,
                "Reply arrived after disposal, discarding"
            );
            return Ok(None);
        }

        let event = match outcome {
            Ok(reply) => Event::ReplyReady { ticket, reply },
            Err(error) => Event::ReplyFailed { ticket, error },
        };
        self.handle_reply_event(event)
    }

    /// Wait for the in-flight reply and apply it.
    ///
    /// Returns `None` when nothing is pending or the session is disposed.
    /// Cancel safe: dropping the future never loses a reply.
    pub async fn next_reply(&mut self) -> Option<Result<Message, SessionError>> {
        while !self.disposed && self.state.pending_ticket().is_some() {
            let event = self.reply_rx.recv().await?;
            match self.handle_reply_event(event) {
                Ok(Some(message)) => return Some(Ok(message)),
                Ok(None) => {}
                Err(e) => return Some(Err(e)),
            }
        }
        None
    }

    /// Flag a message for clinician attention.
    ///
    /// Returns whether the flag changed; flagging twice is not an error.
    ///
    /// # Errors
    ///
    /// [`SessionError::NotFound`] for an unknown id, [`SessionError::Disposed`]
    /// after disposal.
    pub fn flag(&mut self, message_id: &MessageId) -> Result<bool, SessionError> {
        self.ensure_live()?;
        let changed = self.log.flag(message_id)?;
        if changed {
            tracing::info!(
                session_id = %self.context.session_id,
                message_id = %message_id,
                "Message flagged for attention"
            );
        }
        Ok(changed)
    }

    /// Stop waiting for the pending reply. Returns whether one was pending.
    pub fn cancel(&mut self) -> bool {
        if self.disposed || self.state.pending_ticket().is_none() {
            return false;
        }
        if let Ok(result) = transition(&self.state, &self.context, Event::Cancel) {
            self.apply(result);
        }
        tracing::info!(session_id = %self.context.session_id, "Pending reply cancelled");
        true
    }

    /// Tear the session down. Any in-flight reply is cancelled and replies
    /// that still arrive are ignored.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.cancel();
        self.disposed = true;
        tracing::debug!(session_id = %self.context.session_id, "Session disposed");
    }

    pub fn session_id(&self) -> &str {
        &self.context.session_id
    }

    /// Read-only view of the log in chronological order
    pub fn current_messages(&self) -> &[Message] {
        self.log.messages()
    }

    pub fn current_phase(&self) -> Phase {
        self.state.phase()
    }

    /// Whether the view should show the typing indicator
    pub fn is_typing(&self) -> bool {
        self.current_phase() == Phase::AwaitingReply
    }

    pub fn pending_ticket(&self) -> Option<ReplyTicket> {
        self.state.pending_ticket()
    }

    pub fn message(&self, id: &MessageId) -> Option<&Message> {
        self.log.get(id)
    }

    pub fn flagged_messages(&self) -> impl Iterator<Item = &Message> {
        self.log.flagged()
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    fn ensure_live(&self) -> Result<(), SessionError> {
        if self.disposed {
            Err(SessionError::Disposed)
        } else {
            Ok(())
        }
    }

    fn handle_reply_event(&mut self, event: Event) -> Result<Option<Message>, SessionError> {
        let result = transition(&self.state, &self.context, event)?;
        if result.effects.is_empty() && result.new_state == self.state {
            tracing::debug!(
                session_id = %self.context.session_id,
                "Discarding reply for a request that is no longer pending"
            );
            return Ok(None);
        }

        let applied = self.apply(result);
        match applied.failure {
            Some(error) => Err(SessionError::ReplyFailed(error)),
            None => Ok(applied.appended),
        }
    }

    /// Update state and execute effects in order
    fn apply(&mut self, result: TransitionResult) -> Applied {
        let previous = std::mem::replace(&mut self.state, result.new_state);
        if previous.phase() != self.state.phase() {
            tracing::debug!(
                session_id = %self.context.session_id,
                from = %previous.phase(),
                to = %self.state.phase(),
                "Phase changed"
            );
        }

        let mut applied = Applied::default();
        for effect in result.effects {
            match effect {
                Effect::AppendMessage {
                    sender,
                    content,
                    flagged,
                } => applied.appended = Some(self.append(sender, content, flagged)),
                Effect::RequestReply { ticket } => self.spawn_reply(ticket),
                Effect::AbortReply => self.abort_reply(),
                Effect::ReportFailure { error } => {
                    tracing::warn!(
                        session_id = %self.context.session_id,
                        error = %error,
                        kind = ?error.kind,
                        "Reply failed"
                    );
                    applied.failure = Some(error);
                }
            }
        }

        // Leaving the awaiting state by any route ends the reply task
        if self.state == SessionState::Idle {
            self.abort_reply();
        }

        applied
    }

    fn append(&mut self, sender: Sender, content: String, flagged: bool) -> Message {
        let message = self.log.append(sender, content, flagged).clone();
        tracing::debug!(
            session_id = %self.context.session_id,
            message_id = %message.id(),
            sender = %sender,
            flagged,
            "Message appended"
        );
        message
    }

    fn spawn_reply(&mut self, ticket: ReplyTicket) {
        let cancel_token = CancellationToken::new();
        if let Some(previous) = self.reply_cancel_token.replace(cancel_token.clone()) {
            previous.cancel();
        }

        let generator = Arc::clone(&self.generator);
        let history = self.log.messages().to_vec();
        let reply_tx = self.reply_tx.clone();
        let reply_timeout = self.context.reply_timeout;
        let session_id = self.context.session_id.clone();

        tokio::spawn(async move {
            tracing::debug!(
                session_id = %session_id,
                %ticket,
                history_len = history.len(),
                "Requesting reply (background)"
            );

            let generation = tokio::time::timeout(reply_timeout, generator.generate_reply(&history));
            let outcome = tokio::select! {
                () = cancel_token.cancelled() => {
                    tracing::debug!(session_id = %session_id, %ticket, "Reply task cancelled");
                    return;
                }
                result = generation => {
                    result.unwrap_or_else(|_| {
                        Err(GenerationError::timed_out(format!(
                            "No reply within {reply_timeout:?}"
                        )))
                    })
                }
            };

            let event = match outcome {
                Ok(reply) => Event::ReplyReady { ticket, reply },
                Err(error) => Event::ReplyFailed { ticket, error },
            };
            // A closed channel means the session was dropped
            let _ = reply_tx.send(event).await;
        });
    }

    fn abort_reply(&mut self) {
        if let Some(token) = self.reply_cancel_token.take() {
            token.cancel();
        }
    }
}

impl<G> Drop for ConversationSession<G>
where
    G: ReplyGenerator + 'static,
{
    fn drop(&mut self) {
        self.abort_reply();
    }
}
