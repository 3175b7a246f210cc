//! Session runtime executor

use super::{Command, SessionEvent, SessionSnapshot};
use crate::message::Message;
use crate::reply::ReplyGenerator;
use crate::session::{ConversationSession, SessionError};
use crate::state_machine::Phase;
use tokio::sync::{broadcast, mpsc};

/// Event loop that owns one session
pub struct SessionRuntime<G>
where
    G: ReplyGenerator + 'static,
{
    session: ConversationSession<G>,
    command_rx: mpsc::Receiver<Command>,
    broadcast_tx: broadcast::Sender<SessionEvent>,
}

impl<G> SessionRuntime<G>
where
    G: ReplyGenerator + 'static,
{
    pub fn new(
        session: ConversationSession<G>,
        command_rx: mpsc::Receiver<Command>,
        broadcast_tx: broadcast::Sender<SessionEvent>,
    ) -> Self {
        Self {
            session,
            command_rx,
            broadcast_tx,
        }
    }

    /// Process commands and replies until disposed or every handle is dropped
    pub async fn run(mut self) {
        tracing::info!(session_id = %self.session.session_id(), "Starting session runtime");

        loop {
            let awaiting_reply = self.session.is_typing();
            tokio::select! {
                command = self.command_rx.recv() => match command {
                    Some(Command::Dispose) | None => break,
                    Some(command) => self.handle_command(command),
                },
                Some(outcome) = self.session.next_reply(), if awaiting_reply => {
                    self.handle_reply(outcome);
                }
            }
        }

        let was_typing = self.session.is_typing();
        self.session.dispose();
        if was_typing {
            self.broadcast(SessionEvent::PhaseChange { phase: Phase::Idle });
        }
        tracing::info!(session_id = %self.session.session_id(), "Session runtime stopped");
    }

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::Send { text, respond_to } => {
                let result = self.session.send(&text);
                match &result {
                    Ok(message) => {
                        self.broadcast(SessionEvent::Message {
                            message: message.clone(),
                        });
                        self.broadcast(SessionEvent::PhaseChange {
                            phase: self.session.current_phase(),
                        });
                    }
                    // Rejections are user-facing (e.g. "still replying")
                    Err(e) => self.broadcast(SessionEvent::Error {
                        message: e.to_string(),
                    }),
                }
                let _ = respond_to.send(result);
            }

            Command::Flag {
                message_id,
                respond_to,
            } => {
                let result = self.session.flag(&message_id);
                if matches!(result, Ok(true)) {
                    self.broadcast(SessionEvent::Flagged { message_id });
                }
                let _ = respond_to.send(result);
            }

            Command::Cancel { respond_to } => {
                let cancelled = self.session.cancel();
                if cancelled {
                    self.broadcast(SessionEvent::PhaseChange {
                        phase: self.session.current_phase(),
                    });
                }
                let _ = respond_to.send(cancelled);
            }

            Command::Snapshot { respond_to } => {
                let _ = respond_to.send(self.snapshot());
            }

            // Handled by the run loop
            Command::Dispose => {}
        }
    }

    fn handle_reply(&mut self, outcome: Result<Message, SessionError>) {
        match outcome {
            Ok(message) => self.broadcast(SessionEvent::Message { message }),
            Err(e) => self.broadcast(SessionEvent::Error {
                message: e.to_string(),
            }),
        }
        self.broadcast(SessionEvent::PhaseChange {
            phase: self.session.current_phase(),
        });
    }

    fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            session_id: self.session.session_id().to_string(),
            messages: self.session.current_messages().to_vec(),
            phase: self.session.current_phase(),
        }
    }

    fn broadcast(&self, event: SessionEvent) {
        // No subscribers is fine
        let _ = self.broadcast_tx.send(event);
    }
}
