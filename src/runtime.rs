//! Runtime for open chat sessions
//!
//! Each open session is owned by one [`SessionRuntime`] task. Views talk to
//! it through a [`SessionHandle`] and watch it through broadcast
//! [`SessionEvent`]s; they never touch the session directly.

mod executor;


pub use executor::SessionRuntime;

use crate::config::SessionConfig;
use crate::message::{Message, MessageId};
use crate::reply::ReplyGenerator;
use crate::session::{ConversationSession, SessionError};
use crate::state_machine::{Phase, SessionContext};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, oneshot, RwLock};

/// Requests a view can make of a running session
#[derive(Debug)]
pub enum Command {
    Send {
        text: String,
        respond_to: oneshot::Sender<Result<Message, SessionError>>,
    },
    Flag {
        message_id: MessageId,
        respond_to: oneshot::Sender<Result<bool, SessionError>>,
    },
    Cancel {
        respond_to: oneshot::Sender<bool>,
    },
    Snapshot {
        respond_to: oneshot::Sender<SessionSnapshot>,
    },
    Dispose,
}

/// Events sent to subscribed views
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    Message { message: Message },
    PhaseChange { phase: Phase },
    Flagged { message_id: MessageId },
    Error { message: String },
}

impl SessionEvent {
    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// Point-in-time copy of a session for rendering
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSnapshot {
    pub session_id: String,
    pub messages: Vec<Message>,
    pub phase: Phase,
}

/// Handle to interact with a running session
#[derive(Debug, Clone)]
pub struct SessionHandle {
    session_id: String,
    command_tx: mpsc::Sender<Command>,
    broadcast_tx: broadcast::Sender<SessionEvent>,
}

impl SessionHandle {
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Whether the runtime behind this handle is still running
    pub fn is_open(&self) -> bool {
        !self.command_tx.is_closed()
    }

    /// Subscribe to session events. Subscribe before sending to see the reply.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.broadcast_tx.subscribe()
    }

    /// Send the patient's text; returns once the message is appended.
    ///
    /// # Errors
    ///
    /// Whatever [`ConversationSession::send`] returns, or
    /// [`SessionError::Disposed`] if the runtime has stopped.
    pub async fn send_message(&self, text: impl Into<String>) -> Result<Message, SessionError> {
        let (respond_to, response) = oneshot::channel();
        self.request(Command::Send {
            text: text.into(),
            respond_to,
        })
        .await?;
        response.await.map_err(|_| SessionError::Disposed)?
    }

    /// Flag a message for clinician attention.
    ///
    /// # Errors
    ///
    /// [`SessionError::NotFound`] for an unknown message,
    /// [`SessionError::Disposed`] if the runtime has stopped.
    pub async fn flag(&self, message_id: MessageId) -> Result<bool, SessionError> {
        let (respond_to, response) = oneshot::channel();
        self.request(Command::Flag {
            message_id,
            respond_to,
        })
        .await?;
        response.await.map_err(|_| SessionError::Disposed)?
    }

    /// Cancel the pending reply, returning whether one was pending.
    ///
    /// # Errors
    ///
    /// [`SessionError::Disposed`] if the runtime has stopped.
    pub async fn cancel(&self) -> Result<bool, SessionError> {
        let (respond_to, response) = oneshot::channel();
        self.request(Command::Cancel { respond_to }).await?;
        response.await.map_err(|_| SessionError::Disposed)
    }

    /// # Errors
    ///
    /// [`SessionError::Disposed`] if the runtime has stopped.
    pub async fn snapshot(&self) -> Result<SessionSnapshot, SessionError> {
        let (respond_to, response) = oneshot::channel();
        self.request(Command::Snapshot { respond_to }).await?;
        response.await.map_err(|_| SessionError::Disposed)
    }

    /// Stop the runtime; later requests fail with `Disposed`
    pub async fn dispose(&self) {
        let _ = self.command_tx.send(Command::Dispose).await;
    }

    async fn request(&self, command: Command) -> Result<(), SessionError> {
        self.command_tx
            .send(command)
            .await
            .map_err(|_| SessionError::Disposed)
    }
}

/// Spawn a runtime task for `session` and return its handle
pub fn start<G>(session: ConversationSession<G>) -> SessionHandle
where
    G: ReplyGenerator + 'static,
{
    let session_id = session.session_id().to_string();
    let (command_tx, command_rx) = mpsc::channel(32);
    let (broadcast_tx, _) = broadcast::channel(128);

    let runtime = SessionRuntime::new(session, command_rx, broadcast_tx.clone());
    let task_session_id = session_id.clone();
    tokio::spawn(async move {
        runtime.run().await;
        tracing::info!(session_id = %task_session_id, "Session runtime finished");
    });

    SessionHandle {
        session_id,
        command_tx,
        broadcast_tx,
    }
}

/// Manager for all open sessions, keyed by patient
pub struct SessionManager<G>
where
    G: ReplyGenerator + 'static,
{
    config: SessionConfig,
    generator: Arc<G>,
    sessions: RwLock<HashMap<String, SessionHandle>>,
}

impl<G> SessionManager<G>
where
    G: ReplyGenerator + 'static,
{
    pub fn new(config: SessionConfig, generator: G) -> Self {
        Self {
            config,
            generator: Arc::new(generator),
            sessions: RwLock::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Get the running session for `session_id`, or start one seeded with `seed`.
    ///
    /// The seed is ignored when the session is already open.
    ///
    /// # Errors
    ///
    /// [`SessionError::InvalidSeed`] if a new session cannot be built from `seed`.
    pub async fn open(
        &self,
        session_id: &str,
        seed: Vec<Message>,
    ) -> Result<SessionHandle, SessionError> {
        let mut sessions = self.sessions.write().await;
        if let Some(handle) = sessions.get(session_id) {
            if handle.is_open() {
                return Ok(handle.clone());
            }
            tracing::debug!(session_id, "Replacing stopped session runtime");
        }

        let context =
            SessionContext::new(session_id).with_reply_timeout(self.config.reply_timeout);
        let session = ConversationSession::new(context, Arc::clone(&self.generator), seed)?;
        let handle = start(session);

        tracing::info!(session_id, "Session opened");
        sessions.insert(session_id.to_string(), handle.clone());
        Ok(handle)
    }

    pub async fn get(&self, session_id: &str) -> Option<SessionHandle> {
        let mut sessions = self.sessions.write().await;
        prune_stopped(&mut sessions);
        sessions.get(session_id).cloned()
    }

    /// Flag a message in a patient's open session (clinician review path).
    ///
    /// # Errors
    ///
    /// [`SessionError::UnknownSession`] if no such session is open, otherwise
    /// whatever [`SessionHandle::flag`] returns.
    pub async fn flag(
        &self,
        session_id: &str,
        message_id: MessageId,
    ) -> Result<bool, SessionError> {
        let handle = self
            .get(session_id)
            .await
            .ok_or_else(|| SessionError::UnknownSession(session_id.to_string()))?;
        handle.flag(message_id).await
    }

    /// Dispose and forget a session. Returns whether it was open.
    pub async fn close(&self, session_id: &str) -> bool {
        let removed = self.sessions.write().await.remove(session_id);
        match removed {
            Some(handle) => {
                handle.dispose().await;
                tracing::info!(session_id, "Session closed");
                true
            }
            None => false,
        }
    }

    pub async fn session_ids(&self) -> Vec<String> {
        let mut sessions = self.sessions.write().await;
        prune_stopped(&mut sessions);
        let mut ids: Vec<String> = sessions.keys().cloned().collect();
        ids.sort();
        ids
    }
}

/// Drop handles whose runtime stopped without going through `close`
fn prune_stopped(sessions: &mut HashMap<String, SessionHandle>) {
    sessions.retain(|session_id, handle| {
        let open = handle.is_open();
        if !open {
            tracing::debug!(session_id = %session_id, "Forgetting stopped session runtime");
        }
        open
    });
}
