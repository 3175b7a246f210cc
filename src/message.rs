//! Chat messages and the append-only message log

use crate::session::SessionError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Opaque message identifier, never reused
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(String);

impl MessageId {
    /// Allocate a fresh identifier
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for MessageId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for MessageId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Who authored a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sender {
    Patient,
    Assistant,
}

impl fmt::Display for Sender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sender::Patient => write!(f, "patient"),
            Sender::Assistant => write!(f, "assistant"),
        }
    }
}

/// A single chat message.
///
/// Everything except `flagged` is fixed at construction; `flagged` only
/// ever moves from false to true.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    id: MessageId,
    content: String,
    sender: Sender,
    timestamp: DateTime<Utc>,
    #[serde(default)]
    flagged: bool,
}

impl Message {
    pub fn new(sender: Sender, content: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: MessageId::generate(),
            content: content.into(),
            sender,
            timestamp,
            flagged: false,
        }
    }

    /// Use a caller-chosen id (fixtures and transcripts imported from elsewhere)
    #[must_use]
    pub fn with_id(mut self, id: impl Into<MessageId>) -> Self {
        self.id = id.into();
        self
    }

    /// Mark a fixture message as already flagged for clinician attention
    #[must_use]
    pub fn flagged(mut self) -> Self {
        self.flagged = true;
        self
    }

    pub fn id(&self) -> &MessageId {
        &self.id
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn sender(&self) -> Sender {
        self.sender
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn is_flagged(&self) -> bool {
        self.flagged
    }
}

/// Ordered, append-only sequence of messages
#[derive(Debug, Clone, Default)]
pub struct MessageLog {
    messages: Vec<Message>,
    ids: HashSet<MessageId>,
}

impl MessageLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a log from seed messages.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::InvalidSeed`] when a seed message is blank,
    /// an id repeats, or timestamps go backwards.
    pub fn from_seed(seed: Vec<Message>) -> Result<Self, SessionError> {
        let mut log = Self::new();
        for message in seed {
            if message.content.trim().is_empty() {
                return Err(SessionError::InvalidSeed(format!(
                    "message {} has no content",
                    message.id
                )));
            }
            if log.ids.contains(&message.id) {
                return Err(SessionError::InvalidSeed(format!(
                    "duplicate message id {}",
                    message.id
                )));
            }
            if let Some(last) = log.messages.last() {
                if message.timestamp < last.timestamp {
                    return Err(SessionError::InvalidSeed(format!(
                        "message {} is older than the message before it",
                        message.id
                    )));
                }
            }
            log.ids.insert(message.id.clone());
            log.messages.push(message);
        }
        Ok(log)
    }

    /// Append a new message stamped with the current time.
    ///
    /// The wall clock can step backwards; the timestamp is clamped to the
    /// previous message so the log stays ordered.
    pub fn append(
        &mut self,
        sender: Sender,
        content: impl Into<String>,
        flagged: bool,
    ) -> &Message {
        let now = Utc::now();
        let timestamp = match self.messages.last() {
            Some(last) if last.timestamp > now => last.timestamp,
            _ => now,
        };

        let mut id = MessageId::generate();
        while self.ids.contains(&id) {
            id = MessageId::generate();
        }

        self.ids.insert(id.clone());
        self.messages.push(Message {
            id,
            content: content.into(),
            sender,
            timestamp,
            flagged,
        });
        &self.messages[self.messages.len() - 1]
    }

    /// Flag a message for clinician attention.
    ///
    /// Returns `true` if the flag changed, `false` if it was already set.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NotFound`] if no message has this id.
    pub fn flag(&mut self, id: &MessageId) -> Result<bool, SessionError> {
        let message = self
            .messages
            .iter_mut()
            .find(|m| &m.id == id)
            .ok_or_else(|| SessionError::NotFound(id.clone()))?;

        if message.flagged {
            return Ok(false);
        }
        message.flagged = true;
        Ok(true)
    }

    pub fn get(&self, id: &MessageId) -> Option<&Message> {
        self.messages.iter().find(|m| &m.id == id)
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn flagged(&self) -> impl Iterator<Item = &Message> {
        self.messages.iter().filter(|m| m.flagged)
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}
