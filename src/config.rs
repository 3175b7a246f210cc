//! Session configuration from the environment

use crate::fixtures;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_REPLY_DELAY: Duration = Duration::from_millis(1500);
pub const DEFAULT_REPLY_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_PATIENT_ID: &str = "1";

/// Runtime knobs for chat sessions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// How long the canned generator "types" before answering
    pub reply_delay: Duration,
    /// Upper bound on a single reply before it is reported as failed
    pub reply_timeout: Duration,
    pub canned_reply: String,
    /// Patient whose chat the terminal front end opens
    pub patient_id: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            reply_delay: DEFAULT_REPLY_DELAY,
            reply_timeout: DEFAULT_REPLY_TIMEOUT,
            canned_reply: fixtures::CANNED_REPLY.to_string(),
            patient_id: DEFAULT_PATIENT_ID.to_string(),
        }
    }
}

impl SessionConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup; `from_env` passes `std::env::var`
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let setting = |key: &str| parse_setting::<u64>(key, lookup(key));

        let reply_delay = setting("CARE_REPLY_DELAY_MS")
            .map_or(defaults.reply_delay, Duration::from_millis);
        let reply_timeout = setting("CARE_REPLY_TIMEOUT_SECS")
            .filter(|secs| *secs > 0)
            .map_or(defaults.reply_timeout, Duration::from_secs);
        let canned_reply = lookup("CARE_CANNED_REPLY")
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(defaults.canned_reply);
        let patient_id = lookup("CARE_PATIENT_ID")
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(defaults.patient_id);

        Self {
            reply_delay,
            reply_timeout,
            canned_reply,
            patient_id,
        }
    }
}

fn parse_setting<T: FromStr>(key: &str, raw: Option<String>) -> Option<T> {
    let raw = raw?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(key, value = %raw, "Ignoring unparseable setting, using default");
            None
        }
    }
}
