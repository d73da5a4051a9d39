//! # Domain Types
//!
//! Messages flowing in from the transport and replies flowing back out.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An incoming chat message.
///
/// `content` is consumed by the formatter while a reply is built, so the
/// dispatcher hands each rule pass its own copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageEvent {
    pub from: String,
    pub to: String,
    pub content: String,
}

impl MessageEvent {
    pub fn new(from: impl Into<String>, to: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            content: content.into(),
        }
    }
}

/// A formatted reply, ready to be sent line by line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reply {
    pub lines: Vec<String>,
    pub destination: String,
}

impl Reply {
    pub fn new(message: &str, destination: impl Into<String>) -> Self {
        let lines = if message.is_empty() {
            Vec::new()
        } else {
            message.split('\n').map(str::to_string).collect()
        };
        Self {
            lines,
            destination: destination.into(),
        }
    }

    /// Lines that actually go out; blank lines are dropped.
    pub fn sendable_lines(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().map(String::as_str).filter(|l| !l.is_empty())
    }

    pub fn is_empty(&self) -> bool {
        self.sendable_lines().next().is_none()
    }
}

/// The last reply that went out, kept for rate limiting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LastReply {
    pub lines: Vec<String>,
    pub destination: String,
    pub sent_at: DateTime<Utc>,
}

/// Matrix user ids look like `@name:server`; the localpart is `name`.
/// Anything else is returned unchanged.
pub fn localpart(identity: &str) -> &str {
    match identity.strip_prefix('@') {
        Some(rest) => rest.split(':').next().unwrap_or(rest),
        None => identity,
    }
}
