//! # Match Engine
//!
//! Decides whether an incoming message is worth looking at (`should_consider`)
//! and whether a rule's pattern fires on it (`matches`).

use chrono::{DateTime, Duration, Utc};

use crate::application::state::EngineState;
use crate::domain::rules::Pattern;
use crate::domain::types::{MessageEvent, localpart};

/// Outcome of the per-message gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    Allowed,
    Grounded,
    OwnMessage,
    RateLimited,
}

impl GateDecision {
    pub fn is_allowed(self) -> bool {
        self == GateDecision::Allowed
    }
}

/// Runs once per message, before any rule is tried.
pub fn should_consider(state: &EngineState, event: &MessageEvent, now: DateTime<Utc>) -> GateDecision {
    if state.grounded.contains(&event.from) {
        return GateDecision::Grounded;
    }
    if is_own_message(state, &event.from) {
        return GateDecision::OwnMessage;
    }
    if !state.is_admin(&event.from) && !rate_limit_elapsed(state, now) {
        return GateDecision::RateLimited;
    }
    GateDecision::Allowed
}

pub fn matches(pattern: &Pattern, text: &str) -> bool {
    pattern.regex().is_match(text)
}

fn is_own_message(state: &EngineState, sender: &str) -> bool {
    if state.own_identity.as_deref() == Some(sender) {
        return true;
    }
    let sender_local = localpart(sender);
    state
        .names
        .all()
        .any(|name| sender.eq_ignore_ascii_case(name) || sender_local.eq_ignore_ascii_case(name))
}

fn rate_limit_elapsed(state: &EngineState, now: DateTime<Utc>) -> bool {
    if state.message_rate == 0 {
        return true;
    }
    let Some(last) = &state.last_reply else {
        return true;
    };
    match i64::try_from(state.message_rate).ok().and_then(Duration::try_seconds) {
        Some(interval) => now.signed_duration_since(last.sent_at) > interval,
        None => false,
    }
}
