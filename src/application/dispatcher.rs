//! # Dispatcher
//!
//! Routes each incoming message through the gate, the rule sets, the
//! selector and the formatter, sends the resulting lines and persists the
//! state. Owns the `EngineState`; the reactor in `main` feeds it one message
//! at a time so state changes are never interleaved.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::sync::Arc;
use std::time::Duration;

use crate::application::formatter::ReplyFormatter;
use crate::application::matcher;
use crate::application::selector;
use crate::application::state::{EngineState, StateStore};
use crate::domain::rules::RuleScope;
use crate::domain::traits::{ChatTransport, Pacer};
use crate::domain::types::{MessageEvent, Reply};

type Clock = Box<dyn Fn() -> DateTime<Utc> + Send + Sync>;

pub struct Dispatcher {
    state: EngineState,
    store: StateStore,
    transport: Arc<dyn ChatTransport>,
    pacer: Arc<dyn Pacer>,
    rng: StdRng,
    clock: Clock,
}

impl Dispatcher {
    pub fn new(
        state: EngineState,
        store: StateStore,
        transport: Arc<dyn ChatTransport>,
        pacer: Arc<dyn Pacer>,
    ) -> Self {
        Self {
            state,
            store,
            transport,
            pacer,
            rng: StdRng::from_os_rng(),
            clock: Box::new(Utc::now),
        }
    }

    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.rng = rng;
        self
    }

    pub fn with_clock(mut self, clock: impl Fn() -> DateTime<Utc> + Send + Sync + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn state(&self) -> &EngineState {
        &self.state
    }

    /// Handles one message. Returns whether a reply was sent.
    ///
    /// Admin messages try the admin rules first and fall back to the
    /// persona's rules when those produce nothing.
    pub async fn on_message(&mut self, event: MessageEvent) -> Result<bool> {
        let decision = matcher::should_consider(&self.state, &event, (self.clock)());
        if !decision.is_allowed() {
            tracing::debug!("Ignoring message from {}: {:?}", event.from, decision);
            return Ok(false);
        }

        if self.state.is_admin(&event.from) {
            let mut admin_event = event.clone();
            if self.run_rules(RuleScope::Admin, &mut admin_event).await? {
                return Ok(true);
            }
        }

        let mut event = event;
        let scope = self.state.persona_scope();
        self.run_rules(scope, &mut event).await
    }

    /// Walks one rule set. The first matching rule decides the outcome, even
    /// when its reply comes out empty.
    async fn run_rules(&mut self, scope: RuleScope, event: &mut MessageEvent) -> Result<bool> {
        let rules = self.state.rules.scope(scope);
        let Some(rule_idx) = rules
            .iter()
            .position(|r| r.is_selectable() && matcher::matches(&r.pattern, &event.content))
        else {
            return Ok(false);
        };
        let rule = &rules[rule_idx];
        let Some(choice) = selector::select(&rule.responses, &mut self.rng) else {
            return Ok(false);
        };
        let pattern = rule.pattern.clone();
        let template = rule.responses[choice].template.clone();

        tracing::info!(
            "Dispatching {} rule `{}` (response {}) for {}",
            scope,
            pattern.as_str(),
            choice,
            event.from
        );

        let grounded_before = self.state.grounded.clone();
        let reply = ReplyFormatter::format(&mut self.state, event, &pattern, &template);
        if reply.is_empty() {
            tracing::debug!("Rule `{}` produced an empty reply", pattern.as_str());
            if self.state.grounded != grounded_before {
                self.persist()?;
            }
            return Ok(false);
        }

        // A partially delivered reply still counts and still starts the rate limit.
        let mut delivered = 0;
        let sent = self.send_reply(&reply, &mut delivered).await;
        if delivered > 0 {
            self.state.rules.scope_mut(scope)[rule_idx].responses[choice].record_use();
            self.state.record_reply(&reply, (self.clock)());
        }
        self.persist()?;
        sent?;
        Ok(true)
    }

    fn persist(&self) -> Result<()> {
        self.store
            .save(&self.state)
            .with_context(|| format!("failed to persist state to {}", self.store.path().display()))
    }

    /// Sends the non-empty lines in order, pausing between them. `delivered`
    /// counts the lines the transport accepted before any failure.
    async fn send_reply(&self, reply: &Reply, delivered: &mut usize) -> Result<()> {
        let lines: Vec<&str> = reply.sendable_lines().collect();
        let delay = Duration::from_secs(self.state.line_delay);
        for (i, line) in lines.iter().enumerate() {
            self.transport
                .send(&reply.destination, line)
                .await
                .with_context(|| format!("failed to send reply to {}", reply.destination))?;
            *delivered += 1;
            if i + 1 < lines.len() {
                self.pacer.pause(delay).await;
            }
        }
        Ok(())
    }
}
