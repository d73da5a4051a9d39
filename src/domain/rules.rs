//! # Rules
//!
//! Triggers and their candidate replies. A `Rule` pairs a compiled `Pattern`
//! with an ordered list of `Response` templates; the `RuleBook` holds one
//! ordered rule set per persona plus the admin set.

use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

use crate::domain::config::Persona;

/// A regular expression compiled once when the state file is loaded.
///
/// Serializes back to its source string, so a load/save cycle is lossless.
#[derive(Clone)]
pub struct Pattern(Regex);

impl Pattern {
    pub fn new(source: &str) -> Result<Self, regex::Error> {
        Regex::new(source).map(Self)
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    pub fn regex(&self) -> &Regex {
        &self.0
    }
}

impl fmt::Debug for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Pattern").field(&self.as_str()).finish()
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

impl Eq for Pattern {}

impl Serialize for Pattern {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Pattern {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let source = String::deserialize(deserializer)?;
        Pattern::new(&source)
            .map_err(|e| serde::de::Error::custom(format!("invalid pattern `{source}`: {e}")))
    }
}

/// A candidate reply and how many times it has been sent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    pub template: String,
    #[serde(default)]
    pub count: u64,
}

impl Response {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
            count: 0,
        }
    }

    /// Counts one dispatch of this response.
    pub fn record_use(&mut self) {
        self.count = self.count.saturating_add(1);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    pub pattern: Pattern,
    #[serde(default)]
    pub responses: Vec<Response>,
}

impl Rule {
    pub fn new(pattern: Pattern, responses: Vec<Response>) -> Self {
        Self { pattern, responses }
    }

    /// Rules without responses can never produce a reply and are skipped.
    pub fn is_selectable(&self) -> bool {
        !self.responses.is_empty()
    }
}

/// Which rule set a pass of the dispatcher walks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleScope {
    Admin,
    Persona(Persona),
}

impl fmt::Display for RuleScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleScope::Admin => write!(f, "admin"),
            RuleScope::Persona(persona) => write!(f, "{persona}"),
        }
    }
}

/// Ordered rule sets, one per persona plus the privileged-sender set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleBook {
    #[serde(default)]
    pub primary: Vec<Rule>,
    #[serde(default)]
    pub secondary: Vec<Rule>,
    #[serde(default)]
    pub admin: Vec<Rule>,
}

impl RuleBook {
    pub fn scope(&self, scope: RuleScope) -> &[Rule] {
        match scope {
            RuleScope::Admin => &self.admin,
            RuleScope::Persona(Persona::Primary) => &self.primary,
            RuleScope::Persona(Persona::Secondary) => &self.secondary,
        }
    }

    pub fn scope_mut(&mut self, scope: RuleScope) -> &mut Vec<Rule> {
        match scope {
            RuleScope::Admin => &mut self.admin,
            RuleScope::Persona(Persona::Primary) => &mut self.primary,
            RuleScope::Persona(Persona::Secondary) => &mut self.secondary,
        }
    }

    /// Patterns of rules that have no responses to choose from.
    pub fn unselectable(&self) -> Vec<(RuleScope, &str)> {
        [
            (RuleScope::Persona(Persona::Primary), &self.primary),
            (RuleScope::Persona(Persona::Secondary), &self.secondary),
            (RuleScope::Admin, &self.admin),
        ]
        .into_iter()
        .flat_map(|(scope, rules)| {
            rules
                .iter()
                .filter(|r| !r.is_selectable())
                .map(move |r| (scope, r.pattern.as_str()))
        })
        .collect()
    }
}
