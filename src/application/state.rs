//! # Engine State
//!
//! Defines the persistent state of the bot (`EngineState`): identity and
//! connection settings, rule sets with their usage counters, the grounded
//! list and the last reply. The whole struct is the unit of persistence and
//! is rewritten after every handled message.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::application::grounding::GroundedSet;
use crate::domain::config::{
    MatrixConfig, Persona, PersonaNames, default_group_markers, default_line_delay,
    default_message_rate,
};
use crate::domain::rules::{RuleBook, RuleScope};
use crate::domain::types::{LastReply, Reply};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineState {
    #[serde(default)]
    pub persona: Persona,
    pub admin: String,
    pub names: PersonaNames,
    pub matrix: MatrixConfig,
    #[serde(default)]
    pub channels: Vec<String>,
    #[serde(default)]
    pub rules: RuleBook,
    #[serde(default)]
    pub grounded: GroundedSet,
    /// Seconds that must pass after a reply before the next one (admin exempt).
    #[serde(default = "default_message_rate")]
    pub message_rate: u64,
    /// Seconds between the lines of a multi-line reply.
    #[serde(default = "default_line_delay")]
    pub line_delay: u64,
    #[serde(default = "default_group_markers")]
    pub group_markers: Vec<String>,
    #[serde(default)]
    pub debug: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_reply: Option<LastReply>,
    /// Identity the transport logged in as; learned at runtime, never saved.
    #[serde(skip)]
    pub own_identity: Option<String>,
}

impl EngineState {
    pub fn is_admin(&self, identity: &str) -> bool {
        !self.admin.is_empty() && self.admin == identity
    }

    pub fn persona_scope(&self) -> RuleScope {
        RuleScope::Persona(self.persona)
    }

    pub fn active_name(&self) -> &str {
        self.names.name_of(self.persona)
    }

    pub fn is_group(&self, destination: &str) -> bool {
        self.group_markers
            .iter()
            .any(|m| !m.is_empty() && destination.starts_with(m.as_str()))
    }

    /// Records a dispatched reply. The timestamp never moves backwards.
    pub fn record_reply(&mut self, reply: &Reply, now: DateTime<Utc>) {
        let sent_at = match &self.last_reply {
            Some(last) if last.sent_at > now => last.sent_at,
            _ => now,
        };
        self.last_reply = Some(LastReply {
            lines: reply.sendable_lines().map(str::to_string).collect(),
            destination: reply.destination.clone(),
            sent_at,
        });
    }
}

#[derive(Debug, Error)]
pub enum StateError {
    #[error("failed to read state file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse state file {path}: {message}")]
    Parse { path: PathBuf, message: String },
    #[error("failed to serialize state: {0}")]
    Serialize(String),
    #[error("failed to write state file {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// On-disk encoding, picked from the file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateFormat {
    Json,
    Yaml,
}

impl StateFormat {
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml") => {
                StateFormat::Yaml
            }
            _ => StateFormat::Json,
        }
    }
}

/// Loads and saves `EngineState` at a fixed path.
#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
    format: StateFormat,
}

impl StateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let format = StateFormat::from_path(&path);
        Self { path, format }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the state file. A missing or malformed file (including an
    /// uncompilable rule pattern) is an error; there is no default state.
    pub fn load(&self) -> Result<EngineState, StateError> {
        let content = fs::read_to_string(&self.path).map_err(|source| StateError::Read {
            path: self.path.clone(),
            source,
        })?;
        let parsed = match self.format {
            StateFormat::Json => serde_json::from_str(&content).map_err(|e| e.to_string()),
            StateFormat::Yaml => serde_yaml::from_str(&content).map_err(|e| e.to_string()),
        };
        parsed.map_err(|message| StateError::Parse {
            path: self.path.clone(),
            message,
        })
    }

    /// Persists the full state. Written to a temporary file next to the
    /// target and renamed over it, so a crash never leaves a torn file.
    pub fn save(&self, state: &EngineState) -> Result<(), StateError> {
        let content = match self.format {
            StateFormat::Json => serde_json::to_string_pretty(state).map_err(|e| e.to_string()),
            StateFormat::Yaml => serde_yaml::to_string(state).map_err(|e| e.to_string()),
        }
        .map_err(StateError::Serialize)?;

        let write_err = |source| StateError::Write {
            path: self.path.clone(),
            source,
        };
        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(write_err)?;
        tmp.write_all(content.as_bytes()).map_err(write_err)?;
        tmp.as_file().sync_all().map_err(write_err)?;
        tmp.persist(&self.path).map_err(|e| write_err(e.error))?;
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::domain::rules::{Pattern, Response, Rule};
    use chrono::Duration;
    use tempfile::TempDir;

    pub(crate) fn sample_state() -> EngineState {
        EngineState {
            persona: Persona::Primary,
            admin: "@admin:example.org".to_string(),
            names: PersonaNames {
                primary: "dad".to_string(),
                secondary: Some("mom".to_string()),
            },
            matrix: MatrixConfig {
                homeserver: "https://matrix.example.org".to_string(),
                username: "dad".to_string(),
                password: "hunter2".to_string(),
            },
            channels: vec!["#family:example.org".to_string()],
            rules: RuleBook {
                primary: vec![Rule::new(
                    Pattern::new("(?i)^i'?m ").unwrap(),
                    vec![Response::new("Hi [user], I'm dad")],
                )],
                secondary: Vec::new(),
                admin: vec![Rule::new(
                    Pattern::new("^ground ").unwrap(),
                    vec![Response::new("grounding [ground]")],
                )],
            },
            grounded: GroundedSet::default(),
            message_rate: 10,
            line_delay: 2,
            group_markers: default_group_markers(),
            debug: false,
            last_reply: None,
            own_identity: None,
        }
    }

    #[test]
    fn test_state_roundtrip_json() {
        let dir = TempDir::new().unwrap();
        let store = StateStore::new(dir.path().join("conf.json"));

        let mut state = sample_state();
        state.grounded.add("alice");
        state.rules.primary[0].responses[0].count = 7;
        store.save(&state).unwrap();

        let loaded = store.load().unwrap();
        assert_eq!(loaded.rules, state.rules);
        assert_eq!(loaded.grounded, state.grounded);
        assert_eq!(loaded.rules.primary[0].responses[0].count, 7);
    }

    #[test]
    fn test_state_roundtrip_yaml() {
        let dir = TempDir::new().unwrap();
        let store = StateStore::new(dir.path().join("conf.yaml"));

        let mut state = sample_state();
        state.grounded.add("bob");
        state.record_reply(&Reply::new("hello", "#family:example.org"), Utc::now());
        store.save(&state).unwrap();

        let loaded = store.load().unwrap();
        assert_eq!(loaded.rules, state.rules);
        assert_eq!(loaded.grounded, state.grounded);
        assert_eq!(loaded.last_reply, state.last_reply);
    }

    #[test]
    fn test_defaults_fill_missing_fields() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("conf.json");
        fs::write(
            &path,
            r#"{
                "admin": "@admin:example.org",
                "names": { "primary": "dad" },
                "matrix": { "homeserver": "https://h", "username": "dad", "password": "x" }
            }"#,
        )
        .unwrap();

        let state = StateStore::new(&path).load().unwrap();
        assert_eq!(state.persona, Persona::Primary);
        assert_eq!(state.message_rate, default_message_rate());
        assert_eq!(state.line_delay, default_line_delay());
        assert!(state.is_group("!abc:h"));
        assert!(state.grounded.is_empty());
        assert!(state.last_reply.is_none());
    }

    #[test]
    fn test_example_config_loads() {
        let store = StateStore::new(concat!(env!("CARGO_MANIFEST_DIR"), "/conf.example.json"));
        let state = store.load().unwrap();
        assert_eq!(state.active_name(), "dad");
        assert_eq!(state.rules.admin.len(), 3);
        assert!(state.rules.unselectable().is_empty());
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let err = StateStore::new(dir.path().join("nope.json")).load().unwrap_err();
        assert!(matches!(err, StateError::Read { .. }));
    }

    #[test]
    fn test_bad_pattern_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("conf.json");
        let mut value = serde_json::to_value(sample_state()).unwrap();
        value["rules"]["primary"][0]["pattern"] = serde_json::json!("([");
        fs::write(&path, value.to_string()).unwrap();

        let err = StateStore::new(&path).load().unwrap_err();
        assert!(matches!(err, StateError::Parse { .. }));
    }

    #[test]
    fn test_record_reply_never_goes_backwards() {
        let mut state = sample_state();
        let now = Utc::now();
        state.record_reply(&Reply::new("a\n\nb", "#room"), now);
        state.record_reply(&Reply::new("c", "#room"), now - Duration::seconds(5));

        let last = state.last_reply.unwrap();
        assert_eq!(last.sent_at, now);
        assert_eq!(last.lines, vec!["c"]);
    }

    #[test]
    fn test_admin_must_be_configured() {
        let mut state = sample_state();
        assert!(state.is_admin("@admin:example.org"));
        state.admin.clear();
        assert!(!state.is_admin(""));
    }
}
