//! # Configuration
//!
//! Connection and identity settings carried inside the state file.
//! The mutable parts (rules, grounded list, last reply) live in
//! `application::state::EngineState`, which embeds these structs.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Which named identity this instance presents as.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Persona {
    #[default]
    Primary,
    Secondary,
}

impl fmt::Display for Persona {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Persona::Primary => write!(f, "primary"),
            Persona::Secondary => write!(f, "secondary"),
        }
    }
}

/// Display names of both personas. Either one counts as "the bot" when
/// filtering out self-messages, so two instances never answer each other.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonaNames {
    pub primary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secondary: Option<String>,
}

impl PersonaNames {
    pub fn name_of(&self, persona: Persona) -> &str {
        match persona {
            Persona::Primary => &self.primary,
            Persona::Secondary => self.secondary.as_deref().unwrap_or(&self.primary),
        }
    }

    pub fn set_name(&mut self, persona: Persona, name: String) {
        match persona {
            Persona::Primary => self.primary = name,
            Persona::Secondary => self.secondary = Some(name),
        }
    }

    pub fn all(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.primary.as_str()).chain(self.secondary.as_deref())
    }
}

/// Specific configuration for the Matrix service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatrixConfig {
    pub homeserver: String,
    pub username: String,
    pub password: String,
}

pub fn default_message_rate() -> u64 {
    10
}

pub fn default_line_delay() -> u64 {
    2
}

/// Destination prefixes that name a group conversation rather than a person.
/// `#` covers channels and room aliases, `!` covers Matrix room ids.
pub fn default_group_markers() -> Vec<String> {
    vec!["#".to_string(), "!".to_string()]
}
