//! # Grounding
//!
//! The set of identities the bot refuses to answer until they are ungrounded.

use serde::{Deserialize, Serialize};

/// Grounded identities. Stored as a list; order carries no meaning.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct GroundedSet(Vec<String>);

impl GroundedSet {
    /// Adds `identity` unless already present. Returns whether the set changed.
    pub fn add(&mut self, identity: &str) -> bool {
        if self.contains(identity) {
            return false;
        }
        self.0.push(identity.to_string());
        true
    }

    /// Removes `identity` if present. Returns whether the set changed.
    pub fn remove(&mut self, identity: &str) -> bool {
        match self.0.iter().position(|g| g == identity) {
            Some(idx) => {
                self.0.swap_remove(idx);
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, identity: &str) -> bool {
        self.0.iter().any(|g| g == identity)
    }

    pub fn joined(&self, separator: &str) -> String {
        self.0.join(separator)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<String>> for GroundedSet {
    fn from(list: Vec<String>) -> Self {
        let mut set = GroundedSet::default();
        for identity in list {
            set.add(&identity);
        }
        set
    }
}

impl From<GroundedSet> for Vec<String> {
    fn from(set: GroundedSet) -> Self {
        set.0
    }
}
