//! # Reply Formatter
//!
//! Expands the placeholders of a response template into the text that goes
//! out, and decides where it goes.
//!
//! Context placeholders (`[from]`, `[grounded]`) are always filled in.
//! Content placeholders reuse whatever the sender wrote after the rule's
//! trigger; if that leftover text is blank or punctuation-only the whole
//! reply is dropped instead of sending something mangled.

use regex::Regex;
use std::sync::LazyLock;

use crate::application::state::EngineState;
use crate::domain::rules::Pattern;
use crate::domain::types::{MessageEvent, Reply};

static NON_WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\W+$").unwrap());
static ADDRESSEE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)^\s*(\S+):\s+(.*)$").unwrap());

/// Placeholders that reuse the sender's text, in the order they are expanded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Reuse {
    Mock,
    Repeat,
    User,
    Ground,
    Unground,
    Poof,
}

impl Reuse {
    const ALL: [Reuse; 6] = [
        Reuse::Mock,
        Reuse::Repeat,
        Reuse::User,
        Reuse::Ground,
        Reuse::Unground,
        Reuse::Poof,
    ];

    fn token(self) -> &'static str {
        match self {
            Reuse::Mock => "[mock]",
            Reuse::Repeat => "[repeat]",
            Reuse::User => "[user]",
            Reuse::Ground => "[ground]",
            Reuse::Unground => "[unground]",
            Reuse::Poof => "[poof]",
        }
    }
}

pub struct ReplyFormatter;

impl ReplyFormatter {
    /// Builds the reply for `template`, triggered by `pattern` on `event`.
    ///
    /// Consumes `event.content` down to the text after the trigger, and
    /// applies `[ground]` / `[unground]` to the state's grounded set.
    pub fn format(
        state: &mut EngineState,
        event: &mut MessageEvent,
        pattern: &Pattern,
        template: &str,
    ) -> Reply {
        let mut destination = if state.is_group(&event.to) {
            event.to.clone()
        } else {
            event.from.clone()
        };

        let mut values: Vec<(&'static str, String)> = vec![("[from]", event.from.clone())];
        if template.contains("[grounded]") {
            values.push(("[grounded]", state.grounded.joined(", ")));
        }

        let mut remaining: Option<String> = None;
        for reuse in Reuse::ALL {
            let token = reuse.token();
            if !template.contains(token) {
                continue;
            }

            let leftover = remaining
                .get_or_insert_with(|| Self::strip_trigger(pattern, &event.content).to_string())
                .clone();
            event.content.clone_from(&leftover);

            let mut text = leftover;
            if reuse == Reuse::Repeat
                && let Some((name, rest)) = Self::split_addressee(&text)
            {
                destination = name;
                text = rest;
            }

            if !Self::has_content(&text) {
                tracing::debug!("Dropping reply: {} has nothing to reuse", token);
                return Reply::new("", destination);
            }

            let value = match reuse {
                Reuse::Mock | Reuse::Repeat | Reuse::User => text,
                Reuse::Ground => {
                    let identity = Self::identity(&text);
                    if state.grounded.add(&identity) {
                        tracing::info!("Grounded {}", identity);
                    }
                    identity
                }
                Reuse::Unground => {
                    let identity = Self::identity(&text);
                    if state.grounded.remove(&identity) {
                        tracing::info!("Ungrounded {}", identity);
                    }
                    identity
                }
                Reuse::Poof => Self::with_article(&text),
            };
            values.push((token, value));
        }

        Reply::new(&Self::expand(template, &values), destination)
    }

    /// Substitutes placeholders in a single left-to-right pass over the
    /// template. Substituted text is never scanned again.
    fn expand(template: &str, values: &[(&str, String)]) -> String {
        let mut out = String::with_capacity(template.len());
        let mut rest = template;
        while let Some(start) = rest.find('[') {
            out.push_str(&rest[..start]);
            let tail = &rest[start..];
            match values.iter().find(|(token, _)| tail.starts_with(token)) {
                Some((token, value)) => {
                    out.push_str(value);
                    rest = &tail[token.len()..];
                }
                None => {
                    out.push('[');
                    rest = &tail[1..];
                }
            }
        }
        out.push_str(rest);
        out
    }

    /// Text after the rule's trigger: the last piece of the message split on
    /// the pattern.
    fn strip_trigger<'t>(pattern: &Pattern, content: &'t str) -> &'t str {
        pattern.regex().split(content).last().unwrap_or("")
    }

    /// `bob: hello there` -> (`bob`, `hello there`)
    fn split_addressee(text: &str) -> Option<(String, String)> {
        let caps = ADDRESSEE.captures(text)?;
        Some((caps[1].to_string(), caps[2].to_string()))
    }

    fn has_content(text: &str) -> bool {
        !text.is_empty() && !NON_WORD.is_match(text)
    }

    fn identity(text: &str) -> String {
        text.chars().filter(|c| !c.is_whitespace()).collect()
    }

    fn with_article(text: &str) -> String {
        let vowel = text
            .chars()
            .next()
            .is_some_and(|c| matches!(c.to_ascii_lowercase(), 'a' | 'e' | 'i' | 'o' | 'u'));
        if vowel {
            format!("an {text}")
        } else {
            format!("a {text}")
        }
    }
}
