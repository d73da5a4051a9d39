//! # Response Selector
//!
//! Picks which of a rule's responses to send: uniformly at random among the
//! responses tied for the lowest usage count, so replies rotate over time.

use rand::Rng;
use rand::seq::IndexedRandom;

use crate::domain::rules::Response;

/// Returns the index of the chosen response, or `None` when there is nothing
/// to choose from.
pub fn select<R: Rng + ?Sized>(responses: &[Response], rng: &mut R) -> Option<usize> {
    let min = responses.iter().map(|r| r.count).min()?;
    let least_used: Vec<usize> = responses
        .iter()
        .enumerate()
        .filter(|(_, r)| r.count == min)
        .map(|(idx, _)| idx)
        .collect();
    least_used.choose(rng).copied()
}
