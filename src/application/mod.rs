//! # Application Layer
//!
//! Contains the core logic of the bot: the persistent state, the grounded
//! list, matching, response selection, formatting and dispatch.

pub mod dispatcher;
pub mod formatter;
pub mod grounding;
pub mod matcher;
pub mod selector;
pub mod state;
