//! # Infrastructure Layer
//!
//! Handles interactions with external systems and services.
//! Implements the traits defined in the Domain layer (e.g., ChatTransport, Pacer).

pub mod matrix;
pub mod pacing;
