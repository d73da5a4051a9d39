//! # Domain Traits
//!
//! Abstract interfaces the engine talks through.
//! Allows for pluggable implementations in the Infrastructure layer.

use async_trait::async_trait;
use std::time::Duration;

/// Abstract interface for the chat connection (e.g., Matrix, IRC, Console)
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Send one line of text to a room or user
    async fn send(&self, destination: &str, line: &str) -> anyhow::Result<()>;
}

/// Waits between the lines of a multi-line reply.
#[async_trait]
pub trait Pacer: Send + Sync {
    async fn pause(&self, delay: Duration);
}
