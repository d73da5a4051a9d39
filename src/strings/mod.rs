//! # Strings Module
//!
//! Centralizes operator-facing log strings.

pub mod logs;
