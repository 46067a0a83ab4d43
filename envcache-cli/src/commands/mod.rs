//! CLI command implementations.
//!
//! # Command Modules
//!
//! - [`cache`] - Persisted snapshot management (show, clear)
//! - [`config`] - Configuration inspection (show, path)
//! - [`discover`] - One-shot runtime discovery
//! - [`watch`] - Long-running discovery with live invalidation

pub mod cache;
pub mod common;
pub mod config;
pub mod discover;
pub mod watch;
