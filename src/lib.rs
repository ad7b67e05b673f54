//! followctl - manage Twitch follows across several accounts.
//!
//! The core is [`account::Account`]: a token resolved once into an identity,
//! with operations to read, create and remove follows, and a bulk drain that
//! unfollows everything (or the first N) one request at a time.
//!
//! All HTTP goes through [`api::Transport`], so every operation can be tested
//! against the scripted [`api::MockTransport`].

#![deny(missing_docs)]

/// Version string from Cargo.toml.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod account;
pub mod api;
pub mod bootstrap;
pub mod cli;
pub mod config;

// Re-export key types for convenience
pub use account::{Account, AccountError, DrainReport};
