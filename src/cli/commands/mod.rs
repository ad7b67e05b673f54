//! Workflow implementations for the followctl CLI.
//!
//! Argument parsing lives in cli/mod.rs; the code that actually talks to
//! Twitch lives here.

pub mod check;
pub mod follow;

use std::sync::Arc;

use log::warn;

use crate::account::{Account, AccountError};
use crate::api::{Endpoints, HttpTransport, Transport, TransportError};
use crate::config::AppConfig;

/// Everything a workflow needs: tokens plus a shared transport.
pub struct Session {
    tokens: Vec<String>,
    transport: Arc<dyn Transport>,
    endpoints: Endpoints,
    follow_limit: u64,
}

impl Session {
    /// Build a session that talks to Twitch over HTTP.
    pub fn connect(config: &AppConfig, tokens: Vec<String>) -> Result<Self, TransportError> {
        let transport = HttpTransport::new(&config.http)?;
        Ok(Self::with_transport(config, tokens, Arc::new(transport)))
    }

    /// Build a session over any transport.
    pub fn with_transport(
        config: &AppConfig,
        tokens: Vec<String>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self {
            tokens,
            transport,
            endpoints: Endpoints::from_config(&config.api),
            follow_limit: config.limits.follow_limit,
        }
    }

    /// Number of tokens loaded.
    pub fn token_count(&self) -> usize {
        self.tokens.len()
    }

    /// Resolve every token leniently, in file order.
    ///
    /// Each entry is `(position, result)`, with `position` counting from 1.
    /// Tokens themselves are never returned so callers cannot print them.
    pub fn accounts(&self) -> Vec<(usize, Result<Account, AccountError>)> {
        self.tokens
            .iter()
            .enumerate()
            .map(|(i, token)| {
                let account = Account::lenient(
                    token.as_str(),
                    Arc::clone(&self.transport),
                    self.endpoints.clone(),
                )
                .map(|a| a.with_follow_limit(self.follow_limit));
                if let Err(e) = &account {
                    warn!("Token #{} could not be resolved: {e}", i + 1);
                }
                (i + 1, account)
            })
            .collect()
    }
}
