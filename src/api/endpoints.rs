//! Request builders for the Twitch endpoints followctl talks to.
//!
//! Two API generations are in play: Helix (`Authorization: Bearer`) for
//! listings and lookups, and the legacy Kraken v5 API (`Authorization: OAuth`
//! plus a pinned `Accept` header) for follow mutations.

use super::{ApiRequest, Method};
use crate::config::ApiConfig;

/// Base URLs and version pinning for the Twitch API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    validate_url: String,
    helix_url: String,
    kraken_url: String,
    kraken_accept: String,
    page_size: Option<u32>,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self::from_config(&ApiConfig::default())
    }
}

impl Endpoints {
    /// Build endpoints from the `api` config section.
    pub fn from_config(config: &ApiConfig) -> Self {
        Self {
            validate_url: config.validate_url.clone(),
            helix_url: trim_slash(&config.helix_url),
            kraken_url: trim_slash(&config.kraken_url),
            kraken_accept: config.kraken_accept.clone(),
            page_size: config.page_size,
        }
    }

    /// Token introspection.
    pub fn validate(&self, token: &str) -> ApiRequest {
        ApiRequest::new(Method::Get, &self.validate_url)
            .with_header("Authorization", format!("Bearer {token}"))
    }

    /// One page of the accounts `user_id` follows.
    pub fn follows_page(&self, token: &str, client_id: &str, user_id: &str) -> ApiRequest {
        let mut url = format!("{}/users/follows?from_id={user_id}", self.helix_url);
        if let Some(first) = self.page_size {
            url.push_str(&format!("&first={first}"));
        }
        self.helix(url, token, client_id)
    }

    /// Look up a user by login name.
    pub fn user_by_login(&self, token: &str, client_id: &str, login: &str) -> ApiRequest {
        let url = format!("{}/users?login={login}", self.helix_url);
        self.helix(url, token, client_id)
    }

    /// Follow `channel_id` as `user_id`.
    pub fn follow(
        &self,
        token: &str,
        client_id: &str,
        user_id: &str,
        channel_id: &str,
    ) -> ApiRequest {
        self.kraken(Method::Put, user_id, channel_id, token, client_id)
    }

    /// Unfollow `channel_id` as `user_id`.
    pub fn unfollow(
        &self,
        token: &str,
        client_id: &str,
        user_id: &str,
        channel_id: &str,
    ) -> ApiRequest {
        self.kraken(Method::Delete, user_id, channel_id, token, client_id)
    }

    /// Check whether `user_id` follows `channel_id`.
    pub fn follow_status(
        &self,
        token: &str,
        client_id: &str,
        user_id: &str,
        channel_id: &str,
    ) -> ApiRequest {
        self.kraken(Method::Get, user_id, channel_id, token, client_id)
    }

    fn helix(&self, url: String, token: &str, client_id: &str) -> ApiRequest {
        ApiRequest::new(Method::Get, url)
            .with_header("Authorization", format!("Bearer {token}"))
            .with_header("Client-ID", client_id)
    }

    fn kraken(
        &self,
        method: Method,
        user_id: &str,
        channel_id: &str,
        token: &str,
        client_id: &str,
    ) -> ApiRequest {
        let url = format!(
            "{}/users/{user_id}/follows/channels/{channel_id}",
            self.kraken_url
        );
        ApiRequest::new(method, url)
            .with_header("Authorization", format!("OAuth {token}"))
            .with_header("Client-ID", client_id)
            .with_header("Accept", &self.kraken_accept)
    }
}

fn trim_slash(url: &str) -> String {
    url.trim_end_matches('/').to_string()
}
