//! Reading and mutating an account's follows.
//!
//! Reads use the Helix follows listing; mutations go through the legacy
//! Kraken v5 endpoints, whose success signals differ per verb: an unfollow
//! succeeded when the body is empty, a follow succeeded when the body carries
//! no `error` field.

use chrono::{DateTime, Utc};
use log::{debug, warn};
use serde::Deserialize;
use serde_json::Value;

use super::{Account, AccountError, Identity, MutationKind};
use crate::api::ApiResponse;

/// A follow edge from the account to a channel.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Relationship {
    /// ID of the followed channel.
    pub to_id: String,
    /// Login of the followed channel.
    #[serde(default)]
    pub to_login: Option<String>,
    /// Display name of the followed channel.
    #[serde(default)]
    pub to_name: Option<String>,
    /// When the follow was created.
    #[serde(default)]
    pub followed_at: Option<DateTime<Utc>>,
}

/// One page of the follows listing.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RelationshipPage {
    /// Total number of follows at the time of the request.
    pub total: u64,
    /// Follows on this page.
    #[serde(rename = "data")]
    pub records: Vec<Relationship>,
}

impl RelationshipPage {
    /// Number of records on this page.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether this page holds no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Target channel ID at `index`.
    pub fn target_at(&self, index: usize) -> Option<&str> {
        self.records.get(index).map(|r| r.to_id.as_str())
    }
}

#[derive(Deserialize)]
struct FollowCount {
    total: u64,
}

#[derive(Deserialize)]
struct UserList {
    data: Vec<UserEntry>,
}

#[derive(Deserialize)]
struct UserEntry {
    id: String,
}

impl Account {
    /// Fetch one page of the channels this account follows.
    pub fn fetch_page(&self) -> Result<RelationshipPage, AccountError> {
        let identity = self.require_identity()?;
        let body = self.follows_body(identity)?;
        let page: RelationshipPage =
            serde_json::from_str(&body).map_err(|e| parse_error("follows listing", e))?;
        debug!(
            "Fetched follows page for {}: {} record(s), total {}",
            identity.login,
            page.len(),
            page.total
        );
        Ok(page)
    }

    /// Fetch the number of channels this account follows.
    pub fn fetch_count(&self) -> Result<u64, AccountError> {
        let identity = self.require_identity()?;
        let body = self.follows_body(identity)?;
        let count: FollowCount =
            serde_json::from_str(&body).map_err(|e| parse_error("follows count", e))?;
        Ok(count.total)
    }

    /// Follow count, or `-1` when the account is invalid or the count could
    /// not be read.
    pub fn followed_count(&self) -> i64 {
        match self.fetch_count() {
            Ok(total) => i64::try_from(total).unwrap_or(i64::MAX),
            Err(AccountError::InvalidIdentity) => -1,
            Err(e) => {
                warn!("Could not read follow count: {e}");
                -1
            }
        }
    }

    /// Whether the account is below its follow limit.
    ///
    /// Reading the count is best-effort: an invalid account (count `-1`)
    /// reports `true`, so callers should check [`Account::is_valid`] first.
    pub fn can_follow(&self) -> bool {
        let limit = i64::try_from(self.follow_limit).unwrap_or(i64::MAX);
        self.followed_count() < limit
    }

    /// Whether this account already follows `channel_id`.
    pub fn is_following(&self, channel_id: &str) -> Result<bool, AccountError> {
        let identity = self.require_identity()?;
        let request = self.endpoints.follow_status(
            identity.token.expose(),
            &identity.client_id,
            &identity.user_id,
            channel_id,
        );
        let response = self.transport.send(&request)?;

        if response.body.contains("is not following") {
            return Ok(false);
        }
        if let Some(message) = error_message(&response) {
            return Err(AccountError::Api {
                status: response.status,
                message,
            });
        }
        if !is_success(&response) {
            return Err(AccountError::Api {
                status: response.status,
                message: summarize(&response.body),
            });
        }
        Ok(true)
    }

    /// Resolve a channel login to its numeric ID.
    pub fn lookup_user_id(&self, login: &str) -> Result<String, AccountError> {
        let identity = self.require_identity()?;
        let request =
            self.endpoints
                .user_by_login(identity.token.expose(), &identity.client_id, login);
        let response = self.transport.send(&request)?;

        if let Some(message) = error_message(&response) {
            return Err(AccountError::Api {
                status: response.status,
                message,
            });
        }
        let users: UserList =
            serde_json::from_str(&response.body).map_err(|e| parse_error("user lookup", e))?;
        users
            .data
            .into_iter()
            .next()
            .map(|u| u.id)
            .ok_or_else(|| AccountError::UnknownUser(login.to_string()))
    }

    /// Follow `channel_id`. One request, no retry.
    pub fn follow(&self, channel_id: &str) -> Result<(), AccountError> {
        let identity = self.require_identity()?;
        let request = self.endpoints.follow(
            identity.token.expose(),
            &identity.client_id,
            &identity.user_id,
            channel_id,
        );
        let response = self.transport.send(&request)?;

        let rejection = error_message(&response)
            .or_else(|| (!is_success(&response)).then(|| summarize(&response.body)));
        match rejection {
            None => {
                debug!("{} followed {channel_id}", identity.login);
                Ok(())
            }
            Some(reason) => Err(AccountError::MutationRejected {
                kind: MutationKind::Follow,
                target: channel_id.to_string(),
                reason,
            }),
        }
    }

    /// Unfollow `channel_id`. One request, no retry.
    pub fn unfollow(&self, channel_id: &str) -> Result<(), AccountError> {
        let identity = self.require_identity()?;
        let request = self.endpoints.unfollow(
            identity.token.expose(),
            &identity.client_id,
            &identity.user_id,
            channel_id,
        );
        let response = self.transport.send(&request)?;

        if response.is_empty() {
            debug!("{} unfollowed {channel_id}", identity.login);
            return Ok(());
        }
        Err(AccountError::MutationRejected {
            kind: MutationKind::Unfollow,
            target: channel_id.to_string(),
            reason: error_message(&response).unwrap_or_else(|| summarize(&response.body)),
        })
    }

    fn follows_body(&self, identity: &Identity) -> Result<String, AccountError> {
        let request = self.endpoints.follows_page(
            identity.token.expose(),
            &identity.client_id,
            &identity.user_id,
        );
        Ok(self.transport.send(&request)?.body)
    }
}

fn parse_error(context: &'static str, error: serde_json::Error) -> AccountError {
    warn!("Could not parse {context} response: {error}");
    AccountError::Parse {
        context,
        reason: error.to_string(),
    }
}

/// Error text from a JSON error payload, if the body is one.
fn error_message(response: &ApiResponse) -> Option<String> {
    let json: Value = serde_json::from_str(&response.body).ok()?;
    let object = json.as_object()?;
    let error = object.get("error")?;
    let message = object
        .get("message")
        .and_then(Value::as_str)
        .filter(|m| !m.is_empty())
        .or_else(|| error.as_str())
        .unwrap_or("unknown error");
    Some(message.to_string())
}

fn is_success(response: &ApiResponse) -> bool {
    (200..300).contains(&response.status)
}

fn summarize(body: &str) -> String {
    const MAX: usize = 120;
    let trimmed = body.trim();
    match trimmed.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &trimmed[..idx]),
        None => trimmed.to_string(),
    }
}
