//! Account relationship manager.
//!
//! An [`Account`] is built from an OAuth token. Construction resolves the
//! token into an [`Identity`] exactly once; every later operation (reading
//! follows, following, unfollowing, draining) is gated on that identity.
//!
//! Two construction modes exist:
//!
//! - [`Account::strict`] fails with [`AccountError::InvalidAccount`] when the
//!   token is rejected, so a constructed account is always usable.
//! - [`Account::lenient`] keeps the invalid account around; each operation on
//!   it returns [`AccountError::InvalidIdentity`] without touching the network.
//!
//! An account is not meant to run two drains at once. A second concurrent
//! drain is refused with [`AccountError::DrainInProgress`].

pub mod drain;
mod identity;
mod relationships;

pub use drain::{
    ConsoleObserver, DrainCursor, DrainFailure, DrainObserver, DrainReport, DrainState,
    DrainTarget, SilentObserver,
};
pub use identity::{resolve, Resolution};
pub use relationships::{Relationship, RelationshipPage};

use std::fmt;
use std::sync::{Arc, Mutex};

use log::{info, warn};

use crate::api::{Endpoints, Transport, TransportError};
use crate::config::DEFAULT_FOLLOW_LIMIT;

/// An OAuth token. Never printed in cleartext.
#[derive(Clone, PartialEq, Eq)]
pub struct Token(String);

impl Token {
    /// Wrap a raw token string.
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// The raw token, for building request headers.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Token {
    fn from(token: &str) -> Self {
        Self::new(token)
    }
}

impl From<String> for Token {
    fn from(token: String) -> Self {
        Self(token)
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Token(<redacted>)")
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<redacted>")
    }
}

/// A resolved, authenticated Twitch identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    /// The OAuth token.
    pub token: Token,
    /// Client ID of the application the token was issued to.
    pub client_id: String,
    /// Numeric user ID, string-encoded.
    pub user_id: String,
    /// Login name.
    pub login: String,
}

/// Which side of a follow mutation failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationKind {
    /// Creating a follow.
    Follow,
    /// Removing a follow.
    Unfollow,
}

impl fmt::Display for MutationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MutationKind::Follow => write!(f, "follow"),
            MutationKind::Unfollow => write!(f, "unfollow"),
        }
    }
}

/// Error type for account operations.
#[derive(Debug, Clone, thiserror::Error)]
pub enum AccountError {
    /// Strict construction with a token the validation endpoint rejected.
    #[error("Invalid account: token was rejected")]
    InvalidAccount,
    /// Operation attempted on a leniently constructed, invalid account.
    #[error("Account identity is invalid")]
    InvalidIdentity,
    /// The HTTP call itself failed.
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),
    /// The response did not have the expected shape.
    #[error("Could not parse {context} response: {reason}")]
    Parse {
        /// Which call produced the response.
        context: &'static str,
        /// What was wrong with it.
        reason: String,
    },
    /// Twitch refused a follow or unfollow.
    #[error("Failed to {kind} {target}: {reason}")]
    MutationRejected {
        /// Follow or unfollow.
        kind: MutationKind,
        /// Target channel ID.
        target: String,
        /// Error reported by the API, or the unexpected body.
        reason: String,
    },
    /// Twitch answered a read with an error payload.
    #[error("Twitch API error ({status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Message from the error payload.
        message: String,
    },
    /// A login lookup found no such user.
    #[error("No Twitch user named '{0}'")]
    UnknownUser(String),
    /// Another drain is already running on this account.
    #[error("A drain is already running for this account")]
    DrainInProgress,
}

/// How construction treats a rejected token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveMode {
    /// Rejected tokens are a construction error.
    Strict,
    /// Rejected tokens produce an invalid account.
    Lenient,
}

/// A Twitch account, resolved once from its token.
pub struct Account {
    identity: Option<Identity>,
    transport: Arc<dyn Transport>,
    endpoints: Endpoints,
    follow_limit: u64,
    drain_lock: Mutex<()>,
}

impl fmt::Debug for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Account")
            .field("identity", &self.identity)
            .field("endpoints", &self.endpoints)
            .field("follow_limit", &self.follow_limit)
            .finish_non_exhaustive()
    }
}

impl Account {
    /// Resolve `token`, failing with [`AccountError::InvalidAccount`] if it is
    /// rejected.
    pub fn strict(
        token: impl Into<Token>,
        transport: Arc<dyn Transport>,
        endpoints: Endpoints,
    ) -> Result<Self, AccountError> {
        Self::resolve(token, transport, endpoints, ResolveMode::Strict)
    }

    /// Resolve `token`, keeping the account even if it is rejected.
    ///
    /// Transport and parse failures during resolution are still errors.
    pub fn lenient(
        token: impl Into<Token>,
        transport: Arc<dyn Transport>,
        endpoints: Endpoints,
    ) -> Result<Self, AccountError> {
        Self::resolve(token, transport, endpoints, ResolveMode::Lenient)
    }

    /// Resolve `token` with an explicit [`ResolveMode`].
    pub fn resolve(
        token: impl Into<Token>,
        transport: Arc<dyn Transport>,
        endpoints: Endpoints,
        mode: ResolveMode,
    ) -> Result<Self, AccountError> {
        let token = token.into();
        let identity = match identity::resolve(transport.as_ref(), &endpoints, &token)? {
            Resolution::Valid(identity) => {
                info!("Resolved account {} ({})", identity.login, identity.user_id);
                Some(identity)
            }
            Resolution::Invalid => {
                warn!("Token was rejected by the validation endpoint");
                if mode == ResolveMode::Strict {
                    return Err(AccountError::InvalidAccount);
                }
                None
            }
        };

        Ok(Self {
            identity,
            transport,
            endpoints,
            follow_limit: DEFAULT_FOLLOW_LIMIT,
            drain_lock: Mutex::new(()),
        })
    }

    /// Override the follow limit used by [`Account::can_follow`].
    pub fn with_follow_limit(mut self, limit: u64) -> Self {
        self.follow_limit = limit;
        self
    }

    /// Whether the token resolved to a valid identity.
    pub fn is_valid(&self) -> bool {
        self.identity.is_some()
    }

    /// The resolved identity, if valid.
    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    /// Login name, if valid.
    pub fn login(&self) -> Option<&str> {
        self.identity.as_ref().map(|i| i.login.as_str())
    }

    /// Numeric user ID, if valid.
    pub fn user_id(&self) -> Option<&str> {
        self.identity.as_ref().map(|i| i.user_id.as_str())
    }

    /// Client ID, if valid.
    pub fn client_id(&self) -> Option<&str> {
        self.identity.as_ref().map(|i| i.client_id.as_str())
    }

    /// The follow limit enforced by [`Account::can_follow`].
    pub fn follow_limit(&self) -> u64 {
        self.follow_limit
    }

    fn require_identity(&self) -> Result<&Identity, AccountError> {
        self.identity.as_ref().ok_or(AccountError::InvalidIdentity)
    }
}
