//! Token introspection.

use log::debug;
use serde_json::Value;

use super::{AccountError, Identity, Token};
use crate::api::{Endpoints, Transport};

/// Outcome of validating a token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// The endpoint returned a complete identity.
    Valid(Identity),
    /// The endpoint answered, but without identity fields.
    Invalid,
}

/// Exchange `token` for an identity via the validation endpoint.
///
/// A reachable endpoint that answers without `client_id`, `user_id` and
/// `login` yields [`Resolution::Invalid`]. A failed request, or a body that
/// is not a JSON object at all, is an error.
pub fn resolve(
    transport: &dyn Transport,
    endpoints: &Endpoints,
    token: &Token,
) -> Result<Resolution, AccountError> {
    let response = transport.send(&endpoints.validate(token.expose()))?;
    debug!("Token validation returned status {}", response.status);

    let json: Value = serde_json::from_str(&response.body).map_err(|e| AccountError::Parse {
        context: "token validation",
        reason: e.to_string(),
    })?;
    let object = json.as_object().ok_or_else(|| AccountError::Parse {
        context: "token validation",
        reason: "expected a JSON object".to_string(),
    })?;

    let field = |name: &str| object.get(name).and_then(Value::as_str).map(str::to_string);

    match (field("client_id"), field("user_id"), field("login")) {
        (Some(client_id), Some(user_id), Some(login)) => Ok(Resolution::Valid(Identity {
            token: token.clone(),
            client_id,
            user_id,
            login,
        })),
        _ => Ok(Resolution::Invalid),
    }
}
