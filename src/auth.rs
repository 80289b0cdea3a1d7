//! Identity types and the auth-collaborator boundary.
//!
//! TrimChat does not implement registration or login itself; the auth service
//! issues JWTs carrying the user record. This module verifies those tokens and
//! produces the read-only [`Identity`] copy that the chat core binds to a
//! connection. The token is the only source of truth for identity; nothing in
//! a client's message payload is ever trusted for it.

use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::{ChatError, Result};

/// Authenticated user record bound to a connection.
///
/// Immutable once constructed; rebinding a connection replaces the whole
/// value (used when a client's token refreshes mid-session).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// User ID assigned by the auth service.
    pub id: i64,
    /// Display name.
    pub username: String,
    /// Avatar URL.
    pub avatar: String,
}

impl Identity {
    /// Create a new identity, deriving the avatar from the username when absent.
    pub fn new(id: i64, username: impl Into<String>, avatar: Option<String>) -> Self {
        let username = username.into();
        let avatar = avatar.unwrap_or_else(|| default_avatar(&username));
        Self {
            id,
            username,
            avatar,
        }
    }
}

/// Default avatar URL for a username.
pub fn default_avatar(username: &str) -> String {
    format!("https://robohash.org/{}.png", urlencoding::encode(username))
}

/// JWT claims issued by the auth service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID).
    pub sub: i64,
    /// Username.
    pub username: String,
    /// Avatar URL (optional; derived from the username when absent).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    /// Expiration timestamp (seconds since epoch).
    pub exp: u64,
}

/// Verify a token and extract the identity it carries.
pub fn verify_token(secret: &str, token: &str) -> Result<Identity> {
    let decoding_key = DecodingKey::from_secret(secret.as_bytes());
    let validation = Validation::default();

    let data = decode::<Claims>(token, &decoding_key, &validation)
        .map_err(|e| ChatError::Auth(format!("invalid token: {e}")))?;

    let claims = data.claims;
    Ok(Identity::new(claims.sub, claims.username, claims.avatar))
}

/// Issue a token for an identity, valid for `ttl_secs` seconds.
///
/// The production issuer is the external auth service; this helper exists for
/// tooling and tests.
pub fn issue_token(secret: &str, identity: &Identity, ttl_secs: u64) -> Result<String> {
    let claims = Claims {
        sub: identity.id,
        username: identity.username.clone(),
        avatar: Some(identity.avatar.clone()),
        exp: Utc::now().timestamp() as u64 + ttl_secs,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| ChatError::Auth(format!("failed to issue token: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret";

    #[test]
    fn test_identity_new_with_avatar() {
        let identity = Identity::new(1, "alice", Some("https://example.com/a.png".to_string()));
        assert_eq!(identity.id, 1);
        assert_eq!(identity.username, "alice");
        assert_eq!(identity.avatar, "https://example.com/a.png");
    }

    #[test]
    fn test_identity_new_default_avatar() {
        let identity = Identity::new(2, "bob", None);
        assert_eq!(identity.avatar, "https://robohash.org/bob.png");
    }

    #[test]
    fn test_default_avatar_encodes_username() {
        let url = default_avatar("weird name");
        assert_eq!(url, "https://robohash.org/weird%20name.png");
    }

    #[test]
    fn test_token_round_trip() {
        let identity = Identity::new(42, "alice", None);
        let token = issue_token(SECRET, &identity, 3600).unwrap();
        let verified = verify_token(SECRET, &token).unwrap();
        assert_eq!(verified, identity);
    }

    #[test]
    fn test_verify_rejects_wrong_secret() {
        let identity = Identity::new(42, "alice", None);
        let token = issue_token(SECRET, &identity, 3600).unwrap();
        let result = verify_token("other-secret", &token);
        assert!(matches!(result, Err(ChatError::Auth(_))));
    }

    #[test]
    fn test_verify_rejects_garbage() {
        let result = verify_token(SECRET, "not-a-token");
        assert!(matches!(result, Err(ChatError::Auth(_))));
    }

    #[test]
    fn test_verify_rejects_expired() {
        let identity = Identity::new(42, "alice", None);
        let claims = Claims {
            sub: identity.id,
            username: identity.username.clone(),
            avatar: None,
            exp: (Utc::now().timestamp() - 3600) as u64,
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap();

        let result = verify_token(SECRET, &token);
        assert!(matches!(result, Err(ChatError::Auth(_))));
    }

    #[test]
    fn test_identity_serializes_to_roster_shape() {
        let identity = Identity::new(7, "carol", None);
        let json = serde_json::to_string(&identity).unwrap();
        assert!(json.contains("\"id\":7"));
        assert!(json.contains("\"username\":\"carol\""));
        assert!(json.contains("\"avatar\""));
    }
}
