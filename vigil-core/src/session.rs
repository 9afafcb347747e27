//! Session records
//!
//! Sessions are opaque-token handles validated against two independent
//! policies: an absolute expiry set at creation, and an idle timeout
//! measured from the last successful validation. The session struct is
//! defined as follows:
//!
//! | Field           | Type           | Description                                      |
//! | --------------- | -------------- | ------------------------------------------------ |
//! | `token`         | `SessionToken` | The opaque handle identifying the session.       |
//! | `principal_id`  | `PrincipalId`  | The principal the session belongs to.            |
//! | `created_at`    | `DateTime`     | When the session was created.                    |
//! | `last_activity` | `DateTime`     | Refreshed on every successful validation.        |
//! | `expires_at`    | `DateTime`     | Absolute expiry, fixed at creation.              |

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, crypto::generate_secret, error::ValidationError, principal::PrincipalId};

/// Opaque session token with 256 bits of entropy, used for lookups in the
/// session store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionToken(String);

impl SessionToken {
    /// Create a session token from an existing string
    pub fn new(token: &str) -> Self {
        SessionToken(token.to_string())
    }

    /// Create a new random session token
    pub fn new_random() -> Self {
        SessionToken(generate_secret())
    }

    pub fn into_inner(self) -> String {
        self.0
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SessionToken {
    fn default() -> Self {
        Self::new_random()
    }
}

impl From<String> for SessionToken {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for SessionToken {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl std::fmt::Display for SessionToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// The opaque handle identifying the session.
    pub token: SessionToken,

    /// The principal the session belongs to.
    pub principal_id: PrincipalId,

    /// When the session was created.
    pub created_at: DateTime<Utc>,

    /// Refreshed on every successful validation.
    pub last_activity: DateTime<Utc>,

    /// Absolute expiry, fixed at creation.
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn builder() -> SessionBuilder {
        SessionBuilder::default()
    }

    /// Whether the absolute expiry has passed.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Whether the idle timeout has elapsed since the last activity.
    pub fn is_idle(&self, now: DateTime<Utc>, idle_timeout: Duration) -> bool {
        now - self.last_activity >= idle_timeout
    }
}

#[derive(Default)]
pub struct SessionBuilder {
    token: Option<SessionToken>,
    principal_id: Option<PrincipalId>,
    created_at: Option<DateTime<Utc>>,
    last_activity: Option<DateTime<Utc>>,
    expires_at: Option<DateTime<Utc>>,
}

impl SessionBuilder {
    pub fn token(mut self, token: SessionToken) -> Self {
        self.token = Some(token);
        self
    }

    pub fn principal_id(mut self, principal_id: PrincipalId) -> Self {
        self.principal_id = Some(principal_id);
        self
    }

    pub fn created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = Some(created_at);
        self
    }

    pub fn last_activity(mut self, last_activity: DateTime<Utc>) -> Self {
        self.last_activity = Some(last_activity);
        self
    }

    pub fn expires_at(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    pub fn build(self) -> Result<Session, Error> {
        let now = Utc::now();
        let created_at = self.created_at.unwrap_or(now);
        Ok(Session {
            token: self.token.unwrap_or_default(),
            principal_id: self.principal_id.ok_or(ValidationError::MissingField(
                "Principal ID is required".to_string(),
            ))?,
            created_at,
            last_activity: self.last_activity.unwrap_or(created_at),
            expires_at: self.expires_at.unwrap_or(created_at + Duration::hours(12)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_token_random_uniqueness() {
        let a = SessionToken::new_random();
        let b = SessionToken::new_random();
        assert_ne!(a, b);
        assert_eq!(a.to_string(), a.as_str());
    }

    #[test]
    fn test_session_builder_requires_principal() {
        assert!(Session::builder().build().is_err());

        let session = Session::builder()
            .principal_id(PrincipalId::new("usr_1"))
            .build()
            .unwrap();
        assert!(!session.is_expired(session.created_at));
    }

    #[test]
    fn test_expiry_and_idle_checks() {
        let now = Utc::now();
        let session = Session::builder()
            .principal_id(PrincipalId::new("usr_1"))
            .created_at(now)
            .expires_at(now + Duration::hours(1))
            .build()
            .unwrap();

        assert!(!session.is_expired(now + Duration::minutes(59)));
        assert!(session.is_expired(now + Duration::hours(1)));

        assert!(!session.is_idle(now + Duration::minutes(29), Duration::minutes(30)));
        assert!(session.is_idle(now + Duration::minutes(30), Duration::minutes(30)));
    }
}
