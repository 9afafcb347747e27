//! Repository trait for session storage.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{Error, principal::PrincipalId, session::Session, session::SessionToken};

#[async_trait]
pub trait SessionRepository: Send + Sync + 'static {
    /// Store a new session.
    async fn create(&self, session: Session) -> Result<Session, Error>;

    /// Look a session up by token.
    async fn find_by_token(&self, token: &SessionToken) -> Result<Option<Session>, Error>;

    /// Replace a stored session (used to refresh `last_activity`).
    async fn update(&self, session: Session) -> Result<Session, Error>;

    /// Delete a session by token.
    async fn delete(&self, token: &SessionToken) -> Result<(), Error>;

    /// Delete every session belonging to a principal.
    async fn delete_by_principal(&self, principal_id: &PrincipalId) -> Result<(), Error>;

    /// Delete sessions whose absolute expiry has passed. Returns the number
    /// removed.
    async fn cleanup_expired(&self, now: DateTime<Utc>) -> Result<u64, Error>;
}
