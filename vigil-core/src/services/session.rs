//! Session lifecycle service.
//!
//! A session is valid iff its absolute expiry has not passed AND the idle
//! timeout has not elapsed since the last activity. Successful validation
//! refreshes the activity timestamp; every failure path deletes the record,
//! so sessions never linger invalid. `max_concurrent_sessions` is declared
//! on [`crate::config::SessionPolicy`] but not enforced here; concurrency
//! capping is an extension point for the caller.

use std::sync::Arc;

use crate::{
    Error,
    clock::Clock,
    config::SharedConfig,
    principal::PrincipalId,
    repositories::SessionRepository,
    session::{Session, SessionToken},
};

pub struct SessionService<R: SessionRepository> {
    repository: Arc<R>,
    clock: Arc<dyn Clock>,
    config: SharedConfig,
}

impl<R: SessionRepository> SessionService<R> {
    pub fn new(repository: Arc<R>, clock: Arc<dyn Clock>, config: SharedConfig) -> Self {
        Self {
            repository,
            clock,
            config,
        }
    }

    /// Create a new session for a principal.
    pub async fn create(&self, principal_id: &PrincipalId) -> Result<Session, Error> {
        let now = self.clock.now();
        let max_duration = self.config.read().await.session.max_duration;

        let session = Session {
            token: SessionToken::new_random(),
            principal_id: principal_id.clone(),
            created_at: now,
            last_activity: now,
            expires_at: now + max_duration,
        };

        self.repository.create(session).await
    }

    /// Validate a session token for a principal.
    ///
    /// Expired, idle-timed-out, or mismatched sessions are deleted as a
    /// side effect and report `false`. A valid session has its
    /// `last_activity` refreshed.
    pub async fn validate(
        &self,
        token: &SessionToken,
        principal_id: &PrincipalId,
    ) -> Result<bool, Error> {
        let Some(mut session) = self.repository.find_by_token(token).await? else {
            return Ok(false);
        };

        let now = self.clock.now();
        let idle_timeout = self.config.read().await.session.idle_timeout;

        if session.principal_id != *principal_id {
            tracing::warn!(
                expected = %session.principal_id,
                presented = %principal_id,
                "Session presented for wrong principal"
            );
            self.repository.delete(token).await?;
            return Ok(false);
        }

        if session.is_expired(now) || session.is_idle(now, idle_timeout) {
            self.repository.delete(token).await?;
            return Ok(false);
        }

        session.last_activity = now;
        self.repository.update(session).await?;
        Ok(true)
    }

    /// Delete a session (logout).
    pub async fn destroy(&self, token: &SessionToken) -> Result<(), Error> {
        self.repository.delete(token).await
    }

    /// Delete every session belonging to a principal.
    pub async fn destroy_all(&self, principal_id: &PrincipalId) -> Result<(), Error> {
        self.repository.delete_by_principal(principal_id).await
    }

    /// Delete sessions past their absolute expiry. Returns the number
    /// removed. Called by the periodic sweep.
    pub async fn cleanup_expired(&self) -> Result<u64, Error> {
        self.repository.cleanup_expired(self.clock.now()).await
    }
}
