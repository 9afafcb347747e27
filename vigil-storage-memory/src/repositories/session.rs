use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use vigil_core::{Error, PrincipalId, Session, SessionToken, repositories::SessionRepository};

/// Sessions keyed by token.
#[derive(Default)]
pub struct MemorySessionRepository {
    sessions: DashMap<String, Session>,
}

impl MemorySessionRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionRepository for MemorySessionRepository {
    async fn create(&self, session: Session) -> Result<Session, Error> {
        self.sessions
            .insert(session.token.as_str().to_string(), session.clone());
        Ok(session)
    }

    async fn find_by_token(&self, token: &SessionToken) -> Result<Option<Session>, Error> {
        Ok(self.sessions.get(token.as_str()).map(|entry| entry.value().clone()))
    }

    async fn update(&self, session: Session) -> Result<Session, Error> {
        self.sessions
            .insert(session.token.as_str().to_string(), session.clone());
        Ok(session)
    }

    async fn delete(&self, token: &SessionToken) -> Result<(), Error> {
        self.sessions.remove(token.as_str());
        Ok(())
    }

    async fn delete_by_principal(&self, principal_id: &PrincipalId) -> Result<(), Error> {
        self.sessions
            .retain(|_, session| session.principal_id != *principal_id);
        Ok(())
    }

    async fn cleanup_expired(&self, now: DateTime<Utc>) -> Result<u64, Error> {
        let before = self.sessions.len();
        self.sessions.retain(|_, session| !session.is_expired(now));
        Ok((before - self.sessions.len()) as u64)
    }
}
