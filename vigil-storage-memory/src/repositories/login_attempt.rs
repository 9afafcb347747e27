use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use vigil_core::{Error, LoginAttempt, repositories::LoginAttemptRepository};

/// Per-email attempt ledgers. Insertion order within one email is
/// chronological because appends for an email are serialized by its shard
/// lock.
#[derive(Default)]
pub struct MemoryLoginAttemptRepository {
    attempts: DashMap<String, Vec<LoginAttempt>>,
}

impl MemoryLoginAttemptRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LoginAttemptRepository for MemoryLoginAttemptRepository {
    async fn append(&self, attempt: LoginAttempt) -> Result<LoginAttempt, Error> {
        self.attempts
            .entry(attempt.email.clone())
            .or_default()
            .push(attempt.clone());
        Ok(attempt)
    }

    async fn history(
        &self,
        email: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<LoginAttempt>, Error> {
        Ok(self
            .attempts
            .get(email)
            .map(|entry| {
                entry
                    .iter()
                    .filter(|a| a.at >= since)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn failed_count(&self, email: &str, since: DateTime<Utc>) -> Result<u32, Error> {
        Ok(self
            .attempts
            .get(email)
            .map(|entry| {
                entry
                    .iter()
                    .filter(|a| !a.success && a.at >= since)
                    .count() as u32
            })
            .unwrap_or(0))
    }

    async fn recent_all(&self, since: DateTime<Utc>) -> Result<Vec<LoginAttempt>, Error> {
        let mut all: Vec<LoginAttempt> = self
            .attempts
            .iter()
            .flat_map(|entry| {
                entry
                    .value()
                    .iter()
                    .filter(|a| a.at >= since)
                    .cloned()
                    .collect::<Vec<_>>()
            })
            .collect();
        all.sort_by_key(|a| a.at);
        Ok(all)
    }

    async fn clear(&self, email: &str) -> Result<u64, Error> {
        Ok(self
            .attempts
            .remove(email)
            .map(|(_, attempts)| attempts.len() as u64)
            .unwrap_or(0))
    }

    async fn purge_before(&self, before: DateTime<Utc>) -> Result<u64, Error> {
        let mut removed = 0u64;
        for mut entry in self.attempts.iter_mut() {
            let len = entry.value().len();
            entry.value_mut().retain(|a| a.at >= before);
            removed += (len - entry.value().len()) as u64;
        }
        self.attempts.retain(|_, attempts| !attempts.is_empty());
        Ok(removed)
    }
}
