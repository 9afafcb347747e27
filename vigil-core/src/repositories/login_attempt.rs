//! Repository trait for the login-attempt ledger.
//!
//! Attempts are appended per email in chronological order and never
//! mutated. Attempts should be recorded for all email addresses, even
//! non-existent ones, to prevent user enumeration.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{Error, attempt::LoginAttempt};

#[async_trait]
pub trait LoginAttemptRepository: Send + Sync + 'static {
    /// Append an attempt to the per-email sequence.
    async fn append(&self, attempt: LoginAttempt) -> Result<LoginAttempt, Error>;

    /// All attempts for an email since the cutoff, oldest first.
    async fn history(
        &self,
        email: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<LoginAttempt>, Error>;

    /// Count of failed attempts for an email since the cutoff.
    async fn failed_count(&self, email: &str, since: DateTime<Utc>) -> Result<u32, Error>;

    /// All attempts across every email since the cutoff, oldest first.
    /// Feeds the distributed-attack grouping.
    async fn recent_all(&self, since: DateTime<Utc>) -> Result<Vec<LoginAttempt>, Error>;

    /// Delete all attempts for an email. Used by administrative unlock.
    async fn clear(&self, email: &str) -> Result<u64, Error>;

    /// Drop attempts older than the cutoff. Returns the number removed.
    async fn purge_before(&self, before: DateTime<Utc>) -> Result<u64, Error>;
}
