//! Repository trait for the alert list.
//!
//! Alerts are held most-recent-first. The store performs no classification;
//! it only keeps, lists, resolves, and prunes what producers raise.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{
    Error,
    alert::{AlertId, SecurityAlert, Severity},
};

#[async_trait]
pub trait AlertRepository: Send + Sync + 'static {
    /// Prepend an alert to the list.
    async fn push(&self, alert: SecurityAlert) -> Result<(), Error>;

    /// Drop the oldest alerts past the cap. Returns the number dropped.
    async fn drop_oldest_beyond(&self, cap: usize) -> Result<u64, Error>;

    /// Most-recent-first listing, optionally filtered by severity and
    /// truncated to `limit`.
    async fn list(
        &self,
        limit: Option<usize>,
        severity: Option<Severity>,
    ) -> Result<Vec<SecurityAlert>, Error>;

    /// Mark an alert resolved. Returns `false` when the id is unknown.
    async fn resolve(&self, id: &AlertId) -> Result<bool, Error>;

    /// Count unresolved alerts at exactly the given severity.
    async fn count_unresolved(&self, severity: Severity) -> Result<usize, Error>;

    /// Delete resolved alerts older than the cutoff. Returns the number
    /// removed. Unresolved alerts are never pruned.
    async fn prune_resolved_before(&self, before: DateTime<Utc>) -> Result<u64, Error>;
}
