//! Repository trait for the audit log.

use async_trait::async_trait;

use crate::{
    Error,
    audit::{AuditQuery, AuditRecord},
};

#[async_trait]
pub trait AuditRepository: Send + Sync + 'static {
    /// Append a record.
    async fn append(&self, record: AuditRecord) -> Result<(), Error>;

    /// Drop the oldest records past the cap. Returns the number dropped.
    async fn drop_oldest_beyond(&self, cap: usize) -> Result<u64, Error>;

    /// Records matching the query, newest-first, truncated to the query's
    /// limit when set.
    async fn query(&self, query: &AuditQuery) -> Result<Vec<AuditRecord>, Error>;

    /// Number of retained records.
    async fn count(&self) -> Result<usize, Error>;
}
