//! Repository trait for expiring deny-state: account locks and IP blocks.
//!
//! Both kinds share the lazy-expiry contract: readers treat an expired
//! entry as absent, and the periodic sweep deletes them for good.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{
    Error,
    attempt::{AccountLock, IpBlock},
};

#[async_trait]
pub trait LockRepository: Send + Sync + 'static {
    /// Create or replace the lock for an email.
    async fn upsert_lock(&self, lock: AccountLock) -> Result<(), Error>;

    /// The stored lock for an email, expired or not.
    async fn get_lock(&self, email: &str) -> Result<Option<AccountLock>, Error>;

    /// Remove the lock for an email, if any.
    async fn delete_lock(&self, email: &str) -> Result<(), Error>;

    /// Create or replace the block for an IP.
    async fn upsert_block(&self, block: IpBlock) -> Result<(), Error>;

    /// The stored block for an IP, expired or not.
    async fn get_block(&self, ip_address: &str) -> Result<Option<IpBlock>, Error>;

    /// Remove the block for an IP, if any.
    async fn delete_block(&self, ip_address: &str) -> Result<(), Error>;

    /// All stored blocks, expired ones included.
    async fn list_blocks(&self) -> Result<Vec<IpBlock>, Error>;

    /// Delete locks and blocks whose expiry is at or before `now`.
    /// Returns the number removed.
    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, Error>;
}
