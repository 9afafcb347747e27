use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use vigil_core::{AccountLock, Error, IpBlock, repositories::LockRepository};

/// Account locks keyed by email and IP blocks keyed by address. Readers
/// apply lazy expiry; this store keeps whatever it was last given until the
/// sweep purges it.
#[derive(Default)]
pub struct MemoryLockRepository {
    locks: DashMap<String, AccountLock>,
    blocks: DashMap<String, IpBlock>,
}

impl MemoryLockRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LockRepository for MemoryLockRepository {
    async fn upsert_lock(&self, lock: AccountLock) -> Result<(), Error> {
        self.locks.insert(lock.email.clone(), lock);
        Ok(())
    }

    async fn get_lock(&self, email: &str) -> Result<Option<AccountLock>, Error> {
        Ok(self.locks.get(email).map(|entry| entry.value().clone()))
    }

    async fn delete_lock(&self, email: &str) -> Result<(), Error> {
        self.locks.remove(email);
        Ok(())
    }

    async fn upsert_block(&self, block: IpBlock) -> Result<(), Error> {
        self.blocks.insert(block.ip_address.clone(), block);
        Ok(())
    }

    async fn get_block(&self, ip_address: &str) -> Result<Option<IpBlock>, Error> {
        Ok(self.blocks.get(ip_address).map(|entry| entry.value().clone()))
    }

    async fn delete_block(&self, ip_address: &str) -> Result<(), Error> {
        self.blocks.remove(ip_address);
        Ok(())
    }

    async fn list_blocks(&self) -> Result<Vec<IpBlock>, Error> {
        Ok(self.blocks.iter().map(|entry| entry.value().clone()).collect())
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, Error> {
        let before_locks = self.locks.len();
        self.locks.retain(|_, lock| lock.is_active(now));
        let before_blocks = self.blocks.len();
        self.blocks.retain(|_, block| block.is_active(now));
        Ok((before_locks - self.locks.len() + before_blocks - self.blocks.len()) as u64)
    }
}
