use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use vigil_core::{
    AuditQuery, AuditRecord, Error, repositories::AuditRepository,
};

/// The audit ring, oldest at the front. One global lock is acceptable:
/// appends are cheap and queries rare.
#[derive(Default)]
pub struct MemoryAuditRepository {
    records: Mutex<VecDeque<AuditRecord>>,
}

impl MemoryAuditRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<AuditRecord>> {
        self.records.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl AuditRepository for MemoryAuditRepository {
    async fn append(&self, record: AuditRecord) -> Result<(), Error> {
        self.lock().push_back(record);
        Ok(())
    }

    async fn drop_oldest_beyond(&self, cap: usize) -> Result<u64, Error> {
        let mut records = self.lock();
        let mut dropped = 0u64;
        while records.len() > cap {
            records.pop_front();
            dropped += 1;
        }
        Ok(dropped)
    }

    async fn query(&self, query: &AuditQuery) -> Result<Vec<AuditRecord>, Error> {
        let records = self.lock();
        let mut matching: Vec<AuditRecord> = records
            .iter()
            .rev()
            .filter(|r| query.matches(r))
            .cloned()
            .collect();
        if let Some(limit) = query.limit {
            matching.truncate(limit);
        }
        Ok(matching)
    }

    async fn count(&self) -> Result<usize, Error> {
        Ok(self.lock().len())
    }
}
