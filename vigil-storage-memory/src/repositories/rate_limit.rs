use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use vigil_core::{Error, repositories::RateLimitRepository};

/// Rate windows keyed by identifier. Each admitted unit is one timestamp;
/// the per-identifier shard lock in `DashMap` serializes concurrent updates
/// for one identifier without blocking the others.
#[derive(Default)]
pub struct MemoryRateLimitRepository {
    windows: DashMap<String, Vec<DateTime<Utc>>>,
}

impl MemoryRateLimitRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RateLimitRepository for MemoryRateLimitRepository {
    async fn record(&self, identifier: &str, at: DateTime<Utc>) -> Result<(), Error> {
        self.windows
            .entry(identifier.to_string())
            .or_default()
            .push(at);
        Ok(())
    }

    async fn count_since(&self, identifier: &str, since: DateTime<Utc>) -> Result<u32, Error> {
        match self.windows.get_mut(identifier) {
            Some(mut entry) => {
                entry.retain(|at| *at >= since);
                Ok(entry.len() as u32)
            }
            None => Ok(0),
        }
    }

    async fn total_matching_since(
        &self,
        fragment: &str,
        since: DateTime<Utc>,
    ) -> Result<u32, Error> {
        let mut total = 0u32;
        for entry in self.windows.iter() {
            if entry.key().contains(fragment) {
                total += entry.value().iter().filter(|at| **at >= since).count() as u32;
            }
        }
        Ok(total)
    }

    async fn prune_before(&self, before: DateTime<Utc>) -> Result<u64, Error> {
        let mut removed = 0u64;
        for mut entry in self.windows.iter_mut() {
            let len = entry.value().len();
            entry.value_mut().retain(|at| *at >= before);
            removed += (len - entry.value().len()) as u64;
        }
        self.windows.retain(|_, timestamps| !timestamps.is_empty());
        Ok(removed)
    }
}
