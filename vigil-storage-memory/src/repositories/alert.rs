use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use vigil_core::{
    AlertId, Error, SecurityAlert, Severity, repositories::AlertRepository,
};

/// The alert list, most-recent-first. One global lock is acceptable here:
/// the list is small, bounded, and touched briefly.
#[derive(Default)]
pub struct MemoryAlertRepository {
    alerts: Mutex<Vec<SecurityAlert>>,
}

impl MemoryAlertRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<SecurityAlert>> {
        // A poisoned lock means a panic mid-mutation; the alert list has no
        // cross-entry invariants, so recover with the data as-is.
        self.alerts.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl AlertRepository for MemoryAlertRepository {
    async fn push(&self, alert: SecurityAlert) -> Result<(), Error> {
        self.lock().insert(0, alert);
        Ok(())
    }

    async fn drop_oldest_beyond(&self, cap: usize) -> Result<u64, Error> {
        let mut alerts = self.lock();
        let before = alerts.len();
        alerts.truncate(cap);
        Ok((before - alerts.len()) as u64)
    }

    async fn list(
        &self,
        limit: Option<usize>,
        severity: Option<Severity>,
    ) -> Result<Vec<SecurityAlert>, Error> {
        Ok(self
            .lock()
            .iter()
            .filter(|a| severity.is_none_or(|s| a.severity == s))
            .take(limit.unwrap_or(usize::MAX))
            .cloned()
            .collect())
    }

    async fn resolve(&self, id: &AlertId) -> Result<bool, Error> {
        let mut alerts = self.lock();
        match alerts.iter_mut().find(|a| &a.id == id) {
            Some(alert) => {
                alert.resolved = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn count_unresolved(&self, severity: Severity) -> Result<usize, Error> {
        Ok(self
            .lock()
            .iter()
            .filter(|a| !a.resolved && a.severity == severity)
            .count())
    }

    async fn prune_resolved_before(&self, before: DateTime<Utc>) -> Result<u64, Error> {
        let mut alerts = self.lock();
        let len = alerts.len();
        alerts.retain(|a| !a.resolved || a.at >= before);
        Ok((len - alerts.len()) as u64)
    }
}
