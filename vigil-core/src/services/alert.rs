//! Alert bus service.
//!
//! Producers raise structured alerts here; the bus stores them
//! most-recent-first, caps the retained count, and supports listing and
//! resolution. Raising is fire-and-forget: severity is decided entirely by
//! the producing component and never re-classified.

use std::sync::Arc;

use crate::{
    Error,
    alert::{AlertId, NewAlert, SecurityAlert, Severity},
    clock::Clock,
    config::SharedConfig,
    repositories::AlertRepository,
};

pub struct AlertService<R: AlertRepository> {
    repository: Arc<R>,
    clock: Arc<dyn Clock>,
    config: SharedConfig,
}

impl<R: AlertRepository> AlertService<R> {
    pub fn new(repository: Arc<R>, clock: Arc<dyn Clock>, config: SharedConfig) -> Self {
        Self {
            repository,
            clock,
            config,
        }
    }

    /// Raise an alert. Assigns id and timestamp, stores it, and enforces
    /// the retention cap.
    pub async fn raise(&self, new: NewAlert) -> Result<SecurityAlert, Error> {
        let alert = SecurityAlert {
            id: AlertId::new_random(),
            kind: new.kind,
            severity: new.severity,
            message: new.message,
            principal_id: new.principal_id,
            ip_address: new.ip_address,
            at: self.clock.now(),
            resolved: false,
            details: new.details,
        };

        if alert.severity >= Severity::High {
            tracing::warn!(
                alert_id = %alert.id,
                kind = ?alert.kind,
                severity = ?alert.severity,
                message = %alert.message,
                "Security alert raised"
            );
        } else {
            tracing::info!(
                alert_id = %alert.id,
                kind = ?alert.kind,
                severity = ?alert.severity,
                "Security alert raised"
            );
        }

        self.repository.push(alert.clone()).await?;

        let cap = self.config.read().await.retention.max_alerts;
        self.repository.drop_oldest_beyond(cap).await?;

        Ok(alert)
    }

    /// Raise an alert, swallowing storage failures.
    ///
    /// Producers on the hot authentication path use this so a failing alert
    /// store never blocks the primary security decision.
    pub async fn try_raise(&self, new: NewAlert) {
        if let Err(e) = self.raise(new).await {
            tracing::warn!(error = %e, "Failed to persist security alert");
        }
    }

    /// Most-recent-first listing, optionally filtered by severity.
    pub async fn list(
        &self,
        limit: Option<usize>,
        severity: Option<Severity>,
    ) -> Result<Vec<SecurityAlert>, Error> {
        self.repository.list(limit, severity).await
    }

    /// Mark an alert resolved. Returns `false` for unknown ids.
    pub async fn resolve(&self, id: &AlertId) -> Result<bool, Error> {
        let resolved = self.repository.resolve(id).await?;
        if resolved {
            tracing::info!(alert_id = %id, "Security alert resolved");
        }
        Ok(resolved)
    }

    /// Count unresolved alerts at exactly the given severity.
    pub async fn count_unresolved(&self, severity: Severity) -> Result<usize, Error> {
        self.repository.count_unresolved(severity).await
    }

    /// Delete resolved alerts past the retention horizon. Returns the
    /// number removed.
    pub async fn prune_resolved(&self) -> Result<u64, Error> {
        let retention = self.config.read().await.retention.resolved_alert_retention;
        let before = self.clock.now() - retention;
        self.repository.prune_resolved_before(before).await
    }
}
