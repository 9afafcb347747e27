//! Audit log service.
//!
//! Appends are best-effort and always cheap; any record classified High or
//! Critical additionally raises exactly one matching alert carrying the
//! audit record's id. The log is capacity-bounded, so callers needing a
//! permanent trail must archive externally before eviction.

use std::sync::Arc;

use crate::{
    Error,
    alert::{AlertKind, NewAlert},
    audit::{AuditId, AuditQuery, AuditRecord, NewAuditEvent, RiskLevel},
    clock::Clock,
    config::SharedConfig,
    repositories::{AlertRepository, AuditRepository},
    services::AlertService,
};

pub struct AuditService<R: AuditRepository, A: AlertRepository> {
    repository: Arc<R>,
    alerts: Arc<AlertService<A>>,
    clock: Arc<dyn Clock>,
    config: SharedConfig,
}

impl<R: AuditRepository, A: AlertRepository> AuditService<R, A> {
    pub fn new(
        repository: Arc<R>,
        alerts: Arc<AlertService<A>>,
        clock: Arc<dyn Clock>,
        config: SharedConfig,
    ) -> Self {
        Self {
            repository,
            alerts,
            clock,
            config,
        }
    }

    /// Append an audit record, enforce the ring cap, and escalate high-risk
    /// records to the alert bus.
    pub async fn append(&self, event: NewAuditEvent) -> Result<AuditRecord, Error> {
        let record = AuditRecord {
            id: AuditId::new_random(),
            principal_id: event.principal_id,
            action: event.action,
            resource: event.resource,
            at: self.clock.now(),
            ip_address: event.ip_address,
            success: event.success,
            risk_level: event.risk_level,
            details: event.details,
        };

        self.repository.append(record.clone()).await?;

        let cap = self.config.read().await.retention.max_audit_records;
        let dropped = self.repository.drop_oldest_beyond(cap).await?;
        if dropped > 0 {
            tracing::debug!(dropped = dropped, "Audit ring buffer evicted oldest records");
        }

        if record.risk_level >= RiskLevel::High {
            let mut alert = NewAlert::new(
                AlertKind::SuspiciousActivity,
                record.risk_level.into(),
                format!("High-risk action recorded: {}", record.action),
            )
            .detail("audit_id", record.id.as_str())
            .detail("resource", record.resource.clone());
            if let Some(principal_id) = &record.principal_id {
                alert = alert.principal(principal_id.as_str());
            }
            if let Some(ip_address) = &record.ip_address {
                alert = alert.ip_address(ip_address.clone());
            }
            self.alerts.try_raise(alert).await;
        }

        Ok(record)
    }

    /// Append, swallowing storage failures.
    ///
    /// The audit trail must never block a security decision already taken
    /// in memory; failures are logged and dropped.
    pub async fn try_append(&self, event: NewAuditEvent) {
        if let Err(e) = self.append(event).await {
            tracing::warn!(error = %e, "Failed to persist audit record");
        }
    }

    /// Records matching the query, newest-first.
    pub async fn query(&self, query: &AuditQuery) -> Result<Vec<AuditRecord>, Error> {
        self.repository.query(query).await
    }

    /// Number of retained records.
    pub async fn count(&self) -> Result<usize, Error> {
        self.repository.count().await
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::{
        alert::Severity,
        clock::SystemClock,
        services::alert::tests::{MockAlertRepository, shared_config},
    };
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Mock repository for testing, shared with the other service tests.
    pub(crate) struct MockAuditRepository {
        pub records: Mutex<Vec<AuditRecord>>,
    }

    impl MockAuditRepository {
        pub fn new() -> Self {
            Self {
                records: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl AuditRepository for MockAuditRepository {
        async fn append(&self, record: AuditRecord) -> Result<(), Error> {
            self.records.lock().unwrap().push(record);
            Ok(())
        }

        async fn drop_oldest_beyond(&self, cap: usize) -> Result<u64, Error> {
            let mut records = self.records.lock().unwrap();
            let mut dropped = 0;
            while records.len() > cap {
                records.remove(0);
                dropped += 1;
            }
            Ok(dropped)
        }

        async fn query(&self, query: &AuditQuery) -> Result<Vec<AuditRecord>, Error> {
            let records = self.records.lock().unwrap();
            let mut matching: Vec<_> = records.iter().filter(|r| query.matches(r)).cloned().collect();
            matching.reverse();
            if let Some(limit) = query.limit {
                matching.truncate(limit);
            }
            Ok(matching)
        }

        async fn count(&self) -> Result<usize, Error> {
            Ok(self.records.lock().unwrap().len())
        }
    }

    fn services(
        audit_repo: Arc<MockAuditRepository>,
        alert_repo: Arc<MockAlertRepository>,
    ) -> AuditService<MockAuditRepository, MockAlertRepository> {
        let config = shared_config();
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let alerts = Arc::new(AlertService::new(alert_repo, clock.clone(), config.clone()));
        AuditService::new(audit_repo, alerts, clock, config)
    }

    #[tokio::test]
    async fn test_append_low_risk_raises_no_alert() {
        let audit_repo = Arc::new(MockAuditRepository::new());
        let alert_repo = Arc::new(MockAlertRepository::new());
        let audit = services(audit_repo.clone(), alert_repo.clone());

        let record = audit
            .append(NewAuditEvent::new("login_attempt", "auth", true))
            .await
            .unwrap();

        assert!(record.id.as_str().starts_with("aud_"));
        assert_eq!(audit_repo.records.lock().unwrap().len(), 1);
        assert!(alert_repo.alerts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_critical_risk_raises_exactly_one_critical_alert() {
        let audit_repo = Arc::new(MockAuditRepository::new());
        let alert_repo = Arc::new(MockAlertRepository::new());
        let audit = services(audit_repo, alert_repo.clone());

        let record = audit
            .append(
                NewAuditEvent::new("config_change", "security_config", true)
                    .principal("usr_admin")
                    .risk(RiskLevel::Critical),
            )
            .await
            .unwrap();

        let alerts = alert_repo.alerts.lock().unwrap();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].severity, Severity::Critical);
        assert_eq!(alerts[0].details["audit_id"], record.id.as_str());
    }

    #[tokio::test]
    async fn test_ring_buffer_drops_oldest() {
        let audit_repo = Arc::new(MockAuditRepository::new());
        let alert_repo = Arc::new(MockAlertRepository::new());
        let config = shared_config();
        config.write().await.retention.max_audit_records = 2;
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let alerts = Arc::new(AlertService::new(alert_repo, clock.clone(), config.clone()));
        let audit = AuditService::new(audit_repo.clone(), alerts, clock, config);

        for i in 0..4 {
            audit
                .append(NewAuditEvent::new(format!("action_{i}"), "res", true))
                .await
                .unwrap();
        }

        let records = audit_repo.records.lock().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].action, "action_2");
        assert_eq!(records[1].action, "action_3");
    }

    #[tokio::test]
    async fn test_query_newest_first_with_filters() {
        let audit_repo = Arc::new(MockAuditRepository::new());
        let alert_repo = Arc::new(MockAlertRepository::new());
        let audit = services(audit_repo, alert_repo);

        audit
            .append(NewAuditEvent::new("login_attempt", "auth", false).principal("usr_1"))
            .await
            .unwrap();
        audit
            .append(NewAuditEvent::new("password_change", "account", true).principal("usr_1"))
            .await
            .unwrap();
        audit
            .append(NewAuditEvent::new("login_attempt", "auth", true).principal("usr_2"))
            .await
            .unwrap();

        let results = audit
            .query(&AuditQuery {
                action_contains: Some("login".to_string()),
                ..AuditQuery::default()
            })
            .await
            .unwrap();
        assert_eq!(results.len(), 2);
        // Newest first
        assert_eq!(results[0].principal_id.as_ref().unwrap().as_str(), "usr_2");

        let results = audit
            .query(&AuditQuery {
                principal_id: Some("usr_1".into()),
                ..AuditQuery::default()
            })
            .await
            .unwrap();
        assert_eq!(results.len(), 2);
    }
}
