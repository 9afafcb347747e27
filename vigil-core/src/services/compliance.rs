//! Compliance scoring and the operator dashboard snapshot.
//!
//! Five fixed control checklists in two broad categories: credential and
//! session hygiene (password policy, credential rotation, session bounds)
//! and monitoring presence (lockout protection, audit coverage). The report
//! is a pure function of the current configuration and audit-log presence;
//! it has no side effects and is safe to call at any rate.

use std::sync::Arc;

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::{
    Error,
    alert::Severity,
    clock::Clock,
    config::SharedConfig,
    repositories::{AlertRepository, AuditRepository, LockRepository, LoginAttemptRepository},
};

/// One evaluated control checklist.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ControlResult {
    pub control: String,
    pub category: String,
    pub passed: bool,
}

/// The full compliance report: per-control booleans, an overall percentage,
/// and remediation recommendations for each failed control.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ComplianceReport {
    pub controls: Vec<ControlResult>,
    /// Percentage of satisfied controls, 0-100.
    pub score: u8,
    pub recommendations: Vec<String>,
}

/// Aggregated counters for operator display.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardSnapshot {
    pub active_ip_blocks: usize,
    pub failed_logins_24h: usize,
    pub unresolved_critical_alerts: usize,
    pub compliance_score: u8,
}

pub struct ComplianceService<AU, L, LA, A>
where
    AU: AuditRepository,
    L: LockRepository,
    LA: LoginAttemptRepository,
    A: AlertRepository,
{
    audit: Arc<AU>,
    locks: Arc<L>,
    attempts: Arc<LA>,
    alerts: Arc<A>,
    clock: Arc<dyn Clock>,
    config: SharedConfig,
}

impl<AU, L, LA, A> ComplianceService<AU, L, LA, A>
where
    AU: AuditRepository,
    L: LockRepository,
    LA: LoginAttemptRepository,
    A: AlertRepository,
{
    pub fn new(
        audit: Arc<AU>,
        locks: Arc<L>,
        attempts: Arc<LA>,
        alerts: Arc<A>,
        clock: Arc<dyn Clock>,
        config: SharedConfig,
    ) -> Self {
        Self {
            audit,
            locks,
            attempts,
            alerts,
            clock,
            config,
        }
    }

    /// Evaluate the five control checklists against current configuration
    /// and audit-log presence.
    pub async fn report(&self) -> Result<ComplianceReport, Error> {
        let config = self.config.read().await.clone();
        let audit_count = self.audit.count().await?;

        let mut controls = Vec::with_capacity(5);
        let mut recommendations = Vec::new();

        let password_ok = config.password.min_length >= 8
            && config.password.require_uppercase
            && config.password.require_digit;
        controls.push(ControlResult {
            control: "password-policy".to_string(),
            category: "hygiene".to_string(),
            passed: password_ok,
        });
        if !password_ok {
            recommendations.push(
                "Require at least 8 characters with mixed case and digits in passwords"
                    .to_string(),
            );
        }

        let rotation_ok =
            config.password.expiration_days.is_some() && config.password.history_count > 0;
        controls.push(ControlResult {
            control: "credential-rotation".to_string(),
            category: "hygiene".to_string(),
            passed: rotation_ok,
        });
        if !rotation_ok {
            recommendations
                .push("Declare a password expiration period and reuse history".to_string());
        }

        let session_ok = config.session.idle_timeout <= Duration::hours(1)
            && config.session.max_duration <= Duration::hours(24);
        controls.push(ControlResult {
            control: "session-bounds".to_string(),
            category: "hygiene".to_string(),
            passed: session_ok,
        });
        if !session_ok {
            recommendations.push(
                "Bound sessions to at most a 1 hour idle timeout and 24 hour lifetime".to_string(),
            );
        }

        let lockout_ok = config.threat.max_failed_attempts <= 10
            && config.threat.lockout_duration >= Duration::minutes(15);
        controls.push(ControlResult {
            control: "lockout-protection".to_string(),
            category: "monitoring".to_string(),
            passed: lockout_ok,
        });
        if !lockout_ok {
            recommendations.push(
                "Lock accounts within 10 failed attempts for at least 15 minutes".to_string(),
            );
        }

        let audit_ok = audit_count > 0 && config.retention.max_audit_records > 0;
        controls.push(ControlResult {
            control: "audit-coverage".to_string(),
            category: "monitoring".to_string(),
            passed: audit_ok,
        });
        if !audit_ok {
            recommendations
                .push("Enable audit logging; the audit trail is currently empty".to_string());
        }

        let passed = controls.iter().filter(|c| c.passed).count();
        let score = (passed * 100 / controls.len()) as u8;

        Ok(ComplianceReport {
            controls,
            score,
            recommendations,
        })
    }

    /// Aggregate current counters for operator display.
    pub async fn dashboard(&self) -> Result<DashboardSnapshot, Error> {
        let now = self.clock.now();

        let active_ip_blocks = {
            let blocks = self.locks.list_blocks().await?;
            blocks.iter().filter(|b| b.is_active(now)).count()
        };

        let failed_logins_24h = self
            .attempts
            .recent_all(now - Duration::hours(24))
            .await?
            .iter()
            .filter(|a| !a.success)
            .count();

        let unresolved_critical_alerts = self.alerts.count_unresolved(Severity::Critical).await?;

        let compliance_score = self.report().await?.score;

        Ok(DashboardSnapshot {
            active_ip_blocks,
            failed_logins_24h,
            unresolved_critical_alerts,
            compliance_score,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        attempt::IpBlock,
        audit::{AuditId, AuditRecord, RiskLevel},
        clock::ManualClock,
        repositories::LockRepository as _,
        services::{
            alert::tests::{MockAlertRepository, shared_config},
            audit::tests::MockAuditRepository,
            login_ledger::tests::{MockAttemptRepository, MockLockRepository},
        },
    };
    use chrono::Utc;
    use std::collections::BTreeMap;

    struct Fixture {
        audit: Arc<MockAuditRepository>,
        locks: Arc<MockLockRepository>,
        attempts: Arc<MockAttemptRepository>,
        clock: Arc<ManualClock>,
        service: ComplianceService<
            MockAuditRepository,
            MockLockRepository,
            MockAttemptRepository,
            MockAlertRepository,
        >,
        config: SharedConfig,
    }

    fn fixture() -> Fixture {
        let audit = Arc::new(MockAuditRepository::new());
        let locks = Arc::new(MockLockRepository::new());
        let attempts = Arc::new(MockAttemptRepository::new());
        let alerts = Arc::new(MockAlertRepository::new());
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let config = shared_config();
        let service = ComplianceService::new(
            audit.clone(),
            locks.clone(),
            attempts.clone(),
            alerts,
            clock.clone(),
            config.clone(),
        );
        Fixture {
            audit,
            locks,
            attempts,
            clock,
            service,
            config,
        }
    }

    async fn seed_audit(audit: &MockAuditRepository) {
        use crate::repositories::AuditRepository as _;
        audit
            .append(AuditRecord {
                id: AuditId::new_random(),
                principal_id: None,
                action: "login_attempt".to_string(),
                resource: "auth".to_string(),
                at: Utc::now(),
                ip_address: None,
                success: true,
                risk_level: RiskLevel::Low,
                details: BTreeMap::new(),
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_default_config_with_audit_scores_full() {
        let f = fixture();
        seed_audit(&f.audit).await;

        let report = f.service.report().await.unwrap();
        assert_eq!(report.score, 100);
        assert!(report.recommendations.is_empty());
        assert_eq!(report.controls.len(), 5);
    }

    #[tokio::test]
    async fn test_empty_audit_log_fails_coverage_control() {
        let f = fixture();

        let report = f.service.report().await.unwrap();
        assert_eq!(report.score, 80);
        let audit_control = report
            .controls
            .iter()
            .find(|c| c.control == "audit-coverage")
            .unwrap();
        assert!(!audit_control.passed);
        assert_eq!(report.recommendations.len(), 1);
    }

    #[tokio::test]
    async fn test_report_is_idempotent() {
        let f = fixture();
        seed_audit(&f.audit).await;

        let first = f.service.report().await.unwrap();
        let second = f.service.report().await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_weak_config_lowers_score() {
        let f = fixture();
        seed_audit(&f.audit).await;

        {
            let mut config = f.config.write().await;
            config.password.min_length = 4;
            config.threat.lockout_duration = Duration::minutes(1);
        }

        let report = f.service.report().await.unwrap();
        assert_eq!(report.score, 60);
        assert_eq!(report.recommendations.len(), 2);
    }

    #[tokio::test]
    async fn test_dashboard_counts() {
        let f = fixture();
        seed_audit(&f.audit).await;

        let now = f.clock.now();
        f.locks
            .upsert_block(IpBlock {
                ip_address: "6.6.6.6".to_string(),
                blocked_until: now + Duration::minutes(30),
            })
            .await
            .unwrap();
        // An already-expired block must not count
        f.locks
            .upsert_block(IpBlock {
                ip_address: "7.7.7.7".to_string(),
                blocked_until: now - Duration::minutes(1),
            })
            .await
            .unwrap();

        use crate::repositories::LoginAttemptRepository as _;
        use crate::attempt::LoginAttempt;
        f.attempts
            .append(
                LoginAttempt::builder()
                    .email("a@x.com")
                    .ip_address("1.2.3.4")
                    .success(false)
                    .at(now)
                    .build()
                    .unwrap(),
            )
            .await
            .unwrap();

        let snapshot = f.service.dashboard().await.unwrap();
        assert_eq!(snapshot.active_ip_blocks, 1);
        assert_eq!(snapshot.failed_logins_24h, 1);
        assert_eq!(snapshot.unresolved_critical_alerts, 0);
        assert_eq!(snapshot.compliance_score, 100);
    }
}
