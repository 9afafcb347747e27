//! Anomaly detection over the login-attempt ledger.
//!
//! Four independent heuristics, OR'd: a login from a location never seen in
//! prior successful attempts, a device fingerprint never seen before, a
//! burst of attempts for one email, and a distributed pattern where one IP
//! fails against many emails. The detector only reads the ledger; it never
//! mutates it. Any flag raises one `suspicious_activity` alert carrying the
//! specific reasons.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Duration;

use crate::{
    Error,
    alert::{AlertKind, NewAlert, Severity},
    attempt::LoginAttempt,
    clock::Clock,
    config::SharedConfig,
    repositories::{AlertRepository, LoginAttemptRepository},
    services::AlertService,
};

/// Outcome of evaluating one attempt against the ledger history.
#[derive(Debug, Clone, Default)]
pub struct Evaluation {
    pub suspicious: bool,
    pub reasons: Vec<String>,
    /// IPs whose failure count across emails crossed the distributed-attack
    /// threshold. Candidates for the volumetric DDoS check.
    pub flagged_ips: Vec<String>,
}

pub struct AnomalyDetector<LA: LoginAttemptRepository, A: AlertRepository> {
    attempts: Arc<LA>,
    alerts: Arc<AlertService<A>>,
    clock: Arc<dyn Clock>,
    config: SharedConfig,
}

impl<LA: LoginAttemptRepository, A: AlertRepository> AnomalyDetector<LA, A> {
    pub fn new(
        attempts: Arc<LA>,
        alerts: Arc<AlertService<A>>,
        clock: Arc<dyn Clock>,
        config: SharedConfig,
    ) -> Self {
        Self {
            attempts,
            alerts,
            clock,
            config,
        }
    }

    /// Evaluate a just-recorded attempt. The attempt is expected to already
    /// be in the ledger (burst counting includes it).
    pub async fn evaluate(&self, attempt: &LoginAttempt) -> Result<Evaluation, Error> {
        let now = self.clock.now();
        let (threat, retention) = {
            let config = self.config.read().await;
            (config.threat.clone(), config.retention.attempt_retention)
        };

        let history = self
            .attempts
            .history(&attempt.email, now - retention)
            .await?;

        let mut evaluation = Evaluation::default();

        if threat.geolocation_enabled {
            if let Some(location) = &attempt.location {
                let known = history
                    .iter()
                    .filter(|a| a.success && a.id != attempt.id)
                    .any(|a| a.location.as_ref() == Some(location));
                if !known {
                    evaluation
                        .reasons
                        .push(format!("login from new location: {location}"));
                }
            }
        }

        if threat.device_fingerprinting_enabled {
            if let Some(fingerprint) = &attempt.device_fingerprint {
                let known = history
                    .iter()
                    .filter(|a| a.success && a.id != attempt.id)
                    .any(|a| a.device_fingerprint.as_ref() == Some(fingerprint));
                if !known {
                    evaluation.reasons.push("login from new device".to_string());
                }
            }
        }

        let burst = history
            .iter()
            .filter(|a| a.at >= now - threat.burst_window)
            .count() as u32;
        if burst > threat.burst_threshold {
            evaluation.reasons.push(format!(
                "high-frequency login attempts: {burst} in the last {} minutes",
                threat.burst_window.num_minutes()
            ));
        }

        let mut failures_by_ip: HashMap<String, u32> = HashMap::new();
        for a in self.attempts.recent_all(now - Duration::hours(1)).await? {
            if !a.success {
                *failures_by_ip.entry(a.ip_address).or_default() += 1;
            }
        }
        for (ip, failures) in failures_by_ip {
            if failures > threat.distributed_threshold {
                evaluation
                    .reasons
                    .push(format!("distributed attack pattern from {ip}"));
                evaluation.flagged_ips.push(ip);
            }
        }

        evaluation.suspicious = !evaluation.reasons.is_empty();

        if evaluation.suspicious {
            tracing::info!(
                email = %attempt.email,
                ip = %attempt.ip_address,
                reasons = ?evaluation.reasons,
                "Suspicious login activity detected"
            );
            self.alerts
                .try_raise(
                    NewAlert::new(
                        AlertKind::SuspiciousActivity,
                        Severity::Medium,
                        format!("Suspicious login activity for {}", attempt.email),
                    )
                    .principal(attempt.email.as_str())
                    .ip_address(attempt.ip_address.clone())
                    .detail("reasons", evaluation.reasons.clone()),
                )
                .await;
        }

        Ok(evaluation)
    }
}
