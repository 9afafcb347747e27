//! Engine configuration
//!
//! [`SecurityConfig`] is read by nearly every component. It is constructed
//! once with defaults and mutated only through an administrative partial
//! update ([`SecurityConfigUpdate`]); the facade holds it behind a
//! `tokio::sync::RwLock` so readers never observe a half-applied update.
//!
//! Some policy fields are declared but not enforced by any code path
//! (`max_concurrent_sessions`, `password_expiration_days`,
//! `password_history_count`); the compliance scorer still reads them.

use std::sync::Arc;

use chrono::Duration;

/// Shared, runtime-mutable configuration handle. Readers take the lock
/// briefly per operation so an administrative update is never observed
/// half-applied.
pub type SharedConfig = Arc<tokio::sync::RwLock<SecurityConfig>>;

/// Password strength policy, consumed by [`crate::validation`] and the
/// compliance scorer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordPolicy {
    pub min_length: usize,
    pub require_uppercase: bool,
    pub require_lowercase: bool,
    pub require_digit: bool,
    pub require_special: bool,
    /// Declared but unenforced: password age in days before forced rotation.
    pub expiration_days: Option<u32>,
    /// Declared but unenforced: number of prior passwords barred from reuse.
    pub history_count: u32,
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self {
            min_length: 8,
            require_uppercase: true,
            require_lowercase: true,
            require_digit: true,
            require_special: false,
            expiration_days: Some(90),
            history_count: 5,
        }
    }
}

/// Session lifecycle policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionPolicy {
    /// A session is invalid once this much time passes with no activity.
    pub idle_timeout: Duration,
    /// Absolute ceiling on session lifetime, regardless of activity.
    pub max_duration: Duration,
    /// Declared but unenforced: cap on live sessions per principal.
    pub max_concurrent_sessions: u32,
    /// Declared policy flag for callers gating sensitive operations.
    pub require_reauth_for_sensitive: bool,
}

impl Default for SessionPolicy {
    fn default() -> Self {
        Self {
            idle_timeout: Duration::minutes(30),
            max_duration: Duration::hours(12),
            max_concurrent_sessions: 5,
            require_reauth_for_sensitive: true,
        }
    }
}

/// Thresholds for lockout, anomaly, and volumetric threat detection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreatPolicy {
    /// Failed attempts within `detection_window` before an account locks.
    pub max_failed_attempts: u32,
    pub lockout_duration: Duration,
    /// Horizon over which failures are counted toward a lockout.
    pub detection_window: Duration,
    /// Attempts for one email within `burst_window` before flagging a burst.
    pub burst_threshold: u32,
    pub burst_window: Duration,
    /// Failures from one IP across all emails within an hour before the IP
    /// is flagged as an active threat.
    pub distributed_threshold: u32,
    /// Request volume from one IP within `ddos_window` before a block.
    pub ddos_request_threshold: u32,
    pub ddos_window: Duration,
    pub ip_block_duration: Duration,
    pub geolocation_enabled: bool,
    pub device_fingerprinting_enabled: bool,
}

impl Default for ThreatPolicy {
    fn default() -> Self {
        Self {
            max_failed_attempts: 5,
            lockout_duration: Duration::minutes(30),
            detection_window: Duration::hours(24),
            burst_threshold: 5,
            burst_window: Duration::minutes(5),
            distributed_threshold: 5,
            ddos_request_threshold: 1000,
            ddos_window: Duration::minutes(5),
            ip_block_duration: Duration::minutes(60),
            geolocation_enabled: true,
            device_fingerprinting_enabled: true,
        }
    }
}

/// Retention caps for derived state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetentionPolicy {
    /// Maximum alerts held by the bus; oldest dropped past this.
    pub max_alerts: usize,
    /// Resolved alerts older than this are pruned by the sweep.
    pub resolved_alert_retention: Duration,
    /// Audit ring-buffer capacity; oldest dropped past this.
    pub max_audit_records: usize,
    /// Login attempts older than this are purged by the sweep.
    pub attempt_retention: Duration,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            max_alerts: 1000,
            resolved_alert_retention: Duration::days(30),
            max_audit_records: 10_000,
            attempt_retention: Duration::days(7),
        }
    }
}

/// Default rate-limit parameters used when the caller does not supply any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitDefaults {
    pub window: Duration,
    pub max_requests: u32,
}

impl Default for RateLimitDefaults {
    fn default() -> Self {
        Self {
            window: Duration::minutes(15),
            max_requests: 100,
        }
    }
}

/// Process-wide security configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SecurityConfig {
    pub password: PasswordPolicy,
    pub session: SessionPolicy,
    pub threat: ThreatPolicy,
    pub retention: RetentionPolicy,
    pub rate_limit: RateLimitDefaults,
}

/// Administrative partial update; `None` fields leave the current value.
#[derive(Debug, Clone, Default)]
pub struct SecurityConfigUpdate {
    pub password: Option<PasswordPolicy>,
    pub session: Option<SessionPolicy>,
    pub threat: Option<ThreatPolicy>,
    pub retention: Option<RetentionPolicy>,
    pub rate_limit: Option<RateLimitDefaults>,
}

impl SecurityConfig {
    /// Apply a partial update in place, returning whether anything changed.
    pub fn apply(&mut self, update: SecurityConfigUpdate) -> bool {
        let mut changed = false;
        if let Some(password) = update.password {
            changed |= password != self.password;
            self.password = password;
        }
        if let Some(session) = update.session {
            changed |= session != self.session;
            self.session = session;
        }
        if let Some(threat) = update.threat {
            changed |= threat != self.threat;
            self.threat = threat;
        }
        if let Some(retention) = update.retention {
            changed |= retention != self.retention;
            self.retention = retention;
        }
        if let Some(rate_limit) = update.rate_limit {
            changed |= rate_limit != self.rate_limit;
            self.rate_limit = rate_limit;
        }
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SecurityConfig::default();
        assert_eq!(config.threat.max_failed_attempts, 5);
        assert_eq!(config.threat.lockout_duration, Duration::minutes(30));
        assert_eq!(config.retention.max_alerts, 1000);
        assert_eq!(config.retention.max_audit_records, 10_000);
        assert_eq!(config.password.min_length, 8);
    }

    #[test]
    fn test_apply_partial_update() {
        let mut config = SecurityConfig::default();
        let changed = config.apply(SecurityConfigUpdate {
            threat: Some(ThreatPolicy {
                max_failed_attempts: 3,
                ..ThreatPolicy::default()
            }),
            ..SecurityConfigUpdate::default()
        });

        assert!(changed);
        assert_eq!(config.threat.max_failed_attempts, 3);
        // Untouched sections keep their defaults
        assert_eq!(config.password, PasswordPolicy::default());
    }

    #[test]
    fn test_apply_noop_update_reports_unchanged() {
        let mut config = SecurityConfig::default();
        let changed = config.apply(SecurityConfigUpdate::default());
        assert!(!changed);

        let changed = config.apply(SecurityConfigUpdate {
            password: Some(PasswordPolicy::default()),
            ..SecurityConfigUpdate::default()
        });
        assert!(!changed);
    }
}
