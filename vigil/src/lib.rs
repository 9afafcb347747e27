//! # Vigil
//!
//! Vigil is an access-security monitoring engine for web applications: a
//! single long-lived service object that tracks login attempts, enforces
//! sliding-window rate limits, detects anomalous and volumetric threats,
//! manages two-factor enrollment and sessions, raises alerts, keeps an
//! append-only audit trail, and scores configuration compliance.
//!
//! The engine is a library boundary, not a transport: the host calls it
//! from its request handlers and decides what denials mean (HTTP 429,
//! lockout page, CAPTCHA). Nothing here terminates connections or delivers
//! two-factor codes; those are the host's collaborators.
//!
//! ## Example
//!
//! ```rust,no_run
//! use vigil::{AttemptInput, VigilBuilder};
//!
//! #[tokio::main]
//! async fn main() {
//!     let vigil = VigilBuilder::new().with_memory().build();
//!
//!     let outcome = vigil
//!         .record_login_attempt(AttemptInput {
//!             email: "user@example.com".to_string(),
//!             ip_address: "203.0.113.7".to_string(),
//!             user_agent: Some("Mozilla/5.0".to_string()),
//!             success: false,
//!             location: None,
//!             device_fingerprint: None,
//!             two_factor_used: false,
//!             failure_reason: Some("bad password".to_string()),
//!         })
//!         .await
//!         .unwrap();
//!
//!     if outcome.lockout.is_locked {
//!         // Tell the user to come back later
//!     }
//! }
//! ```

pub mod builder;

use std::sync::Arc;

use chrono::Duration;
use tokio::sync::watch;

use vigil_core::{
    AlertId, AuditQuery, AuditRecord, Clock, GeoResolver, NewAuditEvent, PrincipalId, RiskLevel,
    SecurityAlert, SecurityConfig, SecurityConfigUpdate, Session, SessionToken, SharedConfig,
    TwoFactorSetup, TwoFactorStatus,
    repositories::{
        AlertRepositoryProvider, AuditRepositoryProvider, LockRepository, LockRepositoryProvider,
        LoginAttemptRepository, LoginAttemptRepositoryProvider, RateLimitRepositoryProvider,
        RepositoryProvider, SessionRepositoryProvider, TwoFactorRepositoryProvider,
    },
    services::{
        AlertService, AnomalyDetector, AuditService, ComplianceReport, ComplianceService,
        DashboardSnapshot, Evaluation, LockoutStatus, LoginLedgerService, RateLimitService,
        SessionService, ThreatService, TwoFactorService,
    },
    validation,
};

/// Re-export core types commonly used when working with the Vigil API.
pub use vigil_core::{
    AlertKind, Error, LoginAttempt, PasswordCheck, Severity, SystemClock,
    clock::ManualClock,
    geo::{StaticGeoResolver, UnknownGeoResolver},
    services::{AttemptInput, ControlResult},
};

pub use builder::VigilBuilder;

/// Re-export the in-memory storage backend.
#[cfg(feature = "memory")]
pub use vigil_storage_memory::MemoryRepositoryProvider;

/// Display name used in two-factor provisioning payloads.
const TWO_FACTOR_ISSUER: &str = "Vigil";

/// Interval between background sweep passes.
const SWEEP_INTERVAL: std::time::Duration = std::time::Duration::from_secs(3600);

/// Everything the engine concluded about one recorded login attempt.
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub attempt: LoginAttempt,
    pub lockout: LockoutStatus,
    pub evaluation: Evaluation,
}

/// Counters from one background sweep pass.
#[derive(Debug, Clone, Copy, Default)]
pub struct SweepStats {
    pub rate_entries: u64,
    pub locks_and_blocks: u64,
    pub attempts: u64,
    pub resolved_alerts: u64,
    pub sessions: u64,
}

/// The monitoring engine coordinator.
///
/// One `Vigil` instance holds all engine state behind a repository provider
/// and is shared across request handlers (wrap it in an `Arc`, or clone the
/// service handles it exposes). There is no ambient global: construct it
/// once at startup via [`VigilBuilder`] and pass it to callers.
pub struct Vigil<R: RepositoryProvider> {
    repositories: Arc<R>,
    config: SharedConfig,
    clock: Arc<dyn Clock>,
    alerts: Arc<AlertService<R::AlertRepo>>,
    audit: Arc<AuditService<R::AuditRepo, R::AlertRepo>>,
    rate_limiter: Arc<RateLimitService<R::RateLimitRepo, R::AlertRepo>>,
    ledger: Arc<LoginLedgerService<R::LoginAttemptRepo, R::LockRepo, R::AlertRepo>>,
    anomaly: Arc<AnomalyDetector<R::LoginAttemptRepo, R::AlertRepo>>,
    threat: Arc<ThreatService<R::RateLimitRepo, R::LockRepo, R::AlertRepo>>,
    two_factor: Arc<TwoFactorService<R::TwoFactorRepo>>,
    sessions: Arc<SessionService<R::SessionRepo>>,
    compliance:
        Arc<ComplianceService<R::AuditRepo, R::LockRepo, R::LoginAttemptRepo, R::AlertRepo>>,
}

impl<R: RepositoryProvider> Vigil<R> {
    /// Construct the engine over a repository provider with explicit
    /// collaborators. Most callers go through [`VigilBuilder`].
    pub fn new(
        repositories: Arc<R>,
        config: SecurityConfig,
        clock: Arc<dyn Clock>,
        geo: Arc<dyn GeoResolver>,
    ) -> Self {
        let config: SharedConfig = Arc::new(tokio::sync::RwLock::new(config));

        let alerts = Arc::new(AlertService::new(
            repositories.alerts(),
            clock.clone(),
            config.clone(),
        ));
        let audit = Arc::new(AuditService::new(
            repositories.audit(),
            alerts.clone(),
            clock.clone(),
            config.clone(),
        ));
        let rate_limiter = Arc::new(RateLimitService::new(
            repositories.rate_limit(),
            alerts.clone(),
            clock.clone(),
        ));
        let ledger = Arc::new(LoginLedgerService::new(
            repositories.login_attempts(),
            repositories.locks(),
            alerts.clone(),
            geo,
            clock.clone(),
            config.clone(),
        ));
        let anomaly = Arc::new(AnomalyDetector::new(
            repositories.login_attempts(),
            alerts.clone(),
            clock.clone(),
            config.clone(),
        ));
        let threat = Arc::new(ThreatService::new(
            repositories.rate_limit(),
            repositories.locks(),
            alerts.clone(),
            clock.clone(),
            config.clone(),
        ));
        let two_factor = Arc::new(TwoFactorService::new(
            repositories.two_factor(),
            clock.clone(),
            TWO_FACTOR_ISSUER,
        ));
        let sessions = Arc::new(SessionService::new(
            repositories.sessions(),
            clock.clone(),
            config.clone(),
        ));
        let compliance = Arc::new(ComplianceService::new(
            repositories.audit(),
            repositories.locks(),
            repositories.login_attempts(),
            repositories.alerts(),
            clock.clone(),
            config.clone(),
        ));

        Self {
            repositories,
            config,
            clock,
            alerts,
            audit,
            rate_limiter,
            ledger,
            anomaly,
            threat,
            two_factor,
            sessions,
            compliance,
        }
    }

    // ------------------------------------------------------------------
    // Login attempts, lockout, and threat evaluation
    // ------------------------------------------------------------------

    /// Record a login attempt and run the full evaluation pipeline:
    /// ledger append, lockout derivation, anomaly heuristics, and a
    /// volumetric check for any IP the distributed-attack heuristic
    /// flagged. The attempt is also written to the audit trail.
    pub async fn record_login_attempt(&self, input: AttemptInput) -> Result<LoginOutcome, Error> {
        let (attempt, lockout) = self.ledger.record(input).await?;
        let evaluation = self.anomaly.evaluate(&attempt).await?;

        for ip in &evaluation.flagged_ips {
            self.threat.detect_ddos(ip).await?;
        }

        let risk = if attempt.success {
            RiskLevel::Low
        } else {
            RiskLevel::Medium
        };
        let mut event = NewAuditEvent::new("login_attempt", "auth", attempt.success)
            .principal(attempt.email.as_str())
            .ip_address(attempt.ip_address.clone())
            .risk(risk);
        if evaluation.suspicious {
            event = event.detail("suspicious_reasons", evaluation.reasons.clone());
        }
        if lockout.is_locked {
            event = event.detail("account_locked", true);
        }
        self.audit.try_append(event).await;

        Ok(LoginOutcome {
            attempt,
            lockout,
            evaluation,
        })
    }

    /// Whether authentication for this email is currently denied.
    pub async fn is_account_locked(&self, email: &str) -> Result<bool, Error> {
        self.ledger.is_locked(email).await
    }

    /// Administrative unlock. Clears the lock and the failure history and
    /// audits the action. Returns whether the account was locked.
    pub async fn unlock_account(&self, email: &str) -> Result<bool, Error> {
        let was_locked = self.ledger.unlock(email).await?;
        self.audit
            .try_append(
                NewAuditEvent::new("account_unlock", "auth", true)
                    .principal(email)
                    .risk(RiskLevel::Medium),
            )
            .await;
        Ok(was_locked)
    }

    /// Whether requests from this IP are currently advised to be denied.
    pub async fn is_ip_blocked(&self, ip_address: &str) -> Result<bool, Error> {
        self.threat.is_ip_blocked(ip_address).await
    }

    /// Manually block an IP for the given duration.
    pub async fn block_ip(&self, ip_address: &str, duration: Duration) -> Result<(), Error> {
        self.threat.block_ip(ip_address, duration).await?;
        self.audit
            .try_append(
                NewAuditEvent::new("ip_block", "network", true)
                    .ip_address(ip_address)
                    .risk(RiskLevel::Medium),
            )
            .await;
        Ok(())
    }

    /// Lift a block ahead of its expiry.
    pub async fn unblock_ip(&self, ip_address: &str) -> Result<(), Error> {
        self.threat.unblock_ip(ip_address).await?;
        self.audit
            .try_append(
                NewAuditEvent::new("ip_unblock", "network", true)
                    .ip_address(ip_address)
                    .risk(RiskLevel::Medium),
            )
            .await;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Rate limiting
    // ------------------------------------------------------------------

    /// Admit or deny one unit for the identifier using the configured
    /// default window and limit.
    pub async fn check_rate_limit(&self, identifier: &str) -> Result<bool, Error> {
        let defaults = self.config.read().await.rate_limit.clone();
        self.rate_limiter
            .allow(identifier, defaults.window, defaults.max_requests)
            .await
    }

    /// Admit or deny one unit with an explicit window and limit.
    pub async fn check_rate_limit_with(
        &self,
        identifier: &str,
        window: Duration,
        max_requests: u32,
    ) -> Result<bool, Error> {
        self.rate_limiter.allow(identifier, window, max_requests).await
    }

    // ------------------------------------------------------------------
    // Password validation
    // ------------------------------------------------------------------

    /// Check a password against the live policy. Weak passwords are a
    /// structured result, never an error.
    pub async fn validate_password(&self, password: &str) -> PasswordCheck {
        let policy = self.config.read().await.password.clone();
        validation::check_password(password, &policy)
    }

    // ------------------------------------------------------------------
    // Two-factor
    // ------------------------------------------------------------------

    /// Begin two-factor enrollment for a principal.
    pub async fn setup_two_factor(&self, principal_id: &PrincipalId) -> Result<TwoFactorSetup, Error> {
        let setup = self.two_factor.setup(principal_id).await?;
        self.audit
            .try_append(
                NewAuditEvent::new("two_factor_setup", "account", true)
                    .principal(principal_id.as_str()),
            )
            .await;
        Ok(setup)
    }

    /// Complete enrollment with a verification code. Only a successful
    /// enable is audited.
    pub async fn enable_two_factor(
        &self,
        principal_id: &PrincipalId,
        code: &str,
    ) -> Result<bool, Error> {
        let enabled = self.two_factor.enable(principal_id, code).await?;
        if enabled {
            self.audit
                .try_append(
                    NewAuditEvent::new("two_factor_enable", "account", true)
                        .principal(principal_id.as_str()),
                )
                .await;
        }
        Ok(enabled)
    }

    /// Disable two-factor with a live code or an unused backup code. Fails
    /// closed without a valid credential; only a successful disable is
    /// audited.
    pub async fn disable_two_factor(
        &self,
        principal_id: &PrincipalId,
        credential: &str,
    ) -> Result<bool, Error> {
        let disabled = self.two_factor.disable(principal_id, credential).await?;
        if disabled {
            self.audit
                .try_append(
                    NewAuditEvent::new("two_factor_disable", "account", true)
                        .principal(principal_id.as_str())
                        .risk(RiskLevel::Medium),
                )
                .await;
        }
        Ok(disabled)
    }

    /// Verify a live two-factor code, e.g. during login.
    pub async fn verify_two_factor(
        &self,
        principal_id: &PrincipalId,
        code: &str,
    ) -> Result<bool, Error> {
        self.two_factor.verify(principal_id, code).await
    }

    /// Where the principal stands in the enrollment state machine.
    pub async fn two_factor_status(
        &self,
        principal_id: &PrincipalId,
    ) -> Result<TwoFactorStatus, Error> {
        self.two_factor.status(principal_id).await
    }

    // ------------------------------------------------------------------
    // Sessions
    // ------------------------------------------------------------------

    /// Create a session for a principal.
    pub async fn create_session(&self, principal_id: &PrincipalId) -> Result<Session, Error> {
        let session = self.sessions.create(principal_id).await?;
        self.audit
            .try_append(
                NewAuditEvent::new("session_create", "session", true)
                    .principal(principal_id.as_str()),
            )
            .await;
        Ok(session)
    }

    /// Validate a session token for a principal. Invalid sessions are
    /// deleted as a side effect.
    pub async fn validate_session(
        &self,
        token: &SessionToken,
        principal_id: &PrincipalId,
    ) -> Result<bool, Error> {
        self.sessions.validate(token, principal_id).await
    }

    /// Delete a session (logout).
    pub async fn destroy_session(&self, token: &SessionToken) -> Result<(), Error> {
        self.sessions.destroy(token).await
    }

    /// Delete every session belonging to a principal.
    pub async fn destroy_all_sessions(&self, principal_id: &PrincipalId) -> Result<(), Error> {
        self.sessions.destroy_all(principal_id).await
    }

    // ------------------------------------------------------------------
    // Alerts, audit, compliance
    // ------------------------------------------------------------------

    /// Append a caller-originated audit event. Records classified High or
    /// Critical additionally raise a matching alert.
    pub async fn log_audit_event(&self, event: NewAuditEvent) -> Result<AuditRecord, Error> {
        self.audit.append(event).await
    }

    /// Most-recent-first alerts, optionally limited and filtered.
    pub async fn get_security_alerts(
        &self,
        limit: Option<usize>,
        severity: Option<Severity>,
    ) -> Result<Vec<SecurityAlert>, Error> {
        self.alerts.list(limit, severity).await
    }

    /// Mark an alert resolved. Returns `false` for unknown ids.
    pub async fn resolve_security_alert(&self, id: &AlertId) -> Result<bool, Error> {
        self.alerts.resolve(id).await
    }

    /// Query the audit log, newest-first.
    pub async fn get_audit_logs(&self, query: &AuditQuery) -> Result<Vec<AuditRecord>, Error> {
        self.audit.query(query).await
    }

    /// Evaluate the compliance checklists. Pure function of current state.
    pub async fn get_compliance_report(&self) -> Result<ComplianceReport, Error> {
        self.compliance.report().await
    }

    /// Aggregate counters for operator display.
    pub async fn get_security_dashboard_data(&self) -> Result<DashboardSnapshot, Error> {
        self.compliance.dashboard().await
    }

    // ------------------------------------------------------------------
    // Configuration and lifecycle
    // ------------------------------------------------------------------

    /// A snapshot of the current configuration.
    pub async fn config(&self) -> SecurityConfig {
        self.config.read().await.clone()
    }

    /// Apply an administrative partial configuration update and return the
    /// resulting snapshot. The change is audited.
    pub async fn update_security_config(
        &self,
        update: SecurityConfigUpdate,
    ) -> Result<SecurityConfig, Error> {
        let snapshot = {
            let mut config = self.config.write().await;
            let changed = config.apply(update);
            if changed {
                tracing::info!("Security configuration updated");
            }
            config.clone()
        };
        self.audit
            .try_append(
                NewAuditEvent::new("security_config_update", "security_config", true)
                    .risk(RiskLevel::Medium),
            )
            .await;
        Ok(snapshot)
    }

    /// Health check across the storage backend.
    pub async fn health_check(&self) -> Result<(), Error> {
        self.repositories.health_check().await
    }

    /// Run one sweep pass: prune stale rate windows, expired locks and
    /// blocks, old login attempts, resolved alerts past retention, and
    /// expired sessions.
    pub async fn sweep(&self) -> Result<SweepStats, Error> {
        let now = self.clock.now();
        let attempt_retention = self.config.read().await.retention.attempt_retention;

        let stats = SweepStats {
            // Rate windows older than a day cannot influence any check
            rate_entries: self.rate_limiter.prune(Duration::hours(24)).await?,
            locks_and_blocks: self.repositories.locks().purge_expired(now).await?,
            attempts: self
                .repositories
                .login_attempts()
                .purge_before(now - attempt_retention)
                .await?,
            resolved_alerts: self.alerts.prune_resolved().await?,
            sessions: self.sessions.cleanup_expired().await?,
        };

        tracing::info!(
            rate_entries = stats.rate_entries,
            locks_and_blocks = stats.locks_and_blocks,
            attempts = stats.attempts,
            resolved_alerts = stats.resolved_alerts,
            sessions = stats.sessions,
            "Sweep pass completed"
        );

        Ok(stats)
    }

    /// Start the hourly background sweep task.
    ///
    /// Returns a `JoinHandle`; the task stops when the watch channel
    /// signals shutdown.
    pub fn start_sweeper_task(
        self: &Arc<Self>,
        mut shutdown: watch::Receiver<bool>,
    ) -> tokio::task::JoinHandle<()> {
        let engine = Arc::clone(self);

        tokio::spawn(async move {
            let mut interval_timer = tokio::time::interval(SWEEP_INTERVAL);

            loop {
                tokio::select! {
                    _ = interval_timer.tick() => {
                        if let Err(e) = engine.sweep().await {
                            tracing::warn!(error = %e, "Sweep pass failed");
                        }
                    }
                    _ = shutdown.changed() => {
                        tracing::info!("Shutting down sweeper task");
                        break;
                    }
                }
            }
        })
    }
}
