//! Login attempt ledger and account lockout service.
//!
//! Appends every attempt to the per-email ledger and derives lockout state
//! from the failures within the detection window. A successful login does
//! NOT reset the failure count; a user who fails four times, succeeds once,
//! then fails again within the window still locks. Locks expire lazily:
//! `is_locked` treats a past-expiry lock as absent and deletes it.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::{
    Error,
    alert::{AlertKind, NewAlert, Severity},
    attempt::{AccountLock, LoginAttempt},
    clock::Clock,
    config::SharedConfig,
    geo::GeoResolver,
    repositories::{AlertRepository, LockRepository, LoginAttemptRepository},
    services::AlertService,
};

/// Upper bound on a geolocation lookup before the login path proceeds
/// without a location.
const GEO_LOOKUP_TIMEOUT: std::time::Duration = std::time::Duration::from_millis(500);

/// Current lockout state for an email, derived at read time.
#[derive(Debug, Clone)]
pub struct LockoutStatus {
    pub email: String,
    pub failed_attempts: u32,
    pub is_locked: bool,
    pub locked_until: Option<DateTime<Utc>>,
}

/// Caller-supplied fields of a login attempt; the service assigns id,
/// timestamp, and (when enabled) a resolved location.
#[derive(Debug, Clone)]
pub struct AttemptInput {
    pub email: String,
    pub ip_address: String,
    pub user_agent: Option<String>,
    pub success: bool,
    pub location: Option<String>,
    pub device_fingerprint: Option<String>,
    pub two_factor_used: bool,
    pub failure_reason: Option<String>,
}

pub struct LoginLedgerService<LA, L, A>
where
    LA: LoginAttemptRepository,
    L: LockRepository,
    A: AlertRepository,
{
    attempts: Arc<LA>,
    locks: Arc<L>,
    alerts: Arc<AlertService<A>>,
    geo: Arc<dyn GeoResolver>,
    clock: Arc<dyn Clock>,
    config: SharedConfig,
}

impl<LA, L, A> LoginLedgerService<LA, L, A>
where
    LA: LoginAttemptRepository,
    L: LockRepository,
    A: AlertRepository,
{
    pub fn new(
        attempts: Arc<LA>,
        locks: Arc<L>,
        alerts: Arc<AlertService<A>>,
        geo: Arc<dyn GeoResolver>,
        clock: Arc<dyn Clock>,
        config: SharedConfig,
    ) -> Self {
        Self {
            attempts,
            locks,
            alerts,
            geo,
            clock,
            config,
        }
    }

    /// Record a login attempt and return it together with the updated
    /// lockout status for the email.
    pub async fn record(&self, input: AttemptInput) -> Result<(LoginAttempt, LockoutStatus), Error> {
        let now = self.clock.now();
        let threat = self.config.read().await.threat.clone();

        let location = match input.location {
            Some(location) => Some(location),
            None if threat.geolocation_enabled => self.resolve_location(&input.ip_address).await,
            None => None,
        };

        let attempt = LoginAttempt::builder()
            .email(input.email.clone())
            .ip_address(input.ip_address.clone())
            .user_agent(input.user_agent)
            .success(input.success)
            .at(now)
            .location(location)
            .device_fingerprint(input.device_fingerprint)
            .two_factor_used(input.two_factor_used)
            .failure_reason(input.failure_reason)
            .build()?;

        let attempt = self.attempts.append(attempt).await?;

        if attempt.success {
            let status = self.lockout_status(&attempt.email).await?;
            return Ok((attempt, status));
        }

        let failed = self
            .attempts
            .failed_count(&attempt.email, now - threat.detection_window)
            .await?;

        if failed >= threat.max_failed_attempts {
            let locked_until = now + threat.lockout_duration;
            self.locks
                .upsert_lock(AccountLock {
                    email: attempt.email.clone(),
                    locked_until,
                })
                .await?;

            tracing::info!(
                email = %attempt.email,
                failed_attempts = failed,
                locked_until = %locked_until,
                "Account locked after repeated failed logins"
            );
            self.alerts
                .try_raise(
                    NewAlert::new(
                        AlertKind::LoginFailed,
                        Severity::High,
                        format!("Account locked: {}", attempt.email),
                    )
                    .principal(attempt.email.as_str())
                    .ip_address(attempt.ip_address.clone())
                    .detail("failed_attempts", failed)
                    .detail("locked_until", locked_until.to_rfc3339()),
                )
                .await;

            return Ok((
                attempt.clone(),
                LockoutStatus {
                    email: attempt.email.clone(),
                    failed_attempts: failed,
                    is_locked: true,
                    locked_until: Some(locked_until),
                },
            ));
        }

        Ok((
            attempt.clone(),
            LockoutStatus {
                email: attempt.email.clone(),
                failed_attempts: failed,
                is_locked: false,
                locked_until: None,
            },
        ))
    }

    /// Whether the email is currently locked. Expired locks are deleted on
    /// the way out.
    pub async fn is_locked(&self, email: &str) -> Result<bool, Error> {
        let now = self.clock.now();
        match self.locks.get_lock(email).await? {
            Some(lock) if lock.is_active(now) => Ok(true),
            Some(_) => {
                self.locks.delete_lock(email).await?;
                Ok(false)
            }
            None => Ok(false),
        }
    }

    /// Derived lockout status for an email.
    pub async fn lockout_status(&self, email: &str) -> Result<LockoutStatus, Error> {
        let now = self.clock.now();
        let window = self.config.read().await.threat.detection_window;
        let failed = self.attempts.failed_count(email, now - window).await?;

        let lock = self.locks.get_lock(email).await?;
        let (is_locked, locked_until) = match lock {
            Some(lock) if lock.is_active(now) => (true, Some(lock.locked_until)),
            _ => (false, None),
        };

        Ok(LockoutStatus {
            email: email.to_string(),
            failed_attempts: failed,
            is_locked,
            locked_until,
        })
    }

    /// Administrative unlock: clears the lock and the failure history.
    /// Returns whether the account was locked.
    pub async fn unlock(&self, email: &str) -> Result<bool, Error> {
        let was_locked = self.is_locked(email).await?;
        self.locks.delete_lock(email).await?;
        self.attempts.clear(email).await?;
        if was_locked {
            tracing::info!(email = email, "Account unlocked by administrative action");
        }
        Ok(was_locked)
    }

    /// Attempt history for an email within the window, oldest first.
    pub async fn history(
        &self,
        email: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<LoginAttempt>, Error> {
        self.attempts.history(email, since).await
    }

    async fn resolve_location(&self, ip_address: &str) -> Option<String> {
        match tokio::time::timeout(GEO_LOOKUP_TIMEOUT, self.geo.ip_to_location(ip_address)).await {
            Ok(location) => location,
            Err(_) => {
                tracing::warn!(ip = ip_address, "Geolocation lookup timed out");
                None
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::{
        attempt::IpBlock,
        clock::ManualClock,
        geo::{StaticGeoResolver, UnknownGeoResolver},
        services::alert::tests::{MockAlertRepository, shared_config},
    };
    use async_trait::async_trait;
    use chrono::Duration;
    use std::sync::Mutex;

    /// Mock repositories for testing, shared with the other service tests.
    pub(crate) struct MockAttemptRepository {
        pub attempts: Mutex<Vec<LoginAttempt>>,
    }

    impl MockAttemptRepository {
        pub fn new() -> Self {
            Self {
                attempts: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl LoginAttemptRepository for MockAttemptRepository {
        async fn append(&self, attempt: LoginAttempt) -> Result<LoginAttempt, Error> {
            self.attempts.lock().unwrap().push(attempt.clone());
            Ok(attempt)
        }

        async fn history(
            &self,
            email: &str,
            since: DateTime<Utc>,
        ) -> Result<Vec<LoginAttempt>, Error> {
            Ok(self
                .attempts
                .lock()
                .unwrap()
                .iter()
                .filter(|a| a.email == email && a.at >= since)
                .cloned()
                .collect())
        }

        async fn failed_count(&self, email: &str, since: DateTime<Utc>) -> Result<u32, Error> {
            Ok(self
                .attempts
                .lock()
                .unwrap()
                .iter()
                .filter(|a| a.email == email && !a.success && a.at >= since)
                .count() as u32)
        }

        async fn recent_all(&self, since: DateTime<Utc>) -> Result<Vec<LoginAttempt>, Error> {
            Ok(self
                .attempts
                .lock()
                .unwrap()
                .iter()
                .filter(|a| a.at >= since)
                .cloned()
                .collect())
        }

        async fn clear(&self, email: &str) -> Result<u64, Error> {
            let mut attempts = self.attempts.lock().unwrap();
            let len = attempts.len();
            attempts.retain(|a| a.email != email);
            Ok((len - attempts.len()) as u64)
        }

        async fn purge_before(&self, before: DateTime<Utc>) -> Result<u64, Error> {
            let mut attempts = self.attempts.lock().unwrap();
            let len = attempts.len();
            attempts.retain(|a| a.at >= before);
            Ok((len - attempts.len()) as u64)
        }
    }

    pub(crate) struct MockLockRepository {
        pub locks: Mutex<Vec<AccountLock>>,
        pub blocks: Mutex<Vec<IpBlock>>,
    }

    impl MockLockRepository {
        pub fn new() -> Self {
            Self {
                locks: Mutex::new(Vec::new()),
                blocks: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl LockRepository for MockLockRepository {
        async fn upsert_lock(&self, lock: AccountLock) -> Result<(), Error> {
            let mut locks = self.locks.lock().unwrap();
            locks.retain(|l| l.email != lock.email);
            locks.push(lock);
            Ok(())
        }

        async fn get_lock(&self, email: &str) -> Result<Option<AccountLock>, Error> {
            Ok(self
                .locks
                .lock()
                .unwrap()
                .iter()
                .find(|l| l.email == email)
                .cloned())
        }

        async fn delete_lock(&self, email: &str) -> Result<(), Error> {
            self.locks.lock().unwrap().retain(|l| l.email != email);
            Ok(())
        }

        async fn upsert_block(&self, block: IpBlock) -> Result<(), Error> {
            let mut blocks = self.blocks.lock().unwrap();
            blocks.retain(|b| b.ip_address != block.ip_address);
            blocks.push(block);
            Ok(())
        }

        async fn get_block(&self, ip_address: &str) -> Result<Option<IpBlock>, Error> {
            Ok(self
                .blocks
                .lock()
                .unwrap()
                .iter()
                .find(|b| b.ip_address == ip_address)
                .cloned())
        }

        async fn delete_block(&self, ip_address: &str) -> Result<(), Error> {
            self.blocks
                .lock()
                .unwrap()
                .retain(|b| b.ip_address != ip_address);
            Ok(())
        }

        async fn list_blocks(&self) -> Result<Vec<IpBlock>, Error> {
            Ok(self.blocks.lock().unwrap().clone())
        }

        async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, Error> {
            let mut removed = 0;
            {
                let mut locks = self.locks.lock().unwrap();
                let len = locks.len();
                locks.retain(|l| l.is_active(now));
                removed += (len - locks.len()) as u64;
            }
            {
                let mut blocks = self.blocks.lock().unwrap();
                let len = blocks.len();
                blocks.retain(|b| b.is_active(now));
                removed += (len - blocks.len()) as u64;
            }
            Ok(removed)
        }
    }

    pub(crate) fn failed_input(email: &str, ip: &str) -> AttemptInput {
        AttemptInput {
            email: email.to_string(),
            ip_address: ip.to_string(),
            user_agent: Some("test-agent".to_string()),
            success: false,
            location: None,
            device_fingerprint: None,
            two_factor_used: false,
            failure_reason: Some("bad password".to_string()),
        }
    }

    fn ledger(
        attempts: Arc<MockAttemptRepository>,
        locks: Arc<MockLockRepository>,
        alert_repo: Arc<MockAlertRepository>,
        clock: Arc<ManualClock>,
    ) -> LoginLedgerService<MockAttemptRepository, MockLockRepository, MockAlertRepository> {
        let config = shared_config();
        let alerts = Arc::new(AlertService::new(alert_repo, clock.clone(), config.clone()));
        LoginLedgerService::new(
            attempts,
            locks,
            alerts,
            Arc::new(UnknownGeoResolver),
            clock,
            config,
        )
    }

    #[tokio::test]
    async fn test_lockout_after_max_failed_attempts() {
        let attempts = Arc::new(MockAttemptRepository::new());
        let locks = Arc::new(MockLockRepository::new());
        let alert_repo = Arc::new(MockAlertRepository::new());
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let ledger = ledger(attempts, locks, alert_repo.clone(), clock);

        for i in 0..4 {
            let (_, status) = ledger.record(failed_input("a@x.com", "1.2.3.4")).await.unwrap();
            assert!(!status.is_locked, "attempt {i} should not lock");
        }

        let (_, status) = ledger.record(failed_input("a@x.com", "1.2.3.4")).await.unwrap();
        assert!(status.is_locked);
        assert_eq!(status.failed_attempts, 5);
        assert!(ledger.is_locked("a@x.com").await.unwrap());

        // Exactly one high alert
        let alerts = alert_repo.alerts.lock().unwrap();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].severity, Severity::High);
    }

    #[tokio::test]
    async fn test_lock_expires_lazily() {
        let attempts = Arc::new(MockAttemptRepository::new());
        let locks = Arc::new(MockLockRepository::new());
        let alert_repo = Arc::new(MockAlertRepository::new());
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let ledger = ledger(attempts, locks.clone(), alert_repo, clock.clone());

        for _ in 0..5 {
            ledger.record(failed_input("a@x.com", "1.2.3.4")).await.unwrap();
        }
        assert!(ledger.is_locked("a@x.com").await.unwrap());

        clock.advance(Duration::minutes(31));
        assert!(!ledger.is_locked("a@x.com").await.unwrap());
        // Expired lock was deleted
        assert!(locks.locks.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_success_does_not_reset_failure_streak() {
        let attempts = Arc::new(MockAttemptRepository::new());
        let locks = Arc::new(MockLockRepository::new());
        let alert_repo = Arc::new(MockAlertRepository::new());
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let ledger = ledger(attempts, locks, alert_repo, clock);

        for _ in 0..4 {
            ledger.record(failed_input("a@x.com", "1.2.3.4")).await.unwrap();
        }

        let mut success = failed_input("a@x.com", "1.2.3.4");
        success.success = true;
        success.failure_reason = None;
        let (_, status) = ledger.record(success).await.unwrap();
        assert!(!status.is_locked);

        // One more failure still locks: the success did not clear the streak
        let (_, status) = ledger.record(failed_input("a@x.com", "1.2.3.4")).await.unwrap();
        assert!(status.is_locked);
    }

    #[tokio::test]
    async fn test_unlock_clears_lock_and_history() {
        let attempts = Arc::new(MockAttemptRepository::new());
        let locks = Arc::new(MockLockRepository::new());
        let alert_repo = Arc::new(MockAlertRepository::new());
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let ledger = ledger(attempts.clone(), locks, alert_repo, clock);

        for _ in 0..5 {
            ledger.record(failed_input("a@x.com", "1.2.3.4")).await.unwrap();
        }
        assert!(ledger.unlock("a@x.com").await.unwrap());
        assert!(!ledger.is_locked("a@x.com").await.unwrap());
        assert!(attempts.attempts.lock().unwrap().is_empty());

        // Unlocking an unlocked account reports false
        assert!(!ledger.unlock("a@x.com").await.unwrap());
    }

    #[tokio::test]
    async fn test_emails_tracked_separately() {
        let attempts = Arc::new(MockAttemptRepository::new());
        let locks = Arc::new(MockLockRepository::new());
        let alert_repo = Arc::new(MockAlertRepository::new());
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let ledger = ledger(attempts, locks, alert_repo, clock);

        for _ in 0..5 {
            ledger.record(failed_input("a@x.com", "1.2.3.4")).await.unwrap();
        }
        assert!(ledger.is_locked("a@x.com").await.unwrap());
        assert!(!ledger.is_locked("b@x.com").await.unwrap());
    }

    #[tokio::test]
    async fn test_location_resolved_when_absent() {
        let attempts = Arc::new(MockAttemptRepository::new());
        let locks = Arc::new(MockLockRepository::new());
        let alert_repo = Arc::new(MockAlertRepository::new());
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let config = shared_config();
        let alerts = Arc::new(AlertService::new(alert_repo, clock.clone(), config.clone()));
        let ledger = LoginLedgerService::new(
            attempts.clone(),
            locks,
            alerts,
            Arc::new(StaticGeoResolver::new().with("1.2.3.4", "Berlin, DE")),
            clock,
            config,
        );

        ledger.record(failed_input("a@x.com", "1.2.3.4")).await.unwrap();
        let stored = attempts.attempts.lock().unwrap();
        assert_eq!(stored[0].location.as_deref(), Some("Berlin, DE"));
    }
}
