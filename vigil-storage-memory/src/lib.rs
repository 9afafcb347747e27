//! In-memory storage backend for the vigil security monitoring engine
//!
//! The reference [`RepositoryProvider`] implementation: every repository is
//! backed by process memory (`DashMap` shards for per-key state, a single
//! lock for the globally-ordered alert list and audit ring). State does not
//! survive a restart; backends with durable semantics implement the same
//! traits from `vigil-core`.

pub mod repositories;

use std::sync::Arc;

use async_trait::async_trait;
use vigil_core::{
    Error,
    repositories::{
        AlertRepositoryProvider, AuditRepositoryProvider, LockRepositoryProvider,
        LoginAttemptRepositoryProvider, RateLimitRepositoryProvider, RepositoryProvider,
        SessionRepositoryProvider, TwoFactorRepositoryProvider,
    },
};

pub use repositories::{
    MemoryAlertRepository, MemoryAuditRepository, MemoryLockRepository,
    MemoryLoginAttemptRepository, MemoryRateLimitRepository, MemorySessionRepository,
    MemoryTwoFactorRepository,
};

/// Provider bundling all in-memory repositories.
#[derive(Default)]
pub struct MemoryRepositoryProvider {
    rate_limit: Arc<MemoryRateLimitRepository>,
    login_attempts: Arc<MemoryLoginAttemptRepository>,
    locks: Arc<MemoryLockRepository>,
    two_factor: Arc<MemoryTwoFactorRepository>,
    sessions: Arc<MemorySessionRepository>,
    alerts: Arc<MemoryAlertRepository>,
    audit: Arc<MemoryAuditRepository>,
}

impl MemoryRepositoryProvider {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RateLimitRepositoryProvider for MemoryRepositoryProvider {
    type RateLimitRepo = MemoryRateLimitRepository;

    fn rate_limit(&self) -> Arc<Self::RateLimitRepo> {
        self.rate_limit.clone()
    }
}

impl LoginAttemptRepositoryProvider for MemoryRepositoryProvider {
    type LoginAttemptRepo = MemoryLoginAttemptRepository;

    fn login_attempts(&self) -> Arc<Self::LoginAttemptRepo> {
        self.login_attempts.clone()
    }
}

impl LockRepositoryProvider for MemoryRepositoryProvider {
    type LockRepo = MemoryLockRepository;

    fn locks(&self) -> Arc<Self::LockRepo> {
        self.locks.clone()
    }
}

impl TwoFactorRepositoryProvider for MemoryRepositoryProvider {
    type TwoFactorRepo = MemoryTwoFactorRepository;

    fn two_factor(&self) -> Arc<Self::TwoFactorRepo> {
        self.two_factor.clone()
    }
}

impl SessionRepositoryProvider for MemoryRepositoryProvider {
    type SessionRepo = MemorySessionRepository;

    fn sessions(&self) -> Arc<Self::SessionRepo> {
        self.sessions.clone()
    }
}

impl AlertRepositoryProvider for MemoryRepositoryProvider {
    type AlertRepo = MemoryAlertRepository;

    fn alerts(&self) -> Arc<Self::AlertRepo> {
        self.alerts.clone()
    }
}

impl AuditRepositoryProvider for MemoryRepositoryProvider {
    type AuditRepo = MemoryAuditRepository;

    fn audit(&self) -> Arc<Self::AuditRepo> {
        self.audit.clone()
    }
}

#[async_trait]
impl RepositoryProvider for MemoryRepositoryProvider {
    async fn health_check(&self) -> Result<(), Error> {
        Ok(())
    }
}
