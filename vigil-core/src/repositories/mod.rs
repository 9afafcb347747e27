//! Repository traits for the data access layer
//!
//! This module defines the repository interfaces that services use to
//! interact with storage. These traits provide a clean abstraction over the
//! underlying storage implementation.
//!
//! # Trait Hierarchy
//!
//! The repository system uses a composable trait hierarchy:
//!
//! - Individual `*Repository` traits define the operations for each data domain
//! - Individual `*RepositoryProvider` traits provide access to each repository type
//! - [`RepositoryProvider`] is a supertrait combining all provider traits plus
//!   a lifecycle health check
//!
//! Storage backends implement only the repositories they need and expose
//! them through the provider traits; accessors hand out `Arc` clones so the
//! facade can build services that stay generic over a single repository
//! trait (and therefore unit-testable with mocks).

pub mod alert;
pub mod audit;
pub mod lock;
pub mod login_attempt;
pub mod rate_limit;
pub mod session;
pub mod two_factor;

pub use alert::AlertRepository;
pub use audit::AuditRepository;
pub use lock::LockRepository;
pub use login_attempt::LoginAttemptRepository;
pub use rate_limit::{RateLimitRepository, RateWindowEntry};
pub use session::SessionRepository;
pub use two_factor::TwoFactorRepository;

use std::sync::Arc;

use async_trait::async_trait;

use crate::Error;

/// Provider trait for rate-limit repository access.
pub trait RateLimitRepositoryProvider: Send + Sync + 'static {
    type RateLimitRepo: RateLimitRepository;

    fn rate_limit(&self) -> Arc<Self::RateLimitRepo>;
}

/// Provider trait for login-attempt repository access.
pub trait LoginAttemptRepositoryProvider: Send + Sync + 'static {
    type LoginAttemptRepo: LoginAttemptRepository;

    fn login_attempts(&self) -> Arc<Self::LoginAttemptRepo>;
}

/// Provider trait for lock/block repository access.
pub trait LockRepositoryProvider: Send + Sync + 'static {
    type LockRepo: LockRepository;

    fn locks(&self) -> Arc<Self::LockRepo>;
}

/// Provider trait for two-factor repository access.
pub trait TwoFactorRepositoryProvider: Send + Sync + 'static {
    type TwoFactorRepo: TwoFactorRepository;

    fn two_factor(&self) -> Arc<Self::TwoFactorRepo>;
}

/// Provider trait for session repository access.
pub trait SessionRepositoryProvider: Send + Sync + 'static {
    type SessionRepo: SessionRepository;

    fn sessions(&self) -> Arc<Self::SessionRepo>;
}

/// Provider trait for alert repository access.
pub trait AlertRepositoryProvider: Send + Sync + 'static {
    type AlertRepo: AlertRepository;

    fn alerts(&self) -> Arc<Self::AlertRepo>;
}

/// Provider trait for audit repository access.
pub trait AuditRepositoryProvider: Send + Sync + 'static {
    type AuditRepo: AuditRepository;

    fn audit(&self) -> Arc<Self::AuditRepo>;
}

/// Provider trait that storage implementations must implement to supply all
/// repositories, plus a lifecycle health check.
#[async_trait]
pub trait RepositoryProvider:
    RateLimitRepositoryProvider
    + LoginAttemptRepositoryProvider
    + LockRepositoryProvider
    + TwoFactorRepositoryProvider
    + SessionRepositoryProvider
    + AlertRepositoryProvider
    + AuditRepositoryProvider
{
    /// Health check for all repositories.
    async fn health_check(&self) -> Result<(), Error>;
}
