//! Sliding-window rate limiter service.
//!
//! Counts admitted units per identifier within a trailing window,
//! recomputed on every query. A denial emits exactly one
//! `rate_limit_exceeded` alert and returns `false`; what "deny" means
//! (HTTP 429, drop) is the caller's decision. Identifiers are fully
//! independent.

use std::sync::Arc;

use chrono::Duration;

use crate::{
    Error,
    alert::{AlertKind, NewAlert, Severity},
    clock::Clock,
    repositories::{AlertRepository, RateLimitRepository},
    services::AlertService,
};

pub struct RateLimitService<R: RateLimitRepository, A: AlertRepository> {
    repository: Arc<R>,
    alerts: Arc<AlertService<A>>,
    clock: Arc<dyn Clock>,
}

impl<R: RateLimitRepository, A: AlertRepository> RateLimitService<R, A> {
    pub fn new(repository: Arc<R>, alerts: Arc<AlertService<A>>, clock: Arc<dyn Clock>) -> Self {
        Self {
            repository,
            alerts,
            clock,
        }
    }

    /// Admit or deny one unit for the identifier.
    ///
    /// Prunes entries older than `now - window`, sums what remains, and if
    /// the sum is below `max_requests` records one more unit and returns
    /// `true`. Otherwise raises a Medium `rate_limit_exceeded` alert with
    /// the identifier, current count, and limit, and returns `false`.
    pub async fn allow(
        &self,
        identifier: &str,
        window: Duration,
        max_requests: u32,
    ) -> Result<bool, Error> {
        let now = self.clock.now();
        let count = self.repository.count_since(identifier, now - window).await?;

        if count < max_requests {
            self.repository.record(identifier, now).await?;
            return Ok(true);
        }

        tracing::info!(
            identifier = identifier,
            count = count,
            limit = max_requests,
            "Rate limit exceeded"
        );
        self.alerts
            .try_raise(
                NewAlert::new(
                    AlertKind::RateLimitExceeded,
                    Severity::Medium,
                    format!("Rate limit exceeded for {identifier}"),
                )
                .detail("identifier", identifier)
                .detail("count", count)
                .detail("limit", max_requests),
            )
            .await;

        Ok(false)
    }

    /// Current unit count for an identifier within the window. Read-only
    /// helper for operator display.
    pub async fn current_usage(&self, identifier: &str, window: Duration) -> Result<u32, Error> {
        let now = self.clock.now();
        self.repository.count_since(identifier, now - window).await
    }

    /// Total request volume attributable to an IP within the window,
    /// summed across every identifier embedding it.
    pub async fn ip_request_volume(&self, ip_address: &str, window: Duration) -> Result<u32, Error> {
        let now = self.clock.now();
        self.repository
            .total_matching_since(ip_address, now - window)
            .await
    }

    /// Drop window entries older than the cutoff. Called by the periodic
    /// sweep.
    pub async fn prune(&self, older_than: Duration) -> Result<u64, Error> {
        let before = self.clock.now() - older_than;
        self.repository.prune_before(before).await
    }
}
