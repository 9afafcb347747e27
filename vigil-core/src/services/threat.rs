//! Volumetric threat response: DDoS detection and IP blocking.
//!
//! Blocking is advisory state for an edge or gateway to consult before
//! admitting a request; this engine never terminates connections itself.
//! Blocks expire lazily, like account locks.

use std::sync::Arc;

use chrono::Duration;

use crate::{
    Error,
    alert::{AlertKind, NewAlert, Severity},
    attempt::IpBlock,
    clock::Clock,
    config::SharedConfig,
    repositories::{AlertRepository, LockRepository, RateLimitRepository},
    services::AlertService,
};

pub struct ThreatService<RL, L, A>
where
    RL: RateLimitRepository,
    L: LockRepository,
    A: AlertRepository,
{
    rate_windows: Arc<RL>,
    locks: Arc<L>,
    alerts: Arc<AlertService<A>>,
    clock: Arc<dyn Clock>,
    config: SharedConfig,
}

impl<RL, L, A> ThreatService<RL, L, A>
where
    RL: RateLimitRepository,
    L: LockRepository,
    A: AlertRepository,
{
    pub fn new(
        rate_windows: Arc<RL>,
        locks: Arc<L>,
        alerts: Arc<AlertService<A>>,
        clock: Arc<dyn Clock>,
        config: SharedConfig,
    ) -> Self {
        Self {
            rate_windows,
            locks,
            alerts,
            clock,
            config,
        }
    }

    /// Check an IP's request volume against the DDoS threshold.
    ///
    /// Sums rate-window units attributable to the IP over the trailing
    /// detection window; past the threshold, raises a Critical alert and
    /// blocks the IP. Returns whether an attack was detected.
    pub async fn detect_ddos(&self, ip_address: &str) -> Result<bool, Error> {
        let threat = self.config.read().await.threat.clone();
        let now = self.clock.now();

        let volume = self
            .rate_windows
            .total_matching_since(ip_address, now - threat.ddos_window)
            .await?;

        if volume <= threat.ddos_request_threshold {
            return Ok(false);
        }

        tracing::warn!(
            ip = ip_address,
            volume = volume,
            threshold = threat.ddos_request_threshold,
            "DDoS-scale request volume detected"
        );
        self.alerts
            .try_raise(
                NewAlert::new(
                    AlertKind::SuspiciousActivity,
                    Severity::Critical,
                    format!("Possible DDoS attack from {ip_address}"),
                )
                .ip_address(ip_address)
                .detail("request_count", volume)
                .detail("threshold", threat.ddos_request_threshold),
            )
            .await;

        self.block_ip(ip_address, threat.ip_block_duration).await?;

        Ok(true)
    }

    /// Record an advisory block for an IP and raise a High alert.
    pub async fn block_ip(&self, ip_address: &str, duration: Duration) -> Result<IpBlock, Error> {
        let blocked_until = self.clock.now() + duration;
        let block = IpBlock {
            ip_address: ip_address.to_string(),
            blocked_until,
        };
        self.locks.upsert_block(block.clone()).await?;

        tracing::info!(ip = ip_address, blocked_until = %blocked_until, "IP blocked");
        self.alerts
            .try_raise(
                NewAlert::new(
                    AlertKind::SuspiciousActivity,
                    Severity::High,
                    format!("IP address blocked: {ip_address}"),
                )
                .ip_address(ip_address)
                .detail("blocked_until", blocked_until.to_rfc3339()),
            )
            .await;

        Ok(block)
    }

    /// Whether the IP is currently blocked. Expired blocks are deleted on
    /// the way out.
    pub async fn is_ip_blocked(&self, ip_address: &str) -> Result<bool, Error> {
        let now = self.clock.now();
        match self.locks.get_block(ip_address).await? {
            Some(block) if block.is_active(now) => Ok(true),
            Some(_) => {
                self.locks.delete_block(ip_address).await?;
                Ok(false)
            }
            None => Ok(false),
        }
    }

    /// Remove a block ahead of its expiry.
    pub async fn unblock_ip(&self, ip_address: &str) -> Result<(), Error> {
        self.locks.delete_block(ip_address).await
    }

    /// Number of blocks still in force.
    pub async fn active_block_count(&self) -> Result<usize, Error> {
        let now = self.clock.now();
        let blocks = self.locks.list_blocks().await?;
        Ok(blocks.iter().filter(|b| b.is_active(now)).count())
    }
}
