//! Repository trait for sliding-window rate limiting.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::Error;

/// One unit of admitted traffic for an identifier. Owned exclusively by the
/// rate limiter; entries older than the window are discarded before any
/// count is taken.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateWindowEntry {
    pub identifier: String,
    pub at: DateTime<Utc>,
    pub count: u32,
}

/// Storage for rate-window entries.
///
/// Identifiers are fully independent; implementations must serialize
/// concurrent updates per identifier but need no cross-identifier ordering.
#[async_trait]
pub trait RateLimitRepository: Send + Sync + 'static {
    /// Record one admitted unit for the identifier at the given instant.
    async fn record(&self, identifier: &str, at: DateTime<Utc>) -> Result<(), Error>;

    /// Count units for the identifier since the cutoff, discarding older
    /// entries as a side effect.
    async fn count_since(&self, identifier: &str, since: DateTime<Utc>) -> Result<u32, Error>;

    /// Sum units across every identifier containing the fragment since the
    /// cutoff. Used to attribute request volume to a source IP when
    /// identifiers embed it.
    async fn total_matching_since(
        &self,
        fragment: &str,
        since: DateTime<Utc>,
    ) -> Result<u32, Error>;

    /// Drop entries older than the cutoff across all identifiers. Returns
    /// the number of entries removed.
    async fn prune_before(&self, before: DateTime<Utc>) -> Result<u64, Error>;
}
