//! Geolocation collaborator
//!
//! Resolving an IP to a coarse location string is an external concern. The
//! engine only consumes this trait; lookups are bounded by a short timeout
//! at the call site and degrade to "unknown location" on failure, so a slow
//! resolver can never block the login path.

use async_trait::async_trait;

/// Resolves an IP address to a human-readable location string.
#[async_trait]
pub trait GeoResolver: Send + Sync + 'static {
    /// Returns `None` when the location cannot be determined.
    async fn ip_to_location(&self, ip_address: &str) -> Option<String>;
}

/// Resolver that never knows where anything is. The default when the host
/// does not wire a real resolver.
#[derive(Debug, Clone, Default)]
pub struct UnknownGeoResolver;

#[async_trait]
impl GeoResolver for UnknownGeoResolver {
    async fn ip_to_location(&self, _ip_address: &str) -> Option<String> {
        None
    }
}

/// Fixed-table resolver for tests and demos.
#[derive(Debug, Clone, Default)]
pub struct StaticGeoResolver {
    entries: std::collections::HashMap<String, String>,
}

impl StaticGeoResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, ip_address: impl Into<String>, location: impl Into<String>) -> Self {
        self.entries.insert(ip_address.into(), location.into());
        self
    }
}

#[async_trait]
impl GeoResolver for StaticGeoResolver {
    async fn ip_to_location(&self, ip_address: &str) -> Option<String> {
        self.entries.get(ip_address).cloned()
    }
}
