//! Builder for constructing [`Vigil`] instances
//!
//! The builder uses a type-state pattern so storage must be configured
//! before `build` exists to call: [`NoStorage`] is the initial state and
//! [`WithStorage`] carries the chosen repository provider.
//!
//! # Example
//!
//! ```rust,no_run
//! use vigil::VigilBuilder;
//! use vigil_core::SecurityConfig;
//!
//! let vigil = VigilBuilder::new()
//!     .with_memory()
//!     .with_config(SecurityConfig::default())
//!     .build();
//! ```

use std::sync::Arc;

use vigil_core::{
    Clock, GeoResolver, SecurityConfig, SystemClock, geo::UnknownGeoResolver,
    repositories::RepositoryProvider,
};

use crate::Vigil;

#[cfg(feature = "memory")]
use vigil_storage_memory::MemoryRepositoryProvider;

/// Marker type indicating no storage has been configured yet.
pub struct NoStorage;

/// Marker type indicating storage has been configured.
pub struct WithStorage<R: RepositoryProvider> {
    repositories: Arc<R>,
}

/// A type-safe builder for [`Vigil`] instances.
pub struct VigilBuilder<Storage> {
    storage: Storage,
    config: SecurityConfig,
    clock: Arc<dyn Clock>,
    geo: Arc<dyn GeoResolver>,
}

impl VigilBuilder<NoStorage> {
    pub fn new() -> Self {
        Self {
            storage: NoStorage,
            config: SecurityConfig::default(),
            clock: Arc::new(SystemClock),
            geo: Arc::new(UnknownGeoResolver),
        }
    }

    /// Use an explicit repository provider.
    pub fn with_repositories<R: RepositoryProvider>(
        self,
        repositories: Arc<R>,
    ) -> VigilBuilder<WithStorage<R>> {
        VigilBuilder {
            storage: WithStorage { repositories },
            config: self.config,
            clock: self.clock,
            geo: self.geo,
        }
    }

    /// Use the in-memory storage backend.
    #[cfg(feature = "memory")]
    pub fn with_memory(self) -> VigilBuilder<WithStorage<MemoryRepositoryProvider>> {
        self.with_repositories(Arc::new(MemoryRepositoryProvider::new()))
    }
}

impl Default for VigilBuilder<NoStorage> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Storage> VigilBuilder<Storage> {
    /// Start from a non-default configuration.
    pub fn with_config(mut self, config: SecurityConfig) -> Self {
        self.config = config;
        self
    }

    /// Inject a clock. Tests use a manually-advanced one.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Inject a geolocation resolver for new-location detection.
    pub fn with_geo_resolver(mut self, geo: Arc<dyn GeoResolver>) -> Self {
        self.geo = geo;
        self
    }
}

impl<R: RepositoryProvider> VigilBuilder<WithStorage<R>> {
    /// Construct the engine.
    pub fn build(self) -> Vigil<R> {
        Vigil::new(
            self.storage.repositories,
            self.config,
            self.clock,
            self.geo,
        )
    }
}
