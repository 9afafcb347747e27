//! Repository trait for two-factor enrollment state.

use async_trait::async_trait;

use crate::{Error, principal::PrincipalId, two_factor::TwoFactorEnrollment};

#[async_trait]
pub trait TwoFactorRepository: Send + Sync + 'static {
    /// Create or replace the enrollment for a principal.
    async fn upsert(&self, enrollment: TwoFactorEnrollment) -> Result<(), Error>;

    /// The enrollment for a principal, if any.
    async fn get(&self, principal_id: &PrincipalId) -> Result<Option<TwoFactorEnrollment>, Error>;

    /// Remove the enrollment for a principal. Disabling tears the record
    /// down entirely; re-enrollment starts from a fresh secret.
    async fn delete(&self, principal_id: &PrincipalId) -> Result<(), Error>;
}
