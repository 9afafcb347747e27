//! Two-factor enrollment and verification service.
//!
//! Enrollment: `setup` generates the shared secret and backup codes and
//! leaves the record pending; `enable` flips it on after one correct
//! time-boxed code; `disable` requires a live code or an unused backup code
//! and fails closed otherwise. Code delivery (SMS/email/app) is the host's
//! concern; this service only generates and verifies.

use std::sync::Arc;

use crate::{
    Error,
    clock::Clock,
    crypto::{self, CODE_BUCKET_SECS},
    principal::PrincipalId,
    repositories::TwoFactorRepository,
    two_factor::{TwoFactorEnrollment, TwoFactorSetup, TwoFactorStatus},
};

/// Number of single-use backup codes issued at setup.
const BACKUP_CODE_COUNT: usize = 10;

pub struct TwoFactorService<R: TwoFactorRepository> {
    repository: Arc<R>,
    clock: Arc<dyn Clock>,
    issuer: String,
}

impl<R: TwoFactorRepository> TwoFactorService<R> {
    pub fn new(repository: Arc<R>, clock: Arc<dyn Clock>, issuer: impl Into<String>) -> Self {
        Self {
            repository,
            clock,
            issuer: issuer.into(),
        }
    }

    /// Begin enrollment: generate a secret and backup codes, store the
    /// pending record, and return the provisioning material.
    ///
    /// Calling setup again before enabling replaces the pending secret.
    /// Setup is rejected once the enrollment is enabled; disable first.
    pub async fn setup(&self, principal_id: &PrincipalId) -> Result<TwoFactorSetup, Error> {
        if let Some(existing) = self.repository.get(principal_id).await? {
            if existing.enabled {
                return Err(crate::error::TwoFactorError::AlreadyEnabled.into());
            }
        }

        let secret = crypto::generate_secret();
        let backup_codes: Vec<String> = (0..BACKUP_CODE_COUNT)
            .map(|_| crypto::generate_backup_code())
            .collect();

        self.repository
            .upsert(TwoFactorEnrollment {
                principal_id: principal_id.clone(),
                secret: secret.clone(),
                backup_codes: backup_codes.clone(),
                enabled: false,
            })
            .await?;

        tracing::info!(principal = %principal_id, "Two-factor setup started");

        let provisioning_uri = format!(
            "otpauth://totp/{issuer}:{principal_id}?secret={secret}&issuer={issuer}&period={CODE_BUCKET_SECS}",
            issuer = self.issuer,
        );

        Ok(TwoFactorSetup {
            secret,
            backup_codes,
            provisioning_uri,
        })
    }

    /// Complete enrollment with a verification code.
    ///
    /// Returns `true` when the code verifies (or the enrollment is already
    /// enabled), `false` on a wrong code or missing enrollment; the record
    /// stays pending on failure.
    pub async fn enable(&self, principal_id: &PrincipalId, code: &str) -> Result<bool, Error> {
        let Some(mut enrollment) = self.repository.get(principal_id).await? else {
            return Ok(false);
        };

        if enrollment.enabled {
            return Ok(true);
        }

        if !crypto::verify_code(&enrollment.secret, code, self.clock.now()) {
            return Ok(false);
        }

        enrollment.enabled = true;
        self.repository.upsert(enrollment).await?;
        tracing::info!(principal = %principal_id, "Two-factor enabled");
        Ok(true)
    }

    /// Disable two-factor with a live code or an unused backup code.
    ///
    /// Fails closed: without a valid credential this returns `false` and
    /// changes nothing. A backup code is consumed even though the record is
    /// removed afterwards, so replaying it against a future enrollment
    /// cannot succeed. Disabling tears the enrollment down entirely.
    pub async fn disable(&self, principal_id: &PrincipalId, credential: &str) -> Result<bool, Error> {
        let Some(mut enrollment) = self.repository.get(principal_id).await? else {
            return Ok(false);
        };

        if !enrollment.enabled {
            return Ok(false);
        }

        let live_code_ok = crypto::verify_code(&enrollment.secret, credential, self.clock.now());
        let backup_ok = !live_code_ok && enrollment.consume_backup_code(credential);

        if !live_code_ok && !backup_ok {
            return Ok(false);
        }

        self.repository.delete(principal_id).await?;
        tracing::info!(
            principal = %principal_id,
            used_backup_code = backup_ok,
            "Two-factor disabled"
        );
        Ok(true)
    }

    /// Verify a live code against an enabled enrollment, e.g. at login.
    pub async fn verify(&self, principal_id: &PrincipalId, code: &str) -> Result<bool, Error> {
        let Some(enrollment) = self.repository.get(principal_id).await? else {
            return Ok(false);
        };
        if !enrollment.enabled {
            return Ok(false);
        }
        Ok(crypto::verify_code(&enrollment.secret, code, self.clock.now()))
    }

    /// Where the principal stands in the enrollment state machine.
    pub async fn status(&self, principal_id: &PrincipalId) -> Result<TwoFactorStatus, Error> {
        Ok(self
            .repository
            .get(principal_id)
            .await?
            .map(|e| e.status())
            .unwrap_or(TwoFactorStatus::NotEnrolled))
    }
}
