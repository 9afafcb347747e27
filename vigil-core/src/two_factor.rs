//! Two-factor enrollment state
//!
//! Enrollment moves through `NotEnrolled → PendingSetup → Enabled`;
//! disabling removes the enrollment entirely, so re-enabling requires a
//! fresh setup with a new secret. Backup codes are single-use: a code
//! consumed to disable the enrollment is removed and can never be used
//! again.

use serde::{Deserialize, Serialize};

use crate::principal::PrincipalId;

/// Where a principal stands in the enrollment state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TwoFactorStatus {
    NotEnrolled,
    PendingSetup,
    Enabled,
}

/// A principal's two-factor enrollment record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TwoFactorEnrollment {
    pub principal_id: PrincipalId,
    pub secret: String,
    pub backup_codes: Vec<String>,
    pub enabled: bool,
}

impl TwoFactorEnrollment {
    pub fn status(&self) -> TwoFactorStatus {
        if self.enabled {
            TwoFactorStatus::Enabled
        } else {
            TwoFactorStatus::PendingSetup
        }
    }

    /// Consume a backup code if present. Returns whether the code was valid.
    pub fn consume_backup_code(&mut self, code: &str) -> bool {
        if let Some(pos) = self.backup_codes.iter().position(|c| c == code) {
            self.backup_codes.remove(pos);
            true
        } else {
            false
        }
    }
}

/// The material handed back to the caller after setup: the shared secret,
/// single-use backup codes, and an otpauth-style provisioning payload for
/// QR display. The delivery channel is the host's concern.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TwoFactorSetup {
    pub secret: String,
    pub backup_codes: Vec<String>,
    pub provisioning_uri: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn enrollment() -> TwoFactorEnrollment {
        TwoFactorEnrollment {
            principal_id: PrincipalId::new("usr_1"),
            secret: "secret".to_string(),
            backup_codes: vec!["alpha111".to_string(), "beta2222".to_string()],
            enabled: false,
        }
    }

    #[test]
    fn test_status_follows_enabled_flag() {
        let mut e = enrollment();
        assert_eq!(e.status(), TwoFactorStatus::PendingSetup);
        e.enabled = true;
        assert_eq!(e.status(), TwoFactorStatus::Enabled);
    }

    #[test]
    fn test_backup_code_consumed_once() {
        let mut e = enrollment();
        assert!(e.consume_backup_code("alpha111"));
        assert_eq!(e.backup_codes.len(), 1);
        // Same code again must fail
        assert!(!e.consume_backup_code("alpha111"));
        assert!(e.consume_backup_code("beta2222"));
        assert!(e.backup_codes.is_empty());
    }

    #[test]
    fn test_unknown_backup_code_rejected() {
        let mut e = enrollment();
        assert!(!e.consume_backup_code("nope0000"));
        assert_eq!(e.backup_codes.len(), 2);
    }
}
