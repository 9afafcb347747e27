//! Cryptographic utilities for secrets and verification codes
//!
//! This module provides secure secret generation and constant-time
//! verification for the two-factor subsystem and session tokens.
//!
//! # Security
//!
//! Code verification uses constant-time comparison via the `subtle` crate to
//! avoid measurable timing differences on mismatch. The time-boxed
//! verification code is a deterministic SHA-256 digest of the shared secret
//! and the current time bucket; it is a stand-in with the same shape as RFC
//! 6238 TOTP and can be swapped for an HMAC-based implementation without
//! touching the enrollment state machine.

use base64::{Engine, prelude::BASE64_URL_SAFE_NO_PAD};
use chrono::{DateTime, Utc};
use rand::{TryRngCore, rngs::OsRng};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

/// Width of a verification-code time bucket, in seconds.
pub const CODE_BUCKET_SECS: i64 = 30;

/// Number of decimal digits in a verification code.
const CODE_DIGITS: u32 = 6;

/// Generate a cryptographically secure random secret.
///
/// Produces a 256-bit (32-byte) random value encoded as URL-safe base64,
/// suitable for two-factor shared secrets and session tokens.
///
/// # Panics
///
/// Panics if the OS random number generator fails. This indicates a critical
/// system failure (e.g., /dev/urandom unavailable) from which recovery is
/// not possible for security-sensitive operations.
pub fn generate_secret() -> String {
    let mut bytes = [0u8; 32];
    OsRng
        .try_fill_bytes(&mut bytes)
        .expect("OS RNG failure - system entropy source unavailable");
    BASE64_URL_SAFE_NO_PAD.encode(bytes)
}

/// Generate a short alphanumeric backup code.
///
/// Backup codes are lower-entropy than the shared secret but single-use;
/// eight characters over a 32-symbol alphabet gives 40 bits.
pub fn generate_backup_code() -> String {
    const ALPHABET: &[u8] = b"abcdefghjkmnpqrstuvwxyz23456789";
    let mut bytes = [0u8; 8];
    OsRng
        .try_fill_bytes(&mut bytes)
        .expect("OS RNG failure - system entropy source unavailable");
    bytes
        .iter()
        .map(|b| ALPHABET[*b as usize % ALPHABET.len()] as char)
        .collect()
}

/// Hash a token for secure storage using SHA-256.
///
/// Deterministic, so the hash can be used for lookups. The input should have
/// at least 256 bits of entropy; low-entropy secrets need a password hash
/// instead.
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

/// Compute the time bucket a timestamp falls into.
pub fn time_bucket(at: DateTime<Utc>) -> i64 {
    at.timestamp().div_euclid(CODE_BUCKET_SECS)
}

/// Derive the verification code for a secret and time bucket.
///
/// The code is the first four digest bytes reduced to [`CODE_DIGITS`]
/// decimal digits, zero-padded.
pub fn code_for_bucket(secret: &str, bucket: i64) -> String {
    let mut hasher = Sha256::new();
    hasher.update(secret.as_bytes());
    hasher.update(bucket.to_be_bytes());
    let digest = hasher.finalize();

    let raw = u32::from_be_bytes([digest[0], digest[1], digest[2], digest[3]]);
    let modulus = 10u32.pow(CODE_DIGITS);
    format!("{:06}", raw % modulus)
}

/// Verify a candidate code against a secret at the given instant.
///
/// Accepts the current bucket and the immediately previous one, so a code
/// generated just before a bucket boundary still verifies.
pub fn verify_code(secret: &str, candidate: &str, at: DateTime<Utc>) -> bool {
    let bucket = time_bucket(at);
    [bucket, bucket - 1].iter().any(|b| {
        let expected = code_for_bucket(secret, *b);
        constant_time_compare(expected.as_bytes(), candidate.as_bytes())
    })
}

/// Perform constant-time comparison of two byte slices.
pub fn constant_time_compare(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_generate_secret_length_and_uniqueness() {
        let a = generate_secret();
        let b = generate_secret();
        assert_eq!(a.len(), 43); // 32 bytes base64 no-pad
        assert_ne!(a, b);
    }

    #[test]
    fn test_backup_code_shape() {
        let code = generate_backup_code();
        assert_eq!(code.len(), 8);
        assert!(code.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_hash_is_deterministic() {
        assert_eq!(hash_token("secret"), hash_token("secret"));
        assert_ne!(hash_token("secret"), hash_token("other"));
        assert_eq!(hash_token("secret").len(), 64);
    }

    #[test]
    fn test_code_is_stable_within_bucket() {
        let at = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 10).unwrap();
        let code = code_for_bucket("secret", time_bucket(at));
        assert_eq!(code.len(), 6);
        assert!(code.chars().all(|c| c.is_ascii_digit()));
        assert!(verify_code("secret", &code, at));
    }

    #[test]
    fn test_code_accepts_previous_bucket() {
        let before = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 29).unwrap();
        let after = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 31).unwrap();
        let code = code_for_bucket("secret", time_bucket(before));
        assert!(verify_code("secret", &code, after));
    }

    #[test]
    fn test_code_rejects_stale_bucket() {
        let at = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        let old = code_for_bucket("secret", time_bucket(at) - 2);
        assert!(!verify_code("secret", &old, at));
    }

    #[test]
    fn test_code_rejects_wrong_secret() {
        let at = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        let code = code_for_bucket("secret", time_bucket(at));
        assert!(!verify_code("other", &code, at));
    }

    #[test]
    fn test_constant_time_compare_length_mismatch() {
        assert!(!constant_time_compare(b"abc", b"abcd"));
        assert!(constant_time_compare(b"abc", b"abc"));
    }
}
