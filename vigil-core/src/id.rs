//! ID generation utilities with prefix support
//!
//! Alerts, audit records, and login attempts all carry unique ids generated
//! here. IDs are prefixed (`alrt_`, `aud_`, `att_`), carry at least 96 bits
//! of entropy, and are URL-safe.

use base64::{Engine, prelude::BASE64_URL_SAFE_NO_PAD};
use rand::{TryRngCore, rngs::OsRng};

/// Generate a prefixed ID with at least 96 bits of entropy
///
/// The ID format is: `{prefix}_{random_string}`
/// Where the random string is base64 URL-safe encoded without padding.
pub fn generate_prefixed_id(prefix: &str) -> String {
    // 12 bytes (96 bits) of random data
    let mut bytes = [0u8; 12];
    OsRng
        .try_fill_bytes(&mut bytes)
        .expect("OS RNG failure - system entropy source unavailable");

    let encoded = BASE64_URL_SAFE_NO_PAD.encode(bytes);

    format!("{prefix}_{encoded}")
}

/// Validate that a prefixed ID has the expected format
pub fn validate_prefixed_id(id: &str, expected_prefix: &str) -> bool {
    if !id.starts_with(&format!("{expected_prefix}_")) {
        return false;
    }

    let random_part = &id[expected_prefix.len() + 1..];

    match BASE64_URL_SAFE_NO_PAD.decode(random_part) {
        Ok(decoded) => decoded.len() >= 12,
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_prefixed_id() {
        let id = generate_prefixed_id("alrt");
        assert!(id.starts_with("alrt_"));
        assert!(id.len() > 5);

        // Ensure uniqueness
        let id2 = generate_prefixed_id("alrt");
        assert_ne!(id, id2);
    }

    #[test]
    fn test_validate_prefixed_id() {
        let id = generate_prefixed_id("aud");
        assert!(validate_prefixed_id(&id, "aud"));
        assert!(!validate_prefixed_id(&id, "alrt"));

        assert!(!validate_prefixed_id("aud", "aud"));
        assert!(!validate_prefixed_id("aud_", "aud"));
        assert!(!validate_prefixed_id("aud_invalid!", "aud"));
    }

    #[test]
    fn test_id_is_url_safe() {
        let id = generate_prefixed_id("att");
        assert!(
            id.chars()
                .all(|c| c.is_alphanumeric() || c == '_' || c == '-')
        );
    }
}
