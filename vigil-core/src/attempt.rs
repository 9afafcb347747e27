//! Login attempts and the expiring deny-state derived from them
//!
//! A [`LoginAttempt`] is immutable once recorded and appended to a per-email
//! chronological sequence. [`AccountLock`] and [`IpBlock`] share the same
//! lazy-expiry pattern: a lock is active iff `now < locked_until`, and
//! expired entries are treated as absent wherever they are read.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    Error,
    error::ValidationError,
    id::generate_prefixed_id,
};

/// Unique identifier for a recorded login attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub struct AttemptId(String);

impl AttemptId {
    pub fn new(id: &str) -> Self {
        AttemptId(id.to_string())
    }

    pub fn new_random() -> Self {
        AttemptId(generate_prefixed_id("att"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for AttemptId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A single recorded login attempt. Immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginAttempt {
    pub id: AttemptId,
    pub email: String,
    pub ip_address: String,
    pub user_agent: Option<String>,
    pub success: bool,
    pub at: DateTime<Utc>,
    pub location: Option<String>,
    pub device_fingerprint: Option<String>,
    pub two_factor_used: bool,
    pub failure_reason: Option<String>,
}

impl LoginAttempt {
    pub fn builder() -> LoginAttemptBuilder {
        LoginAttemptBuilder::default()
    }
}

/// Builder for [`LoginAttempt`]. The id defaults to a fresh random id and
/// the timestamp to the moment `build` is called with a caller-supplied
/// time; email and IP are required.
#[derive(Default)]
pub struct LoginAttemptBuilder {
    id: Option<AttemptId>,
    email: Option<String>,
    ip_address: Option<String>,
    user_agent: Option<String>,
    success: bool,
    at: Option<DateTime<Utc>>,
    location: Option<String>,
    device_fingerprint: Option<String>,
    two_factor_used: bool,
    failure_reason: Option<String>,
}

impl LoginAttemptBuilder {
    pub fn id(mut self, id: AttemptId) -> Self {
        self.id = Some(id);
        self
    }

    pub fn email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn ip_address(mut self, ip_address: impl Into<String>) -> Self {
        self.ip_address = Some(ip_address.into());
        self
    }

    pub fn user_agent(mut self, user_agent: Option<String>) -> Self {
        self.user_agent = user_agent;
        self
    }

    pub fn success(mut self, success: bool) -> Self {
        self.success = success;
        self
    }

    pub fn at(mut self, at: DateTime<Utc>) -> Self {
        self.at = Some(at);
        self
    }

    pub fn location(mut self, location: Option<String>) -> Self {
        self.location = location;
        self
    }

    pub fn device_fingerprint(mut self, device_fingerprint: Option<String>) -> Self {
        self.device_fingerprint = device_fingerprint;
        self
    }

    pub fn two_factor_used(mut self, two_factor_used: bool) -> Self {
        self.two_factor_used = two_factor_used;
        self
    }

    pub fn failure_reason(mut self, failure_reason: Option<String>) -> Self {
        self.failure_reason = failure_reason;
        self
    }

    pub fn build(self) -> Result<LoginAttempt, Error> {
        Ok(LoginAttempt {
            id: self.id.unwrap_or_else(AttemptId::new_random),
            email: self
                .email
                .ok_or(ValidationError::MissingField("Email is required".to_string()))?,
            ip_address: self.ip_address.ok_or(ValidationError::MissingField(
                "IP address is required".to_string(),
            ))?,
            user_agent: self.user_agent,
            success: self.success,
            at: self.at.unwrap_or_else(Utc::now),
            location: self.location,
            device_fingerprint: self.device_fingerprint,
            two_factor_used: self.two_factor_used,
            failure_reason: self.failure_reason,
        })
    }
}

/// Temporary authentication denial for a principal after exceeding the
/// failure threshold.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountLock {
    pub email: String,
    pub locked_until: DateTime<Utc>,
}

impl AccountLock {
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        now < self.locked_until
    }
}

/// Advisory denial state for a source IP, created by DDoS detection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IpBlock {
    pub ip_address: String,
    pub blocked_until: DateTime<Utc>,
}

impl IpBlock {
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        now < self.blocked_until
    }
}
