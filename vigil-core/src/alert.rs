//! Security alerts
//!
//! Alerts are raised by every producing component and held most-recent-first
//! by the alert service. Severity is decided entirely by the producer; the
//! bus never re-classifies. An alert is mutated only by resolution and is
//! never deleted while unresolved.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{id::generate_prefixed_id, principal::PrincipalId};

/// Unique identifier for an alert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub struct AlertId(String);

impl AlertId {
    pub fn new(id: &str) -> Self {
        AlertId(id.to_string())
    }

    pub fn new_random() -> Self {
        AlertId(generate_prefixed_id("alrt"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for AlertId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The kind of event an alert reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    LoginFailed,
    SuspiciousActivity,
    PasswordChanged,
    DeviceNew,
    LocationNew,
    RateLimitExceeded,
}

/// Alert severity, ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

/// A stored security alert.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityAlert {
    pub id: AlertId,
    pub kind: AlertKind,
    pub severity: Severity,
    pub message: String,
    pub principal_id: Option<PrincipalId>,
    pub ip_address: Option<String>,
    pub at: DateTime<Utc>,
    pub resolved: bool,
    pub details: BTreeMap<String, Value>,
}

/// Input for raising an alert. The service assigns id and timestamp.
#[derive(Debug, Clone)]
pub struct NewAlert {
    pub kind: AlertKind,
    pub severity: Severity,
    pub message: String,
    pub principal_id: Option<PrincipalId>,
    pub ip_address: Option<String>,
    pub details: BTreeMap<String, Value>,
}

impl NewAlert {
    pub fn new(kind: AlertKind, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            kind,
            severity,
            message: message.into(),
            principal_id: None,
            ip_address: None,
            details: BTreeMap::new(),
        }
    }

    pub fn principal(mut self, principal_id: impl Into<PrincipalId>) -> Self {
        self.principal_id = Some(principal_id.into());
        self
    }

    pub fn ip_address(mut self, ip_address: impl Into<String>) -> Self {
        self.ip_address = Some(ip_address.into());
        self
    }

    pub fn detail(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }
}
