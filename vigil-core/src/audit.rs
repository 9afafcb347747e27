//! Audit records
//!
//! Every security-relevant action lands in the audit log as an append-only
//! [`AuditRecord`] with a risk classification. The log is a bounded ring:
//! past the configured cap the oldest records are dropped, so callers that
//! need a permanent trail must archive externally before eviction.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{alert::Severity, id::generate_prefixed_id, principal::PrincipalId};

/// Unique identifier for an audit record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub struct AuditId(String);

impl AuditId {
    pub fn new(id: &str) -> Self {
        AuditId(id.to_string())
    }

    pub fn new_random() -> Self {
        AuditId(generate_prefixed_id("aud"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for AuditId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Risk classification of an audited action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl From<RiskLevel> for Severity {
    fn from(risk: RiskLevel) -> Self {
        match risk {
            RiskLevel::Low => Severity::Low,
            RiskLevel::Medium => Severity::Medium,
            RiskLevel::High => Severity::High,
            RiskLevel::Critical => Severity::Critical,
        }
    }
}

/// An append-only audit record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRecord {
    pub id: AuditId,
    pub principal_id: Option<PrincipalId>,
    pub action: String,
    pub resource: String,
    pub at: DateTime<Utc>,
    pub ip_address: Option<String>,
    pub success: bool,
    pub risk_level: RiskLevel,
    pub details: BTreeMap<String, Value>,
}

/// Input for appending an audit record. The service assigns id and
/// timestamp; risk defaults to [`RiskLevel::Low`].
#[derive(Debug, Clone)]
pub struct NewAuditEvent {
    pub action: String,
    pub resource: String,
    pub success: bool,
    pub principal_id: Option<PrincipalId>,
    pub ip_address: Option<String>,
    pub risk_level: RiskLevel,
    pub details: BTreeMap<String, Value>,
}

impl NewAuditEvent {
    pub fn new(action: impl Into<String>, resource: impl Into<String>, success: bool) -> Self {
        Self {
            action: action.into(),
            resource: resource.into(),
            success,
            principal_id: None,
            ip_address: None,
            risk_level: RiskLevel::Low,
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

    pub fn risk(mut self, risk_level: RiskLevel) -> Self {
        self.risk_level = risk_level;
        self
    }

    pub fn detail(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }
}

/// Filters for querying the audit log. All filters are conjunctive;
/// results are returned newest-first.
#[derive(Debug, Clone, Default)]
pub struct AuditQuery {
    pub principal_id: Option<PrincipalId>,
    pub action_contains: Option<String>,
    pub resource_contains: Option<String>,
    pub risk_level: Option<RiskLevel>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub limit: Option<usize>,
}

impl AuditQuery {
    /// Whether a record passes every set filter. Time range is half-open:
    /// `from <= at < to`.
    pub fn matches(&self, record: &AuditRecord) -> bool {
        if let Some(principal_id) = &self.principal_id {
            if record.principal_id.as_ref() != Some(principal_id) {
                return false;
            }
        }
        if let Some(action) = &self.action_contains {
            if !record.action.contains(action.as_str()) {
                return false;
            }
        }
        if let Some(resource) = &self.resource_contains {
            if !record.resource.contains(resource.as_str()) {
                return false;
            }
        }
        if let Some(risk_level) = self.risk_level {
            if record.risk_level != risk_level {
                return false;
            }
        }
        if let Some(from) = self.from {
            if record.at < from {
                return false;
            }
        }
        if let Some(to) = self.to {
            if record.at >= to {
                return false;
            }
        }
        true
    }
}
