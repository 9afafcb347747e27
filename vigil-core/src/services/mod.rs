//! Service layer for the monitoring engine
//!
//! This module contains the concrete service implementations, one per
//! engine component. Services are generic over the repository traits they
//! consume, so every one of them is unit-testable against mock storage.

pub mod alert;
pub mod anomaly;
pub mod audit;
pub mod compliance;
pub mod login_ledger;
pub mod rate_limit;
pub mod session;
pub mod threat;
pub mod two_factor;

pub use alert::AlertService;
pub use anomaly::{AnomalyDetector, Evaluation};
pub use audit::AuditService;
pub use compliance::{ComplianceReport, ComplianceService, ControlResult, DashboardSnapshot};
pub use login_ledger::{AttemptInput, LockoutStatus, LoginLedgerService};
pub use rate_limit::RateLimitService;
pub use session::SessionService;
pub use threat::ThreatService;
pub use two_factor::TwoFactorService;
