pub mod alert;
pub mod audit;
pub mod lock;
pub mod login_attempt;
pub mod rate_limit;
pub mod session;
pub mod two_factor;

pub use alert::MemoryAlertRepository;
pub use audit::MemoryAuditRepository;
pub use lock::MemoryLockRepository;
pub use login_attempt::MemoryLoginAttemptRepository;
pub use rate_limit::MemoryRateLimitRepository;
pub use session::MemorySessionRepository;
pub use two_factor::MemoryTwoFactorRepository;
