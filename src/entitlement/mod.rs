//! Scan quota and entitlement state machine.
//!
//! Decides whether a scan attempt may proceed, tracks daily free usage with a
//! calendar-day reset, and reconciles purchased credits and the cached
//! premium flag into one remaining-scans view.

pub mod gate;
pub mod oracle;

pub use gate::{
    EntitlementGate, EntitlementState, GateError, PurchaseError, ScanPermit, ScansRemaining,
};
pub use oracle::{EntitlementOracle, EntitlementStatus, OracleError, ProductId, PurchaseOutcome};
