use serde::{Deserialize, Serialize};

/// Identifier for a purchasable product as known to the storefront.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProductId(pub String);

/// Premium entitlement snapshot reported by the oracle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntitlementStatus {
    pub premium_active: bool,
}

/// Terminal result of a purchase or restore flow.
///
/// Cancellation is an expected outcome, not an error: the user backing out
/// of the storefront sheet must not raise an alarm.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PurchaseOutcome {
    Completed,
    Cancelled,
    Failed { reason: String },
}

/// Third-party subscription/purchase validation service. Implemented by the
/// app shell over the storefront SDK; injected so the gate can be exercised
/// against stubs.
pub trait EntitlementOracle: Send + Sync {
    fn entitlement_status(&self) -> Result<EntitlementStatus, OracleError>;
    fn purchase(&self, product: &ProductId) -> Result<PurchaseOutcome, OracleError>;
    fn restore(&self) -> Result<PurchaseOutcome, OracleError>;
}

/// Transport-level oracle failure, distinct from a failed purchase outcome.
#[derive(Debug, thiserror::Error)]
pub enum OracleError {
    #[error("entitlement service unreachable: {0}")]
    Unreachable(String),
}
