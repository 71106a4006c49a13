//! Core scoring and scan-entitlement logic for a product label health
//! scanner.
//!
//! The surrounding app shell owns capture, presentation, and the actual
//! network calls; this crate owns the deterministic pieces: the grading model
//! over ingredient ratings and the quota state machine deciding whether a
//! scan may run. External collaborators (key-value store, inference service,
//! purchase validation, clock) are narrow traits implemented by the shell and
//! injected through constructors.

pub mod clock;
pub mod config;
pub mod entitlement;
pub mod scan;
pub mod scoring;
pub mod storage;
pub mod telemetry;
