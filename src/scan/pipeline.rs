use std::sync::Arc;

use tracing::info;

use crate::clock::Clock;
use crate::entitlement::gate::{EntitlementGate, GateError};
use crate::entitlement::oracle::EntitlementOracle;
use crate::storage::{KeyValueStore, StoreError};

use super::domain::{AnalysisError, ProductAnalysis, ScanResult};
use super::history::ScanHistory;

/// Hosted model call extracting ingredients from a label photo. Opaque to
/// the core; retry and backoff policy belong to the caller implementing it.
pub trait InferenceService: Send + Sync {
    fn analyze(&self, image_uri: &str) -> Result<ProductAnalysis, InferenceError>;
}

/// Failure modes of the inference call. Cancellation covers the user backing
/// out mid-capture (e.g. "retake").
#[derive(Debug, thiserror::Error)]
pub enum InferenceError {
    #[error("inference timed out")]
    Timeout,
    #[error("inference transport failed: {0}")]
    Transport(String),
    #[error("inference response malformed: {0}")]
    Malformed(String),
    #[error("inference cancelled")]
    Cancelled,
}

/// Error raised by a scan attempt.
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    /// The gate denied the attempt. Expected when the daily quota is spent
    /// and no entitlement applies; the shell presents an upgrade path.
    #[error("scan quota exhausted")]
    QuotaExceeded,
    /// The user aborted before inference finished. No usage was recorded.
    #[error("scan cancelled before completion")]
    Cancelled,
    #[error(transparent)]
    Inference(InferenceError),
    #[error(transparent)]
    Analysis(#[from] AnalysisError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Gate(#[from] GateError),
}

/// One scan attempt end to end: gate check, inference, scoring, persistence,
/// usage recording. Collaborators are constructor-injected; the pipeline
/// owns no ambient state.
pub struct ScanPipeline<S, O, C, I> {
    gate: Arc<EntitlementGate<S, O, C>>,
    history: Arc<ScanHistory<S>>,
    inference: Arc<I>,
    clock: Arc<C>,
}

impl<S, O, C, I> ScanPipeline<S, O, C, I>
where
    S: KeyValueStore,
    O: EntitlementOracle,
    C: Clock,
    I: InferenceService,
{
    pub fn new(
        gate: Arc<EntitlementGate<S, O, C>>,
        history: Arc<ScanHistory<S>>,
        inference: Arc<I>,
        clock: Arc<C>,
    ) -> Self {
        Self {
            gate,
            history,
            inference,
            clock,
        }
    }

    /// Run a full scan for a captured image. Usage is recorded only after
    /// every stage succeeds; a denied, cancelled, or failed run never
    /// consumes quota.
    pub fn scan(&self, image_uri: &str) -> Result<ScanResult, ScanError> {
        if !self.gate.can_scan()? {
            return Err(ScanError::QuotaExceeded);
        }

        let analysis = self.inference.analyze(image_uri).map_err(|err| match err {
            InferenceError::Cancelled => ScanError::Cancelled,
            other => ScanError::Inference(other),
        })?;
        analysis.validate()?;

        let result = ScanResult::from_analysis(image_uri, analysis, self.clock.now());
        self.history.add(result.clone())?;
        let permit = self.gate.record_scan()?;

        info!(
            id = %result.id.0,
            product = %result.product_name,
            score = result.overall_score,
            grade = %result.grade,
            ?permit,
            "scan completed"
        );
        Ok(result)
    }
}
