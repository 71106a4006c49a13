//! Label scan records, persisted history, and the scan pipeline.

pub mod domain;
pub mod history;
pub mod pipeline;

pub use domain::{AnalysisError, Citation, Ingredient, ProductAnalysis, ScanId, ScanResult};
pub use history::ScanHistory;
pub use pipeline::{InferenceError, InferenceService, ScanError, ScanPipeline};
