use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::scoring::{self, Grade};

/// Source reference backing a health claim (e.g. FDA, NIH, PubMed).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citation {
    pub title: String,
    pub url: String,
    pub source: String,
}

/// One analyzed component of a product, as extracted by inference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ingredient {
    pub name: String,
    /// Health rating in [0, 100]; 100 is excellent, 0 is very harmful.
    pub rating: f64,
    pub health_impact: String,
    pub explanation: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub citations: Vec<Citation>,
}

/// Identifier wrapper for completed scans.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScanId(pub String);

static SCAN_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_scan_id(at: DateTime<Utc>) -> ScanId {
    // Millisecond timestamp plus a process sequence so ids stay unique even
    // when two scans complete within the same instant.
    let seq = SCAN_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    ScanId(format!("scan-{}-{seq:06}", at.timestamp_millis()))
}

/// Raw analysis payload returned by the external inference service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductAnalysis {
    pub product_name: String,
    pub ingredients: Vec<Ingredient>,
    /// Score reported by the model. Advisory: the stored record recomputes
    /// the score locally from the ingredient ratings.
    pub overall_score: f64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub citations: Vec<Citation>,
}

impl ProductAnalysis {
    /// Enforce the ingestion contract on inference output. Out-of-range
    /// ratings are surfaced, never clamped: clamping would mask an upstream
    /// data-quality bug, and the caller decides whether to retry or abort.
    pub fn validate(&self) -> Result<(), AnalysisError> {
        for ingredient in &self.ingredients {
            if ingredient.name.trim().is_empty() {
                return Err(AnalysisError::UnnamedIngredient);
            }
            if !(0.0..=100.0).contains(&ingredient.rating) {
                return Err(AnalysisError::RatingOutOfRange {
                    ingredient: ingredient.name.clone(),
                    rating: ingredient.rating,
                });
            }
        }
        if !(0.0..=100.0).contains(&self.overall_score) {
            return Err(AnalysisError::ScoreOutOfRange {
                score: self.overall_score,
            });
        }
        Ok(())
    }
}

/// Contract violations in inference output.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AnalysisError {
    #[error("ingredient '{ingredient}' rating {rating} is outside 0-100")]
    RatingOutOfRange { ingredient: String, rating: f64 },
    #[error("reported overall score {score} is outside 0-100")]
    ScoreOutOfRange { score: f64 },
    #[error("analysis contains an ingredient with an empty name")]
    UnnamedIngredient,
}

/// Immutable record of one completed scan. Replace-or-delete after creation;
/// the favorite flag is the only field-level mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanResult {
    pub id: ScanId,
    pub product_name: String,
    /// Opaque reference to the captured image, owned by the host storage.
    pub image_uri: String,
    pub ingredients: Vec<Ingredient>,
    pub overall_score: f64,
    /// Display cache of `Grade::for_score(overall_score)`. The constructor
    /// is the only writer.
    pub grade: Grade,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub citations: Vec<Citation>,
    #[serde(default)]
    pub is_favorite: bool,
}

impl ScanResult {
    /// Build the record for a validated analysis. The overall score is
    /// recomputed locally as the mean of the ingredient ratings (0.0 for an
    /// empty list), and the grade is derived from that score.
    pub fn from_analysis(
        image_uri: impl Into<String>,
        analysis: ProductAnalysis,
        at: DateTime<Utc>,
    ) -> Self {
        let overall_score = scoring::overall_score(&analysis.ingredients);
        Self {
            id: next_scan_id(at),
            product_name: analysis.product_name,
            image_uri: image_uri.into(),
            ingredients: analysis.ingredients,
            overall_score,
            grade: Grade::for_score(overall_score),
            timestamp: at,
            citations: analysis.citations,
            is_favorite: false,
        }
    }
}
