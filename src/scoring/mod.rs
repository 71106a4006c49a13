//! Pure scoring and grading over per-ingredient health ratings.
//!
//! Stateless by construction: no validation, no clamping, no I/O. Rating
//! bounds are enforced where inference output enters the system
//! ([`crate::scan::domain::ProductAnalysis::validate`]), not here.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::scan::domain::Ingredient;

/// Overall score for a scan: the arithmetic mean of the ingredient ratings,
/// kept at full precision. Rounding is a display concern.
///
/// An empty ingredient list scores 0.0. The mean of nothing is undefined, so
/// the empty case is pinned to a fixed value rather than left to float
/// arithmetic (which would produce NaN).
pub fn overall_score(ingredients: &[Ingredient]) -> f64 {
    if ingredients.is_empty() {
        return 0.0;
    }
    let total: f64 = ingredients.iter().map(|ingredient| ingredient.rating).sum();
    total / ingredients.len() as f64
}

/// Discrete grade band derived from an overall score, ordered worst to best.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Grade {
    #[serde(rename = "Health Hazard")]
    HealthHazard,
    #[serde(rename = "Slop")]
    Slop,
    #[serde(rename = "Premium Slop")]
    PremiumSlop,
    #[serde(rename = "B Grade")]
    BGrade,
    #[serde(rename = "A Grade")]
    AGrade,
}

impl Grade {
    /// Band for a score. Cut points are exact: 29 is still a hazard, 30 is
    /// already slop. Total over the real line; out-of-range inputs land in
    /// the outermost bands instead of failing.
    pub fn for_score(score: f64) -> Self {
        if score <= 29.0 {
            Grade::HealthHazard
        } else if score <= 49.0 {
            Grade::Slop
        } else if score <= 70.0 {
            Grade::PremiumSlop
        } else if score <= 89.0 {
            Grade::BGrade
        } else {
            Grade::AGrade
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Grade::HealthHazard => "Health Hazard",
            Grade::Slop => "Slop",
            Grade::PremiumSlop => "Premium Slop",
            Grade::BGrade => "B Grade",
            Grade::AGrade => "A Grade",
        }
    }

    /// Fixed display color token for the band. Presentation only.
    pub fn color(self) -> &'static str {
        match self {
            Grade::HealthHazard => "#E63946",
            Grade::Slop => "#F77F00",
            Grade::PremiumSlop => "#FCBF49",
            Grade::BGrade => "#06D6A0",
            Grade::AGrade => "#118AB2",
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
