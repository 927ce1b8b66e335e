//! Metric classification
//!
//! This module maps raw diagnostic scores onto normative bands.
//! - Scores coerced from export cells (decimal commas, stray spaces)
//! - Non-numeric cells treated as missing, never as errors
//! - Boundary scores belong to the higher band

use crate::config::{CutPoints, Thresholds};
use crate::types::{Band, Metric};

/// Classifier for converting raw scores to bands
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Classifier {
    thresholds: Thresholds,
}

impl Classifier {
    pub fn new(thresholds: Thresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &Thresholds {
        &self.thresholds
    }

    /// Classify a score for `metric`. Missing or non-finite scores yield `None`.
    pub fn classify(&self, score: Option<f64>, metric: Metric) -> Option<Band> {
        score.and_then(|s| classify_with(s, self.thresholds.for_metric(metric)))
    }
}

/// Classify a single score against explicit cut points
pub fn classify_with(score: f64, cut_points: CutPoints) -> Option<Band> {
    if !score.is_finite() {
        return None;
    }
    if score >= cut_points.above_from {
        Some(Band::Above)
    } else if score >= cut_points.normative_from {
        Some(Band::Normative)
    } else {
        Some(Band::Below)
    }
}

/// Coerce an export cell into a score.
///
/// Accepts decimal commas and thousands separators written as spaces. Anything
/// that does not parse to a finite number is treated as missing.
pub fn coerce_score(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| if c == ',' { '.' } else { c })
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}
