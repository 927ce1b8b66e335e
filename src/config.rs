//! Threshold configuration
//!
//! Cut points that split each metric's raw score into normative bands. They are
//! loaded from JSON so the scoring norms can change without a rebuild.

use crate::error::AnalyticsError;
use crate::types::Metric;
use serde::{Deserialize, Serialize};

/// Default score at which the normative band starts
pub const DEFAULT_NORMATIVE_FROM: f64 = 50.0;

/// Default score at which the above-normative band starts
pub const DEFAULT_ABOVE_FROM: f64 = 80.0;

/// Band boundaries for one metric.
///
/// `score < normative_from` is below normative, `normative_from <= score < above_from`
/// is normative, and `score >= above_from` is above normative.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CutPoints {
    pub normative_from: f64,
    pub above_from: f64,
}

impl Default for CutPoints {
    fn default() -> Self {
        Self {
            normative_from: DEFAULT_NORMATIVE_FROM,
            above_from: DEFAULT_ABOVE_FROM,
        }
    }
}

impl CutPoints {
    pub fn new(normative_from: f64, above_from: f64) -> Self {
        Self {
            normative_from,
            above_from,
        }
    }

    fn validate(&self, metric: Metric) -> Result<(), AnalyticsError> {
        if !self.normative_from.is_finite() || !self.above_from.is_finite() {
            return Err(AnalyticsError::InvalidThresholds {
                metric,
                reason: "cut points must be finite numbers".to_string(),
            });
        }
        if self.normative_from > self.above_from {
            return Err(AnalyticsError::InvalidThresholds {
                metric,
                reason: format!(
                    "normative_from ({}) is greater than above_from ({})",
                    self.normative_from, self.above_from
                ),
            });
        }
        Ok(())
    }
}

/// Cut points for every tracked metric
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    pub cognitive: CutPoints,
    pub imagination: CutPoints,
    pub emotional_social: CutPoints,
}

impl Thresholds {
    /// Same cut points for all metrics
    pub fn uniform(cut_points: CutPoints) -> Self {
        Self {
            cognitive: cut_points,
            imagination: cut_points,
            emotional_social: cut_points,
        }
    }

    pub fn for_metric(&self, metric: Metric) -> CutPoints {
        match metric {
            Metric::Cognitive => self.cognitive,
            Metric::Imagination => self.imagination,
            Metric::EmotionalSocial => self.emotional_social,
        }
    }

    /// Check every metric's cut points are finite and ordered
    pub fn validate(&self) -> Result<(), AnalyticsError> {
        for metric in Metric::ALL {
            self.for_metric(metric).validate(metric)?;
        }
        Ok(())
    }

    /// Load and validate thresholds from JSON. Metrics left out keep the defaults.
    pub fn from_json(json: &str) -> Result<Self, AnalyticsError> {
        let thresholds: Thresholds = serde_json::from_str(json)?;
        thresholds.validate()?;
        Ok(thresholds)
    }

    pub fn to_json(&self) -> Result<String, AnalyticsError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
