//! Error types for Kidski analytics

use crate::types::{ComparisonMode, Metric};
use thiserror::Error;

/// Errors that can occur while ingesting or analysing cohorts
#[derive(Debug, Error)]
pub enum AnalyticsError {
    #[error("Failed to read dataset: {0}")]
    Csv(#[from] csv::Error),

    #[error("Failed to read workbook: {0}")]
    Workbook(#[from] calamine::Error),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Dataset has no header row")]
    MissingHeader,

    #[error("No matching child identifiers between start and end datasets ({mode} comparison, metric {metric})")]
    NoJoinMatches { metric: Metric, mode: ComparisonMode },

    #[error("Invalid thresholds for {metric}: {reason}")]
    InvalidThresholds { metric: Metric, reason: String },
}

impl AnalyticsError {
    /// Whether the caller can fix this by changing the uploaded files
    pub fn is_user_actionable(&self) -> bool {
        matches!(
            self,
            AnalyticsError::NoJoinMatches { .. } | AnalyticsError::MissingHeader
        )
    }
}
