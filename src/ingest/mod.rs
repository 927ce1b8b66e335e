//! Assessment export adapters
//!
//! This module provides adapters that parse raw assessment exports and map them
//! to typed, platform-agnostic datasets.

mod delimited;
mod table;
mod workbook;

pub use delimited::CsvAdapter;
pub use workbook::{WorkbookAdapter, WORKBOOK_EXTENSIONS};

use crate::error::AnalyticsError;
use crate::types::{Dataset, Metric};
use serde::{Deserialize, Serialize};

/// Trait for assessment export adapters
pub trait DatasetAdapter {
    /// Raw export representation: text for delimited files, bytes for workbooks
    type Input: ?Sized;

    /// Parse a raw export and convert it to a dataset
    fn parse(&self, raw: &Self::Input) -> Result<Ingested, AnalyticsError>;
}

/// A parsed dataset together with what the adapter had to recover from
#[derive(Debug, Clone)]
pub struct Ingested {
    pub dataset: Dataset,
    pub summary: IngestSummary,
}

/// Diagnostics collected while reading an export
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IngestSummary {
    /// Data rows read (blank rows excluded)
    pub rows: usize,
    /// Non-empty cells that did not coerce to a number, per metric
    pub invalid_scores: Vec<InvalidScoreCount>,
    /// Metric columns absent from the header
    pub missing_columns: Vec<Metric>,
    pub has_identifier_column: bool,
    pub has_age_column: bool,
    /// Rows without a child identifier (they cannot take part in paired comparison)
    pub rows_without_identifier: usize,
}

impl IngestSummary {
    pub fn total_invalid_scores(&self) -> usize {
        self.invalid_scores.iter().map(|c| c.count).sum()
    }
}

/// Count of unreadable score cells for one metric
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvalidScoreCount {
    pub metric: Metric,
    pub count: usize,
}
