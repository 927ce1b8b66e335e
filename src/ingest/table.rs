//! Header resolution and row assembly shared by every adapter
//!
//! Adapters only turn their input into rows of cell text; column matching,
//! score coercion and identifier cleanup all happen here.

use crate::classifier::coerce_score;
use crate::error::AnalyticsError;
use crate::types::{Dataset, Metric, Record};

use super::{Ingested, IngestSummary, InvalidScoreCount};

/// Header names accepted for the child identifier column
const ID_ALIASES: &[&str] = &["Код", "Код ребёнка", "Код ребенка", "id", "child_id"];

/// Header names accepted for the age group column
const AGE_ALIASES: &[&str] = &["Возраст", "age", "age_group"];

/// Column positions resolved from the header row
#[derive(Debug, Default, PartialEq)]
pub(super) struct ColumnLayout {
    pub(super) id: Option<usize>,
    pub(super) age: Option<usize>,
    metrics: [Option<usize>; 3],
}

impl ColumnLayout {
    pub(super) fn resolve<S: AsRef<str>>(headers: &[S]) -> Self {
        let mut metrics = [None; 3];
        for metric in Metric::ALL {
            metrics[metric.index()] = find_column(headers, metric.column_aliases());
        }
        Self {
            id: find_column(headers, ID_ALIASES),
            age: find_column(headers, AGE_ALIASES),
            metrics,
        }
    }

    pub(super) fn metric(&self, metric: Metric) -> Option<usize> {
        self.metrics[metric.index()]
    }
}

/// Accumulates rows read through a [`ColumnLayout`] into a dataset
pub(super) struct TableBuilder {
    layout: ColumnLayout,
    records: Vec<Record>,
    invalid: [usize; 3],
    rows_without_identifier: usize,
}

impl TableBuilder {
    /// Start a table from its header row; a blank header is rejected
    pub(super) fn new<S: AsRef<str>>(headers: &[S]) -> Result<Self, AnalyticsError> {
        if headers.iter().all(|h| h.as_ref().trim().is_empty()) {
            return Err(AnalyticsError::MissingHeader);
        }
        Ok(Self {
            layout: ColumnLayout::resolve(headers),
            records: Vec::new(),
            invalid: [0; 3],
            rows_without_identifier: 0,
        })
    }

    /// Read one data row; all-blank rows are skipped, short rows are padded with missing cells
    pub(super) fn push_row<S: AsRef<str>>(&mut self, row: &[S]) {
        let cell = |i: Option<usize>| i.and_then(|i| row.get(i)).map(|c| c.as_ref().trim());

        if row.iter().all(|c| c.as_ref().trim().is_empty()) {
            return;
        }

        let id = cell(self.layout.id).and_then(normalize_identifier);
        if id.is_none() {
            self.rows_without_identifier += 1;
        }
        let age_group = cell(self.layout.age)
            .filter(|c| !c.is_empty())
            .map(str::to_string);

        let mut record = Record::new(id, age_group);
        for metric in Metric::ALL {
            let Some(raw) = cell(self.layout.metric(metric)) else {
                continue;
            };
            let score = coerce_score(raw);
            if score.is_none() && !raw.is_empty() {
                self.invalid[metric.index()] += 1;
            }
            record.set_score(metric, score);
        }
        self.records.push(record);
    }

    pub(super) fn finish(self) -> Ingested {
        let present: Vec<Metric> = Metric::ALL
            .into_iter()
            .filter(|m| self.layout.metric(*m).is_some())
            .collect();
        let dataset = Dataset::new(self.records, &present);
        let invalid = self.invalid;

        let summary = IngestSummary {
            rows: dataset.len(),
            invalid_scores: Metric::ALL
                .into_iter()
                .filter(|m| invalid[m.index()] > 0)
                .map(|metric| InvalidScoreCount {
                    metric,
                    count: invalid[metric.index()],
                })
                .collect(),
            missing_columns: dataset.missing_metrics(),
            has_identifier_column: self.layout.id.is_some(),
            has_age_column: self.layout.age.is_some(),
            rows_without_identifier: self.rows_without_identifier,
        };

        if summary.total_invalid_scores() > 0 {
            tracing::warn!(
                invalid = summary.total_invalid_scores(),
                "non-numeric score cells treated as missing"
            );
        }

        Ingested { dataset, summary }
    }
}

/// Position of the first header matching any alias, case-insensitively
fn find_column<S: AsRef<str>>(headers: &[S], aliases: &[&str]) -> Option<usize> {
    headers.iter().position(|header| {
        let header = header.as_ref().trim().to_lowercase();
        aliases.iter().any(|alias| alias.to_lowercase() == header)
    })
}

/// Trim an identifier cell; spreadsheet exports turn `17` into `17.0`
pub(super) fn normalize_identifier(cell: &str) -> Option<String> {
    let cell = cell.trim();
    if cell.is_empty() {
        return None;
    }
    if let Some(int_part) = cell.strip_suffix(".0") {
        if !int_part.is_empty() && int_part.bytes().all(|b| b.is_ascii_digit()) {
            return Some(int_part.to_string());
        }
    }
    Some(cell.to_string())
}
