//! Core types for the Kidski analytics pipeline
//!
//! This module defines the data structures that flow through each stage of the
//! pipeline: ingested records and datasets, band distributions, comparison
//! deltas, and the report payloads handed to renderers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Developmental dimension tracked by the diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Cognitive,
    Imagination,
    EmotionalSocial,
}

impl Metric {
    /// All tracked metrics, in report order
    pub const ALL: [Metric; 3] = [Metric::Cognitive, Metric::Imagination, Metric::EmotionalSocial];

    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::Cognitive => "cognitive",
            Metric::Imagination => "imagination",
            Metric::EmotionalSocial => "emotional_social",
        }
    }

    /// Human-readable label used in report titles
    pub fn label(&self) -> &'static str {
        match self {
            Metric::Cognitive => "Cognitive development",
            Metric::Imagination => "Imagination",
            Metric::EmotionalSocial => "Emotional-social intelligence",
        }
    }

    /// Header names under which this metric's score column may appear in an export.
    ///
    /// The first entry is the header written by the assessment platform.
    pub fn column_aliases(&self) -> &'static [&'static str] {
        match self {
            Metric::Cognitive => &["Когнитивное развитие", "cognitive", "cognitive_development"],
            Metric::Imagination => &["Воображение_итог", "imagination", "imagination_total"],
            Metric::EmotionalSocial => &["ЭмСоцИнтеллект", "emotional_social", "esi"],
        }
    }

    pub(crate) fn index(&self) -> usize {
        match self {
            Metric::Cognitive => 0,
            Metric::Imagination => 1,
            Metric::EmotionalSocial => 2,
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Normative band a score falls into. Ordered from lowest to highest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Band {
    Below,
    Normative,
    Above,
}

impl Band {
    pub const ALL: [Band; 3] = [Band::Below, Band::Normative, Band::Above];

    pub fn as_str(&self) -> &'static str {
        match self {
            Band::Below => "below",
            Band::Normative => "normative",
            Band::Above => "above",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Band::Below => "Below normative",
            Band::Normative => "Normative",
            Band::Above => "Above normative",
        }
    }
}

/// One child's diagnostic row
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Child identifier, only needed for paired comparison
    pub id: Option<String>,
    /// Age group label as exported (e.g. "5-6")
    pub age_group: Option<String>,
    /// Raw scores indexed by metric
    scores: [Option<f64>; 3],
}

impl Record {
    pub fn new(id: Option<String>, age_group: Option<String>) -> Self {
        Self {
            id,
            age_group,
            scores: [None; 3],
        }
    }

    /// Builder-style setter for a metric score
    pub fn with_score(mut self, metric: Metric, score: Option<f64>) -> Self {
        self.set_score(metric, score);
        self
    }

    pub fn score(&self, metric: Metric) -> Option<f64> {
        self.scores[metric.index()]
    }

    pub fn set_score(&mut self, metric: Metric, score: Option<f64>) {
        self.scores[metric.index()] = score;
    }
}

/// A cohort: every record of one uploaded export, plus which metric columns it carried
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    records: Vec<Record>,
    metric_columns: [bool; 3],
}

impl Dataset {
    /// Create a dataset whose export carried the given metric columns
    pub fn new(records: Vec<Record>, metrics: &[Metric]) -> Self {
        let mut metric_columns = [false; 3];
        for metric in metrics {
            metric_columns[metric.index()] = true;
        }
        Self {
            records,
            metric_columns,
        }
    }

    /// Create a dataset carrying every tracked metric column
    pub fn with_all_metrics(records: Vec<Record>) -> Self {
        Self::new(records, &Metric::ALL)
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Whether the export contained a score column for `metric`
    pub fn has_metric(&self, metric: Metric) -> bool {
        self.metric_columns[metric.index()]
    }

    /// Metric columns absent from the export
    pub fn missing_metrics(&self) -> Vec<Metric> {
        Metric::ALL
            .into_iter()
            .filter(|m| !self.has_metric(*m))
            .collect()
    }
}

/// Band membership of one metric over one population
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Distribution {
    /// Population size used as the denominator
    pub total: usize,
    pub below: usize,
    pub normative: usize,
    pub above: usize,
    /// False when the metric column was absent and the counts were zero-filled
    pub column_present: bool,
}

impl Distribution {
    /// Zero-filled distribution for a metric whose column is absent
    pub fn absent(total: usize) -> Self {
        Self {
            total,
            below: 0,
            normative: 0,
            above: 0,
            column_present: false,
        }
    }

    pub fn count(&self, band: Band) -> usize {
        match band {
            Band::Below => self.below,
            Band::Normative => self.normative,
            Band::Above => self.above,
        }
    }

    /// Share of the population in `band`, 0-1. Zero for an empty population.
    pub fn fraction(&self, band: Band) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.count(band) as f64 / self.total as f64
    }

    /// Share of the population in `band`, in percent
    pub fn pct(&self, band: Band) -> f64 {
        self.fraction(band) * 100.0
    }

    /// Records without a classifiable score
    pub fn unclassified(&self) -> usize {
        self.total
            .saturating_sub(self.below + self.normative + self.above)
    }
}

/// Direction of change in the above-normative share
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    Improved,
    Declined,
    Unchanged,
}

impl Trend {
    pub fn from_delta(delta: f64) -> Self {
        if delta > 0.0 {
            Trend::Improved
        } else if delta < 0.0 {
            Trend::Declined
        } else {
            Trend::Unchanged
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Trend::Improved => "improved",
            Trend::Declined => "declined",
            Trend::Unchanged => "unchanged",
        }
    }
}

/// How start and end cohorts are related in a comparison
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComparisonMode {
    /// Unrelated populations, no per-child matching
    Independent,
    /// Children present in both cohorts, matched by identifier
    Paired,
}

impl ComparisonMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ComparisonMode::Independent => "independent",
            ComparisonMode::Paired => "paired",
        }
    }
}

impl fmt::Display for ComparisonMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Independent-groups comparison of one metric
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndependentDelta {
    pub metric: Metric,
    pub start: Distribution,
    pub end: Distribution,
    /// Above-normative share change, percentage points; `None` when either
    /// cohort lacks the metric column
    pub delta: Option<f64>,
    pub trend: Option<Trend>,
}

/// Paired-cohort comparison of one metric over the joined population
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairedDelta {
    pub metric: Metric,
    /// Size of the identifier join, the denominator on both sides
    pub merged_count: usize,
    pub start: Distribution,
    pub end: Distribution,
    /// Above-normative share change, percentage points; `None` when either
    /// cohort lacks the metric column
    pub delta: Option<f64>,
    pub trend: Option<Trend>,
}

/// Number of children in one age group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgeGroupCount {
    pub age_group: String,
    pub count: usize,
}

/// Single-period analysis before encoding
#[derive(Debug, Clone, PartialEq)]
pub struct SingleAnalysis {
    pub record_count: usize,
    pub age_groups: Vec<AgeGroupCount>,
    pub metrics: Vec<(Metric, Distribution)>,
    pub records: Vec<ClassifiedRecord>,
}

/// One child's row with a band per metric column present in the export
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedRecord {
    pub id: Option<String>,
    pub age_group: Option<String>,
    pub scores: Vec<ScoredMetric>,
}

/// Raw score and its band; both are null when the cell was empty or unreadable
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoredMetric {
    pub metric: Metric,
    pub score: Option<f64>,
    pub band: Option<Band>,
}

/// Per-metric comparison outcome, independent of mode
#[derive(Debug, Clone, PartialEq)]
pub struct MetricComparisonData {
    pub metric: Metric,
    pub start: Distribution,
    pub end: Distribution,
    pub delta: Option<f64>,
    pub trend: Option<Trend>,
}

impl MetricComparisonData {
    /// Both cohorts carry the metric column
    pub fn is_comparable(&self) -> bool {
        self.start.column_present && self.end.column_present
    }
}

impl From<IndependentDelta> for MetricComparisonData {
    fn from(d: IndependentDelta) -> Self {
        Self {
            metric: d.metric,
            start: d.start,
            end: d.end,
            delta: d.delta,
            trend: d.trend,
        }
    }
}

impl From<PairedDelta> for MetricComparisonData {
    fn from(d: PairedDelta) -> Self {
        Self {
            metric: d.metric,
            start: d.start,
            end: d.end,
            delta: d.delta,
            trend: d.trend,
        }
    }
}

/// Two-period analysis before encoding
#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonAnalysis {
    pub mode: ComparisonMode,
    pub start_count: usize,
    pub end_count: usize,
    /// Join size, paired mode only
    pub merged_count: Option<usize>,
    pub metrics: Vec<MetricComparisonData>,
}

/// Report producer metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportProducer {
    pub name: String,
    pub version: String,
    pub instance_id: String,
}

/// Per-band share as rendered in tables and charts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BandShare {
    pub band: Band,
    pub label: String,
    pub count: usize,
    /// 0-1
    pub fraction: f64,
    /// 0-100
    pub pct: f64,
}

/// Rendered distribution of one metric
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DistributionView {
    pub total: usize,
    pub column_present: bool,
    pub bands: Vec<BandShare>,
    pub unclassified: usize,
}

/// Cut points echoed into the report so readers know how bands were drawn
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CutPointsView {
    pub normative_from: f64,
    pub above_from: f64,
}

/// Single-report section for one metric
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricSummary {
    pub metric: Metric,
    pub label: String,
    pub column_present: bool,
    pub distribution: DistributionView,
    pub thresholds: CutPointsView,
}

/// Single-period report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SingleReport {
    pub report_version: String,
    pub producer: ReportProducer,
    pub generated_at_utc: String,
    pub title: String,
    pub source_files: Vec<String>,
    pub record_count: usize,
    pub age_groups: Vec<AgeGroupCount>,
    pub metrics: Vec<MetricSummary>,
    /// Per-child table with computed bands
    pub records: Vec<ClassifiedRecord>,
}

/// Comparison-report section for one metric
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricComparison {
    pub metric: Metric,
    pub label: String,
    /// False when either cohort lacked the metric column; delta, trend and
    /// narrative are then null
    pub column_present: bool,
    pub start: DistributionView,
    pub end: DistributionView,
    /// Above-normative share change, percentage points
    pub delta_pp: Option<f64>,
    pub trend: Option<Trend>,
    pub narrative: Option<String>,
}

/// Two-period comparison report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComparisonReport {
    pub report_version: String,
    pub producer: ReportProducer,
    pub generated_at_utc: String,
    pub title: String,
    pub source_files: Vec<String>,
    pub mode: ComparisonMode,
    pub start_count: usize,
    pub end_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merged_count: Option<usize>,
    pub metrics: Vec<MetricComparison>,
}
