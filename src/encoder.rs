//! Report encoding
//!
//! This module encodes finished analyses into report payloads for the rendering
//! collaborator. Every payload carries producer metadata, a generation timestamp,
//! and per-band shares as both fractions (tables) and percentages (charts).

use crate::config::Thresholds;
use crate::error::AnalyticsError;
use crate::types::{
    Band, ComparisonAnalysis, ComparisonMode, ComparisonReport, CutPointsView, Distribution,
    DistributionView, BandShare, MetricComparison, MetricSummary, ReportProducer, SingleAnalysis,
    SingleReport, Trend,
};
use crate::{ANALYTICS_VERSION, PRODUCER_NAME};
use chrono::Utc;
use uuid::Uuid;

/// Current report schema version
pub const REPORT_VERSION: &str = "1.0.0";

/// Report encoder for producing renderer-ready payloads
pub struct ReportEncoder {
    instance_id: String,
}

impl Default for ReportEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportEncoder {
    /// Create a new encoder with a unique instance ID
    pub fn new() -> Self {
        Self {
            instance_id: Uuid::new_v4().to_string(),
        }
    }

    /// Create an encoder with a specific instance ID
    pub fn with_instance_id(instance_id: String) -> Self {
        Self { instance_id }
    }

    /// Encode a single-period analysis
    pub fn encode_single(
        &self,
        analysis: &SingleAnalysis,
        thresholds: &Thresholds,
        source_files: &[String],
    ) -> SingleReport {
        let metrics = analysis
            .metrics
            .iter()
            .map(|(metric, dist)| {
                let cut_points = thresholds.for_metric(*metric);
                MetricSummary {
                    metric: *metric,
                    label: metric.label().to_string(),
                    column_present: dist.column_present,
                    distribution: distribution_view(dist),
                    thresholds: CutPointsView {
                        normative_from: cut_points.normative_from,
                        above_from: cut_points.above_from,
                    },
                }
            })
            .collect();

        SingleReport {
            report_version: REPORT_VERSION.to_string(),
            producer: self.producer(),
            generated_at_utc: Utc::now().to_rfc3339(),
            title: "Diagnostic results".to_string(),
            source_files: source_files.to_vec(),
            record_count: analysis.record_count,
            age_groups: analysis.age_groups.clone(),
            metrics,
            records: analysis.records.clone(),
        }
    }

    /// Encode a two-period comparison
    pub fn encode_comparison(
        &self,
        analysis: &ComparisonAnalysis,
        source_files: &[String],
    ) -> ComparisonReport {
        let metrics = analysis
            .metrics
            .iter()
            .map(|m| MetricComparison {
                metric: m.metric,
                label: m.metric.label().to_string(),
                column_present: m.is_comparable(),
                start: distribution_view(&m.start),
                end: distribution_view(&m.end),
                delta_pp: m.delta,
                trend: m.trend,
                narrative: m.trend.zip(m.delta).map(|(trend, delta)| narrative(trend, delta)),
            })
            .collect();

        let title = match analysis.mode {
            ComparisonMode::Independent => "Comparative report: full groups at start and end of period",
            ComparisonMode::Paired => "Comparative report: children who took both diagnostics",
        };

        ComparisonReport {
            report_version: REPORT_VERSION.to_string(),
            producer: self.producer(),
            generated_at_utc: Utc::now().to_rfc3339(),
            title: title.to_string(),
            source_files: source_files.to_vec(),
            mode: analysis.mode,
            start_count: analysis.start_count,
            end_count: analysis.end_count,
            merged_count: analysis.merged_count,
            metrics,
        }
    }

    /// Encode a single-period analysis to pretty JSON
    pub fn single_to_json(
        &self,
        analysis: &SingleAnalysis,
        thresholds: &Thresholds,
        source_files: &[String],
    ) -> Result<String, AnalyticsError> {
        let report = self.encode_single(analysis, thresholds, source_files);
        serde_json::to_string_pretty(&report).map_err(AnalyticsError::JsonError)
    }

    /// Encode a comparison to pretty JSON
    pub fn comparison_to_json(
        &self,
        analysis: &ComparisonAnalysis,
        source_files: &[String],
    ) -> Result<String, AnalyticsError> {
        let report = self.encode_comparison(analysis, source_files);
        serde_json::to_string_pretty(&report).map_err(AnalyticsError::JsonError)
    }

    fn producer(&self) -> ReportProducer {
        ReportProducer {
            name: PRODUCER_NAME.to_string(),
            version: ANALYTICS_VERSION.to_string(),
            instance_id: self.instance_id.clone(),
        }
    }
}

fn distribution_view(dist: &Distribution) -> DistributionView {
    DistributionView {
        total: dist.total,
        column_present: dist.column_present,
        bands: Band::ALL
            .into_iter()
            .map(|band| BandShare {
                band,
                label: band.label().to_string(),
                count: dist.count(band),
                fraction: dist.fraction(band),
                pct: dist.pct(band),
            })
            .collect(),
        unclassified: dist.unclassified(),
    }
}

/// One-sentence reading of a delta for the report body
pub fn narrative(trend: Trend, delta: f64) -> String {
    match trend {
        Trend::Improved => format!(
            "Share of children at the above-normative level rose by {:.1} pp.",
            delta
        ),
        Trend::Declined => format!(
            "Share of children at the above-normative level fell by {:.1} pp.",
            delta.abs()
        ),
        Trend::Unchanged => {
            "No change in the share of children at the above-normative level.".to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AgeGroupCount, ClassifiedRecord, Metric, MetricComparisonData, ScoredMetric};

    fn dist(total: usize, below: usize, normative: usize, above: usize) -> Distribution {
        Distribution {
            total,
            below,
            normative,
            above,
            column_present: true,
        }
    }

    #[test]
    fn test_encode_single_report() {
        let analysis = SingleAnalysis {
            record_count: 4,
            age_groups: vec![AgeGroupCount {
                age_group: "5-6".to_string(),
                count: 4,
            }],
            metrics: vec![
                (Metric::Cognitive, dist(4, 1, 2, 1)),
                (Metric::Imagination, Distribution::absent(4)),
            ],
            records: vec![ClassifiedRecord {
                id: Some("7".to_string()),
                age_group: Some("5-6".to_string()),
                scores: vec![ScoredMetric {
                    metric: Metric::Cognitive,
                    score: None,
                    band: None,
                }],
            }],
        };
        let encoder = ReportEncoder::with_instance_id("test-instance".to_string());
        let report = encoder.encode_single(&analysis, &Thresholds::default(), &["a.csv".to_string()]);

        assert_eq!(report.report_version, REPORT_VERSION);
        assert_eq!(report.producer.name, PRODUCER_NAME);
        assert_eq!(report.producer.version, ANALYTICS_VERSION);
        assert_eq!(report.producer.instance_id, "test-instance");
        assert_eq!(report.record_count, 4);
        assert_eq!(report.source_files, vec!["a.csv".to_string()]);

        let cognitive = &report.metrics[0];
        assert!(cognitive.column_present);
        assert_eq!(cognitive.distribution.bands.len(), 3);
        assert_eq!(cognitive.distribution.bands[1].count, 2);
        assert!((cognitive.distribution.bands[1].fraction - 0.5).abs() < 1e-9);
        assert!((cognitive.distribution.bands[1].pct - 50.0).abs() < 1e-9);
        assert_eq!(cognitive.thresholds.above_from, 80.0);

        let imagination = &report.metrics[1];
        assert!(!imagination.column_present);
        assert!(imagination.distribution.bands.iter().all(|b| b.pct == 0.0));

        assert_eq!(report.records.len(), 1);
        assert_eq!(report.records[0].id.as_deref(), Some("7"));
    }

    #[test]
    fn test_encode_paired_comparison_json() {
        let analysis = ComparisonAnalysis {
            mode: ComparisonMode::Paired,
            start_count: 3,
            end_count: 2,
            merged_count: Some(2),
            metrics: vec![MetricComparisonData {
                metric: Metric::Cognitive,
                start: dist(2, 1, 0, 1),
                end: dist(2, 0, 0, 2),
                delta: Some(50.0),
                trend: Some(Trend::Improved),
            }],
        };
        let json = ReportEncoder::new()
            .comparison_to_json(&analysis, &[])
            .unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed["mode"], "paired");
        assert_eq!(parsed["merged_count"], 2);
        assert_eq!(parsed["metrics"][0]["metric"], "cognitive");
        assert_eq!(parsed["metrics"][0]["trend"], "improved");
        assert_eq!(parsed["metrics"][0]["delta_pp"], 50.0);
        assert_eq!(parsed["metrics"][0]["end"]["bands"][2]["band"], "above");
    }

    #[test]
    fn test_missing_column_has_no_narrative() {
        let analysis = ComparisonAnalysis {
            mode: ComparisonMode::Independent,
            start_count: 2,
            end_count: 2,
            merged_count: None,
            metrics: vec![MetricComparisonData {
                metric: Metric::EmotionalSocial,
                start: dist(2, 0, 0, 2),
                end: Distribution::absent(2),
                delta: None,
                trend: None,
            }],
        };
        let json = ReportEncoder::new().comparison_to_json(&analysis, &[]).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        let metric = &parsed["metrics"][0];

        assert_eq!(metric["column_present"], false);
        assert!(metric["delta_pp"].is_null());
        assert!(metric["trend"].is_null());
        assert!(metric["narrative"].is_null());
        assert_eq!(metric["start"]["bands"][2]["pct"], 100.0);
    }

    #[test]
    fn test_independent_comparison_omits_merged_count() {
        let analysis = ComparisonAnalysis {
            mode: ComparisonMode::Independent,
            start_count: 1,
            end_count: 1,
            merged_count: None,
            metrics: vec![],
        };
        let json = ReportEncoder::new().comparison_to_json(&analysis, &[]).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed["mode"], "independent");
        assert!(parsed.get("merged_count").is_none());
    }

    #[test]
    fn test_narrative_by_trend() {
        assert_eq!(
            narrative(Trend::Improved, 12.345),
            "Share of children at the above-normative level rose by 12.3 pp."
        );
        assert_eq!(
            narrative(Trend::Declined, -5.0),
            "Share of children at the above-normative level fell by 5.0 pp."
        );
        assert_eq!(
            narrative(Trend::Unchanged, 0.0),
            "No change in the share of children at the above-normative level."
        );
    }
}
