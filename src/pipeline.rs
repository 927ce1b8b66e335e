//! Pipeline orchestration
//!
//! This module provides the public API for Kidski analytics.
//! It orchestrates the full pipeline from raw exports to report JSON.

use crate::aggregator::{age_breakdown, CohortAggregator};
use crate::classifier::Classifier;
use crate::config::Thresholds;
use crate::encoder::ReportEncoder;
use crate::error::AnalyticsError;
use crate::ingest::{CsvAdapter, DatasetAdapter};
use crate::types::{
    Band, ComparisonAnalysis, ComparisonMode, Dataset, Distribution, IndependentDelta, Metric,
    MetricComparisonData, PairedDelta, SingleAnalysis,
};

/// Convert a delimited export to a single-period report.
///
/// # Arguments
/// * `raw_csv` - CSV/TSV export of one diagnostic
/// * `thresholds_json` - Optional cut-point configuration; defaults apply when `None`
///
/// # Returns
/// Report JSON payload
///
/// # Example
/// ```ignore
/// let report = csv_to_report(export, None)?;
/// ```
pub fn csv_to_report(raw_csv: String, thresholds_json: Option<String>) -> Result<String, AnalyticsError> {
    let service = service_from_json(thresholds_json.as_deref())?;
    let dataset = CsvAdapter::new().parse(&raw_csv)?.dataset;

    let analysis = service.analyze_single(&dataset);
    ReportEncoder::new().single_to_json(&analysis, service.thresholds(), &[])
}

/// Convert two delimited exports to a comparison report.
///
/// # Arguments
/// * `start_csv` - Export from the start of the period
/// * `end_csv` - Export from the end of the period
/// * `mode` - Independent groups or paired cohort
/// * `thresholds_json` - Optional cut-point configuration; defaults apply when `None`
///
/// # Returns
/// Report JSON payload, or [`AnalyticsError::NoJoinMatches`] in paired mode when
/// no child appears in both exports
pub fn csv_to_comparison(
    start_csv: String,
    end_csv: String,
    mode: ComparisonMode,
    thresholds_json: Option<String>,
) -> Result<String, AnalyticsError> {
    let service = service_from_json(thresholds_json.as_deref())?;
    let adapter = CsvAdapter::new();
    let start = adapter.parse(&start_csv)?.dataset;
    let end = adapter.parse(&end_csv)?.dataset;

    let analysis = service.compare(&start, &end, mode)?;
    ReportEncoder::new().comparison_to_json(&analysis, &[])
}

fn service_from_json(thresholds_json: Option<&str>) -> Result<AnalyticsService, AnalyticsError> {
    match thresholds_json {
        Some(json) => AnalyticsService::new(Thresholds::from_json(json)?),
        None => Ok(AnalyticsService::default()),
    }
}

/// Stateless analytics service.
///
/// Holds only the cut points; every call takes its datasets as arguments and
/// returns a fresh result, so one instance can serve any number of requests.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnalyticsService {
    aggregator: CohortAggregator,
}

impl AnalyticsService {
    /// Create a service after validating the cut points
    pub fn new(thresholds: Thresholds) -> Result<Self, AnalyticsError> {
        thresholds.validate()?;
        Ok(Self {
            aggregator: CohortAggregator::new(Classifier::new(thresholds)),
        })
    }

    pub fn thresholds(&self) -> &Thresholds {
        self.aggregator.classifier().thresholds()
    }

    /// Band of a single score
    pub fn classify(&self, score: Option<f64>, metric: Metric) -> Option<Band> {
        self.aggregator.classifier().classify(score, metric)
    }

    /// Band distribution of one metric over a dataset
    pub fn distribution(&self, dataset: &Dataset, metric: Metric) -> Distribution {
        self.aggregator.distribution(dataset, metric)
    }

    /// Independent-groups comparison of one metric
    pub fn independent_delta(&self, start: &Dataset, end: &Dataset, metric: Metric) -> IndependentDelta {
        self.aggregator.independent_delta(start, end, metric)
    }

    /// Paired-cohort comparison of one metric
    pub fn paired_delta(
        &self,
        start: &Dataset,
        end: &Dataset,
        metric: Metric,
    ) -> Result<PairedDelta, AnalyticsError> {
        self.aggregator.paired_delta(start, end, metric)
    }

    /// Age breakdown and every metric's distribution for one dataset
    pub fn analyze_single(&self, dataset: &Dataset) -> SingleAnalysis {
        tracing::info!(records = dataset.len(), "analysing single diagnostic");
        SingleAnalysis {
            record_count: dataset.len(),
            age_groups: age_breakdown(dataset),
            metrics: Metric::ALL
                .into_iter()
                .map(|metric| (metric, self.distribution(dataset, metric)))
                .collect(),
            records: self.aggregator.classified_records(dataset),
        }
    }

    /// Compare two unrelated cohorts on every metric
    pub fn compare_independent(&self, start: &Dataset, end: &Dataset) -> ComparisonAnalysis {
        tracing::info!(
            start = start.len(),
            end = end.len(),
            "comparing independent groups"
        );
        ComparisonAnalysis {
            mode: ComparisonMode::Independent,
            start_count: start.len(),
            end_count: end.len(),
            merged_count: None,
            metrics: Metric::ALL
                .into_iter()
                .map(|metric| MetricComparisonData::from(self.independent_delta(start, end, metric)))
                .collect(),
        }
    }

    /// Compare the children present in both cohorts on every metric
    pub fn compare_paired(
        &self,
        start: &Dataset,
        end: &Dataset,
    ) -> Result<ComparisonAnalysis, AnalyticsError> {
        let mut metrics: Vec<MetricComparisonData> = Vec::with_capacity(Metric::ALL.len());
        let mut merged_count = 0;
        for metric in Metric::ALL {
            let delta = self.paired_delta(start, end, metric)?;
            merged_count = delta.merged_count;
            metrics.push(delta.into());
        }
        tracing::info!(
            start = start.len(),
            end = end.len(),
            merged_count,
            "compared paired cohort"
        );

        Ok(ComparisonAnalysis {
            mode: ComparisonMode::Paired,
            start_count: start.len(),
            end_count: end.len(),
            merged_count: Some(merged_count),
            metrics,
        })
    }

    /// Compare two cohorts in the requested mode
    pub fn compare(
        &self,
        start: &Dataset,
        end: &Dataset,
        mode: ComparisonMode,
    ) -> Result<ComparisonAnalysis, AnalyticsError> {
        match mode {
            ComparisonMode::Independent => Ok(self.compare_independent(start, end)),
            ComparisonMode::Paired => self.compare_paired(start, end),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CutPoints;
    use crate::types::Trend;

    fn start_csv() -> &'static str {
        "Код;Возраст;Когнитивное развитие;Воображение_итог;ЭмСоцИнтеллект\n\
         1;5-6;40;55;90\n\
         2;5-6;85;60;70\n\
         3;4-5;65;20;81\n"
    }

    fn end_csv() -> &'static str {
        "Код;Возраст;Когнитивное развитие;Воображение_итог\n\
         1;5-6;90;82\n\
         2;5-6;88;61\n"
    }

    #[test]
    fn test_csv_to_report() {
        let json = csv_to_report(start_csv().to_string(), None).unwrap();
        let payload: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(payload["record_count"], 3);
        assert_eq!(payload["age_groups"][0]["age_group"], "5-6");
        assert_eq!(payload["age_groups"][0]["count"], 2);
        assert_eq!(payload["metrics"].as_array().unwrap().len(), 3);
        assert_eq!(payload["metrics"][0]["metric"], "cognitive");
        assert_eq!(payload["metrics"][0]["column_present"], true);
    }

    #[test]
    fn test_csv_to_comparison_paired() {
        let json = csv_to_comparison(
            start_csv().to_string(),
            end_csv().to_string(),
            ComparisonMode::Paired,
            None,
        )
        .unwrap();
        let payload: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(payload["mode"], "paired");
        assert_eq!(payload["start_count"], 3);
        assert_eq!(payload["end_count"], 2);
        assert_eq!(payload["merged_count"], 2);
        assert_eq!(payload["metrics"][0]["trend"], "improved");
        assert_eq!(payload["metrics"][2]["column_present"], false);
    }

    #[test]
    fn test_csv_to_comparison_without_overlap() {
        let end = "Код;Когнитивное развитие\n99;50\n";
        let err = csv_to_comparison(
            start_csv().to_string(),
            end.to_string(),
            ComparisonMode::Paired,
            None,
        )
        .unwrap_err();

        assert!(matches!(err, AnalyticsError::NoJoinMatches { .. }));
        assert!(err.is_user_actionable());
    }

    #[test]
    fn test_invalid_thresholds_json() {
        let result = csv_to_report(start_csv().to_string(), Some("not valid json".to_string()));
        assert!(matches!(result, Err(AnalyticsError::JsonError(_))));
    }

    #[test]
    fn test_service_rejects_unordered_thresholds() {
        let thresholds = Thresholds::uniform(CutPoints::new(80.0, 50.0));
        assert!(AnalyticsService::new(thresholds).is_err());
    }

    #[test]
    fn test_compare_independent_counts_full_groups() {
        let adapter = CsvAdapter::new();
        let start = adapter.parse(start_csv()).unwrap().dataset;
        let end = adapter.parse(end_csv()).unwrap().dataset;
        let service = AnalyticsService::default();

        let analysis = service.compare(&start, &end, ComparisonMode::Independent).unwrap();

        assert_eq!(analysis.merged_count, None);
        assert_eq!(analysis.start_count, 3);
        let esi = &analysis.metrics[2];
        assert_eq!(esi.metric, Metric::EmotionalSocial);
        assert!(esi.start.column_present);
        assert!(!esi.end.column_present);
        assert!(!esi.is_comparable());
        assert_eq!(esi.delta, None);
        assert_eq!(esi.trend, None);
        assert_eq!(analysis.metrics[0].trend, Some(Trend::Improved));
    }

    #[test]
    fn test_single_report_lists_children_with_bands() {
        let json = csv_to_report(start_csv().to_string(), None).unwrap();
        let payload: serde_json::Value = serde_json::from_str(&json).unwrap();
        let rows = payload["records"].as_array().unwrap();

        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0]["id"], "1");
        assert_eq!(rows[0]["age_group"], "5-6");
        assert_eq!(rows[0]["scores"][0]["metric"], "cognitive");
        assert_eq!(rows[0]["scores"][0]["band"], "below");
        // 81 sits just above the default above-normative cut point.
        assert_eq!(rows[2]["scores"][2]["score"], 81.0);
        assert_eq!(rows[2]["scores"][2]["band"], "above");
    }

    #[test]
    fn test_classify_through_service() {
        let service = AnalyticsService::default();
        assert_eq!(service.classify(Some(80.0), Metric::Cognitive), Some(Band::Above));
        assert_eq!(service.classify(None, Metric::Cognitive), None);
    }
}
