//! Cohort aggregation
//!
//! This module turns classified records into distributional summaries:
//! - Per-metric band distributions over a whole cohort
//! - Independent-groups deltas between two unrelated cohorts
//! - Paired-cohort deltas over children present in both cohorts
//! - Age-group breakdown
//! - Per-child band table

use crate::classifier::Classifier;
use crate::error::AnalyticsError;
use crate::types::{
    AgeGroupCount, Band, ClassifiedRecord, ComparisonMode, Dataset, Distribution,
    IndependentDelta, Metric, PairedDelta, Record, ScoredMetric, Trend,
};
use std::collections::HashMap;

/// Aggregator for computing band distributions and deltas
#[derive(Debug, Clone, Copy, Default)]
pub struct CohortAggregator {
    classifier: Classifier,
}

impl CohortAggregator {
    pub fn new(classifier: Classifier) -> Self {
        Self { classifier }
    }

    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    /// Band distribution of `metric` over the whole dataset.
    ///
    /// The denominator is the dataset's record count, so records with a missing
    /// score lower every band's share rather than being dropped.
    pub fn distribution(&self, dataset: &Dataset, metric: Metric) -> Distribution {
        if !dataset.has_metric(metric) {
            tracing::warn!(%metric, "metric column absent, distribution zero-filled");
            return Distribution::absent(dataset.len());
        }
        self.distribution_of(dataset.records().iter(), metric)
    }

    /// Compare two unrelated cohorts, each over its own full population
    pub fn independent_delta(
        &self,
        start: &Dataset,
        end: &Dataset,
        metric: Metric,
    ) -> IndependentDelta {
        let start_dist = self.distribution(start, metric);
        let end_dist = self.distribution(end, metric);
        let delta = above_delta(metric, &start_dist, &end_dist);

        IndependentDelta {
            metric,
            start: start_dist,
            end: end_dist,
            delta,
            trend: delta.map(Trend::from_delta),
        }
    }

    /// Compare the children present in both cohorts, matched by identifier.
    ///
    /// Fails with [`AnalyticsError::NoJoinMatches`] when no identifier occurs on
    /// both sides.
    pub fn paired_delta(
        &self,
        start: &Dataset,
        end: &Dataset,
        metric: Metric,
    ) -> Result<PairedDelta, AnalyticsError> {
        let pairs = join_on_identifier(start, end);
        if pairs.is_empty() {
            return Err(AnalyticsError::NoJoinMatches {
                metric,
                mode: ComparisonMode::Paired,
            });
        }
        let merged_count = pairs.len();

        let start_dist = if start.has_metric(metric) {
            self.distribution_of(pairs.iter().map(|(s, _)| *s), metric)
        } else {
            Distribution::absent(merged_count)
        };
        let end_dist = if end.has_metric(metric) {
            self.distribution_of(pairs.iter().map(|(_, e)| *e), metric)
        } else {
            Distribution::absent(merged_count)
        };
        let delta = above_delta(metric, &start_dist, &end_dist);

        tracing::debug!(%metric, merged_count, ?delta, "paired delta computed");

        Ok(PairedDelta {
            metric,
            merged_count,
            start: start_dist,
            end: end_dist,
            delta,
            trend: delta.map(Trend::from_delta),
        })
    }

    /// Every record with its score and band for each metric column present
    pub fn classified_records(&self, dataset: &Dataset) -> Vec<ClassifiedRecord> {
        let present: Vec<Metric> = Metric::ALL
            .into_iter()
            .filter(|m| dataset.has_metric(*m))
            .collect();

        dataset
            .records()
            .iter()
            .map(|record| ClassifiedRecord {
                id: record.id.clone(),
                age_group: record.age_group.clone(),
                scores: present
                    .iter()
                    .map(|&metric| {
                        let score = record.score(metric);
                        ScoredMetric {
                            metric,
                            score,
                            band: self.classifier.classify(score, metric),
                        }
                    })
                    .collect(),
            })
            .collect()
    }

    fn distribution_of<'a, I>(&self, records: I, metric: Metric) -> Distribution
    where
        I: Iterator<Item = &'a Record>,
    {
        let mut dist = Distribution {
            total: 0,
            below: 0,
            normative: 0,
            above: 0,
            column_present: true,
        };
        for record in records {
            dist.total += 1;
            match self.classifier.classify(record.score(metric), metric) {
                Some(Band::Below) => dist.below += 1,
                Some(Band::Normative) => dist.normative += 1,
                Some(Band::Above) => dist.above += 1,
                None => {}
            }
        }
        dist
    }
}

/// Percentage-point change in the above-normative share, end minus start.
///
/// A zero-filled side carries no data, so there is nothing to compare.
fn above_delta(metric: Metric, start: &Distribution, end: &Distribution) -> Option<f64> {
    if !start.column_present || !end.column_present {
        tracing::warn!(%metric, "metric column missing from one cohort, no trend reported");
        return None;
    }
    Some(end.pct(Band::Above) - start.pct(Band::Above))
}

/// Inner join of two cohorts on child identifier.
///
/// Records without an identifier never match. Duplicate identifiers yield one
/// pair per matching combination, in start-record order.
pub fn join_on_identifier<'a>(start: &'a Dataset, end: &'a Dataset) -> Vec<(&'a Record, &'a Record)> {
    let mut by_id: HashMap<&str, Vec<&Record>> = HashMap::new();
    for record in end.records() {
        if let Some(id) = record.id.as_deref() {
            by_id.entry(id).or_default().push(record);
        }
    }

    let mut pairs = Vec::new();
    for record in start.records() {
        let Some(id) = record.id.as_deref() else {
            continue;
        };
        if let Some(matches) = by_id.get(id) {
            for matched in matches {
                pairs.push((record, *matched));
            }
        }
    }
    pairs
}

/// Number of children per age group, largest group first.
///
/// Records without an age group are not counted.
pub fn age_breakdown(dataset: &Dataset) -> Vec<AgeGroupCount> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for record in dataset.records() {
        if let Some(age) = record.age_group.as_deref() {
            *counts.entry(age).or_insert(0) += 1;
        }
    }

    let mut groups: Vec<AgeGroupCount> = counts
        .into_iter()
        .map(|(age_group, count)| AgeGroupCount {
            age_group: age_group.to_string(),
            count,
        })
        .collect();
    groups.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.age_group.cmp(&b.age_group)));
    groups
}
