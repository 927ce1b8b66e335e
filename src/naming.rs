//! Report file naming
//!
//! Exports are named after the group they describe, e.g. `12-3 diagnostics.csv`.
//! The leading `<digits>-<digits>` pair is carried over to the report name.

use crate::types::ComparisonMode;
use regex::Regex;
use std::sync::OnceLock;

/// Fallback prefix for single-period reports
pub const SINGLE_FALLBACK: &str = "Results";

/// Fallback prefix for comparison reports
pub const COMPARISON_FALLBACK: &str = "Report";

static GROUP_PREFIX: OnceLock<Regex> = OnceLock::new();

fn group_prefix() -> &'static Regex {
    GROUP_PREFIX.get_or_init(|| Regex::new(r"^(\d+)-(\d+)").expect("constant pattern compiles"))
}

/// Leading `<digits>-<digits>` of a file name, or `fallback`
pub fn report_prefix(file_name: &str, fallback: &str) -> String {
    match group_prefix().captures(file_name) {
        Some(caps) => format!("{}-{}", &caps[1], &caps[2]),
        None => fallback.to_string(),
    }
}

/// Report file name for a single-period upload
pub fn single_report_name(source: &str) -> String {
    format!("{}_results.json", report_prefix(source, SINGLE_FALLBACK))
}

/// Report file name for a comparison; the start file names the report
pub fn comparison_report_name(start_source: &str, mode: ComparisonMode) -> String {
    let prefix = report_prefix(start_source, COMPARISON_FALLBACK);
    match mode {
        ComparisonMode::Paired => format!("{prefix}_comparison.json"),
        ComparisonMode::Independent => format!("{prefix}_comparison_full_group.json"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefix_from_group_name() {
        assert_eq!(report_prefix("12-3 диагностика.csv", "X"), "12-3");
        assert_eq!(report_prefix("7-15.csv", "X"), "7-15");
    }

    #[test]
    fn test_prefix_must_lead() {
        assert_eq!(report_prefix("group 12-3.csv", "X"), "X");
        assert_eq!(report_prefix("", "X"), "X");
    }

    #[test]
    fn test_pattern_compiled_once() {
        assert!(std::ptr::eq(group_prefix(), group_prefix()));
        assert_eq!(report_prefix("4-2 конец.xlsx", "X"), "4-2");
    }

    #[test]
    fn test_report_names() {
        assert_eq!(single_report_name("4-2.csv"), "4-2_results.json");
        assert_eq!(single_report_name("data.csv"), "Results_results.json");
        assert_eq!(
            comparison_report_name("4-2 start.csv", ComparisonMode::Paired),
            "4-2_comparison.json"
        );
        assert_eq!(
            comparison_report_name("start.csv", ComparisonMode::Independent),
            "Report_comparison_full_group.json"
        );
    }
}
