//! Delimited-text adapter
//!
//! Parses CSV/TSV assessment exports and maps them to datasets.

use crate::error::AnalyticsError;

use super::table::TableBuilder;
use super::{DatasetAdapter, Ingested};

/// Delimiters tried when none is forced, in tie-break order
const CANDIDATE_DELIMITERS: [u8; 3] = [b',', b';', b'\t'];

/// CSV/TSV export adapter
#[derive(Debug, Clone, Copy, Default)]
pub struct CsvAdapter {
    delimiter: Option<u8>,
}

impl CsvAdapter {
    /// Adapter that sniffs the delimiter from the header line
    pub fn new() -> Self {
        Self::default()
    }

    /// Adapter with a fixed delimiter
    pub fn with_delimiter(delimiter: u8) -> Self {
        Self {
            delimiter: Some(delimiter),
        }
    }
}

impl DatasetAdapter for CsvAdapter {
    type Input = str;

    fn parse(&self, raw: &str) -> Result<Ingested, AnalyticsError> {
        let raw = raw.strip_prefix('\u{feff}').unwrap_or(raw);
        let delimiter = self.delimiter.unwrap_or_else(|| detect_delimiter(raw));

        let mut reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(raw.as_bytes());

        let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
        let mut table = TableBuilder::new(&headers)?;

        for row in reader.records() {
            let row = row?;
            let cells: Vec<&str> = row.iter().collect();
            table.push_row(&cells);
        }

        let ingested = table.finish();
        tracing::debug!(
            rows = ingested.summary.rows,
            delimiter = %(delimiter as char).escape_default(),
            missing_columns = ?ingested.summary.missing_columns,
            "parsed delimited export"
        );

        Ok(ingested)
    }
}

/// Pick the candidate delimiter that occurs most often on the header line
fn detect_delimiter(raw: &str) -> u8 {
    let header = raw.lines().next().unwrap_or_default();
    let mut best = (b',', 0usize);
    for candidate in CANDIDATE_DELIMITERS {
        let count = header.bytes().filter(|b| *b == candidate).count();
        if count > best.1 {
            best = (candidate, count);
        }
    }
    best.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::InvalidScoreCount;
    use crate::types::Metric;
    use pretty_assertions::assert_eq;

    const EXPORT: &str = "Код;Возраст;Когнитивное развитие;Воображение_итог;ЭмСоцИнтеллект\n\
                          17;5-6;45,5;80;92\n\
                          18.0;5-6;н/д;55;\n\
                          ;4-5;81;12;60\n";

    #[test]
    fn test_parse_semicolon_export() {
        let ingested = CsvAdapter::new().parse(EXPORT).unwrap();
        let records = ingested.dataset.records();

        assert_eq!(records.len(), 3);
        assert_eq!(records[0].id.as_deref(), Some("17"));
        assert_eq!(records[0].age_group.as_deref(), Some("5-6"));
        assert_eq!(records[0].score(Metric::Cognitive), Some(45.5));
        assert_eq!(records[1].id.as_deref(), Some("18"));
        assert_eq!(records[1].score(Metric::Cognitive), None);
        assert_eq!(records[1].score(Metric::EmotionalSocial), None);
        assert_eq!(records[2].id, None);

        let summary = &ingested.summary;
        assert_eq!(summary.rows, 3);
        assert_eq!(
            summary.invalid_scores,
            vec![InvalidScoreCount {
                metric: Metric::Cognitive,
                count: 1
            }]
        );
        assert!(summary.missing_columns.is_empty());
        assert_eq!(summary.rows_without_identifier, 1);
    }

    #[test]
    fn test_missing_metric_column_recorded() {
        let raw = "id,age,cognitive\n1,5-6,70\n";
        let ingested = CsvAdapter::new().parse(raw).unwrap();

        assert!(ingested.dataset.has_metric(Metric::Cognitive));
        assert!(!ingested.dataset.has_metric(Metric::Imagination));
        assert_eq!(
            ingested.summary.missing_columns,
            vec![Metric::Imagination, Metric::EmotionalSocial]
        );
    }

    #[test]
    fn test_tab_delimited_with_bom_and_blank_rows() {
        let raw = "\u{feff}ID\tCOGNITIVE\n1\t90\n\t\n2\t10\n";
        let ingested = CsvAdapter::new().parse(raw).unwrap();

        assert_eq!(ingested.dataset.len(), 2);
        assert_eq!(ingested.dataset.records()[1].score(Metric::Cognitive), Some(10.0));
    }

    #[test]
    fn test_ragged_rows_read_leniently() {
        let raw = "id,cognitive,imagination\n1,90\n";
        let ingested = CsvAdapter::new().parse(raw).unwrap();
        let record = &ingested.dataset.records()[0];

        assert_eq!(record.score(Metric::Cognitive), Some(90.0));
        assert_eq!(record.score(Metric::Imagination), None);
    }

    #[test]
    fn test_empty_input_has_no_header() {
        let err = CsvAdapter::new().parse("").unwrap_err();
        assert!(matches!(err, AnalyticsError::MissingHeader));
    }

    #[test]
    fn test_header_only_is_empty_dataset() {
        let ingested = CsvAdapter::new().parse("id,cognitive\n").unwrap();
        assert!(ingested.dataset.is_empty());
    }

    #[test]
    fn test_forced_delimiter() {
        let raw = "id|cognitive\n1|55\n";
        let ingested = CsvAdapter::with_delimiter(b'|').parse(raw).unwrap();
        assert_eq!(ingested.dataset.records()[0].score(Metric::Cognitive), Some(55.0));
    }

    #[test]
    fn test_detect_delimiter() {
        assert_eq!(detect_delimiter("a;b;c\n1,5;2;3"), b';');
        assert_eq!(detect_delimiter("a\tb\n"), b'\t');
        assert_eq!(detect_delimiter("single"), b',');
    }
}
