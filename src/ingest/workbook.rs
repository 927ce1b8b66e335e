//! Spreadsheet adapter
//!
//! Reads XLSX/XLS/ODS exports. The first worksheet is used unless a sheet is
//! named; its first row is the header.

use calamine::{open_workbook_auto_from_rs, Data, Reader};
use std::io::Cursor;

use crate::error::AnalyticsError;

use super::table::TableBuilder;
use super::{DatasetAdapter, Ingested};

/// File extensions read through [`WorkbookAdapter`]
pub const WORKBOOK_EXTENSIONS: &[&str] = &["xlsx", "xlsm", "xlsb", "xls", "ods"];

/// Spreadsheet export adapter
#[derive(Debug, Clone, Default)]
pub struct WorkbookAdapter {
    sheet: Option<String>,
}

impl WorkbookAdapter {
    /// Adapter that reads the first worksheet
    pub fn new() -> Self {
        Self::default()
    }

    /// Adapter that reads the named worksheet
    pub fn with_sheet(sheet: impl Into<String>) -> Self {
        Self {
            sheet: Some(sheet.into()),
        }
    }
}

impl DatasetAdapter for WorkbookAdapter {
    type Input = [u8];

    fn parse(&self, raw: &[u8]) -> Result<Ingested, AnalyticsError> {
        let mut workbook = open_workbook_auto_from_rs(Cursor::new(raw))?;
        let range = match &self.sheet {
            Some(name) => workbook.worksheet_range(name)?,
            None => match workbook.worksheet_range_at(0) {
                Some(range) => range?,
                None => return Err(AnalyticsError::MissingHeader),
            },
        };

        let mut rows = range.rows();
        let Some(header) = rows.next() else {
            return Err(AnalyticsError::MissingHeader);
        };
        let headers: Vec<String> = header.iter().map(cell_text).collect();
        let mut table = TableBuilder::new(&headers)?;

        for row in rows {
            let cells: Vec<String> = row.iter().map(cell_text).collect();
            table.push_row(&cells);
        }

        let ingested = table.finish();
        tracing::debug!(
            rows = ingested.summary.rows,
            sheet = self.sheet.as_deref().unwrap_or("<first>"),
            missing_columns = ?ingested.summary.missing_columns,
            "parsed workbook export"
        );

        Ok(ingested)
    }
}

/// Cell content as the text a delimited export would carry
fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Float(f) => f.to_string(),
        Data::Int(i) => i.to_string(),
        other => other.to_string(),
    }
}
