//! Kidski Analytics - Normative band analytics for child-development diagnostics
//!
//! Kidski turns assessment exports into renderer-ready reports through a
//! deterministic pipeline: export ingestion (CSV/TSV or spreadsheet) → band classification → cohort
//! aggregation → report encoding.
//!
//! ## Modes
//!
//! - **Single report**: age breakdown and per-metric band distributions for one diagnostic
//! - **Independent comparison**: start and end cohorts treated as unrelated groups
//! - **Paired comparison**: only children present in both cohorts, matched by identifier

pub mod aggregator;
pub mod classifier;
pub mod config;
pub mod encoder;
pub mod error;
pub mod ingest;
pub mod naming;
pub mod pipeline;
pub mod types;

// FFI bindings for C interop (always available for cdylib/staticlib builds)
pub mod ffi;

pub use config::{CutPoints, Thresholds};
pub use error::AnalyticsError;
pub use ingest::{CsvAdapter, DatasetAdapter, IngestSummary, WorkbookAdapter};
pub use pipeline::{csv_to_comparison, csv_to_report, AnalyticsService};
pub use types::{Band, ComparisonMode, Dataset, Distribution, Metric, Record, Trend};

/// Crate version embedded in all reports
pub const ANALYTICS_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for report payloads
pub const PRODUCER_NAME: &str = "kidski-analytics";
