//! Kidski CLI - Command-line interface for Kidski analytics
//!
//! Commands:
//! - report: Analyse one diagnostic export
//! - compare: Compare start and end exports (independent or paired)
//! - validate: Check how an export will be read
//! - thresholds: Print the effective cut-point configuration

use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use kidski_analytics::encoder::ReportEncoder;
use kidski_analytics::ingest::{
    CsvAdapter, DatasetAdapter, Ingested, WorkbookAdapter, WORKBOOK_EXTENSIONS,
};
use kidski_analytics::naming::{comparison_report_name, single_report_name};
use kidski_analytics::{AnalyticsError, AnalyticsService, ComparisonMode, Thresholds};
use kidski_analytics::ANALYTICS_VERSION;

/// Kidski - Normative band analytics for child-development diagnostics
#[derive(Parser)]
#[command(name = "kidski")]
#[command(author = "Kidski Analytics Team")]
#[command(version = ANALYTICS_VERSION)]
#[command(about = "Classify diagnostic scores into normative bands and compare cohorts", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyse one diagnostic export
    Report {
        /// CSV/TSV or XLSX/XLS/ODS export (use - for CSV on stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Output file or directory (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,

        /// Cut-point configuration (JSON)
        #[arg(long)]
        thresholds: Option<PathBuf>,

        /// Field delimiter for CSV/TSV (detected from the header when omitted)
        #[arg(long)]
        delimiter: Option<char>,

        /// Output format
        #[arg(long, default_value = "json-pretty")]
        format: OutputFormat,
    },

    /// Compare start-of-period and end-of-period exports
    Compare {
        /// Start-of-period export (CSV/TSV or XLSX/XLS/ODS)
        #[arg(long)]
        start: PathBuf,

        /// End-of-period export (CSV/TSV or XLSX/XLS/ODS)
        #[arg(long)]
        end: PathBuf,

        /// Comparison mode
        #[arg(long, value_enum)]
        mode: ModeArg,

        /// Output file or directory (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,

        /// Cut-point configuration (JSON)
        #[arg(long)]
        thresholds: Option<PathBuf>,

        /// Field delimiter (detected from the header when omitted)
        #[arg(long)]
        delimiter: Option<char>,

        /// Output format
        #[arg(long, default_value = "json-pretty")]
        format: OutputFormat,
    },

    /// Check how an export will be read
    Validate {
        /// CSV/TSV or XLSX/XLS/ODS export (use - for CSV on stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Field delimiter (detected from the header when omitted)
        #[arg(long)]
        delimiter: Option<char>,

        /// Output validation report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the effective cut-point configuration
    Thresholds {
        /// Cut-point configuration to check (defaults are printed when omitted)
        #[arg(long)]
        file: Option<PathBuf>,
    },
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Compact JSON
    Json,
    /// Pretty-printed JSON
    JsonPretty,
}

#[derive(Clone, Copy, ValueEnum)]
enum ModeArg {
    /// Whole groups at each point, no per-child matching
    Independent,
    /// Only children present in both exports, matched by identifier
    Paired,
}

impl From<ModeArg> for ComparisonMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Independent => ComparisonMode::Independent,
            ModeArg::Paired => ComparisonMode::Paired,
        }
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e))
                    .unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), KidskiCliError> {
    match cli.command {
        Commands::Report {
            input,
            output,
            thresholds,
            delimiter,
            format,
        } => cmd_report(&input, &output, thresholds.as_deref(), delimiter, format),

        Commands::Compare {
            start,
            end,
            mode,
            output,
            thresholds,
            delimiter,
            format,
        } => cmd_compare(
            &start,
            &end,
            mode.into(),
            &output,
            thresholds.as_deref(),
            delimiter,
            format,
        ),

        Commands::Validate {
            input,
            delimiter,
            json,
        } => cmd_validate(&input, delimiter, json),

        Commands::Thresholds { file } => cmd_thresholds(file.as_deref()),
    }
}

fn cmd_report(
    input: &Path,
    output: &Path,
    thresholds: Option<&Path>,
    delimiter: Option<char>,
    format: OutputFormat,
) -> Result<(), KidskiCliError> {
    let service = load_service(thresholds)?;
    let ingested = read_export(input, delimiter)?;

    let analysis = service.analyze_single(&ingested.dataset);
    let report = ReportEncoder::new().encode_single(
        &analysis,
        service.thresholds(),
        &[display_name(input)],
    );

    let rendered = format_output(&report, &format)?;
    write_output(output, &single_report_name(&display_name(input)), &rendered)
}

#[allow(clippy::too_many_arguments)]
fn cmd_compare(
    start: &Path,
    end: &Path,
    mode: ComparisonMode,
    output: &Path,
    thresholds: Option<&Path>,
    delimiter: Option<char>,
    format: OutputFormat,
) -> Result<(), KidskiCliError> {
    if start.to_string_lossy() == "-" && end.to_string_lossy() == "-" {
        return Err(KidskiCliError::BothFromStdin);
    }

    let service = load_service(thresholds)?;
    let start_data = read_export(start, delimiter)?;
    let end_data = read_export(end, delimiter)?;

    let analysis = service.compare(&start_data.dataset, &end_data.dataset, mode)?;
    let report = ReportEncoder::new()
        .encode_comparison(&analysis, &[display_name(start), display_name(end)]);

    let rendered = format_output(&report, &format)?;
    write_output(
        output,
        &comparison_report_name(&display_name(start), mode),
        &rendered,
    )
}

fn cmd_validate(input: &Path, delimiter: Option<char>, json: bool) -> Result<(), KidskiCliError> {
    let ingested = read_export(input, delimiter)?;
    let summary = &ingested.summary;

    let report = ValidationReport {
        file: display_name(input),
        rows: summary.rows,
        has_identifier_column: summary.has_identifier_column,
        has_age_column: summary.has_age_column,
        rows_without_identifier: summary.rows_without_identifier,
        missing_columns: summary
            .missing_columns
            .iter()
            .map(|m| m.as_str().to_string())
            .collect(),
        invalid_scores: summary
            .invalid_scores
            .iter()
            .map(|c| InvalidScoreDetail {
                metric: c.metric.as_str().to_string(),
                count: c.count,
            })
            .collect(),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Validation Report");
        println!("=================");
        println!("File:             {}", report.file);
        println!("Rows:             {}", report.rows);
        println!(
            "Identifier:       {}",
            if report.has_identifier_column { "present" } else { "missing (paired comparison unavailable)" }
        );
        println!(
            "Age group:        {}",
            if report.has_age_column { "present" } else { "missing" }
        );
        println!("Rows without id:  {}", report.rows_without_identifier);

        if !report.missing_columns.is_empty() {
            println!("\nMissing metric columns (reported as zero):");
            for metric in &report.missing_columns {
                println!("  - {}", metric);
            }
        }

        if !report.invalid_scores.is_empty() {
            println!("\nNon-numeric scores (treated as missing):");
            for detail in &report.invalid_scores {
                println!("  - {}: {}", detail.metric, detail.count);
            }
        }
    }

    if report.rows == 0 {
        Err(KidskiCliError::EmptyExport)
    } else {
        Ok(())
    }
}

fn cmd_thresholds(file: Option<&Path>) -> Result<(), KidskiCliError> {
    let service = load_service(file)?;
    println!("{}", service.thresholds().to_json()?);
    Ok(())
}

// Helper functions

fn load_service(thresholds: Option<&Path>) -> Result<AnalyticsService, KidskiCliError> {
    let thresholds = match thresholds {
        Some(path) => Thresholds::from_json(&fs::read_to_string(path)?)?,
        None => Thresholds::default(),
    };
    Ok(AnalyticsService::new(thresholds)?)
}

fn read_export(input: &Path, delimiter: Option<char>) -> Result<Ingested, KidskiCliError> {
    if is_workbook(input) {
        let bytes = fs::read(input)?;
        return Ok(WorkbookAdapter::new().parse(&bytes)?);
    }

    let data = if input.to_string_lossy() == "-" {
        if atty::is(atty::Stream::Stdin) {
            return Err(KidskiCliError::StdinIsTerminal);
        }
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        buffer
    } else {
        fs::read_to_string(input)?
    };

    let adapter = match delimiter {
        Some(d) if d.is_ascii() => CsvAdapter::with_delimiter(d as u8),
        Some(d) => return Err(KidskiCliError::InvalidDelimiter(d)),
        None => CsvAdapter::new(),
    };
    Ok(adapter.parse(&data)?)
}

fn is_workbook(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| WORKBOOK_EXTENSIONS.iter().any(|w| ext.eq_ignore_ascii_case(w)))
        .unwrap_or(false)
}

fn display_name(path: &Path) -> String {
    if path.to_string_lossy() == "-" {
        return "stdin".to_string();
    }
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}

fn format_output<T: Serialize>(report: &T, format: &OutputFormat) -> Result<String, KidskiCliError> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string(report)? + "\n"),
        OutputFormat::JsonPretty => Ok(serde_json::to_string_pretty(report)? + "\n"),
    }
}

/// Write to stdout, to a file, or to `dir/default_name` when `output` is a directory
fn write_output(output: &Path, default_name: &str, data: &str) -> Result<(), KidskiCliError> {
    if output.to_string_lossy() == "-" {
        print!("{}", data);
        return Ok(());
    }
    let target = if output.is_dir() {
        output.join(default_name)
    } else {
        output.to_path_buf()
    };
    fs::write(&target, data)?;
    tracing::info!(path = %target.display(), "report written");
    Ok(())
}

// Error types

#[derive(Debug)]
enum KidskiCliError {
    Io(io::Error),
    Analytics(AnalyticsError),
    Json(serde_json::Error),
    StdinIsTerminal,
    BothFromStdin,
    InvalidDelimiter(char),
    EmptyExport,
}

impl From<io::Error> for KidskiCliError {
    fn from(e: io::Error) -> Self {
        KidskiCliError::Io(e)
    }
}

impl From<AnalyticsError> for KidskiCliError {
    fn from(e: AnalyticsError) -> Self {
        KidskiCliError::Analytics(e)
    }
}

impl From<serde_json::Error> for KidskiCliError {
    fn from(e: serde_json::Error) -> Self {
        KidskiCliError::Json(e)
    }
}

#[derive(Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<KidskiCliError> for CliError {
    fn from(e: KidskiCliError) -> Self {
        match e {
            KidskiCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            KidskiCliError::Analytics(e) => analytics_error(e),
            KidskiCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: None,
            },
            KidskiCliError::StdinIsTerminal => CliError {
                code: "NO_INPUT".to_string(),
                message: "stdin is a terminal, nothing to read".to_string(),
                hint: Some("Pipe an export into the command or pass a file path".to_string()),
            },
            KidskiCliError::BothFromStdin => CliError {
                code: "NO_INPUT".to_string(),
                message: "Start and end exports cannot both be read from stdin".to_string(),
                hint: Some("Pass at least one export as a file path".to_string()),
            },
            KidskiCliError::InvalidDelimiter(d) => CliError {
                code: "INVALID_DELIMITER".to_string(),
                message: format!("Delimiter {:?} is not a single-byte character", d),
                hint: Some("Use one of , ; or a tab".to_string()),
            },
            KidskiCliError::EmptyExport => CliError {
                code: "EMPTY_EXPORT".to_string(),
                message: "Export contains no data rows".to_string(),
                hint: Some("Ensure the file is the full diagnostic export".to_string()),
            },
        }
    }
}

fn analytics_error(e: AnalyticsError) -> CliError {
    let (code, hint) = match &e {
        AnalyticsError::NoJoinMatches { .. } => (
            "NO_JOIN_MATCHES",
            Some("Check that both exports have a child code column (Код) with the same codes, or use --mode independent"),
        ),
        AnalyticsError::MissingHeader => (
            "MISSING_HEADER",
            Some("The first line of the export must contain column names"),
        ),
        AnalyticsError::Csv(_) => (
            "UNREADABLE_FILE",
            Some("Save the export as CSV (UTF-8) or XLSX and retry"),
        ),
        AnalyticsError::Workbook(_) => (
            "UNREADABLE_FILE",
            Some("Check that the file is an Excel or ODS workbook with the data on its first sheet"),
        ),
        AnalyticsError::InvalidThresholds { .. } => (
            "INVALID_THRESHOLDS",
            Some("Run 'kidski thresholds' for the expected shape"),
        ),
        AnalyticsError::JsonError(_) => ("JSON_ERROR", Some("Check JSON syntax")),
    };
    CliError {
        code: code.to_string(),
        message: e.to_string(),
        hint: hint.map(str::to_string),
    }
}

// Report types

#[derive(Serialize)]
struct ValidationReport {
    file: String,
    rows: usize,
    has_identifier_column: bool,
    has_age_column: bool,
    rows_without_identifier: usize,
    missing_columns: Vec<String>,
    invalid_scores: Vec<InvalidScoreDetail>,
}

#[derive(Serialize)]
struct InvalidScoreDetail {
    metric: String,
    count: usize,
}
