//! End-to-end conversion: input file → decode → `Table` → encode → output file.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use chrono::Local;
use tracing::{debug, info, instrument};

use dbtools_shared::{ConvertOptions, DbToolsError, Format, Result, Table};
use dbtools_sql::DumpHeader;

/// One conversion to run.
#[derive(Debug, Clone)]
pub struct ConvertJob {
    /// File to read.
    pub input: PathBuf,
    /// File to write (overwritten if present).
    pub output: PathBuf,
    /// Format of `input`.
    pub from: Format,
    /// Format of `output`.
    pub to: Format,
    /// Rendering and parsing options.
    pub options: ConvertOptions,
    /// Tool name and version, written into SQL dump headers.
    pub signature: String,
}

/// Result of a finished conversion.
#[derive(Debug)]
pub struct ConvertReport {
    /// Name of the converted table.
    pub table: String,
    /// Number of columns.
    pub fields: usize,
    /// Number of records written.
    pub records: usize,
    /// Total elapsed time.
    pub elapsed: Duration,
}

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called when the conversion completes.
    fn done(&self, report: &ConvertReport);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn done(&self, _report: &ConvertReport) {}
}

/// Check that `input` and `output` carry the extensions of their formats.
pub fn check_extensions(input: &Path, output: &Path, from: Format, to: Format) -> Result<()> {
    if !has_extension(input, from) {
        return Err(DbToolsError::Extension {
            role: "Input",
            path: input.to_path_buf(),
            expected: from.label(),
        });
    }
    if !has_extension(output, to) {
        return Err(DbToolsError::Extension {
            role: "Output",
            path: output.to_path_buf(),
            expected: to.label(),
        });
    }
    Ok(())
}

fn has_extension(path: &Path, format: Format) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(format.extension()))
}

/// Run one conversion.
///
/// 1. Check file extensions (unless disabled)
/// 2. Read the input
/// 3. Decode into a table
/// 4. Encode in the target format
/// 5. Write the output
#[instrument(skip_all, fields(input = %job.input.display(), output = %job.output.display()))]
pub async fn convert(job: &ConvertJob, progress: &dyn ProgressReporter) -> Result<ConvertReport> {
    let start = Instant::now();
    info!(from = %job.from, to = %job.to, "starting conversion");

    if job.options.check_extensions {
        check_extensions(&job.input, &job.output, job.from, job.to)?;
    }

    // --- Phase 1: Read ---
    progress.phase("Reading input");
    let text = tokio::fs::read_to_string(&job.input)
        .await
        .map_err(|e| DbToolsError::io(&job.input, e))?;

    // --- Phase 2: Decode ---
    progress.phase("Decoding");
    let table = decode(&text, job)?;
    debug!(
        table = %table.name,
        fields = table.fields.len(),
        records = table.len(),
        "decoded input"
    );

    // --- Phase 3: Encode ---
    progress.phase("Encoding");
    let rendered = encode(&table, job)?;

    // --- Phase 4: Write ---
    progress.phase("Writing output");
    tokio::fs::write(&job.output, rendered)
        .await
        .map_err(|e| DbToolsError::io(&job.output, e))?;

    let report = ConvertReport {
        table: table.name.clone(),
        fields: table.fields.len(),
        records: table.len(),
        elapsed: start.elapsed(),
    };

    info!(
        table = %report.table,
        records = report.records,
        elapsed_ms = report.elapsed.as_millis() as u64,
        "conversion complete"
    );

    progress.done(&report);
    Ok(report)
}

/// Table name for formats that do not carry one: `--table`, else the input
/// file stem.
fn table_name(job: &ConvertJob) -> String {
    job.options.table.clone().unwrap_or_else(|| {
        job.input
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "data".to_string())
    })
}

fn decode(text: &str, job: &ConvertJob) -> Result<Table> {
    match job.from {
        Format::Csv => dbtools_csv::read_table(text, &table_name(job), &job.options),
        Format::MongoJson => dbtools_mongo::read_table(text, &table_name(job), &job.options),
        Format::Sql => {
            let tables = dbtools_sql::parse_dump(text)?;
            dbtools_sql::select_table(tables, job.options.table.as_deref())
        }
    }
}

fn encode(table: &Table, job: &ConvertJob) -> Result<String> {
    match job.to {
        Format::Csv => dbtools_csv::write_table(table, &job.options),
        Format::MongoJson => Ok(dbtools_mongo::write_table(table, &job.options)),
        Format::Sql => {
            let header = DumpHeader {
                source: job.from.description().to_string(),
                input: job.input.display().to_string(),
                output: job.output.display().to_string(),
                signature: job.signature.clone(),
                generated_at: Local::now(),
            };
            dbtools_sql::write_dump(table, &job.options, Some(&header))
        }
    }
}
