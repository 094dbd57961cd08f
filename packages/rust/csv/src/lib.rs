//! CSV reading with per-cell type inference, and CSV writing.
//!
//! The first record is the header. Cells are typed with [`Value::infer`], so a
//! CSV column can carry ObjectIds (`ObjectId(...)`), timestamps, numbers and
//! booleans through to the other formats.

use tracing::{debug, instrument};

use dbtools_shared::{
    ConvertOptions, DbToolsError, Result, Table, Value, format_number, mongo_timestamp,
};

// ---------------------------------------------------------------------------
// Reader
// ---------------------------------------------------------------------------

/// Parse CSV text into a table named `name`.
///
/// Short records are padded with `Null`; records with more cells than the
/// header are rejected.
#[instrument(skip(text, opts), fields(len = text.len()))]
pub fn read_table(text: &str, name: &str, opts: &ConvertOptions) -> Result<Table> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(opts.separator_byte()?)
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_reader(text.as_bytes());

    let fields: Vec<String> = reader
        .headers()
        .map_err(|e| DbToolsError::parse(format!("CSV header: {e}")))?
        .iter()
        .map(str::to_string)
        .collect();

    if fields.iter().all(|f| f.is_empty()) {
        return Err(DbToolsError::parse("CSV header row is empty"));
    }

    let mut table = Table::new(name, fields);
    let width = table.fields.len();

    for (i, record) in reader.records().enumerate() {
        let record =
            record.map_err(|e| DbToolsError::parse(format!("CSV record {}: {e}", i + 1)))?;

        if record.len() > width {
            return Err(DbToolsError::parse(format!(
                "CSV record {} has {} cells but the header has {width}",
                i + 1,
                record.len()
            )));
        }

        let mut row: Vec<Value> = record.iter().map(Value::infer).collect();
        row.resize(width, Value::Null);
        table.push_row(row)?;
    }

    debug!(fields = width, records = table.len(), "CSV parsed");
    Ok(table)
}

// ---------------------------------------------------------------------------
// Writer
// ---------------------------------------------------------------------------

/// Render a table as CSV, header first, newline-terminated. A table without
/// columns (an empty dump) renders as an empty file.
#[instrument(skip_all, fields(table = %table.name, records = table.len()))]
pub fn write_table(table: &Table, opts: &ConvertOptions) -> Result<String> {
    if table.fields.is_empty() {
        return Ok(String::new());
    }

    let mut writer = csv::WriterBuilder::new()
        .delimiter(opts.separator_byte()?)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    writer
        .write_record(&table.fields)
        .map_err(|e| DbToolsError::Conversion(format!("CSV header: {e}")))?;

    for row in table.rows() {
        writer
            .write_record(row.iter().map(|v| render_cell(v, opts)))
            .map_err(|e| DbToolsError::Conversion(format!("CSV record: {e}")))?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| DbToolsError::Conversion(format!("CSV flush: {e}")))?;
    String::from_utf8(bytes).map_err(|e| DbToolsError::Conversion(e.to_string()))
}

fn render_cell(value: &Value, opts: &ConvertOptions) -> String {
    match value {
        Value::ObjectId(oid) if opts.mongo_types => format!("ObjectId({oid})"),
        Value::ObjectId(oid) => oid.clone(),
        Value::Date(ts) => mongo_timestamp(ts, opts.tz),
        Value::Number(n) => format_number(*n, opts.number_precision),
        // mongoexport's CSV mode prints booleans through Go's %s verb.
        Value::Bool(b) if opts.mongo_types => format!("%!s(bool={b})"),
        Value::Bool(b) => b.to_string(),
        Value::Text(s) => s.clone(),
        Value::Null => String::new(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
