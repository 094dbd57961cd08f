//! Core domain types: formats, tools, cell values, and tables.

use std::sync::LazyLock;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use regex::Regex;

use crate::error::{DbToolsError, Result};

// ---------------------------------------------------------------------------
// Format
// ---------------------------------------------------------------------------

/// A file format a tool reads or writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    /// Delimited text with a header row.
    Csv,
    /// MongoDB JSON dump (mongoexport style).
    MongoJson,
    /// SQL dump (`CREATE TABLE` + `INSERT` statements).
    Sql,
}

impl Format {
    /// File extension without the dot.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::MongoJson => "json",
            Self::Sql => "sql",
        }
    }

    /// Short label used in extension errors.
    pub fn label(self) -> &'static str {
        match self {
            Self::Csv => "CSV",
            Self::MongoJson => "JSON",
            Self::Sql => "SQL",
        }
    }

    /// Human-readable description used in verbose output.
    pub fn description(self) -> &'static str {
        match self {
            Self::Csv => "CSV file",
            Self::MongoJson => "MongoDB JSON dump file",
            Self::Sql => "SQL dump file",
        }
    }
}

impl std::fmt::Display for Format {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

// ---------------------------------------------------------------------------
// Tool
// ---------------------------------------------------------------------------

/// One of the converter binaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tool {
    Csv2Mongo,
    Csv2Sql,
    Mongo2Csv,
    Mongo2Sql,
    Sql2Csv,
    Sql2Mongo,
}

impl Tool {
    /// Every tool, in build and smoke-test order.
    pub const ALL: [Tool; 6] = [
        Tool::Csv2Mongo,
        Tool::Csv2Sql,
        Tool::Mongo2Csv,
        Tool::Mongo2Sql,
        Tool::Sql2Csv,
        Tool::Sql2Mongo,
    ];

    /// Binary name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Csv2Mongo => "ccsv2mongo",
            Self::Csv2Sql => "ccsv2sql",
            Self::Mongo2Csv => "cmongo2csv",
            Self::Mongo2Sql => "cmongo2sql",
            Self::Sql2Csv => "csql2csv",
            Self::Sql2Mongo => "csql2mongo",
        }
    }

    /// Format the tool reads.
    pub fn input(self) -> Format {
        match self {
            Self::Csv2Mongo | Self::Csv2Sql => Format::Csv,
            Self::Mongo2Csv | Self::Mongo2Sql => Format::MongoJson,
            Self::Sql2Csv | Self::Sql2Mongo => Format::Sql,
        }
    }

    /// Format the tool writes.
    pub fn output(self) -> Format {
        match self {
            Self::Mongo2Csv | Self::Sql2Csv => Format::Csv,
            Self::Csv2Mongo | Self::Sql2Mongo => Format::MongoJson,
            Self::Csv2Sql | Self::Mongo2Sql => Format::Sql,
        }
    }

    /// One-line description shown in `--help`.
    pub fn about(self) -> &'static str {
        match self {
            Self::Csv2Mongo => "Utility to convert a CSV file to a MongoDB JSON dump.",
            Self::Csv2Sql => "Utility to convert a CSV file to a SQL dump.",
            Self::Mongo2Csv => "Utility to convert a MongoDB JSON dump to a CSV file.",
            Self::Mongo2Sql => "Utility to convert a MongoDB JSON dump to a SQL dump.",
            Self::Sql2Csv => "Utility to convert a SQL dump to a CSV file.",
            Self::Sql2Mongo => "Utility to convert a SQL dump to a MongoDB JSON dump.",
        }
    }
}

impl std::fmt::Display for Tool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for Tool {
    type Err = DbToolsError;

    fn from_str(s: &str) -> Result<Self> {
        Tool::ALL
            .into_iter()
            .find(|t| t.name() == s)
            .ok_or_else(|| DbToolsError::validation(format!("unknown tool '{s}'")))
    }
}

// ---------------------------------------------------------------------------
// Value
// ---------------------------------------------------------------------------

/// A single typed cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// MongoDB ObjectId (hex string, no wrapper).
    ObjectId(String),
    /// Timestamp with millisecond precision; zone information is dropped.
    Date(NaiveDateTime),
    Number(f64),
    Bool(bool),
    Text(String),
    Null,
}

/// `ObjectId(...)` as written in CSV cells.
static OBJECT_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"^ObjectId\(\s*["']?([^"')]*)["']?\s*\)$"#).expect("oid regex"));

/// Date with optional time, fraction and zone suffix.
static TIMESTAMP_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(\d{4}-\d{2}-\d{2})(?:[T ](\d{2}):(\d{2}):(\d{2})(?:\.(\d+))?)?\s*(?:Z|[+-]\d{2}:?\d{2})?$",
    )
    .expect("timestamp regex")
});

/// Booleans as printed by Go's `%s` verb (seen in mongo-typed CSV exports).
static GO_BOOL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^%!s\(bool=(true|false)\)$").expect("go bool regex"));

impl Value {
    /// Infer a typed value from a text cell.
    ///
    /// Order: ObjectId, date, number, boolean, empty, text.
    pub fn infer(raw: &str) -> Self {
        let cell = raw.trim();

        if let Some(caps) = OBJECT_ID_RE.captures(cell) {
            return Value::ObjectId(caps[1].to_string());
        }
        if let Some(ts) = parse_timestamp(cell) {
            return Value::Date(ts);
        }
        if let Ok(n) = cell.parse::<f64>() {
            if n.is_finite() {
                return Value::Number(n);
            }
        }
        if cell.eq_ignore_ascii_case("true") {
            return Value::Bool(true);
        }
        if cell.eq_ignore_ascii_case("false") {
            return Value::Bool(false);
        }
        if let Some(caps) = GO_BOOL_RE.captures(cell) {
            return Value::Bool(&caps[1] == "true");
        }
        if cell.is_empty() {
            return Value::Null;
        }
        Value::Text(raw.to_string())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

// ---------------------------------------------------------------------------
// Timestamps and numbers
// ---------------------------------------------------------------------------

/// Parse `YYYY-MM-DD[(T| )HH:MM:SS[.fff]][zone]`. The zone is ignored and
/// fractions beyond milliseconds are truncated.
pub fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    let caps = TIMESTAMP_RE.captures(s.trim())?;
    let date = NaiveDate::parse_from_str(&caps[1], "%Y-%m-%d").ok()?;

    let Some(hour) = caps.get(2) else {
        return date.and_hms_opt(0, 0, 0);
    };
    let hour: u32 = hour.as_str().parse().ok()?;
    let minute: u32 = caps[3].parse().ok()?;
    let second: u32 = caps[4].parse().ok()?;
    let millis = caps
        .get(5)
        .map(|f| {
            let digits: String = f.as_str().chars().chain("000".chars()).take(3).collect();
            digits.parse::<u32>().unwrap_or(0)
        })
        .unwrap_or(0);

    let time = NaiveTime::from_hms_milli_opt(hour, minute, second, millis)?;
    Some(date.and_time(time))
}

/// Render a timestamp the way MongoDB dumps and CSV exports carry it:
/// `2016-01-31T08:00:00.000Z` with `tz`, `2016-01-31T08:00:00.000+0000` without.
pub fn mongo_timestamp(ts: &NaiveDateTime, tz: bool) -> String {
    let zone = if tz { "Z" } else { "+0000" };
    format!("{}{zone}", ts.format("%Y-%m-%dT%H:%M:%S%.3f"))
}

/// Render a timestamp as a SQL `TIMESTAMP` literal body: `2016-01-31 08:00:00`.
pub fn sql_timestamp(ts: &NaiveDateTime) -> String {
    ts.format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Render a number with a fixed number of decimals.
pub fn format_number(n: f64, precision: usize) -> String {
    format!("{n:.precision$}")
}

// ---------------------------------------------------------------------------
// Table
// ---------------------------------------------------------------------------

/// A named table of typed rows. Every row has exactly `fields.len()` values.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub name: String,
    pub fields: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl Table {
    pub fn new(name: impl Into<String>, fields: Vec<String>) -> Self {
        Self {
            name: name.into(),
            fields,
            rows: Vec::new(),
        }
    }

    /// Append a row, rejecting rows with a different arity than the header.
    pub fn push_row(&mut self, row: Vec<Value>) -> Result<()> {
        if row.len() != self.fields.len() {
            return Err(DbToolsError::validation(format!(
                "row {} of table '{}' has {} values, expected {}",
                self.rows.len() + 1,
                self.name,
                row.len(),
                self.fields.len()
            )));
        }
        self.rows.push(row);
        Ok(())
    }

    /// Add a column, backfilling existing rows with `Null`. Returns its index.
    pub fn add_field(&mut self, field: impl Into<String>) -> usize {
        self.fields.push(field.into());
        for row in &mut self.rows {
            row.push(Value::Null);
        }
        self.fields.len() - 1
    }

    pub fn field_index(&self, field: &str) -> Option<usize> {
        self.fields.iter().position(|f| f == field)
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    /// All values of one column, top to bottom.
    pub fn column(&self, index: usize) -> impl Iterator<Item = &Value> {
        self.rows.iter().map(move |row| &row[index])
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(s: &str) -> NaiveDateTime {
        parse_timestamp(s).expect("valid timestamp")
    }

    #[test]
    fn tool_formats_line_up() {
        assert_eq!(Tool::Csv2Mongo.input(), Format::Csv);
        assert_eq!(Tool::Csv2Mongo.output(), Format::MongoJson);
        assert_eq!(Tool::Sql2Csv.input().extension(), "sql");
        assert_eq!(Tool::Sql2Csv.output().extension(), "csv");
        for tool in Tool::ALL {
            assert_ne!(tool.input(), tool.output(), "{tool} converts to itself");
        }
    }

    #[test]
    fn tool_from_str() {
        assert_eq!("cmongo2sql".parse::<Tool>().unwrap(), Tool::Mongo2Sql);
        assert!("cjson2xml".parse::<Tool>().is_err());
    }

    #[test]
    fn infer_object_id() {
        assert_eq!(
            Value::infer("ObjectId(56a3a8c6ef2a4f6c1a000001)"),
            Value::ObjectId("56a3a8c6ef2a4f6c1a000001".into())
        );
        assert_eq!(
            Value::infer(r#"ObjectId("abc")"#),
            Value::ObjectId("abc".into())
        );
    }

    #[test]
    fn infer_dates() {
        assert_eq!(
            Value::infer("2016-01-23T12:00:00.000Z"),
            Value::Date(ts("2016-01-23 12:00:00"))
        );
        assert!(matches!(Value::infer("2016-01-23"), Value::Date(_)));
        assert!(matches!(Value::infer("2016-01-23 08:30:00+0000"), Value::Date(_)));
        // Not a real calendar date.
        assert_eq!(Value::infer("2016-13-45"), Value::Text("2016-13-45".into()));
    }

    #[test]
    fn infer_numbers_bools_and_text() {
        assert_eq!(Value::infer("42"), Value::Number(42.0));
        assert_eq!(Value::infer("-3.5"), Value::Number(-3.5));
        assert_eq!(Value::infer("TRUE"), Value::Bool(true));
        assert_eq!(Value::infer("false"), Value::Bool(false));
        assert_eq!(Value::infer("%!s(bool=true)"), Value::Bool(true));
        assert_eq!(Value::infer(""), Value::Null);
        assert_eq!(Value::infer("abc1"), Value::Text("abc1".into()));
        assert_eq!(Value::infer("NaN"), Value::Text("NaN".into()));
    }

    #[test]
    fn timestamp_fraction_handling() {
        let t = ts("2016-01-23T12:34:56.5");
        assert_eq!(mongo_timestamp(&t, true), "2016-01-23T12:34:56.500Z");

        let t = ts("2016-01-23T12:34:56.123456");
        assert_eq!(mongo_timestamp(&t, false), "2016-01-23T12:34:56.123+0000");
        assert_eq!(sql_timestamp(&t), "2016-01-23 12:34:56");
    }

    #[test]
    fn number_formatting() {
        assert_eq!(format_number(3.0, 2), "3.00");
        assert_eq!(format_number(2.345, 1), "2.3");
        assert_eq!(format_number(7.0, 0), "7");
    }

    #[test]
    fn table_rejects_wrong_arity() {
        let mut table = Table::new("t", vec!["a".into(), "b".into()]);
        table.push_row(vec![Value::Null, Value::Bool(true)]).unwrap();
        let err = table.push_row(vec![Value::Null]).unwrap_err();
        assert!(err.to_string().contains("row 2"));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn add_field_backfills_nulls() {
        let mut table = Table::new("t", vec!["a".into()]);
        table.push_row(vec![Value::Number(1.0)]).unwrap();
        let idx = table.add_field("b");
        assert_eq!(idx, 1);
        assert_eq!(table.rows()[0], vec![Value::Number(1.0), Value::Null]);
        assert_eq!(table.column(1).count(), 1);
    }
}
