//! SQL dump writer: `DROP`/`CREATE TABLE` with inferred column types, then
//! one `INSERT` per row.

use chrono::{DateTime, Local};

use dbtools_shared::{
    ConvertOptions, DbToolsError, Result, Table, Value, format_number, sql_timestamp,
};

/// Provenance written into the comment header of a dump.
#[derive(Debug, Clone)]
pub struct DumpHeader {
    /// Description of the source, e.g. "CSV file".
    pub source: String,
    /// Input path as given by the user.
    pub input: String,
    /// Output path as given by the user.
    pub output: String,
    /// Tool name and version.
    pub signature: String,
    /// Generation time.
    pub generated_at: DateTime<Local>,
}

/// Column type chosen for a table column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SqlType {
    ObjectId,
    Timestamp,
    Numeric,
    Boolean,
    Varchar(usize),
    Text,
}

impl std::fmt::Display for SqlType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ObjectId => f.write_str("VARCHAR(24)"),
            Self::Timestamp => f.write_str("TIMESTAMP"),
            Self::Numeric => f.write_str("NUMERIC(15, 2)"),
            Self::Boolean => f.write_str("BOOLEAN"),
            Self::Varchar(n) => write!(f, "VARCHAR({n})"),
            Self::Text => f.write_str("TEXT"),
        }
    }
}

/// VARCHAR widths tried in order before falling back to TEXT.
const VARCHAR_WIDTHS: [usize; 3] = [50, 100, 255];

/// Render a table as a SQL dump.
pub fn write_dump(table: &Table, opts: &ConvertOptions, header: Option<&DumpHeader>) -> Result<String> {
    if table.fields.is_empty() {
        return Err(DbToolsError::Conversion(format!(
            "table '{}' has no columns",
            table.name
        )));
    }

    let name = quote_ident(&table.name);
    let mut sql: Vec<String> = Vec::new();

    if let Some(h) = header.filter(|_| opts.comments) {
        sql.push(format!(
            "-- SQL table dump from {}: {} ({} -> {})",
            h.source, table.name, h.input, h.output
        ));
        sql.push(format!("-- Generated by: {}", h.signature));
        sql.push(format!(
            "-- Generated at: {}",
            h.generated_at.format("%Y-%m-%d %H:%M:%S %:z")
        ));
        sql.push(String::new());
    }

    if let Some(db) = &opts.db {
        sql.push(format!("USE {};", quote_ident(db)));
    }

    sql.push(format!("DROP TABLE IF EXISTS {name};"));
    sql.push(format!("CREATE TABLE IF NOT EXISTS {name} ("));
    let last = table.fields.len() - 1;
    for (i, field) in table.fields.iter().enumerate() {
        let end = if i == last { ");" } else { "," };
        sql.push(format!("{} {}{end}", quote_ident(field), column_type(table, i)));
    }
    sql.push(String::new());

    for row in table.rows() {
        sql.push(format!("INSERT INTO {name} VALUES ("));
        for (i, value) in row.iter().enumerate() {
            let end = if i == last { ");" } else { "," };
            sql.push(format!("{}{end}", render_value(value, opts)));
        }
        sql.push(String::new());
    }

    Ok(sql.join("\n"))
}

/// Pick a column type from the values it holds. Mixed columns fall back to
/// a character type wide enough for their rendered values.
pub fn column_type(table: &Table, index: usize) -> SqlType {
    let mut kinds = table.column(index).filter(|v| !v.is_null()).map(|v| match v {
        Value::ObjectId(_) => SqlType::ObjectId,
        Value::Date(_) => SqlType::Timestamp,
        Value::Number(_) => SqlType::Numeric,
        Value::Bool(_) => SqlType::Boolean,
        _ => SqlType::Varchar(0),
    });

    let uniform = match kinds.next() {
        Some(first) if kinds.all(|k| k == first) => Some(first),
        _ => None,
    };

    match uniform {
        Some(SqlType::Varchar(_)) | None => varchar_for(table, index),
        Some(ty) => ty,
    }
}

fn varchar_for(table: &Table, index: usize) -> SqlType {
    let longest = table.column(index).map(cell_width).max().unwrap_or(0);

    let minimum = if table.fields[index] == "description" { 100 } else { 0 };
    let needed = longest.max(minimum);

    VARCHAR_WIDTHS
        .into_iter()
        .find(|&w| w >= needed)
        .map_or(SqlType::Text, SqlType::Varchar)
}

/// Characters a value takes up in a character column, without SQL quoting.
fn cell_width(value: &Value) -> usize {
    match value {
        Value::Text(s) | Value::ObjectId(s) => s.chars().count(),
        Value::Date(ts) => sql_timestamp(ts).len(),
        Value::Null => 0,
        other => render_value(other, &ConvertOptions::default()).len(),
    }
}

fn render_value(value: &Value, opts: &ConvertOptions) -> String {
    match value {
        Value::ObjectId(oid) => quote_string(oid),
        Value::Date(ts) => quote_string(&sql_timestamp(ts)),
        Value::Number(n) => format_number(*n, opts.number_precision),
        Value::Bool(true) => "TRUE".to_string(),
        Value::Bool(false) => "FALSE".to_string(),
        Value::Text(s) => quote_string(s),
        Value::Null => "NULL".to_string(),
    }
}

fn quote_string(s: &str) -> String {
    let escaped = s
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
        .replace('\r', "\\r");
    format!("\"{escaped}\"")
}

fn quote_ident(ident: &str) -> String {
    format!("`{}`", ident.replace('`', "``"))
}
