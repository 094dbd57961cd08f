//! MongoDB JSON dumps: mongoexport-style documents in, documents out.
//!
//! Input is either one JSON document per line or a single JSON array of
//! documents. Extended JSON wrappers (`$oid`, `$date`) map onto
//! [`Value::ObjectId`] and [`Value::Date`]. Output keeps field order and
//! renders numbers with the configured precision, which is why documents are
//! assembled by hand rather than through `serde_json::to_string`.

use chrono::{DateTime, Utc};
use serde_json::Map;
use tracing::{debug, instrument};

use dbtools_shared::{
    ConvertOptions, DbToolsError, Result, Table, Value, format_number, mongo_timestamp,
    parse_timestamp,
};

type Document = Map<String, serde_json::Value>;

// ---------------------------------------------------------------------------
// Reader
// ---------------------------------------------------------------------------

/// Parse a MongoDB JSON dump into a table named `name`.
///
/// Columns appear in first-seen key order; documents that lack a key get
/// `Null` in that column.
#[instrument(skip(text, opts), fields(len = text.len()))]
pub fn read_table(text: &str, name: &str, opts: &ConvertOptions) -> Result<Table> {
    let mut table = Table::new(name, Vec::new());

    for (line, doc) in parse_documents(text)? {
        let mut row = vec![Value::Null; table.fields.len()];

        for (key, value) in doc {
            let idx = match table.field_index(&key) {
                Some(idx) => idx,
                None => {
                    row.push(Value::Null);
                    table.add_field(key.clone())
                }
            };
            row[idx] = to_value(value, opts).map_err(|e| {
                DbToolsError::parse(format!("document {line}, field '{key}': {e}"))
            })?;
        }

        table.push_row(row)?;
    }

    debug!(fields = table.fields.len(), records = table.len(), "MongoDB dump parsed");
    Ok(table)
}

/// Split the dump into `(position, document)` pairs. Position is the line
/// number for line-delimited dumps and the element number for arrays.
fn parse_documents(text: &str) -> Result<Vec<(usize, Document)>> {
    let text = text.trim_start_matches('\u{feff}');
    let trimmed = text.trim();

    if trimmed.starts_with('[') {
        let docs: Vec<serde_json::Value> = serde_json::from_str(trimmed)
            .map_err(|e| DbToolsError::parse(format!("JSON array: {e}")))?;
        return docs
            .into_iter()
            .enumerate()
            .map(|(i, doc)| expect_object(i + 1, doc))
            .collect();
    }

    text.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| {
            let line = line.trim().trim_end_matches(',');
            let doc = serde_json::from_str(line)
                .map_err(|e| DbToolsError::parse(format!("line {}: {e}", i + 1)))?;
            expect_object(i + 1, doc)
        })
        .collect()
}

fn expect_object(position: usize, doc: serde_json::Value) -> Result<(usize, Document)> {
    match doc {
        serde_json::Value::Object(map) => Ok((position, map)),
        other => Err(DbToolsError::parse(format!(
            "document {position} is not a JSON object: {other}"
        ))),
    }
}

fn to_value(value: serde_json::Value, opts: &ConvertOptions) -> Result<Value> {
    use serde_json::Value as Json;

    Ok(match value {
        Json::Null => Value::Null,
        Json::Bool(b) => Value::Bool(b),
        Json::Number(n) => Value::Number(
            n.as_f64()
                .ok_or_else(|| DbToolsError::parse(format!("number {n} out of range")))?,
        ),
        Json::String(s) => match parse_timestamp(&s) {
            Some(ts) if opts.mongo_types => Value::Date(ts),
            _ => Value::Text(s),
        },
        Json::Object(map) => from_extended(map)?,
        array @ Json::Array(_) => Value::Text(array.to_string()),
    })
}

/// Interpret `{"$oid": ..}` and `{"$date": ..}`; other objects pass through
/// as compact JSON text.
fn from_extended(map: Document) -> Result<Value> {
    use serde_json::Value as Json;

    if map.len() == 1 {
        if let Some(Json::String(oid)) = map.get("$oid") {
            return Ok(Value::ObjectId(oid.clone()));
        }
        if let Some(date) = map.get("$date") {
            return extended_date(date).map(Value::Date);
        }
    }
    Ok(Value::Text(Json::Object(map).to_string()))
}

fn extended_date(date: &serde_json::Value) -> Result<chrono::NaiveDateTime> {
    use serde_json::Value as Json;

    let millis = match date {
        Json::String(s) => {
            return parse_timestamp(s)
                .ok_or_else(|| DbToolsError::parse(format!("invalid $date '{s}'")));
        }
        Json::Number(n) => n.as_i64(),
        Json::Object(inner) => inner
            .get("$numberLong")
            .and_then(Json::as_str)
            .and_then(|s| s.parse::<i64>().ok()),
        _ => None,
    };

    millis
        .and_then(DateTime::<Utc>::from_timestamp_millis)
        .map(|dt| dt.naive_utc())
        .ok_or_else(|| DbToolsError::parse(format!("invalid $date {date}")))
}

// ---------------------------------------------------------------------------
// Writer
// ---------------------------------------------------------------------------

/// Render a table as a MongoDB JSON dump.
///
/// One compact document per line, or with `opts.array` a JSON array whose
/// elements keep the one-per-line layout.
#[instrument(skip_all, fields(table = %table.name, records = table.len()))]
pub fn write_table(table: &Table, opts: &ConvertOptions) -> String {
    let keys: Vec<String> = table.fields.iter().map(|f| json_string(f)).collect();
    let last = table.len().saturating_sub(1);

    let mut lines: Vec<String> = Vec::with_capacity(table.len() + 2);
    for (i, row) in table.rows().iter().enumerate() {
        let body = keys
            .iter()
            .zip(row)
            .map(|(key, value)| format!("{key}:{}", render_value(value, opts)))
            .collect::<Vec<_>>()
            .join(",");
        let comma = if opts.array && i < last { "," } else { "" };
        lines.push(format!("{{{body}}}{comma}"));
    }

    if opts.array {
        lines.insert(0, "[".to_string());
        lines.push("]".to_string());
    }

    if lines.is_empty() {
        return String::new();
    }
    let mut out = lines.join("\n");
    out.push('\n');
    out
}

fn render_value(value: &Value, opts: &ConvertOptions) -> String {
    match value {
        Value::ObjectId(oid) if opts.mongo_types => format!("{{\"$oid\":{}}}", json_string(oid)),
        Value::ObjectId(oid) => json_string(oid),
        Value::Date(ts) => {
            let ts = json_string(&mongo_timestamp(ts, opts.tz));
            if opts.mongo_types {
                format!("{{\"$date\":{ts}}}")
            } else {
                ts
            }
        }
        Value::Number(n) => format_number(*n, opts.number_precision),
        Value::Bool(b) => b.to_string(),
        Value::Text(s) => json_string(s),
        Value::Null => "null".to_string(),
    }
}

fn json_string(s: &str) -> String {
    serde_json::Value::from(s).to_string()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn load_fixture(name: &str) -> String {
        let path = format!("../../../fixtures/samples/{name}");
        std::fs::read_to_string(&path).unwrap_or_else(|e| panic!("missing fixture {path}: {e}"))
    }

    #[test]
    fn reads_sample_fixture() {
        let table =
            read_table(&load_fixture("sample.json"), "sample", &ConvertOptions::default()).unwrap();

        assert_eq!(
            table.fields,
            vec!["_id", "name", "price", "in_stock", "created", "tags"]
        );
        assert_eq!(table.len(), 3);

        let first = &table.rows()[0];
        assert_eq!(first[0], Value::ObjectId("56a3a8c6ef2a4f6c1a000001".into()));
        assert_eq!(first[2], Value::Number(9.99));
        assert_eq!(first[3], Value::Bool(true));
        // `tags` first appears in the second document.
        assert_eq!(first[5], Value::Null);
        assert_eq!(table.rows()[1][5], Value::Text(r#"["tools","sale"]"#.into()));

        // $numberLong epoch millis decode to the same instant as the string form.
        let third = &table.rows()[2];
        assert_eq!(
            third[4],
            Value::Date(parse_timestamp("2016-01-25T17:45:10.250Z").unwrap())
        );
    }

    #[test]
    fn reads_array_dump() {
        let text = "[\n{\"a\":1},\n{\"a\":2,\"b\":\"x\"}\n]\n";
        let table = read_table(text, "t", &ConvertOptions::default()).unwrap();
        assert_eq!(table.fields, vec!["a", "b"]);
        assert_eq!(table.rows()[0], vec![Value::Number(1.0), Value::Null]);
        assert_eq!(table.rows()[1][1], Value::Text("x".into()));
    }

    #[test]
    fn date_strings_follow_mongo_types() {
        let text = r#"{"at":"2016-01-23T12:00:00.000Z"}"#;

        let typed = read_table(text, "t", &ConvertOptions::default()).unwrap();
        assert!(matches!(typed.rows()[0][0], Value::Date(_)));

        let opts = ConvertOptions {
            mongo_types: false,
            ..ConvertOptions::default()
        };
        let plain = read_table(text, "t", &opts).unwrap();
        assert!(matches!(plain.rows()[0][0], Value::Text(_)));
    }

    #[test]
    fn non_object_document_is_rejected() {
        let err = read_table("{\"a\":1}\n42\n", "t", &ConvertOptions::default()).unwrap_err();
        assert!(err.to_string().contains("document 2"));
    }

    #[test]
    fn malformed_line_reports_line_number() {
        let err = read_table("{\"a\":1}\n\n{\"a\":\n", "t", &ConvertOptions::default()).unwrap_err();
        assert!(err.to_string().contains("line 3"), "{err}");
    }

    #[test]
    fn line_numbers_count_leading_blank_lines() {
        let opts = ConvertOptions::default();

        let err = read_table("\n\n{\"a\":1}\n42\n", "t", &opts).unwrap_err();
        assert!(err.to_string().contains("document 4 is not a JSON object"), "{err}");

        let err = read_table("\n{\"a\":1}\n\n{oops}\n", "t", &opts).unwrap_err();
        assert!(err.to_string().contains("line 4:"), "{err}");
    }

    #[test]
    fn invalid_extended_date_is_rejected() {
        let err =
            read_table(r#"{"at":{"$date":"yesterday"}}"#, "t", &ConvertOptions::default()).unwrap_err();
        assert!(err.to_string().contains("field 'at'"));
    }

    fn sample_table() -> Table {
        let mut table = Table::new(
            "t",
            vec!["_id".into(), "name".into(), "price".into(), "at".into(), "gone".into()],
        );
        table
            .push_row(vec![
                Value::ObjectId("abc".into()),
                Value::Text("say \"hi\"".into()),
                Value::Number(3.0),
                Value::Date(parse_timestamp("2016-01-23 12:00:00").unwrap()),
                Value::Null,
            ])
            .unwrap();
        table
            .push_row(vec![
                Value::ObjectId("def".into()),
                Value::Text("b".into()),
                Value::Number(0.5),
                Value::Null,
                Value::Bool(false),
            ])
            .unwrap();
        table
    }

    #[test]
    fn writes_typed_lines() {
        let out = write_table(&sample_table(), &ConvertOptions::default());
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(
            lines[0],
            r#"{"_id":{"$oid":"abc"},"name":"say \"hi\"","price":3.00,"at":{"$date":"2016-01-23T12:00:00.000+0000"},"gone":null}"#
        );
        assert_eq!(
            lines[1],
            r#"{"_id":{"$oid":"def"},"name":"b","price":0.50,"at":null,"gone":false}"#
        );
        assert!(out.ends_with('\n'));
    }

    #[test]
    fn writes_plain_array() {
        let opts = ConvertOptions {
            mongo_types: false,
            array: true,
            tz: true,
            ..ConvertOptions::default()
        };
        let out = write_table(&sample_table(), &opts);
        let lines: Vec<&str> = out.lines().collect();

        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], "[");
        assert!(lines[1].starts_with(r#"{"_id":"abc","#));
        assert!(lines[1].contains(r#""at":"2016-01-23T12:00:00.000Z""#));
        assert!(lines[1].ends_with("},"));
        assert!(lines[2].ends_with('}'));
        assert_eq!(lines[3], "]");
    }

    #[test]
    fn written_dump_reads_back() {
        let table = sample_table();
        for array in [false, true] {
            let opts = ConvertOptions {
                array,
                ..ConvertOptions::default()
            };
            let back = read_table(&write_table(&table, &opts), "t", &opts).unwrap();
            assert_eq!(back, table);
        }
    }

    #[test]
    fn empty_table_writes_nothing() {
        let table = Table::new("t", vec!["a".into()]);
        assert_eq!(write_table(&table, &ConvertOptions::default()), "");
    }
}
