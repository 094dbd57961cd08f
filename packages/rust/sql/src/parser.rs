//! SQL dump parser.
//!
//! Understands the subset of a MySQL-style dump needed to recover table data:
//! - `CREATE TABLE [IF NOT EXISTS] name (...)` column definitions
//! - `INSERT INTO name [(cols)] VALUES (...), (...)` rows
//!
//! Everything else (`USE`, `DROP`, `LOCK`, `SET`, ...) is skipped. Comments
//! (`-- `, `#`, `/* */`) are stripped while splitting statements.

use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, warn};

use dbtools_shared::{DbToolsError, Result, Table, Value, parse_timestamp};

// ---------------------------------------------------------------------------
// Regex patterns (compiled once)
// ---------------------------------------------------------------------------

/// A possibly schema-qualified, possibly quoted identifier.
const IDENT: &str =
    r#"(?:`(?:[^`]|``)+`|"(?:[^"]|"")+"|[\w$]+)(?:\.(?:`(?:[^`]|``)+`|"(?:[^"]|"")+"|[\w$]+))?"#;

/// Matches `CREATE TABLE name (body) options`.
static CREATE_TABLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?is)^CREATE\s+(?:TEMPORARY\s+)?TABLE\s+(?:IF\s+NOT\s+EXISTS\s+)?({IDENT})\s*\((.*)\)[^)]*$"
    ))
    .expect("create table regex")
});

/// Matches `INSERT INTO name [(cols)] VALUES tuples`.
static INSERT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?is)^(?:INSERT|REPLACE)\s+(?:(?:LOW_PRIORITY|DELAYED|HIGH_PRIORITY)\s+)?(?:IGNORE\s+)?(?:INTO\s+)?({IDENT})\s*(?:\(([^)]*)\))?\s*VALUES?\s*(.*)$"
    ))
    .expect("insert regex")
});

/// First words of table-level definitions that are not columns.
const CONSTRAINT_KEYWORDS: &[&str] = &[
    "PRIMARY",
    "KEY",
    "UNIQUE",
    "CONSTRAINT",
    "INDEX",
    "FULLTEXT",
    "SPATIAL",
    "FOREIGN",
    "CHECK",
];

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// How a declared column type influences value decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColumnKind {
    Temporal,
    Boolean,
    Other,
}

/// A table under construction, with per-column decoding hints.
#[derive(Debug)]
struct ParsedTable {
    table: Table,
    kinds: Vec<ColumnKind>,
}

/// One statement with the line it starts on.
#[derive(Debug)]
struct Statement {
    line: usize,
    text: String,
}

/// A literal inside a `VALUES` tuple.
#[derive(Debug, Clone, PartialEq)]
enum Literal {
    Str(String),
    Number(f64),
    Bool(bool),
    Null,
}

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

/// Parse a SQL dump into its tables, in `CREATE TABLE` order.
pub fn parse_dump(text: &str) -> Result<Vec<Table>> {
    let mut tables: Vec<ParsedTable> = Vec::new();

    for stmt in split_statements(text) {
        if let Some(caps) = CREATE_TABLE_RE.captures(&stmt.text) {
            create_table(&mut tables, unquote_ident(&caps[1]), &caps[2], stmt.line);
        } else if let Some(caps) = INSERT_RE.captures(&stmt.text) {
            insert_rows(
                &mut tables,
                unquote_ident(&caps[1]),
                caps.get(2).map(|m| m.as_str()),
                &caps[3],
                stmt.line,
            )?;
        } else {
            let head: String = stmt.text.chars().take(40).collect();
            debug!(line = stmt.line, statement = %head, "skipping statement");
        }
    }

    Ok(tables.into_iter().map(|t| t.table).collect())
}

fn create_table(tables: &mut Vec<ParsedTable>, name: String, body: &str, line: usize) {
    let (fields, kinds): (Vec<String>, Vec<ColumnKind>) =
        split_top_level(body).iter().filter_map(|def| column_def(def)).unzip();

    if fields.is_empty() {
        warn!(table = %name, line, "CREATE TABLE without columns, skipping");
        return;
    }

    debug!(table = %name, columns = fields.len(), "table definition");
    let parsed = ParsedTable {
        table: Table::new(name, fields),
        kinds,
    };

    match tables.iter().position(|t| t.table.name == parsed.table.name) {
        Some(idx) => tables[idx] = parsed,
        None => tables.push(parsed),
    }
}

fn insert_rows(
    tables: &mut Vec<ParsedTable>,
    name: String,
    columns: Option<&str>,
    values: &str,
    line: usize,
) -> Result<()> {
    let columns: Option<Vec<String>> = columns.map(|cols| {
        split_top_level(cols)
            .iter()
            .map(|c| unquote_ident(c.trim()))
            .collect()
    });

    let idx = match tables.iter().position(|t| t.table.name == name) {
        Some(idx) => idx,
        None => {
            let Some(cols) = &columns else {
                return Err(DbToolsError::parse(format!(
                    "line {line}: INSERT into unknown table '{name}' without a column list"
                )));
            };
            debug!(table = %name, "table created from INSERT column list");
            tables.push(ParsedTable {
                table: Table::new(name.clone(), cols.clone()),
                kinds: vec![ColumnKind::Other; cols.len()],
            });
            tables.len() - 1
        }
    };
    let parsed = &mut tables[idx];

    let positions: Vec<usize> = match &columns {
        Some(cols) => cols
            .iter()
            .map(|c| {
                parsed.table.field_index(c).ok_or_else(|| {
                    DbToolsError::parse(format!("line {line}: unknown column '{c}' in '{name}'"))
                })
            })
            .collect::<Result<_>>()?,
        None => (0..parsed.table.fields.len()).collect(),
    };

    let tuples =
        parse_tuples(values).map_err(|e| DbToolsError::parse(format!("line {line}: {e}")))?;

    for (n, tuple) in tuples.into_iter().enumerate() {
        if tuple.len() != positions.len() {
            return Err(DbToolsError::parse(format!(
                "line {line}: tuple {} has {} values, expected {}",
                n + 1,
                tuple.len(),
                positions.len()
            )));
        }

        let mut row = vec![Value::Null; parsed.table.fields.len()];
        for (literal, &pos) in tuple.into_iter().zip(&positions) {
            row[pos] = to_value(literal, &parsed.table.fields[pos], parsed.kinds[pos]);
        }
        parsed.table.push_row(row)?;
    }

    Ok(())
}

fn to_value(literal: Literal, field: &str, kind: ColumnKind) -> Value {
    match literal {
        Literal::Null => Value::Null,
        Literal::Bool(b) => Value::Bool(b),
        Literal::Number(n) if kind == ColumnKind::Boolean && (n == 0.0 || n == 1.0) => {
            Value::Bool(n == 1.0)
        }
        Literal::Number(n) => Value::Number(n),
        Literal::Str(s) => {
            if field == "_id" && is_object_id(&s) {
                return Value::ObjectId(s);
            }
            // MySQL's zero date stands in for "no value".
            if kind == ColumnKind::Temporal && s.starts_with("0000-00-00") {
                return Value::Null;
            }
            match parse_timestamp(&s) {
                Some(ts) => Value::Date(ts),
                None => Value::Text(s),
            }
        }
    }
}

fn is_object_id(s: &str) -> bool {
    s.len() == 24 && s.bytes().all(|b| b.is_ascii_hexdigit())
}

// ---------------------------------------------------------------------------
// Column definitions
// ---------------------------------------------------------------------------

/// Parse one entry of a `CREATE TABLE` body; `None` for keys and constraints.
fn column_def(def: &str) -> Option<(String, ColumnKind)> {
    let def = def.trim();
    if def.is_empty() {
        return None;
    }

    let (name, rest) = leading_ident(def)?;
    let quoted = def.starts_with(['`', '"']);
    if !quoted && CONSTRAINT_KEYWORDS.contains(&name.to_ascii_uppercase().as_str()) {
        return None;
    }

    let sql_type = rest.split_whitespace().next().unwrap_or("");
    Some((name, column_kind(sql_type)))
}

fn column_kind(sql_type: &str) -> ColumnKind {
    let upper = sql_type.to_ascii_uppercase();
    let base = upper.split('(').next().unwrap_or_default();
    match base {
        "DATE" | "DATETIME" | "TIMESTAMP" => ColumnKind::Temporal,
        "BOOL" | "BOOLEAN" => ColumnKind::Boolean,
        "TINYINT" | "BIT" if upper.ends_with("(1)") => ColumnKind::Boolean,
        _ => ColumnKind::Other,
    }
}

/// Strip quoting and any schema qualifier from an identifier.
fn unquote_ident(raw: &str) -> String {
    let mut rest = raw.trim();
    let mut name = None;
    while let Some((part, after)) = leading_ident(rest) {
        name = Some(part);
        match after.trim_start().strip_prefix('.') {
            Some(next) => rest = next,
            None => break,
        }
    }
    name.unwrap_or_else(|| raw.trim().to_string())
}

/// Read one identifier off the front of `s`, returning it and the rest.
/// Quoted identifiers may contain their quote doubled.
fn leading_ident(s: &str) -> Option<(String, &str)> {
    let s = s.trim_start();
    match s.chars().next()? {
        q @ ('`' | '"') => {
            let mut name = String::new();
            let mut chars = s.char_indices().skip(1).peekable();
            while let Some((i, c)) = chars.next() {
                if c != q {
                    name.push(c);
                } else if chars.next_if(|&(_, next)| next == q).is_some() {
                    name.push(q);
                } else {
                    return Some((name, &s[i + 1..]));
                }
            }
            None
        }
        _ => {
            let end = s
                .find(|c: char| c.is_whitespace() || c == '.' || c == '(')
                .unwrap_or(s.len());
            (end > 0).then(|| (s[..end].to_string(), &s[end..]))
        }
    }
}

/// Split on commas that are outside parentheses and quotes.
fn split_top_level(s: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;

    for c in s.chars() {
        if let Some(q) = quote {
            current.push(c);
            if escaped {
                escaped = false;
            } else if c == '\\' && q != '`' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '\'' | '"' | '`' => {
                quote = Some(c);
                current.push(c);
            }
            '(' => {
                depth += 1;
                current.push(c);
            }
            ')' => {
                depth = depth.saturating_sub(1);
                current.push(c);
            }
            ',' if depth == 0 => parts.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    if !current.trim().is_empty() {
        parts.push(current);
    }
    parts
}

// ---------------------------------------------------------------------------
// Statement splitting
// ---------------------------------------------------------------------------

/// Split a dump into statements on `;` outside quotes, dropping comments.
fn split_statements(text: &str) -> Vec<Statement> {
    let chars: Vec<char> = text.chars().collect();
    let mut statements = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;
    let mut line = 1;
    let mut start_line = 1;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];

        if let Some(q) = quote {
            current.push(c);
            if c == '\n' {
                line += 1;
            }
            if c == '\\' && q != '`' && i + 1 < chars.len() {
                i += 1;
                if chars[i] == '\n' {
                    line += 1;
                }
                current.push(chars[i]);
            } else if c == q {
                quote = None;
            }
            i += 1;
            continue;
        }

        let next = chars.get(i + 1).copied();
        match c {
            '-' if next == Some('-')
                && chars.get(i + 2).is_none_or(|c| c.is_whitespace()) =>
            {
                while i < chars.len() && chars[i] != '\n' {
                    i += 1;
                }
                continue;
            }
            '#' => {
                while i < chars.len() && chars[i] != '\n' {
                    i += 1;
                }
                continue;
            }
            '/' if next == Some('*') => {
                i += 2;
                while i < chars.len() && !(chars[i] == '*' && chars.get(i + 1) == Some(&'/')) {
                    if chars[i] == '\n' {
                        line += 1;
                    }
                    i += 1;
                }
                i += 2;
                continue;
            }
            ';' => {
                let text = current.trim();
                if !text.is_empty() {
                    statements.push(Statement {
                        line: start_line,
                        text: text.to_string(),
                    });
                }
                current.clear();
            }
            _ => {
                if c == '\n' {
                    line += 1;
                }
                if !c.is_whitespace() && current.trim().is_empty() {
                    start_line = line;
                }
                if matches!(c, '\'' | '"' | '`') {
                    quote = Some(c);
                }
                current.push(c);
            }
        }
        i += 1;
    }

    let text = current.trim();
    if !text.is_empty() {
        statements.push(Statement {
            line: start_line,
            text: text.to_string(),
        });
    }
    statements
}

// ---------------------------------------------------------------------------
// VALUES tuples
// ---------------------------------------------------------------------------

/// Parse `(a, b), (c, d)` into literal tuples.
fn parse_tuples(src: &str) -> std::result::Result<Vec<Vec<Literal>>, String> {
    let mut lexer = Lexer::new(src);
    let mut tuples = Vec::new();

    loop {
        lexer.skip_ws();
        if lexer.eof() {
            break;
        }
        lexer.expect('(')?;

        let mut tuple = Vec::new();
        lexer.skip_ws();
        if !lexer.eat(')') {
            loop {
                lexer.skip_ws();
                tuple.push(lexer.literal()?);
                lexer.skip_ws();
                if lexer.eat(',') {
                    continue;
                }
                lexer.expect(')')?;
                break;
            }
        }
        tuples.push(tuple);

        lexer.skip_ws();
        if !lexer.eat(',') {
            lexer.skip_ws();
            if !lexer.eof() {
                return Err(format!("unexpected '{}' after tuple", lexer.rest()));
            }
            break;
        }
    }

    Ok(tuples)
}

struct Lexer {
    chars: Vec<char>,
    pos: usize,
}

impl Lexer {
    fn new(src: &str) -> Self {
        Self {
            chars: src.chars().collect(),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn eof(&self) -> bool {
        self.pos >= self.chars.len()
    }

    fn rest(&self) -> String {
        self.chars[self.pos.min(self.chars.len())..]
            .iter()
            .take(20)
            .collect()
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }

    fn eat(&mut self, c: char) -> bool {
        if self.peek() == Some(c) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, c: char) -> std::result::Result<(), String> {
        if self.eat(c) {
            Ok(())
        } else {
            match self.peek() {
                Some(found) => Err(format!("expected '{c}', found '{found}'")),
                None => Err(format!("expected '{c}', found end of statement")),
            }
        }
    }

    fn literal(&mut self) -> std::result::Result<Literal, String> {
        match self.peek() {
            Some(q @ ('\'' | '"')) => self.string(q).map(Literal::Str),
            Some(c) if c.is_ascii_digit() || matches!(c, '-' | '+' | '.') => self.number(),
            Some(c) if c.is_ascii_alphabetic() => {
                let start = self.pos;
                while self.peek().is_some_and(|c| c.is_ascii_alphanumeric() || c == '_') {
                    self.pos += 1;
                }
                let word: String = self.chars[start..self.pos].iter().collect();
                match word.to_ascii_uppercase().as_str() {
                    "NULL" => Ok(Literal::Null),
                    "TRUE" => Ok(Literal::Bool(true)),
                    "FALSE" => Ok(Literal::Bool(false)),
                    _ => Err(format!("unsupported literal '{word}'")),
                }
            }
            Some(c) => Err(format!("unexpected '{c}' in VALUES")),
            None => Err("unexpected end of VALUES".to_string()),
        }
    }

    fn number(&mut self) -> std::result::Result<Literal, String> {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|c| c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '+' | '-'))
        {
            self.pos += 1;
        }
        let raw: String = self.chars[start..self.pos].iter().collect();
        raw.parse::<f64>()
            .ok()
            .filter(|n| n.is_finite())
            .map(Literal::Number)
            .ok_or_else(|| format!("invalid number '{raw}'"))
    }

    fn string(&mut self, quote: char) -> std::result::Result<String, String> {
        self.pos += 1;
        let mut out = String::new();

        loop {
            let Some(c) = self.peek() else {
                return Err("unterminated string literal".to_string());
            };
            self.pos += 1;

            if c == '\\' {
                let Some(escaped) = self.peek() else {
                    return Err("unterminated string literal".to_string());
                };
                self.pos += 1;
                out.push(match escaped {
                    'n' => '\n',
                    't' => '\t',
                    'r' => '\r',
                    '0' => '\0',
                    'Z' => '\x1a',
                    other => other,
                });
            } else if c == quote {
                if self.eat(quote) {
                    out.push(quote);
                } else {
                    return Ok(out);
                }
            } else {
                out.push(c);
            }
        }
    }
}
