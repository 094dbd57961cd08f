//! SQL dump reading and writing for dbtools.
//!
//! [`parse_dump`] recovers tables from a MySQL-style dump; [`write_dump`]
//! renders one table back out as `DROP`/`CREATE`/`INSERT` statements.

mod parser;
mod writer;

pub use parser::parse_dump;
pub use writer::{DumpHeader, SqlType, column_type, write_dump};

use dbtools_shared::{DbToolsError, Result, Table};
use tracing::warn;

/// Pick one table out of a parsed dump.
///
/// With a name, the table must exist. Without one, the first table wins and
/// a warning names the ones left behind.
pub fn select_table(tables: Vec<Table>, name: Option<&str>) -> Result<Table> {
    match name {
        Some(name) => {
            let available: Vec<String> = tables.iter().map(|t| t.name.clone()).collect();
            tables
                .into_iter()
                .find(|t| t.name == name)
                .ok_or_else(|| {
                    DbToolsError::validation(format!(
                        "table '{name}' not found in dump (available: {})",
                        available.join(", ")
                    ))
                })
        }
        None => {
            let mut tables = tables.into_iter();
            let first = tables
                .next()
                .ok_or_else(|| DbToolsError::validation("dump contains no tables"))?;
            let skipped: Vec<String> = tables.map(|t| t.name).collect();
            if !skipped.is_empty() {
                warn!(
                    table = %first.name,
                    skipped = %skipped.join(", "),
                    "dump holds several tables, converting the first"
                );
            }
            Ok(first)
        }
    }
}
