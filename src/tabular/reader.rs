//! CSV decoding of tables.
//!
//! The first line is data, not a header. Each field becomes an exact decimal when it
//! parses as one, absent when empty, and text otherwise.

use std::fs;
use std::path::Path;

use super::table::{Table, Value};

fn parse_field(field: &str) -> Option<Value> {
    if field.is_empty() {
        return None;
    }
    Some(Value::parse(field))
}

impl Table {
    /// Parses CSV text into a table at `location`.
    ///
    /// Columns grow line by line, so a short line leaves the trailing columns shorter.
    pub fn from_csv_str(location: impl Into<String>, text: &str) -> Self {
        let mut table = Table::at_location(location);

        for line in text.lines() {
            for (i, field) in line.split(',').enumerate() {
                if table.columns.len() <= i {
                    table.columns.push(Vec::new());
                }
                table.columns[i].push(parse_field(field));
            }
        }

        table
    }

    pub fn read_csv(location: impl Into<String>, path: impl AsRef<Path>) -> std::io::Result<Self> {
        let text = fs::read_to_string(path)?;
        Ok(Self::from_csv_str(location, &text))
    }
}
