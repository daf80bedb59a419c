//! Column store backing the CSV files of an archive.
//!
//! Columns are independent and may have different lengths. Rows are produced by padding
//! short columns with absent values.

use std::fmt::Display;
use std::path::Path;
use std::str::FromStr;

use rust_decimal::Decimal;
use variantly::Variantly;

/// A single cell value.
///
/// Numbers are exact decimals and keep their scale, so `1.50` is written back as `1.50`.
#[derive(Debug, Clone, PartialEq, Variantly)]
pub enum Value {
    Number(Decimal),
    Text(String),
}

impl Value {
    /// Parses a field as an exact decimal, keeping anything else as text.
    ///
    /// Fields whose digits do not fit a decimal without rounding stay text, so they are
    /// written back unchanged.
    pub fn parse(field: &str) -> Self {
        match Decimal::from_str_exact(field) {
            Ok(number) => Value::Number(number),
            Err(_) => Value::Text(field.to_string()),
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Number(n) => write!(f, "{n}"),
            Value::Text(s) => write!(f, "{s}"),
        }
    }
}

impl From<Decimal> for Value {
    fn from(value: Decimal) -> Self {
        Value::Number(value)
    }
}

impl From<f64> for Value {
    /// Converts through the shortest text form of the float, so `0.1` becomes the
    /// decimal `0.1`. Non-finite floats become text.
    fn from(value: f64) -> Self {
        let text = value.to_string();
        match Decimal::from_str(&text) {
            Ok(number) => Value::Number(number),
            Err(_) => Value::Text(text),
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

pub type Column = Vec<Option<Value>>;

/// A tabular data file of an experiment.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub name: String,
    /// Location inside the archive, e.g. `./data/measurements.csv`
    pub location: String,
    /// Id of the catalog file entry, once known
    pub id: Option<String>,
    /// Id of the catalog format describing the columns
    pub format: Option<String>,
    pub columns: Vec<Column>,
}

impl Table {
    /// Creates an empty table stored at `./data/<name>.csv`.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            location: format!("./data/{name}.csv"),
            name,
            id: None,
            format: None,
            columns: Vec::new(),
        }
    }

    /// Creates an empty table at an explicit location, named after the file stem.
    pub fn at_location(location: impl Into<String>) -> Self {
        let location = location.into();
        let name = Path::new(&location)
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| location.clone());

        Self {
            name,
            location,
            id: None,
            format: None,
            columns: Vec::new(),
        }
    }

    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }

    pub fn add_column(&mut self, column: Column) {
        self.columns.push(column);
    }

    /// Appends a column without absent values.
    pub fn add_values<V: Into<Value>>(&mut self, values: impl IntoIterator<Item = V>) {
        self.columns
            .push(values.into_iter().map(|v| Some(v.into())).collect());
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Length of the longest column.
    pub fn row_count(&self) -> usize {
        self.columns.iter().map(Vec::len).max().unwrap_or(0)
    }

    /// Rows aligned to the columns; short columns are padded with `None`.
    pub fn rows(&self) -> Vec<Vec<Option<&Value>>> {
        (0..self.row_count())
            .map(|i| {
                self.columns
                    .iter()
                    .map(|column| column.get(i).and_then(Option::as_ref))
                    .collect()
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_default_location() {
        let table = Table::new("measurements");
        assert_eq!(table.location, "./data/measurements.csv");

        let table = Table::at_location("./data/run_1.csv");
        assert_eq!(table.name, "run_1");
    }

    #[test]
    fn test_rows_pad_ragged_columns() {
        let mut table = Table::new("t");
        table.add_values([0.0, 1.0, 2.0]);
        table.add_values(["a"]);

        assert_eq!(table.row_count(), 3);
        let rows = table.rows();
        assert_eq!(rows[0], vec![Some(&Value::from(0.0)), Some(&Value::from("a"))]);
        assert_eq!(rows[2], vec![Some(&Value::from(2.0)), None]);
    }

    #[test]
    fn test_empty_table_has_no_rows() {
        let table = Table::new("empty");
        assert_eq!(table.row_count(), 0);
        assert!(table.rows().is_empty());
    }
}
