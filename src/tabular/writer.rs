//! CSV encoding of tables.
//!
//! Files carry no header row. Fields are joined with `,`, every row ends with a newline
//! and absent values are written as empty fields.

use std::fs;
use std::path::Path;

use super::table::Table;

impl Table {
    pub fn to_csv_string(&self) -> String {
        let mut out = String::new();
        for row in self.rows() {
            let line = row
                .iter()
                .map(|cell| cell.map(ToString::to_string).unwrap_or_default())
                .collect::<Vec<_>>()
                .join(",");
            out.push_str(&line);
            out.push('\n');
        }
        out
    }

    /// Writes the table to `path`, creating parent directories as needed.
    pub fn write_csv(&self, path: impl AsRef<Path>) -> std::io::Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, self.to_csv_string())?;
        log::debug!("Written table '{}' to {}", self.name, path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use crate::tabular::table::{Table, Value};

    #[test]
    fn test_absent_values_are_empty_fields() {
        let mut table = Table::new("t");
        table.add_column(vec![Some(Value::from(1.0)), None, Some(Value::from(3.0))]);
        table.add_column(vec![Some("a".into()), Some("b".into()), None]);

        assert_eq!(table.to_csv_string(), "1,a\n,b\n3,\n");
    }

    #[test]
    fn test_decimals_keep_precision() {
        let mut table = Table::new("t");
        table.add_values([0.5, 310.15]);

        assert_eq!(table.to_csv_string(), "0.5\n310.15\n");
    }

    #[test]
    fn test_write_creates_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data").join("t.csv");

        let mut table = Table::new("t");
        table.add_values([1.0, 2.0]);
        table.write_csv(&path).unwrap();

        assert_eq!(std::fs::read_to_string(path).unwrap(), "1\n2\n");
    }
}
