//! The data catalog: column formats, data files and measurements of an experiment.
//!
//! The catalog is the authority on which tabular files belong to an archive. Each of its
//! three collections allocates ids from its own sequence (`format0`, `file0`, `M0`).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use variantly::Variantly;

use crate::ids::IdSequence;
use crate::sbml::annotations::{
    default_xmlns, ColumnAnnot, DataAnnot, FileAnnot, FilesWrapper, FormatAnnot, FormatsWrapper,
    MeasurementAnnot, MeasurementsWrapper,
};

pub const COLUMN_TYPE_TIME: &str = "time";
pub const COLUMN_TYPE_CONCENTRATION: &str = "conc";
pub const COLUMN_TYPE_EMPTY: &str = "empty";

/// One column of a format. Column order is the column order of the paired file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Variantly)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Column {
    Time {
        unit: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        text: Option<String>,
    },
    #[serde(rename = "conc")]
    Concentration {
        species: String,
        unit: String,
        /// Assigned per species (`repl0`, `repl1`, ...) when the column is added
        #[serde(default, skip_serializing_if = "Option::is_none")]
        replica: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        text: Option<String>,
    },
    Empty {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        amount: Option<u32>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        text: Option<String>,
    },
}

impl Column {
    pub fn kind(&self) -> &'static str {
        match self {
            Column::Time { .. } => COLUMN_TYPE_TIME,
            Column::Concentration { .. } => COLUMN_TYPE_CONCENTRATION,
            Column::Empty { .. } => COLUMN_TYPE_EMPTY,
        }
    }

    pub fn replica(&self) -> Option<&str> {
        match self {
            Column::Concentration { replica, .. } => replica.as_deref(),
            _ => None,
        }
    }

    /// Number of file columns this entry spans; only empty columns can span several.
    pub fn amount(&self) -> u32 {
        match self {
            Column::Empty { amount, .. } => amount.unwrap_or(1),
            _ => 1,
        }
    }
}

/// Ordered column layout of a data file.
#[derive(Debug, Clone, PartialEq)]
pub struct Format {
    pub id: String,
    pub columns: Vec<Column>,
    replica_counters: HashMap<String, usize>,
}

impl Format {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            columns: Vec::new(),
            replica_counters: HashMap::new(),
        }
    }

    /// Appends a column. Concentration columns without a replica id get the next
    /// `repl%i` of their species; explicit ids advance that counter past them.
    pub fn add_column(&mut self, mut column: Column) -> &Column {
        if let Column::Concentration {
            species, replica, ..
        } = &mut column
        {
            let counter = self.replica_counters.entry(species.clone()).or_insert(0);
            match replica {
                Some(id) => {
                    if let Some(n) = id.strip_prefix("repl").and_then(|n| n.parse::<usize>().ok()) {
                        *counter = (*counter).max(n + 1);
                    }
                }
                None => {
                    *replica = Some(format!("repl{counter}"));
                    *counter += 1;
                }
            }
        }

        self.columns.push(column);
        &self.columns[self.columns.len() - 1]
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataFile {
    pub id: String,
    pub location: String,
    pub format: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    pub id: String,
    pub name: String,
    pub file: String,
    pub start: i64,
    pub stop: i64,
}

/// Formats, files and measurements of one experiment.
#[derive(Debug, Clone, PartialEq)]
pub struct DataCatalog {
    pub formats: Vec<Format>,
    pub files: Vec<DataFile>,
    pub measurements: Vec<Measurement>,
    format_ids: IdSequence,
    file_ids: IdSequence,
    measurement_ids: IdSequence,
}

impl Default for DataCatalog {
    fn default() -> Self {
        Self {
            formats: Vec::new(),
            files: Vec::new(),
            measurements: Vec::new(),
            format_ids: IdSequence::new("format"),
            file_ids: IdSequence::new("file"),
            measurement_ids: IdSequence::new("M"),
        }
    }
}

impl DataCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.formats.is_empty() && self.files.is_empty() && self.measurements.is_empty()
    }

    /// Creates a format from the given columns and returns its id.
    pub fn add_format(&mut self, columns: Vec<Column>) -> String {
        let mut format = Format::new(self.format_ids.allocate());
        for column in columns {
            format.add_column(column);
        }
        let id = format.id.clone();
        self.formats.push(format);
        id
    }

    pub fn add_file(&mut self, location: impl Into<String>, format: impl Into<String>) -> String {
        let id = self.file_ids.allocate();
        self.files.push(DataFile {
            id: id.clone(),
            location: location.into(),
            format: format.into(),
        });
        id
    }

    pub fn add_measurement(
        &mut self,
        name: impl Into<String>,
        file: impl Into<String>,
        start: i64,
        stop: i64,
    ) -> String {
        let id = self.measurement_ids.allocate();
        self.measurements.push(Measurement {
            id: id.clone(),
            name: name.into(),
            file: file.into(),
            start,
            stop,
        });
        id
    }

    pub fn format(&self, id: &str) -> Option<&Format> {
        self.formats.iter().find(|f| f.id == id)
    }

    pub fn format_mut(&mut self, id: &str) -> Option<&mut Format> {
        self.formats.iter_mut().find(|f| f.id == id)
    }

    pub fn file(&self, id: &str) -> Option<&DataFile> {
        self.files.iter().find(|f| f.id == id)
    }

    pub fn file_by_location(&self, location: &str) -> Option<&DataFile> {
        self.files.iter().find(|f| f.location == location)
    }

    pub fn measurement(&self, id: &str) -> Option<&Measurement> {
        self.measurements.iter().find(|m| m.id == id)
    }

    /// Ids of every format, file and measurement.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.formats
            .iter()
            .map(|f| f.id.as_str())
            .chain(self.files.iter().map(|f| f.id.as_str()))
            .chain(self.measurements.iter().map(|m| m.id.as_str()))
    }
}

impl From<&Column> for ColumnAnnot {
    fn from(column: &Column) -> Self {
        let mut annot = ColumnAnnot {
            column_type: column.kind().to_string(),
            unit: None,
            species: None,
            replica: None,
            amount: None,
            text: None,
        };

        match column {
            Column::Time { unit, text } => {
                annot.unit = Some(unit.clone());
                annot.text = text.clone();
            }
            Column::Concentration {
                species,
                unit,
                replica,
                text,
            } => {
                annot.unit = Some(unit.clone());
                annot.species = Some(species.clone());
                annot.replica = replica.clone();
                annot.text = text.clone();
            }
            Column::Empty { amount, text } => {
                annot.amount = amount.map(|a| a.to_string());
                annot.text = text.clone();
            }
        }

        annot
    }
}

impl From<ColumnAnnot> for Column {
    fn from(annot: ColumnAnnot) -> Self {
        match annot.column_type.as_str() {
            COLUMN_TYPE_TIME => Column::Time {
                unit: annot.unit.unwrap_or_default(),
                text: annot.text,
            },
            COLUMN_TYPE_CONCENTRATION => Column::Concentration {
                species: annot.species.unwrap_or_default(),
                unit: annot.unit.unwrap_or_default(),
                replica: annot.replica,
                text: annot.text,
            },
            COLUMN_TYPE_EMPTY => Column::Empty {
                amount: annot.amount.and_then(|a| a.trim().parse().ok()),
                text: annot.text,
            },
            other => {
                log::debug!("Unknown column type '{other}' read as an empty column");
                Column::Empty {
                    amount: None,
                    text: Some(other.to_string()),
                }
            }
        }
    }
}

impl From<&DataCatalog> for DataAnnot {
    fn from(catalog: &DataCatalog) -> Self {
        DataAnnot {
            xmlns: default_xmlns(),
            formats: FormatsWrapper {
                format: catalog
                    .formats
                    .iter()
                    .map(|f| FormatAnnot {
                        id: f.id.clone(),
                        columns: f.columns.iter().map(ColumnAnnot::from).collect(),
                    })
                    .collect(),
            },
            files: FilesWrapper {
                file: catalog
                    .files
                    .iter()
                    .map(|f| FileAnnot {
                        id: f.id.clone(),
                        location: f.location.clone(),
                        format: f.format.clone(),
                    })
                    .collect(),
            },
            measurements: MeasurementsWrapper {
                measurement: catalog
                    .measurements
                    .iter()
                    .map(|m| MeasurementAnnot {
                        id: m.id.clone(),
                        name: m.name.clone(),
                        file: m.file.clone(),
                        start: m.start,
                        stop: m.stop,
                    })
                    .collect(),
            },
        }
    }
}

impl From<DataAnnot> for DataCatalog {
    /// Rebuilds the catalog, advancing every id sequence past the ids read.
    fn from(annot: DataAnnot) -> Self {
        let mut catalog = DataCatalog::new();

        for format_annot in annot.formats.format {
            catalog.format_ids.observe(&format_annot.id);
            let mut format = Format::new(format_annot.id);
            for column in format_annot.columns {
                format.add_column(Column::from(column));
            }
            catalog.formats.push(format);
        }

        for file in annot.files.file {
            catalog.file_ids.observe(&file.id);
            catalog.files.push(DataFile {
                id: file.id,
                location: file.location,
                format: file.format,
            });
        }

        for m in annot.measurements.measurement {
            catalog.measurement_ids.observe(&m.id);
            catalog.measurements.push(Measurement {
                id: m.id,
                name: m.name,
                file: m.file,
                start: m.start,
                stop: m.stop,
            });
        }

        catalog
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::sbml::annotations::EnzymeMLAnnotation;

    fn conc(species: &str, replica: Option<&str>) -> Column {
        Column::Concentration {
            species: species.into(),
            unit: "u0".into(),
            replica: replica.map(str::to_string),
            text: None,
        }
    }

    #[test]
    fn test_replicas_are_numbered_per_species() {
        let mut format = Format::new("format0");
        format.add_column(Column::Time {
            unit: "u1".into(),
            text: None,
        });
        format.add_column(conc("s1", None));
        format.add_column(conc("s1", None));
        format.add_column(conc("s2", None));

        let replicas: Vec<_> = format.columns.iter().filter_map(Column::replica).collect();
        assert_eq!(replicas, vec!["repl0", "repl1", "repl0"]);
    }

    #[test]
    fn test_explicit_replica_advances_counter() {
        let mut format = Format::new("format0");
        format.add_column(conc("s1", Some("repl4")));
        format.add_column(conc("s1", Some("custom")));
        let added = format.add_column(conc("s1", None)).clone();

        assert_eq!(added.replica(), Some("repl5"));
    }

    #[test]
    fn test_sequences_are_independent() {
        let mut catalog = DataCatalog::new();
        let format = catalog.add_format(vec![conc("s0", None)]);
        let file = catalog.add_file("./data/data.csv", &format);
        let measurement = catalog.add_measurement("run", &file, 0, 10);

        assert_eq!(format, "format0");
        assert_eq!(file, "file0");
        assert_eq!(measurement, "M0");
        assert_eq!(
            catalog.file_by_location("./data/data.csv").map(|f| f.id.as_str()),
            Some("file0")
        );
    }

    #[test]
    fn test_catalog_reload_reseeds_sequences() {
        // ARRANGE
        let mut catalog = DataCatalog::new();
        let format = catalog.add_format(vec![
            Column::Time {
                unit: "u1".into(),
                text: Some("time".into()),
            },
            conc("s0", None),
            Column::Empty {
                amount: Some(2),
                text: None,
            },
        ]);
        catalog.add_file("./data/data.csv", &format);
        catalog.add_measurement("run", "file0", 0, 10);

        // ACT
        let fragment = DataAnnot::from(&catalog).to_fragment().unwrap();
        let mut reloaded = DataCatalog::from(DataAnnot::from_fragment(&fragment).unwrap());

        // ASSERT
        assert_eq!(reloaded.formats, catalog.formats);
        assert_eq!(reloaded.files, catalog.files);
        assert_eq!(reloaded.measurements, catalog.measurements);
        assert_eq!(reloaded.add_format(vec![]), "format1");
        assert_eq!(reloaded.add_file("./data/b.csv", "format1"), "file1");
        let next = reloaded
            .format_mut("format0")
            .map(|f| f.add_column(conc("s0", None)).clone());
        assert_eq!(next.as_ref().and_then(Column::replica), Some("repl1"));
    }

    #[test]
    fn test_unknown_column_type_becomes_empty() {
        let column = Column::from(ColumnAnnot {
            column_type: "absorbance".into(),
            unit: None,
            species: None,
            replica: None,
            amount: None,
            text: None,
        });

        assert_eq!(
            column,
            Column::Empty {
                amount: None,
                text: Some("absorbance".into())
            }
        );
    }
}
