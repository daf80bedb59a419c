//! Tabular overview of EnzymeML documents
//!
//! Implements [`Display`] for [`EnzymeMLDocument`], rendering the compartments, species,
//! reactions, conditions, data files and models of a document as nested tables.

use std::fmt::{self, Display};

use tabled::{builder::Builder, settings::Style};

use crate::catalog::DataFile;
use crate::conditions::{Quantity, ReactionConditions};
use crate::document::experiment::EnzymeMLDocument;
use crate::document::kinetic::KineticModel;
use crate::sbml::markup::{Compartment, Reaction, Species, SpeciesReference};

/// Conversion of document elements into table rows
trait TableRecord {
    /// Column headers of the table
    fn columns() -> Vec<String>;

    /// Cells of one row, in the order of [`TableRecord::columns`]
    fn to_record(&self) -> Vec<String>;
}

impl Display for EnzymeMLDocument {
    /// Renders every non-empty part of the document as a table.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut builder = Builder::default();
        builder.push_record(vec![format!("EnzymeML Document '{}'", self.name)]);

        if !self.compartments().is_empty() {
            builder.push_record(vec!["Compartments"]);
            builder.push_record(vec![to_table(self.compartments())]);
        }

        if !self.species().is_empty() {
            builder.push_record(vec!["Species"]);
            builder.push_record(vec![to_table(self.species())]);
        }

        if !self.reactions().is_empty() {
            builder.push_record(vec!["Reactions"]);
            builder.push_record(vec![to_table(self.reactions())]);
        }

        let conditions: Vec<_> = self
            .all_conditions()
            .map(|(id, c)| ConditionRow(id, c))
            .collect();
        if !conditions.is_empty() {
            builder.push_record(vec!["Conditions"]);
            builder.push_record(vec![to_table(&conditions)]);
        }

        if !self.catalog().files.is_empty() {
            builder.push_record(vec!["Data Files"]);
            builder.push_record(vec![to_table(&self.catalog().files)]);
        }

        if !self.models().is_empty() {
            builder.push_record(vec!["Models"]);
            builder.push_record(vec![to_table(self.models())]);
        }

        let mut table = builder.build();
        table.with(Style::sharp());
        write!(f, "{table}")
    }
}

fn to_table<T: TableRecord>(records: &[T]) -> String {
    let mut builder = Builder::default();
    builder.push_record(T::columns());

    for record in records {
        builder.push_record(record.to_record());
    }

    let mut table = builder.build();
    table.with(Style::rounded());
    table.to_string()
}

fn columns(names: &[&str]) -> Vec<String> {
    names.iter().map(|n| n.to_string()).collect()
}

fn or_dash<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or("-".to_string())
}

fn quantity(value: Option<&Quantity>) -> String {
    or_dash(value.map(|q| format!("{} {}", q.value, q.unit)))
}

impl TableRecord for Compartment {
    fn columns() -> Vec<String> {
        columns(&["ID", "Name", "Size", "Unit"])
    }

    fn to_record(&self) -> Vec<String> {
        vec![
            self.id.clone(),
            or_dash(self.name.as_ref()),
            or_dash(self.size),
            or_dash(self.units.as_ref()),
        ]
    }
}

impl TableRecord for Species {
    fn columns() -> Vec<String> {
        columns(&["ID", "Name", "Initial", "Unit", "Constant", "Compartment"])
    }

    fn to_record(&self) -> Vec<String> {
        vec![
            self.id.clone(),
            or_dash(self.name.as_ref()),
            or_dash(self.initial_concentration.or(self.initial_amount)),
            or_dash(self.substance_units.as_ref()),
            self.constant.to_string(),
            self.compartment.clone(),
        ]
    }
}

impl TableRecord for Reaction {
    fn columns() -> Vec<String> {
        columns(&["ID", "Name", "Reversible", "Scheme", "Modifiers"])
    }

    fn to_record(&self) -> Vec<String> {
        vec![
            self.id.clone(),
            or_dash(self.name.as_ref()),
            self.reversible.to_string(),
            reaction_scheme(self),
            self.modifiers
                .iter()
                .map(|m| m.species.as_str())
                .collect::<Vec<_>>()
                .join(", "),
        ]
    }
}

struct ConditionRow<'a>(&'a String, &'a ReactionConditions);

impl TableRecord for ConditionRow<'_> {
    fn columns() -> Vec<String> {
        columns(&["Reaction", "pH", "Temperature", "Pressure", "Replicas"])
    }

    fn to_record(&self) -> Vec<String> {
        let ConditionRow(reaction, conditions) = self;
        vec![
            reaction.to_string(),
            or_dash(conditions.ph),
            quantity(conditions.temperature.as_ref()),
            quantity(conditions.pressure.as_ref()),
            conditions.replicas.len().to_string(),
        ]
    }
}

impl TableRecord for DataFile {
    fn columns() -> Vec<String> {
        columns(&["ID", "Location", "Format"])
    }

    fn to_record(&self) -> Vec<String> {
        vec![self.id.clone(), self.location.clone(), self.format.clone()]
    }
}

impl TableRecord for KineticModel {
    fn columns() -> Vec<String> {
        columns(&["Name", "Species", "Reactions"])
    }

    fn to_record(&self) -> Vec<String> {
        vec![
            self.name.clone(),
            self.species().len().to_string(),
            self.reactions().len().to_string(),
        ]
    }
}

/// Writes a reaction as `1 s0 + 1 s1 → 1 s2`, or with `⇄` when reversible.
fn reaction_scheme(reaction: &Reaction) -> String {
    let side = |refs: &[SpeciesReference]| {
        refs.iter()
            .map(|r| format!("{} {}", r.stoichiometry.unwrap_or(1.0), r.species))
            .collect::<Vec<_>>()
            .join(" + ")
    };

    let arrow = if reaction.reversible { "⇄" } else { "→" };
    format!(
        "{} {arrow} {}",
        side(&reaction.reactants),
        side(&reaction.products)
    )
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_table_output_lists_elements() {
        let mut doc = EnzymeMLDocument::new("Overview");
        doc.add_json("MAIN_COMPARTMENT", json!({"name": "Cell", "size": 1.0, "units": "l"}), None)
            .unwrap();
        doc.add_json(
            "MAIN_SPECIES",
            json!({"name": "NAD", "compartment": "c0", "init_conc": 1.0, "units": "mmol/l"}),
            None,
        )
        .unwrap();

        let output = doc.to_string();

        assert!(output.contains("EnzymeML Document 'Overview'"));
        assert!(output.contains("Compartments"));
        assert!(output.contains("NAD"));
        assert!(!output.contains("Reactions"));
    }

    #[test]
    fn test_reaction_scheme() {
        let mut doc = EnzymeMLDocument::new("Scheme");
        doc.add_json("MAIN_COMPARTMENT", json!({"name": "Cell"}), None).unwrap();
        for name in ["A", "B"] {
            doc.add_json("MAIN_SPECIES", json!({"name": name, "compartment": "c0"}), None)
                .unwrap();
        }
        doc.add_json(
            "MAIN_REACTION",
            json!({
                "name": "r",
                "reversible": true,
                "reactants": [{"id": "s0", "stoichiometry": 2.0}],
                "products": [{"id": "s1"}],
            }),
            None,
        )
        .unwrap();

        assert_eq!(reaction_scheme(&doc.reactions()[0]), "2 s0 ⇄ 1 s1");
    }
}
