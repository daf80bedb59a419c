//! Experiment records as produced by the data-entry form.
//!
//! The form submits a flat key-value record: creator, vessel, enzyme, parallel lists
//! describing the substances, and the reaction conditions. Together with a table whose
//! first column is time and whose remaining columns are replicas of one species, it is
//! enough to build a complete experiment.

use std::collections::BTreeMap;
use std::fmt::Display;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};
use variantly::Variantly;

use crate::catalog::Column;
use crate::conditions::Quantity;
use crate::document::experiment::EnzymeMLDocument;
use crate::error::EnzymeMLError;
use crate::keys::{
    ComponentPayload, CompartmentPayloadBuilder, ConditionPayload, CreatorPayloadBuilder,
    FilePayload, MeasurementPayload, Operation, ProteinPayload, ReactionPayloadBuilder,
    ReplicaPayload, SpeciesPayloadBuilder,
};
use crate::sbml::speciestype::SpeciesRole;
use crate::tabular::table::Table;

/// Form values arrive as strings or numbers.
fn lenient_f64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumberOrText {
        Number(f64),
        Text(String),
    }

    match NumberOrText::deserialize(deserializer)? {
        NumberOrText::Number(n) => Ok(n),
        NumberOrText::Text(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

fn lenient_f64_list<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<f64>, D::Error> {
    #[derive(Deserialize)]
    struct Wrapper(#[serde(deserialize_with = "lenient_f64")] f64);

    Ok(Vec::<Wrapper>::deserialize(deserializer)?
        .into_iter()
        .map(|w| w.0)
        .collect())
}

fn default_time_unit() -> String {
    "s".to_string()
}

fn default_data_unit() -> String {
    "mol/l".to_string()
}

fn default_enzyme_unit() -> String {
    "%".to_string()
}

/// How a substance takes part in the reaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Variantly)]
pub enum SubstanceKind {
    Substrate,
    Product,
    Cofactor,
    Additive,
}

impl SubstanceKind {
    pub fn role(&self) -> SpeciesRole {
        match self {
            SubstanceKind::Substrate => SpeciesRole::Substrate,
            SubstanceKind::Product => SpeciesRole::Product,
            SubstanceKind::Cofactor | SubstanceKind::Additive => SpeciesRole::Interactor,
        }
    }
}

impl FromStr for SubstanceKind {
    type Err = EnzymeMLError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "substrate" => Ok(SubstanceKind::Substrate),
            "product" => Ok(SubstanceKind::Product),
            "cofactor" => Ok(SubstanceKind::Cofactor),
            "additive" => Ok(SubstanceKind::Additive),
            _ => Err(EnzymeMLError::InvalidValue {
                field: "reactant_kind".into(),
                reason: format!("unknown substance kind '{s}'"),
            }),
        }
    }
}

impl Display for SubstanceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}

/// One row of the substance lists.
#[derive(Debug, Clone, PartialEq)]
pub struct Substance {
    pub name: String,
    pub concentration: f64,
    pub unit: String,
    pub kind: SubstanceKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentRecord {
    #[serde(rename = "last_name")]
    pub family_name: String,
    pub given_name: String,
    #[serde(rename = "email-address", default)]
    pub email: Option<String>,
    #[serde(rename = "Instituion", alias = "Institution", default)]
    pub institution: Option<String>,

    #[serde(rename = "Reaction_vessel")]
    pub vessel: String,
    #[serde(rename = "Volume", deserialize_with = "lenient_f64")]
    pub volume: f64,
    pub volume_unit: String,

    #[serde(rename = "Enzyme_Name")]
    pub enzyme: String,
    #[serde(rename = "Enzyme_concentration", deserialize_with = "lenient_f64")]
    pub enzyme_concentration: f64,
    #[serde(rename = "Enzyme_unit", default = "default_enzyme_unit")]
    pub enzyme_unit: String,
    #[serde(rename = "AA_sequence")]
    pub sequence: String,

    #[serde(rename = "Reactant_name", default)]
    pub substance_names: Vec<String>,
    #[serde(rename = "concentration_value", default, deserialize_with = "lenient_f64_list")]
    pub substance_concentrations: Vec<f64>,
    #[serde(rename = "unit", default)]
    pub substance_units: Vec<String>,
    #[serde(rename = "reactant_kind", default)]
    pub substance_kinds: Vec<String>,

    #[serde(rename = "Reaction_name")]
    pub reaction: String,
    #[serde(rename = "pH", deserialize_with = "lenient_f64")]
    pub ph: f64,
    /// Temperature in kelvin
    #[serde(rename = "Temperatur", alias = "Temperature", deserialize_with = "lenient_f64")]
    pub temperature: f64,

    /// Species measured in the data columns; the first substrate when absent
    #[serde(default)]
    pub measured_species: Option<String>,
    #[serde(default = "default_time_unit")]
    pub time_unit: String,
    #[serde(default = "default_data_unit")]
    pub data_unit: String,
}

impl ExperimentRecord {
    pub fn from_json(json: &str) -> Result<Self, EnzymeMLError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Zips the parallel substance lists. All lists must have the same length.
    pub fn substances(&self) -> Result<Vec<Substance>, EnzymeMLError> {
        let n = self.substance_names.len();
        for (field, len) in [
            ("concentration_value", self.substance_concentrations.len()),
            ("unit", self.substance_units.len()),
            ("reactant_kind", self.substance_kinds.len()),
        ] {
            if len != n {
                return Err(EnzymeMLError::InvalidValue {
                    field: field.into(),
                    reason: format!("expected {n} entries, found {len}"),
                });
            }
        }

        (0..n)
            .map(|i| {
                Ok(Substance {
                    name: self.substance_names[i].clone(),
                    concentration: self.substance_concentrations[i],
                    unit: self.substance_units[i].clone(),
                    kind: SubstanceKind::from_str(&self.substance_kinds[i])?,
                })
            })
            .collect()
    }

    /// `<reaction>_<family name>` with whitespace and path separators replaced by `_`.
    pub fn default_name(&self) -> String {
        format!("{}_{}", self.reaction, self.family_name)
            .replace(|c: char| c.is_whitespace() || c == '/' || c == '\\', "_")
    }

    /// Builds an experiment from the record and its measurements.
    ///
    /// The enzyme becomes a modifier of the single reaction, as do cofactors and
    /// additives. Every data column after the first becomes one replica of the measured
    /// species.
    pub fn build(&self, name: Option<&str>, data: &Table) -> Result<EnzymeMLDocument, EnzymeMLError> {
        let substances = self.substances()?;
        let mut doc = EnzymeMLDocument::new(name.map(str::to_string).unwrap_or_else(|| self.default_name()));

        doc.add_creator(
            &self.family_name,
            &self.given_name,
            self.email.clone(),
            self.institution.clone(),
        );
        let mut creator = CreatorPayloadBuilder::default();
        creator.family(&self.family_name).given(&self.given_name);
        if let Some(email) = &self.email {
            creator.email(email);
        }
        let creator = creator.build().map_err(|e| invalid_record("creator", e))?;
        doc.add(Operation::Creator(creator), None)?;

        let compartment = CompartmentPayloadBuilder::default()
            .name(&self.vessel)
            .size(self.volume)
            .units(&self.volume_unit)
            .build()
            .map_err(|e| invalid_record("compartment", e))?;
        let compartment = doc.add(Operation::Compartment(compartment), None)?;

        let enzyme = SpeciesPayloadBuilder::default()
            .name(&self.enzyme)
            .compartment(compartment.short_id())
            .species_type(SpeciesRole::Enzyme.sbo_term().to_string())
            .constant(true)
            .init_conc(self.enzyme_concentration)
            .units(&self.enzyme_unit)
            .build()
            .map_err(|e| invalid_record("enzyme", e))?;
        let enzyme = doc.add(Operation::Species(enzyme), None)?;
        doc.add(
            Operation::SpeciesProtein(ProteinPayload {
                sequence: self.sequence.clone(),
                ..Default::default()
            }),
            Some(enzyme.short_id()),
        )?;

        let mut species_ids = BTreeMap::new();
        let mut roles: BTreeMap<&str, Vec<ComponentPayload>> = BTreeMap::new();
        for substance in &substances {
            let payload = SpeciesPayloadBuilder::default()
                .name(&substance.name)
                .compartment(compartment.short_id())
                .species_type(substance.kind.role().sbo_term().to_string())
                .init_conc(substance.concentration)
                .units(&substance.unit)
                .build()
                .map_err(|e| invalid_record("substance", e))?;
            let id = doc.add(Operation::Species(payload), None)?;

            let role = match substance.kind {
                SubstanceKind::Substrate => "reactants",
                SubstanceKind::Product => "products",
                SubstanceKind::Cofactor | SubstanceKind::Additive => "modifier",
            };
            let mut component = ComponentPayload::new(id.short_id(), 1.0);
            component.constant = substance.kind.is_cofactor();
            roles.entry(role).or_default().push(component);
            species_ids.insert(substance.name.clone(), id.short_id().to_string());
        }
        roles
            .entry("modifier")
            .or_default()
            .push(ComponentPayload::new(enzyme.short_id(), 1.0));

        let reaction = ReactionPayloadBuilder::default()
            .name(&self.reaction)
            .reversible(true)
            .reactants(roles.remove("reactants").unwrap_or_default())
            .modifier(roles.remove("modifier").unwrap_or_default())
            .products(roles.remove("products").unwrap_or_default())
            .build()
            .map_err(|e| invalid_record("reaction", e))?;
        let reaction = doc.add(Operation::Reaction(reaction), None)?;

        doc.add(
            Operation::Condition(ConditionPayload {
                ph: Some(self.ph),
                temperature: Some(Quantity::new(self.temperature, "kelvin")),
                ..Default::default()
            }),
            Some(reaction.short_id()),
        )?;

        self.add_measurements(&mut doc, &species_ids, &substances, reaction.short_id(), data)?;
        Ok(doc)
    }

    fn add_measurements(
        &self,
        doc: &mut EnzymeMLDocument,
        species_ids: &BTreeMap<String, String>,
        substances: &[Substance],
        reaction: &str,
        data: &Table,
    ) -> Result<(), EnzymeMLError> {
        let measured = match &self.measured_species {
            Some(name) => name.clone(),
            None => substances
                .iter()
                .find(|s| s.kind.is_substrate())
                .map(|s| s.name.clone())
                .ok_or_else(|| EnzymeMLError::missing_field("record", "measured_species"))?,
        };
        let species = species_ids
            .get(&measured)
            .cloned()
            .ok_or_else(|| EnzymeMLError::unknown_element("species", &measured))?;

        let mut table = Table::new("Data");
        let format = doc
            .add(
                Operation::DataFormat(vec![Column::Time {
                    unit: self.time_unit.clone(),
                    text: None,
                }]),
                None,
            )?
            .short_id()
            .to_string();
        let file = doc
            .add(
                Operation::DataFile(FilePayload {
                    file: table.location.clone(),
                    format: format.clone(),
                }),
                None,
            )?
            .short_id()
            .to_string();
        let measurement = doc
            .add(
                Operation::Measurement(MeasurementPayload {
                    name: format!("{measured} measurement"),
                    file: file.clone(),
                    start: 0,
                    stop: -1,
                }),
                None,
            )?
            .short_id()
            .to_string();

        let mut columns = data.columns.iter();
        if let Some(time) = columns.next() {
            table.add_column(time.clone());
        }
        for values in columns {
            let replica = doc.add(
                Operation::DataColumn(Column::Concentration {
                    species: species.clone(),
                    unit: self.data_unit.clone(),
                    replica: None,
                    text: None,
                }),
                Some(&format),
            )?;
            table.add_column(values.clone());
            doc.add(
                Operation::Replicas(vec![ReplicaPayload {
                    measurement: measurement.clone(),
                    replica: replica.short_id().to_string(),
                    id: None,
                }]),
                Some(reaction),
            )?;
        }

        table.id = Some(file);
        table.format = Some(format);
        doc.add_table(table);
        Ok(())
    }
}

fn invalid_record(field: &str, err: impl Display) -> EnzymeMLError {
    EnzymeMLError::InvalidValue {
        field: field.to_string(),
        reason: err.to_string(),
    }
}

/// Reads the measurement table the form uploads: a header line naming the columns
/// (`x_parameter`, `rep_1`, ...) followed by numeric rows.
pub fn read_measurements(text: &str) -> Table {
    let body = text.split_once('\n').map(|(_, rest)| rest).unwrap_or("");
    let mut table = Table::from_csv_str("./data/Data.csv", body);
    table.columns.iter_mut().for_each(|column| {
        while matches!(column.last(), Some(None)) {
            column.pop();
        }
    });
    table
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;
    use crate::tabular::table::Value;

    fn record() -> ExperimentRecord {
        serde_json::from_value(json!({
            "last_name": "Doe",
            "given_name": "Jane",
            "email-address": "jane@example.org",
            "Instituion": "University",
            "Reaction_vessel": "Eppendorf",
            "Volume": "1.5",
            "volume_unit": "ml",
            "Enzyme_Name": "ADH",
            "Enzyme_concentration": 0.1,
            "AA_sequence": "MSIPETQKGV",
            "Reactant_name": ["Ethanol", "Acetaldehyde", "NAD"],
            "concentration_value": ["10", "0", 5.0],
            "unit": ["mmol/l", "mmol/l", "mmol/l"],
            "reactant_kind": ["Substrate", "Product", "Cofactor"],
            "Reaction_name": "Ethanol oxidation",
            "pH": "7.0",
            "Temperatur": "310.15"
        }))
        .unwrap()
    }

    fn measurements() -> Table {
        read_measurements("x_parameter,rep_1,rep_2\n0,10,9.8\n60,8.2,8.0\n120,6.9,\n")
    }

    #[test]
    fn test_record_accepts_form_strings() {
        let record = record();
        assert_relative_eq!(record.volume, 1.5);
        assert_relative_eq!(record.temperature, 310.15);
        assert_eq!(record.substance_concentrations, vec![10.0, 0.0, 5.0]);
        assert_eq!(record.time_unit, "s");
    }

    #[test]
    fn test_mismatched_substance_lists() {
        let mut record = record();
        record.substance_units.pop();

        let result = record.substances();
        assert!(matches!(result, Err(EnzymeMLError::InvalidValue { field, .. }) if field == "unit"));
    }

    #[test]
    fn test_measurement_header_is_skipped() {
        let table = measurements();
        assert_eq!(table.column_count(), 3);
        assert_eq!(table.columns[0][0], Some(Value::from(0.0)));
        assert_eq!(table.columns[2].len(), 2);
    }

    #[test]
    fn test_default_name_has_no_path_separators() {
        let mut record = record();
        record.reaction = "NAD/NADH cycle".to_string();
        record.family_name = "O\\Brien".to_string();

        assert_eq!(record.default_name(), "NAD_NADH_cycle_O_Brien");
    }

    #[test]
    fn test_build_document_from_record() {
        let doc = record().build(None, &measurements()).unwrap();

        assert_eq!(doc.name, "Ethanol_oxidation_Doe");
        assert_eq!(doc.species().len(), 4);
        assert_eq!(doc.creators().len(), 1);

        let reaction = &doc.reactions()[0];
        assert_eq!(reaction.reactants.len(), 1);
        assert_eq!(reaction.products.len(), 1);
        assert_eq!(reaction.modifiers.len(), 2);
        assert!(reaction.reversible);

        let conditions = doc.conditions("r0").unwrap();
        assert_eq!(conditions.ph, Some(7.0));
        assert_eq!(conditions.temperature, Some(Quantity::new(310.15, "kelvin")));
        assert_eq!(conditions.replicas.len(), 2);
        assert_eq!(conditions.replicas[1].replica, "repl1");

        let format = doc.catalog().format("format0").unwrap();
        assert_eq!(format.columns.len(), 3);
        assert_eq!(doc.tables()[0].format.as_deref(), Some("format0"));
        assert_eq!(doc.tables()[0].id.as_deref(), Some("file0"));
    }
}
