//! The keyed-operation protocol.
//!
//! External callers address document changes by key (`MAIN_SPECIES`, `MODEL_REACTION`,
//! ...) and a JSON payload. [`Key`] is the closed set of supported keys; [`Operation`] and
//! [`ModelOperation`] are the typed forms the documents dispatch on. A JSON payload is
//! checked for the key's required fields first and decoded into its typed record second,
//! so nothing is touched when a payload is incomplete.

use std::collections::BTreeMap;
use std::fmt::Display;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use derive_builder::Builder;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::catalog::Column;
use crate::conditions::Quantity;
use crate::error::EnzymeMLError;
use crate::ids::ElementId;
use crate::units::UnitKind;

/// Keys of the operation table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    UnspecificNote,
    MainMetaExperimentName,
    MainMetaCreator,
    MainMetaDatesCreate,
    MainMetaDatesModify,
    MainUnit,
    MainUnitIs,
    MainCompartment,
    MainCompartmentIs,
    MainSpecies,
    MainSpeciesSpecies,
    MainSpeciesProtein,
    MainReaction,
    MainReactionReactants,
    MainReactionModifiers,
    MainReactionProducts,
    MainReactionEcCode,
    MainReactionCondition,
    MainReactionReplicas,
    MainDataFormat,
    MainDataColumn,
    MainDataFile,
    MainDataMeasurements,
    ModelMetaExperimentName,
    ModelMetaCreator,
    ModelMetaDatesCreate,
    ModelMetaDatesModify,
    ModelSpecies,
    ModelReaction,
    ModelReactionReactants,
    ModelReactionModifiers,
    ModelReactionProducts,
    ModelReactionKineticLaw,
    ModelReactionParameters,
    ModelReactionData,
}

impl Key {
    pub const ALL: [Key; 35] = [
        Key::UnspecificNote,
        Key::MainMetaExperimentName,
        Key::MainMetaCreator,
        Key::MainMetaDatesCreate,
        Key::MainMetaDatesModify,
        Key::MainUnit,
        Key::MainUnitIs,
        Key::MainCompartment,
        Key::MainCompartmentIs,
        Key::MainSpecies,
        Key::MainSpeciesSpecies,
        Key::MainSpeciesProtein,
        Key::MainReaction,
        Key::MainReactionReactants,
        Key::MainReactionModifiers,
        Key::MainReactionProducts,
        Key::MainReactionEcCode,
        Key::MainReactionCondition,
        Key::MainReactionReplicas,
        Key::MainDataFormat,
        Key::MainDataColumn,
        Key::MainDataFile,
        Key::MainDataMeasurements,
        Key::ModelMetaExperimentName,
        Key::ModelMetaCreator,
        Key::ModelMetaDatesCreate,
        Key::ModelMetaDatesModify,
        Key::ModelSpecies,
        Key::ModelReaction,
        Key::ModelReactionReactants,
        Key::ModelReactionModifiers,
        Key::ModelReactionProducts,
        Key::ModelReactionKineticLaw,
        Key::ModelReactionParameters,
        Key::ModelReactionData,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Key::UnspecificNote => "UNSPECIFIC_NOTE",
            Key::MainMetaExperimentName => "MAIN_META_EXPERIMENT_NAME",
            Key::MainMetaCreator => "MAIN_META_CREATOR",
            Key::MainMetaDatesCreate => "MAIN_META_DATES_CREATE",
            Key::MainMetaDatesModify => "MAIN_META_DATES_MODIFY",
            Key::MainUnit => "MAIN_UNIT",
            Key::MainUnitIs => "MAIN_UNIT_IS",
            Key::MainCompartment => "MAIN_COMPARTMENT",
            Key::MainCompartmentIs => "MAIN_COMPARTMENT_IS",
            Key::MainSpecies => "MAIN_SPECIES",
            Key::MainSpeciesSpecies => "MAIN_SPECIES_SPECIES",
            Key::MainSpeciesProtein => "MAIN_SPECIES_PROTEIN",
            Key::MainReaction => "MAIN_REACTION",
            Key::MainReactionReactants => "MAIN_REACTION_REACTANTS",
            Key::MainReactionModifiers => "MAIN_REACTION_MODIFIERS",
            Key::MainReactionProducts => "MAIN_REACTION_PRODUCTS",
            Key::MainReactionEcCode => "MAIN_REACTION_EC_CODE",
            Key::MainReactionCondition => "MAIN_REACTION_CONDITION",
            Key::MainReactionReplicas => "MAIN_REACTION_REPLICAS",
            Key::MainDataFormat => "MAIN_DATA_FORMAT",
            Key::MainDataColumn => "MAIN_DATA_COLUMN",
            Key::MainDataFile => "MAIN_DATA_FILE",
            Key::MainDataMeasurements => "MAIN_DATA_MEASUREMENTS",
            Key::ModelMetaExperimentName => "MODEL_META_EXPERIMENT_NAME",
            Key::ModelMetaCreator => "MODEL_META_CREATOR",
            Key::ModelMetaDatesCreate => "MODEL_META_DATES_CREATE",
            Key::ModelMetaDatesModify => "MODEL_META_DATES_MODIFY",
            Key::ModelSpecies => "MODEL_SPECIES",
            Key::ModelReaction => "MODEL_REACTION",
            Key::ModelReactionReactants => "MODEL_REACTION_REACTANTS",
            Key::ModelReactionModifiers => "MODEL_REACTION_MODIFIERS",
            Key::ModelReactionProducts => "MODEL_REACTION_PRODUCTS",
            Key::ModelReactionKineticLaw => "MODEL_REACTION_KINETIC_LAW",
            Key::ModelReactionParameters => "MODEL_REACTION_PARAMETERS",
            Key::ModelReactionData => "MODEL_REACTION_DATA",
        }
    }

    /// Fields a JSON payload object must contain. For list payloads every element is
    /// checked.
    pub fn required_fields(&self) -> &'static [&'static str] {
        match self {
            Key::MainMetaCreator | Key::ModelMetaCreator => &["family", "given"],
            Key::MainUnit => &["name", "units"],
            Key::MainSpecies => &["name", "compartment"],
            Key::MainSpeciesProtein => &["sequence"],
            Key::MainReaction | Key::ModelReaction | Key::ModelSpecies => &["name"],
            Key::MainReactionReactants
            | Key::MainReactionModifiers
            | Key::MainReactionProducts
            | Key::ModelReactionReactants
            | Key::ModelReactionModifiers
            | Key::ModelReactionProducts => &["id"],
            Key::MainReactionReplicas => &["measurement", "replica"],
            Key::MainDataColumn => &["type"],
            Key::MainDataFile => &["file", "format"],
            Key::MainDataMeasurements => &["name", "file", "start", "stop"],
            Key::ModelReactionParameters => &["name", "value"],
            _ => &[],
        }
    }

    /// Whether the operation annotates an existing element given as target.
    pub fn requires_target(&self) -> bool {
        matches!(
            self,
            Key::UnspecificNote
                | Key::MainUnitIs
                | Key::MainCompartmentIs
                | Key::MainSpeciesSpecies
                | Key::MainSpeciesProtein
                | Key::MainReactionReactants
                | Key::MainReactionModifiers
                | Key::MainReactionProducts
                | Key::MainReactionEcCode
                | Key::MainReactionCondition
                | Key::MainReactionReplicas
                | Key::MainDataColumn
                | Key::ModelReactionReactants
                | Key::ModelReactionModifiers
                | Key::ModelReactionProducts
                | Key::ModelReactionKineticLaw
                | Key::ModelReactionParameters
                | Key::ModelReactionData
        )
    }

    /// Fails with [`EnzymeMLError::MissingTarget`] when a target is required but absent.
    pub fn check_target(&self, target: Option<&str>) -> Result<(), EnzymeMLError> {
        match target {
            None if self.requires_target() => Err(EnzymeMLError::MissingTarget(self.to_string())),
            _ => Ok(()),
        }
    }

    /// Keys applied to kinetic models rather than the experiment.
    pub fn is_model_key(&self) -> bool {
        self.as_str().starts_with("MODEL_")
    }

    /// Checks the required fields of a JSON payload.
    pub fn check_payload(&self, payload: &Value) -> Result<(), EnzymeMLError> {
        let check = |object: &serde_json::Map<String, Value>| {
            match self
                .required_fields()
                .iter()
                .find(|field| object.get(**field).map_or(true, Value::is_null))
            {
                Some(field) => Err(EnzymeMLError::missing_field(self, *field)),
                None => Ok(()),
            }
        };

        match payload {
            Value::Object(object) => check(object),
            Value::Array(items) => items
                .iter()
                .filter_map(Value::as_object)
                .try_for_each(check),
            _ => Ok(()),
        }
    }
}

impl Display for Key {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Key {
    type Err = EnzymeMLError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Key::ALL
            .iter()
            .find(|key| key.as_str() == s.trim())
            .copied()
            .ok_or_else(|| EnzymeMLError::UnknownKey(s.to_string()))
    }
}

/// What an operation hands back: the element pair for markup elements, a plain id for
/// catalog entries and replicas.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Identifier {
    Element(ElementId),
    Catalog(String),
}

impl Identifier {
    pub fn short_id(&self) -> &str {
        match self {
            Identifier::Element(id) => &id.short_id,
            Identifier::Catalog(id) => id,
        }
    }

    pub fn meta_id(&self) -> Option<&str> {
        match self {
            Identifier::Element(id) => Some(&id.meta_id),
            Identifier::Catalog(_) => None,
        }
    }
}

impl Display for Identifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.short_id())
    }
}

impl From<ElementId> for Identifier {
    fn from(id: ElementId) -> Self {
        Identifier::Element(id)
    }
}

// ============================================================================
// PAYLOADS
// ============================================================================

/// Accepts a single value or a list of values.
fn one_or_many<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany<T> {
        Many(Vec<T>),
        One(T),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::Many(values) => values,
        OneOrMany::One(value) => vec![value],
    })
}

fn default_true() -> bool {
    true
}

/// Notes attached to an element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NotePayload {
    /// Rendered as a heading followed by a paragraph
    Section { heading: String, text: String },
    /// XHTML markup, or plain text wrapped into a paragraph
    Markup(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Builder)]
pub struct CreatorPayload {
    #[builder(setter(into))]
    pub family: String,
    #[builder(setter(into))]
    pub given: String,
    #[serde(default)]
    #[builder(default, setter(into, strip_option))]
    pub email: Option<String>,
    #[serde(default)]
    #[builder(default, setter(into, strip_option))]
    pub orcid: Option<String>,
    #[serde(default)]
    #[builder(default, setter(into, strip_option))]
    pub org: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitAtomPayload {
    pub kind: UnitKind,
    #[serde(default = "UnitAtomPayload::default_factor")]
    pub exponent: f64,
    /// Power-of-ten prefix; defaults to `0` (no prefix)
    #[serde(default)]
    pub scale: i32,
    #[serde(default = "UnitAtomPayload::default_factor")]
    pub multiplier: f64,
}

impl UnitAtomPayload {
    fn default_factor() -> f64 {
        1.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitPayload {
    pub name: String,
    pub units: Vec<UnitAtomPayload>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Builder)]
pub struct CompartmentPayload {
    #[serde(default = "CompartmentPayload::default_name")]
    #[builder(default = "CompartmentPayload::default_name()", setter(into))]
    pub name: String,
    #[serde(default = "CompartmentPayload::default_dimensions")]
    #[builder(default = "3.0")]
    pub dimensions: f64,
    #[serde(default)]
    #[builder(default, setter(strip_option))]
    pub size: Option<f64>,
    /// Unit symbol or unit definition id
    #[serde(default)]
    #[builder(default, setter(into, strip_option))]
    pub units: Option<String>,
    #[serde(default = "default_true")]
    #[builder(default = "true")]
    pub constant: bool,
}

impl CompartmentPayload {
    fn default_name() -> String {
        "unidentified".to_string()
    }

    fn default_dimensions() -> f64 {
        3.0
    }
}

/// A standard deviation, given as a number or as a `[value, unit]` pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "StdDevRepr")]
pub struct StdDev {
    pub value: f64,
    pub unit: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StdDevRepr {
    Value(f64),
    WithUnit(f64, String),
    Object { value: f64, unit: Option<String> },
}

impl From<StdDevRepr> for StdDev {
    fn from(repr: StdDevRepr) -> Self {
        match repr {
            StdDevRepr::Value(value) => StdDev { value, unit: None },
            StdDevRepr::WithUnit(value, unit) => StdDev {
                value,
                unit: Some(unit),
            },
            StdDevRepr::Object { value, unit } => StdDev { value, unit },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Builder)]
pub struct SpeciesPayload {
    #[builder(setter(into))]
    pub name: String,
    #[builder(setter(into))]
    pub compartment: String,
    /// SBO term or role name; interactor when absent
    #[serde(default, rename = "type")]
    #[builder(default, setter(into, strip_option))]
    pub species_type: Option<String>,
    #[serde(default)]
    #[builder(default)]
    pub constant: bool,
    #[serde(default)]
    #[builder(default, setter(strip_option))]
    pub init_conc: Option<f64>,
    #[serde(default)]
    #[builder(default, setter(strip_option))]
    pub init_amount: Option<f64>,
    #[serde(default)]
    #[builder(default, setter(into, strip_option))]
    pub units: Option<String>,
    #[serde(default)]
    #[builder(default, setter(strip_option))]
    pub stdev: Option<StdDev>,
    #[serde(default)]
    #[builder(default)]
    pub boundary_conditions: bool,
}

/// Chemical identity of a small-molecule species.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChemistryPayload {
    #[serde(default, deserialize_with = "one_or_many")]
    pub is: Vec<String>,
    #[serde(default)]
    pub inchi: Option<String>,
    #[serde(default)]
    pub smiles: Option<String>,
    #[serde(default)]
    pub iupac: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProteinPayload {
    pub sequence: String,
    #[serde(default, deserialize_with = "one_or_many")]
    pub is: Vec<String>,
    #[serde(default, deserialize_with = "one_or_many")]
    pub has_part: Vec<String>,
    #[serde(default, deserialize_with = "one_or_many")]
    pub has_taxon: Vec<String>,
    #[serde(default, deserialize_with = "one_or_many")]
    pub encoded_by: Vec<String>,
    #[serde(default, deserialize_with = "one_or_many")]
    pub occurs_in: Vec<String>,
}

/// A species taking part in a reaction. Modifiers ignore stoichiometry and constant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentPayload {
    pub id: String,
    #[serde(default, alias = "stochiometry")]
    pub stoichiometry: Option<f64>,
    #[serde(default = "default_true")]
    pub constant: bool,
}

impl ComponentPayload {
    pub fn new(id: impl Into<String>, stoichiometry: f64) -> Self {
        Self {
            id: id.into(),
            stoichiometry: Some(stoichiometry),
            constant: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterPayload {
    pub name: String,
    pub value: f64,
    #[serde(default)]
    pub units: Option<String>,
    #[serde(default)]
    pub stdev: Option<StdDev>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Builder)]
pub struct ReactionPayload {
    #[builder(setter(into))]
    pub name: String,
    #[serde(default)]
    #[builder(default)]
    pub reversible: bool,
    #[serde(default, deserialize_with = "one_or_many")]
    #[builder(default)]
    pub reactants: Vec<ComponentPayload>,
    #[serde(default, alias = "modifiers", deserialize_with = "one_or_many")]
    #[builder(default)]
    pub modifier: Vec<ComponentPayload>,
    #[serde(default, deserialize_with = "one_or_many")]
    #[builder(default)]
    pub products: Vec<ComponentPayload>,
    /// Kinetic law formula; kinetic models only
    #[serde(default)]
    #[builder(default, setter(into, strip_option))]
    pub kineticlaw: Option<String>,
    /// Local parameters of the kinetic law; kinetic models only
    #[serde(default)]
    #[builder(default)]
    pub parameters: Vec<ParameterPayload>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConditionPayload {
    #[serde(default)]
    pub ph: Option<f64>,
    #[serde(default)]
    pub temperature: Option<Quantity>,
    #[serde(default)]
    pub pressure: Option<Quantity>,
    #[serde(default, alias = "shaking_frequency")]
    pub shaking: Option<Quantity>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplicaPayload {
    pub measurement: String,
    pub replica: String,
    #[serde(default)]
    pub id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilePayload {
    pub file: String,
    pub format: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasurementPayload {
    pub name: String,
    pub file: String,
    pub start: i64,
    pub stop: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSpeciesPayload {
    pub name: String,
    #[serde(default, rename = "type")]
    pub species_type: Option<String>,
    #[serde(default)]
    pub constant: bool,
    /// Defaults to the first compartment of the model
    #[serde(default)]
    pub compartment: Option<String>,
}

// ============================================================================
// OPERATIONS
// ============================================================================

/// Changes applicable to an experiment document.
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    Note(NotePayload),
    ExperimentName(String),
    Creator(CreatorPayload),
    DateCreated(Option<DateTime<Utc>>),
    DateModified(Option<DateTime<Utc>>),
    Unit(UnitPayload),
    UnitIs(Vec<String>),
    Compartment(CompartmentPayload),
    CompartmentIs(Vec<String>),
    Species(SpeciesPayload),
    SpeciesChemistry(ChemistryPayload),
    SpeciesProtein(ProteinPayload),
    Reaction(ReactionPayload),
    Reactants(Vec<ComponentPayload>),
    Modifiers(Vec<ComponentPayload>),
    Products(Vec<ComponentPayload>),
    EcCode(Vec<String>),
    Condition(ConditionPayload),
    Replicas(Vec<ReplicaPayload>),
    DataFormat(Vec<Column>),
    DataColumn(Column),
    DataFile(FilePayload),
    Measurement(MeasurementPayload),
}

impl Operation {
    pub fn key(&self) -> Key {
        match self {
            Operation::Note(_) => Key::UnspecificNote,
            Operation::ExperimentName(_) => Key::MainMetaExperimentName,
            Operation::Creator(_) => Key::MainMetaCreator,
            Operation::DateCreated(_) => Key::MainMetaDatesCreate,
            Operation::DateModified(_) => Key::MainMetaDatesModify,
            Operation::Unit(_) => Key::MainUnit,
            Operation::UnitIs(_) => Key::MainUnitIs,
            Operation::Compartment(_) => Key::MainCompartment,
            Operation::CompartmentIs(_) => Key::MainCompartmentIs,
            Operation::Species(_) => Key::MainSpecies,
            Operation::SpeciesChemistry(_) => Key::MainSpeciesSpecies,
            Operation::SpeciesProtein(_) => Key::MainSpeciesProtein,
            Operation::Reaction(_) => Key::MainReaction,
            Operation::Reactants(_) => Key::MainReactionReactants,
            Operation::Modifiers(_) => Key::MainReactionModifiers,
            Operation::Products(_) => Key::MainReactionProducts,
            Operation::EcCode(_) => Key::MainReactionEcCode,
            Operation::Condition(_) => Key::MainReactionCondition,
            Operation::Replicas(_) => Key::MainReactionReplicas,
            Operation::DataFormat(_) => Key::MainDataFormat,
            Operation::DataColumn(_) => Key::MainDataColumn,
            Operation::DataFile(_) => Key::MainDataFile,
            Operation::Measurement(_) => Key::MainDataMeasurements,
        }
    }

    /// Decodes a JSON payload for an experiment key.
    pub fn from_json(key: Key, payload: Value) -> Result<Self, EnzymeMLError> {
        key.check_payload(&payload)?;

        Ok(match key {
            Key::UnspecificNote => Operation::Note(decode(key, payload)?),
            Key::MainMetaExperimentName => Operation::ExperimentName(decode(key, payload)?),
            Key::MainMetaCreator => Operation::Creator(decode(key, payload)?),
            Key::MainMetaDatesCreate => Operation::DateCreated(decode(key, payload)?),
            Key::MainMetaDatesModify => Operation::DateModified(decode(key, payload)?),
            Key::MainUnit => Operation::Unit(decode(key, payload)?),
            Key::MainUnitIs => Operation::UnitIs(decode_list(key, payload)?),
            Key::MainCompartment => Operation::Compartment(decode(key, payload)?),
            Key::MainCompartmentIs => Operation::CompartmentIs(decode_list(key, payload)?),
            Key::MainSpecies => Operation::Species(decode(key, payload)?),
            Key::MainSpeciesSpecies => Operation::SpeciesChemistry(decode(key, payload)?),
            Key::MainSpeciesProtein => Operation::SpeciesProtein(decode(key, payload)?),
            Key::MainReaction => Operation::Reaction(decode(key, payload)?),
            Key::MainReactionReactants => Operation::Reactants(decode_list(key, payload)?),
            Key::MainReactionModifiers => Operation::Modifiers(decode_list(key, payload)?),
            Key::MainReactionProducts => Operation::Products(decode_list(key, payload)?),
            Key::MainReactionEcCode => Operation::EcCode(decode_list(key, payload)?),
            Key::MainReactionCondition => Operation::Condition(decode(key, payload)?),
            Key::MainReactionReplicas => Operation::Replicas(decode_list(key, payload)?),
            Key::MainDataFormat => Operation::DataFormat(decode_format(key, payload)?),
            Key::MainDataColumn => Operation::DataColumn(decode(key, payload)?),
            Key::MainDataFile => Operation::DataFile(decode(key, payload)?),
            Key::MainDataMeasurements => Operation::Measurement(decode(key, payload)?),
            _ => return Err(EnzymeMLError::MisplacedKey(key.to_string())),
        })
    }
}

/// Changes applicable to a kinetic model.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelOperation {
    Note(NotePayload),
    ModelName(String),
    Creator(CreatorPayload),
    DateCreated(Option<DateTime<Utc>>),
    DateModified(Option<DateTime<Utc>>),
    Species(ModelSpeciesPayload),
    Reaction(ReactionPayload),
    Reactants(Vec<ComponentPayload>),
    Modifiers(Vec<ComponentPayload>),
    Products(Vec<ComponentPayload>),
    KineticLaw(String),
    Parameters(Vec<ParameterPayload>),
    /// Experiment reaction id mapped to the replica ids used; an empty list stands for
    /// the whole reaction
    Data(BTreeMap<String, Vec<String>>),
}

impl ModelOperation {
    pub fn key(&self) -> Key {
        match self {
            ModelOperation::Note(_) => Key::UnspecificNote,
            ModelOperation::ModelName(_) => Key::ModelMetaExperimentName,
            ModelOperation::Creator(_) => Key::ModelMetaCreator,
            ModelOperation::DateCreated(_) => Key::ModelMetaDatesCreate,
            ModelOperation::DateModified(_) => Key::ModelMetaDatesModify,
            ModelOperation::Species(_) => Key::ModelSpecies,
            ModelOperation::Reaction(_) => Key::ModelReaction,
            ModelOperation::Reactants(_) => Key::ModelReactionReactants,
            ModelOperation::Modifiers(_) => Key::ModelReactionModifiers,
            ModelOperation::Products(_) => Key::ModelReactionProducts,
            ModelOperation::KineticLaw(_) => Key::ModelReactionKineticLaw,
            ModelOperation::Parameters(_) => Key::ModelReactionParameters,
            ModelOperation::Data(_) => Key::ModelReactionData,
        }
    }

    /// Decodes a JSON payload for a kinetic-model key.
    pub fn from_json(key: Key, payload: Value) -> Result<Self, EnzymeMLError> {
        key.check_payload(&payload)?;

        Ok(match key {
            Key::UnspecificNote => ModelOperation::Note(decode(key, payload)?),
            Key::ModelMetaExperimentName => ModelOperation::ModelName(decode(key, payload)?),
            Key::ModelMetaCreator => ModelOperation::Creator(decode(key, payload)?),
            Key::ModelMetaDatesCreate => ModelOperation::DateCreated(decode(key, payload)?),
            Key::ModelMetaDatesModify => ModelOperation::DateModified(decode(key, payload)?),
            Key::ModelSpecies => ModelOperation::Species(decode(key, payload)?),
            Key::ModelReaction => ModelOperation::Reaction(decode(key, payload)?),
            Key::ModelReactionReactants => ModelOperation::Reactants(decode_list(key, payload)?),
            Key::ModelReactionModifiers => ModelOperation::Modifiers(decode_list(key, payload)?),
            Key::ModelReactionProducts => ModelOperation::Products(decode_list(key, payload)?),
            Key::ModelReactionKineticLaw => ModelOperation::KineticLaw(decode(key, payload)?),
            Key::ModelReactionParameters => {
                ModelOperation::Parameters(decode_list(key, payload)?)
            }
            Key::ModelReactionData => ModelOperation::Data(decode(key, payload)?),
            _ => return Err(EnzymeMLError::MisplacedKey(key.to_string())),
        })
    }
}

fn decode<T: DeserializeOwned>(key: Key, payload: Value) -> Result<T, EnzymeMLError> {
    serde_json::from_value(payload).map_err(|source| EnzymeMLError::InvalidPayload {
        key: key.to_string(),
        source,
    })
}

fn decode_list<T: DeserializeOwned>(key: Key, payload: Value) -> Result<Vec<T>, EnzymeMLError> {
    match payload {
        Value::Array(items) => items.into_iter().map(|item| decode(key, item)).collect(),
        single => Ok(vec![decode(key, single)?]),
    }
}

/// Formats are given as `{"columns": [...]}` or as the bare column list.
fn decode_format(key: Key, payload: Value) -> Result<Vec<Column>, EnzymeMLError> {
    match payload {
        Value::Object(mut object) => match object.remove("columns") {
            Some(columns) => decode(key, columns),
            None => Err(EnzymeMLError::missing_field(key, "columns")),
        },
        list => decode(key, list),
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    #[test]
    fn test_key_names_round_trip() {
        for key in Key::ALL {
            assert_eq!(Key::from_str(key.as_str()).unwrap(), key);
        }
    }

    #[test]
    fn test_unknown_key() {
        let result = Key::from_str("MAIN_SPECIES_FOO");
        assert!(matches!(result, Err(EnzymeMLError::UnknownKey(k)) if k == "MAIN_SPECIES_FOO"));
    }

    #[test]
    fn test_missing_field_names_field_and_key() {
        let result = Operation::from_json(Key::MainSpecies, json!({"name": "NAD"}));

        match result {
            Err(EnzymeMLError::MissingField { key, field }) => {
                assert_eq!(key, "MAIN_SPECIES");
                assert_eq!(field, "compartment");
            }
            other => panic!("Expected missing field, got {other:?}"),
        }
    }

    #[test]
    fn test_list_payloads_check_every_element() {
        let result = Operation::from_json(
            Key::MainReactionReactants,
            json!([{"id": "s0"}, {"stoichiometry": 1.0}]),
        );
        assert!(matches!(result, Err(EnzymeMLError::MissingField { .. })));
    }

    #[test]
    fn test_components_accept_single_record_and_legacy_spelling() {
        let op = Operation::from_json(
            Key::MainReactionProducts,
            json!({"id": "s2", "stochiometry": 2.0}),
        )
        .unwrap();

        assert_eq!(
            op,
            Operation::Products(vec![ComponentPayload {
                id: "s2".into(),
                stoichiometry: Some(2.0),
                constant: true,
            }])
        );
    }

    #[test]
    fn test_species_defaults_and_stdev_pair() {
        let op = Operation::from_json(
            Key::MainSpecies,
            json!({
                "name": "NADH",
                "compartment": "c0",
                "init_conc": 0.5,
                "stdev": [0.01, "mmol/l"]
            }),
        )
        .unwrap();

        let Operation::Species(species) = op else {
            panic!("Expected species operation");
        };
        assert!(!species.constant);
        assert!(!species.boundary_conditions);
        assert_eq!(species.species_type, None);
        assert_eq!(
            species.stdev,
            Some(StdDev {
                value: 0.01,
                unit: Some("mmol/l".into())
            })
        );
    }

    #[test]
    fn test_compartment_defaults() {
        let op = Operation::from_json(Key::MainCompartment, json!({})).unwrap();
        assert_eq!(
            op,
            Operation::Compartment(CompartmentPayload {
                name: "unidentified".into(),
                dimensions: 3.0,
                size: None,
                units: None,
                constant: true,
            })
        );
    }

    #[test]
    fn test_unit_atom_defaults() {
        let op = Operation::from_json(
            Key::MainUnit,
            json!({"name": "mmol/l", "units": [{"kind": "mole", "scale": -3}, {"kind": "litre", "exponent": -1}]}),
        )
        .unwrap();

        let Operation::Unit(unit) = op else {
            panic!("Expected unit operation");
        };
        assert_eq!(unit.units[0].exponent, 1.0);
        assert_eq!(unit.units[0].multiplier, 1.0);
        assert_eq!(unit.units[1].scale, 0);
    }

    #[test]
    fn test_format_accepts_object_and_list() {
        let columns = json!([{"type": "time", "unit": "s"}, {"type": "conc", "species": "s0", "unit": "mmol/l"}]);
        let from_list = Operation::from_json(Key::MainDataFormat, columns.clone()).unwrap();
        let from_object =
            Operation::from_json(Key::MainDataFormat, json!({ "columns": columns })).unwrap();

        assert_eq!(from_list, from_object);
    }

    #[test]
    fn test_model_keys_are_rejected_for_experiments() {
        let result = Operation::from_json(Key::ModelReactionKineticLaw, json!("k * s0"));
        assert!(matches!(result, Err(EnzymeMLError::MisplacedKey(_))));
        assert!(Key::ModelReactionKineticLaw.is_model_key());
    }

    #[test]
    fn test_annotating_keys_need_a_target() {
        assert!(matches!(
            Key::MainReactionReplicas.check_target(None),
            Err(EnzymeMLError::MissingTarget(key)) if key == "MAIN_REACTION_REPLICAS"
        ));
        assert!(Key::ModelReactionKineticLaw.check_target(None).is_err());
        assert!(Key::MainReactionCondition.check_target(Some("r0")).is_ok());
        assert!(Key::MainSpecies.check_target(None).is_ok());
        assert!(!Key::MainDataFormat.requires_target());
    }

    #[test]
    fn test_builder_defaults() {
        let species = SpeciesPayloadBuilder::default()
            .name("Ethanol")
            .compartment("c0")
            .init_conc(10.0)
            .build()
            .unwrap();

        assert_eq!(species.init_amount, None);
        assert!(!species.constant);

        let compartment = CompartmentPayloadBuilder::default().build().unwrap();
        assert_eq!(compartment.name, "unidentified");
        assert!(compartment.constant);
    }
}
