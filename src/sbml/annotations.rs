//! EnzymeML annotation blocks.
//!
//! Every block is a serde-mapped struct in the `http://sbml.org/enzymeml/version1`
//! namespace. Blocks are serialized with `quick_xml::se` into a fragment that is attached
//! to an element's [`Annotation`], and read back by locating the fragment with the
//! block's tag in the EnzymeML namespace.
//!
//! | Block | Tag | Attached to |
//! |---|---|---|
//! | [`SpeciesAnnot`] | `species` | species |
//! | [`ProteinAnnot`] | `protein` | species |
//! | [`ReactionAnnot`] | `reaction` | reaction (conditions and replicas) |
//! | [`DataAnnot`] | `data` | `listOfReactions` (the data catalog) |
//! | [`ModelReactionAnnot`] | `modelReaction` | kinetic model reaction (used data) |

use serde::{de::DeserializeOwned, Deserialize, Serialize};

use super::error::SBMLError;
use super::rdf::{Annotation, CvTerm, MetadataUpdate};
use super::xml::XmlNode;

/// The EnzymeML v1 annotation namespace
pub const ENZYMEML_NS: &str = "http://sbml.org/enzymeml/version1";

pub(crate) fn default_xmlns() -> String {
    ENZYMEML_NS.to_string()
}

/// A serde-mapped block living in the EnzymeML namespace.
pub trait EnzymeMLAnnotation: Serialize + DeserializeOwned {
    /// Local name of the block's root element
    const TAG: &'static str;

    /// Serializes the block into a detached fragment.
    fn to_fragment(&self) -> Result<XmlNode, SBMLError> {
        let xml = quick_xml::se::to_string(self)?;
        XmlNode::parse(&xml)
    }

    fn from_fragment(fragment: &XmlNode) -> Result<Self, SBMLError> {
        Ok(quick_xml::de::from_str(&fragment.to_local_string()?)?)
    }

    /// Reads the block from an annotation. A missing block is `None`, not an error.
    fn extract(annotation: &Annotation) -> Result<Option<Self>, SBMLError> {
        annotation
            .fragments
            .iter()
            .find(|f| f.namespace.as_deref() == Some(ENZYMEML_NS) && f.local_name() == Self::TAG)
            .map(Self::from_fragment)
            .transpose()
    }

    /// Replaces any previous block with the same tag, adding `cv_terms` in the same update.
    fn write_to(&self, annotation: &mut Annotation, cv_terms: Vec<CvTerm>) -> Result<(), SBMLError> {
        let fragment = self.to_fragment()?;
        annotation.update(MetadataUpdate {
            cv_terms,
            fragment: Some(fragment),
        });
        Ok(())
    }

    /// Removes the block, if present.
    fn clear(annotation: &mut Annotation) -> bool {
        annotation.remove_fragment(Self::TAG, Some(ENZYMEML_NS))
    }
}

// ============================================================================
// SPECIES
// ============================================================================

/// Chemical identity of a small-molecule species.
///
/// ```xml
/// <species xmlns="http://sbml.org/enzymeml/version1">
///   <inchi>InChI=1S/C2H6O/c1-2-3/h3H,2H2,1H3</inchi>
///   <smiles>CCO</smiles>
/// </species>
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename = "species")]
pub struct SpeciesAnnot {
    #[serde(rename = "@xmlns", default = "default_xmlns")]
    pub xmlns: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inchi: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub smiles: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iupac: Option<String>,
}

impl SpeciesAnnot {
    pub fn new(inchi: Option<String>, smiles: Option<String>, iupac: Option<String>) -> Self {
        Self {
            xmlns: default_xmlns(),
            inchi,
            smiles,
            iupac,
        }
    }

    pub fn has_elements(&self) -> bool {
        self.inchi.is_some() || self.smiles.is_some() || self.iupac.is_some()
    }
}

impl EnzymeMLAnnotation for SpeciesAnnot {
    const TAG: &'static str = "species";
}

/// Amino acid sequence of a protein species.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename = "protein")]
pub struct ProteinAnnot {
    #[serde(rename = "@xmlns", default = "default_xmlns")]
    pub xmlns: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sequence: Option<String>,
}

impl ProteinAnnot {
    pub fn new(sequence: impl Into<String>) -> Self {
        Self {
            xmlns: default_xmlns(),
            sequence: Some(sequence.into()),
        }
    }
}

impl EnzymeMLAnnotation for ProteinAnnot {
    const TAG: &'static str = "protein";
}

// ============================================================================
// REACTION CONDITIONS
// ============================================================================

/// Reaction conditions and replica links.
///
/// ```xml
/// <reaction xmlns="http://sbml.org/enzymeml/version1">
///   <conditions>
///     <ph value="7.4"/>
///     <temperature value="310.15" unit="kelvin"/>
///   </conditions>
///   <replicas>
///     <replica id="re0" replica="repl0" measurement="M0"/>
///   </replicas>
/// </reaction>
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename = "reaction")]
pub struct ReactionAnnot {
    #[serde(rename = "@xmlns", default = "default_xmlns")]
    pub xmlns: String,
    #[serde(default)]
    pub conditions: ConditionsAnnot,
    #[serde(default, skip_serializing_if = "ReplicasWrapper::is_empty")]
    pub replicas: ReplicasWrapper,
}

impl EnzymeMLAnnotation for ReactionAnnot {
    const TAG: &'static str = "reaction";
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ConditionsAnnot {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ph: Option<ValueAnnot>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<QuantityAnnot>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pressure: Option<QuantityAnnot>,
    #[serde(
        rename = "shakingFrequency",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub shaking_frequency: Option<QuantityAnnot>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ValueAnnot {
    #[serde(rename = "@value")]
    pub value: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QuantityAnnot {
    #[serde(rename = "@value")]
    pub value: f64,
    #[serde(rename = "@unit")]
    pub unit: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ReplicasWrapper {
    #[serde(rename = "replica", default)]
    pub replica: Vec<ReplicaAnnot>,
}

impl ReplicasWrapper {
    fn is_empty(&self) -> bool {
        self.replica.is_empty()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReplicaAnnot {
    #[serde(rename = "@id")]
    pub id: String,
    #[serde(rename = "@replica")]
    pub replica: String,
    #[serde(rename = "@measurement")]
    pub measurement: String,
}

// ============================================================================
// DATA CATALOG
// ============================================================================

/// Data catalog attached to `listOfReactions`.
///
/// Column order inside a format is the column order of the paired CSV file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename = "data")]
pub struct DataAnnot {
    #[serde(rename = "@xmlns", default = "default_xmlns")]
    pub xmlns: String,
    #[serde(
        rename = "listOfFormats",
        default,
        skip_serializing_if = "FormatsWrapper::is_empty"
    )]
    pub formats: FormatsWrapper,
    #[serde(
        rename = "listOfFiles",
        default,
        skip_serializing_if = "FilesWrapper::is_empty"
    )]
    pub files: FilesWrapper,
    #[serde(
        rename = "listOfMeasurements",
        default,
        skip_serializing_if = "MeasurementsWrapper::is_empty"
    )]
    pub measurements: MeasurementsWrapper,
}

impl EnzymeMLAnnotation for DataAnnot {
    const TAG: &'static str = "data";
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct FormatsWrapper {
    #[serde(rename = "format", default)]
    pub format: Vec<FormatAnnot>,
}

impl FormatsWrapper {
    fn is_empty(&self) -> bool {
        self.format.is_empty()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FormatAnnot {
    #[serde(rename = "@id")]
    pub id: String,
    #[serde(rename = "column", default)]
    pub columns: Vec<ColumnAnnot>,
}

/// A column as written; which attributes are set depends on `column_type`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ColumnAnnot {
    #[serde(rename = "@type", default)]
    pub column_type: String,
    #[serde(rename = "@unit", default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(rename = "@species", default, skip_serializing_if = "Option::is_none")]
    pub species: Option<String>,
    #[serde(rename = "@replica", default, skip_serializing_if = "Option::is_none")]
    pub replica: Option<String>,
    #[serde(rename = "@amount", default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<String>,
    #[serde(rename = "$text", default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct FilesWrapper {
    #[serde(rename = "file", default)]
    pub file: Vec<FileAnnot>,
}

impl FilesWrapper {
    fn is_empty(&self) -> bool {
        self.file.is_empty()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FileAnnot {
    #[serde(rename = "@id")]
    pub id: String,
    #[serde(rename = "@file")]
    pub location: String,
    #[serde(rename = "@format")]
    pub format: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct MeasurementsWrapper {
    #[serde(rename = "measurement", default)]
    pub measurement: Vec<MeasurementAnnot>,
}

impl MeasurementsWrapper {
    fn is_empty(&self) -> bool {
        self.measurement.is_empty()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MeasurementAnnot {
    #[serde(rename = "@id")]
    pub id: String,
    #[serde(rename = "@name")]
    pub name: String,
    #[serde(rename = "@file")]
    pub file: String,
    #[serde(rename = "@start")]
    pub start: i64,
    #[serde(rename = "@stop")]
    pub stop: i64,
}

// ============================================================================
// USED DATA
// ============================================================================

/// Experiment replicas used to fit a kinetic model reaction.
///
/// ```xml
/// <modelReaction xmlns="http://sbml.org/enzymeml/version1">
///   <usedData>
///     <usedReaction reactionRef="r0">
///       <usedReplica replicaRef="re0"/>
///     </usedReaction>
///   </usedData>
/// </modelReaction>
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename = "modelReaction")]
pub struct ModelReactionAnnot {
    #[serde(rename = "@xmlns", default = "default_xmlns")]
    pub xmlns: String,
    #[serde(rename = "usedData", default)]
    pub used_data: UsedDataAnnot,
}

impl EnzymeMLAnnotation for ModelReactionAnnot {
    const TAG: &'static str = "modelReaction";
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct UsedDataAnnot {
    #[serde(rename = "usedReaction", default)]
    pub reactions: Vec<UsedReactionAnnot>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UsedReactionAnnot {
    /// Absent when the whole reaction was used
    #[serde(
        rename = "@reactionRef",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub reaction_ref: Option<String>,
    #[serde(rename = "usedReplica", default)]
    pub replicas: Vec<UsedReplicaAnnot>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UsedReplicaAnnot {
    #[serde(rename = "@replicaRef")]
    pub replica_ref: String,
}
