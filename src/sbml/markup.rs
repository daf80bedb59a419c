//! Typed SBML Level 3 Version 2 document with the `distrib` package.
//!
//! Only the parts of SBML that EnzymeML documents use are modelled: unit definitions,
//! compartments, species, reactions with species references and kinetic laws, notes,
//! annotations and uncertainties. Each element converts to and from [`XmlNode`].

use std::str::FromStr;

use super::error::SBMLError;
use super::math::{formula_to_mathml, mathml_to_formula};
use super::rdf::Annotation;
use super::xml::XmlNode;
use crate::units::{UnitAtom, UnitKind};

pub const SBML_L3V2_NS: &str = "http://www.sbml.org/sbml/level3/version2/core";
pub const DISTRIB_NS: &str = "http://www.sbml.org/sbml/level3/version1/distrib/version1";
pub const XHTML_NS: &str = "http://www.w3.org/1999/xhtml";

/// Meta id of the root model of every EnzymeML document.
pub const MODEL_META_ID: &str = "META_MODEL";

// ============================================================================
// ELEMENTS
// ============================================================================

/// Attributes and content shared by every SBML element.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SBase {
    pub meta_id: Option<String>,
    pub sbo_term: Option<u32>,
    /// The XHTML `<body>` of the element's notes
    pub notes: Option<XmlNode>,
    pub annotation: Annotation,
}

impl SBase {
    pub fn with_meta_id(meta_id: impl Into<String>) -> Self {
        Self {
            meta_id: Some(meta_id.into()),
            ..Default::default()
        }
    }
}

/// A standard deviation attached through the `distrib` package.
#[derive(Debug, Clone, PartialEq)]
pub struct Uncertainty {
    pub value: f64,
    pub units: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct UnitDefinition {
    pub id: String,
    pub name: Option<String>,
    pub base: SBase,
    pub units: Vec<UnitAtom>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Compartment {
    pub id: String,
    pub name: Option<String>,
    pub base: SBase,
    pub spatial_dimensions: f64,
    pub size: Option<f64>,
    pub units: Option<String>,
    pub constant: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Species {
    pub id: String,
    pub name: Option<String>,
    pub base: SBase,
    pub compartment: String,
    pub initial_concentration: Option<f64>,
    pub initial_amount: Option<f64>,
    pub substance_units: Option<String>,
    pub has_only_substance_units: bool,
    pub boundary_condition: bool,
    pub constant: bool,
    pub uncertainty: Option<Uncertainty>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SpeciesReference {
    pub species: String,
    pub stoichiometry: Option<f64>,
    pub constant: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModifierSpeciesReference {
    pub species: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LocalParameter {
    pub id: String,
    pub name: Option<String>,
    pub value: Option<f64>,
    pub units: Option<String>,
    pub uncertainty: Option<Uncertainty>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct KineticLaw {
    /// Infix formula; written as MathML
    pub formula: Option<String>,
    pub local_parameters: Vec<LocalParameter>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Reaction {
    pub id: String,
    pub name: Option<String>,
    pub base: SBase,
    pub reversible: bool,
    pub reactants: Vec<SpeciesReference>,
    pub products: Vec<SpeciesReference>,
    pub modifiers: Vec<ModifierSpeciesReference>,
    pub kinetic_law: Option<KineticLaw>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Model {
    pub id: Option<String>,
    pub name: Option<String>,
    pub base: SBase,
    pub unit_definitions: Vec<UnitDefinition>,
    pub compartments: Vec<Compartment>,
    pub species: Vec<Species>,
    pub reactions: Vec<Reaction>,
    /// Annotation of `<listOfReactions>`, which carries the data catalog
    pub reactions_annotation: Annotation,
}

impl Default for Model {
    fn default() -> Self {
        Self {
            id: None,
            name: None,
            base: SBase::with_meta_id(MODEL_META_ID),
            unit_definitions: Vec::new(),
            compartments: Vec::new(),
            species: Vec::new(),
            reactions: Vec::new(),
            reactions_annotation: Annotation::default(),
        }
    }
}

/// An SBML document holding a single model.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SbmlDocument {
    pub model: Model,
}

// ============================================================================
// LOOKUP
// ============================================================================

impl Model {
    pub fn species(&self, id: &str) -> Option<&Species> {
        self.species.iter().find(|s| s.id == id || is_meta(&s.base, id))
    }

    pub fn species_mut(&mut self, id: &str) -> Option<&mut Species> {
        self.species
            .iter_mut()
            .find(|s| s.id == id || is_meta(&s.base, id))
    }

    pub fn reaction(&self, id: &str) -> Option<&Reaction> {
        self.reactions
            .iter()
            .find(|r| r.id == id || is_meta(&r.base, id))
    }

    pub fn reaction_mut(&mut self, id: &str) -> Option<&mut Reaction> {
        self.reactions
            .iter_mut()
            .find(|r| r.id == id || is_meta(&r.base, id))
    }

    pub fn compartment(&self, id: &str) -> Option<&Compartment> {
        self.compartments
            .iter()
            .find(|c| c.id == id || is_meta(&c.base, id))
    }

    pub fn unit_definition(&self, id: &str) -> Option<&UnitDefinition> {
        self.unit_definitions
            .iter()
            .find(|u| u.id == id || is_meta(&u.base, id))
    }

    /// Shared attributes of any element addressed by id or meta id, including the model.
    pub fn base_mut(&mut self, id: &str) -> Option<&mut SBase> {
        if self.id.as_deref() == Some(id) || is_meta(&self.base, id) {
            return Some(&mut self.base);
        }
        let matches = |own: &str, base: &SBase| own == id || is_meta(base, id);

        if let Some(i) = self.unit_definitions.iter().position(|u| matches(&u.id, &u.base)) {
            return Some(&mut self.unit_definitions[i].base);
        }
        if let Some(i) = self.compartments.iter().position(|c| matches(&c.id, &c.base)) {
            return Some(&mut self.compartments[i].base);
        }
        if let Some(i) = self.species.iter().position(|s| matches(&s.id, &s.base)) {
            return Some(&mut self.species[i].base);
        }
        self.reactions
            .iter_mut()
            .find(|r| matches(&r.id, &r.base))
            .map(|r| &mut r.base)
    }

    /// Short ids of every element in the model.
    pub fn element_ids(&self) -> impl Iterator<Item = &str> {
        self.unit_definitions
            .iter()
            .map(|u| u.id.as_str())
            .chain(self.compartments.iter().map(|c| c.id.as_str()))
            .chain(self.species.iter().map(|s| s.id.as_str()))
            .chain(self.reactions.iter().map(|r| r.id.as_str()))
    }
}

fn is_meta(base: &SBase, id: &str) -> bool {
    base.meta_id.as_deref() == Some(id)
}

// ============================================================================
// WRITING
// ============================================================================

impl SbmlDocument {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serializes the document to an indented SBML string.
    pub fn to_xml_string(&self) -> Result<String, SBMLError> {
        let root = XmlNode::with_namespace("sbml", SBML_L3V2_NS)
            .attr("xmlns:distrib", DISTRIB_NS)
            .attr("level", 3)
            .attr("version", 2)
            .attr("distrib:required", "true")
            .child(self.model.to_xml()?);

        root.to_document_string()
    }

    /// Parses an SBML string.
    pub fn from_xml_str(xml: &str) -> Result<Self, SBMLError> {
        let root = XmlNode::parse(xml)?;
        if root.local_name() != "sbml" {
            return Err(SBMLError::NotSBML(root.name));
        }
        let model = root.find("model").ok_or(SBMLError::MissingModel)?;

        Ok(Self {
            model: Model::from_xml(model)?,
        })
    }
}

/// Starts an element with the shared attributes and the notes/annotation children.
fn open(tag: &str, base: &SBase) -> XmlNode {
    let mut node = XmlNode::new(tag)
        .opt_attr("metaid", base.meta_id.as_deref())
        .opt_attr("sboTerm", base.sbo_term.map(format_sbo));

    if let Some(body) = &base.notes {
        node.children.push(XmlNode::new("notes").child(body.clone()));
    }
    if let Some(annotation) = base.annotation.to_xml(base.meta_id.as_deref()) {
        node.children.push(annotation);
    }
    node
}

fn list_of(tag: &str, children: Vec<XmlNode>) -> Option<XmlNode> {
    if children.is_empty() {
        None
    } else {
        let mut node = XmlNode::new(tag);
        node.children = children;
        Some(node)
    }
}

fn uncertainty_to_xml(uncertainty: &Uncertainty) -> XmlNode {
    XmlNode::new("distrib:listOfUncertainties").child(
        XmlNode::new("distrib:uncertainty").child(
            XmlNode::new("distrib:uncertParameter")
                .attr("distrib:type", "standardDeviation")
                .attr("distrib:value", uncertainty.value)
                .opt_attr("distrib:units", uncertainty.units.as_deref()),
        ),
    )
}

impl Model {
    fn to_xml(&self) -> Result<XmlNode, SBMLError> {
        let mut node = open("model", &self.base)
            .opt_attr("id", self.id.as_deref())
            .opt_attr("name", self.name.as_deref());

        let units = self.unit_definitions.iter().map(UnitDefinition::to_xml).collect();
        let compartments = self.compartments.iter().map(Compartment::to_xml).collect();
        let species = self.species.iter().map(Species::to_xml).collect();
        let reactions = self
            .reactions
            .iter()
            .map(Reaction::to_xml)
            .collect::<Result<Vec<_>, _>>()?;

        node.children.extend(list_of("listOfUnitDefinitions", units));
        node.children.extend(list_of("listOfCompartments", compartments));
        node.children.extend(list_of("listOfSpecies", species));

        let reactions_annotation = self.reactions_annotation.to_xml(None);
        if !reactions.is_empty() || reactions_annotation.is_some() {
            let mut list = XmlNode::new("listOfReactions");
            list.children.extend(reactions_annotation);
            list.children.extend(reactions);
            node.children.push(list);
        }

        Ok(node)
    }
}

impl UnitDefinition {
    fn to_xml(&self) -> XmlNode {
        let mut node = open("unitDefinition", &self.base)
            .attr("id", &self.id)
            .opt_attr("name", self.name.as_deref());

        let units = self
            .units
            .iter()
            .map(|u| {
                XmlNode::new("unit")
                    .attr("kind", u.kind)
                    .attr("exponent", u.exponent)
                    .attr("scale", u.scale)
                    .attr("multiplier", u.multiplier)
            })
            .collect();
        node.children.extend(list_of("listOfUnits", units));
        node
    }
}

impl Compartment {
    fn to_xml(&self) -> XmlNode {
        open("compartment", &self.base)
            .attr("id", &self.id)
            .opt_attr("name", self.name.as_deref())
            .attr("spatialDimensions", self.spatial_dimensions)
            .opt_attr("size", self.size)
            .opt_attr("units", self.units.as_deref())
            .attr("constant", self.constant)
    }
}

impl Species {
    fn to_xml(&self) -> XmlNode {
        let mut node = open("species", &self.base)
            .attr("id", &self.id)
            .opt_attr("name", self.name.as_deref())
            .attr("compartment", &self.compartment)
            .opt_attr("initialConcentration", self.initial_concentration)
            .opt_attr("initialAmount", self.initial_amount)
            .opt_attr("substanceUnits", self.substance_units.as_deref())
            .attr("hasOnlySubstanceUnits", self.has_only_substance_units)
            .attr("boundaryCondition", self.boundary_condition)
            .attr("constant", self.constant);

        if let Some(uncertainty) = &self.uncertainty {
            node.children.push(uncertainty_to_xml(uncertainty));
        }
        node
    }
}

impl Reaction {
    fn to_xml(&self) -> Result<XmlNode, SBMLError> {
        let mut node = open("reaction", &self.base)
            .attr("id", &self.id)
            .opt_attr("name", self.name.as_deref())
            .attr("reversible", self.reversible);

        let refs = |list: &[SpeciesReference]| {
            list.iter()
                .map(|r| {
                    XmlNode::new("speciesReference")
                        .attr("species", &r.species)
                        .opt_attr("stoichiometry", r.stoichiometry)
                        .attr("constant", r.constant)
                })
                .collect::<Vec<_>>()
        };
        let modifiers = self
            .modifiers
            .iter()
            .map(|m| XmlNode::new("modifierSpeciesReference").attr("species", &m.species))
            .collect();

        node.children
            .extend(list_of("listOfReactants", refs(&self.reactants)));
        node.children
            .extend(list_of("listOfProducts", refs(&self.products)));
        node.children.extend(list_of("listOfModifiers", modifiers));

        if let Some(law) = &self.kinetic_law {
            node.children.push(law.to_xml()?);
        }
        Ok(node)
    }
}

impl KineticLaw {
    fn to_xml(&self) -> Result<XmlNode, SBMLError> {
        let mut node = XmlNode::new("kineticLaw");
        if let Some(formula) = &self.formula {
            node.children.push(formula_to_mathml(formula)?);
        }

        let parameters = self
            .local_parameters
            .iter()
            .map(|p| {
                let mut param = XmlNode::new("localParameter")
                    .attr("id", &p.id)
                    .opt_attr("name", p.name.as_deref())
                    .opt_attr("value", p.value)
                    .opt_attr("units", p.units.as_deref());
                if let Some(uncertainty) = &p.uncertainty {
                    param.children.push(uncertainty_to_xml(uncertainty));
                }
                param
            })
            .collect();
        node.children
            .extend(list_of("listOfLocalParameters", parameters));
        Ok(node)
    }
}

fn format_sbo(term: u32) -> String {
    format!("SBO:{term:07}")
}

// ============================================================================
// READING
// ============================================================================

/// Parses an `SBO:0000014` style term.
pub fn parse_sbo(term: &str) -> Result<u32, SBMLError> {
    let trimmed = term.trim();
    trimmed
        .strip_prefix("SBO:")
        .unwrap_or(trimmed)
        .parse()
        .map_err(|_| SBMLError::InvalidSBOTerm(term.to_string()))
}

fn read_base(node: &XmlNode) -> Result<SBase, SBMLError> {
    Ok(SBase {
        meta_id: node.get_attr("metaid").map(str::to_string),
        sbo_term: node.get_attr("sboTerm").map(parse_sbo).transpose()?,
        notes: node
            .find("notes")
            .and_then(|notes| notes.children.first().cloned()),
        annotation: node
            .find("annotation")
            .map(Annotation::from_xml)
            .unwrap_or_default(),
    })
}

fn read_uncertainty(node: &XmlNode) -> Result<Option<Uncertainty>, SBMLError> {
    let param = node
        .find("listOfUncertainties")
        .and_then(|l| l.find("uncertainty"))
        .or_else(|| node.find("uncertainty"))
        .and_then(|u| {
            u.find_all("uncertParameter")
                .find(|p| p.get_attr("type") == Some("standardDeviation"))
        });

    match param {
        Some(param) => Ok(Some(Uncertainty {
            value: param.get_f64("value")?.unwrap_or_default(),
            units: param.get_attr("units").map(str::to_string),
        })),
        None => Ok(None),
    }
}

fn opt_string(node: &XmlNode, key: &str) -> Option<String> {
    node.get_attr(key).map(str::to_string)
}

fn list_children<'a>(node: &'a XmlNode, list: &str, item: &'a str) -> Vec<&'a XmlNode> {
    node.find(list)
        .map(|l| l.find_all(item).collect())
        .unwrap_or_default()
}

impl Model {
    fn from_xml(node: &XmlNode) -> Result<Self, SBMLError> {
        let mut base = read_base(node)?;
        if base.meta_id.is_none() {
            base.meta_id = Some(MODEL_META_ID.to_string());
        }

        Ok(Self {
            id: opt_string(node, "id"),
            name: opt_string(node, "name"),
            base,
            unit_definitions: list_children(node, "listOfUnitDefinitions", "unitDefinition")
                .into_iter()
                .map(UnitDefinition::from_xml)
                .collect::<Result<_, _>>()?,
            compartments: list_children(node, "listOfCompartments", "compartment")
                .into_iter()
                .map(Compartment::from_xml)
                .collect::<Result<_, _>>()?,
            species: list_children(node, "listOfSpecies", "species")
                .into_iter()
                .map(Species::from_xml)
                .collect::<Result<_, _>>()?,
            reactions: list_children(node, "listOfReactions", "reaction")
                .into_iter()
                .map(Reaction::from_xml)
                .collect::<Result<_, _>>()?,
            reactions_annotation: node
                .find_path(&["listOfReactions", "annotation"])
                .map(Annotation::from_xml)
                .unwrap_or_default(),
        })
    }
}

impl UnitDefinition {
    fn from_xml(node: &XmlNode) -> Result<Self, SBMLError> {
        let units = list_children(node, "listOfUnits", "unit")
            .into_iter()
            .map(|u| -> Result<UnitAtom, SBMLError> {
                Ok(UnitAtom {
                    kind: UnitKind::from_str(u.require_attr("kind")?)?,
                    exponent: u.get_f64("exponent")?.unwrap_or(1.0),
                    scale: u.get_f64("scale")?.unwrap_or(0.0) as i32,
                    multiplier: u.get_f64("multiplier")?.unwrap_or(1.0),
                })
            })
            .collect::<Result<_, _>>()?;

        Ok(Self {
            id: node.require_attr("id")?.to_string(),
            name: opt_string(node, "name"),
            base: read_base(node)?,
            units,
        })
    }
}

impl Compartment {
    fn from_xml(node: &XmlNode) -> Result<Self, SBMLError> {
        Ok(Self {
            id: node.require_attr("id")?.to_string(),
            name: opt_string(node, "name"),
            base: read_base(node)?,
            spatial_dimensions: node.get_f64("spatialDimensions")?.unwrap_or(3.0),
            size: node.get_f64("size")?,
            units: opt_string(node, "units"),
            constant: node.get_bool("constant").unwrap_or(true),
        })
    }
}

impl Species {
    fn from_xml(node: &XmlNode) -> Result<Self, SBMLError> {
        Ok(Self {
            id: node.require_attr("id")?.to_string(),
            name: opt_string(node, "name"),
            base: read_base(node)?,
            compartment: node.require_attr("compartment")?.to_string(),
            initial_concentration: node.get_f64("initialConcentration")?,
            initial_amount: node.get_f64("initialAmount")?,
            substance_units: opt_string(node, "substanceUnits").or_else(|| opt_string(node, "units")),
            has_only_substance_units: node.get_bool("hasOnlySubstanceUnits").unwrap_or(false),
            boundary_condition: node.get_bool("boundaryCondition").unwrap_or(false),
            constant: node.get_bool("constant").unwrap_or(false),
            uncertainty: read_uncertainty(node)?,
        })
    }
}

impl Reaction {
    fn from_xml(node: &XmlNode) -> Result<Self, SBMLError> {
        let refs = |list: &str| -> Result<Vec<SpeciesReference>, SBMLError> {
            list_children(node, list, "speciesReference")
                .into_iter()
                .map(|r| -> Result<SpeciesReference, SBMLError> {
                    Ok(SpeciesReference {
                        species: r.require_attr("species")?.to_string(),
                        stoichiometry: r.get_f64("stoichiometry")?,
                        constant: r.get_bool("constant").unwrap_or(true),
                    })
                })
                .collect()
        };

        let modifiers = list_children(node, "listOfModifiers", "modifierSpeciesReference")
            .into_iter()
            .map(|m| -> Result<ModifierSpeciesReference, SBMLError> {
                Ok(ModifierSpeciesReference {
                    species: m.require_attr("species")?.to_string(),
                })
            })
            .collect::<Result<_, _>>()?;

        Ok(Self {
            id: node.require_attr("id")?.to_string(),
            name: opt_string(node, "name"),
            base: read_base(node)?,
            reversible: node.get_bool("reversible").unwrap_or(false),
            reactants: refs("listOfReactants")?,
            products: refs("listOfProducts")?,
            modifiers,
            kinetic_law: node.find("kineticLaw").map(KineticLaw::from_xml).transpose()?,
        })
    }
}

impl KineticLaw {
    fn from_xml(node: &XmlNode) -> Result<Self, SBMLError> {
        let formula = node.find("math").map(mathml_to_formula).transpose()?;
        let local_parameters = list_children(node, "listOfLocalParameters", "localParameter")
            .into_iter()
            .map(|p| -> Result<LocalParameter, SBMLError> {
                Ok(LocalParameter {
                    id: p.require_attr("id")?.to_string(),
                    name: opt_string(p, "name"),
                    value: p.get_f64("value")?,
                    units: opt_string(p, "units"),
                    uncertainty: read_uncertainty(p)?,
                })
            })
            .collect::<Result<_, _>>()?;

        Ok(Self {
            formula,
            local_parameters,
        })
    }
}
