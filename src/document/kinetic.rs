//! Kinetic models derived from an experiment.
//!
//! A [`KineticModel`] is its own SBML document with `S0`, `S1`, ... species, reactions
//! carrying kinetic laws and a record of which experiment replicas each reaction was
//! fitted to.

use std::collections::BTreeMap;
use std::str::FromStr;

use serde_json::Value;

use super::state::{push_components, ComponentRole, ModelState};
use crate::conditions::UsedData;
use crate::error::{Diagnostic, EnzymeMLError};
use crate::ids::{ElementId, ElementKind};
use crate::keys::{Identifier, Key, ModelOperation, ModelSpeciesPayload, ParameterPayload, ReactionPayload};
use crate::sbml::annotations::{EnzymeMLAnnotation, ModelReactionAnnot};
use crate::sbml::markup::{
    Compartment, KineticLaw, LocalParameter, Reaction, SBase, SbmlDocument, Species, UnitDefinition,
};
use crate::sbml::math::formula_to_mathml;
use crate::sbml::speciestype::{parse_species_type, INTERACTOR_SBO_TERM};

#[derive(Debug, Clone, PartialEq)]
pub struct KineticModel {
    /// Also the file stem of the model entry in the archive
    pub name: String,
    pub(crate) state: ModelState,
    /// Used data keyed by model reaction id
    pub(crate) used_data: BTreeMap<String, UsedData>,
}

impl KineticModel {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let mut state = ModelState::new();
        state.model_mut().name = Some(name.clone());

        Self {
            name,
            state,
            used_data: BTreeMap::new(),
        }
    }

    /// Rebuilds a model from parsed markup, reading back the used-data blocks.
    pub fn from_sbml(name: impl Into<String>, sbml: SbmlDocument) -> Result<Self, EnzymeMLError> {
        let mut used_data = BTreeMap::new();
        for reaction in &sbml.model.reactions {
            if let Some(annot) = ModelReactionAnnot::extract(&reaction.base.annotation)? {
                used_data.insert(reaction.id.clone(), UsedData::from(annot));
            }
        }

        Ok(Self {
            name: name.into(),
            state: ModelState::from_sbml(sbml),
            used_data,
        })
    }

    pub fn sbml(&self) -> &SbmlDocument {
        &self.state.sbml
    }

    pub fn species(&self) -> &[Species] {
        &self.state.model().species
    }

    pub fn reactions(&self) -> &[Reaction] {
        &self.state.model().reactions
    }

    pub fn used_data(&self, reaction: &str) -> Option<&UsedData> {
        self.used_data.get(reaction)
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.state.diagnostics
    }

    /// Copies the experiment's unit definitions and compartments so that species and
    /// parameters keep resolving to the same ids.
    pub(crate) fn seed_from(&mut self, units: Vec<UnitDefinition>, compartments: Vec<Compartment>) {
        let model = self.state.model_mut();
        model.unit_definitions = units;
        model.compartments = compartments;
        self.state.reseed();
    }

    pub(crate) fn seed_species(&mut self, name: &str, sbo_term: Option<u32>, compartment: &str) -> ElementId {
        let id = self.state.ids.next_id(ElementKind::ModelSpecies);
        let mut base = SBase::with_meta_id(&id.meta_id);
        base.sbo_term = sbo_term;

        self.state.model_mut().species.push(Species {
            id: id.short_id.clone(),
            name: Some(name.to_string()),
            base,
            compartment: compartment.to_string(),
            ..Default::default()
        });
        id
    }

    /// Applies an operation given by key name and JSON payload.
    pub fn add_json(
        &mut self,
        key: &str,
        payload: Value,
        target: Option<&str>,
    ) -> Result<Identifier, EnzymeMLError> {
        let key = Key::from_str(key)?;
        let operation = ModelOperation::from_json(key, payload)?;
        self.add(operation, target)
    }

    pub fn add(
        &mut self,
        operation: ModelOperation,
        target: Option<&str>,
    ) -> Result<Identifier, EnzymeMLError> {
        let key = operation.key();
        let key_name = key.as_str();

        key.check_target(target)?;
        log::debug!("Applying {key_name} to model '{}'", self.name);

        let id = match operation {
            ModelOperation::Note(note) => self.state.set_note(key_name, target, note)?,
            ModelOperation::ModelName(name) => self.state.set_name(name),
            ModelOperation::Creator(creator) => self.state.add_history_creator(creator),
            ModelOperation::DateCreated(date) => self.state.set_date(key_name, true, date)?,
            ModelOperation::DateModified(date) => self.state.set_date(key_name, false, date)?,
            ModelOperation::Species(species) => self.add_species(species)?,
            ModelOperation::Reaction(reaction) => self.add_reaction(reaction)?,
            ModelOperation::Reactants(components) => {
                self.state
                    .add_components(key_name, target, ComponentRole::Reactant, &components)?
            }
            ModelOperation::Modifiers(components) => {
                self.state
                    .add_components(key_name, target, ComponentRole::Modifier, &components)?
            }
            ModelOperation::Products(components) => {
                self.state
                    .add_components(key_name, target, ComponentRole::Product, &components)?
            }
            ModelOperation::KineticLaw(formula) => self.set_kinetic_law(key_name, target, formula)?,
            ModelOperation::Parameters(parameters) => {
                self.add_parameters(key_name, target, parameters)?
            }
            ModelOperation::Data(used) => self.set_used_data(key_name, target, used)?,
        };

        Ok(id.into())
    }

    fn add_species(&mut self, payload: ModelSpeciesPayload) -> Result<ElementId, EnzymeMLError> {
        let sbo_term = match &payload.species_type {
            Some(value) => parse_species_type(value)?,
            None => INTERACTOR_SBO_TERM,
        };
        let model = self.state.model();
        let compartment = match &payload.compartment {
            Some(compartment) => model
                .compartment(compartment)
                .map(|c| c.id.clone())
                .ok_or_else(|| EnzymeMLError::unknown_element("compartment", compartment))?,
            None => model
                .compartments
                .first()
                .map(|c| c.id.clone())
                .unwrap_or_default(),
        };

        let id = self.seed_species(&payload.name, Some(sbo_term), &compartment);
        if let Some(species) = self.state.model_mut().species_mut(&id.short_id) {
            species.constant = payload.constant;
        }
        Ok(id)
    }

    fn local_parameters(&mut self, parameters: Vec<ParameterPayload>) -> Vec<LocalParameter> {
        parameters
            .into_iter()
            .map(|p| LocalParameter {
                id: p.name.clone(),
                units: self.state.resolve_opt_unit(p.units.as_deref()),
                uncertainty: self.state.uncertainty(p.stdev.as_ref()),
                name: Some(p.name),
                value: Some(p.value),
            })
            .collect()
    }

    fn add_reaction(&mut self, payload: ReactionPayload) -> Result<ElementId, EnzymeMLError> {
        self.state.check_components(
            payload
                .reactants
                .iter()
                .chain(&payload.modifier)
                .chain(&payload.products),
        )?;
        if let Some(formula) = &payload.kineticlaw {
            formula_to_mathml(formula)?;
        }

        let parameters = self.local_parameters(payload.parameters);
        let kinetic_law = match (payload.kineticlaw, parameters.is_empty()) {
            (None, true) => None,
            (formula, _) => Some(KineticLaw {
                formula,
                local_parameters: parameters,
            }),
        };

        let id = self.state.ids.next_id(ElementKind::Reaction);
        let mut reaction = Reaction {
            id: id.short_id.clone(),
            name: Some(payload.name),
            base: SBase::with_meta_id(&id.meta_id),
            reversible: payload.reversible,
            kinetic_law,
            ..Default::default()
        };
        for (role, components) in [
            (ComponentRole::Reactant, &payload.reactants),
            (ComponentRole::Modifier, &payload.modifier),
            (ComponentRole::Product, &payload.products),
        ] {
            push_components(&mut reaction, role, &self.state.resolve_species_ids(components));
        }

        self.state.model_mut().reactions.push(reaction);
        Ok(id)
    }

    fn set_kinetic_law(
        &mut self,
        key: &str,
        target: Option<&str>,
        formula: String,
    ) -> Result<ElementId, EnzymeMLError> {
        let id = self.state.require_reaction(key, target)?;
        formula_to_mathml(&formula)?;

        if let Some(reaction) = self.state.model_mut().reaction_mut(&id.short_id) {
            reaction
                .kinetic_law
                .get_or_insert_with(KineticLaw::default)
                .formula = Some(formula);
        }
        Ok(id)
    }

    /// Adds local parameters; a parameter with an existing name replaces the old one.
    fn add_parameters(
        &mut self,
        key: &str,
        target: Option<&str>,
        parameters: Vec<ParameterPayload>,
    ) -> Result<ElementId, EnzymeMLError> {
        let id = self.state.require_reaction(key, target)?;
        let parameters = self.local_parameters(parameters);

        if let Some(reaction) = self.state.model_mut().reaction_mut(&id.short_id) {
            let law = reaction.kinetic_law.get_or_insert_with(KineticLaw::default);
            for parameter in parameters {
                match law.local_parameters.iter_mut().find(|p| p.id == parameter.id) {
                    Some(existing) => *existing = parameter,
                    None => law.local_parameters.push(parameter),
                }
            }
        }
        Ok(id)
    }

    fn set_used_data(
        &mut self,
        key: &str,
        target: Option<&str>,
        used: BTreeMap<String, Vec<String>>,
    ) -> Result<ElementId, EnzymeMLError> {
        let id = self.state.require_reaction(key, target)?;
        let entry = self.used_data.entry(id.short_id.clone()).or_default();

        for (reaction, replicas) in used {
            entry.add(&reaction, None);
            for replica in &replicas {
                entry.add(&reaction, Some(replica));
            }
        }
        Ok(id)
    }

    /// Rewrites the used-data blocks from the in-memory state.
    pub(crate) fn sync_annotations(&mut self) -> Result<(), EnzymeMLError> {
        for reaction in self.state.model_mut().reactions.iter_mut() {
            ModelReactionAnnot::clear(&mut reaction.base.annotation);
            if let Some(used) = self.used_data.get(&reaction.id) {
                ModelReactionAnnot::from(used).write_to(&mut reaction.base.annotation, Vec::new())?;
            }
        }
        Ok(())
    }

    pub fn to_sbml_string(&mut self) -> Result<String, EnzymeMLError> {
        self.sync_annotations()?;
        Ok(self.state.sbml.to_xml_string()?)
    }
}
