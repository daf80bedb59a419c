//! The EnzymeML experiment document.
//!
//! An [`EnzymeMLDocument`] holds the experiment markup, the reaction conditions, the data
//! catalog, the tabular files and any kinetic models derived from the experiment. All
//! changes go through [`EnzymeMLDocument::add`], which validates a typed [`Operation`]
//! completely before touching the document.

use std::collections::BTreeMap;
use std::str::FromStr;

use itertools::Itertools;
use serde_json::Value;

use super::kinetic::KineticModel;
use super::state::{push_components, ComponentRole, ModelState};
use crate::catalog::{Column, DataCatalog};
use crate::conditions::{Quantity, ReactionConditions};
use crate::error::{Diagnostic, EnzymeMLError};
use crate::ids::{ElementId, ElementKind};
use crate::keys::{
    ChemistryPayload, CompartmentPayload, ConditionPayload, Identifier, Key, Operation,
    ProteinPayload, ReactionPayload, ReplicaPayload, SpeciesPayload,
};
use crate::sbml::annotations::{DataAnnot, EnzymeMLAnnotation, ProteinAnnot, ReactionAnnot, SpeciesAnnot};
use crate::sbml::markup::{Compartment, Reaction, SBase, SbmlDocument, Species};
use crate::sbml::rdf::{Creator, CvTerm, Qualifier};
use crate::sbml::speciestype::{parse_species_type, INTERACTOR_SBO_TERM};
use crate::tabular::table::Table;

/// One EnzymeML experiment and everything packaged with it.
#[derive(Debug, Clone, PartialEq)]
pub struct EnzymeMLDocument {
    pub name: String,
    pub(crate) state: ModelState,
    /// Reaction conditions keyed by reaction id
    pub(crate) conditions: BTreeMap<String, ReactionConditions>,
    pub(crate) catalog: DataCatalog,
    pub(crate) tables: Vec<Table>,
    pub(crate) models: Vec<KineticModel>,
    /// Archive creators, written to the OMEX description
    pub(crate) creators: Vec<Creator>,
}

impl EnzymeMLDocument {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: ModelState::new(),
            conditions: BTreeMap::new(),
            catalog: DataCatalog::new(),
            tables: Vec::new(),
            models: Vec::new(),
            creators: Vec::new(),
        }
    }

    /// Rebuilds a document from parsed experiment markup.
    ///
    /// Id counters and the unit cache are reseeded from the markup; the data catalog
    /// and reaction conditions are decoded from their annotation blocks.
    pub fn from_sbml(name: impl Into<String>, sbml: SbmlDocument) -> Result<Self, EnzymeMLError> {
        let catalog = DataAnnot::extract(&sbml.model.reactions_annotation)?
            .map(DataCatalog::from)
            .unwrap_or_default();

        let mut conditions = BTreeMap::new();
        for reaction in &sbml.model.reactions {
            if let Some(annot) = ReactionAnnot::extract(&reaction.base.annotation)? {
                conditions.insert(reaction.id.clone(), ReactionConditions::from(annot));
            }
        }

        Ok(Self {
            state: ModelState::from_sbml(sbml),
            conditions,
            catalog,
            ..Self::new(name)
        })
    }

    // ========================================================================
    // ACCESSORS
    // ========================================================================

    pub fn sbml(&self) -> &SbmlDocument {
        &self.state.sbml
    }

    pub fn species(&self) -> &[Species] {
        &self.state.model().species
    }

    pub fn reactions(&self) -> &[Reaction] {
        &self.state.model().reactions
    }

    pub fn compartments(&self) -> &[Compartment] {
        &self.state.model().compartments
    }

    pub fn conditions(&self, reaction: &str) -> Option<&ReactionConditions> {
        self.conditions.get(reaction)
    }

    pub fn all_conditions(&self) -> impl Iterator<Item = (&String, &ReactionConditions)> {
        self.conditions.iter()
    }

    pub fn catalog(&self) -> &DataCatalog {
        &self.catalog
    }

    pub fn tables(&self) -> &[Table] {
        &self.tables
    }

    pub fn models(&self) -> &[KineticModel] {
        &self.models
    }

    pub fn model(&self, name: &str) -> Option<&KineticModel> {
        self.models.iter().find(|m| m.name == name)
    }

    pub fn model_mut(&mut self, name: &str) -> Option<&mut KineticModel> {
        self.models.iter_mut().find(|m| m.name == name)
    }

    pub fn creators(&self) -> &[Creator] {
        &self.creators
    }

    /// Non-fatal conditions raised while editing or loading the document.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.state.diagnostics
    }

    pub(crate) fn push_diagnostic(&mut self, diagnostic: Diagnostic) {
        self.state.diagnostics.push(diagnostic.emit());
    }

    // ========================================================================
    // ARCHIVE CONTENT
    // ========================================================================

    /// Adds a tabular file; it is written to its location when the archive is created.
    pub fn add_table(&mut self, table: Table) {
        self.tables.push(table);
    }

    /// Credits a person in the archive description.
    pub fn add_creator(
        &mut self,
        family: impl Into<String>,
        given: impl Into<String>,
        email: Option<String>,
        organization: Option<String>,
    ) {
        self.creators.push(Creator {
            family: family.into(),
            given: given.into(),
            email,
            organization,
        });
    }

    pub(crate) fn set_creators(&mut self, creators: Vec<Creator>) {
        self.creators = creators;
    }

    pub(crate) fn push_model(&mut self, model: KineticModel) -> Result<(), EnzymeMLError> {
        if self.model(&model.name).is_some() {
            return Err(EnzymeMLError::DuplicateModel(model.name));
        }
        self.models.push(model);
        Ok(())
    }

    /// Creates a kinetic model seeded with the species of this experiment.
    ///
    /// The model receives one species per distinct name and SBO term, grouped by name in
    /// the order names first appear, with ids `S0`, `S1`, ...
    pub fn create_model(&mut self, name: impl Into<String>) -> Result<&mut KineticModel, EnzymeMLError> {
        let name = name.into();
        let mut model = KineticModel::new(&name);

        let experiment = self.state.model();
        model.seed_from(experiment.unit_definitions.clone(), experiment.compartments.clone());

        let species = &experiment.species;
        let names = species.iter().map(|s| s.name.clone().unwrap_or_default()).unique();
        for species_name in names {
            let terms = species
                .iter()
                .filter(|s| s.name.clone().unwrap_or_default() == species_name)
                .map(|s| (s.base.sbo_term, s.compartment.clone()))
                .unique_by(|(term, _)| *term)
                .collect::<Vec<_>>();

            for (term, compartment) in terms {
                model.seed_species(&species_name, term, &compartment);
            }
        }

        self.push_model(model)?;
        let idx = self.models.len() - 1;
        Ok(&mut self.models[idx])
    }

    // ========================================================================
    // KEYED OPERATIONS
    // ========================================================================

    /// Applies an operation given by key name and JSON payload.
    pub fn add_json(
        &mut self,
        key: &str,
        payload: Value,
        target: Option<&str>,
    ) -> Result<Identifier, EnzymeMLError> {
        let key = Key::from_str(key)?;
        let operation = Operation::from_json(key, payload)?;
        self.add(operation, target)
    }

    /// Applies an operation. `target` names the element that annotating operations
    /// modify, by short or meta id.
    pub fn add(&mut self, operation: Operation, target: Option<&str>) -> Result<Identifier, EnzymeMLError> {
        let key = operation.key();
        let key_name = key.as_str();

        key.check_target(target)?;
        log::debug!("Applying {key_name} to {}", target.unwrap_or("document"));

        let id: Identifier = match operation {
            Operation::Note(note) => self.state.set_note(key_name, target, note)?.into(),
            Operation::ExperimentName(name) => self.state.set_name(name).into(),
            Operation::Creator(creator) => self.state.add_history_creator(creator).into(),
            Operation::DateCreated(date) => self.state.set_date(key_name, true, date)?.into(),
            Operation::DateModified(date) => self.state.set_date(key_name, false, date)?.into(),
            Operation::Unit(unit) => self.state.add_unit(unit).into(),
            Operation::UnitIs(uris) => self
                .state
                .add_cross_references(
                    key_name,
                    target,
                    Some("unit definition"),
                    vec![CvTerm::new(Qualifier::Is, uris)],
                )?
                .into(),
            Operation::Compartment(compartment) => self.add_compartment(compartment).into(),
            Operation::CompartmentIs(uris) => self
                .state
                .add_cross_references(
                    key_name,
                    target,
                    Some("compartment"),
                    vec![CvTerm::new(Qualifier::Is, uris)],
                )?
                .into(),
            Operation::Species(species) => self.add_species(key, species)?.into(),
            Operation::SpeciesChemistry(chemistry) => {
                self.annotate_chemistry(key, target, chemistry)?.into()
            }
            Operation::SpeciesProtein(protein) => self.annotate_protein(key, target, protein)?.into(),
            Operation::Reaction(reaction) => self.add_reaction(reaction)?.into(),
            Operation::Reactants(components) => self
                .state
                .add_components(key_name, target, ComponentRole::Reactant, &components)?
                .into(),
            Operation::Modifiers(components) => self
                .state
                .add_components(key_name, target, ComponentRole::Modifier, &components)?
                .into(),
            Operation::Products(components) => self
                .state
                .add_components(key_name, target, ComponentRole::Product, &components)?
                .into(),
            Operation::EcCode(uris) => self
                .state
                .add_cross_references(
                    key_name,
                    target,
                    Some("reaction"),
                    vec![CvTerm::new(Qualifier::IsVersionOf, uris)],
                )?
                .into(),
            Operation::Condition(condition) => self.set_condition(key, target, condition)?.into(),
            Operation::Replicas(replicas) => self.add_replicas(key, target, replicas)?.into(),
            Operation::DataFormat(columns) => {
                let columns = columns.into_iter().map(|c| self.resolve_column(c)).collect();
                Identifier::Catalog(self.catalog.add_format(columns))
            }
            Operation::DataColumn(column) => self.add_column(key, target, column)?,
            Operation::DataFile(file) => {
                if self.catalog.format(&file.format).is_none() {
                    return Err(EnzymeMLError::UnknownFormat(file.format));
                }
                Identifier::Catalog(self.catalog.add_file(file.file, file.format))
            }
            Operation::Measurement(measurement) => {
                if self.catalog.file(&measurement.file).is_none() {
                    return Err(EnzymeMLError::unknown_element("file", &measurement.file));
                }
                Identifier::Catalog(self.catalog.add_measurement(
                    measurement.name,
                    measurement.file,
                    measurement.start,
                    measurement.stop,
                ))
            }
        };

        Ok(id)
    }

    fn add_compartment(&mut self, payload: CompartmentPayload) -> ElementId {
        let units = self.state.resolve_opt_unit(payload.units.as_deref());
        let id = self.state.ids.next_id(ElementKind::Compartment);

        self.state.model_mut().compartments.push(Compartment {
            id: id.short_id.clone(),
            name: Some(payload.name),
            base: SBase::with_meta_id(&id.meta_id),
            spatial_dimensions: payload.dimensions,
            size: payload.size,
            units,
            constant: payload.constant,
        });
        id
    }

    fn add_species(&mut self, key: Key, payload: SpeciesPayload) -> Result<ElementId, EnzymeMLError> {
        if payload.init_conc.is_some() && payload.init_amount.is_some() {
            return Err(EnzymeMLError::ConflictingField {
                key: key.to_string(),
                first: "init_conc".into(),
                second: "init_amount".into(),
            });
        }
        let sbo_term = match &payload.species_type {
            Some(value) => parse_species_type(value)?,
            None => INTERACTOR_SBO_TERM,
        };
        let compartment = self
            .state
            .model()
            .compartment(&payload.compartment)
            .map(|c| c.id.clone())
            .ok_or_else(|| EnzymeMLError::unknown_element("compartment", &payload.compartment))?;

        // Validated; from here on the document changes
        let substance_units = self.state.resolve_opt_unit(payload.units.as_deref());
        let uncertainty = self.state.uncertainty(payload.stdev.as_ref());
        let id = self.state.ids.next_id(ElementKind::Species);

        let mut base = SBase::with_meta_id(&id.meta_id);
        base.sbo_term = Some(sbo_term);

        self.state.model_mut().species.push(Species {
            id: id.short_id.clone(),
            name: Some(payload.name),
            base,
            compartment,
            initial_concentration: payload.init_conc,
            initial_amount: payload.init_amount,
            substance_units,
            has_only_substance_units: payload.init_amount.is_some(),
            boundary_condition: payload.boundary_conditions,
            constant: payload.constant,
            uncertainty,
        });
        Ok(id)
    }

    fn require_species(&self, key: Key, target: Option<&str>) -> Result<String, EnzymeMLError> {
        let target = target.ok_or_else(|| EnzymeMLError::MissingTarget(key.to_string()))?;
        self.state
            .model()
            .species(target)
            .map(|s| s.id.clone())
            .ok_or_else(|| EnzymeMLError::unknown_element("species", target))
    }

    fn annotate_chemistry(
        &mut self,
        key: Key,
        target: Option<&str>,
        payload: ChemistryPayload,
    ) -> Result<ElementId, EnzymeMLError> {
        let species_id = self.require_species(key, target)?;
        let annot = SpeciesAnnot::new(payload.inchi, payload.smiles, payload.iupac);
        let terms = cross_references(vec![(Qualifier::Is, payload.is)]);

        let species = self
            .state
            .model_mut()
            .species_mut(&species_id)
            .ok_or_else(|| EnzymeMLError::unknown_element("species", &species_id))?;
        if annot.has_elements() {
            annot.write_to(&mut species.base.annotation, terms)?;
        } else {
            terms
                .into_iter()
                .for_each(|t| species.base.annotation.add_cv_term(t));
        }

        self.state
            .element_id(&species_id)
            .ok_or_else(|| EnzymeMLError::unknown_element("species", species_id))
    }

    fn annotate_protein(
        &mut self,
        key: Key,
        target: Option<&str>,
        payload: ProteinPayload,
    ) -> Result<ElementId, EnzymeMLError> {
        let species_id = self.require_species(key, target)?;
        let annot = ProteinAnnot::new(payload.sequence);
        let terms = cross_references(vec![
            (Qualifier::Is, payload.is),
            (Qualifier::HasPart, payload.has_part),
            (Qualifier::HasTaxon, payload.has_taxon),
            (Qualifier::IsEncodedBy, payload.encoded_by),
            (Qualifier::OccursIn, payload.occurs_in),
        ]);

        let species = self
            .state
            .model_mut()
            .species_mut(&species_id)
            .ok_or_else(|| EnzymeMLError::unknown_element("species", &species_id))?;
        annot.write_to(&mut species.base.annotation, terms)?;

        self.state
            .element_id(&species_id)
            .ok_or_else(|| EnzymeMLError::unknown_element("species", species_id))
    }

    fn add_reaction(&mut self, payload: ReactionPayload) -> Result<ElementId, EnzymeMLError> {
        self.state.check_components(
            payload
                .reactants
                .iter()
                .chain(&payload.modifier)
                .chain(&payload.products),
        )?;
        if payload.kineticlaw.is_some() || !payload.parameters.is_empty() {
            log::debug!(
                "Kinetic law of experiment reaction '{}' is ignored; add it to a kinetic model",
                payload.name
            );
        }

        let id = self.state.ids.next_id(ElementKind::Reaction);
        let mut reaction = Reaction {
            id: id.short_id.clone(),
            name: Some(payload.name),
            base: SBase::with_meta_id(&id.meta_id),
            reversible: payload.reversible,
            ..Default::default()
        };
        push_components(
            &mut reaction,
            ComponentRole::Reactant,
            &self.state.resolve_species_ids(&payload.reactants),
        );
        push_components(
            &mut reaction,
            ComponentRole::Modifier,
            &self.state.resolve_species_ids(&payload.modifier),
        );
        push_components(
            &mut reaction,
            ComponentRole::Product,
            &self.state.resolve_species_ids(&payload.products),
        );

        self.state.model_mut().reactions.push(reaction);
        Ok(id)
    }

    fn resolve_quantity(&mut self, quantity: Option<Quantity>) -> Option<Quantity> {
        quantity.map(|q| Quantity::new(q.value, self.state.resolve_unit(&q.unit)))
    }

    fn set_condition(
        &mut self,
        key: Key,
        target: Option<&str>,
        payload: ConditionPayload,
    ) -> Result<ElementId, EnzymeMLError> {
        let id = self.state.require_reaction(key.as_str(), target)?;

        let temperature = self.resolve_quantity(payload.temperature);
        let pressure = self.resolve_quantity(payload.pressure);
        let shaking = self.resolve_quantity(payload.shaking);

        let conditions = self.conditions.entry(id.short_id.clone()).or_default();
        if payload.ph.is_some() {
            conditions.ph = payload.ph;
        }
        if temperature.is_some() {
            conditions.temperature = temperature;
        }
        if pressure.is_some() {
            conditions.pressure = pressure;
        }
        if shaking.is_some() {
            conditions.shaking_frequency = shaking;
        }
        Ok(id)
    }

    fn add_replicas(
        &mut self,
        key: Key,
        target: Option<&str>,
        replicas: Vec<ReplicaPayload>,
    ) -> Result<ElementId, EnzymeMLError> {
        let id = self.state.require_reaction(key.as_str(), target)?;
        let conditions = self.conditions.entry(id.short_id.clone()).or_default();

        for replica in replicas {
            let replica_id = conditions.add_replica(replica.measurement, replica.replica, replica.id);
            log::debug!("Added replica {replica_id} to {}", id.short_id);
        }
        Ok(id)
    }

    fn resolve_column(&mut self, column: Column) -> Column {
        match column {
            Column::Time { unit, text } => Column::Time {
                unit: self.state.resolve_unit(&unit),
                text,
            },
            Column::Concentration {
                species,
                unit,
                replica,
                text,
            } => Column::Concentration {
                species: self
                    .state
                    .model()
                    .species(&species)
                    .map(|s| s.id.clone())
                    .unwrap_or(species),
                unit: self.state.resolve_unit(&unit),
                replica,
                text,
            },
            empty => empty,
        }
    }

    fn add_column(
        &mut self,
        key: Key,
        target: Option<&str>,
        column: Column,
    ) -> Result<Identifier, EnzymeMLError> {
        let target = target.ok_or_else(|| EnzymeMLError::MissingTarget(key.to_string()))?;
        if self.catalog.format(target).is_none() {
            return Err(EnzymeMLError::UnknownFormat(target.to_string()));
        }

        let column = self.resolve_column(column);
        let format = self
            .catalog
            .format_mut(target)
            .ok_or_else(|| EnzymeMLError::UnknownFormat(target.to_string()))?;

        let replica = format.add_column(column).replica().map(str::to_string);
        Ok(Identifier::Catalog(replica.unwrap_or_else(|| format.id.clone())))
    }

    // ========================================================================
    // WRITING
    // ========================================================================

    /// Rewrites the condition and catalog blocks from the in-memory state.
    ///
    /// Blocks read from a file are otherwise stale copies, so every write starts by
    /// removing them.
    pub(crate) fn sync_annotations(&mut self) -> Result<(), EnzymeMLError> {
        let model = self.state.model_mut();

        for reaction in model.reactions.iter_mut() {
            ReactionAnnot::clear(&mut reaction.base.annotation);
            if let Some(conditions) = self.conditions.get(&reaction.id) {
                ReactionAnnot::from(conditions).write_to(&mut reaction.base.annotation, Vec::new())?;
            }
        }
        for orphan in self.conditions.keys().filter(|id| model.reaction(id).is_none()) {
            log::warn!("Conditions for missing reaction '{orphan}' are not written");
        }

        DataAnnot::clear(&mut model.reactions_annotation);
        if !self.catalog.is_empty() {
            DataAnnot::from(&self.catalog).write_to(&mut model.reactions_annotation, Vec::new())?;
        }
        Ok(())
    }

    /// Serializes the experiment markup with up-to-date annotation blocks.
    pub fn to_sbml_string(&mut self) -> Result<String, EnzymeMLError> {
        self.sync_annotations()?;
        Ok(self.state.sbml.to_xml_string()?)
    }
}

/// Builds one term per qualifier that has resources.
fn cross_references(terms: Vec<(Qualifier, Vec<String>)>) -> Vec<CvTerm> {
    terms
        .into_iter()
        .filter(|(_, resources)| !resources.is_empty())
        .map(|(qualifier, resources)| CvTerm::new(qualifier, resources))
        .collect()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;
    use crate::keys::ComponentPayload;

    fn document_with_compartment() -> EnzymeMLDocument {
        let mut doc = EnzymeMLDocument::new("test");
        doc.add_json("MAIN_COMPARTMENT", json!({"name": "Vessel", "size": 1.0, "units": "ml"}), None)
            .unwrap();
        doc
    }

    #[test]
    fn test_species_ids_follow_call_order() {
        let mut doc = document_with_compartment();

        for (i, name) in ["ADH", "Ethanol", "NAD"].iter().enumerate() {
            let id = doc
                .add_json("MAIN_SPECIES", json!({"name": name, "compartment": "c0"}), None)
                .unwrap();
            assert_eq!(id.short_id(), format!("s{i}"));
            assert_eq!(id.meta_id(), Some(format!("META_SPECIES_{i}").as_str()));
        }
    }

    #[test]
    fn test_conflicting_initial_values_leave_document_unchanged() {
        let mut doc = document_with_compartment();

        let result = doc.add_json(
            "MAIN_SPECIES",
            json!({"name": "NAD", "compartment": "c0", "init_conc": 1.0, "init_amount": 2.0, "units": "mmol/l"}),
            None,
        );

        assert!(matches!(result, Err(EnzymeMLError::ConflictingField { .. })));
        assert!(doc.species().is_empty());
        // The unit must not have been created either
        assert!(doc.sbml().model.unit_definitions.is_empty());

        let id = doc
            .add_json("MAIN_SPECIES", json!({"name": "NAD", "compartment": "c0"}), None)
            .unwrap();
        assert_eq!(id.short_id(), "s0");
    }

    #[test]
    fn test_amount_sets_substance_units_flag() {
        let mut doc = document_with_compartment();
        doc.add_json(
            "MAIN_SPECIES",
            json!({"name": "NAD", "compartment": "c0", "init_amount": 2.0, "units": "mmol"}),
            None,
        )
        .unwrap();

        let species = &doc.species()[0];
        assert_eq!(species.initial_amount, Some(2.0));
        assert!(species.has_only_substance_units);
        assert_eq!(species.substance_units.as_deref(), Some("u0"));
        assert_eq!(species.base.sbo_term, Some(INTERACTOR_SBO_TERM));
    }

    #[test]
    fn test_unknown_key_and_missing_target() {
        let mut doc = document_with_compartment();

        let result = doc.add_json("MAIN_NOTHING", json!({}), None);
        assert!(matches!(result, Err(EnzymeMLError::UnknownKey(_))));

        let result = doc.add_json("MAIN_REACTION_CONDITION", json!({"ph": 7.0}), None);
        assert!(matches!(result, Err(EnzymeMLError::MissingTarget(_))));

        let result = doc.add_json("MAIN_REACTION_CONDITION", json!({"ph": 7.0}), Some("r9"));
        assert!(matches!(result, Err(EnzymeMLError::UnknownElement { .. })));
    }

    #[test]
    fn test_modifier_ignores_stoichiometry() {
        let mut doc = document_with_compartment();
        doc.add_json("MAIN_SPECIES", json!({"name": "NAD", "compartment": "c0"}), None)
            .unwrap();
        doc.add_json("MAIN_REACTION", json!({"name": "R"}), None).unwrap();

        doc.add(
            Operation::Modifiers(vec![ComponentPayload::new("META_SPECIES_0", 3.0)]),
            Some("r0"),
        )
        .unwrap();

        let reaction = &doc.reactions()[0];
        assert_eq!(reaction.modifiers.len(), 1);
        assert_eq!(reaction.modifiers[0].species, "s0");
        assert!(reaction.reactants.is_empty());
    }

    #[test]
    fn test_replicas_and_conditions_merge() {
        let mut doc = document_with_compartment();
        doc.add_json("MAIN_REACTION", json!({"name": "R"}), None).unwrap();

        doc.add_json("MAIN_REACTION_CONDITION", json!({"ph": 7.0}), Some("r0"))
            .unwrap();
        doc.add_json(
            "MAIN_REACTION_CONDITION",
            json!({"temperature": [310.15, "kelvin"]}),
            Some("META_REACTION_0"),
        )
        .unwrap();
        doc.add_json(
            "MAIN_REACTION_REPLICAS",
            json!([{"measurement": "M0", "replica": "repl0"}, {"measurement": "M0", "replica": "repl1"}]),
            Some("r0"),
        )
        .unwrap();

        let conditions = doc.conditions("r0").unwrap();
        assert_eq!(conditions.ph, Some(7.0));
        assert_eq!(conditions.temperature, Some(Quantity::new(310.15, "kelvin")));
        assert_eq!(
            conditions.replicas.iter().map(|r| r.id.as_str()).collect::<Vec<_>>(),
            vec!["re0", "re1"]
        );
    }

    #[test]
    fn test_catalog_operations() {
        let mut doc = document_with_compartment();
        doc.add_json("MAIN_SPECIES", json!({"name": "NAD", "compartment": "c0"}), None)
            .unwrap();

        let format = doc
            .add_json(
                "MAIN_DATA_FORMAT",
                json!([{"type": "time", "unit": "s"}, {"type": "conc", "species": "s0", "unit": "mmol/l"}]),
                None,
            )
            .unwrap();
        assert_eq!(format, Identifier::Catalog("format0".into()));

        let replica = doc
            .add_json(
                "MAIN_DATA_COLUMN",
                json!({"type": "conc", "species": "s0", "unit": "mmol/l"}),
                Some("format0"),
            )
            .unwrap();
        assert_eq!(replica.short_id(), "repl1");

        let result = doc.add_json("MAIN_DATA_FILE", json!({"file": "./data/a.csv", "format": "format7"}), None);
        assert!(matches!(result, Err(EnzymeMLError::UnknownFormat(id)) if id == "format7"));

        let file = doc
            .add_json("MAIN_DATA_FILE", json!({"file": "./data/a.csv", "format": "format0"}), None)
            .unwrap();
        let measurement = doc
            .add_json(
                "MAIN_DATA_MEASUREMENTS",
                json!({"name": "run", "file": file.short_id(), "start": 0, "stop": 10}),
                None,
            )
            .unwrap();

        assert_eq!(file.short_id(), "file0");
        assert_eq!(measurement.short_id(), "M0");
        assert_eq!(doc.catalog().format("format0").unwrap().columns[0], Column::Time {
            unit: "second".into(),
            text: None
        });
    }

    #[test]
    fn test_creator_and_dates() {
        let mut doc = document_with_compartment();

        let result = doc.add_json("MAIN_META_DATES_MODIFY", Value::Null, None);
        assert!(matches!(result, Err(EnzymeMLError::MissingCreator(_))));

        let id = doc
            .add_json(
                "MAIN_META_CREATOR",
                json!({"family": "Doe", "given": "Jane", "email": "jane@example.org", "orcid": "0000"}),
                None,
            )
            .unwrap();
        assert_eq!(id.meta_id(), Some("META_MODEL"));

        doc.add_json("MAIN_META_DATES_CREATE", json!("2020-01-01T00:00:00Z"), None)
            .unwrap();
        let history = doc.sbml().model.base.annotation.history.as_ref().unwrap();
        assert_eq!(history.creators[0].email.as_deref(), Some("jane@example.org"));
        assert_eq!(
            history.created.map(|d| d.to_rfc3339()),
            Some("2020-01-01T00:00:00+00:00".to_string())
        );
    }

    #[test]
    fn test_create_model_copies_distinct_species() {
        let mut doc = document_with_compartment();
        for (name, species_type) in [
            ("NAD", "substrate"),
            ("ADH", "enzyme"),
            ("NAD", "product"),
            ("NAD", "substrate"),
        ] {
            doc.add_json(
                "MAIN_SPECIES",
                json!({"name": name, "compartment": "c0", "type": species_type}),
                None,
            )
            .unwrap();
        }

        let model = doc.create_model("kinetics").unwrap();
        let species = &model.state.model().species;

        assert_eq!(
            species
                .iter()
                .map(|s| (s.id.as_str(), s.name.as_deref().unwrap_or_default(), s.base.sbo_term))
                .collect::<Vec<_>>(),
            vec![
                ("S0", "NAD", Some(15)),
                ("S1", "NAD", Some(11)),
                ("S2", "ADH", Some(14)),
            ]
        );
        assert!(matches!(
            doc.create_model("kinetics"),
            Err(EnzymeMLError::DuplicateModel(_))
        ));
    }
}
