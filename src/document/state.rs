//! State shared by experiment documents and kinetic models.
//!
//! A [`ModelState`] owns one SBML document together with the id counters, the unit cache
//! and the diagnostics raised while editing it. Nothing here is global: two documents
//! in the same process never see each other's counters.

use std::str::FromStr;

use chrono::{DateTime, Utc};

use crate::error::{Diagnostic, EnzymeMLError};
use crate::ids::{ElementId, ElementKind, IdAllocator};
use crate::keys::{ComponentPayload, CreatorPayload, NotePayload, StdDev, UnitPayload};
use crate::sbml::markup::{
    Model, ModifierSpeciesReference, Reaction, SBase, SbmlDocument, SpeciesReference,
    Uncertainty, UnitDefinition, MODEL_META_ID, XHTML_NS,
};
use crate::sbml::rdf::{Creator, CvTerm, ModelHistory, Qualifier};
use crate::sbml::xml::XmlNode;
use crate::units::{builtin_unit, BuiltinUnit, UnitAtom, UnitKind, UnitRegistry};

/// Position of a species in a reaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentRole {
    Reactant,
    Product,
    Modifier,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelState {
    pub(crate) sbml: SbmlDocument,
    pub(crate) ids: IdAllocator,
    pub(crate) units: UnitRegistry,
    pub(crate) diagnostics: Vec<Diagnostic>,
}

impl ModelState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wraps a parsed document and advances every counter past the ids it contains.
    pub fn from_sbml(sbml: SbmlDocument) -> Self {
        let mut state = Self {
            sbml,
            ..Default::default()
        };
        state.reseed();
        state
    }

    pub(crate) fn reseed(&mut self) {
        let model = &self.sbml.model;
        for id in model.element_ids() {
            self.ids.observe_any(id);
        }
        self.units.rebuild(
            model
                .unit_definitions
                .iter()
                .map(|u| (u.id.as_str(), u.name.as_deref())),
        );
    }

    pub fn model(&self) -> &Model {
        &self.sbml.model
    }

    pub(crate) fn model_mut(&mut self) -> &mut Model {
        &mut self.sbml.model
    }

    pub(crate) fn model_id(&self) -> ElementId {
        let model = &self.sbml.model;
        ElementId::new(
            model.id.clone().unwrap_or_default(),
            model
                .base
                .meta_id
                .clone()
                .unwrap_or_else(|| MODEL_META_ID.to_string()),
        )
    }

    /// The id pair of any element addressed by short or meta id.
    pub(crate) fn element_id(&self, target: &str) -> Option<ElementId> {
        let model = &self.sbml.model;
        let pair = |id: &str, base: &SBase| ElementId::new(id, base.meta_id.clone().unwrap_or_default());

        if model.id.as_deref() == Some(target) || model.base.meta_id.as_deref() == Some(target) {
            return Some(self.model_id());
        }
        model
            .unit_definitions
            .iter()
            .map(|u| pair(&u.id, &u.base))
            .chain(model.compartments.iter().map(|c| pair(&c.id, &c.base)))
            .chain(model.species.iter().map(|s| pair(&s.id, &s.base)))
            .chain(model.reactions.iter().map(|r| pair(&r.id, &r.base)))
            .find(|id| id.matches(target))
    }

    // ========================================================================
    // UNITS
    // ========================================================================

    /// Resolves a unit given by name to the id used in the markup.
    ///
    /// Existing definitions win, then the per-document cache, then the built-in table
    /// (which creates the definition on first use). Base unit kinds are used as they are.
    /// Anything else is passed through unchanged and reported as a diagnostic.
    pub(crate) fn resolve_unit(&mut self, name: &str) -> String {
        if let Some(definition) = self.sbml.model.unit_definition(name) {
            return definition.id.clone();
        }
        if let Some(id) = self.units.get(name) {
            return id.to_string();
        }

        match builtin_unit(name) {
            Some(BuiltinUnit::Base(kind)) => kind.to_string(),
            Some(BuiltinUnit::Defined {
                name: unit_name,
                atoms,
                reference,
            }) => {
                let id = self.ids.next_id(ElementKind::Unit);
                let mut base = SBase::with_meta_id(&id.meta_id);
                base.annotation
                    .add_cv_term(CvTerm::new(Qualifier::Is, vec![reference.to_string()]));

                self.sbml.model.unit_definitions.push(UnitDefinition {
                    id: id.short_id.clone(),
                    name: Some(unit_name.to_string()),
                    base,
                    units: atoms.clone(),
                });
                self.units.insert(name, &id.short_id);
                log::debug!("Created unit definition {} for '{name}'", id.short_id);
                id.short_id
            }
            None if UnitKind::from_str(name).is_ok() => name.to_string(),
            None => {
                self.diagnostics
                    .push(Diagnostic::UnknownUnit(name.to_string()).emit());
                name.to_string()
            }
        }
    }

    pub(crate) fn resolve_opt_unit(&mut self, name: Option<&str>) -> Option<String> {
        name.map(|n| self.resolve_unit(n))
    }

    pub(crate) fn uncertainty(&mut self, stdev: Option<&StdDev>) -> Option<Uncertainty> {
        stdev.map(|s| Uncertainty {
            value: s.value,
            units: self.resolve_opt_unit(s.unit.as_deref()),
        })
    }

    /// Creates a unit definition from explicit atoms.
    pub(crate) fn add_unit(&mut self, payload: UnitPayload) -> ElementId {
        let id = self.ids.next_id(ElementKind::Unit);
        let atoms = payload
            .units
            .iter()
            .map(|atom| {
                UnitAtom::new(atom.kind)
                    .exponent(atom.exponent)
                    .scale(atom.scale)
                    .multiplier(atom.multiplier)
            })
            .collect();

        if self.units.get(&payload.name).is_none() {
            self.units.insert(payload.name.as_str(), &id.short_id);
        }
        self.sbml.model.unit_definitions.push(UnitDefinition {
            id: id.short_id.clone(),
            name: Some(payload.name),
            base: SBase::with_meta_id(&id.meta_id),
            units: atoms,
        });
        id
    }

    // ========================================================================
    // META
    // ========================================================================

    /// Replaces the notes of the target element.
    pub(crate) fn set_note(
        &mut self,
        key: &str,
        target: Option<&str>,
        note: NotePayload,
    ) -> Result<ElementId, EnzymeMLError> {
        let target = target.ok_or_else(|| EnzymeMLError::MissingTarget(key.to_string()))?;
        let id = self
            .element_id(target)
            .ok_or_else(|| EnzymeMLError::unknown_element("element", target))?;
        let body = note_body(note);

        if let Some(base) = self.sbml.model.base_mut(target) {
            base.notes = Some(body);
        }
        Ok(id)
    }

    pub(crate) fn set_name(&mut self, name: String) -> ElementId {
        self.sbml.model.name = Some(name);
        self.model_id()
    }

    /// Adds a creator to the model history, starting the history if needed.
    pub(crate) fn add_history_creator(&mut self, payload: CreatorPayload) -> ElementId {
        if let Some(orcid) = &payload.orcid {
            log::debug!("ORCID '{orcid}' of {} is not recorded", payload.family);
        }

        let history = self.sbml.model.base.annotation.history.get_or_insert_with(|| {
            let now = Utc::now();
            ModelHistory {
                creators: Vec::new(),
                created: Some(now),
                modified: Some(now),
            }
        });
        history.creators.push(Creator {
            family: payload.family,
            given: payload.given,
            email: payload.email,
            organization: payload.org,
        });
        self.model_id()
    }

    /// Sets the created or modified date; the other one is filled in when unset.
    pub(crate) fn set_date(
        &mut self,
        key: &str,
        created: bool,
        date: Option<DateTime<Utc>>,
    ) -> Result<ElementId, EnzymeMLError> {
        let history = self
            .sbml
            .model
            .base
            .annotation
            .history
            .as_mut()
            .ok_or_else(|| EnzymeMLError::MissingCreator(key.to_string()))?;

        let date = date.unwrap_or_else(Utc::now);
        let (set, other) = if created {
            (&mut history.created, &mut history.modified)
        } else {
            (&mut history.modified, &mut history.created)
        };
        *set = Some(date);
        other.get_or_insert(date);

        Ok(self.model_id())
    }

    /// Adds cross-references to an element. `expect` names the element kind that must
    /// carry the id; `None` accepts any element.
    pub(crate) fn add_cross_references(
        &mut self,
        key: &str,
        target: Option<&str>,
        expect: Option<&str>,
        terms: Vec<CvTerm>,
    ) -> Result<ElementId, EnzymeMLError> {
        let target = target.ok_or_else(|| EnzymeMLError::MissingTarget(key.to_string()))?;
        let model = &self.sbml.model;
        let exists = match expect {
            Some("unit definition") => model.unit_definition(target).is_some(),
            Some("compartment") => model.compartment(target).is_some(),
            Some("species") => model.species(target).is_some(),
            Some("reaction") => model.reaction(target).is_some(),
            _ => true,
        };
        let kind = expect.unwrap_or("element");
        let id = self
            .element_id(target)
            .filter(|_| exists)
            .ok_or_else(|| EnzymeMLError::unknown_element(kind, target))?;

        if let Some(base) = self.sbml.model.base_mut(target) {
            for term in terms.into_iter().filter(|t| !t.resources.is_empty()) {
                base.annotation.add_cv_term(term);
            }
        }
        Ok(id)
    }

    // ========================================================================
    // REACTIONS
    // ========================================================================

    pub(crate) fn require_reaction(
        &self,
        key: &str,
        target: Option<&str>,
    ) -> Result<ElementId, EnzymeMLError> {
        let target = target.ok_or_else(|| EnzymeMLError::MissingTarget(key.to_string()))?;
        self.sbml
            .model
            .reaction(target)
            .map(|r| ElementId::new(&r.id, r.base.meta_id.clone().unwrap_or_default()))
            .ok_or_else(|| EnzymeMLError::unknown_element("reaction", target))
    }

    /// Checks that every component names an existing species.
    pub(crate) fn check_components<'a>(
        &self,
        components: impl IntoIterator<Item = &'a ComponentPayload>,
    ) -> Result<(), EnzymeMLError> {
        for component in components {
            if self.sbml.model.species(&component.id).is_none() {
                return Err(EnzymeMLError::unknown_element("species", &component.id));
            }
        }
        Ok(())
    }

    /// Appends components to a reaction addressed by id.
    pub(crate) fn add_components(
        &mut self,
        key: &str,
        target: Option<&str>,
        role: ComponentRole,
        components: &[ComponentPayload],
    ) -> Result<ElementId, EnzymeMLError> {
        let id = self.require_reaction(key, target)?;
        self.check_components(components)?;
        let components = self.resolve_species_ids(components);

        if let Some(reaction) = self.sbml.model.reaction_mut(&id.short_id) {
            push_components(reaction, role, &components);
        }
        Ok(id)
    }

    /// Rewrites meta-id references to short ids, which is what species references hold.
    pub(crate) fn resolve_species_ids(&self, components: &[ComponentPayload]) -> Vec<ComponentPayload> {
        components
            .iter()
            .map(|c| ComponentPayload {
                id: self
                    .sbml
                    .model
                    .species(&c.id)
                    .map(|s| s.id.clone())
                    .unwrap_or_else(|| c.id.clone()),
                ..c.clone()
            })
            .collect()
    }
}

pub(crate) fn push_components(
    reaction: &mut Reaction,
    role: ComponentRole,
    components: &[ComponentPayload],
) {
    for component in components {
        match role {
            ComponentRole::Modifier => reaction.modifiers.push(ModifierSpeciesReference {
                species: component.id.clone(),
            }),
            ComponentRole::Reactant | ComponentRole::Product => {
                let reference = SpeciesReference {
                    species: component.id.clone(),
                    stoichiometry: component.stoichiometry,
                    constant: component.constant,
                };
                if role == ComponentRole::Reactant {
                    reaction.reactants.push(reference);
                } else {
                    reaction.products.push(reference);
                }
            }
        }
    }
}

/// Builds the XHTML body of a note.
fn note_body(note: NotePayload) -> XmlNode {
    match note {
        NotePayload::Section { heading, text } => XmlNode::with_namespace("body", XHTML_NS)
            .child(XmlNode::new("h1").text(heading))
            .child(XmlNode::new("p").text(text)),
        NotePayload::Markup(markup) => match XmlNode::parse(&markup) {
            Ok(node) if node.local_name() == "body" => node,
            Ok(node) => XmlNode::with_namespace("body", XHTML_NS).child(node),
            Err(_) => XmlNode::with_namespace("body", XHTML_NS).child(XmlNode::new("p").text(markup)),
        },
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_builtin_unit_is_created_once() {
        let mut state = ModelState::new();

        let first = state.resolve_unit("mmol/l");
        let second = state.resolve_unit("mmol/l");

        assert_eq!(first, "u0");
        assert_eq!(second, "u0");
        assert_eq!(state.model().unit_definitions.len(), 1);
        assert_eq!(
            state.model().unit_definitions[0].base.annotation.resources(Qualifier::Is),
            vec!["https://identifiers.org/UO:0000065".to_string()]
        );
    }

    #[test]
    fn test_base_kinds_and_unknown_units_pass_through() {
        let mut state = ModelState::new();

        assert_eq!(state.resolve_unit("s"), "second");
        assert_eq!(state.resolve_unit("kelvin"), "kelvin");
        assert_eq!(state.resolve_unit("furlong"), "furlong");

        assert!(state.model().unit_definitions.is_empty());
        assert_eq!(
            state.diagnostics,
            vec![Diagnostic::UnknownUnit("furlong".into())]
        );
    }

    #[test]
    fn test_dates_require_history() {
        let mut state = ModelState::new();
        let result = state.set_date("MAIN_META_DATES_CREATE", true, None);
        assert!(matches!(result, Err(EnzymeMLError::MissingCreator(_))));
    }

    #[test]
    fn test_markup_note_is_wrapped_in_body() {
        let body = note_body(NotePayload::Markup("<p>Measured at 30 °C</p>".into()));
        assert_eq!(body.local_name(), "body");
        assert_eq!(body.namespace.as_deref(), Some(XHTML_NS));
        assert_eq!(body.children[0].text.as_deref(), Some("Measured at 30 °C"));

        let plain = note_body(NotePayload::Markup("plain & simple".into()));
        assert_eq!(plain.children[0].text.as_deref(), Some("plain & simple"));
    }
}
