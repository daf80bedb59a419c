use std::fmt::Display;
use std::str::FromStr;

use regex::Regex;
use variantly::Variantly;

use super::error::SBMLError;

pub(crate) const SUBSTRATE_SBO_TERM: u32 = 15;
pub(crate) const ENZYME_SBO_TERM: u32 = 14;
pub(crate) const PRODUCT_SBO_TERM: u32 = 11;
pub(crate) const INHIBITOR_SBO_TERM: u32 = 20;
pub(crate) const ACTIVATOR_SBO_TERM: u32 = 21;
pub(crate) const MODIFIER_SBO_TERM: u32 = 19;
pub(crate) const NEUTRAL_PARTICIPANT_SBO_TERM: u32 = 594;
pub(crate) const INTERACTOR_SBO_TERM: u32 = 336;
pub(crate) const METABOLITE_SBO_TERM: u32 = 299;

lazy_static::lazy_static! {
    static ref SBO_PATTERN: Regex = Regex::new(r"^(?:SBO:)?(\d{1,7})$").unwrap();
}

/// Role of a species in an experiment, tagged on the species with an SBO term.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Variantly)]
pub enum SpeciesRole {
    Substrate,
    Enzyme,
    Product,
    Inhibitor,
    Activator,
    Modifier,
    NeutralParticipant,
    Interactor,
    Metabolite,
}

impl SpeciesRole {
    pub fn sbo_term(&self) -> u32 {
        match self {
            SpeciesRole::Substrate => SUBSTRATE_SBO_TERM,
            SpeciesRole::Enzyme => ENZYME_SBO_TERM,
            SpeciesRole::Product => PRODUCT_SBO_TERM,
            SpeciesRole::Inhibitor => INHIBITOR_SBO_TERM,
            SpeciesRole::Activator => ACTIVATOR_SBO_TERM,
            SpeciesRole::Modifier => MODIFIER_SBO_TERM,
            SpeciesRole::NeutralParticipant => NEUTRAL_PARTICIPANT_SBO_TERM,
            SpeciesRole::Interactor => INTERACTOR_SBO_TERM,
            SpeciesRole::Metabolite => METABOLITE_SBO_TERM,
        }
    }

    pub fn from_sbo(term: u32) -> Option<Self> {
        Some(match term {
            SUBSTRATE_SBO_TERM => SpeciesRole::Substrate,
            ENZYME_SBO_TERM => SpeciesRole::Enzyme,
            PRODUCT_SBO_TERM => SpeciesRole::Product,
            INHIBITOR_SBO_TERM => SpeciesRole::Inhibitor,
            ACTIVATOR_SBO_TERM => SpeciesRole::Activator,
            MODIFIER_SBO_TERM => SpeciesRole::Modifier,
            NEUTRAL_PARTICIPANT_SBO_TERM => SpeciesRole::NeutralParticipant,
            INTERACTOR_SBO_TERM => SpeciesRole::Interactor,
            METABOLITE_SBO_TERM => SpeciesRole::Metabolite,
            _ => return None,
        })
    }
}

impl Display for SpeciesRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SpeciesRole::Substrate => "substrate",
            SpeciesRole::Enzyme => "enzyme",
            SpeciesRole::Product => "product",
            SpeciesRole::Inhibitor => "inhibitor",
            SpeciesRole::Activator => "activator",
            SpeciesRole::Modifier => "modifier",
            SpeciesRole::NeutralParticipant => "neutral participant",
            SpeciesRole::Interactor => "interactor",
            SpeciesRole::Metabolite => "metabolite",
        };
        write!(f, "{name}")
    }
}

/// Parses a species type as given in payloads: an SBO term (`SBO:0000015`, `15`) or a
/// role name (`substrate`). Any well-formed SBO term is accepted, known role or not.
pub fn parse_species_type(value: &str) -> Result<u32, SBMLError> {
    let value = value.trim();
    if let Some(captures) = SBO_PATTERN.captures(value) {
        return captures[1]
            .parse()
            .map_err(|_| SBMLError::InvalidSBOTerm(value.to_string()));
    }
    SpeciesRole::from_str(value).map(|role| role.sbo_term())
}

impl FromStr for SpeciesRole {
    type Err = SBMLError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_lowercase().as_str() {
            "substrate" => SpeciesRole::Substrate,
            "enzyme" | "protein" => SpeciesRole::Enzyme,
            "product" => SpeciesRole::Product,
            "inhibitor" => SpeciesRole::Inhibitor,
            "activator" => SpeciesRole::Activator,
            "modifier" | "cofactor" => SpeciesRole::Modifier,
            "neutral participant" | "neutral_participant" => SpeciesRole::NeutralParticipant,
            "interactor" => SpeciesRole::Interactor,
            "metabolite" => SpeciesRole::Metabolite,
            _ => match SBO_PATTERN.captures(s.trim()) {
                Some(captures) => captures[1]
                    .parse()
                    .ok()
                    .and_then(SpeciesRole::from_sbo)
                    .ok_or_else(|| SBMLError::InvalidSBOTerm(s.to_string()))?,
                None => return Err(SBMLError::InvalidSBOTerm(s.to_string())),
            },
        })
    }
}
