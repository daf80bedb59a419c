//! Unit kinds, the built-in unit table and the per-document unit registry.

use std::collections::HashMap;
use std::fmt::Display;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::sbml::error::SBMLError;

/// Base unit kinds of SBML Level 3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitKind {
    Ampere,
    Avogadro,
    Becquerel,
    Candela,
    Coulomb,
    Dimensionless,
    Farad,
    Gram,
    Gray,
    Henry,
    Hertz,
    Item,
    Joule,
    Katal,
    Kelvin,
    Kilogram,
    #[serde(alias = "liter")]
    Litre,
    Lumen,
    Lux,
    #[serde(alias = "meter")]
    Metre,
    Mole,
    Newton,
    Ohm,
    Pascal,
    Radian,
    Second,
    Siemens,
    Sievert,
    Steradian,
    Tesla,
    Volt,
    Watt,
    Weber,
}

impl UnitKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnitKind::Ampere => "ampere",
            UnitKind::Avogadro => "avogadro",
            UnitKind::Becquerel => "becquerel",
            UnitKind::Candela => "candela",
            UnitKind::Coulomb => "coulomb",
            UnitKind::Dimensionless => "dimensionless",
            UnitKind::Farad => "farad",
            UnitKind::Gram => "gram",
            UnitKind::Gray => "gray",
            UnitKind::Henry => "henry",
            UnitKind::Hertz => "hertz",
            UnitKind::Item => "item",
            UnitKind::Joule => "joule",
            UnitKind::Katal => "katal",
            UnitKind::Kelvin => "kelvin",
            UnitKind::Kilogram => "kilogram",
            UnitKind::Litre => "litre",
            UnitKind::Lumen => "lumen",
            UnitKind::Lux => "lux",
            UnitKind::Metre => "metre",
            UnitKind::Mole => "mole",
            UnitKind::Newton => "newton",
            UnitKind::Ohm => "ohm",
            UnitKind::Pascal => "pascal",
            UnitKind::Radian => "radian",
            UnitKind::Second => "second",
            UnitKind::Siemens => "siemens",
            UnitKind::Sievert => "sievert",
            UnitKind::Steradian => "steradian",
            UnitKind::Tesla => "tesla",
            UnitKind::Volt => "volt",
            UnitKind::Watt => "watt",
            UnitKind::Weber => "weber",
        }
    }
}

impl Display for UnitKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for UnitKind {
    type Err = SBMLError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "ampere" => UnitKind::Ampere,
            "avogadro" => UnitKind::Avogadro,
            "becquerel" => UnitKind::Becquerel,
            "candela" => UnitKind::Candela,
            "coulomb" => UnitKind::Coulomb,
            "dimensionless" => UnitKind::Dimensionless,
            "farad" => UnitKind::Farad,
            "gram" => UnitKind::Gram,
            "gray" => UnitKind::Gray,
            "henry" => UnitKind::Henry,
            "hertz" => UnitKind::Hertz,
            "item" => UnitKind::Item,
            "joule" => UnitKind::Joule,
            "katal" => UnitKind::Katal,
            "kelvin" => UnitKind::Kelvin,
            "kilogram" => UnitKind::Kilogram,
            "litre" | "liter" => UnitKind::Litre,
            "lumen" => UnitKind::Lumen,
            "lux" => UnitKind::Lux,
            "metre" | "meter" => UnitKind::Metre,
            "mole" => UnitKind::Mole,
            "newton" => UnitKind::Newton,
            "ohm" => UnitKind::Ohm,
            "pascal" => UnitKind::Pascal,
            "radian" => UnitKind::Radian,
            "second" => UnitKind::Second,
            "siemens" => UnitKind::Siemens,
            "sievert" => UnitKind::Sievert,
            "steradian" => UnitKind::Steradian,
            "tesla" => UnitKind::Tesla,
            "volt" => UnitKind::Volt,
            "watt" => UnitKind::Watt,
            "weber" => UnitKind::Weber,
            _ => return Err(SBMLError::InvalidUnitKind(s.to_string())),
        })
    }
}

/// One factor of a unit definition: `(multiplier * 10^scale * kind)^exponent`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitAtom {
    pub kind: UnitKind,
    #[serde(default = "one")]
    pub exponent: f64,
    #[serde(default)]
    pub scale: i32,
    #[serde(default = "one")]
    pub multiplier: f64,
}

fn one() -> f64 {
    1.0
}

impl UnitAtom {
    pub fn new(kind: UnitKind) -> Self {
        Self {
            kind,
            exponent: 1.0,
            scale: 0,
            multiplier: 1.0,
        }
    }

    pub fn scale(mut self, scale: i32) -> Self {
        self.scale = scale;
        self
    }

    pub fn exponent(mut self, exponent: f64) -> Self {
        self.exponent = exponent;
        self
    }

    pub fn multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier;
        self
    }
}

/// Entry of the built-in unit table.
#[derive(Debug, Clone, PartialEq)]
pub enum BuiltinUnit {
    /// Maps directly onto a base kind; no definition is created.
    Base(UnitKind),
    /// Creates a unit definition with the given name, atoms and ontology reference.
    Defined {
        name: &'static str,
        atoms: Vec<UnitAtom>,
        reference: &'static str,
    },
}

lazy_static::lazy_static! {
    /// Symbolic unit names understood by the registry.
    pub static ref BUILTIN_UNITS: HashMap<&'static str, BuiltinUnit> = {
        use UnitKind::*;

        let defined = |name, atoms, reference| BuiltinUnit::Defined { name, atoms, reference };
        let mut m = HashMap::new();

        // Ratios
        m.insert("%", defined("percent", vec![UnitAtom::new(Dimensionless).scale(-2)], "https://identifiers.org/UO:0000187"));

        // Time
        m.insert("ms", defined("millisecond", vec![UnitAtom::new(Second).scale(-3)], "https://identifiers.org/UO:0000028"));
        m.insert("s", BuiltinUnit::Base(Second));
        m.insert("min", defined("minute", vec![UnitAtom::new(Second).multiplier(60.0)], "https://identifiers.org/UO:0000031"));
        m.insert("h", defined("hour", vec![UnitAtom::new(Second).multiplier(3600.0)], "https://identifiers.org/UO:0000032"));

        // Concentration
        let per_litre = UnitAtom::new(Litre).exponent(-1.0);
        m.insert("nmol/l", defined("nmol/l", vec![UnitAtom::new(Mole).scale(-9), per_litre.clone()], "https://identifiers.org/UO:0000062"));
        m.insert("umol/l", defined("umol/l", vec![UnitAtom::new(Mole).scale(-6), per_litre.clone()], "https://identifiers.org/UO:0000064"));
        m.insert("mmol/l", defined("mmol/l", vec![UnitAtom::new(Mole).scale(-3), per_litre.clone()], "https://identifiers.org/UO:0000065"));
        m.insert("mol/l", defined("mol/l", vec![UnitAtom::new(Mole), per_litre], "https://identifiers.org/UO:0000062"));

        // Substance
        m.insert("nmol", defined("nmol", vec![UnitAtom::new(Mole).scale(-9)], "https://identifiers.org/UO:0000041"));
        m.insert("umol", defined("umol", vec![UnitAtom::new(Mole).scale(-6)], "https://identifiers.org/UO:0000039"));
        m.insert("mmol", defined("mmol", vec![UnitAtom::new(Mole).scale(-3)], "https://identifiers.org/UO:0000040"));
        m.insert("mol", defined("mol", vec![UnitAtom::new(Mole)], "https://identifiers.org/UO:0000013"));

        // Frequency
        m.insert("rpm", defined(
            "revolution/min",
            vec![
                UnitAtom::new(Dimensionless),
                UnitAtom::new(Second).exponent(-1.0).multiplier(60.0),
            ],
            "https://identifiers.org/NCIT:C70469",
        ));

        m
    };
}

/// Looks up a symbolic name in the built-in table.
pub fn builtin_unit(symbol: &str) -> Option<&'static BuiltinUnit> {
    BUILTIN_UNITS.get(symbol)
}

/// Finds the symbol whose built-in definition carries `name`.
pub fn builtin_symbol_for_name(name: &str) -> Option<&'static str> {
    BUILTIN_UNITS.iter().find_map(|(symbol, unit)| match unit {
        BuiltinUnit::Defined { name: n, .. } if *n == name => Some(*symbol),
        _ => None,
    })
}

/// Memoizes the unit id created for each symbolic name within one document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UnitRegistry {
    cache: HashMap<String, String>,
}

impl UnitRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, symbol: &str) -> Option<&str> {
        self.cache.get(symbol).map(String::as_str)
    }

    pub fn insert(&mut self, symbol: impl Into<String>, id: impl Into<String>) {
        self.cache.insert(symbol.into(), id.into());
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    /// Re-populates the cache from existing unit definitions `(id, name)`, matching
    /// each name against the built-in table.
    pub fn rebuild<'a>(&mut self, definitions: impl Iterator<Item = (&'a str, Option<&'a str>)>) {
        for (id, name) in definitions {
            if let Some(symbol) = name.and_then(builtin_symbol_for_name) {
                self.cache.entry(symbol.to_string()).or_insert_with(|| id.to_string());
            }
        }
    }
}

/// Prefix used for Unit Ontology cross-references.
pub fn uo_reference(term: &str) -> String {
    format!("https://identifiers.org/UO:{term}")
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_builtin_table_entries() {
        match builtin_unit("mmol/l") {
            Some(BuiltinUnit::Defined {
                name,
                atoms,
                reference,
            }) => {
                assert_eq!(*name, "mmol/l");
                assert_eq!(atoms[0], UnitAtom::new(UnitKind::Mole).scale(-3));
                assert_eq!(atoms[1], UnitAtom::new(UnitKind::Litre).exponent(-1.0));
                assert_eq!(*reference, uo_reference("0000065"));
            }
            other => panic!("Unexpected entry: {other:?}"),
        }

        assert_eq!(builtin_unit("s"), Some(&BuiltinUnit::Base(UnitKind::Second)));
        assert_eq!(builtin_unit("furlong"), None);
    }

    #[test]
    fn test_rebuild_matches_builtin_names() {
        let mut registry = UnitRegistry::new();
        registry.rebuild(
            vec![
                ("u0", Some("mol/l")),
                ("u1", Some("revolution/min")),
                ("u2", Some("custom")),
                ("u3", None),
            ]
            .into_iter(),
        );

        assert_eq!(registry.get("mol/l"), Some("u0"));
        assert_eq!(registry.get("rpm"), Some("u1"));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_unit_kind_parsing() {
        assert_eq!("liter".parse::<UnitKind>().unwrap(), UnitKind::Litre);
        assert_eq!(UnitKind::Kelvin.to_string(), "kelvin");
        assert!("parsec".parse::<UnitKind>().is_err());
    }
}
