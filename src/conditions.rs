//! Reaction conditions, replica links and the used-data records of kinetic models.

use serde::{Deserialize, Serialize};

use crate::ids::IdSequence;
use crate::sbml::annotations::{
    default_xmlns, ConditionsAnnot, ModelReactionAnnot, QuantityAnnot, ReactionAnnot,
    ReplicaAnnot, ReplicasWrapper, UsedDataAnnot, UsedReactionAnnot, UsedReplicaAnnot, ValueAnnot,
};

/// A value with its unit id, e.g. `(310.15, "kelvin")`.
///
/// Payloads may give it as a `[value, unit]` pair or as `{"value": .., "unit": ..}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "QuantityRepr")]
pub struct Quantity {
    pub value: f64,
    pub unit: String,
}

impl Quantity {
    pub fn new(value: f64, unit: impl Into<String>) -> Self {
        Self {
            value,
            unit: unit.into(),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum QuantityRepr {
    Pair(f64, String),
    Object { value: f64, unit: String },
}

impl From<QuantityRepr> for Quantity {
    fn from(repr: QuantityRepr) -> Self {
        match repr {
            QuantityRepr::Pair(value, unit) | QuantityRepr::Object { value, unit } => {
                Quantity { value, unit }
            }
        }
    }
}

/// Links one measurement to one replica column of the data catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Replica {
    pub id: String,
    pub measurement: String,
    pub replica: String,
}

/// Conditions and replicas recorded for one reaction.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReactionConditions {
    pub ph: Option<f64>,
    pub temperature: Option<Quantity>,
    pub pressure: Option<Quantity>,
    pub shaking_frequency: Option<Quantity>,
    pub replicas: Vec<Replica>,
}

impl ReactionConditions {
    pub fn replica(&self, id: &str) -> Option<&Replica> {
        self.replicas.iter().find(|r| r.id == id)
    }

    /// Adds a replica link and returns its id. Without an explicit id the next free
    /// `re%i` of this reaction is used.
    pub fn add_replica(
        &mut self,
        measurement: impl Into<String>,
        replica: impl Into<String>,
        id: Option<String>,
    ) -> String {
        let id = id.unwrap_or_else(|| {
            let mut ids = IdSequence::new("re");
            self.replicas.iter().for_each(|r| ids.observe(&r.id));
            ids.allocate()
        });

        self.replicas.push(Replica {
            id: id.clone(),
            measurement: measurement.into(),
            replica: replica.into(),
        });
        id
    }
}

fn quantity_annot(quantity: &Option<Quantity>) -> Option<QuantityAnnot> {
    quantity.as_ref().map(|q| QuantityAnnot {
        value: q.value,
        unit: q.unit.clone(),
    })
}

fn quantity(annot: Option<QuantityAnnot>) -> Option<Quantity> {
    annot.map(|q| Quantity::new(q.value, q.unit))
}

impl From<&ReactionConditions> for ReactionAnnot {
    fn from(conditions: &ReactionConditions) -> Self {
        ReactionAnnot {
            xmlns: default_xmlns(),
            conditions: ConditionsAnnot {
                ph: conditions.ph.map(|value| ValueAnnot { value }),
                temperature: quantity_annot(&conditions.temperature),
                pressure: quantity_annot(&conditions.pressure),
                shaking_frequency: quantity_annot(&conditions.shaking_frequency),
            },
            replicas: ReplicasWrapper {
                replica: conditions
                    .replicas
                    .iter()
                    .map(|r| ReplicaAnnot {
                        id: r.id.clone(),
                        replica: r.replica.clone(),
                        measurement: r.measurement.clone(),
                    })
                    .collect(),
            },
        }
    }
}

impl From<ReactionAnnot> for ReactionConditions {
    fn from(annot: ReactionAnnot) -> Self {
        ReactionConditions {
            ph: annot.conditions.ph.map(|ph| ph.value),
            temperature: quantity(annot.conditions.temperature),
            pressure: quantity(annot.conditions.pressure),
            shaking_frequency: quantity(annot.conditions.shaking_frequency),
            replicas: annot
                .replicas
                .replica
                .into_iter()
                .map(|r| Replica {
                    id: r.id,
                    measurement: r.measurement,
                    replica: r.replica,
                })
                .collect(),
        }
    }
}

/// Experiment reactions and replicas used to fit one kinetic model reaction.
///
/// An entry with an empty reaction id stands for the whole experiment; an entry with no
/// replicas stands for the whole reaction.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UsedData {
    pub reactions: Vec<UsedReaction>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsedReaction {
    pub reaction: String,
    pub replicas: Vec<String>,
}

impl UsedData {
    /// Records a reaction, and a replica of it if given. Repeated reactions share one entry.
    pub fn add(&mut self, reaction: &str, replica: Option<&str>) {
        let idx = match self.reactions.iter().position(|r| r.reaction == reaction) {
            Some(idx) => idx,
            None => {
                self.reactions.push(UsedReaction {
                    reaction: reaction.to_string(),
                    replicas: Vec::new(),
                });
                self.reactions.len() - 1
            }
        };

        if let Some(replica) = replica {
            self.reactions[idx].replicas.push(replica.to_string());
        }
    }

    pub fn replicas_of(&self, reaction: &str) -> Option<&[String]> {
        self.reactions
            .iter()
            .find(|r| r.reaction == reaction)
            .map(|r| r.replicas.as_slice())
    }
}

// References point into the experiment file and carry a leading '#'.
fn external_ref(id: &str) -> String {
    format!("#{id}")
}

fn local_ref(reference: &str) -> String {
    reference.strip_prefix('#').unwrap_or(reference).to_string()
}

impl From<&UsedData> for ModelReactionAnnot {
    fn from(used: &UsedData) -> Self {
        ModelReactionAnnot {
            xmlns: default_xmlns(),
            used_data: UsedDataAnnot {
                reactions: used
                    .reactions
                    .iter()
                    .map(|r| UsedReactionAnnot {
                        reaction_ref: (!r.reaction.is_empty()).then(|| external_ref(&r.reaction)),
                        replicas: r
                            .replicas
                            .iter()
                            .map(|id| UsedReplicaAnnot {
                                replica_ref: external_ref(id),
                            })
                            .collect(),
                    })
                    .collect(),
            },
        }
    }
}

impl From<ModelReactionAnnot> for UsedData {
    fn from(annot: ModelReactionAnnot) -> Self {
        let mut used = UsedData::default();
        for reaction in annot.used_data.reactions {
            let reaction_id = reaction
                .reaction_ref
                .as_deref()
                .map(local_ref)
                .unwrap_or_default();
            used.add(&reaction_id, None);
            for replica in reaction.replicas {
                used.add(&reaction_id, Some(&local_ref(&replica.replica_ref)));
            }
        }
        used
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::sbml::annotations::EnzymeMLAnnotation;

    #[test]
    fn test_quantity_accepts_pair_and_object() {
        let pair: Quantity = serde_json::from_str(r#"[310.15, "kelvin"]"#).unwrap();
        let object: Quantity =
            serde_json::from_str(r#"{"value": 310.15, "unit": "kelvin"}"#).unwrap();

        assert_eq!(pair, Quantity::new(310.15, "kelvin"));
        assert_eq!(pair, object);
    }

    #[test]
    fn test_conditions_through_annotation() {
        let conditions = ReactionConditions {
            ph: Some(7.0),
            temperature: Some(Quantity::new(310.15, "kelvin")),
            shaking_frequency: Some(Quantity::new(120.0, "u3")),
            replicas: vec![Replica {
                id: "re0".into(),
                measurement: "M0".into(),
                replica: "repl0".into(),
            }],
            ..Default::default()
        };

        let fragment = ReactionAnnot::from(&conditions).to_fragment().unwrap();
        let decoded = ReactionConditions::from(ReactionAnnot::from_fragment(&fragment).unwrap());

        assert_eq!(decoded, conditions);
    }

    #[test]
    fn test_replica_ids_continue_after_existing() {
        let mut conditions = ReactionConditions::default();
        assert_eq!(conditions.add_replica("M0", "repl0", None), "re0");
        assert_eq!(conditions.add_replica("M0", "repl1", Some("re5".into())), "re5");
        assert_eq!(conditions.add_replica("M1", "repl0", None), "re6");
        assert_eq!(conditions.replica("re6").unwrap().measurement, "M1");
    }

    #[test]
    fn test_used_data_references_are_prefixed() {
        let mut used = UsedData::default();
        used.add("r0", Some("re0"));
        used.add("r0", Some("re1"));
        used.add("r1", None);

        let annot = ModelReactionAnnot::from(&used);
        assert_eq!(
            annot.used_data.reactions[0].reaction_ref.as_deref(),
            Some("#r0")
        );
        assert_eq!(annot.used_data.reactions[0].replicas[1].replica_ref, "#re1");

        let decoded = UsedData::from(annot);
        assert_eq!(decoded, used);
        assert_eq!(decoded.replicas_of("r1"), Some(&[][..]));
    }
}
