//! Tests for building experiment documents through keyed operations.
//!
//! These cover id allocation, the per-document unit registry, the all-or-nothing
//! behaviour of failed operations and the text format of tabular files.

#[cfg(test)]
mod test_document {
    use enzymeml_archive::prelude::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn document(name: &str) -> EnzymeMLDocument {
        let mut doc = EnzymeMLDocument::new(name);
        doc.add_json(
            "MAIN_COMPARTMENT",
            json!({"name": "Vessel", "size": 1.0, "units": "ml"}),
            None,
        )
        .unwrap();
        doc
    }

    #[test]
    fn test_species_ids_follow_call_order() {
        // ARRANGE
        let mut doc = document("Ids");

        // ACT
        let ids: Vec<String> = ["Ethanol", "NAD", "ADH"]
            .iter()
            .map(|name| {
                doc.add_json("MAIN_SPECIES", json!({"name": name, "compartment": "c0"}), None)
                    .unwrap()
                    .short_id()
                    .to_string()
            })
            .collect();

        // ASSERT
        assert_eq!(ids, vec!["s0", "s1", "s2"]);
        assert_eq!(doc.species()[2].base.meta_id.as_deref(), Some("META_SPECIES_2"));
    }

    #[test]
    fn test_unit_registry_is_per_document() {
        // ARRANGE
        let mut first = document("First");
        let mut second = document("Second");
        let species = json!({"name": "NAD", "compartment": "c0", "init_conc": 1.0, "units": "mmol/l"});

        // ACT
        first.add_json("MAIN_SPECIES", species.clone(), None).unwrap();
        first.add_json("MAIN_SPECIES", species.clone(), None).unwrap();
        second.add_json("MAIN_SPECIES", species, None).unwrap();

        // ASSERT
        let units = |doc: &EnzymeMLDocument| {
            doc.sbml()
                .model
                .unit_definitions
                .iter()
                .map(|u| u.id.clone())
                .collect::<Vec<_>>()
        };
        assert_eq!(units(&first), vec!["u0"]);
        assert_eq!(units(&second), vec!["u0"]);
        assert_eq!(first.species()[1].substance_units.as_deref(), Some("u0"));
    }

    #[test]
    fn test_conflicting_initial_values_leave_document_unchanged() {
        // ARRANGE
        let mut doc = document("Conflict");
        let before = doc.clone();

        // ACT
        let result = doc.add_json(
            "MAIN_SPECIES",
            json!({"name": "NAD", "compartment": "c0", "init_conc": 1.0, "init_amount": 2.0, "units": "mmol/l"}),
            None,
        );

        // ASSERT
        assert!(matches!(result, Err(EnzymeMLError::ConflictingField { .. })));
        assert_eq!(doc, before);
    }

    #[test]
    fn test_unknown_species_in_reaction_is_rejected() {
        // ARRANGE
        let mut doc = document("Reaction");
        doc.add_json("MAIN_SPECIES", json!({"name": "NAD", "compartment": "c0"}), None)
            .unwrap();

        // ACT
        let result = doc.add_json(
            "MAIN_REACTION",
            json!({"name": "R", "reactants": [{"id": "s0"}], "products": [{"id": "s9"}]}),
            None,
        );

        // ASSERT
        assert!(matches!(result, Err(EnzymeMLError::UnknownElement { .. })));
        assert!(doc.reactions().is_empty());
    }

    #[test]
    fn test_tabular_text_keeps_empty_fields() {
        // ARRANGE
        let text = "1,a\n,b\n3,\n";

        // ACT
        let table = Table::from_csv_str("./data/t.csv", text);

        // ASSERT
        assert_eq!(table.row_count(), 3);
        assert_eq!(table.columns[0][1], None);
        assert_eq!(table.columns[1][1], Some(Value::Text("b".into())));
        assert_eq!(table.to_csv_string(), text);
    }

    #[test]
    fn test_model_parameters_keep_units() {
        // ARRANGE
        let mut doc = document("Model");
        doc.add_json(
            "MAIN_SPECIES",
            json!({"name": "NAD", "compartment": "c0", "type": "substrate"}),
            None,
        )
        .unwrap();
        let model = doc.create_model("fit").unwrap();

        // ACT
        model
            .add_json(
                "MODEL_REACTION",
                json!({
                    "name": "R",
                    "reactants": [{"id": "S0"}],
                    "kineticlaw": "vmax * S0",
                    "parameters": [{"name": "vmax", "value": 2.0, "units": "mmol/l", "stdev": [0.1, "mmol/l"]}]
                }),
                None,
            )
            .unwrap();

        // ASSERT
        let law = model.reactions()[0].kinetic_law.as_ref().unwrap();
        let parameter = &law.local_parameters[0];
        approx::assert_relative_eq!(parameter.value.unwrap(), 2.0);
        assert_eq!(parameter.units.as_deref(), Some("u0"));
        assert_eq!(
            parameter.uncertainty.as_ref().and_then(|u| u.units.as_deref()),
            Some("u0")
        );
    }
}
