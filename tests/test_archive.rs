//! Tests for writing and loading EnzymeML archives.
//!
//! Each test writes into its own temporary directory and reads the result back through
//! the public loader.

#[cfg(test)]
mod test_archive {
    use std::{fs::File, io::Write, path::Path};

    use approx::assert_relative_eq;
    use enzymeml_archive::{
        combine::{Manifest, CSV_FORMAT, SBML_FORMAT},
        prelude::*,
    };
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use zip::{write::SimpleFileOptions, ZipWriter};

    fn experiment() -> EnzymeMLDocument {
        let mut doc = EnzymeMLDocument::new("Oxidation");
        doc.add_json(
            "MAIN_COMPARTMENT",
            json!({"name": "Vessel", "size": 1.0, "units": "ml"}),
            None,
        )
        .unwrap();

        for (name, species_type, conc) in [
            ("ADH", "enzyme", 0.01),
            ("Ethanol", "substrate", 10.0),
            ("Acetaldehyde", "product", 0.0),
            ("NAD", "substrate", 5.0),
        ] {
            doc.add_json(
                "MAIN_SPECIES",
                json!({"name": name, "compartment": "c0", "type": species_type, "init_conc": conc, "units": "mmol/l"}),
                None,
            )
            .unwrap();
        }
        doc.add_json(
            "MAIN_REACTION",
            json!({
                "name": "Ethanol oxidation",
                "reactants": [{"id": "s1", "stoichiometry": 1.0}, {"id": "s3", "stoichiometry": 1.0}],
                "modifier": [{"id": "s0"}],
                "products": [{"id": "s2", "stoichiometry": 1.0}],
            }),
            None,
        )
        .unwrap();
        doc.add_json(
            "MAIN_REACTION_CONDITION",
            json!({"ph": 7.0, "temperature": [310.15, "kelvin"]}),
            Some("r0"),
        )
        .unwrap();

        doc.add_json(
            "MAIN_DATA_FORMAT",
            json!([
                {"type": "time", "unit": "s"},
                {"type": "conc", "species": "s1", "unit": "mmol/l"},
                {"type": "conc", "species": "s1", "unit": "mmol/l"},
            ]),
            None,
        )
        .unwrap();
        doc.add_json(
            "MAIN_DATA_FILE",
            json!({"file": "./data/measurements.csv", "format": "format0"}),
            None,
        )
        .unwrap();
        doc.add_json(
            "MAIN_DATA_MEASUREMENTS",
            json!({"name": "Ethanol measurement", "file": "file0", "start": 0, "stop": -1}),
            None,
        )
        .unwrap();
        doc.add_json(
            "MAIN_REACTION_REPLICAS",
            json!([{"measurement": "M0", "replica": "repl0"}, {"measurement": "M0", "replica": "repl1"}]),
            Some("r0"),
        )
        .unwrap();

        let mut table = Table::at_location("./data/measurements.csv").with_format("format0");
        table.add_values([0.0, 10.0, 20.0]);
        table.add_values([10.0, 8.5, 7.25]);
        table.add_values([10.0, 8.25, 7.0]);
        doc.add_table(table);

        doc.add_creator("Doe", "Jane", Some("jane@example.org".into()), None);
        doc
    }

    fn write(doc: &mut EnzymeMLDocument, dir: &Path) -> std::path::PathBuf {
        let options = ArchiveOptionsBuilder::default()
            .output_dir(dir)
            .keep_staging(false)
            .build()
            .unwrap();
        create_archive_with(doc, &options).unwrap()
    }

    fn write_zip(path: &Path, entries: &[(&str, &str)]) {
        let mut zip = ZipWriter::new(File::create(path).unwrap());
        for (name, content) in entries {
            zip.start_file(*name, SimpleFileOptions::default()).unwrap();
            zip.write_all(content.as_bytes()).unwrap();
        }
        zip.finish().unwrap();
    }

    #[test]
    fn test_archive_round_trip() {
        // ARRANGE
        let dir = tempfile::tempdir().unwrap();
        let mut doc = experiment();

        // ACT
        let path = write(&mut doc, dir.path());
        let loaded = load_from_file(&path).unwrap();

        // ASSERT
        assert_eq!(path, dir.path().join("Oxidation.omex"));
        assert!(!dir.path().join("Oxidation").exists());

        assert_eq!(loaded.name, "Oxidation");
        assert_eq!(loaded.species().len(), 4);
        assert_eq!(loaded.reactions().len(), 1);
        assert_eq!(loaded.reactions()[0].reactants.len(), 2);
        assert_eq!(loaded.reactions()[0].modifiers[0].species, "s0");

        let conditions = loaded.conditions("r0").unwrap();
        assert_relative_eq!(conditions.ph.unwrap(), 7.0);
        let temperature = conditions.temperature.as_ref().unwrap();
        assert_relative_eq!(temperature.value, 310.15);
        assert_eq!(temperature.unit, "kelvin");
        assert_eq!(
            conditions.replicas.iter().map(|r| r.replica.as_str()).collect::<Vec<_>>(),
            vec!["repl0", "repl1"]
        );

        assert_eq!(loaded.catalog().format("format0").unwrap().columns.len(), 3);
        assert_eq!(loaded.tables().len(), 1);
        let table = &loaded.tables()[0];
        assert_eq!(table.id.as_deref(), Some("file0"));
        assert_eq!(table.format.as_deref(), Some("format0"));
        assert_eq!(table.columns, doc.tables()[0].columns);

        assert_eq!(loaded.creators(), doc.creators());
        assert!(loaded.diagnostics().is_empty());
    }

    #[test]
    fn test_staging_directory_is_kept_by_default() {
        // ARRANGE
        let dir = tempfile::tempdir().unwrap();
        let mut doc = experiment();
        let options = ArchiveOptionsBuilder::default()
            .output_dir(dir.path())
            .build()
            .unwrap();

        // ACT
        create_archive_with(&mut doc, &options).unwrap();

        // ASSERT
        let staging = dir.path().join("Oxidation");
        assert!(staging.join("experiment.xml").exists());
        assert!(staging.join("manifest.xml").exists());
        assert!(staging.join("data/measurements.csv").exists());
    }

    #[test]
    fn test_failed_write_leaves_no_files() {
        // ARRANGE
        let dir = tempfile::tempdir().unwrap();
        let mut doc = experiment();
        doc.add_table(Table::at_location("./data/measurements.csv"));
        let options = ArchiveOptionsBuilder::default()
            .output_dir(dir.path())
            .build()
            .unwrap();

        // ACT
        let result = create_archive_with(&mut doc, &options);

        // ASSERT
        assert!(result.is_err());
        assert!(!dir.path().join("Oxidation.omex").exists());
        assert!(!dir.path().join("Oxidation").exists());
        let leftovers: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .collect();
        assert!(leftovers.is_empty(), "left behind {leftovers:?}");
    }

    #[test]
    fn test_rewrite_after_removing_kept_staging() {
        // ARRANGE
        let dir = tempfile::tempdir().unwrap();
        let mut doc = experiment();
        let options = ArchiveOptionsBuilder::default()
            .output_dir(dir.path())
            .build()
            .unwrap();
        create_archive_with(&mut doc, &options).unwrap();

        // ACT
        let second = create_archive_with(&mut doc, &options);
        std::fs::remove_dir_all(dir.path().join("Oxidation")).unwrap();
        let third = create_archive_with(&mut doc, &options);

        // ASSERT
        assert!(matches!(second, Err(EnzymeMLError::InvalidValue { .. })));
        assert_eq!(third.unwrap(), dir.path().join("Oxidation.omex"));
        assert!(dir.path().join("Oxidation/experiment.xml").exists());
    }

    #[test]
    fn test_counters_continue_after_reload() {
        // ARRANGE
        let dir = tempfile::tempdir().unwrap();
        let path = write(&mut experiment(), dir.path());
        let mut loaded = load_from_file(path).unwrap();

        // ACT
        let species = loaded
            .add_json(
                "MAIN_SPECIES",
                json!({"name": "NADH", "compartment": "c0", "type": "product", "init_conc": 0.0, "units": "mmol/l"}),
                None,
            )
            .unwrap();
        let reaction = loaded
            .add_json("MAIN_REACTION", json!({"name": "Second"}), None)
            .unwrap();

        // ASSERT
        assert_eq!(species.short_id(), "s4");
        assert_eq!(reaction.short_id(), "r1");
        assert_eq!(loaded.sbml().model.unit_definitions.len(), 1);
        assert_eq!(loaded.species()[4].substance_units.as_deref(), Some("u0"));
    }

    #[test]
    fn test_models_survive_reload() {
        // ARRANGE
        let dir = tempfile::tempdir().unwrap();
        let mut doc = experiment();
        let model = doc.create_model("michaelis_menten").unwrap();
        model
            .add_json(
                "MODEL_REACTION",
                json!({
                    "name": "Ethanol oxidation",
                    "reactants": [{"id": "S1"}],
                    "modifier": [{"id": "S0"}],
                    "products": [{"id": "S2"}],
                    "kineticlaw": "kcat * S0 * S1 / (km + S1)",
                    "parameters": [{"name": "kcat", "value": 1.5}, {"name": "km", "value": 0.2}],
                }),
                None,
            )
            .unwrap();

        // ACT
        let path = write(&mut doc, dir.path());
        let loaded = load_from_file(path).unwrap();

        // ASSERT
        let model = loaded.model("michaelis_menten").unwrap();
        assert_eq!(model.species().len(), 4);
        let law = model.reactions()[0].kinetic_law.as_ref().unwrap();
        assert_eq!(law.formula.as_deref(), Some("kcat * S0 * S1 / (km + S1)"));
        assert_eq!(law.local_parameters.len(), 2);
    }

    #[test]
    fn test_orphaned_file_is_reported() {
        // ARRANGE
        let dir = tempfile::tempdir().unwrap();
        let mut doc = experiment();
        doc.add_table(Table::at_location("./data/extra.csv"));

        // ACT
        let path = write(&mut doc, dir.path());
        let loaded = load_from_file(path).unwrap();

        // ASSERT
        assert_eq!(loaded.tables().len(), 1);
        assert_eq!(
            loaded.diagnostics(),
            &[Diagnostic::OrphanedFile("./data/extra.csv".into())]
        );
    }

    #[test]
    fn test_unsupported_master_format() {
        // ARRANGE
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.omex");
        let mut manifest = Manifest::default();
        manifest.add_entry("./data/run.csv", CSV_FORMAT, true);
        let manifest = manifest.to_xml_string().unwrap();
        write_zip(&path, &[("manifest.xml", &manifest), ("data/run.csv", "1,2\n")]);

        // ACT
        let result = load_from_file(&path);

        // ASSERT
        assert!(matches!(
            result,
            Err(EnzymeMLError::UnsupportedMasterFormat { location, .. }) if location == "./data/run.csv"
        ));
    }

    #[test]
    fn test_missing_master_entry() {
        // ARRANGE
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.omex");
        let mut manifest = Manifest::default();
        manifest.add_entry("./experiment.xml", SBML_FORMAT, true);
        let manifest = manifest.to_xml_string().unwrap();
        write_zip(&path, &[("manifest.xml", &manifest)]);

        // ACT
        let result = load_from_file(&path);

        // ASSERT
        assert!(matches!(result, Err(EnzymeMLError::MissingEntry(_))));
    }
}
