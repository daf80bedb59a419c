//! Writing and reading EnzymeML archives.
//!
//! [`create_archive`] stages every file of a document in a fresh directory under
//! `<output_dir>`, zips them together with the manifest and the archive description and
//! moves the result to `<output_dir>/<name>.omex` in one step. A kept staging directory
//! is renamed to `<output_dir>/<name>/`. [`load_from_file`] reverses this.

use std::fs::{self, File};
use std::io::{BufReader, Read, Seek, Write};
use std::path::{Path, PathBuf};

use derive_builder::Builder;
use serde::{Deserialize, Serialize};
use tempfile::{NamedTempFile, TempDir};
use zip::result::ZipError;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::combine::{
    entry_name, is_csv_format, is_sbml_format, Manifest, OmexDescription, CSV_FORMAT,
    MANIFEST_LOCATION, METADATA_LOCATION, SBML_FORMAT,
};
use crate::document::experiment::EnzymeMLDocument;
use crate::document::kinetic::KineticModel;
use crate::error::{Diagnostic, EnzymeMLError};
use crate::sbml::markup::SbmlDocument;
use crate::tabular::table::Table;

/// Layout and packaging settings of an archive.
///
/// # Examples
///
/// ```
/// use enzymeml_archive::io::ArchiveOptionsBuilder;
///
/// let options = ArchiveOptionsBuilder::default()
///     .output_dir("out")
///     .keep_staging(false)
///     .build()
///     .unwrap();
///
/// assert_eq!(options.models_dir, "models");
/// ```
#[derive(Debug, Clone, PartialEq, Builder, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchiveOptions {
    /// Directory receiving the staging directory and the archive
    #[builder(default = "PathBuf::from(\".\")", setter(into))]
    pub output_dir: PathBuf,
    /// Manifest location of the experiment markup
    #[builder(default = "\"./experiment.xml\".to_string()", setter(into))]
    pub experiment_location: String,
    #[builder(default = "\"models\".to_string()", setter(into))]
    pub models_dir: String,
    /// Directory of tables that were added without a location
    #[builder(default = "\"data\".to_string()", setter(into))]
    pub data_dir: String,
    /// Deflate entries; stored uncompressed otherwise
    #[builder(default = "true")]
    pub compress: bool,
    /// Keep the staging directory after a successful write
    #[builder(default = "true")]
    pub keep_staging: bool,
}

impl Default for ArchiveOptions {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            experiment_location: "./experiment.xml".to_string(),
            models_dir: "models".to_string(),
            data_dir: "data".to_string(),
            compress: true,
            keep_staging: true,
        }
    }
}

impl ArchiveOptions {
    pub fn model_location(&self, model: &str) -> String {
        format!("./{}/{model}.xml", self.models_dir)
    }

    pub fn table_location(&self, table: &Table) -> String {
        if table.location.is_empty() {
            format!("./{}/{}.csv", self.data_dir, table.name)
        } else {
            table.location.clone()
        }
    }
}

/// Staging directory created by the writer itself.
///
/// Dropping it removes only the directory it created. [`StagingDir::keep`] moves it to
/// its final place instead.
struct StagingDir {
    dir: TempDir,
}

impl StagingDir {
    fn create(parent: &Path) -> Result<Self, EnzymeMLError> {
        let dir = tempfile::Builder::new()
            .prefix(".staging-")
            .tempdir_in(parent)?;
        Ok(Self { dir })
    }

    fn write(&self, location: &str, content: &[u8]) -> Result<(), EnzymeMLError> {
        let path = self.dir.path().join(entry_name(location));
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, content)?;
        log::debug!("Staged {}", path.display());
        Ok(())
    }

    /// Disables the cleanup and renames the directory to `target`.
    fn keep(self, target: &Path) -> Result<(), EnzymeMLError> {
        let path = self.dir.keep();
        fs::rename(&path, target)?;
        log::debug!("Kept staging directory {}", target.display());
        Ok(())
    }
}

/// Rejects document names that would not stay a single entry of the output directory.
fn check_archive_name(name: &str) -> Result<(), EnzymeMLError> {
    let reason = if name.trim().is_empty() {
        Some("must not be empty")
    } else if name == "." || name == ".." {
        Some("must not be a relative directory")
    } else if name.contains(['/', '\\', '\0']) {
        Some("must not contain path separators")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(EnzymeMLError::InvalidValue {
            field: "name".to_string(),
            reason: format!("'{name}' {reason}"),
        }),
        None => Ok(()),
    }
}

/// Writes the archive with default options. Returns the path of the written archive.
pub fn create_archive(doc: &mut EnzymeMLDocument) -> Result<PathBuf, EnzymeMLError> {
    create_archive_with(doc, &ArchiveOptions::default())
}

/// Writes `<output_dir>/<name>.omex`.
///
/// The archive is assembled in a temporary file next to the target and only moved into
/// place once complete, so a failed write never leaves a partial archive behind. The
/// staging directory is removed on failure, and on success unless it is to be kept.
///
/// Names that are empty or contain path separators are rejected before anything is
/// written, as is keeping the staging directory when `<output_dir>/<name>` already exists.
pub fn create_archive_with(
    doc: &mut EnzymeMLDocument,
    options: &ArchiveOptions,
) -> Result<PathBuf, EnzymeMLError> {
    check_archive_name(&doc.name)?;
    let kept_path = options.output_dir.join(&doc.name);
    if options.keep_staging && kept_path.exists() {
        return Err(EnzymeMLError::InvalidValue {
            field: "keep_staging".to_string(),
            reason: format!("{} already exists", kept_path.display()),
        });
    }

    fs::create_dir_all(&options.output_dir)?;
    let staging = StagingDir::create(&options.output_dir)?;

    let mut manifest = Manifest::default();
    let mut entries: Vec<(String, Vec<u8>)> = Vec::new();

    let experiment = doc.to_sbml_string()?;
    manifest.add_entry(&options.experiment_location, SBML_FORMAT, true);
    entries.push((options.experiment_location.clone(), experiment.into_bytes()));

    for model in doc.models.iter_mut() {
        let location = options.model_location(&model.name);
        manifest.add_entry(&location, SBML_FORMAT, false);
        entries.push((location, model.to_sbml_string()?.into_bytes()));
    }

    for table in &doc.tables {
        let location = options.table_location(table);
        manifest.add_entry(&location, CSV_FORMAT, false);
        entries.push((location, table.to_csv_string().into_bytes()));
    }

    let description = OmexDescription::for_archive(&doc.name, doc.creators.clone());
    entries.push((
        METADATA_LOCATION.to_string(),
        description.to_xml_string()?.into_bytes(),
    ));
    entries.push((
        MANIFEST_LOCATION.to_string(),
        manifest.to_xml_string()?.into_bytes(),
    ));

    for (location, content) in &entries {
        staging.write(location, content)?;
    }

    let archive_path = options.output_dir.join(format!("{}.omex", doc.name));
    let mut temp = NamedTempFile::new_in(&options.output_dir)?;
    write_zip(temp.as_file_mut(), &entries, options.compress)?;
    temp.persist(&archive_path)?;

    if options.keep_staging {
        staging.keep(&kept_path)?;
    }
    log::info!(
        "Written archive {} with {} entries",
        archive_path.display(),
        entries.len()
    );
    Ok(archive_path)
}

fn write_zip<W: Write + Seek>(
    writer: W,
    entries: &[(String, Vec<u8>)],
    compress: bool,
) -> Result<(), EnzymeMLError> {
    let method = if compress {
        CompressionMethod::Deflated
    } else {
        CompressionMethod::Stored
    };
    let options = SimpleFileOptions::default().compression_method(method);

    let mut zip = ZipWriter::new(writer);
    for (location, content) in entries {
        zip.start_file(entry_name(location), options)?;
        zip.write_all(content)?;
    }
    zip.finish()?;
    Ok(())
}

fn read_entry<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    location: &str,
) -> Result<String, EnzymeMLError> {
    let mut entry = archive.by_name(entry_name(location)).map_err(|err| match err {
        ZipError::FileNotFound => EnzymeMLError::MissingEntry(location.to_string()),
        other => EnzymeMLError::ZipError(other),
    })?;

    let mut content = String::new();
    entry.read_to_string(&mut content)?;
    Ok(content)
}

fn file_stem(location: &str) -> String {
    Path::new(location)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| location.to_string())
}

/// Reads an archive back into a document.
///
/// The master entry must be SBML. Further SBML entries become kinetic models named after
/// their file stem; CSV entries are matched by location against the data catalog, and
/// entries the catalog does not mention are reported as [`Diagnostic::OrphanedFile`].
pub fn load_from_file(path: impl AsRef<Path>) -> Result<EnzymeMLDocument, EnzymeMLError> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let mut archive = ZipArchive::new(BufReader::new(file))?;

    let manifest = Manifest::from_xml_str(&read_entry(&mut archive, MANIFEST_LOCATION)?)?;
    let master = manifest
        .master()
        .ok_or_else(|| EnzymeMLError::NoMasterEntry(path.display().to_string()))?;
    if !is_sbml_format(&master.format) {
        return Err(EnzymeMLError::UnsupportedMasterFormat {
            location: master.location.clone(),
            format: master.format.clone(),
        });
    }

    let sbml = SbmlDocument::from_xml_str(&read_entry(&mut archive, &master.location)?)?;
    let name = file_stem(&path.to_string_lossy());
    let mut doc = EnzymeMLDocument::from_sbml(name, sbml)?;

    match read_entry(&mut archive, METADATA_LOCATION) {
        Ok(rdf) => doc.set_creators(OmexDescription::from_xml_str(&rdf)?.creators),
        Err(EnzymeMLError::MissingEntry(_)) => log::debug!("Archive has no metadata.rdf"),
        Err(err) => return Err(err),
    }

    for entry in manifest.content().filter(|e| !e.is_master()) {
        if is_sbml_format(&entry.format) {
            let sbml = SbmlDocument::from_xml_str(&read_entry(&mut archive, &entry.location)?)?;
            doc.push_model(KineticModel::from_sbml(file_stem(&entry.location), sbml)?)?;
        } else if is_csv_format(&entry.format) {
            let text = read_entry(&mut archive, &entry.location)?;
            let matched = doc
                .catalog()
                .file_by_location(&entry.location)
                .map(|file| (file.id.clone(), file.format.clone()));
            let Some((id, format)) = matched else {
                doc.push_diagnostic(Diagnostic::OrphanedFile(entry.location.clone()));
                continue;
            };

            let mut table = Table::from_csv_str(entry.location.clone(), &text);
            table.id = Some(id);
            table.format = Some(format);
            doc.add_table(table);
        } else {
            log::debug!(
                "Skipping entry {} with format {}",
                entry.location,
                entry.format
            );
        }
    }

    log::info!(
        "Loaded archive {} ({} models, {} tables)",
        path.display(),
        doc.models().len(),
        doc.tables().len()
    );
    Ok(doc)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_builder_defaults_match_default() {
        let built = ArchiveOptionsBuilder::default().build().unwrap();
        assert_eq!(built, ArchiveOptions::default());
    }

    #[test]
    fn test_options_from_partial_json() {
        let options: ArchiveOptions =
            serde_json::from_str(r#"{"output_dir": "out", "compress": false}"#).unwrap();

        assert_eq!(options.output_dir, PathBuf::from("out"));
        assert!(!options.compress);
        assert_eq!(options.experiment_location, "./experiment.xml");
    }

    #[test]
    fn test_locations() {
        let options = ArchiveOptions::default();
        let mut table = Table::new("run");

        assert_eq!(options.model_location("fit"), "./models/fit.xml");
        assert_eq!(options.table_location(&table), "./data/run.csv");

        table.location = String::new();
        assert_eq!(options.table_location(&table), "./data/run.csv");
    }

    #[test]
    fn test_staging_removed_unless_kept() {
        let dir = tempfile::tempdir().unwrap();

        let staging = StagingDir::create(dir.path()).unwrap();
        staging.write("./data/a.csv", b"1\n").unwrap();
        drop(staging);
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);

        let staging = StagingDir::create(dir.path()).unwrap();
        staging.write("./experiment.xml", b"<sbml/>").unwrap();
        staging.keep(&dir.path().join("kept")).unwrap();
        assert!(dir.path().join("kept/experiment.xml").exists());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_unsafe_names_are_rejected() {
        for name in ["", "  ", ".", "..", "../x", "a/b", "a\\b"] {
            assert!(
                matches!(
                    check_archive_name(name),
                    Err(EnzymeMLError::InvalidValue { ref field, .. }) if field == "name"
                ),
                "accepted {name:?}"
            );
        }
        assert!(check_archive_name("Ethanol_oxidation_Doe").is_ok());
        assert!(check_archive_name("run 1.2").is_ok());
    }

    #[test]
    fn test_empty_name_leaves_output_dir_alone() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("precious.txt"), b"keep me").unwrap();
        let options = ArchiveOptionsBuilder::default()
            .output_dir(dir.path())
            .keep_staging(false)
            .build()
            .unwrap();
        let mut doc = EnzymeMLDocument::new("");

        let result = create_archive_with(&mut doc, &options);

        assert!(matches!(result, Err(EnzymeMLError::InvalidValue { .. })));
        assert_eq!(
            fs::read_to_string(dir.path().join("precious.txt")).unwrap(),
            "keep me"
        );
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_existing_directory_is_not_replaced_by_staging() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("Run")).unwrap();
        fs::write(dir.path().join("Run/notes.txt"), b"mine").unwrap();
        let options = ArchiveOptionsBuilder::default()
            .output_dir(dir.path())
            .build()
            .unwrap();
        let mut doc = EnzymeMLDocument::new("Run");

        let result = create_archive_with(&mut doc, &options);

        assert!(matches!(result, Err(EnzymeMLError::InvalidValue { ref field, .. }) if field == "keep_staging"));
        assert!(dir.path().join("Run/notes.txt").exists());
        assert!(!dir.path().join("Run.omex").exists());
    }
}
