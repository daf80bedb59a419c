//! Errors and non-fatal diagnostics of document building and archive handling.

use std::fmt::Display;

use thiserror::Error;

use crate::sbml::error::SBMLError;

/// Errors that abort a keyed operation, an archive write or an archive load
#[derive(Debug, Error)]
pub enum EnzymeMLError {
    /// The key is not part of the operation table
    #[error("Unknown EnzymeML key '{0}'")]
    UnknownKey(String),

    /// The key exists but belongs to the other kind of document
    #[error("Key {0} cannot be applied to this document")]
    MisplacedKey(String),

    /// A required payload field is absent
    #[error("Missing required field '{field}' for key {key}")]
    MissingField { key: String, field: String },

    /// Two mutually exclusive payload fields are both set
    #[error("Fields '{first}' and '{second}' of key {key} are mutually exclusive")]
    ConflictingField {
        key: String,
        first: String,
        second: String,
    },

    /// The operation annotates an existing element but no target was given
    #[error("Key {0} requires a target element")]
    MissingTarget(String),

    /// The target does not resolve to an element of the expected kind
    #[error("No {kind} with id '{id}' exists")]
    UnknownElement { kind: String, id: String },

    /// A data file or column references a format that does not exist
    #[error("No data format with id '{0}' exists")]
    UnknownFormat(String),

    /// Dates can only be recorded once the model has a creator
    #[error("Key {0} requires at least one creator")]
    MissingCreator(String),

    /// The payload does not match the shape expected for the key
    #[error("Invalid payload for key {key}: {source}")]
    InvalidPayload {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// A value in the payload is malformed
    #[error("Invalid value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },

    /// A kinetic model with the same name already exists
    #[error("A model named '{0}' already exists")]
    DuplicateModel(String),

    /// The archive has no master entry
    #[error("Archive '{0}' has no master entry")]
    NoMasterEntry(String),

    /// The master entry is not an SBML document
    #[error("Master entry '{location}' has unsupported format '{format}'")]
    UnsupportedMasterFormat { location: String, format: String },

    /// A manifest entry points to a file missing from the archive
    #[error("Archive entry '{0}' listed in the manifest is missing")]
    MissingEntry(String),

    #[error(transparent)]
    SBMLError(#[from] SBMLError),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Archive error: {0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("Failed to persist archive: {0}")]
    PersistError(#[from] tempfile::PersistError),

    #[error("Failed to process manifest: {0}")]
    ManifestError(#[from] quick_xml::DeError),

    #[error("Failed to write manifest: {0}")]
    ManifestWriteError(#[from] quick_xml::SeError),

    #[error("Failed to process JSON: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl EnzymeMLError {
    pub(crate) fn missing_field(key: impl Display, field: impl Into<String>) -> Self {
        EnzymeMLError::MissingField {
            key: key.to_string(),
            field: field.into(),
        }
    }

    pub(crate) fn unknown_element(kind: impl Into<String>, id: impl Into<String>) -> Self {
        EnzymeMLError::UnknownElement {
            kind: kind.into(),
            id: id.into(),
        }
    }
}

/// Conditions that degrade a result without failing the operation.
///
/// Diagnostics are logged when raised and recorded on the owning document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// A unit name was neither a known symbol, a base kind nor an existing definition;
    /// the name is used as the unit id as-is.
    UnknownUnit(String),
    /// A CSV entry of the archive is not referenced by the data catalog
    OrphanedFile(String),
}

impl Diagnostic {
    /// Logs the diagnostic and hands it back for recording.
    pub(crate) fn emit(self) -> Self {
        log::warn!("{self}");
        self
    }
}

impl Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Diagnostic::UnknownUnit(name) => {
                write!(f, "Unknown unit '{name}', using it as unit id")
            }
            Diagnostic::OrphanedFile(location) => {
                write!(f, "File '{location}' is not mentioned in the experiment file")
            }
        }
    }
}
