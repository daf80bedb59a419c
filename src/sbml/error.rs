use std::string::FromUtf8Error;

use thiserror::Error;

/// Errors that can occur while parsing, serializing or converting SBML markup
#[derive(Debug, Error)]
pub enum SBMLError {
    /// Error when the XML reader or writer fails
    #[error("Failed to process XML: {0}")]
    XmlError(#[from] quick_xml::Error),

    /// Error when an attribute of an element cannot be read
    #[error("Failed to read attribute: {0}")]
    AttributeError(#[from] quick_xml::events::attributes::AttrError),

    /// Error when writing markup to its destination fails
    #[error("Failed to write SBML: {0}")]
    WriteError(#[from] std::io::Error),

    /// Error when markup is not valid UTF-8
    #[error("Failed to decode SBML: {0}")]
    Utf8Error(#[from] std::str::Utf8Error),

    /// Error when serialized markup is not valid UTF-8
    #[error("Failed to decode SBML: {0}")]
    FromUtf8Error(#[from] FromUtf8Error),

    /// Error when serializing an annotation fails
    #[error("Failed to serialize annotation: {0}")]
    SerializeError(#[from] quick_xml::SeError),

    /// Error when deserializing an annotation fails
    #[error("Failed to deserialize annotation: {0}")]
    DeserializeError(#[from] quick_xml::DeError),

    /// Error when the document has no root element
    #[error("Document does not contain a root element")]
    EmptyDocument,

    /// Error when the root element is not `<sbml>`
    #[error("Expected <sbml> root element, found <{0}>")]
    NotSBML(String),

    /// Error when the SBML document doesn't contain a model
    #[error("SBML document does not contain a model")]
    MissingModel,

    /// Error when an element lacks a required attribute
    #[error("Element <{element}> is missing required attribute '{attribute}'")]
    MissingAttribute { element: String, attribute: String },

    /// Error when a numeric attribute cannot be parsed
    #[error("Attribute '{attribute}' has invalid numeric value '{value}'")]
    InvalidNumber { attribute: String, value: String },

    /// Error when an invalid unit kind is encountered
    #[error("Invalid unit kind: {0}")]
    InvalidUnitKind(String),

    /// Error when an invalid SBOTerm is encountered
    #[error("Invalid SBOTerm: {0}")]
    InvalidSBOTerm(String),

    /// Error when a kinetic law formula cannot be parsed
    #[error("Failed to parse formula '{formula}': {reason}")]
    InvalidFormula { formula: String, reason: String },

    /// Error when a MathML expression uses an unsupported construct
    #[error("Unsupported MathML element <{0}>")]
    UnsupportedMath(String),
}
