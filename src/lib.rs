//! EnzymeML Archive Library
//!
//! This library builds and reads EnzymeML v1 experiments packaged as COMBINE/OMEX
//! archives, including:
//! - Building experiment documents through keyed, validated operations
//! - Deriving kinetic models from an experiment
//! - Recording reaction conditions, replicas and the data catalog as annotations
//! - Reading and writing the tabular measurement files
//! - Writing `.omex` archives and loading them back
//!
//! # Example
//!
//! ```no_run
//! use enzymeml_archive::prelude::*;
//! use serde_json::json;
//!
//! let mut doc = EnzymeMLDocument::new("Experiment");
//! doc.add_json("MAIN_COMPARTMENT", json!({"name": "Vessel", "size": 1.0, "units": "ml"}), None)?;
//! doc.add_json("MAIN_SPECIES", json!({"name": "NAD", "compartment": "c0"}), None)?;
//!
//! let path = create_archive(&mut doc)?;
//! let loaded = load_from_file(path)?;
//! assert_eq!(loaded.species().len(), 1);
//! # Ok::<(), EnzymeMLError>(())
//! ```

#![warn(unused_imports)]

/// Commonly used types and functionality re-exported for convenience
pub mod prelude {
    pub use crate::catalog::{Column, DataCatalog};
    pub use crate::conditions::{Quantity, ReactionConditions};
    pub use crate::document::experiment::EnzymeMLDocument;
    pub use crate::document::kinetic::KineticModel;
    pub use crate::error::{Diagnostic, EnzymeMLError};
    pub use crate::io::*;
    pub use crate::keys::{Identifier, Key, ModelOperation, Operation};
    pub use crate::record::{read_measurements, ExperimentRecord};
    pub use crate::tabular::table::{Table, Value};
}

/// SBML markup, annotations and the supporting XML and RDF layers
pub mod sbml {
    /// Error types for markup handling
    pub mod error;
    /// EnzymeML annotation blocks
    pub mod annotations;
    /// Typed SBML elements and their (de)serialization
    pub mod markup;
    /// Infix formulas to MathML and back
    pub mod math;
    /// MIRIAM annotations, model history and vCard creators
    pub mod rdf;
    /// Species roles and their SBO terms
    pub mod speciestype;
    /// Generic XML tree
    pub mod xml;
}

/// Experiment documents and kinetic models
pub mod document {
    pub mod experiment;
    pub mod kinetic;
    /// Markup state shared by both document kinds
    pub mod state;
}

/// Tabular measurement files
pub mod tabular {
    /// Reading of CSV files
    pub mod reader;
    /// In-memory tables
    pub mod table;
    /// Writing of CSV files
    pub mod writer;
}

/// The data catalog of an experiment
pub mod catalog;

/// COMBINE manifest and archive description
pub mod combine;

/// Reaction conditions, replicas and used data
pub mod conditions;

/// Error and diagnostic types
pub mod error;

/// Element id allocation
pub mod ids;

/// Tabular document overview
pub mod info;

/// Archive input/output
pub mod io;

/// Operation keys and payloads
pub mod keys;

/// Experiment records of the spreadsheet form
pub mod record;

/// Unit registry and built-in units
pub mod units;
