//! COMBINE/OMEX container metadata.
//!
//! An archive carries a `manifest.xml` listing every entry with its format, one of them
//! flagged as master, and a `metadata.rdf` describing the archive itself.
//!
//! ```xml
//! <omexManifest xmlns="http://identifiers.org/combine.specifications/omex-manifest">
//!   <content location="." format="http://identifiers.org/combine.specifications/omex"/>
//!   <content location="./experiment.xml" format="http://identifiers.org/combine.specifications/sbml" master="true"/>
//!   <content location="./data/run.csv" format="http://purl.org/NET/mediatypes/text/csv"/>
//! </omexManifest>
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::EnzymeMLError;
use crate::sbml::error::SBMLError;
use crate::sbml::rdf::{parse_w3c_date, w3c_date, Creator, DCTERMS_NS, RDF_NS, VCARD4_NS};
use crate::sbml::xml::XmlNode;

pub const MANIFEST_NS: &str = "http://identifiers.org/combine.specifications/omex-manifest";
pub const OMEX_FORMAT: &str = "http://identifiers.org/combine.specifications/omex";
pub const MANIFEST_FORMAT: &str = "http://identifiers.org/combine.specifications/omex-manifest";
pub const METADATA_FORMAT: &str = "http://identifiers.org/combine.specifications/omex-metadata";
pub const SBML_FORMAT: &str = "http://identifiers.org/combine.specifications/sbml";
pub const CSV_FORMAT: &str = "http://purl.org/NET/mediatypes/text/csv";

pub const MANIFEST_LOCATION: &str = "./manifest.xml";
pub const METADATA_LOCATION: &str = "./metadata.rdf";

/// Whether a format URI denotes SBML, in any level or version.
pub fn is_sbml_format(format: &str) -> bool {
    format.starts_with(SBML_FORMAT)
}

pub fn is_csv_format(format: &str) -> bool {
    format == CSV_FORMAT || format.ends_with("text/csv")
}

fn default_manifest_ns() -> String {
    MANIFEST_NS.to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename = "omexManifest")]
pub struct Manifest {
    #[serde(rename = "@xmlns", default = "default_manifest_ns")]
    pub xmlns: String,
    #[serde(rename = "content", default)]
    pub entries: Vec<ManifestEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestEntry {
    #[serde(rename = "@location")]
    pub location: String,
    #[serde(rename = "@format")]
    pub format: String,
    #[serde(rename = "@master", default, skip_serializing_if = "Option::is_none")]
    pub master: Option<bool>,
}

impl ManifestEntry {
    pub fn new(location: impl Into<String>, format: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            format: format.into(),
            master: None,
        }
    }

    pub fn is_master(&self) -> bool {
        self.master.unwrap_or(false)
    }
}

impl Default for Manifest {
    /// A manifest listing the archive itself, the manifest and the metadata file.
    fn default() -> Self {
        Self {
            xmlns: default_manifest_ns(),
            entries: vec![
                ManifestEntry::new(".", OMEX_FORMAT),
                ManifestEntry::new(MANIFEST_LOCATION, MANIFEST_FORMAT),
                ManifestEntry::new(METADATA_LOCATION, METADATA_FORMAT),
            ],
        }
    }
}

impl Manifest {
    pub fn add_entry(&mut self, location: impl Into<String>, format: impl Into<String>, master: bool) {
        let mut entry = ManifestEntry::new(location, format);
        if master {
            entry.master = Some(true);
        }
        self.entries.push(entry);
    }

    pub fn master(&self) -> Option<&ManifestEntry> {
        self.entries.iter().find(|e| e.is_master())
    }

    /// Entries holding archive content, i.e. everything but the container's own files.
    pub fn content(&self) -> impl Iterator<Item = &ManifestEntry> {
        self.entries.iter().filter(|e| {
            e.location != "."
                && e.location != MANIFEST_LOCATION
                && e.location != METADATA_LOCATION
        })
    }

    pub fn to_xml_string(&self) -> Result<String, EnzymeMLError> {
        let mut buffer = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
        let mut serializer = quick_xml::se::Serializer::new(&mut buffer);
        serializer.indent(' ', 2);
        self.serialize(serializer)?;
        buffer.push('\n');
        Ok(buffer)
    }

    pub fn from_xml_str(xml: &str) -> Result<Self, EnzymeMLError> {
        Ok(quick_xml::de::from_str(xml)?)
    }
}

/// Zip entry name of a manifest location.
pub fn entry_name(location: &str) -> &str {
    location.trim_start_matches("./").trim_start_matches('/')
}

/// The archive description written to `metadata.rdf`.
#[derive(Debug, Clone, PartialEq)]
pub struct OmexDescription {
    pub description: String,
    pub created: Option<DateTime<Utc>>,
    pub creators: Vec<Creator>,
}

impl OmexDescription {
    pub fn for_archive(name: &str, creators: Vec<Creator>) -> Self {
        Self {
            description: format!("EnzymeML Archive - {name}"),
            created: Some(Utc::now()),
            creators,
        }
    }

    pub fn to_xml_string(&self) -> Result<String, SBMLError> {
        let mut description = XmlNode::new("rdf:Description")
            .attr("rdf:about", ".")
            .child(XmlNode::new("dcterms:description").text(&self.description));

        if !self.creators.is_empty() {
            let mut bag = XmlNode::new("rdf:Bag");
            bag.children.extend(self.creators.iter().map(Creator::to_vcard));
            description
                .children
                .push(XmlNode::new("dcterms:creator").child(bag));
        }
        if let Some(created) = &self.created {
            description.children.push(
                XmlNode::new("dcterms:created")
                    .attr("rdf:parseType", "Resource")
                    .child(XmlNode::new("dcterms:W3CDTF").text(w3c_date(created))),
            );
        }

        XmlNode::new("rdf:RDF")
            .attr("xmlns:rdf", RDF_NS)
            .attr("xmlns:dcterms", DCTERMS_NS)
            .attr("xmlns:vCard4", VCARD4_NS)
            .child(description)
            .to_document_string()
    }

    /// Reads the description of `.`; other descriptions in the file are ignored.
    pub fn from_xml_str(xml: &str) -> Result<Self, SBMLError> {
        let root = XmlNode::parse(xml)?;
        let description = root
            .find_all("Description")
            .find(|d| d.get_attr("rdf:about") == Some("."));

        let Some(description) = description else {
            return Ok(Self {
                description: String::new(),
                created: None,
                creators: Vec::new(),
            });
        };

        Ok(Self {
            description: description
                .find("description")
                .and_then(|d| d.text.clone())
                .unwrap_or_default(),
            created: description
                .find_path(&["created", "W3CDTF"])
                .and_then(|d| d.text.as_deref())
                .and_then(parse_w3c_date),
            creators: description
                .find_path(&["creator", "Bag"])
                .map(|bag| bag.find_all("li").filter_map(Creator::from_vcard).collect())
                .unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_manifest_lists_master_once() {
        let mut manifest = Manifest::default();
        manifest.add_entry("./experiment.xml", SBML_FORMAT, true);
        manifest.add_entry("./data/run.csv", CSV_FORMAT, false);

        let xml = manifest.to_xml_string().unwrap();
        assert_eq!(xml.matches("master=\"true\"").count(), 1);

        let parsed = Manifest::from_xml_str(&xml).unwrap();
        assert_eq!(parsed, manifest);
        assert_eq!(parsed.master().unwrap().location, "./experiment.xml");
        assert_eq!(
            parsed.content().map(|e| e.location.as_str()).collect::<Vec<_>>(),
            vec!["./experiment.xml", "./data/run.csv"]
        );
    }

    #[test]
    fn test_manifest_written_by_other_tools() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<omexManifest xmlns="http://identifiers.org/combine.specifications/omex-manifest">
  <content location="." format="http://identifiers.org/combine.specifications/omex"/>
  <content location="./experiment.xml" format="http://identifiers.org/combine.specifications/sbml.level-3.version-2" master="true"/>
  <content location="./models/fit.xml" format="http://identifiers.org/combine.specifications/sbml" master="false"/>
</omexManifest>"#;

        let manifest = Manifest::from_xml_str(xml).unwrap();
        let master = manifest.master().unwrap();

        assert!(is_sbml_format(&master.format));
        assert_eq!(manifest.content().filter(|e| !e.is_master()).count(), 1);
    }

    #[test]
    fn test_entry_names_drop_relative_prefix() {
        assert_eq!(entry_name("./data/run.csv"), "data/run.csv");
        assert_eq!(entry_name("experiment.xml"), "experiment.xml");
    }

    #[test]
    fn test_description_keeps_creators() {
        let description = OmexDescription::for_archive(
            "Test",
            vec![Creator {
                family: "Doe".into(),
                given: "Jane".into(),
                email: Some("jane@example.org".into()),
                organization: Some("University".into()),
            }],
        );

        let xml = description.to_xml_string().unwrap();
        let parsed = OmexDescription::from_xml_str(&xml).unwrap();

        assert_eq!(parsed.description, "EnzymeML Archive - Test");
        assert_eq!(parsed.creators, description.creators);
        assert!(parsed.created.is_some());
    }
}
