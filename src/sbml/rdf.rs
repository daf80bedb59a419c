//! MIRIAM cross-references, model history and the combined annotation container.
//!
//! An element's `<annotation>` carries two kinds of content: an `rdf:RDF` block with
//! controlled-vocabulary terms (and, on the model, the creator history), and free-form
//! fragments such as the EnzymeML blocks. Both live in one [`Annotation`] value and are
//! written together, so updating one never discards the other.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use super::xml::XmlNode;

pub const RDF_NS: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#";
pub const BQBIOL_NS: &str = "http://biomodels.net/biology-qualifiers/";
pub const BQMODEL_NS: &str = "http://biomodels.net/model-qualifiers/";
pub const DCTERMS_NS: &str = "http://purl.org/dc/terms/";
pub const VCARD4_NS: &str = "http://www.w3.org/2006/vcard/ns#";

/// Relationship between an annotated element and an external resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Qualifier {
    Is,
    HasPart,
    HasTaxon,
    IsEncodedBy,
    OccursIn,
    IsVersionOf,
    IsDescribedBy,
    ModelIs,
    ModelIsDescribedBy,
}

impl Qualifier {
    fn tag(&self) -> &'static str {
        match self {
            Qualifier::Is => "bqbiol:is",
            Qualifier::HasPart => "bqbiol:hasPart",
            Qualifier::HasTaxon => "bqbiol:hasTaxon",
            Qualifier::IsEncodedBy => "bqbiol:isEncodedBy",
            Qualifier::OccursIn => "bqbiol:occursIn",
            Qualifier::IsVersionOf => "bqbiol:isVersionOf",
            Qualifier::IsDescribedBy => "bqbiol:isDescribedBy",
            Qualifier::ModelIs => "bqmodel:is",
            Qualifier::ModelIsDescribedBy => "bqmodel:isDescribedBy",
        }
    }

    fn from_node(node: &XmlNode) -> Option<Self> {
        let biological = match node.namespace.as_deref() {
            Some(BQBIOL_NS) => true,
            Some(BQMODEL_NS) => false,
            _ => return None,
        };

        Some(match (biological, node.local_name()) {
            (true, "is") => Qualifier::Is,
            (true, "hasPart") => Qualifier::HasPart,
            (true, "hasTaxon") => Qualifier::HasTaxon,
            (true, "isEncodedBy") => Qualifier::IsEncodedBy,
            (true, "occursIn") => Qualifier::OccursIn,
            (true, "isVersionOf") => Qualifier::IsVersionOf,
            (true, "isDescribedBy") => Qualifier::IsDescribedBy,
            (false, "is") => Qualifier::ModelIs,
            (false, "isDescribedBy") => Qualifier::ModelIsDescribedBy,
            _ => return None,
        })
    }
}

/// A controlled-vocabulary term: one qualifier and the resources it points to.
#[derive(Debug, Clone, PartialEq)]
pub struct CvTerm {
    pub qualifier: Qualifier,
    pub resources: Vec<String>,
}

impl CvTerm {
    pub fn new(qualifier: Qualifier, resources: Vec<String>) -> Self {
        Self {
            qualifier,
            resources,
        }
    }
}

/// A person credited in the model history or the archive description.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Creator {
    pub family: String,
    pub given: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization: Option<String>,
}

impl Creator {
    pub(crate) fn to_vcard(&self) -> XmlNode {
        XmlNode::new("rdf:li")
            .attr("rdf:parseType", "Resource")
            .child(
                XmlNode::new("vCard4:hasName")
                    .attr("rdf:parseType", "Resource")
                    .child(XmlNode::new("vCard4:family-name").text(&self.family))
                    .child(XmlNode::new("vCard4:given-name").text(&self.given)),
            )
            .children_from(
                self.email
                    .iter()
                    .map(|email| XmlNode::new("vCard4:hasEmail").text(email)),
            )
            .children_from(self.organization.iter().map(|org| {
                XmlNode::new("vCard4:organization-name").text(org)
            }))
    }

    pub(crate) fn from_vcard(node: &XmlNode) -> Option<Self> {
        let name = node.find("hasName");
        let text_of = |parent: Option<&XmlNode>, local: &str| {
            parent
                .and_then(|p| p.find(local))
                .and_then(|n| n.text.clone())
        };

        let family = text_of(name, "family-name")?;
        Some(Self {
            family,
            given: text_of(name, "given-name").unwrap_or_default(),
            email: text_of(Some(node), "hasEmail"),
            organization: text_of(Some(node), "organization-name"),
        })
    }
}

/// Creators and timestamps of a model.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelHistory {
    pub creators: Vec<Creator>,
    pub created: Option<DateTime<Utc>>,
    pub modified: Option<DateTime<Utc>>,
}

/// Formats a timestamp as W3C date-time with second precision.
pub fn w3c_date(date: &DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Secs, true)
}

pub fn parse_w3c_date(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value.trim())
        .ok()
        .map(|d| d.with_timezone(&Utc))
}

/// Combined content of an element's `<annotation>`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Annotation {
    pub cv_terms: Vec<CvTerm>,
    pub history: Option<ModelHistory>,
    /// Top-level annotation elements other than the RDF block, in document order
    pub fragments: Vec<XmlNode>,
}

/// A single metadata change: cross-references to add and an optional fragment that
/// replaces any previous fragment with the same tag and namespace.
#[derive(Debug, Clone, Default)]
pub struct MetadataUpdate {
    pub cv_terms: Vec<CvTerm>,
    pub fragment: Option<XmlNode>,
}

impl Annotation {
    pub fn is_empty(&self) -> bool {
        self.cv_terms.is_empty() && self.history.is_none() && self.fragments.is_empty()
    }

    /// Applies cross-references and fragment in one step.
    pub fn update(&mut self, update: MetadataUpdate) {
        for term in update.cv_terms {
            self.add_cv_term(term);
        }
        if let Some(fragment) = update.fragment {
            self.replace_fragment(fragment);
        }
    }

    /// Merges resources into an existing term with the same qualifier.
    pub fn add_cv_term(&mut self, term: CvTerm) {
        match self
            .cv_terms
            .iter_mut()
            .find(|t| t.qualifier == term.qualifier)
        {
            Some(existing) => {
                for resource in term.resources {
                    if !existing.resources.contains(&resource) {
                        existing.resources.push(resource);
                    }
                }
            }
            None => self.cv_terms.push(term),
        }
    }

    /// Removes every top-level fragment with the same local name and namespace, then
    /// appends the new one.
    pub fn replace_fragment(&mut self, fragment: XmlNode) {
        self.remove_fragment(fragment.local_name(), fragment.namespace.as_deref());
        self.fragments.push(fragment);
    }

    /// Removes top-level fragments by local name, optionally restricted to a namespace.
    pub fn remove_fragment(&mut self, tag: &str, namespace: Option<&str>) -> bool {
        let before = self.fragments.len();
        self.fragments.retain(|f| {
            let same_ns = namespace.is_none() || f.namespace.as_deref() == namespace;
            !(f.local_name() == tag && same_ns)
        });
        before != self.fragments.len()
    }

    /// First fragment belonging to `namespace`.
    pub fn fragment_in(&self, namespace: &str) -> Option<&XmlNode> {
        self.fragments
            .iter()
            .find(|f| f.namespace.as_deref() == Some(namespace))
    }

    pub fn resources(&self, qualifier: Qualifier) -> Vec<String> {
        self.cv_terms
            .iter()
            .filter(|t| t.qualifier == qualifier)
            .flat_map(|t| t.resources.iter().cloned())
            .collect()
    }

    /// Builds the `<annotation>` element. The RDF block needs the element's meta id
    /// and is skipped without one.
    pub fn to_xml(&self, meta_id: Option<&str>) -> Option<XmlNode> {
        if self.is_empty() {
            return None;
        }

        let mut annotation = XmlNode::new("annotation");
        if let Some(meta_id) = meta_id {
            if let Some(rdf) = self.rdf_block(meta_id) {
                annotation.children.push(rdf);
            }
        } else if !self.cv_terms.is_empty() || self.history.is_some() {
            log::warn!("Dropping cross-references of an element without meta id");
        }
        annotation.children.extend(self.fragments.iter().cloned());

        if annotation.children.is_empty() {
            None
        } else {
            Some(annotation)
        }
    }

    fn rdf_block(&self, meta_id: &str) -> Option<XmlNode> {
        if self.cv_terms.is_empty() && self.history.is_none() {
            return None;
        }

        let mut description =
            XmlNode::new("rdf:Description").attr("rdf:about", format!("#{meta_id}"));

        if let Some(history) = &self.history {
            if !history.creators.is_empty() {
                let mut bag = XmlNode::new("rdf:Bag");
                bag.children
                    .extend(history.creators.iter().map(Creator::to_vcard));
                description
                    .children
                    .push(XmlNode::new("dcterms:creator").child(bag));
            }
            for (tag, date) in [
                ("dcterms:created", history.created),
                ("dcterms:modified", history.modified),
            ] {
                if let Some(date) = date {
                    description.children.push(
                        XmlNode::new(tag)
                            .attr("rdf:parseType", "Resource")
                            .child(XmlNode::new("dcterms:W3CDTF").text(w3c_date(&date))),
                    );
                }
            }
        }

        for term in &self.cv_terms {
            let mut bag = XmlNode::new("rdf:Bag");
            for resource in &term.resources {
                bag.children
                    .push(XmlNode::new("rdf:li").attr("rdf:resource", resource));
            }
            description
                .children
                .push(XmlNode::new(term.qualifier.tag()).child(bag));
        }

        Some(
            XmlNode::new("rdf:RDF")
                .attr("xmlns:rdf", RDF_NS)
                .attr("xmlns:dcterms", DCTERMS_NS)
                .attr("xmlns:vCard4", VCARD4_NS)
                .attr("xmlns:bqbiol", BQBIOL_NS)
                .attr("xmlns:bqmodel", BQMODEL_NS)
                .child(description),
        )
    }

    /// Splits a parsed `<annotation>` element into cross-references, history and fragments.
    pub fn from_xml(node: &XmlNode) -> Self {
        let mut annotation = Annotation::default();

        for child in &node.children {
            if child.local_name() == "RDF" && child.namespace.as_deref() == Some(RDF_NS) {
                annotation.read_rdf(child);
            } else {
                annotation.fragments.push(child.clone());
            }
        }

        annotation
    }

    fn read_rdf(&mut self, rdf: &XmlNode) {
        for description in rdf.find_all("Description") {
            for entry in &description.children {
                if let Some(qualifier) = Qualifier::from_node(entry) {
                    let resources = entry
                        .find("Bag")
                        .map(|bag| {
                            bag.find_all("li")
                                .filter_map(|li| li.get_attr("rdf:resource"))
                                .map(str::to_string)
                                .collect()
                        })
                        .unwrap_or_default();
                    self.add_cv_term(CvTerm::new(qualifier, resources));
                    continue;
                }

                if entry.namespace.as_deref() != Some(DCTERMS_NS) {
                    continue;
                }

                let history = self.history.get_or_insert_with(ModelHistory::default);
                match entry.local_name() {
                    "creator" => {
                        if let Some(bag) = entry.find("Bag") {
                            history
                                .creators
                                .extend(bag.find_all("li").filter_map(Creator::from_vcard));
                        }
                    }
                    "created" => {
                        history.created = entry
                            .find("W3CDTF")
                            .and_then(|d| d.text.as_deref())
                            .and_then(parse_w3c_date);
                    }
                    "modified" => {
                        history.modified = entry
                            .find("W3CDTF")
                            .and_then(|d| d.text.as_deref())
                            .and_then(parse_w3c_date);
                    }
                    _ => {}
                }
            }
        }
    }
}

impl XmlNode {
    pub(crate) fn children_from(mut self, children: impl Iterator<Item = XmlNode>) -> Self {
        self.children.extend(children);
        self
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::sbml::annotations::ENZYMEML_NS;

    fn fragment(tag: &str, text: &str) -> XmlNode {
        XmlNode::parse(&format!(
            r#"<{tag} xmlns="{ENZYMEML_NS}"><sequence>{text}</sequence></{tag}>"#
        ))
        .expect("Failed to parse fragment")
    }

    #[test]
    fn test_update_keeps_cross_references_and_fragment_together() {
        // ARRANGE
        let mut annotation = Annotation::default();
        annotation.update(MetadataUpdate {
            cv_terms: vec![CvTerm::new(
                Qualifier::Is,
                vec!["https://identifiers.org/uniprot:P07327".into()],
            )],
            fragment: Some(fragment("protein", "MSTAGK")),
        });

        // ACT
        annotation.update(MetadataUpdate {
            cv_terms: vec![CvTerm::new(
                Qualifier::HasTaxon,
                vec!["https://identifiers.org/taxonomy:9606".into()],
            )],
            fragment: Some(fragment("protein", "MSTAGKVIK")),
        });

        // ASSERT
        assert_eq!(annotation.cv_terms.len(), 2);
        assert_eq!(annotation.fragments.len(), 1);
        assert_eq!(
            annotation.fragments[0]
                .find("sequence")
                .and_then(|s| s.text.as_deref()),
            Some("MSTAGKVIK")
        );
    }

    #[test]
    fn test_rdf_round_trip() {
        let created = Utc.with_ymd_and_hms(2021, 3, 4, 10, 20, 30).unwrap();
        let mut annotation = Annotation {
            history: Some(ModelHistory {
                creators: vec![Creator {
                    family: "Doe".into(),
                    given: "Jane".into(),
                    email: Some("jane@example.org".into()),
                    organization: None,
                }],
                created: Some(created),
                modified: Some(created),
            }),
            ..Default::default()
        };
        annotation.add_cv_term(CvTerm::new(
            Qualifier::IsVersionOf,
            vec!["https://identifiers.org/ec-code:1.1.1.1".into()],
        ));
        annotation.replace_fragment(fragment("protein", "MSTAGK"));

        let xml = annotation
            .to_xml(Some("META_MODEL"))
            .expect("Annotation should not be empty")
            .to_xml_string()
            .expect("Failed to write annotation");
        let parsed = Annotation::from_xml(&XmlNode::parse(&xml).expect("Failed to parse"));

        assert_eq!(parsed, annotation);
    }

    #[test]
    fn test_cross_references_merge_by_qualifier() {
        let mut annotation = Annotation::default();
        annotation.add_cv_term(CvTerm::new(Qualifier::Is, vec!["a".into()]));
        annotation.add_cv_term(CvTerm::new(Qualifier::Is, vec!["a".into(), "b".into()]));

        assert_eq!(annotation.resources(Qualifier::Is), vec!["a", "b"]);
    }
}
