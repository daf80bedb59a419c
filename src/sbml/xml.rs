//! Minimal namespace-aware element tree used as the backing store for SBML markup.
//!
//! The tree keeps qualified element names exactly as written, resolves each element's
//! namespace at parse time and serializes deterministically, so that encoding the same
//! tree twice always produces byte-identical output.

use std::collections::HashMap;

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

use super::error::SBMLError;

/// A single XML element with its attributes, text content and child elements.
///
/// Mixed content is kept in document order: `text` holds the text before the first
/// child and each child's `tail` holds the text that follows it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct XmlNode {
    /// Qualified name, including the prefix if one was used (e.g. `rdf:li`)
    pub name: String,
    /// Namespace URI the element belongs to, if it could be resolved
    pub namespace: Option<String>,
    /// Attributes in document order, including namespace declarations
    pub attributes: Vec<(String, String)>,
    pub children: Vec<XmlNode>,
    pub text: Option<String>,
    /// Text between the end of this element and the next sibling
    pub tail: Option<String>,
}

impl XmlNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Creates an element that declares `namespace` as its default namespace.
    pub fn with_namespace(name: impl Into<String>, namespace: &str) -> Self {
        let mut node = Self::new(name);
        node.namespace = Some(namespace.to_string());
        node.attributes
            .push(("xmlns".to_string(), namespace.to_string()));
        node
    }

    pub fn attr(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.set_attr(key, value);
        self
    }

    /// Adds the attribute only if a value is present.
    pub fn opt_attr<T: ToString>(mut self, key: impl Into<String>, value: Option<T>) -> Self {
        if let Some(value) = value {
            self.set_attr(key, value);
        }
        self
    }

    pub fn child(mut self, child: XmlNode) -> Self {
        self.children.push(child);
        self
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn tail(mut self, tail: impl Into<String>) -> Self {
        self.tail = Some(tail.into());
        self
    }

    pub fn set_attr(&mut self, key: impl Into<String>, value: impl ToString) {
        let key = key.into();
        let value = value.to_string();
        match self.attributes.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.attributes.push((key, value)),
        }
    }

    /// Local part of the qualified name.
    pub fn local_name(&self) -> &str {
        local_part(&self.name)
    }

    /// Looks up an attribute by qualified name, falling back to its local part.
    pub fn get_attr(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .or_else(|| {
                self.attributes
                    .iter()
                    .find(|(k, _)| !k.starts_with("xmlns") && local_part(k) == key)
            })
            .map(|(_, v)| v.as_str())
    }

    /// Returns the attribute or a [`SBMLError::MissingAttribute`].
    pub fn require_attr(&self, key: &str) -> Result<&str, SBMLError> {
        self.get_attr(key)
            .ok_or_else(|| SBMLError::MissingAttribute {
                element: self.name.clone(),
                attribute: key.to_string(),
            })
    }

    pub fn get_f64(&self, key: &str) -> Result<Option<f64>, SBMLError> {
        self.get_attr(key)
            .map(|value| parse_number(key, value))
            .transpose()
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get_attr(key)
            .map(|value| matches!(value.trim(), "true" | "1" | "True"))
    }

    /// First child element with the given local name.
    pub fn find(&self, local: &str) -> Option<&XmlNode> {
        self.children.iter().find(|c| c.local_name() == local)
    }

    /// All child elements with the given local name.
    pub fn find_all<'a>(&'a self, local: &'a str) -> impl Iterator<Item = &'a XmlNode> + 'a {
        self.children.iter().filter(move |c| c.local_name() == local)
    }

    /// Descends through a path of local names, e.g. `["listOfSpecies", "species"]`.
    pub fn find_path(&self, path: &[&str]) -> Option<&XmlNode> {
        path.iter().try_fold(self, |node, local| node.find(local))
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty() && self.text.is_none()
    }

    /// Parses a document (or fragment with a single root) into a tree.
    pub fn parse(xml: &str) -> Result<XmlNode, SBMLError> {
        let mut reader = Reader::from_str(xml);
        let mut stack: Vec<(XmlNode, Scope, String)> = Vec::new();
        let mut root: Option<XmlNode> = None;
        let root_scope = Scope::default();

        loop {
            match reader.read_event()? {
                Event::Start(e) => {
                    let scope = stack.last().map(|(_, s, _)| s).unwrap_or(&root_scope);
                    let (node, scope) = open_element(&e, scope)?;
                    stack.push((node, scope, String::new()));
                }
                Event::Empty(e) => {
                    let scope = stack.last().map(|(_, s, _)| s).unwrap_or(&root_scope);
                    let (node, _) = open_element(&e, scope)?;
                    attach(&mut stack, &mut root, node);
                }
                Event::End(_) => {
                    if let Some((mut node, _, text)) = stack.pop() {
                        if node.children.is_empty() {
                            let trimmed = text.trim();
                            if !trimmed.is_empty() {
                                node.text = Some(trimmed.to_string());
                            }
                        } else {
                            flush_mixed(&mut node, text);
                        }
                        attach(&mut stack, &mut root, node);
                    }
                }
                Event::Text(t) => {
                    if let Some((_, _, text)) = stack.last_mut() {
                        text.push_str(&t.unescape()?);
                    }
                }
                Event::CData(c) => {
                    if let Some((_, _, text)) = stack.last_mut() {
                        let raw = c.into_inner();
                        text.push_str(std::str::from_utf8(&raw)?);
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }

        root.ok_or(SBMLError::EmptyDocument)
    }

    /// Serializes the tree as an indented document with an XML declaration.
    pub fn to_document_string(&self) -> Result<String, SBMLError> {
        let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
        self.write_to(&mut writer, false)?;
        let mut out = String::from_utf8(writer.into_inner())?;
        out.push('\n');
        Ok(out)
    }

    /// Serializes the tree as a compact fragment.
    pub fn to_xml_string(&self) -> Result<String, SBMLError> {
        let mut writer = Writer::new(Vec::new());
        self.write_to(&mut writer, false)?;
        Ok(String::from_utf8(writer.into_inner())?)
    }

    /// Serializes the tree with local names only and without namespace declarations.
    ///
    /// Used to hand fragments to the serde deserializer, which matches on plain tag names.
    pub fn to_local_string(&self) -> Result<String, SBMLError> {
        let mut writer = Writer::new(Vec::new());
        self.write_to(&mut writer, true)?;
        Ok(String::from_utf8(writer.into_inner())?)
    }

    fn write_to<W: std::io::Write>(
        &self,
        writer: &mut Writer<W>,
        local_only: bool,
    ) -> Result<(), SBMLError> {
        let name = if local_only {
            self.local_name()
        } else {
            self.name.as_str()
        };

        let mut start = BytesStart::new(name);
        for (key, value) in &self.attributes {
            if local_only && (key == "xmlns" || key.starts_with("xmlns:")) {
                continue;
            }
            let key = if local_only { local_part(key) } else { key };
            start.push_attribute((key, value.as_str()));
        }

        if self.is_empty() {
            writer.write_event(Event::Empty(start))?;
            return Ok(());
        }

        writer.write_event(Event::Start(start))?;
        if let Some(text) = &self.text {
            writer.write_event(Event::Text(BytesText::new(text)))?;
        }
        for child in &self.children {
            child.write_to(writer, local_only)?;
            if let Some(tail) = &child.tail {
                writer.write_event(Event::Text(BytesText::new(tail)))?;
            }
        }
        writer.write_event(Event::End(BytesEnd::new(name)))?;

        Ok(())
    }
}

/// Namespace prefix bindings in effect for an element; `""` is the default namespace.
type Scope = HashMap<String, String>;

fn open_element(e: &BytesStart, parent: &Scope) -> Result<(XmlNode, Scope), SBMLError> {
    let name = std::str::from_utf8(e.name().as_ref())?.to_string();
    let mut node = XmlNode::new(name);
    let mut scope = parent.clone();

    for attr in e.attributes() {
        let attr = attr?;
        let key = std::str::from_utf8(attr.key.as_ref())?.to_string();
        let value = attr.unescape_value()?.into_owned();

        if key == "xmlns" {
            scope.insert(String::new(), value.clone());
        } else if let Some(prefix) = key.strip_prefix("xmlns:") {
            scope.insert(prefix.to_string(), value.clone());
        }
        node.attributes.push((key, value));
    }

    let prefix = match node.name.split_once(':') {
        Some((prefix, _)) => prefix,
        None => "",
    };
    node.namespace = scope.get(prefix).cloned();

    Ok((node, scope))
}

fn attach(stack: &mut [(XmlNode, Scope, String)], root: &mut Option<XmlNode>, node: XmlNode) {
    match stack.last_mut() {
        Some((parent, _, pending)) => {
            flush_mixed(parent, std::mem::take(pending));
            parent.children.push(node);
        }
        None => {
            if root.is_none() {
                *root = Some(node);
            }
        }
    }
}

/// Stores a text run seen inside `node` before its next child or its end tag.
///
/// Runs of whitespace only are indentation and dropped; other runs are kept verbatim.
fn flush_mixed(node: &mut XmlNode, text: String) {
    if text.trim().is_empty() {
        return;
    }
    let slot = match node.children.last_mut() {
        Some(last) => &mut last.tail,
        None => &mut node.text,
    };
    slot.get_or_insert_with(String::new).push_str(&text);
}

fn local_part(name: &str) -> &str {
    match name.split_once(':') {
        Some((_, local)) => local,
        None => name,
    }
}

pub(crate) fn parse_number(key: &str, value: &str) -> Result<f64, SBMLError> {
    value
        .trim()
        .parse::<f64>()
        .map_err(|_| SBMLError::InvalidNumber {
            attribute: key.to_string(),
            value: value.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_parse_resolves_namespaces() {
        let xml = r#"<annotation>
            <enzymeml:species xmlns:enzymeml="http://sbml.org/enzymeml/version1">
                <enzymeml:smiles>CCO</enzymeml:smiles>
            </enzymeml:species>
            <other xmlns="http://example.org/other"/>
        </annotation>"#;

        let node = XmlNode::parse(xml).expect("Failed to parse XML");
        assert_eq!(node.children.len(), 2);

        let species = &node.children[0];
        assert_eq!(species.local_name(), "species");
        assert_eq!(
            species.namespace.as_deref(),
            Some("http://sbml.org/enzymeml/version1")
        );
        assert_eq!(
            species.find("smiles").and_then(|n| n.text.as_deref()),
            Some("CCO")
        );
        assert_eq!(
            node.children[1].namespace.as_deref(),
            Some("http://example.org/other")
        );
        assert_eq!(node.namespace, None);
    }

    #[test]
    fn test_escaped_content_survives() {
        let node = XmlNode::new("p")
            .attr("title", "a < b & \"c\"")
            .text("x & y");
        let xml = node.to_xml_string().expect("Failed to write XML");
        let parsed = XmlNode::parse(&xml).expect("Failed to parse XML");

        assert_eq!(parsed.get_attr("title"), Some("a < b & \"c\""));
        assert_eq!(parsed.text.as_deref(), Some("x & y"));
    }

    #[test]
    fn test_local_string_strips_prefixes() {
        let xml = r#"<e:data xmlns:e="urn:x" e:id="a"><e:item/></e:data>"#;
        let node = XmlNode::parse(xml).expect("Failed to parse XML");
        let local = node.to_local_string().expect("Failed to write XML");
        assert_eq!(local, r#"<data id="a"><item/></data>"#);
    }

    #[test]
    fn test_mixed_content_keeps_order() {
        let xml = "<p>a <b>x</b> c</p>";

        let node = XmlNode::parse(xml).expect("Failed to parse XML");
        assert_eq!(node.text.as_deref(), Some("a "));
        assert_eq!(node.children[0].text.as_deref(), Some("x"));
        assert_eq!(node.children[0].tail.as_deref(), Some(" c"));

        let written = node.to_xml_string().expect("Failed to write XML");
        assert_eq!(written, xml);
    }

    #[test]
    fn test_mixed_content_in_indented_document() {
        let xml = r#"<body xmlns="http://www.w3.org/1999/xhtml">
            <p>Measured at <i>30</i> degrees, see <a href="x">here</a>.</p>
        </body>"#;

        let node = XmlNode::parse(xml).expect("Failed to parse XML");
        let p = &node.children[0];
        assert_eq!(node.text, None);
        assert_eq!(p.tail, None);
        assert_eq!(p.text.as_deref(), Some("Measured at "));
        assert_eq!(p.children[0].tail.as_deref(), Some(" degrees, see "));
        assert_eq!(p.children[1].tail.as_deref(), Some("."));

        let written = node.to_xml_string().expect("Failed to write XML");
        assert_eq!(
            XmlNode::parse(&written).expect("Failed to parse XML"),
            node
        );
    }

    #[test]
    fn test_empty_input_is_an_error() {
        assert!(matches!(
            XmlNode::parse("   "),
            Err(SBMLError::EmptyDocument)
        ));
    }
}
