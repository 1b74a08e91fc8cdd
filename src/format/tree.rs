//! Generic element tree and its XML text form
//!
//! [`TreeNode`] holds attribute values and text unescaped. Writing and reading
//! go through [`escape`](super::escape) so control characters survive; the XML
//! library only ever sees pre-escaped bytes.

use std::borrow::Cow;
use std::io::{BufRead, Write};

use quick_xml::events::attributes::Attribute as XmlAttribute;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::name::QName;
use quick_xml::{Reader, Writer};

use crate::core::{DecodeError, Error, Result};
use crate::format::escape::{escape, escape_attribute, unescape};

/// Child of a [`TreeNode`]
#[derive(Clone, Debug, PartialEq)]
pub enum TreeChild {
    /// Structured element
    Element(TreeNode),
    /// Pre-rendered XML, written to the output unchanged
    Fragment(String),
}

/// One element of a memento tree
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TreeNode {
    /// Element name
    pub name: String,
    /// Attributes in document order, unescaped
    pub attributes: Vec<(String, String)>,
    /// Child elements and fragments
    pub children: Vec<TreeChild>,
    /// Text content of a leaf element, unescaped
    pub text: Option<String>,
}

impl TreeNode {
    /// Create an element with no attributes or content
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), ..Default::default() }
    }

    /// Builder-style attribute
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attribute(key, value);
        self
    }

    /// Append an attribute
    pub fn set_attribute(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.attributes.push((key.into(), value.into()));
    }

    /// Look up an attribute
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Look up an attribute that must be present
    pub fn require(&self, key: &'static str) -> std::result::Result<&str, DecodeError> {
        self.attribute(key).ok_or_else(|| DecodeError::MissingField {
            element: self.name.clone(),
            field: key,
        })
    }

    /// Append a child element
    pub fn push(&mut self, child: TreeNode) {
        self.children.push(TreeChild::Element(child));
    }

    /// Append a pre-rendered fragment
    pub fn push_fragment(&mut self, xml: String) {
        self.children.push(TreeChild::Fragment(xml));
    }

    /// Child elements, skipping fragments
    pub fn elements(&self) -> impl Iterator<Item = &TreeNode> + '_ {
        self.children.iter().filter_map(|c| match c {
            TreeChild::Element(node) => Some(node),
            TreeChild::Fragment(_) => None,
        })
    }

    /// Render this element alone, without an XML declaration
    pub fn render(&self) -> Result<String> {
        let mut writer = Writer::new(Vec::new());
        write_node(&mut writer, self)?;
        String::from_utf8(writer.into_inner())
            .map_err(|_| Error::invalid_input("rendered memento is not valid UTF-8"))
    }
}

/// Write a whole document: declaration then the root element.
pub fn write_document<W: Write>(sink: W, root: &TreeNode) -> Result<()> {
    let mut writer = Writer::new(sink);
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    write_node(&mut writer, root)?;
    writer.into_inner().flush()?;
    Ok(())
}

fn write_node<W: Write>(writer: &mut Writer<W>, node: &TreeNode) -> Result<()> {
    let mut start = BytesStart::new(node.name.as_str());
    for (key, value) in &node.attributes {
        start.push_attribute(XmlAttribute {
            key: QName(key.as_bytes()),
            value: Cow::Owned(escape_attribute(value).into_bytes()),
        });
    }

    if node.children.is_empty() && node.text.as_deref().map_or(true, str::is_empty) {
        writer.write_event(Event::Empty(start))?;
        return Ok(());
    }

    writer.write_event(Event::Start(start))?;
    if let Some(text) = &node.text {
        writer.write_event(Event::Text(BytesText::from_escaped(escape(text))))?;
    }
    for child in &node.children {
        match child {
            TreeChild::Element(element) => write_node(writer, element)?,
            TreeChild::Fragment(xml) => writer.get_mut().write_all(xml.as_bytes())?,
        }
    }
    writer.write_event(Event::End(BytesEnd::new(node.name.as_str())))?;
    Ok(())
}

/// Parse a document and return its root element.
pub fn read_document<R: BufRead>(source: R) -> Result<TreeNode> {
    let mut reader = Reader::from_reader(source);
    let mut buf = Vec::new();
    let mut stack: Vec<TreeNode> = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => stack.push(open_element(&e)?),
            Event::Empty(e) => {
                let node = open_element(&e)?;
                match stack.last_mut() {
                    Some(parent) => parent.push(node),
                    None => return Ok(node),
                }
            }
            Event::End(_) => {
                let mut node = stack
                    .pop()
                    .ok_or_else(|| Error::invalid_input("unbalanced end tag"))?;
                close_element(&mut node);
                match stack.last_mut() {
                    Some(parent) => parent.push(node),
                    None => return Ok(node),
                }
            }
            Event::Text(t) => {
                if let Some(top) = stack.last_mut() {
                    let raw = std::str::from_utf8(&t)
                        .map_err(|_| Error::invalid_input("memento is not valid UTF-8"))?;
                    top.text.get_or_insert_with(String::new).push_str(raw);
                }
            }
            Event::CData(c) => {
                if let Some(top) = stack.last_mut() {
                    let raw = std::str::from_utf8(&c)
                        .map_err(|_| Error::invalid_input("memento is not valid UTF-8"))?;
                    top.text.get_or_insert_with(String::new).push_str(&escape(raw));
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    if stack.is_empty() {
        Err(Error::invalid_input("memento contains no elements"))
    } else {
        Err(Error::invalid_input("memento ends inside an open element"))
    }
}

fn open_element(e: &BytesStart<'_>) -> Result<TreeNode> {
    let name = std::str::from_utf8(e.name().as_ref())
        .map_err(|_| Error::invalid_input("element name is not valid UTF-8"))?
        .to_string();
    let mut node = TreeNode::new(name);
    for attribute in e.attributes() {
        let attribute = attribute.map_err(quick_xml::Error::from)?;
        let key = std::str::from_utf8(attribute.key.as_ref())
            .map_err(|_| Error::invalid_input("attribute name is not valid UTF-8"))?;
        let value = std::str::from_utf8(&attribute.value)
            .map_err(|_| Error::invalid_input("attribute value is not valid UTF-8"))?;
        node.set_attribute(key, unescape(value));
    }
    Ok(node)
}

/// Leaf elements keep their text; whitespace between child elements is layout.
fn close_element(node: &mut TreeNode) {
    if !node.children.is_empty() {
        node.text = None;
    } else if let Some(text) = node.text.take() {
        node.text = Some(unescape(&text));
    }
}
