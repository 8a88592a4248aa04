//! Generic node handles returned by queries, and live attribute views.

use std::fmt;

use crate::document::Document;
use crate::element::Element;
use crate::error::Result;
use crate::tree::{NodeInfo, NodeKind};

/// Any node of a document: element, text, comment, attribute and so on.
#[derive(Clone, Copy)]
pub struct Node<'d> {
    doc: &'d Document,
    node: xot::Node,
}

impl<'d> Node<'d> {
    pub(crate) fn new(doc: &'d Document, node: xot::Node) -> Self {
        Self { doc, node }
    }

    pub fn kind(&self) -> NodeKind {
        self.doc.tree().kind(self.node)
    }

    /// Local name of element and attribute nodes.
    pub fn name(&self) -> Option<String> {
        self.doc.tree().node_name(self.node)
    }

    /// XPath string value of the node.
    pub fn value(&self) -> String {
        self.doc.tree().string_value(self.node)
    }

    /// The node as an [`Element`], if it is one.
    pub fn as_element(&self) -> Option<Element<'d>> {
        self.doc
            .tree()
            .is_element(self.node)
            .then(|| Element::new(self.doc, self.node))
    }

    /// `true` for text created as a CDATA section.
    pub fn is_cdata(&self) -> bool {
        self.doc.tree().is_cdata(self.node)
    }

    pub fn to_xml(&self) -> Result<String> {
        self.doc.tree().serialize(self.node)
    }

    /// Owned snapshot of the node.
    pub fn info(&self) -> NodeInfo {
        self.doc.tree().info(self.node)
    }
}

impl PartialEq for Node<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.doc, other.doc) && self.node == other.node
    }
}

impl Eq for Node<'_> {}

impl fmt::Debug for Node<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("kind", &self.kind())
            .field("name", &self.name())
            .finish()
    }
}

/// Named attribute of an element. Reads and writes go straight to the
/// element, so the view always reflects the current value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Attribute<'d> {
    element: Element<'d>,
    name: String,
}

impl<'d> Attribute<'d> {
    pub(crate) fn new(element: Element<'d>, name: &str) -> Self {
        Self {
            element,
            name: name.to_string(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current value; empty if the attribute has since been removed.
    pub fn value(&self) -> String {
        self.element.attribute(&self.name).unwrap_or_default()
    }

    pub fn set_value(&self, value: &str) -> Result<()> {
        self.element.set_attribute(&self.name, value)?;
        Ok(())
    }

    /// Element carrying the attribute.
    pub fn element(&self) -> Element<'d> {
        self.element
    }
}
