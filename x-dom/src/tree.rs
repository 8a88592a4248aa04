//! xot tree backing a document
//!
//! The tree lives inside an `xee_xpath::Documents` arena so that query
//! results are the same `xot::Node` handles the wrappers mutate.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use xee_xpath::{DocumentHandle, Documents, Queries, Query};
use xot::output::{NoopNormalizer, Output, TokenSerializeParameters};
use xot::{NameId, Node, Xot};

use crate::error::{Error, Result};
use crate::options::ParseOptions;
use crate::path;

/// Element wrapping fragments while they are parsed
const FRAGMENT_ROOT: &str = "x-dom-fragment";

/// Type of XML node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    /// Document node
    Document,
    /// Element node
    Element,
    /// Attribute node
    Attribute,
    /// Text node (CDATA sections included)
    Text,
    /// Comment node
    Comment,
    /// Processing instruction node
    ProcessingInstruction,
    /// Namespace node
    Namespace,
}

/// Snapshot of a node, detached from its document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeInfo {
    pub kind: NodeKind,
    pub name: Option<String>,
    pub value: String,
    pub path: Option<String>,
}

pub(crate) struct Tree {
    documents: Documents,
    handle: Option<DocumentHandle>,
    /// Text nodes created as CDATA sections
    cdata: HashSet<Node>,
}

impl Tree {
    pub(crate) fn empty() -> Self {
        Self {
            documents: Documents::new(),
            handle: None,
            cdata: HashSet::new(),
        }
    }

    pub(crate) fn parse(xml: &str, options: &ParseOptions) -> Result<Self> {
        let mut documents = Documents::new();
        let handle = documents
            .add_string_without_uri(xml)
            .map_err(|e| Error::parse(format!("{:?}", e)))?;
        let mut tree = Self {
            documents,
            handle: Some(handle),
            cdata: HashSet::new(),
        };
        if options.strip_blank_text {
            if let Some(doc) = tree.document_node() {
                tree.strip_blank_text(doc)?;
            }
        }
        Ok(tree)
    }

    /// Build a tree whose root element is a deep copy of `node` in `source`.
    pub(crate) fn adopt(source: &Tree, node: Node) -> Result<Self> {
        let xml = source.xot().to_string(node)?;
        let mut tree = Self::parse(&xml, &ParseOptions::default())?;
        if let Some(root) = tree.root() {
            tree.carry_cdata(source, node, root);
        }
        Ok(tree)
    }

    pub(crate) fn xot(&self) -> &Xot {
        self.documents.xot()
    }

    pub(crate) fn xot_mut(&mut self) -> &mut Xot {
        self.documents.xot_mut()
    }

    pub(crate) fn document_node(&self) -> Option<Node> {
        self.handle
            .and_then(|handle| self.documents.document_node(handle))
    }

    pub(crate) fn root(&self) -> Option<Node> {
        let doc = self.document_node()?;
        self.xot().document_element(doc).ok()
    }

    pub(crate) fn kind(&self, node: Node) -> NodeKind {
        match self.xot().value_type(node) {
            xot::ValueType::Document => NodeKind::Document,
            xot::ValueType::Element => NodeKind::Element,
            xot::ValueType::Text => NodeKind::Text,
            xot::ValueType::Comment => NodeKind::Comment,
            xot::ValueType::ProcessingInstruction => NodeKind::ProcessingInstruction,
            xot::ValueType::Attribute => NodeKind::Attribute,
            xot::ValueType::Namespace => NodeKind::Namespace,
        }
    }

    pub(crate) fn is_element(&self, node: Node) -> bool {
        self.xot().element(node).is_some()
    }

    /// Name of an element or attribute node
    pub(crate) fn node_name(&self, node: Node) -> Option<String> {
        let xot = self.xot();
        xot.node_name(node)
            .map(|name| xot.local_name_str(name).to_string())
    }

    pub(crate) fn element_name(&self, node: Node) -> Option<&str> {
        let xot = self.xot();
        xot.element(node).map(|element| xot.local_name_str(element.name()))
    }

    pub(crate) fn string_value(&self, node: Node) -> String {
        self.xot().string_value(node)
    }

    pub(crate) fn parent(&self, node: Node) -> Option<Node> {
        self.xot().parent(node)
    }

    /// Parent element; the document node does not count.
    pub(crate) fn parent_element(&self, node: Node) -> Option<Node> {
        self.parent(node).filter(|parent| self.is_element(*parent))
    }

    pub(crate) fn children(&self, node: Node) -> Vec<Node> {
        self.xot().children(node).collect()
    }

    fn name_matches(&self, node: Node, name: Option<&str>) -> bool {
        match self.element_name(node) {
            Some(node_name) => name.map_or(true, |wanted| wanted == node_name),
            None => false,
        }
    }

    /// Element children, optionally restricted to one name, in document order.
    pub(crate) fn element_children(&self, node: Node, name: Option<&str>) -> Vec<Node> {
        self.xot()
            .children(node)
            .filter(|child| self.name_matches(*child, name))
            .collect()
    }

    /// Element siblings before (`preceding == true`) or after `node`, in
    /// document order. `None` when the node has no parent.
    pub(crate) fn element_siblings(
        &self,
        node: Node,
        name: Option<&str>,
        preceding: bool,
    ) -> Option<Vec<Node>> {
        let parent = self.parent(node)?;
        let mut before = Vec::new();
        let mut after = Vec::new();
        let mut seen = false;
        for child in self.xot().children(parent) {
            if child == node {
                seen = true;
            } else if self.name_matches(child, name) {
                if seen {
                    after.push(child);
                } else {
                    before.push(child);
                }
            }
        }
        Some(if preceding { before } else { after })
    }

    pub(crate) fn is_ancestor_or_self(&self, candidate: Node, node: Node) -> bool {
        let mut current = Some(node);
        while let Some(n) = current {
            if n == candidate {
                return true;
            }
            current = self.parent(n);
        }
        false
    }

    /// `true` when `node` hangs below this tree's document node.
    pub(crate) fn is_attached(&self, node: Node) -> bool {
        let Some(doc) = self.document_node() else {
            return false;
        };
        self.is_ancestor_or_self(doc, node)
    }

    /// Absolute `/name[n]/...` path of an element, recomputed from the
    /// current tree shape.
    pub(crate) fn path(&self, node: Node) -> String {
        let mut steps = Vec::new();
        let mut current = Some(node);
        while let Some(n) = current {
            let Some(name) = self.element_name(n) else {
                break;
            };
            let position = match self.parent(n) {
                Some(parent) => {
                    self.xot()
                        .children(parent)
                        .take_while(|child| *child != n)
                        .filter(|child| self.element_name(*child) == Some(name))
                        .count()
                        + 1
                }
                None => 1,
            };
            steps.push(path::step(name, position));
            current = self.parent(n);
        }
        steps.reverse();
        format!("/{}", steps.join("/"))
    }

    fn name_id(&mut self, name: &str) -> Result<NameId> {
        if !path::is_valid_name(name) {
            return Err(Error::invalid_argument(format!("`{name}` is not a valid XML name")));
        }
        Ok(self.xot_mut().add_name(name))
    }

    pub(crate) fn new_element(&mut self, name: &str) -> Result<Node> {
        let name = self.name_id(name)?;
        Ok(self.xot_mut().new_element(name))
    }

    pub(crate) fn attribute(&self, node: Node, name: &str) -> Option<String> {
        let xot = self.xot();
        let name = xot.name(name)?;
        xot.get_attribute(node, name).map(str::to_string)
    }

    pub(crate) fn attributes(&self, node: Node) -> Vec<(String, String)> {
        let xot = self.xot();
        xot.attributes(node)
            .iter()
            .map(|(name, value)| (xot.local_name_str(name).to_string(), value.clone()))
            .collect()
    }

    pub(crate) fn set_attribute(&mut self, node: Node, name: &str, value: &str) -> Result<()> {
        if !self.is_element(node) {
            return Err(Error::invalid_argument("attributes can only be set on elements"));
        }
        let name = self.name_id(name)?;
        self.xot_mut()
            .attributes_mut(node)
            .insert(name, value.to_string());
        Ok(())
    }

    /// Forget CDATA marks of nodes xot has removed. Adjacent text nodes are
    /// merged on every structural change, and removed slots get reused.
    fn prune_cdata(&mut self) {
        let xot = self.documents.xot();
        self.cdata.retain(|text| !xot.is_removed(*text));
    }

    pub(crate) fn append(&mut self, parent: Node, child: Node) -> Result<()> {
        self.xot_mut().append(parent, child)?;
        self.prune_cdata();
        Ok(())
    }

    pub(crate) fn detach(&mut self, node: Node) -> Result<()> {
        if self.parent(node).is_some() {
            self.xot_mut().detach(node)?;
            self.prune_cdata();
        }
        Ok(())
    }

    pub(crate) fn insert_before(&mut self, reference: Node, node: Node) -> Result<()> {
        self.xot_mut().insert_before(reference, node)?;
        self.prune_cdata();
        Ok(())
    }

    pub(crate) fn wrap(&mut self, node: Node, name: &str) -> Result<Node> {
        let name = self.name_id(name)?;
        let wrapper = self.xot_mut().element_wrap(node, name)?;
        self.prune_cdata();
        Ok(wrapper)
    }

    /// Append a CDATA section to `parent` and return the text node holding it.
    /// Adjacent text is consolidated by xot, so the returned node is the last
    /// child after appending.
    pub(crate) fn append_cdata(&mut self, parent: Node, value: &str) -> Result<Node> {
        let xot = self.xot_mut();
        let text = xot.new_text(value);
        xot.append(parent, text)?;
        let text = xot.last_child(parent).unwrap_or(text);
        self.cdata.insert(text);
        self.prune_cdata();
        Ok(text)
    }

    pub(crate) fn is_cdata(&self, node: Node) -> bool {
        self.cdata.contains(&node)
    }

    /// Parse `xml` as a sequence of sibling nodes owned by this tree but not
    /// yet attached anywhere.
    pub(crate) fn parse_fragment(&mut self, xml: &str) -> Result<Vec<Node>> {
        let wrapped = format!("<{FRAGMENT_ROOT}>{xml}</{FRAGMENT_ROOT}>");
        let xot = self.xot_mut();
        let doc = xot
            .parse(&wrapped)
            .map_err(|e| Error::parse(e.to_string()))?;
        let wrapper = xot.document_element(doc)?;
        let nodes: Vec<Node> = xot.children(wrapper).collect();
        for node in &nodes {
            xot.detach(*node)?;
        }
        xot.remove(doc)?;
        Ok(nodes)
    }

    /// Deep copy of a node that already belongs to this tree.
    pub(crate) fn copy_within(&mut self, node: Node) -> Node {
        let copy = self.xot_mut().clone_node(node);
        let marked: Vec<Node> = self
            .xot()
            .descendants(node)
            .zip(self.xot().descendants(copy))
            .filter(|(original, _)| self.cdata.contains(original))
            .map(|(_, copied)| copied)
            .collect();
        self.cdata.extend(marked);
        copy
    }

    /// Deep copy of a node owned by another tree.
    pub(crate) fn copy_from(&mut self, source: &Tree, node: Node) -> Result<Node> {
        let xml = source.xot().to_string(node)?;
        let mut nodes = self.parse_fragment(&xml)?;
        let copy = match (nodes.pop(), nodes.is_empty()) {
            (Some(copy), true) => copy,
            _ => {
                return Err(Error::Tree(
                    "copy of a single node produced several nodes".to_string(),
                ))
            }
        };
        self.carry_cdata(source, node, copy);
        Ok(copy)
    }

    /// Mark the copies of `source`'s CDATA sections. `copy` must have the
    /// same shape as `original`.
    fn carry_cdata(&mut self, source: &Tree, original: Node, copy: Node) {
        let marks: Vec<bool> = source
            .xot()
            .descendants(original)
            .map(|n| source.cdata.contains(&n))
            .collect();
        let marked: Vec<Node> = self
            .xot()
            .descendants(copy)
            .zip(marks)
            .filter_map(|(n, is_cdata)| is_cdata.then_some(n))
            .collect();
        self.cdata.extend(marked);
    }

    fn strip_blank_text(&mut self, node: Node) -> Result<()> {
        let xot = self.xot_mut();
        let blanks: Vec<Node> = xot
            .descendants(node)
            .filter(|n| xot.text_str(*n).is_some_and(|text| text.trim().is_empty()))
            .collect();
        for blank in blanks {
            xot.remove(blank)?;
        }
        self.prune_cdata();
        Ok(())
    }

    /// Run an XPath expression against the whole document.
    pub(crate) fn query(&mut self, expr: &str) -> Result<Vec<Node>> {
        let Some(handle) = self.handle else {
            return Ok(Vec::new());
        };
        let queries = Queries::default();
        let query = queries
            .sequence(expr)
            .map_err(|e| Error::xpath_compile(format!("{:?}", e)))?;
        let sequence = query
            .execute(&mut self.documents, handle)
            .map_err(|e| Error::xpath_eval(format!("{:?}", e)))?;

        let mut nodes = Vec::new();
        for item in sequence.iter() {
            let node = item.to_node().map_err(|_| {
                Error::TypeConversion(format!("`{expr}` produced an item that is not a node"))
            })?;
            nodes.push(node);
        }
        Ok(nodes)
    }

    /// Serialize a node. Text nodes created as CDATA sections through the
    /// wrappers are written as `<![CDATA[...]]>`; all other text is escaped.
    pub(crate) fn serialize(&self, node: Node) -> Result<String> {
        let xot = self.xot();
        if let Some(text) = xot.text_str(node) {
            return Ok(if self.cdata.contains(&node) {
                cdata_section(text)
            } else {
                escape_text(text)
            });
        }
        let holds_cdata = self
            .cdata
            .iter()
            .any(|text| self.is_ancestor_or_self(node, *text));
        if !holds_cdata {
            return xot.to_string(node).map_err(|e| Error::Serialize(e.to_string()));
        }

        let mut xml = String::new();
        let tokens = xot.tokens(node, TokenSerializeParameters::default(), NoopNormalizer);
        for (current, output, token) in tokens {
            match output {
                Output::Text(text) if self.cdata.contains(&current) => {
                    xml.push_str(&cdata_section(text));
                }
                _ => {
                    if token.space {
                        xml.push(' ');
                    }
                    xml.push_str(&token.text);
                }
            }
        }
        Ok(xml)
    }

    pub(crate) fn info(&self, node: Node) -> NodeInfo {
        NodeInfo {
            kind: self.kind(node),
            name: self.node_name(node),
            value: self.string_value(node),
            path: self.is_element(node).then(|| self.path(node)),
        }
    }
}

/// `<![CDATA[...]]>` section for `text`; an embedded `]]>` is split across
/// two sections.
fn cdata_section(text: &str) -> String {
    format!("<![CDATA[{}]]>", text.replace("]]>", "]]]]><![CDATA[>"))
}

/// Text content escaping for text nodes serialized on their own.
fn escape_text(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cdata_sections_split_terminator() {
        assert_eq!(cdata_section("a < b"), "<![CDATA[a < b]]>");
        assert_eq!(
            cdata_section("text text]]> text"),
            "<![CDATA[text text]]]]><![CDATA[> text]]>"
        );
    }

    #[test]
    fn text_escaping() {
        assert_eq!(escape_text("a & <b> c"), "a &amp; &lt;b&gt; c");
    }

    #[test]
    fn fragment_nodes_are_detached() {
        let mut tree = Tree::parse("<root/>", &ParseOptions::default()).unwrap();
        let nodes = tree.parse_fragment("<a/>text").unwrap();
        assert_eq!(nodes.len(), 2);
        for node in &nodes {
            assert!(tree.parent(*node).is_none());
            assert!(!tree.xot().is_removed(*node));
        }
        assert_eq!(tree.serialize(nodes[0]).unwrap(), "<a/>");
        assert_eq!(tree.serialize(nodes[1]).unwrap(), "text");
    }

    #[test]
    fn merged_text_keeps_cdata_mark() {
        let mut tree = Tree::parse("<root/>", &ParseOptions::default()).unwrap();
        let root = tree.root().unwrap();
        let cdata = tree.append_cdata(root, "a").unwrap();
        let plain = tree.xot_mut().new_text("b");
        tree.append(root, plain).unwrap();
        assert!(tree.is_cdata(cdata));
        assert_eq!(tree.cdata.len(), 1);
        assert_eq!(tree.serialize(root).unwrap(), "<root><![CDATA[ab]]></root>");
    }

    #[test]
    fn removed_text_loses_cdata_mark() {
        let mut tree = Tree::parse("<root/>", &ParseOptions::default()).unwrap();
        let root = tree.root().unwrap();
        tree.append_cdata(root, " ").unwrap();
        assert_eq!(tree.cdata.len(), 1);
        tree.strip_blank_text(root).unwrap();
        assert!(tree.cdata.is_empty());
    }
}
