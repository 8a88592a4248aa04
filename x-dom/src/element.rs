//! Element wrapper: navigation, attributes, structural mutation and
//! element-scoped queries.

use std::fmt;

use tracing::{debug, trace};

use crate::document::Document;
use crate::error::{Error, Result};
use crate::node::{Attribute, Node};
use crate::path;

/// Item element name used by [`Element::add_array`]
pub const DEFAULT_ITEM_NODE_NAME: &str = "Item";

/// Key attribute name used by [`Element::add_array`]
pub const DEFAULT_KEY_ATTRIBUTE_NAME: &str = "Name";

/// Handle to an element of a [`Document`].
///
/// The handle borrows its document and never owns it. Two handles are equal
/// when they point at the same node of the same document.
#[derive(Clone, Copy)]
pub struct Element<'d> {
    doc: &'d Document,
    node: xot::Node,
}

impl<'d> Element<'d> {
    pub(crate) fn new(doc: &'d Document, node: xot::Node) -> Self {
        Self { doc, node }
    }

    fn wrap(&self, node: xot::Node) -> Element<'d> {
        Element::new(self.doc, node)
    }

    fn wrap_all(&self, nodes: Vec<xot::Node>) -> Vec<Element<'d>> {
        nodes.into_iter().map(|node| self.wrap(node)).collect()
    }

    fn same_document(&self, other: &Element<'_>) -> bool {
        std::ptr::eq(self.doc, other.doc)
    }

    /// The owning document.
    pub fn document(&self) -> &'d Document {
        self.doc
    }

    pub(crate) fn node(&self) -> xot::Node {
        self.node
    }

    /// Element name (local part).
    pub fn name(&self) -> String {
        self.doc
            .tree()
            .element_name(self.node)
            .unwrap_or_default()
            .to_string()
    }

    /// Concatenated text of all descendant text nodes.
    pub fn text(&self) -> String {
        self.doc.tree().string_value(self.node)
    }

    /// Serialize this element and its subtree.
    pub fn to_xml(&self) -> Result<String> {
        self.doc.tree().serialize(self.node)
    }

    /// Absolute path of this element, such as `/root[1]/x[3]/y[2]`.
    ///
    /// Each step counts same-named element siblings before the node. The
    /// path reflects the tree at the moment of the call and is invalidated
    /// by any structural change. A detached element gets the path it would
    /// have as a root, which does not address it inside the document.
    pub fn path(&self) -> String {
        self.doc.tree().path(self.node)
    }

    // ==================== Navigation ====================

    /// First element child, optionally restricted to `name`.
    pub fn child_node(&self, name: Option<&str>) -> Option<Element<'d>> {
        let children = self.doc.tree().element_children(self.node, name);
        children.first().map(|child| self.wrap(*child))
    }

    /// All element children, optionally restricted to `name`.
    pub fn child_nodes(&self, name: Option<&str>) -> Vec<Element<'d>> {
        let children = self.doc.tree().element_children(self.node, name);
        self.wrap_all(children)
    }

    /// Parent element; `None` for the root element and detached elements.
    pub fn parent(&self) -> Option<Element<'d>> {
        let parent = self.doc.tree().parent_element(self.node)?;
        Some(self.wrap(parent))
    }

    /// Element siblings before this one, in document order. `None` when the
    /// element has no parent at all.
    pub fn preceding_siblings(&self, name: Option<&str>) -> Option<Vec<Element<'d>>> {
        let siblings = self.doc.tree().element_siblings(self.node, name, true)?;
        Some(self.wrap_all(siblings))
    }

    /// Element siblings after this one, in document order. `None` when the
    /// element has no parent at all.
    pub fn following_siblings(&self, name: Option<&str>) -> Option<Vec<Element<'d>>> {
        let siblings = self.doc.tree().element_siblings(self.node, name, false)?;
        Some(self.wrap_all(siblings))
    }

    // ==================== Queries ====================

    /// First element matching `path`. A bare name is looked up among the
    /// element children; anything else goes through [`Element::query`].
    pub fn select_single_node(&self, path: &str) -> Result<Option<Element<'d>>> {
        if path::is_bare_name(path) {
            trace!(path, "Child lookup");
            return Ok(self.child_node(Some(path)));
        }
        Ok(self
            .query(path)?
            .into_iter()
            .find_map(|node| node.as_element()))
    }

    /// All elements matching `path`, with the same resolution rules as
    /// [`Element::select_single_node`]. Non-element matches are skipped.
    pub fn select_nodes(&self, path: &str) -> Result<Vec<Element<'d>>> {
        if path::is_bare_name(path) {
            trace!(path, "Child lookup");
            return Ok(self.child_nodes(Some(path)));
        }
        Ok(self
            .query(path)?
            .into_iter()
            .filter_map(|node| node.as_element())
            .collect())
    }

    /// Evaluate an XPath expression relative to this element.
    ///
    /// A local expression is rewritten to `self.path() + "/" + expr` and run
    /// against the whole document, so the result depends on the path being
    /// accurate at call time.
    ///
    /// A detached element has no path into the document, so local
    /// expressions evaluated from it match nothing.
    pub fn query(&self, expr: &str) -> Result<Vec<Node<'d>>> {
        if path::is_local(expr) && !self.doc.tree().is_attached(self.node) {
            debug!(expr, element = %self.name(), "Local query on a detached element");
            return Ok(Vec::new());
        }
        let base = self.path();
        let expr = path::resolve_against(&base, expr);
        let nodes = self.doc.tree_mut().query(&expr)?;
        Ok(nodes
            .into_iter()
            .map(|node| Node::new(self.doc, node))
            .collect())
    }

    /// Like [`Element::query`], applying `map` to each match.
    pub fn query_map<T, F>(&self, expr: &str, map: F) -> Result<Vec<T>>
    where
        F: FnMut(Node<'d>) -> T,
    {
        Ok(self.query(expr)?.into_iter().map(map).collect())
    }

    /// String value of the first node matching `path`, or `None`.
    /// Unlike [`Element::select_single_node`] any kind of node counts, so
    /// `@id` or `text()` work too.
    pub fn node_value(&self, path: &str) -> Result<Option<String>> {
        if path::is_bare_name(path) {
            return Ok(self.child_node(Some(path)).map(|child| child.text()));
        }
        Ok(self.query(path)?.first().map(|node| node.value()))
    }

    /// [`Element::node_value`] with a fallback.
    pub fn node_value_or(&self, path: &str, default: &str) -> Result<String> {
        Ok(self
            .node_value(path)?
            .unwrap_or_else(|| default.to_string()))
    }

    // ==================== Attributes ====================

    pub fn attribute(&self, name: &str) -> Option<String> {
        self.doc.tree().attribute(self.node, name)
    }

    pub fn attribute_or(&self, name: &str, default: &str) -> String {
        self.attribute(name)
            .unwrap_or_else(|| default.to_string())
    }

    /// All attributes as `(name, value)` pairs.
    pub fn attributes(&self) -> Vec<(String, String)> {
        self.doc.tree().attributes(self.node)
    }

    /// Create or overwrite an attribute. Returns this element for chaining.
    pub fn set_attribute(&self, name: &str, value: &str) -> Result<Element<'d>> {
        self.doc.tree_mut().set_attribute(self.node, name, value)?;
        Ok(*self)
    }

    /// Live handle to an attribute, or `None` if it is not set.
    pub fn attribute_node(&self, name: &str) -> Option<Attribute<'d>> {
        self.attribute(name)?;
        Some(Attribute::new(*self, name))
    }

    /// Copy every attribute of `source` onto this element. With
    /// `overwrite == false` attributes already present here keep their value.
    ///
    /// `source` may live in another document.
    pub fn copy_attributes(
        &self,
        source: Option<&Element<'_>>,
        overwrite: bool,
    ) -> Result<Element<'d>> {
        let source = source
            .ok_or_else(|| Error::invalid_argument("copy_attributes needs a source element"))?;
        for (name, value) in source.attributes() {
            if !overwrite && self.attribute(&name).is_some() {
                continue;
            }
            self.set_attribute(&name, &value)?;
        }
        Ok(*self)
    }

    // ==================== Structure ====================

    /// Append a new child element named `name` and return it.
    pub fn add_node(&self, name: &str) -> Result<Element<'d>> {
        let mut tree = self.doc.tree_mut();
        let child = tree.new_element(name)?;
        tree.append(self.node, child)?;
        Ok(self.wrap(child))
    }

    /// Append a new child element holding `subtree`.
    ///
    /// A subtree from this document is moved under the new element; one from
    /// another document is deep-copied first.
    pub fn add_node_with(&self, name: &str, subtree: &Element<'_>) -> Result<Element<'d>> {
        if self.same_document(subtree) && self.doc.tree().is_ancestor_or_self(subtree.node, self.node) {
            return Err(Error::invalid_argument(format!(
                "<{}> cannot be moved below itself",
                subtree.name()
            )));
        }
        let added = self.add_node(name)?;
        if self.same_document(subtree) {
            let mut tree = self.doc.tree_mut();
            tree.detach(subtree.node)?;
            tree.append(added.node, subtree.node)?;
        } else {
            added.import_node(subtree)?;
        }
        Ok(added)
    }

    /// Insert a new element named `name` right before this one.
    pub fn add_node_before(&self, name: &str) -> Result<Element<'d>> {
        let mut tree = self.doc.tree_mut();
        if tree.parent(self.node).is_none() {
            return Err(Error::no_parent(format!(
                "cannot add <{name}> before a detached element"
            )));
        }
        if tree.parent_element(self.node).is_none() {
            let root = tree.element_name(self.node).unwrap_or_default().to_string();
            return Err(Error::RootElementExists(root));
        }
        let sibling = tree.new_element(name)?;
        tree.insert_before(self.node, sibling)?;
        Ok(self.wrap(sibling))
    }

    /// Append a CDATA section and return the node holding it.
    pub fn add_cdata(&self, value: &str) -> Result<Node<'d>> {
        let text = self.doc.tree_mut().append_cdata(self.node, value)?;
        Ok(Node::new(self.doc, text))
    }

    /// Append a child element named `name` holding a CDATA section.
    pub fn add_node_with_cdata(&self, name: &str, value: &str) -> Result<Element<'d>> {
        let child = self.add_node(name)?;
        child.add_cdata(value)?;
        Ok(child)
    }

    /// [`Element::add_array_with`] using `Item` elements keyed by a `Name`
    /// attribute.
    pub fn add_array<I, K, V>(&self, items: I) -> Result<Element<'d>>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        self.add_array_with(items, DEFAULT_ITEM_NODE_NAME, DEFAULT_KEY_ATTRIBUTE_NAME)
    }

    /// Append one `item_node_name` child per pair, in iteration order. The
    /// value becomes a CDATA section and the key goes to `key_attribute_name`.
    pub fn add_array_with<I, K, V>(
        &self,
        items: I,
        item_node_name: &str,
        key_attribute_name: &str,
    ) -> Result<Element<'d>>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        for (key, value) in items {
            self.add_node_with_cdata(item_node_name, value.as_ref())?
                .set_attribute(key_attribute_name, key.as_ref())?;
        }
        Ok(*self)
    }

    /// Deep-copy `foreign` (from any document, this one included) and append
    /// the copy as the last child. Returns the copy.
    pub fn import_node(&self, foreign: &Element<'_>) -> Result<Element<'d>> {
        debug!(node = %foreign.name(), into = %self.name(), "Importing node");
        let copy = if self.same_document(foreign) {
            self.doc.tree_mut().copy_within(foreign.node)
        } else {
            let source = foreign.doc.tree();
            self.doc.tree_mut().copy_from(&source, foreign.node)?
        };
        self.doc.tree_mut().append(self.node, copy)?;
        Ok(self.wrap(copy))
    }

    /// New standalone document whose root is a deep copy of this element.
    pub fn export_node(&self) -> Result<Document> {
        Document::from_element(self)
    }

    /// Replace all children with the nodes parsed from `xml`.
    pub fn set_inner_xml(&self, xml: &str) -> Result<Element<'d>> {
        // Parse first so malformed input leaves the children in place.
        let nodes = self.doc.tree_mut().parse_fragment(xml)?;
        self.remove_all_children()?;
        self.append_nodes(nodes)
    }

    /// Serialized children: elements as XML, other nodes as their text.
    pub fn inner_xml(&self) -> Result<String> {
        let tree = self.doc.tree();
        let mut inner = String::new();
        for child in tree.children(self.node) {
            if tree.is_element(child) {
                inner.push_str(&tree.serialize(child)?);
            } else {
                inner.push_str(&tree.string_value(child));
            }
        }
        Ok(inner)
    }

    /// Parse `xml` as a fragment and append its nodes after the existing
    /// children.
    pub fn append_xml(&self, xml: &str) -> Result<Element<'d>> {
        let nodes = self.doc.tree_mut().parse_fragment(xml)?;
        self.append_nodes(nodes)
    }

    fn append_nodes(&self, nodes: Vec<xot::Node>) -> Result<Element<'d>> {
        let mut tree = self.doc.tree_mut();
        for node in nodes {
            tree.append(self.node, node)?;
        }
        Ok(*self)
    }

    /// Put a new element named `name` in this element's place and move this
    /// element inside it. Returns the wrapper.
    pub fn wrap_node(&self, name: &str) -> Result<Element<'d>> {
        let mut tree = self.doc.tree_mut();
        if tree.parent(self.node).is_none() {
            return Err(Error::no_parent(format!(
                "cannot wrap a detached element in <{name}>"
            )));
        }
        let wrapper = tree.wrap(self.node, name)?;
        Ok(self.wrap(wrapper))
    }

    /// Detach every child, elements and text alike.
    pub fn remove_all_children(&self) -> Result<Element<'d>> {
        let mut tree = self.doc.tree_mut();
        for child in tree.children(self.node) {
            tree.detach(child)?;
        }
        Ok(*self)
    }

    /// Call `visit` on every element child, then descend into each child.
    ///
    /// All children of a level are visited before any of them is descended
    /// into, so changes made by `visit` are visible when recursion starts.
    /// Only elements are visited: text, comments and processing instructions
    /// are skipped, as the visitor works on [`Element`] handles.
    pub fn subtree_walk<F>(&self, mut visit: F) -> Result<()>
    where
        F: FnMut(Element<'d>) -> Result<()>,
    {
        self.walk(&mut visit)
    }

    fn walk<F>(&self, visit: &mut F) -> Result<()>
    where
        F: FnMut(Element<'d>) -> Result<()>,
    {
        for child in self.child_nodes(None) {
            visit(child)?;
        }
        for child in self.child_nodes(None) {
            child.walk(visit)?;
        }
        Ok(())
    }

    /// Detach every element matched by `path` except `keep`.
    pub fn remove_except_one(&self, path: &str, keep: &Element<'_>) -> Result<()> {
        for matched in self.select_nodes(path)? {
            if matched.same_document(keep) && matched.node == keep.node {
                continue;
            }
            self.doc.tree_mut().detach(matched.node)?;
        }
        Ok(())
    }
}

impl PartialEq for Element<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.same_document(other) && self.node == other.node
    }
}

impl Eq for Element<'_> {}

impl fmt::Debug for Element<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Element")
            .field("name", &self.name())
            .field("path", &self.path())
            .finish()
    }
}
