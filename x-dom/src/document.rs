//! Document wrapper: root access, document-level queries and XSLT

use std::cell::{Ref, RefCell, RefMut};
use std::fmt;
use std::path::Path;

use tracing::{debug, trace};

use crate::element::Element;
use crate::error::{Error, Result};
use crate::node::Node;
use crate::options::{ParseOptions, XML_DECLARATION};
use crate::path;
use crate::tree::Tree;
use crate::xslt::{XeeXsltEngine, XsltEngine};

/// An XML document owning exactly one tree with zero or one root element.
///
/// Elements handed out by a document borrow it; all mutation goes through
/// those handles. A document is a single mutable aggregate and is not meant
/// to be shared across threads.
pub struct Document {
    tree: RefCell<Tree>,
    options: ParseOptions,
}

impl Document {
    /// Create an empty document (no root element).
    pub fn new() -> Self {
        Self::with_options(ParseOptions::default())
    }

    /// Create an empty document that will serialize with `options`.
    pub fn with_options(options: ParseOptions) -> Self {
        Self {
            tree: RefCell::new(Tree::empty()),
            options,
        }
    }

    /// Parse XML text with default options.
    pub fn parse(xml: &str) -> Result<Self> {
        Self::parse_with(xml, ParseOptions::default())
    }

    /// Parse XML text with the given options.
    pub fn parse_with(xml: &str, options: ParseOptions) -> Result<Self> {
        debug!(bytes = xml.len(), ?options, "Parsing document");
        let tree = Tree::parse(xml, &options)?;
        Ok(Self {
            tree: RefCell::new(tree),
            options,
        })
    }

    /// Read and parse an XML file with default options.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        Self::load_with(path, ParseOptions::default())
    }

    /// Read and parse an XML file.
    pub fn load_with(path: impl AsRef<Path>, options: ParseOptions) -> Result<Self> {
        let path = path.as_ref();
        debug!(path = %path.display(), "Loading document");
        let xml = std::fs::read_to_string(path)?;
        Self::parse_with(&xml, options)
    }

    /// Build a new document whose root is a deep copy of `element`.
    /// The source document is left untouched.
    pub fn from_element(element: &Element<'_>) -> Result<Self> {
        let source = element.document();
        let tree = Tree::adopt(&source.tree(), element.node())?;
        debug!(root = %element.name(), "Adopted element as document root");
        Ok(Self {
            tree: RefCell::new(tree),
            options: source.options,
        })
    }

    pub fn options(&self) -> ParseOptions {
        self.options
    }

    /// `true` when the document has no root element.
    pub fn is_empty(&self) -> bool {
        self.tree().root().is_none()
    }

    pub(crate) fn tree(&self) -> Ref<'_, Tree> {
        self.tree.borrow()
    }

    pub(crate) fn tree_mut(&self) -> RefMut<'_, Tree> {
        self.tree.borrow_mut()
    }

    /// The root element, or `None` for an empty document.
    pub fn root(&self) -> Option<Element<'_>> {
        let root = self.tree().root()?;
        Some(Element::new(self, root))
    }

    /// Create the root element of an empty document.
    ///
    /// Fails with [`Error::RootElementExists`] when the document already has
    /// a root, since a second top-level element would not be well-formed.
    pub fn add_root_node(&self, name: &str) -> Result<Element<'_>> {
        if let Some(root) = self.root() {
            return Err(Error::RootElementExists(root.name()));
        }
        if !path::is_valid_name(name) {
            return Err(Error::invalid_argument(format!(
                "`{name}` is not a valid XML name"
            )));
        }
        let tree = Tree::parse(&format!("<{name}/>"), &ParseOptions::default())?;
        *self.tree_mut() = tree;
        self.root()
            .ok_or_else(|| Error::Tree(format!("root element <{name}> was not created")))
    }

    /// First element matching `path`.
    ///
    /// A path equal to the root's name returns the root directly; any other
    /// local path is made absolute (`x/y` becomes `/x/y`) and evaluated from
    /// the root.
    pub fn select_single_node(&self, path: &str) -> Result<Option<Element<'_>>> {
        let Some(root) = self.root() else {
            return Ok(None);
        };
        if path == root.name() {
            trace!(path, "Root name shortcut");
            return Ok(Some(root));
        }
        root.select_single_node(&path::promote_to_absolute(path))
    }

    /// All elements matching `path`, with the same resolution rules as
    /// [`Document::select_single_node`].
    pub fn select_nodes(&self, path: &str) -> Result<Vec<Element<'_>>> {
        let Some(root) = self.root() else {
            return Ok(Vec::new());
        };
        if path == root.name() {
            trace!(path, "Root name shortcut");
            return Ok(vec![root]);
        }
        root.select_nodes(&path::promote_to_absolute(path))
    }

    /// Evaluate an XPath expression against the whole document and return
    /// the matched nodes in the order the engine produced them.
    pub fn query(&self, expr: &str) -> Result<Vec<Node<'_>>> {
        debug!(expr, "Querying document");
        let nodes = self.tree_mut().query(expr)?;
        Ok(nodes.into_iter().map(|node| Node::new(self, node)).collect())
    }

    /// Like [`Document::query`], applying `map` to each match.
    ///
    /// The document is not borrowed while `map` runs, so the closure may
    /// mutate the matched nodes.
    pub fn query_map<'d, T, F>(&'d self, expr: &str, map: F) -> Result<Vec<T>>
    where
        F: FnMut(Node<'d>) -> T,
    {
        Ok(self.query(expr)?.into_iter().map(map).collect())
    }

    /// Apply an XSLT stylesheet given as text and return the serialized
    /// result.
    pub fn transform(&self, stylesheet: &str) -> Result<String> {
        self.transform_with(&mut XeeXsltEngine::new(), stylesheet)
    }

    /// Apply a stylesheet held in another document.
    pub fn transform_with_stylesheet(&self, stylesheet: &Document) -> Result<String> {
        let stylesheet = stylesheet
            .root()
            .ok_or_else(|| Error::transform("stylesheet document is empty"))?
            .to_xml()?;
        self.transform(&stylesheet)
    }

    /// Apply a stylesheet through a specific XSLT engine.
    pub fn transform_with<E: XsltEngine>(&self, engine: &mut E, stylesheet: &str) -> Result<String> {
        let source = self
            .root()
            .ok_or_else(|| Error::transform("document has no root element"))?
            .to_xml()?;
        debug!(version = ?engine.xslt_version(), "Applying stylesheet");
        engine.transform_to_string(&source, stylesheet)
    }

    /// Serialize the whole document, with an XML declaration unless the
    /// document options omit it.
    pub fn to_xml(&self) -> Result<String> {
        let tree = self.tree();
        let body = match tree.document_node() {
            Some(doc) => tree.serialize(doc)?,
            None => String::new(),
        };
        if self.options.omit_xml_declaration {
            Ok(body)
        } else {
            Ok(format!("{XML_DECLARATION}\n{body}"))
        }
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("root", &self.root().map(|root| root.name()))
            .field("options", &self.options)
            .finish()
    }
}
