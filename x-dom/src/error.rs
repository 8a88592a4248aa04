//! Error types for document and element operations

/// Result type for x-dom operations
pub type Result<T> = std::result::Result<T, Error>;

/// Unified error type for all document and element operations.
///
/// Absence (missing attribute, no matching child, empty document) is not an
/// error: those cases come back as `None` or an empty `Vec`.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Malformed XML given to a constructor, `append_xml` or `set_inner_xml`
    #[error("XML parsing error: {0}")]
    Parse(String),

    /// A required argument was absent or unusable
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// XSLT compilation or application failed
    #[error("XSLT transformation error: {0}")]
    Transform(String),

    /// XPath compilation failed
    #[error("XPath compilation error: {0}")]
    XPathCompile(String),

    /// XPath evaluation failed
    #[error("XPath evaluation error: {0}")]
    XPathEval(String),

    /// A query produced an item that is not a node
    #[error("Type conversion error: {0}")]
    TypeConversion(String),

    /// The operation needs a parent the node does not have
    #[error("Node has no parent: {0}")]
    NoParent(String),

    /// The document already has a root element
    #[error("Document already has a root element <{0}>")]
    RootElementExists(String),

    /// The underlying tree refused a structural change
    #[error("Tree error: {0}")]
    Tree(String),

    /// Serialization failed
    #[error("Serialization error: {0}")]
    Serialize(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create a new XML parse error
    pub fn parse<S: Into<String>>(msg: S) -> Self {
        Error::Parse(msg.into())
    }

    /// Create a new invalid argument error
    pub fn invalid_argument<S: Into<String>>(msg: S) -> Self {
        Error::InvalidArgument(msg.into())
    }

    /// Create a new XSLT transformation error
    pub fn transform<S: Into<String>>(msg: S) -> Self {
        Error::Transform(msg.into())
    }

    /// Create a new XPath compilation error
    pub fn xpath_compile<S: Into<String>>(msg: S) -> Self {
        Error::XPathCompile(msg.into())
    }

    /// Create a new XPath evaluation error
    pub fn xpath_eval<S: Into<String>>(msg: S) -> Self {
        Error::XPathEval(msg.into())
    }

    /// Create a new missing-parent error
    pub fn no_parent<S: Into<String>>(msg: S) -> Self {
        Error::NoParent(msg.into())
    }
}

impl From<xot::Error> for Error {
    fn from(e: xot::Error) -> Self {
        Error::Tree(e.to_string())
    }
}
