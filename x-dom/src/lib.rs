//! x-dom: convenience wrappers over an xot XML tree
//!
//! A [`Document`] owns one tree. [`Element`] handles borrow the document and
//! add navigation, attribute access, structural helpers and element-relative
//! XPath queries on top of xot and xee.
//!
//! # Quick Start
//!
//! ```rust
//! use x_dom::Document;
//!
//! let doc = Document::parse("<root><x id='1'/><z/><x id='2'/></root>")?;
//! let xs = doc.select_nodes("//x")?;
//! assert_eq!(xs.len(), 2);
//! assert_eq!(xs[1].attribute("id").as_deref(), Some("2"));
//!
//! let preceding = xs[1].preceding_siblings(None).unwrap_or_default();
//! assert_eq!(preceding.len(), 2);
//! # Ok::<(), x_dom::Error>(())
//! ```
//!
//! Local paths given to an element are resolved against the element's
//! computed path (`/root[1]/x[3]`), so they always run as absolute queries
//! against the whole document.

pub mod document;
pub mod element;
pub mod error;
pub mod node;
pub mod options;
pub mod path;
mod tree;
pub mod xslt;

pub use document::Document;
pub use element::{Element, DEFAULT_ITEM_NODE_NAME, DEFAULT_KEY_ATTRIBUTE_NAME};
pub use error::{Error, Result};
pub use node::{Attribute, Node};
pub use options::ParseOptions;
pub use tree::{NodeInfo, NodeKind};
pub use xslt::{XeeXsltEngine, XsltEngine, XsltVersion};
