//! Parse and output options carried by a document

use serde::{Deserialize, Serialize};

/// XML declaration written in front of serialized documents
pub const XML_DECLARATION: &str = r#"<?xml version="1.0" encoding="UTF-8"?>"#;

/// Options applied when a document is built from text and when it is
/// serialized again.
///
/// Documents derived from another document (for example through
/// [`Element::export_node`](crate::Element::export_node)) inherit the options
/// of their source.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParseOptions {
    /// Drop whitespace-only text nodes after parsing
    pub strip_blank_text: bool,
    /// Leave the XML declaration out of document serialization
    pub omit_xml_declaration: bool,
}

impl ParseOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_strip_blank_text(mut self, strip: bool) -> Self {
        self.strip_blank_text = strip;
        self
    }

    pub fn with_omit_xml_declaration(mut self, omit: bool) -> Self {
        self.omit_xml_declaration = omit;
        self
    }
}
