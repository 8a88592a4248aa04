//! XSLT engines used by [`Document::transform`](crate::Document::transform)

use std::panic::{self, AssertUnwindSafe};

use tracing::trace;
use xee_xpath::context::StaticContext;

use crate::error::{Error, Result};

/// XSLT language version implemented by an engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XsltVersion {
    V1_0,
    V2_0,
    V3_0,
}

/// Something that can apply a stylesheet to serialized XML.
pub trait XsltEngine {
    /// Apply `stylesheet` to `source` and serialize the result sequence.
    fn transform_to_string(&mut self, source: &str, stylesheet: &str) -> Result<String>;

    /// Version of XSLT this engine implements
    fn xslt_version(&self) -> XsltVersion;
}

/// XSLT 3.0 through xee
pub struct XeeXsltEngine {
    xot: xot::Xot,
}

impl Default for XeeXsltEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl XeeXsltEngine {
    pub fn new() -> Self {
        Self { xot: xot::Xot::new() }
    }
}

impl XsltEngine for XeeXsltEngine {
    /// Malformed source XML and stylesheets that fail to compile are both
    /// reported as [`Error::Transform`].
    fn transform_to_string(&mut self, source: &str, stylesheet: &str) -> Result<String> {
        // `evaluate` unwraps both of these, so check them up front.
        xot::Xot::new()
            .parse(source)
            .map_err(|e| Error::transform(format!("source is not well-formed: {e}")))?;
        xee_xslt_compiler::parse(StaticContext::default(), stylesheet)
            .map_err(|e| Error::transform(format!("stylesheet does not compile: {:?}", e)))?;

        let xot = &mut self.xot;
        let evaluated = panic::catch_unwind(AssertUnwindSafe(|| {
            xee_xslt_compiler::evaluate(xot, source, stylesheet)
        }));
        let sequence = match evaluated {
            Ok(sequence) => sequence.map_err(|e| Error::transform(format!("{:?}", e)))?,
            Err(_) => {
                // The arena may be half-updated after an unwind.
                self.xot = xot::Xot::new();
                return Err(Error::transform("XSLT engine aborted"));
            }
        };

        let mut result = String::new();
        for item in sequence.iter() {
            match item.to_node() {
                Ok(node) => {
                    let xml = self
                        .xot
                        .to_string(node)
                        .map_err(|e| Error::Serialize(e.to_string()))?;
                    result.push_str(&xml);
                }
                Err(_) => trace!("Skipping non-node item in transform output"),
            }
        }
        Ok(result)
    }

    fn xslt_version(&self) -> XsltVersion {
        XsltVersion::V3_0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const OUT_STYLESHEET: &str = r#"<xsl:stylesheet version="3.0" xmlns:xsl="http://www.w3.org/1999/XSL/Transform">
    <xsl:template match="/"><out/></xsl:template>
</xsl:stylesheet>"#;

    #[test]
    fn reports_version() {
        assert_eq!(XeeXsltEngine::new().xslt_version(), XsltVersion::V3_0);
    }

    #[test]
    fn broken_stylesheet_is_transform_error() {
        let err = XeeXsltEngine::new()
            .transform_to_string("<a/>", "<not-a-stylesheet/>")
            .unwrap_err();
        assert!(matches!(err, Error::Transform(_)));
    }

    #[test]
    fn malformed_stylesheet_is_transform_error() {
        let err = XeeXsltEngine::new()
            .transform_to_string("<a/>", "<nope")
            .unwrap_err();
        assert!(matches!(err, Error::Transform(_)));
    }

    #[test]
    fn malformed_source_is_transform_error() {
        let err = XeeXsltEngine::new()
            .transform_to_string("<a>", OUT_STYLESHEET)
            .unwrap_err();
        assert!(matches!(err, Error::Transform(_)));
    }

    #[test]
    fn engine_is_reusable_after_failure() {
        let mut engine = XeeXsltEngine::new();
        assert!(engine.transform_to_string("<a/>", "<nope").is_err());
        assert_eq!(engine.transform_to_string("<a/>", OUT_STYLESHEET).unwrap(), "<out/>");
    }
}
