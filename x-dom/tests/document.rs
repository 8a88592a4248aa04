//! Integration tests for Document: construction, root handling, document
//! level selection, queries, serialization and XSLT.

use std::io::Write;

use x_dom::{Document, Error, NodeKind, ParseOptions, XeeXsltEngine, XsltEngine, XsltVersion};

const TEST_XML: &str = "<root>
    <x id='1'/>
    <z id='0'/>
    <x id='2'>
        <text><![CDATA[woof woof]]></text>
    </x>
    <z id='1'/>
    <x id='3'>
        <y id='1'/>
        <y id='2'/>
    </x>
    <x id='4'/>
    <z id='2'/>
 </root>";

/// Serialization of `xml` after a plain parse, used as the expected value.
fn normalized(xml: &str) -> String {
    Document::parse(xml).unwrap().to_xml().unwrap()
}

// ============== Construction ==============

#[test]
fn empty_document_has_no_root() {
    let doc = Document::new();
    assert!(doc.is_empty());
    assert!(doc.root().is_none());
    assert!(doc.select_single_node("x").unwrap().is_none());
    assert!(doc.select_nodes("x").unwrap().is_empty());
    assert!(doc.query("//x").unwrap().is_empty());
}

#[test]
fn parse_rejects_malformed_xml() {
    let err = Document::parse("<root><x></root>").unwrap_err();
    assert!(matches!(err, Error::Parse(_)), "got {err:?}");
}

#[test]
fn parse_rejects_empty_text() {
    assert!(matches!(Document::parse(""), Err(Error::Parse(_))));
}

#[test]
fn serialization_matches_source_tree() {
    let doc = Document::parse(TEST_XML).unwrap();
    let xml = doc.to_xml().unwrap();
    assert!(xml.starts_with(r#"<?xml version="1.0" encoding="UTF-8"?>"#));
    assert!(xml.contains("<x id=\"3\">"));
    assert_eq!(xml, normalized(TEST_XML));
}

#[test]
fn options_strip_blanks_and_declaration() {
    let options = ParseOptions::new()
        .with_strip_blank_text(true)
        .with_omit_xml_declaration(true);
    let doc = Document::parse_with(
        "<root> <c>    <bubu/>   <t>woof </t>     </c>\n        </root>",
        options,
    )
    .unwrap();
    insta::assert_snapshot!(doc.to_xml().unwrap().trim(), @"<root><c><bubu/><t>woof </t></c></root>");
}

#[test]
fn load_reads_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "<root><x id='1'/></root>").unwrap();

    let doc = Document::load(file.path()).unwrap();
    let root = doc.root().unwrap();
    assert_eq!(root.name(), "root");
    assert_eq!(root.child_node(Some("x")).unwrap().attribute("id").as_deref(), Some("1"));
}

#[test]
fn load_missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = Document::load(dir.path().join("missing.xml")).unwrap_err();
    assert!(matches!(err, Error::Io(_)));
}

#[test]
fn from_element_copies_subtree() {
    let source = Document::parse("<root id='2'><x id='3'><y/></x></root>").unwrap();
    let before = source.to_xml().unwrap();
    let x = source.root().unwrap().child_node(None).unwrap();

    let doc = Document::from_element(&x).unwrap();
    assert_eq!(doc.to_xml().unwrap(), normalized("<x id='3'><y/></x>"));
    assert_eq!(source.to_xml().unwrap(), before);
}

// ============== Root ==============

#[test]
fn add_root_node_on_empty_document() {
    let doc = Document::new();
    let root = doc.add_root_node("root").unwrap();
    root.add_node("x").unwrap().set_attribute("id", "1").unwrap();

    assert!(!doc.is_empty());
    assert_eq!(doc.root().unwrap(), root);
    insta::assert_snapshot!(root.to_xml().unwrap(), @r#"<root><x id="1"/></root>"#);
}

#[test]
fn add_root_node_twice_fails() {
    let doc = Document::new();
    doc.add_root_node("root").unwrap();
    let err = doc.add_root_node("other").unwrap_err();
    assert!(matches!(err, Error::RootElementExists(ref name) if name == "root"));
    assert_eq!(doc.root().unwrap().name(), "root");
}

#[test]
fn add_root_node_rejects_bad_name() {
    let doc = Document::new();
    assert!(matches!(doc.add_root_node("1x"), Err(Error::InvalidArgument(_))));
    assert!(doc.is_empty());
}

// ============== Selection ==============

#[test]
fn select_root_by_name() {
    let doc = Document::parse(TEST_XML).unwrap();
    let root = doc.select_single_node("root").unwrap().unwrap();
    assert_eq!(root, doc.root().unwrap());
    assert_eq!(doc.select_nodes("root").unwrap(), vec![root]);
}

#[test]
fn local_paths_are_promoted() {
    let doc = Document::parse(TEST_XML).unwrap();
    let x = doc.select_single_node("root/x[@id='2']").unwrap().unwrap();
    assert_eq!(x.attribute("id").as_deref(), Some("2"));
    assert!(doc.select_nodes("root/x[@id='55']").unwrap().is_empty());
    assert_eq!(doc.select_nodes("/root/z").unwrap().len(), 3);
}

#[test]
fn select_nodes_in_document_order() {
    let doc = Document::parse("<root><x id='1'/><z id='0'/><x id='2'/></root>").unwrap();
    let ids: Vec<String> = doc
        .select_nodes("//x")
        .unwrap()
        .iter()
        .filter_map(|x| x.attribute("id"))
        .collect();
    assert_eq!(ids, ["1", "2"]);
}

#[test]
fn select_skips_non_elements() {
    let doc = Document::parse(TEST_XML).unwrap();
    assert!(doc.select_nodes("//x/@id").unwrap().is_empty());
    assert!(doc.select_single_node("//text/text()").unwrap().is_none());
}

// ============== Queries ==============

#[test]
fn query_returns_raw_nodes() {
    let doc = Document::parse(TEST_XML).unwrap();
    let ids = doc.query("//x/@id").unwrap();
    assert_eq!(ids.len(), 4);
    assert_eq!(ids[0].kind(), NodeKind::Attribute);
    assert_eq!(ids[0].name().as_deref(), Some("id"));
    assert_eq!(ids[3].value(), "4");

    let text = doc.query("//text/text()").unwrap();
    assert_eq!(text.len(), 1);
    assert_eq!(text[0].kind(), NodeKind::Text);
    assert_eq!(text[0].value(), "woof woof");
    assert!(text[0].as_element().is_none());
}

#[test]
fn query_map_collects_in_order() {
    let doc = Document::parse(TEST_XML).unwrap();
    let mut seen = String::new();
    let ids = doc
        .query_map("//x", |node| {
            let id = node.as_element().and_then(|x| x.attribute("id")).unwrap_or_default();
            seen.push_str(&id);
            seen.push(',');
            id
        })
        .unwrap();
    assert_eq!(seen, "1,2,3,4,");
    assert_eq!(ids.join(","), "1,2,3,4");
}

#[test]
fn query_map_can_mutate_matches() {
    let doc = Document::parse(TEST_XML).unwrap();
    doc.query_map("//x", |node| {
        let x = node.as_element().unwrap();
        let id: u32 = x.attribute("id").unwrap().parse().unwrap();
        x.set_attribute("id", &(id + 10).to_string()).unwrap();
    })
    .unwrap();

    let ids = doc
        .query_map("//x", |node| node.as_element().unwrap().attribute("id").unwrap())
        .unwrap();
    assert_eq!(ids, ["11", "12", "13", "14"]);
}

#[test]
fn query_with_no_match_is_empty() {
    let doc = Document::parse(TEST_XML).unwrap();
    assert!(doc.query("//nothing").unwrap().is_empty());
}

#[test]
fn query_rejects_bad_xpath() {
    let doc = Document::parse(TEST_XML).unwrap();
    assert!(matches!(doc.query("//x[").unwrap_err(), Error::XPathCompile(_)));
}

#[test]
fn query_rejects_atomic_results() {
    let doc = Document::parse(TEST_XML).unwrap();
    assert!(matches!(doc.query("count(//x)").unwrap_err(), Error::TypeConversion(_)));
}

#[test]
fn node_info_serializes() {
    let doc = Document::parse(TEST_XML).unwrap();
    let y = &doc.query("//y[@id='2']").unwrap()[0];
    let info = y.info();
    assert_eq!(info.kind, NodeKind::Element);
    assert_eq!(info.path.as_deref(), Some("/root[1]/x[3]/y[2]"));

    let json = serde_json::to_value(&info).unwrap();
    assert_eq!(json["kind"], "Element");
    assert_eq!(json["name"], "y");
}

// ============== XSLT ==============

const MODULE_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<Module>
  <Text><![CDATA[text data]]></Text>
</Module>"#;

const MODULE_XSLT: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<xsl:stylesheet version="3.0" xmlns:xsl="http://www.w3.org/1999/XSL/Transform">
    <xsl:template match="/">
        <module><xsl:value-of select="Module/Text/text()"/></module>
    </xsl:template>
</xsl:stylesheet>"#;

#[test]
fn transform_with_stylesheet_text() {
    let doc = Document::parse(MODULE_XML).unwrap();
    assert_eq!(doc.transform(MODULE_XSLT).unwrap().trim(), "<module>text data</module>");
}

#[test]
fn transform_with_stylesheet_document() {
    let doc = Document::parse(MODULE_XML).unwrap();
    let stylesheet = Document::parse(MODULE_XSLT).unwrap();
    assert_eq!(
        doc.transform_with_stylesheet(&stylesheet).unwrap().trim(),
        "<module>text data</module>"
    );
}

#[test]
fn transform_with_explicit_engine() {
    let doc = Document::parse(MODULE_XML).unwrap();
    let mut engine = XeeXsltEngine::new();
    assert_eq!(engine.xslt_version(), XsltVersion::V3_0);
    assert_eq!(
        doc.transform_with(&mut engine, MODULE_XSLT).unwrap().trim(),
        "<module>text data</module>"
    );
}

#[test]
fn transform_failures() {
    let doc = Document::parse(MODULE_XML).unwrap();
    assert!(matches!(doc.transform("<nope"), Err(Error::Transform(_))));
    assert!(matches!(doc.transform("<not-a-stylesheet/>"), Err(Error::Transform(_))));
    // The document stays usable after a failed transform.
    assert_eq!(doc.transform(MODULE_XSLT).unwrap().trim(), "<module>text data</module>");
    assert!(matches!(Document::new().transform(MODULE_XSLT), Err(Error::Transform(_))));
    assert!(matches!(
        doc.transform_with_stylesheet(&Document::new()),
        Err(Error::Transform(_))
    ));
}
