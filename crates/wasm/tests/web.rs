//! WebAssembly integration tests.
//!
//! These tests run in a headless browser using wasm-bindgen-test.
//!
//! Run with: wasm-pack test --headless --firefox crates/wasm

use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_test::*;
use web_sys::HtmlTextAreaElement;
use xsltui_core::{KeyValueStore, ParseResult, TransformError, XmlEngine};
use xsltui_wasm::{BrowserBackend, BrowserDocument, LocalStorage, XsltPlayground};

wasm_bindgen_test_configure!(run_in_browser);

const IDENTITY: &str = r#"<xsl:stylesheet version="1.0" xmlns:xsl="http://www.w3.org/1999/XSL/Transform">
  <xsl:template match="@*|node()"><xsl:copy><xsl:apply-templates select="@*|node()"/></xsl:copy></xsl:template>
</xsl:stylesheet>"#;

fn property(value: &JsValue, name: &str) -> JsValue {
    js_sys::Reflect::get(value, &name.into()).unwrap()
}

#[wasm_bindgen_test]
fn test_init() {
    let version = xsltui_wasm::get_version();
    assert!(!version.is_empty());
}

#[wasm_bindgen_test]
fn test_default_document() {
    let xml = xsltui_wasm::default_document("xml").unwrap();
    assert!(xml.starts_with("<?xml"));
    assert!(xsltui_wasm::default_document("css").is_err());
}

#[wasm_bindgen_test]
fn test_browser_parser_reports_errors() {
    let backend = BrowserBackend::new();
    assert!(backend.parse("<a><b/></a>").is_ok());
    match backend.parse("<a>1 < 2</a>") {
        ParseResult::Errors(message) => assert!(!message.trim().is_empty()),
        ParseResult::Document(_) => panic!("malformed XML should not parse"),
    }
}

#[wasm_bindgen_test]
fn test_browser_transform_labels() {
    let backend = BrowserBackend::new();
    let source = backend.parse("<a>hello</a>").into_document().unwrap();

    let text = backend
        .parse(r#"<xsl:stylesheet version="1.0" xmlns:xsl="http://www.w3.org/1999/XSL/Transform"><xsl:output method="text"/><xsl:template match="/"><xsl:value-of select="a"/></xsl:template></xsl:stylesheet>"#)
        .into_document()
        .unwrap();
    let result = backend.transform(&source, &text).unwrap();
    assert_eq!(result.kind_label, "Text");
    assert_eq!(result.text, "hello");

    let identity = backend.parse(IDENTITY).into_document().unwrap();
    let result = backend.transform(&source, &identity).unwrap();
    assert_eq!(result.kind_label, "XML");
    assert!(result.text.contains("<a>hello</a>"));
}

#[wasm_bindgen_test]
fn test_local_storage_round_trip() {
    let mut storage = LocalStorage::open().unwrap();
    storage.set("xsltui-test.key", "value").unwrap();
    assert_eq!(storage.get("xsltui-test.key").unwrap().as_deref(), Some("value"));
    storage.remove("xsltui-test.key").unwrap();
    assert_eq!(storage.get("xsltui-test.key").unwrap(), None);
}

#[wasm_bindgen_test]
fn test_playground_save_load_update() {
    let playground = XsltPlayground::new(Some("xsltui-test.".to_string()));
    playground.save("xml", "<a/>").unwrap();
    assert_eq!(playground.load("xml").unwrap(), "<a/>");
    assert!(playground.save("output", "x").is_err());

    let report = playground.update("<a/>", IDENTITY).unwrap();
    assert_eq!(property(&report, "state").as_string().as_deref(), Some("rendered"));
    assert_eq!(property(&report, "type").as_string().as_deref(), Some("XML"));

    let report = playground.update("<a>", IDENTITY).unwrap();
    assert_eq!(property(&report, "state").as_string().as_deref(), Some("parseError"));
    assert!(property(&report, "text").is_null());
    assert!(property(&property(&report, "errors"), "xml").is_string());
}

#[wasm_bindgen_test]
fn test_null_transform_result_is_an_error() {
    let missing: web_sys::Document = JsValue::NULL.unchecked_into();
    assert!(matches!(
        BrowserDocument::from_transform(missing),
        Err(TransformError::Backend(_))
    ));
}

#[wasm_bindgen_test]
fn test_failing_stylesheet_is_reported_not_panicking() {
    let backend = BrowserBackend::new();
    let source = backend.parse("<a/>").into_document().unwrap();
    let broken = backend
        .parse(r#"<xsl:stylesheet version="1.0" xmlns:xsl="http://www.w3.org/1999/XSL/Transform"><xsl:template match="/"><xsl:value-of select="no-such-function()"/></xsl:template></xsl:stylesheet>"#)
        .into_document()
        .unwrap();
    assert!(backend.transform(&source, &broken).is_err());

    let identity = backend.parse(IDENTITY).into_document().unwrap();
    assert!(backend.transform(&source, &identity).is_ok());
}

const PAGE: &str = r#"
<section id="xml"><textarea></textarea><div class="errors"></div></section>
<section id="xslt"><textarea></textarea><div class="errors"></div><ul class="hints" hidden></ul></section>
<section id="output"><span id="output-type"></span><textarea readonly></textarea><div class="errors"></div></section>
"#;

const STYLESHEET_OPEN: &str = r#"<xsl:stylesheet version="1.0" xmlns:xsl="http://www.w3.org/1999/XSL/Transform">"#;

fn area(document: &web_sys::Document, selector: &str) -> HtmlTextAreaElement {
    document.query_selector(selector).unwrap().unwrap().dyn_into().unwrap()
}

#[wasm_bindgen_test]
fn test_mounted_keys_close_tags_and_show_hints() {
    let document = web_sys::window().unwrap().document().unwrap();
    let page = document.create_element("div").unwrap();
    page.set_inner_html(PAGE);
    document.document_element().unwrap().append_child(&page).unwrap();

    let playground =
        XsltPlayground::with_config(r#"{"storagePrefix": "xsltui-keys.", "hintDelayMs": 0}"#).unwrap();
    playground.mount().unwrap();

    let xml = area(&document, "#xml textarea");
    xml.set_value("<a");
    xml.set_selection_range(2, 2).unwrap();
    assert!(playground.press_key("xml", ">").unwrap());
    assert_eq!(xml.value(), "<a></a>");
    assert_eq!(xml.selection_start().unwrap(), Some(3));
    assert!(!playground.press_key("xml", "b").unwrap());
    assert_eq!(playground.load("xml").unwrap(), "<a></a>");

    let xslt = area(&document, "#xslt textarea");
    xslt.set_value(STYLESHEET_OPEN);
    let end = STYLESHEET_OPEN.len() as u32;
    xslt.set_selection_range(end, end).unwrap();
    assert!(playground.press_key("xslt", "<").unwrap());

    let shown: Vec<String> = playground
        .poll_hints("xslt")
        .unwrap()
        .iter()
        .map(|choice| choice.as_string().unwrap())
        .collect();
    assert!(shown.contains(&"<xsl:template".to_string()));
    let popup = document.query_selector("#xslt .hints").unwrap().unwrap();
    assert!(!popup.has_attribute("hidden"));
    assert_eq!(popup.query_selector_all("li").unwrap().length() as usize, shown.len());

    assert!(playground.press_key("xslt", "ArrowDown").unwrap());
    assert!(playground.press_key("xslt", "Enter").unwrap());
    assert_eq!(xslt.value(), format!("{}{}", STYLESHEET_OPEN, shown[1 % shown.len()]));
    assert!(popup.has_attribute("hidden"));

    page.remove();
}
