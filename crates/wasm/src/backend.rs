//! The browser engine: `DOMParser`, `XSLTProcessor` and `XMLSerializer`.

use crate::error::{js_message, transform_error};
use wasm_bindgen::JsValue;
use web_sys::{DomParser, Element, SupportedType, XmlSerializer, XsltProcessor};
use xsltui_core::parse::{self, MarkerSignature, MarkerSource};
use xsltui_core::transform::{self, XSLT_NAMESPACE, XmlEngine};
use xsltui_core::{ParseResult, TransformError, TransformResult};

/// Gecko wraps `method="text"` results in this element.
pub const TRANSFORMIIX_NAMESPACE: &str = "http://www.mozilla.org/TransforMiix";

/// A document produced by `DOMParser`.
#[derive(Debug, Clone)]
pub struct BrowserDocument(pub web_sys::Document);

impl BrowserDocument {
    /// Wraps the document returned by `transformToDocument`. Blink and WebKit report
    /// a failed transform by returning `null` instead of throwing.
    pub fn from_transform(result: web_sys::Document) -> Result<Self, TransformError> {
        let value: &JsValue = result.as_ref();
        if value.is_null() || value.is_undefined() {
            return Err(TransformError::Backend("The XSLT transformation failed".to_string()));
        }
        Ok(BrowserDocument(result))
    }

    fn first_element(&self, namespace: Option<&str>, local: &str) -> Option<Element> {
        match namespace {
            None => self.0.get_elements_by_tag_name(local).item(0),
            Some(ns) => self
                .0
                .get_elements_by_tag_name_ns(Some(ns), local)
                .ok()
                .and_then(|found| found.item(0)),
        }
    }
}

impl MarkerSource for BrowserDocument {
    fn marker_text(&self, signature: &MarkerSignature) -> Option<String> {
        self.first_element(signature.namespace, signature.local)
            .map(|marker| marker.text_content().unwrap_or_default())
    }
}

#[derive(Debug, Clone, Default)]
pub struct BrowserBackend;

impl BrowserBackend {
    pub fn new() -> Self {
        BrowserBackend
    }
}

impl XmlEngine for BrowserBackend {
    type Document<'t> = BrowserDocument;

    fn parse<'t>(&self, text: &'t str) -> ParseResult<BrowserDocument> {
        let parsed = DomParser::new().and_then(|parser| parser.parse_from_string(text, SupportedType::TextXml));
        match parsed {
            Ok(doc) => parse::check_document(BrowserDocument(doc)),
            Err(e) => ParseResult::Errors(js_message(&e)),
        }
    }

    fn transform(
        &self,
        source: &BrowserDocument,
        stylesheet: &BrowserDocument,
    ) -> Result<TransformResult, TransformError> {
        let processor = XsltProcessor::new().map_err(transform_error)?;
        processor.import_stylesheet(&stylesheet.0).map_err(transform_error)?;
        let result = BrowserDocument::from_transform(
            processor.transform_to_document(&source.0).map_err(transform_error)?,
        )?;

        let declared = stylesheet
            .first_element(Some(XSLT_NAMESPACE), "output")
            .and_then(|output| output.get_attribute("method"));
        let method = transform::output_method(declared.as_deref());

        let text = if transform::is_text_method(method) {
            result
                .first_element(Some(TRANSFORMIIX_NAMESPACE), "result")
                .or_else(|| result.first_element(None, "pre"))
                .ok_or(TransformError::MissingTextResult)?
                .text_content()
                .unwrap_or_default()
        } else {
            XmlSerializer::new()
                .and_then(|serializer| serializer.serialize_to_string(&result.0))
                .map_err(transform_error)?
        };
        Ok(TransformResult::for_method(method, text))
    }
}
