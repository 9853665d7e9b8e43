//! The native engine: `roxmltree` parsing and the `xsltui-xslt` processor.

use crate::error::TransformError;
use crate::parse::{self, MarkerSignature, MarkerSource};
use crate::transform::{self, XSLT_NAMESPACE, XmlEngine};
use crate::types::{ParseResult, TransformResult};
use roxmltree::{Document, ParsingOptions};
use xsltui_xslt::executor::DEFAULT_MAX_DEPTH;
use xsltui_xslt::{XsltProcessor, serialize};

impl MarkerSource for Document<'_> {
    fn marker_text(&self, signature: &MarkerSignature) -> Option<String> {
        self.descendants()
            .filter(|node| node.is_element())
            .find(|node| {
                let name = node.tag_name();
                name.name() == signature.local
                    && signature.namespace.is_none_or(|ns| name.namespace() == Some(ns))
            })
            .map(|marker| {
                marker
                    .descendants()
                    .filter(|node| node.is_text())
                    .filter_map(|node| node.text())
                    .collect()
            })
    }
}

#[derive(Debug, Clone)]
pub struct NativeBackend {
    max_depth: usize,
}

impl Default for NativeBackend {
    fn default() -> Self {
        NativeBackend {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl NativeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Limits template recursion; deeper transforms fail with a [`TransformError`].
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }
}

/// The `method` of the first `xsl:output` element in the stylesheet, if any.
fn declared_method<'a>(stylesheet: &'a Document<'_>) -> Option<&'a str> {
    stylesheet
        .descendants()
        .find(|node| {
            node.is_element()
                && node.tag_name().namespace() == Some(XSLT_NAMESPACE)
                && node.tag_name().name() == "output"
        })
        .and_then(|node| node.attribute("method"))
}

impl XmlEngine for NativeBackend {
    type Document<'t> = Document<'t>;

    fn parse<'t>(&self, text: &'t str) -> ParseResult<Document<'t>> {
        let options = ParsingOptions {
            allow_dtd: true,
            ..ParsingOptions::default()
        };
        match Document::parse_with_options(text, options) {
            Ok(doc) => parse::check_document(doc),
            Err(e) => ParseResult::Errors(e.to_string()),
        }
    }

    fn transform(
        &self,
        source: &Document<'_>,
        stylesheet: &Document<'_>,
    ) -> Result<TransformResult, TransformError> {
        let processor = XsltProcessor::from_document(stylesheet)?.with_max_depth(self.max_depth);
        let output = processor.transform(source)?;
        for message in &output.messages {
            log::debug!("xsl:message: {}", message);
        }

        // Browsers serialize the result document without an XML declaration.
        let mut settings = processor.output().clone();
        settings.omit_xml_declaration = true;
        let text = serialize(&output.tree, &settings);

        let method = transform::output_method(declared_method(stylesheet));
        Ok(TransformResult::for_method(method, text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::GENERIC_PARSE_ERROR;

    fn stylesheet(body: &str) -> String {
        format!(
            r#"<xsl:stylesheet version="1.0" xmlns:xsl="http://www.w3.org/1999/XSL/Transform">{}</xsl:stylesheet>"#,
            body
        )
    }

    fn apply(xml: &str, xslt: &str) -> Result<TransformResult, TransformError> {
        let _ = env_logger::builder().is_test(true).try_init();
        let backend = NativeBackend::new();
        let source = backend.parse(xml).into_document().unwrap();
        let stylesheet = backend.parse(xslt).into_document().unwrap();
        backend.transform(&source, &stylesheet)
    }

    #[test]
    fn test_valid_documents_parse() {
        let backend = NativeBackend::new();
        assert!(backend.parse("<a><b x='1'/>text</a>").is_ok());
        assert!(backend.parse(&stylesheet("")).is_ok());
    }

    #[test]
    fn test_syntax_errors_are_reported() {
        let backend = NativeBackend::new();
        for text in ["<a>1 < 2</a>", "<a><b></a>", "", "<a"] {
            let result = backend.parse(text);
            let message = result.error().unwrap_or_default();
            assert!(!message.is_empty(), "{:?} should fail to parse", text);
        }
    }

    #[test]
    fn test_literal_marker_is_a_parse_error() {
        let backend = NativeBackend::new();
        let result = backend.parse(
            "<html xmlns='http://www.w3.org/1999/xhtml'><parsererror>This page contains the following errors:Oops</parsererror></html>",
        );
        assert_eq!(result.error(), Some("Oops"));
        assert_eq!(backend.parse("<parsererror/>").error(), Some(GENERIC_PARSE_ERROR));
    }

    #[test]
    fn test_html_method_label() {
        let result = apply(
            "<a/>",
            &stylesheet(r#"<xsl:output method="html"/><xsl:template match="/"><p>hi<br/></p></xsl:template>"#),
        )
        .unwrap();
        assert_eq!(result.kind_label, "HTML");
        assert_eq!(result.text, "<p>hi<br></p>");
    }

    #[test]
    fn test_text_method() {
        let result = apply(
            "<a>hello</a>",
            &stylesheet(r#"<xsl:output method="text"/><xsl:template match="/"><xsl:value-of select="a"/></xsl:template>"#),
        )
        .unwrap();
        assert_eq!(result, TransformResult::for_method("text", "hello"));
        assert_eq!(result.kind_label, "Text");
    }

    #[test]
    fn test_identity_without_output_is_xml() {
        let result = apply(
            "<a/>",
            &stylesheet(
                r#"<xsl:template match="@*|node()"><xsl:copy><xsl:apply-templates select="@*|node()"/></xsl:copy></xsl:template>"#,
            ),
        )
        .unwrap();
        assert_eq!(result.kind_label, "XML");
        assert_eq!(result.text, "<a/>");
    }

    #[test]
    fn test_failures_are_transform_errors() {
        assert!(matches!(
            apply("<a/>", &stylesheet("<xsl:frobnicate/>")),
            Err(TransformError::Stylesheet(_))
        ));
        let looping = stylesheet(
            r#"<xsl:template match="/"><xsl:call-template name="loop"/></xsl:template>
               <xsl:template name="loop"><xsl:call-template name="loop"/></xsl:template>"#,
        );
        let backend = NativeBackend::new().with_max_depth(20);
        let source = backend.parse("<a/>").into_document().unwrap();
        let stylesheet = backend.parse(&looping).into_document().unwrap();
        assert!(matches!(
            backend.transform(&source, &stylesheet),
            Err(TransformError::Execution(message)) if message.contains("20")
        ));
    }
}
