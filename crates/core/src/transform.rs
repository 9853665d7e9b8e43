//! The parse and transform steps as seen by the update cycle.

use crate::error::TransformError;
use crate::types::{ParseResult, TransformResult};

pub const XSLT_NAMESPACE: &str = "http://www.w3.org/1999/XSL/Transform";

/// The method assumed when a stylesheet declares none.
pub const DEFAULT_OUTPUT_METHOD: &str = "xml";

/// An XML parser plus XSLT processor.
pub trait XmlEngine {
    /// A parsed document. It may borrow the text it was parsed from.
    type Document<'t>;

    /// Parses pane text. Malformed input is reported as [`ParseResult::Errors`].
    fn parse<'t>(&self, text: &'t str) -> ParseResult<Self::Document<'t>>;

    /// Compiles `stylesheet` and applies it to `source`.
    fn transform(
        &self,
        source: &Self::Document<'_>,
        stylesheet: &Self::Document<'_>,
    ) -> Result<TransformResult, TransformError>;
}

/// Resolves the value of `xsl:output/@method`. An empty attribute counts as absent.
pub fn output_method(declared: Option<&str>) -> &str {
    match declared {
        Some(method) if !method.is_empty() => method,
        _ => DEFAULT_OUTPUT_METHOD,
    }
}

pub fn is_text_method(method: &str) -> bool {
    method == "text"
}

/// The display label of a result produced with `method`.
pub fn label_for_method(method: &str) -> String {
    if is_text_method(method) {
        "Text".to_string()
    } else {
        method.to_uppercase()
    }
}

impl TransformResult {
    pub fn for_method(method: &str, text: impl Into<String>) -> Self {
        TransformResult {
            kind_label: label_for_method(method),
            text: text.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_defaults_and_labels() {
        assert_eq!(output_method(None), "xml");
        assert_eq!(output_method(Some("")), "xml");
        assert_eq!(output_method(Some("html")), "html");
        assert_eq!(label_for_method("html"), "HTML");
        assert_eq!(label_for_method("xhtml"), "XHTML");
        assert_eq!(label_for_method("text"), "Text");
        assert_eq!(label_for_method("TEXT"), "TEXT");
        assert_eq!(TransformResult::for_method("xml", "<a/>").kind_label, "XML");
    }
}
