//! Detection of parser-injected error documents.
//!
//! Browser XML parsers do not fail on malformed input. They return a document
//! containing a `parsererror` element whose text describes the problem. Different
//! engines put that element in different namespaces, so detection walks an ordered
//! table of signatures and the first one found wins.

use crate::types::ParseResult;

pub const XHTML_NAMESPACE: &str = "http://www.w3.org/1999/xhtml";
pub const MOZILLA_PARSERERROR_NAMESPACE: &str = "http://www.mozilla.org/newlayout/xml/parsererror.xml";

/// Used when a marker or parser error carries no text.
pub const GENERIC_PARSE_ERROR: &str = "XML parse error";

const BOILERPLATE: [&str; 2] = [
    "This page contains the following errors:",
    "Below is a rendering of the page up to the first error.",
];

/// Identifies an error marker element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarkerSignature {
    pub local: &'static str,
    /// `None` matches the local name in any namespace, or none.
    pub namespace: Option<&'static str>,
}

pub const PARSE_ERROR_MARKERS: [MarkerSignature; 3] = [
    MarkerSignature {
        local: "parsererror",
        namespace: None,
    },
    MarkerSignature {
        local: "parsererror",
        namespace: Some(XHTML_NAMESPACE),
    },
    MarkerSignature {
        local: "parsererror",
        namespace: Some(MOZILLA_PARSERERROR_NAMESPACE),
    },
];

/// A parsed document that can be searched for error markers.
pub trait MarkerSource {
    /// Text content of the first element matching `signature`, in document order.
    fn marker_text(&self, signature: &MarkerSignature) -> Option<String>;
}

/// Removes the explanatory phrases engines wrap around the actual message.
pub fn clean_marker_text(text: &str) -> String {
    BOILERPLATE
        .iter()
        .fold(text.to_string(), |acc, phrase| acc.replace(phrase, ""))
}

/// The cleaned message of the first marker found, if any.
pub fn find_parse_error<D: MarkerSource + ?Sized>(doc: &D) -> Option<String> {
    PARSE_ERROR_MARKERS.iter().find_map(|signature| {
        doc.marker_text(signature).map(|text| {
            let cleaned = clean_marker_text(&text);
            if cleaned.trim().is_empty() {
                GENERIC_PARSE_ERROR.to_string()
            } else {
                cleaned
            }
        })
    })
}

/// Wraps `doc` into a [`ParseResult`], reporting it as an error if it carries a marker.
pub fn check_document<D: MarkerSource>(doc: D) -> ParseResult<D> {
    match find_parse_error(&doc) {
        Some(message) => {
            log::debug!("Parser error marker found: {}", message.trim());
            ParseResult::Errors(message)
        }
        None => ParseResult::Document(doc),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Markers as (namespace, text) pairs in document order.
    struct FakeDoc(Vec<(Option<&'static str>, &'static str)>);

    impl MarkerSource for FakeDoc {
        fn marker_text(&self, signature: &MarkerSignature) -> Option<String> {
            self.0
                .iter()
                .find(|(ns, _)| signature.namespace.is_none() || *ns == signature.namespace)
                .map(|(_, text)| text.to_string())
        }
    }

    #[test]
    fn test_clean_marker_text_strips_both_phrases() {
        let cleaned = clean_marker_text(
            "This page contains the following errors:\nReason. Below is a rendering of the page up to the first error.",
        );
        assert_eq!(cleaned, "\nReason. ");
    }

    #[test]
    fn test_first_signature_wins() {
        let doc = FakeDoc(vec![(Some(MOZILLA_PARSERERROR_NAMESPACE), "mozilla says no")]);
        assert_eq!(find_parse_error(&doc).as_deref(), Some("mozilla says no"));
        assert!(matches!(check_document(doc), ParseResult::Errors(_)));
    }

    #[test]
    fn test_empty_marker_gets_generic_message() {
        let doc = FakeDoc(vec![(Some(XHTML_NAMESPACE), "Below is a rendering of the page up to the first error.")]);
        assert_eq!(find_parse_error(&doc).as_deref(), Some(GENERIC_PARSE_ERROR));
    }

    #[test]
    fn test_clean_document_passes() {
        assert!(check_document(FakeDoc(vec![])).is_ok());
    }
}
