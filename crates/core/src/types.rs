//! Shared data types passed between panes, backends and the update cycle.

use crate::error::PlaygroundError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Identity of one of the three panes.
///
/// The string form doubles as the storage key suffix and as the lookup key of the
/// pane's error region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EditorId {
    Xml,
    Xslt,
    Output,
}

impl EditorId {
    /// The panes a user can type into.
    pub const EDITABLE: [EditorId; 2] = [EditorId::Xml, EditorId::Xslt];

    pub const ALL: [EditorId; 3] = [EditorId::Xml, EditorId::Xslt, EditorId::Output];

    pub fn as_str(self) -> &'static str {
        match self {
            EditorId::Xml => "xml",
            EditorId::Xslt => "xslt",
            EditorId::Output => "output",
        }
    }

    pub fn is_editable(self) -> bool {
        self != EditorId::Output
    }
}

impl fmt::Display for EditorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EditorId {
    type Err = PlaygroundError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "xml" => Ok(EditorId::Xml),
            "xslt" | "xsl" => Ok(EditorId::Xslt),
            "output" => Ok(EditorId::Output),
            other => Err(PlaygroundError::UnknownPane(other.to_string())),
        }
    }
}

/// Outcome of parsing one pane. The error message is never empty.
#[derive(Debug, Clone, PartialEq)]
pub enum ParseResult<D> {
    Document(D),
    Errors(String),
}

impl<D> ParseResult<D> {
    pub fn document(&self) -> Option<&D> {
        match self {
            ParseResult::Document(doc) => Some(doc),
            ParseResult::Errors(_) => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            ParseResult::Document(_) => None,
            ParseResult::Errors(message) => Some(message),
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, ParseResult::Document(_))
    }

    pub fn into_document(self) -> Option<D> {
        match self {
            ParseResult::Document(doc) => Some(doc),
            ParseResult::Errors(_) => None,
        }
    }
}

/// A rendered transformation: the text shown in the output pane and its type label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransformResult {
    pub kind_label: String,
    pub text: String,
}

/// Emitted by a pane every time its content changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub editor: EditorId,
    pub text: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_editor_id_string_forms() {
        for id in EditorId::ALL {
            assert_eq!(id.as_str().parse::<EditorId>().unwrap(), id);
        }
        assert_eq!(" XSL ".parse::<EditorId>().unwrap(), EditorId::Xslt);
        assert!(matches!(
            "css".parse::<EditorId>(),
            Err(PlaygroundError::UnknownPane(name)) if name == "css"
        ));
        assert_eq!(serde_json::to_string(&EditorId::Xslt).unwrap(), "\"xslt\"");
    }

    #[test]
    fn test_parse_result_accessors() {
        let ok: ParseResult<u8> = ParseResult::Document(1);
        let err: ParseResult<u8> = ParseResult::Errors("bad".into());
        assert_eq!(ok.document(), Some(&1));
        assert_eq!(err.error(), Some("bad"));
        assert!(!err.is_ok());
        assert_eq!(err.into_document(), None);
    }
}
