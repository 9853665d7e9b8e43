use crate::executor::ExecutionError;
use thiserror::Error;
use xsltui_xpath1::XPathError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Location {
    pub line: u32,
    pub col: u32,
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "line {}, column {}", self.line, self.col)
    }
}

impl From<roxmltree::TextPos> for Location {
    fn from(pos: roxmltree::TextPos) -> Self {
        Location {
            line: pos.row,
            col: pos.col,
        }
    }
}

#[derive(Error, Debug)]
pub enum XsltError {
    #[error("XML parsing error: {0}")]
    XmlParse(#[from] roxmltree::Error),

    #[error("XPath error: {0}")]
    XPath(#[from] XPathError),

    #[error("Stylesheet compilation error at {location}: {message}")]
    Compilation { message: String, location: Location },

    #[error("Pattern error in '{pattern}': {message}")]
    Pattern { pattern: String, message: String },

    #[error(transparent)]
    Execution(#[from] ExecutionError),
}
