use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum XPathError {
    #[error("XPath syntax error in '{expression}': {message}")]
    Syntax { expression: String, message: String },

    #[error("Function '{function}' error: {message}")]
    FunctionError { function: String, message: String },

    #[error("Type error: {0}")]
    TypeError(String),

    #[error("Reference to undeclared variable: ${0}")]
    UnknownVariable(String),

    #[error("Undeclared namespace prefix '{0}'")]
    UnknownPrefix(String),

    #[error("Unknown key '{0}'")]
    UnknownKey(String),
}

impl XPathError {
    pub(crate) fn function(function: &str, message: impl Into<String>) -> Self {
        XPathError::FunctionError {
            function: function.to_string(),
            message: message.into(),
        }
    }
}
