//! Error handling for WASM bindings.
//!
//! Converts playground errors into JavaScript `Error` objects carrying a `code` property.

use thiserror::Error;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use xsltui_core::{PlaygroundError, StorageError, TransformError};

/// Error codes for TypeScript consumption.
#[wasm_bindgen]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// Unknown pane name or invalid configuration
    Config,
    /// Storage read/write failure
    Storage,
    /// Stylesheet compilation or application failure
    Transform,
    /// A read-only pane was edited
    ReadOnly,
    /// Missing DOM element or browser API
    Dom,
}

impl ErrorCode {
    fn as_str(self) -> &'static str {
        match self {
            ErrorCode::Config => "CONFIG_ERROR",
            ErrorCode::Storage => "STORAGE_ERROR",
            ErrorCode::Transform => "TRANSFORM_ERROR",
            ErrorCode::ReadOnly => "READ_ONLY_ERROR",
            ErrorCode::Dom => "DOM_ERROR",
        }
    }
}

#[derive(Error, Debug)]
#[error("{message}")]
pub struct XsltuiError {
    code: ErrorCode,
    message: String,
}

impl XsltuiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn dom(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Dom, message)
    }

    pub fn code(&self) -> ErrorCode {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<PlaygroundError> for XsltuiError {
    fn from(err: PlaygroundError) -> Self {
        let code = match &err {
            PlaygroundError::Storage(_) => ErrorCode::Storage,
            PlaygroundError::Transform(_) => ErrorCode::Transform,
            PlaygroundError::ReadOnly(_) => ErrorCode::ReadOnly,
            PlaygroundError::UnknownPane(_) | PlaygroundError::Config(_) => ErrorCode::Config,
        };
        Self::new(code, err.to_string())
    }
}

impl From<StorageError> for XsltuiError {
    fn from(err: StorageError) -> Self {
        Self::new(ErrorCode::Storage, err.to_string())
    }
}

impl From<XsltuiError> for JsValue {
    fn from(err: XsltuiError) -> Self {
        let js_error = js_sys::Error::new(&err.message);
        js_sys::Reflect::set(&js_error, &"code".into(), &JsValue::from_str(err.code.as_str())).ok();
        js_error.into()
    }
}

/// The message of a thrown JavaScript value.
pub(crate) fn js_message(value: &JsValue) -> String {
    if let Some(error) = value.dyn_ref::<js_sys::Error>() {
        return String::from(error.message());
    }
    value.as_string().unwrap_or_else(|| format!("{:?}", value))
}

pub(crate) fn storage_error(value: JsValue) -> StorageError {
    StorageError::Unavailable(js_message(&value))
}

pub(crate) fn transform_error(value: JsValue) -> TransformError {
    TransformError::Backend(js_message(&value))
}
