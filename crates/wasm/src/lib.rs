//! WebAssembly bindings for the xsltui playground.
//!
//! The browser build runs the same update cycle as the native one, with the browser's
//! own engines plugged in:
//!
//! - [`backend`]: `DOMParser` for parsing and `XSLTProcessor` for transforming
//! - [`storage`]: `window.localStorage`, falling back to memory when it fails
//! - [`dom`]: error regions, output pane and default content read from the page
//! - [`playground`]: the exported `XsltPlayground` class
//! - [`error`]: errors as JavaScript `Error` objects with a `code` property
//!
//! # Example
//!
//! ```javascript
//! import init, { XsltPlayground } from '@xsltui/wasm';
//!
//! await init();
//! new XsltPlayground().mount();
//! ```

pub mod backend;
pub mod dom;
mod error;
mod playground;
pub mod storage;

pub use backend::{BrowserBackend, BrowserDocument};
pub use error::{ErrorCode, XsltuiError};
pub use playground::XsltPlayground;
pub use storage::LocalStorage;

use wasm_bindgen::prelude::*;
use xsltui_core::{EditorId, defaults};

/// Initialize the WASM module.
///
/// Sets up panic hooks for better error messages in the browser console.
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();

    #[cfg(feature = "console-logging")]
    {
        console_log::init_with_level(log::Level::Debug).ok();
    }
}

/// Get the version of the xsltui-wasm library.
#[wasm_bindgen(js_name = getVersion)]
pub fn get_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

/// The built-in default content of `pane` ("xml" or "xslt").
#[wasm_bindgen(js_name = defaultDocument)]
pub fn default_document(pane: &str) -> Result<String, JsValue> {
    let editor: EditorId = pane.parse().map_err(XsltuiError::from)?;
    Ok(defaults::default_document(editor))
}
