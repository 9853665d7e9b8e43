//! xsltui: an XSLT playground.
//!
//! The editing model, persistence and the update cycle live in `xsltui-core`; the
//! XSLT 1.0 processor and its XPath engine in `xsltui-xslt` and `xsltui-xpath1`.
//! This crate adds the command line: a JSON file store, one-shot runs and a file
//! watcher.

pub mod cli;
pub mod error;
pub mod store;
pub mod watch;

pub use cli::{Cli, Command, execute};
pub use error::CliError;
pub use store::JsonFileStore;

pub use xsltui_core::{
    EditorId, NativeBackend, Playground, PlaygroundConfig, PlaygroundError, UpdateState,
};
pub use xsltui_xpath1 as xpath;
pub use xsltui_xslt as xslt;
