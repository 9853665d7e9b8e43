//! # xsltui-core
//!
//! Platform-agnostic core of the XSLT playground.
//!
//! The playground has three panes: an XML source, an XSLT stylesheet and a read-only
//! output. Every edit to an editable pane is saved and then runs one update cycle:
//! parse both panes, report parse errors per pane, otherwise transform and render.
//!
//! Everything a host environment provides is behind a trait:
//! - [`KeyValueStore`] for persistence,
//! - [`XmlEngine`] for parsing and transforming,
//! - [`ErrorReporter`] and [`OutputSink`] for presenting results.
//!
//! The `native` feature (on by default) adds [`native::NativeBackend`], built on
//! `roxmltree` and `xsltui-xslt`. The browser build supplies its own engine.

pub mod autoclose;
pub mod buffer;
pub mod config;
pub mod defaults;
pub mod error;
pub mod hint;
#[cfg(feature = "native")]
pub mod native;
pub mod orchestrator;
pub mod pane;
pub mod parse;
pub mod persistence;
pub mod reporter;
pub mod session;
pub mod storage;
pub mod transform;
pub mod types;

pub use buffer::TextBuffer;
pub use config::PlaygroundConfig;
pub use error::{PlaygroundError, StorageError, TransformError};
pub use hint::{CompletionContext, HintScheduler, HintSchema, Suggestions};
pub use orchestrator::{UpdateOrchestrator, UpdateState};
pub use pane::{ChangeListener, EditorPane, PaneOptions, SubscriptionId};
pub use parse::{MarkerSignature, PARSE_ERROR_MARKERS};
pub use persistence::Persistence;
pub use reporter::{ErrorRegions, ErrorReporter, OutputPanel, OutputSink};
pub use session::Playground;
pub use storage::{FallbackStore, KeyValueStore, MemoryStore};
pub use transform::XmlEngine;
pub use types::{ChangeEvent, EditorId, ParseResult, TransformResult};
pub use web_time::Instant;

#[cfg(feature = "native")]
pub use native::NativeBackend;
