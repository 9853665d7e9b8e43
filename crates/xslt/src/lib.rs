//! An XSLT 1.0 processor.
//!
//! Stylesheets are compiled once into an [`XsltProcessor`] and can then transform any
//! number of `roxmltree` documents. Results are built as a [`ResultTree`] and serialized
//! according to the stylesheet's `xsl:output` declaration (XML, HTML or text).

pub mod ast;
pub mod compiler;
pub mod datasources;
pub mod error;
pub mod executor;
pub mod output;
pub mod pattern;
pub mod processor;
pub mod serializer;

mod compiler_handlers;
mod executor_handlers;
mod util;

pub use ast::{CompiledStylesheet, OutputMethod, OutputSettings, XSLT_NAMESPACE};
pub use error::{Location, XsltError};
pub use executor::ExecutionError;
pub use output::{OutputBuilder, ResultNode, ResultTree, TreeBuilder};
pub use processor::{TransformOutput, XsltProcessor};
pub use serializer::serialize;
