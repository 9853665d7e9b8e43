//! The public entry point: a compiled stylesheet ready to transform documents.

use crate::ast::{CompiledStylesheet, OutputSettings};
use crate::compiler;
use crate::datasources::{SpaceRules, XmlNode};
use crate::error::XsltError;
use crate::executor::{DEFAULT_MAX_DEPTH, ExecutionError, TemplateExecutor};
use crate::output::{ResultTree, TreeBuilder};
use crate::serializer;
use roxmltree::Document;
use std::collections::HashMap;
use std::sync::Arc;
use std::{panic, thread};

/// Stack size of the thread a transformation runs on. Each nesting level counted
/// against the depth limit costs a few kilobytes, more in debug builds.
pub const TRANSFORM_STACK_SIZE: usize = 128 * 1024 * 1024;

/// The result of one transformation.
#[derive(Debug, Clone, PartialEq)]
pub struct TransformOutput {
    pub tree: ResultTree,
    /// Text of every `xsl:message` emitted, in order.
    pub messages: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct XsltProcessor {
    compiled: Arc<CompiledStylesheet>,
    space: SpaceRules,
    parameters: HashMap<String, String>,
    max_depth: usize,
}

impl XsltProcessor {
    /// Parses and compiles stylesheet text.
    pub fn compile(source: &str) -> Result<Self, XsltError> {
        let doc = compiler::parse_document(source)?;
        Self::from_document(&doc)
    }

    /// Compiles an already parsed stylesheet document.
    pub fn from_document(doc: &Document<'_>) -> Result<Self, XsltError> {
        let compiled = compiler::compile_document(doc)?;
        let space = SpaceRules::new(compiled.strip_space.clone(), compiled.preserve_space.clone());
        Ok(XsltProcessor {
            compiled: Arc::new(compiled),
            space,
            parameters: HashMap::new(),
            max_depth: DEFAULT_MAX_DEPTH,
        })
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Sets a top-level `xsl:param` to a string value.
    pub fn set_parameter(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.parameters.insert(name.into(), value.into());
    }

    pub fn stylesheet(&self) -> &CompiledStylesheet {
        &self.compiled
    }

    pub fn output(&self) -> &OutputSettings {
        &self.compiled.output
    }

    /// Transforms `doc` on a dedicated thread with a [`TRANSFORM_STACK_SIZE`] stack,
    /// so hitting the depth limit is an error rather than a stack overflow.
    pub fn transform(&self, doc: &Document<'_>) -> Result<TransformOutput, XsltError> {
        thread::scope(|scope| {
            let worker = thread::Builder::new()
                .name("xslt-transform".to_string())
                .stack_size(TRANSFORM_STACK_SIZE)
                .spawn_scoped(scope, || self.transform_on_current_thread(doc))
                .map_err(|e| XsltError::Execution(ExecutionError::Thread(e.to_string())))?;
            worker.join().unwrap_or_else(|payload| panic::resume_unwind(payload))
        })
    }

    fn transform_on_current_thread(&self, doc: &Document<'_>) -> Result<TransformOutput, XsltError> {
        let root = XmlNode::root(doc, &self.space);
        let mut executor = TemplateExecutor::new(&self.compiled, root).with_max_depth(self.max_depth);
        let mut builder = TreeBuilder::new();
        executor.run(&self.parameters, &mut builder)?;
        Ok(TransformOutput {
            tree: builder.finish(),
            messages: executor.messages().to_vec(),
        })
    }

    /// Parses `source` and transforms it.
    pub fn transform_str(&self, source: &str) -> Result<TransformOutput, XsltError> {
        let doc = compiler::parse_document(source)?;
        self.transform(&doc)
    }

    /// Serializes a result with this stylesheet's `xsl:output` settings.
    pub fn serialize(&self, tree: &ResultTree) -> String {
        serializer::serialize(tree, &self.compiled.output)
    }

    pub fn transform_to_string(&self, source: &str) -> Result<String, XsltError> {
        let output = self.transform_str(source)?;
        Ok(self.serialize(&output.tree))
    }
}
