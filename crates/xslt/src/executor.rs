//! The template executor: runs a [`CompiledStylesheet`] against a source tree,
//! driving an [`OutputBuilder`]. It implements the XSLT "push" model.

use crate::ast::{
    AttributeValueTemplate, AvtPart, CompiledStylesheet, Param, PreparsedTemplate, SortDataType,
    SortKey, SortOrder, TemplateRule, VariableValue, WithParam, XsltInstruction,
};
use crate::executor_handlers::{
    apply_templates, call_template, control_flow, copy, for_each, literals, number, variables,
};
use crate::output::{OutputBuilder, ResultTree, TreeBuilder};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::marker::PhantomData;
use thiserror::Error;
use xsltui_xpath1::engine::{EvaluationContext, KeyIndexes, VariableResolver, XPathValue, evaluate};
use xsltui_xpath1::{DataSourceNode, NodeType, XPathError};

/// How deeply template bodies may nest. Every template call and every nested
/// instruction body (`for-each`, `if`, literal elements, variable content...) is
/// one level.
pub const DEFAULT_MAX_DEPTH: usize = 2048;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExecutionError {
    #[error(transparent)]
    XPath(#[from] XPathError),

    #[error("No template named '{0}'")]
    UnknownNamedTemplate(String),

    #[error("Templates are nested deeper than {0} levels")]
    RecursionLimit(usize),

    #[error("Transformation terminated by xsl:message: {0}")]
    Terminated(String),

    #[error("'{0}' is not a valid name for a result node")]
    InvalidName(String),

    #[error("Could not start the transform thread: {0}")]
    Thread(String),
}

/// A variable value. Variables built from content hold a result tree fragment.
#[derive(Debug, Clone)]
pub(crate) enum Binding<N> {
    Value(XPathValue<N>),
    Fragment(ResultTree),
}

/// Lexically scoped variables. The first frame holds the globals.
pub(crate) struct VariableStack<N> {
    frames: Vec<Vec<(String, Binding<N>)>>,
}

impl<N: Clone> VariableStack<N> {
    fn new() -> Self {
        VariableStack {
            frames: vec![Vec::new()],
        }
    }

    pub(crate) fn binding(&self, name: &str) -> Option<&Binding<N>> {
        self.frames
            .iter()
            .rev()
            .flat_map(|frame| frame.iter().rev())
            .find(|(n, _)| n == name)
            .map(|(_, binding)| binding)
    }

    fn set(&mut self, name: String, binding: Binding<N>) {
        if let Some(frame) = self.frames.last_mut() {
            frame.push((name, binding));
        }
    }
}

impl<N: Clone> VariableResolver<N> for VariableStack<N> {
    fn resolve(&self, name: &str) -> Option<XPathValue<N>> {
        self.binding(name).map(|binding| match binding {
            Binding::Value(value) => value.clone(),
            Binding::Fragment(tree) => XPathValue::String(tree.string_value()),
        })
    }
}

pub struct TemplateExecutor<'s, 'a, N: DataSourceNode<'a>> {
    pub(crate) stylesheet: &'s CompiledStylesheet,
    pub(crate) root_node: N,
    pub(crate) variables: VariableStack<N>,
    key_indexes: KeyIndexes<N>,
    depth: usize,
    max_depth: usize,
    pub(crate) messages: Vec<String>,
    _marker: PhantomData<&'a ()>,
}

impl<'s, 'a, N: DataSourceNode<'a> + 'a> TemplateExecutor<'s, 'a, N> {
    pub fn new(stylesheet: &'s CompiledStylesheet, root_node: N) -> Self {
        Self {
            stylesheet,
            root_node,
            variables: VariableStack::new(),
            key_indexes: KeyIndexes::new(),
            depth: 0,
            max_depth: DEFAULT_MAX_DEPTH,
            messages: Vec::new(),
            _marker: PhantomData,
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Messages emitted by `xsl:message` so far.
    pub fn messages(&self) -> &[String] {
        &self.messages
    }

    /// Runs the transformation, starting with the root node in the default mode.
    pub fn run(
        &mut self,
        parameters: &HashMap<String, String>,
        builder: &mut dyn OutputBuilder,
    ) -> Result<(), ExecutionError> {
        self.build_key_indexes()?;
        self.bind_globals(parameters)?;
        let root = self.root_node;
        self.apply_templates_to_nodes(&[root], None, Vec::new(), builder)
    }

    // --- Setup ---

    fn build_key_indexes(&mut self) -> Result<(), ExecutionError> {
        if self.stylesheet.keys.is_empty() {
            return Ok(());
        }
        let mut all_nodes = Vec::new();
        collect_nodes(self.root_node, &mut all_nodes);

        let stylesheet = self.stylesheet;
        let mut indexes = KeyIndexes::new();
        for key in &stylesheet.keys {
            let index: &mut HashMap<String, Vec<N>> = indexes.entry(key.name.clone()).or_default();
            for &node in &all_nodes {
                let e_ctx = self.get_eval_context(node, 1, 1);
                if !key.pattern.matches(node, &e_ctx)? {
                    continue;
                }
                let values = match evaluate(&key.use_expr, &e_ctx)? {
                    XPathValue::NodeSet(nodes) => nodes.iter().map(|n| n.string_value()).collect(),
                    other => vec![other.to_string()],
                };
                for value in values {
                    let entry = index.entry(value).or_default();
                    if !entry.contains(&node) {
                        entry.push(node);
                    }
                }
            }
        }
        log::debug!("Built {} key index(es) over {} nodes", indexes.len(), all_nodes.len());
        self.key_indexes = indexes;
        Ok(())
    }

    /// Evaluates global variables in declaration order. A global that refers to one
    /// declared later is retried once its dependency is bound.
    fn bind_globals(&mut self, parameters: &HashMap<String, String>) -> Result<(), ExecutionError> {
        let stylesheet = self.stylesheet;
        let mut pending: Vec<_> = stylesheet.global_variables.iter().collect();
        let root = self.root_node;
        while !pending.is_empty() {
            let mut deferred = Vec::new();
            let mut first_error = None;
            for global in pending.iter().copied() {
                if global.is_param {
                    if let Some(value) = parameters.get(&global.name) {
                        self.variables.set(
                            global.name.clone(),
                            Binding::Value(XPathValue::String(value.clone())),
                        );
                        continue;
                    }
                }
                match self.evaluate_variable_value(&global.value, root, 1, 1) {
                    Ok(binding) => self.variables.set(global.name.clone(), binding),
                    Err(ExecutionError::XPath(XPathError::UnknownVariable(name))) => {
                        first_error.get_or_insert(name);
                        deferred.push(global);
                    }
                    Err(e) => return Err(e),
                }
            }
            if deferred.len() == pending.len() {
                let name = first_error.unwrap_or_default();
                return Err(XPathError::UnknownVariable(name).into());
            }
            pending = deferred;
        }
        Ok(())
    }

    // --- Scope Management ---

    pub(crate) fn push_scope(&mut self) {
        self.variables.frames.push(Vec::new());
    }

    pub(crate) fn pop_scope(&mut self) {
        if self.variables.frames.len() > 1 {
            self.variables.frames.pop();
        }
    }

    pub(crate) fn set_variable_in_current_scope(&mut self, name: String, binding: Binding<N>) {
        self.variables.set(name, binding);
    }

    pub(crate) fn get_eval_context(
        &self,
        context_node: N,
        context_position: usize,
        context_size: usize,
    ) -> EvaluationContext<'a, '_, N> {
        let mut e_ctx = EvaluationContext::new(
            context_node,
            self.root_node,
            &self.variables,
            &self.key_indexes,
            &self.stylesheet.namespaces,
        );
        e_ctx.context_position = context_position;
        e_ctx.context_size = context_size;
        e_ctx
    }

    // --- Execution ---

    /// Processes a list of instructions from a template body in a fresh variable scope.
    pub(crate) fn execute_template(
        &mut self,
        template: &PreparsedTemplate,
        context_node: N,
        context_position: usize,
        context_size: usize,
        builder: &mut dyn OutputBuilder,
    ) -> Result<(), ExecutionError> {
        if self.depth >= self.max_depth {
            return Err(ExecutionError::RecursionLimit(self.max_depth));
        }
        self.depth += 1;
        self.push_scope();
        let result =
            self.execute_instructions(template, context_node, context_position, context_size, builder);
        self.pop_scope();
        self.depth -= 1;
        result
    }

    fn execute_instructions(
        &mut self,
        template: &PreparsedTemplate,
        context_node: N,
        context_position: usize,
        context_size: usize,
        builder: &mut dyn OutputBuilder,
    ) -> Result<(), ExecutionError> {
        for instruction in &template.0 {
            self.execute_instruction(instruction, context_node, context_position, context_size, builder)?;
        }
        Ok(())
    }

    /// Runs a template body into a detached tree, for variables, attributes and messages.
    pub(crate) fn execute_to_tree(
        &mut self,
        template: &PreparsedTemplate,
        context_node: N,
        context_position: usize,
        context_size: usize,
    ) -> Result<ResultTree, ExecutionError> {
        let mut tree_builder = TreeBuilder::new();
        self.execute_template(template, context_node, context_position, context_size, &mut tree_builder)?;
        Ok(tree_builder.finish())
    }

    pub(crate) fn evaluate_avt(
        &self,
        avt: &AttributeValueTemplate,
        e_ctx: &EvaluationContext<'a, '_, N>,
    ) -> Result<String, ExecutionError> {
        match avt {
            AttributeValueTemplate::Static(s) => Ok(s.clone()),
            AttributeValueTemplate::Dynamic(parts) => {
                let mut result = String::new();
                for part in parts {
                    match part {
                        AvtPart::Static(s) => result.push_str(s),
                        AvtPart::Dynamic(expression) => {
                            result.push_str(&evaluate(expression, e_ctx)?.to_string())
                        }
                    }
                }
                Ok(result)
            }
        }
    }

    pub(crate) fn evaluate_variable_value(
        &mut self,
        value: &VariableValue,
        context_node: N,
        context_position: usize,
        context_size: usize,
    ) -> Result<Binding<N>, ExecutionError> {
        match value {
            VariableValue::Select(expr) => {
                let e_ctx = self.get_eval_context(context_node, context_position, context_size);
                Ok(Binding::Value(evaluate(expr, &e_ctx)?))
            }
            VariableValue::Content(body) => Ok(Binding::Fragment(self.execute_to_tree(
                body,
                context_node,
                context_position,
                context_size,
            )?)),
            VariableValue::Empty => Ok(Binding::Value(XPathValue::String(String::new()))),
        }
    }

    pub(crate) fn evaluate_with_params(
        &mut self,
        params: &[WithParam],
        context_node: N,
        context_position: usize,
        context_size: usize,
    ) -> Result<Vec<(String, Binding<N>)>, ExecutionError> {
        let mut evaluated = Vec::with_capacity(params.len());
        for param in params {
            let binding =
                self.evaluate_variable_value(&param.value, context_node, context_position, context_size)?;
            evaluated.push((param.name.clone(), binding));
        }
        Ok(evaluated)
    }

    /// Processes a single XSLT instruction.
    fn execute_instruction(
        &mut self,
        instruction: &XsltInstruction,
        context_node: N,
        context_position: usize,
        context_size: usize,
        builder: &mut dyn OutputBuilder,
    ) -> Result<(), ExecutionError> {
        match instruction {
            XsltInstruction::Text {
                text,
                disable_escaping,
            } => {
                builder.add_text(text, *disable_escaping);
                Ok(())
            }
            XsltInstruction::LiteralElement {
                name,
                namespace,
                attributes,
                namespaces,
                body,
            } => literals::handle_literal_element(
                self,
                name,
                namespace.as_deref(),
                attributes,
                namespaces,
                body,
                context_node,
                context_position,
                context_size,
                builder,
            ),
            XsltInstruction::ValueOf {
                select,
                disable_escaping,
            } => literals::handle_value_of(
                self,
                select,
                *disable_escaping,
                context_node,
                context_position,
                context_size,
                builder,
            ),
            XsltInstruction::CopyOf { select } => {
                copy::handle_copy_of(self, select, context_node, context_position, context_size, builder)
            }
            XsltInstruction::Copy { body } => {
                copy::handle_copy(self, body, context_node, context_position, context_size, builder)
            }
            XsltInstruction::If { test, body } => control_flow::handle_if(
                self,
                test,
                body,
                context_node,
                context_position,
                context_size,
                builder,
            ),
            XsltInstruction::Choose { whens, otherwise } => control_flow::handle_choose(
                self,
                whens,
                otherwise.as_ref(),
                context_node,
                context_position,
                context_size,
                builder,
            ),
            XsltInstruction::ForEach {
                select,
                sort_keys,
                body,
            } => for_each::handle_for_each(
                self,
                select,
                sort_keys,
                body,
                context_node,
                context_position,
                context_size,
                builder,
            ),
            XsltInstruction::ApplyTemplates {
                select,
                mode,
                sort_keys,
                params,
            } => apply_templates::handle_apply_templates(
                self,
                select.as_ref(),
                mode.as_deref(),
                sort_keys,
                params,
                context_node,
                context_position,
                context_size,
                builder,
            ),
            XsltInstruction::CallTemplate { name, params } => call_template::handle_call_template(
                self,
                name,
                params,
                context_node,
                context_position,
                context_size,
                builder,
            ),
            XsltInstruction::Variable { name, value } => variables::handle_variable(
                self,
                name,
                value,
                context_node,
                context_position,
                context_size,
            ),
            XsltInstruction::Element {
                name,
                namespace,
                body,
            } => literals::handle_element(
                self,
                name,
                namespace.as_ref(),
                body,
                context_node,
                context_position,
                context_size,
                builder,
            ),
            XsltInstruction::Attribute {
                name,
                namespace,
                body,
            } => literals::handle_attribute(
                self,
                name,
                namespace.as_ref(),
                body,
                context_node,
                context_position,
                context_size,
                builder,
            ),
            XsltInstruction::Comment { body } => {
                literals::handle_comment(self, body, context_node, context_position, context_size, builder)
            }
            XsltInstruction::ProcessingInstruction { name, body } => {
                literals::handle_processing_instruction(
                    self,
                    name,
                    body,
                    context_node,
                    context_position,
                    context_size,
                    builder,
                )
            }
            XsltInstruction::Number(spec) => {
                number::handle_number(self, spec, context_node, context_position, context_size, builder)
            }
            XsltInstruction::Message { body, terminate } => control_flow::handle_message(
                self,
                body,
                *terminate,
                context_node,
                context_position,
                context_size,
            ),
        }
    }

    // --- Template Matching ---

    pub(crate) fn apply_templates_to_nodes(
        &mut self,
        nodes: &[N],
        mode: Option<&str>,
        params: Vec<(String, Binding<N>)>,
        builder: &mut dyn OutputBuilder,
    ) -> Result<(), ExecutionError> {
        let size = nodes.len();
        for (i, &node) in nodes.iter().enumerate() {
            match self.find_matching_template(node, mode)? {
                Some(rule) => {
                    self.invoke_template(&rule.params, &rule.body, params.clone(), node, i + 1, size, builder)?
                }
                None => self.apply_builtin_template(node, mode, builder)?,
            }
        }
        Ok(())
    }

    fn find_matching_template(
        &self,
        node: N,
        mode: Option<&str>,
    ) -> Result<Option<&'s TemplateRule>, ExecutionError> {
        let stylesheet = self.stylesheet;
        let Some(rules) = stylesheet.template_rules.get(&mode.map(str::to_string)) else {
            return Ok(None);
        };
        let e_ctx = self.get_eval_context(node, 1, 1);
        for rule in rules {
            if rule.pattern.matches(node, &e_ctx)? {
                return Ok(Some(rule));
            }
        }
        Ok(None)
    }

    fn apply_builtin_template(
        &mut self,
        node: N,
        mode: Option<&str>,
        builder: &mut dyn OutputBuilder,
    ) -> Result<(), ExecutionError> {
        match node.node_type() {
            NodeType::Root | NodeType::Element => {
                let children: Vec<N> = node.children().collect();
                self.apply_templates_to_nodes(&children, mode, Vec::new(), builder)
            }
            NodeType::Text | NodeType::Attribute => {
                builder.add_text(&node.string_value(), false);
                Ok(())
            }
            NodeType::Comment | NodeType::ProcessingInstruction => Ok(()),
        }
    }

    /// Runs a template body with its own parameter frame. Templates see only the
    /// globals and their own parameters, never the caller's local variables.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn invoke_template(
        &mut self,
        declared: &[Param],
        body: &PreparsedTemplate,
        passed: Vec<(String, Binding<N>)>,
        context_node: N,
        context_position: usize,
        context_size: usize,
        builder: &mut dyn OutputBuilder,
    ) -> Result<(), ExecutionError> {
        let caller_frames = self.variables.frames.split_off(1);
        self.push_scope();

        let result = self.bind_params(declared, passed, context_node, context_position, context_size)
            .and_then(|()| {
                self.execute_template(body, context_node, context_position, context_size, builder)
            });

        self.variables.frames.truncate(1);
        self.variables.frames.extend(caller_frames);
        result
    }

    fn bind_params(
        &mut self,
        declared: &[Param],
        mut passed: Vec<(String, Binding<N>)>,
        context_node: N,
        context_position: usize,
        context_size: usize,
    ) -> Result<(), ExecutionError> {
        for param in declared {
            let binding = match passed.iter().position(|(name, _)| *name == param.name) {
                Some(index) => passed.swap_remove(index).1,
                None => self.evaluate_variable_value(
                    &param.default_value,
                    context_node,
                    context_position,
                    context_size,
                )?,
            };
            self.set_variable_in_current_scope(param.name.clone(), binding);
        }
        Ok(())
    }

    pub(crate) fn sort_node_set(
        &self,
        nodes: &mut Vec<N>,
        sort_keys: &[SortKey],
    ) -> Result<(), ExecutionError> {
        if sort_keys.is_empty() {
            return Ok(());
        }

        let size = nodes.len();
        let mut keyed = Vec::with_capacity(size);
        for (i, &node) in nodes.iter().enumerate() {
            let e_ctx = self.get_eval_context(node, i + 1, size);
            let mut values = Vec::with_capacity(sort_keys.len());
            for key in sort_keys {
                values.push(evaluate(&key.select, &e_ctx)?);
            }
            keyed.push((node, values));
        }

        keyed.sort_by(|(_, a), (_, b)| {
            for ((key, val_a), val_b) in sort_keys.iter().zip(a).zip(b) {
                let ordering = match key.data_type {
                    SortDataType::Number => compare_numbers(val_a.to_number(), val_b.to_number()),
                    SortDataType::Text => val_a.to_string().cmp(&val_b.to_string()),
                };
                let final_ordering = if key.order == SortOrder::Descending {
                    ordering.reverse()
                } else {
                    ordering
                };
                if final_ordering != Ordering::Equal {
                    return final_ordering;
                }
            }
            Ordering::Equal
        });

        *nodes = keyed.into_iter().map(|(node, _)| node).collect();
        Ok(())
    }
}

/// NaN sorts before every number.
fn compare_numbers(a: f64, b: f64) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        (false, false) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
    }
}

/// Every node of the tree in document order, attributes after their element.
pub(crate) fn collect_nodes<'a, N: DataSourceNode<'a>>(node: N, out: &mut Vec<N>) {
    out.push(node);
    out.extend(node.attributes());
    for child in node.children() {
        collect_nodes(child, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nan_sorts_first() {
        let mut values = vec![3.0, f64::NAN, -1.0];
        values.sort_by(|a, b| compare_numbers(*a, *b));
        assert!(values[0].is_nan());
        assert_eq!(&values[1..], &[-1.0, 3.0]);
    }

    #[test]
    fn test_inner_scopes_shadow_outer_ones() {
        let mut stack: VariableStack<usize> = VariableStack::new();
        stack.set("x".into(), Binding::Value(XPathValue::Number(1.0)));
        stack.frames.push(Vec::new());
        stack.set("x".into(), Binding::Fragment(ResultTree::default()));
        assert!(matches!(stack.resolve("x"), Some(XPathValue::String(s)) if s.is_empty()));
        stack.frames.pop();
        assert!(matches!(stack.resolve("x"), Some(XPathValue::Number(n)) if n == 1.0));
        assert!(stack.resolve("y").is_none());
    }
}
