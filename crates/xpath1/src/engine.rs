//! The evaluation engine for executing a parsed XPath AST against a generic `DataSourceNode`.

use super::ast::{Axis, BinaryOperator, Expression, LocationPath, NodeTest, NodeTypeTest, Step, UnaryOperator};
use super::{axes, functions, operators};
use crate::datasource::{DataSourceNode, NodeType, XML_NAMESPACE};
use crate::error::XPathError;
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;

/// `key name -> key value -> nodes`, precomputed by the caller.
pub type KeyIndexes<N> = HashMap<String, HashMap<String, Vec<N>>>;

/// In-scope namespace prefixes used to resolve prefixed name tests.
pub type NamespaceBindings = HashMap<String, String>;

/// The possible result types of an XPath expression.
#[derive(Debug, Clone)]
pub enum XPathValue<N> {
    NodeSet(Vec<N>),
    String(String),
    Number(f64),
    Boolean(bool),
}

impl<'a, N: DataSourceNode<'a>> XPathValue<N> {
    pub fn to_bool(&self) -> bool {
        match self {
            XPathValue::NodeSet(nodes) => !nodes.is_empty(),
            XPathValue::String(s) => !s.is_empty(),
            XPathValue::Number(n) => *n != 0.0 && !n.is_nan(),
            XPathValue::Boolean(b) => *b,
        }
    }

    pub fn to_number(&self) -> f64 {
        match self {
            XPathValue::Number(n) => *n,
            XPathValue::String(s) => string_to_number(s),
            XPathValue::Boolean(b) => {
                if *b {
                    1.0
                } else {
                    0.0
                }
            }
            XPathValue::NodeSet(nodes) => nodes
                .first()
                .map_or(f64::NAN, |n| string_to_number(&n.string_value())),
        }
    }

    pub fn into_nodes(self, context: &str) -> Result<Vec<N>, XPathError> {
        match self {
            XPathValue::NodeSet(nodes) => Ok(nodes),
            other => Err(XPathError::TypeError(format!(
                "{} requires a node-set, found {}",
                context,
                other.type_name()
            ))),
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            XPathValue::NodeSet(_) => "node-set",
            XPathValue::String(_) => "string",
            XPathValue::Number(_) => "number",
            XPathValue::Boolean(_) => "boolean",
        }
    }
}

impl<'a, N: DataSourceNode<'a>> fmt::Display for XPathValue<N> {
    /// The XPath `string()` conversion.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            XPathValue::NodeSet(nodes) => match nodes.first() {
                Some(node) => f.write_str(&node.string_value()),
                None => Ok(()),
            },
            XPathValue::String(s) => f.write_str(s),
            XPathValue::Number(n) => f.write_str(&number_to_string(*n)),
            XPathValue::Boolean(b) => write!(f, "{}", b),
        }
    }
}

/// Formats a number the way XPath's `string()` does: no exponent, no trailing `.0`.
pub fn number_to_string(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string()
    } else if n == 0.0 {
        "0".to_string()
    } else if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

/// Parses a string with XPath `number()` rules: optional whitespace, an optional
/// minus sign and a decimal literal. Anything else is `NaN`.
pub fn string_to_number(s: &str) -> f64 {
    let trimmed = s.trim();
    let digits = trimmed.strip_prefix('-').unwrap_or(trimmed);
    let mut seen_digit = false;
    let mut seen_dot = false;
    for c in digits.chars() {
        match c {
            '0'..='9' => seen_digit = true,
            '.' if !seen_dot => seen_dot = true,
            _ => return f64::NAN,
        }
    }
    if !seen_digit {
        return f64::NAN;
    }
    trimmed.parse().unwrap_or(f64::NAN)
}

/// Resolves `$name` references during evaluation.
pub trait VariableResolver<N> {
    fn resolve(&self, name: &str) -> Option<XPathValue<N>>;
}

impl<N: Clone> VariableResolver<N> for HashMap<String, XPathValue<N>> {
    fn resolve(&self, name: &str) -> Option<XPathValue<N>> {
        self.get(name).cloned()
    }
}

/// All state needed during expression evaluation.
/// `'a` is the lifetime of the underlying document, `'d` that of the borrowed environment.
pub struct EvaluationContext<'a, 'd, N: DataSourceNode<'a>> {
    pub context_node: N,
    pub context_position: usize,
    pub context_size: usize,
    /// The XSLT current node, returned by `current()`.
    pub current_node: N,
    pub root_node: N,
    pub variables: &'d dyn VariableResolver<N>,
    pub key_indexes: &'d KeyIndexes<N>,
    pub namespaces: &'d NamespaceBindings,
    _marker: PhantomData<&'a ()>,
}

impl<'a, 'd, N: DataSourceNode<'a>> EvaluationContext<'a, 'd, N> {
    pub fn new(
        context_node: N,
        root_node: N,
        variables: &'d dyn VariableResolver<N>,
        key_indexes: &'d KeyIndexes<N>,
        namespaces: &'d NamespaceBindings,
    ) -> Self {
        Self {
            context_node,
            context_position: 1,
            context_size: 1,
            current_node: context_node,
            root_node,
            variables,
            key_indexes,
            namespaces,
            _marker: PhantomData,
        }
    }

    /// A copy of this context focused on another node; `current()` is unchanged.
    pub fn with_focus(&self, node: N, position: usize, size: usize) -> Self {
        Self {
            context_node: node,
            context_position: position,
            context_size: size,
            current_node: self.current_node,
            root_node: self.root_node,
            variables: self.variables,
            key_indexes: self.key_indexes,
            namespaces: self.namespaces,
            _marker: PhantomData,
        }
    }

    pub fn resolve_prefix(&self, prefix: &str) -> Result<&'d str, XPathError> {
        if prefix == "xml" {
            return Ok(XML_NAMESPACE);
        }
        self.namespaces
            .get(prefix)
            .map(String::as_str)
            .ok_or_else(|| XPathError::UnknownPrefix(prefix.to_string()))
    }
}

pub fn evaluate<'a, N>(
    expr: &Expression,
    e_ctx: &EvaluationContext<'a, '_, N>,
) -> Result<XPathValue<N>, XPathError>
where
    N: DataSourceNode<'a> + 'a,
{
    match expr {
        Expression::Literal(s) => Ok(XPathValue::String(s.clone())),
        Expression::Number(n) => Ok(XPathValue::Number(*n)),
        Expression::LocationPath(path) => evaluate_location_path(path, e_ctx).map(XPathValue::NodeSet),
        Expression::Filter { base, predicates } => {
            let nodes = evaluate(base, e_ctx)?.into_nodes("a predicate")?;
            apply_predicates(nodes, predicates, e_ctx).map(XPathValue::NodeSet)
        }
        Expression::Variable(name) => e_ctx
            .variables
            .resolve(name)
            .ok_or_else(|| XPathError::UnknownVariable(name.clone())),
        Expression::FunctionCall { name, args } => {
            let mut evaluated_args = Vec::with_capacity(args.len());
            for arg in args {
                evaluated_args.push(evaluate(arg, e_ctx)?);
            }
            functions::evaluate_function(name, evaluated_args, e_ctx)
        }
        Expression::BinaryOp { left, op, right } => match op {
            BinaryOperator::Or => Ok(XPathValue::Boolean(
                evaluate(left, e_ctx)?.to_bool() || evaluate(right, e_ctx)?.to_bool(),
            )),
            BinaryOperator::And => Ok(XPathValue::Boolean(
                evaluate(left, e_ctx)?.to_bool() && evaluate(right, e_ctx)?.to_bool(),
            )),
            _ => {
                let left_val = evaluate(left, e_ctx)?;
                let right_val = evaluate(right, e_ctx)?;
                operators::evaluate(*op, left_val, right_val)
            }
        },
        Expression::UnaryOp { op, expr } => {
            let val = evaluate(expr, e_ctx)?;
            match op {
                UnaryOperator::Minus => Ok(XPathValue::Number(-val.to_number())),
            }
        }
    }
}

fn evaluate_location_path<'a, N>(
    path: &LocationPath,
    e_ctx: &EvaluationContext<'a, '_, N>,
) -> Result<Vec<N>, XPathError>
where
    N: DataSourceNode<'a> + 'a,
{
    let mut current = if let Some(start_expr) = &path.start_point {
        evaluate(start_expr, e_ctx)?.into_nodes("a path step")?
    } else if path.is_absolute {
        vec![e_ctx.root_node]
    } else {
        vec![e_ctx.context_node]
    };

    for step in &path.steps {
        current = evaluate_step(step, &current, e_ctx)?;
    }
    Ok(current)
}

/// Applies one step to every node of the input set. Predicates see proximity positions
/// along the axis of each individual context node; the union is returned in document order.
fn evaluate_step<'a, N>(
    step: &Step,
    context_nodes: &[N],
    e_ctx: &EvaluationContext<'a, '_, N>,
) -> Result<Vec<N>, XPathError>
where
    N: DataSourceNode<'a> + 'a,
{
    let mut result = Vec::new();
    for &node in context_nodes {
        let axis_nodes = axes::collect(step.axis, node);
        let mut tested = Vec::with_capacity(axis_nodes.len());
        for candidate in axis_nodes {
            if matches_node_test(candidate, &step.node_test, step.axis, e_ctx)? {
                tested.push(candidate);
            }
        }
        result.extend(apply_predicates(tested, &step.predicates, e_ctx)?);
    }
    if context_nodes.len() > 1 || step.axis.is_reverse() {
        sort_document_order(&mut result);
    }
    Ok(result)
}

pub fn sort_document_order<'a, N: DataSourceNode<'a>>(nodes: &mut Vec<N>) {
    nodes.sort();
    nodes.dedup();
}

/// Applies a node test with the principal node type of `axis`.
pub fn matches_node_test<'a, N>(
    node: N,
    test: &NodeTest,
    axis: Axis,
    e_ctx: &EvaluationContext<'a, '_, N>,
) -> Result<bool, XPathError>
where
    N: DataSourceNode<'a> + 'a,
{
    let principal = if axis == Axis::Attribute {
        NodeType::Attribute
    } else {
        NodeType::Element
    };
    Ok(match test {
        NodeTest::Wildcard => node.node_type() == principal,
        NodeTest::PrefixWildcard(prefix) => {
            let uri = e_ctx.resolve_prefix(prefix)?;
            node.node_type() == principal && node.name().is_some_and(|q| q.namespace == Some(uri))
        }
        NodeTest::Name { prefix, local } => {
            if node.node_type() != principal {
                return Ok(false);
            }
            let expected_ns = match prefix {
                Some(p) => Some(e_ctx.resolve_prefix(p)?),
                None => None,
            };
            node.name()
                .is_some_and(|q| q.local_part == local && q.namespace == expected_ns)
        }
        NodeTest::NodeType(node_type) => match node_type {
            NodeTypeTest::Node => true,
            NodeTypeTest::Text => node.node_type() == NodeType::Text,
            NodeTypeTest::Comment => node.node_type() == NodeType::Comment,
            NodeTypeTest::ProcessingInstruction(target) => {
                node.node_type() == NodeType::ProcessingInstruction
                    && target
                        .as_deref()
                        .is_none_or(|t| node.name().is_some_and(|q| q.local_part == t))
            }
        },
    })
}

/// Filters `nodes` (already in proximity order) through each predicate in turn.
pub fn apply_predicates<'a, N>(
    nodes: Vec<N>,
    predicates: &[Expression],
    e_ctx: &EvaluationContext<'a, '_, N>,
) -> Result<Vec<N>, XPathError>
where
    N: DataSourceNode<'a> + 'a,
{
    let mut current = nodes;
    for predicate in predicates {
        let size = current.len();
        let mut kept = Vec::with_capacity(size);
        for (i, node) in current.iter().enumerate() {
            let inner = e_ctx.with_focus(*node, i + 1, size);
            let keep = match evaluate(predicate, &inner)? {
                XPathValue::Number(n) => n == (i + 1) as f64,
                other => other.to_bool(),
            };
            if keep {
                kept.push(*node);
            }
        }
        current = kept;
    }
    Ok(current)
}
