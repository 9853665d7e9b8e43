use crate::ast::PreparsedTemplate;
use crate::executor::{Binding, ExecutionError, TemplateExecutor};
use crate::output::OutputBuilder;
use xsltui_xpath1::{DataSourceNode, Expression, NodeType, XPathValue, evaluate};

/// Declares the namespace of a copied name when it carries a prefix.
fn declare_prefix<'a, N: DataSourceNode<'a>>(node: N, builder: &mut dyn OutputBuilder) {
    if let Some(name) = node.name() {
        if let (Some(prefix), Some(uri)) = (name.prefix, name.namespace) {
            builder.declare_namespace(prefix, uri);
        }
    }
}

/// Deep-copies a source node into the result.
pub(crate) fn copy_node<'a, N: DataSourceNode<'a>>(node: N, builder: &mut dyn OutputBuilder) {
    match node.node_type() {
        NodeType::Root => {
            for child in node.children() {
                copy_node(child, builder);
            }
        }
        NodeType::Element => {
            let Some(name) = node.name() else {
                return;
            };
            builder.start_element(&name.to_string(), name.namespace);
            declare_prefix(node, builder);
            for attr in node.attributes() {
                copy_node(attr, builder);
            }
            for child in node.children() {
                copy_node(child, builder);
            }
            builder.end_element();
        }
        _ => copy_shallow(node, builder),
    }
}

/// Copies a node that has no content to copy.
fn copy_shallow<'a, N: DataSourceNode<'a>>(node: N, builder: &mut dyn OutputBuilder) {
    match node.node_type() {
        NodeType::Attribute => {
            if let Some(name) = node.name() {
                builder.set_attribute(&name.to_string(), name.namespace, &node.string_value());
            }
        }
        NodeType::Text => builder.add_text(&node.string_value(), false),
        NodeType::Comment => builder.add_comment(&node.string_value()),
        NodeType::ProcessingInstruction => {
            if let Some(name) = node.name() {
                builder.add_processing_instruction(name.local_part, &node.string_value());
            }
        }
        NodeType::Root | NodeType::Element => {}
    }
}

pub(crate) fn handle_copy_of<'s, 'a, N: DataSourceNode<'a> + 'a>(
    executor: &mut TemplateExecutor<'s, 'a, N>,
    select: &Expression,
    context_node: N,
    context_position: usize,
    context_size: usize,
    builder: &mut dyn OutputBuilder,
) -> Result<(), ExecutionError> {
    // A result tree fragment is copied as a tree, not as its string value.
    if let Expression::Variable(name) = select {
        if let Some(Binding::Fragment(tree)) = executor.variables.binding(name) {
            tree.replay(builder);
            return Ok(());
        }
    }
    let e_ctx = executor.get_eval_context(context_node, context_position, context_size);
    match evaluate(select, &e_ctx)? {
        XPathValue::NodeSet(nodes) => {
            for node in nodes {
                copy_node(node, builder);
            }
        }
        other => builder.add_text(&other.to_string(), false),
    }
    Ok(())
}

/// `xsl:copy`: a shallow copy of the context node with the body as its content.
pub(crate) fn handle_copy<'s, 'a, N: DataSourceNode<'a> + 'a>(
    executor: &mut TemplateExecutor<'s, 'a, N>,
    body: &PreparsedTemplate,
    context_node: N,
    context_position: usize,
    context_size: usize,
    builder: &mut dyn OutputBuilder,
) -> Result<(), ExecutionError> {
    match context_node.node_type() {
        NodeType::Element => {
            let Some(name) = context_node.name() else {
                return Ok(());
            };
            builder.start_element(&name.to_string(), name.namespace);
            declare_prefix(context_node, builder);
            executor.execute_template(body, context_node, context_position, context_size, builder)?;
            builder.end_element();
        }
        NodeType::Root => {
            executor.execute_template(body, context_node, context_position, context_size, builder)?;
        }
        _ => copy_shallow(context_node, builder),
    }
    Ok(())
}
