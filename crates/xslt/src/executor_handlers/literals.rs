use crate::ast::{AttributeValueTemplate, LiteralAttribute, PreparsedTemplate};
use crate::executor::{ExecutionError, TemplateExecutor};
use crate::output::OutputBuilder;
use xsltui_xpath1::parser::{nc_name, q_name};
use xsltui_xpath1::{DataSourceNode, Expression, XML_NAMESPACE, XPathError, evaluate};

fn is_qname(name: &str) -> bool {
    matches!(q_name(name), Ok(("", _)))
}

fn is_ncname(name: &str) -> bool {
    matches!(nc_name(name), Ok(("", _)))
}

#[allow(clippy::too_many_arguments)]
pub(crate) fn handle_literal_element<'s, 'a, N: DataSourceNode<'a> + 'a>(
    executor: &mut TemplateExecutor<'s, 'a, N>,
    name: &str,
    namespace: Option<&str>,
    attributes: &[LiteralAttribute],
    namespaces: &[(String, String)],
    body: &PreparsedTemplate,
    context_node: N,
    context_position: usize,
    context_size: usize,
    builder: &mut dyn OutputBuilder,
) -> Result<(), ExecutionError> {
    let mut values = Vec::with_capacity(attributes.len());
    {
        let e_ctx = executor.get_eval_context(context_node, context_position, context_size);
        for attr in attributes {
            values.push(executor.evaluate_avt(&attr.value, &e_ctx)?);
        }
    }

    builder.start_element(name, namespace);
    for (prefix, uri) in namespaces {
        builder.declare_namespace(prefix, uri);
    }
    for (attr, value) in attributes.iter().zip(&values) {
        builder.set_attribute(&attr.name, attr.namespace.as_deref(), value);
    }
    executor.execute_template(body, context_node, context_position, context_size, builder)?;
    builder.end_element();
    Ok(())
}

pub(crate) fn handle_value_of<'s, 'a, N: DataSourceNode<'a> + 'a>(
    executor: &mut TemplateExecutor<'s, 'a, N>,
    select: &Expression,
    disable_escaping: bool,
    context_node: N,
    context_position: usize,
    context_size: usize,
    builder: &mut dyn OutputBuilder,
) -> Result<(), ExecutionError> {
    let e_ctx = executor.get_eval_context(context_node, context_position, context_size);
    let content = evaluate(select, &e_ctx)?.to_string();
    builder.add_text(&content, disable_escaping);
    Ok(())
}

/// The namespace of a computed name: the `namespace` attribute if present,
/// otherwise the stylesheet binding of the name's prefix.
fn resolve_namespace<'s, 'a, N: DataSourceNode<'a> + 'a>(
    executor: &TemplateExecutor<'s, 'a, N>,
    name: &str,
    explicit: Option<String>,
) -> Result<Option<String>, ExecutionError> {
    if let Some(uri) = explicit {
        return Ok((!uri.is_empty()).then_some(uri));
    }
    match name.split_once(':') {
        Some(("xml", _)) => Ok(Some(XML_NAMESPACE.to_string())),
        Some((prefix, _)) => executor
            .stylesheet
            .namespaces
            .get(prefix)
            .cloned()
            .map(Some)
            .ok_or_else(|| XPathError::UnknownPrefix(prefix.to_string()).into()),
        None => Ok(None),
    }
}

fn evaluate_name<'s, 'a, N: DataSourceNode<'a> + 'a>(
    executor: &TemplateExecutor<'s, 'a, N>,
    name: &AttributeValueTemplate,
    namespace: Option<&AttributeValueTemplate>,
    context_node: N,
    context_position: usize,
    context_size: usize,
) -> Result<(String, Option<String>), ExecutionError> {
    let e_ctx = executor.get_eval_context(context_node, context_position, context_size);
    let name = executor.evaluate_avt(name, &e_ctx)?.trim().to_string();
    if !is_qname(&name) {
        return Err(ExecutionError::InvalidName(name));
    }
    let explicit = namespace
        .map(|avt| executor.evaluate_avt(avt, &e_ctx))
        .transpose()?;
    let namespace = resolve_namespace(executor, &name, explicit)?;
    Ok((name, namespace))
}

#[allow(clippy::too_many_arguments)]
pub(crate) fn handle_element<'s, 'a, N: DataSourceNode<'a> + 'a>(
    executor: &mut TemplateExecutor<'s, 'a, N>,
    name: &AttributeValueTemplate,
    namespace: Option<&AttributeValueTemplate>,
    body: &PreparsedTemplate,
    context_node: N,
    context_position: usize,
    context_size: usize,
    builder: &mut dyn OutputBuilder,
) -> Result<(), ExecutionError> {
    let (name, namespace) =
        evaluate_name(executor, name, namespace, context_node, context_position, context_size)?;
    builder.start_element(&name, namespace.as_deref());
    executor.execute_template(body, context_node, context_position, context_size, builder)?;
    builder.end_element();
    Ok(())
}

#[allow(clippy::too_many_arguments)]
pub(crate) fn handle_attribute<'s, 'a, N: DataSourceNode<'a> + 'a>(
    executor: &mut TemplateExecutor<'s, 'a, N>,
    name: &AttributeValueTemplate,
    namespace: Option<&AttributeValueTemplate>,
    body: &PreparsedTemplate,
    context_node: N,
    context_position: usize,
    context_size: usize,
    builder: &mut dyn OutputBuilder,
) -> Result<(), ExecutionError> {
    let (name, namespace) =
        evaluate_name(executor, name, namespace, context_node, context_position, context_size)?;
    if name == "xmlns" {
        return Err(ExecutionError::InvalidName(name));
    }
    let value = executor
        .execute_to_tree(body, context_node, context_position, context_size)?
        .string_value();
    builder.set_attribute(&name, namespace.as_deref(), &value);
    Ok(())
}

pub(crate) fn handle_comment<'s, 'a, N: DataSourceNode<'a> + 'a>(
    executor: &mut TemplateExecutor<'s, 'a, N>,
    body: &PreparsedTemplate,
    context_node: N,
    context_position: usize,
    context_size: usize,
    builder: &mut dyn OutputBuilder,
) -> Result<(), ExecutionError> {
    let mut text = executor
        .execute_to_tree(body, context_node, context_position, context_size)?
        .string_value();
    // A comment may not contain `--` or end with `-`.
    while text.contains("--") {
        text = text.replace("--", "- -");
    }
    if text.ends_with('-') {
        text.push(' ');
    }
    builder.add_comment(&text);
    Ok(())
}

#[allow(clippy::too_many_arguments)]
pub(crate) fn handle_processing_instruction<'s, 'a, N: DataSourceNode<'a> + 'a>(
    executor: &mut TemplateExecutor<'s, 'a, N>,
    name: &AttributeValueTemplate,
    body: &PreparsedTemplate,
    context_node: N,
    context_position: usize,
    context_size: usize,
    builder: &mut dyn OutputBuilder,
) -> Result<(), ExecutionError> {
    let target = {
        let e_ctx = executor.get_eval_context(context_node, context_position, context_size);
        executor.evaluate_avt(name, &e_ctx)?.trim().to_string()
    };
    if !is_ncname(&target) || target.eq_ignore_ascii_case("xml") {
        return Err(ExecutionError::InvalidName(target));
    }
    let data = executor
        .execute_to_tree(body, context_node, context_position, context_size)?
        .string_value()
        .replace("?>", "? >");
    builder.add_processing_instruction(&target, data.trim_start());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_checks() {
        assert!(is_qname("h:p"));
        assert!(is_qname("item-2"));
        assert!(!is_qname("2item"));
        assert!(!is_qname("a b"));
        assert!(is_ncname("target"));
        assert!(!is_ncname("a:b"));
    }
}
