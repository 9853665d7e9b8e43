use crate::ast::VariableValue;
use crate::executor::{ExecutionError, TemplateExecutor};
use xsltui_xpath1::DataSourceNode;

pub(crate) fn handle_variable<'s, 'a, N: DataSourceNode<'a> + 'a>(
    executor: &mut TemplateExecutor<'s, 'a, N>,
    name: &str,
    value: &VariableValue,
    context_node: N,
    context_position: usize,
    context_size: usize,
) -> Result<(), ExecutionError> {
    let binding = executor.evaluate_variable_value(value, context_node, context_position, context_size)?;
    executor.set_variable_in_current_scope(name.to_string(), binding);
    Ok(())
}
