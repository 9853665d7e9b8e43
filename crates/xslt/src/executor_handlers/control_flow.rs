use crate::ast::{PreparsedTemplate, When};
use crate::executor::{ExecutionError, TemplateExecutor};
use crate::output::OutputBuilder;
use xsltui_xpath1::{DataSourceNode, Expression, evaluate};

fn test_condition<'s, 'a, N: DataSourceNode<'a> + 'a>(
    executor: &TemplateExecutor<'s, 'a, N>,
    test: &Expression,
    context_node: N,
    context_position: usize,
    context_size: usize,
) -> Result<bool, ExecutionError> {
    let e_ctx = executor.get_eval_context(context_node, context_position, context_size);
    Ok(evaluate(test, &e_ctx)?.to_bool())
}

#[allow(clippy::too_many_arguments)]
pub(crate) fn handle_if<'s, 'a, N: DataSourceNode<'a> + 'a>(
    executor: &mut TemplateExecutor<'s, 'a, N>,
    test: &Expression,
    body: &PreparsedTemplate,
    context_node: N,
    context_position: usize,
    context_size: usize,
    builder: &mut dyn OutputBuilder,
) -> Result<(), ExecutionError> {
    if test_condition(executor, test, context_node, context_position, context_size)? {
        executor.execute_template(body, context_node, context_position, context_size, builder)?;
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
pub(crate) fn handle_choose<'s, 'a, N: DataSourceNode<'a> + 'a>(
    executor: &mut TemplateExecutor<'s, 'a, N>,
    whens: &[When],
    otherwise: Option<&PreparsedTemplate>,
    context_node: N,
    context_position: usize,
    context_size: usize,
    builder: &mut dyn OutputBuilder,
) -> Result<(), ExecutionError> {
    for when in whens {
        if test_condition(executor, &when.test, context_node, context_position, context_size)? {
            return executor.execute_template(
                &when.body,
                context_node,
                context_position,
                context_size,
                builder,
            );
        }
    }
    if let Some(body) = otherwise {
        executor.execute_template(body, context_node, context_position, context_size, builder)?;
    }
    Ok(())
}

/// `xsl:message` goes to the log and the executor's message list.
pub(crate) fn handle_message<'s, 'a, N: DataSourceNode<'a> + 'a>(
    executor: &mut TemplateExecutor<'s, 'a, N>,
    body: &PreparsedTemplate,
    terminate: bool,
    context_node: N,
    context_position: usize,
    context_size: usize,
) -> Result<(), ExecutionError> {
    let text = executor
        .execute_to_tree(body, context_node, context_position, context_size)?
        .string_value();
    if terminate {
        log::error!("xsl:message (terminate): {}", text);
        executor.messages.push(text.clone());
        return Err(ExecutionError::Terminated(text));
    }
    log::info!("xsl:message: {}", text);
    executor.messages.push(text);
    Ok(())
}
