use crate::ast::{PreparsedTemplate, SortKey};
use crate::executor::{ExecutionError, TemplateExecutor};
use crate::output::OutputBuilder;
use xsltui_xpath1::{DataSourceNode, Expression, evaluate};

#[allow(clippy::too_many_arguments)]
pub(crate) fn handle_for_each<'s, 'a, N: DataSourceNode<'a> + 'a>(
    executor: &mut TemplateExecutor<'s, 'a, N>,
    select: &Expression,
    sort_keys: &[SortKey],
    body: &PreparsedTemplate,
    context_node: N,
    context_position: usize,
    context_size: usize,
    builder: &mut dyn OutputBuilder,
) -> Result<(), ExecutionError> {
    let mut nodes = {
        let e_ctx = executor.get_eval_context(context_node, context_position, context_size);
        evaluate(select, &e_ctx)?.into_nodes("xsl:for-each")?
    };
    executor.sort_node_set(&mut nodes, sort_keys)?;

    let inner_context_size = nodes.len();
    for (i, node) in nodes.into_iter().enumerate() {
        executor.execute_template(body, node, i + 1, inner_context_size, builder)?;
    }
    Ok(())
}
