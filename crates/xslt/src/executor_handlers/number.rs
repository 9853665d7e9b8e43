use crate::ast::{NumberLevel, NumberSpec};
use crate::executor::{ExecutionError, TemplateExecutor, collect_nodes};
use crate::output::OutputBuilder;
use crate::pattern::Pattern;
use xsltui_xpath1::engine::EvaluationContext;
use xsltui_xpath1::{DataSourceNode, NodeType, XPathError, evaluate, number_to_string};

pub(crate) fn handle_number<'s, 'a, N: DataSourceNode<'a> + 'a>(
    executor: &mut TemplateExecutor<'s, 'a, N>,
    spec: &NumberSpec,
    context_node: N,
    context_position: usize,
    context_size: usize,
    builder: &mut dyn OutputBuilder,
) -> Result<(), ExecutionError> {
    let e_ctx = executor.get_eval_context(context_node, context_position, context_size);
    let format = executor.evaluate_avt(&spec.format, &e_ctx)?;

    let number = match &spec.value {
        Some(expr) => {
            let value = evaluate(expr, &e_ctx)?.to_number();
            if !value.is_finite() || value < 0.5 {
                builder.add_text(&number_to_string(value), false);
                return Ok(());
            }
            Some((value + 0.5).floor() as u64)
        }
        None => {
            let counter = Counter {
                count: spec.count.as_ref(),
                from: spec.from.as_ref(),
                context_node,
                e_ctx: &e_ctx,
            };
            match spec.level {
                NumberLevel::Single => counter.single()?,
                NumberLevel::Any => counter.any(executor.root_node)?,
            }
        }
    };

    if let Some(number) = number {
        builder.add_text(&format_with(&format, number), false);
    }
    Ok(())
}

struct Counter<'p, 'c, 'a, 'd, N: DataSourceNode<'a>> {
    count: Option<&'p Pattern>,
    from: Option<&'p Pattern>,
    context_node: N,
    e_ctx: &'c EvaluationContext<'a, 'd, N>,
}

impl<'a, N: DataSourceNode<'a> + 'a> Counter<'_, '_, 'a, '_, N> {
    /// Without a `count` pattern, nodes of the context node's type and name are counted.
    fn counts(&self, node: N) -> Result<bool, XPathError> {
        match self.count {
            Some(pattern) => pattern.matches(node, self.e_ctx),
            None => Ok(node.node_type() == self.context_node.node_type()
                && node.name().map(|q| (q.namespace, q.local_part))
                    == self.context_node.name().map(|q| (q.namespace, q.local_part))),
        }
    }

    fn is_from(&self, node: N) -> Result<bool, XPathError> {
        match self.from {
            Some(pattern) => pattern.matches(node, self.e_ctx),
            None => Ok(false),
        }
    }

    /// The position among its counted siblings of the nearest counted ancestor-or-self.
    fn single(&self) -> Result<Option<u64>, XPathError> {
        let mut current = Some(self.context_node);
        let mut target = None;
        while let Some(node) = current {
            if self.counts(node)? {
                target = Some(node);
                break;
            }
            if self.is_from(node)? {
                break;
            }
            current = node.parent();
        }
        let Some(target) = target else {
            return Ok(None);
        };
        let Some(parent) = target.parent() else {
            return Ok(Some(1));
        };
        if target.node_type() == NodeType::Attribute {
            return Ok(Some(1));
        }
        let mut position = 0;
        for sibling in parent.children() {
            if self.counts(sibling)? {
                position += 1;
            }
            if sibling == target {
                break;
            }
        }
        Ok(Some(position))
    }

    /// Counted nodes up to and including the context node, after the last `from` match.
    fn any(&self, root: N) -> Result<Option<u64>, XPathError> {
        let mut nodes = Vec::new();
        collect_nodes(root, &mut nodes);
        let mut total = 0;
        for node in nodes {
            if node.node_type() == NodeType::Attribute && node != self.context_node {
                continue;
            }
            if self.is_from(node)? {
                total = 0;
            }
            if self.counts(node)? {
                total += 1;
            }
            if node == self.context_node {
                break;
            }
        }
        Ok((total > 0).then_some(total))
    }
}

/// Formats a number with an `xsl:number` format string such as `1.`, `(a)` or `i`.
pub(crate) fn format_with(format: &str, number: u64) -> String {
    let Some(start) = format.find(char::is_alphanumeric) else {
        return format!("{}{}", format, number);
    };
    let rest = &format[start..];
    let end = rest
        .find(|c: char| !c.is_alphanumeric())
        .unwrap_or(rest.len());
    let (token, suffix) = rest.split_at(end);
    format!("{}{}{}", &format[..start], format_token(token, number), suffix)
}

fn format_token(token: &str, number: u64) -> String {
    match token {
        "a" => alphabetic(number, b'a'),
        "A" => alphabetic(number, b'A'),
        "i" => roman(number).to_lowercase(),
        "I" => roman(number),
        _ if token.chars().all(|c| c.is_ascii_digit()) => {
            format!("{:0width$}", number, width = token.len())
        }
        _ => number.to_string(),
    }
}

fn alphabetic(mut number: u64, base: u8) -> String {
    let mut letters = Vec::new();
    while number > 0 {
        number -= 1;
        letters.push((base + (number % 26) as u8) as char);
        number /= 26;
    }
    letters.iter().rev().collect()
}

fn roman(number: u64) -> String {
    if number == 0 || number >= 4000 {
        return number.to_string();
    }
    const NUMERALS: [(u64, &str); 13] = [
        (1000, "M"),
        (900, "CM"),
        (500, "D"),
        (400, "CD"),
        (100, "C"),
        (90, "XC"),
        (50, "L"),
        (40, "XL"),
        (10, "X"),
        (9, "IX"),
        (5, "V"),
        (4, "IV"),
        (1, "I"),
    ];
    let mut remaining = number;
    let mut out = String::new();
    for (value, numeral) in NUMERALS {
        while remaining >= value {
            out.push_str(numeral);
            remaining -= value;
        }
    }
    out
}
