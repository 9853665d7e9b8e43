//! Built-in implementations for the XPath 1.0 core library plus the XSLT 1.0 additions.

use super::engine::{EvaluationContext, XPathValue, sort_document_order, string_to_number};
use crate::datasource::{DataSourceNode, NodeType, XML_NAMESPACE};
use crate::error::XPathError;
use std::collections::HashSet;
use std::collections::hash_map::DefaultHasher;
use std::hash::Hasher;

/// Every function name `evaluate_function` dispatches, used by `function-available()`.
pub const KNOWN_FUNCTIONS: &[&str] = &[
    "last",
    "position",
    "count",
    "id",
    "local-name",
    "namespace-uri",
    "name",
    "string",
    "concat",
    "starts-with",
    "contains",
    "substring-before",
    "substring-after",
    "substring",
    "string-length",
    "normalize-space",
    "translate",
    "boolean",
    "not",
    "true",
    "false",
    "lang",
    "number",
    "sum",
    "floor",
    "ceiling",
    "round",
    "key",
    "current",
    "generate-id",
    "format-number",
    "system-property",
    "element-available",
    "function-available",
];

/// XSLT instructions reported by `element-available()`.
const XSL_INSTRUCTIONS: &[&str] = &[
    "apply-templates",
    "call-template",
    "attribute",
    "choose",
    "comment",
    "copy",
    "copy-of",
    "element",
    "for-each",
    "if",
    "message",
    "number",
    "processing-instruction",
    "text",
    "value-of",
    "variable",
];

fn arity<N>(
    function: &str,
    args: &[XPathValue<N>],
    min: usize,
    max: usize,
) -> Result<(), XPathError> {
    if args.len() < min || args.len() > max {
        let expected = if min == max {
            format!("Expected {} argument(s)", min)
        } else if max == usize::MAX {
            format!("Expected at least {} arguments", min)
        } else {
            format!("Expected {} to {} arguments", min, max)
        };
        return Err(XPathError::function(function, expected));
    }
    Ok(())
}

/// Dispatches a function call to the correct implementation.
pub fn evaluate_function<'a, 'd, N: DataSourceNode<'a>>(
    name: &str,
    mut args: Vec<XPathValue<N>>,
    e_ctx: &EvaluationContext<'a, 'd, N>,
) -> Result<XPathValue<N>, XPathError> {
    match name {
        // Node-set
        "last" => {
            arity(name, &args, 0, 0)?;
            Ok(XPathValue::Number(e_ctx.context_size as f64))
        }
        "position" => {
            arity(name, &args, 0, 0)?;
            Ok(XPathValue::Number(e_ctx.context_position as f64))
        }
        "count" => {
            arity(name, &args, 1, 1)?;
            let nodes = args.remove(0).into_nodes("count()")?;
            Ok(XPathValue::Number(nodes.len() as f64))
        }
        "id" => {
            arity(name, &args, 1, 1)?;
            func_id(args.remove(0), e_ctx)
        }
        "local-name" | "namespace-uri" | "name" => {
            arity(name, &args, 0, 1)?;
            let node = optional_node_arg(name, args, e_ctx)?;
            let qname = node.and_then(|n| match n.node_type() {
                NodeType::Element | NodeType::Attribute | NodeType::ProcessingInstruction => {
                    n.name()
                }
                _ => None,
            });
            let value = match (name, qname) {
                (_, None) => String::new(),
                ("local-name", Some(q)) => q.local_part.to_string(),
                ("namespace-uri", Some(q)) => q.namespace.unwrap_or_default().to_string(),
                (_, Some(q)) => q.to_string(),
            };
            Ok(XPathValue::String(value))
        }

        // String
        "string" => {
            arity(name, &args, 0, 1)?;
            Ok(XPathValue::String(string_arg_or_context(args, e_ctx)))
        }
        "concat" => {
            arity(name, &args, 2, usize::MAX)?;
            Ok(XPathValue::String(args.iter().map(|v| v.to_string()).collect()))
        }
        "starts-with" | "contains" | "substring-before" | "substring-after" => {
            arity(name, &args, 2, 2)?;
            let s2 = args.remove(1).to_string();
            let s1 = args.remove(0).to_string();
            Ok(match name {
                "starts-with" => XPathValue::Boolean(s1.starts_with(&s2)),
                "contains" => XPathValue::Boolean(s1.contains(&s2)),
                "substring-before" => XPathValue::String(
                    s1.find(&s2).map(|i| s1[..i].to_string()).unwrap_or_default(),
                ),
                _ => XPathValue::String(
                    s1.find(&s2)
                        .map(|i| s1[i + s2.len()..].to_string())
                        .unwrap_or_default(),
                ),
            })
        }
        "substring" => {
            arity(name, &args, 2, 3)?;
            let length = if args.len() == 3 {
                Some(args.remove(2).to_number())
            } else {
                None
            };
            let start = args.remove(1).to_number();
            let s = args.remove(0).to_string();
            Ok(XPathValue::String(substring(&s, start, length)))
        }
        "string-length" => {
            arity(name, &args, 0, 1)?;
            let s = string_arg_or_context(args, e_ctx);
            Ok(XPathValue::Number(s.chars().count() as f64))
        }
        "normalize-space" => {
            arity(name, &args, 0, 1)?;
            let s = string_arg_or_context(args, e_ctx);
            Ok(XPathValue::String(
                s.split_whitespace().collect::<Vec<_>>().join(" "),
            ))
        }
        "translate" => {
            arity(name, &args, 3, 3)?;
            let to: Vec<char> = args.remove(2).to_string().chars().collect();
            let from: Vec<char> = args.remove(1).to_string().chars().collect();
            let s = args.remove(0).to_string();
            let translated = s
                .chars()
                .filter_map(|c| match from.iter().position(|&f| f == c) {
                    Some(i) => to.get(i).copied(),
                    None => Some(c),
                })
                .collect();
            Ok(XPathValue::String(translated))
        }

        // Boolean
        "boolean" => {
            arity(name, &args, 1, 1)?;
            Ok(XPathValue::Boolean(args[0].to_bool()))
        }
        "not" => {
            arity(name, &args, 1, 1)?;
            Ok(XPathValue::Boolean(!args[0].to_bool()))
        }
        "true" | "false" => {
            arity(name, &args, 0, 0)?;
            Ok(XPathValue::Boolean(name == "true"))
        }
        "lang" => {
            arity(name, &args, 1, 1)?;
            let wanted = args.remove(0).to_string().to_lowercase();
            Ok(XPathValue::Boolean(
                language_of(e_ctx.context_node).is_some_and(|lang| {
                    let lang = lang.to_lowercase();
                    lang == wanted || lang.starts_with(&format!("{}-", wanted))
                }),
            ))
        }

        // Number
        "number" => {
            arity(name, &args, 0, 1)?;
            let n = match args.pop() {
                Some(v) => v.to_number(),
                None => XPathValue::<N>::NodeSet(vec![e_ctx.context_node]).to_number(),
            };
            Ok(XPathValue::Number(n))
        }
        "sum" => {
            arity(name, &args, 1, 1)?;
            let nodes = args.remove(0).into_nodes("sum()")?;
            Ok(XPathValue::Number(
                nodes
                    .iter()
                    .map(|n| string_to_number(&n.string_value()))
                    .sum(),
            ))
        }
        "floor" => {
            arity(name, &args, 1, 1)?;
            Ok(XPathValue::Number(args[0].to_number().floor()))
        }
        "ceiling" => {
            arity(name, &args, 1, 1)?;
            Ok(XPathValue::Number(args[0].to_number().ceil()))
        }
        "round" => {
            arity(name, &args, 1, 1)?;
            Ok(XPathValue::Number(round(args[0].to_number())))
        }

        // XSLT additions
        "key" => {
            arity(name, &args, 2, 2)?;
            func_key(args, e_ctx)
        }
        "current" => {
            arity(name, &args, 0, 0)?;
            Ok(XPathValue::NodeSet(vec![e_ctx.current_node]))
        }
        "generate-id" => {
            arity(name, &args, 0, 1)?;
            let node = optional_node_arg(name, args, e_ctx)?;
            Ok(XPathValue::String(node.map(generate_id).unwrap_or_default()))
        }
        "format-number" => {
            arity(name, &args, 2, 3)?;
            let pattern = args.remove(1).to_string();
            let value = args.remove(0).to_number();
            Ok(XPathValue::String(format_number(value, &pattern)))
        }
        "system-property" => {
            arity(name, &args, 1, 1)?;
            let property = args.remove(0).to_string();
            Ok(system_property(&property))
        }
        "element-available" => {
            arity(name, &args, 1, 1)?;
            let qname = args.remove(0).to_string();
            let available = match qname.split_once(':') {
                Some((prefix, local)) => {
                    e_ctx.namespaces.get(prefix).map(String::as_str)
                        == Some("http://www.w3.org/1999/XSL/Transform")
                        && XSL_INSTRUCTIONS.contains(&local)
                }
                None => false,
            };
            Ok(XPathValue::Boolean(available))
        }
        "function-available" => {
            arity(name, &args, 1, 1)?;
            let function = args.remove(0).to_string();
            Ok(XPathValue::Boolean(KNOWN_FUNCTIONS.contains(&function.as_str())))
        }
        _ => Err(XPathError::function(name, "Unknown XPath function")),
    }
}

fn optional_node_arg<'a, N: DataSourceNode<'a>>(
    function: &str,
    mut args: Vec<XPathValue<N>>,
    e_ctx: &EvaluationContext<'a, '_, N>,
) -> Result<Option<N>, XPathError> {
    match args.pop() {
        None => Ok(Some(e_ctx.context_node)),
        Some(value) => {
            let mut nodes = value.into_nodes(function)?;
            sort_document_order(&mut nodes);
            Ok(nodes.first().copied())
        }
    }
}

fn string_arg_or_context<'a, N: DataSourceNode<'a>>(
    mut args: Vec<XPathValue<N>>,
    e_ctx: &EvaluationContext<'a, '_, N>,
) -> String {
    match args.pop() {
        Some(value) => value.to_string(),
        None => e_ctx.context_node.string_value(),
    }
}

fn func_id<'a, N: DataSourceNode<'a>>(
    arg: XPathValue<N>,
    e_ctx: &EvaluationContext<'a, '_, N>,
) -> Result<XPathValue<N>, XPathError> {
    let id_string = match arg {
        XPathValue::NodeSet(nodes) => nodes
            .iter()
            .map(|n| n.string_value())
            .collect::<Vec<_>>()
            .join(" "),
        other => other.to_string(),
    };
    let ids_to_find: HashSet<_> = id_string.split_whitespace().collect();
    if ids_to_find.is_empty() {
        return Ok(XPathValue::NodeSet(vec![]));
    }

    let mut results = Vec::new();
    let mut stack = e_ctx.root_node.children().collect::<Vec<_>>();
    while let Some(node) = stack.pop() {
        if node.node_type() == NodeType::Element {
            let has_id = node.attributes().any(|attr| {
                attr.name().is_some_and(|q| {
                    q.local_part == "id"
                        && (q.namespace.is_none() || q.namespace == Some(XML_NAMESPACE))
                }) && ids_to_find.contains(attr.string_value().as_str())
            });
            if has_id {
                results.push(node);
            }
        }
        stack.extend(node.children());
    }

    sort_document_order(&mut results);
    Ok(XPathValue::NodeSet(results))
}

fn func_key<'a, N: DataSourceNode<'a>>(
    mut args: Vec<XPathValue<N>>,
    e_ctx: &EvaluationContext<'a, '_, N>,
) -> Result<XPathValue<N>, XPathError> {
    let key_value_arg = args.remove(1);
    let key_name = args.remove(0).to_string();

    let key_index = e_ctx
        .key_indexes
        .get(&key_name)
        .ok_or_else(|| XPathError::UnknownKey(key_name.clone()))?;

    let key_values = match key_value_arg {
        XPathValue::NodeSet(nodes) => nodes.into_iter().map(|n| n.string_value()).collect(),
        other => vec![other.to_string()],
    };

    let mut result_nodes = Vec::new();
    for value in key_values {
        if let Some(nodes) = key_index.get(&value) {
            result_nodes.extend(nodes.iter().copied());
        }
    }

    sort_document_order(&mut result_nodes);
    Ok(XPathValue::NodeSet(result_nodes))
}

fn generate_id<'a, N: DataSourceNode<'a>>(node: N) -> String {
    let mut hasher = DefaultHasher::new();
    node.hash(&mut hasher);
    // Prefixed with a letter so the id is a valid NCName.
    format!("id{}", hasher.finish())
}

fn language_of<'a, N: DataSourceNode<'a>>(node: N) -> Option<String> {
    let mut current = Some(node);
    while let Some(n) = current {
        if n.node_type() == NodeType::Element {
            let lang = n.attributes().find(|a| {
                a.name()
                    .is_some_and(|q| q.local_part == "lang" && q.namespace == Some(XML_NAMESPACE))
            });
            if let Some(attr) = lang {
                return Some(attr.string_value());
            }
        }
        current = n.parent();
    }
    None
}

fn round(n: f64) -> f64 {
    if n.is_nan() || n.is_infinite() {
        n
    } else {
        (n + 0.5).floor()
    }
}

/// `substring()` with XPath's rounding rules: characters at positions `p` with
/// `round(start) <= p < round(start) + round(length)` are kept.
fn substring(s: &str, start: f64, length: Option<f64>) -> String {
    let first = round(start);
    let end = match length {
        Some(len) => first + round(len),
        None => f64::INFINITY,
    };
    if first.is_nan() || end.is_nan() {
        return String::new();
    }
    s.chars()
        .enumerate()
        .filter(|(i, _)| {
            let p = (*i + 1) as f64;
            p >= first && p < end
        })
        .map(|(_, c)| c)
        .collect()
}

fn system_property<N>(property: &str) -> XPathValue<N> {
    let local = property.rsplit(':').next().unwrap_or(property);
    match local {
        "version" => XPathValue::Number(1.0),
        "vendor" => XPathValue::String("xsltui".to_string()),
        "vendor-url" => XPathValue::String("https://github.com/xsltui/xsltui".to_string()),
        _ => XPathValue::String(String::new()),
    }
}

/// A subset of the JDK `DecimalFormat` patterns `format-number()` uses:
/// `0` and `#` digits, one `.`, `,` grouping, a `%` suffix and a `;` negative sub-pattern.
pub fn format_number(value: f64, pattern: &str) -> String {
    if value.is_nan() {
        return "NaN".to_string();
    }
    let (positive, negative) = match pattern.split_once(';') {
        Some((p, n)) => (p, Some(n)),
        None => (pattern, None),
    };
    let active = match negative {
        Some(n) if value < 0.0 => n,
        _ => positive,
    };
    let is_picture = |c: char| matches!(c, '0' | '#' | '.' | ',');
    let prefix_end = active.find(is_picture).unwrap_or(active.len());
    let suffix_start = active.rfind(is_picture).map_or(prefix_end, |i| i + 1);
    let prefix = &active[..prefix_end];
    let picture = &active[prefix_end..suffix_start.max(prefix_end)];
    let suffix = &active[suffix_start.max(prefix_end)..];

    let mut abs = value.abs();
    if suffix.contains('%') || prefix.contains('%') {
        abs *= 100.0;
    }
    if abs.is_infinite() {
        let sign = if value < 0.0 && negative.is_none() { "-" } else { "" };
        return format!("{}{}Infinity{}", sign, prefix, suffix);
    }

    let (int_picture, frac_picture) = picture.split_once('.').unwrap_or((picture, ""));
    let min_int = int_picture.chars().filter(|&c| c == '0').count();
    let min_frac = frac_picture.chars().filter(|&c| c == '0').count();
    let max_frac = frac_picture.chars().filter(|&c| c == '0' || c == '#').count();
    let grouping = int_picture
        .rfind(',')
        .map(|i| int_picture[i + 1..].chars().filter(|&c| c == '0' || c == '#').count());

    let rounded = format!("{:.*}", max_frac, abs);
    let (int_digits, frac_digits) = rounded.split_once('.').unwrap_or((&rounded, ""));
    let mut frac = frac_digits.to_string();
    while frac.len() > min_frac && frac.ends_with('0') {
        frac.pop();
    }
    let mut int = int_digits.trim_start_matches('0').to_string();
    while int.len() < min_int {
        int.insert(0, '0');
    }
    if let Some(size) = grouping.filter(|&g| g > 0) {
        let chars: Vec<char> = int.chars().collect();
        let mut grouped = String::new();
        for (i, c) in chars.iter().enumerate() {
            if i > 0 && (chars.len() - i) % size == 0 {
                grouped.push(',');
            }
            grouped.push(*c);
        }
        int = grouped;
    }

    let mut out = String::new();
    if value < 0.0 && negative.is_none() && (int.chars().chain(frac.chars()).any(|c| c != '0')) {
        out.push('-');
    }
    out.push_str(prefix);
    out.push_str(&int);
    if !frac.is_empty() {
        out.push('.');
        out.push_str(&frac);
    }
    if int.is_empty() && frac.is_empty() {
        out.push('0');
    }
    out.push_str(suffix);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datasource::tests::{MockNode, create_test_tree};
    use crate::engine::{KeyIndexes, NamespaceBindings, evaluate};
    use crate::parser::parse_expression;
    use std::collections::HashMap;

    fn eval_str(expr: &str) -> String {
        let tree = create_test_tree();
        let vars: HashMap<String, XPathValue<MockNode<'_>>> = HashMap::new();
        let mut keys: KeyIndexes<MockNode<'_>> = HashMap::new();
        keys.entry("by-id".to_string())
            .or_default()
            .insert("p1".to_string(), vec![tree.node(2)]);
        let mut namespaces = NamespaceBindings::new();
        namespaces.insert("xsl".into(), "http://www.w3.org/1999/XSL/Transform".into());
        let para = tree.node(2);
        let ctx = EvaluationContext::new(para, tree.root(), &vars, &keys, &namespaces);
        evaluate(&parse_expression(expr).unwrap(), &ctx)
            .unwrap()
            .to_string()
    }

    #[test]
    fn test_string_functions() {
        assert_eq!(eval_str("concat('a', 1, true())"), "a1true");
        assert_eq!(eval_str("substring('12345', 1.5, 2.6)"), "234");
        assert_eq!(eval_str("substring('12345', 0, 3)"), "12");
        assert_eq!(eval_str("substring-after('2024-01-02', '-')"), "01-02");
        assert_eq!(eval_str("translate('bar', 'abc', 'ABC')"), "BAr");
        assert_eq!(eval_str("translate('--aaa--', 'a-', 'A')"), "AAA");
        assert_eq!(eval_str("normalize-space('  a   b ')"), "a b");
        assert_eq!(eval_str("string-length()"), "5");
    }

    #[test]
    fn test_node_functions() {
        assert_eq!(eval_str("name()"), "para");
        assert_eq!(eval_str("local-name(@xml:lang)"), "lang");
        assert_eq!(eval_str("namespace-uri(@xml:lang)"), XML_NAMESPACE);
        assert_eq!(eval_str("count(/root/*)"), "3");
        assert_eq!(eval_str("lang('EN')"), "true");
        assert_eq!(eval_str("name(id('p1'))"), "para");
        assert_eq!(eval_str("key('by-id', 'p1')"), "Hello");
        assert_eq!(eval_str("generate-id() = generate-id(.)"), "true");
    }

    #[test]
    fn test_number_functions() {
        assert_eq!(eval_str("round(2.5)"), "3");
        assert_eq!(eval_str("round(-2.5)"), "-2");
        assert_eq!(eval_str("floor(-1.5)"), "-2");
        assert_eq!(eval_str("number('abc')"), "NaN");
        assert_eq!(eval_str("sum(/root/para)"), "NaN");
    }

    #[test]
    fn test_xslt_functions() {
        assert_eq!(eval_str("system-property('xsl:version')"), "1");
        assert_eq!(eval_str("function-available('format-number')"), "true");
        assert_eq!(eval_str("element-available('xsl:for-each')"), "true");
        assert_eq!(eval_str("element-available('for-each')"), "false");
        assert_eq!(eval_str("current() = ."), "true");
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(1234.5, "#,##0.00"), "1,234.50");
        assert_eq!(format_number(0.256, "0%"), "26%");
        assert_eq!(format_number(-3.0, "0"), "-3");
        assert_eq!(format_number(-3.0, "0;(0)"), "(3)");
        assert_eq!(format_number(0.5, "#.##"), ".5");
        assert_eq!(format_number(f64::NAN, "0"), "NaN");
    }
}
