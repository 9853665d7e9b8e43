//! A dedicated engine for parsing and evaluating XSLT `match` patterns.
use crate::error::XsltError;
use nom::IResult;
use nom::Parser;
use nom::branch::alt;
use nom::bytes::complete::tag;
use nom::character::complete::multispace0;
use nom::combinator::{map, opt};
use nom::multi::{many0, separated_list1};
use nom::sequence::{pair, preceded};
use std::fmt;
use xsltui_xpath1::ast::{Axis, NodeTest, NodeTypeTest, Step};
use xsltui_xpath1::engine::{EvaluationContext, XPathValue, evaluate, matches_node_test};
use xsltui_xpath1::parser as xpath_parser;
use xsltui_xpath1::{DataSourceNode, NodeType, XPathError};

/// How a step is joined to the step before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Separator {
    /// `/`: the previous step matches the parent.
    Child,
    /// `//`: the previous step matches some ancestor.
    Descendant,
}

#[derive(Debug, Clone, PartialEq)]
struct PatternStep {
    separator: Separator,
    step: Step,
}

/// A single location path within a pattern, e.g. `/doc/section/para`.
#[derive(Debug, Clone, PartialEq)]
struct LocationPathPattern {
    /// `Some` for patterns anchored at the root (`/a` or `//a`).
    root: Option<Separator>,
    steps: Vec<PatternStep>,
}

/// A compiled representation of an XSLT match pattern.
#[derive(Debug, Clone, PartialEq)]
pub struct Pattern {
    /// A pattern can be a union of multiple paths, e.g., "para|note".
    paths: Vec<LocationPathPattern>,
    original_text: String,
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.original_text)
    }
}

impl Pattern {
    /// Evaluates if a given node matches this compiled pattern.
    pub fn matches<'a, N: DataSourceNode<'a> + 'a>(
        &self,
        node: N,
        e_ctx: &EvaluationContext<'a, '_, N>,
    ) -> Result<bool, XPathError> {
        for path in &self.paths {
            if path.matches(node, e_ctx)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Splits a union pattern into its alternatives, which XSLT treats as separate rules.
    pub fn alternatives(&self) -> Vec<Pattern> {
        self.paths
            .iter()
            .map(|path| Pattern {
                paths: vec![path.clone()],
                original_text: self.original_text.clone(),
            })
            .collect()
    }

    /// The default priority of XSLT 1.0 §5.5; for unions, the highest alternative.
    pub fn default_priority(&self) -> f64 {
        self.paths
            .iter()
            .map(LocationPathPattern::default_priority)
            .fold(f64::NEG_INFINITY, f64::max)
    }
}

impl LocationPathPattern {
    fn default_priority(&self) -> f64 {
        if self.root.is_some() || self.steps.len() != 1 {
            return 0.5;
        }
        let step = &self.steps[0].step;
        if !step.predicates.is_empty() {
            return 0.5;
        }
        match &step.node_test {
            NodeTest::Name { .. } => 0.0,
            NodeTest::NodeType(NodeTypeTest::ProcessingInstruction(Some(_))) => 0.0,
            NodeTest::PrefixWildcard(_) => -0.25,
            NodeTest::Wildcard | NodeTest::NodeType(_) => -0.5,
        }
    }

    fn matches<'a, N: DataSourceNode<'a> + 'a>(
        &self,
        node: N,
        e_ctx: &EvaluationContext<'a, '_, N>,
    ) -> Result<bool, XPathError> {
        if self.steps.is_empty() {
            // Special case for "/"
            return Ok(node == e_ctx.root_node);
        }
        self.matches_from(node, self.steps.len() - 1, e_ctx)
    }

    /// Matches `steps[..=index]` right to left, with `node` standing for `steps[index]`.
    fn matches_from<'a, N: DataSourceNode<'a> + 'a>(
        &self,
        node: N,
        index: usize,
        e_ctx: &EvaluationContext<'a, '_, N>,
    ) -> Result<bool, XPathError> {
        let pattern_step = &self.steps[index];
        if !step_matches(&pattern_step.step, node, e_ctx)? {
            return Ok(false);
        }
        if index == 0 {
            return Ok(match self.root {
                None => true,
                Some(Separator::Child) => node.parent() == Some(e_ctx.root_node),
                // Every node in the tree descends from the root.
                Some(Separator::Descendant) => true,
            });
        }
        let mut candidate = node.parent();
        while let Some(ancestor) = candidate {
            if self.matches_from(ancestor, index - 1, e_ctx)? {
                return Ok(true);
            }
            if pattern_step.separator == Separator::Child {
                break;
            }
            candidate = ancestor.parent();
        }
        Ok(false)
    }
}

fn step_matches<'a, N: DataSourceNode<'a> + 'a>(
    step: &Step,
    node: N,
    e_ctx: &EvaluationContext<'a, '_, N>,
) -> Result<bool, XPathError> {
    let node_type = node.node_type();
    let on_axis = match step.axis {
        Axis::Attribute => node_type == NodeType::Attribute,
        _ => node_type != NodeType::Attribute && node_type != NodeType::Root,
    };
    if !on_axis || !matches_node_test(node, &step.node_test, step.axis, e_ctx)? {
        return Ok(false);
    }
    if step.predicates.is_empty() {
        return Ok(true);
    }

    // Predicate positions count the node's siblings along the same axis that pass the node test.
    let Some(parent) = node.parent() else {
        return Ok(false);
    };
    let siblings: Box<dyn Iterator<Item = N> + 'a> = if step.axis == Axis::Attribute {
        parent.attributes()
    } else {
        parent.children()
    };
    let mut candidates = Vec::new();
    for sibling in siblings {
        if matches_node_test(sibling, &step.node_test, step.axis, e_ctx)? {
            candidates.push(sibling);
        }
    }
    for predicate in &step.predicates {
        let size = candidates.len();
        let mut kept = Vec::with_capacity(size);
        for (i, candidate) in candidates.iter().enumerate() {
            let inner = e_ctx.with_focus(*candidate, i + 1, size);
            let keep = match evaluate(predicate, &inner)? {
                XPathValue::Number(n) => n == (i + 1) as f64,
                other => other.to_bool(),
            };
            if keep {
                kept.push(*candidate);
            }
        }
        candidates = kept;
    }
    Ok(candidates.contains(&node))
}

// --- Parser ---

pub fn parse(text: &str) -> Result<Pattern, XsltError> {
    match pattern_parser(text.trim()) {
        Ok(("", paths)) => Ok(Pattern {
            paths,
            original_text: text.to_string(),
        }),
        Ok((rem, _)) => Err(XsltError::Pattern {
            pattern: text.to_string(),
            message: format!("Unconsumed input in pattern: {}", rem),
        }),
        Err(e) => Err(XsltError::Pattern {
            pattern: text.to_string(),
            message: e.to_string(),
        }),
    }
}

fn step_parser(input: &str) -> IResult<&str, Step> {
    let (rest, step) = preceded(multispace0, xpath_parser::step).parse(input)?;
    match step.axis {
        Axis::Child | Axis::Attribute => Ok((rest, step)),
        _ => Err(nom::Err::Failure(nom::error::Error::new(
            input,
            nom::error::ErrorKind::Verify,
        ))),
    }
}

fn separator(input: &str) -> IResult<&str, Separator> {
    preceded(
        multispace0,
        alt((
            map(tag("//"), |_| Separator::Descendant),
            map(tag("/"), |_| Separator::Child),
        )),
    )
    .parse(input)
}

fn relative_path(input: &str, first: Separator) -> IResult<&str, Vec<PatternStep>> {
    let (rest, head) = step_parser(input)?;
    let (rest, tail) = many0(pair(separator, step_parser)).parse(rest)?;
    let mut steps = vec![PatternStep {
        separator: first,
        step: head,
    }];
    steps.extend(
        tail.into_iter()
            .map(|(separator, step)| PatternStep { separator, step }),
    );
    Ok((rest, steps))
}

fn path_parser(input: &str) -> IResult<&str, LocationPathPattern> {
    let (rest, root) = opt(separator).parse(input)?;
    match root {
        // `/` alone matches the root node.
        Some(Separator::Child) => match relative_path(rest, Separator::Child) {
            Ok((rest, steps)) => Ok((rest, LocationPathPattern { root, steps })),
            Err(nom::Err::Error(_)) => Ok((
                rest,
                LocationPathPattern {
                    root,
                    steps: vec![],
                },
            )),
            Err(e) => Err(e),
        },
        _ => {
            let (rest, steps) = relative_path(rest, Separator::Child)?;
            Ok((rest, LocationPathPattern { root, steps }))
        }
    }
}

fn pattern_parser(input: &str) -> IResult<&str, Vec<LocationPathPattern>> {
    let (rest, paths) =
        separated_list1(preceded(multispace0, tag("|")), path_parser).parse(input)?;
    let (rest, _) = multispace0::<&str, nom::error::Error<&str>>(rest)?;
    Ok((rest, paths))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use xsltui_xpath1::engine::{KeyIndexes, NamespaceBindings};
    use xsltui_xpath1::tests::{MockNode, MockTree, create_test_tree};

    fn matches(pattern: &str, tree: &MockTree, id: usize) -> bool {
        let vars: HashMap<String, XPathValue<MockNode<'_>>> = HashMap::new();
        let keys: KeyIndexes<MockNode<'_>> = HashMap::new();
        let namespaces = NamespaceBindings::new();
        let root = tree.root();
        let ctx = EvaluationContext::new(root, root, &vars, &keys, &namespaces);
        parse(pattern).unwrap().matches(tree.node(id), &ctx).unwrap()
    }

    #[test]
    fn test_pattern_parsing() {
        for pattern in [
            "foo",
            "foo/bar",
            "/",
            "/*",
            "/root/item",
            "foo | bar",
            "text()",
            "@id",
            "*",
            "foo/*/@id",
            "//para",
            "section//para[2]",
            "child::item",
        ] {
            assert!(parse(pattern).is_ok(), "pattern {} should parse", pattern);
        }
        assert!(parse("ancestor::foo").is_err());
        assert!(parse("foo/").is_err());
    }

    #[test]
    fn test_simple_name_match() {
        let tree = create_test_tree();
        assert!(matches("para", &tree, 2));
        assert!(!matches("para", &tree, 1));
    }

    #[test]
    fn test_absolute_patterns() {
        let tree = create_test_tree();
        assert!(matches("/", &tree, 0));
        assert!(!matches("/", &tree, 1));
        assert!(matches("/*", &tree, 1));
        assert!(!matches("/*", &tree, 2));
        assert!(matches("//para", &tree, 9));
        assert!(matches("/root/para/text()", &tree, 5));
    }

    #[test]
    fn test_path_and_attribute_match() {
        let tree = create_test_tree();
        assert!(matches("para/text()", &tree, 5));
        assert!(!matches("para/text()", &tree, 2));
        assert!(matches("@id", &tree, 3));
        assert!(!matches("@id", &tree, 2));
        assert!(matches("root//text()", &tree, 10));
        assert!(matches("comment()", &tree, 6));
        assert!(matches("processing-instruction('target')", &tree, 8));
    }

    #[test]
    fn test_predicates_count_siblings() {
        let tree = create_test_tree();
        assert!(matches("para[1]", &tree, 2));
        assert!(!matches("para[1]", &tree, 9));
        assert!(matches("para[last()]", &tree, 9));
        assert!(matches("para[@id='p1']", &tree, 2));
    }

    #[test]
    fn test_union_match() {
        let tree = create_test_tree();
        assert!(matches("nonexistent|para", &tree, 2));
        assert_eq!(parse("a|b").unwrap().alternatives().len(), 2);
    }

    #[test]
    fn test_default_priorities() {
        let priority = |p: &str| parse(p).unwrap().default_priority();
        assert_eq!(priority("para"), 0.0);
        assert_eq!(priority("@id"), 0.0);
        assert_eq!(priority("*"), -0.5);
        assert_eq!(priority("text()"), -0.5);
        assert_eq!(priority("x:*"), -0.25);
        assert_eq!(priority("para[1]"), 0.5);
        assert_eq!(priority("root/para"), 0.5);
        assert_eq!(priority("/"), 0.5);
    }
}
