//! A `nom`-based parser for the XPath 1.0 expression language.

use super::ast::*;
use crate::error::XPathError;
use nom::{
    IResult, Parser,
    branch::alt,
    bytes::complete::{tag, take_while, take_while1},
    character::complete::{char, digit0, digit1, multispace0},
    combinator::{map, not, opt, peek, recognize, value},
    multi::{many0, separated_list0},
    sequence::{delimited, pair, preceded, terminated},
};

type PResult<'a, T> = IResult<&'a str, T>;

const NODE_TYPE_NAMES: [&str; 4] = ["text", "node", "comment", "processing-instruction"];

const AXES: [(&str, Axis); 13] = [
    ("ancestor-or-self", Axis::AncestorOrSelf),
    ("ancestor", Axis::Ancestor),
    ("attribute", Axis::Attribute),
    ("child", Axis::Child),
    ("descendant-or-self", Axis::DescendantOrSelf),
    ("descendant", Axis::Descendant),
    ("following-sibling", Axis::FollowingSibling),
    ("following", Axis::Following),
    ("namespace", Axis::Namespace),
    ("parent", Axis::Parent),
    ("preceding-sibling", Axis::PrecedingSibling),
    ("preceding", Axis::Preceding),
    ("self", Axis::SelfAxis),
];

pub fn parse_expression(input: &str) -> Result<Expression, XPathError> {
    match expression(input) {
        Ok((rest, expr)) if rest.trim().is_empty() => Ok(expr),
        Ok((rest, _)) => Err(XPathError::Syntax {
            expression: input.to_string(),
            message: format!("unexpected '{}'", rest.trim()),
        }),
        Err(e) => Err(XPathError::Syntax {
            expression: input.to_string(),
            message: e.to_string(),
        }),
    }
}

// --- Helpers ---

fn ws<'a, F, O>(inner: F) -> impl Parser<&'a str, Output = O, Error = nom::error::Error<&'a str>>
where
    F: Parser<&'a str, Output = O, Error = nom::error::Error<&'a str>>,
{
    delimited(multispace0, inner, multispace0)
}

fn is_name_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '-' | '.')
}

/// A word operator such as `and` or `div`, which must not run on into a name.
fn keyword<'a>(word: &'static str) -> impl Parser<&'a str, Output = &'a str, Error = nom::error::Error<&'a str>> {
    terminated(tag(word), not(peek(take_while1(is_name_char))))
}

/// Parses `operand (operator operand)*` into a left-associative chain.
fn fold_binary<'a>(
    input: &'a str,
    operand: fn(&'a str) -> PResult<'a, Expression>,
    operator: fn(&'a str) -> PResult<'a, BinaryOperator>,
) -> PResult<'a, Expression> {
    let (mut input, mut left) = operand(input)?;
    loop {
        match preceded(multispace0, operator).parse(input) {
            Ok((rest, op)) => {
                let (rest, right) = operand(rest)?;
                left = Expression::BinaryOp {
                    left: Box::new(left),
                    op,
                    right: Box::new(right),
                };
                input = rest;
            }
            Err(nom::Err::Error(_)) => return Ok((input, left)),
            Err(e) => return Err(e),
        }
    }
}

// --- Expressions, lowest precedence first ---

fn expression(input: &str) -> PResult<'_, Expression> {
    or_expr(input)
}

fn or_expr(input: &str) -> PResult<'_, Expression> {
    fold_binary(input, and_expr, |i| {
        value(BinaryOperator::Or, keyword("or")).parse(i)
    })
}

fn and_expr(input: &str) -> PResult<'_, Expression> {
    fold_binary(input, equality_expr, |i| {
        value(BinaryOperator::And, keyword("and")).parse(i)
    })
}

fn equality_expr(input: &str) -> PResult<'_, Expression> {
    fold_binary(input, relational_expr, |i| {
        alt((
            value(BinaryOperator::NotEquals, tag("!=")),
            value(BinaryOperator::Equals, char('=')),
        ))
        .parse(i)
    })
}

fn relational_expr(input: &str) -> PResult<'_, Expression> {
    fold_binary(input, additive_expr, |i| {
        alt((
            value(BinaryOperator::LessThanOrEqual, tag("<=")),
            value(BinaryOperator::GreaterThanOrEqual, tag(">=")),
            value(BinaryOperator::LessThan, char('<')),
            value(BinaryOperator::GreaterThan, char('>')),
        ))
        .parse(i)
    })
}

fn additive_expr(input: &str) -> PResult<'_, Expression> {
    fold_binary(input, multiplicative_expr, |i| {
        alt((
            value(BinaryOperator::Plus, char('+')),
            value(BinaryOperator::Minus, char('-')),
        ))
        .parse(i)
    })
}

fn multiplicative_expr(input: &str) -> PResult<'_, Expression> {
    fold_binary(input, unary_expr, |i| {
        alt((
            value(BinaryOperator::Multiply, char('*')),
            value(BinaryOperator::Divide, keyword("div")),
            value(BinaryOperator::Modulo, keyword("mod")),
        ))
        .parse(i)
    })
}

fn unary_expr(input: &str) -> PResult<'_, Expression> {
    let (i, signs) = many0(ws(char('-'))).parse(input)?;
    let (i, expr) = union_expr(i)?;
    if signs.len() % 2 == 1 {
        Ok((
            i,
            Expression::UnaryOp {
                op: UnaryOperator::Minus,
                expr: Box::new(expr),
            },
        ))
    } else {
        Ok((i, expr))
    }
}

fn union_expr(input: &str) -> PResult<'_, Expression> {
    fold_binary(input, path_expr, |i| {
        value(BinaryOperator::Union, char('|')).parse(i)
    })
}

fn path_separator(input: &str) -> PResult<'_, &str> {
    preceded(multispace0, alt((tag("//"), tag("/")))).parse(input)
}

fn relative_steps(input: &str) -> PResult<'_, Vec<Step>> {
    let (i, pairs) = many0(pair(path_separator, preceded(multispace0, step))).parse(input)?;
    let mut steps = Vec::with_capacity(pairs.len());
    for (separator, next) in pairs {
        if separator == "//" {
            steps.push(Step::descendant_or_self());
        }
        steps.push(next);
    }
    Ok((i, steps))
}

/// A filter expression optionally followed by a relative path, or a plain location path.
fn path_expr(input: &str) -> PResult<'_, Expression> {
    let (input, _) = multispace0(input)?;
    if let Ok((rest, filter)) = filter_expr(input) {
        let (rest, steps) = relative_steps(rest)?;
        if steps.is_empty() {
            return Ok((rest, filter));
        }
        return Ok((
            rest,
            Expression::LocationPath(LocationPath {
                start_point: Some(Box::new(filter)),
                is_absolute: false,
                steps,
            }),
        ));
    }
    map(location_path, Expression::LocationPath).parse(input)
}

fn filter_expr(input: &str) -> PResult<'_, Expression> {
    let (i, base) = primary_expr(input)?;
    let (i, predicates) = many0(predicate).parse(i)?;
    if predicates.is_empty() {
        Ok((i, base))
    } else {
        Ok((
            i,
            Expression::Filter {
                base: Box::new(base),
                predicates,
            },
        ))
    }
}

fn primary_expr(input: &str) -> PResult<'_, Expression> {
    alt((
        variable_reference,
        map(number_literal, Expression::Number),
        map(string_literal, Expression::Literal),
        function_call,
        delimited(ws(char('(')), expression, preceded(multispace0, char(')'))),
    ))
    .parse(input)
}

fn location_path(input: &str) -> PResult<'_, LocationPath> {
    if let Ok((rest, _)) = tag::<&str, &str, nom::error::Error<&str>>("//")(input) {
        let (rest, first) = preceded(multispace0, step).parse(rest)?;
        let (rest, more) = relative_steps(rest)?;
        let mut steps = vec![Step::descendant_or_self(), first];
        steps.extend(more);
        return Ok((
            rest,
            LocationPath {
                start_point: None,
                is_absolute: true,
                steps,
            },
        ));
    }

    if let Ok((rest, _)) = char::<&str, nom::error::Error<&str>>('/')(input) {
        // `/` on its own selects the root node.
        return match preceded(multispace0, step).parse(rest) {
            Ok((rest, first)) => {
                let (rest, more) = relative_steps(rest)?;
                let mut steps = vec![first];
                steps.extend(more);
                Ok((
                    rest,
                    LocationPath {
                        start_point: None,
                        is_absolute: true,
                        steps,
                    },
                ))
            }
            Err(_) => Ok((
                rest,
                LocationPath {
                    start_point: None,
                    is_absolute: true,
                    steps: vec![],
                },
            )),
        };
    }

    let (rest, first) = step(input)?;
    let (rest, more) = relative_steps(rest)?;
    let mut steps = vec![first];
    steps.extend(more);
    Ok((
        rest,
        LocationPath {
            start_point: None,
            is_absolute: false,
            steps,
        },
    ))
}

// --- Steps ---

pub fn step(input: &str) -> PResult<'_, Step> {
    alt((
        value(Step::parent(), tag("..")),
        value(Step::context(), terminated(char('.'), not(peek(digit1)))),
        full_step,
    ))
    .parse(input)
}

fn full_step(input: &str) -> PResult<'_, Step> {
    let (i, axis) = opt(alt((value(Axis::Attribute, ws(char('@'))), axis_specifier))).parse(input)?;
    let (i, node_test) = node_test(i)?;
    let (i, predicates) = many0(predicate).parse(i)?;
    Ok((
        i,
        Step {
            axis: axis.unwrap_or(Axis::Child),
            node_test,
            predicates,
        },
    ))
}

fn axis_specifier(input: &str) -> PResult<'_, Axis> {
    for (name, axis) in AXES {
        if let Some(rest) = input.strip_prefix(name) {
            if let Ok((rest, _)) = ws(tag::<&str, &str, nom::error::Error<&str>>("::")).parse(rest) {
                return Ok((rest, axis));
            }
        }
    }
    Err(nom::Err::Error(nom::error::Error::new(
        input,
        nom::error::ErrorKind::Tag,
    )))
}

fn predicate(input: &str) -> PResult<'_, Expression> {
    delimited(ws(char('[')), expression, preceded(multispace0, char(']'))).parse(input)
}

// --- Names and node tests ---

pub fn nc_name(input: &str) -> PResult<'_, &str> {
    recognize(pair(take_while1(is_name_start), take_while(is_name_char))).parse(input)
}

pub fn q_name(input: &str) -> PResult<'_, &str> {
    recognize(pair(nc_name, opt(pair(char(':'), nc_name)))).parse(input)
}

fn node_type_test(input: &str) -> PResult<'_, NodeTest> {
    let (i, name) = alt((
        tag("text"),
        tag("node"),
        tag("comment"),
        tag("processing-instruction"),
    ))
    .parse(input)?;
    let (i, _) = ws(char('(')).parse(i)?;
    let (i, target) = if name == "processing-instruction" {
        opt(string_literal).parse(i)?
    } else {
        (i, None)
    };
    let (i, _) = preceded(multispace0, char(')')).parse(i)?;

    let test = match name {
        "text" => NodeTypeTest::Text,
        "comment" => NodeTypeTest::Comment,
        "processing-instruction" => NodeTypeTest::ProcessingInstruction(target),
        _ => NodeTypeTest::Node,
    };
    Ok((i, NodeTest::NodeType(test)))
}

pub fn node_test(input: &str) -> PResult<'_, NodeTest> {
    alt((
        value(NodeTest::Wildcard, char('*')),
        node_type_test,
        map(terminated(nc_name, tag(":*")), |prefix: &str| {
            NodeTest::PrefixWildcard(prefix.to_string())
        }),
        map(q_name, NodeTest::name),
    ))
    .parse(input)
}

// --- Literals ---

fn number_literal(input: &str) -> PResult<'_, f64> {
    let (i, text) = alt((
        recognize(pair(digit1, opt(pair(char('.'), digit0)))),
        recognize(pair(char('.'), digit1)),
    ))
    .parse(input)?;
    match text.parse::<f64>() {
        Ok(n) => Ok((i, n)),
        Err(_) => Err(nom::Err::Error(nom::error::Error::new(
            input,
            nom::error::ErrorKind::Float,
        ))),
    }
}

fn string_literal(input: &str) -> PResult<'_, String> {
    map(
        alt((
            delimited(char('\''), take_while(|c| c != '\''), char('\'')),
            delimited(char('"'), take_while(|c| c != '"'), char('"')),
        )),
        str::to_string,
    )
    .parse(input)
}

fn variable_reference(input: &str) -> PResult<'_, Expression> {
    map(preceded(char('$'), q_name), |name: &str| {
        Expression::Variable(name.to_string())
    })
    .parse(input)
}

fn function_call(input: &str) -> PResult<'_, Expression> {
    let (i, name) = q_name(input)?;
    if NODE_TYPE_NAMES.contains(&name) {
        return Err(nom::Err::Error(nom::error::Error::new(
            input,
            nom::error::ErrorKind::Verify,
        )));
    }
    let (i, _) = ws(char('(')).parse(i)?;
    let (i, args) = separated_list0(ws(char(',')), preceded(multispace0, expression)).parse(i)?;
    let (i, _) = preceded(multispace0, char(')')).parse(i)?;
    Ok((
        i,
        Expression::FunctionCall {
            name: name.to_string(),
            args,
        },
    ))
}
