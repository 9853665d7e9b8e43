//! Small helpers shared by the compiler: attribute access and AVT parsing.

use crate::ast::{AttributeValueTemplate, AvtPart};
use crate::error::{Location, XsltError};
use roxmltree::Node;

pub(crate) fn location_of(node: Node<'_, '_>) -> Location {
    node.document().text_pos_at(node.range().start).into()
}

pub(crate) fn compilation_error(node: Node<'_, '_>, message: impl Into<String>) -> XsltError {
    XsltError::Compilation {
        message: message.into(),
        location: location_of(node),
    }
}

/// An attribute in no namespace. An empty value counts as absent.
pub(crate) fn get_attr_optional<'a>(node: Node<'a, '_>, name: &str) -> Option<&'a str> {
    node.attribute(name).filter(|value| !value.is_empty())
}

pub(crate) fn get_attr_required<'a>(node: Node<'a, '_>, name: &str) -> Result<&'a str, XsltError> {
    get_attr_optional(node, name).ok_or_else(|| {
        compilation_error(
            node,
            format!(
                "Missing required attribute '{}' on <xsl:{}>",
                name,
                node.tag_name().name()
            ),
        )
    })
}

pub(crate) fn is_yes(node: Node<'_, '_>, name: &str) -> bool {
    node.attribute(name).map(str::trim) == Some("yes")
}

pub(crate) fn parse_avt(s: &str) -> Result<AttributeValueTemplate, XsltError> {
    if !s.contains('{') && !s.contains('}') {
        return Ok(AttributeValueTemplate::Static(s.to_string()));
    }

    let mut parts = Vec::new();
    let mut current_static = String::new();
    let mut chars = s.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '{' => {
                if chars.peek() == Some(&'{') {
                    chars.next();
                    current_static.push('{');
                    continue;
                }
                if !current_static.is_empty() {
                    parts.push(AvtPart::Static(std::mem::take(&mut current_static)));
                }
                // The expression runs to the first `}` outside a string literal.
                let mut expr_str = String::new();
                let mut quote: Option<char> = None;
                let mut closed = false;
                for ec in chars.by_ref() {
                    match (quote, ec) {
                        (None, '}') => {
                            closed = true;
                            break;
                        }
                        (None, '"' | '\'') => quote = Some(ec),
                        (Some(q), _) if q == ec => quote = None,
                        _ => {}
                    }
                    expr_str.push(ec);
                }
                if !closed {
                    return Err(XsltError::XPath(xsltui_xpath1::XPathError::Syntax {
                        expression: s.to_string(),
                        message: "Unterminated '{' in attribute value template".to_string(),
                    }));
                }
                parts.push(AvtPart::Dynamic(xsltui_xpath1::parse_expression(&expr_str)?));
            }
            '}' => {
                if chars.peek() == Some(&'}') {
                    chars.next();
                }
                current_static.push('}');
            }
            _ => current_static.push(c),
        }
    }

    if !current_static.is_empty() {
        parts.push(AvtPart::Static(current_static));
    }

    match parts.as_slice() {
        [] => Ok(AttributeValueTemplate::Static(String::new())),
        [AvtPart::Static(s)] => Ok(AttributeValueTemplate::Static(s.clone())),
        _ => Ok(AttributeValueTemplate::Dynamic(parts)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use xsltui_xpath1::Expression;

    #[test]
    fn test_static_and_escaped_braces() {
        assert_eq!(
            parse_avt("plain").unwrap(),
            AttributeValueTemplate::Static("plain".into())
        );
        assert_eq!(
            parse_avt("{{x}}").unwrap(),
            AttributeValueTemplate::Static("{x}".into())
        );
    }

    #[test]
    fn test_dynamic_parts() {
        let avt = parse_avt("item-{@id}-{'}'}").unwrap();
        let AttributeValueTemplate::Dynamic(parts) = avt else {
            panic!("expected a dynamic template");
        };
        assert_eq!(parts.len(), 4);
        assert_eq!(parts[0], AvtPart::Static("item-".into()));
        assert_eq!(parts[3], AvtPart::Dynamic(Expression::Literal("}".into())));
        assert!(parse_avt("{@id").is_err());
    }
}
