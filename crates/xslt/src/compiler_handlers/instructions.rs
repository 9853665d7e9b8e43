//! Handlers for `xsl:*` instructions inside template bodies.

use crate::ast::{
    NumberLevel, NumberSpec, PreparsedTemplate, When, XsltInstruction,
};
use crate::compiler::{CompilerBuilder, is_xsl_named};
use crate::error::XsltError;
use crate::pattern;
use crate::util::{compilation_error, get_attr_optional, get_attr_required, is_yes, parse_avt};
use roxmltree::Node;
use xsltui_xpath1::parse_expression;

impl CompilerBuilder {
    /// Compiles one XSLT instruction. Returns `None` for elements the parent consumes.
    pub(crate) fn compile_instruction(&mut self, node: Node<'_, '_>) -> Result<Option<XsltInstruction>, XsltError> {
        let instruction = match node.tag_name().name() {
            "param" | "sort" | "with-param" | "fallback" => return Ok(None),
            "apply-templates" => XsltInstruction::ApplyTemplates {
                select: get_attr_optional(node, "select")
                    .map(parse_expression)
                    .transpose()?,
                mode: get_attr_optional(node, "mode").map(str::to_string),
                sort_keys: self.compile_sort_keys(node)?,
                params: self.compile_with_params(node)?,
            },
            "call-template" => XsltInstruction::CallTemplate {
                name: get_attr_required(node, "name")?.to_string(),
                params: self.compile_with_params(node)?,
            },
            "value-of" => XsltInstruction::ValueOf {
                select: parse_expression(get_attr_required(node, "select")?)?,
                disable_escaping: is_yes(node, "disable-output-escaping"),
            },
            "copy-of" => XsltInstruction::CopyOf {
                select: parse_expression(get_attr_required(node, "select")?)?,
            },
            "copy" => XsltInstruction::Copy {
                body: self.compile_body(node)?,
            },
            "if" => XsltInstruction::If {
                test: parse_expression(get_attr_required(node, "test")?)?,
                body: self.compile_body(node)?,
            },
            "choose" => self.compile_choose(node)?,
            "for-each" => XsltInstruction::ForEach {
                select: parse_expression(get_attr_required(node, "select")?)?,
                sort_keys: self.compile_sort_keys(node)?,
                body: self.compile_body(node)?,
            },
            "variable" => XsltInstruction::Variable {
                name: get_attr_required(node, "name")?.to_string(),
                value: self.compile_variable_value(node)?,
            },
            "text" => XsltInstruction::Text {
                text: node
                    .children()
                    .filter(|n| n.is_text())
                    .filter_map(|n| n.text())
                    .collect(),
                disable_escaping: is_yes(node, "disable-output-escaping"),
            },
            "element" => XsltInstruction::Element {
                name: parse_avt(get_attr_required(node, "name")?)?,
                namespace: get_attr_optional(node, "namespace")
                    .map(parse_avt)
                    .transpose()?,
                body: self.compile_body(node)?,
            },
            "attribute" => XsltInstruction::Attribute {
                name: parse_avt(get_attr_required(node, "name")?)?,
                namespace: get_attr_optional(node, "namespace")
                    .map(parse_avt)
                    .transpose()?,
                body: self.compile_body(node)?,
            },
            "comment" => XsltInstruction::Comment {
                body: self.compile_body(node)?,
            },
            "processing-instruction" => XsltInstruction::ProcessingInstruction {
                name: parse_avt(get_attr_required(node, "name")?)?,
                body: self.compile_body(node)?,
            },
            "number" => self.compile_number(node)?,
            "message" => XsltInstruction::Message {
                body: self.compile_body(node)?,
                terminate: is_yes(node, "terminate"),
            },
            other => {
                return Err(compilation_error(
                    node,
                    format!("Unsupported XSLT instruction <xsl:{}>", other),
                ));
            }
        };
        Ok(Some(instruction))
    }

    fn compile_choose(&mut self, node: Node<'_, '_>) -> Result<XsltInstruction, XsltError> {
        let mut whens = Vec::new();
        let mut otherwise: Option<PreparsedTemplate> = None;
        for child in node.children().filter(|n| n.is_element()) {
            if is_xsl_named(child, "when") {
                whens.push(When {
                    test: parse_expression(get_attr_required(child, "test")?)?,
                    body: self.compile_body(child)?,
                });
            } else if is_xsl_named(child, "otherwise") {
                otherwise = Some(self.compile_body(child)?);
            } else {
                return Err(compilation_error(
                    child,
                    "<xsl:choose> may only contain <xsl:when> and <xsl:otherwise>",
                ));
            }
        }
        if whens.is_empty() {
            return Err(compilation_error(
                node,
                "<xsl:choose> requires at least one <xsl:when>",
            ));
        }
        Ok(XsltInstruction::Choose { whens, otherwise })
    }

    fn compile_number(&mut self, node: Node<'_, '_>) -> Result<XsltInstruction, XsltError> {
        let level = match get_attr_optional(node, "level") {
            None | Some("single") => NumberLevel::Single,
            Some("any") => NumberLevel::Any,
            Some(other) => {
                log::warn!("xsl:number level '{}' is not supported, using 'single'.", other);
                NumberLevel::Single
            }
        };
        Ok(XsltInstruction::Number(Box::new(NumberSpec {
            value: get_attr_optional(node, "value")
                .map(parse_expression)
                .transpose()?,
            level,
            count: get_attr_optional(node, "count")
                .map(pattern::parse)
                .transpose()?,
            from: get_attr_optional(node, "from")
                .map(pattern::parse)
                .transpose()?,
            format: parse_avt(get_attr_optional(node, "format").unwrap_or("1"))?,
        })))
    }
}

#[cfg(test)]
mod tests {
    use crate::ast::{AttributeValueTemplate, NumberLevel, XsltInstruction};
    use crate::compiler::compile;
    use crate::error::XsltError;

    fn template_body(body: &str) -> Result<Vec<XsltInstruction>, XsltError> {
        let compiled = compile(&format!(
            r#"<xsl:stylesheet version="1.0" xmlns:xsl="http://www.w3.org/1999/XSL/Transform"><xsl:template match="/">{}</xsl:template></xsl:stylesheet>"#,
            body
        ))?;
        Ok(compiled.template_rules[&None][0].body.0.clone())
    }

    #[test]
    fn test_text_keeps_whitespace() {
        let body = template_body("<xsl:text> </xsl:text>\n  <b/>").unwrap();
        assert_eq!(body.len(), 2);
        assert!(matches!(&body[0], XsltInstruction::Text { text, .. } if text == " "));
    }

    #[test]
    fn test_element_with_avt_name() {
        let body = template_body(r#"<xsl:element name="h{1 + 1}"><xsl:attribute name="id">x</xsl:attribute></xsl:element>"#).unwrap();
        let XsltInstruction::Element { name, body, .. } = &body[0] else {
            panic!("expected xsl:element");
        };
        assert!(matches!(name, AttributeValueTemplate::Dynamic(_)));
        assert!(matches!(body.0[0], XsltInstruction::Attribute { .. }));
    }

    #[test]
    fn test_choose_and_number() {
        let body = template_body(
            r#"<xsl:choose><xsl:when test="1">a</xsl:when><xsl:otherwise>b</xsl:otherwise></xsl:choose>
               <xsl:number level="any" count="item" format="i"/>"#,
        )
        .unwrap();
        assert!(matches!(&body[0], XsltInstruction::Choose { whens, otherwise: Some(_) } if whens.len() == 1));
        let XsltInstruction::Number(spec) = &body[1] else {
            panic!("expected xsl:number");
        };
        assert_eq!(spec.level, NumberLevel::Any);
        assert!(spec.count.is_some());

        assert!(template_body("<xsl:choose><xsl:otherwise/></xsl:choose>").is_err());
    }
}
