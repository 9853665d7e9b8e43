//! Handlers for top-level stylesheet elements.

use crate::ast::{KeyDefinition, NamedTemplate, OutputMethod, SpaceTest, TemplateRule};
use crate::compiler::{CompilerBuilder, is_xsl};
use crate::error::XsltError;
use crate::pattern;
use crate::util::{compilation_error, get_attr_optional, get_attr_required, is_yes};
use roxmltree::Node;
use xsltui_xpath1::parse_expression;

impl CompilerBuilder {
    pub(crate) fn handle_top_level(&mut self, node: Node<'_, '_>) -> Result<(), XsltError> {
        if !is_xsl(node) {
            // User-defined top-level elements are allowed and ignored.
            return Ok(());
        }
        match node.tag_name().name() {
            "template" => self.handle_template(node),
            "output" => self.handle_output(node),
            "key" => self.handle_key(node),
            "variable" => self.handle_global_variable(node, false),
            "param" => self.handle_global_variable(node, true),
            "strip-space" => {
                let tests = self.space_tests(node)?;
                self.stylesheet.strip_space.extend(tests);
                Ok(())
            }
            "preserve-space" => {
                let tests = self.space_tests(node)?;
                self.stylesheet.preserve_space.extend(tests);
                Ok(())
            }
            "attribute-set" | "decimal-format" | "namespace-alias" => {
                log::warn!(
                    "<xsl:{}> is not supported and will be ignored.",
                    node.tag_name().name()
                );
                Ok(())
            }
            "include" | "import" => Err(compilation_error(
                node,
                format!(
                    "<xsl:{}> is not supported: stylesheets must be self-contained",
                    node.tag_name().name()
                ),
            )),
            other => Err(compilation_error(
                node,
                format!("Unknown top-level element <xsl:{}>", other),
            )),
        }
    }

    fn handle_template(&mut self, node: Node<'_, '_>) -> Result<(), XsltError> {
        let name = get_attr_optional(node, "name");
        let match_attr = get_attr_optional(node, "match");
        if name.is_none() && match_attr.is_none() {
            return Err(compilation_error(
                node,
                "<xsl:template> requires a 'match' or 'name' attribute",
            ));
        }

        let params = self.compile_params(node)?;
        let body = self.compile_body(node)?;

        if let Some(name) = name {
            let previous = self.stylesheet.named_templates.insert(
                name.to_string(),
                NamedTemplate {
                    params: params.clone(),
                    body: body.clone(),
                },
            );
            if previous.is_some() {
                log::warn!("Template '{}' is defined more than once; the last definition wins.", name);
            }
        }

        if let Some(match_text) = match_attr {
            let pattern = pattern::parse(match_text)?;
            let explicit_priority = match get_attr_optional(node, "priority") {
                Some(text) => Some(text.trim().parse::<f64>().map_err(|_| {
                    compilation_error(node, format!("Invalid priority '{}'", text))
                })?),
                None => None,
            };
            let mode = get_attr_optional(node, "mode").map(str::to_string);
            let position = self.next_position();
            for alternative in pattern.alternatives() {
                let priority = explicit_priority.unwrap_or_else(|| alternative.default_priority());
                self.add_template_rule(TemplateRule {
                    pattern: alternative,
                    priority,
                    mode: mode.clone(),
                    position,
                    params: params.clone(),
                    body: body.clone(),
                });
            }
        }
        Ok(())
    }

    fn handle_output(&mut self, node: Node<'_, '_>) -> Result<(), XsltError> {
        let output = &mut self.stylesheet.output;
        if let Some(method) = get_attr_optional(node, "method") {
            output.method = OutputMethod::parse(method.trim());
            output.method_declared = true;
        }
        if node.attribute("indent").is_some() {
            output.indent = is_yes(node, "indent");
        }
        if node.attribute("omit-xml-declaration").is_some() {
            output.omit_xml_declaration = is_yes(node, "omit-xml-declaration");
        }
        if let Some(encoding) = get_attr_optional(node, "encoding") {
            output.encoding = Some(encoding.to_string());
        }
        if node.attribute("standalone").is_some() {
            output.standalone = Some(is_yes(node, "standalone"));
        }
        if let Some(public) = get_attr_optional(node, "doctype-public") {
            output.doctype_public = Some(public.to_string());
        }
        if let Some(system) = get_attr_optional(node, "doctype-system") {
            output.doctype_system = Some(system.to_string());
        }
        Ok(())
    }

    fn handle_key(&mut self, node: Node<'_, '_>) -> Result<(), XsltError> {
        let name = get_attr_required(node, "name")?.to_string();
        let pattern = pattern::parse(get_attr_required(node, "match")?)?;
        let use_expr = parse_expression(get_attr_required(node, "use")?)?;
        self.stylesheet.keys.push(KeyDefinition {
            name,
            pattern,
            use_expr,
        });
        Ok(())
    }

    fn space_tests(&self, node: Node<'_, '_>) -> Result<Vec<SpaceTest>, XsltError> {
        let elements = get_attr_required(node, "elements")?;
        let mut tests = Vec::new();
        for token in elements.split_whitespace() {
            let test = match token.split_once(':') {
                None if token == "*" => SpaceTest::Any,
                None => SpaceTest::Name {
                    namespace: None,
                    local: token.to_string(),
                },
                Some((prefix, local)) => {
                    let uri = node.lookup_namespace_uri(Some(prefix)).ok_or_else(|| {
                        compilation_error(node, format!("Undeclared namespace prefix '{}'", prefix))
                    })?;
                    if local == "*" {
                        SpaceTest::Namespace(uri.to_string())
                    } else {
                        SpaceTest::Name {
                            namespace: Some(uri.to_string()),
                            local: local.to_string(),
                        }
                    }
                }
            };
            tests.push(test);
        }
        Ok(tests)
    }
}

#[cfg(test)]
mod tests {
    use crate::ast::SpaceTest;
    use crate::compiler::compile;
    use crate::error::XsltError;

    fn wrap(body: &str) -> String {
        format!(
            r#"<xsl:stylesheet version="1.0" xmlns:xsl="http://www.w3.org/1999/XSL/Transform" xmlns:h="urn:h">{}</xsl:stylesheet>"#,
            body
        )
    }

    #[test]
    fn test_named_and_matching_template() {
        let compiled = compile(&wrap(
            r#"<xsl:template name="row" match="row" priority="2"><xsl:param name="n"/>x</xsl:template>"#,
        ))
        .unwrap();
        assert_eq!(compiled.named_templates["row"].params.len(), 1);
        let rule = &compiled.template_rules[&None][0];
        assert_eq!(rule.priority, 2.0);
        assert_eq!(rule.params[0].name, "n");
        assert_eq!(rule.body.0.len(), 1);
    }

    #[test]
    fn test_space_declarations_and_keys() {
        let compiled = compile(&wrap(
            r#"<xsl:strip-space elements="* h:*"/>
               <xsl:preserve-space elements="pre h:code"/>
               <xsl:key name="by-id" match="item" use="@id"/>"#,
        ))
        .unwrap();
        assert_eq!(
            compiled.strip_space,
            vec![SpaceTest::Any, SpaceTest::Namespace("urn:h".into())]
        );
        assert_eq!(compiled.preserve_space.len(), 2);
        assert_eq!(compiled.keys[0].name, "by-id");
        assert_eq!(compiled.namespaces["h"], "urn:h");
    }

    #[test]
    fn test_rejected_top_level_elements() {
        for body in [
            r#"<xsl:include href="other.xsl"/>"#,
            r#"<xsl:template/>"#,
            r#"<xsl:template match="a" priority="high"/>"#,
            r#"<xsl:bogus/>"#,
        ] {
            assert!(
                matches!(compile(&wrap(body)), Err(XsltError::Compilation { .. })),
                "{} should be rejected",
                body
            );
        }
        assert!(matches!(
            compile(&wrap(r#"<xsl:template match="a["/>"#)),
            Err(XsltError::Pattern { .. })
        ));
        assert!(compile(&wrap(r#"<xsl:decimal-format name="x"/><h:data/>"#)).is_ok());
    }
}
