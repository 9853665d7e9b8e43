//! Compiles a stylesheet document into a [`CompiledStylesheet`].

use crate::ast::{CompiledStylesheet, PreparsedTemplate, TemplateRule, XSLT_NAMESPACE};
use crate::error::XsltError;
use crate::pattern;
use crate::util::compilation_error;
use roxmltree::{Document, Node, ParsingOptions};
use std::cmp::Ordering;
use std::collections::HashSet;

pub(crate) fn is_xsl(node: Node<'_, '_>) -> bool {
    node.is_element() && node.tag_name().namespace() == Some(XSLT_NAMESPACE)
}

pub(crate) fn is_xsl_named(node: Node<'_, '_>, local: &str) -> bool {
    is_xsl(node) && node.tag_name().name() == local
}

/// Parses stylesheet text with the options stylesheets need (DTDs allowed).
pub fn parse_document(source: &str) -> Result<Document<'_>, XsltError> {
    let options = ParsingOptions {
        allow_dtd: true,
        ..ParsingOptions::default()
    };
    Ok(Document::parse_with_options(source, options)?)
}

/// Accumulates compiler state while walking the stylesheet tree.
pub(crate) struct CompilerBuilder {
    pub(crate) stylesheet: CompiledStylesheet,
    /// Namespace URIs never copied to the result (`exclude-result-prefixes` plus XSLT).
    pub(crate) excluded_namespaces: HashSet<String>,
    next_position: usize,
}

impl CompilerBuilder {
    fn new() -> Self {
        let mut excluded_namespaces = HashSet::new();
        excluded_namespaces.insert(XSLT_NAMESPACE.to_string());
        excluded_namespaces.insert(xsltui_xpath1::XML_NAMESPACE.to_string());
        CompilerBuilder {
            stylesheet: CompiledStylesheet::default(),
            excluded_namespaces,
            next_position: 0,
        }
    }

    pub(crate) fn next_position(&mut self) -> usize {
        self.next_position += 1;
        self.next_position
    }

    /// Prefix bindings declared anywhere in the stylesheet; the first declaration wins.
    fn collect_namespaces(&mut self, root: Node<'_, '_>) {
        for node in root.descendants().filter(|n| n.is_element()) {
            for ns in node.namespaces() {
                if let Some(prefix) = ns.name() {
                    self.stylesheet
                        .namespaces
                        .entry(prefix.to_string())
                        .or_insert_with(|| ns.uri().to_string());
                }
            }
        }
    }

    fn exclude_prefixes(&mut self, element: Node<'_, '_>, list: Option<&str>) {
        for prefix in list.unwrap_or("").split_whitespace() {
            let lookup = if prefix == "#default" { None } else { Some(prefix) };
            if let Some(uri) = element.lookup_namespace_uri(lookup) {
                self.excluded_namespaces.insert(uri.to_string());
            }
        }
    }

    pub(crate) fn add_template_rule(&mut self, rule: TemplateRule) {
        self.stylesheet
            .template_rules
            .entry(rule.mode.clone())
            .or_default()
            .push(rule);
    }

    fn finish(mut self) -> CompiledStylesheet {
        for rules in self.stylesheet.template_rules.values_mut() {
            // Best match first: highest priority, then last declared.
            rules.sort_by(|a, b| {
                b.priority
                    .partial_cmp(&a.priority)
                    .unwrap_or(Ordering::Equal)
                    .then(b.position.cmp(&a.position))
            });
        }
        self.stylesheet
    }
}

pub fn compile(source: &str) -> Result<CompiledStylesheet, XsltError> {
    let doc = parse_document(source)?;
    compile_document(&doc)
}

pub fn compile_document(doc: &Document<'_>) -> Result<CompiledStylesheet, XsltError> {
    let root = doc.root_element();
    let mut builder = CompilerBuilder::new();
    builder.collect_namespaces(root);

    if is_xsl_named(root, "stylesheet") || is_xsl_named(root, "transform") {
        builder.exclude_prefixes(root, root.attribute("exclude-result-prefixes"));
        builder.exclude_prefixes(root, root.attribute("extension-element-prefixes"));
        for child in root.children().filter(|n| n.is_element()) {
            builder.handle_top_level(child)?;
        }
    } else if root.attribute((XSLT_NAMESPACE, "version")).is_some() {
        // A literal result element used as the stylesheet: one template for "/".
        builder.exclude_prefixes(
            root,
            root.attribute((XSLT_NAMESPACE, "exclude-result-prefixes")),
        );
        let body = PreparsedTemplate(vec![builder.compile_literal_element(root)?]);
        let position = builder.next_position();
        builder.add_template_rule(TemplateRule {
            pattern: pattern::parse("/")?,
            priority: 0.5,
            mode: None,
            position,
            params: vec![],
            body,
        });
    } else {
        return Err(compilation_error(
            root,
            format!(
                "<{}> is not an XSLT stylesheet: expected xsl:stylesheet or xsl:transform",
                root.tag_name().name()
            ),
        ));
    }

    let stylesheet = builder.finish();
    log::debug!(
        "Compiled stylesheet: {} rule mode(s), {} named template(s), {} key(s)",
        stylesheet.template_rules.len(),
        stylesheet.named_templates.len(),
        stylesheet.keys.len()
    );
    Ok(stylesheet)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{OutputMethod, XsltInstruction};

    const XSL_OPEN: &str = r#"<xsl:stylesheet version="1.0" xmlns:xsl="http://www.w3.org/1999/XSL/Transform">"#;

    fn try_body(body: &str) -> Result<CompiledStylesheet, XsltError> {
        compile(&format!("{}{}</xsl:stylesheet>", XSL_OPEN, body))
    }

    fn compile_body(body: &str) -> CompiledStylesheet {
        try_body(body).unwrap()
    }

    #[test]
    fn test_rules_sorted_by_priority_then_position() {
        let compiled = compile_body(
            r#"<xsl:template match="*">a</xsl:template>
               <xsl:template match="item">b</xsl:template>
               <xsl:template match="item">c</xsl:template>
               <xsl:template match="x|list/item" mode="m">d</xsl:template>"#,
        );
        let rules = &compiled.template_rules[&None];
        let bodies: Vec<_> = rules
            .iter()
            .map(|r| match &r.body.0[0] {
                XsltInstruction::Text { text, .. } => text.as_str(),
                other => panic!("unexpected {:?}", other),
            })
            .collect();
        assert_eq!(bodies, vec!["c", "b", "a"]);

        let moded = &compiled.template_rules[&Some("m".to_string())];
        assert_eq!(moded.len(), 2);
        assert_eq!(moded[0].priority, 0.5);
        assert_eq!(moded[1].priority, 0.0);
    }

    #[test]
    fn test_output_settings() {
        let compiled = compile_body(r#"<xsl:output method="html" indent="yes"/>"#);
        assert_eq!(compiled.output.method, OutputMethod::Html);
        assert!(compiled.output.method_declared);
        assert!(compiled.output.indent);

        let compiled = compile_body(r#"<xsl:output method=""/>"#);
        assert_eq!(compiled.output.method, OutputMethod::Xml);
        assert!(!compiled.output.method_declared);
    }

    #[test]
    fn test_simplified_stylesheet() {
        let compiled = compile(
            r#"<html xsl:version="1.0" xmlns:xsl="http://www.w3.org/1999/XSL/Transform"><p><xsl:value-of select="/a"/></p></html>"#,
        )
        .unwrap();
        let rules = &compiled.template_rules[&None];
        assert_eq!(rules.len(), 1);
        assert!(matches!(
            rules[0].body.0[0],
            XsltInstruction::LiteralElement { ref name, .. } if name == "html"
        ));
    }

    #[test]
    fn test_errors_carry_locations() {
        let err = try_body("\n<xsl:template match=\"/\"><xsl:frobnicate/></xsl:template>").unwrap_err();
        match err {
            XsltError::Compilation { message, location } => {
                assert!(message.contains("frobnicate"));
                assert_eq!(location.line, 2);
            }
            other => panic!("unexpected error {:?}", other),
        }
        assert!(matches!(
            compile("<not-a-stylesheet/>").unwrap_err(),
            XsltError::Compilation { .. }
        ));
        assert!(matches!(
            try_body(r#"<xsl:template match="/"><xsl:value-of/></xsl:template>"#).unwrap_err(),
            XsltError::Compilation { .. }
        ));
        assert!(matches!(
            try_body(r#"<xsl:template match="/"><xsl:value-of select="1 +"/></xsl:template>"#)
                .unwrap_err(),
            XsltError::XPath(_)
        ));
    }
}
