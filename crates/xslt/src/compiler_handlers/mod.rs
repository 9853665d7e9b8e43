pub(super) mod instructions;
pub(super) mod stylesheet;
pub(super) mod variables;

use crate::ast::{LiteralAttribute, PreparsedTemplate, XSLT_NAMESPACE, XsltInstruction};
use crate::compiler::{CompilerBuilder, is_xsl};
use crate::error::XsltError;
use crate::util::parse_avt;
use roxmltree::Node;
use xsltui_xpath1::XML_NAMESPACE;

// Shared body compilation, implemented as methods on CompilerBuilder.

/// The name of an element or attribute as written, reconstructed from its namespace.
pub(crate) fn qualified_name(
    node: Node<'_, '_>,
    namespace: Option<&str>,
    local: &str,
    allow_default: bool,
) -> String {
    let Some(uri) = namespace else {
        return local.to_string();
    };
    if uri == XML_NAMESPACE {
        return format!("xml:{}", local);
    }
    let mut prefixed = None;
    for ns in node.namespaces().filter(|ns| ns.uri() == uri) {
        match ns.name() {
            None if allow_default => return local.to_string(),
            Some(prefix) if prefixed.is_none() => prefixed = Some(prefix),
            _ => {}
        }
    }
    match prefixed {
        Some(prefix) => format!("{}:{}", prefix, local),
        None => local.to_string(),
    }
}

/// Whether whitespace-only text in the stylesheet at `node` is kept.
fn preserves_space(node: Node<'_, '_>) -> bool {
    node.ancestors()
        .filter(|n| n.is_element())
        .find_map(|n| n.attribute((XML_NAMESPACE, "space")))
        == Some("preserve")
}

impl CompilerBuilder {
    /// Compiles the content of `parent` into a template body.
    ///
    /// `xsl:param`, `xsl:sort` and `xsl:with-param` children are skipped here; the
    /// parent instruction reads them itself.
    pub(crate) fn compile_body(&mut self, parent: Node<'_, '_>) -> Result<PreparsedTemplate, XsltError> {
        let mut body = Vec::new();
        for child in parent.children() {
            if child.is_text() {
                let text = child.text().unwrap_or("");
                if !text.trim().is_empty() || preserves_space(parent) {
                    body.push(XsltInstruction::Text {
                        text: text.to_string(),
                        disable_escaping: false,
                    });
                }
            } else if is_xsl(child) {
                if let Some(instruction) = self.compile_instruction(child)? {
                    body.push(instruction);
                }
            } else if child.is_element() {
                body.push(self.compile_literal_element(child)?);
            }
        }
        Ok(PreparsedTemplate(body))
    }

    pub(crate) fn compile_literal_element(&mut self, node: Node<'_, '_>) -> Result<XsltInstruction, XsltError> {
        let tag = node.tag_name();
        let name = qualified_name(node, tag.namespace(), tag.name(), true);

        let mut attributes = Vec::new();
        for attr in node.attributes() {
            if attr.namespace() == Some(XSLT_NAMESPACE) {
                continue;
            }
            attributes.push(LiteralAttribute {
                name: qualified_name(node, attr.namespace(), attr.name(), false),
                namespace: attr.namespace().map(str::to_string),
                value: parse_avt(attr.value())?,
            });
        }

        let namespaces = node
            .namespaces()
            .filter(|ns| !self.excluded_namespaces.contains(ns.uri()))
            .map(|ns| (ns.name().unwrap_or("").to_string(), ns.uri().to_string()))
            .collect();

        Ok(XsltInstruction::LiteralElement {
            name,
            namespace: tag.namespace().map(str::to_string),
            attributes,
            namespaces,
            body: self.compile_body(node)?,
        })
    }
}
