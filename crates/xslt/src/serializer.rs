//! Serializes a [`ResultTree`] according to `xsl:output`.

use crate::ast::{OutputMethod, OutputSettings};
use crate::output::{ResultElement, ResultNode, ResultTree};
use quick_xml::escape::partial_escape;
use xsltui_xpath1::XML_NAMESPACE;

/// Elements the HTML output method writes without an end tag.
const HTML_VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param",
    "source", "track", "wbr",
];

/// Elements whose text content the HTML output method does not escape.
const HTML_RAW_TEXT_ELEMENTS: &[&str] = &["script", "style"];

pub fn serialize(tree: &ResultTree, settings: &OutputSettings) -> String {
    match settings.method {
        OutputMethod::Text => tree.string_value(),
        OutputMethod::Html => {
            let mut serializer = Serializer::new(settings, true);
            serializer.write_doctype(tree, "html");
            serializer.write_nodes(&tree.children, 0, false);
            serializer.out
        }
        OutputMethod::Xml | OutputMethod::Other(_) => {
            let mut serializer = Serializer::new(settings, false);
            if !settings.omit_xml_declaration {
                serializer.write_declaration();
            }
            let root_name = tree
                .document_element()
                .map_or("root", |element| element.name.as_str());
            serializer.write_doctype(tree, root_name);
            serializer.write_nodes(&tree.children, 0, false);
            serializer.out
        }
    }
}

fn escape_attribute(value: &str) -> String {
    partial_escape(value).replace('"', "&quot;")
}

struct Serializer<'s> {
    settings: &'s OutputSettings,
    html: bool,
    out: String,
    /// In-scope namespace bindings, innermost last. The empty prefix is the default namespace.
    bindings: Vec<(String, String)>,
    generated_prefixes: usize,
}

impl<'s> Serializer<'s> {
    fn new(settings: &'s OutputSettings, html: bool) -> Self {
        Serializer {
            settings,
            html,
            out: String::new(),
            bindings: Vec::new(),
            generated_prefixes: 0,
        }
    }

    fn write_declaration(&mut self) {
        let encoding = self.settings.encoding.as_deref().unwrap_or("UTF-8");
        self.out
            .push_str(&format!("<?xml version=\"1.0\" encoding=\"{}\"", encoding));
        if let Some(standalone) = self.settings.standalone {
            self.out.push_str(if standalone {
                " standalone=\"yes\""
            } else {
                " standalone=\"no\""
            });
        }
        self.out.push_str("?>\n");
    }

    fn write_doctype(&mut self, tree: &ResultTree, root_name: &str) {
        let name = tree
            .document_element()
            .map_or(root_name, |element| element.name.as_str());
        match (&self.settings.doctype_public, &self.settings.doctype_system) {
            (Some(public), Some(system)) => self.out.push_str(&format!(
                "<!DOCTYPE {} PUBLIC \"{}\" \"{}\">\n",
                name, public, system
            )),
            (None, Some(system)) => self
                .out
                .push_str(&format!("<!DOCTYPE {} SYSTEM \"{}\">\n", name, system)),
            (Some(public), None) if self.html => self
                .out
                .push_str(&format!("<!DOCTYPE {} PUBLIC \"{}\">\n", name, public)),
            _ => {}
        }
    }

    fn lookup(&self, prefix: &str) -> Option<&str> {
        self.bindings
            .iter()
            .rev()
            .find(|(p, _)| p == prefix)
            .map(|(_, uri)| uri.as_str())
    }

    fn newline(&mut self, depth: usize) {
        self.out.push('\n');
        for _ in 0..depth {
            self.out.push_str("  ");
        }
    }

    fn write_nodes(&mut self, nodes: &[ResultNode], depth: usize, raw_text: bool) {
        let indent = self.settings.indent
            && !nodes
                .iter()
                .any(|n| matches!(n, ResultNode::Text { .. }));
        for (i, node) in nodes.iter().enumerate() {
            if indent && (depth > 0 || i > 0) {
                self.newline(depth);
            }
            self.write_node(node, depth, raw_text);
        }
        if indent && depth > 0 && !nodes.is_empty() {
            self.newline(depth - 1);
        }
    }

    fn write_node(&mut self, node: &ResultNode, depth: usize, raw_text: bool) {
        match node {
            ResultNode::Element(element) => self.write_element(element, depth),
            ResultNode::Text {
                text,
                disable_escaping,
            } => {
                if *disable_escaping || raw_text {
                    self.out.push_str(text);
                } else {
                    self.out.push_str(&partial_escape(text));
                }
            }
            ResultNode::Comment(text) => {
                self.out.push_str("<!--");
                self.out.push_str(text);
                self.out.push_str("-->");
            }
            ResultNode::ProcessingInstruction { target, data } => {
                self.out.push_str("<?");
                self.out.push_str(target);
                if !data.is_empty() {
                    self.out.push(' ');
                    self.out.push_str(data);
                }
                // HTML processing instructions end with `>`.
                self.out.push_str(if self.html { ">" } else { "?>" });
            }
        }
    }

    /// Adds `xmlns` declarations needed for `prefix` to mean `uri` at this element.
    fn bind(&mut self, prefix: &str, uri: &str, declarations: &mut Vec<(String, String)>) {
        if prefix == "xml" || self.lookup(prefix).unwrap_or("") == uri {
            return;
        }
        self.bindings.push((prefix.to_string(), uri.to_string()));
        declarations.push((prefix.to_string(), uri.to_string()));
    }

    fn write_element(&mut self, element: &ResultElement, depth: usize) {
        let scope = self.bindings.len();
        let mut declarations = Vec::new();
        let html_element = self.html && element.namespace.is_none();

        for (prefix, uri) in &element.namespaces {
            if uri != XML_NAMESPACE {
                self.bind(prefix, uri, &mut declarations);
            }
        }
        let element_prefix = element.prefix().unwrap_or("").to_string();
        let element_uri = element.namespace.clone().unwrap_or_default();
        if !(html_element && element_prefix.is_empty()) || self.lookup("").is_some() {
            self.bind(&element_prefix, &element_uri, &mut declarations);
        }

        let mut attributes = Vec::with_capacity(element.attributes.len());
        for attr in &element.attributes {
            let name = match (&attr.namespace, attr.name.split_once(':')) {
                (Some(uri), Some((prefix, _))) => {
                    self.bind(prefix, uri, &mut declarations);
                    attr.name.clone()
                }
                (Some(uri), None) => {
                    let prefix = self
                        .bindings
                        .iter()
                        .rev()
                        .find(|(p, u)| u == uri && !p.is_empty())
                        .map(|(p, _)| p.clone());
                    let prefix = match prefix {
                        Some(prefix) => prefix,
                        None => {
                            let generated = format!("ns{}", self.generated_prefixes);
                            self.generated_prefixes += 1;
                            self.bind(&generated, uri, &mut declarations);
                            generated
                        }
                    };
                    format!("{}:{}", prefix, attr.name)
                }
                (None, _) => attr.name.clone(),
            };
            attributes.push((name, &attr.value));
        }

        self.out.push('<');
        self.out.push_str(&element.name);
        for (prefix, uri) in &declarations {
            if prefix.is_empty() {
                self.out.push_str(&format!(" xmlns=\"{}\"", escape_attribute(uri)));
            } else {
                self.out
                    .push_str(&format!(" xmlns:{}=\"{}\"", prefix, escape_attribute(uri)));
            }
        }
        for (name, value) in attributes {
            self.out
                .push_str(&format!(" {}=\"{}\"", name, escape_attribute(value)));
        }

        let local = element.local_name().to_ascii_lowercase();
        if html_element && HTML_VOID_ELEMENTS.contains(&local.as_str()) {
            self.out.push('>');
        } else if element.children.is_empty() && !html_element {
            self.out.push_str("/>");
        } else {
            self.out.push('>');
            let raw_text = html_element && HTML_RAW_TEXT_ELEMENTS.contains(&local.as_str());
            self.write_nodes(&element.children, depth + 1, raw_text);
            self.out.push_str("</");
            self.out.push_str(&element.name);
            self.out.push('>');
        }
        self.bindings.truncate(scope);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::{OutputBuilder, TreeBuilder};

    fn settings(method: OutputMethod) -> OutputSettings {
        OutputSettings {
            method,
            omit_xml_declaration: true,
            ..OutputSettings::default()
        }
    }

    fn sample() -> ResultTree {
        let mut b = TreeBuilder::new();
        b.start_element("doc", None);
        b.set_attribute("title", None, "a \"b\" & c");
        b.start_element("br", None);
        b.end_element();
        b.add_text("1 < 2", false);
        b.start_element("script", None);
        b.add_text("if (a < b) {}", false);
        b.end_element();
        b.end_element();
        b.finish()
    }

    #[test]
    fn test_xml_escaping_and_empty_elements() {
        let xml = serialize(&sample(), &settings(OutputMethod::Xml));
        assert_eq!(
            xml,
            "<doc title=\"a &quot;b&quot; &amp; c\"><br/>1 &lt; 2<script>if (a &lt; b) {}</script></doc>"
        );
    }

    #[test]
    fn test_xml_declaration() {
        let mut b = TreeBuilder::new();
        b.start_element("a", None);
        b.end_element();
        let out = serialize(&b.finish(), &OutputSettings::default());
        assert_eq!(out, "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<a/>");
    }

    #[test]
    fn test_html_void_and_raw_text() {
        let html = serialize(&sample(), &settings(OutputMethod::Html));
        assert_eq!(
            html,
            "<doc title=\"a &quot;b&quot; &amp; c\"><br>1 &lt; 2<script>if (a < b) {}</script></doc>"
        );
    }

    #[test]
    fn test_text_method() {
        assert_eq!(
            serialize(&sample(), &settings(OutputMethod::Text)),
            "1 < 2if (a < b) {}"
        );
    }

    #[test]
    fn test_namespace_fixup() {
        let mut b = TreeBuilder::new();
        b.start_element("html", Some("http://www.w3.org/1999/xhtml"));
        b.start_element("body", Some("http://www.w3.org/1999/xhtml"));
        b.set_attribute("lang", Some("urn:attrs"), "en");
        b.start_element("plain", None);
        b.end_element();
        b.end_element();
        b.end_element();
        let out = serialize(&b.finish(), &settings(OutputMethod::Xml));
        assert_eq!(
            out,
            "<html xmlns=\"http://www.w3.org/1999/xhtml\"><body xmlns:ns0=\"urn:attrs\" ns0:lang=\"en\"><plain xmlns=\"\"/></body></html>"
        );
    }

    #[test]
    fn test_indent() {
        let mut b = TreeBuilder::new();
        b.start_element("list", None);
        for label in ["a", "b"] {
            b.start_element("item", None);
            b.add_text(label, false);
            b.end_element();
        }
        b.end_element();
        let mut settings = settings(OutputMethod::Xml);
        settings.indent = true;
        assert_eq!(
            serialize(&b.finish(), &settings),
            "<list>\n  <item>a</item>\n  <item>b</item>\n</list>"
        );
    }
}
