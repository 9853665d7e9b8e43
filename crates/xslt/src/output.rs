//! Defines the `OutputBuilder` trait, which decouples the XSLT executor
//! from the concrete result tree, plus the tree the native processor builds.

/// A trait that describes the semantic actions of building the output tree,
/// without exposing the underlying concrete node types.
pub trait OutputBuilder {
    fn start_element(&mut self, name: &str, namespace: Option<&str>);
    fn end_element(&mut self);

    /// Adds a namespace declaration to the currently open element.
    fn declare_namespace(&mut self, prefix: &str, uri: &str);

    /// Sets an attribute on the currently open element.
    fn set_attribute(&mut self, name: &str, namespace: Option<&str>, value: &str);

    fn add_text(&mut self, text: &str, disable_escaping: bool);
    fn add_comment(&mut self, text: &str);
    fn add_processing_instruction(&mut self, target: &str, data: &str);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultAttribute {
    pub name: String,
    pub namespace: Option<String>,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ResultElement {
    /// The qualified name, `prefix:local` or `local`.
    pub name: String,
    pub namespace: Option<String>,
    pub attributes: Vec<ResultAttribute>,
    pub namespaces: Vec<(String, String)>,
    pub children: Vec<ResultNode>,
}

impl ResultElement {
    pub fn local_name(&self) -> &str {
        self.name.rsplit(':').next().unwrap_or(&self.name)
    }

    pub fn prefix(&self) -> Option<&str> {
        self.name.split_once(':').map(|(prefix, _)| prefix)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResultNode {
    Element(ResultElement),
    Text { text: String, disable_escaping: bool },
    Comment(String),
    ProcessingInstruction { target: String, data: String },
}

impl ResultNode {
    fn push_text(&self, out: &mut String) {
        match self {
            ResultNode::Element(element) => {
                for child in &element.children {
                    child.push_text(out);
                }
            }
            ResultNode::Text { text, .. } => out.push_str(text),
            ResultNode::Comment(_) | ResultNode::ProcessingInstruction { .. } => {}
        }
    }
}

/// The root of a transformation result, or a result tree fragment bound to a variable.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ResultTree {
    pub children: Vec<ResultNode>,
}

impl ResultTree {
    /// The concatenated text of every text node.
    pub fn string_value(&self) -> String {
        let mut out = String::new();
        for child in &self.children {
            child.push_text(&mut out);
        }
        out
    }

    /// The first element child, if any.
    pub fn document_element(&self) -> Option<&ResultElement> {
        self.children.iter().find_map(|node| match node {
            ResultNode::Element(element) => Some(element),
            _ => None,
        })
    }

    /// Replays the tree into another builder.
    pub fn replay(&self, builder: &mut dyn OutputBuilder) {
        for child in &self.children {
            replay_node(child, builder);
        }
    }
}

fn replay_node(node: &ResultNode, builder: &mut dyn OutputBuilder) {
    match node {
        ResultNode::Element(element) => {
            builder.start_element(&element.name, element.namespace.as_deref());
            for (prefix, uri) in &element.namespaces {
                builder.declare_namespace(prefix, uri);
            }
            for attr in &element.attributes {
                builder.set_attribute(&attr.name, attr.namespace.as_deref(), &attr.value);
            }
            for child in &element.children {
                replay_node(child, builder);
            }
            builder.end_element();
        }
        ResultNode::Text {
            text,
            disable_escaping,
        } => builder.add_text(text, *disable_escaping),
        ResultNode::Comment(text) => builder.add_comment(text),
        ResultNode::ProcessingInstruction { target, data } => {
            builder.add_processing_instruction(target, data)
        }
    }
}

/// Builds a [`ResultTree`] from builder calls.
#[derive(Debug, Default)]
pub struct TreeBuilder {
    root: Vec<ResultNode>,
    open: Vec<ResultElement>,
}

impl TreeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Closes any elements left open and returns the finished tree.
    pub fn finish(mut self) -> ResultTree {
        while !self.open.is_empty() {
            self.end_element();
        }
        ResultTree {
            children: self.root,
        }
    }

    fn push_node(&mut self, node: ResultNode) {
        match self.open.last_mut() {
            Some(parent) => parent.children.push(node),
            None => self.root.push(node),
        }
    }
}

impl OutputBuilder for TreeBuilder {
    fn start_element(&mut self, name: &str, namespace: Option<&str>) {
        self.open.push(ResultElement {
            name: name.to_string(),
            namespace: namespace.filter(|ns| !ns.is_empty()).map(str::to_string),
            ..ResultElement::default()
        });
    }

    fn end_element(&mut self) {
        if let Some(element) = self.open.pop() {
            self.push_node(ResultNode::Element(element));
        }
    }

    fn declare_namespace(&mut self, prefix: &str, uri: &str) {
        if let Some(element) = self.open.last_mut() {
            if !element.namespaces.iter().any(|(p, _)| p == prefix) {
                element.namespaces.push((prefix.to_string(), uri.to_string()));
            }
        }
    }

    fn set_attribute(&mut self, name: &str, namespace: Option<&str>, value: &str) {
        let Some(element) = self.open.last_mut() else {
            log::warn!("Attribute '{}' created outside of an element, ignoring.", name);
            return;
        };
        if !element.children.is_empty() {
            log::warn!("Attribute '{}' added after element content, ignoring.", name);
            return;
        }
        let namespace = namespace.filter(|ns| !ns.is_empty()).map(str::to_string);
        match element.attributes.iter_mut().find(|a| a.name == name) {
            Some(existing) => {
                existing.value = value.to_string();
                existing.namespace = namespace;
            }
            None => element.attributes.push(ResultAttribute {
                name: name.to_string(),
                namespace,
                value: value.to_string(),
            }),
        }
    }

    fn add_text(&mut self, text: &str, disable_escaping: bool) {
        if text.is_empty() {
            return;
        }
        // Adjacent text nodes merge, as in the XPath data model.
        let siblings = match self.open.last_mut() {
            Some(parent) => &mut parent.children,
            None => &mut self.root,
        };
        if let Some(ResultNode::Text {
            text: last,
            disable_escaping: last_raw,
        }) = siblings.last_mut()
        {
            if *last_raw == disable_escaping {
                last.push_str(text);
                return;
            }
        }
        siblings.push(ResultNode::Text {
            text: text.to_string(),
            disable_escaping,
        });
    }

    fn add_comment(&mut self, text: &str) {
        self.push_node(ResultNode::Comment(text.to_string()));
    }

    fn add_processing_instruction(&mut self, target: &str, data: &str) {
        self.push_node(ResultNode::ProcessingInstruction {
            target: target.to_string(),
            data: data.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_nests_and_merges_text() {
        let mut builder = TreeBuilder::new();
        builder.start_element("ul", None);
        builder.set_attribute("class", None, "a");
        builder.set_attribute("class", None, "b");
        builder.add_text("x", false);
        builder.add_text("y", false);
        builder.set_attribute("late", None, "ignored");
        builder.start_element("li", None);
        builder.end_element();
        let tree = builder.finish();

        let ul = tree.document_element().unwrap();
        assert_eq!(ul.attributes.len(), 1);
        assert_eq!(ul.attributes[0].value, "b");
        assert_eq!(ul.children.len(), 2);
        assert_eq!(tree.string_value(), "xy");
    }

    #[test]
    fn test_replay_copies_the_tree() {
        let mut builder = TreeBuilder::new();
        builder.start_element("h:p", Some("urn:h"));
        builder.declare_namespace("h", "urn:h");
        builder.add_comment("c");
        builder.end_element();
        let tree = builder.finish();

        let mut copy = TreeBuilder::new();
        tree.replay(&mut copy);
        assert_eq!(copy.finish(), tree);
        assert_eq!(tree.document_element().unwrap().local_name(), "p");
    }
}
