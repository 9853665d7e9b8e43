//! Defines the core abstraction for a navigable, read-only node tree.
use std::fmt;
use std::hash::Hash;

/// Namespace bound to the reserved `xml` prefix.
pub const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";

/// An expanded name plus the prefix it was written with in the source, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct QName<'a> {
    pub prefix: Option<&'a str>,
    pub namespace: Option<&'a str>,
    pub local_part: &'a str,
}

impl<'a> QName<'a> {
    pub fn local(local_part: &'a str) -> Self {
        QName {
            prefix: None,
            namespace: None,
            local_part,
        }
    }
}

impl fmt::Display for QName<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.prefix {
            Some(prefix) if !prefix.is_empty() => write!(f, "{}:{}", prefix, self.local_part),
            _ => f.write_str(self.local_part),
        }
    }
}

/// The type of a node in the tree, aligned with the XPath 1.0 data model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeType {
    Root,
    Element,
    Attribute,
    Text,
    Comment,
    ProcessingInstruction,
}

/// The contract the XPath engine evaluates against.
///
/// `Ord` must follow document order: a node sorts before its attributes, which sort
/// before its children. `'a` is the lifetime of the underlying document.
pub trait DataSourceNode<'a>:
    fmt::Debug + Clone + Copy + PartialEq + Eq + Hash + PartialOrd + Ord
{
    fn node_type(&self) -> NodeType;

    /// Expanded name for elements and attributes; the target for processing
    /// instructions; `None` for everything else.
    fn name(&self) -> Option<QName<'a>>;

    /// The XPath `string()` value of the node.
    fn string_value(&self) -> String;

    fn attributes(&self) -> Box<dyn Iterator<Item = Self> + 'a>;

    fn children(&self) -> Box<dyn Iterator<Item = Self> + 'a>;

    /// The parent node. For attributes this is the owning element.
    fn parent(&self) -> Option<Self>;
}

// Test utilities - publicly available for integration testing in downstream crates
pub mod tests {
    use super::*;
    use std::cmp::Ordering;
    use std::hash::Hasher;

    #[derive(Debug, Clone)]
    struct MockNodeData {
        node_type: NodeType,
        name: Option<&'static str>,
        value: String,
        children: Vec<usize>,
        attributes: Vec<usize>,
        parent: Option<usize>,
    }

    /// An arena tree built in document order; node ids double as document positions.
    #[derive(Debug)]
    pub struct MockTree {
        nodes: Vec<MockNodeData>,
    }

    #[derive(Debug, Clone, Copy)]
    pub struct MockNode<'a> {
        pub id: usize,
        pub tree: &'a MockTree,
    }

    impl Default for MockTree {
        fn default() -> Self {
            Self::new()
        }
    }

    impl MockTree {
        pub fn new() -> Self {
            MockTree {
                nodes: vec![MockNodeData {
                    node_type: NodeType::Root,
                    name: None,
                    value: String::new(),
                    children: vec![],
                    attributes: vec![],
                    parent: None,
                }],
            }
        }

        fn push(&mut self, parent: usize, data: MockNodeData, is_attribute: bool) -> usize {
            let id = self.nodes.len();
            self.nodes.push(MockNodeData {
                parent: Some(parent),
                ..data
            });
            if is_attribute {
                self.nodes[parent].attributes.push(id);
            } else {
                self.nodes[parent].children.push(id);
            }
            id
        }

        pub fn element(&mut self, parent: usize, name: &'static str) -> usize {
            self.push(
                parent,
                MockNodeData {
                    node_type: NodeType::Element,
                    name: Some(name),
                    value: String::new(),
                    children: vec![],
                    attributes: vec![],
                    parent: None,
                },
                false,
            )
        }

        pub fn attribute(&mut self, owner: usize, name: &'static str, value: &str) -> usize {
            self.push(
                owner,
                MockNodeData {
                    node_type: NodeType::Attribute,
                    name: Some(name),
                    value: value.to_string(),
                    children: vec![],
                    attributes: vec![],
                    parent: None,
                },
                true,
            )
        }

        pub fn text(&mut self, parent: usize, value: &str) -> usize {
            self.leaf(parent, NodeType::Text, None, value)
        }

        pub fn comment(&mut self, parent: usize, value: &str) -> usize {
            self.leaf(parent, NodeType::Comment, None, value)
        }

        pub fn pi(&mut self, parent: usize, target: &'static str, value: &str) -> usize {
            self.leaf(parent, NodeType::ProcessingInstruction, Some(target), value)
        }

        fn leaf(
            &mut self,
            parent: usize,
            node_type: NodeType,
            name: Option<&'static str>,
            value: &str,
        ) -> usize {
            self.push(
                parent,
                MockNodeData {
                    node_type,
                    name,
                    value: value.to_string(),
                    children: vec![],
                    attributes: vec![],
                    parent: None,
                },
                false,
            )
        }

        pub fn node(&self, id: usize) -> MockNode<'_> {
            MockNode { id, tree: self }
        }

        pub fn root(&self) -> MockNode<'_> {
            self.node(0)
        }

        fn text_content(&self, id: usize, out: &mut String) {
            let data = &self.nodes[id];
            match data.node_type {
                NodeType::Text => out.push_str(&data.value),
                NodeType::Root | NodeType::Element => {
                    for &child in &data.children {
                        self.text_content(child, out);
                    }
                }
                _ => {}
            }
        }
    }

    impl PartialEq for MockNode<'_> {
        fn eq(&self, other: &Self) -> bool {
            self.id == other.id
        }
    }
    impl Eq for MockNode<'_> {}

    impl PartialOrd for MockNode<'_> {
        fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
            Some(self.cmp(other))
        }
    }

    impl Ord for MockNode<'_> {
        fn cmp(&self, other: &Self) -> Ordering {
            self.id.cmp(&other.id)
        }
    }

    impl Hash for MockNode<'_> {
        fn hash<H: Hasher>(&self, state: &mut H) {
            self.id.hash(state);
        }
    }

    impl<'a> DataSourceNode<'a> for MockNode<'a> {
        fn node_type(&self) -> NodeType {
            self.tree.nodes[self.id].node_type
        }

        fn name(&self) -> Option<QName<'a>> {
            let name = self.tree.nodes[self.id].name?;
            Some(match name.split_once(':') {
                Some(("xml", local)) => QName {
                    prefix: Some("xml"),
                    namespace: Some(XML_NAMESPACE),
                    local_part: local,
                },
                _ => QName::local(name),
            })
        }

        fn string_value(&self) -> String {
            let data = &self.tree.nodes[self.id];
            match data.node_type {
                NodeType::Root | NodeType::Element => {
                    let mut out = String::new();
                    self.tree.text_content(self.id, &mut out);
                    out
                }
                _ => data.value.clone(),
            }
        }

        fn attributes(&self) -> Box<dyn Iterator<Item = Self> + 'a> {
            let tree = self.tree;
            Box::new(
                tree.nodes[self.id]
                    .attributes
                    .iter()
                    .map(move |&id| MockNode { id, tree }),
            )
        }

        fn children(&self) -> Box<dyn Iterator<Item = Self> + 'a> {
            let tree = self.tree;
            Box::new(
                tree.nodes[self.id]
                    .children
                    .iter()
                    .map(move |&id| MockNode { id, tree }),
            )
        }

        fn parent(&self) -> Option<Self> {
            self.tree.nodes[self.id].parent.map(|id| MockNode {
                id,
                tree: self.tree,
            })
        }
    }

    /// Builds the tree used across the engine tests:
    ///
    /// ```text
    /// <root>                                  1
    ///   <para id="p1" xml:lang="en">Hello</para>  2 (attrs 3, 4; text 5)
    ///   <!-- note -->                         6
    ///   <div/>                                7
    ///   <?target value?>                      8
    ///   <para>World</para>                    9 (text 10)
    /// </root>
    /// ```
    pub fn create_test_tree() -> MockTree {
        let mut tree = MockTree::new();
        let root = tree.element(0, "root");
        let para = tree.element(root, "para");
        tree.attribute(para, "id", "p1");
        tree.attribute(para, "xml:lang", "en");
        tree.text(para, "Hello");
        tree.comment(root, " note ");
        tree.element(root, "div");
        tree.pi(root, "target", "value");
        let second = tree.element(root, "para");
        tree.text(second, "World");
        tree
    }
}
