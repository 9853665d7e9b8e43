// XML datasource implementation using roxmltree
use crate::ast::SpaceTest;
use roxmltree::{Document, Node};
use std::cmp::Ordering;
use std::hash::{Hash, Hasher};
use xsltui_xpath1::{DataSourceNode, NodeType, QName, XML_NAMESPACE};

/// `xsl:strip-space` / `xsl:preserve-space` declarations applied to the source tree.
#[derive(Debug, Clone, Default)]
pub struct SpaceRules {
    strip: Vec<SpaceTest>,
    preserve: Vec<SpaceTest>,
}

impl SpaceRules {
    pub fn new(strip: Vec<SpaceTest>, preserve: Vec<SpaceTest>) -> Self {
        SpaceRules { strip, preserve }
    }

    fn best_match(tests: &[SpaceTest], node: Node<'_, '_>) -> Option<f64> {
        let name = node.tag_name();
        tests
            .iter()
            .filter_map(|test| match test {
                SpaceTest::Any => Some(-0.5),
                SpaceTest::Namespace(uri) => (name.namespace() == Some(uri.as_str())).then_some(-0.25),
                SpaceTest::Name { namespace, local } => (name.name() == local
                    && name.namespace() == namespace.as_deref())
                .then_some(0.0),
            })
            .fold(None, |best: Option<f64>, p| Some(best.map_or(p, |b| b.max(p))))
    }

    /// Whether whitespace-only text children of `element` are removed.
    fn strips(&self, element: Node<'_, '_>) -> bool {
        if self.strip.is_empty() || !element.is_element() {
            return false;
        }
        let xml_space = element
            .ancestors()
            .filter(|n| n.is_element())
            .find_map(|n| n.attribute((XML_NAMESPACE, "space")));
        if xml_space == Some("preserve") {
            return false;
        }
        match (
            Self::best_match(&self.strip, element),
            Self::best_match(&self.preserve, element),
        ) {
            (Some(strip), Some(preserve)) => strip > preserve,
            (Some(_), None) => true,
            _ => false,
        }
    }
}

/// A node of a `roxmltree` document. Attributes need special handling because
/// roxmltree treats them as data on elements, not as navigable nodes in the tree.
#[derive(Clone, Copy)]
pub struct XmlNode<'a, 'input> {
    node: Node<'a, 'input>,
    /// Index into the element's attributes when this is an attribute node.
    attribute: Option<usize>,
    space: &'a SpaceRules,
}

impl std::fmt::Debug for XmlNode<'_, '_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.attribute {
            Some(index) => write!(f, "Attribute({:?}, {})", self.node.id(), index),
            None => write!(f, "{:?}", self.node),
        }
    }
}

impl<'a, 'input> XmlNode<'a, 'input> {
    pub fn root(doc: &'a Document<'input>, space: &'a SpaceRules) -> Self {
        XmlNode {
            node: doc.root(),
            attribute: None,
            space,
        }
    }

    /// The underlying tree node; for attributes, the owning element.
    pub fn inner(&self) -> Node<'a, 'input> {
        self.node
    }

    pub fn is_attribute(&self) -> bool {
        self.attribute.is_some()
    }

    fn wrap(&self, node: Node<'a, 'input>) -> Self {
        XmlNode {
            node,
            attribute: None,
            space: self.space,
        }
    }

    fn is_stripped_whitespace(&self, child: Node<'_, '_>) -> bool {
        child.is_text()
            && child.text().is_some_and(|t| t.trim().is_empty())
            && self.space.strips(self.node)
    }

    /// Namespace prefix bound to `uri` on this node, as written in the source.
    fn prefix_for(&self, uri: &str, allow_default: bool) -> Option<&'a str> {
        if uri == XML_NAMESPACE {
            return Some("xml");
        }
        self.node
            .namespaces()
            .filter(|ns| ns.uri() == uri)
            .find_map(|ns| match ns.name() {
                Some(prefix) => Some(Some(prefix)),
                None if allow_default => Some(None),
                None => None,
            })
            .flatten()
    }
}

impl PartialEq for XmlNode<'_, '_> {
    fn eq(&self, other: &Self) -> bool {
        self.node.id() == other.node.id() && self.attribute == other.attribute
    }
}

impl Eq for XmlNode<'_, '_> {}

impl PartialOrd for XmlNode<'_, '_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for XmlNode<'_, '_> {
    fn cmp(&self, other: &Self) -> Ordering {
        // roxmltree assigns node ids in document order; an element sorts before its attributes,
        // which sort before its children.
        match self.node.id().get().cmp(&other.node.id().get()) {
            Ordering::Equal => match (self.attribute, other.attribute) {
                (None, None) => Ordering::Equal,
                (None, Some(_)) => Ordering::Less,
                (Some(_), None) => Ordering::Greater,
                (Some(a), Some(b)) => a.cmp(&b),
            },
            other => other,
        }
    }
}

impl Hash for XmlNode<'_, '_> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.node.id().get().hash(state);
        self.attribute.hash(state);
    }
}

impl<'a> DataSourceNode<'a> for XmlNode<'a, 'a> {
    fn node_type(&self) -> NodeType {
        if self.attribute.is_some() {
            return NodeType::Attribute;
        }
        match self.node.node_type() {
            roxmltree::NodeType::Root => NodeType::Root,
            roxmltree::NodeType::Element => NodeType::Element,
            roxmltree::NodeType::Text => NodeType::Text,
            roxmltree::NodeType::Comment => NodeType::Comment,
            roxmltree::NodeType::PI => NodeType::ProcessingInstruction,
        }
    }

    fn name(&self) -> Option<QName<'a>> {
        if let Some(index) = self.attribute {
            return self.node.attributes().nth(index).map(|attr| QName {
                prefix: attr.namespace().and_then(|uri| self.prefix_for(uri, false)),
                namespace: attr.namespace(),
                local_part: attr.name(),
            });
        }
        if self.node.is_element() {
            let tag = self.node.tag_name();
            Some(QName {
                prefix: tag.namespace().and_then(|uri| self.prefix_for(uri, true)),
                namespace: tag.namespace(),
                local_part: tag.name(),
            })
        } else if self.node.is_pi() {
            self.node.pi().map(|pi| QName::local(pi.target))
        } else {
            None
        }
    }

    fn string_value(&self) -> String {
        if let Some(index) = self.attribute {
            return self
                .node
                .attributes()
                .nth(index)
                .map(|attr| attr.value().to_string())
                .unwrap_or_default();
        }
        match self.node.node_type() {
            roxmltree::NodeType::Text | roxmltree::NodeType::Comment => {
                self.node.text().unwrap_or("").to_string()
            }
            roxmltree::NodeType::PI => self
                .node
                .pi()
                .and_then(|pi| pi.value)
                .unwrap_or("")
                .to_string(),
            roxmltree::NodeType::Root | roxmltree::NodeType::Element => self
                .node
                .descendants()
                .filter(|n| {
                    n.is_text()
                        && !n
                            .parent()
                            .is_some_and(|p| self.wrap(p).is_stripped_whitespace(*n))
                })
                .filter_map(|n| n.text())
                .collect(),
        }
    }

    fn attributes(&self) -> Box<dyn Iterator<Item = Self> + 'a> {
        if self.attribute.is_some() || !self.node.is_element() {
            // Attributes don't have attributes
            return Box::new(std::iter::empty());
        }
        let node = self.node;
        let space = self.space;
        let count = node.attributes().len();
        Box::new((0..count).map(move |index| XmlNode {
            node,
            attribute: Some(index),
            space,
        }))
    }

    fn children(&self) -> Box<dyn Iterator<Item = Self> + 'a> {
        if self.attribute.is_some() {
            return Box::new(std::iter::empty());
        }
        let this = *self;
        Box::new(
            self.node
                .children()
                .filter(move |child| !this.is_stripped_whitespace(*child))
                .map(move |child| this.wrap(child)),
        )
    }

    fn parent(&self) -> Option<Self> {
        if self.attribute.is_some() {
            return Some(self.wrap(self.node));
        }
        self.node.parent().map(|p| self.wrap(p))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn element<'a>(node: XmlNode<'a, 'a>, name: &str) -> XmlNode<'a, 'a> {
        node.children()
            .find(|n| n.name().is_some_and(|q| q.local_part == name))
            .unwrap()
    }

    #[test]
    fn test_xml_node_attributes() {
        let xml = r#"<root><item id="123" status="active">Text</item></root>"#;
        let doc = Document::parse(xml).unwrap();
        let rules = SpaceRules::default();
        let item = element(element(XmlNode::root(&doc, &rules), "root"), "item");

        let attrs: Vec<_> = item.attributes().collect();
        assert_eq!(attrs.len(), 2);
        assert_eq!(attrs[0].node_type(), NodeType::Attribute);
        assert_eq!(attrs[0].name().unwrap().local_part, "id");
        assert_eq!(attrs[0].string_value(), "123");
        assert_eq!(attrs[1].string_value(), "active");
        assert_eq!(attrs[0].parent(), Some(item));
        assert!(item < attrs[0] && attrs[0] < attrs[1]);
        assert!(attrs[1] < item.children().next().unwrap());
    }

    #[test]
    fn test_namespaced_names_keep_their_prefix() {
        let xml = r#"<h:page xmlns:h="urn:h" xmlns="urn:d"><body h:kind="x"/></h:page>"#;
        let doc = Document::parse(xml).unwrap();
        let rules = SpaceRules::default();
        let page = XmlNode::root(&doc, &rules).children().next().unwrap();
        let name = page.name().unwrap();
        assert_eq!(name.prefix, Some("h"));
        assert_eq!(name.namespace, Some("urn:h"));

        let body = page.children().next().unwrap();
        assert_eq!(body.name().unwrap().prefix, None);
        assert_eq!(body.name().unwrap().namespace, Some("urn:d"));
        let kind = body.attributes().next().unwrap().name().unwrap();
        assert_eq!(kind.to_string(), "h:kind");
    }

    #[test]
    fn test_strip_space_removes_whitespace_text() {
        let xml = "<list>\n  <item>a</item>\n  <item> </item>\n</list>";
        let doc = Document::parse(xml).unwrap();
        let keep = SpaceRules::default();
        let list = XmlNode::root(&doc, &keep).children().next().unwrap();
        assert_eq!(list.children().count(), 5);

        let strip = SpaceRules::new(
            vec![SpaceTest::Any],
            vec![SpaceTest::Name {
                namespace: None,
                local: "item".into(),
            }],
        );
        let list = XmlNode::root(&doc, &strip).children().next().unwrap();
        assert_eq!(list.children().count(), 2);
        let second = list.children().nth(1).unwrap();
        assert_eq!(second.children().count(), 1);
    }
}
