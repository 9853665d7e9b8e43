//! Defines the Abstract Syntax Tree (AST) for XPath 1.0 expressions.

/// The top-level expression that can be evaluated.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Literal(String),
    Number(f64),
    LocationPath(LocationPath),
    /// A primary expression followed by predicates, e.g. `$items[2]` or `(//a)[last()]`.
    Filter {
        base: Box<Expression>,
        predicates: Vec<Expression>,
    },
    Variable(String),
    FunctionCall {
        name: String,
        args: Vec<Expression>,
    },
    BinaryOp {
        left: Box<Expression>,
        op: BinaryOperator,
        right: Box<Expression>,
    },
    UnaryOp {
        op: UnaryOperator,
        expr: Box<Expression>,
    },
}

impl Expression {
    pub fn is_location_path(&self) -> bool {
        matches!(self, Expression::LocationPath(_))
    }

    /// Calls `visit` for this expression and every sub-expression.
    pub fn walk(&self, visit: &mut impl FnMut(&Expression)) {
        visit(self);
        match self {
            Expression::LocationPath(path) => {
                if let Some(start) = &path.start_point {
                    start.walk(visit);
                }
                for step in &path.steps {
                    for predicate in &step.predicates {
                        predicate.walk(visit);
                    }
                }
            }
            Expression::Filter { base, predicates } => {
                base.walk(visit);
                for predicate in predicates {
                    predicate.walk(visit);
                }
            }
            Expression::FunctionCall { args, .. } => {
                for arg in args {
                    arg.walk(visit);
                }
            }
            Expression::BinaryOp { left, right, .. } => {
                left.walk(visit);
                right.walk(visit);
            }
            Expression::UnaryOp { expr, .. } => expr.walk(visit),
            Expression::Literal(_) | Expression::Number(_) | Expression::Variable(_) => {}
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    Minus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    // Logical
    Or,
    And,
    // Equality
    Equals,
    NotEquals,
    // Relational
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
    // Additive
    Plus,
    Minus,
    // Multiplicative
    Multiply,
    Divide,
    Modulo,
    // Set
    Union,
}

/// A location path such as `/child::foo`, `descendant::bar[1]` or `$var/item`.
#[derive(Debug, Clone, PartialEq)]
pub struct LocationPath {
    /// Starting expression for paths like `$var/foo` or `key('k', 'v')/foo`.
    pub start_point: Option<Box<Expression>>,
    /// True if the path starts from the document root. Ignored when `start_point` is set.
    pub is_absolute: bool,
    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    pub axis: Axis,
    pub node_test: NodeTest,
    pub predicates: Vec<Expression>,
}

impl Step {
    pub fn new(axis: Axis, node_test: NodeTest) -> Self {
        Step {
            axis,
            node_test,
            predicates: vec![],
        }
    }

    /// `.`, short for `self::node()`
    pub fn context() -> Self {
        Step::new(Axis::SelfAxis, NodeTest::NodeType(NodeTypeTest::Node))
    }

    /// `..`, short for `parent::node()`
    pub fn parent() -> Self {
        Step::new(Axis::Parent, NodeTest::NodeType(NodeTypeTest::Node))
    }

    /// The implicit step inserted for `//`.
    pub fn descendant_or_self() -> Self {
        Step::new(Axis::DescendantOrSelf, NodeTest::NodeType(NodeTypeTest::Node))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Child,
    Descendant,
    DescendantOrSelf,
    Attribute,
    Parent,
    Ancestor,
    AncestorOrSelf,
    SelfAxis,
    FollowingSibling,
    PrecedingSibling,
    Following,
    Preceding,
    Namespace,
}

impl Axis {
    /// Reverse axes number their proximity positions from the context node backwards.
    pub fn is_reverse(self) -> bool {
        matches!(
            self,
            Axis::Ancestor | Axis::AncestorOrSelf | Axis::Preceding | Axis::PrecedingSibling
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeTest {
    /// `*`
    Wildcard,
    /// `prefix:*`
    PrefixWildcard(String),
    /// `name` or `prefix:name`
    Name {
        prefix: Option<String>,
        local: String,
    },
    NodeType(NodeTypeTest),
}

impl NodeTest {
    pub fn name(qname: &str) -> Self {
        match qname.split_once(':') {
            Some((prefix, local)) => NodeTest::Name {
                prefix: Some(prefix.to_string()),
                local: local.to_string(),
            },
            None => NodeTest::Name {
                prefix: None,
                local: qname.to_string(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeTypeTest {
    Text,
    Node,
    Comment,
    /// `processing-instruction()` with an optional target literal.
    ProcessingInstruction(Option<String>),
}
