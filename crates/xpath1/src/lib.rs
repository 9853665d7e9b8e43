//! XPath 1.0 expression language.
//!
//! The engine is written against the [`DataSourceNode`] trait, so any tree that can
//! describe itself in terms of the XPath data model (root, elements, attributes, text,
//! comments, processing instructions) can be queried. The XSLT processor uses it over
//! `roxmltree` documents.

pub mod ast;
pub mod axes;
pub mod datasource;
pub mod engine;
pub mod error;
pub mod functions;
pub mod operators;
pub mod parser;

pub use ast::{Axis, BinaryOperator, Expression, LocationPath, NodeTest, Step};
pub use datasource::{DataSourceNode, NodeType, QName, XML_NAMESPACE};
pub use engine::{
    EvaluationContext, KeyIndexes, NamespaceBindings, VariableResolver, XPathValue, evaluate,
    number_to_string, string_to_number,
};

// Test utilities, public so the XSLT crate can reuse the mock tree.
pub use datasource::tests;
pub use error::XPathError;
pub use parser::parse_expression;
