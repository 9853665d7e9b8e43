//! Comparison, arithmetic and union operators with XPath 1.0 type coercion.

use crate::ast::BinaryOperator;
use crate::datasource::DataSourceNode;
use crate::engine::{XPathValue, sort_document_order, string_to_number};
use crate::error::XPathError;

pub fn evaluate<'a, N: DataSourceNode<'a>>(
    op: BinaryOperator,
    left: XPathValue<N>,
    right: XPathValue<N>,
) -> Result<XPathValue<N>, XPathError> {
    match op {
        BinaryOperator::Or => Ok(XPathValue::Boolean(left.to_bool() || right.to_bool())),
        BinaryOperator::And => Ok(XPathValue::Boolean(left.to_bool() && right.to_bool())),
        BinaryOperator::Equals
        | BinaryOperator::NotEquals
        | BinaryOperator::LessThan
        | BinaryOperator::LessThanOrEqual
        | BinaryOperator::GreaterThan
        | BinaryOperator::GreaterThanOrEqual => Ok(XPathValue::Boolean(compare(op, &left, &right))),
        BinaryOperator::Plus => Ok(XPathValue::Number(left.to_number() + right.to_number())),
        BinaryOperator::Minus => Ok(XPathValue::Number(left.to_number() - right.to_number())),
        BinaryOperator::Multiply => Ok(XPathValue::Number(left.to_number() * right.to_number())),
        BinaryOperator::Divide => Ok(XPathValue::Number(left.to_number() / right.to_number())),
        // Truncating remainder, matching the sign of the dividend.
        BinaryOperator::Modulo => Ok(XPathValue::Number(left.to_number() % right.to_number())),
        BinaryOperator::Union => {
            let mut nodes = left.into_nodes("the '|' operator")?;
            nodes.extend(right.into_nodes("the '|' operator")?);
            sort_document_order(&mut nodes);
            Ok(XPathValue::NodeSet(nodes))
        }
    }
}

/// A single scalar operand after node-set expansion.
enum Atom {
    Str(String),
    Num(f64),
    Bool(bool),
}

fn atoms<'a, N: DataSourceNode<'a>>(value: &XPathValue<N>) -> Vec<Atom> {
    match value {
        XPathValue::NodeSet(nodes) => nodes.iter().map(|n| Atom::Str(n.string_value())).collect(),
        XPathValue::String(s) => vec![Atom::Str(s.clone())],
        XPathValue::Number(n) => vec![Atom::Num(*n)],
        XPathValue::Boolean(b) => vec![Atom::Bool(*b)],
    }
}

/// Implements XPath 1.0 §3.4: a comparison involving node-sets is true if it holds
/// for any pair of members.
fn compare<'a, N: DataSourceNode<'a>>(
    op: BinaryOperator,
    left: &XPathValue<N>,
    right: &XPathValue<N>,
) -> bool {
    let is_equality = matches!(op, BinaryOperator::Equals | BinaryOperator::NotEquals);
    match (left, right) {
        // A node-set compared to a boolean is converted as a whole.
        (XPathValue::NodeSet(_), XPathValue::Boolean(b)) if is_equality => {
            compare_booleans(op, left.to_bool(), *b)
        }
        (XPathValue::Boolean(b), XPathValue::NodeSet(_)) if is_equality => {
            compare_booleans(op, *b, right.to_bool())
        }
        _ => {
            let lhs = atoms(left);
            let rhs = atoms(right);
            lhs.iter()
                .any(|l| rhs.iter().any(|r| compare_atoms(op, l, r)))
        }
    }
}

fn compare_booleans(op: BinaryOperator, l: bool, r: bool) -> bool {
    match op {
        BinaryOperator::Equals => l == r,
        _ => l != r,
    }
}

fn atom_number(atom: &Atom) -> f64 {
    match atom {
        Atom::Str(s) => string_to_number(s),
        Atom::Num(n) => *n,
        Atom::Bool(b) => {
            if *b {
                1.0
            } else {
                0.0
            }
        }
    }
}

fn atom_bool(atom: &Atom) -> bool {
    match atom {
        Atom::Str(s) => !s.is_empty(),
        Atom::Num(n) => *n != 0.0 && !n.is_nan(),
        Atom::Bool(b) => *b,
    }
}

fn compare_atoms(op: BinaryOperator, l: &Atom, r: &Atom) -> bool {
    match op {
        BinaryOperator::Equals | BinaryOperator::NotEquals => {
            let equal = match (l, r) {
                (Atom::Bool(_), _) | (_, Atom::Bool(_)) => atom_bool(l) == atom_bool(r),
                (Atom::Num(_), _) | (_, Atom::Num(_)) => atom_number(l) == atom_number(r),
                (Atom::Str(a), Atom::Str(b)) => a == b,
            };
            if op == BinaryOperator::Equals {
                equal
            } else {
                !equal
            }
        }
        _ => {
            let (a, b) = (atom_number(l), atom_number(r));
            match op {
                BinaryOperator::LessThan => a < b,
                BinaryOperator::LessThanOrEqual => a <= b,
                BinaryOperator::GreaterThan => a > b,
                _ => a >= b,
            }
        }
    }
}
