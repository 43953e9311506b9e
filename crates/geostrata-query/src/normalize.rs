//! Filter canonicalization.
//!
//! Nested conjunctions and disjunctions are flattened, double negations are
//! eliminated, and a top-level `AND` splits into a conjunct list. Negations
//! of composite filters are left alone: only the top-level conjunction shape
//! matters to strategy selection.

use geostrata_core::error::{Error, Result};
use geostrata_core::filter::{CompareOp, Expression, Filter, Literal, PropertyLiteral};

/// Canonicalizes a filter tree.
#[must_use]
pub fn normalize(filter: Filter) -> Filter {
    match filter {
        Filter::And(children) => {
            let mut flat = Vec::with_capacity(children.len());
            for child in children {
                match normalize(child) {
                    Filter::And(grandchildren) => flat.extend(grandchildren),
                    other => flat.push(other),
                }
            }
            if flat.len() == 1 {
                flat.pop().expect("flat has exactly 1 element")
            } else {
                Filter::And(flat)
            }
        }
        Filter::Or(children) => {
            let mut flat = Vec::with_capacity(children.len());
            for child in children {
                match normalize(child) {
                    Filter::Or(grandchildren) => flat.extend(grandchildren),
                    other => flat.push(other),
                }
            }
            if flat.len() == 1 {
                flat.pop().expect("flat has exactly 1 element")
            } else {
                Filter::Or(flat)
            }
        }
        Filter::Not(child) => match normalize(*child) {
            Filter::Not(inner) => *inner,
            other => Filter::Not(Box::new(other)),
        },
        leaf => leaf,
    }
}

/// Splits a normalized filter into its top-level conjuncts.
#[must_use]
pub fn conjuncts(filter: Filter) -> Vec<Filter> {
    match filter {
        Filter::And(children) => children,
        other => vec![other],
    }
}

/// Pairs the two sides of a comparison into `(property, literal)` form.
///
/// Returns `None` for `(literal, literal)` and `(property, property)`
/// shapes, which the caller keeps as opaque residual. Any other shape (a
/// function call on either side) is unsupported.
pub fn pair(lhs: &Expression, rhs: &Expression) -> Result<Option<PropertyLiteral>> {
    match (lhs, rhs) {
        (Expression::Property(name), Expression::Literal(literal)) => Ok(Some(PropertyLiteral {
            name: name.clone(),
            literal: literal.clone(),
            secondary: None,
            flipped: false,
        })),
        (Expression::Literal(literal), Expression::Property(name)) => Ok(Some(PropertyLiteral {
            name: name.clone(),
            literal: literal.clone(),
            secondary: None,
            flipped: true,
        })),
        (Expression::Literal(_), Expression::Literal(_))
        | (Expression::Property(_), Expression::Property(_)) => Ok(None),
        (Expression::Call(call), _) | (_, Expression::Call(call)) => Err(Error::unsupported(
            format!("cannot plan comparison against call `{call}`"),
        )),
    }
}

/// Builds a comparison filter from raw expression operands.
///
/// Operand order is preserved in `flipped`, and unpairable-but-legal shapes
/// degrade to opaque residual text.
pub fn comparison(op: CompareOp, lhs: Expression, rhs: Expression) -> Result<Filter> {
    match pair(&lhs, &rhs)? {
        Some(paired) => Ok(Filter::Compare {
            op,
            property: paired.name,
            value: paired.literal,
            flipped: paired.flipped,
        }),
        None => Ok(Filter::Opaque {
            ecql: format!(
                "{} {} {}",
                expression_ecql(&lhs),
                op.as_str(),
                expression_ecql(&rhs)
            ),
        }),
    }
}

/// Builds a `BETWEEN` filter from raw expression operands.
pub fn between(subject: Expression, lo: Expression, hi: Expression) -> Result<Filter> {
    match (subject, lo, hi) {
        (Expression::Property(property), Expression::Literal(lo), Expression::Literal(hi)) => {
            Ok(Filter::Between { property, lo, hi })
        }
        (subject, lo, hi) => Err(Error::unsupported(format!(
            "cannot plan BETWEEN over ({}, {}, {})",
            expression_ecql(&subject),
            expression_ecql(&lo),
            expression_ecql(&hi)
        ))),
    }
}

fn expression_ecql(expr: &Expression) -> String {
    match expr {
        Expression::Property(name) => name.clone(),
        Expression::Literal(literal) => literal.to_ecql(),
        Expression::Call(call) => call.clone(),
    }
}
