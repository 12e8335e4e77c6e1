use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Introspection keys a domain may be asked to answer.
///
/// Queries never mutate the element and are always allowed to answer
/// "unknown"; asking an element a question its domain cannot interpret is
/// not an error.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum QueryOperation {
    /// The smallest enclosing [min, max] pair of the element.
    Bounds,
    /// Sign classification: certainly zero, positive, negative, or unknown.
    Sign,
    /// IEEE classification of a float element (NaN, infinite, zero, ...).
    FloatClass,
    /// The bits of the value that are certainly 0 or certainly 1.
    KnownBits,
    /// A hint at a cheaper representation with the same concretization.
    Simplify,
    /// The element re-expressed as a disjunction of alternatives.
    ToDisjunction,
}

impl Display for QueryOperation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            QueryOperation::Bounds => "bounds",
            QueryOperation::Sign => "sign",
            QueryOperation::FloatClass => "float-class",
            QueryOperation::KnownBits => "known-bits",
            QueryOperation::Simplify => "simplify",
            QueryOperation::ToDisjunction => "to-disjunction",
        };
        write!(f, "{s}")
    }
}
