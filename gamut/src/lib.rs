//! Scalar abstract-value engine for static analysis.
//!
//! `gamut` represents the possible run-time values of machine-level scalars
//! (native integers and floats, arbitrary-width multi-bit and multi-float
//! values, booleans) as elements of an abstract lattice, and propagates
//! program operations over those elements both forward ([`Element::apply`]:
//! compute an abstract result from abstract operands) and backward
//! ([`Element::constrain`]: refine an operand from a known result).
//!
//! The operation vocabulary lives in the companion crate, re-exported here
//! as [`ops`].
//!
//! ```
//! use gamut::element::Element;
//! use gamut::environment::EvaluationEnvironment;
//! use gamut::ops::BinaryOp;
//!
//! let mut value = Element::int_element(5);
//! let mut env = EvaluationEnvironment::binary(Element::int_element(3));
//! value.apply(&BinaryOp::Plus.into(), &mut env);
//! assert_eq!(value, Element::int_element(8));
//! ```

pub mod element;
pub mod environment;
mod error;
pub mod lattice;
pub mod precision;

pub use gamut_ops as ops;

pub use element::{ApproxKind, Element, QueryAnswer, SharedElement, SignClass};
pub use environment::{
    Argument, ConstraintEnvironment, EvaluationEnvironment, Init, InitFloat, RoundingMode,
};
pub use error::GamutError;
pub use precision::Precision;
