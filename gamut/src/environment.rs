//! Per-call contexts for forward and backward transfer.
//!
//! An [`EvaluationEnvironment`] is created for one `apply`/`intersect_with`/
//! `merge_with` call and discarded afterwards. It carries the operation's
//! argument elements in, and the arithmetic condition flags out. A
//! [`ConstraintEnvironment`] plays the same role for backward refinement,
//! carrying which operand role is being refined.

use crate::element::{Element, SharedElement};
use crate::error::GamutError;
use gamut_ops::{FloatFormat, IntKind, ScalarKind};
use serde::{Deserialize, Serialize};

/// Rounding direction for floating-point transfer functions.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Default, Serialize, Deserialize)]
pub enum RoundingMode {
    #[default]
    Nearest,
    Lowest,
    Highest,
    Zero,
}

/// Arithmetic condition flags. These are data conditions, not errors: the
/// caller decides whether to widen to top, drop a disjunction alternative, or
/// propagate bottom.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct EvalFlags {
    pub positive_overflow: bool,
    pub negative_overflow: bool,
    pub division_by_zero: bool,
    pub nan_produced: bool,
    pub inexact: bool,
    pub empty: bool,
}

/// Forward-transfer context: argument elements, rounding, condition flags.
#[derive(Debug, Clone, Default)]
pub struct EvaluationEnvironment {
    arguments: Vec<SharedElement>,
    rounding: RoundingMode,
    stop_on_error: bool,
    flags: EvalFlags,
}

impl EvaluationEnvironment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Context for a unary operation.
    pub fn unary() -> Self {
        Self::default()
    }

    /// Context for a binary operation with the given second operand.
    pub fn binary(argument: impl Into<SharedElement>) -> Self {
        EvaluationEnvironment {
            arguments: vec![argument.into()],
            ..Self::default()
        }
    }

    pub fn with_rounding(mut self, rounding: RoundingMode) -> Self {
        self.rounding = rounding;
        self
    }

    pub fn with_stop_on_error(mut self) -> Self {
        self.stop_on_error = true;
        self
    }

    pub fn push_argument(&mut self, argument: impl Into<SharedElement>) {
        self.arguments.push(argument.into());
    }

    pub fn argument(&self, index: usize) -> Option<&Element> {
        self.arguments.get(index).map(|a| a.as_ref())
    }

    pub fn shared_argument(&self, index: usize) -> Option<SharedElement> {
        self.arguments.get(index).cloned()
    }

    pub fn rounding(&self) -> RoundingMode {
        self.rounding
    }

    pub fn stop_on_error(&self) -> bool {
        self.stop_on_error
    }

    pub fn flags(&self) -> &EvalFlags {
        &self.flags
    }

    pub fn clear_flags(&mut self) {
        self.flags = EvalFlags::default();
    }

    pub fn set_positive_overflow(&mut self) {
        self.flags.positive_overflow = true;
    }

    pub fn set_negative_overflow(&mut self) {
        self.flags.negative_overflow = true;
    }

    pub fn set_division_by_zero(&mut self) {
        self.flags.division_by_zero = true;
    }

    pub fn set_nan(&mut self) {
        self.flags.nan_produced = true;
    }

    pub fn set_inexact(&mut self) {
        self.flags.inexact = true;
    }

    pub fn set_empty(&mut self) {
        self.flags.empty = true;
    }

    pub fn is_positive_overflow(&self) -> bool {
        self.flags.positive_overflow
    }

    pub fn is_negative_overflow(&self) -> bool {
        self.flags.negative_overflow
    }

    pub fn is_overflow(&self) -> bool {
        self.flags.positive_overflow || self.flags.negative_overflow
    }

    pub fn is_division_by_zero(&self) -> bool {
        self.flags.division_by_zero
    }

    pub fn is_empty(&self) -> bool {
        self.flags.empty
    }

    /// Whether any condition that invalidates an exact result occurred.
    pub fn has_evaluation_error(&self) -> bool {
        self.flags.positive_overflow
            || self.flags.negative_overflow
            || self.flags.division_by_zero
            || self.flags.nan_produced
            || self.flags.empty
    }

    /// Merge another environment's condition flags into this one. Used when a
    /// combinator pushes an operation into its sub-elements with scratch
    /// environments.
    pub fn absorb_flags(&mut self, other: &EvaluationEnvironment) {
        self.flags.positive_overflow |= other.flags.positive_overflow;
        self.flags.negative_overflow |= other.flags.negative_overflow;
        self.flags.division_by_zero |= other.flags.division_by_zero;
        self.flags.nan_produced |= other.flags.nan_produced;
        self.flags.inexact |= other.flags.inexact;
        self.flags.empty |= other.flags.empty;
    }

    /// A fresh environment with the same arguments/configuration and clean
    /// flags.
    pub fn scratch(&self) -> EvaluationEnvironment {
        EvaluationEnvironment {
            arguments: self.arguments.clone(),
            rounding: self.rounding,
            stop_on_error: self.stop_on_error,
            flags: EvalFlags::default(),
        }
    }

    /// Same configuration, different argument list.
    pub fn scratch_with_argument(&self, argument: impl Into<SharedElement>) -> Self {
        EvaluationEnvironment {
            arguments: vec![argument.into()],
            rounding: self.rounding,
            stop_on_error: self.stop_on_error,
            flags: EvalFlags::default(),
        }
    }
}

/// Which operand of the constrained operation `self` is, when refining
/// backward. For `a - b = r`, constraining `a` is the direct role and
/// constraining `b` the inverse one; the distinction picks between
/// `r + b` and `a - r` as the inverse image.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Default, Serialize, Deserialize)]
pub enum Argument {
    #[default]
    Direct,
    Inverse,
}

impl Argument {
    pub fn is_direct(&self) -> bool {
        matches!(self, Argument::Direct)
    }
}

/// Backward-transfer context.
#[derive(Debug, Clone, Default)]
pub struct ConstraintEnvironment {
    argument: Argument,
    rounding: RoundingMode,
    empty: bool,
}

impl ConstraintEnvironment {
    pub fn new(argument: Argument) -> Self {
        ConstraintEnvironment {
            argument,
            ..Self::default()
        }
    }

    pub fn direct() -> Self {
        Self::new(Argument::Direct)
    }

    pub fn inverse() -> Self {
        Self::new(Argument::Inverse)
    }

    pub fn argument(&self) -> Argument {
        self.argument
    }

    pub fn rounding(&self) -> RoundingMode {
        self.rounding
    }

    pub fn set_empty(&mut self) {
        self.empty = true;
    }

    pub fn is_empty(&self) -> bool {
        self.empty
    }
}

/// Configuration for the integer element factories.
///
/// ```
/// use gamut::environment::Init;
/// use gamut::element::Element;
///
/// let e = Element::from_init(Init::new().set_bit_size(32).set_initial_value(5)).unwrap();
/// assert_eq!(e.to_string(), "Const u32 5");
/// ```
#[derive(Debug, Clone, Default)]
pub struct Init {
    bit_size: Option<u32>,
    signed: bool,
    initial_value: Option<u64>,
}

impl Init {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_bit_size(mut self, bits: u32) -> Self {
        self.bit_size = Some(bits);
        self
    }

    pub fn set_signed(mut self) -> Self {
        self.signed = true;
        self
    }

    pub fn set_initial_value(mut self, value: u64) -> Self {
        self.initial_value = Some(value);
        self
    }

    pub fn bit_size(&self) -> Option<u32> {
        self.bit_size
    }

    pub fn is_signed(&self) -> bool {
        self.signed
    }

    pub fn initial_value(&self) -> Option<u64> {
        self.initial_value
    }

    pub(crate) fn kind(&self) -> Result<ScalarKind, GamutError> {
        let bits = self.bit_size.ok_or(GamutError::MissingBitSize)?;
        if bits <= 64 {
            Ok(ScalarKind::Integer(IntKind::new(bits, self.signed)?))
        } else {
            Ok(ScalarKind::MultiBit {
                bits,
                signed: self.signed,
            })
        }
    }
}

/// Configuration for the float element factories.
#[derive(Debug, Clone, Default)]
pub struct InitFloat {
    size_mantissa: Option<u32>,
    size_exponent: Option<u32>,
    initial_value: Option<f64>,
}

impl InitFloat {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_sizes(mut self, mantissa: u32, exponent: u32) -> Self {
        self.size_mantissa = Some(mantissa);
        self.size_exponent = Some(exponent);
        self
    }

    pub fn set_initial_value(mut self, value: f64) -> Self {
        self.initial_value = Some(value);
        self
    }

    pub fn initial_value(&self) -> Option<f64> {
        self.initial_value
    }

    pub(crate) fn format(&self) -> Result<FloatFormat, GamutError> {
        let mantissa = self.size_mantissa.ok_or(GamutError::MissingBitSize)?;
        let exponent = self.size_exponent.ok_or(GamutError::MissingBitSize)?;
        Ok(FloatFormat::new(mantissa, exponent)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::Element;

    #[test]
    fn test_flags_start_clear() {
        let env = EvaluationEnvironment::new();
        assert!(!env.has_evaluation_error());
        assert!(!env.is_empty());
    }

    #[test]
    fn test_absorb_flags() {
        let mut outer = EvaluationEnvironment::new();
        let mut inner = outer.scratch();
        inner.set_positive_overflow();
        inner.set_empty();
        outer.absorb_flags(&inner);
        assert!(outer.is_positive_overflow());
        assert!(outer.is_empty());
        assert!(!outer.is_negative_overflow());
    }

    #[test]
    fn test_binary_environment_argument() {
        let env = EvaluationEnvironment::binary(Element::int_element(3));
        assert!(env.argument(0).is_some());
        assert!(env.argument(1).is_none());
    }

    #[test]
    fn test_init_kind_selection() {
        let narrow = Init::new().set_bit_size(16).set_signed();
        assert!(matches!(narrow.kind(), Ok(ScalarKind::Integer(_))));
        let wide = Init::new().set_bit_size(128);
        assert!(matches!(wide.kind(), Ok(ScalarKind::MultiBit { .. })));
        assert!(Init::new().kind().is_err());
    }
}
