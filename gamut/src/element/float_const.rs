//! Native floating-point constants.
//!
//! Arithmetic is host IEEE arithmetic at the declared precision. The host
//! rounds to nearest; directed rounding requests are honored by computing the
//! rounding residual (two-sum for additive operations, an FMA remainder for
//! multiplicative ones) and nudging the result one ulp in the requested
//! direction when the residual points the other way. `Extended` values share
//! the f64 payload (portable hosts expose no wider arithmetic); the
//! multi-float representation is the exact path for wider formats.

use crate::element::int_const::IntConst;
use crate::element::multibit::MultiBit;
use crate::element::multifloat::MultiFloat;
use crate::element::{Element, Refinement};
use crate::environment::{Argument, EvaluationEnvironment, RoundingMode};
use crate::lattice::Ternary;
use gamut_ops::{BinaryOp, CastOp, CompareOp, FloatKind, UnaryOp};
use num_bigint::BigUint;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// IEEE value class of a float element.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum FloatClass {
    Zero,
    Subnormal,
    Normal,
    Infinite,
    NaN,
}

#[derive(Debug, Copy, Clone, Serialize, Deserialize)]
pub struct FloatConst {
    kind: FloatKind,
    value: f64,
}

// NaN payloads are not distinguished
impl PartialEq for FloatConst {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
            && (self.value.to_bits() == other.value.to_bits()
                || (self.value.is_nan() && other.value.is_nan()))
    }
}

impl Eq for FloatConst {}

impl FloatConst {
    pub fn new(kind: FloatKind, value: f64) -> Self {
        FloatConst {
            kind,
            value: demote(kind, value),
        }
    }

    pub fn kind(&self) -> FloatKind {
        self.kind
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn classify(&self) -> FloatClass {
        if self.value.is_nan() {
            FloatClass::NaN
        } else if self.value.is_infinite() {
            FloatClass::Infinite
        } else if self.value == 0.0 {
            FloatClass::Zero
        } else if self.value.is_subnormal() {
            FloatClass::Subnormal
        } else {
            FloatClass::Normal
        }
    }

    pub fn is_nan(&self) -> bool {
        self.value.is_nan()
    }

    /// Store `raw` knowing the true result is `raw + residual`, honoring the
    /// environment's rounding direction.
    fn store_with_residual(&mut self, raw: f64, residual: f64, env: &mut EvaluationEnvironment) {
        if raw.is_nan() {
            env.set_nan();
            self.value = raw;
            return;
        }
        let demoted = demote(self.kind, raw);
        if !demoted.is_finite() {
            if residual != 0.0 || demoted != raw {
                env.set_inexact();
            }
            self.value = demoted;
            return;
        }
        let residual = residual + (raw - demoted);
        if residual == 0.0 {
            self.value = demoted;
            return;
        }
        env.set_inexact();
        self.value = match env.rounding() {
            RoundingMode::Nearest => demoted,
            RoundingMode::Lowest => {
                if residual < 0.0 {
                    next_down_in(self.kind, demoted)
                } else {
                    demoted
                }
            }
            RoundingMode::Highest => {
                if residual > 0.0 {
                    next_up_in(self.kind, demoted)
                } else {
                    demoted
                }
            }
            RoundingMode::Zero => {
                if demoted > 0.0 && residual < 0.0 {
                    next_down_in(self.kind, demoted)
                } else if demoted < 0.0 && residual > 0.0 {
                    next_up_in(self.kind, demoted)
                } else {
                    demoted
                }
            }
        };
    }

    pub(crate) fn apply_unary(&mut self, op: UnaryOp, env: &mut EvaluationEnvironment) {
        match op {
            UnaryOp::Opposite => self.value = -self.value,
            UnaryOp::LogicalNot => {
                *self = FloatConst::new(self.kind, (self.value == 0.0) as u8 as f64)
            }
            UnaryOp::Increment => {
                let one = FloatConst::new(self.kind, 1.0);
                self.apply_binary(BinaryOp::Plus, &one, env);
            }
            UnaryOp::Decrement => {
                let one = FloatConst::new(self.kind, 1.0);
                self.apply_binary(BinaryOp::Minus, &one, env);
            }
            UnaryOp::BitNegate => {
                panic!("bit negation is not defined on float elements")
            }
        }
    }

    pub(crate) fn apply_binary(
        &mut self,
        op: BinaryOp,
        rhs: &FloatConst,
        env: &mut EvaluationEnvironment,
    ) {
        debug_assert_eq!(self.kind, rhs.kind, "mixed-kind float operation");
        let a = self.value;
        let b = rhs.value;
        match op {
            BinaryOp::Plus => {
                let (s, e) = two_sum(a, b);
                self.store_with_residual(s, e, env);
            }
            BinaryOp::Minus => {
                let (s, e) = two_sum(a, -b);
                self.store_with_residual(s, e, env);
            }
            BinaryOp::Times => {
                let s = a * b;
                let e = if s.is_finite() { a.mul_add(b, -s) } else { 0.0 };
                self.store_with_residual(s, e, env);
            }
            BinaryOp::Divide => {
                if b == 0.0 {
                    env.set_division_by_zero();
                }
                let s = a / b;
                let e = if s.is_finite() && b.is_finite() && b != 0.0 {
                    s.mul_add(-b, a) / b
                } else {
                    0.0
                };
                self.store_with_residual(s, e, env);
            }
            BinaryOp::Modulo => {
                if b == 0.0 {
                    env.set_division_by_zero();
                }
                // fmod is exact
                self.value = demote(self.kind, a % b);
            }
            BinaryOp::LogicalAnd => {
                *self = FloatConst::new(self.kind, (a != 0.0 && b != 0.0) as u8 as f64)
            }
            BinaryOp::LogicalOr => {
                *self = FloatConst::new(self.kind, (a != 0.0 || b != 0.0) as u8 as f64)
            }
            BinaryOp::ShiftLeft
            | BinaryOp::ShiftRight
            | BinaryOp::RotateLeft
            | BinaryOp::RotateRight
            | BinaryOp::BitAnd
            | BinaryOp::BitOr
            | BinaryOp::BitXor => {
                panic!("bit-level operation {op} is not defined on float elements")
            }
        }
        if self.value.is_nan() {
            env.set_nan();
        }
    }

    /// IEEE comparison: every predicate involving a NaN is false except
    /// `Different`, which is true.
    pub(crate) fn compare(&self, op: CompareOp, rhs: &FloatConst) -> Ternary {
        if self.is_nan() || rhs.is_nan() {
            return Ternary::from(matches!(op, CompareOp::Different));
        }
        Ternary::from(op.holds(&self.value, &rhs.value))
    }

    pub(crate) fn cast(&self, target: &CastOp, env: &mut EvaluationEnvironment) -> Element {
        match target {
            CastOp::Float(k) => {
                let mut out = FloatConst {
                    kind: *k,
                    value: 0.0,
                };
                out.store_with_residual(self.value, 0.0, env);
                Element::Float(out)
            }
            CastOp::Int(k) => {
                if self.is_nan() {
                    env.set_nan();
                    return Element::Int(IntConst::zero(*k));
                }
                let truncated = self.value.trunc();
                if truncated != self.value {
                    env.set_inexact();
                }
                let raw = if k.is_signed() {
                    if truncated < k.min_signed() as f64 {
                        env.set_negative_overflow();
                        k.min_signed() as u64
                    } else if truncated > k.max_signed() as f64 {
                        env.set_positive_overflow();
                        k.max_signed() as u64
                    } else {
                        truncated as i64 as u64
                    }
                } else if truncated < 0.0 {
                    env.set_negative_overflow();
                    0
                } else if truncated > k.max_value() as f64 {
                    env.set_positive_overflow();
                    k.max_value()
                } else {
                    truncated as u64
                };
                Element::Int(IntConst::new(*k, raw))
            }
            CastOp::MultiFloat(format) => {
                Element::MultiFloat(MultiFloat::from_f64(*format, self.value, env))
            }
            CastOp::MultiBit { bits, signed } => {
                if self.is_nan() || self.value.is_infinite() {
                    env.set_nan();
                    return Element::MultiBit(MultiBit::new(*bits, *signed, BigUint::from(0u8)));
                }
                let truncated = self.value.trunc();
                if truncated != self.value {
                    env.set_inexact();
                }
                if truncated < 0.0 {
                    env.set_negative_overflow();
                }
                Element::MultiBit(MultiBit::from_f64(*bits, *signed, truncated))
            }
            CastOp::Bool => Element::bool_element(self.value != 0.0),
        }
    }

    /// Inverse image through an arithmetic operation, for backward refinement.
    /// Float inverses are inexact by a rounding step; the refinement widens by
    /// one ulp on each side to stay sound.
    pub(crate) fn refine_binary(
        &self,
        op: BinaryOp,
        result: &FloatConst,
        other: &FloatConst,
        role: Argument,
    ) -> Refinement {
        if result.is_nan() || other.is_nan() {
            return Refinement::Keep;
        }
        let candidate = match op {
            BinaryOp::Plus => result.value - other.value,
            BinaryOp::Minus => {
                if role.is_direct() {
                    result.value + other.value
                } else {
                    other.value - result.value
                }
            }
            BinaryOp::Times => {
                if other.value == 0.0 {
                    return if result.value == 0.0 {
                        Refinement::Keep
                    } else {
                        Refinement::Empty
                    };
                }
                result.value / other.value
            }
            BinaryOp::Divide => {
                if role.is_direct() {
                    result.value * other.value
                } else {
                    if result.value == 0.0 {
                        return Refinement::Keep;
                    }
                    other.value / result.value
                }
            }
            _ => return Refinement::Keep,
        };
        if candidate.is_nan() || candidate.is_infinite() {
            return Refinement::Keep;
        }
        let lo = FloatConst::new(self.kind, next_down_in(self.kind, candidate));
        let hi = FloatConst::new(self.kind, next_up_in(self.kind, candidate));
        Refinement::Replace(Element::float_range(lo, hi))
    }

    pub(crate) fn refine_compare(&self, op: CompareOp, other: &FloatConst) -> Refinement {
        if other.is_nan() {
            return match op {
                // only `Different` can hold against a NaN
                CompareOp::Different => Refinement::Keep,
                _ => Refinement::Empty,
            };
        }
        let kind = self.kind;
        match op {
            CompareOp::Equal => Refinement::Replace(Element::Float(*other)),
            CompareOp::Different => Refinement::Keep,
            CompareOp::Less => Refinement::Replace(Element::float_range(
                FloatConst::new(kind, f64::NEG_INFINITY),
                FloatConst::new(kind, next_down_in(kind, other.value)),
            )),
            CompareOp::LessOrEqual => Refinement::Replace(Element::float_range(
                FloatConst::new(kind, f64::NEG_INFINITY),
                *other,
            )),
            CompareOp::Greater => Refinement::Replace(Element::float_range(
                FloatConst::new(kind, next_up_in(kind, other.value)),
                FloatConst::new(kind, f64::INFINITY),
            )),
            CompareOp::GreaterOrEqual => Refinement::Replace(Element::float_range(
                *other,
                FloatConst::new(kind, f64::INFINITY),
            )),
        }
    }
}

/// Knuth's exact two-sum: returns `(fl(a+b), err)` with `a+b = fl(a+b) + err`.
fn two_sum(a: f64, b: f64) -> (f64, f64) {
    let s = a + b;
    if !s.is_finite() {
        return (s, 0.0);
    }
    let bv = s - a;
    let err = (a - (s - bv)) + (b - bv);
    (s, err)
}

/// Round a host double to the storage precision of `kind`.
fn demote(kind: FloatKind, value: f64) -> f64 {
    match kind {
        FloatKind::Single => value as f32 as f64,
        FloatKind::Double | FloatKind::Extended => value,
    }
}

/// The next representable value above `v` in the grid of `kind`.
pub(crate) fn next_up_in(kind: FloatKind, v: f64) -> f64 {
    match kind {
        FloatKind::Single => next_up_f32(v as f32) as f64,
        FloatKind::Double | FloatKind::Extended => next_up(v),
    }
}

/// The next representable value below `v` in the grid of `kind`.
pub(crate) fn next_down_in(kind: FloatKind, v: f64) -> f64 {
    match kind {
        FloatKind::Single => next_down_f32(v as f32) as f64,
        FloatKind::Double | FloatKind::Extended => next_down(v),
    }
}

/// The next representable double above `v`.
pub(crate) fn next_up(v: f64) -> f64 {
    if v.is_nan() || v == f64::INFINITY {
        return v;
    }
    if v == 0.0 {
        return f64::from_bits(1);
    }
    let bits = if v > 0.0 { v.to_bits() + 1 } else { v.to_bits() - 1 };
    f64::from_bits(bits)
}

/// The next representable double below `v`.
pub(crate) fn next_down(v: f64) -> f64 {
    if v.is_nan() || v == f64::NEG_INFINITY {
        return v;
    }
    if v == 0.0 {
        return -f64::from_bits(1);
    }
    let bits = if v > 0.0 { v.to_bits() - 1 } else { v.to_bits() + 1 };
    f64::from_bits(bits)
}

fn next_up_f32(v: f32) -> f32 {
    if v.is_nan() || v == f32::INFINITY {
        return v;
    }
    if v == 0.0 {
        return f32::from_bits(1);
    }
    let bits = if v > 0.0 { v.to_bits() + 1 } else { v.to_bits() - 1 };
    f32::from_bits(bits)
}

fn next_down_f32(v: f32) -> f32 {
    if v.is_nan() || v == f32::NEG_INFINITY {
        return v;
    }
    if v == 0.0 {
        return -f32::from_bits(1);
    }
    let bits = if v > 0.0 { v.to_bits() - 1 } else { v.to_bits() + 1 };
    f32::from_bits(bits)
}

impl Display for FloatConst {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.kind, self.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gamut_ops::IntKind;

    fn env() -> EvaluationEnvironment {
        EvaluationEnvironment::new()
    }

    #[test]
    fn test_basic_arithmetic() {
        let mut a = FloatConst::new(FloatKind::Double, 1.5);
        let mut e = env();
        a.apply_binary(BinaryOp::Plus, &FloatConst::new(FloatKind::Double, 2.25), &mut e);
        assert_eq!(a.value(), 3.75);
        assert!(!e.has_evaluation_error());
        assert!(!e.flags().inexact);
    }

    #[test]
    fn test_single_precision_rounds() {
        let a = FloatConst::new(FloatKind::Single, 0.1);
        assert_eq!(a.value(), 0.1f32 as f64);
    }

    #[test]
    fn test_nan_flagged() {
        let mut a = FloatConst::new(FloatKind::Double, f64::INFINITY);
        let mut e = env();
        a.apply_binary(
            BinaryOp::Minus,
            &FloatConst::new(FloatKind::Double, f64::INFINITY),
            &mut e,
        );
        assert!(a.is_nan());
        assert!(e.flags().nan_produced);
    }

    #[test]
    fn test_directed_rounding_bounds_true_result() {
        // 0.1 + 0.2 is inexact in binary; Lowest and Highest must bracket it
        let mut lo = FloatConst::new(FloatKind::Double, 0.1);
        let mut e_lo = EvaluationEnvironment::new().with_rounding(RoundingMode::Lowest);
        lo.apply_binary(BinaryOp::Plus, &FloatConst::new(FloatKind::Double, 0.2), &mut e_lo);

        let mut hi = FloatConst::new(FloatKind::Double, 0.1);
        let mut e_hi = EvaluationEnvironment::new().with_rounding(RoundingMode::Highest);
        hi.apply_binary(BinaryOp::Plus, &FloatConst::new(FloatKind::Double, 0.2), &mut e_hi);

        assert!(e_lo.flags().inexact && e_hi.flags().inexact);
        assert!(lo.value() < hi.value());
        assert!(lo.value() <= 0.1 + 0.2 && 0.1 + 0.2 <= hi.value());
    }

    #[test]
    fn test_nan_comparison() {
        let nan = FloatConst::new(FloatKind::Double, f64::NAN);
        let one = FloatConst::new(FloatKind::Double, 1.0);
        assert!(nan.compare(CompareOp::Equal, &one).is_false());
        assert!(nan.compare(CompareOp::Different, &one).is_true());
        assert!(nan.compare(CompareOp::Less, &one).is_false());
    }

    #[test]
    fn test_cast_to_int_saturates_and_flags() {
        let big = FloatConst::new(FloatKind::Double, 3.0e10);
        let mut e = env();
        match big.cast(&CastOp::Int(IntKind::I32), &mut e) {
            Element::Int(v) => assert_eq!(v.signed(), i32::MAX as i64),
            _ => unreachable!(),
        }
        assert!(e.is_positive_overflow());

        let frac = FloatConst::new(FloatKind::Double, 2.75);
        let mut e = env();
        match frac.cast(&CastOp::Int(IntKind::I32), &mut e) {
            Element::Int(v) => assert_eq!(v.signed(), 2),
            _ => unreachable!(),
        }
        assert!(e.flags().inexact);
    }

    #[test]
    fn test_next_up_down() {
        assert!(next_up(1.0) > 1.0);
        assert!(next_down(1.0) < 1.0);
        assert!(next_up(0.0) > 0.0);
        assert!(next_down(0.0) < 0.0);
        assert_eq!(next_up(f64::INFINITY), f64::INFINITY);
    }

    #[test]
    fn test_two_sum_recovers_residual() {
        let (s, e) = two_sum(0.1, 0.2);
        assert_ne!(e, 0.0);
        assert_eq!(s, 0.1 + 0.2);
    }

    #[test]
    fn test_classify() {
        assert_eq!(FloatConst::new(FloatKind::Double, 0.0).classify(), FloatClass::Zero);
        assert_eq!(FloatConst::new(FloatKind::Double, 1.0).classify(), FloatClass::Normal);
        assert_eq!(
            FloatConst::new(FloatKind::Double, f64::NAN).classify(),
            FloatClass::NaN
        );
        assert_eq!(
            FloatConst::new(FloatKind::Double, f64::INFINITY).classify(),
            FloatClass::Infinite
        );
    }
}
