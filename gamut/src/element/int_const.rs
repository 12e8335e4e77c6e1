//! Native integer constants.
//!
//! An [`IntConst`] wraps one host-machine value at a declared width and
//! signedness. Arithmetic is exact host arithmetic at that width: unsigned
//! operations wrap, signed operations wrap in two's complement, and both
//! record the overflow direction on the evaluation environment so the caller
//! can decide what the wrap means for its domain.

use crate::element::interval::IntInterval;
use crate::element::mask::BitMask;
use crate::element::multibit::MultiBit;
use crate::element::multifloat::MultiFloat;
use crate::element::{Element, Refinement};
use crate::environment::{Argument, EvaluationEnvironment};
use crate::lattice::Ternary;
use gamut_ops::{BinaryOp, CastOp, CompareOp, IntKind, UnaryOp};
use num_bigint::BigUint;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct IntConst {
    kind: IntKind,
    /// Raw bit pattern, always masked to the kind's width.
    bits: u64,
}

impl IntConst {
    pub fn new(kind: IntKind, raw: u64) -> Self {
        IntConst {
            kind,
            bits: raw & kind.mask(),
        }
    }

    pub fn zero(kind: IntKind) -> Self {
        IntConst { kind, bits: 0 }
    }

    pub fn one(kind: IntKind) -> Self {
        IntConst::new(kind, 1)
    }

    pub fn min_of(kind: IntKind) -> Self {
        IntConst::new(kind, kind.min_value())
    }

    pub fn max_of(kind: IntKind) -> Self {
        IntConst::new(kind, kind.max_value())
    }

    pub fn from_signed(kind: IntKind, value: i64) -> Self {
        IntConst::new(kind, value as u64)
    }

    pub fn kind(&self) -> IntKind {
        self.kind
    }

    /// The value under the unsigned view of the kind.
    pub fn unsigned(&self) -> u64 {
        self.bits
    }

    /// The value under the signed view of the kind (sign-extended).
    pub fn signed(&self) -> i64 {
        if self.kind.is_signed() && self.bits & self.kind.sign_bit() != 0 {
            (self.bits | !self.kind.mask()) as i64
        } else {
            self.bits as i64
        }
    }

    pub fn is_zero(&self) -> bool {
        self.bits == 0
    }

    pub fn is_negative(&self) -> bool {
        self.kind.is_signed() && self.bits & self.kind.sign_bit() != 0
    }

    fn store(&mut self, raw: u64) {
        self.bits = raw & self.kind.mask();
    }

    pub(crate) fn apply_unary(&mut self, op: UnaryOp, env: &mut EvaluationEnvironment) {
        match op {
            UnaryOp::Opposite => {
                if self.kind.is_signed() {
                    if self.bits == self.kind.sign_bit() {
                        // negating the minimum stays the minimum
                        env.set_positive_overflow();
                    }
                    self.store(self.bits.wrapping_neg());
                } else {
                    if self.bits != 0 {
                        env.set_negative_overflow();
                    }
                    self.store(self.bits.wrapping_neg());
                }
            }
            UnaryOp::BitNegate => self.store(!self.bits),
            UnaryOp::LogicalNot => self.store((self.bits == 0) as u64),
            UnaryOp::Increment => {
                self.apply_binary(BinaryOp::Plus, &IntConst::one(self.kind), env)
            }
            UnaryOp::Decrement => {
                self.apply_binary(BinaryOp::Minus, &IntConst::one(self.kind), env)
            }
        }
    }

    pub(crate) fn apply_binary(
        &mut self,
        op: BinaryOp,
        rhs: &IntConst,
        env: &mut EvaluationEnvironment,
    ) {
        debug_assert_eq!(self.kind, rhs.kind, "mixed-kind integer operation");
        let kind = self.kind;
        match op {
            BinaryOp::Plus => {
                if kind.is_signed() {
                    let sum = self.signed() as i128 + rhs.signed() as i128;
                    self.flag_signed_range(sum, env);
                    self.store(sum as u64);
                } else {
                    let sum = self.bits as u128 + rhs.bits as u128;
                    if sum > kind.mask() as u128 {
                        env.set_positive_overflow();
                    }
                    self.store(sum as u64);
                }
            }
            BinaryOp::Minus => {
                if kind.is_signed() {
                    let diff = self.signed() as i128 - rhs.signed() as i128;
                    self.flag_signed_range(diff, env);
                    self.store(diff as u64);
                } else {
                    if rhs.bits > self.bits {
                        env.set_negative_overflow();
                    }
                    self.store(self.bits.wrapping_sub(rhs.bits));
                }
            }
            BinaryOp::Times => {
                if kind.is_signed() {
                    let product = self.signed() as i128 * rhs.signed() as i128;
                    self.flag_signed_range(product, env);
                    self.store(product as u64);
                } else {
                    let product = self.bits as u128 * rhs.bits as u128;
                    if product > kind.mask() as u128 {
                        env.set_positive_overflow();
                    }
                    self.store(product as u64);
                }
            }
            BinaryOp::Divide => {
                if rhs.is_zero() {
                    env.set_division_by_zero();
                } else if kind.is_signed() {
                    if self.signed() == kind.min_signed() && rhs.signed() == -1 {
                        env.set_positive_overflow();
                    }
                    self.store(self.signed().wrapping_div(rhs.signed()) as u64);
                } else {
                    self.store(self.bits / rhs.bits);
                }
            }
            BinaryOp::Modulo => {
                if rhs.is_zero() {
                    env.set_division_by_zero();
                } else if kind.is_signed() {
                    self.store(self.signed().wrapping_rem(rhs.signed()) as u64);
                } else {
                    self.store(self.bits % rhs.bits);
                }
            }
            BinaryOp::ShiftLeft => {
                let amount = rhs.unsigned();
                if amount >= kind.bits() as u64 {
                    if self.bits != 0 {
                        env.set_positive_overflow();
                    }
                    self.store(0);
                } else {
                    let k = amount as u32;
                    let lost = if k == 0 {
                        0
                    } else {
                        self.bits >> (kind.bits() - k)
                    };
                    if lost != 0 {
                        env.set_positive_overflow();
                    }
                    let shifted = self.bits << k;
                    if kind.is_signed() {
                        let before_negative = self.is_negative();
                        self.store(shifted);
                        if before_negative != self.is_negative() && lost == 0 {
                            env.set_positive_overflow();
                        }
                    } else {
                        self.store(shifted);
                    }
                }
            }
            BinaryOp::ShiftRight => {
                let amount = rhs.unsigned();
                if amount >= kind.bits() as u64 {
                    let fill = if self.is_negative() { kind.mask() } else { 0 };
                    self.store(fill);
                } else if kind.is_signed() {
                    self.store((self.signed() >> amount) as u64);
                } else {
                    self.store(self.bits >> amount);
                }
            }
            BinaryOp::RotateLeft => {
                let width = kind.bits() as u64;
                let k = (rhs.unsigned() % width) as u32;
                if k != 0 {
                    let rotated = (self.bits << k) | (self.bits >> (kind.bits() - k));
                    self.store(rotated);
                }
            }
            BinaryOp::RotateRight => {
                let width = kind.bits() as u64;
                let k = (rhs.unsigned() % width) as u32;
                if k != 0 {
                    let rotated = (self.bits >> k) | (self.bits << (kind.bits() - k));
                    self.store(rotated);
                }
            }
            BinaryOp::BitAnd => self.store(self.bits & rhs.bits),
            BinaryOp::BitOr => self.store(self.bits | rhs.bits),
            BinaryOp::BitXor => self.store(self.bits ^ rhs.bits),
            BinaryOp::LogicalAnd => self.store((self.bits != 0 && rhs.bits != 0) as u64),
            BinaryOp::LogicalOr => self.store((self.bits != 0 || rhs.bits != 0) as u64),
        }
    }

    fn flag_signed_range(&self, wide: i128, env: &mut EvaluationEnvironment) {
        if wide > self.kind.max_signed() as i128 {
            env.set_positive_overflow();
        } else if wide < self.kind.min_signed() as i128 {
            env.set_negative_overflow();
        }
    }

    /// Evaluate a comparison under the kind's signedness. Always definite for
    /// constants.
    pub(crate) fn compare(&self, op: CompareOp, rhs: &IntConst) -> Ternary {
        debug_assert_eq!(self.kind, rhs.kind, "mixed-kind integer comparison");
        let holds = if self.kind.is_signed() {
            op.holds(&self.signed(), &rhs.signed())
        } else {
            op.holds(&self.unsigned(), &rhs.unsigned())
        };
        Ternary::from(holds)
    }

    pub(crate) fn cast(&self, target: &CastOp, env: &mut EvaluationEnvironment) -> Element {
        match target {
            CastOp::Int(k) => {
                let v = if self.kind.is_signed() {
                    self.signed() as u64
                } else {
                    self.unsigned()
                };
                let out = IntConst::new(*k, v);
                // flag conversions that change the value, not just the bits
                let source = if self.kind.is_signed() {
                    self.signed() as i128
                } else {
                    self.unsigned() as i128
                };
                let converted = if k.is_signed() {
                    out.signed() as i128
                } else {
                    out.unsigned() as i128
                };
                if source != converted {
                    if source < converted {
                        env.set_negative_overflow();
                    } else {
                        env.set_positive_overflow();
                    }
                }
                Element::Int(out)
            }
            CastOp::Float(k) => {
                let v = if self.kind.is_signed() {
                    self.signed() as f64
                } else {
                    self.unsigned() as f64
                };
                Element::float_const(*k, v, env)
            }
            CastOp::MultiBit { bits, signed } => {
                let value = if self.is_negative() {
                    // two's complement at the target width
                    let modulus = BigUint::from(1u8) << *bits;
                    let magnitude = BigUint::from(self.signed().unsigned_abs());
                    if magnitude > modulus.clone() >> 1 {
                        env.set_negative_overflow();
                    }
                    (modulus.clone() - (magnitude % modulus.clone())) % modulus
                } else {
                    BigUint::from(self.unsigned())
                };
                Element::MultiBit(MultiBit::new(*bits, *signed, value))
            }
            CastOp::MultiFloat(format) => {
                Element::MultiFloat(MultiFloat::from_i64(*format, self.signed(), env))
            }
            CastOp::Bool => Element::bool_element(self.bits != 0),
        }
    }

    /// Inverse image of `op` through a known result, for backward refinement.
    ///
    /// `self` is the still-unknown operand being refined; `other` is the known
    /// co-operand and `result` the known outcome. `role` says whether `self`
    /// was the first (direct) or second (inverse) operand.
    pub(crate) fn refine_binary(
        &self,
        op: BinaryOp,
        result: &IntConst,
        other: &IntConst,
        role: Argument,
    ) -> Refinement {
        let kind = self.kind;
        match op {
            // a + b = r has the unique solution a = r - b at any width
            BinaryOp::Plus => {
                Refinement::Replace(Element::Int(IntConst::new(
                    kind,
                    result.bits.wrapping_sub(other.bits),
                )))
            }
            BinaryOp::Minus => {
                let raw = if role.is_direct() {
                    // a - other = r  =>  a = r + other
                    result.bits.wrapping_add(other.bits)
                } else {
                    // other - b = r  =>  b = other - r
                    other.bits.wrapping_sub(result.bits)
                };
                Refinement::Replace(Element::Int(IntConst::new(kind, raw)))
            }
            BinaryOp::Times => {
                if other.bits == 0 {
                    return if result.bits == 0 {
                        Refinement::Keep
                    } else {
                        Refinement::Empty
                    };
                }
                if other.bits & 1 == 1 {
                    // odd factors are invertible modulo 2^n
                    let inv = mod_inverse(other.bits, kind.mask());
                    Refinement::Replace(Element::Int(IntConst::new(
                        kind,
                        result.bits.wrapping_mul(inv),
                    )))
                } else {
                    Refinement::Keep
                }
            }
            BinaryOp::Divide => {
                if role.is_direct() {
                    self.refine_dividend(result, other)
                } else {
                    // refining the divisor has no useful exact inverse
                    Refinement::Keep
                }
            }
            BinaryOp::BitXor => Refinement::Replace(Element::Int(IntConst::new(
                kind,
                result.bits ^ other.bits,
            ))),
            BinaryOp::BitAnd => {
                if result.bits & !other.bits != 0 {
                    return Refinement::Empty;
                }
                // where other has a 1, the operand's bit equals the result's
                match BitMask::new(kind.bits(), result.bits & other.bits, !result.bits & other.bits)
                {
                    Ok(mask) => Refinement::Replace(Element::Mask(mask)),
                    Err(_) => Refinement::Keep,
                }
            }
            BinaryOp::BitOr => {
                if other.bits & !result.bits != 0 {
                    return Refinement::Empty;
                }
                // where other has a 0, the operand's bit equals the result's
                match BitMask::new(kind.bits(), result.bits & !other.bits, !result.bits & !other.bits)
                {
                    Ok(mask) => Refinement::Replace(Element::Mask(mask)),
                    Err(_) => Refinement::Keep,
                }
            }
            BinaryOp::ShiftLeft if role.is_direct() => {
                let k = other.unsigned();
                if k >= kind.bits() as u64 {
                    return if result.bits == 0 {
                        Refinement::Keep
                    } else {
                        Refinement::Empty
                    };
                }
                let k = k as u32;
                if k == 0 {
                    return Refinement::Replace(Element::Int(*result));
                }
                if result.bits & ((1u64 << k) - 1) != 0 {
                    return Refinement::Empty;
                }
                // low bits of the operand are known; the k bits shifted out are not
                let low = kind.mask() >> k;
                let known = result.bits >> k;
                match BitMask::new(kind.bits(), known & low, !known & low) {
                    Ok(mask) => Refinement::Replace(Element::Mask(mask)),
                    Err(_) => Refinement::Keep,
                }
            }
            BinaryOp::ShiftRight if role.is_direct() && !kind.is_signed() => {
                let k = other.unsigned();
                if k >= kind.bits() as u64 {
                    return if result.bits == 0 {
                        Refinement::Keep
                    } else {
                        Refinement::Empty
                    };
                }
                let k = k as u32;
                let lo = result.bits << k;
                if lo & !kind.mask() != 0 || (lo & kind.mask()) >> k != result.bits {
                    return Refinement::Empty;
                }
                let hi = lo | if k == 0 { 0 } else { (1u64 << k) - 1 };
                IntInterval::try_range(kind, lo, hi)
            }
            _ => Refinement::Keep,
        }
    }

    fn refine_dividend(&self, result: &IntConst, divisor: &IntConst) -> Refinement {
        let kind = self.kind;
        if divisor.is_zero() {
            return Refinement::Keep;
        }
        if kind.is_signed() {
            // truncating division: a/d = r admits a in [r*d - (|d|-1), r*d + (|d|-1)]
            let r = result.signed() as i128;
            let d = divisor.signed() as i128;
            let center = r * d;
            let slack = d.unsigned_abs() as i128 - 1;
            let lo = (center - slack).max(kind.min_signed() as i128);
            let hi = (center + slack).min(kind.max_signed() as i128);
            if lo > hi {
                return Refinement::Empty;
            }
            IntInterval::try_range(kind, lo as i64 as u64, hi as i64 as u64)
        } else {
            let r = result.unsigned() as u128;
            let d = divisor.unsigned() as u128;
            let lo = r * d;
            if lo > kind.mask() as u128 {
                return Refinement::Empty;
            }
            let hi = (lo + d - 1).min(kind.mask() as u128);
            IntInterval::try_range(kind, lo as u64, hi as u64)
        }
    }

    /// Refinement of `self` from a known comparison outcome against `other`.
    /// `op` is already oriented so that `self` is the first operand.
    pub(crate) fn refine_compare(&self, op: CompareOp, other: &IntConst) -> Refinement {
        let kind = self.kind;
        match op {
            CompareOp::Equal => Refinement::Replace(Element::Int(*other)),
            CompareOp::Different => Refinement::Keep,
            CompareOp::Less => {
                if other.bits == kind.min_value() {
                    return Refinement::Empty;
                }
                let mut hi = *other;
                let mut scratch = EvaluationEnvironment::new();
                hi.apply_unary(UnaryOp::Decrement, &mut scratch);
                IntInterval::try_range(kind, kind.min_value(), hi.bits)
            }
            CompareOp::LessOrEqual => IntInterval::try_range(kind, kind.min_value(), other.bits),
            CompareOp::Greater => {
                if other.bits == kind.max_value() {
                    return Refinement::Empty;
                }
                let mut lo = *other;
                let mut scratch = EvaluationEnvironment::new();
                lo.apply_unary(UnaryOp::Increment, &mut scratch);
                IntInterval::try_range(kind, lo.bits, kind.max_value())
            }
            CompareOp::GreaterOrEqual => IntInterval::try_range(kind, other.bits, kind.max_value()),
        }
    }
}

/// Multiplicative inverse of an odd value modulo the width of `mask`.
fn mod_inverse(a: u64, mask: u64) -> u64 {
    debug_assert!(a & 1 == 1);
    let mut x: u64 = 1;
    // Newton iteration doubles the number of correct low bits each round
    for _ in 0..6 {
        x = x.wrapping_mul(2u64.wrapping_sub(a.wrapping_mul(x)));
    }
    x & mask
}

impl Display for IntConst {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.kind.is_signed() {
            write!(f, "{} {}", self.kind, self.signed())
        } else {
            write!(f, "{} {}", self.kind, self.unsigned())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env() -> EvaluationEnvironment {
        EvaluationEnvironment::new()
    }

    #[test]
    fn test_plus_exact() {
        let mut a = IntConst::from_signed(IntKind::I32, 5);
        let b = IntConst::from_signed(IntKind::I32, 3);
        let mut e = env();
        a.apply_binary(BinaryOp::Plus, &b, &mut e);
        assert_eq!(a.signed(), 8);
        assert!(!e.has_evaluation_error());
    }

    #[test]
    fn test_unsigned_wrap_flags() {
        let mut a = IntConst::new(IntKind::U8, 250);
        let b = IntConst::new(IntKind::U8, 10);
        let mut e = env();
        a.apply_binary(BinaryOp::Plus, &b, &mut e);
        assert_eq!(a.unsigned(), 4);
        assert!(e.is_positive_overflow());

        let mut c = IntConst::new(IntKind::U8, 3);
        let mut e = env();
        c.apply_binary(BinaryOp::Minus, &IntConst::new(IntKind::U8, 5), &mut e);
        assert_eq!(c.unsigned(), 254);
        assert!(e.is_negative_overflow());
    }

    #[test]
    fn test_signed_wrap_flags() {
        let mut a = IntConst::from_signed(IntKind::I8, 120);
        let mut e = env();
        a.apply_binary(BinaryOp::Plus, &IntConst::from_signed(IntKind::I8, 10), &mut e);
        assert_eq!(a.signed(), -126);
        assert!(e.is_positive_overflow());
    }

    #[test]
    fn test_divide_by_zero_is_a_flag() {
        let mut a = IntConst::from_signed(IntKind::I32, 7);
        let mut e = env();
        a.apply_binary(BinaryOp::Divide, &IntConst::zero(IntKind::I32), &mut e);
        assert!(e.is_division_by_zero());
        assert_eq!(a.signed(), 7);
    }

    #[test]
    fn test_shift_semantics() {
        let mut a = IntConst::new(IntKind::U8, 0b1100_0001);
        let mut e = env();
        a.apply_binary(BinaryOp::ShiftLeft, &IntConst::new(IntKind::U8, 1), &mut e);
        assert_eq!(a.unsigned(), 0b1000_0010);
        assert!(e.is_positive_overflow());

        let mut b = IntConst::from_signed(IntKind::I8, -64);
        let mut e = env();
        b.apply_binary(BinaryOp::ShiftRight, &IntConst::from_signed(IntKind::I8, 3), &mut e);
        assert_eq!(b.signed(), -8);

        let mut c = IntConst::new(IntKind::U8, 0b1000_0001);
        let mut e = env();
        c.apply_binary(BinaryOp::RotateLeft, &IntConst::new(IntKind::U8, 1), &mut e);
        assert_eq!(c.unsigned(), 0b0000_0011);
    }

    #[test]
    fn test_opposite_min_flags() {
        let mut a = IntConst::from_signed(IntKind::I8, -128);
        let mut e = env();
        a.apply_unary(UnaryOp::Opposite, &mut e);
        assert!(e.is_positive_overflow());
        assert_eq!(a.signed(), -128);
    }

    #[test]
    fn test_compare_signedness() {
        let minus_one = IntConst::from_signed(IntKind::I32, -1);
        let one = IntConst::from_signed(IntKind::I32, 1);
        assert!(minus_one.compare(CompareOp::Less, &one).is_true());

        // same bit patterns, unsigned view
        let big = IntConst::new(IntKind::U32, u32::MAX as u64);
        let small = IntConst::new(IntKind::U32, 1);
        assert!(big.compare(CompareOp::Greater, &small).is_true());
    }

    #[test]
    fn test_cast_round_trip() {
        for v in [-128i64, -56, -1, 0, 1, 100, 127] {
            let a = IntConst::from_signed(IntKind::I8, v);
            let mut e = env();
            let widened = a.cast(&CastOp::Int(IntKind::I32), &mut e);
            assert!(!e.has_evaluation_error());
            let mut e = env();
            let back = match &widened {
                Element::Int(w) => w.cast(&CastOp::Int(IntKind::I8), &mut e),
                _ => unreachable!(),
            };
            assert_eq!(back, Element::Int(a));
        }
    }

    #[test]
    fn test_narrowing_cast_flags() {
        let a = IntConst::from_signed(IntKind::I32, 300);
        let mut e = env();
        let narrowed = a.cast(&CastOp::Int(IntKind::I8), &mut e);
        assert!(e.is_positive_overflow());
        match narrowed {
            Element::Int(n) => assert_eq!(n.signed(), 44),
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_plus_refinement_is_exact() {
        let unknown = IntConst::zero(IntKind::I32);
        let r = IntConst::from_signed(IntKind::I32, 8);
        let b = IntConst::from_signed(IntKind::I32, 3);
        match unknown.refine_binary(BinaryOp::Plus, &r, &b, Argument::Direct) {
            Refinement::Replace(Element::Int(a)) => assert_eq!(a.signed(), 5),
            _ => panic!("expected exact refinement"),
        }
    }

    #[test]
    fn test_minus_roles() {
        let unknown = IntConst::zero(IntKind::I32);
        let r = IntConst::from_signed(IntKind::I32, 2);
        let other = IntConst::from_signed(IntKind::I32, 10);
        // a - 10 = 2 => a = 12
        match unknown.refine_binary(BinaryOp::Minus, &r, &other, Argument::Direct) {
            Refinement::Replace(Element::Int(a)) => assert_eq!(a.signed(), 12),
            _ => panic!(),
        }
        // 10 - b = 2 => b = 8
        match unknown.refine_binary(BinaryOp::Minus, &r, &other, Argument::Inverse) {
            Refinement::Replace(Element::Int(b)) => assert_eq!(b.signed(), 8),
            _ => panic!(),
        }
    }

    #[test]
    fn test_times_odd_inverse() {
        let unknown = IntConst::zero(IntKind::U32);
        let r = IntConst::new(IntKind::U32, 15);
        let b = IntConst::new(IntKind::U32, 3);
        match unknown.refine_binary(BinaryOp::Times, &r, &b, Argument::Direct) {
            Refinement::Replace(Element::Int(a)) => assert_eq!(a.unsigned(), 5),
            _ => panic!(),
        }
        // 0 * b = 1 is impossible
        let zero = IntConst::zero(IntKind::U32);
        assert!(matches!(
            unknown.refine_binary(BinaryOp::Times, &IntConst::one(IntKind::U32), &zero, Argument::Direct),
            Refinement::Empty
        ));
    }

    #[test]
    fn test_xor_inverse() {
        let unknown = IntConst::zero(IntKind::U16);
        let r = IntConst::new(IntKind::U16, 0b1010);
        let b = IntConst::new(IntKind::U16, 0b0110);
        match unknown.refine_binary(BinaryOp::BitXor, &r, &b, Argument::Direct) {
            Refinement::Replace(Element::Int(a)) => assert_eq!(a.unsigned(), 0b1100),
            _ => panic!(),
        }
    }

    #[test]
    fn test_and_contradiction_is_empty() {
        let unknown = IntConst::zero(IntKind::U8);
        // a & 0b0011 cannot equal 0b0100
        let r = IntConst::new(IntKind::U8, 0b0100);
        let b = IntConst::new(IntKind::U8, 0b0011);
        assert!(matches!(
            unknown.refine_binary(BinaryOp::BitAnd, &r, &b, Argument::Direct),
            Refinement::Empty
        ));
    }

    #[test]
    fn test_mod_inverse() {
        for a in [1u64, 3, 5, 251, 0xdead_beef | 1] {
            let inv = mod_inverse(a, u64::MAX);
            assert_eq!(a.wrapping_mul(inv), 1);
        }
    }
}
