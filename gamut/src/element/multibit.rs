//! Arbitrary-width integers stored as word arrays.
//!
//! A [`MultiBit`] generalizes the native constants past 64 bits. The value is
//! a `BigUint` kept reduced modulo `2^bits`; the signed view is the usual
//! two's complement reading of the top bit. Structural operations (concat,
//! extract, extension) change the width; everything else preserves it.

use crate::element::int_const::IntConst;
use crate::element::multifloat::MultiFloat;
use crate::element::{Element, Refinement};
use crate::environment::{Argument, EvaluationEnvironment};
use crate::lattice::Ternary;
use gamut_ops::{BinaryOp, CastOp, CompareOp, UnaryOp};
#[cfg(test)]
use gamut_ops::IntKind;
use num_bigint::{BigInt, BigUint};
use num_traits::{One, ToPrimitive, Zero};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct MultiBit {
    bits: u32,
    signed: bool,
    value: BigUint,
}

impl MultiBit {
    pub fn new(bits: u32, signed: bool, value: BigUint) -> Self {
        debug_assert!(bits > 0);
        let mut out = MultiBit {
            bits,
            signed,
            value,
        };
        out.reduce();
        out
    }

    pub fn zero(bits: u32, signed: bool) -> Self {
        MultiBit {
            bits,
            signed,
            value: BigUint::zero(),
        }
    }

    pub fn from_u64(bits: u32, signed: bool, value: u64) -> Self {
        MultiBit::new(bits, signed, BigUint::from(value))
    }

    pub fn from_bigint(bits: u32, signed: bool, value: &BigInt) -> Self {
        let modulus = BigInt::from(BigUint::one() << bits);
        let reduced = ((value % &modulus) + &modulus) % &modulus;
        MultiBit::new(bits, signed, reduced.to_biguint().unwrap_or_default())
    }

    /// Build from an integral, finite double.
    pub fn from_f64(bits: u32, signed: bool, value: f64) -> Self {
        debug_assert!(value.is_finite() && value == value.trunc());
        let negative = value < 0.0;
        let magnitude = value.abs();
        let raw = magnitude.to_bits();
        let exponent = ((raw >> 52) & 0x7ff) as i64 - 1023 - 52;
        let significand = if magnitude == 0.0 {
            BigUint::zero()
        } else if (raw >> 52) & 0x7ff == 0 {
            BigUint::from(raw & ((1u64 << 52) - 1))
        } else {
            BigUint::from((raw & ((1u64 << 52) - 1)) | (1u64 << 52))
        };
        let unsigned = if exponent >= 0 {
            significand << exponent as u32
        } else {
            significand >> (-exponent) as u32
        };
        let big = if negative {
            -BigInt::from(unsigned)
        } else {
            BigInt::from(unsigned)
        };
        MultiBit::from_bigint(bits, signed, &big)
    }

    pub fn bits(&self) -> u32 {
        self.bits
    }

    pub fn is_signed(&self) -> bool {
        self.signed
    }

    pub fn unsigned(&self) -> &BigUint {
        &self.value
    }

    pub fn modulus(&self) -> BigUint {
        BigUint::one() << self.bits
    }

    fn mask(&self) -> BigUint {
        self.modulus() - BigUint::one()
    }

    fn reduce(&mut self) {
        if self.value.bits() > self.bits as u64 {
            self.value = &self.value & self.mask();
        }
    }

    fn top_bit_set(&self) -> bool {
        self.value.bit(self.bits as u64 - 1)
    }

    pub fn is_negative(&self) -> bool {
        self.signed && self.top_bit_set()
    }

    /// The value under the two's complement signed view.
    pub fn signed_value(&self) -> BigInt {
        if self.is_negative() {
            BigInt::from(self.value.clone()) - BigInt::from(self.modulus())
        } else {
            BigInt::from(self.value.clone())
        }
    }

    pub fn min_of(bits: u32, signed: bool) -> Self {
        if signed {
            MultiBit::new(bits, signed, BigUint::one() << (bits - 1))
        } else {
            MultiBit::zero(bits, signed)
        }
    }

    pub fn max_of(bits: u32, signed: bool) -> Self {
        let mask = (BigUint::one() << bits) - BigUint::one();
        if signed {
            MultiBit::new(bits, signed, mask >> 1)
        } else {
            MultiBit::new(bits, signed, mask)
        }
    }

    fn flag_signed_range(&self, exact: &BigInt, env: &mut EvaluationEnvironment) {
        let max = MultiBit::max_of(self.bits, true).signed_value();
        let min = MultiBit::min_of(self.bits, true).signed_value();
        if exact > &max {
            env.set_positive_overflow();
        } else if exact < &min {
            env.set_negative_overflow();
        }
    }

    pub(crate) fn apply_unary(&mut self, op: UnaryOp, env: &mut EvaluationEnvironment) {
        match op {
            UnaryOp::Opposite => {
                if self.signed {
                    if !self.value.is_zero() && self.value == (BigUint::one() << (self.bits - 1)) {
                        env.set_positive_overflow();
                    }
                } else if !self.value.is_zero() {
                    env.set_negative_overflow();
                }
                if !self.value.is_zero() {
                    self.value = self.modulus() - &self.value;
                }
            }
            UnaryOp::BitNegate => self.value = self.mask() ^ &self.value,
            UnaryOp::LogicalNot => {
                let truth = self.value.is_zero();
                self.value = if truth { BigUint::one() } else { BigUint::zero() };
            }
            UnaryOp::Increment => {
                let one = MultiBit::new(self.bits, self.signed, BigUint::one());
                self.apply_binary(BinaryOp::Plus, &one, env);
            }
            UnaryOp::Decrement => {
                let one = MultiBit::new(self.bits, self.signed, BigUint::one());
                self.apply_binary(BinaryOp::Minus, &one, env);
            }
        }
    }

    pub(crate) fn apply_binary(
        &mut self,
        op: BinaryOp,
        rhs: &MultiBit,
        env: &mut EvaluationEnvironment,
    ) {
        debug_assert_eq!(self.bits, rhs.bits, "mixed-width multi-bit operation");
        match op {
            BinaryOp::Plus => {
                if self.signed {
                    let exact = self.signed_value() + rhs.signed_value();
                    self.flag_signed_range(&exact, env);
                    *self = MultiBit::from_bigint(self.bits, self.signed, &exact);
                } else {
                    let sum = &self.value + &rhs.value;
                    if sum.bits() > self.bits as u64 {
                        env.set_positive_overflow();
                    }
                    self.value = sum;
                    self.reduce();
                }
            }
            BinaryOp::Minus => {
                if self.signed {
                    let exact = self.signed_value() - rhs.signed_value();
                    self.flag_signed_range(&exact, env);
                    *self = MultiBit::from_bigint(self.bits, self.signed, &exact);
                } else {
                    if rhs.value > self.value {
                        env.set_negative_overflow();
                    }
                    let exact = BigInt::from(self.value.clone()) - BigInt::from(rhs.value.clone());
                    *self = MultiBit::from_bigint(self.bits, self.signed, &exact);
                }
            }
            BinaryOp::Times => {
                if self.signed {
                    let exact = self.signed_value() * rhs.signed_value();
                    self.flag_signed_range(&exact, env);
                    *self = MultiBit::from_bigint(self.bits, self.signed, &exact);
                } else {
                    let product = &self.value * &rhs.value;
                    if product.bits() > self.bits as u64 {
                        env.set_positive_overflow();
                    }
                    self.value = product;
                    self.reduce();
                }
            }
            BinaryOp::Divide => {
                if rhs.value.is_zero() {
                    env.set_division_by_zero();
                } else if self.signed {
                    // truncating division
                    let a = self.signed_value();
                    let b = rhs.signed_value();
                    let q = &a / &b;
                    self.flag_signed_range(&q, env);
                    *self = MultiBit::from_bigint(self.bits, self.signed, &q);
                } else {
                    self.value = &self.value / &rhs.value;
                }
            }
            BinaryOp::Modulo => {
                if rhs.value.is_zero() {
                    env.set_division_by_zero();
                } else if self.signed {
                    let a = self.signed_value();
                    let b = rhs.signed_value();
                    let r = &a % &b;
                    *self = MultiBit::from_bigint(self.bits, self.signed, &r);
                } else {
                    self.value = &self.value % &rhs.value;
                }
            }
            BinaryOp::ShiftLeft => {
                let amount = rhs.value.to_u64().unwrap_or(u64::MAX);
                if amount >= self.bits as u64 {
                    if !self.value.is_zero() {
                        env.set_positive_overflow();
                    }
                    self.value = BigUint::zero();
                } else {
                    let shifted = &self.value << amount as u32;
                    if shifted.bits() > self.bits as u64 {
                        env.set_positive_overflow();
                    }
                    self.value = shifted;
                    self.reduce();
                }
            }
            BinaryOp::ShiftRight => {
                let amount = rhs.value.to_u64().unwrap_or(u64::MAX);
                if amount >= self.bits as u64 {
                    self.value = if self.is_negative() {
                        self.mask()
                    } else {
                        BigUint::zero()
                    };
                } else if self.is_negative() {
                    // arithmetic shift: fill vacated high bits with ones
                    let fill = (self.mask() >> amount as u32) ^ self.mask();
                    self.value = (&self.value >> amount as u32) | fill;
                } else {
                    self.value = &self.value >> amount as u32;
                }
            }
            BinaryOp::RotateLeft => {
                let k = (rhs.value.clone() % BigUint::from(self.bits))
                    .to_u32()
                    .unwrap_or(0);
                if k != 0 {
                    let rotated = (&self.value << k) | (&self.value >> (self.bits - k));
                    self.value = rotated;
                    self.reduce();
                }
            }
            BinaryOp::RotateRight => {
                let k = (rhs.value.clone() % BigUint::from(self.bits))
                    .to_u32()
                    .unwrap_or(0);
                if k != 0 {
                    let rotated = (&self.value >> k) | (&self.value << (self.bits - k));
                    self.value = rotated;
                    self.reduce();
                }
            }
            BinaryOp::BitAnd => self.value = &self.value & &rhs.value,
            BinaryOp::BitOr => self.value = &self.value | &rhs.value,
            BinaryOp::BitXor => self.value = &self.value ^ &rhs.value,
            BinaryOp::LogicalAnd => {
                let truth = !self.value.is_zero() && !rhs.value.is_zero();
                self.value = if truth { BigUint::one() } else { BigUint::zero() };
            }
            BinaryOp::LogicalOr => {
                let truth = !self.value.is_zero() || !rhs.value.is_zero();
                self.value = if truth { BigUint::one() } else { BigUint::zero() };
            }
        }
    }

    pub(crate) fn compare(&self, op: CompareOp, rhs: &MultiBit) -> Ternary {
        debug_assert_eq!(self.bits, rhs.bits, "mixed-width multi-bit comparison");
        let holds = if self.signed {
            op.holds(&self.signed_value(), &rhs.signed_value())
        } else {
            op.holds(&self.value, &rhs.value)
        };
        Ternary::from(holds)
    }

    /// `self` becomes the high part, `low` the low part.
    pub(crate) fn concat(&self, low: &MultiBit) -> MultiBit {
        MultiBit::new(
            self.bits + low.bits,
            self.signed,
            (&self.value << low.bits) | &low.value,
        )
    }

    pub(crate) fn extract(&self, low: u32, width: u32) -> MultiBit {
        debug_assert!(low + width <= self.bits, "extract out of range");
        let mask = (BigUint::one() << width) - BigUint::one();
        MultiBit::new(width, false, (&self.value >> low) & mask)
    }

    pub(crate) fn zero_extend(&self, extra: u32) -> MultiBit {
        MultiBit::new(self.bits + extra, self.signed, self.value.clone())
    }

    pub(crate) fn sign_extend(&self, extra: u32) -> MultiBit {
        let wide = self.bits + extra;
        if self.top_bit_set() {
            let fill = ((BigUint::one() << extra) - BigUint::one()) << self.bits;
            MultiBit::new(wide, self.signed, &self.value | fill)
        } else {
            MultiBit::new(wide, self.signed, self.value.clone())
        }
    }

    pub(crate) fn cast(&self, target: &CastOp, env: &mut EvaluationEnvironment) -> Element {
        match target {
            CastOp::MultiBit { bits, signed } => {
                if *bits >= self.bits {
                    let grown = if self.signed {
                        self.sign_extend(bits - self.bits)
                    } else {
                        self.zero_extend(bits - self.bits)
                    };
                    Element::MultiBit(MultiBit::new(*bits, *signed, grown.value))
                } else {
                    let narrowed = self.extract(0, *bits);
                    let out = MultiBit::new(*bits, *signed, narrowed.value);
                    let lossless = if self.signed {
                        out.signed_value() == self.signed_value()
                    } else {
                        out.unsigned() == self.unsigned()
                    };
                    if !lossless {
                        if self.is_negative() {
                            env.set_negative_overflow();
                        } else {
                            env.set_positive_overflow();
                        }
                    }
                    Element::MultiBit(out)
                }
            }
            CastOp::Int(k) => {
                let low = self.extract(0, k.bits().min(self.bits));
                let raw = low.value.to_u64().unwrap_or(0);
                let out = IntConst::new(*k, raw);
                let lossless = if self.signed {
                    BigInt::from(out.signed()) == self.signed_value()
                } else {
                    BigUint::from(out.unsigned()) == self.value
                };
                if !lossless {
                    if self.is_negative() {
                        env.set_negative_overflow();
                    } else {
                        env.set_positive_overflow();
                    }
                }
                Element::Int(out)
            }
            CastOp::Float(k) => {
                let approx = self.signed_value().to_f64().unwrap_or(f64::INFINITY);
                Element::float_const(*k, approx, env)
            }
            CastOp::MultiFloat(format) => {
                Element::MultiFloat(MultiFloat::from_bigint(*format, &self.signed_value(), env))
            }
            CastOp::Bool => Element::bool_element(!self.value.is_zero()),
        }
    }

    pub(crate) fn refine_binary(
        &self,
        op: BinaryOp,
        result: &MultiBit,
        other: &MultiBit,
        role: Argument,
    ) -> Refinement {
        let wrap = |v: BigInt| {
            Refinement::Replace(Element::MultiBit(MultiBit::from_bigint(
                self.bits, self.signed, &v,
            )))
        };
        match op {
            BinaryOp::Plus => wrap(BigInt::from(result.value.clone()) - BigInt::from(other.value.clone())),
            BinaryOp::Minus => {
                if role.is_direct() {
                    wrap(BigInt::from(result.value.clone()) + BigInt::from(other.value.clone()))
                } else {
                    wrap(BigInt::from(other.value.clone()) - BigInt::from(result.value.clone()))
                }
            }
            BinaryOp::BitXor => wrap(BigInt::from(&result.value ^ &other.value)),
            BinaryOp::Times => {
                if other.value.is_zero() {
                    if result.value.is_zero() {
                        Refinement::Keep
                    } else {
                        Refinement::Empty
                    }
                } else if other.value.bit(0) {
                    // odd factors are invertible modulo 2^bits
                    let inv = mod_inverse_big(&other.value, self.bits);
                    wrap(BigInt::from(&result.value * inv))
                } else {
                    Refinement::Keep
                }
            }
            _ => Refinement::Keep,
        }
    }

    pub(crate) fn refine_compare(&self, op: CompareOp, other: &MultiBit) -> Refinement {
        let bits = self.bits;
        let signed = self.signed;
        let min = MultiBit::min_of(bits, signed);
        let max = MultiBit::max_of(bits, signed);
        let pred = |m: &MultiBit| {
            let dec = m.signed_value() - BigInt::one();
            MultiBit::from_bigint(bits, signed, &dec)
        };
        let succ = |m: &MultiBit| {
            let inc = m.signed_value() + BigInt::one();
            MultiBit::from_bigint(bits, signed, &inc)
        };
        match op {
            CompareOp::Equal => Refinement::Replace(Element::MultiBit(other.clone())),
            CompareOp::Different => Refinement::Keep,
            CompareOp::Less => {
                if other.value == min.value {
                    return Refinement::Empty;
                }
                crate::element::interval::IntInterval::try_from_bounds(
                    Element::MultiBit(min),
                    Element::MultiBit(pred(other)),
                )
            }
            CompareOp::LessOrEqual => crate::element::interval::IntInterval::try_from_bounds(
                Element::MultiBit(min),
                Element::MultiBit(other.clone()),
            ),
            CompareOp::Greater => {
                if other.value == max.value {
                    return Refinement::Empty;
                }
                crate::element::interval::IntInterval::try_from_bounds(
                    Element::MultiBit(succ(other)),
                    Element::MultiBit(max),
                )
            }
            CompareOp::GreaterOrEqual => crate::element::interval::IntInterval::try_from_bounds(
                Element::MultiBit(other.clone()),
                Element::MultiBit(max),
            ),
        }
    }
}

/// Multiplicative inverse of an odd value modulo `2^bits`, by Newton
/// iteration; each round doubles the number of correct low bits.
fn mod_inverse_big(a: &BigUint, bits: u32) -> BigUint {
    debug_assert!(a.bit(0));
    let mask = (BigUint::one() << bits) - BigUint::one();
    let modulus = BigInt::from(BigUint::one() << bits);
    let mut x = BigUint::one();
    let mut correct = 1u32;
    while correct < bits {
        let ax = BigInt::from((a * &x) & &mask);
        // x = x * (2 - a*x) mod 2^bits
        let factor = ((BigInt::from(2u8) - ax) % &modulus + &modulus) % &modulus;
        x = (&x * factor.to_biguint().unwrap_or_default()) & &mask;
        correct = correct.saturating_mul(2);
    }
    x
}

impl Display for MultiBit {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.is_negative() {
            write!(f, "{}bit{} {}", 's', self.bits, self.signed_value())
        } else {
            write!(
                f,
                "{}bit{} {:#x}",
                if self.signed { 's' } else { 'u' },
                self.bits,
                self.value
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env() -> EvaluationEnvironment {
        EvaluationEnvironment::new()
    }

    fn ub(bits: u32, v: u64) -> MultiBit {
        MultiBit::from_u64(bits, false, v)
    }

    #[test]
    fn test_wide_addition_wraps_and_flags() {
        let mut a = MultiBit::new(128, false, (BigUint::one() << 128u32) - BigUint::one());
        let mut e = env();
        a.apply_binary(BinaryOp::Plus, &ub(128, 1), &mut e);
        assert!(a.unsigned().is_zero());
        assert!(e.is_positive_overflow());
    }

    #[test]
    fn test_signed_view() {
        let minus_one = MultiBit::new(96, true, (BigUint::one() << 96u32) - BigUint::one());
        assert_eq!(minus_one.signed_value(), BigInt::from(-1));
        assert!(minus_one.is_negative());
    }

    #[test]
    fn test_signed_division_truncates() {
        let mut a = MultiBit::from_bigint(72, true, &BigInt::from(-7));
        let b = MultiBit::from_bigint(72, true, &BigInt::from(2));
        let mut e = env();
        a.apply_binary(BinaryOp::Divide, &b, &mut e);
        assert_eq!(a.signed_value(), BigInt::from(-3));
    }

    #[test]
    fn test_arithmetic_shift_fills_sign() {
        let mut a = MultiBit::from_bigint(80, true, &BigInt::from(-16));
        let mut e = env();
        a.apply_binary(BinaryOp::ShiftRight, &ub(80, 2), &mut e);
        assert_eq!(a.signed_value(), BigInt::from(-4));
    }

    #[test]
    fn test_concat_extract_identity() {
        let hi = ub(40, 0xaa_bbcc_ddee);
        let lo = ub(24, 0x112233);
        let joined = hi.concat(&lo);
        assert_eq!(joined.bits(), 64);
        assert_eq!(joined.extract(0, 24).unsigned(), lo.unsigned());
        assert_eq!(joined.extract(24, 40).unsigned(), hi.unsigned());
    }

    #[test]
    fn test_sign_extension() {
        let neg = MultiBit::from_bigint(16, true, &BigInt::from(-5));
        let wide = neg.sign_extend(48);
        assert_eq!(wide.bits(), 64);
        assert_eq!(wide.signed_value(), BigInt::from(-5));
        let pos = ub(16, 5);
        assert_eq!(pos.zero_extend(48).unsigned(), &BigUint::from(5u8));
    }

    #[test]
    fn test_rotate() {
        let mut a = ub(12, 0b1000_0000_0001);
        let mut e = env();
        a.apply_binary(BinaryOp::RotateLeft, &ub(12, 1), &mut e);
        assert_eq!(a.unsigned(), &BigUint::from(0b0000_0000_0011u16));
    }

    #[test]
    fn test_cast_to_native() {
        let wide = MultiBit::from_bigint(128, true, &BigInt::from(-123));
        let mut e = env();
        match wide.cast(&CastOp::Int(IntKind::I32), &mut e) {
            Element::Int(v) => assert_eq!(v.signed(), -123),
            _ => unreachable!(),
        }
        assert!(!e.has_evaluation_error());
    }

    #[test]
    fn test_mod_inverse_big() {
        let a = BigUint::from(0xdead_beefu32 | 1);
        let inv = mod_inverse_big(&a, 100);
        let mask = (BigUint::one() << 100u32) - BigUint::one();
        assert_eq!((a * inv) & mask, BigUint::one());
    }

    #[test]
    fn test_refine_plus() {
        let unknown = MultiBit::zero(128, false);
        let r = ub(128, 20);
        let b = ub(128, 8);
        match unknown.refine_binary(BinaryOp::Plus, &r, &b, Argument::Direct) {
            Refinement::Replace(Element::MultiBit(a)) => {
                assert_eq!(a.unsigned(), &BigUint::from(12u8))
            }
            _ => panic!(),
        }
    }
}
