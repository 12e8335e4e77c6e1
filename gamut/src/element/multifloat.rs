//! Arbitrary-precision floats decomposed into sign, exponent and mantissa.
//!
//! A [`MultiFloat`] stores the three fields of a binary floating-point value
//! of any [`FloatFormat`]. Arithmetic unpacks the fields into an integral
//! significand scaled by a power of two, computes exactly over `BigUint`
//! significands, and repacks with explicit rounding in the environment's
//! requested direction. Overflow, underflow and inexactness are recorded as
//! environment flags.

use crate::element::float_const::FloatClass;
use crate::element::int_const::IntConst;
use crate::element::multibit::MultiBit;
use crate::element::{Element, Refinement};
use crate::environment::{Argument, EvaluationEnvironment, RoundingMode};
use crate::lattice::Ternary;
use gamut_ops::{BinaryOp, CastOp, CompareOp, FloatFormat, UnaryOp};
use num_bigint::{BigInt, BigUint};
use num_traits::{One, ToPrimitive, Zero};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct MultiFloat {
    format: FloatFormat,
    /// True for negative values (including -0 and negative infinity).
    sign: bool,
    /// Biased exponent field.
    exponent: BigUint,
    /// Stored mantissa field, without the implicit leading bit.
    mantissa: BigUint,
}

/// An unpacked finite value: `(-1)^sign * sig * 2^exp`, `sig` integral.
struct Unpacked {
    sign: bool,
    exp: i64,
    sig: BigUint,
}

impl MultiFloat {
    pub fn zero(format: FloatFormat, sign: bool) -> Self {
        MultiFloat {
            format,
            sign,
            exponent: BigUint::zero(),
            mantissa: BigUint::zero(),
        }
    }

    pub fn infinity(format: FloatFormat, sign: bool) -> Self {
        MultiFloat {
            format,
            sign,
            exponent: BigUint::from(format.max_biased_exponent()),
            mantissa: BigUint::zero(),
        }
    }

    pub fn nan(format: FloatFormat) -> Self {
        MultiFloat {
            format,
            sign: false,
            exponent: BigUint::from(format.max_biased_exponent()),
            mantissa: BigUint::one(),
        }
    }

    pub fn from_fields(format: FloatFormat, sign: bool, exponent: BigUint, mantissa: BigUint) -> Self {
        debug_assert!(exponent.bits() <= format.exponent as u64);
        debug_assert!(mantissa.bits() <= format.mantissa as u64);
        MultiFloat {
            format,
            sign,
            exponent,
            mantissa,
        }
    }

    pub fn from_i64(format: FloatFormat, value: i64, env: &mut EvaluationEnvironment) -> Self {
        Self::from_bigint(format, &BigInt::from(value), env)
    }

    pub fn from_bigint(format: FloatFormat, value: &BigInt, env: &mut EvaluationEnvironment) -> Self {
        if value.is_zero() {
            return MultiFloat::zero(format, false);
        }
        let sign = value.sign() == num_bigint::Sign::Minus;
        let sig = value.magnitude().clone();
        pack(format, sign, 0, sig, false, env)
    }

    pub fn from_f64(format: FloatFormat, value: f64, env: &mut EvaluationEnvironment) -> Self {
        if value.is_nan() {
            env.set_nan();
            return MultiFloat::nan(format);
        }
        if value.is_infinite() {
            return MultiFloat::infinity(format, value < 0.0);
        }
        if value == 0.0 {
            return MultiFloat::zero(format, value.is_sign_negative());
        }
        let raw = value.abs().to_bits();
        let field = ((raw >> 52) & 0x7ff) as i64;
        let frac = raw & ((1u64 << 52) - 1);
        let (sig, exp) = if field == 0 {
            (BigUint::from(frac), -1022 - 52)
        } else {
            (BigUint::from(frac | (1u64 << 52)), field - 1023 - 52)
        };
        pack(format, value < 0.0, exp, sig, false, env)
    }

    pub fn format(&self) -> FloatFormat {
        self.format
    }

    pub fn sign(&self) -> bool {
        self.sign
    }

    pub fn exponent(&self) -> &BigUint {
        &self.exponent
    }

    pub fn mantissa(&self) -> &BigUint {
        &self.mantissa
    }

    pub fn classify(&self) -> FloatClass {
        let max = BigUint::from(self.format.max_biased_exponent());
        if self.exponent == max {
            if self.mantissa.is_zero() {
                FloatClass::Infinite
            } else {
                FloatClass::NaN
            }
        } else if self.exponent.is_zero() {
            if self.mantissa.is_zero() {
                FloatClass::Zero
            } else {
                FloatClass::Subnormal
            }
        } else {
            FloatClass::Normal
        }
    }

    pub fn is_nan(&self) -> bool {
        self.classify() == FloatClass::NaN
    }

    pub fn is_infinite(&self) -> bool {
        self.classify() == FloatClass::Infinite
    }

    pub fn is_zero(&self) -> bool {
        self.classify() == FloatClass::Zero
    }

    fn unpack(&self) -> Option<Unpacked> {
        match self.classify() {
            FloatClass::NaN | FloatClass::Infinite => None,
            FloatClass::Zero => Some(Unpacked {
                sign: self.sign,
                exp: 0,
                sig: BigUint::zero(),
            }),
            FloatClass::Subnormal => Some(Unpacked {
                sign: self.sign,
                exp: 1 - self.format.bias() - self.format.mantissa as i64,
                sig: self.mantissa.clone(),
            }),
            FloatClass::Normal => {
                let exp_field = self.exponent.to_i64().unwrap_or(0);
                Some(Unpacked {
                    sign: self.sign,
                    exp: exp_field - self.format.bias() - self.format.mantissa as i64,
                    sig: &self.mantissa | (BigUint::one() << self.format.mantissa as u32),
                })
            }
        }
    }

    /// The value as a signed exact integer scaled by `2^exp`, or `None` for
    /// NaN/infinity.
    fn signed_sig(&self) -> Option<(BigInt, i64)> {
        self.unpack().map(|u| {
            let mag = BigInt::from(u.sig);
            (if u.sign { -mag } else { mag }, u.exp)
        })
    }

    pub(crate) fn apply_unary(&mut self, op: UnaryOp, env: &mut EvaluationEnvironment) {
        match op {
            UnaryOp::Opposite => self.sign = !self.sign,
            UnaryOp::LogicalNot => {
                let truth = self.is_zero();
                *self = if truth {
                    let mut e = env.scratch();
                    MultiFloat::from_i64(self.format, 1, &mut e)
                } else {
                    MultiFloat::zero(self.format, false)
                };
            }
            UnaryOp::Increment => {
                let mut scratch = env.scratch();
                let one = MultiFloat::from_i64(self.format, 1, &mut scratch);
                self.apply_binary(BinaryOp::Plus, &one, env);
            }
            UnaryOp::Decrement => {
                let mut scratch = env.scratch();
                let one = MultiFloat::from_i64(self.format, 1, &mut scratch);
                self.apply_binary(BinaryOp::Minus, &one, env);
            }
            UnaryOp::BitNegate => {
                panic!("bit negation is not defined on multi-float elements")
            }
        }
    }

    pub(crate) fn apply_binary(
        &mut self,
        op: BinaryOp,
        rhs: &MultiFloat,
        env: &mut EvaluationEnvironment,
    ) {
        debug_assert_eq!(self.format, rhs.format, "mixed-format multi-float operation");
        match op {
            BinaryOp::Plus => *self = add(self, rhs, false, env),
            BinaryOp::Minus => {
                let mut negated = rhs.clone();
                negated.sign = !negated.sign;
                *self = add(self, &negated, false, env);
            }
            BinaryOp::Times => *self = mul(self, rhs, env),
            BinaryOp::Divide => *self = div(self, rhs, env),
            BinaryOp::Modulo => *self = rem(self, rhs, env),
            BinaryOp::LogicalAnd => {
                let truth = !self.is_zero() && !rhs.is_zero();
                *self = logical(self.format, truth, env);
            }
            BinaryOp::LogicalOr => {
                let truth = !self.is_zero() || !rhs.is_zero();
                *self = logical(self.format, truth, env);
            }
            _ => panic!("bit-level operation {op} is not defined on multi-float elements"),
        }
        if self.is_nan() {
            env.set_nan();
        }
    }

    /// Exact ordering of two finite values; `None` when either is NaN.
    fn order(&self, rhs: &MultiFloat) -> Option<Ordering> {
        if self.is_nan() || rhs.is_nan() {
            return None;
        }
        match (self.is_infinite(), rhs.is_infinite()) {
            (true, true) => {
                return Some(match (self.sign, rhs.sign) {
                    (true, false) => Ordering::Less,
                    (false, true) => Ordering::Greater,
                    _ => Ordering::Equal,
                });
            }
            (true, false) => {
                return Some(if self.sign { Ordering::Less } else { Ordering::Greater });
            }
            (false, true) => {
                return Some(if rhs.sign { Ordering::Greater } else { Ordering::Less });
            }
            (false, false) => {}
        }
        let (a, ea) = self.signed_sig().expect("finite");
        let (b, eb) = rhs.signed_sig().expect("finite");
        match (a.is_zero(), b.is_zero()) {
            (true, true) => return Some(Ordering::Equal),
            (true, false) => {
                return Some(if b.sign() == num_bigint::Sign::Minus {
                    Ordering::Greater
                } else {
                    Ordering::Less
                });
            }
            (false, true) => {
                return Some(if a.sign() == num_bigint::Sign::Minus {
                    Ordering::Less
                } else {
                    Ordering::Greater
                });
            }
            (false, false) => {}
        }
        if a.sign() != b.sign() {
            return Some(a.sign().cmp(&b.sign()));
        }
        // same sign: order magnitudes by their top-bit position first, so
        // wildly different exponents never force a full alignment
        let ka = ea + a.bits() as i64;
        let kb = eb + b.bits() as i64;
        if ka != kb {
            let mag = ka.cmp(&kb);
            return Some(if a.sign() == num_bigint::Sign::Minus {
                mag.reverse()
            } else {
                mag
            });
        }
        let common = ea.min(eb);
        let a_aligned = a << (ea - common) as u32;
        let b_aligned = b << (eb - common) as u32;
        Some(a_aligned.cmp(&b_aligned))
    }

    pub(crate) fn compare(&self, op: CompareOp, rhs: &MultiFloat) -> Ternary {
        match self.order(rhs) {
            None => Ternary::from(matches!(op, CompareOp::Different)),
            Some(ord) => {
                let holds = match op {
                    CompareOp::Equal => ord == Ordering::Equal,
                    CompareOp::Different => ord != Ordering::Equal,
                    CompareOp::Less => ord == Ordering::Less,
                    CompareOp::LessOrEqual => ord != Ordering::Greater,
                    CompareOp::Greater => ord == Ordering::Greater,
                    CompareOp::GreaterOrEqual => ord != Ordering::Less,
                };
                Ternary::from(holds)
            }
        }
    }

    /// Position of the magnitude's top bit, or `None` for NaN/infinity/zero.
    fn magnitude_bits(&self) -> Option<i64> {
        let u = self.unpack()?;
        if u.sig.is_zero() {
            return None;
        }
        Some(u.exp + u.sig.bits() as i64)
    }

    /// The value truncated toward zero, as an exact integer.
    pub(crate) fn truncated(&self) -> Option<BigInt> {
        let (sig, exp) = self.signed_sig()?;
        Some(if exp >= 0 {
            sig << exp as u32
        } else {
            // BigInt shr truncates toward negative infinity; do it on the
            // magnitude to truncate toward zero
            let negative = sig.sign() == num_bigint::Sign::Minus;
            let mag = sig.magnitude() >> (-exp).min(u32::MAX as i64) as u32;
            if negative {
                -BigInt::from(mag)
            } else {
                BigInt::from(mag)
            }
        })
    }

    fn to_f64_approx(&self) -> f64 {
        match self.classify() {
            FloatClass::NaN => f64::NAN,
            FloatClass::Infinite => {
                if self.sign {
                    f64::NEG_INFINITY
                } else {
                    f64::INFINITY
                }
            }
            _ => {
                let (sig, exp) = self.signed_sig().expect("finite");
                let base = sig.to_f64().unwrap_or(if self.sign {
                    f64::NEG_INFINITY
                } else {
                    f64::INFINITY
                });
                ldexp(base, exp)
            }
        }
    }

    pub(crate) fn cast(&self, target: &CastOp, env: &mut EvaluationEnvironment) -> Element {
        match target {
            CastOp::MultiFloat(format) => {
                if self.is_nan() {
                    env.set_nan();
                    return Element::MultiFloat(MultiFloat::nan(*format));
                }
                if self.is_infinite() {
                    return Element::MultiFloat(MultiFloat::infinity(*format, self.sign));
                }
                let u = self.unpack().expect("finite");
                Element::MultiFloat(pack(*format, u.sign, u.exp, u.sig, false, env))
            }
            CastOp::Float(k) => Element::float_const(*k, self.to_f64_approx(), env),
            CastOp::MultiBit { bits, signed } => {
                // a magnitude far past the target width saturates instead of
                // materializing an enormous integer
                if self.magnitude_bits().is_some_and(|m| m > *bits as i64 + 1) {
                    if self.sign {
                        env.set_negative_overflow();
                        return Element::MultiBit(MultiBit::min_of(*bits, *signed));
                    } else {
                        env.set_positive_overflow();
                        return Element::MultiBit(MultiBit::max_of(*bits, *signed));
                    }
                }
                match self.truncated() {
                    None => {
                        env.set_nan();
                        Element::MultiBit(MultiBit::zero(*bits, *signed))
                    }
                    Some(v) => {
                        if self
                            .order(&MultiFloat::from_bigint(self.format, &v, &mut env.scratch()))
                            != Some(Ordering::Equal)
                        {
                            env.set_inexact();
                        }
                        Element::MultiBit(MultiBit::from_bigint(*bits, *signed, &v))
                    }
                }
            }
            CastOp::Int(k) => {
                if self.magnitude_bits().is_some_and(|m| m > 66) {
                    return if self.sign {
                        env.set_negative_overflow();
                        Element::Int(IntConst::min_of(*k))
                    } else {
                        env.set_positive_overflow();
                        Element::Int(IntConst::max_of(*k))
                    };
                }
                match self.truncated() {
                    None => {
                        env.set_nan();
                        Element::Int(IntConst::zero(*k))
                    }
                    Some(v) => {
                        let min = BigInt::from(k.min_signed());
                        let max = if k.is_signed() {
                            BigInt::from(k.max_signed())
                        } else {
                            BigInt::from(k.max_value())
                        };
                        if v < min {
                            env.set_negative_overflow();
                            Element::Int(IntConst::min_of(*k))
                        } else if v > max {
                            env.set_positive_overflow();
                            Element::Int(IntConst::max_of(*k))
                        } else {
                            Element::Int(IntConst::from_signed(*k, v.to_i64().unwrap_or(0)))
                        }
                    }
                }
            }
            CastOp::Bool => Element::bool_element(!self.is_zero()),
        }
    }

    pub(crate) fn refine_binary(
        &self,
        op: BinaryOp,
        result: &MultiFloat,
        other: &MultiFloat,
        role: Argument,
    ) -> Refinement {
        if result.is_nan() || other.is_nan() {
            return Refinement::Keep;
        }
        let mut env = EvaluationEnvironment::new();
        let candidate = match op {
            BinaryOp::Plus => {
                let mut c = result.clone();
                c.apply_binary(BinaryOp::Minus, other, &mut env);
                c
            }
            BinaryOp::Minus => {
                if role.is_direct() {
                    let mut c = result.clone();
                    c.apply_binary(BinaryOp::Plus, other, &mut env);
                    c
                } else {
                    let mut c = other.clone();
                    c.apply_binary(BinaryOp::Minus, result, &mut env);
                    c
                }
            }
            BinaryOp::Times => {
                if other.is_zero() {
                    return if result.is_zero() {
                        Refinement::Keep
                    } else {
                        Refinement::Empty
                    };
                }
                let mut c = result.clone();
                c.apply_binary(BinaryOp::Divide, other, &mut env);
                c
            }
            _ => return Refinement::Keep,
        };
        if candidate.is_nan() || candidate.is_infinite() || env.has_evaluation_error() {
            return Refinement::Keep;
        }
        // the forward rounding step makes the inverse approximate; an exact
        // replacement is only kept when the residue round-trips
        if env.flags().inexact {
            Refinement::Keep
        } else {
            Refinement::Replace(Element::MultiFloat(candidate))
        }
    }
}

/// `x * 2^e`, scaled in steps so intermediates stay finite all the way into
/// the subnormal range.
fn ldexp(mut x: f64, mut e: i64) -> f64 {
    while e > 1000 && x.is_finite() && x != 0.0 {
        x *= 2f64.powi(1000);
        e -= 1000;
    }
    while e < -1000 && x.is_finite() && x != 0.0 {
        x *= 2f64.powi(-1000);
        e += 1000;
    }
    x * 2f64.powi(e.clamp(-1074, 1024) as i32)
}

fn logical(format: FloatFormat, truth: bool, env: &mut EvaluationEnvironment) -> MultiFloat {
    if truth {
        let mut scratch = env.scratch();
        MultiFloat::from_i64(format, 1, &mut scratch)
    } else {
        MultiFloat::zero(format, false)
    }
}

/// Round and assemble `(-1)^sign * sig * 2^exp` into `format`.
///
/// `sticky` carries discarded low bits from an earlier exact step (division
/// remainders). Rounding honors the environment's mode; overflow rounds to
/// infinity or the largest finite magnitude depending on the direction.
fn pack(
    format: FloatFormat,
    sign: bool,
    mut exp: i64,
    mut sig: BigUint,
    mut sticky: bool,
    env: &mut EvaluationEnvironment,
) -> MultiFloat {
    let m = format.mantissa as i64;
    if sig.is_zero() {
        if sticky {
            env.set_inexact();
        }
        return MultiFloat::zero(format, sign);
    }
    let mut round_bit = false;

    // normalize the significand to exactly m+1 bits, folding dropped bits
    // into round/sticky
    let width = sig.bits() as i64;
    if width > m + 1 {
        let drop = (width - m - 1) as u32;
        round_bit = sig.bit(drop as u64 - 1);
        if drop > 1 {
            let low_mask = (BigUint::one() << (drop - 1)) - BigUint::one();
            sticky |= !(&sig & low_mask).is_zero();
        }
        sig >>= drop;
        exp += drop as i64;
    } else if width < m + 1 {
        let grow = (m + 1 - width) as u32;
        sig <<= grow;
        exp -= grow as i64;
    }

    // subnormal range: shift further right until the biased exponent is 1
    let mut biased = exp + format.bias() + m;
    if biased <= 0 {
        let drop = (1 - biased) as u32;
        if drop as u64 >= sig.bits() + 2 {
            sticky |= round_bit || !sig.is_zero();
            round_bit = false;
            sig = BigUint::zero();
        } else {
            sticky |= round_bit;
            round_bit = sig.bit(drop as u64 - 1);
            if drop > 1 {
                let low_mask = (BigUint::one() << (drop - 1)) - BigUint::one();
                sticky |= !(&sig & low_mask).is_zero();
            }
            sig >>= drop;
        }
        biased = 1;
    }

    let inexact = round_bit || sticky;
    if inexact {
        env.set_inexact();
    }
    let increment = match env.rounding() {
        RoundingMode::Nearest => round_bit && (sticky || sig.bit(0)),
        RoundingMode::Lowest => inexact && sign,
        RoundingMode::Highest => inexact && !sign,
        RoundingMode::Zero => false,
    };
    if increment {
        sig += BigUint::one();
        if sig.bits() as i64 > m + 1 {
            sig >>= 1u32;
            biased += 1;
        }
    }

    // a significand that rounded up from the subnormal range becomes normal
    let implicit = BigUint::one() << m as u32;
    if biased == 1 && sig < implicit {
        // still subnormal: exponent field 0
        return MultiFloat {
            format,
            sign,
            exponent: BigUint::zero(),
            mantissa: sig,
        };
    }

    if biased as u64 >= format.max_biased_exponent() {
        if sign {
            env.set_negative_overflow();
        } else {
            env.set_positive_overflow();
        }
        env.set_inexact();
        // directed modes pointing away from the overflow stop at the largest
        // finite value
        let to_infinity = match env.rounding() {
            RoundingMode::Nearest => true,
            RoundingMode::Highest => !sign,
            RoundingMode::Lowest => sign,
            RoundingMode::Zero => false,
        };
        return if to_infinity {
            MultiFloat::infinity(format, sign)
        } else {
            MultiFloat {
                format,
                sign,
                exponent: BigUint::from(format.max_biased_exponent() - 1),
                mantissa: (BigUint::one() << format.mantissa as u32) - BigUint::one(),
            }
        };
    }

    MultiFloat {
        format,
        sign,
        exponent: BigUint::from(biased as u64),
        mantissa: sig - implicit,
    }
}

fn add(
    lhs: &MultiFloat,
    rhs: &MultiFloat,
    _negated: bool,
    env: &mut EvaluationEnvironment,
) -> MultiFloat {
    let format = lhs.format;
    if lhs.is_nan() || rhs.is_nan() {
        env.set_nan();
        return MultiFloat::nan(format);
    }
    match (lhs.is_infinite(), rhs.is_infinite()) {
        (true, true) => {
            return if lhs.sign == rhs.sign {
                lhs.clone()
            } else {
                env.set_nan();
                MultiFloat::nan(format)
            };
        }
        (true, false) => return lhs.clone(),
        (false, true) => return rhs.clone(),
        (false, false) => {}
    }
    let (a, ea) = lhs.signed_sig().expect("finite");
    let (b, eb) = rhs.signed_sig().expect("finite");
    if a.is_zero() && b.is_zero() {
        // IEEE: -0 + -0 = -0, otherwise +0 (to nearest)
        return MultiFloat::zero(format, lhs.sign && rhs.sign);
    }
    // align at the smaller exponent; cap the shift so a huge exponent gap
    // degrades into a sticky contribution instead of a giant integer
    let cap = format.mantissa as i64 + 3;
    let d = (ea - eb).abs();
    let (sum, exp, sticky) = if d <= cap {
        let common = ea.min(eb);
        let sum = (a << (ea - common) as u32) + (b << (eb - common) as u32);
        (sum, common, false)
    } else {
        // the small operand only perturbs the last bits
        let (big, e_big, small) = if ea > eb { (a, ea, b) } else { (b, eb, a) };
        let mut shifted = big << cap as u32;
        match small.sign() {
            num_bigint::Sign::Plus => shifted += BigInt::one(),
            num_bigint::Sign::Minus => shifted -= BigInt::one(),
            num_bigint::Sign::NoSign => {}
        }
        (shifted, e_big - cap, true)
    };
    if sum.is_zero() {
        if sticky {
            env.set_inexact();
        }
        return MultiFloat::zero(format, false);
    }
    let sign = sum.sign() == num_bigint::Sign::Minus;
    pack(format, sign, exp, sum.magnitude().clone(), sticky, env)
}

fn mul(lhs: &MultiFloat, rhs: &MultiFloat, env: &mut EvaluationEnvironment) -> MultiFloat {
    let format = lhs.format;
    if lhs.is_nan() || rhs.is_nan() {
        env.set_nan();
        return MultiFloat::nan(format);
    }
    let sign = lhs.sign != rhs.sign;
    if lhs.is_infinite() || rhs.is_infinite() {
        return if lhs.is_zero() || rhs.is_zero() {
            env.set_nan();
            MultiFloat::nan(format)
        } else {
            MultiFloat::infinity(format, sign)
        };
    }
    let a = lhs.unpack().expect("finite");
    let b = rhs.unpack().expect("finite");
    if a.sig.is_zero() || b.sig.is_zero() {
        return MultiFloat::zero(format, sign);
    }
    pack(format, sign, a.exp + b.exp, a.sig * b.sig, false, env)
}

fn div(lhs: &MultiFloat, rhs: &MultiFloat, env: &mut EvaluationEnvironment) -> MultiFloat {
    let format = lhs.format;
    if lhs.is_nan() || rhs.is_nan() {
        env.set_nan();
        return MultiFloat::nan(format);
    }
    let sign = lhs.sign != rhs.sign;
    match (lhs.is_infinite(), rhs.is_infinite()) {
        (true, true) => {
            env.set_nan();
            return MultiFloat::nan(format);
        }
        (true, false) => return MultiFloat::infinity(format, sign),
        (false, true) => return MultiFloat::zero(format, sign),
        (false, false) => {}
    }
    if rhs.is_zero() {
        env.set_division_by_zero();
        return if lhs.is_zero() {
            env.set_nan();
            MultiFloat::nan(format)
        } else {
            MultiFloat::infinity(format, sign)
        };
    }
    if lhs.is_zero() {
        return MultiFloat::zero(format, sign);
    }
    let a = lhs.unpack().expect("finite");
    let b = rhs.unpack().expect("finite");
    // widen the dividend so the quotient keeps guard bits
    let extra = format.mantissa as i64 + 3;
    let widened = a.sig << extra as u32;
    let quotient = &widened / &b.sig;
    let remainder = &widened % &b.sig;
    pack(
        format,
        sign,
        a.exp - b.exp - extra,
        quotient,
        !remainder.is_zero(),
        env,
    )
}

fn rem(lhs: &MultiFloat, rhs: &MultiFloat, env: &mut EvaluationEnvironment) -> MultiFloat {
    let format = lhs.format;
    if lhs.is_nan() || rhs.is_nan() || lhs.is_infinite() {
        env.set_nan();
        return MultiFloat::nan(format);
    }
    if rhs.is_zero() {
        env.set_division_by_zero();
        env.set_nan();
        return MultiFloat::nan(format);
    }
    if rhs.is_infinite() || lhs.is_zero() {
        return lhs.clone();
    }
    // truncated-quotient remainder, computed exactly
    let (a, ea) = lhs.signed_sig().expect("finite");
    let (b, eb) = rhs.signed_sig().expect("finite");
    let common = ea.min(eb);
    let a_aligned = a << (ea - common) as u32;
    let b_aligned = b << (eb - common) as u32;
    let q = &a_aligned / &b_aligned;
    let r = a_aligned - q * b_aligned;
    if r.is_zero() {
        return MultiFloat::zero(format, lhs.sign);
    }
    let sign = r.sign() == num_bigint::Sign::Minus;
    pack(format, sign, common, r.magnitude().clone(), false, env)
}

impl Display for MultiFloat {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.classify() {
            FloatClass::NaN => write!(f, "float{} NaN", self.format),
            FloatClass::Infinite => write!(
                f,
                "float{} {}inf",
                self.format,
                if self.sign { "-" } else { "+" }
            ),
            _ => write!(
                f,
                "float{} {}0x{:x}p{}",
                self.format,
                if self.sign { "-" } else { "" },
                self.mantissa,
                self.exponent
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gamut_ops::FloatKind;

    fn fmt64() -> FloatFormat {
        FloatKind::Double.format()
    }

    fn env() -> EvaluationEnvironment {
        EvaluationEnvironment::new()
    }

    /// Cross-check a multi-float computation in the binary64 format against
    /// host arithmetic.
    fn check_against_host(op: BinaryOp, x: f64, y: f64) {
        let mut e = env();
        let mut a = MultiFloat::from_f64(fmt64(), x, &mut e);
        let b = MultiFloat::from_f64(fmt64(), y, &mut e);
        a.apply_binary(op, &b, &mut e);
        let expected = match op {
            BinaryOp::Plus => x + y,
            BinaryOp::Minus => x - y,
            BinaryOp::Times => x * y,
            BinaryOp::Divide => x / y,
            _ => unreachable!(),
        };
        let mut e2 = env();
        let expected_mf = MultiFloat::from_f64(fmt64(), expected, &mut e2);
        assert_eq!(
            a, expected_mf,
            "{x} {op} {y}: got {a}, host says {expected_mf}"
        );
    }

    #[test]
    fn test_matches_host_binary64() {
        for (x, y) in [
            (1.5, 2.25),
            (0.1, 0.2),
            (1.0e300, 1.0e300),
            (-7.25, 3.0),
            (1.0, 3.0),
            (5.0e-324, 5.0e-324),
            (1.0e308, -1.0e308),
        ] {
            check_against_host(BinaryOp::Plus, x, y);
            check_against_host(BinaryOp::Minus, x, y);
            check_against_host(BinaryOp::Times, x, y);
            check_against_host(BinaryOp::Divide, x, y);
        }
    }

    #[test]
    fn test_round_trip_f64() {
        for v in [0.0, -0.0, 1.0, -1.5, 0.1, f64::MAX, f64::MIN_POSITIVE, 5e-324] {
            let mut e = env();
            let mf = MultiFloat::from_f64(fmt64(), v, &mut e);
            assert!(!e.flags().inexact, "{v} should convert exactly");
            assert_eq!(mf.to_f64_approx().to_bits(), v.to_bits());
        }
    }

    #[test]
    fn test_inf_nan_propagation() {
        let mut e = env();
        let inf = MultiFloat::infinity(fmt64(), false);
        let mut a = inf.clone();
        a.apply_binary(BinaryOp::Minus, &inf, &mut e);
        assert!(a.is_nan());
        assert!(e.flags().nan_produced);
    }

    #[test]
    fn test_division_keeps_sticky() {
        let mut e = env();
        let mut a = MultiFloat::from_i64(fmt64(), 1, &mut e);
        let b = MultiFloat::from_i64(fmt64(), 3, &mut e);
        a.apply_binary(BinaryOp::Divide, &b, &mut e);
        assert!(e.flags().inexact);
        let mut e2 = env();
        assert_eq!(a, MultiFloat::from_f64(fmt64(), 1.0 / 3.0, &mut e2));
    }

    #[test]
    fn test_tiny_format_overflow() {
        // a toy 8-bit-ish format: 3 mantissa bits, 4 exponent bits
        let tiny = FloatFormat::new(3, 4).unwrap();
        let mut e = env();
        let big = MultiFloat::from_i64(tiny, 1000, &mut e);
        assert!(big.is_infinite());
        assert!(e.is_positive_overflow());
    }

    #[test]
    fn test_directed_rounding_toward_zero() {
        let tiny = FloatFormat::new(3, 4).unwrap();
        let mut e = EvaluationEnvironment::new().with_rounding(RoundingMode::Zero);
        // 17 needs 5 significant bits; with 4 it truncates down to 16
        let v = MultiFloat::from_i64(tiny, 17, &mut e);
        assert!(e.flags().inexact);
        assert_eq!(v.truncated(), Some(BigInt::from(16)));
    }

    #[test]
    fn test_compare_exact() {
        let mut e = env();
        let a = MultiFloat::from_f64(fmt64(), 1.5, &mut e);
        let b = MultiFloat::from_f64(fmt64(), 2.5, &mut e);
        assert!(a.compare(CompareOp::Less, &b).is_true());
        assert!(a.compare(CompareOp::Equal, &a).is_true());
        let nan = MultiFloat::nan(fmt64());
        assert!(a.compare(CompareOp::Less, &nan).is_false());
        assert!(a.compare(CompareOp::Different, &nan).is_true());
    }

    #[test]
    fn test_truncation_to_multibit() {
        let mut e = env();
        let v = MultiFloat::from_f64(fmt64(), -7.75, &mut e);
        match v.cast(&CastOp::MultiBit { bits: 72, signed: true }, &mut e) {
            Element::MultiBit(m) => assert_eq!(m.signed_value(), BigInt::from(-7)),
            _ => unreachable!(),
        }
        assert!(e.flags().inexact);
    }
}
