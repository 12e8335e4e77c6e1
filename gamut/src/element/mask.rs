//! Known-bit masks: refinement elements recording which bits of a value are
//! certainly one and which are certainly zero.
//!
//! A mask is always a transient refinement of some reference element, never a
//! standalone computed value: it supports stamping itself onto a target and
//! lattice meets with other masks, and panics on `apply`/`merge_with`/general
//! `constrain`.

use crate::element::int_const::IntConst;
use crate::element::interval::IntInterval;
use crate::element::multibit::MultiBit;
use crate::element::Element;
use crate::environment::EvaluationEnvironment;
use crate::error::GamutError;
use crate::lattice::MeetOutcome;
use gamut_ops::IntKind;
use num_bigint::BigUint;
use num_traits::{One, Zero};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Known bits of a native-width value.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct BitMask {
    bits: u32,
    one_mask: u64,
    zero_mask: u64,
}

impl BitMask {
    /// A mask claiming the same bit certainly-one and certainly-zero
    /// describes no value at all and is rejected.
    pub fn new(bits: u32, one_mask: u64, zero_mask: u64) -> Result<Self, GamutError> {
        if bits == 0 || bits > 64 {
            return Err(gamut_ops::OperationError::InvalidBitWidth(bits).into());
        }
        let width = if bits >= 64 { u64::MAX } else { (1u64 << bits) - 1 };
        let one_mask = one_mask & width;
        let zero_mask = zero_mask & width;
        if one_mask & zero_mask != 0 {
            return Err(GamutError::ContradictoryMask);
        }
        Ok(BitMask {
            bits,
            one_mask,
            zero_mask,
        })
    }

    /// The exact mask of a constant: every bit is known.
    pub fn from_constant(c: &IntConst) -> Self {
        let width = c.kind().mask();
        BitMask {
            bits: c.kind().bits(),
            one_mask: c.unsigned(),
            zero_mask: !c.unsigned() & width,
        }
    }

    pub fn bits(&self) -> u32 {
        self.bits
    }

    pub fn one_mask(&self) -> u64 {
        self.one_mask
    }

    pub fn zero_mask(&self) -> u64 {
        self.zero_mask
    }

    pub fn is_valid(&self) -> bool {
        self.one_mask & self.zero_mask == 0
    }

    fn width_mask(&self) -> u64 {
        if self.bits >= 64 {
            u64::MAX
        } else {
            (1u64 << self.bits) - 1
        }
    }

    /// Bits with a known value in either direction.
    pub fn known_bits(&self) -> u64 {
        self.one_mask | self.zero_mask
    }

    fn is_free(&self, position: u32) -> bool {
        self.known_bits() & (1u64 << position) == 0
    }

    /// Whether a concrete bit pattern is admitted by the mask.
    pub fn admits(&self, value: u64) -> bool {
        value & self.one_mask == self.one_mask && value & self.zero_mask == 0
    }

    /// Force the known bits onto a bit pattern.
    pub fn stamp(&self, value: u64) -> u64 {
        ((value | self.one_mask) & !self.zero_mask) & self.width_mask()
    }

    /// The constant this mask pins down, if every bit is known.
    pub fn as_constant(&self, kind: IntKind) -> Option<IntConst> {
        if self.known_bits() == self.width_mask() {
            Some(IntConst::new(kind, self.one_mask))
        } else {
            None
        }
    }

    /// Meet: combine the knowledge of two masks; contradicting claims prove
    /// the intersection empty.
    pub(crate) fn meet_mask(&mut self, other: &BitMask) -> MeetOutcome {
        if self.one_mask & other.zero_mask != 0 || self.zero_mask & other.one_mask != 0 {
            return MeetOutcome::Empty;
        }
        self.one_mask |= other.one_mask;
        self.zero_mask |= other.zero_mask;
        MeetOutcome::Nonempty
    }

    /// The smallest admitted value `>= lower`, if any.
    pub(crate) fn least_admitted_geq(&self, lower: u64) -> Option<u64> {
        let lower = lower & self.width_mask();
        let stamped = self.stamp(lower);
        if stamped >= lower {
            return Some(stamped);
        }
        // the stamp cleared a forced bit below a set bit of `lower`; raise
        // the lowest free zero bit above the highest difference and minimize
        // everything underneath it
        let diff_high = 63 - (lower ^ stamped).leading_zeros();
        for position in (diff_high + 1)..self.bits {
            if self.is_free(position) && stamped & (1u64 << position) == 0 {
                let keep_high = if position >= 63 {
                    0
                } else {
                    !((1u64 << (position + 1)) - 1)
                };
                let prefix = stamped & keep_high;
                return Some(self.stamp(prefix | (1u64 << position)));
            }
        }
        None
    }

    /// The largest admitted value `<= upper`, if any.
    pub(crate) fn greatest_admitted_leq(&self, upper: u64) -> Option<u64> {
        let upper = upper & self.width_mask();
        let stamped = self.stamp(upper);
        if stamped <= upper {
            return Some(stamped);
        }
        let diff_high = 63 - (upper ^ stamped).leading_zeros();
        for position in (diff_high + 1)..self.bits {
            if self.is_free(position) && stamped & (1u64 << position) != 0 {
                let keep_high = if position >= 63 {
                    0
                } else {
                    !((1u64 << (position + 1)) - 1)
                };
                let prefix = stamped & keep_high;
                let lowered = prefix | ((1u64 << position) - 1);
                return Some(self.stamp(lowered));
            }
        }
        None
    }

    /// Narrow `target` to the values it shares with this mask. Unsupported
    /// target shapes are left unchanged (no refinement, still sound).
    pub(crate) fn intersect_with_into(
        &self,
        target: &mut Element,
        env: &mut EvaluationEnvironment,
    ) {
        match target {
            Element::Int(c) => {
                if !self.admits(c.unsigned()) {
                    env.set_empty();
                }
            }
            Element::Bool(b) => {
                if !self.admits(b.value() as u64) {
                    env.set_empty();
                }
            }
            Element::IntInterval(interval) => {
                let Some((kind, lo, hi)) = native_bounds(interval) else {
                    return;
                };
                if kind.is_signed() {
                    // bit patterns do not order signed ranges; only reject a
                    // degenerate contradiction
                    if lo == hi && !self.admits(lo) {
                        env.set_empty();
                    }
                    return;
                }
                match (self.least_admitted_geq(lo), self.greatest_admitted_leq(hi)) {
                    (Some(new_lo), Some(new_hi)) if new_lo <= new_hi && new_lo <= hi && new_hi >= lo => {
                        if let crate::element::Refinement::Replace(e) =
                            IntInterval::try_range(kind, new_lo, new_hi)
                        {
                            *target = e;
                        }
                    }
                    _ => env.set_empty(),
                }
            }
            Element::Mask(mask) => {
                if mask.meet_mask(self).is_empty() {
                    env.set_empty();
                }
            }
            _ => {}
        }
    }

    /// Lattice order: every value this mask admits, `other` must admit too
    /// for `other <= self`.
    pub(crate) fn contains_element(&self, other: &Element) -> bool {
        match other {
            Element::Int(c) => self.admits(c.unsigned()),
            Element::Mask(m) => {
                self.one_mask & m.one_mask == self.one_mask
                    && self.zero_mask & m.zero_mask == self.zero_mask
            }
            _ => false,
        }
    }
}

impl Display for BitMask {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Mask {}{{one: {:#x}, zero: {:#x}}}",
            self.bits, self.one_mask, self.zero_mask
        )
    }
}

/// Known-bit mask over arbitrary widths.
#[derive(Debug, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct MultiBitMask {
    bits: u32,
    one_mask: BigUint,
    zero_mask: BigUint,
}

impl MultiBitMask {
    pub fn new(bits: u32, one_mask: BigUint, zero_mask: BigUint) -> Result<Self, GamutError> {
        let width = (BigUint::one() << bits) - BigUint::one();
        let one_mask = one_mask & &width;
        let zero_mask = zero_mask & &width;
        if !(&one_mask & &zero_mask).is_zero() {
            return Err(GamutError::ContradictoryMask);
        }
        Ok(MultiBitMask {
            bits,
            one_mask,
            zero_mask,
        })
    }

    pub fn from_constant(c: &MultiBit) -> Self {
        let width = (BigUint::one() << c.bits()) - BigUint::one();
        MultiBitMask {
            bits: c.bits(),
            one_mask: c.unsigned().clone(),
            zero_mask: c.unsigned() ^ width,
        }
    }

    pub fn bits(&self) -> u32 {
        self.bits
    }

    pub fn one_mask(&self) -> &BigUint {
        &self.one_mask
    }

    pub fn zero_mask(&self) -> &BigUint {
        &self.zero_mask
    }

    pub fn is_valid(&self) -> bool {
        (&self.one_mask & &self.zero_mask).is_zero()
    }

    pub fn admits(&self, value: &BigUint) -> bool {
        (value & &self.one_mask) == self.one_mask && (value & &self.zero_mask).is_zero()
    }

    pub fn stamp(&self, value: &BigUint) -> BigUint {
        let width = (BigUint::one() << self.bits) - BigUint::one();
        ((value | &self.one_mask) ^ ((value | &self.one_mask) & &self.zero_mask)) & width
    }

    pub fn as_constant(&self) -> Option<MultiBit> {
        let width = (BigUint::one() << self.bits) - BigUint::one();
        if (&self.one_mask | &self.zero_mask) == width {
            Some(MultiBit::new(self.bits, false, self.one_mask.clone()))
        } else {
            None
        }
    }

    pub(crate) fn meet_mask(&mut self, other: &MultiBitMask) -> MeetOutcome {
        if !(&self.one_mask & &other.zero_mask).is_zero()
            || !(&self.zero_mask & &other.one_mask).is_zero()
        {
            return MeetOutcome::Empty;
        }
        self.one_mask = &self.one_mask | &other.one_mask;
        self.zero_mask = &self.zero_mask | &other.zero_mask;
        MeetOutcome::Nonempty
    }

    pub(crate) fn intersect_with_into(
        &self,
        target: &mut Element,
        env: &mut EvaluationEnvironment,
    ) {
        match target {
            Element::MultiBit(c) => {
                if !self.admits(c.unsigned()) {
                    env.set_empty();
                }
            }
            Element::MultiMask(mask) => {
                if mask.meet_mask(self).is_empty() {
                    env.set_empty();
                }
            }
            _ => {}
        }
    }

    pub(crate) fn contains_element(&self, other: &Element) -> bool {
        match other {
            Element::MultiBit(c) => self.admits(c.unsigned()),
            Element::MultiMask(m) => {
                (&self.one_mask & &m.one_mask) == self.one_mask
                    && (&self.zero_mask & &m.zero_mask) == self.zero_mask
            }
            _ => false,
        }
    }
}

impl Display for MultiBitMask {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Mask {}{{one: {:#x}, zero: {:#x}}}",
            self.bits, self.one_mask, self.zero_mask
        )
    }
}

/// Native unsigned views of an interval's bounds.
fn native_bounds(interval: &IntInterval) -> Option<(IntKind, u64, u64)> {
    match (interval.min(), interval.max()) {
        (Element::Int(lo), Element::Int(hi)) => Some((lo.kind(), lo.unsigned(), hi.unsigned())),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validity() {
        assert!(BitMask::new(8, 0b10, 0b01).is_ok());
        assert!(BitMask::new(8, 0b11, 0b01).is_err());
        assert!(BitMask::new(8, 0b1, 0b1).is_err());
    }

    #[test]
    fn test_admits_and_stamp() {
        let mask = BitMask::new(8, 0b10, 0b01).unwrap();
        assert!(mask.admits(0b10));
        assert!(mask.admits(0b110));
        assert!(!mask.admits(0b01));
        assert!(!mask.admits(0b00));
        assert_eq!(mask.stamp(0b111), 0b110);
    }

    #[test]
    fn test_meet_conflict_is_empty() {
        let mut a = BitMask::new(8, 0b10, 0).unwrap();
        let b = BitMask::new(8, 0, 0b10).unwrap();
        assert!(a.meet_mask(&b).is_empty());

        let mut c = BitMask::new(8, 0b10, 0).unwrap();
        let d = BitMask::new(8, 0b100, 0b001).unwrap();
        assert!(!c.meet_mask(&d).is_empty());
        assert_eq!(c.one_mask(), 0b110);
        assert_eq!(c.zero_mask(), 0b001);
    }

    #[test]
    fn test_full_knowledge_is_constant() {
        let c = IntConst::new(IntKind::U8, 0xa5);
        let mask = BitMask::from_constant(&c);
        assert_eq!(mask.as_constant(IntKind::U8), Some(c));
        assert_eq!(mask.known_bits(), 0xff);
    }

    #[test]
    fn test_least_admitted() {
        // low bit forced to 0: even numbers only
        let even = BitMask::new(8, 0, 0b1).unwrap();
        assert_eq!(even.least_admitted_geq(5), Some(6));
        assert_eq!(even.least_admitted_geq(6), Some(6));
        assert_eq!(even.greatest_admitted_leq(5), Some(4));
        assert_eq!(even.greatest_admitted_leq(255), Some(254));

        // top bit forced to 1
        let high = BitMask::new(8, 0x80, 0).unwrap();
        assert_eq!(high.least_admitted_geq(0), Some(0x80));
        assert_eq!(high.greatest_admitted_leq(0x7f), None);
    }

    #[test]
    fn test_multibit_mask() {
        use num_traits::FromPrimitive;
        let one = BigUint::from_u64(0b10).unwrap();
        let zero = BigUint::from_u64(0b01).unwrap();
        let mask = MultiBitMask::new(100, one, zero).unwrap();
        assert!(mask.admits(&BigUint::from_u64(0b10).unwrap()));
        assert!(!mask.admits(&BigUint::from_u64(0b01).unwrap()));
        assert!(MultiBitMask::new(100, BigUint::from_u64(3).unwrap(), BigUint::from_u64(1).unwrap()).is_err());
    }
}
