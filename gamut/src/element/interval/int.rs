//! Integer intervals over native or multi-bit constant bounds.

use crate::element::int_const::IntConst;
use crate::element::interval::{BoundKind, ScalarOrder, const_max, const_min, const_order};
use crate::element::top::Top;
use crate::element::{Element, Refinement};
use crate::environment::EvaluationEnvironment;
use crate::error::GamutError;
use crate::lattice::{FlatLattice, Ternary};
use gamut_ops::{BinaryOp, CastOp, CompareOp, IntKind, ScalarKind, UnaryOp};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt::{Display, Formatter};

/// A value known to lie between two constant sub-elements of the same
/// integer kind. `min <= max` is maintained by every producer in this module
/// but is not a structural invariant; [`IntInterval::is_valid`] checks only
/// the bound kinds.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct IntInterval {
    min: Box<Element>,
    max: Box<Element>,
}

fn is_int_constant(e: &Element) -> bool {
    matches!(e, Element::Int(_) | Element::MultiBit(_))
}

fn same_bound_kind(a: &Element, b: &Element) -> bool {
    match (a, b) {
        (Element::Int(x), Element::Int(y)) => x.kind() == y.kind(),
        (Element::MultiBit(x), Element::MultiBit(y)) => {
            x.bits() == y.bits() && x.is_signed() == y.is_signed()
        }
        _ => false,
    }
}

/// Bound views of an interval-compatible argument: a constant is the
/// degenerate pair, an interval contributes its own bounds.
fn arg_bounds(arg: &Element) -> Option<(&Element, &Element)> {
    match arg {
        Element::Int(_) | Element::MultiBit(_) => Some((arg, arg)),
        Element::IntInterval(i) => Some((i.min(), i.max())),
        _ => None,
    }
}

impl IntInterval {
    pub fn new(min: Element, max: Element) -> Result<Self, GamutError> {
        Self::with_bounds(min, max, BoundKind::Closed)
    }

    /// Construct with explicit bound openness; open bounds are normalized to
    /// the closed representation by stepping one value inward.
    pub fn with_bounds(
        mut min: Element,
        mut max: Element,
        bounds: BoundKind,
    ) -> Result<Self, GamutError> {
        if !is_int_constant(&min) || !same_bound_kind(&min, &max) {
            return Err(GamutError::MismatchedBounds);
        }
        let mut scratch = EvaluationEnvironment::new();
        if bounds.lower_open() {
            min.apply(&UnaryOp::Increment.into(), &mut scratch);
        }
        if bounds.upper_open() {
            max.apply(&UnaryOp::Decrement.into(), &mut scratch);
        }
        if scratch.is_overflow() {
            return Err(GamutError::MismatchedBounds);
        }
        Ok(IntInterval {
            min: Box::new(min),
            max: Box::new(max),
        })
    }

    pub(crate) fn degenerate(constant: Element) -> Self {
        debug_assert!(is_int_constant(&constant));
        IntInterval {
            min: Box::new(constant.clone()),
            max: Box::new(constant),
        }
    }

    pub fn full_range(kind: IntKind) -> Self {
        IntInterval {
            min: Box::new(Element::Int(IntConst::min_of(kind))),
            max: Box::new(Element::Int(IntConst::max_of(kind))),
        }
    }

    pub fn full_range_wide(bits: u32, signed: bool) -> Self {
        use crate::element::multibit::MultiBit;
        IntInterval {
            min: Box::new(Element::MultiBit(MultiBit::min_of(bits, signed))),
            max: Box::new(Element::MultiBit(MultiBit::max_of(bits, signed))),
        }
    }

    /// A refinement holding `[lo, hi]` of `kind`, collapsing degenerate
    /// ranges to their constant and crossed ranges to empty.
    pub(crate) fn try_range(kind: IntKind, lo_raw: u64, hi_raw: u64) -> Refinement {
        Self::try_from_bounds(
            Element::Int(IntConst::new(kind, lo_raw)),
            Element::Int(IntConst::new(kind, hi_raw)),
        )
    }

    pub(crate) fn try_from_bounds(min: Element, max: Element) -> Refinement {
        match const_order(&min, &max) {
            Some(Ordering::Greater) => Refinement::Empty,
            Some(Ordering::Equal) => Refinement::Replace(min),
            Some(Ordering::Less) => Refinement::Replace(Element::IntInterval(IntInterval {
                min: Box::new(min),
                max: Box::new(max),
            })),
            None => Refinement::Keep,
        }
    }

    pub fn min(&self) -> &Element {
        &self.min
    }

    pub fn max(&self) -> &Element {
        &self.max
    }

    pub fn is_valid(&self) -> bool {
        is_int_constant(&self.min) && same_bound_kind(&self.min, &self.max)
    }

    pub fn kind(&self) -> ScalarKind {
        self.min.kind()
    }

    pub fn bit_size(&self) -> u32 {
        self.min.bit_size()
    }

    pub(crate) fn as_degenerate(&self) -> Option<&Element> {
        if self.min == self.max { Some(&self.min) } else { None }
    }

    /// The extreme representable constants of the bound kind.
    fn kind_bounds(&self) -> (Element, Element) {
        match self.min.as_ref() {
            Element::Int(c) => (
                Element::Int(IntConst::min_of(c.kind())),
                Element::Int(IntConst::max_of(c.kind())),
            ),
            Element::MultiBit(m) => {
                use crate::element::multibit::MultiBit;
                (
                    Element::MultiBit(MultiBit::min_of(m.bits(), m.is_signed())),
                    Element::MultiBit(MultiBit::max_of(m.bits(), m.is_signed())),
                )
            }
            _ => unreachable!("interval bounds are integer constants"),
        }
    }

    fn full_like(&self) -> IntInterval {
        let (lo, hi) = self.kind_bounds();
        IntInterval {
            min: Box::new(lo),
            max: Box::new(hi),
        }
    }

    fn zero_like(&self) -> Element {
        match self.min.as_ref() {
            Element::Int(c) => Element::Int(IntConst::zero(c.kind())),
            Element::MultiBit(m) => {
                use crate::element::multibit::MultiBit;
                Element::MultiBit(MultiBit::zero(m.bits(), m.is_signed()))
            }
            _ => unreachable!("interval bounds are integer constants"),
        }
    }

    fn const_like(&self, value: u64) -> Element {
        match self.min.as_ref() {
            Element::Int(c) => Element::Int(IntConst::new(c.kind(), value)),
            Element::MultiBit(m) => {
                use crate::element::multibit::MultiBit;
                Element::MultiBit(MultiBit::from_u64(m.bits(), m.is_signed(), value))
            }
            _ => unreachable!("interval bounds are integer constants"),
        }
    }

    pub(crate) fn contains_zero(&self) -> bool {
        let zero = self.zero_like();
        const_order(&self.min, &zero) != Some(Ordering::Greater)
            && const_order(&self.max, &zero) != Some(Ordering::Less)
    }

    /// Truth value of the interval read as a condition.
    pub(crate) fn truthiness(&self) -> Ternary {
        if !self.contains_zero() {
            Ternary::TRUE
        } else if self.as_degenerate().is_some() {
            Ternary::FALSE
        } else {
            FlatLattice::Top
        }
    }

    /// Apply `op` to one cloned bound against one argument bound.
    fn bound_result(
        bound: &Element,
        op: BinaryOp,
        arg: &Element,
        outer: &mut EvaluationEnvironment,
    ) -> (Element, bool) {
        let mut result = bound.clone();
        let mut scratch = outer.scratch_with_argument(arg.clone());
        result.apply(&op.into(), &mut scratch);
        let trouble = scratch.is_overflow() || scratch.is_division_by_zero();
        outer.absorb_flags(&scratch);
        (result, trouble)
    }

    fn become_full(&mut self) {
        *self = self.full_like();
    }

    pub(crate) fn apply_unary(
        &mut self,
        op: UnaryOp,
        env: &mut EvaluationEnvironment,
    ) -> Option<Element> {
        match op {
            UnaryOp::Opposite | UnaryOp::Increment | UnaryOp::Decrement => {
                let mut new_min = self.max.as_ref().clone();
                let mut new_max = self.min.as_ref().clone();
                if !matches!(op, UnaryOp::Opposite) {
                    std::mem::swap(&mut new_min, &mut new_max);
                }
                let mut scratch = env.scratch();
                new_min.apply(&op.into(), &mut scratch);
                new_max.apply(&op.into(), &mut scratch);
                env.absorb_flags(&scratch);
                if scratch.is_overflow() {
                    self.become_full();
                } else {
                    self.min = Box::new(new_min);
                    self.max = Box::new(new_max);
                }
                None
            }
            UnaryOp::BitNegate => {
                // ~x = -x - 1 is monotone decreasing, so the bounds swap
                let mut new_min = self.max.as_ref().clone();
                let mut new_max = self.min.as_ref().clone();
                let mut scratch = env.scratch();
                new_min.apply(&UnaryOp::BitNegate.into(), &mut scratch);
                new_max.apply(&UnaryOp::BitNegate.into(), &mut scratch);
                self.min = Box::new(new_min);
                self.max = Box::new(new_max);
                None
            }
            UnaryOp::LogicalNot => Some(match self.truthiness().not3() {
                Ternary::TRUE => self.const_like(1),
                Ternary::FALSE => self.zero_like(),
                _ => Element::IntInterval(IntInterval {
                    min: Box::new(self.zero_like()),
                    max: Box::new(self.const_like(1)),
                }),
            }),
        }
    }

    pub(crate) fn apply_binary(
        &mut self,
        op: BinaryOp,
        arg: &Element,
        env: &mut EvaluationEnvironment,
    ) -> Option<Element> {
        let Some((amin, amax)) = arg_bounds(arg) else {
            self.become_full();
            return None;
        };
        match op {
            BinaryOp::Plus => {
                let (new_min, t1) = Self::bound_result(&self.min, op, amin, env);
                let (new_max, t2) = Self::bound_result(&self.max, op, amax, env);
                if t1 || t2 {
                    self.become_full();
                } else {
                    self.min = Box::new(new_min);
                    self.max = Box::new(new_max);
                }
            }
            BinaryOp::Minus => {
                let (new_min, t1) = Self::bound_result(&self.min, op, amax, env);
                let (new_max, t2) = Self::bound_result(&self.max, op, amin, env);
                if t1 || t2 {
                    self.become_full();
                } else {
                    self.min = Box::new(new_min);
                    self.max = Box::new(new_max);
                }
            }
            BinaryOp::Times | BinaryOp::Divide | BinaryOp::ShiftLeft | BinaryOp::ShiftRight => {
                if op == BinaryOp::Divide {
                    let crosses_zero = match arg {
                        Element::IntInterval(i) => i.contains_zero(),
                        _ => matches!(const_order(amin, &self.zero_like()), Some(Ordering::Equal)),
                    };
                    if crosses_zero {
                        env.set_division_by_zero();
                        self.become_full();
                        return None;
                    }
                }
                // non-monotone in general: evaluate every bound combination
                // and take the envelope
                let mut candidates = Vec::with_capacity(4);
                let mut trouble = false;
                for (b, a) in [self.min.as_ref(), self.max.as_ref()]
                    .into_iter()
                    .cartesian_product([amin, amax])
                {
                    let (candidate, t) = Self::bound_result(b, op, a, env);
                    trouble |= t;
                    candidates.push(candidate);
                }
                if trouble {
                    self.become_full();
                } else {
                    let mut iter = candidates.into_iter();
                    let first = iter.next().expect("four candidates");
                    let (lo, hi) = iter.fold((first.clone(), first), |(lo, hi), c| {
                        (const_min(lo, c.clone()), const_max(hi, c))
                    });
                    self.min = Box::new(lo);
                    self.max = Box::new(hi);
                }
            }
            BinaryOp::Modulo => self.apply_modulo(arg, amin, amax, env),
            BinaryOp::RotateLeft | BinaryOp::RotateRight => {
                if let (Some(c), true) = (self.as_degenerate(), amin == amax) {
                    let (result, trouble) = Self::bound_result(c, op, amin, env);
                    if !trouble {
                        return Some(result);
                    }
                }
                self.become_full();
            }
            BinaryOp::BitAnd | BinaryOp::BitOr | BinaryOp::BitXor => {
                if let (Some(c), true) = (self.as_degenerate(), amin == amax) {
                    let (result, trouble) = Self::bound_result(c, op, amin, env);
                    if !trouble {
                        return Some(result);
                    }
                    self.become_full();
                } else {
                    self.apply_bitwise(op, arg);
                }
            }
            BinaryOp::LogicalAnd | BinaryOp::LogicalOr => {
                let arg_truth = arg.truthiness();
                let combined = if op == BinaryOp::LogicalAnd {
                    self.truthiness().and3(arg_truth)
                } else {
                    self.truthiness().or3(arg_truth)
                };
                return Some(match combined {
                    Ternary::TRUE => self.const_like(1),
                    Ternary::FALSE => self.zero_like(),
                    _ => Element::IntInterval(IntInterval {
                        min: Box::new(self.zero_like()),
                        max: Box::new(self.const_like(1)),
                    }),
                });
            }
        }
        None
    }

    /// Sound modulo transfer: a window-sized dividend range maps exactly,
    /// anything else falls back to the remainder's natural range.
    fn apply_modulo(
        &mut self,
        arg: &Element,
        amin: &Element,
        amax: &Element,
        env: &mut EvaluationEnvironment,
    ) {
        let crosses_zero = match arg {
            Element::IntInterval(i) => i.contains_zero(),
            _ => matches!(const_order(amin, &self.zero_like()), Some(Ordering::Equal)),
        };
        if crosses_zero {
            env.set_division_by_zero();
            self.become_full();
            return;
        }
        // exact window: both remainders are reachable monotonically when the
        // dividend range is narrower than the divisor and does not wrap a
        // multiple of it
        if let (Some(_), true) = (self.as_degenerate(), amin == amax) {
            let (result, trouble) = Self::bound_result(&self.min, BinaryOp::Modulo, amin, env);
            if !trouble {
                *self = IntInterval::degenerate(result);
                return;
            }
        }
        if amin == amax {
            let (r_lo, t1) = Self::bound_result(&self.min, BinaryOp::Modulo, amin, env);
            let (r_hi, t2) = Self::bound_result(&self.max, BinaryOp::Modulo, amin, env);
            let (width, t3) = Self::bound_result(&self.max, BinaryOp::Minus, &self.min, env);
            let fits = !t1
                && !t2
                && !t3
                && const_order(&width, amin) == Some(Ordering::Less)
                && const_order(&r_lo, &r_hi) != Some(Ordering::Greater);
            if fits {
                self.min = Box::new(r_lo);
                self.max = Box::new(r_hi);
                return;
            }
        }
        // natural remainder range for a divisor of magnitude m: unsigned
        // [0, m-1]; signed keeps the dividend's sign
        let mut magnitude = amax.clone();
        let mut scratch = env.scratch();
        if const_order(&magnitude, &self.zero_like()) == Some(Ordering::Less) {
            magnitude = amin.clone();
            magnitude.apply(&UnaryOp::Opposite.into(), &mut scratch);
        }
        magnitude.apply(&UnaryOp::Decrement.into(), &mut scratch);
        if scratch.is_overflow() {
            self.become_full();
            return;
        }
        let zero = self.zero_like();
        let negative_possible =
            const_order(&self.min, &zero) == Some(Ordering::Less);
        let positive_possible = const_order(&self.max, &zero) == Some(Ordering::Greater);
        let mut low = zero.clone();
        if negative_possible {
            low = magnitude.clone();
            low.apply(&UnaryOp::Opposite.into(), &mut scratch);
        }
        let high = if positive_possible { magnitude } else { zero };
        self.min = Box::new(low);
        self.max = Box::new(high);
    }

    /// Unsigned bitwise refinements on native bounds; everything else loses
    /// all precision.
    fn apply_bitwise(&mut self, op: BinaryOp, arg: &Element) {
        let unsigned_native = matches!(
            (self.min.as_ref(), arg),
            (Element::Int(b), Element::Int(a))
                if !b.kind().is_signed() && !a.kind().is_signed() && b.kind() == a.kind()
        );
        if !unsigned_native {
            self.become_full();
            return;
        }
        let (Element::Int(hi), Element::Int(arg_c)) = (self.max.as_ref(), arg) else {
            self.become_full();
            return;
        };
        let kind = arg_c.kind();
        match op {
            BinaryOp::BitAnd => {
                // x & c can clear bits but never set them
                let upper = hi.unsigned().min(arg_c.unsigned());
                self.min = Box::new(Element::Int(IntConst::zero(kind)));
                self.max = Box::new(Element::Int(IntConst::new(kind, upper)));
            }
            BinaryOp::BitOr => {
                let Element::Int(lo) = self.min.as_ref() else {
                    self.become_full();
                    return;
                };
                // x | c sets at least c and at most x + c worth of value
                let lower = lo.unsigned().max(arg_c.unsigned());
                let upper = (hi.unsigned() as u128 + arg_c.unsigned() as u128)
                    .min(kind.mask() as u128) as u64;
                self.min = Box::new(Element::Int(IntConst::new(kind, lower)));
                self.max = Box::new(Element::Int(IntConst::new(kind, upper)));
            }
            BinaryOp::BitXor => {
                // x ^ c <= x + c
                let upper = (hi.unsigned() as u128 + arg_c.unsigned() as u128)
                    .min(kind.mask() as u128) as u64;
                self.min = Box::new(Element::Int(IntConst::zero(kind)));
                self.max = Box::new(Element::Int(IntConst::new(kind, upper)));
            }
            _ => unreachable!("bitwise refinement on non-bitwise operation"),
        }
    }

    /// Three-valued comparison against a constant or another interval.
    pub(crate) fn compare(&self, op: CompareOp, arg: &Element) -> Ternary {
        let Some((amin, amax)) = arg_bounds(arg) else {
            return FlatLattice::Top;
        };
        let max_vs_amin = const_order(&self.max, amin);
        let min_vs_amax = const_order(&self.min, amax);
        match op {
            CompareOp::Less => match (max_vs_amin, min_vs_amax) {
                (Some(Ordering::Less), _) => Ternary::TRUE,
                (_, Some(Ordering::Greater) | Some(Ordering::Equal)) => Ternary::FALSE,
                _ => FlatLattice::Top,
            },
            CompareOp::LessOrEqual => match (max_vs_amin, min_vs_amax) {
                (Some(Ordering::Less) | Some(Ordering::Equal), _) => Ternary::TRUE,
                (_, Some(Ordering::Greater)) => Ternary::FALSE,
                _ => FlatLattice::Top,
            },
            CompareOp::Greater => match (min_vs_amax, max_vs_amin) {
                (Some(Ordering::Greater), _) => Ternary::TRUE,
                (_, Some(Ordering::Less) | Some(Ordering::Equal)) => Ternary::FALSE,
                _ => FlatLattice::Top,
            },
            CompareOp::GreaterOrEqual => match (min_vs_amax, max_vs_amin) {
                (Some(Ordering::Greater) | Some(Ordering::Equal), _) => Ternary::TRUE,
                (_, Some(Ordering::Less)) => Ternary::FALSE,
                _ => FlatLattice::Top,
            },
            CompareOp::Equal => {
                if let (Some(c), true) = (self.as_degenerate(), amin == amax) {
                    if const_order(c, amin) == Some(Ordering::Equal) {
                        return Ternary::TRUE;
                    }
                }
                if max_vs_amin == Some(Ordering::Less) || min_vs_amax == Some(Ordering::Greater) {
                    Ternary::FALSE
                } else {
                    FlatLattice::Top
                }
            }
            CompareOp::Different => self.compare(CompareOp::Equal, arg).not3(),
        }
    }

    /// The special scalar comparison: classify the relative order of two
    /// operands by computing their difference in both directions and keeping
    /// the verdict of whichever direction does not overflow.
    pub(crate) fn compare_scalars(&self, arg: &Element) -> ScalarOrder {
        let Some((amin, amax)) = arg_bounds(arg) else {
            return ScalarOrder::Unknown;
        };
        if let (Some(c), true) = (self.as_degenerate(), amin == amax) {
            if const_order(c, amin) == Some(Ordering::Equal) {
                return ScalarOrder::AlwaysEqual;
            }
        }
        let zero = self.zero_like();
        // direct difference: arg.min - self.max
        let mut direct = amin.clone();
        let mut direct_env = EvaluationEnvironment::binary(self.max.as_ref().clone());
        direct.apply(&BinaryOp::Minus.into(), &mut direct_env);
        if !direct_env.is_overflow()
            && const_order(&direct, &zero) == Some(Ordering::Greater)
        {
            return ScalarOrder::AlwaysLess;
        }
        // inverse difference: self.min - arg.max
        let mut inverse = self.min.as_ref().clone();
        let mut inverse_env = EvaluationEnvironment::binary(amax.clone());
        inverse.apply(&BinaryOp::Minus.into(), &mut inverse_env);
        if !inverse_env.is_overflow()
            && const_order(&inverse, &zero) == Some(Ordering::Greater)
        {
            return ScalarOrder::AlwaysGreater;
        }
        ScalarOrder::Unknown
    }

    pub(crate) fn cast(&self, target: &CastOp, env: &mut EvaluationEnvironment) -> Element {
        match target {
            CastOp::Int(_) | CastOp::MultiBit { .. } => {
                let mut scratch = env.scratch();
                let lo = self.min.cast_element(target, &mut scratch);
                let hi = self.max.cast_element(target, &mut scratch);
                let exact = !scratch.is_overflow()
                    && const_order(&lo, &hi) != Some(Ordering::Greater);
                env.absorb_flags(&scratch);
                if exact {
                    Element::IntInterval(IntInterval {
                        min: Box::new(lo),
                        max: Box::new(hi),
                    })
                } else {
                    match target {
                        CastOp::Int(k) => Element::IntInterval(IntInterval::full_range(*k)),
                        CastOp::MultiBit { bits, signed } => {
                            Element::IntInterval(IntInterval::full_range_wide(*bits, *signed))
                        }
                        _ => unreachable!(),
                    }
                }
            }
            CastOp::Float(k) => {
                let mut lo_env = env.scratch().with_rounding(crate::environment::RoundingMode::Lowest);
                let mut hi_env = env.scratch().with_rounding(crate::environment::RoundingMode::Highest);
                let lo = self.min.cast_element(target, &mut lo_env);
                let hi = self.max.cast_element(target, &mut hi_env);
                match (lo, hi) {
                    (Element::Float(a), Element::Float(b)) => {
                        Element::FloatInterval(super::FloatInterval::from_consts(a, b))
                    }
                    _ => Element::Top(Top::new(ScalarKind::Float(*k))),
                }
            }
            CastOp::MultiFloat(format) => Element::Top(Top::new(ScalarKind::MultiFloat(*format))),
            CastOp::Bool => match self.truthiness() {
                Ternary::TRUE => Element::bool_element(true),
                Ternary::FALSE => Element::bool_element(false),
                _ => Element::Top(Top::new(ScalarKind::Boolean)),
            },
        }
    }

    /// Meet with a constant or interval. On a crossed (empty) result the
    /// environment is flagged and `self` is left untouched. Returns `false`
    /// for operands this domain cannot interpret.
    pub(crate) fn intersect(&mut self, other: &Element, env: &mut EvaluationEnvironment) -> bool {
        let Some((omin, omax)) = arg_bounds(other) else {
            return false;
        };
        let new_min = const_max(self.min.as_ref().clone(), omin.clone());
        let new_max = const_min(self.max.as_ref().clone(), omax.clone());
        if const_order(&new_min, &new_max) == Some(Ordering::Greater) {
            env.set_empty();
            return true;
        }
        self.min = Box::new(new_min);
        self.max = Box::new(new_max);
        true
    }

    /// Join with a constant or interval: widen to the envelope of both.
    pub(crate) fn merge(&mut self, other: &Element) -> bool {
        let Some((omin, omax)) = arg_bounds(other) else {
            return false;
        };
        if !same_bound_kind(&self.min, omin) {
            return false;
        }
        self.min = Box::new(const_min(self.min.as_ref().clone(), omin.clone()));
        self.max = Box::new(const_max(self.max.as_ref().clone(), omax.clone()));
        true
    }

    /// Lattice order test: does this interval cover `other` entirely?
    pub(crate) fn contains_element(&self, other: &Element) -> bool {
        let Some((omin, omax)) = arg_bounds(other) else {
            return false;
        };
        const_order(&self.min, omin) != Some(Ordering::Greater)
            && const_order(&self.max, omax) != Some(Ordering::Less)
    }

    /// Candidate refinement of an operand known to satisfy `self_op other`.
    /// The caller intersects the candidate with the current abstraction.
    pub(crate) fn refine_compare(op: CompareOp, other: &Element, like: &IntInterval) -> Refinement {
        let Some((omin, omax)) = arg_bounds(other) else {
            return Refinement::Keep;
        };
        let (kmin, kmax) = like.kind_bounds();
        let step = |bound: &Element, op: UnaryOp| -> Option<Element> {
            let mut stepped = bound.clone();
            let mut scratch = EvaluationEnvironment::new();
            stepped.apply(&op.into(), &mut scratch);
            if scratch.is_overflow() { None } else { Some(stepped) }
        };
        match op {
            CompareOp::Equal => Refinement::Replace(other.clone()),
            CompareOp::Different => Refinement::Keep,
            CompareOp::Less => match step(omax, UnaryOp::Decrement) {
                None => Refinement::Empty,
                Some(hi) => IntInterval::try_from_bounds(kmin, hi),
            },
            CompareOp::LessOrEqual => IntInterval::try_from_bounds(kmin, omax.clone()),
            CompareOp::Greater => match step(omin, UnaryOp::Increment) {
                None => Refinement::Empty,
                Some(lo) => IntInterval::try_from_bounds(lo, kmax),
            },
            CompareOp::GreaterOrEqual => IntInterval::try_from_bounds(omin.clone(), kmax),
        }
    }
}

impl Display for IntInterval {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let tag = match self.min.as_ref() {
            Element::Int(c) => c.kind().to_string(),
            other => other.kind().to_string(),
        };
        let lo = match self.min.as_ref() {
            Element::Int(c) if c.kind().is_signed() => c.signed().to_string(),
            Element::Int(c) => c.unsigned().to_string(),
            Element::MultiBit(m) => m.signed_value().to_string(),
            _ => "?".into(),
        };
        let hi = match self.max.as_ref() {
            Element::Int(c) if c.kind().is_signed() => c.signed().to_string(),
            Element::Int(c) => c.unsigned().to_string(),
            Element::MultiBit(m) => m.signed_value().to_string(),
            _ => "?".into(),
        };
        write!(f, "Interval {tag}[{lo}, {hi}]")
    }
}
