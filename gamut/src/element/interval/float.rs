//! Float intervals with outward-rounded bounds.

use crate::element::float_const::{FloatConst, next_down_in, next_up_in};
use crate::element::interval::BoundKind;
use crate::element::top::Top;
use crate::element::{Element, Refinement};
use crate::environment::{EvaluationEnvironment, RoundingMode};
use crate::error::GamutError;
use crate::lattice::{FlatLattice, Ternary};
use gamut_ops::{BinaryOp, CastOp, CompareOp, FloatKind, ScalarKind, UnaryOp};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt::{Display, Formatter};

/// A float value between two constant bounds of the same precision.
/// NaN is never inside an interval; an operation that can produce NaN flags
/// the environment and widens to the full line.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct FloatInterval {
    min: FloatConst,
    max: FloatConst,
}

impl FloatInterval {
    pub fn new(min: FloatConst, max: FloatConst, bounds: BoundKind) -> Result<Self, GamutError> {
        if min.kind() != max.kind() || min.is_nan() || max.is_nan() {
            return Err(GamutError::MismatchedBounds);
        }
        let kind = min.kind();
        // open bounds step one ulp inward: exact over the discrete float grid
        let lo = if bounds.lower_open() {
            FloatConst::new(kind, next_up_in(kind, min.value()))
        } else {
            min
        };
        let hi = if bounds.upper_open() {
            FloatConst::new(kind, next_down_in(kind, max.value()))
        } else {
            max
        };
        Ok(FloatInterval { min: lo, max: hi })
    }

    pub(crate) fn from_consts(min: FloatConst, max: FloatConst) -> Self {
        FloatInterval { min, max }
    }

    pub(crate) fn degenerate(c: FloatConst) -> Self {
        FloatInterval { min: c, max: c }
    }

    pub fn full_line(kind: FloatKind) -> Self {
        FloatInterval {
            min: FloatConst::new(kind, f64::NEG_INFINITY),
            max: FloatConst::new(kind, f64::INFINITY),
        }
    }

    pub fn min(&self) -> &FloatConst {
        &self.min
    }

    pub fn max(&self) -> &FloatConst {
        &self.max
    }

    pub fn kind(&self) -> FloatKind {
        self.min.kind()
    }

    pub fn is_valid(&self) -> bool {
        self.min.kind() == self.max.kind() && !self.min.is_nan() && !self.max.is_nan()
    }

    pub(crate) fn as_degenerate(&self) -> Option<&FloatConst> {
        if self.min == self.max { Some(&self.min) } else { None }
    }

    pub(crate) fn contains_zero(&self) -> bool {
        self.min.value() <= 0.0 && self.max.value() >= 0.0
    }

    pub(crate) fn truthiness(&self) -> Ternary {
        if !self.contains_zero() {
            Ternary::TRUE
        } else if self.min.value() == 0.0 && self.max.value() == 0.0 {
            Ternary::FALSE
        } else {
            FlatLattice::Top
        }
    }

    fn arg_bounds(arg: &Element) -> Option<(FloatConst, FloatConst)> {
        match arg {
            Element::Float(c) => {
                if c.is_nan() {
                    None
                } else {
                    Some((*c, *c))
                }
            }
            Element::FloatInterval(i) => Some((i.min, i.max)),
            Element::Epsilon(e) => {
                let inflated = e.inflated();
                Some((*inflated.min(), *inflated.max()))
            }
            _ => None,
        }
    }

    fn become_full(&mut self) {
        *self = FloatInterval::full_line(self.kind());
    }

    /// Evaluate one bound combination under a directed rounding mode.
    fn corner(
        bound: &FloatConst,
        op: BinaryOp,
        arg: &FloatConst,
        mode: RoundingMode,
        env: &mut EvaluationEnvironment,
    ) -> FloatConst {
        let mut out = *bound;
        let mut scratch = env.scratch().with_rounding(mode);
        out.apply_binary(op, arg, &mut scratch);
        env.absorb_flags(&scratch);
        out
    }

    pub(crate) fn apply_unary(
        &mut self,
        op: UnaryOp,
        env: &mut EvaluationEnvironment,
    ) -> Option<Element> {
        match op {
            UnaryOp::Opposite => {
                let mut new_min = self.max;
                let mut new_max = self.min;
                let mut scratch = env.scratch();
                new_min.apply_unary(UnaryOp::Opposite, &mut scratch);
                new_max.apply_unary(UnaryOp::Opposite, &mut scratch);
                self.min = new_min;
                self.max = new_max;
                None
            }
            UnaryOp::Increment | UnaryOp::Decrement => {
                let one = Element::Float(FloatConst::new(self.kind(), 1.0));
                let bin = if op == UnaryOp::Increment {
                    BinaryOp::Plus
                } else {
                    BinaryOp::Minus
                };
                self.apply_binary(bin, &one, env)
            }
            UnaryOp::LogicalNot => Some(match self.truthiness().not3() {
                Ternary::TRUE => Element::Float(FloatConst::new(self.kind(), 1.0)),
                Ternary::FALSE => Element::Float(FloatConst::new(self.kind(), 0.0)),
                _ => Element::FloatInterval(FloatInterval {
                    min: FloatConst::new(self.kind(), 0.0),
                    max: FloatConst::new(self.kind(), 1.0),
                }),
            }),
            UnaryOp::BitNegate => {
                panic!("bit negation is not defined on float elements")
            }
        }
    }

    pub(crate) fn apply_binary(
        &mut self,
        op: BinaryOp,
        arg: &Element,
        env: &mut EvaluationEnvironment,
    ) -> Option<Element> {
        let Some((amin, amax)) = Self::arg_bounds(arg) else {
            env.set_nan();
            self.become_full();
            return None;
        };
        if self.min.is_nan() || self.max.is_nan() {
            self.become_full();
            return None;
        }
        match op {
            BinaryOp::Plus | BinaryOp::Minus => {
                let (alo, ahi) = if op == BinaryOp::Plus {
                    (amin, amax)
                } else {
                    (amax, amin)
                };
                let lo = Self::corner(&self.min, op, &alo, RoundingMode::Lowest, env);
                let hi = Self::corner(&self.max, op, &ahi, RoundingMode::Highest, env);
                if lo.is_nan() || hi.is_nan() {
                    env.set_nan();
                    self.become_full();
                } else {
                    self.min = lo;
                    self.max = hi;
                }
            }
            BinaryOp::Times | BinaryOp::Divide => {
                if op == BinaryOp::Divide && amin.value() <= 0.0 && amax.value() >= 0.0 {
                    env.set_division_by_zero();
                    self.become_full();
                    return None;
                }
                let mut lows = Vec::with_capacity(4);
                let mut highs = Vec::with_capacity(4);
                for (b, a) in [self.min, self.max].into_iter().cartesian_product([amin, amax]) {
                    lows.push(Self::corner(&b, op, &a, RoundingMode::Lowest, env));
                    highs.push(Self::corner(&b, op, &a, RoundingMode::Highest, env));
                }
                if lows.iter().chain(highs.iter()).any(|c| c.is_nan()) {
                    env.set_nan();
                    self.become_full();
                } else {
                    let lo = lows
                        .into_iter()
                        .min_by(|a, b| a.value().total_cmp(&b.value()))
                        .expect("four corners");
                    let hi = highs
                        .into_iter()
                        .max_by(|a, b| a.value().total_cmp(&b.value()))
                        .expect("four corners");
                    self.min = lo;
                    self.max = hi;
                }
            }
            BinaryOp::Modulo => {
                // remainder magnitude is bounded by the divisor's
                let bound = amin.value().abs().max(amax.value().abs());
                if bound == 0.0 {
                    env.set_division_by_zero();
                    self.become_full();
                } else if bound.is_finite() {
                    self.min = FloatConst::new(self.kind(), -bound);
                    self.max = FloatConst::new(self.kind(), bound);
                } else {
                    self.become_full();
                }
            }
            BinaryOp::LogicalAnd | BinaryOp::LogicalOr => {
                let combined = if op == BinaryOp::LogicalAnd {
                    self.truthiness().and3(arg.truthiness())
                } else {
                    self.truthiness().or3(arg.truthiness())
                };
                return Some(match combined {
                    Ternary::TRUE => Element::Float(FloatConst::new(self.kind(), 1.0)),
                    Ternary::FALSE => Element::Float(FloatConst::new(self.kind(), 0.0)),
                    _ => Element::FloatInterval(FloatInterval {
                        min: FloatConst::new(self.kind(), 0.0),
                        max: FloatConst::new(self.kind(), 1.0),
                    }),
                });
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
        None
    }

    pub(crate) fn compare(&self, op: CompareOp, arg: &Element) -> Ternary {
        let Some((amin, amax)) = Self::arg_bounds(arg) else {
            // comparisons against NaN are false, except inequality
            return Ternary::from(matches!(op, CompareOp::Different));
        };
        let max_vs_amin = self.max.value().partial_cmp(&amin.value());
        let min_vs_amax = self.min.value().partial_cmp(&amax.value());
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
                    if c.value() == amin.value() {
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

    pub(crate) fn cast(&self, target: &CastOp, env: &mut EvaluationEnvironment) -> Element {
        match target {
            CastOp::Float(k) => {
                let mut lo_env = env.scratch().with_rounding(RoundingMode::Lowest);
                let mut hi_env = env.scratch().with_rounding(RoundingMode::Highest);
                let lo = Element::Float(self.min).cast_element(target, &mut lo_env);
                let hi = Element::Float(self.max).cast_element(target, &mut hi_env);
                env.absorb_flags(&lo_env);
                env.absorb_flags(&hi_env);
                match (lo, hi) {
                    (Element::Float(a), Element::Float(b)) if !a.is_nan() && !b.is_nan() => {
                        Element::FloatInterval(FloatInterval::from_consts(a, b))
                    }
                    _ => Element::FloatInterval(FloatInterval::full_line(*k)),
                }
            }
            CastOp::Int(_) | CastOp::MultiBit { .. } => {
                // truncation is monotone, so the truncated bounds bound the
                // truncated image; saturation keeps them representable
                let mut scratch = env.scratch();
                let lo = Element::Float(self.min).cast_element(target, &mut scratch);
                let hi = Element::Float(self.max).cast_element(target, &mut scratch);
                env.absorb_flags(&scratch);
                match super::IntInterval::try_from_bounds(lo.clone(), hi) {
                    Refinement::Replace(e) => e,
                    Refinement::Empty | Refinement::Keep => lo,
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

    pub(crate) fn intersect(&mut self, other: &Element, env: &mut EvaluationEnvironment) -> bool {
        let Some((omin, omax)) = Self::arg_bounds(other) else {
            return false;
        };
        let new_min = if self.min.value() >= omin.value() { self.min } else { omin };
        let new_max = if self.max.value() <= omax.value() { self.max } else { omax };
        if new_min.value() > new_max.value() {
            env.set_empty();
            return true;
        }
        self.min = new_min;
        self.max = new_max;
        true
    }

    pub(crate) fn merge(&mut self, other: &Element) -> bool {
        let Some((omin, omax)) = Self::arg_bounds(other) else {
            return false;
        };
        if omin.kind() != self.kind() {
            return false;
        }
        if omin.value() < self.min.value() {
            self.min = omin;
        }
        if omax.value() > self.max.value() {
            self.max = omax;
        }
        true
    }

    pub(crate) fn contains_element(&self, other: &Element) -> bool {
        let Some((omin, omax)) = Self::arg_bounds(other) else {
            return false;
        };
        self.min.value() <= omin.value() && omax.value() <= self.max.value()
    }

    pub(crate) fn refine_compare(
        op: CompareOp,
        other: &Element,
        kind: FloatKind,
    ) -> Refinement {
        let Some((omin, omax)) = Self::arg_bounds(other) else {
            return match op {
                CompareOp::Different => Refinement::Keep,
                _ => Refinement::Empty,
            };
        };
        match op {
            CompareOp::Equal => Refinement::Replace(other.clone()),
            CompareOp::Different => Refinement::Keep,
            CompareOp::Less => Refinement::Replace(Element::FloatInterval(FloatInterval {
                min: FloatConst::new(kind, f64::NEG_INFINITY),
                max: FloatConst::new(kind, next_down_in(kind, omax.value())),
            })),
            CompareOp::LessOrEqual => Refinement::Replace(Element::FloatInterval(FloatInterval {
                min: FloatConst::new(kind, f64::NEG_INFINITY),
                max: omax,
            })),
            CompareOp::Greater => Refinement::Replace(Element::FloatInterval(FloatInterval {
                min: FloatConst::new(kind, next_up_in(kind, omin.value())),
                max: FloatConst::new(kind, f64::INFINITY),
            })),
            CompareOp::GreaterOrEqual => {
                Refinement::Replace(Element::FloatInterval(FloatInterval {
                    min: omin,
                    max: FloatConst::new(kind, f64::INFINITY),
                }))
            }
        }
    }
}

impl Display for FloatInterval {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Interval {}[{}, {}]",
            self.kind(),
            self.min.value(),
            self.max.value()
        )
    }
}
