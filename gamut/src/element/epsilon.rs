//! Float intervals carrying an explicit error bound.
//!
//! An [`EpsilonInterval`] refines a float interval with the guarantee that
//! the represented value differs from some ideal (infinitely precise) value
//! by at most `epsilon`. Linear operations propagate the error linearly;
//! multiplication scales it by the largest operand magnitude.

use crate::element::float_const::FloatConst;
use crate::element::interval::FloatInterval;
use crate::element::Element;
use crate::environment::EvaluationEnvironment;
use gamut_ops::{BinaryOp, FloatKind, UnaryOp};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpsilonInterval {
    base: FloatInterval,
    epsilon: f64,
}

impl PartialEq for EpsilonInterval {
    fn eq(&self, other: &Self) -> bool {
        self.base == other.base && self.epsilon.to_bits() == other.epsilon.to_bits()
    }
}

impl Eq for EpsilonInterval {}

impl EpsilonInterval {
    pub fn new(base: FloatInterval, epsilon: f64) -> Self {
        EpsilonInterval {
            base,
            epsilon: epsilon.abs(),
        }
    }

    pub fn exact(base: FloatInterval) -> Self {
        EpsilonInterval { base, epsilon: 0.0 }
    }

    pub fn base(&self) -> &FloatInterval {
        &self.base
    }

    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    pub fn kind(&self) -> FloatKind {
        self.base.kind()
    }

    pub fn is_valid(&self) -> bool {
        self.base.is_valid() && self.epsilon >= 0.0 && !self.epsilon.is_nan()
    }

    fn magnitude(&self) -> f64 {
        self.base.min().value().abs().max(self.base.max().value().abs())
    }

    pub(crate) fn apply_unary(
        &mut self,
        op: UnaryOp,
        env: &mut EvaluationEnvironment,
    ) -> Option<Element> {
        self.base.apply_unary(op, env)
    }

    pub(crate) fn apply_binary(
        &mut self,
        op: BinaryOp,
        arg: &Element,
        env: &mut EvaluationEnvironment,
    ) -> Option<Element> {
        let (arg_eps, arg_mag, plain_arg);
        match arg {
            Element::Epsilon(e) => {
                arg_eps = e.epsilon;
                arg_mag = e.magnitude();
                plain_arg = Element::FloatInterval(e.base.clone());
            }
            other => {
                arg_eps = 0.0;
                arg_mag = match other {
                    Element::Float(c) => c.value().abs(),
                    Element::FloatInterval(i) => {
                        i.min().value().abs().max(i.max().value().abs())
                    }
                    _ => f64::INFINITY,
                };
                plain_arg = other.clone();
            }
        }
        let own_mag = self.magnitude();
        if let Some(replacement) = self.base.apply_binary(op, &plain_arg, env) {
            return Some(replacement);
        }
        self.epsilon = match op {
            BinaryOp::Plus | BinaryOp::Minus => self.epsilon + arg_eps,
            BinaryOp::Times => self.epsilon * arg_mag + arg_eps * own_mag,
            BinaryOp::Divide => {
                // conservative: only a nonzero-magnitude divisor can be
                // meaningfully bounded
                if arg_mag.is_finite() && arg_mag > 0.0 {
                    (self.epsilon + arg_eps * own_mag) / arg_mag
                } else {
                    f64::INFINITY
                }
            }
            _ => f64::INFINITY,
        };
        if !self.epsilon.is_finite() {
            env.set_inexact();
        }
        None
    }

    /// Widen the base interval by the error bound, yielding a plain interval
    /// guaranteed to contain the ideal value.
    pub fn inflated(&self) -> FloatInterval {
        let kind = self.kind();
        FloatInterval::from_consts(
            FloatConst::new(kind, self.base.min().value() - self.epsilon),
            FloatConst::new(kind, self.base.max().value() + self.epsilon),
        )
    }

    pub(crate) fn intersect(&mut self, other: &Element, env: &mut EvaluationEnvironment) -> bool {
        match other {
            Element::Epsilon(e) => {
                let handled = self
                    .base
                    .intersect(&Element::FloatInterval(e.base.clone()), env);
                self.epsilon = self.epsilon.min(e.epsilon);
                handled
            }
            other => self.base.intersect(other, env),
        }
    }

    pub(crate) fn merge(&mut self, other: &Element) -> bool {
        match other {
            Element::Epsilon(e) => {
                let merged = self.base.merge(&Element::FloatInterval(e.base.clone()));
                if merged {
                    self.epsilon = self.epsilon.max(e.epsilon);
                }
                merged
            }
            other => self.base.merge(other),
        }
    }

    pub(crate) fn contains_element(&self, other: &Element) -> bool {
        match other {
            Element::Epsilon(e) => {
                self.base.contains_element(&Element::FloatInterval(e.base.clone()))
                    && self.epsilon >= e.epsilon
            }
            other => self.base.contains_element(other),
        }
    }
}

impl Display for EpsilonInterval {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} +/-{}", self.base, self.epsilon)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gamut_ops::FloatKind;

    fn base(lo: f64, hi: f64) -> FloatInterval {
        FloatInterval::from_consts(
            FloatConst::new(FloatKind::Double, lo),
            FloatConst::new(FloatKind::Double, hi),
        )
    }

    #[test]
    fn test_linear_error_propagation() {
        let mut a = EpsilonInterval::new(base(1.0, 2.0), 0.25);
        let b = EpsilonInterval::new(base(3.0, 4.0), 0.5);
        let mut env = EvaluationEnvironment::new();
        a.apply_binary(BinaryOp::Plus, &Element::Epsilon(b), &mut env);
        assert_eq!(a.epsilon(), 0.75);
        assert!(a.base().min().value() <= 4.0);
        assert!(a.base().max().value() >= 6.0);
    }

    #[test]
    fn test_times_scales_error() {
        let mut a = EpsilonInterval::new(base(1.0, 2.0), 0.1);
        let c = Element::Float(FloatConst::new(FloatKind::Double, 3.0));
        let mut env = EvaluationEnvironment::new();
        a.apply_binary(BinaryOp::Times, &c, &mut env);
        assert!((a.epsilon() - 0.3).abs() < 1e-12);
    }

    #[test]
    fn test_inflated_covers_error() {
        let e = EpsilonInterval::new(base(0.0, 1.0), 0.5);
        let wide = e.inflated();
        assert_eq!(wide.min().value(), -0.5);
        assert_eq!(wide.max().value(), 1.5);
    }
}
