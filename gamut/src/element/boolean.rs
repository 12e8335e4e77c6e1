//! Boolean constants. An abstract boolean of unknown truth is not a
//! dedicated kind; it is a one-bit [`Top`](crate::element::top::Top).

use crate::element::int_const::IntConst;
use crate::element::{Element, Refinement};
use crate::environment::EvaluationEnvironment;
use crate::lattice::Ternary;
use gamut_ops::{BinaryOp, CastOp, CompareOp, UnaryOp};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct BoolConst {
    value: bool,
}

impl BoolConst {
    pub fn new(value: bool) -> Self {
        BoolConst { value }
    }

    pub fn value(&self) -> bool {
        self.value
    }

    pub fn ternary(&self) -> Ternary {
        Ternary::from(self.value)
    }

    pub(crate) fn apply_unary(&mut self, op: UnaryOp) {
        match op {
            UnaryOp::LogicalNot | UnaryOp::BitNegate | UnaryOp::Opposite => {
                self.value = !self.value
            }
            UnaryOp::Increment | UnaryOp::Decrement => {
                panic!("increment/decrement are not defined on boolean elements")
            }
        }
    }

    pub(crate) fn apply_binary(&mut self, op: BinaryOp, rhs: &BoolConst) {
        match op {
            BinaryOp::LogicalAnd | BinaryOp::BitAnd => self.value &= rhs.value,
            BinaryOp::LogicalOr | BinaryOp::BitOr => self.value |= rhs.value,
            BinaryOp::BitXor => self.value ^= rhs.value,
            _ => panic!("arithmetic operation {op} is not defined on boolean elements"),
        }
    }

    pub(crate) fn compare(&self, op: CompareOp, rhs: &BoolConst) -> Ternary {
        // false < true, as in the integer view
        Ternary::from(op.holds(&(self.value as u8), &(rhs.value as u8)))
    }

    pub(crate) fn cast(&self, target: &CastOp, env: &mut EvaluationEnvironment) -> Element {
        match target {
            CastOp::Bool => Element::Bool(*self),
            CastOp::Int(k) => Element::Int(IntConst::new(*k, self.value as u64)),
            _ => {
                let staged = IntConst::new(gamut_ops::IntKind::U8, self.value as u64);
                staged.cast(target, env)
            }
        }
    }

    pub(crate) fn refine_compare(&self, op: CompareOp, other: &BoolConst) -> Refinement {
        let this = self.value as u8;
        let that = other.value as u8;
        if op.holds(&this, &that) {
            Refinement::Keep
        } else {
            // the only other boolean is the complement; either it satisfies
            // the predicate or nothing does
            if op.holds(&(!self.value as u8), &that) {
                Refinement::Replace(Element::bool_element(!self.value))
            } else {
                Refinement::Empty
            }
        }
    }
}

impl Display for BoolConst {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "bool {}", self.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logic() {
        let mut a = BoolConst::new(true);
        a.apply_binary(BinaryOp::LogicalAnd, &BoolConst::new(false));
        assert!(!a.value());
        a.apply_binary(BinaryOp::LogicalOr, &BoolConst::new(true));
        assert!(a.value());
        a.apply_unary(UnaryOp::LogicalNot);
        assert!(!a.value());
    }

    #[test]
    fn test_compare() {
        let f = BoolConst::new(false);
        let t = BoolConst::new(true);
        assert!(f.compare(CompareOp::Less, &t).is_true());
        assert!(t.compare(CompareOp::Equal, &t).is_true());
    }

    #[test]
    #[should_panic]
    fn test_arithmetic_panics() {
        let mut a = BoolConst::new(true);
        a.apply_binary(BinaryOp::Plus, &BoolConst::new(true));
    }
}
