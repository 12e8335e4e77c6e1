//! Intersections of simultaneously-holding constraints.

use crate::element::Element;
use crate::environment::EvaluationEnvironment;
use crate::error::GamutError;
use gamut_ops::ScalarOperation;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// All members hold at once. A conjunction with fewer than two members is
/// invalid; a narrower single representation should be used instead.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct Conjunction {
    members: Vec<Element>,
}

impl Conjunction {
    pub fn new(members: Vec<Element>) -> Result<Self, GamutError> {
        if members.len() < 2 {
            return Err(GamutError::DegenerateConjunction);
        }
        Ok(Conjunction { members })
    }

    pub fn members(&self) -> &[Element] {
        &self.members
    }

    pub fn is_valid(&self) -> bool {
        self.members.len() >= 2 && self.members.iter().all(|m| m.is_valid())
    }

    /// `f(A and B)` is contained in `f(A) and f(B)`, so pushing a forward
    /// operation member-wise is sound.
    pub(crate) fn apply_each(
        &mut self,
        op: &ScalarOperation,
        env: &mut EvaluationEnvironment,
    ) -> bool {
        let mut all_handled = true;
        for member in &mut self.members {
            let mut scratch = env.scratch();
            all_handled &= member.apply(op, &mut scratch);
            env.absorb_flags(&scratch);
        }
        all_handled
    }

    pub(crate) fn intersect_each(&mut self, other: &Element, env: &mut EvaluationEnvironment) {
        for member in &mut self.members {
            let mut scratch = env.scratch();
            member.intersect_with(other, &mut scratch);
            env.absorb_flags(&scratch);
        }
    }

    /// The members folded into one element by successive meets: the
    /// narrowest single representation the members admit. Queries are
    /// answered on this representative, giving the first member refined by
    /// the rest.
    pub(crate) fn representative(&self, env: &mut EvaluationEnvironment) -> Element {
        let mut iter = self.members.iter();
        let mut acc = iter.next().expect("conjunction has members").clone();
        for member in iter {
            let mut scratch = env.scratch();
            acc.intersect_with(member, &mut scratch);
            env.absorb_flags(&scratch);
        }
        acc
    }

    pub(crate) fn contains_element(&self, other: &Element) -> bool {
        self.members.iter().all(|m| m.contains(other))
    }
}

impl Display for Conjunction {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Conjunction{{")?;
        for (i, member) in self.members.iter().enumerate() {
            if i > 0 {
                write!(f, " & ")?;
            }
            write!(f, "{member}")?;
        }
        write!(f, "}}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::interval::IntInterval;

    fn iv(lo: i32, hi: i32) -> Element {
        Element::IntInterval(
            IntInterval::new(Element::int_element(lo), Element::int_element(hi)).unwrap(),
        )
    }

    #[test]
    fn test_needs_two_members() {
        assert!(Conjunction::new(vec![iv(0, 5)]).is_err());
        assert!(Conjunction::new(vec![iv(0, 5), iv(3, 9)]).is_ok());
    }

    #[test]
    fn test_representative_is_the_meet() {
        let c = Conjunction::new(vec![iv(0, 5), iv(3, 9)]).unwrap();
        let mut env = EvaluationEnvironment::new();
        let rep = c.representative(&mut env);
        assert!(rep.contains(&Element::int_element(4)));
        assert!(!rep.contains(&Element::int_element(1)));
        assert!(!rep.contains(&Element::int_element(8)));
    }

    #[test]
    fn test_contains_requires_every_member() {
        let c = Conjunction::new(vec![iv(0, 5), iv(3, 9)]).unwrap();
        assert!(c.contains_element(&Element::int_element(4)));
        assert!(!c.contains_element(&Element::int_element(1)));
    }
}
