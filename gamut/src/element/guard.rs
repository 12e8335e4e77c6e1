//! Conditional pairing of two abstract values.

use crate::element::{Element, SharedElement};
use crate::environment::EvaluationEnvironment;
use crate::error::GamutError;
use crate::lattice::Ternary;
use gamut_ops::ScalarOperation;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::sync::Arc;

/// `if condition then then_value else else_value`, with the condition itself
/// an abstract boolean. Operations push into both branches; a condition that
/// becomes definite collapses the guard to the live branch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Guard {
    condition: SharedElement,
    then_value: Box<Element>,
    else_value: Box<Element>,
}

impl PartialEq for Guard {
    fn eq(&self, other: &Self) -> bool {
        *self.condition == *other.condition
            && self.then_value == other.then_value
            && self.else_value == other.else_value
    }
}

impl Eq for Guard {}

impl Guard {
    pub fn new(
        condition: impl Into<SharedElement>,
        then_value: Element,
        else_value: Element,
    ) -> Result<Self, GamutError> {
        let condition = condition.into();
        if !condition.is_boolean_like() {
            return Err(GamutError::NonBooleanCondition);
        }
        Ok(Guard {
            condition,
            then_value: Box::new(then_value),
            else_value: Box::new(else_value),
        })
    }

    pub fn condition(&self) -> &Element {
        &self.condition
    }

    pub(crate) fn shared_condition(&self) -> SharedElement {
        Arc::clone(&self.condition)
    }

    pub fn then_value(&self) -> &Element {
        &self.then_value
    }

    pub fn else_value(&self) -> &Element {
        &self.else_value
    }

    pub fn is_valid(&self) -> bool {
        self.condition.is_boolean_like()
            && self.then_value.is_valid()
            && self.else_value.is_valid()
    }

    /// The branch selected by the condition, when definite.
    pub(crate) fn resolved(&self) -> Option<&Element> {
        match self.condition.truthiness() {
            Ternary::TRUE => Some(&self.then_value),
            Ternary::FALSE => Some(&self.else_value),
            _ => None,
        }
    }

    /// Push an operation into both branches. The caller re-checks whether the
    /// guard has collapsed afterwards.
    pub(crate) fn apply_both(
        &mut self,
        op: &ScalarOperation,
        env: &mut EvaluationEnvironment,
    ) -> bool {
        let mut then_env = env.scratch();
        let mut else_env = env.scratch();
        let then_handled = self.then_value.apply(op, &mut then_env);
        let else_handled = self.else_value.apply(op, &mut else_env);
        env.absorb_flags(&then_env);
        env.absorb_flags(&else_env);
        then_handled && else_handled
    }

    /// Refine the condition; a definite outcome collapses the pairing.
    pub fn with_condition(&self, condition: impl Into<SharedElement>) -> Element {
        let condition = condition.into();
        match condition.truthiness() {
            Ternary::TRUE => self.then_value.as_ref().clone(),
            Ternary::FALSE => self.else_value.as_ref().clone(),
            _ => Element::Guard(Guard {
                condition,
                then_value: self.then_value.clone(),
                else_value: self.else_value.clone(),
            }),
        }
    }

    pub(crate) fn map_branches(
        &self,
        f: impl Fn(&Element) -> Element,
    ) -> Guard {
        Guard {
            condition: Arc::clone(&self.condition),
            then_value: Box::new(f(&self.then_value)),
            else_value: Box::new(f(&self.else_value)),
        }
    }

    pub(crate) fn contains_element(&self, other: &Element) -> bool {
        // either branch may be live, so both must cover
        match other {
            Element::Guard(g) => {
                self.then_value.contains(&g.then_value) && self.else_value.contains(&g.else_value)
            }
            other => self.then_value.contains(other) || self.else_value.contains(other),
        }
    }
}

impl Display for Guard {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Guard({} ? {} : {})",
            self.condition, self.then_value, self.else_value
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::top::Top;
    use gamut_ops::BinaryOp;

    #[test]
    fn test_condition_must_be_boolean() {
        assert!(Guard::new(
            Element::int_element(1),
            Element::int_element(2),
            Element::int_element(3),
        )
        .is_err());
        assert!(Guard::new(
            Element::bool_element(true),
            Element::int_element(2),
            Element::int_element(3),
        )
        .is_ok());
    }

    #[test]
    fn test_known_condition_collapses() {
        let g = Guard::new(
            Element::Top(Top::boolean()),
            Element::int_element(2),
            Element::int_element(3),
        )
        .unwrap();
        assert!(g.resolved().is_none());
        assert_eq!(
            g.with_condition(Element::bool_element(true)),
            Element::int_element(2)
        );
        assert_eq!(
            g.with_condition(Element::bool_element(false)),
            Element::int_element(3)
        );
    }

    #[test]
    fn test_apply_pushes_into_both_branches() {
        let mut g = Guard::new(
            Element::Top(Top::boolean()),
            Element::int_element(2),
            Element::int_element(3),
        )
        .unwrap();
        let mut env = EvaluationEnvironment::binary(Element::int_element(10));
        assert!(g.apply_both(&BinaryOp::Times.into(), &mut env));
        assert_eq!(g.then_value(), &Element::int_element(20));
        assert_eq!(g.else_value(), &Element::int_element(30));
    }

    #[test]
    fn test_contains_covers_both_branches() {
        let g = Guard::new(
            Element::Top(Top::boolean()),
            Element::int_element(2),
            Element::int_element(3),
        )
        .unwrap();
        assert!(g.contains_element(&Element::int_element(2)));
        assert!(g.contains_element(&Element::int_element(3)));
        assert!(!g.contains_element(&Element::int_element(4)));
    }
}
