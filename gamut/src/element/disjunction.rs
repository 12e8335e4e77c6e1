//! Ordered unions of mutually exclusive alternatives.

use crate::element::{Element, SharedElement};
use crate::environment::EvaluationEnvironment;
use crate::error::GamutError;
use crate::lattice::{FlatLattice, JoinSemiLattice, Ternary};
use gamut_ops::ScalarOperation;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use tracing::debug;

/// One alternative of a disjunction: a value, optionally tagged with the
/// condition under which it is the live one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuardEntry {
    condition: Option<SharedElement>,
    value: Element,
}

impl PartialEq for GuardEntry {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
            && match (&self.condition, &other.condition) {
                (None, None) => true,
                (Some(a), Some(b)) => **a == **b,
                _ => false,
            }
    }
}

impl Eq for GuardEntry {}

impl GuardEntry {
    pub fn plain(value: Element) -> Self {
        GuardEntry {
            condition: None,
            value,
        }
    }

    pub fn conditional(condition: impl Into<SharedElement>, value: Element) -> Self {
        GuardEntry {
            condition: Some(condition.into()),
            value,
        }
    }

    pub fn condition(&self) -> Option<&Element> {
        self.condition.as_deref()
    }

    pub fn value(&self) -> &Element {
        &self.value
    }
}

/// A precision-preserving case split: the value is in exactly one of the
/// alternatives. Alternatives keep their insertion order; the order carries
/// no meaning beyond iteration.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct Disjunction {
    entries: Vec<GuardEntry>,
}

impl Disjunction {
    pub fn new(first: Element) -> Self {
        Disjunction {
            entries: vec![GuardEntry::plain(first)],
        }
    }

    pub fn from_alternatives(alternatives: Vec<Element>) -> Result<Self, GamutError> {
        if alternatives.is_empty() {
            return Err(GamutError::EmptyDisjunction);
        }
        Ok(Disjunction {
            entries: alternatives.into_iter().map(GuardEntry::plain).collect(),
        })
    }

    pub fn entries(&self) -> &[GuardEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_valid(&self) -> bool {
        !self.entries.is_empty() && self.entries.iter().all(|e| e.value.is_valid())
    }

    /// Insert a new alternative. An alternative overlapping an existing one
    /// (nonempty meet) is joined into it instead of growing the set; a set
    /// that outgrows `limit` collapses to its envelope.
    pub fn merge_new(&mut self, alternative: Element, limit: usize) {
        let mut slot = None;
        for (index, entry) in self.entries.iter().enumerate() {
            let mut probe = entry.value.clone();
            let mut meet_env = EvaluationEnvironment::new();
            let comparable = probe.intersect_with(&alternative, &mut meet_env);
            if comparable && !meet_env.is_empty() {
                slot = Some(index);
                break;
            }
        }
        match slot {
            Some(index) => {
                let mut join_env = EvaluationEnvironment::new();
                let entry = &mut self.entries[index];
                if entry.value.merge_with(&alternative, &mut join_env) {
                    entry.condition = None;
                } else {
                    self.entries.push(GuardEntry::plain(alternative));
                }
            }
            None => self.entries.push(GuardEntry::plain(alternative)),
        }
        if self.entries.len() > limit {
            debug!(
                alternatives = self.entries.len(),
                limit, "disjunction over budget, collapsing to envelope"
            );
            let envelope = self.envelope();
            self.entries = vec![GuardEntry::plain(envelope)];
        }
    }

    /// The join of all alternatives as a single element.
    pub fn envelope(&self) -> Element {
        let mut iter = self.entries.iter();
        let mut acc = iter.next().expect("disjunction is never empty").value.clone();
        let mut env = EvaluationEnvironment::new();
        for entry in iter {
            acc.merge_with(&entry.value, &mut env);
        }
        acc
    }

    /// Push a forward operation into every alternative. Alternatives whose
    /// result is empty are dropped; if none survive the environment is
    /// flagged empty.
    pub(crate) fn apply_each(
        &mut self,
        op: &ScalarOperation,
        env: &mut EvaluationEnvironment,
    ) -> bool {
        let mut survivors = Vec::with_capacity(self.entries.len());
        let mut all_handled = true;
        for entry in self.entries.drain(..) {
            let mut value = entry.value;
            let mut scratch = env.scratch();
            all_handled &= value.apply(op, &mut scratch);
            let dead = scratch.is_empty();
            env.absorb_flags(&scratch);
            if !dead {
                survivors.push(GuardEntry {
                    condition: entry.condition,
                    value,
                });
            }
        }
        if survivors.is_empty() {
            env.set_empty();
        }
        self.entries = survivors;
        all_handled
    }

    /// Meet every alternative with `other`, dropping the ones that empty.
    pub(crate) fn intersect_each(&mut self, other: &Element, env: &mut EvaluationEnvironment) {
        let mut survivors = Vec::with_capacity(self.entries.len());
        for entry in self.entries.drain(..) {
            let mut value = entry.value;
            let mut scratch = env.scratch();
            value.intersect_with(other, &mut scratch);
            if !scratch.is_empty() {
                survivors.push(GuardEntry {
                    condition: entry.condition,
                    value,
                });
            }
        }
        if survivors.is_empty() {
            env.set_empty();
        }
        self.entries = survivors;
    }

    pub(crate) fn merge(&mut self, other: &Element, limit: usize) {
        match other {
            Element::Disjunction(d) => {
                for entry in &d.entries {
                    self.merge_new(entry.value.clone(), limit);
                }
            }
            other => self.merge_new(other.clone(), limit),
        }
    }

    pub(crate) fn contains_element(&self, other: &Element) -> bool {
        match other {
            Element::Disjunction(d) => d
                .entries
                .iter()
                .all(|e| self.contains_element(&e.value)),
            other => self.entries.iter().any(|e| e.value.contains(other)),
        }
    }

    pub(crate) fn truthiness(&self) -> Ternary {
        let mut iter = self.entries.iter();
        let mut acc = match iter.next() {
            Some(e) => e.value.truthiness(),
            None => return FlatLattice::Top,
        };
        for entry in iter {
            acc.join(&entry.value.truthiness());
        }
        acc
    }
}

impl Display for Disjunction {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Disjunction{{")?;
        for (i, entry) in self.entries.iter().enumerate() {
            if i > 0 {
                write!(f, " | ")?;
            }
            if let Some(cond) = entry.condition() {
                write!(f, "[{cond}] ")?;
            }
            write!(f, "{}", entry.value)?;
        }
        write!(f, "}}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::interval::IntInterval;
    use gamut_ops::BinaryOp;

    fn iv(lo: i32, hi: i32) -> Element {
        Element::IntInterval(
            IntInterval::new(Element::int_element(lo), Element::int_element(hi)).unwrap(),
        )
    }

    #[test]
    fn test_contains_its_parts() {
        let d = Disjunction::from_alternatives(vec![
            Element::int_element(0),
            iv(1, 10),
        ])
        .unwrap();
        for entry in d.entries() {
            assert!(Element::Disjunction(d.clone()).contains(entry.value()));
        }
        assert!(d.contains_element(&Element::int_element(5)));
        assert!(!d.contains_element(&Element::int_element(11)));
    }

    #[test]
    fn test_merge_new_coalesces_overlap() {
        let mut d = Disjunction::new(iv(0, 5));
        d.merge_new(iv(3, 9), 8);
        assert_eq!(d.len(), 1);
        assert!(d.contains_element(&Element::int_element(9)));
        // disjoint alternative stays separate
        d.merge_new(iv(20, 30), 8);
        assert_eq!(d.len(), 2);
    }

    #[test]
    fn test_merge_new_collapses_past_limit() {
        let mut d = Disjunction::new(Element::int_element(0));
        d.merge_new(Element::int_element(10), 2);
        assert_eq!(d.len(), 2);
        d.merge_new(Element::int_element(20), 2);
        assert_eq!(d.len(), 1);
        assert!(d.contains_element(&Element::int_element(20)));
        assert!(d.contains_element(&Element::int_element(0)));
    }

    #[test]
    fn test_apply_each_drops_empty_alternatives() {
        let mut d = Disjunction::from_alternatives(vec![
            Element::int_element(2),
            Element::int_element(7),
        ])
        .unwrap();
        let mut env = EvaluationEnvironment::binary(Element::int_element(1));
        assert!(d.apply_each(&BinaryOp::Plus.into(), &mut env));
        assert_eq!(d.len(), 2);
        assert_eq!(d.entries()[0].value(), &Element::int_element(3));
        assert_eq!(d.entries()[1].value(), &Element::int_element(8));
    }

    #[test]
    fn test_intersect_each_flags_empty() {
        let mut d = Disjunction::from_alternatives(vec![
            Element::int_element(2),
            Element::int_element(7),
        ])
        .unwrap();
        let mut env = EvaluationEnvironment::new();
        d.intersect_each(&Element::int_element(100), &mut env);
        assert!(env.is_empty());
    }
}
