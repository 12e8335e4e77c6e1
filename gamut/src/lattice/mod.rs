pub mod flat;

pub use flat::{FlatLattice, Ternary};

/// A join-semilattice: a partial order with a least upper bound.
///
/// `join` widens `self` to cover both operands; it is the precision-losing
/// direction used when control flow merges.
pub trait JoinSemiLattice: Eq + PartialOrd {
    fn join(&mut self, other: &Self);
}

/// A meet-semilattice: a partial order with a greatest lower bound.
///
/// `meet` narrows `self` to the overlap of both operands and reports whether
/// the overlap is empty (bottom). Emptiness is a data condition for the
/// caller to interpret, never an error.
pub trait MeetSemiLattice: Eq + PartialOrd {
    #[must_use]
    fn meet(&mut self, other: &Self) -> MeetOutcome;
}

/// Result of a meet.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum MeetOutcome {
    /// The narrowed element is nonempty.
    Nonempty,
    /// The operands were disjoint; `self` is no longer meaningful.
    Empty,
}

impl MeetOutcome {
    pub fn is_empty(&self) -> bool {
        matches!(self, MeetOutcome::Empty)
    }
}

impl<S1, S2> JoinSemiLattice for (S1, S2)
where
    S1: JoinSemiLattice,
    S2: JoinSemiLattice,
{
    fn join(&mut self, other: &Self) {
        self.0.join(&other.0);
        self.1.join(&other.1);
    }
}
