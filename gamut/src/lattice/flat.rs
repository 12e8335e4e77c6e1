use crate::lattice::{JoinSemiLattice, MeetOutcome, MeetSemiLattice};
use std::cmp::Ordering;
use std::fmt::{Debug, Display, Formatter};

/// A flat lattice over `C`: every concrete value sits just below Top and all
/// values are mutually incomparable. Joining two different values loses all
/// information.
#[derive(PartialEq, Eq, Copy, Clone, Hash, Debug)]
pub enum FlatLattice<C> {
    Value(C),
    Top,
}

/// Three-valued logic over the flat boolean lattice: `Value(true)`,
/// `Value(false)`, or unknown. This is the type of every abstract comparison
/// outcome in the engine.
pub type Ternary = FlatLattice<bool>;

impl<C> From<C> for FlatLattice<C> {
    fn from(value: C) -> Self {
        FlatLattice::Value(value)
    }
}

impl<C: Display> Display for FlatLattice<C> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            FlatLattice::Value(a) => write!(f, "{a}"),
            FlatLattice::Top => write!(f, "unknown"),
        }
    }
}

impl<C> FlatLattice<C> {
    pub fn is_top(&self) -> bool {
        matches!(self, FlatLattice::Top)
    }

    pub fn value(&self) -> Option<&C> {
        match self {
            FlatLattice::Value(c) => Some(c),
            FlatLattice::Top => None,
        }
    }
}

impl<C: PartialOrd + PartialEq + Clone> PartialOrd for FlatLattice<C> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (&self, &other) {
            (Self::Top, Self::Top) => Some(Ordering::Equal),
            (Self::Top, Self::Value(_)) => Some(Ordering::Greater),
            (Self::Value(_), Self::Top) => Some(Ordering::Less),
            (Self::Value(a), Self::Value(b)) => {
                if a == b {
                    Some(Ordering::Equal)
                } else {
                    None
                }
            }
        }
    }
}

impl<C: PartialOrd + Eq + Clone> JoinSemiLattice for FlatLattice<C> {
    fn join(&mut self, other: &Self) {
        match (&self, other) {
            (Self::Top, _) => *self = Self::Top,
            (_, Self::Top) => *self = Self::Top,
            (Self::Value(a), Self::Value(b)) => {
                if a != b {
                    *self = Self::Top
                }
            }
        };
    }
}

impl<C: PartialOrd + Eq + Clone> MeetSemiLattice for FlatLattice<C> {
    fn meet(&mut self, other: &Self) -> MeetOutcome {
        match (&self, other) {
            (_, Self::Top) => MeetOutcome::Nonempty,
            (Self::Top, Self::Value(v)) => {
                *self = Self::Value(v.clone());
                MeetOutcome::Nonempty
            }
            (Self::Value(a), Self::Value(b)) => {
                if a == b {
                    MeetOutcome::Nonempty
                } else {
                    MeetOutcome::Empty
                }
            }
        }
    }
}

impl Ternary {
    pub const TRUE: Ternary = FlatLattice::Value(true);
    pub const FALSE: Ternary = FlatLattice::Value(false);

    pub fn is_true(&self) -> bool {
        matches!(self, FlatLattice::Value(true))
    }

    pub fn is_false(&self) -> bool {
        matches!(self, FlatLattice::Value(false))
    }

    /// Kleene negation: unknown stays unknown.
    pub fn not3(self) -> Ternary {
        match self {
            FlatLattice::Value(b) => FlatLattice::Value(!b),
            FlatLattice::Top => FlatLattice::Top,
        }
    }

    /// Kleene conjunction: false dominates unknown.
    pub fn and3(self, other: Ternary) -> Ternary {
        match (self, other) {
            (Ternary::FALSE, _) | (_, Ternary::FALSE) => Ternary::FALSE,
            (Ternary::TRUE, Ternary::TRUE) => Ternary::TRUE,
            _ => FlatLattice::Top,
        }
    }

    /// Kleene disjunction: true dominates unknown.
    pub fn or3(self, other: Ternary) -> Ternary {
        match (self, other) {
            (Ternary::TRUE, _) | (_, Ternary::TRUE) => Ternary::TRUE,
            (Ternary::FALSE, Ternary::FALSE) => Ternary::FALSE,
            _ => FlatLattice::Top,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lattice::{JoinSemiLattice, MeetSemiLattice};

    #[test]
    fn test_flat_lattice_order() {
        let val1 = FlatLattice::Value(4u64);
        let val2 = FlatLattice::Value(5u64);
        let top = FlatLattice::Top;
        assert!(top > val1);
        assert!(top > val2);
        assert!(val1.partial_cmp(&val2).is_none());
        assert!(val2.partial_cmp(&val1).is_none());
    }

    #[test]
    fn test_flat_lattice_join_meet() {
        let mut a = FlatLattice::Value(4u64);
        a.join(&FlatLattice::Value(4));
        assert_eq!(a, FlatLattice::Value(4));
        a.join(&FlatLattice::Value(5));
        assert!(a.is_top());

        let mut b = FlatLattice::Top;
        assert!(!b.meet(&FlatLattice::Value(7u64)).is_empty());
        assert_eq!(b, FlatLattice::Value(7));
        assert!(b.meet(&FlatLattice::Value(8)).is_empty());
    }

    #[test]
    fn test_ternary_kleene_laws() {
        let u: Ternary = FlatLattice::Top;
        assert_eq!(Ternary::TRUE.and3(u), u);
        assert_eq!(Ternary::FALSE.and3(u), Ternary::FALSE);
        assert_eq!(Ternary::TRUE.or3(u), Ternary::TRUE);
        assert_eq!(Ternary::FALSE.or3(u), u);
        assert_eq!(u.not3(), u);
        assert_eq!(Ternary::TRUE.not3(), Ternary::FALSE);
        // De Morgan over all nine pairs
        for a in [Ternary::TRUE, Ternary::FALSE, u] {
            for b in [Ternary::TRUE, Ternary::FALSE, u] {
                assert_eq!(a.and3(b).not3(), a.not3().or3(b.not3()));
            }
        }
    }
}
