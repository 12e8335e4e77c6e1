//! Representation policy for fresh abstract values.

use crate::element::interval::{FloatInterval, IntInterval};
use crate::element::top::Top;
use crate::element::Element;
use gamut_ops::ScalarKind;

/// Alternatives a disjunction may hold before it collapses to its envelope.
pub const DEFAULT_DISJUNCTION_LIMIT: usize = 8;

/// Policy object choosing which representation a fresh program-point value
/// uses: intervals up to a width budget, plain multi-bit constants above it,
/// and a bound on disjunction growth. Not a value itself.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct Precision {
    interval_width_limit: u32,
    disjunction_limit: usize,
}

impl Default for Precision {
    fn default() -> Self {
        Precision {
            interval_width_limit: 64,
            disjunction_limit: DEFAULT_DISJUNCTION_LIMIT,
        }
    }
}

impl Precision {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_interval_width_limit(mut self, bits: u32) -> Self {
        self.interval_width_limit = bits;
        self
    }

    pub fn with_disjunction_limit(mut self, limit: usize) -> Self {
        self.disjunction_limit = limit.max(1);
        self
    }

    pub fn interval_width_limit(&self) -> u32 {
        self.interval_width_limit
    }

    pub fn disjunction_limit(&self) -> usize {
        self.disjunction_limit
    }

    /// The representation a fresh, unconstrained value of `kind` starts in.
    pub fn fresh(&self, kind: ScalarKind) -> Element {
        match kind {
            ScalarKind::Integer(k) => {
                if k.bits() <= self.interval_width_limit {
                    Element::IntInterval(IntInterval::full_range(k))
                } else {
                    Element::Top(Top::int(k))
                }
            }
            ScalarKind::MultiBit { bits, signed } => {
                if bits <= self.interval_width_limit {
                    Element::IntInterval(IntInterval::full_range_wide(bits, signed))
                } else {
                    Element::Top(Top::new(kind))
                }
            }
            ScalarKind::Float(k) => Element::FloatInterval(FloatInterval::full_line(k)),
            ScalarKind::Boolean | ScalarKind::MultiFloat(_) => Element::Top(Top::new(kind)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gamut_ops::IntKind;

    #[test]
    fn test_fresh_respects_width_budget() {
        let policy = Precision::default();
        assert!(matches!(
            policy.fresh(ScalarKind::Integer(IntKind::I32)),
            Element::IntInterval(_)
        ));
        assert!(matches!(
            policy.fresh(ScalarKind::MultiBit {
                bits: 128,
                signed: false
            }),
            Element::Top(_)
        ));

        let wide = Precision::default().with_interval_width_limit(256);
        assert!(matches!(
            wide.fresh(ScalarKind::MultiBit {
                bits: 128,
                signed: false
            }),
            Element::IntInterval(_)
        ));
    }

    #[test]
    fn test_disjunction_limit_floor() {
        let policy = Precision::default().with_disjunction_limit(0);
        assert_eq!(policy.disjunction_limit(), 1);
    }
}
