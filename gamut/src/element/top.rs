//! The unconstrained element.

use crate::element::Element;
use gamut_ops::{CastOp, FloatFormat, FloatKind, IntKind, ScalarKind};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Top knows only its kind. It absorbs every forward operation, answers every
/// query as unknown, and is the identity of the meet.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct Top {
    kind: ScalarKind,
}

impl Top {
    pub fn new(kind: ScalarKind) -> Self {
        Top { kind }
    }

    pub fn int(kind: IntKind) -> Self {
        Top {
            kind: ScalarKind::Integer(kind),
        }
    }

    pub fn float(kind: FloatKind) -> Self {
        Top {
            kind: ScalarKind::Float(kind),
        }
    }

    pub fn boolean() -> Self {
        Top {
            kind: ScalarKind::Boolean,
        }
    }

    pub fn kind(&self) -> ScalarKind {
        self.kind
    }

    pub fn bit_size(&self) -> u32 {
        self.kind.bit_size()
    }

    /// Casting Top only changes the kind it is unconstrained at.
    pub(crate) fn cast(&self, target: &CastOp) -> Element {
        let kind = match target {
            CastOp::Int(k) => ScalarKind::Integer(*k),
            CastOp::Float(k) => ScalarKind::Float(*k),
            CastOp::MultiBit { bits, signed } => ScalarKind::MultiBit {
                bits: *bits,
                signed: *signed,
            },
            CastOp::MultiFloat(format) => ScalarKind::MultiFloat(*format),
            CastOp::Bool => ScalarKind::Boolean,
        };
        Element::Top(Top::new(kind))
    }

    /// Top covers everything of its kind.
    pub(crate) fn contains_element(&self, other: &Element) -> bool {
        self.kind.bit_size() == other.bit_size()
    }
}

impl From<FloatFormat> for Top {
    fn from(value: FloatFormat) -> Self {
        Top {
            kind: ScalarKind::MultiFloat(value),
        }
    }
}

impl Display for Top {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Top {}", self.kind)
    }
}
