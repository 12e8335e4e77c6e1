//! The abstract value: a closed union over the concrete domain kinds.
//!
//! Every domain-specific representation lives behind the [`Element`] enum,
//! and every engine entry point (`apply`, `constrain`, `intersect_with`,
//! `merge_with`, `contains`, `query`) dispatches here with a single `match`.
//! When a binary operation's argument sits higher in the domain ordering
//! than the receiver, the receiver is promoted into the argument's domain
//! first (a constant becomes a degenerate interval, anything distributes
//! over a disjunction's alternatives), so each domain only ever sees
//! arguments at or below its own rank.
//!
//! Elements are immutable values once shared: mutating entry points take
//! `&mut self` on an exclusively owned value, and sharing happens only
//! through the [`SharedElement`] handle.

pub mod boolean;
pub mod conjunction;
pub mod disjunction;
pub mod epsilon;
pub mod float_const;
pub mod guard;
pub mod int_const;
pub mod interval;
pub mod mask;
pub mod multibit;
pub mod multifloat;
pub mod top;

pub use boolean::BoolConst;
pub use conjunction::Conjunction;
pub use disjunction::{Disjunction, GuardEntry};
pub use epsilon::EpsilonInterval;
pub use float_const::{FloatClass, FloatConst};
pub use guard::Guard;
pub use int_const::IntConst;
pub use interval::{BoundKind, FloatInterval, IntInterval, ScalarOrder};
pub use mask::{BitMask, MultiBitMask};
pub use multibit::MultiBit;
pub use multifloat::MultiFloat;
pub use top::Top;

use crate::environment::{ConstraintEnvironment, EvaluationEnvironment};
use crate::error::GamutError;
use crate::lattice::{FlatLattice, JoinSemiLattice, Ternary};
use crate::precision::DEFAULT_DISJUNCTION_LIMIT;
use gamut_ops::{
    BinaryOp, CastOp, CompareOp, FloatKind, IntKind, QueryOperation, ScalarKind, ScalarOperation,
    UnaryOp,
};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::sync::Arc;
use tracing::trace;

/// Shared-immutable handle to an element. Mutation is always "build a new
/// value"; aliased handles are never written through.
pub type SharedElement = Arc<Element>;

/// The coarse approximation kind of an element, with the domain ordering
/// used by the promotion rule.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum ApproxKind {
    Constant,
    BitMask,
    Interval,
    Disjunction,
    Conjunction,
    Guard,
    Top,
}

impl ApproxKind {
    pub fn rank(&self) -> u8 {
        match self {
            ApproxKind::Constant => 0,
            ApproxKind::BitMask => 1,
            ApproxKind::Interval => 2,
            ApproxKind::Disjunction => 3,
            ApproxKind::Conjunction => 4,
            ApproxKind::Guard => 5,
            ApproxKind::Top => 6,
        }
    }
}

/// Outcome of computing an inverse image during backward refinement.
#[derive(Debug, Clone)]
pub(crate) enum Refinement {
    /// No usable inverse; the operand keeps its current abstraction.
    Keep,
    /// The operand lies inside this candidate; intersect with it.
    Replace(Element),
    /// No operand value can produce the known result.
    Empty,
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub enum Element {
    Int(IntConst),
    Float(FloatConst),
    Bool(BoolConst),
    MultiBit(MultiBit),
    MultiFloat(MultiFloat),
    IntInterval(IntInterval),
    FloatInterval(FloatInterval),
    Epsilon(EpsilonInterval),
    Mask(BitMask),
    MultiMask(MultiBitMask),
    Disjunction(Disjunction),
    Conjunction(Conjunction),
    Guard(Guard),
    Top(Top),
}

#[cold]
fn unsupported(element: &Element, what: &dyn Display) -> ! {
    panic!("operation {what} is not registered for {element}: incomplete domain contract")
}

// `From<Element> for SharedElement` is provided by the std blanket
// `impl<T> From<T> for Arc<T>`, which is identical to `Arc::new`.

// --- factories ---------------------------------------------------------

impl Element {
    pub fn char_element(value: i8) -> Element {
        Element::Int(IntConst::from_signed(IntKind::I8, value as i64))
    }

    pub fn uchar_element(value: u8) -> Element {
        Element::Int(IntConst::new(IntKind::U8, value as u64))
    }

    pub fn short_element(value: i16) -> Element {
        Element::Int(IntConst::from_signed(IntKind::I16, value as i64))
    }

    pub fn ushort_element(value: u16) -> Element {
        Element::Int(IntConst::new(IntKind::U16, value as u64))
    }

    pub fn int_element(value: i32) -> Element {
        Element::Int(IntConst::from_signed(IntKind::I32, value as i64))
    }

    pub fn uint_element(value: u32) -> Element {
        Element::Int(IntConst::new(IntKind::U32, value as u64))
    }

    pub fn long_element(value: i64) -> Element {
        Element::Int(IntConst::from_signed(IntKind::I64, value))
    }

    pub fn ulong_element(value: u64) -> Element {
        Element::Int(IntConst::new(IntKind::U64, value))
    }

    pub fn float_element(value: f32) -> Element {
        Element::Float(FloatConst::new(FloatKind::Single, value as f64))
    }

    pub fn double_element(value: f64) -> Element {
        Element::Float(FloatConst::new(FloatKind::Double, value))
    }

    pub fn long_double_element(value: f64) -> Element {
        Element::Float(FloatConst::new(FloatKind::Extended, value))
    }

    pub fn bool_element(value: bool) -> Element {
        Element::Bool(BoolConst::new(value))
    }

    pub fn int_const(kind: IntKind, raw: u64) -> Element {
        Element::Int(IntConst::new(kind, raw))
    }

    pub(crate) fn float_const(
        kind: FloatKind,
        value: f64,
        env: &mut EvaluationEnvironment,
    ) -> Element {
        let c = FloatConst::new(kind, value);
        if c.is_nan() {
            env.set_nan();
        }
        Element::Float(c)
    }

    pub(crate) fn float_range(lo: FloatConst, hi: FloatConst) -> Element {
        if lo == hi {
            Element::Float(lo)
        } else {
            Element::FloatInterval(FloatInterval::from_consts(lo, hi))
        }
    }

    /// The unconstrained element of a kind.
    pub fn undefined(kind: ScalarKind) -> Element {
        Element::Top(Top::new(kind))
    }

    pub fn from_init(init: crate::environment::Init) -> Result<Element, GamutError> {
        let kind = init.kind()?;
        match kind {
            ScalarKind::Integer(k) => Ok(match init.initial_value() {
                Some(v) => Element::Int(IntConst::new(k, v)),
                None => Element::Top(Top::int(k)),
            }),
            ScalarKind::MultiBit { bits, signed } => Ok(match init.initial_value() {
                Some(v) => Element::MultiBit(MultiBit::from_u64(bits, signed, v)),
                None => Element::Top(Top::new(kind)),
            }),
            _ => Err(GamutError::MissingBitSize),
        }
    }

    pub fn from_init_float(init: crate::environment::InitFloat) -> Result<Element, GamutError> {
        let format = init.format()?;
        Ok(match init.initial_value() {
            Some(v) => {
                let mut env = EvaluationEnvironment::new();
                Element::MultiFloat(MultiFloat::from_f64(format, v, &mut env))
            }
            None => Element::Top(Top::new(ScalarKind::MultiFloat(format))),
        })
    }
}

// --- shape accessors ----------------------------------------------------

impl Element {
    pub fn approx_kind(&self) -> ApproxKind {
        match self {
            Element::Int(_)
            | Element::Float(_)
            | Element::Bool(_)
            | Element::MultiBit(_)
            | Element::MultiFloat(_) => ApproxKind::Constant,
            Element::IntInterval(_) | Element::FloatInterval(_) | Element::Epsilon(_) => {
                ApproxKind::Interval
            }
            Element::Mask(_) | Element::MultiMask(_) => ApproxKind::BitMask,
            Element::Disjunction(_) => ApproxKind::Disjunction,
            Element::Conjunction(_) => ApproxKind::Conjunction,
            Element::Guard(_) => ApproxKind::Guard,
            Element::Top(_) => ApproxKind::Top,
        }
    }

    pub fn kind(&self) -> ScalarKind {
        match self {
            Element::Int(c) => ScalarKind::Integer(c.kind()),
            Element::Float(c) => ScalarKind::Float(c.kind()),
            Element::Bool(_) => ScalarKind::Boolean,
            Element::MultiBit(m) => ScalarKind::MultiBit {
                bits: m.bits(),
                signed: m.is_signed(),
            },
            Element::MultiFloat(m) => ScalarKind::MultiFloat(m.format()),
            Element::IntInterval(i) => i.kind(),
            Element::FloatInterval(i) => ScalarKind::Float(i.kind()),
            Element::Epsilon(e) => ScalarKind::Float(e.kind()),
            Element::Mask(m) => {
                ScalarKind::Integer(IntKind::new(m.bits(), false).expect("mask width fits"))
            }
            Element::MultiMask(m) => ScalarKind::MultiBit {
                bits: m.bits(),
                signed: false,
            },
            Element::Disjunction(d) => d.entries()[0].value().kind(),
            Element::Conjunction(c) => c.members()[0].kind(),
            Element::Guard(g) => g.then_value().kind(),
            Element::Top(t) => t.kind(),
        }
    }

    pub fn bit_size(&self) -> u32 {
        self.kind().bit_size()
    }

    /// Invariant check; holds before and after every operation.
    pub fn is_valid(&self) -> bool {
        match self {
            Element::Int(_)
            | Element::Float(_)
            | Element::Bool(_)
            | Element::MultiBit(_)
            | Element::MultiFloat(_)
            | Element::Top(_) => true,
            Element::IntInterval(i) => i.is_valid(),
            Element::FloatInterval(i) => i.is_valid(),
            Element::Epsilon(e) => e.is_valid(),
            Element::Mask(m) => m.is_valid(),
            Element::MultiMask(m) => m.is_valid(),
            Element::Disjunction(d) => d.is_valid(),
            Element::Conjunction(c) => c.is_valid(),
            Element::Guard(g) => g.is_valid(),
        }
    }

    pub(crate) fn is_boolean_like(&self) -> bool {
        matches!(self.kind(), ScalarKind::Boolean) || self.bit_size() == 1
    }

    /// The element read as a condition.
    pub(crate) fn truthiness(&self) -> Ternary {
        match self {
            Element::Int(c) => Ternary::from(!c.is_zero()),
            Element::Float(c) => Ternary::from(c.value() != 0.0),
            Element::Bool(b) => b.ternary(),
            Element::MultiBit(m) => Ternary::from(m.unsigned().bits() != 0),
            Element::MultiFloat(m) => Ternary::from(!m.is_zero()),
            Element::IntInterval(i) => i.truthiness(),
            Element::FloatInterval(i) => i.truthiness(),
            Element::Epsilon(e) => e.inflated().truthiness(),
            Element::Mask(m) => {
                let width = if m.bits() >= 64 {
                    u64::MAX
                } else {
                    (1u64 << m.bits()) - 1
                };
                if m.one_mask() != 0 {
                    Ternary::TRUE
                } else if m.zero_mask() == width {
                    Ternary::FALSE
                } else {
                    FlatLattice::Top
                }
            }
            Element::MultiMask(_) => FlatLattice::Top,
            Element::Disjunction(d) => d.truthiness(),
            Element::Conjunction(c) => {
                let mut env = EvaluationEnvironment::new();
                c.representative(&mut env).truthiness()
            }
            Element::Guard(g) => {
                let mut t = g.then_value().truthiness();
                t.join(&g.else_value().truthiness());
                t
            }
            Element::Top(_) => FlatLattice::Top,
        }
    }
}

// --- forward transfer ---------------------------------------------------

impl Element {
    /// Forward abstract transfer: mutate `self` into the operation's result.
    ///
    /// Returns `false` only to signal "not handled at this layer"; arithmetic
    /// conditions are reported through the environment's flags. Calling an
    /// operation a domain can never support (arithmetic on a bit mask) is a
    /// contract violation and panics.
    pub fn apply(&mut self, op: &ScalarOperation, env: &mut EvaluationEnvironment) -> bool {
        debug_assert!(self.is_valid(), "invalid element entering apply");
        trace!(element = %self, operation = %op, "apply");
        let handled = match op {
            ScalarOperation::Unary(u) => self.apply_unary(*u, env),
            ScalarOperation::Binary(b) => self.apply_binary(*b, env),
            ScalarOperation::Compare(c) => self.apply_compare(*c, env),
            ScalarOperation::Cast(target) => {
                *self = self.cast_element(target, env);
                true
            }
            ScalarOperation::Concat
            | ScalarOperation::Extract { .. }
            | ScalarOperation::ZeroExtend { .. }
            | ScalarOperation::SignExtend { .. } => self.apply_structural(op, env),
        };
        debug_assert!(self.is_valid(), "invalid element leaving apply");
        handled
    }

    fn apply_unary(&mut self, op: UnaryOp, env: &mut EvaluationEnvironment) -> bool {
        match self {
            Element::Int(c) => {
                c.apply_unary(op, env);
                true
            }
            Element::Float(c) => {
                c.apply_unary(op, env);
                true
            }
            Element::Bool(b) => {
                b.apply_unary(op);
                true
            }
            Element::MultiBit(m) => {
                m.apply_unary(op, env);
                true
            }
            Element::MultiFloat(m) => {
                m.apply_unary(op, env);
                true
            }
            Element::IntInterval(i) => {
                if let Some(replacement) = i.apply_unary(op, env) {
                    *self = replacement;
                }
                true
            }
            Element::FloatInterval(i) => {
                if let Some(replacement) = i.apply_unary(op, env) {
                    *self = replacement;
                }
                true
            }
            Element::Epsilon(e) => {
                if let Some(replacement) = e.apply_unary(op, env) {
                    *self = replacement;
                }
                true
            }
            Element::Disjunction(d) => d.apply_each(&op.into(), env),
            Element::Conjunction(c) => c.apply_each(&op.into(), env),
            Element::Guard(g) => g.apply_both(&op.into(), env),
            Element::Top(_) => true,
            Element::Mask(_) | Element::MultiMask(_) => unsupported(self, &op),
        }
    }

    fn apply_binary(&mut self, op: BinaryOp, env: &mut EvaluationEnvironment) -> bool {
        let Some(arg) = env.shared_argument(0) else {
            unsupported(self, &format_args!("{op} without an argument"));
        };
        if arg.approx_kind().rank() > self.approx_kind().rank() {
            return self.apply_binary_promoted(op, &arg, env);
        }
        if matches!(arg.as_ref(), Element::Mask(_) | Element::MultiMask(_)) {
            unsupported(self, &format_args!("{op} with a mask argument"));
        }
        match self {
            Element::Int(c) => match arg.as_ref() {
                Element::Int(rhs) => {
                    c.apply_binary(op, rhs, env);
                    true
                }
                _ => false,
            },
            Element::Float(c) => match arg.as_ref() {
                Element::Float(rhs) => {
                    c.apply_binary(op, rhs, env);
                    true
                }
                _ => false,
            },
            Element::Bool(b) => match arg.as_ref() {
                Element::Bool(rhs) => {
                    b.apply_binary(op, rhs);
                    true
                }
                _ => false,
            },
            Element::MultiBit(m) => match arg.as_ref() {
                Element::MultiBit(rhs) => {
                    m.apply_binary(op, rhs, env);
                    true
                }
                _ => false,
            },
            Element::MultiFloat(m) => match arg.as_ref() {
                Element::MultiFloat(rhs) => {
                    m.apply_binary(op, rhs, env);
                    true
                }
                _ => false,
            },
            Element::IntInterval(i) => {
                if let Some(replacement) = i.apply_binary(op, &arg, env) {
                    *self = replacement;
                }
                true
            }
            Element::FloatInterval(i) => {
                if let Some(replacement) = i.apply_binary(op, &arg, env) {
                    *self = replacement;
                }
                true
            }
            Element::Epsilon(e) => {
                if let Some(replacement) = e.apply_binary(op, &arg, env) {
                    *self = replacement;
                }
                true
            }
            Element::Disjunction(d) => d.apply_each(&op.into(), env),
            Element::Conjunction(c) => c.apply_each(&op.into(), env),
            Element::Guard(g) => g.apply_both(&op.into(), env),
            Element::Top(_) => true,
            Element::Mask(_) | Element::MultiMask(_) => unsupported(self, &op),
        }
    }

    /// The "apply to" rule: the argument outranks the receiver, so the
    /// computation happens in the argument's domain.
    fn apply_binary_promoted(
        &mut self,
        op: BinaryOp,
        arg: &SharedElement,
        env: &mut EvaluationEnvironment,
    ) -> bool {
        match arg.as_ref() {
            Element::Top(_) => {
                *self = Element::Top(Top::new(self.kind()));
                true
            }
            Element::IntInterval(_) | Element::FloatInterval(_) | Element::Epsilon(_) => {
                let promoted = match &*self {
                    Element::Int(_) | Element::MultiBit(_) => {
                        Element::IntInterval(IntInterval::degenerate(self.clone()))
                    }
                    Element::Float(c) => {
                        Element::FloatInterval(FloatInterval::degenerate(*c))
                    }
                    Element::Mask(_) | Element::MultiMask(_) => unsupported(self, &op),
                    _ => {
                        *self = Element::Top(Top::new(self.kind()));
                        return true;
                    }
                };
                *self = promoted;
                self.apply_binary(op, env)
            }
            Element::Disjunction(d) => {
                // distribute over the argument's alternatives
                let mut result: Option<Disjunction> = None;
                let mut handled = true;
                for entry in d.entries() {
                    let mut branch = self.clone();
                    let mut scratch = env.scratch_with_argument(entry.value().clone());
                    handled &= branch.apply(&op.into(), &mut scratch);
                    let dead = scratch.is_empty();
                    env.absorb_flags(&scratch);
                    if dead {
                        continue;
                    }
                    match &mut result {
                        None => result = Some(Disjunction::new(branch)),
                        Some(r) => r.merge_new(branch, DEFAULT_DISJUNCTION_LIMIT),
                    }
                }
                match result {
                    Some(r) => *self = Element::Disjunction(r),
                    None => env.set_empty(),
                }
                handled
            }
            Element::Conjunction(c) => {
                let mut scratch = env.scratch();
                let representative = c.representative(&mut scratch);
                env.absorb_flags(&scratch);
                let mut inner = env.scratch_with_argument(representative);
                let handled = self.apply(&op.into(), &mut inner);
                env.absorb_flags(&inner);
                handled
            }
            Element::Guard(g) => match g.resolved() {
                Some(branch) => {
                    let mut inner = env.scratch_with_argument(branch.clone());
                    let handled = self.apply(&op.into(), &mut inner);
                    env.absorb_flags(&inner);
                    handled
                }
                None => {
                    let result = g.map_branches(|branch| {
                        let mut out = self.clone();
                        let mut inner = env.scratch_with_argument(branch.clone());
                        out.apply(&op.into(), &mut inner);
                        out
                    });
                    *self = Element::Guard(result);
                    true
                }
            },
            Element::Mask(_) | Element::MultiMask(_) => {
                unsupported(arg, &format_args!("{op} with a mask argument"))
            }
            _ => unreachable!("promotion is only entered for higher-ranked arguments"),
        }
    }

    fn apply_compare(&mut self, op: CompareOp, env: &mut EvaluationEnvironment) -> bool {
        let Some(arg) = env.shared_argument(0) else {
            unsupported(self, &format_args!("{op} without an argument"));
        };
        let verdict = self.compare_ternary(op, &arg);
        *self = match verdict {
            Ternary::TRUE => Element::bool_element(true),
            Ternary::FALSE => Element::bool_element(false),
            _ => Element::Top(Top::boolean()),
        };
        true
    }

    /// Three-valued comparison of two elements.
    pub fn compare_ternary(&self, op: CompareOp, arg: &Element) -> Ternary {
        match (self, arg) {
            (Element::Top(_), _) | (_, Element::Top(_)) => FlatLattice::Top,
            (Element::Int(a), Element::Int(b)) => a.compare(op, b),
            (Element::Float(a), Element::Float(b)) => a.compare(op, b),
            (Element::Bool(a), Element::Bool(b)) => a.compare(op, b),
            (Element::MultiBit(a), Element::MultiBit(b)) => a.compare(op, b),
            (Element::MultiFloat(a), Element::MultiFloat(b)) => a.compare(op, b),
            (Element::IntInterval(i), _) => i.compare(op, arg),
            (Element::FloatInterval(i), _) => i.compare(op, arg),
            (Element::Epsilon(e), _) => e.base().compare(op, arg),
            // a swapped predicate accounts for the exchanged operand order
            (_, Element::IntInterval(b)) => b.compare(op.swap(), self),
            (_, Element::FloatInterval(b)) => b.compare(op.swap(), self),
            (_, Element::Epsilon(b)) => b.base().compare(op.swap(), self),
            (Element::Disjunction(d), _) => {
                let mut acc: Option<Ternary> = None;
                for entry in d.entries() {
                    let t = entry.value().compare_ternary(op, arg);
                    match &mut acc {
                        None => acc = Some(t),
                        Some(a) => a.join(&t),
                    }
                }
                acc.unwrap_or(FlatLattice::Top)
            }
            (_, Element::Disjunction(d)) => {
                let mut acc: Option<Ternary> = None;
                for entry in d.entries() {
                    let t = self.compare_ternary(op, entry.value());
                    match &mut acc {
                        None => acc = Some(t),
                        Some(a) => a.join(&t),
                    }
                }
                acc.unwrap_or(FlatLattice::Top)
            }
            (Element::Conjunction(c), _) => {
                let mut env = EvaluationEnvironment::new();
                c.representative(&mut env).compare_ternary(op, arg)
            }
            (_, Element::Conjunction(c)) => {
                let mut env = EvaluationEnvironment::new();
                self.compare_ternary(op, &c.representative(&mut env))
            }
            (Element::Guard(g), _) => {
                let mut t = g.then_value().compare_ternary(op, arg);
                t.join(&g.else_value().compare_ternary(op, arg));
                t
            }
            (_, Element::Guard(g)) => {
                let mut t = self.compare_ternary(op, g.then_value());
                t.join(&self.compare_ternary(op, g.else_value()));
                t
            }
            (Element::Mask(_) | Element::MultiMask(_), _)
            | (_, Element::Mask(_) | Element::MultiMask(_)) => {
                unsupported(self, &format_args!("comparison {op} on a mask"))
            }
            _ => FlatLattice::Top,
        }
    }

    /// The special scalar comparison: always-less / always-greater /
    /// always-equal, or unknown when overflow poisons both difference
    /// directions.
    pub fn compare_scalars(&self, other: &Element) -> ScalarOrder {
        let as_interval = |e: &Element| -> Option<IntInterval> {
            match e {
                Element::Int(_) | Element::MultiBit(_) => {
                    Some(IntInterval::degenerate(e.clone()))
                }
                Element::IntInterval(i) => Some(i.clone()),
                _ => None,
            }
        };
        match as_interval(self) {
            Some(lhs) => lhs.compare_scalars(other),
            None => ScalarOrder::Unknown,
        }
    }

    fn apply_structural(&mut self, op: &ScalarOperation, env: &mut EvaluationEnvironment) -> bool {
        match self {
            Element::Disjunction(d) => return d.apply_each(op, env),
            Element::Conjunction(c) => return c.apply_each(op, env),
            Element::Guard(g) => return g.apply_both(op, env),
            Element::Mask(_) | Element::MultiMask(_) => unsupported(self, op),
            _ => {}
        }
        match op {
            ScalarOperation::Concat => {
                let Some(arg) = env.shared_argument(0) else {
                    unsupported(self, &format_args!("{op} without an argument"));
                };
                let Some(low) = arg.as_multibit() else {
                    *self = Element::Top(Top::new(ScalarKind::MultiBit {
                        bits: self.bit_size() + arg.bit_size(),
                        signed: false,
                    }));
                    return true;
                };
                match self.as_multibit() {
                    Some(high) => {
                        *self = Element::MultiBit(high.concat(&low));
                        true
                    }
                    None => {
                        // interval receiver: concatenation is monotone in the
                        // high part for a fixed low part
                        if let Element::IntInterval(i) = self {
                            if let (Some(lo), Some(hi)) =
                                (i.min().as_multibit(), i.max().as_multibit())
                            {
                                let min = Element::MultiBit(lo.concat(&low));
                                let max = Element::MultiBit(hi.concat(&low));
                                if let Refinement::Replace(e) =
                                    IntInterval::try_from_bounds(min, max)
                                {
                                    *self = e;
                                    return true;
                                }
                            }
                        }
                        *self = Element::Top(Top::new(ScalarKind::MultiBit {
                            bits: self.bit_size() + arg.bit_size(),
                            signed: false,
                        }));
                        true
                    }
                }
            }
            ScalarOperation::Extract { low, width } => {
                match self.as_multibit() {
                    Some(m) if low + width <= m.bits() => {
                        *self = Element::MultiBit(m.extract(*low, *width));
                    }
                    _ => {
                        *self = Element::Top(Top::new(ScalarKind::MultiBit {
                            bits: *width,
                            signed: false,
                        }));
                    }
                }
                true
            }
            ScalarOperation::ZeroExtend { extra } | ScalarOperation::SignExtend { extra } => {
                let signed = matches!(op, ScalarOperation::SignExtend { .. });
                if let Element::IntInterval(i) = self {
                    // sign extension preserves the signed order; zero
                    // extension preserves the unsigned one
                    let widen = |e: &Element| -> Option<Element> {
                        let m = e.as_multibit()?;
                        Some(Element::MultiBit(if signed {
                            m.sign_extend(*extra)
                        } else {
                            m.zero_extend(*extra)
                        }))
                    };
                    if let (Some(min), Some(max)) = (widen(i.min()), widen(i.max())) {
                        if let Refinement::Replace(e) = IntInterval::try_from_bounds(min, max) {
                            *self = e;
                            return true;
                        }
                    }
                    let bits = self.bit_size() + extra;
                    *self = Element::IntInterval(IntInterval::full_range_wide(bits, signed));
                    return true;
                }
                match self.as_multibit() {
                    Some(m) => {
                        *self = Element::MultiBit(if signed {
                            m.sign_extend(*extra)
                        } else {
                            m.zero_extend(*extra)
                        });
                    }
                    None => {
                        let bits = self.bit_size() + extra;
                        *self = Element::Top(Top::new(ScalarKind::MultiBit { bits, signed }));
                    }
                }
                true
            }
            _ => unreachable!("apply_structural only receives structural operations"),
        }
    }

    /// View a constant as a multi-bit word array, converting native
    /// constants on the fly.
    fn as_multibit(&self) -> Option<MultiBit> {
        match self {
            Element::MultiBit(m) => Some(m.clone()),
            Element::Int(c) => {
                let mut env = EvaluationEnvironment::new();
                match c.cast(
                    &CastOp::MultiBit {
                        bits: c.kind().bits(),
                        signed: c.kind().is_signed(),
                    },
                    &mut env,
                ) {
                    Element::MultiBit(m) => Some(m),
                    _ => None,
                }
            }
            _ => None,
        }
    }

    /// Conversion into another scalar kind, leaving `self` untouched.
    pub(crate) fn cast_element(
        &self,
        target: &CastOp,
        env: &mut EvaluationEnvironment,
    ) -> Element {
        match self {
            Element::Int(c) => c.cast(target, env),
            Element::Float(c) => c.cast(target, env),
            Element::Bool(b) => b.cast(target, env),
            Element::MultiBit(m) => m.cast(target, env),
            Element::MultiFloat(m) => m.cast(target, env),
            Element::IntInterval(i) => i.cast(target, env),
            Element::FloatInterval(i) => i.cast(target, env),
            Element::Epsilon(e) => e.inflated().cast(target, env),
            Element::Disjunction(d) => {
                let mut out: Option<Disjunction> = None;
                for entry in d.entries() {
                    let cast = entry.value().cast_element(target, env);
                    match &mut out {
                        None => out = Some(Disjunction::new(cast)),
                        Some(o) => o.merge_new(cast, DEFAULT_DISJUNCTION_LIMIT),
                    }
                }
                match out {
                    Some(o) => Element::Disjunction(o),
                    None => Element::Top(Top::new(self.kind())),
                }
            }
            Element::Conjunction(c) => {
                let mut scratch = env.scratch();
                let rep = c.representative(&mut scratch);
                env.absorb_flags(&scratch);
                rep.cast_element(target, env)
            }
            Element::Guard(g) => {
                let cast = g.map_branches(|b| {
                    let mut scratch = env.scratch();
                    b.cast_element(target, &mut scratch)
                });
                Element::Guard(cast)
            }
            Element::Top(t) => t.cast(target),
            Element::Mask(_) | Element::MultiMask(_) => unsupported(self, target),
        }
    }
}

// --- backward transfer --------------------------------------------------

impl Element {
    /// Backward abstract transfer: narrow `self`, an operand of `op`, given
    /// the operation's known result and (for binary operations) the other
    /// operand. Returns `false` when the operation has no inverse at this
    /// layer.
    pub fn constrain(
        &mut self,
        op: &ScalarOperation,
        result: &Element,
        other: Option<&Element>,
        env: &mut ConstraintEnvironment,
    ) -> bool {
        debug_assert!(self.is_valid(), "invalid element entering constrain");
        trace!(element = %self, operation = %op, "constrain");
        if matches!(self, Element::Mask(_) | Element::MultiMask(_)) {
            unsupported(self, &format_args!("constraint through {op}"));
        }
        if let Element::Disjunction(d) = self {
            let mut survivors: Vec<Element> = Vec::with_capacity(d.len());
            let mut handled = true;
            for entry in d.entries() {
                let mut value = entry.value().clone();
                let mut inner = ConstraintEnvironment::new(env.argument());
                handled &= value.constrain(op, result, other, &mut inner);
                if !inner.is_empty() {
                    survivors.push(value);
                }
            }
            match Disjunction::from_alternatives(survivors) {
                Ok(refined) => *self = Element::Disjunction(refined),
                Err(_) => env.set_empty(),
            }
            return handled;
        }
        match op {
            ScalarOperation::Compare(c) => self.constrain_compare(*c, result, other, env),
            ScalarOperation::Binary(b) => self.constrain_binary(*b, result, other, env),
            ScalarOperation::Unary(u) => self.constrain_unary(*u, result, env),
            ScalarOperation::Cast(target) => self.constrain_cast(target, result, env),
            _ => false,
        }
    }

    fn constrain_compare(
        &mut self,
        op: CompareOp,
        result: &Element,
        other: Option<&Element>,
        env: &mut ConstraintEnvironment,
    ) -> bool {
        let Some(other) = other else {
            return false;
        };
        let effective = match result.truthiness() {
            Ternary::TRUE => op,
            Ternary::FALSE => op.negate(),
            _ => return true, // an unknown outcome refines nothing
        };
        let effective = if env.argument().is_direct() {
            effective
        } else {
            effective.swap()
        };
        let candidate = match &*self {
            Element::Int(a) => match other {
                Element::Int(b) => a.refine_compare(effective, b),
                _ => IntInterval::refine_compare(
                    effective,
                    other,
                    &IntInterval::degenerate(self.clone()),
                ),
            },
            Element::MultiBit(a) => match other {
                Element::MultiBit(b) => a.refine_compare(effective, b),
                _ => IntInterval::refine_compare(
                    effective,
                    other,
                    &IntInterval::degenerate(self.clone()),
                ),
            },
            Element::IntInterval(i) => IntInterval::refine_compare(effective, other, i),
            Element::Float(a) => match other {
                Element::Float(b) => a.refine_compare(effective, b),
                _ => FloatInterval::refine_compare(effective, other, a.kind()),
            },
            Element::FloatInterval(i) => {
                FloatInterval::refine_compare(effective, other, i.kind())
            }
            Element::Bool(b) => match other {
                Element::Bool(o) => b.refine_compare(effective, o),
                _ => Refinement::Keep,
            },
            // an unconstrained operand narrows straight to the predicate's
            // solution set
            Element::Top(t) => match t.kind() {
                ScalarKind::Integer(k) => IntInterval::refine_compare(
                    effective,
                    other,
                    &IntInterval::full_range(k),
                ),
                ScalarKind::MultiBit { bits, signed } => IntInterval::refine_compare(
                    effective,
                    other,
                    &IntInterval::full_range_wide(bits, signed),
                ),
                ScalarKind::Float(k) => FloatInterval::refine_compare(effective, other, k),
                _ => Refinement::Keep,
            },
            _ => Refinement::Keep,
        };
        self.apply_refinement(candidate, env)
    }

    fn constrain_binary(
        &mut self,
        op: BinaryOp,
        result: &Element,
        other: Option<&Element>,
        env: &mut ConstraintEnvironment,
    ) -> bool {
        let Some(other) = other else {
            return false;
        };
        let role = env.argument();
        // all-constant operands get the exact per-domain inverses
        let candidate = match (&*self, result, other) {
            (Element::Int(a), Element::Int(r), Element::Int(b)) => {
                a.refine_binary(op, r, b, role)
            }
            (Element::Float(a), Element::Float(r), Element::Float(b)) => {
                a.refine_binary(op, r, b, role)
            }
            (Element::MultiBit(a), Element::MultiBit(r), Element::MultiBit(b)) => {
                a.refine_binary(op, r, b, role)
            }
            (Element::MultiFloat(a), Element::MultiFloat(r), Element::MultiFloat(b)) => {
                a.refine_binary(op, r, b, role)
            }
            _ => match op {
                // the additive preimage works on any operand shapes through
                // the forward interval transfer
                BinaryOp::Plus => Self::additive_preimage(result, other, BinaryOp::Minus),
                BinaryOp::Minus => {
                    if role.is_direct() {
                        Self::additive_preimage(result, other, BinaryOp::Plus)
                    } else {
                        Self::additive_preimage(other, result, BinaryOp::Minus)
                    }
                }
                BinaryOp::BitXor => Self::additive_preimage(result, other, BinaryOp::BitXor),
                _ => Refinement::Keep,
            },
        };
        self.apply_refinement(candidate, env)
    }

    fn additive_preimage(lhs: &Element, rhs: &Element, inverse: BinaryOp) -> Refinement {
        let mut candidate = lhs.clone();
        let mut env = EvaluationEnvironment::binary(rhs.clone());
        candidate.apply(&inverse.into(), &mut env);
        if env.is_overflow() || env.is_empty() {
            Refinement::Keep
        } else {
            Refinement::Replace(candidate)
        }
    }

    fn constrain_unary(
        &mut self,
        op: UnaryOp,
        result: &Element,
        env: &mut ConstraintEnvironment,
    ) -> bool {
        let candidate = match op {
            UnaryOp::Opposite | UnaryOp::BitNegate => {
                // involutions: the preimage is the image
                let mut candidate = result.clone();
                let mut scratch = EvaluationEnvironment::new();
                candidate.apply(&op.into(), &mut scratch);
                if scratch.is_overflow() {
                    Refinement::Keep
                } else {
                    Refinement::Replace(candidate)
                }
            }
            UnaryOp::Increment | UnaryOp::Decrement => {
                let inverse = if op == UnaryOp::Increment {
                    UnaryOp::Decrement
                } else {
                    UnaryOp::Increment
                };
                let mut candidate = result.clone();
                let mut scratch = EvaluationEnvironment::new();
                candidate.apply(&inverse.into(), &mut scratch);
                if scratch.is_overflow() {
                    Refinement::Keep
                } else {
                    Refinement::Replace(candidate)
                }
            }
            UnaryOp::LogicalNot => match result.truthiness() {
                Ternary::TRUE => match self.kind() {
                    ScalarKind::Integer(k) => Refinement::Replace(Element::Int(IntConst::zero(k))),
                    ScalarKind::Boolean => Refinement::Replace(Element::bool_element(false)),
                    _ => Refinement::Keep,
                },
                Ternary::FALSE => match self.kind() {
                    ScalarKind::Integer(k) if !k.is_signed() => {
                        IntInterval::try_range(k, 1, k.max_value())
                    }
                    ScalarKind::Boolean => Refinement::Replace(Element::bool_element(true)),
                    _ => Refinement::Keep,
                },
                _ => Refinement::Keep,
            },
        };
        self.apply_refinement(candidate, env)
    }

    fn constrain_cast(
        &mut self,
        target: &CastOp,
        result: &Element,
        env: &mut ConstraintEnvironment,
    ) -> bool {
        let own_cast = match self.kind() {
            ScalarKind::Integer(k) => CastOp::Int(k),
            ScalarKind::Float(k) => CastOp::Float(k),
            ScalarKind::Boolean => CastOp::Bool,
            ScalarKind::MultiBit { bits, signed } => CastOp::MultiBit { bits, signed },
            ScalarKind::MultiFloat(format) => CastOp::MultiFloat(format),
        };
        // narrowing integer casts pin the low bits of the operand
        if let (ScalarKind::Integer(own), CastOp::Int(t), Element::Int(r)) =
            (self.kind(), target, result)
        {
            if t.bits() < own.bits() {
                let low = t.mask();
                let candidate =
                    BitMask::new(own.bits(), r.unsigned() & low, !r.unsigned() & low)
                        .map(Element::Mask)
                        .map(Refinement::Replace)
                        .unwrap_or(Refinement::Keep);
                return self.apply_refinement(candidate, env);
            }
        }
        // otherwise: cast the result back and check it round-trips
        let mut back_env = EvaluationEnvironment::new();
        let candidate = result.cast_element(&own_cast, &mut back_env);
        let mut forward_env = EvaluationEnvironment::new();
        let forward = candidate.cast_element(target, &mut forward_env);
        let refinement = if back_env.has_evaluation_error() {
            Refinement::Keep
        } else if &forward == result {
            Refinement::Replace(candidate)
        } else {
            Refinement::Keep
        };
        self.apply_refinement(refinement, env)
    }

    fn apply_refinement(
        &mut self,
        refinement: Refinement,
        env: &mut ConstraintEnvironment,
    ) -> bool {
        match refinement {
            Refinement::Keep => true,
            Refinement::Empty => {
                env.set_empty();
                true
            }
            Refinement::Replace(candidate) => {
                let mut meet_env = EvaluationEnvironment::new();
                self.intersect_with(&candidate, &mut meet_env);
                if meet_env.is_empty() {
                    env.set_empty();
                }
                true
            }
        }
    }
}

// --- lattice operations -------------------------------------------------

impl Element {
    /// Lattice meet: narrow `self` to the overlap with `other`. A provably
    /// empty overlap flags the environment (bottom), never an error.
    pub fn intersect_with(&mut self, other: &Element, env: &mut EvaluationEnvironment) -> bool {
        debug_assert!(self.is_valid(), "invalid element entering intersect_with");
        trace!(element = %self, other = %other, "meet");
        if matches!(other, Element::Top(_)) {
            return true;
        }
        // a mask argument stamps its knowledge onto the receiver
        if let Element::Mask(o) = other {
            if let Element::Mask(m) = self {
                if m.meet_mask(o).is_empty() {
                    env.set_empty();
                }
                return true;
            }
            if matches!(self, Element::MultiMask(_)) {
                return false;
            }
            o.intersect_with_into(self, env);
            return true;
        }
        if let Element::MultiMask(o) = other {
            if let Element::MultiMask(m) = self {
                if m.meet_mask(o).is_empty() {
                    env.set_empty();
                }
                return true;
            }
            if matches!(self, Element::Mask(_)) {
                return false;
            }
            o.intersect_with_into(self, env);
            return true;
        }
        if matches!(self, Element::Mask(_) | Element::MultiMask(_)) {
            unsupported(self, &"meet of a mask with a value (stamp the value instead)");
        }
        if matches!(self, Element::Top(_)) {
            *self = other.clone();
            return true;
        }
        if let Element::Disjunction(d) = self {
            d.intersect_each(other, env);
            return true;
        }
        if let Element::Conjunction(c) = self {
            c.intersect_each(other, env);
            return true;
        }
        if matches!(self, Element::Guard(_)) {
            return self.intersect_guard(other, env);
        }
        // the receiver is a constant or interval from here on
        if let Element::Disjunction(d) = other {
            let mut refined = d.clone();
            refined.intersect_each(self, env);
            if !env.is_empty() {
                *self = match refined.len() {
                    1 => refined.entries()[0].value().clone(),
                    _ => Element::Disjunction(refined),
                };
            }
            return true;
        }
        if let Element::Conjunction(c) = other {
            let members = c.members().to_vec();
            for member in &members {
                self.intersect_with(member, env);
                if env.is_empty() {
                    return true;
                }
            }
            return true;
        }
        if let Element::Guard(g) = other {
            return match g.resolved() {
                Some(branch) => self.intersect_with(&branch.clone(), env),
                None => true,
            };
        }
        if let Element::IntInterval(i) = self {
            let handled = i.intersect(other, env);
            if let Some(c) = i.as_degenerate() {
                *self = c.clone();
            }
            return handled;
        }
        if let Element::FloatInterval(i) = self {
            let handled = i.intersect(other, env);
            if let Some(c) = i.as_degenerate() {
                *self = Element::Float(*c);
            }
            return handled;
        }
        if let Element::Epsilon(e) = self {
            return e.intersect(other, env);
        }
        // the receiver is a constant
        match other {
            Element::IntInterval(i) => {
                if !i.contains_element(self) {
                    env.set_empty();
                }
                true
            }
            Element::FloatInterval(i) => {
                if !i.contains_element(self) {
                    env.set_empty();
                }
                true
            }
            Element::Epsilon(e) => {
                if !e.contains_element(self) {
                    env.set_empty();
                }
                true
            }
            other => {
                if *self == *other {
                    true
                } else if self.kind() == other.kind() {
                    env.set_empty();
                    true
                } else {
                    false
                }
            }
        }
    }

    fn intersect_guard(&mut self, other: &Element, env: &mut EvaluationEnvironment) -> bool {
        let Element::Guard(g) = &*self else {
            unreachable!("intersect_guard is only called on guards");
        };
        let mut then_env = env.scratch();
        let mut else_env = env.scratch();
        let mut then_branch = g.then_value().clone();
        let mut else_branch = g.else_value().clone();
        then_branch.intersect_with(other, &mut then_env);
        else_branch.intersect_with(other, &mut else_env);
        let condition = g.shared_condition();
        match (then_env.is_empty(), else_env.is_empty()) {
            (true, true) => env.set_empty(),
            // a dead branch resolves the pairing
            (true, false) => *self = else_branch,
            (false, true) => *self = then_branch,
            (false, false) => {
                if let Ok(refined) = Guard::new(condition, then_branch, else_branch) {
                    *self = Element::Guard(refined);
                }
            }
        }
        true
    }

    /// Lattice join: widen `self` to cover both operands.
    pub fn merge_with(&mut self, other: &Element, env: &mut EvaluationEnvironment) -> bool {
        debug_assert!(self.is_valid(), "invalid element entering merge_with");
        trace!(element = %self, other = %other, "join");
        if matches!(self, Element::Mask(_) | Element::MultiMask(_))
            || matches!(other, Element::Mask(_) | Element::MultiMask(_))
        {
            unsupported(self, &"join on a mask refinement");
        }
        if matches!(self, Element::Top(_)) {
            return true;
        }
        if matches!(other, Element::Top(_)) {
            *self = Element::Top(Top::new(self.kind()));
            return true;
        }
        if let Element::Disjunction(d) = self {
            d.merge(other, DEFAULT_DISJUNCTION_LIMIT);
            return true;
        }
        if matches!(self, Element::Guard(_)) {
            let Element::Guard(g) = &*self else { unreachable!() };
            let widened = g.map_branches(|branch| {
                let mut out = branch.clone();
                let mut scratch = env.scratch();
                out.merge_with(other, &mut scratch);
                out
            });
            *self = Element::Guard(widened);
            return true;
        }
        if matches!(self, Element::Conjunction(_)) {
            let rep = {
                let Element::Conjunction(c) = &*self else { unreachable!() };
                let mut scratch = env.scratch();
                let rep = c.representative(&mut scratch);
                env.absorb_flags(&scratch);
                rep
            };
            *self = rep;
            return self.merge_with(other, env);
        }
        match other {
            Element::Disjunction(o) => {
                let mut d = Disjunction::new(self.clone());
                d.merge(&Element::Disjunction(o.clone()), DEFAULT_DISJUNCTION_LIMIT);
                *self = Element::Disjunction(d);
                return true;
            }
            Element::Guard(o) => {
                let mut joined = o.then_value().clone();
                joined.merge_with(o.else_value(), env);
                return self.merge_with(&joined, env);
            }
            Element::Conjunction(o) => {
                let mut scratch = env.scratch();
                let rep = o.representative(&mut scratch);
                env.absorb_flags(&scratch);
                return self.merge_with(&rep, env);
            }
            _ => {}
        }
        if let Element::IntInterval(i) = self {
            if !i.merge(other) {
                *self = Element::Top(Top::new(self.kind()));
            }
            return true;
        }
        if let Element::FloatInterval(i) = self {
            if !i.merge(other) {
                *self = Element::Top(Top::new(ScalarKind::Float(i.kind())));
            }
            return true;
        }
        if let Element::Epsilon(e) = self {
            if !e.merge(other) {
                *self = Element::Top(Top::new(self.kind()));
            }
            return true;
        }
        // the receiver is a constant
        match other {
            Element::IntInterval(i) => {
                let mut widened = i.clone();
                if widened.merge(self) {
                    *self = Element::IntInterval(widened);
                } else {
                    *self = Element::Top(Top::new(self.kind()));
                }
                true
            }
            Element::FloatInterval(i) => {
                let mut widened = i.clone();
                if widened.merge(self) {
                    *self = Element::FloatInterval(widened);
                } else {
                    *self = Element::Top(Top::new(self.kind()));
                }
                true
            }
            Element::Epsilon(e) => {
                let mut widened = e.clone();
                if widened.merge(self) {
                    *self = Element::Epsilon(widened);
                } else {
                    *self = Element::Top(Top::new(self.kind()));
                }
                true
            }
            other if *self == *other => true,
            Element::Int(b) => match &*self {
                Element::Int(a) if a.kind() == b.kind() => {
                    // two distinct constants join into their envelope interval
                    let mut interval = IntInterval::degenerate(self.clone());
                    interval.merge(other);
                    *self = Element::IntInterval(interval);
                    true
                }
                _ => false,
            },
            Element::MultiBit(b) => match &*self {
                Element::MultiBit(a) if a.bits() == b.bits() && a.is_signed() == b.is_signed() => {
                    let mut interval = IntInterval::degenerate(self.clone());
                    interval.merge(other);
                    *self = Element::IntInterval(interval);
                    true
                }
                _ => false,
            },
            Element::Float(b) => match &*self {
                Element::Float(a) if a.kind() == b.kind() => {
                    if a.is_nan() || b.is_nan() {
                        *self = Element::Top(Top::new(self.kind()));
                    } else {
                        let mut interval = FloatInterval::degenerate(*a);
                        interval.merge(other);
                        *self = Element::FloatInterval(interval);
                    }
                    true
                }
                _ => false,
            },
            Element::MultiFloat(_) | Element::Bool(_) => {
                if self.kind() == other.kind() {
                    *self = Element::Top(Top::new(self.kind()));
                    true
                } else {
                    false
                }
            }
            _ => false,
        }
    }

    /// Lattice order test: is `other` covered by `self`?
    pub fn contains(&self, other: &Element) -> bool {
        match self {
            Element::Top(t) => t.contains_element(other),
            Element::IntInterval(i) => i.contains_element(other),
            Element::FloatInterval(i) => i.contains_element(other),
            Element::Epsilon(e) => e.contains_element(other),
            Element::Disjunction(d) => d.contains_element(other),
            Element::Conjunction(c) => c.contains_element(other),
            Element::Guard(g) => g.contains_element(other),
            Element::Mask(m) => m.contains_element(other),
            Element::MultiMask(m) => m.contains_element(other),
            _ => match other {
                Element::IntInterval(i) => i
                    .as_degenerate()
                    .is_some_and(|c| c == self),
                Element::FloatInterval(i) => i
                    .as_degenerate()
                    .is_some_and(|c| Element::Float(*c) == *self),
                other => self == other,
            },
        }
    }
}

// --- introspection ------------------------------------------------------

/// Sign classification of an element's concretization.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum SignClass {
    Zero,
    Positive,
    Negative,
    Mixed,
}

/// Typed answers to [`QueryOperation`]s.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryAnswer {
    Bounds {
        min: SharedElement,
        max: SharedElement,
    },
    Sign(SignClass),
    FloatClass(FlatLattice<FloatClass>),
    KnownBits(SharedElement),
    Simplified(SharedElement),
    Disjunction(SharedElement),
    Unknown,
}

impl Element {
    /// Introspective query. Never mutates and never fails: a domain that
    /// cannot interpret the question answers [`QueryAnswer::Unknown`].
    pub fn query(&self, operation: &QueryOperation) -> QueryAnswer {
        match operation {
            QueryOperation::Bounds => self.query_bounds(),
            QueryOperation::Sign => QueryAnswer::Sign(self.query_sign()),
            QueryOperation::FloatClass => self.query_float_class(),
            QueryOperation::KnownBits => self.query_known_bits(),
            QueryOperation::Simplify => self.query_simplified(),
            QueryOperation::ToDisjunction => self.query_disjunction(),
        }
    }

    fn query_bounds(&self) -> QueryAnswer {
        match self {
            Element::Int(_) | Element::Float(_) | Element::Bool(_) | Element::MultiBit(_) => {
                QueryAnswer::Bounds {
                    min: self.clone().into(),
                    max: self.clone().into(),
                }
            }
            Element::IntInterval(i) => QueryAnswer::Bounds {
                min: i.min().clone().into(),
                max: i.max().clone().into(),
            },
            Element::FloatInterval(i) => QueryAnswer::Bounds {
                min: Element::Float(*i.min()).into(),
                max: Element::Float(*i.max()).into(),
            },
            Element::Epsilon(e) => {
                let inflated = e.inflated();
                QueryAnswer::Bounds {
                    min: Element::Float(*inflated.min()).into(),
                    max: Element::Float(*inflated.max()).into(),
                }
            }
            Element::Disjunction(d) => d.envelope().query_bounds(),
            Element::Conjunction(c) => {
                let mut env = EvaluationEnvironment::new();
                c.representative(&mut env).query_bounds()
            }
            Element::Guard(g) => {
                let mut joined = g.then_value().clone();
                let mut env = EvaluationEnvironment::new();
                joined.merge_with(g.else_value(), &mut env);
                joined.query_bounds()
            }
            _ => QueryAnswer::Unknown,
        }
    }

    fn query_sign(&self) -> SignClass {
        let truth = self.truthiness();
        if truth.is_false() {
            return SignClass::Zero;
        }
        let negative = match self {
            Element::Int(c) => Ternary::from(c.is_negative()),
            Element::Float(c) => Ternary::from(c.value() < 0.0),
            Element::MultiBit(m) => Ternary::from(m.is_negative()),
            Element::MultiFloat(m) => Ternary::from(m.sign() && !m.is_zero()),
            Element::Bool(_) => Ternary::FALSE,
            Element::IntInterval(i) => i.compare(CompareOp::Less, &zero_of(self.kind())),
            Element::FloatInterval(i) => {
                if i.max().value() < 0.0 {
                    Ternary::TRUE
                } else if i.min().value() >= 0.0 {
                    Ternary::FALSE
                } else {
                    FlatLattice::Top
                }
            }
            _ => FlatLattice::Top,
        };
        match (negative, truth) {
            (Ternary::TRUE, _) => SignClass::Negative,
            (Ternary::FALSE, Ternary::TRUE) => SignClass::Positive,
            _ => SignClass::Mixed,
        }
    }

    fn query_float_class(&self) -> QueryAnswer {
        match self {
            Element::Float(c) => QueryAnswer::FloatClass(FlatLattice::Value(c.classify())),
            Element::MultiFloat(m) => QueryAnswer::FloatClass(FlatLattice::Value(m.classify())),
            Element::FloatInterval(i) => match i.as_degenerate() {
                Some(c) => QueryAnswer::FloatClass(FlatLattice::Value(c.classify())),
                None => QueryAnswer::FloatClass(FlatLattice::Top),
            },
            _ => QueryAnswer::Unknown,
        }
    }

    fn query_known_bits(&self) -> QueryAnswer {
        match self {
            Element::Int(c) => {
                QueryAnswer::KnownBits(Element::Mask(BitMask::from_constant(c)).into())
            }
            Element::MultiBit(m) => {
                QueryAnswer::KnownBits(Element::MultiMask(MultiBitMask::from_constant(m)).into())
            }
            Element::Mask(_) | Element::MultiMask(_) => {
                QueryAnswer::KnownBits(self.clone().into())
            }
            Element::IntInterval(i) => {
                // the bits above the highest differing bound bit are fixed
                if let (Element::Int(lo), Element::Int(hi)) = (i.min(), i.max()) {
                    if !lo.kind().is_signed() {
                        let diff = lo.unsigned() ^ hi.unsigned();
                        let known = if diff == 0 {
                            lo.kind().mask()
                        } else {
                            let top = 63 - diff.leading_zeros();
                            if top >= 63 {
                                0
                            } else {
                                !((1u64 << (top + 1)) - 1) & lo.kind().mask()
                            }
                        };
                        if let Ok(mask) = BitMask::new(
                            lo.kind().bits(),
                            lo.unsigned() & known,
                            !lo.unsigned() & known,
                        ) {
                            return QueryAnswer::KnownBits(Element::Mask(mask).into());
                        }
                    }
                }
                QueryAnswer::Unknown
            }
            _ => QueryAnswer::Unknown,
        }
    }

    fn query_simplified(&self) -> QueryAnswer {
        match self {
            Element::IntInterval(i) => match i.as_degenerate() {
                Some(c) => QueryAnswer::Simplified(c.clone().into()),
                None => QueryAnswer::Unknown,
            },
            Element::FloatInterval(i) => match i.as_degenerate() {
                Some(c) => QueryAnswer::Simplified(Element::Float(*c).into()),
                None => QueryAnswer::Unknown,
            },
            Element::Disjunction(d) => {
                if d.len() == 1 {
                    QueryAnswer::Simplified(d.entries()[0].value().clone().into())
                } else {
                    QueryAnswer::Unknown
                }
            }
            Element::Mask(m) => match self.kind() {
                ScalarKind::Integer(k) => match m.as_constant(k) {
                    Some(c) => QueryAnswer::Simplified(Element::Int(c).into()),
                    None => QueryAnswer::Unknown,
                },
                _ => QueryAnswer::Unknown,
            },
            Element::MultiMask(m) => match m.as_constant() {
                Some(c) => QueryAnswer::Simplified(Element::MultiBit(c).into()),
                None => QueryAnswer::Unknown,
            },
            Element::Guard(g) => match g.resolved() {
                Some(branch) => QueryAnswer::Simplified(branch.clone().into()),
                None => QueryAnswer::Unknown,
            },
            _ => QueryAnswer::Unknown,
        }
    }

    fn query_disjunction(&self) -> QueryAnswer {
        const ENUMERATION_LIMIT: u64 = 16;
        match self {
            Element::IntInterval(i) => {
                // small native ranges enumerate their members
                if let (Element::Int(lo), Element::Int(hi)) = (i.min(), i.max()) {
                    let kind = lo.kind();
                    let (start, count) = if kind.is_signed() {
                        let width = hi.signed().wrapping_sub(lo.signed());
                        (lo.signed() as u64, width as u64)
                    } else {
                        (lo.unsigned(), hi.unsigned() - lo.unsigned())
                    };
                    if count < ENUMERATION_LIMIT {
                        let alternatives = (0..=count)
                            .map(|offset| {
                                Element::Int(IntConst::new(kind, start.wrapping_add(offset)))
                            })
                            .collect();
                        if let Ok(d) = Disjunction::from_alternatives(alternatives) {
                            return QueryAnswer::Disjunction(Element::Disjunction(d).into());
                        }
                    }
                }
                QueryAnswer::Disjunction(
                    Element::Disjunction(Disjunction::new(self.clone())).into(),
                )
            }
            Element::Disjunction(_) => QueryAnswer::Disjunction(self.clone().into()),
            Element::Top(_) => QueryAnswer::Unknown,
            _ => QueryAnswer::Disjunction(
                Element::Disjunction(Disjunction::new(self.clone())).into(),
            ),
        }
    }
}

fn zero_of(kind: ScalarKind) -> Element {
    match kind {
        ScalarKind::Integer(k) => Element::Int(IntConst::zero(k)),
        ScalarKind::Float(k) => Element::Float(FloatConst::new(k, 0.0)),
        ScalarKind::Boolean => Element::bool_element(false),
        ScalarKind::MultiBit { bits, signed } => Element::MultiBit(MultiBit::zero(bits, signed)),
        ScalarKind::MultiFloat(format) => Element::MultiFloat(MultiFloat::zero(format, false)),
    }
}

impl Display for Element {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Element::Int(c) => write!(f, "Const {c}"),
            Element::Float(c) => write!(f, "Const {c}"),
            Element::Bool(b) => write!(f, "Const {b}"),
            Element::MultiBit(m) => write!(f, "Const {m}"),
            Element::MultiFloat(m) => write!(f, "Const {m}"),
            Element::IntInterval(i) => write!(f, "{i}"),
            Element::FloatInterval(i) => write!(f, "{i}"),
            Element::Epsilon(e) => write!(f, "{e}"),
            Element::Mask(m) => write!(f, "{m}"),
            Element::MultiMask(m) => write!(f, "{m}"),
            Element::Disjunction(d) => write!(f, "{d}"),
            Element::Conjunction(c) => write!(f, "{c}"),
            Element::Guard(g) => write!(f, "{g}"),
            Element::Top(t) => write!(f, "{t}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plus_constants() {
        let mut a = Element::int_element(5);
        let mut env = EvaluationEnvironment::binary(Element::int_element(3));
        assert!(a.apply(&BinaryOp::Plus.into(), &mut env));
        assert_eq!(a, Element::int_element(8));
        assert!(!env.has_evaluation_error());
    }

    #[test]
    fn test_display_renderings() {
        assert_eq!(Element::int_element(5).to_string(), "Const s32 5");
        assert_eq!(Element::bool_element(true).to_string(), "Const bool true");
        assert_eq!(
            Element::undefined(ScalarKind::Integer(IntKind::I32)).to_string(),
            "Top s32"
        );
    }

    #[test]
    fn test_promotion_constant_meets_interval() {
        let interval = Element::IntInterval(
            IntInterval::new(Element::int_element(1), Element::int_element(10)).unwrap(),
        );
        let mut a = Element::int_element(5);
        let mut env = EvaluationEnvironment::binary(interval);
        assert!(a.apply(&BinaryOp::Plus.into(), &mut env));
        match a {
            Element::IntInterval(i) => {
                assert_eq!(i.min(), &Element::int_element(6));
                assert_eq!(i.max(), &Element::int_element(15));
            }
            other => panic!("expected an interval, got {other}"),
        }
    }

    #[test]
    fn test_top_absorbs() {
        let mut a = Element::int_element(5);
        let mut env =
            EvaluationEnvironment::binary(Element::undefined(ScalarKind::Integer(IntKind::I32)));
        assert!(a.apply(&BinaryOp::Plus.into(), &mut env));
        assert!(matches!(a, Element::Top(_)));
    }

    #[test]
    fn test_compare_produces_boolean() {
        let mut a = Element::int_element(3);
        let mut env = EvaluationEnvironment::binary(Element::int_element(5));
        assert!(a.apply(&CompareOp::Less.into(), &mut env));
        assert_eq!(a, Element::bool_element(true));
    }

    #[test]
    fn test_constant_join_builds_interval() {
        let mut a = Element::int_element(3);
        let mut env = EvaluationEnvironment::new();
        assert!(a.merge_with(&Element::int_element(8), &mut env));
        match a {
            Element::IntInterval(i) => {
                assert_eq!(i.min(), &Element::int_element(3));
                assert_eq!(i.max(), &Element::int_element(8));
            }
            other => panic!("expected an interval, got {other}"),
        }
    }

    #[test]
    fn test_meet_of_disjoint_constants_is_empty() {
        let mut a = Element::int_element(3);
        let mut env = EvaluationEnvironment::new();
        assert!(a.intersect_with(&Element::int_element(4), &mut env));
        assert!(env.is_empty());
    }

    #[test]
    #[should_panic(expected = "not registered")]
    fn test_mask_apply_is_contract_violation() {
        let mut mask = Element::Mask(BitMask::new(8, 0b10, 0b01).unwrap());
        let mut env = EvaluationEnvironment::binary(Element::uchar_element(1));
        mask.apply(&BinaryOp::Plus.into(), &mut env);
    }

    #[test]
    fn test_disjunction_distribution() {
        let d = Disjunction::from_alternatives(vec![
            Element::int_element(0),
            Element::int_element(100),
        ])
        .unwrap();
        let mut a = Element::int_element(1);
        let mut env = EvaluationEnvironment::binary(Element::Disjunction(d));
        assert!(a.apply(&BinaryOp::Plus.into(), &mut env));
        match a {
            Element::Disjunction(d) => {
                assert_eq!(d.len(), 2);
                assert_eq!(d.entries()[0].value(), &Element::int_element(1));
                assert_eq!(d.entries()[1].value(), &Element::int_element(101));
            }
            other => panic!("expected a disjunction, got {other}"),
        }
    }

    #[test]
    fn test_query_sign() {
        assert_eq!(Element::int_element(5).query_sign(), SignClass::Positive);
        assert_eq!(Element::int_element(-5).query_sign(), SignClass::Negative);
        assert_eq!(Element::int_element(0).query_sign(), SignClass::Zero);
    }

    #[test]
    fn test_query_to_disjunction_enumerates_small_ranges() {
        let interval = Element::IntInterval(
            IntInterval::new(Element::int_element(1), Element::int_element(3)).unwrap(),
        );
        match interval.query(&QueryOperation::ToDisjunction) {
            QueryAnswer::Disjunction(d) => match d.as_ref() {
                Element::Disjunction(d) => assert_eq!(d.len(), 3),
                other => panic!("expected a disjunction, got {other}"),
            },
            other => panic!("unexpected answer {other:?}"),
        }
    }

    #[test]
    fn test_constrain_compare_less() {
        // [0,10] constrained by (self < 5) == true refines to [0,4]
        let mut a = Element::IntInterval(
            IntInterval::new(Element::int_element(0), Element::int_element(10)).unwrap(),
        );
        let mut env = ConstraintEnvironment::direct();
        assert!(a.constrain(
            &CompareOp::Less.into(),
            &Element::bool_element(true),
            Some(&Element::int_element(5)),
            &mut env,
        ));
        assert!(!env.is_empty());
        match a {
            Element::IntInterval(i) => {
                assert_eq!(i.min(), &Element::int_element(0));
                assert_eq!(i.max(), &Element::int_element(4));
            }
            other => panic!("expected an interval, got {other}"),
        }
    }
}
