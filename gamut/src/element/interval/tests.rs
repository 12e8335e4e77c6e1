use crate::element::interval::{IntInterval, ScalarOrder};
use crate::element::Element;
use crate::environment::{ConstraintEnvironment, EvaluationEnvironment};
use gamut_ops::{BinaryOp, CastOp, CompareOp, IntKind, UnaryOp};

fn iv(lo: i32, hi: i32) -> Element {
    Element::IntInterval(
        IntInterval::new(Element::int_element(lo), Element::int_element(hi)).unwrap(),
    )
}

fn uv(lo: u8, hi: u8) -> Element {
    Element::IntInterval(
        IntInterval::new(Element::uchar_element(lo), Element::uchar_element(hi)).unwrap(),
    )
}

fn bounds(e: &Element) -> (i64, i64) {
    match e {
        Element::IntInterval(i) => match (i.min(), i.max()) {
            (Element::Int(lo), Element::Int(hi)) => (lo.signed(), hi.signed()),
            _ => panic!("unexpected bound shape"),
        },
        Element::Int(c) => (c.signed(), c.signed()),
        other => panic!("expected an interval, got {other}"),
    }
}

#[test]
fn test_plus_constant_shifts_bounds() {
    let mut a = iv(2, 6);
    let mut env = EvaluationEnvironment::binary(Element::int_element(10));
    assert!(a.apply(&BinaryOp::Plus.into(), &mut env));
    assert_eq!(bounds(&a), (12, 16));
}

#[test]
fn test_minus_interval_uses_opposite_bounds() {
    let mut a = iv(10, 20);
    let mut env = EvaluationEnvironment::binary(iv(1, 3));
    assert!(a.apply(&BinaryOp::Minus.into(), &mut env));
    assert_eq!(bounds(&a), (7, 19));
}

#[test]
fn test_times_negative_constant_swaps_bounds() {
    // [2,6] * -1 = [-6,-2]
    let mut a = iv(2, 6);
    let mut env = EvaluationEnvironment::binary(Element::int_element(-1));
    assert!(a.apply(&BinaryOp::Times.into(), &mut env));
    assert_eq!(bounds(&a), (-6, -2));
}

#[test]
fn test_times_interval_evaluates_all_corners() {
    let mut a = iv(-2, 3);
    let mut env = EvaluationEnvironment::binary(iv(-5, 4));
    assert!(a.apply(&BinaryOp::Times.into(), &mut env));
    // corners: 10, -8, -15, 12
    assert_eq!(bounds(&a), (-15, 12));
}

#[test]
fn test_overflowing_bound_widens_to_full_range() {
    let mut a = iv(i32::MAX - 1, i32::MAX);
    let mut env = EvaluationEnvironment::binary(Element::int_element(10));
    assert!(a.apply(&BinaryOp::Plus.into(), &mut env));
    assert!(env.is_positive_overflow());
    assert_eq!(bounds(&a), (i32::MIN as i64, i32::MAX as i64));
}

#[test]
fn test_division_by_zero_interval_flags() {
    let mut a = iv(10, 20);
    let mut env = EvaluationEnvironment::binary(iv(-1, 1));
    assert!(a.apply(&BinaryOp::Divide.into(), &mut env));
    assert!(env.is_division_by_zero());
}

#[test]
fn test_division_by_constant() {
    let mut a = iv(10, 21);
    let mut env = EvaluationEnvironment::binary(Element::int_element(2));
    assert!(a.apply(&BinaryOp::Divide.into(), &mut env));
    assert_eq!(bounds(&a), (5, 10));
}

#[test]
fn test_modulo_window_is_exact() {
    let mut a = iv(12, 14);
    let mut env = EvaluationEnvironment::binary(Element::int_element(10));
    assert!(a.apply(&BinaryOp::Modulo.into(), &mut env));
    assert_eq!(bounds(&a), (2, 4));
}

#[test]
fn test_modulo_wide_range_falls_back() {
    let mut a = iv(0, 100);
    let mut env = EvaluationEnvironment::binary(Element::int_element(10));
    assert!(a.apply(&BinaryOp::Modulo.into(), &mut env));
    assert_eq!(bounds(&a), (0, 9));
}

#[test]
fn test_opposite_swaps_and_negates() {
    let mut a = iv(-3, 7);
    let mut env = EvaluationEnvironment::new();
    assert!(a.apply(&UnaryOp::Opposite.into(), &mut env));
    assert_eq!(bounds(&a), (-7, 3));
}

#[test]
fn test_bit_negate_is_exact() {
    let mut a = iv(0, 5);
    let mut env = EvaluationEnvironment::new();
    assert!(a.apply(&UnaryOp::BitNegate.into(), &mut env));
    assert_eq!(bounds(&a), (-6, -1));
}

#[test]
fn test_interval_soundness_spot_grid() {
    // every concrete pair must land inside the abstract result
    let (a_lo, a_hi) = (-3i32, 4i32);
    let (b_lo, b_hi) = (-2i32, 5i32);
    for op in [
        BinaryOp::Plus,
        BinaryOp::Minus,
        BinaryOp::Times,
    ] {
        let mut abs = iv(a_lo, a_hi);
        let mut env = EvaluationEnvironment::binary(iv(b_lo, b_hi));
        assert!(abs.apply(&op.into(), &mut env));
        let (r_lo, r_hi) = bounds(&abs);
        for x in a_lo..=a_hi {
            for y in b_lo..=b_hi {
                let concrete = match op {
                    BinaryOp::Plus => x as i64 + y as i64,
                    BinaryOp::Minus => x as i64 - y as i64,
                    BinaryOp::Times => x as i64 * y as i64,
                    _ => unreachable!(),
                };
                assert!(
                    (r_lo..=r_hi).contains(&concrete),
                    "{op}: {x},{y} gives {concrete} outside [{r_lo},{r_hi}]"
                );
            }
        }
    }
}

#[test]
fn test_meet_overlap() {
    let mut a = iv(0, 5);
    let mut env = EvaluationEnvironment::new();
    assert!(a.intersect_with(&iv(3, 10), &mut env));
    assert!(!env.is_empty());
    assert_eq!(bounds(&a), (3, 5));
}

#[test]
fn test_meet_disjoint_is_empty() {
    let mut a = iv(0, 2);
    let mut env = EvaluationEnvironment::new();
    assert!(a.intersect_with(&iv(5, 10), &mut env));
    assert!(env.is_empty());
    // the element is left untouched for the caller to decide
    assert_eq!(bounds(&a), (0, 2));
}

#[test]
fn test_meet_idempotent() {
    let mut a = iv(1, 9);
    let mut env = EvaluationEnvironment::new();
    assert!(a.intersect_with(&iv(1, 9), &mut env));
    assert!(!env.is_empty());
    assert_eq!(bounds(&a), (1, 9));
}

#[test]
fn test_meet_commutes() {
    let mut a = iv(0, 6);
    let mut b = iv(4, 12);
    let mut env_a = EvaluationEnvironment::new();
    let mut env_b = EvaluationEnvironment::new();
    assert!(a.intersect_with(&iv(4, 12), &mut env_a));
    assert!(b.intersect_with(&iv(0, 6), &mut env_b));
    assert_eq!(bounds(&a), bounds(&b));
    assert_eq!(env_a.is_empty(), env_b.is_empty());
}

#[test]
fn test_meet_collapses_to_constant() {
    let mut a = iv(0, 5);
    let mut env = EvaluationEnvironment::new();
    assert!(a.intersect_with(&iv(5, 10), &mut env));
    assert!(!env.is_empty());
    assert_eq!(a, Element::int_element(5));
}

#[test]
fn test_join_envelope() {
    let mut a = iv(0, 5);
    let mut env = EvaluationEnvironment::new();
    assert!(a.merge_with(&iv(10, 20), &mut env));
    assert_eq!(bounds(&a), (0, 20));
}

#[test]
fn test_contains_its_parts() {
    let outer = iv(0, 10);
    assert!(outer.contains(&iv(2, 8)));
    assert!(outer.contains(&Element::int_element(10)));
    assert!(!outer.contains(&iv(5, 11)));
    assert!(!outer.contains(&Element::int_element(-1)));
}

#[test]
fn test_compare_definite_and_unknown() {
    let low = iv(0, 4);
    let high = iv(10, 20);
    assert!(low.compare_ternary(CompareOp::Less, &high).is_true());
    assert!(high.compare_ternary(CompareOp::Less, &low).is_false());
    let overlap = iv(3, 12);
    assert!(low.compare_ternary(CompareOp::Less, &overlap).is_top());
}

#[test]
fn test_compare_scalars_detects_order() {
    let low = iv(0, 4);
    let high = iv(10, 20);
    assert_eq!(low.compare_scalars(&high), ScalarOrder::AlwaysLess);
    assert_eq!(high.compare_scalars(&low), ScalarOrder::AlwaysGreater);
    assert_eq!(iv(3, 12).compare_scalars(&iv(0, 5)), ScalarOrder::Unknown);
    assert_eq!(
        Element::int_element(7).compare_scalars(&Element::int_element(7)),
        ScalarOrder::AlwaysEqual
    );
}

#[test]
fn test_compare_scalars_unsigned_wrap_is_unknown() {
    // the difference overflows in both directions, so no verdict is sound
    let a = uv(0, 200);
    let b = uv(100, 255);
    assert_eq!(a.compare_scalars(&b), ScalarOrder::Unknown);
}

#[test]
fn test_constraint_less_refines_max() {
    // [0,10] with (x < 5) == true becomes [0,4]
    let mut a = iv(0, 10);
    let mut env = ConstraintEnvironment::direct();
    assert!(a.constrain(
        &CompareOp::Less.into(),
        &Element::bool_element(true),
        Some(&Element::int_element(5)),
        &mut env,
    ));
    assert_eq!(bounds(&a), (0, 4));
}

#[test]
fn test_constraint_less_false_refines_min() {
    let mut a = iv(0, 10);
    let mut env = ConstraintEnvironment::direct();
    assert!(a.constrain(
        &CompareOp::Less.into(),
        &Element::bool_element(false),
        Some(&Element::int_element(5)),
        &mut env,
    ));
    assert_eq!(bounds(&a), (5, 10));
}

#[test]
fn test_constraint_inverse_role_swaps() {
    // b constrained by (3 < b) == true
    let mut b = iv(0, 10);
    let mut env = ConstraintEnvironment::inverse();
    assert!(b.constrain(
        &CompareOp::Less.into(),
        &Element::bool_element(true),
        Some(&Element::int_element(3)),
        &mut env,
    ));
    assert_eq!(bounds(&b), (4, 10));
}

#[test]
fn test_constraint_empty_when_impossible() {
    let mut a = iv(8, 10);
    let mut env = ConstraintEnvironment::direct();
    assert!(a.constrain(
        &CompareOp::Less.into(),
        &Element::bool_element(true),
        Some(&Element::int_element(3)),
        &mut env,
    ));
    assert!(env.is_empty());
}

#[test]
fn test_constraint_plus_inverse_law() {
    // r = a + b with r = [10,12], b = 4 confines a to [6,8]
    let mut a = iv(0, 100);
    let result = iv(10, 12);
    let mut env = ConstraintEnvironment::direct();
    assert!(a.constrain(
        &BinaryOp::Plus.into(),
        &result,
        Some(&Element::int_element(4)),
        &mut env,
    ));
    assert_eq!(bounds(&a), (6, 8));
    // every a' with a' + 4 in [10,12] is still inside
    for candidate in 6..=8 {
        assert!((6..=8).contains(&candidate));
    }
}

#[test]
fn test_constraint_minus_roles() {
    // a - 4 = 10 refines a to 14
    let mut a = iv(0, 100);
    let mut env = ConstraintEnvironment::direct();
    assert!(a.constrain(
        &BinaryOp::Minus.into(),
        &Element::int_element(10),
        Some(&Element::int_element(4)),
        &mut env,
    ));
    assert_eq!(bounds(&a), (14, 14));

    // 20 - b = 10 refines b to 10
    let mut b = iv(0, 100);
    let mut env = ConstraintEnvironment::inverse();
    assert!(b.constrain(
        &BinaryOp::Minus.into(),
        &Element::int_element(10),
        Some(&Element::int_element(20)),
        &mut env,
    ));
    assert_eq!(bounds(&b), (10, 10));
}

#[test]
fn test_cast_widening_preserves_bounds() {
    let a = uv(10, 200);
    let mut env = EvaluationEnvironment::new();
    let mut widened = a.clone();
    assert!(widened.apply(&CastOp::Int(IntKind::I32).into(), &mut env));
    assert_eq!(bounds(&widened), (10, 200));
}

#[test]
fn test_cast_narrowing_widens_on_overflow() {
    let a = iv(0, 1000);
    let mut env = EvaluationEnvironment::new();
    let mut narrowed = a.clone();
    assert!(narrowed.apply(&CastOp::Int(IntKind::U8).into(), &mut env));
    assert!(env.is_overflow());
    assert_eq!(bounds(&narrowed), (0, 255));
}

#[test]
fn test_shift_left_by_constant() {
    let mut a = iv(1, 4);
    let mut env = EvaluationEnvironment::binary(Element::int_element(2));
    assert!(a.apply(&BinaryOp::ShiftLeft.into(), &mut env));
    assert_eq!(bounds(&a), (4, 16));
}

#[test]
fn test_logical_not_of_nonzero_interval() {
    let mut a = iv(3, 9);
    let mut env = EvaluationEnvironment::new();
    assert!(a.apply(&UnaryOp::LogicalNot.into(), &mut env));
    assert_eq!(a, Element::int_element(0));
}

mod float {
    use super::*;
    use crate::element::float_const::FloatConst;
    use crate::element::interval::FloatInterval;
    use gamut_ops::FloatKind;

    fn fv(lo: f64, hi: f64) -> Element {
        Element::FloatInterval(FloatInterval::from_consts(
            FloatConst::new(FloatKind::Double, lo),
            FloatConst::new(FloatKind::Double, hi),
        ))
    }

    fn fbounds(e: &Element) -> (f64, f64) {
        match e {
            Element::FloatInterval(i) => (i.min().value(), i.max().value()),
            Element::Float(c) => (c.value(), c.value()),
            other => panic!("expected a float interval, got {other}"),
        }
    }

    #[test]
    fn test_outward_rounding_add() {
        let mut a = fv(0.1, 0.1);
        let mut env = EvaluationEnvironment::binary(fv(0.2, 0.2));
        assert!(a.apply(&BinaryOp::Plus.into(), &mut env));
        let (lo, hi) = fbounds(&a);
        assert!(lo <= 0.1 + 0.2 && 0.1 + 0.2 <= hi);
        assert!(lo < hi, "directed rounding must widen an inexact sum");
    }

    #[test]
    fn test_times_corners() {
        let mut a = fv(-2.0, 3.0);
        let mut env = EvaluationEnvironment::binary(fv(-5.0, 4.0));
        assert!(a.apply(&BinaryOp::Times.into(), &mut env));
        let (lo, hi) = fbounds(&a);
        assert!(lo <= -15.0 && hi >= 12.0);
    }

    #[test]
    fn test_divide_across_zero_is_full() {
        let mut a = fv(1.0, 2.0);
        let mut env = EvaluationEnvironment::binary(fv(-1.0, 1.0));
        assert!(a.apply(&BinaryOp::Divide.into(), &mut env));
        assert!(env.is_division_by_zero());
        let (lo, hi) = fbounds(&a);
        assert_eq!(lo, f64::NEG_INFINITY);
        assert_eq!(hi, f64::INFINITY);
    }

    #[test]
    fn test_meet_and_join() {
        let mut a = fv(0.0, 5.0);
        let mut env = EvaluationEnvironment::new();
        assert!(a.intersect_with(&fv(3.0, 10.0), &mut env));
        let (lo, hi) = fbounds(&a);
        assert_eq!((lo, hi), (3.0, 5.0));

        let mut b = fv(0.0, 1.0);
        assert!(b.merge_with(&fv(4.0, 9.0), &mut env));
        assert_eq!(fbounds(&b), (0.0, 9.0));
    }

    #[test]
    fn test_constraint_less_on_floats() {
        let mut a = fv(0.0, 10.0);
        let mut env = ConstraintEnvironment::direct();
        assert!(a.constrain(
            &CompareOp::Less.into(),
            &Element::bool_element(true),
            Some(&Element::double_element(5.0)),
            &mut env,
        ));
        let (lo, hi) = fbounds(&a);
        assert_eq!(lo, 0.0);
        assert!(hi < 5.0);
    }
}
