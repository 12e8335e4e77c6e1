use gamut::element::Element;
use gamut::environment::{ConstraintEnvironment, EvaluationEnvironment};
use gamut::ops::{BinaryOp, CompareOp, IntKind, ScalarKind};
use gamut::Precision;

fn main() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_target(false)
        .init();

    // a fresh 32-bit value at some program point
    let policy = Precision::default();
    let mut x = policy.fresh(ScalarKind::Integer(IntKind::I32));
    tracing::info!("fresh value: {x}");

    // the driver saw `x = x * 2 + 10`
    let mut env = EvaluationEnvironment::binary(Element::int_element(2));
    x.apply(&BinaryOp::Times.into(), &mut env);
    let mut env = EvaluationEnvironment::binary(Element::int_element(10));
    x.apply(&BinaryOp::Plus.into(), &mut env);
    tracing::info!("after x * 2 + 10: {x}");

    // entering the true branch of `if (x < 50)`: refine backward
    let mut cenv = ConstraintEnvironment::direct();
    x.constrain(
        &CompareOp::Less.into(),
        &Element::bool_element(true),
        Some(&Element::int_element(50)),
        &mut cenv,
    );
    tracing::info!("inside `if (x < 50)`: {x}");

    // joining with the other branch's value loses precision back to an envelope
    let mut env = EvaluationEnvironment::new();
    x.merge_with(&Element::int_element(200), &mut env);
    tracing::info!("after joining the else branch: {x}");
}
