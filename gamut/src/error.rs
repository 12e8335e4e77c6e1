use gamut_ops::OperationError;
use thiserror::Error;

/// Construction-time validation failures.
///
/// Arithmetic conditions (overflow, division by zero, empty meet) are never
/// errors; they are recorded as flags on the evaluation environment. Calling
/// an operation a domain does not support at all is a contract violation and
/// panics instead of surfacing here.
#[derive(Debug, Error)]
pub enum GamutError {
    #[error("Bad scalar kind")]
    Operation(#[from] OperationError),
    #[error("An element initializer needs a bit size")]
    MissingBitSize,
    #[error("A bit mask claimed the same bit certainly-one and certainly-zero")]
    ContradictoryMask,
    #[error("A conjunction needs at least two members")]
    DegenerateConjunction,
    #[error("Interval bounds must be constants of the same kind")]
    MismatchedBounds,
    #[error("A guard condition must be a boolean element")]
    NonBooleanCondition,
    #[error("A disjunction needs at least one alternative")]
    EmptyDisjunction,
}
