use thiserror::Error;

#[derive(Debug, Error)]
pub enum OperationError {
    #[error("Scalar widths must be between 1 and 64 bits, got {0}")]
    InvalidBitWidth(u32),
    #[error("Multi-bit widths must be nonzero")]
    ZeroMultiBitWidth,
    #[error("Float formats need at least 2 exponent bits and 1 mantissa bit")]
    InvalidFloatFormat,
    #[error("Extract of {width} bits at {low} does not fit in {size} bits")]
    ExtractOutOfRange { low: u32, width: u32, size: u32 },
}
