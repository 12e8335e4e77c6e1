use crate::error::OperationError;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Width and signedness of a native machine integer.
///
/// One [`IntKind`] exists per (width, signedness) pair the host exposes;
/// the associated constants cover the four C-like widths. Arbitrary widths
/// up to 64 bits are admitted so that sub-word bitfields can be described;
/// anything wider belongs to the multi-bit representation.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct IntKind {
    bits: u16,
    signed: bool,
}

impl IntKind {
    pub const I8: IntKind = IntKind { bits: 8, signed: true };
    pub const U8: IntKind = IntKind { bits: 8, signed: false };
    pub const I16: IntKind = IntKind { bits: 16, signed: true };
    pub const U16: IntKind = IntKind { bits: 16, signed: false };
    pub const I32: IntKind = IntKind { bits: 32, signed: true };
    pub const U32: IntKind = IntKind { bits: 32, signed: false };
    pub const I64: IntKind = IntKind { bits: 64, signed: true };
    pub const U64: IntKind = IntKind { bits: 64, signed: false };

    pub fn new(bits: u32, signed: bool) -> Result<Self, OperationError> {
        if bits == 0 || bits > 64 {
            return Err(OperationError::InvalidBitWidth(bits));
        }
        Ok(IntKind {
            bits: bits as u16,
            signed,
        })
    }

    pub fn bits(&self) -> u32 {
        self.bits as u32
    }

    pub fn is_signed(&self) -> bool {
        self.signed
    }

    /// All-ones pattern of this kind's width.
    pub fn mask(&self) -> u64 {
        if self.bits >= 64 {
            u64::MAX
        } else {
            (1u64 << self.bits) - 1
        }
    }

    /// The bit distinguishing negative values in the signed view.
    pub fn sign_bit(&self) -> u64 {
        1u64 << (self.bits - 1)
    }

    /// Largest representable value, in the unsigned bit pattern of this kind.
    pub fn max_value(&self) -> u64 {
        if self.signed {
            self.mask() >> 1
        } else {
            self.mask()
        }
    }

    /// Smallest representable value, in the unsigned bit pattern of this kind.
    pub fn min_value(&self) -> u64 {
        if self.signed { self.sign_bit() } else { 0 }
    }

    pub fn min_signed(&self) -> i64 {
        if self.signed {
            -(1i64 << (self.bits - 1))
        } else {
            0
        }
    }

    pub fn max_signed(&self) -> i64 {
        if self.signed {
            (self.sign_bit() - 1) as i64
        } else {
            // may not fit in i64 for u64; saturate
            i64::try_from(self.mask()).unwrap_or(i64::MAX)
        }
    }

    /// The same width with the other signedness.
    pub fn toggled_sign(&self) -> IntKind {
        IntKind {
            bits: self.bits,
            signed: !self.signed,
        }
    }
}

impl Display for IntKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", if self.signed { 's' } else { 'u' }, self.bits)
    }
}

/// Native floating-point precision.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum FloatKind {
    /// IEEE-754 binary32
    Single,
    /// IEEE-754 binary64
    Double,
    /// x87 80-bit extended precision
    Extended,
}

impl FloatKind {
    pub fn bit_size(&self) -> u32 {
        self.format().bit_size()
    }

    pub fn format(&self) -> FloatFormat {
        match self {
            FloatKind::Single => FloatFormat {
                mantissa: 23,
                exponent: 8,
            },
            FloatKind::Double => FloatFormat {
                mantissa: 52,
                exponent: 11,
            },
            FloatKind::Extended => FloatFormat {
                mantissa: 64,
                exponent: 15,
            },
        }
    }
}

impl Display for FloatKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            FloatKind::Single => write!(f, "f32"),
            FloatKind::Double => write!(f, "f64"),
            FloatKind::Extended => write!(f, "f80"),
        }
    }
}

/// Field layout of a binary floating-point format: explicit mantissa and
/// exponent widths, with an implicit leading sign bit.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct FloatFormat {
    pub mantissa: u16,
    pub exponent: u16,
}

impl FloatFormat {
    pub fn new(mantissa: u32, exponent: u32) -> Result<Self, OperationError> {
        if mantissa == 0 || exponent < 2 || mantissa > u16::MAX as u32 || exponent > 63 {
            return Err(OperationError::InvalidFloatFormat);
        }
        Ok(FloatFormat {
            mantissa: mantissa as u16,
            exponent: exponent as u16,
        })
    }

    pub fn bit_size(&self) -> u32 {
        1 + self.exponent as u32 + self.mantissa as u32
    }

    /// Exponent bias of the format.
    pub fn bias(&self) -> i64 {
        (1i64 << (self.exponent - 1)) - 1
    }

    /// Largest biased exponent, reserved for infinities and NaNs.
    pub fn max_biased_exponent(&self) -> u64 {
        (1u64 << self.exponent) - 1
    }
}

impl Display for FloatFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "m{}e{}", self.mantissa, self.exponent)
    }
}

/// The kind tag of any scalar the engine can represent.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum ScalarKind {
    Integer(IntKind),
    Float(FloatKind),
    Boolean,
    MultiBit { bits: u32, signed: bool },
    MultiFloat(FloatFormat),
}

impl ScalarKind {
    pub fn bit_size(&self) -> u32 {
        match self {
            ScalarKind::Integer(k) => k.bits(),
            ScalarKind::Float(k) => k.bit_size(),
            ScalarKind::Boolean => 1,
            ScalarKind::MultiBit { bits, .. } => *bits,
            ScalarKind::MultiFloat(fmt) => fmt.bit_size(),
        }
    }

    pub fn is_signed(&self) -> bool {
        match self {
            ScalarKind::Integer(k) => k.is_signed(),
            ScalarKind::Float(_) | ScalarKind::MultiFloat(_) => true,
            ScalarKind::Boolean => false,
            ScalarKind::MultiBit { signed, .. } => *signed,
        }
    }

    pub fn is_float(&self) -> bool {
        matches!(self, ScalarKind::Float(_) | ScalarKind::MultiFloat(_))
    }
}

impl Display for ScalarKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ScalarKind::Integer(k) => write!(f, "{k}"),
            ScalarKind::Float(k) => write!(f, "{k}"),
            ScalarKind::Boolean => write!(f, "bool"),
            ScalarKind::MultiBit { bits, signed } => {
                write!(f, "{}bit{}", if *signed { 's' } else { 'u' }, bits)
            }
            ScalarKind::MultiFloat(fmt) => write!(f, "float{fmt}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_int_kind_bounds() {
        assert_eq!(IntKind::I8.min_signed(), -128);
        assert_eq!(IntKind::I8.max_signed(), 127);
        assert_eq!(IntKind::U8.max_value(), 255);
        assert_eq!(IntKind::U8.min_value(), 0);
        assert_eq!(IntKind::I64.mask(), u64::MAX);
        assert_eq!(IntKind::I16.sign_bit(), 0x8000);
    }

    #[test]
    fn test_int_kind_width_validation() {
        assert!(IntKind::new(0, true).is_err());
        assert!(IntKind::new(65, false).is_err());
        assert!(IntKind::new(24, false).is_ok());
    }

    #[test]
    fn test_float_formats() {
        assert_eq!(FloatKind::Single.bit_size(), 32);
        assert_eq!(FloatKind::Double.bit_size(), 64);
        assert_eq!(FloatKind::Extended.bit_size(), 80);
        assert_eq!(FloatKind::Double.format().bias(), 1023);
        assert_eq!(FloatKind::Single.format().max_biased_exponent(), 255);
    }

    #[test]
    fn test_display_tags() {
        assert_eq!(IntKind::I32.to_string(), "s32");
        assert_eq!(IntKind::U16.to_string(), "u16");
        assert_eq!(ScalarKind::Boolean.to_string(), "bool");
        assert_eq!(
            ScalarKind::MultiBit {
                bits: 128,
                signed: false
            }
            .to_string(),
            "ubit128"
        );
    }
}
