//! Coded amplitude components and their exact arithmetic.
//!
//! Every real or imaginary part of a reachable single-qubit state is one of
//! seven values: `0`, `±1`, `±1/√2` and `±1/2`. Each is stored as a small
//! integer code so that states compare exactly and gates can be applied
//! without floating point.
//!
//! | Code | Value |
//! |------|-------|
//! | `0`  | `0` |
//! | `±1` | `±1` |
//! | `±2` | `±1/√2` |
//! | `±4` | `±1/2` |

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Decimal literal for 1/√2, embedded verbatim so generated code does not
/// depend on a platform square root.
pub const FRAC_1_SQRT_2_LITERAL: &str = "0.70710678118654752440084436210485";

/// One coded real number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[repr(i8)]
pub enum Amplitude {
    NegHalf = -4,
    NegFracSqrt2 = -2,
    NegOne = -1,
    Zero = 0,
    One = 1,
    FracSqrt2 = 2,
    Half = 4,
}

impl Amplitude {
    /// All amplitudes in ascending code order.
    pub const ALL: [Amplitude; 7] = [
        Amplitude::NegHalf,
        Amplitude::NegFracSqrt2,
        Amplitude::NegOne,
        Amplitude::Zero,
        Amplitude::One,
        Amplitude::FracSqrt2,
        Amplitude::Half,
    ];

    /// Decode an integer code. Returns `None` for codes outside the table.
    #[inline]
    pub const fn from_code(code: i8) -> Option<Self> {
        match code {
            -4 => Some(Self::NegHalf),
            -2 => Some(Self::NegFracSqrt2),
            -1 => Some(Self::NegOne),
            0 => Some(Self::Zero),
            1 => Some(Self::One),
            2 => Some(Self::FracSqrt2),
            4 => Some(Self::Half),
            _ => None,
        }
    }

    #[inline]
    pub const fn code(self) -> i8 {
        self as i8
    }

    /// Exact decimal literal for this value, as emitted into generated code.
    pub const fn literal(self) -> &'static str {
        match self {
            Self::NegHalf => "-0.5",
            Self::NegFracSqrt2 => "-0.70710678118654752440084436210485",
            Self::NegOne => "-1.0",
            Self::Zero => "0.0",
            Self::One => "1.0",
            Self::FracSqrt2 => FRAC_1_SQRT_2_LITERAL,
            Self::Half => "0.5",
        }
    }

    #[allow(clippy::excessive_precision)]
    pub const fn to_f64(self) -> f64 {
        match self {
            Self::NegHalf => -0.5,
            Self::NegFracSqrt2 => -0.70710678118654752440084436210485,
            Self::NegOne => -1.0,
            Self::Zero => 0.0,
            Self::One => 1.0,
            Self::FracSqrt2 => 0.70710678118654752440084436210485,
            Self::Half => 0.5,
        }
    }

    /// The square of this value in units of 1/4.
    ///
    /// Squares of the seven values are `0`, `1`, `1/2` and `1/4`, so a state
    /// is normalized exactly when its four squares sum to 4 quarters.
    #[inline]
    pub const fn square_quarters(self) -> u32 {
        match self {
            Self::Zero => 0,
            Self::One | Self::NegOne => 4,
            Self::FracSqrt2 | Self::NegFracSqrt2 => 2,
            Self::Half | Self::NegHalf => 1,
        }
    }

    /// Exact `(self + rhs) / √2`, or `None` when the result is not one of the
    /// seven representable values.
    pub const fn add_div_sqrt2(self, rhs: Self) -> Option<Self> {
        let (a, b) = (self.code(), rhs.code());
        if a == -b {
            return Some(Self::Zero);
        }
        // x/√2 for a lone term
        let lone = if a == 0 {
            b
        } else if b == 0 {
            a
        } else {
            0
        };
        if lone != 0 {
            return match lone {
                1 => Some(Self::FracSqrt2),
                -1 => Some(Self::NegFracSqrt2),
                2 => Some(Self::Half),
                -2 => Some(Self::NegHalf),
                _ => None,
            };
        }
        // 2x/√2 = √2·x for equal terms
        if a == b {
            return match a {
                2 => Some(Self::One),
                -2 => Some(Self::NegOne),
                4 => Some(Self::FracSqrt2),
                -4 => Some(Self::NegFracSqrt2),
                _ => None,
            };
        }
        None
    }
}

impl core::ops::Neg for Amplitude {
    type Output = Amplitude;

    #[inline]
    fn neg(self) -> Amplitude {
        match self {
            Self::NegHalf => Self::Half,
            Self::NegFracSqrt2 => Self::FracSqrt2,
            Self::NegOne => Self::One,
            Self::Zero => Self::Zero,
            Self::One => Self::NegOne,
            Self::FracSqrt2 => Self::NegFracSqrt2,
            Self::Half => Self::NegHalf,
        }
    }
}

impl core::fmt::Display for Amplitude {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.code())
    }
}
