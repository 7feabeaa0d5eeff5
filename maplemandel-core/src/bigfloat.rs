use std::str::FromStr;

use dashu::integer::IBig;
use dashu_base::{Abs, Approximation, BitTest, UnsignedAbs};
use dashu_float::{DBig, FBig};
use serde::{Deserialize, Serialize};

use crate::{FloatExp, NumericError};

/// Arbitrary precision floating point with explicit precision enforcement
///
/// Uses f64 internally when precision_bits <= 64, FBig otherwise.
/// This optimization is completely transparent to external code.
#[derive(Clone, Debug)]
pub struct BigFloat {
    value: BigFloatValue,
    precision_bits: usize,
}

#[derive(Clone, Debug)]
pub enum BigFloatValue {
    F64(f64),
    Arbitrary(FBig),
}

/// Bits of an f64 significand, including the implicit leading one.
const F64_SIGNIFICAND_BITS: i32 = 53;

impl BigFloat {
    /// Create BigFloat from a finite f64 with explicit precision
    ///
    /// NO DEFAULT - precision must always be specified
    pub fn with_precision(val: f64, precision_bits: usize) -> Self {
        debug_assert!(val.is_finite(), "BigFloat::with_precision called with {val}");
        let value = if precision_bits <= 64 {
            BigFloatValue::F64(val)
        } else {
            BigFloatValue::Arbitrary(f64_to_fbig(val, precision_bits))
        };

        Self {
            value,
            precision_bits,
        }
    }

    /// Like [`with_precision`](Self::with_precision), rejecting NaN and infinities.
    pub fn try_with_precision(val: f64, precision_bits: usize) -> Result<Self, NumericError> {
        if !val.is_finite() {
            return Err(NumericError::NotFinite(val));
        }
        Ok(Self::with_precision(val, precision_bits))
    }

    /// Create zero with explicit precision
    pub fn zero(precision_bits: usize) -> Self {
        Self::with_precision(0.0, precision_bits)
    }

    /// Create one with explicit precision
    pub fn one(precision_bits: usize) -> Self {
        Self::with_precision(1.0, precision_bits)
    }

    /// Exact conversion from an extended-range float.
    ///
    /// Falls back to the arbitrary representation when the exponent does not
    /// fit a native double, even if `precision_bits` is small.
    pub fn from_float_exp(value: &FloatExp, precision_bits: usize) -> Self {
        let native = value.to_f64();
        let fits_native = value.is_zero() || native.is_normal();
        if precision_bits <= 64 && fits_native {
            return Self::with_precision(native, precision_bits);
        }
        let precision = precision_bits.max(F64_SIGNIFICAND_BITS as usize);
        let significand = libm::ldexp(value.mantissa(), F64_SIGNIFICAND_BITS) as i64;
        let exponent = value.exponent() - F64_SIGNIFICAND_BITS as i64;
        let fbig = FBig::from_parts(IBig::from(significand), exponent as isize)
            .with_precision(precision)
            .value();
        Self {
            value: BigFloatValue::Arbitrary(fbig),
            precision_bits: precision,
        }
    }

    /// Get precision in bits
    pub fn precision_bits(&self) -> usize {
        self.precision_bits
    }

    /// Whether the value is held as a native f64.
    pub fn is_native(&self) -> bool {
        matches!(self.value, BigFloatValue::F64(_))
    }

    /// Convert to f64 (for display/colorization only)
    /// May lose precision for values requiring > 64 bits
    pub fn to_f64(&self) -> f64 {
        match &self.value {
            BigFloatValue::F64(v) => *v,
            BigFloatValue::Arbitrary(v) => v.to_f64().value(),
        }
    }

    /// Create BigFloat from string with explicit precision
    ///
    /// Allows creating values beyond f64 range (e.g., "1e1000").
    /// Uses atomic base conversion with target precision to avoid precision loss.
    pub fn from_string(val: &str, precision_bits: usize) -> Result<Self, NumericError> {
        if precision_bits <= 64 {
            let parsed = val
                .parse::<f64>()
                .map_err(|e| NumericError::Parse(format!("{val:?}: {e}")))?;
            if !parsed.is_finite() {
                return Err(NumericError::NotFinite(parsed));
            }
            Ok(Self::with_precision(parsed, precision_bits))
        } else {
            // Parse as decimal, then convert to binary with atomic precision specification
            let dbig = val
                .parse::<DBig>()
                .map_err(|e| NumericError::Parse(format!("{val:?}: {e}")))?;
            let fbig_halfaway = match dbig.with_base_and_precision::<2>(precision_bits) {
                Approximation::Exact(v) => v,
                Approximation::Inexact(v, _) => v,
            };
            // Convert from HalfAway rounding to Zero rounding (used by FBig default)
            let fbig_with_prec = fbig_halfaway.with_rounding::<dashu_float::round::mode::Zero>();
            Ok(Self {
                value: BigFloatValue::Arbitrary(fbig_with_prec),
                precision_bits,
            })
        }
    }

    /// Re-express at a new precision. Widening is exact; narrowing rounds toward zero.
    pub fn rescaled(&self, precision_bits: usize) -> Self {
        if precision_bits == self.precision_bits {
            return self.clone();
        }
        let value = match &self.value {
            BigFloatValue::F64(v) if precision_bits <= 64 => BigFloatValue::F64(*v),
            BigFloatValue::Arbitrary(v) if precision_bits <= 64 && fits_f64_exactly(v) => {
                BigFloatValue::F64(v.to_f64().value())
            }
            // Values that need more than a double keep the arbitrary form.
            BigFloatValue::Arbitrary(v) if precision_bits <= 64 => BigFloatValue::Arbitrary(
                v.clone().with_precision(precision_bits.max(1)).value(),
            ),
            _ => BigFloatValue::Arbitrary(self.to_fbig().with_precision(precision_bits).value()),
        };
        Self {
            value,
            precision_bits,
        }
    }

    /// Add two BigFloats, preserving max precision
    pub fn add(&self, other: &Self) -> Self {
        let result_precision = self.precision_bits.max(other.precision_bits);

        let result_value = match (&self.value, &other.value) {
            (BigFloatValue::F64(a), BigFloatValue::F64(b)) if result_precision <= 64 => {
                BigFloatValue::F64(a + b)
            }
            _ => {
                let a_big = self.to_fbig_at(result_precision);
                let b_big = other.to_fbig_at(result_precision);
                BigFloatValue::Arbitrary(&a_big + &b_big)
            }
        };

        Self {
            value: result_value,
            precision_bits: result_precision,
        }
    }

    /// Subtract two BigFloats, preserving max precision
    pub fn sub(&self, other: &Self) -> Self {
        let result_precision = self.precision_bits.max(other.precision_bits);

        let result_value = match (&self.value, &other.value) {
            (BigFloatValue::F64(a), BigFloatValue::F64(b)) if result_precision <= 64 => {
                BigFloatValue::F64(a - b)
            }
            _ => {
                let a_big = self.to_fbig_at(result_precision);
                let b_big = other.to_fbig_at(result_precision);
                BigFloatValue::Arbitrary(&a_big - &b_big)
            }
        };

        Self {
            value: result_value,
            precision_bits: result_precision,
        }
    }

    /// Multiply two BigFloats, preserving max precision
    pub fn mul(&self, other: &Self) -> Self {
        let result_precision = self.precision_bits.max(other.precision_bits);

        let result_value = match (&self.value, &other.value) {
            (BigFloatValue::F64(a), BigFloatValue::F64(b)) if result_precision <= 64 => {
                BigFloatValue::F64(a * b)
            }
            _ => {
                let a_big = self.to_fbig_at(result_precision);
                let b_big = other.to_fbig_at(result_precision);
                BigFloatValue::Arbitrary(&a_big * &b_big)
            }
        };

        Self {
            value: result_value,
            precision_bits: result_precision,
        }
    }

    /// Divide two BigFloats, preserving max precision
    pub fn div(&self, other: &Self) -> Result<Self, NumericError> {
        if other.is_zero() {
            return Err(NumericError::DivisionByZero);
        }
        let result_precision = self.precision_bits.max(other.precision_bits);

        let result_value = match (&self.value, &other.value) {
            (BigFloatValue::F64(a), BigFloatValue::F64(b)) if result_precision <= 64 => {
                BigFloatValue::F64(a / b)
            }
            _ => {
                let a_big = self.to_fbig_at(result_precision);
                let b_big = other.to_fbig_at(result_precision);
                BigFloatValue::Arbitrary(&a_big / &b_big)
            }
        };

        Ok(Self {
            value: result_value,
            precision_bits: result_precision,
        })
    }

    /// Absolute value
    pub fn abs(&self) -> Self {
        match &self.value {
            BigFloatValue::F64(v) => BigFloat {
                value: BigFloatValue::F64(v.abs()),
                precision_bits: self.precision_bits,
            },
            BigFloatValue::Arbitrary(v) => BigFloat {
                value: BigFloatValue::Arbitrary(v.clone().abs()),
                precision_bits: self.precision_bits,
            },
        }
    }

    /// False only for a native value that overflowed or went NaN.
    pub fn is_finite(&self) -> bool {
        match &self.value {
            BigFloatValue::F64(v) => v.is_finite(),
            BigFloatValue::Arbitrary(_) => true,
        }
    }

    pub fn is_zero(&self) -> bool {
        match &self.value {
            BigFloatValue::F64(v) => *v == 0.0,
            BigFloatValue::Arbitrary(v) => v.repr().is_zero(),
        }
    }

    /// Approximate log2(|self|); negative infinity for zero.
    ///
    /// Works outside the f64 exponent range by reading the binary exponent directly.
    pub fn log2_approx(&self) -> f64 {
        match &self.value {
            BigFloatValue::F64(v) => v.abs().log2(),
            BigFloatValue::Arbitrary(v) => {
                let repr = v.repr();
                if repr.is_zero() {
                    return f64::NEG_INFINITY;
                }
                let significand = repr.significand();
                let bits = significand.unsigned_abs().bit_len();
                // Leading 53 bits give the fractional part; the rest is exponent.
                let shift = bits.saturating_sub(F64_SIGNIFICAND_BITS as usize);
                let top = (significand.unsigned_abs() >> shift).to_f64().value();
                top.log2() + shift as f64 + repr.exponent() as f64
            }
        }
    }

    /// Exact binary decomposition: value = significand × 2^exponent.
    fn to_parts(&self) -> (IBig, isize) {
        match &self.value {
            BigFloatValue::F64(v) => {
                if *v == 0.0 {
                    return (IBig::ZERO, 0);
                }
                let (m, e) = libm::frexp(*v);
                let significand = libm::ldexp(m, F64_SIGNIFICAND_BITS) as i64;
                (
                    IBig::from(significand),
                    (e - F64_SIGNIFICAND_BITS) as isize,
                )
            }
            BigFloatValue::Arbitrary(v) => {
                let repr = v.repr();
                (repr.significand().clone(), repr.exponent())
            }
        }
    }

    /// Convert to FBig for arbitrary precision operations
    fn to_fbig(&self) -> FBig {
        self.to_fbig_at(self.precision_bits)
    }

    fn to_fbig_at(&self, precision_bits: usize) -> FBig {
        match &self.value {
            BigFloatValue::F64(v) => f64_to_fbig(*v, precision_bits),
            BigFloatValue::Arbitrary(v) if v.precision() == precision_bits => v.clone(),
            BigFloatValue::Arbitrary(v) => v.clone().with_precision(precision_bits).value(),
        }
    }
}

fn f64_to_fbig(val: f64, precision_bits: usize) -> FBig {
    let precision = precision_bits.max(F64_SIGNIFICAND_BITS as usize);
    // Finite doubles always convert; non-finite input collapses to zero.
    match FBig::try_from(val) {
        Ok(fbig) => fbig.with_precision(precision).value(),
        Err(_) => FBig::ZERO.with_precision(precision).value(),
    }
}

fn fits_f64_exactly(v: &FBig) -> bool {
    let native = v.to_f64();
    matches!(native, Approximation::Exact(f) if f.is_finite())
}

impl PartialEq for BigFloat {
    fn eq(&self, other: &Self) -> bool {
        match (&self.value, &other.value) {
            (BigFloatValue::F64(a), BigFloatValue::F64(b)) => a == b,
            _ => {
                let a_big = self.to_fbig();
                let b_big = other.to_fbig();
                a_big == b_big
            }
        }
    }
}

impl PartialOrd for BigFloat {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        match (&self.value, &other.value) {
            (BigFloatValue::F64(a), BigFloatValue::F64(b)) => a.partial_cmp(b),
            _ => {
                let a_big = self.to_fbig();
                let b_big = other.to_fbig();
                a_big.partial_cmp(&b_big)
            }
        }
    }
}

impl std::fmt::Display for BigFloat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.value {
            BigFloatValue::F64(v) => write!(f, "{}", v),
            BigFloatValue::Arbitrary(v) => write!(f, "{}", v),
        }
    }
}

/// Serialized as an exact binary significand/exponent pair so that
/// a round trip reproduces every stored bit.
#[derive(Serialize, Deserialize)]
struct BigFloatSerde {
    significand: String,
    exponent: i64,
    precision_bits: usize,
}

impl Serialize for BigFloat {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let (significand, exponent) = self.to_parts();
        let serde = BigFloatSerde {
            significand: significand.to_string(),
            exponent: exponent as i64,
            precision_bits: self.precision_bits,
        };

        serde.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for BigFloat {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        use serde::de::Error;

        let serde = BigFloatSerde::deserialize(deserializer)?;
        let significand = IBig::from_str(&serde.significand)
            .map_err(|e| D::Error::custom(format!("invalid significand: {e}")))?;
        let exponent = isize::try_from(serde.exponent)
            .map_err(|_| D::Error::custom("exponent out of range"))?;

        let max_bits = serde.precision_bits.max(F64_SIGNIFICAND_BITS as usize);
        if (&significand).unsigned_abs().bit_len() > max_bits {
            return Err(D::Error::custom(format!(
                "significand wider than declared precision of {} bits",
                serde.precision_bits
            )));
        }

        let exact = FBig::from_parts(significand, exponent);
        let restored = if serde.precision_bits <= 64 && fits_f64_exactly(&exact) {
            BigFloatValue::F64(exact.to_f64().value())
        } else {
            let precision = serde.precision_bits.max(F64_SIGNIFICAND_BITS as usize);
            BigFloatValue::Arbitrary(exact.with_precision(precision).value())
        };

        Ok(BigFloat {
            value: restored,
            precision_bits: serde.precision_bits,
        })
    }
}
