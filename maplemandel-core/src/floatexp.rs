//! Extended-range floating point for zoom scales and pixel deltas.
//!
//! FloatExp = f64 mantissa + i64 exponent, providing a range far beyond
//! f64 with 53-bit precision. Used wherever a value must stay exact in
//! magnitude but would underflow a native double (scale at deep zoom,
//! per-pixel step, offsets from the view center).

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::NumericError;

/// Extended-range floating point: f64 mantissa + i64 exponent.
/// Value = mantissa × 2^exp (or 0 if mantissa == 0).
/// Mantissa normalized to [0.5, 1.0) in magnitude for non-zero values.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "FloatExpSerde")]
pub struct FloatExp {
    mantissa: f64,
    exp: i64,
}

#[derive(Deserialize)]
struct FloatExpSerde {
    mantissa: f64,
    exp: i64,
}

impl TryFrom<FloatExpSerde> for FloatExp {
    type Error = NumericError;

    fn try_from(raw: FloatExpSerde) -> Result<Self, Self::Error> {
        if !raw.mantissa.is_finite() {
            return Err(NumericError::NotFinite(raw.mantissa));
        }
        Self::from_parts(raw.mantissa, raw.exp).check_range()
    }
}

impl FloatExp {
    /// Largest binary exponent magnitude accepted by `mul`/`div`.
    pub const MAX_EXPONENT: i64 = i32::MAX as i64;

    pub const ZERO: Self = Self {
        mantissa: 0.0,
        exp: 0,
    };

    /// Zero value.
    pub fn zero() -> Self {
        Self::ZERO
    }

    /// Create from a finite f64 (normalizes automatically).
    pub fn from_f64(val: f64) -> Self {
        debug_assert!(val.is_finite(), "FloatExp::from_f64 called with {val}");
        Self::from_parts(val, 0)
    }

    /// Create from f64, rejecting NaN and infinities.
    pub fn try_from_f64(val: f64) -> Result<Self, NumericError> {
        if !val.is_finite() {
            return Err(NumericError::NotFinite(val));
        }
        Ok(Self::from_parts(val, 0))
    }

    /// Build `mantissa × 2^exp` from an arbitrary finite mantissa.
    pub fn from_parts(mantissa: f64, exp: i64) -> Self {
        if mantissa == 0.0 {
            return Self::ZERO;
        }
        // frexp returns (m, e) with m in [0.5, 1.0)
        let (m, e) = libm::frexp(mantissa);
        Self {
            mantissa: m,
            exp: exp.saturating_add(e as i64),
        }
    }

    pub fn mantissa(&self) -> f64 {
        self.mantissa
    }

    pub fn exponent(&self) -> i64 {
        self.exp
    }

    /// Convert to f64, saturating to ±infinity or zero outside the native range.
    pub fn to_f64(&self) -> f64 {
        if self.mantissa == 0.0 {
            return 0.0;
        }
        if self.exp > 1024 {
            return if self.mantissa > 0.0 {
                f64::INFINITY
            } else {
                f64::NEG_INFINITY
            };
        }
        if self.exp < -1075 {
            return 0.0;
        }
        libm::ldexp(self.mantissa, self.exp as i32)
    }

    pub fn is_zero(&self) -> bool {
        self.mantissa == 0.0
    }

    pub fn is_negative(&self) -> bool {
        self.mantissa < 0.0
    }

    pub fn is_positive(&self) -> bool {
        self.mantissa > 0.0
    }

    /// -1, 0 or 1.
    pub fn signum(&self) -> i32 {
        if self.mantissa > 0.0 {
            1
        } else if self.mantissa < 0.0 {
            -1
        } else {
            0
        }
    }

    pub fn neg(&self) -> Self {
        Self {
            mantissa: -self.mantissa,
            exp: self.exp,
        }
    }

    pub fn abs(&self) -> Self {
        Self {
            mantissa: self.mantissa.abs(),
            exp: self.exp,
        }
    }

    /// Multiply by 2^n without touching the mantissa.
    pub fn ldexp(&self, n: i64) -> Result<Self, NumericError> {
        if self.is_zero() {
            return Ok(*self);
        }
        Self {
            mantissa: self.mantissa,
            exp: self.exp.saturating_add(n),
        }
        .check_range()
    }

    pub fn add(&self, other: &Self) -> Self {
        if self.is_zero() {
            return *other;
        }
        if other.is_zero() {
            return *self;
        }
        let (big, small) = if self.exp >= other.exp {
            (self, other)
        } else {
            (other, self)
        };
        let shift = big.exp.saturating_sub(small.exp);
        // The smaller operand is below half an ulp of the larger one.
        if shift > 64 {
            return *big;
        }
        let sum = big.mantissa + libm::ldexp(small.mantissa, -(shift as i32));
        Self::from_parts(sum, big.exp)
    }

    pub fn sub(&self, other: &Self) -> Self {
        self.add(&other.neg())
    }

    pub fn mul(&self, other: &Self) -> Result<Self, NumericError> {
        if self.is_zero() || other.is_zero() {
            return Ok(Self::ZERO);
        }
        Self::from_parts(
            self.mantissa * other.mantissa,
            self.exp.saturating_add(other.exp),
        )
        .check_range()
    }

    pub fn div(&self, other: &Self) -> Result<Self, NumericError> {
        if other.is_zero() {
            return Err(NumericError::DivisionByZero);
        }
        if self.is_zero() {
            return Ok(Self::ZERO);
        }
        Self::from_parts(
            self.mantissa / other.mantissa,
            self.exp.saturating_sub(other.exp),
        )
        .check_range()
    }

    pub fn mul_f64(&self, factor: f64) -> Result<Self, NumericError> {
        self.mul(&Self::try_from_f64(factor)?)
    }

    pub fn div_f64(&self, divisor: f64) -> Result<Self, NumericError> {
        self.div(&Self::try_from_f64(divisor)?)
    }

    /// log2(|self|); negative infinity for zero.
    pub fn log2(&self) -> f64 {
        if self.is_zero() {
            return f64::NEG_INFINITY;
        }
        self.exp as f64 + self.mantissa.abs().log2()
    }

    fn check_range(self) -> Result<Self, NumericError> {
        if self.exp.unsigned_abs() > Self::MAX_EXPONENT as u64 {
            return Err(NumericError::ExponentOverflow { exponent: self.exp });
        }
        Ok(self)
    }
}

impl PartialOrd for FloatExp {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        let (sa, sb) = (self.signum(), other.signum());
        if sa != sb || sa == 0 {
            return Some(sa.cmp(&sb));
        }
        let magnitude = self
            .exp
            .cmp(&other.exp)
            .then_with(|| {
                self.mantissa
                    .abs()
                    .partial_cmp(&other.mantissa.abs())
                    .unwrap_or(Ordering::Equal)
            });
        Some(if sa > 0 { magnitude } else { magnitude.reverse() })
    }
}

impl fmt::Display for FloatExp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_zero() {
            return write!(f, "0e0");
        }
        if self.exp.abs() < 1000 {
            return write!(f, "{:e}", self.to_f64());
        }
        let log10 = self.log2() * std::f64::consts::LOG10_2;
        let mut decimal_exp = log10.floor();
        let mut digits = 10f64.powf(log10 - decimal_exp);
        if digits >= 10.0 {
            digits /= 10.0;
            decimal_exp += 1.0;
        }
        if self.is_negative() {
            digits = -digits;
        }
        write!(f, "{}e{}", digits, decimal_exp as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_is_zero() {
        let z = FloatExp::zero();
        assert_eq!(z.to_f64(), 0.0);
        assert!(z.is_zero());
    }

    #[test]
    fn from_f64_preserves_value() {
        let values = [1.0, -1.0, 0.5, 2.0, 1e10, 1e-10, -std::f64::consts::PI];
        for v in values {
            let fe = FloatExp::from_f64(v);
            let back = fe.to_f64();
            assert!(
                (back - v).abs() < 1e-14 * v.abs().max(1.0),
                "from_f64({}) -> to_f64() = {}, expected {}",
                v,
                back,
                v
            );
        }
    }

    #[test]
    fn mantissa_normalized_to_half_one() {
        let values = [1.0, 2.0, 0.25, 100.0, 0.001, -7.5];
        for v in values {
            let fe = FloatExp::from_f64(v);
            let m = fe.mantissa.abs();
            assert!(
                (0.5..1.0).contains(&m),
                "mantissa {} not normalized for input {}",
                fe.mantissa,
                v
            );
        }
    }

    #[test]
    fn try_from_f64_rejects_nan() {
        assert!(matches!(
            FloatExp::try_from_f64(f64::NAN),
            Err(NumericError::NotFinite(_))
        ));
    }

    #[test]
    fn equal_values_have_identical_representation() {
        let a = FloatExp::from_f64(3.0);
        let b = FloatExp::from_parts(0.75, 2);
        assert_eq!(a, b);
        assert_eq!(a.mantissa.to_bits(), b.mantissa.to_bits());
        assert_eq!(a.exp, b.exp);
    }

    #[test]
    fn sub_to_zero_normalizes() {
        let a = FloatExp::from_f64(1.5);
        let diff = a.sub(&a);
        assert!(diff.is_zero());
        assert_eq!(diff, FloatExp::ZERO);
    }

    #[test]
    fn add_ignores_negligible_operand() {
        let big = FloatExp::from_f64(1.0);
        let tiny = FloatExp::from_parts(0.5, -500);
        assert_eq!(big.add(&tiny), big);
    }

    #[test]
    fn mul_beyond_f64_range() {
        let tiny = FloatExp::from_parts(0.5, -900);
        let product = tiny.mul(&tiny).unwrap();
        assert_eq!(product.exponent(), -1801);
        assert_eq!(product.to_f64(), 0.0);
        assert!(!product.is_zero());
    }

    #[test]
    fn div_by_zero_is_domain_error() {
        let a = FloatExp::from_f64(1.0);
        assert_eq!(a.div(&FloatExp::ZERO), Err(NumericError::DivisionByZero));
    }

    #[test]
    fn mul_overflowing_exponent_is_reported() {
        let huge = FloatExp::from_parts(0.5, FloatExp::MAX_EXPONENT - 1);
        assert!(matches!(
            huge.mul(&huge),
            Err(NumericError::ExponentOverflow { .. })
        ));
    }

    #[test]
    fn to_f64_saturates() {
        assert_eq!(FloatExp::from_parts(0.5, 5000).to_f64(), f64::INFINITY);
        assert_eq!(FloatExp::from_parts(-0.5, 5000).to_f64(), f64::NEG_INFINITY);
        assert_eq!(FloatExp::from_parts(0.5, -5000).to_f64(), 0.0);
    }

    #[test]
    fn ordering_respects_sign_and_exponent() {
        let neg_big = FloatExp::from_f64(-100.0);
        let neg_small = FloatExp::from_f64(-0.01);
        let pos_tiny = FloatExp::from_parts(0.5, -3000);
        let pos_big = FloatExp::from_f64(100.0);
        assert!(neg_big < neg_small);
        assert!(neg_small < FloatExp::ZERO);
        assert!(FloatExp::ZERO < pos_tiny);
        assert!(pos_tiny < pos_big);
    }

    #[test]
    fn display_deep_value_uses_decimal_exponent() {
        // 2^-2000 ≈ 8.709809816217217e-603
        let v = FloatExp::from_parts(0.5, -1999);
        let s = v.to_string();
        assert!(s.starts_with("8.7098"), "got {s}");
        assert!(s.ends_with("e-603"), "got {s}");
    }

    #[test]
    fn display_shallow_value_matches_f64() {
        assert_eq!(FloatExp::from_f64(4.0).to_string(), "4e0");
    }

    #[test]
    fn serde_roundtrip_is_exact() {
        let v = FloatExp::from_parts(0.123456789012345, -123_456);
        let json = serde_json::to_string(&v).unwrap();
        let back: FloatExp = serde_json::from_str(&json).unwrap();
        assert_eq!(back, v);
    }

    #[test]
    fn deserialize_renormalizes() {
        let back: FloatExp = serde_json::from_str(r#"{"mantissa":4.0,"exp":0}"#).unwrap();
        assert_eq!(back, FloatExp::from_f64(4.0));
    }
}
