//! Complex number types for escape-time iteration.
//!
//! Provides a trait abstraction over f64 and BigFloat complex numbers,
//! enabling a single generic iteration loop with zero runtime overhead,
//! plus an extended-range delta used to offset the view center.

use serde::{Deserialize, Serialize};

use crate::{BigFloat, FloatExp, NumericError};

/// Complex number type usable by the escape-time loop.
pub trait PlaneComplex: Clone + Sized {
    /// Returns the additive identity (zero) with the same precision as self.
    fn zero(&self) -> Self;

    /// Extract as f64 pair for output and comparisons.
    fn to_f64_pair(&self) -> (f64, f64);

    /// Complex addition.
    fn add(&self, other: &Self) -> Self;

    /// Complex subtraction.
    fn sub(&self, other: &Self) -> Self;

    /// Complex multiplication.
    fn mul(&self, other: &Self) -> Self;

    /// Complex square (optimized).
    fn square(&self) -> Self;

    /// Magnitude squared as f64 (for the escape check).
    fn norm_sq(&self) -> f64;
}

/// Simple f64 complex number for shallow zoom levels.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct F64Complex {
    pub re: f64,
    pub im: f64,
}

impl F64Complex {
    pub fn new(re: f64, im: f64) -> Self {
        Self { re, im }
    }
}

impl PlaneComplex for F64Complex {
    #[inline]
    fn zero(&self) -> Self {
        Self { re: 0.0, im: 0.0 }
    }

    #[inline]
    fn to_f64_pair(&self) -> (f64, f64) {
        (self.re, self.im)
    }

    #[inline]
    fn add(&self, other: &Self) -> Self {
        Self {
            re: self.re + other.re,
            im: self.im + other.im,
        }
    }

    #[inline]
    fn sub(&self, other: &Self) -> Self {
        Self {
            re: self.re - other.re,
            im: self.im - other.im,
        }
    }

    #[inline]
    fn mul(&self, other: &Self) -> Self {
        Self {
            re: self.re * other.re - self.im * other.im,
            im: self.re * other.im + self.im * other.re,
        }
    }

    // Same operation order as DeepComplex::square so both tiers agree bit-for-bit
    // while DeepComplex is held natively.
    #[inline]
    fn square(&self) -> Self {
        Self {
            re: self.re * self.re - self.im * self.im,
            im: (self.re * self.im) * 2.0,
        }
    }

    #[inline]
    fn norm_sq(&self) -> f64 {
        self.re * self.re + self.im * self.im
    }
}

/// Arbitrary-precision point in the complex plane.
///
/// Both components always carry the same precision; combining two values of
/// differing precision widens to the larger one.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DeepComplex {
    pub re: BigFloat,
    pub im: BigFloat,
}

impl DeepComplex {
    /// Create a new DeepComplex from BigFloat components.
    pub fn new(re: BigFloat, im: BigFloat) -> Self {
        let precision = re.precision_bits().max(im.precision_bits());
        Self {
            re: re.rescaled(precision),
            im: im.rescaled(precision),
        }
    }

    pub fn from_f64_pair(re: f64, im: f64, precision_bits: usize) -> Self {
        Self {
            re: BigFloat::with_precision(re, precision_bits),
            im: BigFloat::with_precision(im, precision_bits),
        }
    }

    /// Like [`from_f64_pair`](Self::from_f64_pair), rejecting NaN and infinities.
    pub fn try_from_f64_pair(re: f64, im: f64, precision_bits: usize) -> Result<Self, NumericError> {
        Ok(Self {
            re: BigFloat::try_with_precision(re, precision_bits)?,
            im: BigFloat::try_with_precision(im, precision_bits)?,
        })
    }

    pub fn from_strings(re: &str, im: &str, precision_bits: usize) -> Result<Self, NumericError> {
        Ok(Self {
            re: BigFloat::from_string(re, precision_bits)?,
            im: BigFloat::from_string(im, precision_bits)?,
        })
    }

    pub fn precision_bits(&self) -> usize {
        self.re.precision_bits()
    }

    /// Whether both components hold finite values.
    pub fn is_finite(&self) -> bool {
        self.re.is_finite() && self.im.is_finite()
    }

    /// Widen to at least `precision_bits`; never narrows.
    pub fn with_min_precision(&self, precision_bits: usize) -> Self {
        if precision_bits <= self.precision_bits() {
            return self.clone();
        }
        Self {
            re: self.re.rescaled(precision_bits),
            im: self.im.rescaled(precision_bits),
        }
    }

    /// Offset by an extended-range delta without losing any of its bits.
    pub fn add_delta(&self, delta: &FloatExpComplex) -> Self {
        let precision = self.precision_bits();
        Self {
            re: self.re.add(&BigFloat::from_float_exp(&delta.re, precision)),
            im: self.im.add(&BigFloat::from_float_exp(&delta.im, precision)),
        }
        .equalized()
    }

    fn equalized(self) -> Self {
        if self.re.precision_bits() == self.im.precision_bits() {
            return self;
        }
        Self::new(self.re, self.im)
    }
}

impl PlaneComplex for DeepComplex {
    fn zero(&self) -> Self {
        let precision = self.precision_bits();
        Self {
            re: BigFloat::zero(precision),
            im: BigFloat::zero(precision),
        }
    }

    fn to_f64_pair(&self) -> (f64, f64) {
        (self.re.to_f64(), self.im.to_f64())
    }

    fn add(&self, other: &Self) -> Self {
        Self {
            re: self.re.add(&other.re),
            im: self.im.add(&other.im),
        }
    }

    fn sub(&self, other: &Self) -> Self {
        Self {
            re: self.re.sub(&other.re),
            im: self.im.sub(&other.im),
        }
    }

    fn mul(&self, other: &Self) -> Self {
        Self {
            re: self.re.mul(&other.re).sub(&self.im.mul(&other.im)),
            im: self.re.mul(&other.im).add(&self.im.mul(&other.re)),
        }
    }

    fn square(&self) -> Self {
        let two = BigFloat::with_precision(2.0, self.precision_bits());
        Self {
            re: self.re.mul(&self.re).sub(&self.im.mul(&self.im)),
            im: self.re.mul(&self.im).mul(&two),
        }
    }

    fn norm_sq(&self) -> f64 {
        self.re.mul(&self.re).add(&self.im.mul(&self.im)).to_f64()
    }
}

/// Complex offset with extended-range components.
///
/// Represents distances from the view center that may be far smaller than
/// the smallest positive f64.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FloatExpComplex {
    pub re: FloatExp,
    pub im: FloatExp,
}

impl FloatExpComplex {
    pub fn new(re: FloatExp, im: FloatExp) -> Self {
        Self { re, im }
    }

    pub fn is_zero(&self) -> bool {
        self.re.is_zero() && self.im.is_zero()
    }

    /// Lossy conversion; components outside the f64 range saturate.
    pub fn to_f64_pair(&self) -> (f64, f64) {
        (self.re.to_f64(), self.im.to_f64())
    }

    pub fn add(&self, other: &Self) -> Self {
        Self {
            re: self.re.add(&other.re),
            im: self.im.add(&other.im),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn f64_complex_zero_returns_origin() {
        let c = F64Complex::new(1.0, 2.0);
        let z = c.zero();
        assert_eq!(z.re, 0.0);
        assert_eq!(z.im, 0.0);
    }

    #[test]
    fn f64_complex_mul() {
        // (1 + 2i) * (3 + 4i) = 3 + 4i + 6i + 8i² = 3 + 10i - 8 = -5 + 10i
        let a = F64Complex::new(1.0, 2.0);
        let b = F64Complex::new(3.0, 4.0);
        assert_eq!(a.mul(&b).to_f64_pair(), (-5.0, 10.0));
    }

    #[test]
    fn f64_complex_square() {
        // (3 + 4i)² = 9 + 24i + 16i² = -7 + 24i
        let a = F64Complex::new(3.0, 4.0);
        assert_eq!(a.square().to_f64_pair(), (-7.0, 24.0));
    }

    #[test]
    fn f64_complex_norm_sq() {
        let a = F64Complex::new(3.0, 4.0);
        assert_eq!(a.norm_sq(), 25.0);
    }

    #[test]
    fn deep_complex_zero_preserves_precision() {
        let a = DeepComplex::from_f64_pair(1.0, 2.0, 256);
        let z = a.zero();
        assert_eq!(z.to_f64_pair(), (0.0, 0.0));
        assert_eq!(z.re.precision_bits(), 256);
    }

    #[test]
    fn deep_complex_mul() {
        let a = DeepComplex::from_f64_pair(1.0, 2.0, 128);
        let b = DeepComplex::from_f64_pair(3.0, 4.0, 128);
        let (re, im) = a.mul(&b).to_f64_pair();
        assert!((re - (-5.0)).abs() < 1e-10);
        assert!((im - 10.0).abs() < 1e-10);
    }

    #[test]
    fn deep_complex_square_matches_f64_when_native() {
        let deep = DeepComplex::from_f64_pair(0.3, -0.7, 64);
        let native = F64Complex::new(0.3, -0.7);
        assert_eq!(deep.square().to_f64_pair(), native.square().to_f64_pair());
    }

    #[test]
    fn new_widens_mismatched_components() {
        let c = DeepComplex::new(
            BigFloat::with_precision(1.0, 64),
            BigFloat::with_precision(2.0, 512),
        );
        assert_eq!(c.re.precision_bits(), 512);
        assert_eq!(c.im.precision_bits(), 512);
    }

    #[test]
    fn add_widens_to_larger_precision() {
        let a = DeepComplex::from_f64_pair(1.0, 1.0, 64);
        let b = DeepComplex::from_f64_pair(0.5, 0.5, 1024);
        assert_eq!(a.add(&b).precision_bits(), 1024);
    }

    #[test]
    fn add_delta_keeps_sub_f64_offsets() {
        let center = DeepComplex::from_f64_pair(-0.75, 0.1, 2048);
        let tiny = FloatExp::from_parts(0.5, -1500);
        let moved = center.add_delta(&FloatExpComplex::new(tiny, tiny.neg()));
        assert!(moved.re > center.re);
        assert!(moved.im < center.im);
        let back = moved.sub(&center);
        assert!((back.re.log2_approx() - (-1501.0)).abs() < 1e-9);
    }

    #[test]
    fn try_from_f64_pair_rejects_nan() {
        assert!(matches!(
            DeepComplex::try_from_f64_pair(f64::NAN, 0.0, 64),
            Err(NumericError::NotFinite(_))
        ));
        assert!(DeepComplex::try_from_f64_pair(0.0, f64::INFINITY, 256).is_err());
        let c = DeepComplex::try_from_f64_pair(-0.5, 0.25, 256).unwrap();
        assert!(c.is_finite());
        assert_eq!(c, DeepComplex::from_f64_pair(-0.5, 0.25, 256));
    }

    #[test]
    fn with_min_precision_never_narrows() {
        let c = DeepComplex::from_f64_pair(0.0, 0.0, 512);
        assert_eq!(c.with_min_precision(128).precision_bits(), 512);
        assert_eq!(c.with_min_precision(1024).precision_bits(), 1024);
    }
}
