//! Precision calculation for deep zoom rendering.
//!
//! Determines how many mantissa bits plane coordinates need to
//! distinguish adjacent pixels at the current zoom.

use crate::{DeepComplex, FloatExp};

/// Precision at or below which coordinates are held as native doubles.
pub const NATIVE_PRECISION_BITS: usize = 64;

/// Largest coordinate precision accepted anywhere.
///
/// A pixel step of 2^-MAX_EXPONENT needs about 2^31 bits, so this covers
/// every scale a FloatExp can hold.
pub const MAX_PRECISION_BITS: usize = 1 << 31;

/// Calculate required precision bits for a view.
///
/// # Arguments
/// * `center` - View center in the complex plane
/// * `scale` - Plane extent of the image's shorter side
/// * `image_size` - The pixel resolution (width, height)
/// * `guard_bits` - Extra bits absorbing rounding error over the iteration
///
/// # Returns
/// ceil(log2(M / pixel_step)) + guard bits, rounded up to a power of 2,
/// minimum 64 and at most [`MAX_PRECISION_BITS`], where M bounds the
/// magnitude of any coordinate in view.
pub fn required_precision_bits(
    center: &DeepComplex,
    scale: &FloatExp,
    image_size: (u32, u32),
    guard_bits: u32,
) -> usize {
    let (width, height) = image_size;
    let min_side = width.min(height).max(1) as f64;
    let max_side = width.max(height).max(1) as f64;

    // log2(pixel_step) where pixel_step = scale / min_side
    let log2_step = scale.log2() - min_side.log2();

    // Half the longer side of the view, in plane units.
    let log2_half_extent = log2_step + (max_side / 2.0).log2();
    let log2_re = center.re.log2_approx();
    let log2_im = center.im.log2_approx();

    // For sums like |re| + half_extent, use max and add 1 bit for safety
    let log2_m = log2_re.max(log2_im).max(log2_half_extent) + 1.0;

    let log2_ratio = log2_m - log2_step;
    let bits_from_ratio = if log2_ratio.is_finite() {
        log2_ratio.ceil().max(0.0) as u64
    } else {
        0
    };

    let total_bits = (bits_from_ratio + guard_bits as u64).min(MAX_PRECISION_BITS as u64);

    (total_bits as usize)
        .next_power_of_two()
        .max(NATIVE_PRECISION_BITS)
}
