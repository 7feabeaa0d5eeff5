use serde::{Deserialize, Serialize};

use crate::precision::{required_precision_bits, MAX_PRECISION_BITS};
use crate::{ConfigurationError, DeepComplex, FloatExp, FloatExpComplex, NumericError};

/// The view being rendered.
///
/// - `center`: Center point in the complex plane, at full stored precision
/// - `scale`: Plane extent covered by the image's shorter side
/// - `max_iterations`: Escape-time iteration cap
/// - `width`, `height`: Image size in pixels
///
/// At extreme zoom depths scale is far below the f64 range (~10^-2000),
/// which is why it is an extended-range float.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub center: DeepComplex,
    pub scale: FloatExp,
    pub max_iterations: u32,
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    /// Create a validated viewport.
    pub fn new(
        center: DeepComplex,
        scale: FloatExp,
        max_iterations: u32,
        width: u32,
        height: u32,
    ) -> Result<Self, ConfigurationError> {
        validate_center(&center)?;
        validate_scale(&scale)?;
        validate_max_iterations(max_iterations)?;
        validate_image_size(width, height)?;
        Ok(Self {
            center,
            scale,
            max_iterations,
            width,
            height,
        })
    }

    /// Create viewport from f64 values with explicit precision
    ///
    /// Use this for initial viewport creation or when f64 precision is sufficient.
    pub fn from_f64(
        center_re: f64,
        center_im: f64,
        scale: f64,
        max_iterations: u32,
        image_size: (u32, u32),
        precision_bits: usize,
    ) -> Result<Self, ConfigurationError> {
        let scale = FloatExp::try_from_f64(scale)
            .map_err(|e| ConfigurationError::InvalidScale(e.to_string()))?;
        let center = DeepComplex::try_from_f64_pair(center_re, center_im, precision_bits)
            .map_err(|e| ConfigurationError::InvalidCenter(e.to_string()))?;
        Self::new(
            center,
            scale,
            max_iterations,
            image_size.0,
            image_size.1,
        )
    }

    pub fn image_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn total_pixels(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// Plane distance between horizontally or vertically adjacent pixels.
    pub fn pixel_step(&self) -> Result<FloatExp, NumericError> {
        self.scale.div_f64(self.width.min(self.height) as f64)
    }

    /// Offset from the center to the given pixel position.
    ///
    /// The imaginary axis points up, so rows above the middle map to
    /// positive imaginary offsets.
    pub fn pixel_offset_to_delta(&self, px: f64, py: f64) -> Result<FloatExpComplex, NumericError> {
        let step = self.pixel_step()?;
        let dx = px - self.width as f64 / 2.0;
        let dy = self.height as f64 / 2.0 - py;
        Ok(FloatExpComplex::new(step.mul_f64(dx)?, step.mul_f64(dy)?))
    }

    /// Plane coordinate of a pixel at full precision.
    pub fn pixel_to_coordinate(&self, px: f64, py: f64) -> Result<DeepComplex, NumericError> {
        Ok(self.center.add_delta(&self.pixel_offset_to_delta(px, py)?))
    }

    /// Precision needed to resolve one pixel at the current scale.
    pub fn required_precision_bits(&self, guard_bits: u32) -> usize {
        required_precision_bits(&self.center, &self.scale, self.image_size(), guard_bits)
    }

    /// Widen the center so it can distinguish adjacent pixels.
    pub fn ensure_precision(&mut self, guard_bits: u32) {
        let required = self.required_precision_bits(guard_bits);
        if required > self.center.precision_bits() {
            self.center = self.center.with_min_precision(required);
        }
    }

    pub fn precision_bits(&self) -> usize {
        self.center.precision_bits()
    }
}

pub(crate) fn validate_center(center: &DeepComplex) -> Result<(), ConfigurationError> {
    if !center.is_finite() {
        return Err(ConfigurationError::InvalidCenter(
            "coordinates must be finite".to_string(),
        ));
    }
    let bits = center.re.precision_bits().max(center.im.precision_bits());
    if bits > MAX_PRECISION_BITS {
        return Err(ConfigurationError::InvalidCenter(format!(
            "precision of {bits} bits exceeds the maximum of {MAX_PRECISION_BITS}"
        )));
    }
    Ok(())
}

pub(crate) fn validate_scale(scale: &FloatExp) -> Result<(), ConfigurationError> {
    if !scale.is_positive() {
        return Err(ConfigurationError::InvalidScale(scale.to_string()));
    }
    Ok(())
}

pub(crate) fn validate_max_iterations(max_iterations: u32) -> Result<(), ConfigurationError> {
    if max_iterations == 0 {
        return Err(ConfigurationError::InvalidMaxIterations(max_iterations));
    }
    Ok(())
}

pub(crate) fn validate_image_size(width: u32, height: u32) -> Result<(), ConfigurationError> {
    if width == 0 || height == 0 {
        return Err(ConfigurationError::InvalidImageSize { width, height });
    }
    Ok(())
}
