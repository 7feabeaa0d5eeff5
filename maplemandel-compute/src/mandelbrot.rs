use maplemandel_core::{
    Color, EscapeTime, F64Complex, NumericError, Palette, PlaneComplex, Viewport,
    NATIVE_PRECISION_BITS,
};

use crate::{CancellationChecker, NeverCancel};

/// Escape radius squared: iteration stops once |z|² reaches 4.
const ESCAPE_RADIUS_SQ: f64 = 4.0;

/// Iterations between cancellation polls inside a single pixel.
pub const CANCEL_CHECK_INTERVAL: u32 = 1024;

/// Escape-time iteration z₀ = 0, zₙ₊₁ = zₙ² + c for any complex type.
///
/// Runs while |z|² < 4 and fewer than `max_iterations` steps were taken.
pub fn escape_time<C: PlaneComplex>(c: &C, max_iterations: u32) -> EscapeTime {
    match escape_time_cancellable(c, max_iterations, &NeverCancel) {
        Some(escape) => escape,
        None => EscapeTime::interior(max_iterations),
    }
}

/// [`escape_time`] that polls `cancel` every [`CANCEL_CHECK_INTERVAL`] steps.
///
/// Returns `None` if cancelled before the pixel resolved.
pub fn escape_time_cancellable<C: PlaneComplex, K: CancellationChecker>(
    c: &C,
    max_iterations: u32,
    cancel: &K,
) -> Option<EscapeTime> {
    let mut z = c.zero();
    for n in 1..=max_iterations {
        if n % CANCEL_CHECK_INTERVAL == 0 && cancel.is_cancelled() {
            return None;
        }
        z = z.square().add(c);
        let norm_sq = z.norm_sq();
        if norm_sq >= ESCAPE_RADIUS_SQ {
            return Some(EscapeTime::escaped(n, max_iterations, norm_sq));
        }
    }
    Some(EscapeTime::interior(max_iterations))
}

/// Immutable view state captured when a render job starts.
#[derive(Clone, Debug)]
pub struct RenderSnapshot {
    viewport: Viewport,
    palette: Palette,
    native: bool,
}

impl RenderSnapshot {
    /// Capture a viewport, widening its center to the precision the zoom needs.
    pub fn new(mut viewport: Viewport, palette: Palette, guard_bits: u32) -> Self {
        viewport.ensure_precision(guard_bits);
        let native = viewport.precision_bits() <= NATIVE_PRECISION_BITS;
        Self {
            viewport,
            palette,
            native,
        }
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn image_size(&self) -> (u32, u32) {
        self.viewport.image_size()
    }

    /// Whether pixels are iterated with native doubles.
    pub fn is_native(&self) -> bool {
        self.native
    }

    /// Escape time of the plane point under pixel (x, y).
    pub fn iterate_pixel(&self, x: u32, y: u32) -> Result<EscapeTime, NumericError> {
        let escape = self.iterate_pixel_cancellable(x, y, &NeverCancel)?;
        Ok(escape.unwrap_or_else(|| EscapeTime::interior(self.viewport.max_iterations)))
    }

    /// Like [`iterate_pixel`](Self::iterate_pixel), but gives up with
    /// `Ok(None)` once `cancel` fires mid-pixel.
    pub fn iterate_pixel_cancellable<K: CancellationChecker>(
        &self,
        x: u32,
        y: u32,
        cancel: &K,
    ) -> Result<Option<EscapeTime>, NumericError> {
        let c = self.viewport.pixel_to_coordinate(x as f64, y as f64)?;
        let max_iterations = self.viewport.max_iterations;
        if self.native {
            let (re, im) = c.to_f64_pair();
            Ok(escape_time_cancellable(
                &F64Complex::new(re, im),
                max_iterations,
                cancel,
            ))
        } else {
            Ok(escape_time_cancellable(&c, max_iterations, cancel))
        }
    }

    pub fn color(&self, escape: &EscapeTime) -> Color {
        self.palette.color(escape)
    }

    /// Row-major escape times for the whole image.
    ///
    /// Returns `Ok(None)` if cancelled before finishing.
    pub fn compute_all<K: CancellationChecker>(
        &self,
        cancel: &K,
    ) -> Result<Option<Vec<EscapeTime>>, NumericError> {
        let (width, height) = self.image_size();
        let mut data = Vec::with_capacity(width as usize * height as usize);
        for y in 0..height {
            if cancel.is_cancelled() {
                return Ok(None);
            }
            for x in 0..width {
                match self.iterate_pixel_cancellable(x, y, cancel)? {
                    Some(escape) => data.push(escape),
                    None => return Ok(None),
                }
            }
        }
        Ok(Some(data))
    }
}
