// maplemandel-core/src/compute_data.rs

use serde::{Deserialize, Serialize};

/// Escape-time result for one pixel.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct EscapeTime {
    /// Number of iterations before escape (or max_iterations if didn't escape)
    pub iterations: u32,
    /// Iteration cap used for this computation
    pub max_iterations: u32,
    /// Whether the point escaped the radius-2 disk
    pub escaped: bool,
    /// |z|² at escape for continuous coloring. Interior points store 0.0.
    #[serde(default)]
    pub final_norm_sq: f64,
}

impl EscapeTime {
    pub fn escaped(iterations: u32, max_iterations: u32, final_norm_sq: f64) -> Self {
        Self {
            iterations,
            max_iterations,
            escaped: true,
            final_norm_sq: if final_norm_sq.is_finite() {
                final_norm_sq
            } else {
                0.0
            },
        }
    }

    /// A point that reached the iteration cap without escaping.
    pub fn interior(max_iterations: u32) -> Self {
        Self {
            iterations: max_iterations,
            max_iterations,
            escaped: false,
            final_norm_sq: 0.0,
        }
    }

    /// Fractional escape count for smooth coloring.
    ///
    /// Returns `None` for interior points.
    pub fn smooth_iterations(&self) -> Option<f64> {
        if !self.escaped {
            return None;
        }
        if self.final_norm_sq <= 1.0 {
            return Some(self.iterations as f64);
        }
        // log2(log2(|z|)) with |z|² given
        let log2_abs = 0.5 * self.final_norm_sq.log2();
        let nu = if log2_abs > 0.0 { log2_abs.log2() } else { 0.0 };
        Some(self.iterations as f64 + 1.0 - nu)
    }
}
