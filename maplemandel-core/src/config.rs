//! Engine configuration.
//!
//! Default view, zoom limits, precision guard bits and progressive block
//! sizes shared by the engine and the parameter codec.

use serde::{Deserialize, Serialize};

use crate::{ConfigurationError, DeepComplex, FloatExp};

/// Configuration for a Mandelbrot engine instance.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Default center coordinates as strings (preserves precision)
    pub default_center: (String, String),
    /// Default scale (plane extent of the shorter image side)
    pub default_scale: f64,
    /// Default iteration cap
    pub default_max_iterations: u32,
    /// Largest scale reachable by zooming out
    pub max_zoom_out_scale: f64,
    /// Extra mantissa bits beyond what resolves one pixel
    pub guard_bits: u32,
    /// Edge of the coarsest progressive block; a power of two
    pub coarsest_block: u32,
    /// Multiplier applied by `increase_max_iterations`
    pub iteration_growth_factor: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        MANDELBROT_CONFIG.clone()
    }
}

/// Canonical engine configuration.
pub static MANDELBROT_CONFIG: std::sync::LazyLock<EngineConfig> =
    std::sync::LazyLock::new(|| EngineConfig {
        default_center: ("0".to_string(), "0".to_string()),
        default_scale: 4.0,
        default_max_iterations: 256,
        max_zoom_out_scale: 8.0,
        guard_bits: 32,
        coarsest_block: 16,
        iteration_growth_factor: 4,
    });

impl EngineConfig {
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        let invalid = |msg: String| Err(ConfigurationError::InvalidConfig(msg));
        if !(self.default_scale.is_finite() && self.default_scale > 0.0) {
            return invalid(format!("default_scale must be positive, got {}", self.default_scale));
        }
        if !(self.max_zoom_out_scale.is_finite() && self.max_zoom_out_scale > 0.0) {
            return invalid(format!(
                "max_zoom_out_scale must be positive, got {}",
                self.max_zoom_out_scale
            ));
        }
        if self.default_max_iterations == 0 {
            return invalid("default_max_iterations must be positive".to_string());
        }
        if !self.coarsest_block.is_power_of_two() {
            return invalid(format!(
                "coarsest_block must be a power of two, got {}",
                self.coarsest_block
            ));
        }
        if self.iteration_growth_factor < 2 {
            return invalid(format!(
                "iteration_growth_factor must be at least 2, got {}",
                self.iteration_growth_factor
            ));
        }
        self.default_center()?;
        Ok(())
    }

    /// Default center parsed at native precision.
    pub fn default_center(&self) -> Result<DeepComplex, ConfigurationError> {
        DeepComplex::from_strings(&self.default_center.0, &self.default_center.1, 64)
            .map_err(|e| ConfigurationError::InvalidConfig(format!("default_center: {e}")))
    }

    pub fn default_scale(&self) -> FloatExp {
        FloatExp::from_f64(self.default_scale)
    }

    pub fn max_zoom_out_scale(&self) -> FloatExp {
        FloatExp::from_f64(self.max_zoom_out_scale)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mandelbrot_config_values() {
        assert_eq!(MANDELBROT_CONFIG.default_scale, 4.0);
        assert_eq!(MANDELBROT_CONFIG.default_max_iterations, 256);
        assert_eq!(MANDELBROT_CONFIG.max_zoom_out_scale, 8.0);
        assert_eq!(MANDELBROT_CONFIG.coarsest_block, 16);
        MANDELBROT_CONFIG.validate().unwrap();
    }

    #[test]
    fn default_center_is_origin() {
        let center = MANDELBROT_CONFIG.default_center().unwrap();
        assert_eq!(center, DeepComplex::from_f64_pair(0.0, 0.0, 64));
    }

    #[test]
    fn validate_rejects_non_power_of_two_block() {
        let config = EngineConfig {
            coarsest_block: 12,
            ..EngineConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigurationError::InvalidConfig(_))
        ));
    }

    #[test]
    fn validate_rejects_unparseable_center() {
        let config = EngineConfig {
            default_center: ("zero".to_string(), "0".to_string()),
            ..EngineConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn config_loads_from_json() {
        let json = serde_json::to_string(&*MANDELBROT_CONFIG).unwrap();
        let config: EngineConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config, *MANDELBROT_CONFIG);
    }
}
