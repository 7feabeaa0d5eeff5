pub mod bigfloat;
pub mod complex;
pub mod compute_data;
pub mod config;
pub mod error;
pub mod floatexp;
pub mod palette;
pub mod parameter;
pub mod pixel_rect;
pub mod precision;
pub mod viewport;

pub use bigfloat::BigFloat;
pub use complex::{DeepComplex, F64Complex, FloatExpComplex, PlaneComplex};
pub use compute_data::EscapeTime;
pub use config::{EngineConfig, MANDELBROT_CONFIG};
pub use error::{ConfigurationError, FormatError, NumericError};
pub use floatexp::FloatExp;
pub use palette::{Color, ColorStop, Palette, IN_SET_COLOR};
pub use parameter::Parameter;
pub use pixel_rect::PixelRect;
pub use precision::{required_precision_bits, MAX_PRECISION_BITS, NATIVE_PRECISION_BITS};
pub use viewport::Viewport;
