pub mod cancellation;
pub mod engine;
pub mod error;
pub mod mandelbrot;
pub mod progressive;
pub mod render_job;
pub mod render_sink;

pub use cancellation::{CancelFlag, CancellationChecker, NeverCancel};
pub use engine::MandelbrotEngine;
pub use error::EngineError;
pub use mandelbrot::{escape_time, escape_time_cancellable, RenderSnapshot, CANCEL_CHECK_INTERVAL};
pub use progressive::ProgressivePass;
pub use render_job::{RenderHandle, RenderStatus};
pub use render_sink::{BufferSink, RenderSink};

// Re-export core types for convenience
pub use maplemandel_core::*;
