//! The render engine.
//!
//! Owns the viewport and at most one render job. Every mutator cancels the
//! job in flight and waits for its thread to exit before changing state, so
//! a job always renders a viewport nobody touched after its snapshot, and a
//! superseded job never emits after its successor has started.
//!
//! State sits behind three locks: `worker` serializes mutators and owns the
//! render thread, `view` holds the viewport and palette, `current` holds the
//! latest job's handle and cancel flag. Joins happen under `worker` only, so
//! queries and [`MandelbrotEngine::cancel`] never wait on a render thread.
//! Lock order is `worker` before `view` or `current`.

use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};

use maplemandel_core::{
    ConfigurationError, DeepComplex, EngineConfig, FloatExp, FloatExpComplex, Palette, Parameter,
    Viewport, MANDELBROT_CONFIG,
};

use crate::render_job::{lock, run_job};
use crate::{CancelFlag, EngineError, RenderHandle, RenderSink, RenderSnapshot, RenderStatus};

struct ViewState {
    viewport: Viewport,
    palette: Palette,
}

/// The latest job as seen by observers and `cancel`.
struct JobTicket {
    handle: RenderHandle,
    cancel: CancelFlag,
}

impl JobTicket {
    fn is_running(&self) -> bool {
        !self.handle.status().is_terminal()
    }
}

struct WorkerSlot {
    thread: Option<JoinHandle<()>>,
    next_job_id: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum BusyPolicy {
    /// Cancel the running job and wait for it.
    Block,
    /// Refuse with [`EngineError::Busy`].
    Fail,
}

/// Deep-zoom Mandelbrot renderer with one asynchronous job at a time.
pub struct MandelbrotEngine {
    config: EngineConfig,
    default_center: DeepComplex,
    worker: Mutex<WorkerSlot>,
    view: Mutex<ViewState>,
    current: Mutex<Option<JobTicket>>,
}

impl MandelbrotEngine {
    /// Engine with the canonical configuration, showing the default view.
    pub fn new(width: u32, height: u32) -> Result<Self, EngineError> {
        Self::with_config(MANDELBROT_CONFIG.clone(), width, height)
    }

    pub fn with_config(config: EngineConfig, width: u32, height: u32) -> Result<Self, EngineError> {
        config.validate()?;
        let default_center = config.default_center()?;
        let mut viewport = Viewport::new(
            default_center.clone(),
            config.default_scale(),
            config.default_max_iterations,
            width,
            height,
        )?;
        viewport.ensure_precision(config.guard_bits);
        Ok(Self {
            config,
            default_center,
            worker: Mutex::new(WorkerSlot {
                thread: None,
                next_job_id: 0,
            }),
            view: Mutex::new(ViewState {
                viewport,
                palette: Palette::default(),
            }),
            current: Mutex::new(None),
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn view(&self) -> MutexGuard<'_, ViewState> {
        lock(&self.view)
    }

    fn worker(&self) -> MutexGuard<'_, WorkerSlot> {
        lock(&self.worker)
    }

    // --- Queries ---

    pub fn max_iterations(&self) -> u32 {
        self.view().viewport.max_iterations
    }

    pub fn center(&self) -> DeepComplex {
        self.view().viewport.center.clone()
    }

    pub fn scale(&self) -> FloatExp {
        self.view().viewport.scale
    }

    pub fn image_size(&self) -> (u32, u32) {
        self.view().viewport.image_size()
    }

    /// Copy of the current viewport.
    pub fn viewport(&self) -> Viewport {
        self.view().viewport.clone()
    }

    pub fn palette(&self) -> Palette {
        self.view().palette.clone()
    }

    /// Offset from the view center to the plane point under a pixel.
    pub fn pixel_offset_to_coordinate_delta(
        &self,
        px: f64,
        py: f64,
    ) -> Result<FloatExpComplex, EngineError> {
        Ok(self.view().viewport.pixel_offset_to_delta(px, py)?)
    }

    /// Status of the most recent render job, if any was started.
    pub fn active_status(&self) -> Option<RenderStatus> {
        lock(&self.current).as_ref().map(|job| job.handle.status())
    }

    // --- Mutators (cancel and wait, then apply) ---

    pub fn set_max_iterations(&self, max_iterations: u32) -> Result<(), EngineError> {
        validate_max_iterations(max_iterations)?;
        self.update(
            BusyPolicy::Block,
            |_| Ok(()),
            |view, ()| view.viewport.max_iterations = max_iterations,
        )
    }

    /// Replace center and scale together.
    pub fn goto_location(&self, center: DeepComplex, scale: FloatExp) -> Result<(), EngineError> {
        self.update(
            BusyPolicy::Block,
            |view| self.relocated(&view.viewport, center, scale),
            Self::apply_viewport,
        )
    }

    /// Replace center, scale and iteration cap from a saved parameter, and
    /// the palette if it carries one.
    pub fn load_parameter(&self, parameter: &Parameter) -> Result<(), EngineError> {
        if let Some(palette) = &parameter.palette {
            palette
                .validate()
                .map_err(ConfigurationError::InvalidConfig)?;
        }
        self.update(
            BusyPolicy::Block,
            |view| {
                let (width, height) = view.viewport.image_size();
                let mut viewport = Viewport::new(
                    parameter.center.clone(),
                    parameter.scale,
                    parameter.max_iterations,
                    width,
                    height,
                )
                .inspect_err(|e| log::warn!("Rejected parameter: {e}"))?;
                viewport.ensure_precision(self.config.guard_bits);
                Ok(viewport)
            },
            |view, viewport| {
                Self::apply_viewport(view, viewport);
                if let Some(palette) = &parameter.palette {
                    view.palette = palette.clone();
                }
            },
        )
    }

    /// Snapshot of the current view and palette for saving.
    pub fn save_parameter(&self) -> Parameter {
        let view = self.view();
        Parameter::from_viewport(&view.viewport, Some(view.palette.clone()))
    }

    /// Back to the configured default view and iteration cap.
    pub fn reset(&self) {
        let mut worker = self.worker();
        self.stop(&mut worker);
        let mut view = self.view();
        view.viewport.center = self.default_center.clone();
        view.viewport.scale = self.config.default_scale();
        view.viewport.max_iterations = self.config.default_max_iterations;
        view.viewport.ensure_precision(self.config.guard_bits);
        log::info!("View reset");
    }

    /// Multiply the iteration cap by the configured growth factor.
    ///
    /// Returns the new cap.
    pub fn increase_max_iterations(&self) -> u32 {
        let mut worker = self.worker();
        self.stop(&mut worker);
        let mut view = self.view();
        let next = view
            .viewport
            .max_iterations
            .saturating_mul(self.config.iteration_growth_factor);
        view.viewport.max_iterations = next;
        log::info!("Max iterations raised to {next}");
        next
    }

    /// Center on the plane point under pixel (px, py) and divide the scale by
    /// `factor`. Factors below one zoom out, up to the configured limit.
    pub fn zoom_at(&self, px: f64, py: f64, factor: f64) -> Result<(), EngineError> {
        if !(factor.is_finite() && factor > 0.0) {
            return Err(ConfigurationError::InvalidScale(format!("zoom factor {factor}")).into());
        }
        self.update(
            BusyPolicy::Block,
            |view| {
                let center = view.viewport.pixel_to_coordinate(px, py)?;
                let mut scale = view.viewport.scale.div_f64(factor)?;
                let limit = self.config.max_zoom_out_scale();
                if scale > limit {
                    scale = limit;
                }
                self.relocated(&view.viewport, center, scale)
            },
            Self::apply_viewport,
        )
    }

    /// Change the image size, keeping center and scale.
    pub fn resize(&self, width: u32, height: u32) -> Result<(), EngineError> {
        self.update(
            BusyPolicy::Block,
            |view| {
                let current = &view.viewport;
                let mut viewport = Viewport::new(
                    current.center.clone(),
                    current.scale,
                    current.max_iterations,
                    width,
                    height,
                )?;
                viewport.ensure_precision(self.config.guard_bits);
                Ok(viewport)
            },
            |view, viewport| view.viewport = viewport,
        )
    }

    /// Palettes apply to the next render; a running job keeps its own.
    pub fn set_palette(&self, palette: Palette) -> Result<(), EngineError> {
        palette.validate().map_err(ConfigurationError::InvalidConfig)?;
        self.view().palette = palette;
        Ok(())
    }

    // --- Non-blocking variants ---

    /// Like [`goto_location`](Self::goto_location) but fails with
    /// [`EngineError::Busy`] instead of cancelling a running job.
    pub fn try_goto_location(&self, center: DeepComplex, scale: FloatExp) -> Result<(), EngineError> {
        self.update(
            BusyPolicy::Fail,
            |view| self.relocated(&view.viewport, center, scale),
            Self::apply_viewport,
        )
    }

    /// Like [`set_max_iterations`](Self::set_max_iterations) but fails with
    /// [`EngineError::Busy`] instead of cancelling a running job.
    pub fn try_set_max_iterations(&self, max_iterations: u32) -> Result<(), EngineError> {
        validate_max_iterations(max_iterations)?;
        self.update(
            BusyPolicy::Fail,
            |_| Ok(()),
            |view, ()| view.viewport.max_iterations = max_iterations,
        )
    }

    // --- Rendering ---

    /// Render the current view into `sink` on a background thread.
    ///
    /// Any job in flight is cancelled and joined first. Returns as soon as the
    /// new job is scheduled.
    pub fn start_render(&self, sink: Arc<dyn RenderSink>) -> Result<RenderHandle, EngineError> {
        let mut worker = self.worker();
        self.stop(&mut worker);

        worker.next_job_id += 1;
        let id = worker.next_job_id;
        let (viewport, palette) = {
            let view = self.view();
            (view.viewport.clone(), view.palette.clone())
        };
        let snapshot = RenderSnapshot::new(viewport, palette, self.config.guard_bits);
        let handle = RenderHandle::new(id, snapshot.viewport().total_pixels());
        let cancel = CancelFlag::new();
        let coarsest_block = self.config.coarsest_block;

        log::debug!(
            "Render job {} starting: {}x{}, scale {}, {} iterations, {} bits",
            id,
            snapshot.viewport().width,
            snapshot.viewport().height,
            snapshot.viewport().scale,
            snapshot.viewport().max_iterations,
            snapshot.viewport().precision_bits()
        );

        // Published before the thread exists so an early cancel() reaches it.
        *lock(&self.current) = Some(JobTicket {
            handle: handle.clone(),
            cancel: cancel.clone(),
        });

        let spawned = {
            let handle = handle.clone();
            thread::Builder::new()
                .name(format!("maplemandel-render-{id}"))
                .spawn(move || {
                    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                        run_job(&snapshot, sink.as_ref(), &cancel, &handle, coarsest_block)
                    }));
                    if outcome.is_err() {
                        log::error!("Render job {id} panicked");
                        handle.transition(RenderStatus::Failed("render thread panicked".to_string()));
                    }
                })
        };

        match spawned {
            Ok(thread) => {
                worker.thread = Some(thread);
                Ok(handle)
            }
            Err(e) => {
                log::error!("Could not spawn render thread for job {id}: {e}");
                *lock(&self.current) = None;
                Err(EngineError::Spawn(e))
            }
        }
    }

    /// Ask the job in flight, if any, to stop. Returns immediately; use the
    /// job's [`RenderHandle`] to wait for it to reach `Cancelled`.
    pub fn cancel(&self) {
        if let Some(job) = lock(&self.current).as_ref() {
            job.cancel.cancel();
        }
    }

    /// Cancel the current job and join its thread. Caller holds `worker`.
    fn stop(&self, worker: &mut WorkerSlot) {
        self.cancel();
        if let Some(thread) = worker.thread.take() {
            if thread.join().is_err() {
                log::error!("Render thread did not exit cleanly");
            }
        }
    }

    fn is_busy(&self) -> bool {
        lock(&self.current).as_ref().is_some_and(JobTicket::is_running)
    }

    /// Serialized mutation: validate against the current view, stop the job
    /// in flight, then apply. Nothing is stopped if `prepare` fails.
    fn update<P>(
        &self,
        policy: BusyPolicy,
        prepare: impl FnOnce(&ViewState) -> Result<P, EngineError>,
        apply: impl FnOnce(&mut ViewState, P),
    ) -> Result<(), EngineError> {
        let mut worker = self.worker();
        if policy == BusyPolicy::Fail && self.is_busy() {
            return Err(EngineError::Busy);
        }
        let prepared = prepare(&self.view())?;
        self.stop(&mut worker);
        apply(&mut self.view(), prepared);
        Ok(())
    }

    fn relocated(
        &self,
        current: &Viewport,
        center: DeepComplex,
        scale: FloatExp,
    ) -> Result<Viewport, EngineError> {
        let mut viewport = Viewport::new(
            center,
            scale,
            current.max_iterations,
            current.width,
            current.height,
        )
        .inspect_err(|e| log::warn!("Rejected location: {e}"))?;
        viewport.ensure_precision(self.config.guard_bits);
        Ok(viewport)
    }

    fn apply_viewport(view: &mut ViewState, viewport: Viewport) {
        log::info!(
            "Moved to ({:.6e}, {:.6e}) at scale {} ({} bits)",
            viewport.center.re.to_f64(),
            viewport.center.im.to_f64(),
            viewport.scale,
            viewport.precision_bits()
        );
        view.viewport = viewport;
    }
}

impl Drop for MandelbrotEngine {
    fn drop(&mut self) {
        let mut worker = self.worker();
        self.stop(&mut worker);
    }
}

fn validate_max_iterations(max_iterations: u32) -> Result<(), ConfigurationError> {
    if max_iterations == 0 {
        log::warn!("Rejected max iterations of 0");
        return Err(ConfigurationError::InvalidMaxIterations(max_iterations));
    }
    Ok(())
}
