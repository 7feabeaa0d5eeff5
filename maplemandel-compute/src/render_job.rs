//! Render job lifecycle.
//!
//! A job moves `Pending -> Running -> {Completed, Cancelled, Failed}` and
//! never leaves a terminal state. A pending job may also be cancelled
//! before it starts running.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use maplemandel_core::NumericError;

use crate::{CancellationChecker, ProgressivePass, RenderSink, RenderSnapshot};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RenderStatus {
    Pending,
    Running,
    Completed,
    Cancelled,
    /// Worker fault; the message describes it.
    Failed(String),
}

impl RenderStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RenderStatus::Completed | RenderStatus::Cancelled | RenderStatus::Failed(_)
        )
    }

    fn can_become(&self, next: &RenderStatus) -> bool {
        match self {
            RenderStatus::Pending => {
                matches!(next, RenderStatus::Running | RenderStatus::Cancelled)
            }
            RenderStatus::Running => next.is_terminal(),
            _ => false,
        }
    }
}

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug)]
struct JobShared {
    id: u64,
    status: Mutex<RenderStatus>,
    status_changed: Condvar,
    pixels_finalized: AtomicU64,
    total_pixels: u64,
}

/// Observer for one render job. Cheap to clone.
#[derive(Clone, Debug)]
pub struct RenderHandle {
    shared: Arc<JobShared>,
}

impl RenderHandle {
    pub(crate) fn new(id: u64, total_pixels: u64) -> Self {
        Self {
            shared: Arc::new(JobShared {
                id,
                status: Mutex::new(RenderStatus::Pending),
                status_changed: Condvar::new(),
                pixels_finalized: AtomicU64::new(0),
                total_pixels,
            }),
        }
    }

    pub fn job_id(&self) -> u64 {
        self.shared.id
    }

    pub fn status(&self) -> RenderStatus {
        lock(&self.shared.status).clone()
    }

    /// Block until the job reaches a terminal state.
    pub fn wait(&self) -> RenderStatus {
        let guard = lock(&self.shared.status);
        let guard = self
            .shared
            .status_changed
            .wait_while(guard, |s| !s.is_terminal())
            .unwrap_or_else(PoisonError::into_inner);
        guard.clone()
    }

    /// Like [`wait`](Self::wait) but gives up after `timeout`, returning the
    /// status at that moment.
    pub fn wait_timeout(&self, timeout: Duration) -> RenderStatus {
        let guard = lock(&self.shared.status);
        let (guard, _) = self
            .shared
            .status_changed
            .wait_timeout_while(guard, timeout, |s| !s.is_terminal())
            .unwrap_or_else(PoisonError::into_inner);
        guard.clone()
    }

    /// Pixels whose final color has been emitted.
    pub fn pixels_finalized(&self) -> u64 {
        self.shared.pixels_finalized.load(Ordering::Acquire)
    }

    pub fn total_pixels(&self) -> u64 {
        self.shared.total_pixels
    }

    /// Apply a lifecycle transition; refused (returns false) out of a
    /// terminal state.
    pub(crate) fn transition(&self, next: RenderStatus) -> bool {
        let mut status = lock(&self.shared.status);
        if !status.can_become(&next) {
            return false;
        }
        log::trace!("Render job {}: {:?} -> {:?}", self.shared.id, *status, next);
        *status = next;
        drop(status);
        self.shared.status_changed.notify_all();
        true
    }

    fn finalize_pixels(&self, count: u64) {
        self.shared.pixels_finalized.fetch_add(count, Ordering::AcqRel);
    }
}

/// Progressive render of a snapshot into a sink; body of the render thread.
///
/// Polls `cancel` before every anchor pixel and periodically while a pixel
/// iterates, and records the terminal status on `handle`.
pub(crate) fn run_job<K: CancellationChecker>(
    snapshot: &RenderSnapshot,
    sink: &dyn RenderSink,
    cancel: &K,
    handle: &RenderHandle,
    coarsest_block: u32,
) {
    if cancel.is_cancelled() {
        handle.transition(RenderStatus::Cancelled);
        return;
    }
    handle.transition(RenderStatus::Running);
    let start = Instant::now();

    let status = match render_progressive(snapshot, sink, cancel, handle, coarsest_block) {
        Ok(true) => RenderStatus::Completed,
        Ok(false) => RenderStatus::Cancelled,
        Err(e) => {
            log::error!("Render job {} failed: {}", handle.job_id(), e);
            RenderStatus::Failed(e.to_string())
        }
    };

    log::debug!(
        "Render job {} finished as {:?}: {}/{} pixels in {:.1}ms",
        handle.job_id(),
        status,
        handle.pixels_finalized(),
        handle.total_pixels(),
        start.elapsed().as_secs_f64() * 1000.0
    );
    handle.transition(status);
}

/// Returns `Ok(false)` when cancelled.
fn render_progressive<K: CancellationChecker>(
    snapshot: &RenderSnapshot,
    sink: &dyn RenderSink,
    cancel: &K,
    handle: &RenderHandle,
    coarsest_block: u32,
) -> Result<bool, NumericError> {
    let image_size = snapshot.image_size();
    for pass in ProgressivePass::sequence(coarsest_block) {
        for block in pass.blocks(image_size) {
            if cancel.is_cancelled() {
                return Ok(false);
            }
            let Some(escape) = snapshot.iterate_pixel_cancellable(block.x, block.y, cancel)?
            else {
                return Ok(false);
            };
            let color = snapshot.color(&escape);
            if pass.is_final() {
                sink.emit_pixel(block.x, block.y, color);
            } else {
                sink.emit_block(block.x, block.y, block.width, block.height, color);
            }
            handle.finalize_pixels(1);
        }
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_states_are_final() {
        let handle = RenderHandle::new(1, 10);
        assert!(handle.transition(RenderStatus::Running));
        assert!(handle.transition(RenderStatus::Completed));
        assert!(!handle.transition(RenderStatus::Running));
        assert!(!handle.transition(RenderStatus::Cancelled));
        assert_eq!(handle.status(), RenderStatus::Completed);
    }

    #[test]
    fn pending_may_be_cancelled_directly() {
        let handle = RenderHandle::new(2, 10);
        assert!(handle.transition(RenderStatus::Cancelled));
        assert_eq!(handle.wait(), RenderStatus::Cancelled);
    }

    #[test]
    fn pending_must_run_before_finishing() {
        let handle = RenderHandle::new(6, 10);
        assert!(!handle.transition(RenderStatus::Completed));
        assert!(!handle.transition(RenderStatus::Failed("early".to_string())));
        assert!(!handle.transition(RenderStatus::Pending));
        assert_eq!(handle.status(), RenderStatus::Pending);
        assert!(handle.transition(RenderStatus::Running));
        assert!(handle.transition(RenderStatus::Completed));
    }

    #[test]
    fn running_cannot_return_to_pending() {
        let handle = RenderHandle::new(3, 10);
        handle.transition(RenderStatus::Running);
        assert!(!handle.transition(RenderStatus::Pending));
        assert!(!handle.transition(RenderStatus::Running));
    }

    #[test]
    fn wait_timeout_reports_non_terminal_status() {
        let handle = RenderHandle::new(4, 10);
        handle.transition(RenderStatus::Running);
        assert_eq!(
            handle.wait_timeout(Duration::from_millis(10)),
            RenderStatus::Running
        );
    }

    #[test]
    fn wait_wakes_on_completion_from_other_thread() {
        let handle = RenderHandle::new(5, 10);
        let worker = handle.clone();
        let thread = std::thread::spawn(move || {
            worker.transition(RenderStatus::Running);
            worker.transition(RenderStatus::Failed("boom".to_string()));
        });
        assert_eq!(handle.wait(), RenderStatus::Failed("boom".to_string()));
        thread.join().unwrap();
    }
}
