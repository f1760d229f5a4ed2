//! Deferred work.
//!
//! Battery object registration and status refreshes never run on the report
//! delivery path. They are queued here and executed on worker threads,
//! optionally after a delay. Unbinding a headset cancels everything still
//! queued and waits for anything already running.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use parking_lot::{Condvar, Mutex};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

/// A unit of deferred work.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// The kinds of deferred work a headset queues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WorkKind {
    CreateBattery,
    DestroyBattery,
    RefreshBattery,
    RefreshFirmware,
}

impl WorkKind {
    /// Whether a second request of this kind is dropped while one is still
    /// waiting to start.
    #[must_use]
    pub fn coalesces(self) -> bool {
        matches!(self, Self::RefreshBattery | Self::RefreshFirmware)
    }
}

/// Executes deferred work on worker threads.
pub trait WorkScheduler: Send + Sync + 'static {
    /// Queue `job` to run after `delay`.
    ///
    /// Returns `false` if the job was dropped, either because the scheduler
    /// has been cancelled or because an identical coalescing job is queued.
    fn schedule(&self, kind: WorkKind, delay: Duration, job: Job) -> bool;

    /// Cancel all queued work and block until running work has finished.
    ///
    /// The scheduler refuses new work afterwards. Must not be called from
    /// inside a job.
    fn cancel_all_sync(&self);
}

/// Admission control shared between the scheduler and its tasks.
#[derive(Default)]
struct Gate {
    state: Mutex<GateState>,
    idle: Condvar,
}

#[derive(Default)]
struct GateState {
    closed: bool,
    running: usize,
}

struct RunGuard(Arc<Gate>);

impl Gate {
    fn enter(self: &Arc<Self>) -> Option<RunGuard> {
        let mut state = self.state.lock();
        if state.closed {
            return None;
        }
        state.running += 1;
        Some(RunGuard(Arc::clone(self)))
    }

    fn is_open(&self) -> bool {
        !self.state.lock().closed
    }

    fn close(&self) {
        self.state.lock().closed = true;
    }

    fn wait_idle(&self) {
        let mut state = self.state.lock();
        while state.running > 0 {
            self.idle.wait(&mut state);
        }
    }
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        let mut state = self.0.state.lock();
        state.running -= 1;
        if state.running == 0 {
            self.0.idle.notify_all();
        }
    }
}

struct Task {
    kind: WorkKind,
    started: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

/// [`WorkScheduler`] backed by a tokio runtime.
///
/// Delays are tokio timers; job bodies run on the blocking pool since they
/// perform synchronous HID writes.
pub struct TokioScheduler {
    runtime: Handle,
    gate: Arc<Gate>,
    tasks: Mutex<Vec<Task>>,
}

impl TokioScheduler {
    /// Create a scheduler that spawns onto `runtime`.
    #[must_use]
    pub fn new(runtime: Handle) -> Self {
        Self { runtime, gate: Arc::new(Gate::default()), tasks: Mutex::new(Vec::new()) }
    }
}

impl WorkScheduler for TokioScheduler {
    fn schedule(&self, kind: WorkKind, delay: Duration, job: Job) -> bool {
        let mut tasks = self.tasks.lock();

        if !self.gate.is_open() {
            debug!(?kind, "Scheduler cancelled, dropping work");
            return false;
        }

        tasks.retain(|task| !task.handle.is_finished());
        if kind.coalesces()
            && tasks.iter().any(|task| task.kind == kind && !task.started.load(Ordering::Acquire))
        {
            trace!(?kind, "Work already queued");
            return false;
        }

        let gate = Arc::clone(&self.gate);
        let started = Arc::new(AtomicBool::new(false));
        let task_started = Arc::clone(&started);

        let handle = self.runtime.spawn(async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            task_started.store(true, Ordering::Release);

            let Some(guard) = gate.enter() else {
                return;
            };

            let result = tokio::task::spawn_blocking(move || {
                let _guard = guard;
                job();
            })
            .await;

            if let Err(e) = result {
                warn!(?kind, error = %e, "Deferred work failed");
            }
        });

        trace!(?kind, delay_ms = delay.as_millis(), "Work scheduled");
        tasks.push(Task { kind, started, handle });
        true
    }

    fn cancel_all_sync(&self) {
        self.gate.close();

        let tasks = std::mem::take(&mut *self.tasks.lock());
        for task in &tasks {
            task.handle.abort();
        }

        self.gate.wait_idle();
        debug!(count = tasks.len(), "Deferred work cancelled");
    }
}

impl Drop for TokioScheduler {
    fn drop(&mut self) {
        for task in self.tasks.get_mut().drain(..) {
            task.handle.abort();
        }
    }
}
