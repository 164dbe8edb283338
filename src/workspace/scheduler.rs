//! Deferred, cancellable cleanup tasks.
//!
//! A single background thread owns a deadline-ordered queue of tasks. Tasks
//! run once their deadline passes, independent of whoever scheduled them.
//! Shutdown either waits for every pending deadline or runs everything now.

use std::collections::BTreeMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

type Task = Box<dyn FnOnce() + Send + 'static>;

/// What to do with tasks still pending at shutdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownMode {
    /// Keep honoring deadlines until the queue is empty.
    Await,
    /// Run every pending task immediately.
    Force,
}

struct Pending {
    task: Task,
    flags: Arc<TaskFlags>,
}

#[derive(Default)]
struct TaskFlags {
    cancelled: AtomicBool,
    done: AtomicBool,
}

#[derive(Default)]
struct State {
    pending: BTreeMap<(Instant, u64), Pending>,
    next_seq: u64,
    shutdown: Option<ShutdownMode>,
}

#[derive(Default)]
struct Shared {
    state: Mutex<State>,
    wakeup: Condvar,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Handle to one scheduled task.
#[derive(Clone)]
pub struct CleanupHandle {
    flags: Arc<TaskFlags>,
    due: Instant,
}

impl CleanupHandle {
    /// Prevent the task from running. Returns false if it already ran.
    pub fn cancel(&self) -> bool {
        self.flags.cancelled.store(true, Ordering::SeqCst);
        !self.flags.done.load(Ordering::SeqCst)
    }

    pub fn is_cancelled(&self) -> bool {
        self.flags.cancelled.load(Ordering::SeqCst)
    }

    /// Whether the task has finished running.
    pub fn is_done(&self) -> bool {
        self.flags.done.load(Ordering::SeqCst)
    }

    pub fn due(&self) -> Instant {
        self.due
    }
}

impl std::fmt::Debug for CleanupHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CleanupHandle")
            .field("due", &self.due)
            .field("cancelled", &self.is_cancelled())
            .field("done", &self.is_done())
            .finish()
    }
}

/// Runs tasks after a delay on a dedicated thread.
pub struct CleanupScheduler {
    shared: Arc<Shared>,
    worker: Option<JoinHandle<()>>,
}

impl CleanupScheduler {
    /// Start the scheduler thread.
    pub fn start() -> std::io::Result<Self> {
        let shared = Arc::new(Shared::default());
        let worker_shared = Arc::clone(&shared);
        let worker = std::thread::Builder::new()
            .name("workspace-cleanup".into())
            .spawn(move || run_worker(&worker_shared))?;

        Ok(Self {
            shared,
            worker: Some(worker),
        })
    }

    /// Run `task` once `delay` has elapsed.
    pub fn schedule<F>(&self, delay: Duration, task: F) -> CleanupHandle
    where
        F: FnOnce() + Send + 'static,
    {
        let due = Instant::now() + delay;
        let flags = Arc::new(TaskFlags::default());

        {
            let mut state = self.shared.lock();
            let seq = state.next_seq;
            state.next_seq += 1;
            state.pending.insert(
                (due, seq),
                Pending {
                    task: Box::new(task),
                    flags: Arc::clone(&flags),
                },
            );
        }
        self.shared.wakeup.notify_all();

        CleanupHandle { flags, due }
    }

    /// Number of tasks not yet started, cancelled ones included.
    pub fn pending(&self) -> usize {
        self.shared.lock().pending.len()
    }

    /// Stop the scheduler, draining the queue according to `mode`.
    pub fn shutdown(mut self, mode: ShutdownMode) {
        self.stop(mode);
    }

    fn stop(&mut self, mode: ShutdownMode) {
        let Some(worker) = self.worker.take() else {
            return;
        };
        self.shared.lock().shutdown = Some(mode);
        self.shared.wakeup.notify_all();

        if worker.join().is_err() {
            tracing::error!("Cleanup worker thread panicked");
        }
    }
}

impl Drop for CleanupScheduler {
    fn drop(&mut self) {
        self.stop(ShutdownMode::Force);
    }
}

fn run_task(pending: Pending) {
    if pending.flags.cancelled.load(Ordering::SeqCst) {
        return;
    }
    if catch_unwind(AssertUnwindSafe(pending.task)).is_err() {
        tracing::warn!("Cleanup task panicked");
    }
    pending.flags.done.store(true, Ordering::SeqCst);
}

fn run_worker(shared: &Shared) {
    let mut state = shared.lock();

    loop {
        if state.shutdown == Some(ShutdownMode::Force) {
            let drained = std::mem::take(&mut state.pending);
            drop(state);
            for (_, pending) in drained {
                run_task(pending);
            }
            return;
        }

        let next_due = state.pending.keys().next().map(|(due, _)| *due);
        match next_due {
            Some(due) if due <= Instant::now() => {
                let Some((_, pending)) = state.pending.pop_first() else {
                    continue;
                };
                drop(state);
                run_task(pending);
                state = shared.lock();
            }
            Some(due) => {
                let wait = due.saturating_duration_since(Instant::now());
                state = shared
                    .wakeup
                    .wait_timeout(state, wait)
                    .map(|(guard, _)| guard)
                    .unwrap_or_else(|e| e.into_inner().0);
            }
            None if state.shutdown.is_some() => return,
            None => {
                state = shared
                    .wakeup
                    .wait(state)
                    .unwrap_or_else(|e| e.into_inner());
            }
        }
    }
}
