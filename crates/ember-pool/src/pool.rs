//! Dispatch pool owning a fixed set of kernel sessions.
//!
//! The pool load-balances queued evaluation requests across its sessions
//! and manages their startup and shutdown with partial-failure tolerance:
//! sessions that fail to start are dropped from the working set, and the
//! pool stays usable as long as at least one worker loop is running.

use std::fmt;
use std::sync::atomic::{AtomicU8, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, Sender, unbounded};
use tracing::{info, warn};

use crate::errors::{ConfigError, EvalError, SessionError, StartupError};
use crate::queue::{QueueEntry, task_queue};
use crate::session::{
    EvalOptions, EvalOutcome, EvalReport, EvalRequest, SessionFactory, SessionOptions,
};
use crate::task::{CompletionHandle, Task, completion};
use crate::worker::{SessionSlot, run_worker};

/// Log target for pool lifecycle events.
pub(crate) const POOL_TARGET: &str = "ember_pool::pool";

const STATE_IDLE: u8 = 0;
const STATE_RUNNING: u8 = 1;
const STATE_TERMINATED: u8 = 2;

/// Pool construction parameters.
#[derive(Debug, Clone, Default)]
pub struct PoolConfig {
    /// Number of kernel sessions to create.
    pub requested_size: usize,
    /// Queued workloads per session before submission blocks; zero means
    /// an unbounded queue.
    pub load_factor: usize,
    /// Options handed to the session factory for every session.
    pub session_options: SessionOptions,
}

impl PoolConfig {
    /// Builds a configuration for `requested_size` sessions with an
    /// unbounded queue and default session options.
    #[must_use]
    pub fn new(requested_size: usize) -> Self {
        Self {
            requested_size,
            load_factor: 0,
            session_options: SessionOptions::default(),
        }
    }

    /// Sets the per-session queue load factor.
    #[must_use]
    pub fn with_load_factor(mut self, load_factor: usize) -> Self {
        self.load_factor = load_factor;
        self
    }

    /// Sets the options handed to the session factory.
    #[must_use]
    pub fn with_session_options(mut self, options: SessionOptions) -> Self {
        self.session_options = options;
        self
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Rejects a non-positive pool size before any session is created.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.requested_size == 0 {
            return Err(ConfigError::InvalidPoolSize {
                requested: self.requested_size,
            });
        }
        Ok(())
    }

    fn queue_capacity(&self) -> usize {
        self.load_factor * self.requested_size
    }
}

/// Read-only snapshot of the pool's counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStatus {
    /// Sessions requested at construction.
    pub requested: usize,
    /// Sessions not confirmed failed.
    pub sessions: usize,
    /// Worker loops currently registered.
    pub started: usize,
    /// Evaluations submitted over the pool's lifetime.
    pub evaluations: u64,
}

struct WorkerHandle {
    session: usize,
    handle: JoinHandle<()>,
}

/// A pool of kernel sessions dispatching one-shot evaluations.
///
/// Tasks are delivered to some available worker in queue order; two tasks
/// queued back to back may still complete out of order when picked up by
/// different workers.
pub struct KernelPool {
    config: PoolConfig,
    slots: Vec<Arc<SessionSlot>>,
    sender: Sender<QueueEntry>,
    receiver: Receiver<QueueEntry>,
    workers: Arc<Mutex<Vec<WorkerHandle>>>,
    pending_starts: Vec<JoinHandle<()>>,
    eval_count: AtomicU64,
    state: AtomicU8,
}

impl KernelPool {
    /// Creates the pool's sessions and its task queue.
    ///
    /// # Errors
    ///
    /// Fails with [`ConfigError`] before any session object exists when the
    /// configuration is invalid.
    pub fn new(factory: &dyn SessionFactory, config: PoolConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let (sender, receiver) = task_queue(config.queue_capacity());
        let slots = (0..config.requested_size)
            .map(|id| Arc::new(SessionSlot::new(id, factory.create(&config.session_options))))
            .collect();
        Ok(Self {
            config,
            slots,
            sender,
            receiver,
            workers: Arc::new(Mutex::new(Vec::new())),
            pending_starts: Vec::new(),
            eval_count: AtomicU64::new(0),
            state: AtomicU8::new(STATE_IDLE),
        })
    }

    /// Starts every session concurrently and blocks until the pool is
    /// usable.
    ///
    /// Sessions that fail to start are removed from the working set after a
    /// best-effort cleanup; the pool is usable as soon as one worker loop
    /// runs. Start attempts still pending when this method returns keep
    /// running and are awaited by [`terminate`](Self::terminate).
    ///
    /// # Errors
    ///
    /// Fails with [`StartupError::NoKernelStarted`] when every session
    /// failed, leaving the pool unusable.
    pub fn start(&mut self) -> Result<(), StartupError> {
        if self.state.load(Ordering::SeqCst) != STATE_IDLE {
            return Err(StartupError::AlreadyStarted);
        }

        let (outcome_sender, outcome_receiver) = unbounded::<bool>();
        for slot in &self.slots {
            let starter_slot = Arc::clone(slot);
            let queue = self.receiver.clone();
            let workers = Arc::clone(&self.workers);
            let outcome = outcome_sender.clone();
            let spawned = thread::Builder::new()
                .name(format!("ember-start-{}", slot.id))
                .spawn(move || start_session(&starter_slot, queue, &workers, &outcome));
            match spawned {
                Ok(handle) => self.pending_starts.push(handle),
                Err(error) => {
                    warn!(
                        target: POOL_TARGET,
                        session = slot.id,
                        error = %error,
                        "failed to spawn a starter thread"
                    );
                    slot.mark_failed();
                    let _ = outcome_sender.send(false);
                }
            }
        }
        drop(outcome_sender);

        // Block until at least one loop is running or every start failed.
        let mut any_started = false;
        for started in &outcome_receiver {
            if started {
                any_started = true;
                break;
            }
        }

        if any_started {
            self.state.store(STATE_RUNNING, Ordering::SeqCst);
            info!(
                target: POOL_TARGET,
                requested = self.config.requested_size,
                "pool started"
            );
            Ok(())
        } else {
            self.state.store(STATE_TERMINATED, Ordering::SeqCst);
            Err(StartupError::NoKernelStarted)
        }
    }

    /// Enqueues a request and returns the handle that resolves with its
    /// outcome.
    ///
    /// Blocks while the bounded queue is at capacity; this is the pool's
    /// backpressure mechanism.
    ///
    /// # Errors
    ///
    /// Fails with [`EvalError::PoolClosed`] when the pool is not running.
    pub fn submit(
        &self,
        request: EvalRequest,
        options: EvalOptions,
    ) -> Result<CompletionHandle, EvalError> {
        if self.state.load(Ordering::SeqCst) != STATE_RUNNING {
            return Err(EvalError::PoolClosed);
        }
        let (cell, handle) = completion();
        self.sender
            .send(QueueEntry::Task(Task {
                request,
                options,
                completion: cell,
            }))
            .map_err(|_| EvalError::PoolClosed)?;
        self.eval_count.fetch_add(1, Ordering::Relaxed);
        Ok(handle)
    }

    /// Evaluates `source` and returns the textual result.
    ///
    /// # Errors
    ///
    /// Propagates the task's failure unchanged to this caller.
    pub fn evaluate(
        &self,
        source: impl Into<String>,
        options: EvalOptions,
    ) -> Result<String, EvalError> {
        let request = EvalRequest::Evaluate {
            source: source.into(),
        };
        match self.submit(request, options)?.wait()? {
            EvalOutcome::Text(text) => Ok(text),
            other => Err(EvalError::internal(format!(
                "expected a textual outcome, got {other:?}"
            ))),
        }
    }

    /// Evaluates `source` and returns the wire-encoded result.
    ///
    /// # Errors
    ///
    /// Propagates the task's failure unchanged to this caller.
    pub fn evaluate_wire(
        &self,
        source: impl Into<String>,
        options: EvalOptions,
    ) -> Result<Vec<u8>, EvalError> {
        let request = EvalRequest::EvaluateWire {
            source: source.into(),
        };
        match self.submit(request, options)?.wait()? {
            EvalOutcome::Wire(bytes) => Ok(bytes),
            other => Err(EvalError::internal(format!(
                "expected a wire outcome, got {other:?}"
            ))),
        }
    }

    /// Evaluates `source` and returns the result wrapped with kernel
    /// messages.
    ///
    /// # Errors
    ///
    /// Propagates the task's failure unchanged to this caller.
    pub fn evaluate_wrapped(
        &self,
        source: impl Into<String>,
        options: EvalOptions,
    ) -> Result<EvalReport, EvalError> {
        let request = EvalRequest::EvaluateWrapped {
            source: source.into(),
        };
        match self.submit(request, options)?.wait()? {
            EvalOutcome::Wrapped(report) => Ok(report),
            other => Err(EvalError::internal(format!(
                "expected a wrapped outcome, got {other:?}"
            ))),
        }
    }

    /// Stops the pool: waits out pending start attempts, stops every
    /// worker loop, then terminates every surviving session.
    ///
    /// # Errors
    ///
    /// Returns the first session termination error encountered, after all
    /// termination attempts have finished.
    pub fn terminate(&mut self) -> Result<(), SessionError> {
        self.state.store(STATE_TERMINATED, Ordering::SeqCst);

        // No session may be left starting while being shut down.
        for pending in self.pending_starts.drain(..) {
            if pending.join().is_err() {
                warn!(target: POOL_TARGET, "a starter thread panicked");
            }
        }

        let workers = {
            let mut guard = self
                .workers
                .lock()
                .unwrap_or_else(|poison| poison.into_inner());
            std::mem::take(&mut *guard)
        };

        // One sentinel per loop still alive; loops that already died would
        // never consume theirs.
        let live = workers
            .iter()
            .filter(|worker| !worker.handle.is_finished())
            .count();
        for _ in 0..live {
            let _ = self.sender.send(QueueEntry::Shutdown);
        }
        for worker in workers {
            if worker.handle.join().is_err() {
                warn!(
                    target: POOL_TARGET,
                    session = worker.session,
                    "worker loop exited abnormally"
                );
            }
        }

        // Terminate sessions concurrently regardless of loop exit status,
        // surfacing the first error only after every attempt finished.
        let mut attempts = Vec::new();
        for slot in self.slots.iter().filter(|slot| !slot.is_failed()) {
            let stopper_slot = Arc::clone(slot);
            let spawned = thread::Builder::new()
                .name(format!("ember-stop-{}", slot.id))
                .spawn(move || stopper_slot.with_session(|session| session.terminate()));
            match spawned {
                Ok(handle) => attempts.push((slot.id, handle)),
                Err(error) => {
                    warn!(
                        target: POOL_TARGET,
                        session = slot.id,
                        error = %error,
                        "failed to spawn a termination thread, terminating inline"
                    );
                    if let Err(termination) = slot.with_session(|session| session.terminate()) {
                        warn!(
                            target: POOL_TARGET,
                            session = slot.id,
                            error = %termination,
                            "session termination failed"
                        );
                    }
                }
            }
        }

        let mut first_error = None;
        for (session, handle) in attempts {
            match handle.join() {
                Ok(Ok(())) => {}
                Ok(Err(error)) => {
                    warn!(
                        target: POOL_TARGET,
                        session,
                        error = %error,
                        "session termination failed"
                    );
                    if first_error.is_none() {
                        first_error = Some(error);
                    }
                }
                Err(_) => {
                    warn!(target: POOL_TARGET, session, "a termination thread panicked");
                }
            }
        }

        first_error.map_or(Ok(()), Err)
    }

    /// Returns a snapshot of the pool's counters.
    #[must_use]
    pub fn status(&self) -> PoolStatus {
        let started = self
            .workers
            .lock()
            .unwrap_or_else(|poison| poison.into_inner())
            .len();
        PoolStatus {
            requested: self.config.requested_size,
            sessions: self.slots.iter().filter(|slot| !slot.is_failed()).count(),
            started,
            evaluations: self.eval_count.load(Ordering::Relaxed),
        }
    }
}

impl fmt::Display for KernelPool {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = self.status();
        write!(
            formatter,
            "KernelPool<started {}/{} kernels cumulating {} evaluations>",
            status.started, status.requested, status.evaluations
        )
    }
}

impl fmt::Debug for KernelPool {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("KernelPool")
            .field("status", &self.status())
            .finish_non_exhaustive()
    }
}

/// Starts one session and, on success, spawns its worker loop.
fn start_session(
    slot: &Arc<SessionSlot>,
    queue: Receiver<QueueEntry>,
    workers: &Mutex<Vec<WorkerHandle>>,
    outcome: &Sender<bool>,
) {
    if let Err(error) = slot.with_session(|session| session.start()) {
        warn!(
            target: POOL_TARGET,
            session = slot.id,
            error = %error,
            "a kernel failed to start"
        );
        release_failed_session(slot);
        let _ = outcome.send(false);
        return;
    }

    let loop_slot = Arc::clone(slot);
    let spawned = thread::Builder::new()
        .name(format!("ember-worker-{}", slot.id))
        .spawn(move || run_worker(&loop_slot, &queue));
    match spawned {
        Ok(handle) => {
            workers
                .lock()
                .unwrap_or_else(|poison| poison.into_inner())
                .push(WorkerHandle {
                    session: slot.id,
                    handle,
                });
            let _ = outcome.send(true);
        }
        Err(error) => {
            warn!(
                target: POOL_TARGET,
                session = slot.id,
                error = %error,
                "failed to spawn a worker loop"
            );
            release_failed_session(slot);
            let _ = outcome.send(false);
        }
    }
}

/// Best-effort cleanup after a failed start; secondary failures are logged,
/// not propagated.
fn release_failed_session(slot: &SessionSlot) {
    if let Err(error) = slot.with_session(|session| session.terminate()) {
        warn!(
            target: POOL_TARGET,
            session = slot.id,
            error = %error,
            "clean-up after a failed start raised a secondary failure"
        );
    }
    slot.mark_failed();
}
