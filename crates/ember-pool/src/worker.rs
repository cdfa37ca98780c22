//! Worker loops: the unit of concurrent execution inside the pool.
//!
//! One loop runs per started session and drains the shared queue
//! sequentially, which gives each session natural mutual exclusion. Once a
//! task is dequeued its execution cannot be interrupted from outside; the
//! only stopping points are the wait for the next queue entry and the
//! shutdown sentinel.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use crossbeam_channel::Receiver;
use tracing::{debug, error, info, warn};

use crate::errors::{EvalError, SessionError};
use crate::queue::QueueEntry;
use crate::session::{EvalOptions, EvalOutcome, EvalRequest, KernelSession};
use crate::task::Task;

/// Log target for worker loop events.
pub(crate) const WORKER_TARGET: &str = "ember_pool::worker";

/// Shared ownership of one session between its worker loop and the pool.
///
/// The mutex is uncontended while the loop runs; the pool only locks the
/// session during startup and termination.
#[derive(Debug)]
pub(crate) struct SessionSlot {
    pub(crate) id: usize,
    session: Mutex<Box<dyn KernelSession>>,
    failed: AtomicBool,
}

impl SessionSlot {
    pub(crate) fn new(id: usize, session: Box<dyn KernelSession>) -> Self {
        Self {
            id,
            session: Mutex::new(session),
            failed: AtomicBool::new(false),
        }
    }

    /// Runs `operation` with exclusive access to the session, recovering
    /// from a mutex poisoned by a panicked worker so shutdown can still
    /// reach the session.
    pub(crate) fn with_session<T>(
        &self,
        operation: impl FnOnce(&mut dyn KernelSession) -> T,
    ) -> T {
        let mut guard = self
            .session
            .lock()
            .unwrap_or_else(|poison| poison.into_inner());
        operation(guard.as_mut())
    }

    /// Removes the session from the pool's working set.
    pub(crate) fn mark_failed(&self) {
        self.failed.store(true, Ordering::SeqCst);
    }

    pub(crate) fn is_failed(&self) -> bool {
        self.failed.load(Ordering::SeqCst)
    }
}

/// Drains the shared queue until a shutdown sentinel or channel closure.
pub(crate) fn run_worker(slot: &SessionSlot, queue: &Receiver<QueueEntry>) {
    loop {
        debug!(target: WORKER_TARGET, session = slot.id, "waiting for a queue entry");
        match queue.recv() {
            Err(_) => {
                debug!(target: WORKER_TARGET, session = slot.id, "queue closed, stopping loop");
                break;
            }
            Ok(QueueEntry::Shutdown) => {
                info!(target: WORKER_TARGET, session = slot.id, "termination requested");
                break;
            }
            Ok(QueueEntry::Task(task)) => execute(slot, task),
        }
    }
}

/// Executes one task against the loop's session.
///
/// Ordinary failures resolve into the task's completion handle and the
/// loop keeps serving. An unwinding session is unrecoverable: the failure
/// is still recorded in the handle so the caller is not left waiting, then
/// the panic is re-raised to terminate this loop alone.
fn execute(slot: &SessionSlot, task: Task) {
    let Task {
        request,
        options,
        completion,
    } = task;

    debug!(
        target: WORKER_TARGET,
        session = slot.id,
        kind = request.kind(),
        "executing task"
    );

    match panic::catch_unwind(AssertUnwindSafe(|| dispatch(slot, &request, &options))) {
        Ok(result) => {
            if let Err(error) = &result {
                warn!(
                    target: WORKER_TARGET,
                    session = slot.id,
                    kind = request.kind(),
                    error = %error,
                    "task failed; failure returned through its completion handle"
                );
            }
            completion.resolve(result.map_err(EvalError::from));
        }
        Err(fault) => {
            error!(
                target: WORKER_TARGET,
                session = slot.id,
                kind = request.kind(),
                "unrecoverable fault in worker loop"
            );
            completion.resolve(Err(EvalError::Abandoned));
            panic::resume_unwind(fault);
        }
    }
}

fn dispatch(
    slot: &SessionSlot,
    request: &EvalRequest,
    options: &EvalOptions,
) -> Result<EvalOutcome, SessionError> {
    slot.with_session(|session| match request {
        EvalRequest::Evaluate { source } => {
            session.evaluate(source, options).map(EvalOutcome::Text)
        }
        EvalRequest::EvaluateWire { source } => {
            session.evaluate_wire(source, options).map(EvalOutcome::Wire)
        }
        EvalRequest::EvaluateWrapped { source } => session
            .evaluate_wrapped(source, options)
            .map(EvalOutcome::Wrapped),
    })
}
