//! Tasks and their single-assignment completion handles.

use crossbeam_channel::{Receiver, Sender, bounded};

use crate::errors::EvalError;
use crate::session::{EvalOptions, EvalOutcome, EvalRequest};

pub(crate) type EvalResult = Result<EvalOutcome, EvalError>;

/// One queued evaluation request.
///
/// Created by a caller-facing operation, consumed exactly once by exactly
/// one worker loop, never mutated after creation.
#[derive(Debug)]
pub(crate) struct Task {
    pub(crate) request: EvalRequest,
    pub(crate) options: EvalOptions,
    pub(crate) completion: CompletionCell,
}

/// Resolver half of a completion pair; consumed on resolution.
#[derive(Debug)]
pub(crate) struct CompletionCell {
    sender: Sender<EvalResult>,
}

impl CompletionCell {
    /// Resolves the cell exactly once. A vanished reader is ignored; the
    /// caller gave up waiting and nobody else will read the slot.
    pub(crate) fn resolve(self, result: EvalResult) {
        let _ = self.sender.send(result);
    }
}

/// Caller half of a completion pair.
///
/// The requesting caller blocks on [`wait`](Self::wait) until a worker
/// resolves the cell. A worker that dies before resolving drops its cell,
/// which surfaces as [`EvalError::Abandoned`] rather than a hang.
#[derive(Debug)]
pub struct CompletionHandle {
    receiver: Receiver<EvalResult>,
}

impl CompletionHandle {
    /// Blocks until the task resolves and returns its outcome.
    ///
    /// # Errors
    ///
    /// Propagates the task's failure, or [`EvalError::Abandoned`] when the
    /// serving worker terminated without resolving the task.
    pub fn wait(self) -> Result<EvalOutcome, EvalError> {
        self.receiver.recv().unwrap_or(Err(EvalError::Abandoned))
    }
}

/// Builds a fresh, never-reused completion pair.
pub(crate) fn completion() -> (CompletionCell, CompletionHandle) {
    let (sender, receiver) = bounded(1);
    (CompletionCell { sender }, CompletionHandle { receiver })
}
