//! Shared task queue wiring.
//!
//! The queue is the single synchronisation point between callers and
//! workers. A bounded queue makes `send` block when full, which is the
//! pool's backpressure mechanism; capacity zero means unbounded.

use crossbeam_channel::{Receiver, Sender, bounded, unbounded};

use crate::task::Task;

/// One entry of the shared queue.
#[derive(Debug)]
pub(crate) enum QueueEntry {
    /// An evaluation to dispatch.
    Task(Task),
    /// Sentinel asking the receiving worker loop to stop.
    Shutdown,
}

/// Builds the shared MPMC task queue.
pub(crate) fn task_queue(capacity: usize) -> (Sender<QueueEntry>, Receiver<QueueEntry>) {
    if capacity == 0 {
        unbounded()
    } else {
        bounded(capacity)
    }
}
