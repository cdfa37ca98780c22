//! Concurrent dispatch pool for external evaluation kernels.
//!
//! The pool owns a fixed set of kernel sessions and a shared task queue.
//! Callers submit one-shot evaluation requests; one worker loop per running
//! session drains the queue and executes tasks against its bound session,
//! resolving each task's completion handle with the result or failure. A
//! bounded queue (capacity `load_factor x requested_size`) supplies
//! backpressure; once a task is dispatched to a session its execution is
//! shielded from interruption because the external kernel is not
//! preemptible.
//!
//! Concrete session bindings stay behind the [`KernelSession`] trait so
//! tests and embedders can inject lightweight implementations without
//! launching real kernels.

mod errors;
mod pool;
mod queue;
mod session;
mod task;
mod worker;

pub use errors::{ConfigError, EvalError, SessionError, StartupError};
pub use pool::{KernelPool, PoolConfig, PoolStatus};
pub use session::{
    EvalOptions, EvalOutcome, EvalReport, EvalRequest, KernelSession, SessionFactory,
    SessionOptions,
};
pub use task::CompletionHandle;

#[cfg(test)]
pub use session::MockKernelSession;

#[cfg(test)]
mod tests;
