//! Abstractions over concrete kernel session implementations.
//!
//! A session represents one external evaluation engine instance. The pool
//! never serialises payloads itself; concrete sessions own their transport
//! and wire encoding. Keeping the boundary behind the [`KernelSession`]
//! trait lets tests inject lightweight implementations without launching
//! real kernels.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::SessionError;

/// Options passed to the session factory for every session it creates.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionOptions {
    /// Path to the kernel executable or connection target.
    pub kernel_path: PathBuf,
    /// Extra arguments handed to the kernel at launch.
    pub launch_args: Vec<String>,
    /// How long a session may take to become ready.
    pub startup_timeout: Option<Duration>,
}

/// Per-evaluation options recognised by every request kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvalOptions {
    /// Abort the evaluation after this long.
    pub timeout: Option<Duration>,
    /// Treat any kernel message as a failure.
    pub stop_on_message: bool,
}

/// Result of a wrapped evaluation: the value plus side-channel messages.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvalReport {
    /// Textual form of the evaluated result.
    pub result: String,
    /// Messages the kernel emitted while evaluating.
    pub messages: Vec<String>,
    /// Whether the evaluation completed without failure messages.
    pub success: bool,
}

/// The closed set of evaluation request kinds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EvalRequest {
    /// Evaluate and return the textual result.
    Evaluate {
        /// Expression source to evaluate.
        source: String,
    },
    /// Evaluate and return the wire-encoded result.
    EvaluateWire {
        /// Expression source to evaluate.
        source: String,
    },
    /// Evaluate and return the result wrapped with kernel messages.
    EvaluateWrapped {
        /// Expression source to evaluate.
        source: String,
    },
}

impl EvalRequest {
    /// Short label used in log events.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Evaluate { .. } => "evaluate",
            Self::EvaluateWire { .. } => "evaluate_wire",
            Self::EvaluateWrapped { .. } => "evaluate_wrapped",
        }
    }
}

/// Successful outcome of a task, shaped by its request kind.
#[derive(Debug, Clone, PartialEq)]
pub enum EvalOutcome {
    /// Result of [`EvalRequest::Evaluate`].
    Text(String),
    /// Result of [`EvalRequest::EvaluateWire`].
    Wire(Vec<u8>),
    /// Result of [`EvalRequest::EvaluateWrapped`].
    Wrapped(EvalReport),
}

/// Behaviour required from concrete kernel session bindings.
///
/// The pool guarantees strictly sequential access per session: exactly one
/// worker loop drives a session at a time, so implementations need no
/// internal synchronisation of their own.
#[cfg_attr(test, mockall::automock)]
pub trait KernelSession: Send {
    /// Brings the session up; blocks until ready or failed.
    fn start(&mut self) -> Result<(), SessionError>;

    /// Tears the session down; blocks until done.
    fn terminate(&mut self) -> Result<(), SessionError>;

    /// Evaluates `source` and returns the textual result.
    fn evaluate(&mut self, source: &str, options: &EvalOptions) -> Result<String, SessionError>;

    /// Evaluates `source` and returns the wire-encoded result.
    fn evaluate_wire(
        &mut self,
        source: &str,
        options: &EvalOptions,
    ) -> Result<Vec<u8>, SessionError>;

    /// Evaluates `source` and returns the result with kernel messages.
    fn evaluate_wrapped(
        &mut self,
        source: &str,
        options: &EvalOptions,
    ) -> Result<EvalReport, SessionError>;
}

impl fmt::Debug for dyn KernelSession {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str("KernelSession")
    }
}

/// Creates uninitialised sessions for the pool.
pub trait SessionFactory: Send + Sync {
    /// Builds one uninitialised session from the pool's session options.
    fn create(&self, options: &SessionOptions) -> Box<dyn KernelSession>;
}
