//! Error types surfaced by the dispatch pool.
//!
//! Configuration and startup failures are fatal and reported to whoever
//! constructs or starts the pool; per-task failures travel back through the
//! task's completion handle and reach only the caller that issued the task.

use std::error::Error;

use thiserror::Error;

/// Pool construction rejected before any session is created.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The requested pool size must be a positive integer.
    #[error("invalid pool size {requested}: expected a positive integer")]
    InvalidPoolSize {
        /// Size the caller asked for.
        requested: usize,
    },
}

/// Fatal failures while bringing the pool up.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StartupError {
    /// Every session failed to start; the pool is unusable.
    #[error("failed to start any kernel")]
    NoKernelStarted,

    /// The pool has already been started once.
    #[error("the pool has already been started")]
    AlreadyStarted,
}

/// Errors reported by kernel session implementations.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct SessionError {
    message: String,
    #[source]
    source: Option<Box<dyn Error + Send + Sync>>,
}

impl SessionError {
    /// Builds an error without an underlying source.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// Builds an error wrapping an underlying source.
    #[must_use]
    pub fn with_source(
        message: impl Into<String>,
        source: impl Into<Box<dyn Error + Send + Sync>>,
    ) -> Self {
        Self {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Human-friendly description without the optional source.
    #[must_use]
    pub fn message(&self) -> &str {
        self.message.as_str()
    }
}

/// Failures surfaced to a caller awaiting an evaluation.
#[derive(Debug, Error)]
pub enum EvalError {
    /// The session reported a domain failure; forwarded unchanged.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// The worker loop terminated before resolving the task.
    #[error("worker loop terminated before the evaluation completed")]
    Abandoned,

    /// The pool is not accepting tasks.
    #[error("the pool is not running")]
    PoolClosed,

    /// The worker produced a result of an unexpected kind.
    #[error("internal error: {message}")]
    Internal {
        /// What went wrong.
        message: String,
    },
}

impl EvalError {
    pub(crate) fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}
