//! Error types surfaced by the wire encoder.
//!
//! Structural violations are caught before the offending byte reaches the
//! sink, so a [`SerializeError`] always means the destination holds a
//! partially written payload that must be discarded.

use std::io;

use thiserror::Error;

/// Error raised when a value cannot be represented as a varint.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("negative value {value} cannot be encoded as a varint")]
pub struct EncodingError {
    /// Value that was rejected.
    pub value: i64,
}

/// Structural violations detected while tracking declared child counts.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StructuralError {
    /// More parts were emitted than the node declared.
    #[error("out of bounds: number of parts is greater than declared length {declared}")]
    TooManyParts {
        /// Length the offending node declared when it was opened.
        declared: usize,
    },

    /// A part was emitted after the root expression was already complete.
    #[error("no open node to attach a part to")]
    NoOpenNode,

    /// A rule token was used outside an association frame.
    #[error("rule token is only valid inside an association")]
    RuleOutsideAssociation,
}

/// Errors returned by [`crate::WireSerializer::serialize`].
#[derive(Debug, Error)]
pub enum SerializeError {
    /// The token stream violated its own declared structure.
    #[error("structural violation: {0}")]
    Structural(#[from] StructuralError),

    /// A length field could not be varint-encoded.
    #[error(transparent)]
    Encoding(#[from] EncodingError),

    /// The token stream ended before the tree's declared structure was
    /// fully emitted.
    #[error("inconsistent state: truncated expression")]
    TruncatedExpression,

    /// The underlying byte sink failed.
    #[error("failed to write wire bytes: {0}")]
    Io(#[from] io::Error),
}

impl From<crate::varint::VarintWriteError> for SerializeError {
    fn from(error: crate::varint::VarintWriteError) -> Self {
        match error {
            crate::varint::VarintWriteError::Encoding(encoding) => Self::Encoding(encoding),
            crate::varint::VarintWriteError::Io(io) => Self::Io(io),
        }
    }
}
