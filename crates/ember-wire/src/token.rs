//! Wire tokens and their binary encodings.
//!
//! Each token encodes itself onto a byte sink while updating the supplied
//! [`StructuralContext`]: non-leaf tokens open a new node declaring their
//! child count, leaf tokens count one part against the current node. All
//! structural checks run before the token's bytes reach the sink.

use std::io::Write;

use crate::context::StructuralContext;
use crate::errors::{SerializeError, StructuralError};
use crate::varint::write_varint_u64;

/// Marker byte introducing a function token.
pub const MARKER_FUNCTION: u8 = b'f';
/// Marker byte introducing a symbol token.
pub const MARKER_SYMBOL: u8 = b's';
/// Marker byte introducing a string token.
pub const MARKER_STRING: u8 = b'S';
/// Marker byte introducing a binary data token.
pub const MARKER_BINARY: u8 = b'B';
/// Marker byte introducing an 8-bit integer token.
pub const MARKER_INT8: u8 = b'C';
/// Marker byte introducing a 16-bit integer token.
pub const MARKER_INT16: u8 = b'j';
/// Marker byte introducing a 32-bit integer token.
pub const MARKER_INT32: u8 = b'i';
/// Marker byte introducing a 64-bit integer token.
pub const MARKER_INT64: u8 = b'L';
/// Marker byte introducing a 64-bit real token.
pub const MARKER_REAL64: u8 = b'r';
/// Marker byte introducing an association token.
pub const MARKER_ASSOCIATION: u8 = b'A';
/// Marker byte introducing a rule token.
pub const MARKER_RULE: u8 = b'-';
/// Marker byte introducing a delayed rule token.
pub const MARKER_RULE_DELAYED: u8 = b':';

/// One element of the depth-first token stream.
///
/// String-like payloads borrow from the expression they were derived from,
/// keeping the provider sequence lazy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Token<'a> {
    /// Opens a function node with `argc` arguments; the head follows as an
    /// additional part, so the node spans `argc + 1` parts.
    Function {
        /// Number of arguments, excluding the head.
        argc: usize,
    },
    /// A symbol leaf.
    Symbol(&'a str),
    /// A UTF-8 string leaf.
    String(&'a str),
    /// A raw binary data leaf.
    Binary(&'a [u8]),
    /// An 8-bit signed integer leaf.
    Int8(i8),
    /// A 16-bit signed integer leaf.
    Int16(i16),
    /// A 32-bit signed integer leaf.
    Int32(i32),
    /// A 64-bit signed integer leaf.
    Int64(i64),
    /// A 64-bit floating point leaf.
    Real64(f64),
    /// Opens an association node with `len` rule entries.
    Association {
        /// Number of key/value entries.
        len: usize,
    },
    /// Opens a two-part rule node; valid only inside an association.
    Rule,
    /// Opens a two-part delayed rule node; valid only inside an association.
    RuleDelayed,
}

impl Token<'_> {
    /// Encodes this token onto `sink`, updating `context`.
    ///
    /// # Errors
    ///
    /// Fails with a structural error before any byte is written when the
    /// token does not fit the declared structure, or with an IO error when
    /// the sink rejects the write.
    pub fn encode(
        &self,
        sink: &mut dyn Write,
        context: &mut StructuralContext,
    ) -> Result<(), SerializeError> {
        match *self {
            Self::Function { argc } => {
                // Head plus arguments.
                context.enter_new_node(argc + 1, false)?;
                sink.write_all(&[MARKER_FUNCTION])?;
                write_varint_u64(argc as u64, sink)?;
                Ok(())
            }
            Self::Symbol(name) => {
                context.record_part()?;
                Self::write_sized(sink, MARKER_SYMBOL, name.as_bytes())
            }
            Self::String(text) => {
                context.record_part()?;
                Self::write_sized(sink, MARKER_STRING, text.as_bytes())
            }
            Self::Binary(data) => {
                context.record_part()?;
                Self::write_sized(sink, MARKER_BINARY, data)
            }
            Self::Int8(value) => {
                context.record_part()?;
                sink.write_all(&[MARKER_INT8])?;
                sink.write_all(&value.to_le_bytes())?;
                Ok(())
            }
            Self::Int16(value) => {
                context.record_part()?;
                sink.write_all(&[MARKER_INT16])?;
                sink.write_all(&value.to_le_bytes())?;
                Ok(())
            }
            Self::Int32(value) => {
                context.record_part()?;
                sink.write_all(&[MARKER_INT32])?;
                sink.write_all(&value.to_le_bytes())?;
                Ok(())
            }
            Self::Int64(value) => {
                context.record_part()?;
                sink.write_all(&[MARKER_INT64])?;
                sink.write_all(&value.to_le_bytes())?;
                Ok(())
            }
            Self::Real64(value) => {
                context.record_part()?;
                sink.write_all(&[MARKER_REAL64])?;
                sink.write_all(&value.to_le_bytes())?;
                Ok(())
            }
            Self::Association { len } => {
                context.enter_new_node(len, true)?;
                sink.write_all(&[MARKER_ASSOCIATION])?;
                write_varint_u64(len as u64, sink)?;
                Ok(())
            }
            Self::Rule => Self::encode_rule(sink, context, MARKER_RULE),
            Self::RuleDelayed => Self::encode_rule(sink, context, MARKER_RULE_DELAYED),
        }
    }

    fn encode_rule(
        sink: &mut dyn Write,
        context: &mut StructuralContext,
        marker: u8,
    ) -> Result<(), SerializeError> {
        if !context.is_association_context() {
            return Err(StructuralError::RuleOutsideAssociation.into());
        }
        // Key and value.
        context.enter_new_node(2, false)?;
        sink.write_all(&[marker])?;
        Ok(())
    }

    fn write_sized(
        sink: &mut dyn Write,
        marker: u8,
        payload: &[u8],
    ) -> Result<(), SerializeError> {
        sink.write_all(&[marker])?;
        write_varint_u64(payload.len() as u64, sink)?;
        sink.write_all(payload)?;
        Ok(())
    }
}
