//! Binary wire-format encoder for kernel evaluation payloads.
//!
//! The crate converts in-memory [`Expr`] trees into the compact binary
//! format consumed by an evaluation kernel. A traversal-tracking
//! [`StructuralContext`] verifies at encode time that declared lengths
//! match the parts actually emitted, so structural corruption is caught
//! before a single malformed byte reaches the wire. Bodies may optionally
//! be framed into a zlib container; the two- or three-byte header is never
//! compressed.

mod compress;
mod context;
mod errors;
mod expr;
mod provider;
mod serializer;
mod token;
pub mod varint;

pub use compress::CompressedWriter;
pub use context::StructuralContext;
pub use errors::{EncodingError, SerializeError, StructuralError};
pub use expr::{AssocEntry, Expr, Tokens};
pub use provider::{IdentityProvider, TokenProvider};
pub use serializer::{
    WIRE_HEADER_COMPRESS, WIRE_HEADER_SEPARATOR, WIRE_VERSION, WireSerializer, to_wire_bytes,
};
pub use token::Token;

#[cfg(test)]
mod tests;
