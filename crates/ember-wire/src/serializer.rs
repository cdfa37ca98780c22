//! Wire serialiser driving the depth-first token traversal.
//!
//! The serialiser writes the uncompressed header, pulls tokens from the
//! configured provider, delegates each token's encoding while threading the
//! structural context through, and validates the final state. Serialisation
//! is a single-pass transform: any failure leaves the sink partially
//! written and the caller must discard it.

use std::io::Write;

use crate::compress::CompressedWriter;
use crate::context::StructuralContext;
use crate::errors::SerializeError;
use crate::expr::Expr;
use crate::provider::TokenProvider;
use crate::token::Token;

/// Wire format version byte.
pub const WIRE_VERSION: u8 = b'8';
/// Header flag marking a compressed body.
pub const WIRE_HEADER_COMPRESS: u8 = b'C';
/// Separator closing the uncompressed header.
pub const WIRE_HEADER_SEPARATOR: u8 = b':';

/// Serialises expression trees into wire bytes.
///
/// Each serialiser owns its destination and structural context exclusively;
/// it is consumed by [`serialize`](Self::serialize) and must not be shared
/// across concurrent passes.
pub struct WireSerializer<'p, W: Write> {
    sink: W,
    provider: Option<&'p dyn TokenProvider>,
    compress: bool,
    enforce: bool,
}

impl<W: Write> WireSerializer<'_, W> {
    /// Builds an enforcing, uncompressed serialiser over `sink`.
    pub fn new(sink: W) -> Self {
        Self {
            sink,
            provider: None,
            compress: false,
            enforce: true,
        }
    }
}

impl<'p, W: Write> WireSerializer<'p, W> {
    /// Enables or disables zlib compression of the body.
    #[must_use]
    pub fn with_compression(mut self, compress: bool) -> Self {
        self.compress = compress;
        self
    }

    /// Routes expressions through a custom token provider.
    #[must_use]
    pub fn with_provider(self, provider: &'p dyn TokenProvider) -> WireSerializer<'p, W> {
        WireSerializer {
            sink: self.sink,
            provider: Some(provider),
            compress: self.compress,
            enforce: self.enforce,
        }
    }

    /// Skips structural bookkeeping; the caller guarantees well-formedness.
    #[must_use]
    pub fn permissive(mut self) -> Self {
        self.enforce = false;
        self
    }

    /// Serialises `expr` and returns the sink on success.
    ///
    /// # Errors
    ///
    /// Fails on structural violations, on sink write failures, and with
    /// [`SerializeError::TruncatedExpression`] when the provider's token
    /// stream ends before the declared structure is complete. The sink is
    /// left partially written on every failure.
    pub fn serialize(mut self, expr: &Expr) -> Result<W, SerializeError> {
        // The header is never compressed.
        self.sink.write_all(&[WIRE_VERSION])?;
        if self.compress {
            self.sink.write_all(&[WIRE_HEADER_COMPRESS])?;
        }
        self.sink.write_all(&[WIRE_HEADER_SEPARATOR])?;

        let mut context = if self.enforce {
            StructuralContext::enforcing()
        } else {
            StructuralContext::permissive()
        };

        let tokens: Box<dyn Iterator<Item = Token<'_>> + '_> = match self.provider {
            Some(provider) => provider.provide(expr),
            None => Box::new(expr.tokens()),
        };

        if self.compress {
            let mut body = CompressedWriter::new(&mut self.sink);
            for token in tokens {
                token.encode(&mut body, &mut context)?;
            }
            body.finish()?;
        } else {
            for token in tokens {
                token.encode(&mut self.sink, &mut context)?;
            }
        }

        if context.is_final_state() {
            Ok(self.sink)
        } else {
            Err(SerializeError::TruncatedExpression)
        }
    }
}

/// Serialises `expr` to a fresh byte vector with default settings.
///
/// # Errors
///
/// Propagates any [`SerializeError`] from the underlying serialiser.
pub fn to_wire_bytes(expr: &Expr) -> Result<Vec<u8>, SerializeError> {
    WireSerializer::new(Vec::new()).serialize(expr)
}
