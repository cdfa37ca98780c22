//! Variable-length integer encoding.
//!
//! Non-negative integers are encoded in 7-bit little-endian groups. Every
//! byte except the last carries a continuation flag in its high bit. Zero
//! encodes to a single zero byte.

use std::io::{self, Write};

use crate::errors::EncodingError;

/// Maximum number of bytes a `u64` varint can occupy.
///
/// Ten groups of seven bits cover the full 64-bit range; a nine-byte buffer
/// would truncate the largest magnitudes.
pub const MAX_VARINT_LEN: usize = 10;

/// Encodes `value` into `buf` and returns the number of bytes used.
fn encode_into(mut value: u64, buf: &mut [u8; MAX_VARINT_LEN]) -> usize {
    let mut count = 0;
    loop {
        let group = (value & 0x7F) as u8;
        value >>= 7;
        if value == 0 {
            buf[count] = group;
            return count + 1;
        }
        buf[count] = group | 0x80;
        count += 1;
    }
}

/// Writes the varint encoding of an unsigned `value` to `sink`.
///
/// # Errors
///
/// Returns an error when the sink rejects the write.
pub fn write_varint_u64<W: Write + ?Sized>(value: u64, sink: &mut W) -> io::Result<()> {
    let mut buf = [0u8; MAX_VARINT_LEN];
    let len = encode_into(value, &mut buf);
    sink.write_all(&buf[..len])
}

/// Writes the varint encoding of a signed `value` to `sink`.
///
/// Negative values are rejected before any byte is written.
///
/// # Errors
///
/// Returns [`EncodingError`] for negative input. Sink failures surface as
/// [`io::Error`] wrapping the rejected write.
pub fn write_varint<W: Write + ?Sized>(
    value: i64,
    sink: &mut W,
) -> Result<(), VarintWriteError> {
    let unsigned = u64::try_from(value).map_err(|_| EncodingError { value })?;
    write_varint_u64(unsigned, sink)?;
    Ok(())
}

/// Failure modes of [`write_varint`].
#[derive(Debug, thiserror::Error)]
pub enum VarintWriteError {
    /// The value was negative.
    #[error(transparent)]
    Encoding(#[from] EncodingError),
    /// The sink rejected the encoded bytes.
    #[error("failed to write varint bytes: {0}")]
    Io(#[from] io::Error),
}

/// Returns the varint encoding of `value` as an owned byte vector.
#[must_use]
pub fn varint_bytes(value: u64) -> Vec<u8> {
    let mut buf = [0u8; MAX_VARINT_LEN];
    let len = encode_into(value, &mut buf);
    buf[..len].to_vec()
}
