//! Scoped zlib compression over a byte sink.
//!
//! The compressed body container is only decodable once its trailer has
//! been written, so the wrapper finalises the stream on every exit path:
//! explicitly through [`CompressedWriter::finish`] on success, and from
//! `Drop` when serialisation aborts partway through.

use std::io::{self, Write};

use flate2::Compression;
use flate2::write::ZlibEncoder;

/// Write adapter that frames bytes into a zlib container.
pub struct CompressedWriter<W: Write> {
    encoder: Option<ZlibEncoder<W>>,
}

impl<W: Write> CompressedWriter<W> {
    /// Wraps `sink` with a default-level zlib encoder.
    pub fn new(sink: W) -> Self {
        Self {
            encoder: Some(ZlibEncoder::new(sink, Compression::default())),
        }
    }

    /// Writes the container trailer and returns the underlying sink.
    ///
    /// # Errors
    ///
    /// Returns the IO error raised while flushing buffered compressed data.
    pub fn finish(mut self) -> io::Result<W> {
        // Taking the encoder disarms the Drop finaliser.
        let encoder = self
            .encoder
            .take()
            .ok_or_else(|| io::Error::other("compressed writer already finished"))?;
        encoder.finish()
    }
}

impl<W: Write> Write for CompressedWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match &mut self.encoder {
            Some(encoder) => encoder.write(buf),
            None => Err(io::Error::other("compressed writer already finished")),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match &mut self.encoder {
            Some(encoder) => encoder.flush(),
            None => Ok(()),
        }
    }
}

impl<W: Write> Drop for CompressedWriter<W> {
    fn drop(&mut self) {
        // Failure paths still close the container; the caller is about to
        // discard the sink, so the flush error is unreportable.
        if let Some(encoder) = self.encoder.take() {
            let _ = encoder.finish();
        }
    }
}
