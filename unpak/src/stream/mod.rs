//! Seekable byte-stream abstraction shared by archivers and file handles

mod memory;
mod native;

pub use memory::MemoryStream;
pub use native::{NativeStream, OpenMode};

use std::io;

use crate::error::{ErrorCode, Result};

/// A polymorphic, independently seekable byte stream.
///
/// Positioning is always absolute from byte 0. `read` may return fewer bytes
/// than requested without that being an error; 0 means end of stream.
/// `duplicate` yields an independent cursor (starting at 0) over the same
/// bytes; how the bytes themselves are shared is up to the implementation.
/// Releasing a stream's resources is `Drop`.
pub trait Stream: Send {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize>;

    /// Read-only streams fail with [`ErrorCode::ReadOnly`].
    fn write(&mut self, buf: &[u8]) -> Result<usize>;

    /// Absolute positioning. Bounded streams fail with
    /// [`ErrorCode::PastEof`] rather than seeking beyond their data.
    fn seek(&mut self, offset: u64) -> Result<()>;

    fn tell(&mut self) -> Result<u64>;

    fn length(&mut self) -> Result<u64>;

    /// Drains host buffers; a no-op for read-only streams.
    fn flush(&mut self) -> Result<()>;

    fn duplicate(&self) -> Result<Box<dyn Stream>>;
}

/// Reads exactly `buf.len()` bytes, failing with [`ErrorCode::Corrupt`] on a
/// short read. Archive tables are fixed-size records; anything shorter means
/// the file is truncated.
pub fn read_fully(stream: &mut dyn Stream, buf: &mut [u8]) -> Result<()> {
    let mut filled = 0;
    while filled < buf.len() {
        let n = stream.read(&mut buf[filled..])?;
        if n == 0 {
            return Err(ErrorCode::Corrupt);
        }
        filled += n;
    }
    Ok(())
}

/// Adapts a [`Stream`] to [`std::io::Read`] so table parsers can use
/// `byteorder`'s extension methods.
pub struct StreamReader<'a>(pub &'a mut dyn Stream);

impl io::Read for StreamReader<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.0.read(buf).map_err(io::Error::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_fully_reports_truncation_as_corrupt() {
        let mut stream = MemoryStream::new(&b"abc"[..]);
        let mut buf = [0u8; 4];
        assert_eq!(read_fully(&mut stream, &mut buf), Err(ErrorCode::Corrupt));
    }
}
