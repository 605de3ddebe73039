//! Client-visible open files
//!
//! A [`Handle`] is a buffered veneer over a stream. It either reads or
//! writes, never both. With a buffer set, reads are prefetched in
//! capacity-sized chunks and writes are queued until the buffer would
//! overflow; without one, every call goes straight to the stream.
//!
//! Handle operations touch only handle-local state — no filesystem lock is
//! ever taken after the open, so open handles never contend with mount
//! resolution.

use std::io;
use std::sync::Arc;

use crate::error::{ErrorCode, Result, track};
use unpak::stream::Stream;

/// Shared marker tying open handles to their mount. The mount refuses to be
/// unmounted while anyone still holds a clone.
pub(crate) type MountToken = Arc<str>;

struct Buffer {
    data: Vec<u8>,
    /// Bytes of `data` that are valid.
    fill: usize,
    /// Read cursor within `fill`.
    pos: usize,
}

/// An open virtual file.
pub struct Handle {
    stream: Box<dyn Stream>,
    for_reading: bool,
    token: MountToken,
    buffer: Option<Buffer>,
}

impl Handle {
    pub(crate) fn new(stream: Box<dyn Stream>, for_reading: bool, token: MountToken) -> Self {
        Self {
            stream,
            for_reading,
            token,
            buffer: None,
        }
    }

    /// Reads up to `buf.len()` bytes; 0 means end of file.
    pub fn read_bytes(&mut self, buf: &mut [u8]) -> Result<usize> {
        track(self.do_read(buf))
    }

    fn do_read(&mut self, buf: &mut [u8]) -> Result<usize> {
        if !self.for_reading {
            return Err(ErrorCode::OpenForWriting);
        }
        if buf.is_empty() {
            return Ok(0);
        }
        let Some(b) = &mut self.buffer else {
            return self.stream.read(buf);
        };

        let mut total = 0;
        while total < buf.len() {
            let avail = b.fill - b.pos;
            if avail > 0 {
                let n = avail.min(buf.len() - total);
                buf[total..total + n].copy_from_slice(&b.data[b.pos..b.pos + n]);
                b.pos += n;
                total += n;
            } else {
                // Refill with one full-capacity read.
                b.pos = 0;
                match self.stream.read(&mut b.data) {
                    Ok(0) => {
                        b.fill = 0;
                        break;
                    }
                    Ok(n) => b.fill = n,
                    Err(e) => {
                        b.fill = 0;
                        if total == 0 {
                            return Err(e);
                        }
                        break; // Report what was already read.
                    }
                }
            }
        }
        Ok(total)
    }

    /// Writes `buf`, queueing into the handle buffer when it fits.
    pub fn write_bytes(&mut self, buf: &[u8]) -> Result<usize> {
        track(self.do_write(buf))
    }

    fn do_write(&mut self, buf: &[u8]) -> Result<usize> {
        if self.for_reading {
            return Err(ErrorCode::OpenForReading);
        }
        if buf.is_empty() {
            return Ok(0);
        }
        if let Some(b) = &mut self.buffer {
            if b.fill + buf.len() < b.data.len() {
                b.data[b.fill..b.fill + buf.len()].copy_from_slice(buf);
                b.fill += buf.len();
                return Ok(buf.len());
            }
            self.do_flush()?;
        }
        self.stream.write(buf)
    }

    /// Absolute seek. A read handle keeps its buffer when the target lies
    /// within the buffered window; a write handle flushes first.
    pub fn seek(&mut self, pos: u64) -> Result<()> {
        track(self.do_seek(pos))
    }

    fn do_seek(&mut self, pos: u64) -> Result<()> {
        self.do_flush()?;
        if self.for_reading && self.buffer.is_some() {
            let cur = self.do_tell()?;
            let Some(b) = &mut self.buffer else {
                return self.stream.seek(pos);
            };
            if pos >= cur {
                let forward = pos - cur;
                if forward <= (b.fill - b.pos) as u64 {
                    b.pos += forward as usize;
                    return Ok(());
                }
            } else {
                let backward = cur - pos;
                if backward <= b.pos as u64 {
                    b.pos -= backward as usize;
                    return Ok(());
                }
            }
            b.fill = 0;
            b.pos = 0;
        }
        self.stream.seek(pos)
    }

    /// Position adjusted for any buffered bytes.
    pub fn tell(&mut self) -> Result<u64> {
        track(self.do_tell())
    }

    fn do_tell(&mut self) -> Result<u64> {
        let raw = self.stream.tell()?;
        Ok(match &self.buffer {
            Some(b) if self.for_reading => raw - (b.fill - b.pos) as u64,
            Some(b) => raw + b.fill as u64,
            None => raw,
        })
    }

    pub fn length(&mut self) -> Result<u64> {
        track(self.stream.length())
    }

    /// True only when a read handle has drained its buffer and the stream
    /// sits at its end. Write handles never report end of file.
    pub fn eof(&mut self) -> Result<bool> {
        if !self.for_reading {
            return Ok(false);
        }
        if let Some(b) = &self.buffer
            && b.pos != b.fill
        {
            return Ok(false);
        }
        let pos = self.stream.tell()?;
        let len = self.stream.length()?;
        Ok(pos >= len)
    }

    /// Pushes queued write bytes down to the stream. A no-op for read
    /// handles.
    pub fn flush(&mut self) -> Result<()> {
        track(self.do_flush())
    }

    fn do_flush(&mut self) -> Result<()> {
        if self.for_reading {
            return Ok(());
        }
        let Some(b) = &mut self.buffer else {
            return Ok(());
        };
        let mut start = b.pos;
        while start < b.fill {
            let n = self.stream.write(&b.data[start..b.fill])?;
            if n == 0 {
                return Err(ErrorCode::Io(io::ErrorKind::WriteZero));
            }
            start += n;
        }
        b.pos = 0;
        b.fill = 0;
        Ok(())
    }

    /// Sets the handle buffer to `size` bytes; 0 releases it. Queued writes
    /// are flushed and a read handle's stream is repositioned to where an
    /// unbuffered handle would stand, so no byte is lost or replayed.
    pub fn set_buffer(&mut self, size: usize) -> Result<()> {
        track(self.do_set_buffer(size))
    }

    fn do_set_buffer(&mut self, size: usize) -> Result<()> {
        self.do_flush()?;
        if self.for_reading
            && let Some(b) = &self.buffer
            && b.fill != b.pos
        {
            let pos = self.stream.tell()? - (b.fill - b.pos) as u64;
            self.stream.seek(pos)?;
        }
        self.buffer = (size > 0).then(|| Buffer {
            data: vec![0; size],
            fill: 0,
            pos: 0,
        });
        Ok(())
    }

    /// An independent handle over the same bytes: same direction, fresh
    /// cursor at position 0, no buffer. The duplicate keeps its mount
    /// referenced just like the original.
    pub fn duplicate(&self) -> Result<Handle> {
        track(self.stream.duplicate().map(|stream| Handle {
            stream,
            for_reading: self.for_reading,
            token: self.token.clone(),
            buffer: None,
        }))
    }

    /// Flushes and closes. Dropping a handle flushes too, but swallows the
    /// outcome; close explicitly when the result matters.
    pub fn close(mut self) -> Result<()> {
        track(self.do_flush().and_then(|()| self.stream.flush()))
    }
}

impl Drop for Handle {
    fn drop(&mut self) {
        let _ = self.do_flush();
        let _ = self.stream.flush();
    }
}

impl io::Read for Handle {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.read_bytes(buf).map_err(io::Error::from)
    }
}

impl io::Write for Handle {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.write_bytes(buf).map_err(io::Error::from)
    }

    fn flush(&mut self) -> io::Result<()> {
        Handle::flush(self).map_err(io::Error::from)
    }
}

impl io::Seek for Handle {
    fn seek(&mut self, pos: io::SeekFrom) -> io::Result<u64> {
        let target = match pos {
            io::SeekFrom::Start(offset) => offset,
            io::SeekFrom::Current(delta) => add_delta(self.tell()?, delta)?,
            io::SeekFrom::End(delta) => add_delta(self.length()?, delta)?,
        };
        Handle::seek(self, target)?;
        Ok(target)
    }
}

fn add_delta(base: u64, delta: i64) -> io::Result<u64> {
    base.checked_add_signed(delta)
        .ok_or_else(|| io::Error::from(ErrorCode::InvalidArgument))
}

/// Adapts an open handle back into a [`Stream`], so an already-open virtual
/// file can itself be mounted as an archive.
pub struct HandleStream(Handle);

impl HandleStream {
    pub fn new(handle: Handle) -> Self {
        Self(handle)
    }
}

impl Stream for HandleStream {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        self.0.read_bytes(buf)
    }

    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        self.0.write_bytes(buf)
    }

    fn seek(&mut self, offset: u64) -> Result<()> {
        self.0.seek(offset)
    }

    fn tell(&mut self) -> Result<u64> {
        self.0.tell()
    }

    fn length(&mut self) -> Result<u64> {
        self.0.length()
    }

    fn flush(&mut self) -> Result<()> {
        self.0.flush()
    }

    fn duplicate(&self) -> Result<Box<dyn Stream>> {
        Ok(Box::new(HandleStream(self.0.duplicate()?)))
    }
}
