//! Stream over a host file

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use super::Stream;
use crate::error::{ErrorCode, Result};

/// How a [`NativeStream`] was opened. Remembered so duplicates can re-open
/// the backing file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    Read,
    Write,
    Append,
}

/// Stream backed by a file on the host filesystem.
pub struct NativeStream {
    file: File,
    path: PathBuf,
    mode: OpenMode,
}

impl NativeStream {
    pub fn open_read(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        Ok(Self {
            file,
            path: path.to_path_buf(),
            mode: OpenMode::Read,
        })
    }

    pub fn open_write(path: &Path) -> Result<Self> {
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        Ok(Self {
            file,
            path: path.to_path_buf(),
            mode: OpenMode::Write,
        })
    }

    pub fn open_append(path: &Path) -> Result<Self> {
        let file = OpenOptions::new().append(true).create(true).open(path)?;
        Ok(Self {
            file,
            path: path.to_path_buf(),
            mode: OpenMode::Append,
        })
    }

    pub fn mode(&self) -> OpenMode {
        self.mode
    }
}

impl Stream for NativeStream {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        Ok(self.file.read(buf)?)
    }

    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        if self.mode == OpenMode::Read {
            return Err(ErrorCode::ReadOnly);
        }
        Ok(self.file.write(buf)?)
    }

    fn seek(&mut self, offset: u64) -> Result<()> {
        self.file.seek(SeekFrom::Start(offset))?;
        Ok(())
    }

    fn tell(&mut self) -> Result<u64> {
        Ok(self.file.stream_position()?)
    }

    fn length(&mut self) -> Result<u64> {
        Ok(self.file.metadata()?.len())
    }

    fn flush(&mut self) -> Result<()> {
        if self.mode != OpenMode::Read {
            self.file.flush()?;
            self.file.sync_data()?;
        }
        Ok(())
    }

    fn duplicate(&self) -> Result<Box<dyn Stream>> {
        // Re-opening a write-mode file would truncate it out from under the
        // original cursor.
        match self.mode {
            OpenMode::Read => Ok(Box::new(Self::open_read(&self.path)?)),
            OpenMode::Write | OpenMode::Append => Err(ErrorCode::Unsupported),
        }
    }
}
