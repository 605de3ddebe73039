//! Shared implementation for unpacked archive formats
//!
//! Many legacy formats are nothing more than a flat table of
//! (name, offset, length) rows in front of uncompressed data. A format
//! parser only has to validate its signature and feed the table through
//! [`UnpackedArchive::add_entry`]; everything else — the directory tree,
//! per-entry streams, the read-only archiver operations — lives here.

use crate::archive::{Archive, EnumFn, FileType, Stat, Visit};
use crate::error::{ErrorCode, Result};
use crate::stream::Stream;
use crate::tree::DirTree;

/// Per-entry payload: where an entry's bytes live in the parent stream.
#[derive(Debug, Default, Clone, Copy)]
pub struct EntryMeta {
    pub start: u64,
    pub size: u64,
    pub ctime: Option<i64>,
    pub mtime: Option<i64>,
}

/// A mounted unpacked archive: the parsed directory tree plus the stream
/// over the archive file itself.
///
/// The archive owns its stream; every opened entry duplicates it, so open
/// entry streams outlive the archive safely.
pub struct UnpackedArchive {
    tree: DirTree<EntryMeta>,
    stream: Box<dyn Stream>,
}

impl UnpackedArchive {
    pub fn new(stream: Box<dyn Stream>, case_sensitive: bool, ascii_only: bool) -> Self {
        Self {
            tree: DirTree::new(case_sensitive, ascii_only),
            stream,
        }
    }

    /// The archive file's stream; parsers keep reading the entry table from
    /// here while they populate the tree.
    pub fn stream_mut(&mut self) -> &mut dyn Stream {
        &mut *self.stream
    }

    /// Records one row of the format's entry table. Directories carry no
    /// window of their own.
    pub fn add_entry(
        &mut self,
        name: &str,
        is_dir: bool,
        ctime: Option<i64>,
        mtime: Option<i64>,
        start: u64,
        size: u64,
    ) -> Result<()> {
        let idx = self.tree.add(name, is_dir)?;
        *self.tree.payload_mut(idx) = EntryMeta {
            start: if is_dir { 0 } else { start },
            size: if is_dir { 0 } else { size },
            ctime,
            mtime,
        };
        Ok(())
    }

    pub fn entry_count(&self) -> usize {
        self.tree.len()
    }
}

impl Archive for UnpackedArchive {
    fn open_read(&mut self, name: &str) -> Result<Box<dyn Stream>> {
        let idx = self.tree.find(name)?;
        if self.tree.is_dir(idx) {
            return Err(ErrorCode::NotAFile);
        }
        let meta = *self.tree.payload(idx);
        let entry = EntryStream::new(self.stream.duplicate()?, meta.start, meta.size)?;
        Ok(Box::new(entry))
    }

    fn open_write(&mut self, _name: &str) -> Result<Box<dyn Stream>> {
        Err(ErrorCode::ReadOnly)
    }

    fn open_append(&mut self, _name: &str) -> Result<Box<dyn Stream>> {
        Err(ErrorCode::ReadOnly)
    }

    fn remove(&mut self, _name: &str) -> Result<()> {
        Err(ErrorCode::ReadOnly)
    }

    fn mkdir(&mut self, _name: &str) -> Result<()> {
        Err(ErrorCode::ReadOnly)
    }

    fn stat(&mut self, name: &str) -> Result<Stat> {
        let idx = self.tree.find(name)?;
        let meta = *self.tree.payload(idx);
        let (filetype, filesize) = if self.tree.is_dir(idx) {
            (FileType::Directory, 0)
        } else {
            (FileType::Regular, meta.size)
        };
        Ok(Stat {
            filetype,
            filesize,
            modtime: meta.mtime,
            createtime: meta.ctime,
            accesstime: None,
            readonly: true,
        })
    }

    fn enumerate(&mut self, name: &str, callback: &mut EnumFn) -> Result<Visit> {
        self.tree.enumerate(name, callback)
    }
}

/// Independent view of one entry: a duplicated parent stream constrained to
/// the window `[start, start + size)`, with its own cursor.
pub struct EntryStream {
    parent: Box<dyn Stream>,
    start: u64,
    size: u64,
    pos: u64,
}

impl EntryStream {
    pub fn new(mut parent: Box<dyn Stream>, start: u64, size: u64) -> Result<Self> {
        parent.seek(start)?;
        Ok(Self {
            parent,
            start,
            size,
            pos: 0,
        })
    }
}

impl Stream for EntryStream {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let left = self.size - self.pos;
        if left == 0 {
            return Ok(0);
        }
        let want = (buf.len() as u64).min(left) as usize;
        let n = self.parent.read(&mut buf[..want])?;
        self.pos += n as u64;
        Ok(n)
    }

    fn write(&mut self, _buf: &[u8]) -> Result<usize> {
        Err(ErrorCode::ReadOnly)
    }

    fn seek(&mut self, offset: u64) -> Result<()> {
        if offset >= self.size {
            return Err(ErrorCode::PastEof);
        }
        self.parent.seek(self.start + offset)?;
        self.pos = offset;
        Ok(())
    }

    fn tell(&mut self) -> Result<u64> {
        Ok(self.pos)
    }

    fn length(&mut self) -> Result<u64> {
        Ok(self.size)
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }

    fn duplicate(&self) -> Result<Box<dyn Stream>> {
        let dup = EntryStream::new(self.parent.duplicate()?, self.start, self.size)?;
        Ok(Box::new(dup))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::MemoryStream;

    fn archive_over(data: &'static [u8]) -> UnpackedArchive {
        UnpackedArchive::new(Box::new(MemoryStream::new(data)), false, true)
    }

    #[test]
    fn entry_streams_window_the_parent() {
        let mut arc = archive_over(b"xxxxhelloyyyy");
        arc.add_entry("greeting", false, None, None, 4, 5).unwrap();

        let mut stream = arc.open_read("greeting").unwrap();
        let mut buf = [0u8; 16];
        let n = stream.read(&mut buf).unwrap();
        assert_eq!(&buf[..n], b"hello");

        // Past the window there is only EOF, never the parent's bytes.
        assert_eq!(stream.read(&mut buf).unwrap(), 0);
    }

    #[test]
    fn entry_seek_past_the_window_fails() {
        let mut arc = archive_over(b"0123456789");
        arc.add_entry("five", false, None, None, 0, 5).unwrap();

        let mut stream = arc.open_read("five").unwrap();
        assert_eq!(stream.seek(5), Err(ErrorCode::PastEof));
        stream.seek(3).unwrap();
        let mut buf = [0u8; 8];
        let n = stream.read(&mut buf).unwrap();
        assert_eq!(&buf[..n], b"34");
    }

    #[test]
    fn directories_cannot_be_opened_for_reading() {
        let mut arc = archive_over(b"");
        arc.add_entry("dir/file", false, None, None, 0, 0).unwrap();
        assert_eq!(
            arc.open_read("dir").err(),
            Some(ErrorCode::NotAFile),
        );
    }

    #[test]
    fn stat_distinguishes_files_and_directories() {
        let mut arc = archive_over(b"abcdef");
        arc.add_entry("sub/data", false, None, None, 2, 4).unwrap();

        let file = arc.stat("sub/data").unwrap();
        assert_eq!(file.filetype, FileType::Regular);
        assert_eq!(file.filesize, 4);
        assert!(file.readonly);
        assert_eq!(file.accesstime, None);

        let dir = arc.stat("sub").unwrap();
        assert_eq!(dir.filetype, FileType::Directory);
        assert_eq!(dir.filesize, 0);
    }

    #[test]
    fn mutating_operations_are_read_only() {
        let mut arc = archive_over(b"abc");
        arc.add_entry("a", false, None, None, 0, 3).unwrap();
        assert_eq!(arc.open_write("a").err(), Some(ErrorCode::ReadOnly));
        assert_eq!(arc.open_append("a").err(), Some(ErrorCode::ReadOnly));
        assert_eq!(arc.remove("a"), Err(ErrorCode::ReadOnly));
        assert_eq!(arc.mkdir("d"), Err(ErrorCode::ReadOnly));
    }

    #[test]
    fn duplicated_entry_streams_have_independent_cursors() {
        let mut arc = archive_over(b"0123456789");
        arc.add_entry("all", false, None, None, 0, 10).unwrap();

        let mut a = arc.open_read("all").unwrap();
        let mut buf = [0u8; 4];
        a.read(&mut buf).unwrap();
        assert_eq!(a.tell().unwrap(), 4);

        let mut b = a.duplicate().unwrap();
        assert_eq!(b.tell().unwrap(), 0);
        b.read(&mut buf).unwrap();
        assert_eq!(&buf, b"0123");
        assert_eq!(a.tell().unwrap(), 4);
    }
}
