//! The archiver adapter contract consumed by virtual filesystems
//!
//! A mounted source is anything that implements [`Archive`]; a pluggable
//! format is anything that implements [`ArchiveFormat`]. Formats are probed
//! in turn against a stream, and the three-valued [`Probe`] outcome tells
//! the resolver whether to keep trying other formats.

use crate::error::{ErrorCode, Result};
use crate::stream::Stream;

/// Version of the archiver contract; registration rejects anything newer.
pub const ARCHIVER_API_VERSION: u32 = 0;

/// What a path resolves to inside a mounted source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    Regular,
    Directory,
    Symlink,
    Other,
}

/// Metadata for one entry, as reported by an archiver.
///
/// Timestamps are seconds since the Unix epoch, absent when the backing
/// store does not record them. Directories always report size 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stat {
    pub filetype: FileType,
    pub filesize: u64,
    pub modtime: Option<i64>,
    pub createtime: Option<i64>,
    pub accesstime: Option<i64>,
    pub readonly: bool,
}

/// Descriptive record for a registered archive format.
#[derive(Debug, Clone)]
pub struct ArchiveInfo {
    /// Filename extension, without the dot.
    pub extension: String,
    pub description: String,
    pub author: String,
    pub url: String,
    /// Whether entries of this format can be symbolic links.
    pub supports_symlinks: bool,
}

/// Continue/stop decision returned by enumeration callbacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visit {
    Continue,
    Stop,
}

/// Callback for [`Archive::enumerate`]; receives each child's basename.
pub type EnumFn<'a> = dyn FnMut(&str) -> Result<Visit> + 'a;

/// Outcome of probing a stream against one format.
pub enum Probe {
    /// The signature matched and the archive is ready behind the adapter.
    Opened(Box<dyn Archive>),
    /// Not this format; the stream is handed back untouched so the next
    /// candidate can try it.
    NotMine(Box<dyn Stream>),
    /// The signature matched but the archive is unusable. Resolution stops
    /// here rather than reporting a misleading error from another format.
    Failed(ErrorCode),
}

/// One mounted source: an opened archive or a host directory.
///
/// Paths are source-relative, already sanitized, `/`-separated, with no
/// leading slash; the empty string names the source's root. Closing a
/// source is `Drop`.
pub trait Archive: Send {
    fn open_read(&mut self, name: &str) -> Result<Box<dyn Stream>>;

    fn open_write(&mut self, name: &str) -> Result<Box<dyn Stream>>;

    fn open_append(&mut self, name: &str) -> Result<Box<dyn Stream>>;

    fn remove(&mut self, name: &str) -> Result<()>;

    fn mkdir(&mut self, name: &str) -> Result<()>;

    fn stat(&mut self, name: &str) -> Result<Stat>;

    /// Visits the immediate children of `name` in the source's own order.
    fn enumerate(&mut self, name: &str, callback: &mut EnumFn) -> Result<Visit>;
}

/// A pluggable archive format: a descriptive record plus the ability to
/// recognize and open streams in its format.
pub trait ArchiveFormat: Send + Sync {
    fn info(&self) -> &ArchiveInfo;

    fn version(&self) -> u32 {
        ARCHIVER_API_VERSION
    }

    /// Probes `stream`, which is positioned at byte 0.
    fn try_open(&self, stream: Box<dyn Stream>) -> Probe;
}
