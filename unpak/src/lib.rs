//! Read-only access to unpacked legacy game archives
//!
//! This crate implements the container side of a stacked virtual
//! filesystem: a seekable [`Stream`] abstraction, a path-indexed directory
//! tree, a shared framework for formats whose entries are uncompressed and
//! described by a flat table, and parsers for several such formats (Build
//! GRP, Quake PAK, Descent MVL and HOG, DOOM WAD).
//!
//! Archives are strictly read-only. Opening an entry yields an independent
//! stream windowed onto the archive's bytes, so any number of entries can be
//! read concurrently from one mounted archive.

pub mod archive;
pub mod error;
pub mod formats;
pub mod stream;
pub mod tree;
pub mod unpacked;

pub use archive::{
    ARCHIVER_API_VERSION, Archive, ArchiveFormat, ArchiveInfo, FileType, Probe, Stat, Visit,
};
pub use error::{ErrorCode, Result};
pub use stream::{MemoryStream, NativeStream, OpenMode, Stream};
pub use tree::DirTree;
pub use unpacked::{EntryMeta, EntryStream, UnpackedArchive};
