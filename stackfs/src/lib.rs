//! A stacked, read-mostly virtual filesystem over archives and host
//! directories
//!
//! Mount points bind backing stores — host directories, or legacy game
//! archives exposed through [`unpak`]'s uniform adapter — into a single
//! virtual tree rooted at `/`. Lookup order is the order of the mount
//! stack: the front mount's copy of a path wins. Reads can come from any
//! mount; writes go through one optionally configured write target.
//!
//! ```no_run
//! use stackfs::Vfs;
//!
//! # fn main() -> stackfs::Result<()> {
//! let vfs = Vfs::new()?;
//! vfs.mount("game/duke3d.grp", Some("/assets/"), false)?;
//! let mut handle = vfs.open_read("/assets/DEFS.CON")?;
//! let mut text = String::new();
//! std::io::Read::read_to_string(&mut handle, &mut text)?;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod handle;
pub mod path;
pub mod platform;

mod dir_archive;
mod vfs;

pub use dir_archive::DirArchive;
pub use error::{ErrorCode, Result, last_error_code};
pub use handle::{Handle, HandleStream};
pub use path::sanitize;
pub use vfs::Vfs;

pub use unpak::{
    Archive, ArchiveFormat, ArchiveInfo, FileType, MemoryStream, NativeStream, Probe, Stat,
    Stream, UnpackedArchive, Visit,
};
