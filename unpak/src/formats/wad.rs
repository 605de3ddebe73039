//! DOOM engine WAD support
//!
//! "IWAD" (retail data) or "PWAD" (patch) signature, a lump count and a
//! directory offset, then a directory of 16-byte records: position, size,
//! and an 8-byte NUL-padded lump name.

use byteorder::{LittleEndian, ReadBytesExt};
use tracing::debug;

use super::{fixed_name, read_signature};
use crate::archive::{ArchiveFormat, ArchiveInfo, Probe};
use crate::error::Result;
use crate::stream::{Stream, StreamReader, read_fully};
use crate::unpacked::UnpackedArchive;

pub struct Wad {
    info: ArchiveInfo,
}

impl Default for Wad {
    fn default() -> Self {
        Self {
            info: ArchiveInfo {
                extension: "WAD".to_owned(),
                description: "DOOM engine format".to_owned(),
                author: "stackfs".to_owned(),
                url: "https://crates.io/crates/unpak".to_owned(),
                supports_symlinks: false,
            },
        }
    }
}

impl ArchiveFormat for Wad {
    fn info(&self) -> &ArchiveInfo {
        &self.info
    }

    fn try_open(&self, mut stream: Box<dyn Stream>) -> Probe {
        match read_signature::<4>(&mut *stream) {
            Some(sig) if &sig == b"IWAD" || &sig == b"PWAD" => {}
            _ => return Probe::NotMine(stream),
        }
        match load(stream) {
            Ok(archive) => Probe::Opened(Box::new(archive)),
            Err(code) => Probe::Failed(code),
        }
    }
}

fn load(mut stream: Box<dyn Stream>) -> Result<UnpackedArchive> {
    let mut reader = StreamReader(&mut *stream);
    let count = reader.read_u32::<LittleEndian>()?;
    let directory_offset = reader.read_u32::<LittleEndian>()?;
    debug!(count, directory_offset, "parsing WAD directory");

    stream.seek(u64::from(directory_offset))?;
    let mut archive = UnpackedArchive::new(stream, false, true);

    for _ in 0..count {
        let mut reader = StreamReader(archive.stream_mut());
        let pos = reader.read_u32::<LittleEndian>()?;
        let size = reader.read_u32::<LittleEndian>()?;
        let mut name = [0u8; 8];
        read_fully(archive.stream_mut(), &mut name)?;
        let name = fixed_name(&name, None);
        archive.add_entry(&name, false, None, None, u64::from(pos), u64::from(size))?;
    }

    Ok(archive)
}
