//! Quake PAK support
//!
//! Header: 4-byte "PACK" signature, directory offset, directory length.
//! The directory is an array of 64-byte records (56-byte NUL-padded name,
//! position, size); positions are absolute within the archive, and names may
//! contain `/` separators, which grow the tree on the way in.

use byteorder::{LittleEndian, ReadBytesExt};
use tracing::debug;

use super::{fixed_name, read_signature};
use crate::archive::{ArchiveFormat, ArchiveInfo, Probe};
use crate::error::{ErrorCode, Result};
use crate::stream::{Stream, StreamReader, read_fully};
use crate::unpacked::UnpackedArchive;

const QPAK_SIG: &[u8; 4] = b"PACK";
const QPAK_RECORD_LEN: u32 = 64;

pub struct Qpak {
    info: ArchiveInfo,
}

impl Default for Qpak {
    fn default() -> Self {
        Self {
            info: ArchiveInfo {
                extension: "PAK".to_owned(),
                description: "Quake I/II format".to_owned(),
                author: "stackfs".to_owned(),
                url: "https://crates.io/crates/unpak".to_owned(),
                supports_symlinks: false,
            },
        }
    }
}

impl ArchiveFormat for Qpak {
    fn info(&self) -> &ArchiveInfo {
        &self.info
    }

    fn try_open(&self, mut stream: Box<dyn Stream>) -> Probe {
        match read_signature::<4>(&mut *stream) {
            Some(sig) if &sig == QPAK_SIG => {}
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
    let table_offset = reader.read_u32::<LittleEndian>()?;
    let table_len = reader.read_u32::<LittleEndian>()?;

    if table_len % QPAK_RECORD_LEN != 0 {
        return Err(ErrorCode::Corrupt);
    }
    let count = table_len / QPAK_RECORD_LEN;
    debug!(count, table_offset, "parsing PAK directory");

    stream.seek(u64::from(table_offset))?;
    let mut archive = UnpackedArchive::new(stream, true, false);

    for _ in 0..count {
        let mut name = [0u8; 56];
        read_fully(archive.stream_mut(), &mut name)?;
        let mut reader = StreamReader(archive.stream_mut());
        let pos = reader.read_u32::<LittleEndian>()?;
        let size = reader.read_u32::<LittleEndian>()?;
        let name = fixed_name(&name, None);
        archive.add_entry(&name, false, None, None, u64::from(pos), u64::from(size))?;
    }

    Ok(archive)
}
