//! Descent II Movielib (MVL) support
//!
//! "DMVL" signature, file count, then `count` records of a 13-byte
//! NUL-padded name and a 4-byte size; data follows the table packed in
//! table order.

use byteorder::{LittleEndian, ReadBytesExt};
use tracing::debug;

use super::{fixed_name, read_signature};
use crate::archive::{ArchiveFormat, ArchiveInfo, Probe};
use crate::error::Result;
use crate::stream::{Stream, StreamReader, read_fully};
use crate::unpacked::UnpackedArchive;

const MVL_SIG: &[u8; 4] = b"DMVL";

pub struct Mvl {
    info: ArchiveInfo,
}

impl Default for Mvl {
    fn default() -> Self {
        Self {
            info: ArchiveInfo {
                extension: "MVL".to_owned(),
                description: "Descent II Movielib format".to_owned(),
                author: "stackfs".to_owned(),
                url: "https://crates.io/crates/unpak".to_owned(),
                supports_symlinks: false,
            },
        }
    }
}

impl ArchiveFormat for Mvl {
    fn info(&self) -> &ArchiveInfo {
        &self.info
    }

    fn try_open(&self, mut stream: Box<dyn Stream>) -> Probe {
        match read_signature::<4>(&mut *stream) {
            Some(sig) if &sig == MVL_SIG => {}
            _ => return Probe::NotMine(stream),
        }
        match load(stream) {
            Ok(archive) => Probe::Opened(Box::new(archive)),
            Err(code) => Probe::Failed(code),
        }
    }
}

fn load(mut stream: Box<dyn Stream>) -> Result<UnpackedArchive> {
    let count = StreamReader(&mut *stream).read_u32::<LittleEndian>()?;
    debug!(count, "parsing MVL entry table");

    let mut archive = UnpackedArchive::new(stream, false, true);

    let mut pos = 8u64 + 17 * u64::from(count);
    for _ in 0..count {
        let mut name = [0u8; 13];
        read_fully(archive.stream_mut(), &mut name)?;
        let size = StreamReader(archive.stream_mut()).read_u32::<LittleEndian>()?;
        let name = fixed_name(&name, None);
        archive.add_entry(&name, false, None, None, pos, u64::from(size))?;
        pos += u64::from(size);
    }

    Ok(archive)
}
