//! Descent I HOG support
//!
//! A 3-byte "DHF" signature, then records back to back until end of file:
//! a 13-byte NUL-padded name, a 4-byte size, and the entry data itself.
//! There is no up-front count; the table is discovered by walking it.

use byteorder::{LittleEndian, ReadBytesExt};
use tracing::debug;

use super::{fixed_name, read_signature};
use crate::archive::{ArchiveFormat, ArchiveInfo, Probe};
use crate::error::{ErrorCode, Result};
use crate::stream::{Stream, StreamReader, read_fully};
use crate::unpacked::UnpackedArchive;

const HOG_SIG: &[u8; 3] = b"DHF";

pub struct Hog {
    info: ArchiveInfo,
}

impl Default for Hog {
    fn default() -> Self {
        Self {
            info: ArchiveInfo {
                extension: "HOG".to_owned(),
                description: "Descent I HOG file format".to_owned(),
                author: "stackfs".to_owned(),
                url: "https://crates.io/crates/unpak".to_owned(),
                supports_symlinks: false,
            },
        }
    }
}

impl ArchiveFormat for Hog {
    fn info(&self) -> &ArchiveInfo {
        &self.info
    }

    fn try_open(&self, mut stream: Box<dyn Stream>) -> Probe {
        match read_signature::<3>(&mut *stream) {
            Some(sig) if &sig == HOG_SIG => {}
            _ => return Probe::NotMine(stream),
        }
        match load(stream) {
            Ok(archive) => Probe::Opened(Box::new(archive)),
            Err(code) => Probe::Failed(code),
        }
    }
}

fn load(stream: Box<dyn Stream>) -> Result<UnpackedArchive> {
    let mut archive = UnpackedArchive::new(stream, false, true);

    loop {
        let mut name = [0u8; 13];
        let n = archive.stream_mut().read(&mut name)?;
        if n == 0 {
            break; // Clean end of the record chain.
        }
        if n < name.len() {
            read_fully(archive.stream_mut(), &mut name[n..])?;
        }
        let size = StreamReader(archive.stream_mut())
            .read_u32::<LittleEndian>()
            .map_err(|_| ErrorCode::Corrupt)?;
        let pos = archive.stream_mut().tell()?;
        let name = fixed_name(&name, None);
        archive.add_entry(&name, false, None, None, pos, u64::from(size))?;
        archive
            .stream_mut()
            .seek(pos + u64::from(size))
            .map_err(|_| ErrorCode::Corrupt)?;
    }

    debug!(entries = archive.entry_count(), "parsed HOG record chain");
    Ok(archive)
}
