//! Build engine "groupfile" (GRP) support
//!
//! The format is as simple as archives get: 12 signature bytes
//! ("KenSilverman"), a file count, then `count` records of a 12-byte
//! space-padded name and a 4-byte size. Entry data is packed after the
//! table, in table order, so offsets are implied by the running sum of
//! sizes.

use byteorder::{LittleEndian, ReadBytesExt};
use tracing::debug;

use super::{fixed_name, read_signature};
use crate::archive::{ArchiveFormat, ArchiveInfo, Probe};
use crate::error::Result;
use crate::stream::{Stream, StreamReader, read_fully};
use crate::unpacked::UnpackedArchive;

const GRP_SIG: &[u8; 12] = b"KenSilverman";

pub struct Grp {
    info: ArchiveInfo,
}

impl Default for Grp {
    fn default() -> Self {
        Self {
            info: ArchiveInfo {
                extension: "GRP".to_owned(),
                description: "Build engine Groupfile format".to_owned(),
                author: "stackfs".to_owned(),
                url: "https://crates.io/crates/unpak".to_owned(),
                supports_symlinks: false,
            },
        }
    }
}

impl ArchiveFormat for Grp {
    fn info(&self) -> &ArchiveInfo {
        &self.info
    }

    fn try_open(&self, mut stream: Box<dyn Stream>) -> Probe {
        match read_signature::<12>(&mut *stream) {
            Some(sig) if &sig == GRP_SIG => {}
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
    debug!(count, "parsing GRP entry table");

    let mut archive = UnpackedArchive::new(stream, false, true);

    // Entry data starts past the signature and the table.
    let mut pos = 16u64 + 16 * u64::from(count);
    for _ in 0..count {
        let mut name = [0u8; 12];
        read_fully(archive.stream_mut(), &mut name)?;
        let size = StreamReader(archive.stream_mut()).read_u32::<LittleEndian>()?;
        let name = fixed_name(&name, Some(b' '));
        archive.add_entry(&name, false, None, None, pos, u64::from(size))?;
        pos += u64::from(size);
    }

    Ok(archive)
}
