//! Table parsers for the supported archive formats
//!
//! Every parser follows the same shape: read the signature from offset 0 and
//! hand the stream back (`NotMine`) on a mismatch, then claim the stream and
//! walk the entry table into an [`UnpackedArchive`]. Failures after the
//! signature matched stop format resolution instead of letting another
//! parser report something misleading.

mod grp;
mod hog;
mod mvl;
mod qpak;
mod wad;

pub use grp::Grp;
pub use hog::Hog;
pub use mvl::Mvl;
pub use qpak::Qpak;
pub use wad::Wad;

use crate::archive::ArchiveFormat;
use crate::stream::Stream;

/// The built-in formats, in the order the resolver tries them when a name
/// carries no extension hint.
pub fn builtin_formats() -> Vec<Box<dyn ArchiveFormat>> {
    vec![
        Box::new(Grp::default()),
        Box::new(Qpak::default()),
        Box::new(Hog::default()),
        Box::new(Mvl::default()),
        Box::new(Wad::default()),
    ]
}

/// Reads a signature-sized prefix; `None` means the stream is too short to
/// be this format at all.
pub(crate) fn read_signature<const N: usize>(stream: &mut dyn Stream) -> Option<[u8; N]> {
    let mut sig = [0u8; N];
    let mut filled = 0;
    while filled < N {
        match stream.read(&mut sig[filled..]) {
            Ok(0) | Err(_) => return None,
            Ok(n) => filled += n,
        }
    }
    Some(sig)
}

/// Decodes a fixed-width name field: bytes up to the first NUL (or `stop`
/// byte, when the format pads with something else), lossily as UTF-8.
pub(crate) fn fixed_name(raw: &[u8], stop: Option<u8>) -> String {
    let mut end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
    if let Some(stop) = stop
        && let Some(p) = raw[..end].iter().position(|&b| b == stop)
    {
        end = p;
    }
    String::from_utf8_lossy(&raw[..end]).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_names_stop_at_padding() {
        assert_eq!(fixed_name(b"TILES.ART\0\0\0", None), "TILES.ART");
        assert_eq!(fixed_name(b"DUKE3D.GRP  ", Some(b' ')), "DUKE3D.GRP");
        assert_eq!(fixed_name(b"FULLWIDTHXYZ", None), "FULLWIDTHXYZ");
    }
}
