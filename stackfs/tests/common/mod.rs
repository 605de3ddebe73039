//! In-memory archive images for the scenario tests.
#![allow(dead_code)]

/// A minimal Build-engine groupfile: "KenSilverman", count, 16-byte records,
/// then the entry data packed in table order.
pub fn build_grp(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(b"KenSilverman");
    out.extend_from_slice(&(entries.len() as u32).to_le_bytes());
    for (name, data) in entries {
        let mut field = [b' '; 12];
        field[..name.len()].copy_from_slice(name.as_bytes());
        out.extend_from_slice(&field);
        out.extend_from_slice(&(data.len() as u32).to_le_bytes());
    }
    for (_, data) in entries {
        out.extend_from_slice(data);
    }
    out
}

/// A minimal Quake PAK: "PACK" header pointing at a trailing directory of
/// 64-byte records with absolute positions.
pub fn build_pak(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let header_len = 12u32;
    let mut blobs = Vec::new();
    let mut offsets = Vec::new();
    for (_, data) in entries {
        offsets.push(header_len + blobs.len() as u32);
        blobs.extend_from_slice(data);
    }

    let mut out = Vec::new();
    out.extend_from_slice(b"PACK");
    out.extend_from_slice(&(header_len + blobs.len() as u32).to_le_bytes());
    out.extend_from_slice(&(entries.len() as u32 * 64).to_le_bytes());
    out.extend_from_slice(&blobs);
    for ((name, data), offset) in entries.iter().zip(&offsets) {
        let mut field = [0u8; 56];
        field[..name.len()].copy_from_slice(name.as_bytes());
        out.extend_from_slice(&field);
        out.extend_from_slice(&offset.to_le_bytes());
        out.extend_from_slice(&(data.len() as u32).to_le_bytes());
    }
    out
}
