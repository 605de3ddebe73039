//! Virtual-path grammar
//!
//! Every path that reaches a mount has been through [`sanitize`] first, so
//! archivers and the resolver can assume `/`-separated, relative,
//! dot-free segments.

use crate::error::{ErrorCode, Result};

/// Normalizes a platform-independent virtual path.
///
/// Leading separators are stripped, runs of separators collapse, a trailing
/// separator is dropped, and `.` or `..` segments, `:`, and `\` anywhere are
/// rejected as [`ErrorCode::BadFilename`]. The result is never longer than
/// the input and is safe to hand to archivers or to glue onto a mount's
/// root prefix. Sanitizing is idempotent.
pub fn sanitize(src: &str) -> Result<String> {
    let mut out = String::with_capacity(src.len());
    for segment in src.split('/') {
        if segment.is_empty() {
            continue;
        }
        if segment == "." || segment == ".." {
            return Err(ErrorCode::BadFilename);
        }
        if segment.contains(':') || segment.contains('\\') {
            return Err(ErrorCode::BadFilename);
        }
        if !out.is_empty() {
            out.push('/');
        }
        out.push_str(segment);
    }
    Ok(out)
}

/// Classifies a sanitized `fname` as a strict prefix of `mount_point` (which
/// is stored sanitized with a trailing `/`): a virtual directory that exists
/// only because descendants are mounted beneath it. The mount point itself
/// and anything at or below it do not count.
pub(crate) fn part_of_mount_point(mount_point: Option<&str>, fname: &str) -> bool {
    let Some(mp) = mount_point else {
        return false;
    };
    if fname.is_empty() {
        return true;
    }
    let len = fname.len();
    if len + 1 >= mp.len() {
        return false;
    }
    let mp = mp.as_bytes();
    &mp[..len] == fname.as_bytes() && mp[len] == b'/'
}
