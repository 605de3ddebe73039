//! Host directory locations

use std::env;
use std::path::PathBuf;

use crate::error::{ErrorCode, Result};

/// The directory holding the running executable.
pub fn calc_base_dir() -> Result<PathBuf> {
    let exe = env::current_exe().map_err(ErrorCode::from)?;
    exe.parent().map(PathBuf::from).ok_or(ErrorCode::OsError)
}

/// The user's home directory.
pub fn calc_user_dir() -> Result<PathBuf> {
    dirs::home_dir().ok_or(ErrorCode::OsError)
}

/// Per-user, per-application writable directory
/// (`$XDG_DATA_HOME`, `AppData`, or `Library/Application Support`,
/// depending on the host), created on demand.
pub fn calc_pref_dir(org: &str, app: &str) -> Result<PathBuf> {
    let base = dirs::data_dir().ok_or(ErrorCode::OsError)?;
    let dir = base.join(org).join(app);
    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
