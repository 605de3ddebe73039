//! Archiver adapter over a host directory
//!
//! The one built-in source that is not an archive: direct filesystem I/O
//! rooted at a directory. The resolver special-cases it (it is keyed by no
//! extension and only ever tried for names that stat as directories), and it
//! is the only adapter that accepts writes.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use crate::error::{ErrorCode, Result};
use unpak::archive::{Archive, ArchiveInfo, EnumFn, FileType, Stat, Visit};
use unpak::stream::{NativeStream, Stream};

pub struct DirArchive {
    base: PathBuf,
}

impl DirArchive {
    /// Opens `base` as a mountable source. Claims only real directories.
    pub fn open(base: &Path) -> Result<Self> {
        let meta = fs::metadata(base)?;
        if !meta.is_dir() {
            return Err(ErrorCode::Unsupported);
        }
        Ok(Self {
            base: base.to_path_buf(),
        })
    }

    pub fn info() -> ArchiveInfo {
        ArchiveInfo {
            extension: String::new(),
            description: "Non-archive, direct filesystem I/O".to_owned(),
            author: "stackfs".to_owned(),
            url: "https://crates.io/crates/stackfs".to_owned(),
            supports_symlinks: true,
        }
    }

    fn resolve(&self, name: &str) -> PathBuf {
        let mut path = self.base.clone();
        for segment in name.split('/').filter(|s| !s.is_empty()) {
            path.push(segment);
        }
        path
    }
}

fn epoch_secs(time: std::io::Result<std::time::SystemTime>) -> Option<i64> {
    let time = time.ok()?;
    match time.duration_since(UNIX_EPOCH) {
        Ok(d) => Some(d.as_secs() as i64),
        Err(e) => Some(-(e.duration().as_secs() as i64)),
    }
}

impl Archive for DirArchive {
    fn open_read(&mut self, name: &str) -> Result<Box<dyn Stream>> {
        Ok(Box::new(NativeStream::open_read(&self.resolve(name))?))
    }

    fn open_write(&mut self, name: &str) -> Result<Box<dyn Stream>> {
        Ok(Box::new(NativeStream::open_write(&self.resolve(name))?))
    }

    fn open_append(&mut self, name: &str) -> Result<Box<dyn Stream>> {
        Ok(Box::new(NativeStream::open_append(&self.resolve(name))?))
    }

    fn remove(&mut self, name: &str) -> Result<()> {
        let path = self.resolve(name);
        let meta = fs::symlink_metadata(&path)?;
        if meta.is_dir() {
            fs::remove_dir(&path)?;
        } else {
            fs::remove_file(&path)?;
        }
        Ok(())
    }

    fn mkdir(&mut self, name: &str) -> Result<()> {
        fs::create_dir(self.resolve(name))?;
        Ok(())
    }

    fn stat(&mut self, name: &str) -> Result<Stat> {
        // symlink_metadata so links are classified rather than followed; the
        // resolver's security walk depends on seeing them.
        let meta = fs::symlink_metadata(self.resolve(name))?;
        let filetype = if meta.file_type().is_symlink() {
            FileType::Symlink
        } else if meta.is_dir() {
            FileType::Directory
        } else if meta.is_file() {
            FileType::Regular
        } else {
            FileType::Other
        };
        Ok(Stat {
            filetype,
            filesize: if meta.is_file() { meta.len() } else { 0 },
            modtime: epoch_secs(meta.modified()),
            createtime: epoch_secs(meta.created()),
            accesstime: epoch_secs(meta.accessed()),
            readonly: meta.permissions().readonly(),
        })
    }

    fn enumerate(&mut self, name: &str, callback: &mut EnumFn) -> Result<Visit> {
        for entry in fs::read_dir(self.resolve(name))? {
            let entry = entry?;
            let child = entry.file_name();
            match callback(&child.to_string_lossy())? {
                Visit::Stop => return Ok(Visit::Stop),
                Visit::Continue => {}
            }
        }
        Ok(Visit::Continue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn only_directories_are_claimed() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("plain.txt");
        fs::write(&file, b"x").unwrap();

        assert!(DirArchive::open(dir.path()).is_ok());
        assert_eq!(DirArchive::open(&file).err(), Some(ErrorCode::Unsupported));
        assert_eq!(
            DirArchive::open(&dir.path().join("missing")).err(),
            Some(ErrorCode::NotFound)
        );
    }

    #[test]
    fn stat_reports_files_and_directories() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("sub/data.bin"), b"abcd").unwrap();

        let mut arc = DirArchive::open(dir.path()).unwrap();
        let file = arc.stat("sub/data.bin").unwrap();
        assert_eq!(file.filetype, FileType::Regular);
        assert_eq!(file.filesize, 4);
        assert!(file.modtime.is_some());

        let sub = arc.stat("sub").unwrap();
        assert_eq!(sub.filetype, FileType::Directory);
        assert_eq!(arc.stat("").unwrap().filetype, FileType::Directory);
    }

    #[cfg(unix)]
    #[test]
    fn symlinks_are_classified_not_followed() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("target"), b"real").unwrap();
        std::os::unix::fs::symlink("target", dir.path().join("link")).unwrap();

        let mut arc = DirArchive::open(dir.path()).unwrap();
        assert_eq!(arc.stat("link").unwrap().filetype, FileType::Symlink);
    }

    #[test]
    fn remove_handles_files_and_empty_directories() {
        let dir = TempDir::new().unwrap();
        let mut arc = DirArchive::open(dir.path()).unwrap();

        arc.mkdir("d").unwrap();
        fs::write(dir.path().join("d/f"), b"x").unwrap();
        assert_eq!(arc.remove("d").err(), Some(ErrorCode::DirNotEmpty));
        arc.remove("d/f").unwrap();
        arc.remove("d").unwrap();
        assert_eq!(arc.stat("d").err(), Some(ErrorCode::NotFound));
    }
}
