//! The mount stack: ordered sources resolved into one virtual tree
//!
//! A [`Vfs`] owns an ordered list of mounts (front = highest priority), an
//! archive-format registry, and at most one write target. Reads walk the
//! stack front to back and the first mount that can answer wins; writes only
//! ever touch the write target.
//!
//! One mutex guards the stack, the registry, the write target, and the
//! root-length accumulator. It is held for whole resolution operations but
//! never across a user callback, and never by handle I/O.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use bytes::Bytes;
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::dir_archive::DirArchive;
use crate::error::{ErrorCode, Result, track};
use crate::handle::{Handle, HandleStream, MountToken};
use crate::path::{part_of_mount_point, sanitize};
use crate::platform;
use unpak::archive::{
    ARCHIVER_API_VERSION, Archive, ArchiveFormat, ArchiveInfo, FileType, Probe, Stat, Visit,
};
use unpak::formats;
use unpak::stream::{MemoryStream, NativeStream, Stream};

/// One binding of a backing store into the search stack.
struct Mount {
    archive: Box<dyn Archive>,
    /// The name this mount was created under; unmount and real-dir queries
    /// key off it.
    name: String,
    /// Sanitized virtual prefix with a trailing `/`; `None` mounts at `/`.
    mount_point: Option<String>,
    /// Sanitized archive-relative subpath serving as the visible root.
    root: Option<String>,
    supports_symlinks: bool,
    /// Extension of the claiming format; `None` for host directories.
    format_ext: Option<String>,
    token: MountToken,
}

impl Mount {
    fn has_open_handles(&self) -> bool {
        Arc::strong_count(&self.token) > 1
    }
}

struct State {
    mounts: Vec<Mount>,
    write_mount: Option<Mount>,
    formats: Vec<Box<dyn ArchiveFormat>>,
    /// Longest mount root seen so far; sizes resolver scratch strings.
    /// Grows, never shrinks.
    longest_root: usize,
}

/// A stacked, read-mostly virtual filesystem.
///
/// All paths use `/` separators and pass through sanitization before they
/// touch any mount. The type is `Sync`; open [`Handle`]s are independent of
/// it and never contend with resolution.
pub struct Vfs {
    state: Mutex<State>,
    base_dir: PathBuf,
    user_dir: PathBuf,
    allow_symlinks: AtomicBool,
}

struct OpenedSource {
    archive: Box<dyn Archive>,
    supports_symlinks: bool,
    format_ext: Option<String>,
}

impl Vfs {
    /// Creates a filesystem with the built-in archive formats registered
    /// and no mounts.
    pub fn new() -> Result<Vfs> {
        track(Self::init())
    }

    fn init() -> Result<Vfs> {
        let base_dir = platform::calc_base_dir()?;
        let user_dir = platform::calc_user_dir()?;
        Ok(Vfs {
            state: Mutex::new(State {
                mounts: Vec::new(),
                write_mount: None,
                formats: formats::builtin_formats(),
                longest_root: 0,
            }),
            base_dir,
            user_dir,
            allow_symlinks: AtomicBool::new(false),
        })
    }

    // ----- mounting ------------------------------------------------------

    /// Mounts a host path — a directory or an archive file — at
    /// `mount_point` (`None` for `/`). Mounting a name that is already in
    /// the stack is a no-op success. `append` pushes the mount to the back
    /// of the search order instead of the front.
    pub fn mount(&self, new_dir: &str, mount_point: Option<&str>, append: bool) -> Result<()> {
        track(self.do_mount(None, new_dir, mount_point, append))
    }

    /// Mounts an arbitrary stream under `name`.
    pub fn mount_stream(
        &self,
        stream: Box<dyn Stream>,
        name: &str,
        mount_point: Option<&str>,
        append: bool,
    ) -> Result<()> {
        track(self.do_mount(Some(stream), name, mount_point, append))
    }

    /// Mounts an in-memory archive image under `name`.
    pub fn mount_memory(
        &self,
        data: impl Into<Bytes>,
        name: &str,
        mount_point: Option<&str>,
        append: bool,
    ) -> Result<()> {
        let stream = Box::new(MemoryStream::new(data));
        track(self.do_mount(Some(stream), name, mount_point, append))
    }

    /// Mounts an already-open virtual file as an archive. The handle stays
    /// referenced, so its own mount cannot be unmounted underneath it.
    pub fn mount_handle(
        &self,
        handle: Handle,
        name: &str,
        mount_point: Option<&str>,
        append: bool,
    ) -> Result<()> {
        let stream = Box::new(HandleStream::new(handle));
        track(self.do_mount(Some(stream), name, mount_point, append))
    }

    fn do_mount(
        &self,
        stream: Option<Box<dyn Stream>>,
        name: &str,
        mount_point: Option<&str>,
        append: bool,
    ) -> Result<()> {
        let point = match mount_point {
            None => None,
            Some(mp) => {
                let clean = sanitize(mp)?;
                if clean.is_empty() {
                    None
                } else {
                    Some(format!("{clean}/"))
                }
            }
        };

        let mut st = self.state.lock();
        if st.mounts.iter().any(|m| m.name == name) {
            return Ok(());
        }

        let source = open_source(&st.formats, stream, name, false)?;
        info!(
            name,
            mount_point = point.as_deref().unwrap_or("/"),
            "mounted"
        );
        let mount = Mount {
            archive: source.archive,
            name: name.to_owned(),
            mount_point: point,
            root: None,
            supports_symlinks: source.supports_symlinks,
            format_ext: source.format_ext,
            token: Arc::from(name),
        };
        if append {
            st.mounts.push(mount);
        } else {
            st.mounts.insert(0, mount);
        }
        Ok(())
    }

    /// Removes the mount created under `old_dir`. Fails with
    /// [`ErrorCode::FilesStillOpen`] while any handle still references it.
    pub fn unmount(&self, old_dir: &str) -> Result<()> {
        track((|| {
            let mut st = self.state.lock();
            let idx = st
                .mounts
                .iter()
                .position(|m| m.name == old_dir)
                .ok_or(ErrorCode::NotMounted)?;
            if st.mounts[idx].has_open_handles() {
                return Err(ErrorCode::FilesStillOpen);
            }
            let mount = st.mounts.remove(idx);
            info!(name = %mount.name, "unmounted");
            Ok(())
        })())
    }

    /// The mount names in search order, front first.
    pub fn search_path(&self) -> Vec<String> {
        self.state
            .lock()
            .mounts
            .iter()
            .map(|m| m.name.clone())
            .collect()
    }

    /// The virtual prefix `dir` was mounted at, `/`-delimited on both ends.
    pub fn mount_point(&self, dir: &str) -> Result<String> {
        track((|| {
            let st = self.state.lock();
            let mount = st
                .mounts
                .iter()
                .find(|m| m.name == dir)
                .ok_or(ErrorCode::NotMounted)?;
            Ok(match &mount.mount_point {
                Some(mp) => format!("/{mp}"),
                None => "/".to_owned(),
            })
        })())
    }

    /// Rewrites the named mount's visible root to `subdir` (`None` or `/`
    /// to clear it). Paths resolved through the mount are then relative to
    /// that subdirectory.
    pub fn set_root(&self, archive: &str, subdir: Option<&str>) -> Result<()> {
        track((|| {
            let root = match subdir {
                None => None,
                Some(s) => {
                    let clean = sanitize(s)?;
                    if clean.is_empty() { None } else { Some(clean) }
                }
            };
            let mut st = self.state.lock();
            let st = &mut *st;
            let mount = st
                .mounts
                .iter_mut()
                .find(|m| m.name == archive)
                .ok_or(ErrorCode::NotMounted)?;
            if let Some(root) = &root
                && root.len() > st.longest_root
            {
                st.longest_root = root.len();
            }
            mount.root = root;
            Ok(())
        })())
    }

    // ----- write target --------------------------------------------------

    /// Points the write target at a host directory, or clears it with
    /// `None`. Fails while write handles are open on the current target.
    pub fn set_write_dir(&self, new_dir: Option<&str>) -> Result<()> {
        track((|| {
            let mut st = self.state.lock();
            if let Some(old) = &st.write_mount
                && old.has_open_handles()
            {
                return Err(ErrorCode::FilesStillOpen);
            }
            st.write_mount = None;
            if let Some(dir) = new_dir {
                let source = open_source(&st.formats, None, dir, true)?;
                st.write_mount = Some(Mount {
                    archive: source.archive,
                    name: dir.to_owned(),
                    mount_point: None,
                    root: None,
                    supports_symlinks: source.supports_symlinks,
                    format_ext: source.format_ext,
                    token: Arc::from(dir),
                });
            }
            Ok(())
        })())
    }

    pub fn write_dir(&self) -> Option<String> {
        self.state
            .lock()
            .write_mount
            .as_ref()
            .map(|m| m.name.clone())
    }

    // ----- symlink policy ------------------------------------------------

    pub fn permit_symlinks(&self, allow: bool) {
        self.allow_symlinks.store(allow, Ordering::Relaxed);
    }

    pub fn symlinks_permitted(&self) -> bool {
        self.allow_symlinks.load(Ordering::Relaxed)
    }

    // ----- reading -------------------------------------------------------

    /// Opens the first mount's copy of `name` for reading.
    pub fn open_read(&self, name: &str) -> Result<Handle> {
        track(self.do_open_read(name))
    }

    fn do_open_read(&self, name: &str) -> Result<Handle> {
        let fname = sanitize(name)?;
        let mut st = self.state.lock();
        let st = &mut *st;
        if st.mounts.is_empty() {
            return Err(ErrorCode::NotFound);
        }
        let allow = self.allow_symlinks.load(Ordering::Relaxed);
        let mut last = ErrorCode::NotFound;
        for mount in &mut st.mounts {
            match verify_path(mount, &fname, false, allow, st.longest_root) {
                Ok(local) => match mount.archive.open_read(&local) {
                    Ok(stream) => return Ok(Handle::new(stream, true, mount.token.clone())),
                    Err(e) => last = e,
                },
                Err(e) => last = e,
            }
        }
        Err(last)
    }

    /// Whether `name` resolves in any mount.
    pub fn exists(&self, name: &str) -> bool {
        self.real_dir(name).is_ok()
    }

    /// The mount name that would answer a read of `name`.
    pub fn real_dir(&self, name: &str) -> Result<String> {
        track(self.do_real_dir(name))
    }

    fn do_real_dir(&self, name: &str) -> Result<String> {
        let fname = sanitize(name)?;
        let mut st = self.state.lock();
        let st = &mut *st;
        let allow = self.allow_symlinks.load(Ordering::Relaxed);
        for mount in &mut st.mounts {
            if part_of_mount_point(mount.mount_point.as_deref(), &fname) {
                return Ok(mount.name.clone());
            }
            if let Ok(local) = verify_path(mount, &fname, false, allow, st.longest_root)
                && mount.archive.stat(&local).is_ok()
            {
                return Ok(mount.name.clone());
            }
        }
        Err(ErrorCode::NotFound)
    }

    /// Metadata for `name`, answered by the first mount that knows it.
    pub fn stat(&self, name: &str) -> Result<Stat> {
        track(self.do_stat(name))
    }

    fn do_stat(&self, name: &str) -> Result<Stat> {
        let fname = sanitize(name)?;
        let mut st = self.state.lock();
        let st = &mut *st;
        if fname.is_empty() {
            // The virtual root always exists; it is writable exactly when a
            // write target is configured.
            return Ok(Stat {
                filetype: FileType::Directory,
                filesize: 0,
                modtime: None,
                createtime: None,
                accesstime: None,
                readonly: st.write_mount.is_none(),
            });
        }
        let allow = self.allow_symlinks.load(Ordering::Relaxed);
        let mut last = ErrorCode::NotFound;
        for mount in &mut st.mounts {
            if part_of_mount_point(mount.mount_point.as_deref(), &fname) {
                return Ok(Stat {
                    filetype: FileType::Directory,
                    filesize: 0,
                    modtime: None,
                    createtime: None,
                    accesstime: None,
                    readonly: true,
                });
            }
            match verify_path(mount, &fname, false, allow, st.longest_root) {
                Ok(local) => match mount.archive.stat(&local) {
                    Ok(stat) => return Ok(stat),
                    Err(ErrorCode::NotFound) => {}
                    Err(e) => return Err(e),
                },
                Err(e) => last = e,
            }
        }
        Err(last)
    }

    pub fn is_directory(&self, name: &str) -> bool {
        self.stat(name)
            .is_ok_and(|s| s.filetype == FileType::Directory)
    }

    /// Modification time of `name`, seconds since the epoch, when the
    /// backing store records one.
    pub fn last_mod_time(&self, name: &str) -> Result<Option<i64>> {
        Ok(self.stat(name)?.modtime)
    }

    // ----- writing -------------------------------------------------------

    /// Creates (truncating) `name` in the write target.
    pub fn open_write(&self, name: &str) -> Result<Handle> {
        track(self.do_open_write(name, false))
    }

    /// Opens `name` in the write target for appending.
    pub fn open_append(&self, name: &str) -> Result<Handle> {
        track(self.do_open_write(name, true))
    }

    fn do_open_write(&self, name: &str, appending: bool) -> Result<Handle> {
        let fname = sanitize(name)?;
        let mut st = self.state.lock();
        let st = &mut *st;
        let allow = self.allow_symlinks.load(Ordering::Relaxed);
        let mount = st.write_mount.as_mut().ok_or(ErrorCode::NoWriteDir)?;
        let local = verify_path(mount, &fname, false, allow, st.longest_root)?;
        let stream = if appending {
            mount.archive.open_append(&local)?
        } else {
            mount.archive.open_write(&local)?
        };
        Ok(Handle::new(stream, false, mount.token.clone()))
    }

    /// Creates `dname` and any missing parents in the write target.
    pub fn mkdir(&self, dname: &str) -> Result<()> {
        track(self.do_mkdir(dname))
    }

    fn do_mkdir(&self, dname: &str) -> Result<()> {
        let fname = sanitize(dname)?;
        let mut st = self.state.lock();
        let st = &mut *st;
        let allow = self.allow_symlinks.load(Ordering::Relaxed);
        let mount = st.write_mount.as_mut().ok_or(ErrorCode::NoWriteDir)?;
        let path = verify_path(mount, &fname, true, allow, st.longest_root)?;
        if path.is_empty() {
            return Ok(());
        }

        let mut exists = true;
        let mut upto = 0;
        loop {
            let end = path[upto..].find('/').map(|i| upto + i);
            let prefix = &path[..end.unwrap_or(path.len())];
            if exists {
                match mount.archive.stat(prefix) {
                    Ok(stat) => {
                        // The write dir itself may sit behind a symlink
                        // (e.g. /var on some hosts); tolerate link
                        // components that already exist.
                        if stat.filetype != FileType::Directory
                            && stat.filetype != FileType::Symlink
                        {
                            return Err(ErrorCode::Io(std::io::ErrorKind::NotADirectory));
                        }
                    }
                    Err(ErrorCode::NotFound) => exists = false,
                    Err(e) => return Err(e),
                }
            }
            if !exists {
                mount.archive.mkdir(prefix)?;
            }
            match end {
                None => break,
                Some(i) => upto = i + 1,
            }
        }
        Ok(())
    }

    /// Removes a file or empty directory from the write target.
    pub fn delete(&self, fname: &str) -> Result<()> {
        track(self.do_delete(fname))
    }

    fn do_delete(&self, fname: &str) -> Result<()> {
        let fname = sanitize(fname)?;
        let mut st = self.state.lock();
        let st = &mut *st;
        let allow = self.allow_symlinks.load(Ordering::Relaxed);
        let mount = st.write_mount.as_mut().ok_or(ErrorCode::NoWriteDir)?;
        let local = verify_path(mount, &fname, false, allow, st.longest_root)?;
        mount.archive.remove(&local)
    }

    // ----- enumeration ---------------------------------------------------

    /// Calls `callback(dir, basename)` for the union of `dir`'s children
    /// across every mount, sorted ascending with duplicates suppressed.
    ///
    /// The callback runs with no internal lock held. Returning
    /// [`Visit::Stop`] ends the walk early; an error fails the call with
    /// [`ErrorCode::AppCallback`].
    pub fn enumerate<F>(&self, dir: &str, mut callback: F) -> Result<()>
    where
        F: FnMut(&str, &str) -> Result<Visit>,
    {
        track(self.do_enumerate(dir, &mut callback))
    }

    fn do_enumerate(
        &self,
        dir: &str,
        callback: &mut dyn FnMut(&str, &str) -> Result<Visit>,
    ) -> Result<()> {
        let names = self.collect_names(dir)?;
        for name in &names {
            match callback(dir, name) {
                Ok(Visit::Continue) => {}
                Ok(Visit::Stop) => break,
                Err(_) => return Err(ErrorCode::AppCallback),
            }
        }
        Ok(())
    }

    /// The sorted, de-duplicated union of one directory's children.
    pub fn list_files(&self, dir: &str) -> Result<Vec<String>> {
        track(self.collect_names(dir))
    }

    fn collect_names(&self, dir: &str) -> Result<Vec<String>> {
        let fname = sanitize(dir)?;
        let mut st = self.state.lock();
        let st = &mut *st;
        let allow = self.allow_symlinks.load(Ordering::Relaxed);

        let mut names: Vec<String> = Vec::new();
        for mount in &mut st.mounts {
            if let Some(mp) = &mount.mount_point
                && part_of_mount_point(Some(mp), &fname)
            {
                // Surface the virtual directory the mount point creates
                // under the enumerated one.
                let rest = if fname.is_empty() {
                    &mp[..]
                } else {
                    &mp[fname.len() + 1..]
                };
                // Mount points are stored with a trailing '/', so the next
                // separator is always there.
                let segment = rest.find('/').map_or(rest, |i| &rest[..i]);
                insert_sorted(&mut names, segment);
                continue;
            }

            let Ok(local) = verify_path(mount, &fname, false, allow, st.longest_root) else {
                continue;
            };
            match mount.archive.stat(&local) {
                Ok(stat) if stat.filetype == FileType::Directory => {}
                _ => continue, // Not a directory in this mount; skip it.
            }

            let mut collected: Vec<String> = Vec::new();
            mount.archive.enumerate(&local, &mut |name| {
                collected.push(name.to_owned());
                Ok(Visit::Continue)
            })?;

            let filter_symlinks = !allow && mount.supports_symlinks;
            for name in collected {
                if filter_symlinks {
                    let child = if local.is_empty() {
                        name.clone()
                    } else {
                        format!("{local}/{name}")
                    };
                    match mount.archive.stat(&child) {
                        Ok(stat) if stat.filetype == FileType::Symlink => continue,
                        Ok(_) => {}
                        Err(e) => return Err(e),
                    }
                }
                insert_sorted(&mut names, &name);
            }
        }
        Ok(names)
    }

    // ----- registry ------------------------------------------------------

    /// Registers an additional archive format. At most one format per
    /// extension (compared case-insensitively) may be registered.
    pub fn register_archiver(&self, format: Box<dyn ArchiveFormat>) -> Result<()> {
        track((|| {
            if format.version() > ARCHIVER_API_VERSION {
                return Err(ErrorCode::Unsupported);
            }
            let info = format.info();
            if info.extension.is_empty() || info.description.is_empty() {
                return Err(ErrorCode::InvalidArgument);
            }
            let mut st = self.state.lock();
            if st
                .formats
                .iter()
                .any(|f| f.info().extension.eq_ignore_ascii_case(&info.extension))
            {
                return Err(ErrorCode::Duplicate);
            }
            st.formats.push(format);
            Ok(())
        })())
    }

    /// Removes a registered format by extension. Fails while a mount opened
    /// by that format is still in the stack.
    pub fn deregister_archiver(&self, ext: &str) -> Result<()> {
        track((|| {
            let mut st = self.state.lock();
            let idx = st
                .formats
                .iter()
                .position(|f| f.info().extension.eq_ignore_ascii_case(ext))
                .ok_or(ErrorCode::NotFound)?;
            let in_use = st.mounts.iter().any(|m| {
                m.format_ext
                    .as_deref()
                    .is_some_and(|e| e.eq_ignore_ascii_case(ext))
            });
            if in_use {
                return Err(ErrorCode::FilesStillOpen);
            }
            st.formats.remove(idx);
            Ok(())
        })())
    }

    /// Descriptive records of every registered format.
    pub fn supported_archive_types(&self) -> Vec<ArchiveInfo> {
        self.state
            .lock()
            .formats
            .iter()
            .map(|f| f.info().clone())
            .collect()
    }

    // ----- process directories and bootstrap -----------------------------

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn user_dir(&self) -> &Path {
        &self.user_dir
    }

    /// Per-user, per-application writable directory, created on demand.
    pub fn pref_dir(&self, org: &str, app: &str) -> Result<PathBuf> {
        track((|| {
            if org.is_empty() || app.is_empty() {
                return Err(ErrorCode::InvalidArgument);
            }
            platform::calc_pref_dir(org, app)
        })())
    }

    /// Convenience bootstrap: the pref dir becomes the write target and the
    /// front mount, the base dir goes behind it, and every `*.archive_ext`
    /// found at the virtual root is mounted (appended unless
    /// `archives_first`). Individual archive mounts that fail are skipped.
    pub fn set_sane_config(
        &self,
        organization: &str,
        app_name: &str,
        archive_ext: Option<&str>,
        archives_first: bool,
    ) -> Result<()> {
        track(self.do_set_sane_config(organization, app_name, archive_ext, archives_first))
    }

    fn do_set_sane_config(
        &self,
        organization: &str,
        app_name: &str,
        archive_ext: Option<&str>,
        archives_first: bool,
    ) -> Result<()> {
        let pref = self.pref_dir(organization, app_name)?;
        let pref = pref.to_string_lossy().into_owned();
        self.set_write_dir(Some(&pref))
            .map_err(|_| ErrorCode::NoWriteDir)?;

        if let Err(e) = self.mount(&pref, None, false) {
            warn!(dir = %pref, error = %e, "could not mount pref dir");
        }
        let base = self.base_dir.to_string_lossy().into_owned();
        if let Err(e) = self.mount(&base, None, true) {
            warn!(dir = %base, error = %e, "could not mount base dir");
        }

        if let Some(ext) = archive_ext {
            for file in self.list_files("/")? {
                let is_archive = file
                    .rsplit_once('.')
                    .is_some_and(|(stem, e)| !stem.is_empty() && e.eq_ignore_ascii_case(ext));
                if !is_archive {
                    continue;
                }
                let Ok(dir) = self.real_dir(&file) else {
                    continue;
                };
                let full = Path::new(&dir).join(&file);
                let full = full.to_string_lossy();
                if self.mount(&full, None, !archives_first).is_err() {
                    warn!(archive = %full, "skipping archive that failed to mount");
                }
            }
        }
        Ok(())
    }
}

/// Translates `fname` into `mount`'s archive-local path, enforcing the
/// mount-point prefix and — unless symlinks are permitted — walking every
/// path prefix to reject symlinked components.
///
/// `Err(NotFound)` means the path simply is not this mount's to answer.
/// `allow_missing` lets nonexistent intermediate components pass, for
/// recursive creation and for writes that create new files.
fn verify_path(
    mount: &mut Mount,
    fname: &str,
    allow_missing: bool,
    allow_symlinks: bool,
    longest_root: usize,
) -> Result<String> {
    let mut local = fname;
    if let Some(mp) = &mount.mount_point {
        let stem = &mp[..mp.len() - 1];
        if fname.len() < stem.len() || !fname.as_bytes().starts_with(stem.as_bytes()) {
            return Err(ErrorCode::NotFound);
        }
        if fname.len() > stem.len() && fname.as_bytes()[stem.len()] != b'/' {
            return Err(ErrorCode::NotFound);
        }
        local = fname[stem.len()..].strip_prefix('/').unwrap_or("");
    }

    let mut path = String::with_capacity(local.len() + longest_root + 1);
    if let Some(root) = &mount.root {
        path.push_str(root);
        if !local.is_empty() {
            path.push('/');
        }
    }
    path.push_str(local);

    if allow_symlinks || path.is_empty() {
        return Ok(path);
    }

    // Walk every prefix, stat-ing each; a symlink anywhere is fatal.
    let mut upto = 0;
    loop {
        let end = path[upto..].find('/').map(|i| upto + i);
        let prefix = &path[..end.unwrap_or(path.len())];
        match mount.archive.stat(prefix) {
            Ok(stat) if stat.filetype == FileType::Symlink => {
                return Err(ErrorCode::SymlinkForbidden);
            }
            Ok(_) => {}
            Err(ErrorCode::NotFound) => {
                // A missing final element is fine (it may be about to be
                // created); a missing intermediate one is not, unless the
                // caller allows it.
                if end.is_none() || allow_missing {
                    break;
                }
                return Err(ErrorCode::NotFound);
            }
            Err(e) => return Err(e),
        }
        match end {
            None => break,
            Some(i) => upto = i + 1,
        }
    }
    Ok(path)
}

/// Opens a backing store. A host directory gets the native adapter first;
/// anything else becomes a native stream probed against the registered
/// formats — extension matches first, then the rest, registration order when
/// the name has no extension hint.
fn open_source(
    formats: &[Box<dyn ArchiveFormat>],
    stream: Option<Box<dyn Stream>>,
    name: &str,
    for_writing: bool,
) -> Result<OpenedSource> {
    let mut stream = match stream {
        Some(stream) => {
            if for_writing {
                return Err(ErrorCode::Unsupported);
            }
            stream
        }
        None => {
            let path = Path::new(name);
            let meta = std::fs::metadata(path)?;
            if meta.is_dir() {
                debug!(name, "claimed by the native directory adapter");
                return Ok(OpenedSource {
                    archive: Box::new(DirArchive::open(path)?),
                    supports_symlinks: DirArchive::info().supports_symlinks,
                    format_ext: None,
                });
            }
            if for_writing {
                // Only host directories accept writes; archives never do.
                return Err(ErrorCode::Unsupported);
            }
            Box::new(NativeStream::open_read(path)?)
        }
    };

    let extension = name
        .rsplit_once('.')
        .map(|(_, ext)| ext)
        .filter(|ext| !ext.is_empty());
    let order: Vec<usize> = match extension {
        Some(ext) => {
            let matches = |i: &usize| formats[*i].info().extension.eq_ignore_ascii_case(ext);
            (0..formats.len())
                .filter(matches)
                .chain((0..formats.len()).filter(|i| !matches(i)))
                .collect()
        }
        None => (0..formats.len()).collect(),
    };

    for i in order {
        stream.seek(0)?;
        match formats[i].try_open(stream) {
            Probe::Opened(archive) => {
                let info = formats[i].info();
                debug!(name, format = %info.extension, "archive claimed");
                return Ok(OpenedSource {
                    archive,
                    supports_symlinks: info.supports_symlinks,
                    format_ext: Some(info.extension.clone()),
                });
            }
            Probe::NotMine(returned) => stream = returned,
            Probe::Failed(code) => return Err(code),
        }
    }
    Err(ErrorCode::Unsupported)
}

/// Sorted-unique insertion, binary search for the slot.
fn insert_sorted(list: &mut Vec<String>, name: &str) {
    if let Err(pos) = list.binary_search_by(|probe| probe.as_str().cmp(name)) {
        list.insert(pos, name.to_owned());
    }
}
