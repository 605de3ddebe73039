//! Host-directory scenarios: write target, symlink policy, buffering.

mod common;

use std::fs;
use std::io::{Read, Seek, SeekFrom};

use common::build_grp;
use stackfs::{ErrorCode, FileType, Vfs};
use tempfile::TempDir;

fn vfs() -> Vfs {
    Vfs::new().unwrap()
}

fn path_str(dir: &TempDir) -> String {
    dir.path().to_string_lossy().into_owned()
}

#[test]
fn write_then_read_back_through_the_stack() {
    let dir = TempDir::new().unwrap();
    let vfs = vfs();
    vfs.set_write_dir(Some(&path_str(&dir))).unwrap();
    vfs.mount(&path_str(&dir), None, false).unwrap();

    // Parent directories are not implied by a write; create them first.
    assert_eq!(
        vfs.open_write("/save/slot1.dat").err(),
        Some(ErrorCode::NotFound)
    );
    vfs.mkdir("/save").unwrap();

    let mut out = vfs.open_write("/save/slot1.dat").unwrap();
    out.write_bytes(b"progress").unwrap();
    out.close().unwrap();

    let mut read = vfs.open_read("/save/slot1.dat").unwrap();
    let mut text = String::new();
    read.read_to_string(&mut text).unwrap();
    assert_eq!(text, "progress");

    let stat = vfs.stat("/save/slot1.dat").unwrap();
    assert_eq!(stat.filetype, FileType::Regular);
    assert_eq!(stat.filesize, 8);
    assert!(stat.modtime.is_some());
}

#[test]
fn buffered_writes_flush_at_capacity() {
    let dir = TempDir::new().unwrap();
    let vfs = vfs();
    vfs.set_write_dir(Some(&path_str(&dir))).unwrap();

    let mut handle = vfs.open_write("/out.bin").unwrap();
    handle.set_buffer(4).unwrap();

    handle.write_bytes(b"abc").unwrap();
    // Still queued: nothing has reached the file yet.
    assert_eq!(fs::read(dir.path().join("out.bin")).unwrap(), b"");
    assert_eq!(handle.tell().unwrap(), 3);

    // 3 + 3 does not fit under the 4-byte capacity: the queue flushes and
    // the new bytes pass straight through.
    handle.write_bytes(b"def").unwrap();
    assert_eq!(fs::read(dir.path().join("out.bin")).unwrap(), b"abcdef");

    handle.close().unwrap();
    assert_eq!(fs::read(dir.path().join("out.bin")).unwrap(), b"abcdef");
}

#[test]
fn append_extends_an_existing_file() {
    let dir = TempDir::new().unwrap();
    let vfs = vfs();
    vfs.set_write_dir(Some(&path_str(&dir))).unwrap();
    vfs.mount(&path_str(&dir), None, false).unwrap();

    let mut out = vfs.open_write("/log.txt").unwrap();
    out.write_bytes(b"one").unwrap();
    out.close().unwrap();

    let mut out = vfs.open_append("/log.txt").unwrap();
    out.write_bytes(b"two").unwrap();
    out.close().unwrap();

    let mut text = String::new();
    vfs.open_read("/log.txt")
        .unwrap()
        .read_to_string(&mut text)
        .unwrap();
    assert_eq!(text, "onetwo");
}

#[test]
fn writes_require_a_write_target() {
    let vfs = vfs();
    assert_eq!(vfs.open_write("/x").err(), Some(ErrorCode::NoWriteDir));
    assert_eq!(vfs.open_append("/x").err(), Some(ErrorCode::NoWriteDir));
    assert_eq!(vfs.mkdir("/d"), Err(ErrorCode::NoWriteDir));
    assert_eq!(vfs.delete("/x"), Err(ErrorCode::NoWriteDir));
}

#[test]
fn reading_and_writing_do_not_mix() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("data"), b"content").unwrap();
    let vfs = vfs();
    vfs.set_write_dir(Some(&path_str(&dir))).unwrap();
    vfs.mount(&path_str(&dir), None, false).unwrap();

    let mut reader = vfs.open_read("/data").unwrap();
    assert_eq!(reader.write_bytes(b"x"), Err(ErrorCode::OpenForReading));

    let mut writer = vfs.open_write("/other").unwrap();
    let mut buf = [0u8; 1];
    assert_eq!(writer.read_bytes(&mut buf), Err(ErrorCode::OpenForWriting));
    assert!(!writer.eof().unwrap());
}

#[test]
fn mkdir_creates_the_whole_chain() {
    let dir = TempDir::new().unwrap();
    let vfs = vfs();
    vfs.set_write_dir(Some(&path_str(&dir))).unwrap();
    vfs.mount(&path_str(&dir), None, false).unwrap();

    vfs.mkdir("/a/b/c").unwrap();
    assert!(vfs.is_directory("/a/b/c"));
    assert!(dir.path().join("a/b/c").is_dir());

    // Creating it again is fine; creating under a file is not.
    vfs.mkdir("/a/b/c").unwrap();
    let mut f = vfs.open_write("/a/file").unwrap();
    f.write_bytes(b"x").unwrap();
    f.close().unwrap();
    assert!(vfs.mkdir("/a/file/sub").is_err());
}

#[test]
fn delete_removes_files_and_empty_directories() {
    let dir = TempDir::new().unwrap();
    let vfs = vfs();
    vfs.set_write_dir(Some(&path_str(&dir))).unwrap();
    vfs.mount(&path_str(&dir), None, false).unwrap();

    vfs.mkdir("/trash").unwrap();
    let mut f = vfs.open_write("/trash/f").unwrap();
    f.write_bytes(b"x").unwrap();
    f.close().unwrap();

    assert_eq!(vfs.delete("/trash"), Err(ErrorCode::DirNotEmpty));
    vfs.delete("/trash/f").unwrap();
    vfs.delete("/trash").unwrap();
    assert!(!vfs.exists("/trash"));
}

#[cfg(unix)]
#[test]
fn symlinks_are_rejected_unless_permitted() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("target"), b"real bytes").unwrap();
    std::os::unix::fs::symlink("target", dir.path().join("link")).unwrap();

    let vfs = vfs();
    vfs.mount(&path_str(&dir), None, false).unwrap();

    assert!(!vfs.symlinks_permitted());
    assert_eq!(
        vfs.open_read("/link").err(),
        Some(ErrorCode::SymlinkForbidden)
    );
    // Enumeration hides them too.
    assert_eq!(vfs.list_files("/").unwrap(), ["target"]);

    vfs.permit_symlinks(true);
    let mut text = String::new();
    vfs.open_read("/link")
        .unwrap()
        .read_to_string(&mut text)
        .unwrap();
    assert_eq!(text, "real bytes");
    assert_eq!(vfs.list_files("/").unwrap(), ["link", "target"]);
}

#[cfg(unix)]
#[test]
fn symlinked_intermediate_directories_are_rejected_too() {
    let dir = TempDir::new().unwrap();
    fs::create_dir(dir.path().join("real")).unwrap();
    fs::write(dir.path().join("real/file"), b"x").unwrap();
    std::os::unix::fs::symlink("real", dir.path().join("alias")).unwrap();

    let vfs = vfs();
    vfs.mount(&path_str(&dir), None, false).unwrap();

    assert_eq!(
        vfs.open_read("/alias/file").err(),
        Some(ErrorCode::SymlinkForbidden)
    );
    assert!(vfs.open_read("/real/file").is_ok());
}

#[test]
fn native_mounts_and_archives_stack_together() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("readme.txt"), b"host copy").unwrap();

    let vfs = vfs();
    vfs.mount(&path_str(&dir), None, false).unwrap();
    vfs.mount_memory(
        build_grp(&[("README.TXT", b"archive copy"), ("EXTRA", b"only here")]),
        "patch.grp",
        None,
        true,
    )
    .unwrap();

    // The host dir is in front; its copy wins for the name it has.
    let mut text = String::new();
    vfs.open_read("/readme.txt")
        .unwrap()
        .read_to_string(&mut text)
        .unwrap();
    assert_eq!(text, "host copy");

    // Names only the archive has still resolve.
    assert!(vfs.exists("/EXTRA"));

    let names = vfs.list_files("/").unwrap();
    assert_eq!(names, ["EXTRA", "README.TXT", "readme.txt"]);
}

#[test]
fn stat_of_the_root_tracks_the_write_target() {
    let dir = TempDir::new().unwrap();
    let vfs = vfs();

    assert!(vfs.stat("/").unwrap().readonly);
    vfs.set_write_dir(Some(&path_str(&dir))).unwrap();
    assert!(!vfs.stat("/").unwrap().readonly);
    assert_eq!(vfs.write_dir().as_deref(), Some(path_str(&dir).as_str()));

    vfs.set_write_dir(None).unwrap();
    assert!(vfs.stat("/").unwrap().readonly);
}

#[test]
fn handles_integrate_with_std_io() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("lines.txt"), b"alpha\nbeta\ngamma\n").unwrap();

    let vfs = vfs();
    vfs.mount(&path_str(&dir), None, false).unwrap();

    let handle = vfs.open_read("/lines.txt").unwrap();
    let mut lines = std::io::BufRead::lines(std::io::BufReader::new(handle));
    assert_eq!(lines.next().unwrap().unwrap(), "alpha");
    assert_eq!(lines.next().unwrap().unwrap(), "beta");

    let mut handle = vfs.open_read("/lines.txt").unwrap();
    Seek::seek(&mut handle, SeekFrom::End(-6)).unwrap();
    let mut tail = String::new();
    handle.read_to_string(&mut tail).unwrap();
    assert_eq!(tail, "gamma\n");
}

#[test]
fn set_write_dir_rejects_missing_paths() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("nope");
    let vfs = vfs();
    assert_eq!(
        vfs.set_write_dir(Some(&missing.to_string_lossy())),
        Err(ErrorCode::NotFound)
    );
    assert!(vfs.write_dir().is_none());
}
