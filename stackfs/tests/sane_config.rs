//! The convenience bootstrap, pointed at a scratch data directory.

#![cfg(target_os = "linux")]

mod common;

use common::build_grp;
use stackfs::Vfs;
use tempfile::TempDir;

#[test]
fn sane_config_bootstraps_write_dir_mounts_and_archives() {
    let data_home = TempDir::new().unwrap();
    // `dirs` resolves the per-user data dir from the environment on Linux.
    unsafe { std::env::set_var("XDG_DATA_HOME", data_home.path()) };

    // Drop an archive where the pref dir will appear, so the archive pass
    // has something to find.
    let pref = data_home.path().join("Example Org/demo");
    std::fs::create_dir_all(&pref).unwrap();
    std::fs::write(
        pref.join("content.grp"),
        build_grp(&[("HELLO.TXT", b"from the archive")]),
    )
    .unwrap();

    let vfs = Vfs::new().unwrap();
    vfs.set_sane_config("Example Org", "demo", Some("grp"), false)
        .unwrap();

    // Write target and front mount are the pref dir; the base dir follows;
    // the discovered archive is appended behind both.
    let pref_str = pref.to_string_lossy().into_owned();
    assert_eq!(vfs.write_dir().as_deref(), Some(pref_str.as_str()));

    let mounts = vfs.search_path();
    assert_eq!(mounts.first().map(String::as_str), Some(pref_str.as_str()));
    assert!(mounts.len() >= 3);
    assert!(mounts.last().unwrap().ends_with("content.grp"));

    let mut text = String::new();
    std::io::Read::read_to_string(&mut vfs.open_read("/HELLO.TXT").unwrap(), &mut text).unwrap();
    assert_eq!(text, "from the archive");

    // The write target works immediately.
    let mut out = vfs.open_write("/settings.cfg").unwrap();
    out.write_bytes(b"fullscreen=1").unwrap();
    out.close().unwrap();
    assert!(pref.join("settings.cfg").is_file());
}
