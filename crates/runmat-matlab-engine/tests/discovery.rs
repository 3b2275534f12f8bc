use std::fs;
use std::path::Path;

use runmat_matlab_engine::{find_matlab_root_in, EngineError, EngineLayout, Platform};

fn fake_install(root: &Path, arch: &str) {
    fs::create_dir_all(root.join("bin").join(arch)).unwrap();
    fs::write(root.join("bin").join("matlab"), "#!/bin/sh\n").unwrap();
}

#[test]
fn root_is_found_from_the_launcher() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("R2023b");
    fake_install(&root, "glnxa64");

    let empty = dir.path().join("empty");
    fs::create_dir_all(&empty).unwrap();
    let path = std::env::join_paths([empty, root.join("bin")]).unwrap();

    let found = find_matlab_root_in(&path).unwrap();
    assert_eq!(
        fs::canonicalize(found).unwrap(),
        fs::canonicalize(&root).unwrap()
    );
}

#[test]
fn no_launcher_no_root() {
    let dir = tempfile::tempdir().unwrap();
    let path = std::env::join_paths([dir.path()]).unwrap();
    assert_eq!(find_matlab_root_in(&path), None);
}

#[test]
fn linux_layout() {
    let dir = tempfile::tempdir().unwrap();
    fake_install(dir.path(), "glnxa64");

    let layout =
        EngineLayout::for_platform(dir.path(), "-nosplash", Platform::Linux, true).unwrap();
    let lib_dir = dir.path().join("bin").join("glnxa64");
    assert_eq!(layout.libeng, lib_dir.join("libeng.so"));
    assert_eq!(layout.libmx, lib_dir.join("libmx.so"));
    assert_eq!(layout.lib_dir, lib_dir);
    let command = layout.command.unwrap();
    assert!(command.ends_with(" -nosplash"));
    assert!(command.contains("matlab"));
}

#[test]
fn windows_layout_uses_the_registered_server() {
    let dir = tempfile::tempdir().unwrap();
    fake_install(dir.path(), "win64");

    let layout = EngineLayout::for_platform(dir.path(), "", Platform::Windows, true).unwrap();
    assert_eq!(layout.command, None);
    assert_eq!(layout.libeng.file_name().unwrap(), "libeng.dll");
}

#[test]
fn missing_arch_directory() {
    let dir = tempfile::tempdir().unwrap();
    fake_install(dir.path(), "glnxa64");

    let err = EngineLayout::for_platform(dir.path(), "", Platform::Linux, false).unwrap_err();
    assert!(matches!(err, EngineError::Startup(ref msg) if msg.contains("32bit build")));
}
