// tests/common/mod.rs

//! Shared test utilities and helpers for integration tests.

#![allow(dead_code)]

use flate2::write::GzEncoder;
use flate2::Compression;
use smithy::{layout, ArchTree, RootConfig};
use std::fs;
use std::path::{Path, PathBuf};
use tar::{Builder, EntryType, Header};
use tempfile::TempDir;

pub const ARCH: &str = "linux-x86_64";

pub const WRAPPER_SCRIPT: &[u8] = b"#!/bin/sh\nexec \"$(dirname \"$0\")/../libexec/foo\" \"$@\"\n";

/// Create a software root with the architecture folder in place.
///
/// Returns (TempDir, ArchTree) - keep the TempDir alive to prevent cleanup.
pub fn setup_tree() -> (TempDir, ArchTree) {
    let temp_dir = TempDir::new().unwrap();
    let root = RootConfig::new(temp_dir.path().join("swroot"));
    let tree = layout::ensure(&root, ARCH).unwrap();
    (temp_dir, tree)
}

fn append_file(builder: &mut Builder<impl std::io::Write>, path: &str, mode: u32, data: &[u8]) {
    let mut header = Header::new_gnu();
    header.set_entry_type(EntryType::Regular);
    header.set_size(data.len() as u64);
    header.set_mode(mode);
    builder.append_data(&mut header, path, data).unwrap();
}

fn append_dir(builder: &mut Builder<impl std::io::Write>, path: &str, mode: u32) {
    let mut header = Header::new_gnu();
    header.set_entry_type(EntryType::Directory);
    header.set_size(0);
    header.set_mode(mode);
    builder.append_data(&mut header, path, std::io::empty()).unwrap();
}

fn append_symlink(builder: &mut Builder<impl std::io::Write>, path: &str, target: &str) {
    let mut header = Header::new_gnu();
    header.set_entry_type(EntryType::Symlink);
    header.set_size(0);
    header.set_mode(0o777);
    builder.append_link(&mut header, path, target).unwrap();
}

/// Write `foo-1.0.tar.gz` into `dir`.
///
/// Layout (all below a leading `foo-1.0/`):
/// - `configure` (0755)
/// - `README` (0644)
/// - `bin/` (0755) with `bin/foo` (0755 wrapper script)
/// - `libexec/foo` (0700)
/// - `b` (0644) and symlink `a -> b`
pub fn write_foo_archive(dir: &Path) -> PathBuf {
    let path = dir.join("foo-1.0.tar.gz");
    let file = fs::File::create(&path).unwrap();
    let mut builder = Builder::new(GzEncoder::new(file, Compression::default()));

    append_dir(&mut builder, "foo-1.0/", 0o755);
    append_file(&mut builder, "foo-1.0/configure", 0o755, b"#!/bin/sh\necho configured\n");
    append_file(&mut builder, "foo-1.0/README", 0o644, b"foo 1.0\n");
    append_dir(&mut builder, "foo-1.0/bin/", 0o755);
    append_file(&mut builder, "foo-1.0/bin/foo", 0o755, WRAPPER_SCRIPT);
    append_file(&mut builder, "foo-1.0/libexec/foo", 0o700, b"\x7fELF not really\n");
    append_file(&mut builder, "foo-1.0/b", 0o644, b"target of a\n");
    append_symlink(&mut builder, "foo-1.0/a", "b");

    builder.into_inner().unwrap().finish().unwrap();
    path
}

/// Write a gzip tarball whose payload is large enough that cutting it in
/// half lands inside a file body, then cut it in half.
pub fn write_truncated_archive(dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    let file = fs::File::create(&path).unwrap();
    let mut builder = Builder::new(GzEncoder::new(file, Compression::none()));

    append_file(&mut builder, "first", 0o644, &vec![b'x'; 4096]);
    append_file(&mut builder, "second", 0o644, &vec![b'y'; 64 * 1024]);
    builder.into_inner().unwrap().finish().unwrap();

    let data = fs::read(&path).unwrap();
    fs::write(&path, &data[..data.len() / 2]).unwrap();
    path
}

/// Write a plain tarball with two entries, cut right after the first one
/// so the cut lands on a header boundary.
pub fn write_cut_tar(dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    let mut builder = Builder::new(Vec::new());
    append_file(&mut builder, "lib/first", 0o644, b"first");
    append_file(&mut builder, "lib/second", 0o644, b"second");
    let data = builder.into_inner().unwrap();

    fs::write(&path, &data[..1024]).unwrap();
    path
}

/// Write a config file and return its path
pub fn write_config(dir: &Path, content: &str) -> PathBuf {
    let path = dir.join("smithyrc");
    fs::write(&path, content).unwrap();
    path
}
