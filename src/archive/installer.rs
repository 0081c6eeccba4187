// src/archive/installer.rs

//! Tarball extraction into an architecture tree
//!
//! Entries are unpacked one by one rather than through `Archive::unpack` so
//! that every path can be sanitized, symlinks are recreated literally, and
//! reader failures (a corrupt archive) stay distinguishable from writer
//! failures (a broken filesystem).

use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::io::{self, Read, Write};
use std::os::unix::fs::{MetadataExt, PermissionsExt};
use std::path::{Component, Path, PathBuf};
use tar::{Archive, EntryType};
use tracing::{debug, info, warn};

use super::{ArchiveFormat, ArtifactKind, InstallReport, InstalledArtifact};
use crate::error::{Error, Result};
use crate::filesystem::{PathError, sanitize_path};
use crate::layout::ArchTree;
use crate::permissions::{FileMode, group_name_for_gid};

/// Copy buffer for file bodies
const COPY_CHUNK_SIZE: usize = 64 * 1024;

/// Prefix of staging directories inside the architecture folder
const STAGING_PREFIX: &str = ".smithy-";

/// Install an archive into `tree`
///
/// The package name is the archive's base name without its suffix, and the
/// package lands at `<arch>/<package>`. Entries whose first component equals
/// the package name (the usual `foo-1.0/...` tarball layout) have that
/// component stripped.
///
/// Fails without touching the tree when the package directory already
/// exists. On any extraction failure the staging directory is removed, so
/// the package directory is either complete or absent.
pub fn install(archive_path: &Path, tree: &ArchTree) -> Result<InstallReport> {
    let format = ArchiveFormat::from_path(archive_path)?;
    let package_name = ArchiveFormat::package_name(archive_path)?;
    let package_path = tree.package_path(&package_name)?;

    if package_path.symlink_metadata().is_ok() {
        return Err(Error::extraction(
            &package_path,
            "package is already installed (refusing to overwrite)",
        ));
    }

    let reader = format.open(archive_path)?;
    info!(
        "Installing {} ({}) into {}",
        archive_path.display(),
        format.name(),
        package_path.display()
    );

    let staging = tempfile::Builder::new()
        .prefix(STAGING_PREFIX)
        .tempdir_in(tree.arch_path())
        .map_err(|e| {
            Error::extraction(&package_path, format!("cannot create staging directory: {}", e))
        })?;
    let staged_root = staging.path().join(&package_name);

    let result = stage(archive_path, reader, &package_name, &staged_root, &package_path)
        .and_then(|(artifacts, root_mode)| {
            // Someone may have installed the same package while we extracted
            if package_path.symlink_metadata().is_ok() {
                return Err(Error::extraction(
                    &package_path,
                    "package appeared during extraction",
                ));
            }
            fs::rename(&staged_root, &package_path)
                .map_err(|e| Error::extraction(&package_path, format!("rename failed: {}", e)))?;

            // Moving a directory rewrites its "..", which needs write access,
            // so the package root only gets its archived mode once in place
            if let Some(mode) = root_mode {
                if let Err(e) = fs::set_permissions(&package_path, fs::Permissions::from_mode(mode)) {
                    make_removable(&package_path);
                    if let Err(rm) = fs::remove_dir_all(&package_path) {
                        warn!("Cannot remove {}: {}", package_path.display(), rm);
                    }
                    return Err(Error::extraction(&package_path, e));
                }
            }
            Ok(artifacts)
        });

    let artifacts = match result {
        Ok(artifacts) => artifacts,
        Err(e) => {
            warn!("Install of {} failed, discarding staged files", package_name);
            make_removable(staging.path());
            return Err(e);
        }
    };

    info!(
        "Installed {} ({} entries) into {}",
        package_name,
        artifacts.len(),
        package_path.display()
    );

    Ok(InstallReport {
        package_name,
        package_path,
        artifacts,
    })
}

/// Entries written to the staging directory
struct Unpacked {
    /// `(relative path, kind)` in archive order
    entries: Vec<(PathBuf, ArtifactKind)>,
    /// Archived mode of the package root, applied after the rename
    root_mode: Option<u32>,
}

/// Unpack into `staged_root` and describe the result at its final location
///
/// Also returns the mode the package root should get once it is in place.
fn stage<R: Read>(
    archive_path: &Path,
    reader: R,
    package_name: &str,
    staged_root: &Path,
    package_path: &Path,
) -> Result<(Vec<InstalledArtifact>, Option<u32>)> {
    fs::create_dir(staged_root).map_err(|e| Error::extraction(staged_root, e))?;

    let unpacked = unpack(archive_path, reader, package_name, staged_root)?;
    let root_mode = unpacked.root_mode;

    let artifacts = unpacked
        .entries
        .into_iter()
        .map(|(rel, kind)| -> Result<InstalledArtifact> {
            let metadata = fs::symlink_metadata(staged_root.join(&rel))?;
            let is_root = rel.as_os_str().is_empty();
            let mode = match root_mode {
                Some(mode) if is_root => FileMode::from_raw(mode),
                _ => FileMode::from_raw(metadata.mode()),
            };
            Ok(InstalledArtifact {
                source_archive: archive_path.to_path_buf(),
                dest_path: if is_root {
                    package_path.to_path_buf()
                } else {
                    package_path.join(&rel)
                },
                mode,
                group_owner: group_name_for_gid(metadata.gid()),
                is_symlink: kind == ArtifactKind::Symlink,
                kind,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok((artifacts, root_mode))
}

/// Reader that remembers whether the underlying stream ran dry
///
/// `tar` treats end of input at a header boundary like the end-of-archive
/// marker, so a cut between two entries would otherwise look complete.
struct EndTracker<R> {
    inner: R,
    exhausted: bool,
}

impl<R: Read> Read for EndTracker<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        if n == 0 && !buf.is_empty() {
            self.exhausted = true;
        }
        Ok(n)
    }
}

/// Write every archive entry below `staged_root`
///
/// The package root itself has an empty relative path. Its mode is
/// returned rather than applied.
fn unpack<R: Read>(
    archive_path: &Path,
    reader: R,
    package_name: &str,
    staged_root: &Path,
) -> Result<Unpacked> {
    let corrupt = |reason: String| Error::corrupt(archive_path, reason);

    let mut archive = Archive::new(EndTracker {
        inner: reader,
        exhausted: false,
    });
    let mut unpacked = Vec::new();
    let mut seen: HashMap<PathBuf, ArtifactKind> = HashMap::new();
    let mut dir_modes = Vec::new();
    let mut root_mode = None;

    let entries = archive
        .entries()
        .map_err(|e| corrupt(format!("cannot read entries: {}", e)))?;

    for entry in entries {
        let mut entry = entry.map_err(|e| corrupt(format!("cannot read entry: {}", e)))?;
        let entry_type = entry.header().entry_type();

        if matches!(
            entry_type,
            EntryType::XGlobalHeader | EntryType::XHeader | EntryType::GNULongName | EntryType::GNULongLink
        ) {
            debug!("Skipping metadata entry {:?}", entry_type);
            continue;
        }

        let raw_path = entry
            .path()
            .map_err(|e| corrupt(format!("bad entry path: {}", e)))?
            .into_owned();
        let rel = relative_entry_path(&raw_path, package_name)
            .map_err(|e| corrupt(format!("{}: {}", raw_path.display(), e)))?;
        let dest = staged_root.join(&rel);
        let mode = entry
            .header()
            .mode()
            .map_err(|e| corrupt(format!("bad mode for {}: {}", raw_path.display(), e)))?
            & 0o7777;

        // Writing through an archived symlink could escape the package
        if let Some(link) = rel
            .ancestors()
            .skip(1)
            .find(|a| seen.get(*a) == Some(&ArtifactKind::Symlink))
        {
            return Err(corrupt(format!(
                "{} is beneath symlink {}",
                raw_path.display(),
                link.display()
            )));
        }

        let kind = match entry_type {
            EntryType::Directory => ArtifactKind::Directory,
            EntryType::Regular | EntryType::Continuous => ArtifactKind::File,
            EntryType::Symlink => ArtifactKind::Symlink,
            EntryType::Link => ArtifactKind::HardLink,
            other => {
                return Err(Error::extraction(
                    &dest,
                    format!("unsupported entry type {:?}", other),
                ));
            }
        };

        if let Some(previous) = seen.get(&rel) {
            if *previous == ArtifactKind::Directory && kind == ArtifactKind::Directory {
                debug!("Directory {} listed twice", raw_path.display());
                continue;
            }
            return Err(Error::extraction(
                &dest,
                format!("archive entry {} would overwrite an earlier entry", raw_path.display()),
            ));
        }
        if rel.as_os_str().is_empty() && kind != ArtifactKind::Directory {
            return Err(corrupt(format!(
                "{} would replace the package directory",
                raw_path.display()
            )));
        }

        if kind != ArtifactKind::Directory {
            if let Some(parent) = dest.parent() {
                fs::create_dir_all(parent).map_err(|e| Error::extraction(parent, e))?;
            }
        }

        match kind {
            ArtifactKind::Directory => {
                fs::create_dir_all(&dest).map_err(|e| Error::extraction(&dest, e))?;
                if rel.as_os_str().is_empty() {
                    root_mode = Some(mode);
                } else {
                    dir_modes.push((dest.clone(), mode));
                }
            }
            ArtifactKind::File => {
                write_file(&mut entry, &dest, archive_path)?;
                fs::set_permissions(&dest, fs::Permissions::from_mode(mode))
                    .map_err(|e| Error::extraction(&dest, e))?;
            }
            ArtifactKind::Symlink => {
                let target = entry
                    .link_name()
                    .map_err(|e| corrupt(format!("bad link target: {}", e)))?
                    .ok_or_else(|| corrupt(format!("symlink {} has no target", raw_path.display())))?
                    .into_owned();
                std::os::unix::fs::symlink(&target, &dest)
                    .map_err(|e| Error::extraction(&dest, e))?;
                debug!("Symlink {} -> {}", rel.display(), target.display());
            }
            ArtifactKind::HardLink => {
                let target = entry
                    .link_name()
                    .map_err(|e| corrupt(format!("bad link target: {}", e)))?
                    .ok_or_else(|| corrupt(format!("hard link {} has no target", raw_path.display())))?
                    .into_owned();
                let target_rel = relative_entry_path(&target, package_name)
                    .map_err(|e| corrupt(format!("{}: {}", target.display(), e)))?;
                match seen.get(&target_rel) {
                    Some(ArtifactKind::File) | Some(ArtifactKind::HardLink) => {}
                    _ => {
                        return Err(corrupt(format!(
                            "hard link {} points at {}, which is not an earlier file",
                            raw_path.display(),
                            target.display()
                        )));
                    }
                }
                fs::hard_link(staged_root.join(&target_rel), &dest)
                    .map_err(|e| Error::extraction(&dest, e))?;
            }
        }

        seen.insert(rel.clone(), kind);
        unpacked.push((rel, kind));
    }

    let mut rest = archive.into_inner();
    if rest.exhausted {
        return Err(corrupt(
            "archive ends without an end-of-archive marker".to_string(),
        ));
    }

    // Drain the rest of the stream so a truncated gzip trailer is noticed
    io::copy(&mut rest, &mut io::sink())
        .map_err(|e| corrupt(format!("unexpected end of archive: {}", e)))?;

    // Directory modes last, so read-only directories can still be filled
    for (dir, mode) in dir_modes.iter().rev() {
        fs::set_permissions(dir, fs::Permissions::from_mode(*mode))
            .map_err(|e| Error::extraction(dir, e))?;
    }

    Ok(Unpacked {
        entries: unpacked,
        root_mode,
    })
}

/// Map an archive path to a path relative to the package directory
fn relative_entry_path(raw: &Path, package_name: &str) -> std::result::Result<PathBuf, PathError> {
    let sanitized = match sanitize_path(raw) {
        Ok(path) => path,
        // "./" and "/" name the package root
        Err(PathError::Empty) => return Ok(PathBuf::new()),
        Err(e) => return Err(e),
    };

    let mut components = sanitized.components();
    match components.next() {
        Some(Component::Normal(first)) if first == package_name => {
            Ok(components.as_path().to_path_buf())
        }
        _ => Ok(sanitized),
    }
}

/// Copy one file body, keeping read and write failures apart
fn write_file<R: Read>(entry: &mut tar::Entry<'_, R>, dest: &Path, archive_path: &Path) -> Result<()> {
    let expected = entry.size();
    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(dest)
        .map_err(|e| Error::extraction(dest, e))?;

    let mut buf = vec![0u8; COPY_CHUNK_SIZE];
    let mut written = 0u64;
    loop {
        let n = match entry.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => {
                return Err(Error::corrupt(
                    archive_path,
                    format!("reading {}: {}", dest.display(), e),
                ));
            }
        };
        file.write_all(&buf[..n])
            .map_err(|e| Error::extraction(dest, e))?;
        written += n as u64;
    }

    if written != expected {
        return Err(Error::corrupt(
            archive_path,
            format!(
                "{} is truncated ({} of {} bytes)",
                dest.display(),
                written,
                expected
            ),
        ));
    }
    Ok(())
}

/// Give the owner full access to every staged directory so cleanup can
/// delete read-only subtrees
fn make_removable(dir: &Path) {
    let Ok(metadata) = fs::symlink_metadata(dir) else {
        return;
    };
    if !metadata.is_dir() {
        return;
    }
    let mode = metadata.mode() & 0o7777;
    if mode & 0o700 != 0o700 {
        if let Err(e) = fs::set_permissions(dir, fs::Permissions::from_mode(mode | 0o700)) {
            debug!("Cannot make {} removable: {}", dir.display(), e);
        }
    }
    if let Ok(entries) = fs::read_dir(dir) {
        for entry in entries.flatten() {
            make_removable(&entry.path());
        }
    }
}
