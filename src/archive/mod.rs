// src/archive/mod.rs

//! Package archive installation
//!
//! Tarballs (optionally gzip-compressed) are unpacked into
//! `<root>/<arch>/<package>/`. Each install is all-or-nothing: entries are
//! written into a hidden staging directory beside the destination and the
//! finished tree is renamed into place.

mod format;
mod installer;

use serde::Serialize;
use std::path::PathBuf;

use crate::permissions::FileMode;

pub use format::ArchiveFormat;
pub use installer::install;

/// What an archive entry became on disk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    File,
    Directory,
    Symlink,
    HardLink,
}

/// One filesystem entry produced by an install
#[derive(Debug, Clone, Serialize)]
pub struct InstalledArtifact {
    /// Archive the entry came from
    pub source_archive: PathBuf,
    /// Final location under the architecture folder
    pub dest_path: PathBuf,
    /// Permission bits as extracted
    pub mode: FileMode,
    /// Group that owns the entry
    pub group_owner: String,
    pub is_symlink: bool,
    pub kind: ArtifactKind,
}

/// Result of installing one archive
#[derive(Debug, Clone, Serialize)]
pub struct InstallReport {
    pub package_name: String,
    pub package_path: PathBuf,
    /// One record per archive entry, in archive order
    pub artifacts: Vec<InstalledArtifact>,
}

impl InstallReport {
    /// Regular files (including hard links) among the artifacts
    pub fn regular_files(&self) -> impl Iterator<Item = &InstalledArtifact> {
        self.artifacts
            .iter()
            .filter(|a| matches!(a.kind, ArtifactKind::File | ArtifactKind::HardLink))
    }
}
