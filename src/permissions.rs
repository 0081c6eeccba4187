// src/permissions.rs

//! Permission and group policy for installed trees
//!
//! Two policies exist. `SharedWritable` trees are maintained by a team, so
//! the owning group can modify everything and new directories keep the
//! tree's group. `PublishedReadOnly` trees are frozen: the group may read and
//! execute but not write.
//!
//! [`PermissionPolicy::apply`] changes mode bits and group ownership of
//! installed entries; [`PermissionPolicy::validate`] and the free functions
//! below only read metadata back.

use nix::sys::stat::Mode;
use nix::unistd::{Gid, Group};
use serde::{Serialize, Serializer};
use std::fmt;
use std::fs;
use std::os::unix::fs::{MetadataExt, PermissionsExt, chown};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, info};

use crate::archive::{ArtifactKind, InstalledArtifact};
use crate::error::{Error, Result};
use crate::layout::ArchTree;

/// POSIX permission bits (`0o7777`), without the file type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileMode(Mode);

impl FileMode {
    /// Build from raw `st_mode`; file type bits are dropped
    pub fn from_raw(raw: u32) -> Self {
        Self(Mode::from_bits_truncate((raw & 0o7777) as nix::libc::mode_t))
    }

    pub fn bits(&self) -> u32 {
        self.0.bits() as u32
    }

    /// Octal digit for the group class (the `6` in `0664`)
    pub fn group_digit(&self) -> u32 {
        (self.bits() >> 3) & 0o7
    }

    /// Group may read and write (group digit 6 or 7)
    pub fn is_group_writable(&self) -> bool {
        self.0.contains(Mode::S_IRGRP | Mode::S_IWGRP)
    }

    /// Group may read but not write (group digit 4 or 5)
    pub fn is_group_read_only(&self) -> bool {
        self.0.contains(Mode::S_IRGRP) && !self.0.contains(Mode::S_IWGRP)
    }

    /// Owner, group or other has an execute bit
    pub fn is_executable_by_any(&self) -> bool {
        self.0
            .intersects(Mode::S_IXUSR | Mode::S_IXGRP | Mode::S_IXOTH)
    }

    pub fn with(self, bits: Mode) -> Self {
        Self(self.0 | bits)
    }

    pub fn without(self, bits: Mode) -> Self {
        Self(self.0.difference(bits))
    }

    /// Owner execute mirrored onto the group
    fn with_group_exec_from_owner(self) -> Self {
        if self.0.contains(Mode::S_IXUSR) {
            self.with(Mode::S_IXGRP)
        } else {
            self
        }
    }
}

impl fmt::Display for FileMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04o}", self.bits())
    }
}

impl Serialize for FileMode {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Distribution policy for a tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum PolicyKind {
    /// Group read/write on files, group rwx + setgid on directories
    SharedWritable,
    /// Group read-only on files and directories
    PublishedReadOnly,
}

impl PolicyKind {
    /// Mode a regular file should end up with
    pub fn file_mode(&self, mode: FileMode) -> FileMode {
        match self {
            Self::SharedWritable => mode
                .with(Mode::S_IRGRP | Mode::S_IWGRP)
                .with_group_exec_from_owner(),
            Self::PublishedReadOnly => mode
                .with(Mode::S_IRGRP)
                .without(Mode::S_IWGRP | Mode::S_IWOTH)
                .with_group_exec_from_owner(),
        }
    }

    /// Mode a directory should end up with
    pub fn dir_mode(&self, mode: FileMode) -> FileMode {
        match self {
            Self::SharedWritable => mode.with(Mode::S_IRWXG | Mode::S_ISGID),
            Self::PublishedReadOnly => mode
                .with(Mode::S_IRGRP | Mode::S_IXGRP)
                .without(Mode::S_IWGRP | Mode::S_IWOTH),
        }
    }

    /// Whether `mode` satisfies this policy
    pub fn accepts(&self, mode: FileMode) -> bool {
        match self {
            Self::SharedWritable => mode.is_group_writable(),
            Self::PublishedReadOnly => mode.is_group_read_only(),
        }
    }
}

impl fmt::Display for PolicyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SharedWritable => write!(f, "shared-writable"),
            Self::PublishedReadOnly => write!(f, "published-read-only"),
        }
    }
}

impl FromStr for PolicyKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "shared" | "shared-writable" | "group-writable" => Ok(Self::SharedWritable),
            "published" | "published-read-only" | "read-only" => Ok(Self::PublishedReadOnly),
            other => Err(format!(
                "unknown policy '{}' (expected 'shared' or 'published')",
                other
            )),
        }
    }
}

/// What kind of filesystem entry a report describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Directory,
    Symlink,
    Other,
}

impl EntryKind {
    fn of(file_type: fs::FileType) -> Self {
        if file_type.is_symlink() {
            Self::Symlink
        } else if file_type.is_dir() {
            Self::Directory
        } else if file_type.is_file() {
            Self::File
        } else {
            Self::Other
        }
    }
}

/// Pass/fail result of validating one path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Outcome {
    Pass,
    Fail,
}

/// Metadata read back from a path and judged against a policy
#[derive(Debug, Clone, Serialize)]
pub struct PermissionReport {
    pub path: PathBuf,
    pub kind: EntryKind,
    pub mode: FileMode,
    pub group: String,
    pub policy: PolicyKind,
    pub outcome: Outcome,
    pub reasons: Vec<String>,
}

impl PermissionReport {
    pub fn passed(&self) -> bool {
        self.outcome == Outcome::Pass
    }

    /// Turn a failed report into [`Error::PolicyViolation`]
    pub fn into_result(self) -> Result<Self> {
        if self.passed() {
            Ok(self)
        } else {
            Err(Error::PolicyViolation {
                path: self.path,
                policy: self.policy,
                reasons: self.reasons.join("; "),
            })
        }
    }
}

/// A policy plus the group it should enforce
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PermissionPolicy {
    kind: PolicyKind,
    group: Option<Gid>,
}

impl PermissionPolicy {
    /// Policy that leaves group ownership alone
    pub fn new(kind: PolicyKind) -> Self {
        Self { kind, group: None }
    }

    /// Policy that also enforces the named group
    pub fn with_group_name(kind: PolicyKind, group: &str) -> Result<Self> {
        Ok(Self {
            kind,
            group: Some(lookup_group(group)?),
        })
    }

    /// Policy for installs into `tree`
    ///
    /// A configured group always wins. Without one, shared trees enforce the
    /// group that owns the architecture folder; published trees leave groups
    /// as extracted.
    pub fn for_tree(kind: PolicyKind, tree: &ArchTree, group: Option<&str>) -> Result<Self> {
        if let Some(name) = group {
            return Self::with_group_name(kind, name);
        }
        let group = match kind {
            PolicyKind::SharedWritable => {
                Some(Gid::from_raw(fs::metadata(tree.arch_path())?.gid()))
            }
            PolicyKind::PublishedReadOnly => None,
        };
        Ok(Self { kind, group })
    }

    pub fn kind(&self) -> PolicyKind {
        self.kind
    }

    pub fn group(&self) -> Option<Gid> {
        self.group
    }

    /// Apply mode bits and group ownership to installed artifacts
    ///
    /// Symlinks are left alone; everything else is chgrp'd first (a chown
    /// may clear set-id bits) and then chmod'ed.
    pub fn apply(&self, artifacts: &[InstalledArtifact]) -> Result<()> {
        let mut changed = 0usize;

        for artifact in artifacts {
            if artifact.kind == ArtifactKind::Symlink {
                debug!("Skipping symlink {}", artifact.dest_path.display());
                continue;
            }
            if self.apply_path(&artifact.dest_path, artifact.kind)? {
                changed += 1;
            }
        }

        info!(
            "Applied {} policy to {} of {} entries",
            self.kind,
            changed,
            artifacts.len()
        );
        Ok(())
    }

    fn apply_path(&self, path: &Path, kind: ArtifactKind) -> Result<bool> {
        let metadata = fs::symlink_metadata(path)?;
        let mut changed = false;

        if let Some(gid) = self.group {
            if metadata.gid() != gid.as_raw() {
                chown(path, None, Some(gid.as_raw()))
                    .map_err(|e| Error::permission(path, format!("chgrp to {}: {}", gid, e)))?;
                changed = true;
            }
        }

        // Re-read: chgrp may have dropped set-id bits
        let current = FileMode::from_raw(fs::symlink_metadata(path)?.mode());
        let wanted = match kind {
            ArtifactKind::Directory => self.kind.dir_mode(current),
            _ => self.kind.file_mode(current),
        };

        if wanted != current {
            fs::set_permissions(path, fs::Permissions::from_mode(wanted.bits()))
                .map_err(|e| Error::permission(path, format!("chmod {}: {}", wanted, e)))?;
            debug!("{}: {} -> {}", path.display(), current, wanted);
            changed = true;
        }

        Ok(changed)
    }

    /// Re-read a path and judge it against this policy
    pub fn validate(&self, path: &Path) -> Result<PermissionReport> {
        let metadata = fs::symlink_metadata(path)?;
        let kind = EntryKind::of(metadata.file_type());
        let mode = FileMode::from_raw(metadata.mode());
        let mut reasons = Vec::new();

        if kind != EntryKind::Symlink {
            if !self.kind.accepts(mode) {
                let expected = match self.kind {
                    PolicyKind::SharedWritable => "group writable",
                    PolicyKind::PublishedReadOnly => "group read-only",
                };
                reasons.push(format!(
                    "mode {} is not {} (group digit {})",
                    mode,
                    expected,
                    mode.group_digit()
                ));
            }
            if let Some(gid) = self.group {
                if metadata.gid() != gid.as_raw() {
                    reasons.push(format!(
                        "group is {}, expected {}",
                        group_name_for_gid(metadata.gid()),
                        group_name_for_gid(gid.as_raw())
                    ));
                }
            }
        }

        Ok(PermissionReport {
            path: path.to_path_buf(),
            kind,
            mode,
            group: group_name_for_gid(metadata.gid()),
            policy: self.kind,
            outcome: if reasons.is_empty() {
                Outcome::Pass
            } else {
                Outcome::Fail
            },
            reasons,
        })
    }
}

/// Validate `path` against a policy's mode rules, ignoring group ownership
pub fn validate(path: &Path, kind: PolicyKind) -> Result<PermissionReport> {
    PermissionPolicy::new(kind).validate(path)
}

/// Resolve a group name to its id
pub fn lookup_group(name: &str) -> Result<Gid> {
    match Group::from_name(name) {
        Ok(Some(group)) => Ok(group.gid),
        Ok(None) => Err(Error::permission(name, "no such group")),
        Err(e) => Err(Error::permission(name, format!("group lookup failed: {}", e))),
    }
}

/// Name of a group id, or the number when the group database has no entry
pub fn group_name_for_gid(gid: u32) -> String {
    match Group::from_gid(Gid::from_raw(gid)) {
        Ok(Some(group)) => group.name,
        _ => gid.to_string(),
    }
}

/// Group name of the file at `path` (follows symlinks)
pub fn group_name(path: &Path) -> Result<String> {
    Ok(group_name_for_gid(fs::metadata(path)?.gid()))
}

/// Whether `path` itself is a symlink
pub fn is_symlink(path: &Path) -> bool {
    fs::symlink_metadata(path)
        .map(|m| m.file_type().is_symlink())
        .unwrap_or(false)
}

/// Require at least one execute bit on the file at `path`
pub fn check_executable(path: &Path) -> Result<()> {
    let mode = FileMode::from_raw(fs::metadata(path)?.mode());
    if mode.is_executable_by_any() {
        Ok(())
    } else {
        Err(Error::NotExecutable(path.to_path_buf()))
    }
}
