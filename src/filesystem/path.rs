// src/filesystem/path.rs

//! Path sanitization for names and archive entries
//!
//! Architecture names, package names and tar entry paths all come from
//! outside the tool. These helpers make sure none of them can place a file
//! outside the tree it belongs to.

use std::path::{Component, Path, PathBuf};
use thiserror::Error;

/// Rejection reasons for untrusted paths
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PathError {
    #[error("path traversal detected: {0}")]
    Traversal(String),

    #[error("contains a path separator: {0}")]
    Separator(String),

    #[error("empty path")]
    Empty,
}

/// Sanitize a relative path from an untrusted source
///
/// - Rejects `..` components
/// - Skips `.` components
/// - Strips leading slashes, so absolute entries land inside the target
/// - Rejects paths that are empty once normalized
///
/// # Examples
///
/// ```
/// use smithy::filesystem::path::sanitize_path;
/// use std::path::PathBuf;
///
/// assert_eq!(sanitize_path("foo-1.0/configure").unwrap(), PathBuf::from("foo-1.0/configure"));
/// assert_eq!(sanitize_path("./foo-1.0/bin").unwrap(), PathBuf::from("foo-1.0/bin"));
/// assert!(sanitize_path("foo-1.0/../../etc/passwd").is_err());
/// ```
pub fn sanitize_path(path: impl AsRef<Path>) -> Result<PathBuf, PathError> {
    let path = path.as_ref();
    let path_str = path.to_string_lossy();
    let relative = path_str.trim_start_matches('/');

    let mut normalized = PathBuf::new();
    for component in Path::new(relative).components() {
        match component {
            Component::Normal(c) => normalized.push(c),
            Component::CurDir => {}
            Component::ParentDir => return Err(PathError::Traversal(path_str.to_string())),
            Component::Prefix(_) | Component::RootDir => {}
        }
    }

    if normalized.as_os_str().is_empty() {
        return Err(PathError::Empty);
    }

    Ok(normalized)
}

/// Validate a single path component such as an architecture or package name
///
/// # Examples
///
/// ```
/// use smithy::filesystem::path::sanitize_filename;
///
/// assert_eq!(sanitize_filename("linux-x86_64").unwrap(), "linux-x86_64");
/// assert!(sanitize_filename("linux/x86_64").is_err());
/// assert!(sanitize_filename("..").is_err());
/// ```
pub fn sanitize_filename(name: &str) -> Result<String, PathError> {
    if name.is_empty() {
        return Err(PathError::Empty);
    }
    if name.contains('/') || name.contains('\\') {
        return Err(PathError::Separator(name.to_string()));
    }
    if name == ".." || name == "." {
        return Err(PathError::Traversal(name.to_string()));
    }
    Ok(name.to_string())
}
