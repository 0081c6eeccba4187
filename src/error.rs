// src/error.rs

//! Error types for smithy
//!
//! Every failure the core can produce is a variant of [`Error`]. The CLI
//! boundary maps each variant to its own exit status via [`Error::exit_code`].

use std::io;
use std::path::PathBuf;
use thiserror::Error;

use crate::permissions::PolicyKind;

/// Result type used throughout the library
pub type Result<T> = std::result::Result<T, Error>;

/// Failures while resolving the software root or reading the config file
#[derive(Error, Debug)]
pub enum ConfigurationError {
    #[error(
        "No software root configured (pass --root, set SMITHY_ROOT, or add a root_path line to the config file)"
    )]
    NoRootConfigured,

    #[error("Malformed line {line_number} in {}: {line:?}", path.display())]
    MalformedLine {
        path: PathBuf,
        line_number: usize,
        line: String,
    },

    #[error("Software root must be an absolute path: {}", .0.display())]
    RelativeRoot(PathBuf),

    #[error("No architecture selected (pass --arch, or add an arch line to the config file)")]
    NoArchitecture,

    #[error("Failed to read config file {}: {source}", path.display())]
    Unreadable { path: PathBuf, source: io::Error },
}

/// Top-level error type for smithy
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("Invalid architecture name {name:?}: {reason}")]
    InvalidArchName { name: String, reason: String },

    #[error("Unsupported archive format: {} (expected .tar, .tar.gz or .tgz)", .0.display())]
    UnsupportedArchiveFormat(PathBuf),

    #[error("Archive {} is corrupt: {reason}", path.display())]
    ArchiveCorrupt { path: PathBuf, reason: String },

    #[error("Extraction of {} failed: {reason}", path.display())]
    ExtractionFailed { path: PathBuf, reason: String },

    #[error("Failed to apply permissions to {}: {reason}", path.display())]
    Permission { path: PathBuf, reason: String },

    #[error("{} is not executable", .0.display())]
    NotExecutable(PathBuf),

    #[error("{} violates the {policy} policy: {reasons}", path.display())]
    PolicyViolation {
        path: PathBuf,
        policy: PolicyKind,
        reasons: String,
    },

    #[error("Filesystem error: {0}")]
    Filesystem(#[from] io::Error),
}

impl Error {
    /// Process exit status for this error. Zero is reserved for success and
    /// one for errors that never reached the library.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Configuration(_) => 2,
            Self::InvalidArchName { .. } => 3,
            Self::UnsupportedArchiveFormat(_) => 4,
            Self::ArchiveCorrupt { .. } => 5,
            Self::ExtractionFailed { .. } => 6,
            Self::Permission { .. } => 7,
            Self::NotExecutable(_) => 8,
            Self::Filesystem(_) => 9,
            Self::PolicyViolation { .. } => 10,
        }
    }

    pub(crate) fn corrupt(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::ArchiveCorrupt {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn extraction(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::ExtractionFailed {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn permission(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::Permission {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}
