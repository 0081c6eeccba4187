// src/archive/format.rs

//! Archive format detection
//!
//! Formats are recognized by file suffix only. A `.tar.gz` whose content is
//! not gzip surfaces later as a corrupt archive, not as a format error.

use flate2::read::GzDecoder;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use crate::error::{Error, Result};

/// Supported archive formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    /// Uncompressed tar (`.tar`)
    Tar,
    /// Gzip-compressed tar (`.tar.gz`, `.tgz`)
    TarGz,
}

impl ArchiveFormat {
    /// Suffixes in match order, longest first
    const SUFFIXES: &'static [(&'static str, ArchiveFormat)] = &[
        (".tar.gz", ArchiveFormat::TarGz),
        (".tgz", ArchiveFormat::TarGz),
        (".tar", ArchiveFormat::Tar),
    ];

    /// Detect the format from the archive's file name
    ///
    /// # Examples
    /// ```
    /// use smithy::archive::ArchiveFormat;
    /// use std::path::Path;
    ///
    /// assert_eq!(ArchiveFormat::from_path(Path::new("foo-1.0.tar.gz")).unwrap(), ArchiveFormat::TarGz);
    /// assert_eq!(ArchiveFormat::from_path(Path::new("foo-1.0.tar")).unwrap(), ArchiveFormat::Tar);
    /// assert!(ArchiveFormat::from_path(Path::new("foo-1.0.zip")).is_err());
    /// ```
    pub fn from_path(path: &Path) -> Result<Self> {
        Self::split_name(path).map(|(_, format)| format)
    }

    /// Package name implied by the archive: the base name without its suffix
    ///
    /// # Examples
    /// ```
    /// use smithy::archive::ArchiveFormat;
    /// use std::path::Path;
    ///
    /// assert_eq!(ArchiveFormat::package_name(Path::new("/tmp/foo-1.0.tar.gz")).unwrap(), "foo-1.0");
    /// ```
    pub fn package_name(path: &Path) -> Result<String> {
        Self::split_name(path).map(|(name, _)| name)
    }

    fn split_name(path: &Path) -> Result<(String, Self)> {
        let unsupported = || Error::UnsupportedArchiveFormat(path.to_path_buf());
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(unsupported)?;

        for (suffix, format) in Self::SUFFIXES {
            if let Some(stem) = file_name.strip_suffix(suffix) {
                if stem.is_empty() {
                    return Err(unsupported());
                }
                return Ok((stem.to_string(), *format));
            }
        }
        Err(unsupported())
    }

    /// Open the archive and wrap it in the matching decoder
    pub fn open(&self, path: &Path) -> Result<Box<dyn Read>> {
        let file = BufReader::new(File::open(path)?);
        Ok(match self {
            Self::Tar => Box::new(file),
            Self::TarGz => Box::new(GzDecoder::new(file)),
        })
    }

    /// Human-readable name
    pub fn name(&self) -> &'static str {
        match self {
            Self::Tar => "tar",
            Self::TarGz => "tar+gzip",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_format() {
        assert_eq!(
            ArchiveFormat::from_path(Path::new("foo-1.0.tgz")).unwrap(),
            ArchiveFormat::TarGz
        );
        assert_eq!(
            ArchiveFormat::from_path(Path::new("/srv/archives/foo-1.0.tar")).unwrap(),
            ArchiveFormat::Tar
        );
    }

    #[test]
    fn test_unsupported_formats() {
        for name in ["foo-1.0.zip", "foo-1.0.tar.xz", "foo-1.0.tar.bz2", "foo", ".tar.gz", ".tar"] {
            let err = ArchiveFormat::from_path(Path::new(name)).unwrap_err();
            assert!(
                matches!(err, Error::UnsupportedArchiveFormat(_)),
                "{name} should be unsupported"
            );
        }
    }

    #[test]
    fn test_package_name_strips_suffix() {
        assert_eq!(
            ArchiveFormat::package_name(Path::new("foo-1.0.tar.gz")).unwrap(),
            "foo-1.0"
        );
        assert_eq!(
            ArchiveFormat::package_name(Path::new("bar-2.1.1.tgz")).unwrap(),
            "bar-2.1.1"
        );
        assert_eq!(
            ArchiveFormat::package_name(Path::new("openmpi-4.1.tar")).unwrap(),
            "openmpi-4.1"
        );
    }

    #[test]
    fn test_open_missing_file() {
        let err = ArchiveFormat::Tar
            .open(Path::new("/nonexistent/smithy/foo.tar"))
            .err().unwrap();
        assert!(matches!(err, Error::Filesystem(_)));
    }
}
