// src/layout.rs

//! Architecture folders under the software root
//!
//! Every package lives at `<root>/<arch>/<package>`. This module owns the
//! first two levels: it validates architecture names, creates the folders on
//! demand, and hands out package paths.

use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::config::{RootConfig, SmithyConfig};
use crate::error::{ConfigurationError, Error, Result};
use crate::filesystem::sanitize_filename;

/// An architecture folder inside a software root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchTree {
    root: RootConfig,
    arch_name: String,
    arch_path: PathBuf,
}

impl ArchTree {
    pub fn root(&self) -> &RootConfig {
        &self.root
    }

    pub fn arch_name(&self) -> &str {
        &self.arch_name
    }

    /// `<root>/<arch>`, always a direct child of the root
    pub fn arch_path(&self) -> &Path {
        &self.arch_path
    }

    /// Canonical location of a package inside this tree
    pub fn package_path(&self, package: &str) -> Result<PathBuf> {
        let name = sanitize_filename(package).map_err(|e| Error::ExtractionFailed {
            path: self.arch_path.join(package),
            reason: format!("invalid package name: {}", e),
        })?;
        Ok(self.arch_path.join(name))
    }

    /// Installed package directories, sorted by name
    ///
    /// Hidden entries (staging directories of in-flight installs) are skipped.
    pub fn packages(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.arch_path)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().to_string();
            if name.starts_with('.') || !entry.file_type()?.is_dir() {
                continue;
            }
            names.push(name);
        }
        names.sort();
        Ok(names)
    }
}

/// Check an architecture name without touching the filesystem
///
/// Names must be a single path component. Hidden names are reserved for
/// staging directories.
pub fn validate_arch_name(arch_name: &str) -> Result<()> {
    let invalid = |reason: String| Error::InvalidArchName {
        name: arch_name.to_string(),
        reason,
    };
    sanitize_filename(arch_name).map_err(|e| invalid(e.to_string()))?;
    if arch_name.starts_with('.') {
        return Err(invalid("hidden names are reserved".to_string()));
    }
    if arch_name.contains('\0') {
        return Err(invalid("contains a NUL byte".to_string()));
    }
    Ok(())
}

/// Make sure `<root>/<arch>` exists and return its tree
///
/// Creates the root and the architecture folder when missing. Calling it
/// again with the same arguments returns an equal tree and changes nothing.
pub fn ensure(root: &RootConfig, arch_name: &str) -> Result<ArchTree> {
    validate_arch_name(arch_name)?;

    let root_path = root.root_path();
    if !root_path.is_dir() {
        fs::create_dir_all(root_path)?;
        info!("Created software root {}", root_path.display());
    }

    let arch_path = root_path.join(arch_name);
    match fs::create_dir(&arch_path) {
        Ok(()) => info!("Created architecture folder {}", arch_path.display()),
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists && arch_path.is_dir() => {
            debug!("Architecture folder {} already exists", arch_path.display());
        }
        Err(e) => return Err(e.into()),
    }

    Ok(ArchTree {
        root: root.clone(),
        arch_name: arch_name.to_string(),
        arch_path,
    })
}

/// Pick the architecture for this invocation
///
/// An explicit name wins, then the config's mapping for `hostname`, then the
/// config's default architecture.
pub fn select_arch(
    explicit: Option<&str>,
    hostname: Option<&str>,
    config: &SmithyConfig,
) -> Result<String> {
    let arch = explicit
        .filter(|a| !a.is_empty())
        .or_else(|| hostname.and_then(|h| config.arch_for_host(h)))
        .or(config.default_arch.as_deref())
        .ok_or(ConfigurationError::NoArchitecture)?;

    validate_arch_name(arch)?;
    Ok(arch.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_ensure_creates_root_and_arch() {
        let temp_dir = TempDir::new().unwrap();
        let root = RootConfig::new(temp_dir.path().join("swroot"));

        let tree = ensure(&root, "linux-x86_64").unwrap();
        assert_eq!(tree.arch_path(), temp_dir.path().join("swroot/linux-x86_64"));
        assert!(tree.arch_path().is_dir());
        assert_eq!(tree.arch_path().parent(), Some(root.root_path()));
    }

    #[test]
    fn test_ensure_is_idempotent() {
        let temp_dir = TempDir::new().unwrap();
        let root = RootConfig::new(temp_dir.path());

        let first = ensure(&root, "linux-x86_64").unwrap();
        fs::write(first.arch_path().join("marker"), b"keep me").unwrap();

        let second = ensure(&root, "linux-x86_64").unwrap();
        assert_eq!(first, second);
        assert_eq!(
            fs::read(second.arch_path().join("marker")).unwrap(),
            b"keep me"
        );
    }

    #[test]
    fn test_ensure_rejects_bad_arch_names() {
        let temp_dir = TempDir::new().unwrap();
        let root = RootConfig::new(temp_dir.path());

        for name in ["", "linux/x86_64", "..", ".", "a\\b", ".hidden"] {
            let err = ensure(&root, name).unwrap_err();
            assert!(
                matches!(err, Error::InvalidArchName { .. }),
                "{name:?} should be rejected"
            );
        }
        // Nothing was created for the rejected names
        assert_eq!(fs::read_dir(temp_dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_ensure_fails_when_arch_is_a_file() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("linux-x86_64"), b"").unwrap();
        let root = RootConfig::new(temp_dir.path());

        assert!(matches!(
            ensure(&root, "linux-x86_64"),
            Err(Error::Filesystem(_))
        ));
    }

    #[test]
    fn test_package_path_and_listing() {
        let temp_dir = TempDir::new().unwrap();
        let root = RootConfig::new(temp_dir.path());
        let tree = ensure(&root, "linux-x86_64").unwrap();

        let foo = tree.package_path("foo-1.0").unwrap();
        assert_eq!(foo, tree.arch_path().join("foo-1.0"));
        assert!(tree.package_path("../escape").is_err());

        fs::create_dir(&foo).unwrap();
        fs::create_dir(tree.arch_path().join("bar-2.1")).unwrap();
        fs::create_dir(tree.arch_path().join(".smithy-staging")).unwrap();
        fs::write(tree.arch_path().join("README"), b"").unwrap();

        assert_eq!(tree.packages().unwrap(), vec!["bar-2.1", "foo-1.0"]);
    }

    #[test]
    fn test_select_arch_precedence() {
        let mut config = SmithyConfig {
            default_arch: Some("linux-x86_64".to_string()),
            ..Default::default()
        };
        config
            .host_archs
            .insert("titan-login1".to_string(), "xk6".to_string());

        assert_eq!(
            select_arch(Some("sles11"), Some("titan-login1"), &config).unwrap(),
            "sles11"
        );
        assert_eq!(
            select_arch(None, Some("titan-login1"), &config).unwrap(),
            "xk6"
        );
        assert_eq!(
            select_arch(None, Some("elsewhere"), &config).unwrap(),
            "linux-x86_64"
        );
        assert!(matches!(
            select_arch(None, None, &SmithyConfig::default()),
            Err(Error::Configuration(ConfigurationError::NoArchitecture))
        ));
        assert!(matches!(
            select_arch(Some("a/b"), None, &config),
            Err(Error::InvalidArchName { .. })
        ));
    }
}
