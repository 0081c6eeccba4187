// src/config.rs

//! Software root resolution
//!
//! The active software root comes from, in order of precedence:
//!
//! 1. an explicit override (`--root`)
//! 2. a root supplied by the environment (`SMITHY_ROOT`)
//! 3. the first root-path directive in the config file
//!
//! Resolution is pure: callers collect environment values once, at the CLI
//! boundary, and hand them in through [`ConfigInputs`]. Nothing here creates
//! directories.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::error::{ConfigurationError, Result};

/// Environment variable naming the config file
pub const CONFIG_ENV: &str = "SMITHY_CONFIG";

/// Environment variable overriding the software root directly
pub const ROOT_ENV: &str = "SMITHY_ROOT";

/// Environment variable carrying the host name used for arch selection
pub const HOSTNAME_ENV: &str = "HOSTNAME";

/// Config file name looked up in the home directory
pub const DEFAULT_CONFIG_NAME: &str = ".smithyrc";

/// Keys accepted for the root-path directive
const ROOT_KEYS: &[&str] = &["root_path", "software_root", "software-root"];

/// Keys accepted for the shared file group
const GROUP_KEYS: &[&str] = &["file_group", "file-group-name", "file_group_name"];

/// Where the resolved software root came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RootSource {
    /// Explicit override from the caller
    Override,
    /// Root-path environment variable
    EnvVar,
    /// Root-path directive in the config file
    ConfigFile,
    /// Built directly by library code
    Default,
}

impl fmt::Display for RootSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Override => write!(f, "override"),
            Self::EnvVar => write!(f, "environment ({})", ROOT_ENV),
            Self::ConfigFile => write!(f, "config file"),
            Self::Default => write!(f, "default"),
        }
    }
}

/// Settings parsed from a config file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SmithyConfig {
    /// File the settings were read from
    pub path: Option<PathBuf>,
    /// First root-path directive, made absolute against the file's directory
    pub root_path: Option<PathBuf>,
    /// Group applied to shared-writable trees
    pub file_group: Option<String>,
    /// Architecture used when no host mapping matches
    pub default_arch: Option<String>,
    /// Host name to architecture mapping (`arch.<hostname> = <arch>`)
    pub host_archs: BTreeMap<String, String>,
}

impl SmithyConfig {
    /// Read and parse a config file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|source| ConfigurationError::Unreadable {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content, path)
    }

    /// Parse config file content
    ///
    /// One `key = value` (or `key: value`) directive per line; `#` starts a
    /// comment. Relative root paths are resolved against the directory that
    /// holds `path`.
    pub fn parse(content: &str, path: &Path) -> Result<Self> {
        let mut config = SmithyConfig {
            path: Some(path.to_path_buf()),
            ..Default::default()
        };
        let base_dir = path.parent().unwrap_or(Path::new("/"));

        for (idx, raw) in content.lines().enumerate() {
            let line = raw.trim();
            let malformed = || ConfigurationError::MalformedLine {
                path: path.to_path_buf(),
                line_number: idx + 1,
                line: raw.to_string(),
            };

            // "---" is the document marker left by YAML-style rc files
            if line.is_empty() || line.starts_with('#') || line == "---" {
                continue;
            }

            let sep = line.find(['=', ':']).ok_or_else(malformed)?;
            let key = line[..sep].trim();
            let value = line[sep + 1..].trim().trim_matches('"').trim_matches('\'');
            if key.is_empty() {
                return Err(malformed().into());
            }

            if ROOT_KEYS.contains(&key) {
                if value.is_empty() {
                    return Err(malformed().into());
                }
                if config.root_path.is_some() {
                    debug!("Ignoring additional root directive on line {}", idx + 1);
                    continue;
                }
                let root = Path::new(value);
                config.root_path = Some(if root.is_absolute() {
                    root.to_path_buf()
                } else {
                    base_dir.join(root)
                });
            } else if GROUP_KEYS.contains(&key) {
                if value.is_empty() {
                    return Err(malformed().into());
                }
                config.file_group = Some(value.to_string());
            } else if key == "arch" || key == "default_arch" {
                if value.is_empty() {
                    return Err(malformed().into());
                }
                config.default_arch = Some(value.to_string());
            } else if let Some(host) = key.strip_prefix("arch.") {
                if host.is_empty() || value.is_empty() {
                    return Err(malformed().into());
                }
                config.host_archs.insert(host.to_string(), value.to_string());
            } else {
                debug!("Ignoring unknown config key '{}' on line {}", key, idx + 1);
            }
        }

        Ok(config)
    }

    /// Architecture mapped to `hostname`, if any
    pub fn arch_for_host(&self, hostname: &str) -> Option<&str> {
        self.host_archs.get(hostname).map(String::as_str)
    }
}

/// The resolved software root for one invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RootConfig {
    root_path: PathBuf,
    source: RootSource,
    settings: SmithyConfig,
}

impl RootConfig {
    /// Build a root directly, bypassing resolution
    pub fn new(root_path: impl Into<PathBuf>) -> Self {
        Self {
            root_path: root_path.into(),
            source: RootSource::Default,
            settings: SmithyConfig::default(),
        }
    }

    /// Absolute path of the software root
    pub fn root_path(&self) -> &Path {
        &self.root_path
    }

    pub fn source(&self) -> RootSource {
        self.source
    }

    /// Settings from the config file, empty when none was read
    pub fn settings(&self) -> &SmithyConfig {
        &self.settings
    }
}

/// Everything root resolution may look at, gathered once by the caller
#[derive(Debug, Clone, Default)]
pub struct ConfigInputs {
    pub explicit_root: Option<PathBuf>,
    pub env_root: Option<PathBuf>,
    pub config_file: Option<PathBuf>,
}

impl ConfigInputs {
    /// Config file location: the explicit path if given, else `~/.smithyrc`
    pub fn with_default_config_file(mut self) -> Self {
        if self.config_file.is_none() {
            self.config_file = dirs::home_dir().map(|home| home.join(DEFAULT_CONFIG_NAME));
        }
        self
    }

    pub fn resolve(&self) -> Result<RootConfig> {
        resolve(
            self.explicit_root.as_deref(),
            self.env_root.as_deref(),
            self.config_file.as_deref(),
        )
    }
}

/// Resolve the software root
///
/// The config file, when present, is always parsed so its other settings
/// travel with the root; its root directive is only used when neither an
/// override nor an environment root was given. With an override or an
/// environment root, a broken config file only costs its settings.
pub fn resolve(
    explicit: Option<&Path>,
    env_value: Option<&Path>,
    config_file: Option<&Path>,
) -> Result<RootConfig> {
    let non_empty = |p: Option<&Path>| p.filter(|p| !p.as_os_str().is_empty()).map(Path::to_path_buf);

    let direct = non_empty(explicit)
        .map(|path| (path, RootSource::Override))
        .or_else(|| non_empty(env_value).map(|path| (path, RootSource::EnvVar)));

    let settings = match config_file {
        Some(path) if path.is_file() => {
            debug!("Reading config file {}", path.display());
            match SmithyConfig::load(path) {
                Ok(settings) => settings,
                Err(e) if direct.is_some() => {
                    warn!("Ignoring config file settings: {}", e);
                    SmithyConfig::default()
                }
                Err(e) => return Err(e),
            }
        }
        Some(path) => {
            debug!("No config file at {}", path.display());
            SmithyConfig::default()
        }
        None => SmithyConfig::default(),
    };

    let (root_path, source) = match direct {
        Some(direct) => direct,
        None => match settings.root_path.clone() {
            Some(path) => (path, RootSource::ConfigFile),
            None => return Err(ConfigurationError::NoRootConfigured.into()),
        },
    };

    if !root_path.is_absolute() {
        return Err(ConfigurationError::RelativeRoot(root_path).into());
    }

    debug!("Software root {} (from {})", root_path.display(), source);
    Ok(RootConfig {
        root_path,
        source,
        settings,
    })
}
