// src/lib.rs

//! Smithy software root manager
//!
//! Manages a software root: a directory tree with one folder per machine
//! architecture and one folder per installed package version beneath it.
//!
//! # Architecture
//!
//! - `config`: resolves the software root from an override, the environment
//!   or a config file into a single [`RootConfig`]
//! - `layout`: creates `<root>/<arch>` idempotently ([`ArchTree`])
//! - `archive`: unpacks `.tar`/`.tar.gz` packages into `<root>/<arch>/<pkg>`
//!   all-or-nothing
//! - `permissions`: applies and verifies group-writable or read-only policy
//!
//! ```no_run
//! use smithy::{archive, layout, ConfigInputs, PermissionPolicy, PolicyKind};
//! use std::path::Path;
//!
//! # fn main() -> smithy::Result<()> {
//! let root = ConfigInputs {
//!     explicit_root: Some("/sw".into()),
//!     ..Default::default()
//! }
//! .resolve()?;
//! let tree = layout::ensure(&root, "linux-x86_64")?;
//! let report = archive::install(Path::new("foo-1.0.tar.gz"), &tree)?;
//! PermissionPolicy::for_tree(PolicyKind::SharedWritable, &tree, None)?.apply(&report.artifacts)?;
//! # Ok(())
//! # }
//! ```

pub mod archive;
pub mod config;
mod error;
pub mod filesystem;
pub mod layout;
pub mod permissions;

pub use archive::{ArchiveFormat, ArtifactKind, InstallReport, InstalledArtifact};
pub use config::{ConfigInputs, RootConfig, RootSource, SmithyConfig};
pub use error::{ConfigurationError, Error, Result};
pub use layout::ArchTree;
pub use permissions::{FileMode, PermissionPolicy, PermissionReport, PolicyKind};
