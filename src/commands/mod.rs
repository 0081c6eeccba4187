// src/commands/mod.rs
//! Command handlers for the smithy CLI

mod install;
mod root;
mod verify;

pub use install::cmd_install;
pub use root::{cmd_ensure_arch, cmd_list, cmd_root};
pub use verify::cmd_verify;

use anyhow::Result;
use smithy::{layout, ArchTree, ConfigInputs, RootConfig};

/// Inputs gathered from the command line and the environment
pub struct Context {
    pub inputs: ConfigInputs,
    pub arch: Option<String>,
    pub hostname: Option<String>,
}

impl Context {
    pub fn root(&self) -> Result<RootConfig> {
        Ok(self.inputs.resolve()?)
    }

    /// Resolve the root, pick the architecture and make sure its folder exists
    pub fn tree(&self) -> Result<ArchTree> {
        let root = self.root()?;
        let arch = layout::select_arch(
            self.arch.as_deref(),
            self.hostname.as_deref(),
            root.settings(),
        )?;
        Ok(layout::ensure(&root, &arch)?)
    }
}
