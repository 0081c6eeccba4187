// src/cli/mod.rs
//! CLI definitions for smithy
//!
//! Argument parsing only; the handlers live in the `commands` module.

use clap::{Parser, Subcommand};
use clap_complete::Shell;
use smithy::config::{CONFIG_ENV, HOSTNAME_ENV};
use smithy::PolicyKind;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "smithy")]
#[command(author = "Smithy Contributors")]
#[command(version)]
#[command(about = "Manage architecture-scoped software trees", long_about = None)]
pub struct Cli {
    /// Software root (overrides SMITHY_ROOT and the config file)
    #[arg(short, long, global = true)]
    pub root: Option<PathBuf>,

    /// Config file location (default: ~/.smithyrc)
    #[arg(short, long, global = true, env = CONFIG_ENV)]
    pub config_file: Option<PathBuf>,

    /// Architecture folder to operate on
    #[arg(short, long, global = true)]
    pub arch: Option<String>,

    /// Host name used to look up the architecture in the config file
    #[arg(long, global = true, env = HOSTNAME_ENV, hide_env_values = true)]
    pub hostname: Option<String>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show the resolved software root and where it came from
    Root,

    /// Create the architecture folder under the software root
    EnsureArch,

    /// Install a package tarball (.tar, .tar.gz, .tgz) into the architecture folder
    Install {
        /// Path to the archive
        archive: PathBuf,

        /// Permission policy: shared or published
        #[arg(short, long, default_value = "shared")]
        policy: PolicyKind,

        /// Group to own installed files (default: file_group from the config)
        #[arg(short, long)]
        group: Option<String>,
    },

    /// List packages installed in the architecture folder
    List,

    /// Check paths against a permission policy
    Verify {
        /// Paths to check
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Permission policy: shared or published
        #[arg(short, long, default_value = "shared")]
        policy: PolicyKind,

        /// Also require at least one execute bit
        #[arg(short = 'x', long)]
        executable: bool,

        /// Require this owning group
        #[arg(short, long)]
        group: Option<String>,

        /// Output format: text, json
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}
