// src/main.rs

use anyhow::Result;
use clap::{CommandFactory, Parser};
use smithy::config::ROOT_ENV;
use smithy::ConfigInputs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;

use cli::{Cli, Commands};
use commands::Context;

fn main() -> ExitCode {
    let cli = Cli::parse();

    // RUST_LOG wins; otherwise quiet unless --verbose
    let default_level = if cli.verbose { "smithy=debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {:#}", err);
            ExitCode::from(exit_code(&err))
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    match &cli.command {
        Commands::Root => commands::cmd_root(&context(&cli)?),
        Commands::EnsureArch => commands::cmd_ensure_arch(&context(&cli)?),
        Commands::Install {
            archive,
            policy,
            group,
        } => commands::cmd_install(&context(&cli)?, archive, *policy, group.as_deref()),
        Commands::List => commands::cmd_list(&context(&cli)?),
        Commands::Verify {
            paths,
            policy,
            executable,
            group,
            format,
        } => commands::cmd_verify(paths, *policy, *executable, group.as_deref(), format),
        Commands::Completions { shell } => {
            clap_complete::generate(*shell, &mut Cli::command(), "smithy", &mut std::io::stdout());
            Ok(())
        }
    }
}

/// Gather the ambient inputs once; the library never reads the environment
fn context(cli: &Cli) -> Result<Context> {
    let explicit_root = match &cli.root {
        Some(path) => Some(absolute(path)?),
        None => None,
    };
    let env_root = std::env::var_os(ROOT_ENV).map(PathBuf::from);

    let inputs = ConfigInputs {
        explicit_root,
        env_root,
        config_file: cli.config_file.clone(),
    }
    .with_default_config_file();

    Ok(Context {
        inputs,
        arch: cli.arch.clone(),
        hostname: cli.hostname.clone(),
    })
}

/// A relative `--root` is taken relative to the working directory
fn absolute(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}

fn exit_code(err: &anyhow::Error) -> u8 {
    err.chain()
        .find_map(|cause| cause.downcast_ref::<smithy::Error>())
        .map(|e| e.exit_code() as u8)
        .unwrap_or(1)
}
