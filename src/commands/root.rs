// src/commands/root.rs

//! Software root inspection commands

use super::Context;
use anyhow::Result;

/// Show the resolved software root and the settings that came with it
pub fn cmd_root(ctx: &Context) -> Result<()> {
    let root = ctx.root()?;
    let settings = root.settings();

    println!("Software root: {}", root.root_path().display());
    println!("Source: {}", root.source());
    if let Some(path) = &settings.path {
        println!("Config file: {}", path.display());
    }
    if let Some(group) = &settings.file_group {
        println!("File group: {}", group);
    }
    if let Some(arch) = &settings.default_arch {
        println!("Default architecture: {}", arch);
    }
    for (host, arch) in &settings.host_archs {
        println!("  {} -> {}", host, arch);
    }

    Ok(())
}

/// Create `<root>/<arch>` if needed and print its path
pub fn cmd_ensure_arch(ctx: &Context) -> Result<()> {
    let tree = ctx.tree()?;
    println!("{}", tree.arch_path().display());
    Ok(())
}

/// List package folders under the architecture folder
pub fn cmd_list(ctx: &Context) -> Result<()> {
    let tree = ctx.tree()?;
    let packages = tree.packages()?;

    if packages.is_empty() {
        println!("No packages installed in {}", tree.arch_path().display());
        return Ok(());
    }

    println!("Packages in {}:", tree.arch_path().display());
    for package in &packages {
        println!("  {}", package);
    }
    println!("\nTotal: {} package(s)", packages.len());

    Ok(())
}
