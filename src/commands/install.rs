// src/commands/install.rs
//! Package install command

use super::Context;
use anyhow::{Context as _, Result};
use smithy::{archive, PermissionPolicy, PolicyKind};
use std::path::Path;

/// Install an archive and apply the permission policy to what it produced
pub fn cmd_install(
    ctx: &Context,
    archive_path: &Path,
    policy: PolicyKind,
    group: Option<&str>,
) -> Result<()> {
    let tree = ctx.tree()?;
    let group = group.or(tree.root().settings().file_group.as_deref());

    // Resolve the group before touching the tree so a typo costs nothing
    let policy = PermissionPolicy::for_tree(policy, &tree, group)?;

    let report = archive::install(archive_path, &tree)?;
    policy.apply(&report.artifacts).with_context(|| {
        format!(
            "Installed {} but could not apply the {} policy",
            report.package_path.display(),
            policy.kind()
        )
    })?;

    println!(
        "Installed {} into {} ({} entries, {})",
        report.package_name,
        report.package_path.display(),
        report.artifacts.len(),
        policy.kind()
    );
    for artifact in &report.artifacts {
        let rel = artifact
            .dest_path
            .strip_prefix(&report.package_path)
            .unwrap_or(&artifact.dest_path);
        println!("  {:<9} {}", format!("{:?}", artifact.kind).to_lowercase(), rel.display());
    }

    Ok(())
}
