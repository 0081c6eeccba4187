// src/commands/verify.rs

//! Permission verification command
//!
//! Reports every path before failing so one run shows all problems. The
//! exit status follows the first failure: a missing execute bit outranks a
//! policy violation.

use anyhow::Result;
use serde::Serialize;
use smithy::permissions;
use smithy::{Error, PermissionPolicy, PermissionReport, PolicyKind};
use std::path::{Path, PathBuf};

#[derive(Serialize)]
struct VerifyEntry {
    #[serde(flatten)]
    report: PermissionReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    executable: Option<bool>,
}

/// Check each path against `policy` (and optionally the execute bit)
pub fn cmd_verify(
    paths: &[PathBuf],
    policy: PolicyKind,
    executable: bool,
    group: Option<&str>,
    format: &str,
) -> Result<()> {
    if format != "text" && format != "json" {
        anyhow::bail!("Unknown output format '{}' (expected text or json)", format);
    }

    let policy = match group {
        Some(name) => PermissionPolicy::with_group_name(policy, name)?,
        None => PermissionPolicy::new(policy),
    };

    let mut entries = Vec::with_capacity(paths.len());
    for path in paths {
        let report = policy.validate(path)?;
        // Follows symlinks: a link is only as executable as its target
        let executable = executable.then(|| permissions::check_executable(path).is_ok());
        entries.push(VerifyEntry { report, executable });
    }

    if format == "json" {
        println!("{}", serde_json::to_string_pretty(&entries)?);
    } else {
        for entry in &entries {
            print_entry(entry);
        }
    }

    if let Some(path) = first_not_executable(&entries) {
        return Err(Error::NotExecutable(path.to_path_buf()).into());
    }
    if let Some(entry) = entries.into_iter().find(|e| !e.report.passed()) {
        entry.report.into_result()?;
    }

    Ok(())
}

fn first_not_executable(entries: &[VerifyEntry]) -> Option<&Path> {
    entries
        .iter()
        .find(|e| e.executable == Some(false))
        .map(|e| e.report.path.as_path())
}

fn print_entry(entry: &VerifyEntry) {
    let report = &entry.report;
    let status = match (report.passed(), entry.executable) {
        (true, Some(false)) => "FAIL",
        (true, _) => "PASS",
        (false, _) => "FAIL",
    };
    println!(
        "{} {} {:<8} {:?} {}",
        status,
        report.mode,
        report.group,
        report.kind,
        report.path.display()
    );
    for reason in &report.reasons {
        println!("    {}", reason);
    }
    if entry.executable == Some(false) {
        println!("    not executable");
    }
}
