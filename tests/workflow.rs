// tests/workflow.rs

//! End-to-end tests for root resolution and architecture layout.

mod common;

use smithy::{config, layout, ConfigInputs, ConfigurationError, Error, RootSource};
use std::fs;
use tempfile::TempDir;

#[test]
fn test_config_file_root_and_arch() {
    let temp_dir = TempDir::new().unwrap();
    let root_dir = temp_dir.path().join("swroot");
    let config_path = common::write_config(
        temp_dir.path(),
        &format!(
            "# site config\nroot_path = {}\nfile_group: staff\narch = linux-x86_64\narch.build01 = linux-aarch64\n",
            root_dir.display()
        ),
    );

    let inputs = ConfigInputs {
        config_file: Some(config_path.clone()),
        ..Default::default()
    };
    let root = inputs.resolve().unwrap();
    assert_eq!(root.root_path(), root_dir);
    assert_eq!(root.source(), RootSource::ConfigFile);
    assert_eq!(root.settings().file_group.as_deref(), Some("staff"));
    assert_eq!(root.settings().path.as_deref(), Some(config_path.as_path()));

    let arch = layout::select_arch(None, Some("build01"), root.settings()).unwrap();
    assert_eq!(arch, "linux-aarch64");
    let arch = layout::select_arch(None, Some("laptop"), root.settings()).unwrap();
    assert_eq!(arch, "linux-x86_64");

    let tree = layout::ensure(&root, &arch).unwrap();
    assert!(root_dir.join("linux-x86_64").is_dir());
    assert_eq!(tree.arch_name(), "linux-x86_64");
}

#[test]
fn test_precedence_override_env_config() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = common::write_config(temp_dir.path(), "root_path = /from/config\n");

    let root = config::resolve(
        Some(temp_dir.path().join("override").as_path()),
        Some(temp_dir.path().join("env").as_path()),
        Some(&config_path),
    )
    .unwrap();
    assert_eq!(root.source(), RootSource::Override);
    assert_eq!(root.root_path(), temp_dir.path().join("override"));

    let root = config::resolve(None, Some(temp_dir.path().join("env").as_path()), Some(&config_path))
        .unwrap();
    assert_eq!(root.source(), RootSource::EnvVar);
    assert_eq!(root.root_path(), temp_dir.path().join("env"));

    let root = config::resolve(None, None, Some(&config_path)).unwrap();
    assert_eq!(root.source(), RootSource::ConfigFile);
}

#[test]
fn test_no_root_anywhere() {
    let temp_dir = TempDir::new().unwrap();
    let missing = temp_dir.path().join("no-such-config");

    let err = config::resolve(None, None, Some(&missing)).unwrap_err();
    assert!(matches!(
        err,
        Error::Configuration(ConfigurationError::NoRootConfigured)
    ));
    assert_eq!(err.exit_code(), 2);
}

#[test]
fn test_ensure_is_idempotent() {
    let (temp_dir, tree) = common::setup_tree();
    fs::write(tree.arch_path().join("marker"), b"keep").unwrap();

    let again = layout::ensure(tree.root(), common::ARCH).unwrap();
    assert_eq!(again, tree);
    assert_eq!(
        fs::read(tree.arch_path().join("marker")).unwrap(),
        b"keep"
    );
    assert!(temp_dir.path().join("swroot").is_dir());
}

#[test]
fn test_invalid_arch_names() {
    let (_temp_dir, tree) = common::setup_tree();

    for name in ["", "..", "linux/x86_64", ".hidden"] {
        let err = layout::ensure(tree.root(), name).unwrap_err();
        assert!(
            matches!(err, Error::InvalidArchName { .. }),
            "{:?} should be rejected",
            name
        );
        assert_eq!(err.exit_code(), 3);
    }
}

#[test]
fn test_root_is_a_file() {
    let temp_dir = TempDir::new().unwrap();
    let file = temp_dir.path().join("swroot");
    fs::write(&file, b"not a directory").unwrap();

    let root = smithy::RootConfig::new(&file);
    let err = layout::ensure(&root, common::ARCH).unwrap_err();
    assert!(matches!(err, Error::Filesystem(_)));
    assert_eq!(err.exit_code(), 9);
}
