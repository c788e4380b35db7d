//! Integration tests for `stackscout config` command.
//!
//! Tests config validation and display functionality with real TOML files.

use std::fs;
use std::path::PathBuf;

use stackscout_cli::commands::config;
use stackscout_cli::error::CliError;
use tempfile::TempDir;

fn write_config(dir: &TempDir, content: &str) -> PathBuf {
    let path = dir.path().join("stackscout.toml");
    fs::write(&path, content).expect("should write config");
    path
}

#[tokio::test]
async fn test_config_validate_valid_toml() {
    let dir = TempDir::new().expect("should create temp dir");
    let path = write_config(
        &dir,
        r#"
[general]
log_level = "info"

[sources.npm]
enabled = false
"#,
    );

    let report = config::validate(&path).await;

    assert!(report.valid, "errors: {:?}", report.errors);
    assert!(report.errors.is_empty());
    assert_eq!(report.enabled_sources, vec!["pypi", "dockerhub"]);
}

#[tokio::test]
async fn test_config_validate_invalid_value() {
    let dir = TempDir::new().expect("should create temp dir");
    let path = write_config(&dir, "[collector]\nworkers = 0\n");

    let report = config::validate(&path).await;

    assert!(!report.valid);
    assert_eq!(report.errors.len(), 1);
    assert!(report.errors[0].contains("workers"), "got: {}", report.errors[0]);
}

#[tokio::test]
async fn test_config_validate_malformed_toml() {
    let dir = TempDir::new().expect("should create temp dir");
    let path = write_config(&dir, "[collector\nworkers = 4");

    let report = config::validate(&path).await;
    assert!(!report.valid);
}

#[tokio::test]
async fn test_config_validate_missing_file() {
    let report = config::validate(std::path::Path::new("/nonexistent/stackscout.toml")).await;
    assert!(!report.valid);
    assert!(report.errors[0].contains("not found"), "got: {}", report.errors[0]);
}

#[tokio::test]
async fn test_config_show_section() {
    let dir = TempDir::new().expect("should create temp dir");
    let path = write_config(&dir, "[collector]\nworkers = 7\n");

    let report = config::show(&path, Some("collector"))
        .await
        .expect("show should succeed");

    assert_eq!(report.section.as_deref(), Some("collector"));
    assert!(report.config_toml.contains("workers = 7"), "got: {}", report.config_toml);
    assert!(!report.config_toml.contains("log_level"));
}

#[tokio::test]
async fn test_config_show_full_includes_defaults() {
    let dir = TempDir::new().expect("should create temp dir");
    let path = write_config(&dir, "");

    let report = config::show(&path, None).await.expect("show should succeed");

    assert!(report.section.is_none());
    for section in config::SECTIONS {
        assert!(
            report.config_toml.contains(&format!("[{}", section)),
            "missing section {} in:\n{}",
            section,
            report.config_toml
        );
    }
}

#[tokio::test]
async fn test_config_show_unknown_section() {
    let dir = TempDir::new().expect("should create temp dir");
    let path = write_config(&dir, "");

    let err = config::show(&path, Some("ebpf"))
        .await
        .err()
        .expect("unknown section should fail");

    assert!(matches!(err, CliError::Command(_)));
    assert!(err.to_string().contains("unknown section: ebpf"));
    assert_eq!(err.exit_code(), 1);
}
