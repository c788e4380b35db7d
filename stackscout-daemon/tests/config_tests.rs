//! Configuration loading and validation tests.
//!
//! Tests the shipped example config, environment variable overrides,
//! command-line overrides and validation failures.

use std::io::Write;

use clap::Parser;
use serial_test::serial;
use stackscout_core::config::StackscoutConfig;
use stackscout_core::types::Source;
use stackscout_daemon::cli::DaemonCli;

const EXAMPLE_CONFIG: &str = include_str!("../../stackscout.toml.example");

fn write_config(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().expect("should create temp file");
    file.write_all(content.as_bytes())
        .expect("should write config");
    file
}

#[test]
fn test_example_config_parses_and_validates() {
    let config = StackscoutConfig::parse(EXAMPLE_CONFIG).expect("example config should parse");
    config.validate().expect("example config should validate");

    assert_eq!(config.general.log_format, "json");
    assert_eq!(config.collector.workers, 4);
    assert_eq!(config.collector.overflow_policy, "block");
    assert_eq!(config.sources.enabled(), Source::ALL.to_vec());
    assert_eq!(
        config.sources.get(Source::Dockerhub).seed_packages,
        vec!["nginx".to_string(), "bitnami/redis".to_string()]
    );
    assert_eq!(config.license.rules.len(), 2);
    assert!(!config.metrics.enabled);
}

#[test]
fn test_partial_config_uses_defaults() {
    let config = StackscoutConfig::parse(
        r#"
[sources.npm]
enabled = false
"#,
    )
    .expect("partial config should parse");

    assert_eq!(config.general.log_level, "info");
    assert_eq!(config.collector.workers, 4);
    assert_eq!(config.sources.enabled(), vec![Source::Pypi, Source::Dockerhub]);
}

#[test]
fn test_invalid_toml_is_rejected() {
    assert!(StackscoutConfig::parse("[collector\nworkers = 4").is_err());
}

#[test]
fn test_zero_workers_fails_validation() {
    let config = StackscoutConfig::parse("[collector]\nworkers = 0\n").expect("should parse");
    assert!(config.validate().is_err());
}

#[tokio::test]
#[serial]
async fn test_load_missing_file_fails() {
    let result = StackscoutConfig::load("/nonexistent/stackscout.toml").await;
    assert!(result.is_err());
}

#[tokio::test]
#[serial]
async fn test_load_applies_env_overrides() {
    let file = write_config("[collector]\nworkers = 2\n");

    // SAFETY: serialized with the other env-mutating tests
    unsafe {
        std::env::set_var("STACKSCOUT_COLLECTOR_WORKERS", "6");
        std::env::set_var("STACKSCOUT_SOURCES_DOCKERHUB_ENABLED", "false");
    }
    let result = StackscoutConfig::load(file.path()).await;
    unsafe {
        std::env::remove_var("STACKSCOUT_COLLECTOR_WORKERS");
        std::env::remove_var("STACKSCOUT_SOURCES_DOCKERHUB_ENABLED");
    }

    let config = result.expect("config should load");
    assert_eq!(config.collector.workers, 6);
    assert!(!config.sources.dockerhub.enabled);
}

#[tokio::test]
#[serial]
async fn test_invalid_env_override_fails_load() {
    let file = write_config("");

    unsafe { std::env::set_var("STACKSCOUT_COLLECTOR_OVERFLOW_POLICY", "drop-oldest") };
    let result = StackscoutConfig::load(file.path()).await;
    unsafe { std::env::remove_var("STACKSCOUT_COLLECTOR_OVERFLOW_POLICY") };

    assert!(result.is_err(), "unknown overflow policy should fail validation");
}

#[tokio::test]
#[serial]
async fn test_cli_overrides_win_over_env() {
    let file = write_config("[general]\nlog_level = \"warn\"\n");

    unsafe { std::env::set_var("STACKSCOUT_GENERAL_LOG_LEVEL", "error") };
    let result = StackscoutConfig::load(file.path()).await;
    unsafe { std::env::remove_var("STACKSCOUT_GENERAL_LOG_LEVEL") };

    let mut config = result.expect("config should load");
    assert_eq!(config.general.log_level, "error");

    let cli = DaemonCli::parse_from(["stackscout-daemon", "--log-level", "trace"]);
    cli.apply_overrides(&mut config);
    assert_eq!(config.general.log_level, "trace");
}
