//! Orchestrator integration tests.
//!
//! Tests the full flow against a mocked registry:
//! config -> build -> start (seed scans) -> health -> shutdown (snapshot) -> restore.

use std::path::Path;
use std::time::Duration;

use chrono::Utc;
use stackscout_core::config::StackscoutConfig;
use stackscout_core::types::{JobStatus, ScanJob};
use stackscout_daemon::orchestrator::{Orchestrator, SNAPSHOT_FILE, snapshot_path};
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Config with only PyPI enabled, pointed at the mock server.
fn test_config(server: &MockServer, data_dir: &Path, seeds: &[&str]) -> StackscoutConfig {
    let mut config = StackscoutConfig::default();
    config.general.pid_file = String::new();
    config.general.data_dir = data_dir.display().to_string();
    config.collector.workers = 2;
    config.collector.retry_base_delay_ms = 10;
    config.collector.retry_max_delay_ms = 20;
    config.sources.pypi.base_url = format!("{}/pypi", server.uri());
    config.sources.pypi.seed_packages = seeds.iter().map(|s| s.to_string()).collect();
    config.sources.npm.enabled = false;
    config.sources.dockerhub.enabled = false;
    config
}

async fn mount_pypi(server: &MockServer, name: &str) {
    let upload_time = (Utc::now() - chrono::Duration::days(3))
        .format("%Y-%m-%dT%H:%M:%S")
        .to_string();
    let body = serde_json::json!({
        "info": {
            "name": name,
            "version": "2.0.0",
            "summary": format!("{name} summary"),
            "license": "MIT",
            "project_urls": {"Homepage": format!("https://github.com/example/{name}")}
        },
        "releases": {"2.0.0": [{"upload_time": upload_time}]}
    });
    Mock::given(method("GET"))
        .and(path(format!("/pypi/{name}/json")))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

async fn wait_for(orchestrator: &Orchestrator, job: &ScanJob) -> ScanJob {
    let handle = orchestrator.handle();
    tokio::time::timeout(Duration::from_secs(10), handle.wait_for_job(job.id))
        .await
        .expect("seed job should finish")
        .expect("seed job should exist")
}

#[tokio::test]
async fn test_seed_scan_then_snapshot_round_trip() {
    let server = MockServer::start().await;
    mount_pypi(&server, "requests").await;
    mount_pypi(&server, "flask").await;
    let data_dir = TempDir::new().expect("should create temp dir");
    let config = test_config(&server, data_dir.path(), &["requests", "flask"]);

    // Given: A running orchestrator with two seed packages
    let mut orchestrator = Orchestrator::build_from_config(config.clone())
        .await
        .expect("orchestrator should build");
    let jobs = orchestrator.start().await.expect("orchestrator should start");
    assert_eq!(jobs.len(), 1, "one seed job per source with seeds");

    // When: The seed job finishes
    let done = wait_for(&orchestrator, &jobs[0]).await;

    // Then: The job completed and the catalog holds both packages
    assert_eq!(done.status, JobStatus::Completed);
    assert_eq!(done.packages_count, Some(2));
    assert_eq!(done.processed_count, 2);

    let health = orchestrator.health().await;
    assert!(health.status.is_healthy(), "got {:?}", health.status);
    assert_eq!(health.catalog_entries, 2);
    assert_eq!(health.components.len(), 1);
    assert!(
        health
            .jobs
            .iter()
            .any(|(status, count)| *status == JobStatus::Completed && *count == 1)
    );

    // And: Shutdown persists the catalog
    orchestrator.shutdown().await.expect("shutdown should succeed");
    let snapshot = data_dir.path().join(SNAPSHOT_FILE);
    assert_eq!(snapshot_path(&config), snapshot);
    assert!(snapshot.exists(), "snapshot should be written on shutdown");

    // And: A fresh orchestrator restores it without collecting again
    let mut restart_config = config.clone();
    restart_config.sources.pypi.seed_packages.clear();
    let restored = Orchestrator::build_from_config(restart_config)
        .await
        .expect("orchestrator should rebuild");
    let health = restored.health().await;
    assert_eq!(health.catalog_entries, 2);
    assert!(health.status.is_unhealthy(), "not started yet");
}

#[tokio::test]
async fn test_seed_scan_with_missing_package_fails_job() {
    let server = MockServer::start().await;
    mount_pypi(&server, "requests").await;
    Mock::given(method("GET"))
        .and(path("/pypi/does-not-exist/json"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    let data_dir = TempDir::new().expect("should create temp dir");
    let config = test_config(&server, data_dir.path(), &["requests", "does-not-exist"]);

    let mut orchestrator = Orchestrator::build_from_config(config)
        .await
        .expect("orchestrator should build");
    let jobs = orchestrator.start().await.expect("orchestrator should start");
    let done = wait_for(&orchestrator, &jobs[0]).await;

    assert_eq!(done.status, JobStatus::Failed);
    assert_eq!(done.failed_count, 1);
    assert_eq!(done.failed_packages, vec!["does-not-exist".to_string()]);
    assert_eq!(done.error_message.as_deref(), Some("1 of 2 items failed"));

    orchestrator.shutdown().await.expect("shutdown should succeed");
}

#[tokio::test]
async fn test_no_seeds_creates_no_jobs() {
    let server = MockServer::start().await;
    let data_dir = TempDir::new().expect("should create temp dir");
    let mut config = test_config(&server, data_dir.path(), &[]);
    config.collector.snapshot = false;

    let mut orchestrator = Orchestrator::build_from_config(config)
        .await
        .expect("orchestrator should build");
    let jobs = orchestrator.start().await.expect("orchestrator should start");
    assert!(jobs.is_empty());
    assert!(orchestrator.handle().list_jobs().await.is_empty());

    orchestrator.shutdown().await.expect("shutdown should succeed");
    assert!(
        !data_dir.path().join(SNAPSHOT_FILE).exists(),
        "snapshot disabled, nothing should be written"
    );
}

#[tokio::test]
async fn test_corrupted_snapshot_fails_build() {
    let server = MockServer::start().await;
    let data_dir = TempDir::new().expect("should create temp dir");
    std::fs::write(data_dir.path().join(SNAPSHOT_FILE), "{not json")
        .expect("should write snapshot");
    let config = test_config(&server, data_dir.path(), &[]);

    let err = Orchestrator::build_from_config(config)
        .await
        .err()
        .expect("corrupted snapshot should fail");
    assert!(err.to_string().contains("catalog snapshot"), "got: {}", err);
}

#[tokio::test]
async fn test_invalid_config_fails_build() {
    let server = MockServer::start().await;
    let data_dir = TempDir::new().expect("should create temp dir");
    let mut config = test_config(&server, data_dir.path(), &[]);
    config.collector.workers = 0;

    let err = Orchestrator::build_from_config(config)
        .await
        .err()
        .expect("zero workers should fail");
    assert!(err.to_string().contains("config validation failed"), "got: {}", err);
}

#[tokio::test]
async fn test_build_from_missing_config_file_fails() {
    let result = Orchestrator::build(Path::new("/nonexistent/stackscout.toml")).await;
    assert!(result.is_err());
}
