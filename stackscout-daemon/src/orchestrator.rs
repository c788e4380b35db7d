//! Daemon orchestration -- assembly, lifecycle management and persistence.
//!
//! The [`Orchestrator`] is the central coordinator of `stackscout-daemon`.
//! It loads configuration, builds the collector service from the enabled
//! sources, restores the catalog snapshot, seeds scans and manages
//! startup/shutdown ordering.
//!
//! # Startup Order
//!
//! 1. PID file
//! 2. Collector service (worker pool + refresh schedule)
//! 3. Seed scans for every enabled source with `seed_packages`
//!
//! # Shutdown Order
//!
//! 1. Background daemon tasks (uptime updater)
//! 2. Collector service (in-flight items finish)
//! 3. Catalog snapshot
//! 4. PID file removal

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use tokio::sync::broadcast;

use stackscout_collector::{
    CatalogStore, CollectorHandle, CollectorRegistry, CollectorService, CollectorServiceBuilder,
    InMemoryCatalogStore, LicenseNormalizer, ServiceConfig,
};
use stackscout_core::config::StackscoutConfig;
use stackscout_core::pipeline::Pipeline;
use stackscout_core::types::ScanJob;

use crate::health::{ComponentHealth, DaemonHealth, aggregate_status};
use crate::metrics_server;

/// Catalog snapshot file name inside `general.data_dir`.
pub const SNAPSHOT_FILE: &str = "catalog.json";

/// The main daemon orchestrator.
pub struct Orchestrator {
    /// Loaded and validated configuration.
    config: StackscoutConfig,
    /// Collector service (worker pool + scheduler).
    service: CollectorService<InMemoryCatalogStore>,
    /// Shutdown broadcast sender (signals all background tasks).
    shutdown_tx: broadcast::Sender<()>,
    /// Daemon start time (for uptime reporting).
    start_time: Instant,
}

impl Orchestrator {
    /// Load configuration and build the orchestrator.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Configuration file cannot be read or parsed
    /// - Configuration validation fails
    /// - The catalog snapshot exists but cannot be read
    pub async fn build(config_path: &Path) -> Result<Self> {
        let config = StackscoutConfig::load(config_path)
            .await
            .map_err(|e| anyhow::anyhow!("failed to load config: {}", e))?;
        Self::build_from_config(config).await
    }

    /// Build from an already-loaded configuration.
    pub async fn build_from_config(config: StackscoutConfig) -> Result<Self> {
        config
            .validate()
            .map_err(|e| anyhow::anyhow!("config validation failed: {}", e))?;

        if config.metrics.enabled {
            metrics_server::install_metrics_recorder(&config.metrics)?;
            record_daemon_metrics();
        }

        let service_config = ServiceConfig::from_core(&config)
            .map_err(|e| anyhow::anyhow!("invalid collector config: {}", e))?;
        let registry = CollectorRegistry::from_config(&config)
            .map_err(|e| anyhow::anyhow!("failed to build collectors: {}", e))?;
        let normalizer = LicenseNormalizer::with_extra_rules(&config.license.rules)
            .map_err(|e| anyhow::anyhow!("invalid license rules: {}", e))?;

        let store = if config.collector.snapshot {
            let path = snapshot_path(&config);
            InMemoryCatalogStore::load_snapshot(&path)
                .await
                .map_err(|e| anyhow::anyhow!("failed to load catalog snapshot: {}", e))?
        } else {
            InMemoryCatalogStore::new()
        };

        tracing::info!(
            sources = ?registry.sources(),
            workers = service_config.workers,
            license_rules = normalizer.rules().len(),
            "initializing collector service"
        );

        let service = CollectorServiceBuilder::new()
            .config(service_config)
            .registry(registry)
            .normalizer(normalizer)
            .store(Arc::new(store))
            .build()
            .map_err(|e| anyhow::anyhow!("failed to build collector service: {}", e))?;

        let (shutdown_tx, _) = broadcast::channel(4);

        Ok(Self {
            config,
            service,
            shutdown_tx,
            start_time: Instant::now(),
        })
    }

    /// Start all components and block until a shutdown signal is received.
    ///
    /// # Shutdown Triggers
    ///
    /// - `SIGTERM` (from systemd, Docker, or `kill`)
    /// - `SIGINT` (Ctrl+C)
    pub async fn run(&mut self) -> Result<()> {
        let pid_file = self.pid_file_path();
        if let Some(path) = &pid_file {
            write_pid_file(path)?;
        }

        if let Err(e) = self.start().await {
            if let Some(path) = &pid_file {
                remove_pid_file(path);
            }
            return Err(e);
        }

        let mut uptime_updater_task = if self.config.metrics.enabled {
            Some(spawn_uptime_updater(
                self.start_time,
                self.shutdown_tx.subscribe(),
            ))
        } else {
            None
        };

        tracing::info!("stackscout-daemon running");
        let signal = wait_for_shutdown_signal().await?;
        tracing::info!(signal = signal, "shutdown signal received");

        let _ = self.shutdown_tx.send(());
        if let Some(task) = uptime_updater_task.take() {
            let _ = task.await;
        }

        let result = self.shutdown().await;

        if let Some(path) = &pid_file {
            remove_pid_file(path);
        }
        result
    }

    /// Start the collector service and enqueue seed scans.
    ///
    /// Returns the seed jobs that were created.
    pub async fn start(&mut self) -> Result<Vec<ScanJob>> {
        self.service
            .start()
            .await
            .map_err(|e| anyhow::anyhow!("failed to start collector service: {}", e))?;
        Ok(self.seed().await)
    }

    async fn seed(&self) -> Vec<ScanJob> {
        let handle = self.service.handle();
        let mut jobs = Vec::new();

        for source in self.config.sources.enabled() {
            let seeds = &self.config.sources.get(source).seed_packages;
            if seeds.is_empty() {
                continue;
            }
            match handle.start_scan(source, seeds.clone()).await {
                Ok(job) => {
                    tracing::info!(
                        %source,
                        job_id = %job.id,
                        packages = seeds.len(),
                        "seed scan started"
                    );
                    jobs.push(job);
                }
                Err(e) => tracing::error!(%source, error = %e, "failed to start seed scan"),
            }
        }
        jobs
    }

    /// Stop the collector service and persist the catalog.
    pub async fn shutdown(&mut self) -> Result<()> {
        tracing::info!("stopping collector service");
        self.service
            .stop()
            .await
            .map_err(|e| anyhow::anyhow!("failed to stop collector service: {}", e))?;

        if self.config.collector.snapshot {
            let path = snapshot_path(&self.config);
            let saved = self
                .service
                .handle()
                .store()
                .save_snapshot(&path)
                .await
                .map_err(|e| anyhow::anyhow!("failed to save catalog snapshot: {}", e))?;
            tracing::info!(path = %path.display(), entries = saved, "catalog persisted");
        }
        Ok(())
    }

    /// Get the current aggregated health status.
    pub async fn health(&self) -> DaemonHealth {
        let handle = self.service.handle();
        let components = vec![ComponentHealth {
            name: "collector".to_owned(),
            enabled: true,
            status: self.service.health_check().await,
        }];

        DaemonHealth {
            status: aggregate_status(&components),
            uptime_secs: self.start_time.elapsed().as_secs(),
            components,
            catalog_entries: handle.store().count().await,
            queue_depth: handle.queue_depth(),
            jobs: handle.job_statistics().await,
        }
    }

    /// Collector API handle.
    pub fn handle(&self) -> CollectorHandle<InMemoryCatalogStore> {
        self.service.handle()
    }

    /// Get a reference to the loaded configuration.
    pub fn config(&self) -> &StackscoutConfig {
        &self.config
    }

    fn pid_file_path(&self) -> Option<PathBuf> {
        let pid_file = &self.config.general.pid_file;
        (!pid_file.is_empty()).then(|| PathBuf::from(pid_file))
    }
}

/// Location of the catalog snapshot for a configuration.
pub fn snapshot_path(config: &StackscoutConfig) -> PathBuf {
    Path::new(&config.general.data_dir).join(SNAPSHOT_FILE)
}

/// Wait for a shutdown signal (SIGTERM or SIGINT).
///
/// Returns the name of the signal that triggered the shutdown.
async fn wait_for_shutdown_signal() -> Result<&'static str> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("failed to install SIGTERM handler: {}", e))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow::anyhow!("failed to install SIGINT handler: {}", e))?;

    Ok(tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    })
}

/// Write the current process PID to a file.
///
/// Fails if the file already exists, which indicates another running instance.
///
/// # Security
///
/// - Uses `create_new(true)` to atomically create the file
/// - Verifies the created file is a regular file
/// - Creates the parent directory with mode 0o700 and the file with 0o600
fn write_pid_file(path: &Path) -> Result<()> {
    use std::fs::{self, OpenOptions};
    use std::io::{ErrorKind, Write};

    if let Some(parent) = path.parent() {
        #[cfg(unix)]
        {
            use std::os::unix::fs::DirBuilderExt;
            let mut builder = fs::DirBuilder::new();
            builder.mode(0o700).recursive(true);
            builder.create(parent)?;
        }
        #[cfg(not(unix))]
        {
            fs::create_dir_all(parent)?;
        }
    }

    let pid = std::process::id();

    let mut file = match OpenOptions::new().write(true).create_new(true).open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == ErrorKind::AlreadyExists => {
            let existing_pid = fs::read_to_string(path).unwrap_or_else(|_| "unknown".to_owned());
            return Err(anyhow::anyhow!(
                "PID file {} already exists with PID: {}. Is another instance running?",
                path.display(),
                existing_pid.trim()
            ));
        }
        Err(e) => return Err(e.into()),
    };

    let metadata = file.metadata()?;
    if !metadata.is_file() {
        let _ = fs::remove_file(path);
        return Err(anyhow::anyhow!(
            "PID file {} is not a regular file",
            path.display()
        ));
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(fs::Permissions::from_mode(0o600))?;
    }

    writeln!(file, "{}", pid)?;

    tracing::info!(pid = pid, path = %path.display(), "PID file written");
    Ok(())
}

/// Remove the PID file on daemon shutdown.
///
/// Logs a warning but does not fail if the file cannot be removed.
fn remove_pid_file(path: &Path) {
    if let Err(e) = std::fs::remove_file(path) {
        tracing::warn!(path = %path.display(), error = %e, "failed to remove PID file");
    } else {
        tracing::info!(path = %path.display(), "PID file removed");
    }
}

/// Record daemon-level metrics (build info).
fn record_daemon_metrics() {
    use stackscout_core::metrics as m;

    metrics::gauge!(m::DAEMON_BUILD_INFO, "version" => env!("CARGO_PKG_VERSION")).set(1.0);
    tracing::debug!(version = env!("CARGO_PKG_VERSION"), "daemon metrics recorded");
}

/// Spawn a background task that periodically updates the uptime metric.
fn spawn_uptime_updater(
    start_time: Instant,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> tokio::task::JoinHandle<()> {
    use stackscout_core::metrics as m;

    tokio::spawn(async move {
        let mut interval = tokio::time::interval(tokio::time::Duration::from_secs(10));
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let uptime_secs = start_time.elapsed().as_secs();
                    metrics::gauge!(m::DAEMON_UPTIME_SECONDS).set(uptime_secs as f64);
                }
                _ = shutdown_rx.recv() => {
                    tracing::debug!("uptime updater shutting down");
                    break;
                }
            }
        }
    })
}
