#![doc = include_str!("../README.md")]
//!
//! # Module Structure
//!
//! - [`error`]: Domain error types (`CollectorError`)
//! - [`config`]: Service configuration (`ServiceConfig`, builder, `RetryPolicy`, `OverflowPolicy`)
//! - [`source`]: Registry collectors (`SourceCollector` trait, `CollectorRegistry`, PyPI/npm/Docker Hub)
//! - [`license`]: License string normalization (`LicenseNormalizer`)
//! - [`health`]: Health scoring (`HealthScorer`)
//! - [`catalog`]: Catalog storage (`CatalogStore` trait, `InMemoryCatalogStore`)
//! - [`job`]: Scan job lifecycle (`ScanJobManager`)
//! - [`queue`]: Bounded work queue (`QueueProducer`, `QueueConsumer`)
//! - [`processor`]: Collect → normalize → score → upsert (`PackageProcessor`)
//! - [`worker`]: Queue consumers
//! - [`scheduler`]: Periodic per-source refresh
//! - [`service`]: Main orchestrator (`CollectorService`, `CollectorHandle`, `Pipeline` impl)
//!
//! # Architecture
//!
//! ```text
//! start_scan(source, names) --> ScanJobManager --> QueueProducer
//!                                                        |
//!                                                 bounded mpsc
//!                                                        |
//!                                          QueueConsumer x workers
//!                                                        |
//!              SourceCollector --> LicenseNormalizer --> HealthScorer --> CatalogStore
//!                                                        |
//!                                       ScanJobManager::advance_progress
//! ```

pub mod catalog;
pub mod config;
pub mod error;
pub mod health;
pub mod job;
pub mod license;
pub mod processor;
pub mod queue;
pub mod scheduler;
pub mod service;
pub mod source;
pub mod worker;

// --- Public API Re-exports ---

// Service (main orchestrator)
pub use service::{CollectorHandle, CollectorService, CollectorServiceBuilder};

// Configuration
pub use config::{OverflowPolicy, RetryPolicy, ServiceConfig, ServiceConfigBuilder};

// Error
pub use error::CollectorError;

// Collectors
pub use source::{
    CollectorRegistry, DockerHubCollector, DynSourceCollector, NpmCollector, PypiCollector,
    RegistryClient, SourceCollector,
};

// Pure stages
pub use health::HealthScorer;
pub use license::{LicenseNormalizer, LicenseRule, UNKNOWN_LICENSE};

// Storage and jobs
pub use catalog::{CatalogStore, InMemoryCatalogStore};
pub use job::{MAX_FAILED_PACKAGES, ScanJobManager};
pub use processor::PackageProcessor;
pub use queue::{EnqueueReport, QueueConsumer, QueueProducer, work_queue};
