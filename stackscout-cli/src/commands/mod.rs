//! Command handlers -- one module per subcommand

pub mod collect;
pub mod config;
pub mod scan;

use std::path::Path;
use std::sync::Arc;

use stackscout_collector::{
    CollectorRegistry, CollectorService, CollectorServiceBuilder, InMemoryCatalogStore,
    LicenseNormalizer, ServiceConfig,
};
use stackscout_core::config::StackscoutConfig;

use crate::error::CliError;

/// Load the effective configuration (file + env overrides), validated.
pub(crate) async fn load_config(config_path: &Path) -> Result<StackscoutConfig, CliError> {
    Ok(StackscoutConfig::load(config_path).await?)
}

/// Build an in-process collector service backed by an in-memory catalog.
///
/// The CLI never touches the daemon's snapshot file.
pub(crate) fn build_service(
    config: &StackscoutConfig,
) -> Result<CollectorService<InMemoryCatalogStore>, CliError> {
    let service = CollectorServiceBuilder::new()
        .config(ServiceConfig::from_core(config)?)
        .registry(CollectorRegistry::from_config(config)?)
        .normalizer(LicenseNormalizer::with_extra_rules(&config.license.rules)?)
        .store(Arc::new(InMemoryCatalogStore::new()))
        .build()?;
    Ok(service)
}
