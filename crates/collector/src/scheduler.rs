//! 소스별 주기 갱신
//!
//! 첫 실행은 한 주기 뒤이며, 이전 갱신이 늦어져 놓친 틱은 건너뜁니다.

use std::time::Duration;

use stackscout_core::types::Source;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::catalog::CatalogStore;
use crate::service::CollectorHandle;

/// 취소될 때까지 `period`마다 소스를 갱신합니다.
pub async fn run_refresh_loop<S: CatalogStore>(
    handle: CollectorHandle<S>,
    source: Source,
    period: Duration,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                debug!(%source, "refresh loop cancelled");
                break;
            }
            _ = ticker.tick() => {
                match handle.refresh_source(source).await {
                    Ok(Some(job)) => info!(%source, job_id = %job.id, "scheduled refresh started"),
                    Ok(None) => {}
                    Err(e) => warn!(%source, error = %e, "scheduled refresh failed"),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use stackscout_core::pipeline::Pipeline;
    use stackscout_core::types::{JobStatus, PackageMetadata};

    use crate::catalog::InMemoryCatalogStore;
    use crate::error::CollectorError;
    use crate::service::CollectorServiceBuilder;
    use crate::source::{CollectorRegistry, SourceCollector};

    struct FixedCollector;

    impl SourceCollector for FixedCollector {
        fn source(&self) -> Source {
            Source::Npm
        }

        async fn collect(&self, name: &str) -> Result<PackageMetadata, CollectorError> {
            Ok(PackageMetadata {
                name: name.to_owned(),
                version: "1.0.0".to_owned(),
                source: Source::Npm,
                license: None,
                description: None,
                repository: None,
                last_release: None,
            })
        }
    }

    #[tokio::test(start_paused = true)]
    async fn refresh_runs_after_each_period() {
        let mut registry = CollectorRegistry::new();
        registry.register(FixedCollector);
        let mut service = CollectorServiceBuilder::new()
            .registry(registry)
            .store(Arc::new(InMemoryCatalogStore::new()))
            .build()
            .unwrap();
        service.start().await.unwrap();
        let handle = service.handle();
        handle.collect_one(Source::Npm, "react").await.unwrap();

        let cancel = CancellationToken::new();
        let period = Duration::from_secs(60);
        let task = tokio::spawn(run_refresh_loop(
            handle.clone(),
            Source::Npm,
            period,
            cancel.clone(),
        ));

        // 첫 주기 전에는 실행되지 않음
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert!(handle.list_jobs().await.is_empty());

        tokio::time::sleep(Duration::from_secs(31)).await;
        let jobs = handle.list_jobs().await;
        assert_eq!(jobs.len(), 1);
        let done = handle.wait_for_job(jobs[0].id).await.unwrap();
        assert_eq!(done.status, JobStatus::Completed);

        cancel.cancel();
        task.await.unwrap();
        service.stop().await.unwrap();
    }
}
