//! 패키지 처리기 -- 수집 → 정규화 → 점수화 → 저장
//!
//! [`PackageProcessor::collect_one`]은 항목 하나에 대한 전체 수집 경로입니다.
//! 워커와 동기 수집 API(`CollectorHandle::collect_one`)가 같은 경로를 사용합니다.
//!
//! # 재시도
//!
//! `Transient` 실패만 재시도하며, 각 시도는 `collect_timeout`으로 제한됩니다.
//! 시도 사이에는 [`RetryPolicy::delay_for`]만큼 대기합니다.
//! `NotFound`와 `Validation`은 즉시 반환합니다.

use std::sync::Arc;
use std::time::{Duration, Instant};

use metrics::{counter, gauge, histogram};
use stackscout_core::metrics as m;
use stackscout_core::types::{CatalogEntry, PackageMetadata, Source};
use tracing::{debug, warn};

use crate::catalog::CatalogStore;
use crate::config::RetryPolicy;
use crate::error::CollectorError;
use crate::health::HealthScorer;
use crate::license::LicenseNormalizer;
use crate::source::CollectorRegistry;

/// 항목 처리기
pub struct PackageProcessor<S: CatalogStore> {
    registry: CollectorRegistry,
    normalizer: LicenseNormalizer,
    scorer: HealthScorer,
    store: Arc<S>,
    retry: RetryPolicy,
    collect_timeout: Duration,
}

impl<S: CatalogStore> PackageProcessor<S> {
    /// 새 처리기를 생성합니다.
    pub fn new(
        registry: CollectorRegistry,
        normalizer: LicenseNormalizer,
        store: Arc<S>,
        retry: RetryPolicy,
        collect_timeout: Duration,
    ) -> Self {
        Self {
            registry,
            normalizer,
            scorer: HealthScorer::new(),
            store,
            retry,
            collect_timeout,
        }
    }

    /// 항목 하나를 수집하고 카탈로그에 반영합니다.
    ///
    /// # Errors
    ///
    /// - `Validation`: 수집기가 없는 소스 또는 잘못된 이름
    /// - `NotFound`: 레지스트리에 없는 패키지
    /// - `Transient`: 재시도 후에도 실패
    pub async fn collect_one(
        &self,
        source: Source,
        name: &str,
    ) -> Result<CatalogEntry, CollectorError> {
        let started = Instant::now();
        let result = self.run(source, name).await;

        let elapsed = started.elapsed().as_secs_f64();
        histogram!(m::COLLECTOR_COLLECT_DURATION_SECONDS, m::LABEL_SOURCE => source.as_str())
            .record(elapsed);
        let result_label = match &result {
            Ok(_) => "success",
            Err(e) => e.result_label(),
        };
        counter!(
            m::COLLECTOR_ITEMS_TOTAL,
            m::LABEL_SOURCE => source.as_str(),
            m::LABEL_RESULT => result_label
        )
        .increment(1);

        result
    }

    async fn run(&self, source: Source, name: &str) -> Result<CatalogEntry, CollectorError> {
        let mut meta = self.fetch_with_retry(source, name).await?;

        // 라이선스를 보고하지 않는 소스(컨테이너 레지스트리)는 비워 둡니다.
        if let Some(raw) = meta.license.take() {
            meta.license = Some(self.normalizer.normalize(&raw));
        }
        let score = self.scorer.score(&meta);

        let entry = self.store.upsert(meta, score).await?;
        counter!(m::CATALOG_UPSERTS_TOTAL, m::LABEL_SOURCE => source.as_str()).increment(1);
        gauge!(m::CATALOG_ENTRIES).set(self.store.count().await as f64);

        debug!(
            %source,
            package = %entry.name,
            version = %entry.version,
            score = entry.health_score,
            "catalog entry upserted"
        );
        Ok(entry)
    }

    async fn fetch_with_retry(
        &self,
        source: Source,
        name: &str,
    ) -> Result<PackageMetadata, CollectorError> {
        let collector = self.registry.get(source)?;
        let mut attempt = 1u32;

        loop {
            let result = match tokio::time::timeout(self.collect_timeout, collector.collect(name))
                .await
            {
                Ok(result) => result,
                Err(_) => Err(CollectorError::Transient {
                    registry: source,
                    name: name.to_owned(),
                    reason: format!(
                        "collect timed out after {}ms",
                        self.collect_timeout.as_millis()
                    ),
                }),
            };

            match result {
                Err(e) if e.is_transient() && attempt < self.retry.max_attempts => {
                    let delay = self.retry.delay_for(attempt);
                    warn!(
                        %source,
                        package = name,
                        attempt,
                        max_attempts = self.retry.max_attempts,
                        backoff_ms = delay.as_millis() as u64,
                        error = %e,
                        "transient collect failure, retrying"
                    );
                    counter!(m::COLLECTOR_RETRIES_TOTAL, m::LABEL_SOURCE => source.as_str())
                        .increment(1);
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                other => return other,
            }
        }
    }

    /// 카탈로그 저장소
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// 수집기 레지스트리
    pub fn registry(&self) -> &CollectorRegistry {
        &self.registry
    }
}
