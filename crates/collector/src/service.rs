//! 수집 서비스 -- 작업 생성부터 카탈로그 반영까지의 전체 흐름 관리
//!
//! [`CollectorService`]는 core의 [`Pipeline`] trait을 구현하여
//! `stackscout-daemon`에서 생명주기(start/stop/health_check)가 관리됩니다.
//! 실제 작업 API는 복제 가능한 [`CollectorHandle`]이 제공합니다.
//!
//! # 내부 아키텍처
//!
//! ```text
//! start_scan / collect_bulk ──▶ ScanJobManager (PENDING)
//!            │
//!            ▼
//!     QueueProducer ──bounded mpsc──▶ QueueConsumer ×N (workers)
//!                                          │
//!                                          ▼
//!                               PackageProcessor::collect_one
//!                   (SourceCollector → LicenseNormalizer → HealthScorer → CatalogStore)
//!                                          │
//!                                          ▼
//!                              ScanJobManager::advance_progress
//! ```

use std::sync::Arc;
use std::time::Duration;

use stackscout_core::error::{PipelineError, StackscoutError};
use stackscout_core::pipeline::{HealthStatus, Pipeline};
use stackscout_core::types::{CatalogEntry, JobOutcome, JobStatus, ScanJob, Source};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, info, info_span, warn};
use uuid::Uuid;

use crate::catalog::CatalogStore;
use crate::config::ServiceConfig;
use crate::error::CollectorError;
use crate::job::ScanJobManager;
use crate::license::LicenseNormalizer;
use crate::processor::PackageProcessor;
use crate::queue::{EnqueueReport, QueueConsumer, QueueProducer, work_queue};
use crate::scheduler::run_refresh_loop;
use crate::source::{CollectorRegistry, validate_name};
use crate::worker::run_worker;

/// 정지 시 워커가 진행 중인 항목을 마무리하도록 기다리는 최대 시간
const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

/// 큐 적재율이 이 값 이상이면 Degraded
const QUEUE_DEGRADED_RATIO: f64 = 0.9;

// ─── CollectorHandle ────────────────────────────────────────────────

/// 수집 서비스 작업 API
///
/// 내부 상태를 `Arc`로 공유하므로 복제 비용이 낮습니다.
/// 서비스가 시작되지 않았어도 작업 생성과 enqueue는 가능하며,
/// 큐에 쌓인 항목은 워커가 시작되면 처리됩니다.
pub struct CollectorHandle<S: CatalogStore> {
    inner: Arc<HandleInner<S>>,
}

struct HandleInner<S: CatalogStore> {
    processor: Arc<PackageProcessor<S>>,
    jobs: Arc<ScanJobManager>,
    producer: QueueProducer,
}

impl<S: CatalogStore> Clone for CollectorHandle<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: CatalogStore> CollectorHandle<S> {
    fn ensure_registered(&self, source: Source) -> Result<(), CollectorError> {
        if self.inner.processor.registry().contains(source) {
            Ok(())
        } else {
            Err(CollectorError::Validation(format!(
                "source '{source}' has no registered collector"
            )))
        }
    }

    /// 스캔 작업을 생성합니다.
    ///
    /// # Errors
    ///
    /// 수집기가 등록되지 않은 소스이면 `Validation`
    pub async fn create_job(
        &self,
        source: Source,
        packages_count: Option<u64>,
    ) -> Result<ScanJob, CollectorError> {
        self.ensure_registered(source)?;
        Ok(self.inner.jobs.create_job(source, packages_count).await)
    }

    /// 작업을 조회합니다.
    pub async fn get_job(&self, id: Uuid) -> Result<ScanJob, CollectorError> {
        self.inner.jobs.get(id).await
    }

    /// 모든 작업 (최신순)
    pub async fn list_jobs(&self) -> Vec<ScanJob> {
        self.inner.jobs.list().await
    }

    /// 상태별 작업 수
    pub async fn job_statistics(&self) -> Vec<(JobStatus, usize)> {
        self.inner.jobs.status_counts().await
    }

    /// 작업 상태를 변경합니다.
    pub async fn update_job_status(
        &self,
        id: Uuid,
        status: JobStatus,
    ) -> Result<ScanJob, CollectorError> {
        self.inner.jobs.update_status(id, status).await
    }

    /// 작업을 취소합니다.
    pub async fn cancel_job(&self, id: Uuid) -> Result<ScanJob, CollectorError> {
        self.inner.jobs.cancel(id).await
    }

    /// 종료된 작업을 삭제합니다.
    pub async fn delete_job(&self, id: Uuid) -> Result<ScanJob, CollectorError> {
        self.inner.jobs.delete(id).await
    }

    /// 작업이 종료될 때까지 기다립니다.
    pub async fn wait_for_job(&self, id: Uuid) -> Result<ScanJob, CollectorError> {
        self.inner.jobs.wait_until_finished(id).await
    }

    /// 큐를 거치지 않고 항목 하나를 즉시 수집합니다.
    pub async fn collect_one(
        &self,
        source: Source,
        name: &str,
    ) -> Result<CatalogEntry, CollectorError> {
        self.inner.processor.collect_one(source, name).await
    }

    /// 이름 목록을 큐에 넣고 바로 반환합니다.
    ///
    /// `job_id`가 있으면 `Reject` 정책으로 거부된 항목은 즉시 작업 실패로 집계됩니다.
    pub async fn collect_bulk(
        &self,
        source: Source,
        names: &[String],
        job_id: Option<Uuid>,
    ) -> Result<EnqueueReport, CollectorError> {
        self.ensure_registered(source)?;
        let report = self.inner.producer.enqueue(source, names, job_id).await?;

        if let Some(job_id) = job_id {
            for name in &report.rejected {
                if let Err(e) = self
                    .inner
                    .jobs
                    .advance_progress(job_id, JobOutcome::Failure, name)
                    .await
                {
                    warn!(%job_id, package = %name, error = %e, "failed to record rejected item");
                }
            }
        }
        Ok(report)
    }

    /// 작업을 생성하고 이름 목록을 큐에 넣습니다.
    ///
    /// 빈 목록이면 즉시 COMPLETED 상태의 작업을 반환합니다.
    ///
    /// # Errors
    ///
    /// - `Validation`: 수집기 미등록 소스 또는 잘못된 이름
    /// - `Queue`: 큐가 닫힘 (작업은 FAILED로 표시됨)
    pub async fn start_scan(
        &self,
        source: Source,
        names: Vec<String>,
    ) -> Result<ScanJob, CollectorError> {
        self.ensure_registered(source)?;
        let names = names
            .iter()
            .map(|name| validate_name(name).map(str::to_owned))
            .collect::<Result<Vec<_>, _>>()?;

        let job = self
            .inner
            .jobs
            .create_job(source, Some(names.len() as u64))
            .await;

        if names.is_empty() {
            self.inner.jobs.update_status(job.id, JobStatus::Running).await?;
            return self.inner.jobs.update_status(job.id, JobStatus::Completed).await;
        }

        if let Err(e) = self.collect_bulk(source, &names, Some(job.id)).await {
            warn!(job_id = %job.id, %source, error = %e, "failed to enqueue scan");
            if let Err(mark) = self.inner.jobs.update_status(job.id, JobStatus::Failed).await {
                warn!(job_id = %job.id, error = %mark, "failed to mark scan job failed");
            }
            return Err(e);
        }

        self.inner.jobs.get(job.id).await
    }

    /// 카탈로그에 있는 소스의 모든 항목을 다시 수집합니다.
    ///
    /// 카탈로그에 해당 소스 항목이 없으면 `None`.
    pub async fn refresh_source(&self, source: Source) -> Result<Option<ScanJob>, CollectorError> {
        let names = self.inner.processor.store().names_by_source(source).await;
        if names.is_empty() {
            info!(%source, "nothing to refresh");
            return Ok(None);
        }
        info!(%source, packages = names.len(), "refreshing catalog entries");
        self.start_scan(source, names).await.map(Some)
    }

    /// 카탈로그 저장소
    pub fn store(&self) -> &Arc<S> {
        self.inner.processor.store()
    }

    /// 수집기가 등록된 소스 목록
    pub fn sources(&self) -> Vec<Source> {
        self.inner.processor.registry().sources()
    }

    /// 큐 대기 항목 수
    pub fn queue_depth(&self) -> usize {
        self.inner.producer.depth()
    }
}

// ─── CollectorService ───────────────────────────────────────────────

/// 서비스 실행 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ServiceState {
    /// 초기화됨, 아직 시작하지 않음
    Initialized,
    /// 실행 중
    Running,
    /// 정지됨
    Stopped,
}

/// 수집 서비스
///
/// 워커 풀과 소스별 갱신 스케줄러를 소유합니다.
/// 정지 후 다시 `start()`하면 같은 큐에서 이어서 처리합니다.
pub struct CollectorService<S: CatalogStore> {
    config: ServiceConfig,
    handle: CollectorHandle<S>,
    consumer: QueueConsumer,
    state: ServiceState,
    cancel: CancellationToken,
    workers: Vec<JoinHandle<()>>,
    schedulers: Vec<JoinHandle<()>>,
}

impl<S: CatalogStore> CollectorService<S> {
    /// 작업 API 핸들
    pub fn handle(&self) -> CollectorHandle<S> {
        self.handle.clone()
    }

    /// 서비스 설정
    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// 현재 상태명을 반환합니다.
    pub fn state_name(&self) -> &str {
        match self.state {
            ServiceState::Initialized => "initialized",
            ServiceState::Running => "running",
            ServiceState::Stopped => "stopped",
        }
    }
}

impl<S: CatalogStore> Pipeline for CollectorService<S> {
    async fn start(&mut self) -> Result<(), StackscoutError> {
        if self.state == ServiceState::Running {
            return Err(PipelineError::AlreadyRunning.into());
        }

        info!(
            workers = self.config.workers,
            queue_capacity = self.config.queue_capacity,
            policy = ?self.config.overflow_policy,
            "starting collector service"
        );
        self.cancel = CancellationToken::new();

        for id in 0..self.config.workers {
            let task = run_worker(
                id,
                self.consumer.clone(),
                Arc::clone(&self.handle.inner.processor),
                Arc::clone(&self.handle.inner.jobs),
                self.cancel.child_token(),
            );
            self.workers
                .push(tokio::spawn(task.instrument(info_span!("worker", id))));
        }

        for (&source, &period) in &self.config.refresh_intervals {
            let task = run_refresh_loop(
                self.handle.clone(),
                source,
                period,
                self.cancel.child_token(),
            );
            self.schedulers.push(tokio::spawn(task));
            info!(%source, interval_secs = period.as_secs(), "refresh task spawned");
        }

        self.state = ServiceState::Running;
        info!("collector service started");
        Ok(())
    }

    async fn stop(&mut self) -> Result<(), StackscoutError> {
        if self.state != ServiceState::Running {
            return Err(PipelineError::NotRunning.into());
        }

        info!("stopping collector service");
        self.cancel.cancel();

        for mut task in self.workers.drain(..).chain(self.schedulers.drain(..)) {
            if tokio::time::timeout(SHUTDOWN_GRACE, &mut task).await.is_err() {
                warn!("background task did not stop in time, aborting");
                task.abort();
                let _ = task.await;
            }
        }

        self.state = ServiceState::Stopped;
        info!("collector service stopped");
        Ok(())
    }

    async fn health_check(&self) -> HealthStatus {
        match self.state {
            ServiceState::Running => {
                let exited = self.workers.iter().filter(|w| w.is_finished()).count();
                if exited == self.workers.len() {
                    return HealthStatus::Unhealthy("all workers exited".to_owned());
                }
                if exited > 0 {
                    return HealthStatus::Degraded(format!(
                        "{exited} of {} workers exited",
                        self.workers.len()
                    ));
                }

                let depth = self.handle.queue_depth();
                let capacity = self.config.queue_capacity;
                if depth as f64 >= capacity as f64 * QUEUE_DEGRADED_RATIO {
                    return HealthStatus::Degraded(format!(
                        "work queue nearly full ({depth}/{capacity})"
                    ));
                }
                HealthStatus::Healthy
            }
            ServiceState::Initialized => HealthStatus::Unhealthy("not started".to_owned()),
            ServiceState::Stopped => HealthStatus::Unhealthy("stopped".to_owned()),
        }
    }
}

// ─── CollectorServiceBuilder ────────────────────────────────────────

/// 수집 서비스 빌더
pub struct CollectorServiceBuilder<S: CatalogStore> {
    config: ServiceConfig,
    registry: Option<CollectorRegistry>,
    normalizer: LicenseNormalizer,
    store: Option<Arc<S>>,
}

impl<S: CatalogStore> CollectorServiceBuilder<S> {
    /// 새 빌더를 생성합니다.
    pub fn new() -> Self {
        Self {
            config: ServiceConfig::default(),
            registry: None,
            normalizer: LicenseNormalizer::default(),
            store: None,
        }
    }

    /// 서비스 설정을 지정합니다.
    pub fn config(mut self, config: ServiceConfig) -> Self {
        self.config = config;
        self
    }

    /// 수집기 레지스트리를 지정합니다.
    pub fn registry(mut self, registry: CollectorRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    /// 라이선스 정규화기를 지정합니다 (기본: 기본 규칙 표).
    pub fn normalizer(mut self, normalizer: LicenseNormalizer) -> Self {
        self.normalizer = normalizer;
        self
    }

    /// 카탈로그 저장소를 지정합니다.
    pub fn store(mut self, store: Arc<S>) -> Self {
        self.store = Some(store);
        self
    }

    /// 서비스를 빌드합니다.
    ///
    /// # Errors
    ///
    /// 설정 검증 실패, 레지스트리 또는 저장소 미지정 시 `CollectorError::Config`
    pub fn build(self) -> Result<CollectorService<S>, CollectorError> {
        self.config.validate()?;

        let registry = self.registry.ok_or_else(|| CollectorError::Config {
            field: "registry".to_owned(),
            reason: "collector registry is required".to_owned(),
        })?;
        let store = self.store.ok_or_else(|| CollectorError::Config {
            field: "store".to_owned(),
            reason: "catalog store is required".to_owned(),
        })?;

        let (producer, consumer) =
            work_queue(self.config.queue_capacity, self.config.overflow_policy);
        let processor = PackageProcessor::new(
            registry,
            self.normalizer,
            store,
            self.config.retry,
            self.config.collect_timeout,
        );

        let handle = CollectorHandle {
            inner: Arc::new(HandleInner {
                processor: Arc::new(processor),
                jobs: Arc::new(ScanJobManager::new()),
                producer,
            }),
        };

        Ok(CollectorService {
            config: self.config,
            handle,
            consumer,
            state: ServiceState::Initialized,
            cancel: CancellationToken::new(),
            workers: Vec::new(),
            schedulers: Vec::new(),
        })
    }
}

impl<S: CatalogStore> Default for CollectorServiceBuilder<S> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stackscout_core::types::PackageMetadata;

    use crate::catalog::InMemoryCatalogStore;
    use crate::config::{OverflowPolicy, ServiceConfigBuilder};
    use crate::source::SourceCollector;

    struct EchoCollector(Source);

    impl SourceCollector for EchoCollector {
        fn source(&self) -> Source {
            self.0
        }

        async fn collect(&self, name: &str) -> Result<PackageMetadata, CollectorError> {
            if name == "ghost" {
                return Err(CollectorError::NotFound {
                    registry: self.0,
                    name: name.to_owned(),
                });
            }
            Ok(PackageMetadata {
                name: name.to_owned(),
                version: "1.0.0".to_owned(),
                source: self.0,
                license: Some("Apache License 2.0".to_owned()),
                description: Some("echo".to_owned()),
                repository: Some("https://example.com/repo".to_owned()),
                last_release: None,
            })
        }
    }

    fn service(config: ServiceConfig) -> CollectorService<InMemoryCatalogStore> {
        let mut registry = CollectorRegistry::new();
        registry.register(EchoCollector(Source::Pypi));
        registry.register(EchoCollector(Source::Npm));
        CollectorServiceBuilder::new()
            .config(config)
            .registry(registry)
            .store(Arc::new(InMemoryCatalogStore::new()))
            .build()
            .unwrap()
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| (*s).to_owned()).collect()
    }

    async fn wait(handle: &CollectorHandle<InMemoryCatalogStore>, id: Uuid) -> ScanJob {
        tokio::time::timeout(Duration::from_secs(5), handle.wait_for_job(id))
            .await
            .unwrap()
            .unwrap()
    }

    #[test]
    fn builder_requires_registry_and_store() {
        let result = CollectorServiceBuilder::<InMemoryCatalogStore>::new()
            .store(Arc::new(InMemoryCatalogStore::new()))
            .build();
        assert!(matches!(result, Err(CollectorError::Config { .. })));

        let result = CollectorServiceBuilder::<InMemoryCatalogStore>::new()
            .registry(CollectorRegistry::new())
            .build();
        assert!(matches!(result, Err(CollectorError::Config { .. })));
    }

    #[tokio::test]
    async fn lifecycle_start_stop() {
        let mut service = service(ServiceConfig::default());
        assert_eq!(service.state_name(), "initialized");
        assert!(service.health_check().await.is_unhealthy());

        service.start().await.unwrap();
        assert_eq!(service.state_name(), "running");
        assert!(service.health_check().await.is_healthy());
        assert!(service.start().await.is_err());

        service.stop().await.unwrap();
        assert_eq!(service.state_name(), "stopped");
        assert!(service.stop().await.is_err());
        assert!(service.health_check().await.is_unhealthy());
    }

    #[tokio::test]
    async fn start_scan_processes_all_items() {
        let mut service = service(ServiceConfig::default());
        service.start().await.unwrap();
        let handle = service.handle();

        let job = handle
            .start_scan(Source::Pypi, names(&["requests", "flask", "numpy"]))
            .await
            .unwrap();
        assert_eq!(job.packages_count, Some(3));

        let done = wait(&handle, job.id).await;
        assert_eq!(done.status, JobStatus::Completed);
        assert_eq!(done.processed_count, 3);

        let entry = handle.store().get("flask").await.unwrap();
        assert_eq!(entry.license.as_deref(), Some("Apache-2.0"));
        assert_eq!(entry.health_score, 40);

        service.stop().await.unwrap();
    }

    #[tokio::test]
    async fn empty_scan_completes_immediately() {
        let service = service(ServiceConfig::default());
        let job = service.handle().start_scan(Source::Npm, Vec::new()).await.unwrap();
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.packages_count, Some(0));
        assert!(job.started_at.is_some());
        assert!(job.completed_at.is_some());
    }

    #[tokio::test]
    async fn unregistered_source_is_rejected() {
        let service = service(ServiceConfig::default());
        let handle = service.handle();
        assert!(matches!(
            handle.create_job(Source::Dockerhub, Some(1)).await,
            Err(CollectorError::Validation(_))
        ));
        assert!(matches!(
            handle.start_scan(Source::Dockerhub, names(&["nginx"])).await,
            Err(CollectorError::Validation(_))
        ));
        assert!(handle.list_jobs().await.is_empty());
    }

    #[tokio::test]
    async fn blank_name_rejects_scan_before_job_creation() {
        let service = service(ServiceConfig::default());
        let handle = service.handle();
        let err = handle
            .start_scan(Source::Pypi, names(&["requests", " "]))
            .await
            .unwrap_err();
        assert!(matches!(err, CollectorError::Validation(_)));
        assert!(handle.list_jobs().await.is_empty());
    }

    #[tokio::test]
    async fn reject_policy_counts_refused_items_as_failures() {
        let config = ServiceConfigBuilder::new()
            .queue_capacity(2)
            .overflow_policy(OverflowPolicy::Reject)
            .build()
            .unwrap();
        let mut service = service(config);
        let handle = service.handle();

        // 워커 시작 전이므로 용량 2를 넘는 항목은 거부됩니다.
        let job = handle
            .start_scan(Source::Pypi, names(&["a", "b", "c", "d"]))
            .await
            .unwrap();
        assert_eq!(job.failed_count, 2);
        assert_eq!(job.failed_packages, vec!["c", "d"]);

        service.start().await.unwrap();
        let done = wait(&handle, job.id).await;
        assert_eq!(done.status, JobStatus::Failed);
        assert_eq!(done.processed_count, 2);
        assert_eq!(done.error_message.as_deref(), Some("2 of 4 items failed"));
        service.stop().await.unwrap();
    }

    #[tokio::test]
    async fn refresh_source_rescans_known_names() {
        let mut service = service(ServiceConfig::default());
        let handle = service.handle();
        assert!(handle.refresh_source(Source::Pypi).await.unwrap().is_none());

        handle.collect_one(Source::Pypi, "requests").await.unwrap();
        handle.collect_one(Source::Npm, "react").await.unwrap();

        service.start().await.unwrap();
        let job = handle.refresh_source(Source::Pypi).await.unwrap().unwrap();
        assert_eq!(job.packages_count, Some(1));
        let done = wait(&handle, job.id).await;
        assert_eq!(done.status, JobStatus::Completed);
        service.stop().await.unwrap();
    }

    #[tokio::test]
    async fn collect_one_surfaces_not_found() {
        let service = service(ServiceConfig::default());
        let err = service
            .handle()
            .collect_one(Source::Pypi, "ghost")
            .await
            .unwrap_err();
        assert!(matches!(err, CollectorError::NotFound { .. }));
    }

    #[tokio::test]
    async fn cancelled_job_ignores_late_progress() {
        let mut service = service(ServiceConfig::default());
        let handle = service.handle();
        let job = handle
            .start_scan(Source::Pypi, names(&["requests", "flask"]))
            .await
            .unwrap();
        handle.cancel_job(job.id).await.unwrap();

        service.start().await.unwrap();
        // 큐가 비워질 때까지 대기
        for _ in 0..100 {
            if handle.queue_depth() == 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        service.stop().await.unwrap();

        let job = handle.get_job(job.id).await.unwrap();
        assert_eq!(job.status, JobStatus::Cancelled);
        assert_eq!(job.accounted(), 0);
    }
}
