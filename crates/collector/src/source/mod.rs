//! 소스 수집기 -- 레지스트리별 메타데이터 조회
//!
//! 각 레지스트리는 [`SourceCollector`]를 구현합니다. 수집기 하나는
//! 패키지 이름 하나에 대해 정확히 한 번의 HTTP 왕복을 수행하고
//! 응답을 공통 [`PackageMetadata`] 형태로 매핑합니다.
//!
//! # 결과 분류
//!
//! - HTTP 404 → [`CollectorError::NotFound`] (재시도 안 함)
//! - 그 밖의 HTTP 상태, 네트워크 오류, 타임아웃, 응답 파싱 실패 → [`CollectorError::Transient`]
//!
//! # 새 소스 추가
//!
//! 1. `SourceCollector`를 구현하는 타입을 추가합니다.
//! 2. [`CollectorRegistry::register`]로 등록합니다.

pub mod dockerhub;
pub mod npm;
pub mod pypi;

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use stackscout_core::config::StackscoutConfig;
use stackscout_core::pipeline::BoxFuture;
use stackscout_core::types::{PackageMetadata, Source};
use tracing::debug;

use crate::error::CollectorError;

pub use dockerhub::DockerHubCollector;
pub use npm::NpmCollector;
pub use pypi::PypiCollector;

/// 레지스트리 메타데이터 수집 trait
pub trait SourceCollector: Send + Sync {
    /// 담당 소스
    fn source(&self) -> Source;

    /// 패키지 하나의 메타데이터를 조회합니다.
    fn collect(
        &self,
        name: &str,
    ) -> impl Future<Output = Result<PackageMetadata, CollectorError>> + Send;
}

/// dyn-compatible 수집기 trait
///
/// `SourceCollector`는 RPITIT를 사용하므로 `dyn SourceCollector`가 불가합니다.
/// 레지스트리는 이 trait으로 수집기를 보관합니다.
pub trait DynSourceCollector: Send + Sync {
    /// 담당 소스
    fn source(&self) -> Source;

    /// 패키지 하나의 메타데이터를 조회합니다.
    fn collect<'a>(&'a self, name: &'a str)
    -> BoxFuture<'a, Result<PackageMetadata, CollectorError>>;
}

impl<T: SourceCollector> DynSourceCollector for T {
    fn source(&self) -> Source {
        SourceCollector::source(self)
    }

    fn collect<'a>(
        &'a self,
        name: &'a str,
    ) -> BoxFuture<'a, Result<PackageMetadata, CollectorError>> {
        Box::pin(SourceCollector::collect(self, name))
    }
}

// ─── CollectorRegistry ──────────────────────────────────────────────

/// 소스 → 수집기 조회 표
#[derive(Clone, Default)]
pub struct CollectorRegistry {
    collectors: HashMap<Source, Arc<dyn DynSourceCollector>>,
}

impl CollectorRegistry {
    /// 빈 레지스트리를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 설정에서 활성화된 소스의 HTTP 수집기를 모두 등록합니다.
    pub fn from_config(config: &StackscoutConfig) -> Result<Self, CollectorError> {
        let client = RegistryClient::new(
            &config.collector.user_agent,
            Duration::from_secs(config.collector.request_timeout_secs),
        )?;

        let mut registry = Self::new();
        for source in config.sources.enabled() {
            let base_url = config.sources.get(source).base_url_or_default(source);
            match source {
                Source::Pypi => registry.register(PypiCollector::new(client.clone(), base_url)),
                Source::Npm => registry.register(NpmCollector::new(client.clone(), base_url)),
                Source::Dockerhub => {
                    registry.register(DockerHubCollector::new(client.clone(), base_url))
                }
            }
        }
        Ok(registry)
    }

    /// 수집기를 등록합니다. 같은 소스의 기존 수집기는 교체됩니다.
    pub fn register<C: SourceCollector + 'static>(&mut self, collector: C) {
        let source = SourceCollector::source(&collector);
        if self.collectors.insert(source, Arc::new(collector)).is_some() {
            debug!(%source, "replaced existing collector");
        }
    }

    /// 소스의 수집기를 조회합니다.
    ///
    /// # Errors
    ///
    /// 등록되지 않은 소스이면 `CollectorError::Validation`
    pub fn get(&self, source: Source) -> Result<Arc<dyn DynSourceCollector>, CollectorError> {
        self.collectors.get(&source).cloned().ok_or_else(|| {
            CollectorError::Validation(format!("no collector registered for source '{source}'"))
        })
    }

    /// 수집기가 등록되어 있는지 확인합니다.
    pub fn contains(&self, source: Source) -> bool {
        self.collectors.contains_key(&source)
    }

    /// 등록된 소스 목록 (정렬됨)
    pub fn sources(&self) -> Vec<Source> {
        let mut sources: Vec<Source> = self.collectors.keys().copied().collect();
        sources.sort();
        sources
    }
}

impl std::fmt::Debug for CollectorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CollectorRegistry")
            .field("sources", &self.sources())
            .finish()
    }
}

// ─── RegistryClient ─────────────────────────────────────────────────

/// 레지스트리 공용 HTTP 클라이언트
///
/// `reqwest::Client`는 내부적으로 커넥션 풀을 공유하므로 복제 비용이 낮습니다.
#[derive(Debug, Clone)]
pub struct RegistryClient {
    http: reqwest::Client,
}

impl RegistryClient {
    /// User-Agent와 요청 타임아웃을 지정해 클라이언트를 생성합니다.
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self, CollectorError> {
        let http = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()
            .map_err(|e| CollectorError::Config {
                field: "collector.user_agent".to_owned(),
                reason: format!("failed to build http client: {e}"),
            })?;
        Ok(Self { http })
    }

    /// JSON 문서를 GET으로 조회합니다.
    ///
    /// 404는 `NotFound`, 그 밖의 실패는 모두 `Transient`로 분류합니다.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        source: Source,
        name: &str,
        url: &str,
    ) -> Result<T, CollectorError> {
        let transient = |reason: String| CollectorError::Transient {
            registry: source,
            name: name.to_owned(),
            reason,
        };

        debug!(%source, package = name, url, "fetching package metadata");
        let response = self.http.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                transient("request timed out".to_owned())
            } else {
                transient(format!("request failed: {e}"))
            }
        })?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(CollectorError::NotFound {
                registry: source,
                name: name.to_owned(),
            });
        }
        if !status.is_success() {
            return Err(transient(format!("unexpected status {}", status.as_u16())));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| transient(format!("invalid response body: {e}")))
    }
}

/// 패키지 이름의 기본 형식을 검증합니다.
pub(crate) fn validate_name(name: &str) -> Result<&str, CollectorError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(CollectorError::Validation(
            "package name must not be blank".to_owned(),
        ));
    }
    if trimmed.chars().any(|c| c.is_whitespace() || c == '?' || c == '#') {
        return Err(CollectorError::Validation(format!(
            "package name '{trimmed}' contains invalid characters"
        )));
    }
    Ok(trimmed)
}

/// 공백뿐인 문자열을 `None`으로 바꿉니다.
pub(crate) fn non_blank(value: Option<String>) -> Option<String> {
    value.and_then(|v| {
        let trimmed = v.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_owned())
    })
}
