//! Docker Hub 수집기
//!
//! `GET {base}/{namespace}/{repository}` 응답을 매핑합니다.
//! 이름에 `/`가 없으면 공식 이미지 네임스페이스 `library`를 사용합니다.
//! 컨테이너 레지스트리는 라이선스를 보고하지 않고 버전은 항상 `latest`입니다.

use serde::Deserialize;
use stackscout_core::types::{PackageMetadata, Source};

use super::{RegistryClient, SourceCollector, non_blank, validate_name};
use crate::error::CollectorError;

/// 공식 이미지 네임스페이스
const OFFICIAL_NAMESPACE: &str = "library";

/// 이미지 버전 표기 (태그별 조회는 하지 않음)
const LATEST_TAG: &str = "latest";

const HUB_PAGE_BASE: &str = "https://hub.docker.com/r";

#[derive(Debug, Deserialize)]
struct RepositoryResponse {
    name: String,
    namespace: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    last_updated: Option<String>,
    #[serde(default)]
    star_count: u64,
    #[serde(default)]
    pull_count: u64,
}

/// Docker Hub 저장소 API 수집기
#[derive(Debug, Clone)]
pub struct DockerHubCollector {
    client: RegistryClient,
    base_url: String,
}

impl DockerHubCollector {
    /// 새 수집기를 생성합니다. `base_url` 예: `https://hub.docker.com/v2/repositories`
    pub fn new(client: RegistryClient, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_owned(),
        }
    }
}

/// `nginx` → (`library`, `nginx`), `bitnami/redis` → (`bitnami`, `redis`)
fn split_image_name(name: &str) -> Result<(&str, &str), CollectorError> {
    let (namespace, repository) = name.split_once('/').unwrap_or((OFFICIAL_NAMESPACE, name));
    if namespace.is_empty() || repository.is_empty() || repository.contains('/') {
        return Err(CollectorError::Validation(format!(
            "invalid image name '{name}': expected 'repository' or 'namespace/repository'"
        )));
    }
    Ok((namespace, repository))
}

impl SourceCollector for DockerHubCollector {
    fn source(&self) -> Source {
        Source::Dockerhub
    }

    async fn collect(&self, name: &str) -> Result<PackageMetadata, CollectorError> {
        let name = validate_name(name)?;
        let (namespace, repository) = split_image_name(name)?;
        let url = format!("{}/{}/{}", self.base_url, namespace, repository);
        let repo: RepositoryResponse =
            self.client.get_json(Source::Dockerhub, name, &url).await?;

        tracing::debug!(
            image = name,
            stars = repo.star_count,
            pulls = repo.pull_count,
            "docker hub repository fetched"
        );
        Ok(map_repository(repo))
    }
}

fn map_repository(repo: RepositoryResponse) -> PackageMetadata {
    let catalog_name = if repo.namespace == OFFICIAL_NAMESPACE {
        repo.name.clone()
    } else {
        format!("{}/{}", repo.namespace, repo.name)
    };

    PackageMetadata {
        name: catalog_name,
        version: LATEST_TAG.to_owned(),
        source: Source::Dockerhub,
        license: None,
        description: non_blank(repo.description),
        repository: Some(format!("{HUB_PAGE_BASE}/{}/{}", repo.namespace, repo.name)),
        last_release: repo.last_updated,
    }
}
