//! PyPI 수집기
//!
//! `GET {base}/{name}/json` 응답을 매핑합니다.
//!
//! - 이름, 버전, 라이선스: `info`
//! - 설명: `info.summary`
//! - 저장소: `info.project_urls`에서 키에 source/repository/github/gitlab이 포함된
//!   첫 항목 (키 사전순), 없으면 `info.home_page`
//! - 마지막 릴리스: `releases[version]`의 첫 파일 `upload_time`

use std::collections::{BTreeMap, HashMap};

use serde::Deserialize;
use stackscout_core::types::{PackageMetadata, Source};

use super::{RegistryClient, SourceCollector, non_blank, validate_name};
use crate::error::CollectorError;

/// 저장소 URL로 간주하는 `project_urls` 키워드
const REPOSITORY_KEYWORDS: [&str; 4] = ["source", "repository", "github", "gitlab"];

#[derive(Debug, Deserialize)]
struct PypiResponse {
    info: PypiInfo,
    #[serde(default)]
    releases: HashMap<String, Vec<PypiFile>>,
}

#[derive(Debug, Deserialize)]
struct PypiInfo {
    name: String,
    version: String,
    #[serde(default)]
    summary: Option<String>,
    #[serde(default)]
    license: Option<String>,
    #[serde(default)]
    license_expression: Option<String>,
    #[serde(default)]
    home_page: Option<String>,
    #[serde(default)]
    project_urls: Option<BTreeMap<String, Option<String>>>,
}

#[derive(Debug, Deserialize)]
struct PypiFile {
    #[serde(default)]
    upload_time: Option<String>,
}

/// PyPI JSON API 수집기
#[derive(Debug, Clone)]
pub struct PypiCollector {
    client: RegistryClient,
    base_url: String,
}

impl PypiCollector {
    /// 새 수집기를 생성합니다. `base_url` 예: `https://pypi.org/pypi`
    pub fn new(client: RegistryClient, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_owned(),
        }
    }
}

impl SourceCollector for PypiCollector {
    fn source(&self) -> Source {
        Source::Pypi
    }

    async fn collect(&self, name: &str) -> Result<PackageMetadata, CollectorError> {
        let name = validate_name(name)?;
        if name.contains('/') {
            return Err(CollectorError::Validation(format!(
                "invalid PyPI package name '{name}'"
            )));
        }
        let url = format!("{}/{}/json", self.base_url, name);
        let response: PypiResponse = self.client.get_json(Source::Pypi, name, &url).await?;
        Ok(map_response(response))
    }
}

fn map_response(response: PypiResponse) -> PackageMetadata {
    let PypiResponse { info, releases } = response;

    let last_release = releases
        .get(&info.version)
        .and_then(|files| files.first())
        .and_then(|file| file.upload_time.clone());

    let repository = pick_repository(info.project_urls.as_ref(), info.home_page.as_deref());

    // 최신 메타데이터는 license 대신 license_expression을 채웁니다.
    let license = match info.license {
        Some(l) if !l.trim().is_empty() => Some(l),
        other => non_blank(info.license_expression).or(other),
    };

    PackageMetadata {
        name: info.name,
        version: info.version,
        source: Source::Pypi,
        license,
        description: info.summary,
        repository,
        last_release,
    }
}

fn pick_repository(
    project_urls: Option<&BTreeMap<String, Option<String>>>,
    home_page: Option<&str>,
) -> Option<String> {
    let from_urls = project_urls.and_then(|urls| {
        urls.iter().find_map(|(key, url)| {
            let key = key.to_lowercase();
            let url = url.as_deref()?.trim();
            (REPOSITORY_KEYWORDS.iter().any(|kw| key.contains(kw)) && !url.is_empty())
                .then(|| url.to_owned())
        })
    });
    from_urls.or_else(|| non_blank(home_page.map(str::to_owned)))
}
