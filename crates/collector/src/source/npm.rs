//! npm 수집기
//!
//! `GET {base}/{name}` 패키지 문서(packument)를 매핑합니다.
//! scope 패키지(`@scope/name`)의 `/`는 `%2F`로 인코딩합니다.
//!
//! - 버전: `dist-tags.latest`
//! - 라이선스, 설명, 저장소: 해당 버전 매니페스트, 없으면 문서 최상위
//! - 마지막 릴리스: `time[version]`

use std::collections::HashMap;

use serde::Deserialize;
use serde_json::Value;
use stackscout_core::types::{PackageMetadata, Source};

use super::{RegistryClient, SourceCollector, non_blank, validate_name};
use crate::error::CollectorError;

#[derive(Debug, Deserialize)]
struct Packument {
    name: String,
    #[serde(default, rename = "dist-tags")]
    dist_tags: HashMap<String, String>,
    #[serde(default)]
    versions: HashMap<String, VersionManifest>,
    #[serde(default)]
    time: HashMap<String, String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    license: Option<Value>,
    #[serde(default)]
    repository: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
struct VersionManifest {
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    license: Option<Value>,
    #[serde(default)]
    repository: Option<Value>,
}

/// npm 레지스트리 수집기
#[derive(Debug, Clone)]
pub struct NpmCollector {
    client: RegistryClient,
    base_url: String,
}

impl NpmCollector {
    /// 새 수집기를 생성합니다. `base_url` 예: `https://registry.npmjs.org`
    pub fn new(client: RegistryClient, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_owned(),
        }
    }
}

impl SourceCollector for NpmCollector {
    fn source(&self) -> Source {
        Source::Npm
    }

    async fn collect(&self, name: &str) -> Result<PackageMetadata, CollectorError> {
        let name = validate_name(name)?;
        let url = format!("{}/{}", self.base_url, name.replace('/', "%2F"));
        let packument: Packument = self.client.get_json(Source::Npm, name, &url).await?;
        map_packument(packument).ok_or_else(|| CollectorError::Transient {
            registry: Source::Npm,
            name: name.to_owned(),
            reason: "packument has no dist-tags.latest".to_owned(),
        })
    }
}

fn map_packument(mut doc: Packument) -> Option<PackageMetadata> {
    let version = doc.dist_tags.remove("latest")?;
    let manifest = doc.versions.remove(&version).unwrap_or_default();

    let license = manifest
        .license
        .as_ref()
        .and_then(license_text)
        .or_else(|| doc.license.as_ref().and_then(license_text));
    let repository = manifest
        .repository
        .as_ref()
        .and_then(repository_url)
        .or_else(|| doc.repository.as_ref().and_then(repository_url));
    let description = non_blank(manifest.description).or(doc.description);
    let last_release = doc.time.remove(&version);

    Some(PackageMetadata {
        name: doc.name,
        version,
        source: Source::Npm,
        license,
        description,
        repository,
        last_release,
    })
}

/// `"MIT"` 또는 레거시 `{"type": "MIT", "url": ...}` 형식
fn license_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Object(map) => map.get("type").and_then(Value::as_str).map(str::to_owned),
        _ => None,
    }
}

/// `"github:user/repo"`, `"user/repo"`, `{"type": "git", "url": ...}` 형식
fn repository_url(value: &Value) -> Option<String> {
    let raw = match value {
        Value::String(s) => s.as_str(),
        Value::Object(map) => map.get("url").and_then(Value::as_str)?,
        _ => return None,
    };
    normalize_repository_url(raw)
}

fn normalize_repository_url(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Some(path) = raw.strip_prefix("github:") {
        return Some(format!("https://github.com/{}", path.trim_end_matches(".git")));
    }
    if !raw.contains(':') && raw.split('/').count() == 2 {
        return Some(format!("https://github.com/{raw}"));
    }

    let mut url = raw.strip_prefix("git+").unwrap_or(raw).to_owned();
    if let Some(rest) = url.strip_prefix("git://") {
        url = format!("https://{rest}");
    } else if let Some(rest) = url.strip_prefix("ssh://git@") {
        url = format!("https://{rest}");
    }
    let url = url.strip_suffix(".git").unwrap_or(&url).to_owned();
    Some(url)
}
