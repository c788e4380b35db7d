//! 카탈로그 저장소
//!
//! [`CatalogStore`]는 이름을 자연 키로 하는 idempotent upsert를 제공합니다.
//! 같은 이름으로 몇 번을 수집하든 엔트리는 정확히 하나이며,
//! 마지막 수집 결과를 반영합니다.
//!
//! [`InMemoryCatalogStore`]는 JSON 스냅샷 저장/복원을 지원하여
//! 데몬 재시작 사이에 카탈로그를 유지합니다.

use std::collections::HashMap;
use std::future::Future;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use stackscout_core::types::{CatalogEntry, PackageMetadata, Source};
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::error::CollectorError;
use crate::health::MAX_SCORE;

/// 카탈로그 저장소 trait
pub trait CatalogStore: Send + Sync + 'static {
    /// 이름으로 엔트리를 찾아 갱신하거나 새로 추가합니다.
    ///
    /// 갱신 시 `id`와 `created_at`은 유지되고 나머지 필드는 덮어씁니다.
    /// `health_score`가 [`MAX_SCORE`]를 넘으면 `CollectorError::Validation`입니다.
    fn upsert(
        &self,
        meta: PackageMetadata,
        health_score: u8,
    ) -> impl Future<Output = Result<CatalogEntry, CollectorError>> + Send;

    /// 이름으로 엔트리를 조회합니다.
    fn get(&self, name: &str) -> impl Future<Output = Option<CatalogEntry>> + Send;

    /// 소스에 속한 모든 엔트리 이름 (정렬됨)
    fn names_by_source(&self, source: Source) -> impl Future<Output = Vec<String>> + Send;

    /// 모든 엔트리 (이름순)
    fn list(&self) -> impl Future<Output = Vec<CatalogEntry>> + Send;

    /// 엔트리 수
    fn count(&self) -> impl Future<Output = usize> + Send;
}

/// 메모리 기반 카탈로그 저장소
#[derive(Debug)]
pub struct InMemoryCatalogStore {
    entries: RwLock<HashMap<String, CatalogEntry>>,
    next_id: AtomicU64,
}

impl Default for InMemoryCatalogStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryCatalogStore {
    /// 빈 저장소를 생성합니다.
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// 엔트리 목록으로 저장소를 생성합니다. ID 시퀀스는 최대 ID 다음부터 이어집니다.
    ///
    /// # Errors
    ///
    /// 점수가 0..=100을 벗어난 엔트리가 있으면 `CollectorError::Validation`
    pub fn from_entries(entries: Vec<CatalogEntry>) -> Result<Self, CollectorError> {
        for entry in &entries {
            check_score(&entry.name, entry.health_score)?;
        }
        let next_id = entries.iter().map(|e| e.id).max().unwrap_or(0) + 1;
        let map = entries.into_iter().map(|e| (e.name.clone(), e)).collect();
        Ok(Self {
            entries: RwLock::new(map),
            next_id: AtomicU64::new(next_id),
        })
    }

    /// JSON 스냅샷 파일에서 저장소를 복원합니다.
    ///
    /// 파일이 없으면 빈 저장소를 반환합니다.
    pub async fn load_snapshot(path: impl AsRef<Path>) -> Result<Self, CollectorError> {
        let path = path.as_ref();
        let content = match tokio::fs::read_to_string(path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no catalog snapshot, starting empty");
                return Ok(Self::new());
            }
            Err(e) => {
                return Err(CollectorError::Io {
                    path: path.display().to_string(),
                    source: e,
                });
            }
        };

        let entries: Vec<CatalogEntry> =
            serde_json::from_str(&content).map_err(|e| CollectorError::Snapshot {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;
        let count = entries.len();
        let store = Self::from_entries(entries).map_err(|e| CollectorError::Snapshot {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        info!(path = %path.display(), entries = count, "catalog snapshot loaded");
        Ok(store)
    }

    /// 현재 카탈로그를 JSON 스냅샷 파일로 저장합니다.
    ///
    /// 임시 파일에 쓴 뒤 rename하여 부분 기록된 스냅샷이 남지 않게 합니다.
    pub async fn save_snapshot(&self, path: impl AsRef<Path>) -> Result<usize, CollectorError> {
        let path = path.as_ref();
        let entries = self.list().await;
        let json =
            serde_json::to_vec_pretty(&entries).map_err(|e| CollectorError::Snapshot {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;

        let io_err = |source| CollectorError::Io {
            path: path.display().to_string(),
            source,
        };
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(io_err)?;
        }
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, &json).await.map_err(io_err)?;
        tokio::fs::rename(&tmp, path).await.map_err(io_err)?;

        info!(path = %path.display(), entries = entries.len(), "catalog snapshot saved");
        Ok(entries.len())
    }
}

fn check_score(name: &str, health_score: u8) -> Result<(), CollectorError> {
    if health_score > MAX_SCORE {
        return Err(CollectorError::Validation(format!(
            "health score {health_score} for '{name}' exceeds {MAX_SCORE}"
        )));
    }
    Ok(())
}

impl CatalogStore for InMemoryCatalogStore {
    async fn upsert(
        &self,
        meta: PackageMetadata,
        health_score: u8,
    ) -> Result<CatalogEntry, CollectorError> {
        check_score(&meta.name, health_score)?;
        let now = Utc::now();
        let mut entries = self.entries.write().await;

        let entry = match entries.get_mut(&meta.name) {
            Some(existing) => {
                existing.version = meta.version;
                existing.source = meta.source;
                existing.license = meta.license;
                existing.health_score = health_score;
                existing.last_release = meta.last_release;
                existing.repository = meta.repository;
                existing.description = meta.description;
                existing.updated_at = now;
                existing.clone()
            }
            None => {
                let entry = CatalogEntry {
                    id: self.next_id.fetch_add(1, Ordering::Relaxed),
                    name: meta.name.clone(),
                    version: meta.version,
                    source: meta.source,
                    license: meta.license,
                    health_score,
                    last_release: meta.last_release,
                    repository: meta.repository,
                    description: meta.description,
                    created_at: now,
                    updated_at: now,
                };
                entries.insert(meta.name, entry.clone());
                entry
            }
        };
        Ok(entry)
    }

    async fn get(&self, name: &str) -> Option<CatalogEntry> {
        self.entries.read().await.get(name).cloned()
    }

    async fn names_by_source(&self, source: Source) -> Vec<String> {
        let entries = self.entries.read().await;
        let mut names: Vec<String> = entries
            .values()
            .filter(|e| e.source == source)
            .map(|e| e.name.clone())
            .collect();
        names.sort();
        names
    }

    async fn list(&self) -> Vec<CatalogEntry> {
        let entries = self.entries.read().await;
        let mut list: Vec<CatalogEntry> = entries.values().cloned().collect();
        list.sort_by(|a, b| a.name.cmp(&b.name));
        list
    }

    async fn count(&self) -> usize {
        self.entries.read().await.len()
    }
}
