//! 수집 파이프라인 에러 타입
//!
//! [`CollectorError`]는 수집기, 작업 관리자, 큐, 카탈로그에서 발생할 수 있는
//! 모든 에러를 나타냅니다. `From<CollectorError> for StackscoutError` 구현을 통해
//! `?` 연산자로 상위 에러 타입으로 전파됩니다.
//!
//! # 에러 카테고리
//!
//! - **수집**: `NotFound` (재시도 안 함), `Transient` (재시도 대상), `Validation`
//! - **작업**: `JobNotFound`, `InvalidTransition`, `JobFinished`, `ProgressOverflow`
//! - **설정**: `Config`
//! - **큐**: `Queue`
//! - **스냅샷**: `Snapshot`, `Io`

use stackscout_core::error::{
    CollectError, ConfigError, JobError, PipelineError, StackscoutError, StorageError,
};
use stackscout_core::types::{JobStatus, Source};
use uuid::Uuid;

/// 수집 파이프라인 도메인 에러
#[derive(Debug, thiserror::Error)]
pub enum CollectorError {
    /// 레지스트리가 패키지 부재를 확인함 (HTTP 404)
    #[error("{registry}: package '{name}' not found")]
    NotFound {
        /// 대상 소스
        registry: Source,
        /// 패키지 이름
        name: String,
    },

    /// 네트워크, 파싱, 타임아웃 등 일시적 실패
    #[error("{registry}: transient failure for '{name}': {reason}")]
    Transient {
        /// 대상 소스
        registry: Source,
        /// 패키지 이름
        name: String,
        /// 실패 사유
        reason: String,
    },

    /// 지원하지 않는 소스, 수집기 미등록, 잘못된 패키지 이름
    #[error("validation error: {0}")]
    Validation(String),

    /// 작업을 찾을 수 없음
    #[error("scan job not found: {id}")]
    JobNotFound {
        /// 작업 ID
        id: Uuid,
    },

    /// 허용되지 않는 상태 전이
    #[error("invalid transition for job {id}: {from} -> {to}")]
    InvalidTransition {
        /// 작업 ID
        id: Uuid,
        /// 현재 상태
        from: JobStatus,
        /// 요청된 상태
        to: JobStatus,
    },

    /// 이미 종료된 작업에 대한 진행 보고
    #[error("scan job {id} already finished with status {status}")]
    JobFinished {
        /// 작업 ID
        id: Uuid,
        /// 종료 상태
        status: JobStatus,
    },

    /// 목표 항목 수를 넘는 진행 보고
    #[error("scan job {id} already accounted for all {count} items")]
    ProgressOverflow {
        /// 작업 ID
        id: Uuid,
        /// 목표 항목 수
        count: u64,
    },

    /// 설정 에러
    #[error("config error: {field}: {reason}")]
    Config {
        /// 설정 필드명
        field: String,
        /// 에러 사유
        reason: String,
    },

    /// 작업 큐 에러
    #[error("queue error: {0}")]
    Queue(String),

    /// 카탈로그 스냅샷 직렬화/역직렬화 실패
    #[error("snapshot error: {path}: {reason}")]
    Snapshot {
        /// 스냅샷 파일 경로
        path: String,
        /// 실패 사유
        reason: String,
    },

    /// 파일 I/O 에러
    #[error("io error: {path}: {source}")]
    Io {
        /// 관련 파일 경로
        path: String,
        /// 원본 I/O 에러
        source: std::io::Error,
    },
}

impl CollectorError {
    /// 재시도 대상인지 확인합니다.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient { .. })
    }

    /// 메트릭 `result` 레이블 값
    pub fn result_label(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "not_found",
            Self::Transient { .. } => "transient",
            Self::Validation(_) => "validation",
            _ => "error",
        }
    }
}

impl From<CollectorError> for StackscoutError {
    fn from(err: CollectorError) -> Self {
        match err {
            CollectorError::NotFound { registry, name } => {
                StackscoutError::Collect(CollectError::NotFound {
                    source_name: registry.to_string(),
                    name,
                })
            }
            CollectorError::Transient {
                registry,
                name,
                reason,
            } => StackscoutError::Collect(CollectError::Transient {
                source_name: registry.to_string(),
                name,
                reason,
            }),
            CollectorError::Validation(msg) => {
                StackscoutError::Collect(CollectError::Validation(msg))
            }
            CollectorError::JobNotFound { id } => {
                StackscoutError::Job(JobError::NotFound { id: id.to_string() })
            }
            CollectorError::InvalidTransition { id, from, to } => {
                StackscoutError::Job(JobError::InvalidTransition {
                    id: id.to_string(),
                    from: from.to_string(),
                    to: to.to_string(),
                })
            }
            CollectorError::JobFinished { id, status } => {
                StackscoutError::Job(JobError::InvalidTransition {
                    id: id.to_string(),
                    from: status.to_string(),
                    to: JobStatus::Running.to_string(),
                })
            }
            CollectorError::ProgressOverflow { id, count } => {
                StackscoutError::Job(JobError::InvalidTransition {
                    id: id.to_string(),
                    from: format!("{count}/{count}"),
                    to: format!("{}/{count}", count + 1),
                })
            }
            CollectorError::Config { field, reason } => {
                StackscoutError::Config(ConfigError::InvalidValue { field, reason })
            }
            CollectorError::Queue(msg) => StackscoutError::Pipeline(PipelineError::ChannelSend(msg)),
            CollectorError::Snapshot { path, reason } => StackscoutError::Storage(
                StorageError::Snapshot(format!("{path}: {reason}")),
            ),
            CollectorError::Io { source, .. } => StackscoutError::Io(source),
        }
    }
}
