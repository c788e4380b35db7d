//! 도메인 타입 -- 시스템 전역에서 사용되는 공통 타입
//!
//! 수집기, 작업 관리자, 카탈로그 저장소, 데몬과 CLI가 공유하는
//! 데이터 구조를 정의합니다.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::CollectError;

/// 메타데이터 소스 (패키지/이미지 레지스트리)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    /// Python 패키지 인덱스
    Pypi,
    /// npm 레지스트리
    Npm,
    /// 컨테이너 이미지 레지스트리
    Dockerhub,
}

impl Source {
    /// 지원하는 모든 소스
    pub const ALL: [Source; 3] = [Source::Pypi, Source::Npm, Source::Dockerhub];

    /// 문자열에서 소스를 파싱합니다.
    ///
    /// 대소문자와 앞뒤 공백을 무시하며 `docker`는 `dockerhub`의 별칭입니다.
    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "pypi" => Some(Self::Pypi),
            "npm" => Some(Self::Npm),
            "docker" | "dockerhub" => Some(Self::Dockerhub),
            _ => None,
        }
    }

    /// 설정 키와 메트릭 레이블에 쓰는 이름
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pypi => "pypi",
            Self::Npm => "npm",
            Self::Dockerhub => "dockerhub",
        }
    }
}

impl FromStr for Source {
    type Err = CollectError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_str_loose(s)
            .ok_or_else(|| CollectError::Validation(format!("unsupported source: '{s}'")))
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 스캔 작업 상태
///
/// `Completed`, `Failed`, `Cancelled`는 종료 상태이며 이후 어떤 변경도 허용되지 않습니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    /// 생성됨, 아직 처리된 항목 없음
    Pending,
    /// 처리 중
    Running,
    /// 모든 항목 성공
    Completed,
    /// 하나 이상의 항목 실패 또는 외부에서 실패 처리
    Failed,
    /// 외부 요청으로 취소됨
    Cancelled,
}

impl JobStatus {
    /// 모든 상태 (생명주기 순서)
    pub const ALL: [JobStatus; 5] = [
        JobStatus::Pending,
        JobStatus::Running,
        JobStatus::Completed,
        JobStatus::Failed,
        JobStatus::Cancelled,
    ];

    /// 종료 상태인지 확인합니다.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }

    /// `self`에서 `next`로의 전이가 허용되는지 확인합니다.
    ///
    /// 같은 상태로의 전이는 여기서 다루지 않습니다 (호출자가 no-op으로 처리).
    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        match self {
            Self::Pending => matches!(next, Self::Running | Self::Failed | Self::Cancelled),
            Self::Running => matches!(next, Self::Completed | Self::Failed | Self::Cancelled),
            Self::Completed | Self::Failed | Self::Cancelled => false,
        }
    }

    /// 문자열에서 상태를 파싱합니다 (대소문자 무시).
    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "PENDING" => Some(Self::Pending),
            "RUNNING" => Some(Self::Running),
            "COMPLETED" => Some(Self::Completed),
            "FAILED" => Some(Self::Failed),
            "CANCELLED" | "CANCELED" => Some(Self::Cancelled),
            _ => None,
        }
    }

    /// 표시용 이름
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Running => "RUNNING",
            Self::Completed => "COMPLETED",
            Self::Failed => "FAILED",
            Self::Cancelled => "CANCELLED",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 스캔 작업
///
/// 작업 관리자가 단독으로 소유합니다. 외부에는 복제본만 전달됩니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanJob {
    /// 작업 ID (UUID v4)
    pub id: Uuid,
    /// 대상 소스
    pub source: Source,
    /// 현재 상태
    pub status: JobStatus,
    /// 목표 항목 수 (알 수 없으면 `None`)
    pub packages_count: Option<u64>,
    /// 성공한 항목 수
    pub processed_count: u64,
    /// 실패한 항목 수
    pub failed_count: u64,
    /// PENDING → RUNNING 전이 시각
    pub started_at: Option<DateTime<Utc>>,
    /// COMPLETED/FAILED 전이 시각
    pub completed_at: Option<DateTime<Utc>>,
    /// 실패 사유
    pub error_message: Option<String>,
    /// 실패한 패키지 이름 (상한 있음)
    #[serde(default)]
    pub failed_packages: Vec<String>,
    /// 생성 시각
    pub created_at: DateTime<Utc>,
    /// 마지막 변경 시각
    pub updated_at: DateTime<Utc>,
}

impl ScanJob {
    /// 새 PENDING 작업을 생성합니다.
    pub fn new(source: Source, packages_count: Option<u64>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            source,
            status: JobStatus::Pending,
            packages_count,
            processed_count: 0,
            failed_count: 0,
            started_at: None,
            completed_at: None,
            error_message: None,
            failed_packages: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// 처리 완료된 항목 수 (성공 + 실패)
    pub fn accounted(&self) -> u64 {
        self.processed_count + self.failed_count
    }

    /// 진행률 (0.0 ~ 100.0)
    ///
    /// 목표 항목 수를 모르거나 0이면 0을 반환합니다.
    pub fn progress(&self) -> f64 {
        match self.packages_count {
            Some(count) if count > 0 => self.processed_count as f64 * 100.0 / count as f64,
            _ => 0.0,
        }
    }
}

impl fmt::Display for ScanJob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let total = self
            .packages_count
            .map(|c| c.to_string())
            .unwrap_or_else(|| "?".to_owned());
        write!(
            f,
            "[{}] {} {} ok={} failed={} total={}",
            self.status, self.id, self.source, self.processed_count, self.failed_count, total,
        )
    }
}

/// 항목 처리 결과
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOutcome {
    /// 수집 및 저장 성공
    Success,
    /// 수집 또는 저장 실패
    Failure,
}

/// 수집기 출력 -- 소스별 응답을 공통 형태로 매핑한 메타데이터
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageMetadata {
    /// 카탈로그 이름 (자연 키)
    pub name: String,
    /// 버전
    pub version: String,
    /// 소스
    pub source: Source,
    /// 소스가 보고한 원본 라이선스 문자열
    pub license: Option<String>,
    /// 설명
    pub description: Option<String>,
    /// 저장소 URL
    pub repository: Option<String>,
    /// 마지막 릴리스 시각 (소스가 준 그대로의 문자열)
    pub last_release: Option<String>,
}

/// 카탈로그 엔트리
///
/// `name`당 정확히 하나만 존재합니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogEntry {
    /// 저장소가 할당한 ID
    pub id: u64,
    /// 이름 (고유)
    pub name: String,
    /// 버전
    pub version: String,
    /// 소스
    pub source: Source,
    /// 정규화된 라이선스
    pub license: Option<String>,
    /// 건강도 점수 (0~100)
    pub health_score: u8,
    /// 마지막 릴리스 시각
    pub last_release: Option<String>,
    /// 저장소 URL
    pub repository: Option<String>,
    /// 설명
    pub description: Option<String>,
    /// 생성 시각
    pub created_at: DateTime<Utc>,
    /// 마지막 갱신 시각
    pub updated_at: DateTime<Utc>,
}

impl fmt::Display for CatalogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}@{} ({}) license={} score={}",
            self.name,
            self.version,
            self.source,
            self.license.as_deref().unwrap_or("-"),
            self.health_score,
        )
    }
}

/// 작업 큐 메시지
///
/// JSON 형식: `{"source": "pypi", "packageName": "requests", "jobId": "..."}`.
/// 소스는 소비자에서 검증하도록 문자열로 유지합니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanMessage {
    /// 소스 이름
    pub source: String,
    /// 패키지 이름
    pub package_name: String,
    /// 연결된 스캔 작업 ID
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_id: Option<Uuid>,
}

impl ScanMessage {
    /// 새 메시지를 생성합니다.
    pub fn new(source: Source, package_name: impl Into<String>, job_id: Option<Uuid>) -> Self {
        Self {
            source: source.as_str().to_owned(),
            package_name: package_name.into(),
            job_id,
        }
    }
}
