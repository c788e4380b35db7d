//! 설정 관리 -- stackscout.toml 파싱 및 런타임 설정
//!
//! [`StackscoutConfig`]는 모든 컴포넌트의 설정을 담는 최상위 구조체입니다.
//!
//! # 설정 로딩 우선순위
//! 1. CLI 인자 (최고 우선)
//! 2. 환경변수 (`STACKSCOUT_COLLECTOR_WORKERS=8` 형식)
//! 3. 설정 파일 (`stackscout.toml`)
//! 4. 기본값 (`Default` 구현)
//!
//! # 사용 예시
//! ```no_run
//! # async fn example() -> Result<(), stackscout_core::error::StackscoutError> {
//! use stackscout_core::config::StackscoutConfig;
//!
//! // 파일에서 로드 + 환경변수 오버라이드
//! let config = StackscoutConfig::load("stackscout.toml").await?;
//!
//! // TOML 문자열에서 직접 파싱
//! let config = StackscoutConfig::parse("[collector]\nworkers = 8")?;
//! # Ok(())
//! # }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ConfigError, StackscoutError};
use crate::types::Source;

/// 워커 수 상한
pub const MAX_WORKERS: usize = 256;
/// 큐 용량 상한
pub const MAX_QUEUE_CAPACITY: usize = 1_000_000;
/// 재시도 횟수 상한
pub const MAX_RETRY_ATTEMPTS: u32 = 10;

/// 소스별 기본 레지스트리 주소
pub fn default_base_url(source: Source) -> &'static str {
    match source {
        Source::Pypi => "https://pypi.org/pypi",
        Source::Npm => "https://registry.npmjs.org",
        Source::Dockerhub => "https://hub.docker.com/v2/repositories",
    }
}

/// StackScout 통합 설정
///
/// `stackscout.toml` 파일의 최상위 구조를 나타냅니다.
/// 각 컴포넌트는 자기 섹션만 읽어 사용합니다.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StackscoutConfig {
    /// 일반 설정
    #[serde(default)]
    pub general: GeneralConfig,
    /// 수집 파이프라인 설정
    #[serde(default)]
    pub collector: CollectorConfig,
    /// 소스별 설정
    #[serde(default)]
    pub sources: SourcesConfig,
    /// 라이선스 정규화 추가 규칙
    #[serde(default)]
    pub license: LicenseConfig,
    /// Prometheus 메트릭 설정
    #[serde(default)]
    pub metrics: MetricsConfig,
}

impl StackscoutConfig {
    /// TOML 파일에서 설정을 로드하고 환경변수 오버라이드를 적용합니다.
    ///
    /// 설정 로딩 순서:
    /// 1. TOML 파일 파싱
    /// 2. 환경변수 오버라이드 적용
    /// 3. 유효성 검증
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, StackscoutError> {
        let mut config = Self::from_file(path).await?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// TOML 파일에서 설정을 로드합니다 (환경변수 오버라이드 없음).
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, StackscoutError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                StackscoutError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                StackscoutError::Io(e)
            }
        })?;
        Self::parse(&content)
    }

    /// TOML 문자열에서 설정을 파싱합니다.
    pub fn parse(toml_str: &str) -> Result<Self, StackscoutError> {
        toml::from_str(toml_str).map_err(|e| {
            StackscoutError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// 환경변수로 설정값을 오버라이드합니다.
    ///
    /// 환경변수 네이밍 규칙: `STACKSCOUT_{SECTION}_{FIELD}`
    /// 예: `STACKSCOUT_COLLECTOR_WORKERS=8`, `STACKSCOUT_SOURCES_PYPI_ENABLED=false`
    pub fn apply_env_overrides(&mut self) {
        // General
        override_string(&mut self.general.log_level, "STACKSCOUT_GENERAL_LOG_LEVEL");
        override_string(&mut self.general.log_format, "STACKSCOUT_GENERAL_LOG_FORMAT");
        override_string(&mut self.general.data_dir, "STACKSCOUT_GENERAL_DATA_DIR");
        override_string(&mut self.general.pid_file, "STACKSCOUT_GENERAL_PID_FILE");

        // Collector
        override_usize(&mut self.collector.workers, "STACKSCOUT_COLLECTOR_WORKERS");
        override_usize(
            &mut self.collector.queue_capacity,
            "STACKSCOUT_COLLECTOR_QUEUE_CAPACITY",
        );
        override_string(
            &mut self.collector.overflow_policy,
            "STACKSCOUT_COLLECTOR_OVERFLOW_POLICY",
        );
        override_u64(
            &mut self.collector.request_timeout_secs,
            "STACKSCOUT_COLLECTOR_REQUEST_TIMEOUT_SECS",
        );
        override_u64(
            &mut self.collector.collect_timeout_secs,
            "STACKSCOUT_COLLECTOR_COLLECT_TIMEOUT_SECS",
        );
        override_u32(
            &mut self.collector.retry_max_attempts,
            "STACKSCOUT_COLLECTOR_RETRY_MAX_ATTEMPTS",
        );
        override_u64(
            &mut self.collector.retry_base_delay_ms,
            "STACKSCOUT_COLLECTOR_RETRY_BASE_DELAY_MS",
        );
        override_u64(
            &mut self.collector.retry_max_delay_ms,
            "STACKSCOUT_COLLECTOR_RETRY_MAX_DELAY_MS",
        );
        override_string(
            &mut self.collector.user_agent,
            "STACKSCOUT_COLLECTOR_USER_AGENT",
        );
        override_bool(&mut self.collector.snapshot, "STACKSCOUT_COLLECTOR_SNAPSHOT");

        // Sources
        for source in Source::ALL {
            let prefix = format!("STACKSCOUT_SOURCES_{}", source.as_str().to_uppercase());
            let section = self.sources.get_mut(source);
            override_bool(&mut section.enabled, &format!("{prefix}_ENABLED"));
            override_string(&mut section.base_url, &format!("{prefix}_BASE_URL"));
            override_u64(
                &mut section.refresh_interval_secs,
                &format!("{prefix}_REFRESH_INTERVAL_SECS"),
            );
            override_csv(&mut section.seed_packages, &format!("{prefix}_SEED_PACKAGES"));
        }

        // Metrics
        override_bool(&mut self.metrics.enabled, "STACKSCOUT_METRICS_ENABLED");
        override_string(&mut self.metrics.listen_addr, "STACKSCOUT_METRICS_LISTEN_ADDR");
        override_u16(&mut self.metrics.port, "STACKSCOUT_METRICS_PORT");
        override_string(&mut self.metrics.endpoint, "STACKSCOUT_METRICS_ENDPOINT");
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), StackscoutError> {
        // log_level 검증
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            return Err(invalid(
                "general.log_level",
                format!("must be one of: {}", valid_levels.join(", ")),
            ));
        }

        // log_format 검증
        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.general.log_format.as_str()) {
            return Err(invalid(
                "general.log_format",
                format!("must be one of: {}", valid_formats.join(", ")),
            ));
        }

        // 수집기 검증
        let c = &self.collector;
        if c.workers == 0 || c.workers > MAX_WORKERS {
            return Err(invalid(
                "collector.workers",
                format!("must be between 1 and {MAX_WORKERS}"),
            ));
        }
        if c.queue_capacity == 0 || c.queue_capacity > MAX_QUEUE_CAPACITY {
            return Err(invalid(
                "collector.queue_capacity",
                format!("must be between 1 and {MAX_QUEUE_CAPACITY}"),
            ));
        }
        let valid_policies = ["block", "reject"];
        if !valid_policies.contains(&c.overflow_policy.as_str()) {
            return Err(invalid(
                "collector.overflow_policy",
                format!("must be one of: {}", valid_policies.join(", ")),
            ));
        }
        if c.request_timeout_secs == 0 {
            return Err(invalid(
                "collector.request_timeout_secs",
                "must be greater than 0".to_owned(),
            ));
        }
        if c.collect_timeout_secs == 0 {
            return Err(invalid(
                "collector.collect_timeout_secs",
                "must be greater than 0".to_owned(),
            ));
        }
        if c.retry_max_attempts == 0 || c.retry_max_attempts > MAX_RETRY_ATTEMPTS {
            return Err(invalid(
                "collector.retry_max_attempts",
                format!("must be between 1 and {MAX_RETRY_ATTEMPTS}"),
            ));
        }
        if c.retry_base_delay_ms > c.retry_max_delay_ms {
            return Err(invalid(
                "collector.retry_base_delay_ms",
                "must not exceed retry_max_delay_ms".to_owned(),
            ));
        }

        // 소스 검증
        for source in Source::ALL {
            let section = self.sources.get(source);
            if !section.base_url.is_empty()
                && !(section.base_url.starts_with("http://")
                    || section.base_url.starts_with("https://"))
            {
                return Err(invalid(
                    &format!("sources.{source}.base_url"),
                    "must start with http:// or https://".to_owned(),
                ));
            }
            if section.seed_packages.iter().any(|p| p.trim().is_empty()) {
                return Err(invalid(
                    &format!("sources.{source}.seed_packages"),
                    "must not contain blank names".to_owned(),
                ));
            }
        }

        // 라이선스 규칙 검증
        for (i, rule) in self.license.rules.iter().enumerate() {
            if rule.canonical.trim().is_empty() {
                return Err(invalid(
                    &format!("license.rules[{i}].canonical"),
                    "must not be empty".to_owned(),
                ));
            }
            if rule.exact.is_empty() == rule.contains.is_empty() {
                return Err(invalid(
                    &format!("license.rules[{i}]"),
                    "exactly one of 'exact' or 'contains' must be set".to_owned(),
                ));
            }
        }

        // 메트릭 검증
        if self.metrics.enabled && self.metrics.port == 0 {
            return Err(invalid("metrics.port", "must not be 0".to_owned()));
        }

        Ok(())
    }
}

fn invalid(field: &str, reason: String) -> StackscoutError {
    ConfigError::InvalidValue {
        field: field.to_owned(),
        reason,
    }
    .into()
}

/// 일반 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// 로그 레벨 (trace, debug, info, warn, error)
    pub log_level: String,
    /// 로그 형식 (json, pretty)
    pub log_format: String,
    /// 데이터 디렉토리 (카탈로그 스냅샷 저장 위치)
    pub data_dir: String,
    /// PID 파일 경로
    pub pid_file: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            log_format: "json".to_owned(),
            data_dir: "/var/lib/stackscout".to_owned(),
            pid_file: "/var/run/stackscout.pid".to_owned(),
        }
    }
}

/// 수집 파이프라인 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectorConfig {
    /// 동시 소비자(워커) 수
    pub workers: usize,
    /// 작업 큐 용량
    pub queue_capacity: usize,
    /// 큐가 가득 찼을 때 정책 (block, reject)
    pub overflow_policy: String,
    /// HTTP 요청 타임아웃 (초)
    pub request_timeout_secs: u64,
    /// 항목 하나의 수집 시도 타임아웃 (초)
    pub collect_timeout_secs: u64,
    /// 일시적 실패 시 최대 시도 횟수 (첫 시도 포함)
    pub retry_max_attempts: u32,
    /// 재시도 기본 지연 (밀리초)
    pub retry_base_delay_ms: u64,
    /// 재시도 최대 지연 (밀리초)
    pub retry_max_delay_ms: u64,
    /// HTTP User-Agent
    pub user_agent: String,
    /// 데몬 종료 시 카탈로그 스냅샷 저장 여부
    pub snapshot: bool,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            queue_capacity: 1024,
            overflow_policy: "block".to_owned(),
            request_timeout_secs: 10,
            collect_timeout_secs: 30,
            retry_max_attempts: 3,
            retry_base_delay_ms: 500,
            retry_max_delay_ms: 10_000,
            user_agent: concat!("stackscout/", env!("CARGO_PKG_VERSION")).to_owned(),
            snapshot: true,
        }
    }
}

/// 소스별 설정 묶음
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SourcesConfig {
    /// PyPI
    pub pypi: SourceConfig,
    /// npm
    pub npm: SourceConfig,
    /// Docker Hub
    pub dockerhub: SourceConfig,
}

impl SourcesConfig {
    /// 소스에 해당하는 섹션을 반환합니다.
    pub fn get(&self, source: Source) -> &SourceConfig {
        match source {
            Source::Pypi => &self.pypi,
            Source::Npm => &self.npm,
            Source::Dockerhub => &self.dockerhub,
        }
    }

    /// 소스에 해당하는 섹션을 가변으로 반환합니다.
    pub fn get_mut(&mut self, source: Source) -> &mut SourceConfig {
        match source {
            Source::Pypi => &mut self.pypi,
            Source::Npm => &mut self.npm,
            Source::Dockerhub => &mut self.dockerhub,
        }
    }

    /// 활성화된 소스 목록
    pub fn enabled(&self) -> Vec<Source> {
        Source::ALL
            .into_iter()
            .filter(|s| self.get(*s).enabled)
            .collect()
    }
}

/// 단일 소스 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// 활성화 여부
    pub enabled: bool,
    /// 레지스트리 주소 (비어 있으면 소스 기본값)
    pub base_url: String,
    /// 카탈로그 갱신 주기 (초, 0이면 비활성화)
    pub refresh_interval_secs: u64,
    /// 데몬 시작 시 수집할 패키지 목록
    pub seed_packages: Vec<String>,
}

impl SourceConfig {
    /// 실제로 사용할 레지스트리 주소를 반환합니다.
    pub fn base_url_or_default(&self, source: Source) -> &str {
        if self.base_url.is_empty() {
            default_base_url(source)
        } else {
            &self.base_url
        }
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: String::new(),
            refresh_interval_secs: 86_400,
            seed_packages: Vec::new(),
        }
    }
}

/// 라이선스 정규화 설정
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LicenseConfig {
    /// 기본 규칙 뒤에 평가되는 추가 규칙
    pub rules: Vec<LicenseRuleConfig>,
}

/// 라이선스 정규화 규칙 (TOML 표현)
///
/// `exact`와 `contains` 중 정확히 하나만 지정해야 합니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LicenseRuleConfig {
    /// 정규화 결과 식별자
    pub canonical: String,
    /// 정확히 일치해야 하는 문구 목록 (대소문자 무시)
    #[serde(default)]
    pub exact: Vec<String>,
    /// 모두 포함되어야 하는 부분 문자열 목록 (대소문자 무시)
    #[serde(default)]
    pub contains: Vec<String>,
}

/// Prometheus 메트릭 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// 활성화 여부
    pub enabled: bool,
    /// 리스닝 주소
    pub listen_addr: String,
    /// 리스닝 포트
    pub port: u16,
    /// 스크레이프 경로
    pub endpoint: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            listen_addr: "127.0.0.1".to_owned(),
            port: 9100,
            endpoint: "/metrics".to_owned(),
        }
    }
}

// --- 환경변수 오버라이드 헬퍼 ---

fn override_string(target: &mut String, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val;
    }
}

fn override_bool(target: &mut bool, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<bool>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse bool from env var, ignoring"
            ),
        }
    }
}

fn override_usize(target: &mut usize, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<usize>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse usize from env var, ignoring"
            ),
        }
    }
}

fn override_u16(target: &mut u16, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u16>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u16 from env var, ignoring"
            ),
        }
    }
}

fn override_u32(target: &mut u32, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u32>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u32 from env var, ignoring"
            ),
        }
    }
}

fn override_u64(target: &mut u64, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u64>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u64 from env var, ignoring"
            ),
        }
    }
}

fn override_csv(target: &mut Vec<String>, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val
            .split(',')
            .map(|s| s.trim().to_owned())
            .filter(|s| !s.is_empty())
            .collect();
    }
}
