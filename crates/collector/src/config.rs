//! 수집 서비스 설정
//!
//! [`ServiceConfig`]는 core의 [`CollectorConfig`](stackscout_core::config::CollectorConfig)와
//! 소스별 갱신 주기를 타입이 있는 형태로 변환합니다.
//!
//! # 사용 예시
//!
//! ```
//! use stackscout_collector::{OverflowPolicy, ServiceConfigBuilder};
//!
//! let config = ServiceConfigBuilder::new()
//!     .workers(2)
//!     .queue_capacity(16)
//!     .overflow_policy(OverflowPolicy::Reject)
//!     .build()
//!     .unwrap();
//! assert_eq!(config.workers, 2);
//! ```

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use stackscout_core::config::{MAX_QUEUE_CAPACITY, MAX_RETRY_ATTEMPTS, MAX_WORKERS, StackscoutConfig};
use stackscout_core::types::Source;

use crate::error::CollectorError;

/// 최소 갱신 주기 (초)
const MIN_REFRESH_INTERVAL_SECS: u64 = 60;

/// 큐가 가득 찼을 때의 동작
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverflowPolicy {
    /// 공간이 생길 때까지 생산자가 대기
    #[default]
    Block,
    /// 즉시 거부 (작업에 연결된 항목은 실패로 집계)
    Reject,
}

impl OverflowPolicy {
    /// 문자열에서 정책을 파싱합니다 (대소문자 무시).
    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "block" => Some(Self::Block),
            "reject" => Some(Self::Reject),
            _ => None,
        }
    }
}

/// 일시적 실패 재시도 정책 (지수 백오프)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// 최대 시도 횟수 (첫 시도 포함)
    pub max_attempts: u32,
    /// 첫 재시도 전 지연
    pub base_delay: Duration,
    /// 지연 상한
    pub max_delay: Duration,
}

impl RetryPolicy {
    /// `attempt`번째 시도가 실패한 뒤 기다릴 시간을 계산합니다 (1부터 시작).
    ///
    /// `base_delay * 2^(attempt-1)`, 상한은 `max_delay`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        self.base_delay
            .checked_mul(1u32 << exponent)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(10),
        }
    }
}

/// 수집 서비스 설정
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// 동시 워커 수
    pub workers: usize,
    /// 작업 큐 용량
    pub queue_capacity: usize,
    /// 큐 초과 정책
    pub overflow_policy: OverflowPolicy,
    /// 항목 하나의 수집 시도 타임아웃
    pub collect_timeout: Duration,
    /// 재시도 정책
    pub retry: RetryPolicy,
    /// 소스별 카탈로그 갱신 주기 (없으면 주기 갱신 안 함)
    pub refresh_intervals: BTreeMap<Source, Duration>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            queue_capacity: 1024,
            overflow_policy: OverflowPolicy::Block,
            collect_timeout: Duration::from_secs(30),
            retry: RetryPolicy::default(),
            refresh_intervals: BTreeMap::new(),
        }
    }
}

impl ServiceConfig {
    /// core 설정에서 서비스 설정을 생성합니다.
    ///
    /// 활성화된 소스 중 `refresh_interval_secs > 0`인 소스만 주기 갱신 대상이 됩니다.
    pub fn from_core(core: &StackscoutConfig) -> Result<Self, CollectorError> {
        let c = &core.collector;
        let overflow_policy =
            OverflowPolicy::from_str_loose(&c.overflow_policy).ok_or_else(|| {
                CollectorError::Config {
                    field: "overflow_policy".to_owned(),
                    reason: format!("unknown policy '{}'", c.overflow_policy),
                }
            })?;

        let refresh_intervals = core
            .sources
            .enabled()
            .into_iter()
            .filter_map(|source| {
                let secs = core.sources.get(source).refresh_interval_secs;
                (secs > 0).then(|| (source, Duration::from_secs(secs)))
            })
            .collect();

        let config = Self {
            workers: c.workers,
            queue_capacity: c.queue_capacity,
            overflow_policy,
            collect_timeout: Duration::from_secs(c.collect_timeout_secs),
            retry: RetryPolicy {
                max_attempts: c.retry_max_attempts,
                base_delay: Duration::from_millis(c.retry_base_delay_ms),
                max_delay: Duration::from_millis(c.retry_max_delay_ms),
            },
            refresh_intervals,
        };
        config.validate()?;
        Ok(config)
    }

    /// 설정 값의 유효성을 검증합니다.
    ///
    /// # 검증 규칙
    ///
    /// - `workers`: 1 ~ 256
    /// - `queue_capacity`: 1 ~ 1,000,000
    /// - `collect_timeout`: 0보다 커야 함
    /// - `retry.max_attempts`: 1 ~ 10, `base_delay <= max_delay`
    /// - 갱신 주기: 60초 이상
    pub fn validate(&self) -> Result<(), CollectorError> {
        if self.workers == 0 || self.workers > MAX_WORKERS {
            return Err(CollectorError::Config {
                field: "workers".to_owned(),
                reason: format!("must be 1-{MAX_WORKERS}"),
            });
        }

        if self.queue_capacity == 0 || self.queue_capacity > MAX_QUEUE_CAPACITY {
            return Err(CollectorError::Config {
                field: "queue_capacity".to_owned(),
                reason: format!("must be 1-{MAX_QUEUE_CAPACITY}"),
            });
        }

        if self.collect_timeout.is_zero() {
            return Err(CollectorError::Config {
                field: "collect_timeout".to_owned(),
                reason: "must be greater than 0".to_owned(),
            });
        }

        if self.retry.max_attempts == 0 || self.retry.max_attempts > MAX_RETRY_ATTEMPTS {
            return Err(CollectorError::Config {
                field: "retry.max_attempts".to_owned(),
                reason: format!("must be 1-{MAX_RETRY_ATTEMPTS}"),
            });
        }

        if self.retry.base_delay > self.retry.max_delay {
            return Err(CollectorError::Config {
                field: "retry.base_delay".to_owned(),
                reason: "must not exceed retry.max_delay".to_owned(),
            });
        }

        for (source, interval) in &self.refresh_intervals {
            if interval.as_secs() < MIN_REFRESH_INTERVAL_SECS {
                return Err(CollectorError::Config {
                    field: format!("refresh_intervals.{source}"),
                    reason: format!("must be at least {MIN_REFRESH_INTERVAL_SECS} seconds"),
                });
            }
        }

        Ok(())
    }
}

/// [`ServiceConfig`] 빌더
#[derive(Default)]
pub struct ServiceConfigBuilder {
    config: ServiceConfig,
}

impl ServiceConfigBuilder {
    /// 기본값을 가진 새 빌더를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 워커 수를 설정합니다.
    pub fn workers(mut self, workers: usize) -> Self {
        self.config.workers = workers;
        self
    }

    /// 큐 용량을 설정합니다.
    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.config.queue_capacity = capacity;
        self
    }

    /// 큐 초과 정책을 설정합니다.
    pub fn overflow_policy(mut self, policy: OverflowPolicy) -> Self {
        self.config.overflow_policy = policy;
        self
    }

    /// 수집 타임아웃을 설정합니다.
    pub fn collect_timeout(mut self, timeout: Duration) -> Self {
        self.config.collect_timeout = timeout;
        self
    }

    /// 재시도 정책을 설정합니다.
    pub fn retry(mut self, retry: RetryPolicy) -> Self {
        self.config.retry = retry;
        self
    }

    /// 소스의 갱신 주기를 설정합니다.
    pub fn refresh_interval(mut self, source: Source, interval: Duration) -> Self {
        self.config.refresh_intervals.insert(source, interval);
        self
    }

    /// 설정을 검증하고 빌드합니다.
    ///
    /// # Errors
    ///
    /// 유효성 검증 실패 시 `CollectorError::Config` 반환
    pub fn build(self) -> Result<ServiceConfig, CollectorError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        ServiceConfig::default().validate().unwrap();
    }

    #[test]
    fn from_core_maps_values() {
        let mut core = StackscoutConfig::default();
        core.collector.workers = 8;
        core.collector.overflow_policy = "reject".to_owned();
        core.collector.retry_base_delay_ms = 100;
        core.sources.npm.enabled = false;
        core.sources.dockerhub.refresh_interval_secs = 0;

        let config = ServiceConfig::from_core(&core).unwrap();
        assert_eq!(config.workers, 8);
        assert_eq!(config.overflow_policy, OverflowPolicy::Reject);
        assert_eq!(config.retry.base_delay, Duration::from_millis(100));
        assert_eq!(
            config.refresh_intervals.keys().copied().collect::<Vec<_>>(),
            vec![Source::Pypi]
        );
    }

    #[test]
    fn from_core_rejects_unknown_policy() {
        let mut core = StackscoutConfig::default();
        core.collector.overflow_policy = "spill".to_owned();
        assert!(ServiceConfig::from_core(&core).is_err());
    }

    #[test]
    fn validate_rejects_zero_workers() {
        let config = ServiceConfig {
            workers: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_short_refresh_interval() {
        let result = ServiceConfigBuilder::new()
            .refresh_interval(Source::Pypi, Duration::from_secs(5))
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn validate_rejects_zero_max_attempts() {
        let result = ServiceConfigBuilder::new()
            .retry(RetryPolicy {
                max_attempts: 0,
                ..Default::default()
            })
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn retry_delay_grows_exponentially_and_caps() {
        let policy = RetryPolicy {
            max_attempts: 5,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(350),
        };
        assert_eq!(policy.delay_for(1), Duration::from_millis(100));
        assert_eq!(policy.delay_for(2), Duration::from_millis(200));
        assert_eq!(policy.delay_for(3), Duration::from_millis(350));
        assert_eq!(policy.delay_for(40), Duration::from_millis(350));
    }

    #[test]
    fn overflow_policy_parse() {
        assert_eq!(OverflowPolicy::from_str_loose("Block"), Some(OverflowPolicy::Block));
        assert_eq!(OverflowPolicy::from_str_loose("reject"), Some(OverflowPolicy::Reject));
        assert_eq!(OverflowPolicy::from_str_loose("drop"), None);
    }
}
