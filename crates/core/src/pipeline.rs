//! 파이프라인 trait -- 장기 실행 컴포넌트의 생명주기 정의
//!
//! 수집 서비스(워커 풀 + 스케줄러)처럼 백그라운드 태스크를 소유하는
//! 컴포넌트는 [`Pipeline`]을 구현합니다. 데몬은 [`DynPipeline`]으로
//! 이들을 동적으로 관리합니다.

use std::future::Future;
use std::pin::Pin;

use serde::Serialize;

use crate::error::StackscoutError;

/// `Send` 가능한 boxed future
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// 컴포넌트 건강 상태
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum HealthStatus {
    /// 정상
    Healthy,
    /// 동작하지만 성능 저하 또는 부분 장애
    Degraded(String),
    /// 동작 불가
    Unhealthy(String),
}

impl HealthStatus {
    /// 정상 상태인지 확인합니다.
    pub fn is_healthy(&self) -> bool {
        matches!(self, Self::Healthy)
    }

    /// 동작 불가 상태인지 확인합니다.
    pub fn is_unhealthy(&self) -> bool {
        matches!(self, Self::Unhealthy(_))
    }
}

/// 장기 실행 컴포넌트의 생명주기 trait
///
/// # 생명주기
/// ```text
/// Initialized → start() → Running → stop() → Stopped
/// ```
///
/// 이미 실행 중일 때 `start()`는 `PipelineError::AlreadyRunning`,
/// 실행 중이 아닐 때 `stop()`은 `PipelineError::NotRunning`을 반환해야 합니다.
pub trait Pipeline: Send + Sync {
    /// 백그라운드 태스크를 시작합니다.
    fn start(&mut self) -> impl Future<Output = Result<(), StackscoutError>> + Send;

    /// 백그라운드 태스크를 정지합니다.
    fn stop(&mut self) -> impl Future<Output = Result<(), StackscoutError>> + Send;

    /// 건강 상태를 확인합니다.
    fn health_check(&self) -> impl Future<Output = HealthStatus> + Send;
}

/// dyn-compatible 파이프라인 trait
///
/// `Pipeline`은 RPITIT를 사용하므로 `dyn Pipeline`이 불가합니다.
pub trait DynPipeline: Send + Sync {
    /// 백그라운드 태스크를 시작합니다.
    fn start(&mut self) -> BoxFuture<'_, Result<(), StackscoutError>>;

    /// 백그라운드 태스크를 정지합니다.
    fn stop(&mut self) -> BoxFuture<'_, Result<(), StackscoutError>>;

    /// 건강 상태를 확인합니다.
    fn health_check(&self) -> BoxFuture<'_, HealthStatus>;
}

impl<T: Pipeline> DynPipeline for T {
    fn start(&mut self) -> BoxFuture<'_, Result<(), StackscoutError>> {
        Box::pin(Pipeline::start(self))
    }

    fn stop(&mut self) -> BoxFuture<'_, Result<(), StackscoutError>> {
        Box::pin(Pipeline::stop(self))
    }

    fn health_check(&self) -> BoxFuture<'_, HealthStatus> {
        Box::pin(Pipeline::health_check(self))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PipelineError;

    struct Toggle {
        running: bool,
    }

    impl Pipeline for Toggle {
        async fn start(&mut self) -> Result<(), StackscoutError> {
            if self.running {
                return Err(PipelineError::AlreadyRunning.into());
            }
            self.running = true;
            Ok(())
        }

        async fn stop(&mut self) -> Result<(), StackscoutError> {
            if !self.running {
                return Err(PipelineError::NotRunning.into());
            }
            self.running = false;
            Ok(())
        }

        async fn health_check(&self) -> HealthStatus {
            if self.running {
                HealthStatus::Healthy
            } else {
                HealthStatus::Unhealthy("stopped".to_owned())
            }
        }
    }

    #[tokio::test]
    async fn dyn_pipeline_delegates_to_pipeline() {
        let mut boxed: Box<dyn DynPipeline> = Box::new(Toggle { running: false });
        assert!(boxed.health_check().await.is_unhealthy());
        boxed.start().await.unwrap();
        assert!(boxed.health_check().await.is_healthy());
        assert!(boxed.start().await.is_err());
        boxed.stop().await.unwrap();
        assert!(boxed.stop().await.is_err());
    }

    #[test]
    fn health_status_predicates() {
        assert!(HealthStatus::Healthy.is_healthy());
        assert!(!HealthStatus::Degraded("slow".into()).is_healthy());
        assert!(!HealthStatus::Degraded("slow".into()).is_unhealthy());
        assert!(HealthStatus::Unhealthy("down".into()).is_unhealthy());
    }
}
