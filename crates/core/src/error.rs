//! 에러 타입 -- 도메인별 에러 정의

/// StackScout 최상위 에러 타입
#[derive(Debug, thiserror::Error)]
pub enum StackscoutError {
    /// 설정 관련 에러
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// 파이프라인 생명주기 에러
    #[error("pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// 패키지 수집 에러
    #[error("collect error: {0}")]
    Collect(#[from] CollectError),

    /// 스캔 작업 에러
    #[error("job error: {0}")]
    Job(#[from] JobError),

    /// 스토리지 에러
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// 설정 관련 에러
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// 설정 파일을 찾을 수 없음
    #[error("config file not found: {path}")]
    FileNotFound { path: String },

    /// 설정 파싱 실패
    #[error("failed to parse config: {reason}")]
    ParseFailed { reason: String },

    /// 유효하지 않은 설정 값
    #[error("invalid config value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// 파이프라인 생명주기 에러
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// 채널 전송 실패
    #[error("channel send failed: {0}")]
    ChannelSend(String),

    /// 파이프라인 초기화 실패
    #[error("pipeline init failed: {0}")]
    InitFailed(String),

    /// 이미 실행 중
    #[error("pipeline is already running")]
    AlreadyRunning,

    /// 실행 중이 아님
    #[error("pipeline is not running")]
    NotRunning,
}

/// 패키지 수집 에러
///
/// 수집 실패의 세 가지 분류를 나타냅니다.
/// `NotFound`는 재시도하지 않고, `Transient`는 재시도 대상입니다.
#[derive(Debug, thiserror::Error)]
pub enum CollectError {
    /// 레지스트리가 패키지 부재를 확인함
    #[error("package not found: {source_name}/{name}")]
    NotFound { source_name: String, name: String },

    /// 네트워크, 파싱, 타임아웃 등 일시적 실패
    #[error("transient failure for {source_name}/{name}: {reason}")]
    Transient {
        source_name: String,
        name: String,
        reason: String,
    },

    /// 지원하지 않는 소스 또는 잘못된 요청
    #[error("validation failed: {0}")]
    Validation(String),
}

/// 스캔 작업 에러
#[derive(Debug, thiserror::Error)]
pub enum JobError {
    /// 작업을 찾을 수 없음
    #[error("scan job not found: {id}")]
    NotFound { id: String },

    /// 허용되지 않는 상태 전이
    #[error("invalid transition for job {id}: {from} -> {to}")]
    InvalidTransition { id: String, from: String, to: String },
}

/// 스토리지 에러
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// 스냅샷 읽기/쓰기 실패
    #[error("snapshot failed: {0}")]
    Snapshot(String),

    /// 직렬화 실패
    #[error("serialization failed: {0}")]
    Serialization(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_converts_to_stackscout_error() {
        let err: StackscoutError = ConfigError::InvalidValue {
            field: "collector.workers".to_owned(),
            reason: "must be greater than 0".to_owned(),
        }
        .into();
        assert!(matches!(err, StackscoutError::Config(_)));
        assert!(err.to_string().contains("collector.workers"));
    }

    #[test]
    fn collect_error_display() {
        let err = CollectError::NotFound {
            source_name: "pypi".to_owned(),
            name: "nope".to_owned(),
        };
        assert_eq!(err.to_string(), "package not found: pypi/nope");

        let err = CollectError::Transient {
            source_name: "npm".to_owned(),
            name: "left-pad".to_owned(),
            reason: "timeout".to_owned(),
        };
        assert!(err.to_string().contains("timeout"));
    }

    #[test]
    fn job_error_display() {
        let err = JobError::InvalidTransition {
            id: "abc".to_owned(),
            from: "COMPLETED".to_owned(),
            to: "RUNNING".to_owned(),
        };
        assert_eq!(
            err.to_string(),
            "invalid transition for job abc: COMPLETED -> RUNNING"
        );
    }

    #[test]
    fn io_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: StackscoutError = io.into();
        assert!(matches!(err, StackscoutError::Io(_)));
    }
}
