//! 메트릭 상수 및 설명 등록
//!
//! 모든 Prometheus 메트릭의 이름과 설명을 중앙에서 정의합니다.
//! 각 컴포넌트는 이 상수를 사용하여 `metrics::counter!()`, `metrics::gauge!()`,
//! `metrics::histogram!()` 매크로를 호출합니다.
//!
//! # 네이밍 컨벤션
//!
//! - 접두어: `stackscout_`
//! - 컴포넌트명: `daemon_`, `collector_`, `queue_`, `jobs_`, `catalog_`
//! - 접미어: `_total` (counter), `_seconds` (histogram/latency), 없음 (gauge)
//!
//! # 사용 예시
//!
//! ```ignore
//! use metrics::counter;
//! use stackscout_core::metrics as m;
//!
//! counter!(m::COLLECTOR_ITEMS_TOTAL, m::LABEL_SOURCE => "pypi", m::LABEL_RESULT => "success")
//!     .increment(1);
//! ```

// ─── 레이블 키 상수 ────────────────────────────────────────────────

/// 소스 레이블 키 (pypi, npm, dockerhub)
pub const LABEL_SOURCE: &str = "source";

/// 결과 레이블 키 (success, not_found, transient, validation)
pub const LABEL_RESULT: &str = "result";

/// 작업 상태 레이블 키 (COMPLETED, FAILED, CANCELLED)
pub const LABEL_STATUS: &str = "status";

// ─── Daemon 메트릭 ─────────────────────────────────────────────────

/// Daemon: 가동 시간 (gauge, 초)
pub const DAEMON_UPTIME_SECONDS: &str = "stackscout_daemon_uptime_seconds";

/// Daemon: 빌드 정보 (gauge, 항상 1, label: version)
pub const DAEMON_BUILD_INFO: &str = "stackscout_daemon_build_info";

// ─── Collector 메트릭 ──────────────────────────────────────────────

/// Collector: 처리된 항목 수 (counter, labels: source, result)
pub const COLLECTOR_ITEMS_TOTAL: &str = "stackscout_collector_items_total";

/// Collector: 재시도 횟수 (counter, label: source)
pub const COLLECTOR_RETRIES_TOTAL: &str = "stackscout_collector_retries_total";

/// Collector: 항목 하나의 수집 소요 시간 (histogram, 초, label: source)
pub const COLLECTOR_COLLECT_DURATION_SECONDS: &str = "stackscout_collector_collect_duration_seconds";

/// Collector: 워커 패닉 수 (counter)
pub const COLLECTOR_WORKER_PANICS_TOTAL: &str = "stackscout_collector_worker_panics_total";

// ─── Queue 메트릭 ──────────────────────────────────────────────────

/// Queue: 적재된 메시지 수 (counter)
pub const QUEUE_ENQUEUED_TOTAL: &str = "stackscout_queue_enqueued_total";

/// Queue: 용량 초과로 거부된 메시지 수 (counter)
pub const QUEUE_REJECTED_TOTAL: &str = "stackscout_queue_rejected_total";

/// Queue: 디코딩 실패로 버려진 메시지 수 (counter)
pub const QUEUE_DECODE_ERRORS_TOTAL: &str = "stackscout_queue_decode_errors_total";

/// Queue: 현재 대기 중인 메시지 수 (gauge)
pub const QUEUE_DEPTH: &str = "stackscout_queue_depth";

// ─── Job 메트릭 ────────────────────────────────────────────────────

/// Jobs: 생성된 작업 수 (counter, label: source)
pub const JOBS_CREATED_TOTAL: &str = "stackscout_jobs_created_total";

/// Jobs: 종료 상태에 도달한 작업 수 (counter, label: status)
pub const JOBS_FINISHED_TOTAL: &str = "stackscout_jobs_finished_total";

/// Jobs: 종료된 작업에 대해 거부된 진행 보고 수 (counter)
pub const JOBS_STALE_ADVANCES_TOTAL: &str = "stackscout_jobs_stale_advances_total";

// ─── Catalog 메트릭 ────────────────────────────────────────────────

/// Catalog: upsert 횟수 (counter, label: source)
pub const CATALOG_UPSERTS_TOTAL: &str = "stackscout_catalog_upserts_total";

/// Catalog: 저장된 엔트리 수 (gauge)
pub const CATALOG_ENTRIES: &str = "stackscout_catalog_entries";

// ─── Histogram 버킷 ────────────────────────────────────────────────

/// 수집 소요 시간 히스토그램 버킷 (초)
///
/// 레지스트리 왕복 + 재시도 대기를 포함하므로 10ms ~ 60s 범위
pub const COLLECT_DURATION_BUCKETS: [f64; 10] =
    [0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 15.0, 60.0];

// ─── 설명 등록 함수 ─────────────────────────────────────────────────

/// 모든 메트릭의 설명(description)을 등록합니다.
///
/// 메트릭 레코더 설치 직후 한 번 호출합니다.
pub fn describe_all() {
    use metrics::{describe_counter, describe_gauge, describe_histogram};

    // Daemon
    describe_gauge!(DAEMON_UPTIME_SECONDS, "Seconds since the daemon started");
    describe_gauge!(DAEMON_BUILD_INFO, "Build information, always 1");

    // Collector
    describe_counter!(
        COLLECTOR_ITEMS_TOTAL,
        "Items processed by the collection pipeline, by source and result"
    );
    describe_counter!(
        COLLECTOR_RETRIES_TOTAL,
        "Retries of transient collection failures"
    );
    describe_histogram!(
        COLLECTOR_COLLECT_DURATION_SECONDS,
        "End-to-end collection latency per item in seconds"
    );
    describe_counter!(
        COLLECTOR_WORKER_PANICS_TOTAL,
        "Panics caught while processing a single queue message"
    );

    // Queue
    describe_counter!(QUEUE_ENQUEUED_TOTAL, "Messages pushed onto the work queue");
    describe_counter!(
        QUEUE_REJECTED_TOTAL,
        "Messages refused because the work queue was full"
    );
    describe_counter!(
        QUEUE_DECODE_ERRORS_TOTAL,
        "Queue payloads dropped because they could not be decoded"
    );
    describe_gauge!(QUEUE_DEPTH, "Messages currently waiting in the work queue");

    // Jobs
    describe_counter!(JOBS_CREATED_TOTAL, "Scan jobs created");
    describe_counter!(JOBS_FINISHED_TOTAL, "Scan jobs that reached a terminal state");
    describe_counter!(
        JOBS_STALE_ADVANCES_TOTAL,
        "Progress reports rejected because the job was already terminal"
    );

    // Catalog
    describe_counter!(CATALOG_UPSERTS_TOTAL, "Catalog entries inserted or updated");
    describe_gauge!(CATALOG_ENTRIES, "Entries currently held in the catalog");
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_METRIC_NAMES: &[&str] = &[
        DAEMON_UPTIME_SECONDS,
        DAEMON_BUILD_INFO,
        COLLECTOR_ITEMS_TOTAL,
        COLLECTOR_RETRIES_TOTAL,
        COLLECTOR_COLLECT_DURATION_SECONDS,
        COLLECTOR_WORKER_PANICS_TOTAL,
        QUEUE_ENQUEUED_TOTAL,
        QUEUE_REJECTED_TOTAL,
        QUEUE_DECODE_ERRORS_TOTAL,
        QUEUE_DEPTH,
        JOBS_CREATED_TOTAL,
        JOBS_FINISHED_TOTAL,
        JOBS_STALE_ADVANCES_TOTAL,
        CATALOG_UPSERTS_TOTAL,
        CATALOG_ENTRIES,
    ];

    #[test]
    fn all_metric_names_have_prefix() {
        for name in ALL_METRIC_NAMES {
            assert!(
                name.starts_with("stackscout_"),
                "metric '{}' must start with 'stackscout_'",
                name
            );
        }
    }

    #[test]
    fn metric_names_are_unique() {
        let mut names = ALL_METRIC_NAMES.to_vec();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), ALL_METRIC_NAMES.len());
    }

    #[test]
    fn counters_end_with_total() {
        let counters = [
            COLLECTOR_ITEMS_TOTAL,
            COLLECTOR_RETRIES_TOTAL,
            QUEUE_ENQUEUED_TOTAL,
            QUEUE_REJECTED_TOTAL,
            JOBS_CREATED_TOTAL,
            JOBS_FINISHED_TOTAL,
            CATALOG_UPSERTS_TOTAL,
        ];
        for name in counters {
            assert!(name.ends_with("_total"), "counter '{}' must end with _total", name);
        }
    }

    #[test]
    fn collect_duration_buckets_are_sorted() {
        let buckets = COLLECT_DURATION_BUCKETS;
        for i in 1..buckets.len() {
            assert!(
                buckets[i] > buckets[i - 1],
                "Bucket values must be in ascending order"
            );
        }
    }

    #[test]
    fn describe_all_without_recorder_is_noop() {
        describe_all();
    }
}
