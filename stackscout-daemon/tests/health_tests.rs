//! Health aggregation tests.
//!
//! Tests the health status aggregation logic and component health reporting.

use stackscout_core::pipeline::HealthStatus;
use stackscout_core::types::JobStatus;
use stackscout_daemon::health::{ComponentHealth, DaemonHealth, aggregate_status};

fn component(name: &str, enabled: bool, status: HealthStatus) -> ComponentHealth {
    ComponentHealth {
        name: name.to_string(),
        enabled,
        status,
    }
}

#[test]
fn test_aggregate_status_all_healthy() {
    let components = vec![
        component("collector", true, HealthStatus::Healthy),
        component("scheduler", true, HealthStatus::Healthy),
    ];

    assert!(aggregate_status(&components).is_healthy());
}

#[test]
fn test_aggregate_status_empty_is_healthy() {
    assert!(aggregate_status(&[]).is_healthy());
}

#[test]
fn test_aggregate_status_one_degraded() {
    // Given: One component is degraded
    let components = vec![
        component("collector", true, HealthStatus::Healthy),
        component(
            "scheduler",
            true,
            HealthStatus::Degraded("work queue nearly full (950/1024)".to_string()),
        ),
    ];

    // When: Aggregating status
    let status = aggregate_status(&components);

    // Then: Overall status carries the component name and reason
    match status {
        HealthStatus::Degraded(reason) => {
            assert_eq!(reason, "scheduler: work queue nearly full (950/1024)");
        }
        other => panic!("expected Degraded, got {:?}", other),
    }
}

#[test]
fn test_aggregate_status_unhealthy_wins_over_degraded() {
    let components = vec![
        component("a", true, HealthStatus::Degraded("slow".to_string())),
        component("b", true, HealthStatus::Unhealthy("all workers exited".to_string())),
        component("c", true, HealthStatus::Degraded("late".to_string())),
    ];

    match aggregate_status(&components) {
        HealthStatus::Unhealthy(reason) => {
            assert!(reason.contains("a: slow"), "got: {}", reason);
            assert!(reason.contains("b: all workers exited"), "got: {}", reason);
            assert!(!reason.contains("c: late"), "got: {}", reason);
        }
        other => panic!("expected Unhealthy, got {:?}", other),
    }
}

#[test]
fn test_aggregate_status_ignores_disabled_components() {
    let components = vec![
        component("collector", true, HealthStatus::Healthy),
        component("disabled", false, HealthStatus::Unhealthy("stopped".to_string())),
    ];

    assert!(aggregate_status(&components).is_healthy());
}

#[test]
fn test_daemon_health_serializes_to_json() {
    let health = DaemonHealth {
        status: HealthStatus::Healthy,
        uptime_secs: 42,
        components: vec![component("collector", true, HealthStatus::Healthy)],
        catalog_entries: 3,
        queue_depth: 0,
        jobs: vec![(JobStatus::Completed, 2)],
    };

    let json = serde_json::to_value(&health).expect("health should serialize");
    assert_eq!(json["status"], "Healthy");
    assert_eq!(json["uptime_secs"], 42);
    assert_eq!(json["catalog_entries"], 3);
    assert_eq!(json["components"][0]["name"], "collector");
    assert_eq!(json["jobs"][0][1], 2);
}
