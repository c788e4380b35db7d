//! 스캔 작업 관리자
//!
//! [`ScanJobManager`]는 스캔 작업 레코드를 단독으로 소유하고
//! 상태 전이와 진행 카운터를 관리합니다.
//!
//! # 상태 기계
//!
//! ```text
//! PENDING ──advance/RUNNING──▶ RUNNING ──모두 성공──▶ COMPLETED
//!    │                            │ ────실패 포함───▶ FAILED
//!    ├──────────▶ CANCELLED ◀─────┤
//!    └──────────▶ FAILED          └──────────────▶ CANCELLED
//! ```
//!
//! 모든 변경은 하나의 잠금 안에서 수행되므로 여러 워커가 동시에
//! 진행을 보고해도 각 보고는 정확히 한 번 반영됩니다.
//! 종료 상태(COMPLETED/FAILED/CANCELLED)의 작업은 더 이상 변경되지 않습니다.

use std::collections::HashMap;

use chrono::Utc;
use metrics::counter;
use stackscout_core::metrics as m;
use stackscout_core::types::{JobOutcome, JobStatus, ScanJob, Source};
use tokio::sync::{Mutex, Notify};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::CollectorError;

/// 작업에 보관하는 실패 패키지 이름 최대 개수
pub const MAX_FAILED_PACKAGES: usize = 100;

/// 스캔 작업 관리자
#[derive(Debug, Default)]
pub struct ScanJobManager {
    jobs: Mutex<HashMap<Uuid, ScanJob>>,
    finished: Notify,
}

impl ScanJobManager {
    /// 빈 관리자를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// PENDING 상태의 새 작업을 생성합니다.
    pub async fn create_job(&self, source: Source, packages_count: Option<u64>) -> ScanJob {
        let job = ScanJob::new(source, packages_count);
        self.jobs.lock().await.insert(job.id, job.clone());

        counter!(m::JOBS_CREATED_TOTAL, m::LABEL_SOURCE => source.as_str()).increment(1);
        info!(job_id = %job.id, %source, packages = ?packages_count, "scan job created");
        job
    }

    /// 작업을 조회합니다.
    pub async fn get(&self, id: Uuid) -> Result<ScanJob, CollectorError> {
        self.jobs
            .lock()
            .await
            .get(&id)
            .cloned()
            .ok_or(CollectorError::JobNotFound { id })
    }

    /// 모든 작업 (최신순)
    pub async fn list(&self) -> Vec<ScanJob> {
        let mut jobs: Vec<ScanJob> = self.jobs.lock().await.values().cloned().collect();
        jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        jobs
    }

    /// 상태별 작업 수 (생명주기 순서)
    pub async fn status_counts(&self) -> Vec<(JobStatus, usize)> {
        let jobs = self.jobs.lock().await;
        JobStatus::ALL
            .into_iter()
            .map(|status| (status, jobs.values().filter(|j| j.status == status).count()))
            .collect()
    }

    /// 항목 하나의 처리 결과를 반영합니다.
    ///
    /// - 첫 보고 시 PENDING → RUNNING, `started_at` 기록
    /// - 성공+실패 합계가 목표 수에 도달하면 실패가 없을 때 COMPLETED, 있으면 FAILED
    ///
    /// # Errors
    ///
    /// - `JobNotFound`: 작업 없음
    /// - `JobFinished`: 이미 종료된 작업 (보고는 버려짐)
    /// - `ProgressOverflow`: 목표 수를 넘는 보고
    pub async fn advance_progress(
        &self,
        id: Uuid,
        outcome: JobOutcome,
        package: &str,
    ) -> Result<ScanJob, CollectorError> {
        let mut jobs = self.jobs.lock().await;
        let job = jobs.get_mut(&id).ok_or(CollectorError::JobNotFound { id })?;

        if job.status.is_terminal() {
            counter!(m::JOBS_STALE_ADVANCES_TOTAL).increment(1);
            debug!(job_id = %id, status = %job.status, package, "dropping progress for finished job");
            return Err(CollectorError::JobFinished {
                id,
                status: job.status,
            });
        }
        if let Some(count) = job.packages_count
            && job.accounted() >= count
        {
            return Err(CollectorError::ProgressOverflow { id, count });
        }

        let now = Utc::now();
        if job.status == JobStatus::Pending {
            job.status = JobStatus::Running;
            job.started_at.get_or_insert(now);
        }

        match outcome {
            JobOutcome::Success => job.processed_count += 1,
            JobOutcome::Failure => {
                job.failed_count += 1;
                if job.failed_packages.len() < MAX_FAILED_PACKAGES {
                    job.failed_packages.push(package.to_owned());
                }
            }
        }
        job.updated_at = now;

        if let Some(count) = job.packages_count
            && job.accounted() == count
        {
            if job.failed_count == 0 {
                job.status = JobStatus::Completed;
            } else {
                job.status = JobStatus::Failed;
                job.error_message = Some(format!("{} of {} items failed", job.failed_count, count));
            }
            job.completed_at.get_or_insert(now);
            let finished = job.clone();
            drop(jobs);
            self.on_finished(&finished);
            return Ok(finished);
        }

        Ok(job.clone())
    }

    /// 작업 상태를 명시적으로 변경합니다.
    ///
    /// 같은 상태로의 변경은 아무것도 하지 않습니다.
    ///
    /// # Errors
    ///
    /// - `JobNotFound`: 작업 없음
    /// - `InvalidTransition`: 허용되지 않는 전이
    pub async fn update_status(
        &self,
        id: Uuid,
        status: JobStatus,
    ) -> Result<ScanJob, CollectorError> {
        let mut jobs = self.jobs.lock().await;
        let job = jobs.get_mut(&id).ok_or(CollectorError::JobNotFound { id })?;

        if job.status == status {
            return Ok(job.clone());
        }
        if !job.status.can_transition_to(status) {
            return Err(CollectorError::InvalidTransition {
                id,
                from: job.status,
                to: status,
            });
        }

        let now = Utc::now();
        job.status = status;
        job.updated_at = now;
        match status {
            JobStatus::Running => {
                job.started_at.get_or_insert(now);
            }
            JobStatus::Completed => {
                job.completed_at.get_or_insert(now);
            }
            JobStatus::Failed => {
                job.completed_at.get_or_insert(now);
                job.error_message.get_or_insert_with(|| "marked failed".to_owned());
            }
            JobStatus::Pending | JobStatus::Cancelled => {}
        }

        let updated = job.clone();
        drop(jobs);
        if updated.status.is_terminal() {
            self.on_finished(&updated);
        }
        Ok(updated)
    }

    /// 작업을 취소합니다. PENDING/RUNNING에서만 가능합니다.
    ///
    /// 취소는 권고 사항입니다. 처리 중인 항목은 끝까지 처리되지만
    /// 그 결과 보고는 버려집니다.
    pub async fn cancel(&self, id: Uuid) -> Result<ScanJob, CollectorError> {
        self.update_status(id, JobStatus::Cancelled).await
    }

    /// 종료된 작업을 삭제합니다.
    pub async fn delete(&self, id: Uuid) -> Result<ScanJob, CollectorError> {
        let mut jobs = self.jobs.lock().await;
        let status = jobs
            .get(&id)
            .map(|j| j.status)
            .ok_or(CollectorError::JobNotFound { id })?;
        if !status.is_terminal() {
            return Err(CollectorError::Validation(format!(
                "job {id} is {status}; only finished jobs can be deleted"
            )));
        }
        jobs.remove(&id).ok_or(CollectorError::JobNotFound { id })
    }

    /// 작업이 종료 상태가 될 때까지 기다립니다.
    ///
    /// 시간 제한이 필요하면 호출자가 `tokio::time::timeout`으로 감쌉니다.
    pub async fn wait_until_finished(&self, id: Uuid) -> Result<ScanJob, CollectorError> {
        loop {
            // 상태 확인 전에 등록해야 그 사이의 알림을 놓치지 않습니다.
            let notified = self.finished.notified();
            let job = self.get(id).await?;
            if job.status.is_terminal() {
                return Ok(job);
            }
            notified.await;
        }
    }

    fn on_finished(&self, job: &ScanJob) {
        counter!(m::JOBS_FINISHED_TOTAL, m::LABEL_STATUS => job.status.as_str()).increment(1);
        match job.status {
            JobStatus::Failed => warn!(
                job_id = %job.id,
                source = %job.source,
                processed = job.processed_count,
                failed = job.failed_count,
                reason = job.error_message.as_deref().unwrap_or(""),
                "scan job failed"
            ),
            _ => info!(
                job_id = %job.id,
                source = %job.source,
                status = %job.status,
                processed = job.processed_count,
                failed = job.failed_count,
                "scan job finished"
            ),
        }
        self.finished.notify_waiters();
    }
}
