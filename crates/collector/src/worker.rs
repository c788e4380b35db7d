//! 큐 소비 워커
//!
//! 워커는 큐에서 메시지를 하나씩 꺼내 처리를 끝까지 마친 뒤 다음 메시지를 가져옵니다.
//! 항목 하나의 실패나 panic은 해당 항목의 실패로만 집계되고 워커는 계속 동작합니다.
//! 취소 토큰이 발동되면 처리 중인 항목을 마친 뒤 종료합니다.

use std::sync::Arc;

use metrics::counter;
use stackscout_core::metrics as m;
use stackscout_core::types::{JobOutcome, ScanMessage, Source};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::catalog::CatalogStore;
use crate::error::CollectorError;
use crate::job::ScanJobManager;
use crate::processor::PackageProcessor;
use crate::queue::QueueConsumer;

/// 워커 루프를 실행합니다.
pub async fn run_worker<S: CatalogStore>(
    id: usize,
    consumer: QueueConsumer,
    processor: Arc<PackageProcessor<S>>,
    jobs: Arc<ScanJobManager>,
    cancel: CancellationToken,
) {
    debug!(worker = id, "worker started");
    let mut handled = 0u64;

    loop {
        let message = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            message = consumer.next() => match message {
                Some(message) => message,
                None => break,
            },
        };

        // select! 밖에서 처리해야 취소 시에도 진행 중인 항목이 끝까지 처리됩니다.
        handle_message(id, message, &processor, &jobs).await;
        handled += 1;
    }

    info!(worker = id, handled, "worker stopped");
}

async fn handle_message<S: CatalogStore>(
    worker: usize,
    message: ScanMessage,
    processor: &Arc<PackageProcessor<S>>,
    jobs: &ScanJobManager,
) {
    let ScanMessage {
        source,
        package_name,
        job_id,
    } = message;

    let outcome = match Source::from_str_loose(&source) {
        Some(source) => process_isolated(worker, source, &package_name, processor).await,
        None => {
            warn!(worker, source = %source, package = %package_name, "unsupported source in queue message");
            JobOutcome::Failure
        }
    };

    let Some(job_id) = job_id else {
        return;
    };
    match jobs.advance_progress(job_id, outcome, &package_name).await {
        Ok(_) => {}
        Err(CollectorError::JobFinished { status, .. }) => {
            debug!(worker, %job_id, %status, package = %package_name, "job already finished, progress dropped");
        }
        Err(e) => {
            warn!(worker, %job_id, package = %package_name, error = %e, "failed to record job progress");
        }
    }
}

/// 항목 하나를 별도 태스크에서 처리해 panic을 격리합니다.
async fn process_isolated<S: CatalogStore>(
    worker: usize,
    source: Source,
    name: &str,
    processor: &Arc<PackageProcessor<S>>,
) -> JobOutcome {
    let task = {
        let processor = Arc::clone(processor);
        let name = name.to_owned();
        tokio::spawn(async move { processor.collect_one(source, &name).await })
    };

    match task.await {
        Ok(Ok(entry)) => {
            debug!(worker, %source, package = %entry.name, score = entry.health_score, "item processed");
            JobOutcome::Success
        }
        Ok(Err(e)) => {
            warn!(worker, %source, package = name, error = %e, "item failed");
            JobOutcome::Failure
        }
        Err(join_error) => {
            if join_error.is_panic() {
                counter!(m::COLLECTOR_WORKER_PANICS_TOTAL, m::LABEL_SOURCE => source.as_str())
                    .increment(1);
                error!(worker, %source, package = name, "item processing panicked");
            } else {
                warn!(worker, %source, package = name, "item processing task cancelled");
            }
            JobOutcome::Failure
        }
    }
}
