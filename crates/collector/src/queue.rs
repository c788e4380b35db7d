//! 작업 큐
//!
//! 생산자(작업 생성 경로)와 워커 사이의 유한 용량 채널입니다.
//! 메시지는 JSON으로 직렬화된 [`ScanMessage`] 바이트로 전달되며,
//! 소비자는 해석할 수 없는 메시지를 경고와 함께 버리고 다음 메시지로 넘어갑니다.
//!
//! 큐가 가득 찼을 때의 동작은 [`OverflowPolicy`]로 정합니다.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use bytes::Bytes;
use metrics::{counter, gauge};
use stackscout_core::metrics as m;
use stackscout_core::types::{ScanMessage, Source};
use tokio::sync::{Mutex, mpsc};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::OverflowPolicy;
use crate::error::CollectorError;

/// 유한 용량 작업 큐를 생성합니다.
pub fn work_queue(capacity: usize, policy: OverflowPolicy) -> (QueueProducer, QueueConsumer) {
    let (tx, rx) = mpsc::channel(capacity);
    let depth = Arc::new(AtomicUsize::new(0));
    let producer = QueueProducer {
        tx,
        policy,
        capacity,
        depth: Arc::clone(&depth),
    };
    let consumer = QueueConsumer {
        rx: Arc::new(Mutex::new(rx)),
        depth,
    };
    (producer, consumer)
}

/// 한 번의 enqueue 결과
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnqueueReport {
    /// 큐에 들어간 항목 수
    pub enqueued: usize,
    /// `Reject` 정책으로 거부된 패키지 이름
    pub rejected: Vec<String>,
}

// ─── QueueProducer ──────────────────────────────────────────────────

/// 큐 생산자
#[derive(Debug, Clone)]
pub struct QueueProducer {
    tx: mpsc::Sender<Bytes>,
    policy: OverflowPolicy,
    capacity: usize,
    depth: Arc<AtomicUsize>,
}

impl QueueProducer {
    /// 이름마다 메시지 하나씩 큐에 넣습니다.
    ///
    /// `Block` 정책은 공간이 생길 때까지 기다리고,
    /// `Reject` 정책은 가득 찬 시점 이후의 항목을 `rejected`로 돌려줍니다.
    ///
    /// # Errors
    ///
    /// 큐가 닫혔으면 `CollectorError::Queue`
    pub async fn enqueue(
        &self,
        source: Source,
        names: &[String],
        job_id: Option<Uuid>,
    ) -> Result<EnqueueReport, CollectorError> {
        let mut report = EnqueueReport::default();

        for name in names {
            let payload = encode(&ScanMessage::new(source, name.as_str(), job_id))?;
            // 소비자가 먼저 감소시켜도 음수가 되지 않도록 전송 전에 증가시킨다
            self.depth.fetch_add(1, Ordering::Relaxed);
            let sent = match self.policy {
                OverflowPolicy::Block => self
                    .tx
                    .send(payload)
                    .await
                    .map_err(|_| CollectorError::Queue("work queue closed".to_owned())),
                OverflowPolicy::Reject => match self.tx.try_send(payload) {
                    Ok(()) => Ok(()),
                    Err(mpsc::error::TrySendError::Full(_)) => {
                        self.depth.fetch_sub(1, Ordering::Relaxed);
                        counter!(m::QUEUE_REJECTED_TOTAL, m::LABEL_SOURCE => source.as_str())
                            .increment(1);
                        report.rejected.push(name.clone());
                        continue;
                    }
                    Err(mpsc::error::TrySendError::Closed(_)) => {
                        Err(CollectorError::Queue("work queue closed".to_owned()))
                    }
                },
            };
            if let Err(e) = sent {
                self.depth.fetch_sub(1, Ordering::Relaxed);
                return Err(e);
            }

            report.enqueued += 1;
            gauge!(m::QUEUE_DEPTH).set(self.depth() as f64);
            counter!(m::QUEUE_ENQUEUED_TOTAL, m::LABEL_SOURCE => source.as_str()).increment(1);
        }

        if !report.rejected.is_empty() {
            warn!(
                %source,
                rejected = report.rejected.len(),
                capacity = self.capacity,
                "work queue full, items rejected"
            );
        }
        debug!(%source, enqueued = report.enqueued, job_id = ?job_id, "items enqueued");
        Ok(report)
    }

    /// 현재 큐에 대기 중인 항목 수
    pub fn depth(&self) -> usize {
        self.depth.load(Ordering::Relaxed)
    }

    /// 큐 용량
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// 초과 정책
    pub fn policy(&self) -> OverflowPolicy {
        self.policy
    }
}

fn encode(message: &ScanMessage) -> Result<Bytes, CollectorError> {
    serde_json::to_vec(message)
        .map(Bytes::from)
        .map_err(|e| CollectorError::Queue(format!("failed to encode message: {e}")))
}

// ─── QueueConsumer ──────────────────────────────────────────────────

/// 큐 소비자
///
/// 여러 워커가 복제본을 공유하며, 각 메시지는 정확히 한 워커에게 전달됩니다.
#[derive(Debug, Clone)]
pub struct QueueConsumer {
    rx: Arc<Mutex<mpsc::Receiver<Bytes>>>,
    depth: Arc<AtomicUsize>,
}

impl QueueConsumer {
    /// 다음 메시지를 기다립니다. 모든 생산자가 닫히고 큐가 비면 `None`.
    ///
    /// 해석할 수 없는 메시지는 건너뜁니다.
    pub async fn next(&self) -> Option<ScanMessage> {
        loop {
            let payload = self.rx.lock().await.recv().await?;
            let depth = self
                .depth
                .fetch_sub(1, Ordering::Relaxed)
                .saturating_sub(1);
            gauge!(m::QUEUE_DEPTH).set(depth as f64);

            match serde_json::from_slice::<ScanMessage>(&payload) {
                Ok(message) => return Some(message),
                Err(e) => {
                    counter!(m::QUEUE_DECODE_ERRORS_TOTAL).increment(1);
                    warn!(error = %e, bytes = payload.len(), "dropping undecodable queue message");
                }
            }
        }
    }
}
