//! 처리 워커 — 작업 큐에서 파일을 받아 요약을 저장합니다.
//!
//! [`ProcessingWorker::handle`]은 밖으로 에러를 던지지 않습니다.
//! 처리 중 어떤 실패든 원본 작업과 실패 사유를 담은
//! [`DeadLetterEntry`]로 변환되어 데드레터 채널로 향하고, 원본 큐
//! 메시지는 ack 없이 남아 큐의 재전달/만료 정책에 맡겨집니다.
//!
//! 같은 작업을 다시 처리해도 같은 키에 같은 바이트를 덮어쓰므로
//! 재전달에 안전합니다 (요약은 매번 원본 객체에서 전부 재계산됩니다).

use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use metrics::{counter, histogram};

use logsift_core::message::{DeadLetterEntry, ProcessingTask};
use logsift_core::metrics as m;
use logsift_core::substrate::{MetricDatum, MetricsSink, ObjectStore, QueueMessage, TaskQueue};
use logsift_core::types::FileSummary;

use crate::aggregate::FileAggregator;
use crate::config::PipelineConfig;
use crate::error::ProcessError;

/// 비즈니스 카운터 이름
const METRIC_TOTAL_REQUESTS: &str = "TotalRequests";
const METRIC_ERROR_COUNT: &str = "ErrorCount";

/// 처리 워커
///
/// 인스턴스 하나는 한 번에 작업 하나를 처리하지만, 공유 가변 상태가
/// 없으므로 여러 인스턴스를 병렬로 돌릴 수 있습니다.
pub struct ProcessingWorker {
    /// 원본/요약 객체 스토어
    store: Arc<dyn ObjectStore>,
    /// 원본 작업 큐 (ack 용도)
    task_queue: Arc<dyn TaskQueue>,
    /// 데드레터 채널
    dead_letters: Arc<dyn TaskQueue>,
    /// 비즈니스 메트릭 싱크
    metrics_sink: Arc<dyn MetricsSink>,
    /// 파일 집계기
    aggregator: FileAggregator,
    /// 요약 아티팩트 버킷
    processed_bucket: String,
    /// 비즈니스 메트릭 네임스페이스
    metric_namespace: String,
}

impl ProcessingWorker {
    /// 주입받은 substrate와 설정으로 워커를 생성합니다.
    pub fn new(
        store: Arc<dyn ObjectStore>,
        task_queue: Arc<dyn TaskQueue>,
        dead_letters: Arc<dyn TaskQueue>,
        metrics_sink: Arc<dyn MetricsSink>,
        config: &PipelineConfig,
    ) -> Self {
        Self {
            store,
            task_queue,
            dead_letters,
            metrics_sink,
            aggregator: FileAggregator::new(),
            processed_bucket: config.processed_bucket.clone(),
            metric_namespace: config.metric_namespace.clone(),
        }
    }

    /// 큐 메시지 하나를 처리합니다. 에러를 밖으로 전파하지 않습니다.
    ///
    /// 성공 시에만 원본 메시지를 ack합니다. ack 실패는 로깅만 하고
    /// 데드레터로 보내지 않습니다 (요약은 이미 저장되어 있습니다).
    pub async fn handle(&self, message: QueueMessage) {
        let started = Instant::now();

        match self.process(&message.body).await {
            Ok(summary) => {
                counter!(m::PIPELINE_FILES_PROCESSED_TOTAL).increment(1);
                histogram!(m::PIPELINE_PROCESSING_DURATION_SECONDS)
                    .record(started.elapsed().as_secs_f64());

                if let Err(e) = self.task_queue.delete(&message.receipt).await {
                    tracing::warn!(
                        receipt = %message.receipt,
                        error = %e,
                        "failed to acknowledge queue message; summary is already stored"
                    );
                } else {
                    tracing::info!(
                        requests = summary.total_requests,
                        errors = summary.errors,
                        "log file processed"
                    );
                }
            }
            Err(e) => {
                tracing::error!(
                    receive_count = message.receive_count,
                    error = %e,
                    "processing failed, routing task to dead-letter channel"
                );
                self.dead_letter(&message.body, &e).await;
                // 원본 메시지는 ack하지 않고 재전달 정책에 맡깁니다
            }
        }
    }

    /// fetch → 집계 → 저장 → 메트릭 전송의 본 처리 경로입니다.
    async fn process(&self, body: &Bytes) -> Result<FileSummary, ProcessError> {
        let task: ProcessingTask =
            serde_json::from_slice(body).map_err(|e| ProcessError::Task(e.to_string()))?;

        let object = self.store.get(&task.bucket, &task.key).await?;
        let content = String::from_utf8_lossy(&object);

        let (summary, line_errors) = self.aggregator.aggregate(&content);
        counter!(m::PIPELINE_LINES_PARSED_TOTAL).increment(summary.total_requests);
        if !line_errors.is_empty() {
            counter!(m::PIPELINE_PARSE_ERRORS_TOTAL).increment(line_errors.len() as u64);
            for line_error in &line_errors {
                tracing::warn!(
                    key = %task.key,
                    line = line_error.line_no,
                    error = %line_error.error,
                    "skipped malformed log line"
                );
            }
        }
        if summary.total_requests != task.log_count {
            // 힌트는 비어 있지 않은 줄 수라 파싱 실패분만큼 어긋날 수 있습니다
            tracing::debug!(
                key = %task.key,
                hint = task.log_count,
                actual = summary.total_requests,
                "record count hint differs from aggregated count"
            );
        }

        let artifact = serde_json::to_vec(&summary)
            .map_err(|e| ProcessError::Encode(e.to_string()))?;
        let derived_key = derived_summary_key(&task.key);
        self.store
            .put(&self.processed_bucket, &derived_key, artifact.into())
            .await?;

        self.metrics_sink
            .emit(
                &self.metric_namespace,
                &[
                    MetricDatum::count(METRIC_TOTAL_REQUESTS, summary.total_requests),
                    MetricDatum::count(METRIC_ERROR_COUNT, summary.errors),
                ],
            )
            .await?;

        Ok(summary)
    }

    /// 원본 메시지와 실패 사유를 데드레터 채널에 발행합니다.
    async fn dead_letter(&self, original: &Bytes, error: &ProcessError) {
        counter!(m::PIPELINE_DEAD_LETTERS_TOTAL).increment(1);

        let entry = DeadLetterEntry {
            original_message: String::from_utf8_lossy(original).into_owned(),
            error: error.to_string(),
        };
        let payload = match serde_json::to_vec(&entry) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::error!(error = %e, "failed to encode dead-letter entry");
                return;
            }
        };

        if let Err(e) = self.dead_letters.send(payload.into()).await {
            tracing::error!(error = %e, "failed to publish dead-letter entry");
        }
    }
}

/// 원본 키에서 요약 아티팩트 키를 유도합니다.
///
/// 키의 마지막 경로 조각에 `.json`을 붙여 `processed/` 아래에 둡니다.
fn derived_summary_key(source_key: &str) -> String {
    let basename = source_key.rsplit('/').next().unwrap_or(source_key);
    format!("processed/{basename}.json")
}
