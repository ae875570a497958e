//! 모니터 워커 — 저장된 요약을 검사해 알림을 발행합니다.
//!
//! [`MonitorWorker`]는 요약 생성 알림을 받아 아티팩트를 읽고
//! [`AnomalyAnalyzer`]를 돌린 뒤, 알림이 있으면 하나의 통지로 묶어
//! 발행합니다. 모니터 단계는 보조적(advisory)이므로 실패한 알림은
//! 로깅 후 건너뛰며 재시도하지 않습니다.

use std::sync::Arc;

use metrics::counter;

use logsift_core::message::{AlertMessage, ObjectEvent};
use logsift_core::metrics as m;
use logsift_core::substrate::{AlertPublisher, ObjectStore};
use logsift_core::types::FileSummary;

use crate::analyze::AnomalyAnalyzer;
use crate::config::PipelineConfig;
use crate::error::{MonitorError, SummaryError};

/// 모니터 워커
pub struct MonitorWorker {
    /// 요약 아티팩트 스토어
    store: Arc<dyn ObjectStore>,
    /// 알림 채널
    publisher: Arc<dyn AlertPublisher>,
    /// 이상 탐지기
    analyzer: AnomalyAnalyzer,
    /// 알림 제목
    alert_subject: String,
}

impl MonitorWorker {
    /// 주입받은 substrate와 설정으로 워커를 생성합니다.
    pub fn new(
        store: Arc<dyn ObjectStore>,
        publisher: Arc<dyn AlertPublisher>,
        config: &PipelineConfig,
    ) -> Self {
        Self {
            store,
            publisher,
            analyzer: AnomalyAnalyzer::from_config(config),
            alert_subject: config.alert_subject.clone(),
        }
    }

    /// 요약 생성 알림 하나를 처리합니다.
    ///
    /// 생성된 알림 메시지들을 반환합니다 (발행했으면 비어 있지 않음).
    pub async fn handle(&self, event: &ObjectEvent) -> Result<Vec<AlertMessage>, MonitorError> {
        let summary = self.fetch_summary(&event.bucket, &event.key).await?;
        let alerts = self.analyzer.analyze(&summary);

        if alerts.is_empty() {
            tracing::debug!(key = %event.key, "summary within thresholds");
            return Ok(alerts);
        }

        let body = AlertMessage::join(&alerts);
        self.publisher.publish(&self.alert_subject, &body).await?;
        counter!(m::MONITOR_ALERTS_SENT_TOTAL).increment(1);
        tracing::info!(
            key = %event.key,
            alert_count = alerts.len(),
            "alert notification published"
        );

        Ok(alerts)
    }

    /// 알림 배치를 처리합니다.
    ///
    /// 각 알림은 독립적으로 처리되며, 하나의 실패가 나머지의 처리를
    /// 중단시키지 않습니다.
    pub async fn handle_batch(&self, events: &[ObjectEvent]) {
        for event in events {
            if let Err(e) = self.handle(event).await {
                counter!(m::MONITOR_SUMMARIES_SKIPPED_TOTAL).increment(1);
                tracing::warn!(
                    bucket = %event.bucket,
                    key = %event.key,
                    error = %e,
                    "skipping summary notification"
                );
            }
        }
    }

    async fn fetch_summary(&self, bucket: &str, key: &str) -> Result<FileSummary, SummaryError> {
        let body = self
            .store
            .get(bucket, key)
            .await
            // 없든 읽기 실패든 모니터 입장에서는 같은 결론입니다
            .map_err(|_| SummaryError::NotFound {
                bucket: bucket.to_owned(),
                key: key.to_owned(),
            })?;

        serde_json::from_slice(&body).map_err(|e| SummaryError::Parse {
            bucket: bucket.to_owned(),
            key: key.to_owned(),
            reason: e.to_string(),
        })
    }
}
