//! 파이프라인 설정
//!
//! [`PipelineConfig`]는 core의 [`LogsiftConfig`](logsift_core::config::LogsiftConfig)에서
//! 파이프라인 컴포넌트가 쓰는 값만 추린 설정입니다.
//!
//! # 사용 예시
//! ```
//! use logsift_core::config::LogsiftConfig;
//! use logsift_pipeline::config::PipelineConfig;
//!
//! let core_config = LogsiftConfig::default();
//! let config = PipelineConfig::from_core(&core_config);
//! assert_eq!(config.metric_namespace, "WebServerLogs");
//! ```

use serde::{Deserialize, Serialize};

/// 파이프라인 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// 요약 아티팩트를 저장할 버킷명
    pub processed_bucket: String,
    /// 비즈니스 메트릭 네임스페이스
    pub metric_namespace: String,
    /// 알림 제목
    pub alert_subject: String,
    /// 에러율 경보 임계값 (비율)
    pub error_rate_threshold: f64,
    /// 트래픽 스파이크 경보 임계값 (요청 수)
    pub spike_threshold: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            processed_bucket: "processed-logs".to_owned(),
            metric_namespace: "WebServerLogs".to_owned(),
            alert_subject: "Web Server Log Alert".to_owned(),
            error_rate_threshold: 0.05,
            spike_threshold: 10_000,
        }
    }
}

impl PipelineConfig {
    /// core 설정에서 파이프라인 설정을 생성합니다.
    pub fn from_core(core: &logsift_core::config::LogsiftConfig) -> Self {
        Self {
            processed_bucket: core.processing.processed_bucket.clone(),
            metric_namespace: core.processing.metric_namespace.clone(),
            alert_subject: core.monitor.alert_subject.clone(),
            error_rate_threshold: core.monitor.error_rate_threshold,
            spike_threshold: core.monitor.spike_threshold,
        }
    }
}
