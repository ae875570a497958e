//! 이상 탐지 — 요약 하나를 검사해 알림을 생성합니다.
//!
//! [`AnomalyAnalyzer`]는 파일 단위의 정적 임계값 검사입니다.
//! 과거 기준선도, 파일 간 상태도 없습니다. 두 규칙은 서로 독립적으로
//! 평가되므로 요약 하나가 0개, 1개, 또는 2개의 알림을 낼 수 있습니다.

use logsift_core::message::AlertMessage;
use logsift_core::types::FileSummary;

use crate::config::PipelineConfig;

/// 이상 탐지기
pub struct AnomalyAnalyzer {
    /// 에러율 경보 임계값 (비율)
    error_rate_threshold: f64,
    /// 트래픽 스파이크 경보 임계값 (요청 수)
    spike_threshold: u64,
}

impl AnomalyAnalyzer {
    /// 임계값을 지정하여 탐지기를 생성합니다.
    pub fn new(error_rate_threshold: f64, spike_threshold: u64) -> Self {
        Self {
            error_rate_threshold,
            spike_threshold,
        }
    }

    /// 파이프라인 설정에서 탐지기를 생성합니다.
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(config.error_rate_threshold, config.spike_threshold)
    }

    /// 요약 하나를 검사하여 알림 목록을 반환합니다.
    ///
    /// 요청이 0건이면 에러율 검사는 건너뜁니다 (0으로 나누지 않음).
    pub fn analyze(&self, summary: &FileSummary) -> Vec<AlertMessage> {
        let mut alerts = Vec::new();

        if summary.total_requests > 0 {
            let error_rate = summary.errors as f64 / summary.total_requests as f64;
            if error_rate > self.error_rate_threshold {
                alerts.push(AlertMessage(format!(
                    "High error rate detected: {:.2}%",
                    error_rate * 100.0
                )));
            }
        }

        if summary.total_requests > self.spike_threshold {
            alerts.push(AlertMessage(format!(
                "Unusual traffic spike detected: {} requests",
                summary.total_requests
            )));
        }

        alerts
    }
}

impl Default for AnomalyAnalyzer {
    fn default() -> Self {
        Self::from_config(&PipelineConfig::default())
    }
}
