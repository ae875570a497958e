//! 에러 타입 — 도메인별 에러 정의

/// Logsift 최상위 에러 타입
#[derive(Debug, thiserror::Error)]
pub enum LogsiftError {
    /// 설정 관련 에러
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// 객체 스토어 에러
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// 작업 큐 에러
    #[error("queue error: {0}")]
    Queue(#[from] QueueError),

    /// 알림 채널 발행 에러
    #[error("publish error: {0}")]
    Publish(#[from] PublishError),

    /// 메트릭 싱크 에러
    #[error("metric error: {0}")]
    Metric(#[from] MetricError),

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

/// 객체 스토어 에러
///
/// 원본 로그 객체 읽기와 요약 아티팩트 쓰기에서 발생하는 에러를 포괄합니다.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// 객체가 존재하지 않음
    #[error("object not found: {bucket}/{key}")]
    NotFound { bucket: String, key: String },

    /// 객체 읽기 실패
    #[error("failed to read object {bucket}/{key}: {reason}")]
    Read {
        bucket: String,
        key: String,
        reason: String,
    },

    /// 객체 쓰기 실패
    #[error("failed to write object {bucket}/{key}: {reason}")]
    Write {
        bucket: String,
        key: String,
        reason: String,
    },
}

/// 작업 큐 에러
#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    /// 메시지 전송 실패
    #[error("queue send failed: {0}")]
    Send(String),

    /// 메시지 수신 실패
    #[error("queue receive failed: {0}")]
    Receive(String),

    /// 메시지 삭제(ack) 실패
    #[error("queue delete failed for receipt '{receipt}': {reason}")]
    Delete { receipt: String, reason: String },
}

/// 알림 채널 발행 에러
#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    /// 알림 발행 실패
    #[error("failed to publish notification: {0}")]
    Failed(String),
}

/// 메트릭 싱크 에러
#[derive(Debug, thiserror::Error)]
pub enum MetricError {
    /// 메트릭 전송 실패
    #[error("failed to emit metrics to namespace '{namespace}': {reason}")]
    Emit { namespace: String, reason: String },
}
