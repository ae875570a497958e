//! 파이프라인 에러 타입
//!
//! 단계별로 에러의 운명이 다릅니다. 줄 단위 파싱 에러는 집계를 벗어나지
//! 않고, 파일 단위 처리 에러는 항상 데드레터로 향하며, 모니터 단계의
//! 에러는 로깅 후 무시됩니다.

use logsift_core::error::{MetricError, PublishError, QueueError, StoreError};

/// 문법에 맞지 않는 로그 줄
///
/// 줄 하나에 국한된 회복 가능한 에러입니다. 집계는 해당 줄을 건너뛰고
/// 계속 진행합니다.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MalformedLineError {
    /// 줄이 access log 문법과 일치하지 않음
    #[error("invalid log line format: {line}")]
    Grammar {
        /// 원본 줄
        line: String,
    },

    /// 타임스탬프 형식 불일치 (문법 에러의 하위 종류)
    #[error("invalid timestamp '{value}': {reason}")]
    Timestamp {
        /// 대괄호 안의 원본 문자열
        value: String,
        /// 파싱 실패 사유
        reason: String,
    },

    /// bytes 필드를 숫자로 읽을 수 없음
    #[error("invalid bytes field '{value}'")]
    Bytes {
        /// 원본 값
        value: String,
    },
}

/// 메타데이터 추출 실패
///
/// ingest 단계의 회복 가능한 에러입니다. 해당 객체는 큐에 오르지 않을
/// 뿐, 프로세스는 계속 동작합니다.
#[derive(Debug, thiserror::Error)]
pub enum MetadataError {
    /// 객체를 읽을 수 없음
    #[error("cannot read object {bucket}/{key}: {reason}")]
    Unreadable {
        bucket: String,
        key: String,
        reason: String,
    },

    /// 타임스탬프를 포함한 줄이 하나도 없음
    #[error("no timestamp-bearing line in object {bucket}/{key}")]
    NoTimestamp { bucket: String, key: String },
}

/// ingest 단계 에러
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    /// 메타데이터 추출 실패
    #[error(transparent)]
    Metadata(#[from] MetadataError),

    /// 작업 큐 전송 실패
    #[error("failed to enqueue processing task: {0}")]
    Enqueue(#[from] QueueError),
}

/// 파일 처리 에러
///
/// 처리 워커에서 발생하는 모든 에러는 구분 없이 데드레터 경로로
/// 라우팅됩니다.
#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    /// 작업 메시지 역직렬화 실패
    #[error("invalid task message: {0}")]
    Task(String),

    /// 객체 읽기/쓰기 실패
    #[error(transparent)]
    Store(#[from] StoreError),

    /// 요약 직렬화 실패
    #[error("failed to encode summary: {0}")]
    Encode(String),

    /// 메트릭 전송 실패
    #[error(transparent)]
    Metric(#[from] MetricError),
}

/// 요약 아티팩트 읽기 에러
///
/// 모니터 단계의 회복 가능한 에러입니다. 해당 알림만 건너뛰며
/// 재시도하지 않습니다.
#[derive(Debug, thiserror::Error)]
pub enum SummaryError {
    /// 요약이 없거나 읽을 수 없음
    #[error("summary not found: {bucket}/{key}")]
    NotFound { bucket: String, key: String },

    /// 요약 역직렬화 실패
    #[error("failed to parse summary {bucket}/{key}: {reason}")]
    Parse {
        bucket: String,
        key: String,
        reason: String,
    },
}

/// 모니터 단계 에러
#[derive(Debug, thiserror::Error)]
pub enum MonitorError {
    /// 요약 읽기 실패
    #[error(transparent)]
    Summary(#[from] SummaryError),

    /// 알림 발행 실패
    #[error("failed to publish alert: {0}")]
    Publish(#[from] PublishError),
}
