//! 메시지 타입 — 단계 간 통신의 와이어 형식
//!
//! 작업 큐와 데드레터 채널, 객체 생성 알림에 실리는 메시지를 정의합니다.
//! 직렬화 필드명은 외부 계약이므로 변경하면 안 됩니다.

use std::fmt;

use serde::{Deserialize, Serialize};

/// 처리 작업 메시지
///
/// ingest 단계가 작업 큐에 싣는 메시지입니다. `log_count`와 시간 범위는
/// ingest 시점에 싸게 계산한 힌트일 뿐이며, 처리 워커가 파일에서 다시
/// 정확한 값을 계산합니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessingTask {
    /// 원본 객체의 버킷
    pub bucket: String,
    /// 원본 객체의 키
    pub key: String,
    /// 비어 있지 않은 줄 수 (힌트)
    pub log_count: u64,
    /// 첫 타임스탬프 힌트
    pub start_date: String,
    /// 마지막 타임스탬프 힌트
    pub end_date: String,
}

impl fmt::Display for ProcessingTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{} lines~{} span=[{} .. {}]",
            self.bucket, self.key, self.log_count, self.start_date, self.end_date,
        )
    }
}

/// 데드레터 엔트리
///
/// 처리에 실패한 작업의 원본 메시지와 실패 사유를 담습니다.
/// 추가 전용이며 수정되지 않습니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeadLetterEntry {
    /// 직렬화된 원본 작업 메시지
    pub original_message: String,
    /// 실패 사유
    pub error: String,
}

/// 객체 생성 알림
///
/// 객체 스토어가 새 객체의 도착을 알릴 때 사용합니다.
/// 원본 로그 버킷에서는 ingest를, 요약 버킷에서는 모니터를 트리거합니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectEvent {
    /// 객체가 생성된 버킷
    pub bucket: String,
    /// 생성된 객체의 키
    pub key: String,
}

impl fmt::Display for ObjectEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.bucket, self.key)
    }
}

/// 이상 징후 알림 메시지
///
/// 사람이 읽는 한 줄짜리 문자열입니다. 여러 개가 생성되면
/// 개행으로 이어 붙여 하나의 알림으로 발행됩니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertMessage(pub String);

impl AlertMessage {
    /// 알림 목록을 하나의 본문으로 합칩니다.
    pub fn join(alerts: &[AlertMessage]) -> String {
        alerts
            .iter()
            .map(|a| a.0.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl fmt::Display for AlertMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
