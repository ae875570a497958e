//! Substrate trait — 외부 협력자 추상화
//!
//! 객체 스토어, 작업 큐, 알림 채널, 메트릭 싱크는 코어가 직접 소유하지
//! 않는 외부 협력자입니다. 각 컴포넌트는 이 trait들을 생성 시점에
//! 주입받으므로, 테스트에서는 인메모리 구현으로 대체할 수 있습니다.
//!
//! 모든 메서드는 [`BoxFuture`]를 반환하여 trait 객체(`Arc<dyn ...>`)가
//! `tokio::spawn` 경계를 넘을 수 있게 합니다.

use std::future::Future;
use std::pin::Pin;

use bytes::Bytes;

use crate::error::{MetricError, PublishError, QueueError, StoreError};

/// Send 가능한 박스 future
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// 키-값 객체 스토어
///
/// 원본 로그 버킷과 처리 결과 버킷 모두 이 trait으로 접근합니다.
/// 재시도는 substrate의 전송 계층 책임이며 여기서 재구현하지 않습니다.
pub trait ObjectStore: Send + Sync {
    /// 객체 본문을 읽습니다.
    fn get(&self, bucket: &str, key: &str) -> BoxFuture<'_, Result<Bytes, StoreError>>;

    /// 객체를 씁니다. 같은 키에 대한 쓰기는 덮어쓰기입니다.
    fn put(&self, bucket: &str, key: &str, body: Bytes) -> BoxFuture<'_, Result<(), StoreError>>;
}

/// 수신된 큐 메시지
///
/// `receipt`는 이번 수신에 대한 소유권 핸들입니다. 처리를 마친 뒤
/// `delete`에 넘겨야 메시지가 큐에서 제거되며, 넘기지 않으면 가시성
/// 타임아웃 이후 재전달됩니다.
#[derive(Debug, Clone)]
pub struct QueueMessage {
    /// 이번 수신의 소유권 핸들
    pub receipt: String,
    /// 메시지 본문
    pub body: Bytes,
    /// 지금까지의 수신 횟수 (1부터 시작)
    pub receive_count: u32,
}

/// at-least-once 전달을 제공하는 작업 큐
///
/// 전달 보장과 재전달 정책은 substrate가 관리합니다. 코어는 수신한
/// 메시지를 성공 시에만 `delete`(ack)하고, 실패 시에는 그대로 두어
/// 큐의 재전달/만료 정책에 맡깁니다.
pub trait TaskQueue: Send + Sync {
    /// 메시지를 큐에 넣습니다.
    fn send(&self, body: Bytes) -> BoxFuture<'_, Result<(), QueueError>>;

    /// 최대 `max`개의 메시지를 수신합니다. 수신된 메시지는 가시성
    /// 타임아웃 동안 다른 소비자에게 보이지 않습니다.
    fn receive(&self, max: usize) -> BoxFuture<'_, Result<Vec<QueueMessage>, QueueError>>;

    /// 수신 핸들로 메시지를 큐에서 제거(ack)합니다.
    fn delete(&self, receipt: &str) -> BoxFuture<'_, Result<(), QueueError>>;
}

/// 발행/구독 알림 채널
pub trait AlertPublisher: Send + Sync {
    /// 제목과 본문으로 알림 하나를 발행합니다.
    fn publish(&self, subject: &str, body: &str) -> BoxFuture<'_, Result<(), PublishError>>;
}

/// 메트릭 데이터 포인트
#[derive(Debug, Clone, PartialEq)]
pub struct MetricDatum {
    /// 메트릭 이름 (예: "TotalRequests")
    pub name: String,
    /// 값
    pub value: f64,
    /// 단위 (예: "Count")
    pub unit: String,
}

impl MetricDatum {
    /// Count 단위 카운터 데이터 포인트를 생성합니다.
    pub fn count(name: impl Into<String>, value: u64) -> Self {
        Self {
            name: name.into(),
            value: value as f64,
            unit: "Count".to_owned(),
        }
    }
}

/// 네임스페이스 단위 메트릭 싱크
///
/// 처리 워커가 파일별 비즈니스 카운터를 내보내는 채널입니다.
/// 내부 관측용 self-metric(`metrics` crate)과는 별개의 경로이며,
/// 전송 실패는 [`MetricError`]로 반환되어 데드레터 판정에 쓰입니다.
pub trait MetricsSink: Send + Sync {
    /// 네임스페이스 아래로 데이터 포인트들을 내보냅니다.
    fn emit(
        &self,
        namespace: &str,
        data: &[MetricDatum],
    ) -> BoxFuture<'_, Result<(), MetricError>>;
}
