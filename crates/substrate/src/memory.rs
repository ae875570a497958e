//! 인메모리 substrate 구현
//!
//! 프로세스 안에서 동작하는 객체 스토어, 작업 큐, 알림 채널, 메트릭
//! 싱크입니다. 데몬의 기본 배선과 테스트가 사용하며, 실패 경로를
//! 시험할 수 있도록 쓰기 실패 토글을 제공합니다.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use bytes::Bytes;
use tokio::sync::mpsc;

use logsift_core::error::{MetricError, PublishError, QueueError, StoreError};
use logsift_core::message::ObjectEvent;
use logsift_core::substrate::{
    AlertPublisher, BoxFuture, MetricDatum, MetricsSink, ObjectStore, QueueMessage, TaskQueue,
};

// ─── MemoryObjectStore ──────────────────────────────────────────────

/// 버킷별 감시자
struct BucketWatcher {
    bucket: String,
    tx: mpsc::Sender<ObjectEvent>,
}

/// 인메모리 객체 스토어
///
/// `put` 성공 시 해당 버킷을 감시하는 채널로 [`ObjectEvent`]를
/// 보냅니다. 이것이 객체 생성 알림의 원천입니다.
pub struct MemoryObjectStore {
    objects: Mutex<HashMap<(String, String), Bytes>>,
    watchers: Mutex<Vec<BucketWatcher>>,
    fail_writes: AtomicBool,
}

impl MemoryObjectStore {
    /// 빈 스토어를 생성합니다.
    pub fn new() -> Self {
        Self {
            objects: Mutex::new(HashMap::new()),
            watchers: Mutex::new(Vec::new()),
            fail_writes: AtomicBool::new(false),
        }
    }

    /// 버킷에 대한 객체 생성 감시자를 등록합니다.
    pub fn watch_bucket(&self, bucket: impl Into<String>, tx: mpsc::Sender<ObjectEvent>) {
        self.watchers
            .lock()
            .expect("object store watcher lock poisoned")
            .push(BucketWatcher {
                bucket: bucket.into(),
                tx,
            });
    }

    /// 이후의 모든 `put`을 실패시킬지 설정합니다 (테스트용).
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// 저장된 객체 수를 반환합니다.
    pub fn len(&self) -> usize {
        self.objects
            .lock()
            .expect("object store lock poisoned")
            .len()
    }

    /// 스토어가 비어 있는지 반환합니다.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for MemoryObjectStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ObjectStore for MemoryObjectStore {
    fn get(&self, bucket: &str, key: &str) -> BoxFuture<'_, Result<Bytes, StoreError>> {
        let bucket = bucket.to_owned();
        let key = key.to_owned();
        Box::pin(async move {
            self.objects
                .lock()
                .expect("object store lock poisoned")
                .get(&(bucket.clone(), key.clone()))
                .cloned()
                .ok_or(StoreError::NotFound { bucket, key })
        })
    }

    fn put(&self, bucket: &str, key: &str, body: Bytes) -> BoxFuture<'_, Result<(), StoreError>> {
        let bucket = bucket.to_owned();
        let key = key.to_owned();
        Box::pin(async move {
            if self.fail_writes.load(Ordering::SeqCst) {
                return Err(StoreError::Write {
                    bucket,
                    key,
                    reason: "writes disabled".to_owned(),
                });
            }

            self.objects
                .lock()
                .expect("object store lock poisoned")
                .insert((bucket.clone(), key.clone()), body);

            // await 전에 락을 놓기 위해 송신측만 복제합니다
            let interested: Vec<mpsc::Sender<ObjectEvent>> = self
                .watchers
                .lock()
                .expect("object store watcher lock poisoned")
                .iter()
                .filter(|w| w.bucket == bucket)
                .map(|w| w.tx.clone())
                .collect();

            let event = ObjectEvent {
                bucket: bucket.clone(),
                key: key.clone(),
            };
            for tx in interested {
                if tx.send(event.clone()).await.is_err() {
                    tracing::debug!(bucket = %bucket, "object watcher dropped");
                }
            }

            Ok(())
        })
    }
}

// ─── MemoryTaskQueue ────────────────────────────────────────────────

struct StoredMessage {
    body: Bytes,
    receive_count: u32,
}

struct InFlight {
    body: Bytes,
    receive_count: u32,
    deadline: Instant,
}

struct QueueInner {
    ready: VecDeque<StoredMessage>,
    in_flight: HashMap<String, InFlight>,
}

/// at-least-once 의미론을 갖는 인메모리 작업 큐
///
/// `receive`된 메시지는 가시성 타임아웃 동안 in-flight 상태가 되고,
/// 기한 안에 `delete`되지 않으면 수신 횟수를 올려 다시 ready로
/// 돌아갑니다. 최대 수신 횟수를 넘긴 메시지는 만료되어 버려집니다.
pub struct MemoryTaskQueue {
    inner: Mutex<QueueInner>,
    visibility_timeout: Duration,
    max_receive_count: u32,
    capacity: Option<usize>,
}

impl MemoryTaskQueue {
    /// 가시성 타임아웃(초)과 최대 수신 횟수를 지정하여 큐를 생성합니다.
    pub fn new(visibility_timeout_secs: u64, max_receive_count: u32) -> Self {
        Self {
            inner: Mutex::new(QueueInner {
                ready: VecDeque::new(),
                in_flight: HashMap::new(),
            }),
            visibility_timeout: Duration::from_secs(visibility_timeout_secs),
            max_receive_count,
            capacity: None,
        }
    }

    /// 큐 최대 용량을 설정합니다 (ready + in-flight 합산).
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = Some(capacity);
        self
    }

    /// 수신 가능한 메시지 수를 반환합니다 (in-flight 제외).
    pub fn ready_len(&self) -> usize {
        self.inner
            .lock()
            .expect("task queue lock poisoned")
            .ready
            .len()
    }

    /// in-flight 메시지 수를 반환합니다.
    pub fn in_flight_len(&self) -> usize {
        self.inner
            .lock()
            .expect("task queue lock poisoned")
            .in_flight
            .len()
    }

    /// 모든 in-flight 메시지의 가시성 기한을 즉시 만료시킵니다.
    ///
    /// 테스트에서 재전달을 기다리지 않고 앞당기기 위한 수단입니다.
    pub fn expire_in_flight(&self) {
        let mut inner = self.inner.lock().expect("task queue lock poisoned");
        let now = Instant::now();
        for entry in inner.in_flight.values_mut() {
            entry.deadline = now;
        }
    }

    /// 기한이 지난 in-flight 메시지를 ready로 되돌립니다.
    ///
    /// 최대 수신 횟수에 도달한 메시지는 되돌리지 않고 만료시킵니다.
    fn requeue_expired(inner: &mut QueueInner, max_receive_count: u32) {
        let now = Instant::now();
        let expired: Vec<String> = inner
            .in_flight
            .iter()
            .filter(|(_, v)| v.deadline <= now)
            .map(|(k, _)| k.clone())
            .collect();

        for receipt in expired {
            if let Some(entry) = inner.in_flight.remove(&receipt) {
                if entry.receive_count >= max_receive_count {
                    tracing::warn!(
                        receive_count = entry.receive_count,
                        "message exceeded max receive count, expiring"
                    );
                    continue;
                }
                inner.ready.push_back(StoredMessage {
                    body: entry.body,
                    receive_count: entry.receive_count,
                });
            }
        }
    }
}

impl TaskQueue for MemoryTaskQueue {
    fn send(&self, body: Bytes) -> BoxFuture<'_, Result<(), QueueError>> {
        Box::pin(async move {
            let mut inner = self.inner.lock().expect("task queue lock poisoned");
            if let Some(capacity) = self.capacity
                && inner.ready.len() + inner.in_flight.len() >= capacity
            {
                return Err(QueueError::Send(format!("queue full (capacity {capacity})")));
            }
            inner.ready.push_back(StoredMessage {
                body,
                receive_count: 0,
            });
            Ok(())
        })
    }

    fn receive(&self, max: usize) -> BoxFuture<'_, Result<Vec<QueueMessage>, QueueError>> {
        Box::pin(async move {
            let mut inner = self.inner.lock().expect("task queue lock poisoned");
            Self::requeue_expired(&mut inner, self.max_receive_count);

            let mut messages = Vec::new();
            while messages.len() < max {
                let Some(stored) = inner.ready.pop_front() else {
                    break;
                };
                let receipt = uuid::Uuid::new_v4().to_string();
                let receive_count = stored.receive_count + 1;
                inner.in_flight.insert(
                    receipt.clone(),
                    InFlight {
                        body: stored.body.clone(),
                        receive_count,
                        deadline: Instant::now() + self.visibility_timeout,
                    },
                );
                messages.push(QueueMessage {
                    receipt,
                    body: stored.body,
                    receive_count,
                });
            }
            Ok(messages)
        })
    }

    fn delete(&self, receipt: &str) -> BoxFuture<'_, Result<(), QueueError>> {
        let receipt = receipt.to_owned();
        Box::pin(async move {
            let removed = self
                .inner
                .lock()
                .expect("task queue lock poisoned")
                .in_flight
                .remove(&receipt);
            match removed {
                Some(_) => Ok(()),
                None => Err(QueueError::Delete {
                    receipt,
                    reason: "unknown or already expired receipt".to_owned(),
                }),
            }
        })
    }
}

// ─── MemoryAlertPublisher ───────────────────────────────────────────

/// 발행된 알림을 기록하는 인메모리 알림 채널
pub struct MemoryAlertPublisher {
    published: Mutex<Vec<(String, String)>>,
}

impl MemoryAlertPublisher {
    /// 빈 채널을 생성합니다.
    pub fn new() -> Self {
        Self {
            published: Mutex::new(Vec::new()),
        }
    }

    /// 지금까지 발행된 (제목, 본문) 쌍을 반환합니다.
    pub fn published(&self) -> Vec<(String, String)> {
        self.published
            .lock()
            .expect("alert publisher lock poisoned")
            .clone()
    }
}

impl Default for MemoryAlertPublisher {
    fn default() -> Self {
        Self::new()
    }
}

impl AlertPublisher for MemoryAlertPublisher {
    fn publish(&self, subject: &str, body: &str) -> BoxFuture<'_, Result<(), PublishError>> {
        let subject = subject.to_owned();
        let body = body.to_owned();
        Box::pin(async move {
            self.published
                .lock()
                .expect("alert publisher lock poisoned")
                .push((subject, body));
            Ok(())
        })
    }
}

// ─── RecordingMetricsSink ───────────────────────────────────────────

/// 전송된 메트릭을 기록하는 인메모리 싱크
pub struct RecordingMetricsSink {
    emitted: Mutex<Vec<(String, Vec<MetricDatum>)>>,
    fail: AtomicBool,
}

impl RecordingMetricsSink {
    /// 빈 싱크를 생성합니다.
    pub fn new() -> Self {
        Self {
            emitted: Mutex::new(Vec::new()),
            fail: AtomicBool::new(false),
        }
    }

    /// 이후의 모든 `emit`을 실패시킬지 설정합니다 (테스트용).
    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// 지금까지 전송된 (네임스페이스, 데이터) 쌍을 반환합니다.
    pub fn emitted(&self) -> Vec<(String, Vec<MetricDatum>)> {
        self.emitted
            .lock()
            .expect("metrics sink lock poisoned")
            .clone()
    }
}

impl Default for RecordingMetricsSink {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsSink for RecordingMetricsSink {
    fn emit(
        &self,
        namespace: &str,
        data: &[MetricDatum],
    ) -> BoxFuture<'_, Result<(), MetricError>> {
        let namespace = namespace.to_owned();
        let data = data.to_vec();
        Box::pin(async move {
            if self.fail.load(Ordering::SeqCst) {
                return Err(MetricError::Emit {
                    namespace,
                    reason: "sink disabled".to_owned(),
                });
            }
            self.emitted
                .lock()
                .expect("metrics sink lock poisoned")
                .push((namespace, data));
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn store_get_missing_is_not_found() {
        let store = MemoryObjectStore::new();
        let err = store.get("b", "k").await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }

    #[tokio::test]
    async fn store_put_then_get() {
        let store = MemoryObjectStore::new();
        store.put("b", "k", Bytes::from_static(b"data")).await.unwrap();
        let body = store.get("b", "k").await.unwrap();
        assert_eq!(&body[..], b"data");
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn store_put_overwrites() {
        let store = MemoryObjectStore::new();
        store.put("b", "k", Bytes::from_static(b"one")).await.unwrap();
        store.put("b", "k", Bytes::from_static(b"two")).await.unwrap();
        assert_eq!(&store.get("b", "k").await.unwrap()[..], b"two");
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn store_fail_writes_toggle() {
        let store = MemoryObjectStore::new();
        store.set_fail_writes(true);
        let err = store
            .put("b", "k", Bytes::from_static(b"data"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Write { .. }));
        assert!(store.is_empty());

        store.set_fail_writes(false);
        store.put("b", "k", Bytes::from_static(b"data")).await.unwrap();
    }

    #[tokio::test]
    async fn store_watcher_receives_put_events() {
        let store = MemoryObjectStore::new();
        let (tx, mut rx) = mpsc::channel(4);
        store.watch_bucket("watched", tx);

        store
            .put("watched", "k1", Bytes::from_static(b"x"))
            .await
            .unwrap();
        store
            .put("other", "k2", Bytes::from_static(b"y"))
            .await
            .unwrap();

        let event = rx.recv().await.unwrap();
        assert_eq!(event.bucket, "watched");
        assert_eq!(event.key, "k1");
        // 다른 버킷의 put은 전달되지 않아야 합니다
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn store_watcher_drop_does_not_fail_put() {
        let store = MemoryObjectStore::new();
        let (tx, rx) = mpsc::channel(1);
        store.watch_bucket("b", tx);
        drop(rx);
        store.put("b", "k", Bytes::from_static(b"x")).await.unwrap();
    }

    #[tokio::test]
    async fn queue_send_receive_delete() {
        let queue = MemoryTaskQueue::new(30, 5);
        queue.send(Bytes::from_static(b"task")).await.unwrap();
        assert_eq!(queue.ready_len(), 1);

        let messages = queue.receive(10).await.unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(&messages[0].body[..], b"task");
        assert_eq!(messages[0].receive_count, 1);
        assert_eq!(queue.in_flight_len(), 1);

        queue.delete(&messages[0].receipt).await.unwrap();
        assert_eq!(queue.in_flight_len(), 0);
        assert!(queue.receive(10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn queue_receive_is_fifo() {
        let queue = MemoryTaskQueue::new(30, 5);
        queue.send(Bytes::from_static(b"one")).await.unwrap();
        queue.send(Bytes::from_static(b"two")).await.unwrap();

        let messages = queue.receive(10).await.unwrap();
        assert_eq!(&messages[0].body[..], b"one");
        assert_eq!(&messages[1].body[..], b"two");
    }

    #[tokio::test]
    async fn queue_unacked_message_is_redelivered() {
        let queue = MemoryTaskQueue::new(30, 5);
        queue.send(Bytes::from_static(b"task")).await.unwrap();

        let first = queue.receive(1).await.unwrap().remove(0);
        // ack 없이 가시성 기한만 만료
        queue.expire_in_flight();

        let second = queue.receive(1).await.unwrap().remove(0);
        assert_eq!(second.body, first.body);
        assert_eq!(second.receive_count, 2);
    }

    #[tokio::test]
    async fn queue_message_invisible_during_timeout() {
        let queue = MemoryTaskQueue::new(30, 5);
        queue.send(Bytes::from_static(b"task")).await.unwrap();

        let _held = queue.receive(1).await.unwrap();
        // 기한이 남아 있으므로 다른 소비자는 받지 못합니다
        assert!(queue.receive(1).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn queue_expires_after_max_receive_count() {
        let queue = MemoryTaskQueue::new(30, 2);
        queue.send(Bytes::from_static(b"task")).await.unwrap();

        for _ in 0..2 {
            let messages = queue.receive(1).await.unwrap();
            assert_eq!(messages.len(), 1);
            queue.expire_in_flight();
        }

        // 수신 2회를 소진했으므로 만료되어야 합니다
        assert!(queue.receive(1).await.unwrap().is_empty());
        assert_eq!(queue.ready_len(), 0);
        assert_eq!(queue.in_flight_len(), 0);
    }

    #[tokio::test]
    async fn queue_rejects_sends_over_capacity() {
        let queue = MemoryTaskQueue::new(30, 5).with_capacity(2);
        queue.send(Bytes::from_static(b"one")).await.unwrap();
        queue.send(Bytes::from_static(b"two")).await.unwrap();

        let err = queue.send(Bytes::from_static(b"three")).await.unwrap_err();
        assert!(matches!(err, QueueError::Send(_)));

        // in-flight 메시지도 용량에 포함됩니다
        let _held = queue.receive(1).await.unwrap();
        assert!(queue.send(Bytes::from_static(b"three")).await.is_err());
    }

    #[tokio::test]
    async fn queue_delete_unknown_receipt_fails() {
        let queue = MemoryTaskQueue::new(30, 5);
        let err = queue.delete("no-such-receipt").await.unwrap_err();
        assert!(matches!(err, QueueError::Delete { .. }));
    }

    #[tokio::test]
    async fn queue_delete_after_expiry_fails() {
        let queue = MemoryTaskQueue::new(30, 5);
        queue.send(Bytes::from_static(b"task")).await.unwrap();
        let message = queue.receive(1).await.unwrap().remove(0);

        queue.expire_in_flight();
        let _redelivered = queue.receive(1).await.unwrap();

        // 만료된 수신 핸들은 더 이상 유효하지 않습니다
        assert!(queue.delete(&message.receipt).await.is_err());
    }

    #[tokio::test]
    async fn publisher_records_in_order() {
        let publisher = MemoryAlertPublisher::new();
        publisher.publish("s1", "b1").await.unwrap();
        publisher.publish("s2", "b2").await.unwrap();

        let published = publisher.published();
        assert_eq!(published.len(), 2);
        assert_eq!(published[0], ("s1".to_owned(), "b1".to_owned()));
        assert_eq!(published[1], ("s2".to_owned(), "b2".to_owned()));
    }

    #[tokio::test]
    async fn sink_records_and_fails_on_demand() {
        let sink = RecordingMetricsSink::new();
        sink.emit("WebServerLogs", &[MetricDatum::count("TotalRequests", 10)])
            .await
            .unwrap();
        assert_eq!(sink.emitted().len(), 1);

        sink.set_fail(true);
        let err = sink
            .emit("WebServerLogs", &[MetricDatum::count("ErrorCount", 1)])
            .await
            .unwrap_err();
        assert!(matches!(err, MetricError::Emit { .. }));
        assert_eq!(sink.emitted().len(), 1);
    }
}
