//! Ingest 알림 처리 — 새 객체를 처리 작업으로 변환합니다.
//!
//! [`IngestNotifier`]는 객체 생성 알림을 받아 가벼운 메타데이터만 뽑고
//! 처리 작업을 큐에 올립니다. 전체 파싱은 하지 않습니다. 여기서 계산한
//! 줄 수와 시간 범위는 힌트일 뿐이며, 처리 워커가 파일에서 다시 정확한
//! 값을 계산합니다.
//!
//! 키 prefix/suffix 필터링은 트리거 배선(데몬)에서 적용되고,
//! 이 컴포넌트는 받은 알림을 모두 처리 대상으로 간주합니다.

use std::sync::Arc;

use metrics::counter;

use logsift_core::message::ProcessingTask;
use logsift_core::metrics as m;
use logsift_core::substrate::{ObjectStore, TaskQueue};

use crate::error::{IngestError, MetadataError};

/// Ingest 알림 처리기
pub struct IngestNotifier {
    /// 원본 로그 객체 스토어
    store: Arc<dyn ObjectStore>,
    /// 처리 작업 큐
    task_queue: Arc<dyn TaskQueue>,
}

impl IngestNotifier {
    /// 주입받은 substrate로 처리기를 생성합니다.
    pub fn new(store: Arc<dyn ObjectStore>, task_queue: Arc<dyn TaskQueue>) -> Self {
        Self { store, task_queue }
    }

    /// 객체 생성 알림 하나를 처리합니다.
    ///
    /// 성공하면 작업이 큐에 올라간 뒤 그 사본을 반환합니다.
    /// 메타데이터 추출에 실패하면 아무것도 큐에 올리지 않습니다.
    pub async fn on_object_created(
        &self,
        bucket: &str,
        key: &str,
    ) -> Result<ProcessingTask, IngestError> {
        let result = self.notify(bucket, key).await;
        match &result {
            Ok(task) => {
                counter!(m::INGEST_OBJECTS_TOTAL).increment(1);
                tracing::info!(
                    bucket,
                    key,
                    log_count = task.log_count,
                    "processing task enqueued"
                );
            }
            Err(e) => {
                counter!(m::INGEST_FAILURES_TOTAL).increment(1);
                tracing::warn!(bucket, key, error = %e, "object not enqueued");
            }
        }
        result
    }

    async fn notify(&self, bucket: &str, key: &str) -> Result<ProcessingTask, IngestError> {
        let body = self.store.get(bucket, key).await.map_err(|e| {
            MetadataError::Unreadable {
                bucket: bucket.to_owned(),
                key: key.to_owned(),
                reason: e.to_string(),
            }
        })?;
        let content = String::from_utf8_lossy(&body);

        let (log_count, span) = extract_metadata(&content);
        let (start_date, end_date) = span.ok_or_else(|| MetadataError::NoTimestamp {
            bucket: bucket.to_owned(),
            key: key.to_owned(),
        })?;

        let task = ProcessingTask {
            bucket: bucket.to_owned(),
            key: key.to_owned(),
            log_count,
            start_date,
            end_date,
        };

        let payload = serde_json::to_vec(&task)
            .map_err(|e| logsift_core::error::QueueError::Send(e.to_string()))?;
        self.task_queue.send(payload.into()).await?;

        Ok(task)
    }
}

/// 파일 내용에서 줄 수와 시간 범위 힌트를 추출합니다.
///
/// 비어 있지 않은 줄 수와, 그 줄들에서 처음/마지막으로 나타나는
/// `[...]` 대괄호 부분 문자열을 반환합니다. 대괄호가 없는 줄은
/// 힌트 계산에서만 건너뛰며 치명적이지 않습니다.
fn extract_metadata(content: &str) -> (u64, Option<(String, String)>) {
    let mut log_count = 0u64;
    let mut first: Option<String> = None;
    let mut last: Option<String> = None;

    for line in content.split('\n') {
        if line.trim().is_empty() {
            continue;
        }
        log_count += 1;

        if let Some(stamp) = bracketed_span(line) {
            if first.is_none() {
                first = Some(stamp.to_owned());
            }
            last = Some(stamp.to_owned());
        }
    }

    let span = match (first, last) {
        (Some(start), Some(end)) => Some((start, end)),
        _ => None,
    };
    (log_count, span)
}

/// 줄에서 첫 `[...]` 쌍의 내용을 찾습니다.
fn bracketed_span(line: &str) -> Option<&str> {
    let open = line.find('[')?;
    let rest = &line[open + 1..];
    let close = rest.find(']')?;
    Some(&rest[..close])
}

#[cfg(test)]
mod tests {
    use super::*;

    use bytes::Bytes;
    use logsift_substrate::{MemoryObjectStore, MemoryTaskQueue};

    fn sample_line(stamp: &str) -> String {
        format!(r#"10.0.0.1 - - [{stamp}] "GET / HTTP/1.1" 200 1 "-" "-""#)
    }

    fn notifier() -> (Arc<MemoryObjectStore>, Arc<MemoryTaskQueue>, IngestNotifier) {
        let store = Arc::new(MemoryObjectStore::new());
        let queue = Arc::new(MemoryTaskQueue::new(30, 5));
        let notifier = IngestNotifier::new(store.clone(), queue.clone());
        (store, queue, notifier)
    }

    #[test]
    fn bracketed_span_finds_first_pair() {
        assert_eq!(
            bracketed_span("x [10/Oct/2023:13:55:36 +0000] y [other]"),
            Some("10/Oct/2023:13:55:36 +0000")
        );
        assert_eq!(bracketed_span("no brackets"), None);
        assert_eq!(bracketed_span("open [ only"), None);
    }

    #[test]
    fn extract_metadata_counts_non_blank_lines() {
        let content = format!(
            "{}\n\n{}\n   \n{}",
            sample_line("a"),
            sample_line("b"),
            sample_line("c")
        );
        let (count, span) = extract_metadata(&content);
        assert_eq!(count, 3);
        assert_eq!(span, Some(("a".to_owned(), "c".to_owned())));
    }

    #[test]
    fn extract_metadata_skips_bracketless_lines_for_hints() {
        let content = format!("no brackets here\n{}\nplain text", sample_line("t1"));
        let (count, span) = extract_metadata(&content);
        assert_eq!(count, 3);
        assert_eq!(span, Some(("t1".to_owned(), "t1".to_owned())));
    }

    #[test]
    fn extract_metadata_no_brackets_anywhere() {
        let (count, span) = extract_metadata("one\ntwo\nthree");
        assert_eq!(count, 3);
        assert!(span.is_none());
    }

    #[tokio::test]
    async fn on_object_created_enqueues_task() {
        let (store, queue, notifier) = notifier();
        let content = format!(
            "{}\n{}",
            sample_line("10/Oct/2023:13:55:36 +0000"),
            sample_line("10/Oct/2023:14:00:00 +0000")
        );
        store
            .put("raw-logs", "logs/access.log", Bytes::from(content))
            .await
            .unwrap();

        let task = notifier
            .on_object_created("raw-logs", "logs/access.log")
            .await
            .unwrap();

        assert_eq!(task.bucket, "raw-logs");
        assert_eq!(task.key, "logs/access.log");
        assert_eq!(task.log_count, 2);
        assert_eq!(task.start_date, "10/Oct/2023:13:55:36 +0000");
        assert_eq!(task.end_date, "10/Oct/2023:14:00:00 +0000");

        // 큐에 오른 메시지가 반환된 작업과 동일해야 합니다
        let messages = queue.receive(1).await.unwrap();
        assert_eq!(messages.len(), 1);
        let queued: logsift_core::message::ProcessingTask =
            serde_json::from_slice(&messages[0].body).unwrap();
        assert_eq!(queued, task);
    }

    #[tokio::test]
    async fn missing_object_is_unreadable_error() {
        let (_store, queue, notifier) = notifier();
        let err = notifier
            .on_object_created("raw-logs", "logs/missing.log")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            IngestError::Metadata(MetadataError::Unreadable { .. })
        ));
        // 아무것도 큐에 오르지 않아야 합니다
        assert!(queue.receive(1).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn object_without_timestamps_is_no_timestamp_error() {
        let (store, queue, notifier) = notifier();
        store
            .put("raw-logs", "logs/garbage.log", Bytes::from_static(b"a\nb\nc"))
            .await
            .unwrap();

        let err = notifier
            .on_object_created("raw-logs", "logs/garbage.log")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            IngestError::Metadata(MetadataError::NoTimestamp { .. })
        ));
        assert!(queue.receive(1).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn single_line_file_has_equal_start_and_end() {
        let (store, _queue, notifier) = notifier();
        store
            .put(
                "raw-logs",
                "logs/one.log",
                Bytes::from(sample_line("10/Oct/2023:13:55:36 +0000")),
            )
            .await
            .unwrap();

        let task = notifier
            .on_object_created("raw-logs", "logs/one.log")
            .await
            .unwrap();
        assert_eq!(task.start_date, task.end_date);
        assert_eq!(task.log_count, 1);
    }
}
