#![doc = include_str!("../README.md")]

pub mod config;
pub mod error;
pub mod message;
pub mod metrics;
pub mod substrate;
pub mod types;

// --- 주요 타입 re-export ---
// 각 모듈의 핵심 타입을 크레이트 루트에서 바로 사용할 수 있도록 합니다.

// 에러
pub use error::{
    ConfigError, LogsiftError, MetricError, PublishError, QueueError, StoreError,
};

// 설정
pub use config::LogsiftConfig;

// 메시지
pub use message::{AlertMessage, DeadLetterEntry, ObjectEvent, ProcessingTask};

// substrate trait
pub use substrate::{
    AlertPublisher, BoxFuture, MetricDatum, MetricsSink, ObjectStore, QueueMessage, TaskQueue,
};

// 도메인 타입
pub use types::{FileSummary, RequestRecord};
