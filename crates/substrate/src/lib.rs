#![doc = include_str!("../README.md")]

pub mod memory;

// --- 주요 타입 re-export ---

pub use memory::{MemoryAlertPublisher, MemoryObjectStore, MemoryTaskQueue, RecordingMetricsSink};
