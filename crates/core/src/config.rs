//! 설정 관리 — logsift.toml 파싱 및 런타임 설정
//!
//! [`LogsiftConfig`]는 모든 섹션의 설정을 담는 최상위 구조체입니다.
//!
//! # 설정 로딩 우선순위
//! 1. CLI 인자 (최고 우선)
//! 2. 환경변수 (`LOGSIFT_PROCESSING_WORKER_CONCURRENCY=8` 형식)
//! 3. 설정 파일 (`logsift.toml`)
//! 4. 기본값 (`Default` 구현)
//!
//! # 사용 예시
//! ```no_run
//! # async fn example() -> Result<(), logsift_core::error::LogsiftError> {
//! use logsift_core::config::LogsiftConfig;
//!
//! // 파일에서 로드 + 환경변수 오버라이드
//! let config = LogsiftConfig::load("logsift.toml").await?;
//!
//! // TOML 문자열에서 직접 파싱
//! let config = LogsiftConfig::parse("[general]\nlog_level = \"debug\"")?;
//! # Ok(())
//! # }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ConfigError, LogsiftError};

/// Logsift 통합 설정
///
/// `logsift.toml` 파일의 최상위 구조를 나타냅니다.
/// 각 컴포넌트는 자기 섹션만 읽어 사용합니다.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LogsiftConfig {
    /// 일반 설정
    #[serde(default)]
    pub general: GeneralConfig,
    /// ingest 트리거 설정
    #[serde(default)]
    pub ingest: IngestConfig,
    /// 처리 워커 설정
    #[serde(default)]
    pub processing: ProcessingConfig,
    /// 모니터/알림 설정
    #[serde(default)]
    pub monitor: MonitorConfig,
    /// 작업 큐 설정
    #[serde(default)]
    pub queue: QueueConfig,
    /// self-metric 노출 설정
    #[serde(default)]
    pub metrics: MetricsConfig,
}

impl LogsiftConfig {
    /// TOML 파일에서 설정을 로드하고 환경변수 오버라이드를 적용합니다.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, LogsiftError> {
        let mut config = Self::from_file(path).await?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// TOML 파일에서 설정을 로드합니다 (환경변수 오버라이드 없음).
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, LogsiftError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                LogsiftError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                LogsiftError::Io(e)
            }
        })?;
        let config = Self::parse(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// TOML 문자열에서 설정을 파싱합니다.
    pub fn parse(toml_str: &str) -> Result<Self, LogsiftError> {
        toml::from_str(toml_str).map_err(|e| {
            LogsiftError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// 환경변수로 설정값을 오버라이드합니다.
    ///
    /// 환경변수 네이밍 규칙: `LOGSIFT_{SECTION}_{FIELD}`
    /// 예: `LOGSIFT_INGEST_RAW_BUCKET=my-logs`
    pub fn apply_env_overrides(&mut self) {
        // General
        override_string(&mut self.general.log_level, "LOGSIFT_GENERAL_LOG_LEVEL");
        override_string(&mut self.general.log_format, "LOGSIFT_GENERAL_LOG_FORMAT");

        // Ingest
        override_string(&mut self.ingest.raw_bucket, "LOGSIFT_INGEST_RAW_BUCKET");
        override_string(&mut self.ingest.key_prefix, "LOGSIFT_INGEST_KEY_PREFIX");
        override_string(&mut self.ingest.key_suffix, "LOGSIFT_INGEST_KEY_SUFFIX");

        // Processing
        override_string(
            &mut self.processing.processed_bucket,
            "LOGSIFT_PROCESSING_PROCESSED_BUCKET",
        );
        override_usize(
            &mut self.processing.worker_concurrency,
            "LOGSIFT_PROCESSING_WORKER_CONCURRENCY",
        );
        override_u64(
            &mut self.processing.poll_interval_ms,
            "LOGSIFT_PROCESSING_POLL_INTERVAL_MS",
        );
        override_string(
            &mut self.processing.metric_namespace,
            "LOGSIFT_PROCESSING_METRIC_NAMESPACE",
        );

        // Monitor
        override_string(
            &mut self.monitor.alert_subject,
            "LOGSIFT_MONITOR_ALERT_SUBJECT",
        );
        override_f64(
            &mut self.monitor.error_rate_threshold,
            "LOGSIFT_MONITOR_ERROR_RATE_THRESHOLD",
        );
        override_u64(
            &mut self.monitor.spike_threshold,
            "LOGSIFT_MONITOR_SPIKE_THRESHOLD",
        );

        // Queue
        override_u64(
            &mut self.queue.visibility_timeout_secs,
            "LOGSIFT_QUEUE_VISIBILITY_TIMEOUT_SECS",
        );
        override_u32(
            &mut self.queue.max_receive_count,
            "LOGSIFT_QUEUE_MAX_RECEIVE_COUNT",
        );
        override_usize(&mut self.queue.capacity, "LOGSIFT_QUEUE_CAPACITY");

        // Metrics
        override_bool(&mut self.metrics.enabled, "LOGSIFT_METRICS_ENABLED");
        override_string(&mut self.metrics.listen_addr, "LOGSIFT_METRICS_LISTEN_ADDR");
        override_u16(&mut self.metrics.port, "LOGSIFT_METRICS_PORT");
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), LogsiftError> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_level".to_owned(),
                reason: format!("must be one of: {}", valid_levels.join(", ")),
            }
            .into());
        }

        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.general.log_format.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_format".to_owned(),
                reason: format!("must be one of: {}", valid_formats.join(", ")),
            }
            .into());
        }

        if self.ingest.raw_bucket.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "ingest.raw_bucket".to_owned(),
                reason: "raw bucket must not be empty".to_owned(),
            }
            .into());
        }

        if self.processing.processed_bucket.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "processing.processed_bucket".to_owned(),
                reason: "processed bucket must not be empty".to_owned(),
            }
            .into());
        }

        if self.processing.worker_concurrency == 0 {
            return Err(ConfigError::InvalidValue {
                field: "processing.worker_concurrency".to_owned(),
                reason: "must be greater than 0".to_owned(),
            }
            .into());
        }

        if self.processing.metric_namespace.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "processing.metric_namespace".to_owned(),
                reason: "metric namespace must not be empty".to_owned(),
            }
            .into());
        }

        if !(self.monitor.error_rate_threshold > 0.0 && self.monitor.error_rate_threshold < 1.0) {
            return Err(ConfigError::InvalidValue {
                field: "monitor.error_rate_threshold".to_owned(),
                reason: "must be strictly between 0.0 and 1.0".to_owned(),
            }
            .into());
        }

        if self.queue.visibility_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "queue.visibility_timeout_secs".to_owned(),
                reason: "must be greater than 0".to_owned(),
            }
            .into());
        }

        if self.queue.max_receive_count == 0 {
            return Err(ConfigError::InvalidValue {
                field: "queue.max_receive_count".to_owned(),
                reason: "must be greater than 0".to_owned(),
            }
            .into());
        }

        if self.queue.capacity == 0 {
            return Err(ConfigError::InvalidValue {
                field: "queue.capacity".to_owned(),
                reason: "must be greater than 0".to_owned(),
            }
            .into());
        }

        Ok(())
    }
}

/// 일반 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// 로그 레벨 (trace, debug, info, warn, error)
    pub log_level: String,
    /// 로그 형식 (json, pretty)
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            log_format: "json".to_owned(),
        }
    }
}

/// ingest 트리거 설정
///
/// 키 prefix/suffix 필터는 트리거 배선에서 적용됩니다.
/// ingest 컴포넌트 자체는 필터링하지 않습니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// 원본 로그 버킷명
    pub raw_bucket: String,
    /// 트리거 대상 키 prefix
    pub key_prefix: String,
    /// 트리거 대상 키 suffix
    pub key_suffix: String,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            raw_bucket: "raw-logs".to_owned(),
            key_prefix: "logs/".to_owned(),
            key_suffix: ".log".to_owned(),
        }
    }
}

/// 처리 워커 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingConfig {
    /// 요약 아티팩트를 저장할 버킷명
    pub processed_bucket: String,
    /// 동시에 도는 처리 워커 수
    pub worker_concurrency: usize,
    /// 큐가 비었을 때의 폴링 간격 (밀리초)
    pub poll_interval_ms: u64,
    /// 비즈니스 메트릭 네임스페이스
    pub metric_namespace: String,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            processed_bucket: "processed-logs".to_owned(),
            worker_concurrency: 4,
            poll_interval_ms: 200,
            metric_namespace: "WebServerLogs".to_owned(),
        }
    }
}

/// 모니터/알림 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// 알림 제목
    pub alert_subject: String,
    /// 에러율 경보 임계값 (비율, 0.05 = 5%)
    pub error_rate_threshold: f64,
    /// 트래픽 스파이크 경보 임계값 (요청 수)
    pub spike_threshold: u64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            alert_subject: "Web Server Log Alert".to_owned(),
            error_rate_threshold: 0.05,
            spike_threshold: 10_000,
        }
    }
}

/// 작업 큐 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// 수신 후 재전달까지의 가시성 타임아웃 (초)
    pub visibility_timeout_secs: u64,
    /// 만료 전 최대 수신 횟수
    pub max_receive_count: u32,
    /// 큐 최대 용량
    pub capacity: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            visibility_timeout_secs: 30,
            max_receive_count: 5,
            capacity: 10_000,
        }
    }
}

/// self-metric 노출 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Prometheus 엔드포인트 활성화 여부
    pub enabled: bool,
    /// 리슨 주소
    pub listen_addr: String,
    /// 리슨 포트
    pub port: u16,
    /// 스크레이프 엔드포인트 경로
    pub endpoint: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            listen_addr: "127.0.0.1".to_owned(),
            port: 9186,
            endpoint: "/metrics".to_owned(),
        }
    }
}

// --- 환경변수 오버라이드 헬퍼 ---

fn override_string(target: &mut String, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val;
    }
}

fn override_bool(target: &mut bool, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<bool>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse bool from env var, ignoring"
            ),
        }
    }
}

fn override_usize(target: &mut usize, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<usize>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse usize from env var, ignoring"
            ),
        }
    }
}

fn override_u16(target: &mut u16, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u16>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u16 from env var, ignoring"
            ),
        }
    }
}

fn override_u32(target: &mut u32, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u32>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u32 from env var, ignoring"
            ),
        }
    }
}

fn override_u64(target: &mut u64, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u64>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u64 from env var, ignoring"
            ),
        }
    }
}

fn override_f64(target: &mut f64, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<f64>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse f64 from env var, ignoring"
            ),
        }
    }
}
