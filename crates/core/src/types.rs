//! 도메인 타입 — 시스템 전역에서 사용되는 공통 타입
//!
//! 파싱된 요청 레코드와 파일 단위 요약 등, 파이프라인의 모든 단계가
//! 공유하는 데이터 구조를 정의합니다.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

/// 파싱된 HTTP 요청 레코드
///
/// access log 한 줄을 파싱한 결과입니다. 문법에 맞지 않는 줄은
/// 절대 이 타입이 되지 않습니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestRecord {
    /// 클라이언트 IP
    pub client_ip: String,
    /// 요청 시각 (타임존 오프셋 포함)
    pub timestamp: DateTime<FixedOffset>,
    /// HTTP 메서드 (GET, POST 등)
    pub method: String,
    /// 요청 경로
    pub path: String,
    /// 프로토콜 (HTTP/1.1 등)
    pub protocol: String,
    /// 상태 코드 — 문법상 숫자만 허용되지만 5xx 판정이 문자열
    /// 접두어 검사이므로 문자열로 유지합니다
    pub status: String,
    /// 전송 바이트 수
    pub bytes_sent: u64,
    /// Referer 헤더 (비어 있거나 "-"일 수 있음)
    pub referer: String,
    /// User-Agent 헤더
    pub user_agent: String,
}

impl fmt::Display for RequestRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} \"{} {} {}\" {} {}",
            self.client_ip, self.method, self.path, self.protocol, self.status, self.bytes_sent,
        )
    }
}

/// 파일 단위 요약
///
/// 로그 파일 하나를 집계한 결과이며, 처리 워커가 요약 아티팩트로
/// JSON 직렬화하여 저장합니다. 카운터 맵은 `BTreeMap`이므로 같은
/// 요약을 다시 직렬화해도 바이트 단위로 동일한 아티팩트가 나옵니다.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FileSummary {
    /// 전체 요청 수
    pub total_requests: u64,
    /// 메서드별 요청 수
    pub request_methods: BTreeMap<String, u64>,
    /// 상태 코드별 요청 수
    pub status_codes: BTreeMap<String, u64>,
    /// 5xx 응답 수 (상태 코드가 '5'로 시작하는 레코드)
    pub errors: u64,
    /// 경로별 요청 수
    pub paths: BTreeMap<String, u64>,
    /// 클라이언트 IP별 요청 수
    pub ips: BTreeMap<String, u64>,
}

impl FileSummary {
    /// 빈 요약을 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 파싱된 레코드 하나를 요약에 반영합니다.
    pub fn record(&mut self, record: &RequestRecord) {
        self.total_requests += 1;
        *self
            .request_methods
            .entry(record.method.clone())
            .or_insert(0) += 1;
        *self.status_codes.entry(record.status.clone()).or_insert(0) += 1;
        *self.paths.entry(record.path.clone()).or_insert(0) += 1;
        *self.ips.entry(record.client_ip.clone()).or_insert(0) += 1;
        if record.status.starts_with('5') {
            self.errors += 1;
        }
    }

    /// 다른 요약의 카운터를 원소 단위로 합산합니다.
    ///
    /// 집계는 줄 순서에 대해 결합적이므로, 파일을 나눠 집계한 뒤
    /// merge한 결과는 전체를 한 번에 집계한 결과와 같습니다.
    pub fn merge(&mut self, other: &FileSummary) {
        self.total_requests += other.total_requests;
        self.errors += other.errors;
        for (k, v) in &other.request_methods {
            *self.request_methods.entry(k.clone()).or_insert(0) += v;
        }
        for (k, v) in &other.status_codes {
            *self.status_codes.entry(k.clone()).or_insert(0) += v;
        }
        for (k, v) in &other.paths {
            *self.paths.entry(k.clone()).or_insert(0) += v;
        }
        for (k, v) in &other.ips {
            *self.ips.entry(k.clone()).or_insert(0) += v;
        }
    }

    /// 카운터 불변식을 검사합니다.
    ///
    /// `sum(status_codes) == total_requests == sum(request_methods)`,
    /// `errors <= total_requests`
    pub fn counts_consistent(&self) -> bool {
        let status_sum: u64 = self.status_codes.values().sum();
        let method_sum: u64 = self.request_methods.values().sum();
        status_sum == self.total_requests
            && method_sum == self.total_requests
            && self.errors <= self.total_requests
    }
}

impl fmt::Display for FileSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "requests={} errors={} methods={} paths={} ips={}",
            self.total_requests,
            self.errors,
            self.request_methods.len(),
            self.paths.len(),
            self.ips.len(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_record(status: &str) -> RequestRecord {
        RequestRecord {
            client_ip: "203.0.113.5".to_owned(),
            timestamp: DateTime::parse_from_str(
                "10/Oct/2023:13:55:36 +0000",
                "%d/%b/%Y:%H:%M:%S %z",
            )
            .unwrap(),
            method: "GET".to_owned(),
            path: "/index.html".to_owned(),
            protocol: "HTTP/1.1".to_owned(),
            status: status.to_owned(),
            bytes_sent: 512,
            referer: "-".to_owned(),
            user_agent: "curl/7.68.0".to_owned(),
        }
    }

    #[test]
    fn empty_summary_is_consistent() {
        let summary = FileSummary::new();
        assert_eq!(summary.total_requests, 0);
        assert!(summary.counts_consistent());
    }

    #[test]
    fn record_increments_all_counters() {
        let mut summary = FileSummary::new();
        summary.record(&sample_record("200"));
        assert_eq!(summary.total_requests, 1);
        assert_eq!(summary.request_methods.get("GET"), Some(&1));
        assert_eq!(summary.status_codes.get("200"), Some(&1));
        assert_eq!(summary.paths.get("/index.html"), Some(&1));
        assert_eq!(summary.ips.get("203.0.113.5"), Some(&1));
        assert_eq!(summary.errors, 0);
        assert!(summary.counts_consistent());
    }

    #[test]
    fn status_5xx_counts_as_error() {
        let mut summary = FileSummary::new();
        summary.record(&sample_record("500"));
        summary.record(&sample_record("503"));
        summary.record(&sample_record("404"));
        assert_eq!(summary.errors, 2);
        assert_eq!(summary.total_requests, 3);
    }

    #[test]
    fn merge_equals_whole_aggregation() {
        let records: Vec<RequestRecord> = ["200", "500", "200", "301", "503"]
            .iter()
            .map(|s| sample_record(s))
            .collect();

        let mut whole = FileSummary::new();
        for r in &records {
            whole.record(r);
        }

        let mut first = FileSummary::new();
        for r in &records[..2] {
            first.record(r);
        }
        let mut second = FileSummary::new();
        for r in &records[2..] {
            second.record(r);
        }
        first.merge(&second);

        assert_eq!(first, whole);
    }

    #[test]
    fn serialization_is_deterministic() {
        let mut summary = FileSummary::new();
        // 삽입 순서를 뒤섞어도 BTreeMap 직렬화 순서는 동일해야 합니다
        for status in ["503", "200", "404", "200"] {
            summary.record(&sample_record(status));
        }
        let first = serde_json::to_vec(&summary).unwrap();
        let second = serde_json::to_vec(&summary.clone()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn summary_json_field_names() {
        let summary = FileSummary::new();
        let json = serde_json::to_value(&summary).unwrap();
        for field in [
            "total_requests",
            "request_methods",
            "status_codes",
            "errors",
            "paths",
            "ips",
        ] {
            assert!(json.get(field).is_some(), "missing field '{field}'");
        }
    }

    #[test]
    fn request_record_display() {
        let record = sample_record("200");
        let display = record.to_string();
        assert!(display.contains("203.0.113.5"));
        assert!(display.contains("GET /index.html HTTP/1.1"));
    }
}
