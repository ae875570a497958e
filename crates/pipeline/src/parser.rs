//! Access log 파서
//!
//! Apache/Nginx combined 형식의 access log 한 줄을
//! [`RequestRecord`]로 파싱합니다.
//!
//! # 줄 형식
//! ```text
//! <ip> - - [<timestamp>] "<method> <path> <protocol>" <status> <bytes> "<referer>" "<user-agent>"
//! ```
//!
//! # 사용 예시
//! ```
//! use logsift_pipeline::parser::AccessLogParser;
//!
//! let parser = AccessLogParser::new();
//! let record = parser
//!     .parse(r#"203.0.113.5 - - [10/Oct/2023:13:55:36 +0000] "GET /index.html HTTP/1.1" 200 512 "-" "curl/7.68.0""#)
//!     .unwrap();
//! assert_eq!(record.method, "GET");
//! assert_eq!(record.bytes_sent, 512);
//! ```

use chrono::DateTime;
use regex::Regex;

use logsift_core::types::RequestRecord;

use crate::error::MalformedLineError;

/// 줄 문법. 줄 시작에 고정되며, user-agent 뒤의 잔여 내용은 허용합니다.
const LINE_PATTERN: &str =
    r#"^(\S+) - - \[([^\]]*)\] "([^"]*)" (\d+) (\d+) "([^"]*)" "([^"]*)""#;

/// 타임스탬프 형식: 일/월약어/연:시:분:초 UTC오프셋
const TIMESTAMP_FORMAT: &str = "%d/%b/%Y:%H:%M:%S %z";

/// Access log 파서
///
/// 순수 함수형 컴포넌트입니다. 공유 상태가 없어 여러 워커에서
/// 동시에 사용해도 안전합니다.
pub struct AccessLogParser {
    pattern: Regex,
}

impl AccessLogParser {
    /// 새 파서를 생성합니다.
    pub fn new() -> Self {
        Self {
            // 고정 문자열 패턴이므로 컴파일은 실패하지 않습니다
            pattern: Regex::new(LINE_PATTERN).expect("hard-coded line pattern compiles"),
        }
    }

    /// 로그 한 줄을 파싱합니다.
    ///
    /// 문법과 일치하지 않는 줄은 [`MalformedLineError`]가 되며,
    /// 절대 [`RequestRecord`]가 되지 않습니다.
    ///
    /// request 필드는 공백으로 나눠 최대 세 토큰(method, path, protocol)을
    /// 취하고, 부족한 토큰은 빈 문자열로 둡니다. 이는 의도된 관용이지
    /// 별도의 에러 경로가 아닙니다.
    pub fn parse(&self, line: &str) -> Result<RequestRecord, MalformedLineError> {
        let caps = self
            .pattern
            .captures(line)
            .ok_or_else(|| MalformedLineError::Grammar {
                line: line.to_owned(),
            })?;

        let timestamp_str = &caps[2];
        let timestamp = DateTime::parse_from_str(timestamp_str, TIMESTAMP_FORMAT).map_err(|e| {
            MalformedLineError::Timestamp {
                value: timestamp_str.to_owned(),
                reason: e.to_string(),
            }
        })?;

        let request_parts: Vec<&str> = caps[3].split_whitespace().collect();
        let method = request_parts.first().copied().unwrap_or("").to_owned();
        let path = request_parts.get(1).copied().unwrap_or("").to_owned();
        let protocol = request_parts.get(2).copied().unwrap_or("").to_owned();

        let bytes_str = &caps[5];
        let bytes_sent: u64 = bytes_str
            .parse()
            .map_err(|_| MalformedLineError::Bytes {
                value: bytes_str.to_owned(),
            })?;

        Ok(RequestRecord {
            client_ip: caps[1].to_owned(),
            timestamp,
            method,
            path,
            protocol,
            status: caps[4].to_owned(),
            bytes_sent,
            referer: caps[6].to_owned(),
            user_agent: caps[7].to_owned(),
        })
    }
}

impl Default for AccessLogParser {
    fn default() -> Self {
        Self::new()
    }
}
