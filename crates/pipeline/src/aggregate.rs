//! 파일 집계 — 로그 파일 하나를 요약으로 접습니다.
//!
//! [`FileAggregator`]는 파일 내용을 줄 단위로 파싱하여
//! [`FileSummary`](logsift_core::types::FileSummary)를 만들고,
//! 파싱에 실패한 줄은 줄 번호와 함께 별도 목록으로 돌려줍니다.
//! 줄 하나의 실패가 나머지 파일의 집계를 중단시키지 않습니다.

use logsift_core::types::FileSummary;

use crate::error::MalformedLineError;
use crate::parser::AccessLogParser;

/// 줄 번호가 붙은 파싱 에러
///
/// 줄 번호는 1부터 시작하며 빈 줄도 번호에 포함됩니다.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineError {
    /// 1 기반 줄 번호
    pub line_no: usize,
    /// 파싱 에러
    pub error: MalformedLineError,
}

/// 파일 집계기
///
/// 파서와 마찬가지로 공유 상태가 없는 순수 컴포넌트입니다.
pub struct FileAggregator {
    parser: AccessLogParser,
}

impl FileAggregator {
    /// 새 집계기를 생성합니다.
    pub fn new() -> Self {
        Self {
            parser: AccessLogParser::new(),
        }
    }

    /// 파일 내용 전체를 집계합니다.
    ///
    /// - 공백뿐인 줄은 조용히 건너뜁니다 (파싱 에러도, 요청도 아님)
    /// - 파싱 실패는 기록 후 다음 줄로 계속 진행합니다
    /// - 상태 코드가 `'5'`로 시작하는 레코드가 에러 카운터에 집계됩니다
    pub fn aggregate(&self, content: &str) -> (FileSummary, Vec<LineError>) {
        let mut summary = FileSummary::new();
        let mut line_errors = Vec::new();

        for (idx, line) in content.split('\n').enumerate() {
            if line.trim().is_empty() {
                continue;
            }

            match self.parser.parse(line) {
                Ok(record) => summary.record(&record),
                Err(error) => line_errors.push(LineError {
                    line_no: idx + 1,
                    error,
                }),
            }
        }

        (summary, line_errors)
    }
}

impl Default for FileAggregator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(ip: &str, status: &str) -> String {
        format!(
            r#"{ip} - - [10/Oct/2023:13:55:36 +0000] "GET /index.html HTTP/1.1" {status} 512 "-" "curl/7.68.0""#
        )
    }

    #[test]
    fn aggregate_empty_content() {
        let aggregator = FileAggregator::new();
        let (summary, errors) = aggregator.aggregate("");
        assert_eq!(summary.total_requests, 0);
        assert!(errors.is_empty());
    }

    #[test]
    fn aggregate_blank_lines_only() {
        let aggregator = FileAggregator::new();
        let (summary, errors) = aggregator.aggregate("\n   \n\t\n\n");
        assert_eq!(summary.total_requests, 0);
        assert!(errors.is_empty());
        assert!(summary.counts_consistent());
    }

    #[test]
    fn aggregate_counts_all_maps() {
        let aggregator = FileAggregator::new();
        let content = [
            line("10.0.0.1", "200"),
            line("10.0.0.1", "200"),
            line("10.0.0.2", "404"),
        ]
        .join("\n");
        let (summary, errors) = aggregator.aggregate(&content);

        assert!(errors.is_empty());
        assert_eq!(summary.total_requests, 3);
        assert_eq!(summary.request_methods.get("GET"), Some(&3));
        assert_eq!(summary.status_codes.get("200"), Some(&2));
        assert_eq!(summary.status_codes.get("404"), Some(&1));
        assert_eq!(summary.ips.get("10.0.0.1"), Some(&2));
        assert_eq!(summary.errors, 0);
        assert!(summary.counts_consistent());
    }

    #[test]
    fn error_count_uses_string_prefix() {
        let aggregator = FileAggregator::new();
        let content = [
            line("10.0.0.1", "500"),
            line("10.0.0.1", "503"),
            line("10.0.0.1", "599"),
            line("10.0.0.1", "200"),
            line("10.0.0.1", "404"),
        ]
        .join("\n");
        let (summary, _) = aggregator.aggregate(&content);
        assert_eq!(summary.errors, 3);
        assert_eq!(summary.total_requests, 5);
    }

    #[test]
    fn malformed_line_recorded_and_aggregation_continues() {
        let aggregator = FileAggregator::new();
        let content = format!("{}\ngarbage line\n{}", line("10.0.0.1", "200"), line("10.0.0.2", "200"));
        let (summary, errors) = aggregator.aggregate(&content);

        assert_eq!(summary.total_requests, 2);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].line_no, 2);
        assert!(matches!(
            errors[0].error,
            MalformedLineError::Grammar { .. }
        ));
    }

    #[test]
    fn line_numbers_count_blank_lines() {
        let aggregator = FileAggregator::new();
        // 1: 정상, 2: 빈 줄, 3: 깨진 줄
        let content = format!("{}\n\nbroken", line("10.0.0.1", "200"));
        let (_, errors) = aggregator.aggregate(&content);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].line_no, 3);
    }

    #[test]
    fn errors_are_ordered_by_line() {
        let aggregator = FileAggregator::new();
        let content = "bad-one\nbad-two\nbad-three";
        let (_, errors) = aggregator.aggregate(content);
        let line_nos: Vec<usize> = errors.iter().map(|e| e.line_no).collect();
        assert_eq!(line_nos, vec![1, 2, 3]);
    }

    #[test]
    fn split_aggregation_merges_to_whole() {
        let aggregator = FileAggregator::new();
        let lines: Vec<String> = (0..20)
            .map(|i| line(&format!("10.0.0.{}", i % 4), if i % 5 == 0 { "500" } else { "200" }))
            .collect();
        let whole_content = lines.join("\n");

        let (whole, _) = aggregator.aggregate(&whole_content);
        let (mut first, _) = aggregator.aggregate(&lines[..10].join("\n"));
        let (second, _) = aggregator.aggregate(&lines[10..].join("\n"));
        first.merge(&second);

        assert_eq!(first, whole);
    }

    #[test]
    fn trailing_newline_does_not_change_counts() {
        let aggregator = FileAggregator::new();
        let content = line("10.0.0.1", "200");
        let (without, _) = aggregator.aggregate(&content);
        let (with, _) = aggregator.aggregate(&format!("{content}\n"));
        assert_eq!(without, with);
    }

    #[test]
    fn hundred_line_scenario() {
        // 6줄이 500, 94줄이 200인 100줄짜리 파일
        let aggregator = FileAggregator::new();
        let mut lines = Vec::new();
        for i in 0..100 {
            lines.push(line("10.0.0.1", if i < 6 { "500" } else { "200" }));
        }
        let (summary, errors) = aggregator.aggregate(&lines.join("\n"));
        assert!(errors.is_empty());
        assert_eq!(summary.total_requests, 100);
        assert_eq!(summary.errors, 6);
    }
}
