//! Access log 파서 벤치마크
//!
//! 정상 줄과 실패 줄의 파싱 처리량을 측정합니다.

use criterion::{Criterion, Throughput, black_box, criterion_group, criterion_main};

use logsift_pipeline::parser::AccessLogParser;

/// 짧은 정상 줄
const LINE_SHORT: &str =
    r#"203.0.113.5 - - [10/Oct/2023:13:55:36 +0000] "GET /index.html HTTP/1.1" 200 512 "-" "curl/7.68.0""#;

/// 긴 정상 줄 (쿼리 스트링, 긴 user-agent)
const LINE_LONG: &str = r#"198.51.100.23 - - [10/Oct/2023:13:55:36 +0900] "POST /api/v1/orders/create?session=550e8400-e29b-41d4-a716-446655440000&utm_source=newsletter&utm_campaign=fall HTTP/2.0" 201 48213 "https://shop.example.com/checkout/payment" "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/118.0.0.0 Safari/537.36""#;

/// 문법에 맞지 않는 줄
const LINE_MALFORMED: &str = "ERROR: upstream connection refused while reading response header";

fn bench_parser(c: &mut Criterion) {
    let parser = AccessLogParser::new();

    let mut group = c.benchmark_group("access_log_parser");

    group.throughput(Throughput::Elements(1));
    group.bench_function("short", |b| {
        b.iter(|| parser.parse(black_box(LINE_SHORT)).unwrap())
    });

    group.bench_function("long", |b| {
        b.iter(|| parser.parse(black_box(LINE_LONG)).unwrap())
    });

    group.bench_function("malformed", |b| {
        b.iter(|| parser.parse(black_box(LINE_MALFORMED)).unwrap_err())
    });

    group.throughput(Throughput::Elements(1000));
    group.bench_function("throughput_1000", |b| {
        b.iter(|| {
            for _ in 0..1000 {
                let _ = parser.parse(black_box(LINE_SHORT));
            }
        })
    });

    group.finish();
}

criterion_group!(benches, bench_parser);
criterion_main!(benches);
