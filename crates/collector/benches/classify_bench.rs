//! 로그 분류 벤치마크
//!
//! 단일 메시지 분류와 배치 분류 처리량을 측정합니다.

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use warlog_collector::LogClassifier;
use warlog_core::types::LogEntry;

const MESSAGES: &[&str] = &[
    "KILL: Alpha(Allies/76561198000000001) -> Bravo(Axis/76561198000000002) with M1 GARAND",
    "TEAM KILL: Charlie(Allies/765) -> Delta(Allies/766) with SATCHEL",
    "CHAT[Team][Alpha(Allies/765)]: push left flank",
    "CONNECTED PlayerOne (76561198000000003)",
    "DISCONNECTED PlayerTwo (76561198000000004)",
    "MATCH START WARFARE carentan",
    "TEAMSWITCH Echo (Axis > Allies)",
    "SERVER restart scheduled for 04:00",
];

fn entry(index: usize, message: &str) -> LogEntry {
    LogEntry {
        timestamp: format!("2025-06-01 10:{:02}:{:02}", index / 60, index % 60),
        server: "bench_server".to_owned(),
        message: message.to_owned(),
        raw: None,
        collected_at: None,
    }
}

fn make_batch(size: usize) -> Vec<LogEntry> {
    (0..size)
        .map(|i| entry(i, MESSAGES[i % MESSAGES.len()]))
        .collect()
}

fn bench_classify_single(c: &mut Criterion) {
    let classifier = LogClassifier::new().unwrap();

    let mut group = c.benchmark_group("classify_single");
    group.throughput(Throughput::Elements(1));

    group.bench_function("kill", |b| {
        b.iter(|| classifier.classify(black_box(MESSAGES[0])))
    });
    group.bench_function("chat", |b| {
        b.iter(|| classifier.classify(black_box(MESSAGES[2])))
    });
    // 모든 패턴을 통과한 뒤 Other로 떨어지는 최악 경로
    group.bench_function("fallthrough", |b| {
        b.iter(|| classifier.classify(black_box(MESSAGES[7])))
    });

    group.finish();
}

fn bench_classify_batch(c: &mut Criterion) {
    let classifier = LogClassifier::new().unwrap();

    let mut group = c.benchmark_group("classify_batch");
    for size in [100usize, 1_000, 10_000] {
        let batch = make_batch(size);
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &batch, |b, batch| {
            b.iter(|| classifier.classify_batch(black_box(batch)))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_classify_single, bench_classify_batch);
criterion_main!(benches);
