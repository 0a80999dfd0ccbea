//! 탐지 벤치마크
//!
//! 배치 크기에 따른 정규화, 이상 탐지, 상관 분석 처리량을 측정합니다.

use std::sync::Arc;

use chrono::{TimeDelta, Utc};
use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use logwarden_core::types::{Event, RawRecord};
use logwarden_detection::{
    AnomalyDetector, CorrelationEngine, EngineConfig, ParserRouter, RuleRegistry,
};

fn make_batch(size: usize) -> Vec<Event> {
    let now = Utc::now();
    (0..size)
        .map(|i| {
            let message = match i % 4 {
                0 => format!("Failed login for admin from 10.0.{}.{}", i % 7, i % 11),
                1 => "sudo su - root".to_owned(),
                2 => "read /etc/shadow".to_owned(),
                _ => "session opened for user bob".to_owned(),
            };
            Event::at(now - TimeDelta::seconds(i as i64 % 600), message)
        })
        .collect()
}

fn bench_normalize(c: &mut Criterion) {
    let router = ParserRouter::with_defaults("syslog");
    let record = RawRecord::new(
        &b"May  1 12:00:00 web-01 sshd[4242]: Failed password for root from 10.0.0.5 port 22"[..],
        "auth.log",
    );
    c.bench_function("normalize_syslog", |b| {
        b.iter(|| router.normalize(black_box(&record)))
    });
}

fn bench_anomaly(c: &mut Criterion) {
    let config = EngineConfig::default();
    let registry = Arc::new(RuleRegistry::standard(&config, Vec::new()).unwrap());
    let detector = AnomalyDetector::new(registry, config.anomaly_threshold);

    let mut group = c.benchmark_group("anomaly_analyze");
    for size in [100, 1_000, 10_000] {
        let batch = make_batch(size);
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &batch, |b, batch| {
            b.iter(|| detector.analyze(black_box(batch)))
        });
    }
    group.finish();
}

fn bench_correlation(c: &mut Criterion) {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap();
    let config = EngineConfig::default();
    let registry = Arc::new(RuleRegistry::standard(&config, Vec::new()).unwrap());

    let mut group = c.benchmark_group("correlation_cycle");
    for size in [100, 1_000, 10_000] {
        let batch = make_batch(size);
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &batch, |b, batch| {
            b.iter(|| {
                let engine = CorrelationEngine::new(Arc::clone(&registry), &config);
                runtime.block_on(async {
                    engine.add_events(black_box(batch)).await;
                    engine.evaluate_rules().await
                })
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_normalize, bench_anomaly, bench_correlation);
criterion_main!(benches);
