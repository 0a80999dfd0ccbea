//! 이벤트 타입 벤치마크
//!
//! Event 타임스탬프 해석과 Alert 직렬화 성능을 측정합니다.

use criterion::{Criterion, Throughput, black_box, criterion_group, criterion_main};
use logwarden_core::types::{Alert, Event, Severity};

fn create_event(i: usize) -> Event {
    Event::new(
        "2024-05-01T12:00:00+00:00",
        format!("Failed login for user admin from 203.0.113.{}", i % 255),
    )
    .with_source("/var/log/auth.log")
    .with_host("web-01")
    .with_process("sshd")
}

fn bench_event_instant(c: &mut Criterion) {
    let event = create_event(1);
    c.bench_function("event_instant", |b| {
        b.iter(|| black_box(&event).instant());
    });
}

fn bench_alert_serialize(c: &mut Criterion) {
    let mut group = c.benchmark_group("alert_serialize");
    for size in [1usize, 10, 100] {
        let alert = Alert::new(
            "CORR-001",
            "Authentication Brute Force",
            Severity::High,
            "Possible brute force",
        )
        .with_matches((0..size).map(create_event).collect());
        group.throughput(Throughput::Elements(size as u64));
        group.bench_function(format!("matches_{size}"), |b| {
            b.iter(|| serde_json::to_vec(black_box(&alert)));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_event_instant, bench_alert_serialize);
criterion_main!(benches);
