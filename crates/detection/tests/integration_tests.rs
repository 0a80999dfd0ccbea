//! 통합 테스트 -- 정규화부터 알림 생성까지의 탐지 흐름 검증

use std::sync::Arc;

use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use logwarden_core::types::{Event, RawRecord, Severity};
use logwarden_detection::parser::timestamp;
use logwarden_detection::{
    AnomalyDetector, CorrelationEngine, EngineConfigBuilder, ParserRouter, RuleLoader,
    RuleRegistry,
};

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
}

/// 6개의 `sudo su` 이벤트, 임계값 5 → privilege_escalation 알림 1개
#[test]
fn six_sudo_su_events_raise_privilege_escalation() {
    let config = EngineConfigBuilder::new().anomaly_threshold(5).build().unwrap();
    let registry = Arc::new(RuleRegistry::standard(&config, Vec::new()).unwrap());
    let detector = AnomalyDetector::new(registry, config.anomaly_threshold);

    let router = ParserRouter::with_defaults("default");
    let batch: Vec<Event> = (0..6)
        .map(|i| {
            let line = format!("2024-05-01T12:00:0{i}Z INFO user bob ran sudo su");
            router.normalize(&RawRecord::new(line.into_bytes(), "auth.log"))
        })
        .collect();

    let alerts = detector.analyze(&batch);
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].rule_name, "privilege_escalation");
    assert_eq!(alerts[0].severity, Severity::High);
    assert_eq!(alerts[0].count, 6);
}

/// syslog 형식의 로그인 실패 → brute force 상관 알림
#[tokio::test]
async fn syslog_failed_logins_correlate_by_ip() {
    let config = EngineConfigBuilder::new()
        .brute_force_threshold(3)
        .build()
        .unwrap();
    let registry = Arc::new(RuleRegistry::standard(&config, Vec::new()).unwrap());
    let engine = CorrelationEngine::new(Arc::clone(&registry), &config);

    let batch: Vec<Event> = (1..=4)
        .map(|i| {
            let at = now() - TimeDelta::minutes(i);
            let ip = if i == 4 { "192.0.2.1" } else { "10.0.0.5" };
            Event::at(at, format!("sshd: Failed login for admin from {ip} port 22"))
                .with_host("web-01")
        })
        .collect();

    assert_eq!(engine.add_events_at(&batch, now()).await, 4);
    let alerts = engine.evaluate_rules_at(now()).await;
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].rule_id, "CORR-001");
    assert_eq!(alerts[0].correlation_key.as_deref(), Some("10.0.0.5"));
    assert_eq!(alerts[0].count, 3);
    assert!(alerts[0].matches.iter().all(|e| e.message.contains("10.0.0.5")));
}

/// 다음 사이클에서 시간이 지나면 창 밖의 이벤트는 알림에 포함되지 않습니다.
#[tokio::test]
async fn alerts_never_reference_events_outside_the_window() {
    let config = EngineConfigBuilder::new()
        .brute_force_threshold(1)
        .build()
        .unwrap();
    let registry = Arc::new(RuleRegistry::standard(&config, Vec::new()).unwrap());
    let engine = CorrelationEngine::new(registry, &config);

    let first = vec![
        Event::at(now(), "Failed login from 10.0.0.5"),
        Event::at(now(), "Failed login from 10.0.0.5"),
    ];
    engine.add_events_at(&first, now()).await;
    let alerts = engine.evaluate_rules_at(now()).await;
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].count, 2);

    // 20분 후: 이전 이벤트는 보존 기간 안이지만 15분 창 밖
    let later = now() + TimeDelta::minutes(20);
    engine
        .add_events_at(&[Event::at(later, "Failed login from 10.0.0.5")], later)
        .await;
    assert_eq!(engine.buffered().await, 3);

    let cutoff = later - TimeDelta::minutes(15);
    let alerts = engine.evaluate_rules_at(later).await;
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].count, 1);
    for alert in &alerts {
        assert!(alert.matches.iter().all(|e| e.instant().unwrap() >= cutoff));
    }
}

/// 설정 파일 규칙과 YAML 규칙이 함께 동작합니다.
#[tokio::test]
async fn configured_and_yaml_rules_fire() {
    let dir = tempfile::tempdir().unwrap();
    tokio::fs::write(
        dir.path().join("shadow.yml"),
        r#"
id: RULE-100
name: shadow_touch
description: Shadow file touched
severity: critical
detection:
  conditions:
    - field: message
      modifier: contains
      value: shadow
"#,
    )
    .await
    .unwrap();

    let config = EngineConfigBuilder::new()
        .anomaly_threshold(1)
        .pattern_rule("failed_password", "Failed password", "medium")
        .rule_dir(dir.path().display().to_string())
        .build()
        .unwrap();
    let extra = RuleLoader::load_directory(&config.rule_dir).await.unwrap();
    let registry = Arc::new(RuleRegistry::standard(&config, extra).unwrap());
    let detector = AnomalyDetector::new(registry, config.anomaly_threshold);

    let batch = vec![
        Event::new("2024-05-01T12:00:00Z", "Failed password for root"),
        Event::new("2024-05-01T12:00:01Z", "Failed password for admin"),
        Event::new("2024-05-01T12:00:02Z", "cat shadow"),
        Event::new("2024-05-01T12:00:03Z", "vim shadow"),
    ];
    let alerts = detector.analyze(&batch);
    let names: Vec<&str> = alerts.iter().map(|a| a.rule_name.as_str()).collect();
    assert_eq!(names, vec!["failed_password", "shadow_touch"]);
    assert_eq!(alerts[0].severity, Severity::Medium);
    assert_eq!(alerts[1].severity, Severity::Critical);
}

/// 정규화 실패 레코드는 저장 가능한 fallback 이벤트가 됩니다.
#[test]
fn fallback_events_are_still_analyzable() {
    let router = ParserRouter::with_defaults("syslog");
    let event = router.normalize(&RawRecord::new(b"@@@".to_vec(), "udp"));
    assert!(event.is_fallback());

    let registry = Arc::new(
        RuleRegistry::standard(&EngineConfigBuilder::new().build().unwrap(), Vec::new()).unwrap(),
    );
    let detector = AnomalyDetector::new(registry, 0);
    assert!(detector.analyze(&[event]).is_empty());
}

/// 새해 직후 읽은 연말 syslog 실패 로그는 보존 기간이 지나면 다시 알림을 내지 않습니다.
#[tokio::test]
async fn year_end_syslog_burst_ages_out_after_new_year() {
    let new_year = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 5).unwrap();
    let config = EngineConfigBuilder::new()
        .brute_force_threshold(3)
        .build()
        .unwrap();
    let registry = Arc::new(RuleRegistry::standard(&config, Vec::new()).unwrap());
    let engine = CorrelationEngine::new(registry, &config);

    let at = timestamp::parse_relative_to("Dec 31 23:59:59", new_year).unwrap();
    let batch: Vec<Event> = (0..3)
        .map(|_| Event::at(at, "sshd: Failed login for root from 10.0.0.9"))
        .collect();
    engine.add_events_at(&batch, new_year).await;
    assert_eq!(engine.evaluate_rules_at(new_year).await.len(), 1);

    let month_later = new_year + TimeDelta::days(30);
    engine.add_events_at(&[], month_later).await;
    assert!(engine.evaluate_rules_at(month_later).await.is_empty());
    assert_eq!(engine.buffered().await, 0);
}
