//! 인증 brute force 상관 규칙
//!
//! 시간 창 안에서 같은 출발지 IP의 로그인 실패가 임계값 이상이면 알림을 생성합니다.

use std::collections::HashMap;

use chrono::{DateTime, TimeDelta, Utc};
use logwarden_core::types::{Alert, Event, Severity};

use super::CorrelationRule;
use super::types::RuleMeta;
use crate::error::EngineError;
use crate::extract::extract_first_ipv4;

/// 기본 임계값
pub const DEFAULT_THRESHOLD: usize = 5;

/// 기본 시간 창 (분)
pub const DEFAULT_TIMEFRAME_MINS: i64 = 15;

/// 인증 brute force 규칙 (`CORR-001`)
#[derive(Debug, Clone)]
pub struct BruteForceRule {
    meta: RuleMeta,
    threshold: usize,
    timeframe: TimeDelta,
}

impl BruteForceRule {
    /// 주어진 임계값으로 규칙을 생성합니다. 시간 창은 15분입니다.
    pub fn new(threshold: usize) -> Self {
        Self {
            meta: RuleMeta::new(
                "CORR-001",
                "Authentication Brute Force",
                "Multiple failed authentication attempts from same source",
                Severity::High,
            ),
            threshold: threshold.max(1),
            timeframe: TimeDelta::minutes(DEFAULT_TIMEFRAME_MINS),
        }
    }

    /// 시간 창을 변경합니다.
    pub fn with_timeframe(mut self, timeframe: TimeDelta) -> Self {
        self.timeframe = timeframe;
        self
    }

    /// 임계값
    pub fn threshold(&self) -> usize {
        self.threshold
    }

    fn is_failed_login(event: &Event) -> bool {
        let message = event.message.to_lowercase();
        message.contains("failed") && message.contains("login")
    }
}

impl Default for BruteForceRule {
    fn default() -> Self {
        Self::new(DEFAULT_THRESHOLD)
    }
}

impl CorrelationRule for BruteForceRule {
    fn meta(&self) -> &RuleMeta {
        &self.meta
    }

    fn timeframe(&self) -> TimeDelta {
        self.timeframe
    }

    fn evaluate(&self, window: &[&Event], now: DateTime<Utc>) -> Result<Vec<Alert>, EngineError> {
        // 처음 등장한 순서대로 그룹을 유지합니다.
        let mut groups: Vec<(&str, Vec<&Event>)> = Vec::new();
        let mut index: HashMap<&str, usize> = HashMap::new();

        for event in window.iter().copied().filter(|e| Self::is_failed_login(e)) {
            let Some(ip) = extract_first_ipv4(&event.message) else {
                continue;
            };
            match index.get(ip) {
                Some(&slot) => groups[slot].1.push(event),
                None => {
                    index.insert(ip, groups.len());
                    groups.push((ip, vec![event]));
                }
            }
        }

        let alerts = groups
            .into_iter()
            .filter(|(_, events)| events.len() >= self.threshold)
            .map(|(ip, events)| {
                let count = events.len();
                Alert::new(
                    self.meta.id.clone(),
                    self.meta.name.clone(),
                    self.meta.severity,
                    format!(
                        "Possible brute force detected from {ip}: {count} failed login attempts"
                    ),
                )
                .with_correlation_key(ip)
                .with_matches(events.into_iter().cloned().collect())
                .generated_at(now)
            })
            .collect();

        Ok(alerts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    fn failed(ip: &str, secs_ago: i64) -> Event {
        Event::at(
            now() - TimeDelta::seconds(secs_ago),
            format!("Failed login for admin from {ip}"),
        )
    }

    fn run(rule: &BruteForceRule, events: &[Event]) -> Vec<Alert> {
        let window: Vec<&Event> = events.iter().collect();
        rule.evaluate(&window, now()).unwrap()
    }

    #[test]
    fn three_failures_meet_threshold_three() {
        let rule = BruteForceRule::new(3);
        let events = vec![
            failed("10.0.0.5", 30),
            failed("10.0.0.5", 20),
            failed("10.0.0.5", 10),
        ];
        let alerts = run(&rule, &events);
        assert_eq!(alerts.len(), 1);
        let alert = &alerts[0];
        assert_eq!(alert.rule_id, "CORR-001");
        assert_eq!(alert.severity, Severity::High);
        assert_eq!(alert.count, 3);
        assert_eq!(alert.matches.len(), 3);
        assert_eq!(alert.correlation_key.as_deref(), Some("10.0.0.5"));
        assert_eq!(
            alert.message,
            "Possible brute force detected from 10.0.0.5: 3 failed login attempts"
        );
    }

    #[test]
    fn two_failures_below_threshold_three() {
        let rule = BruteForceRule::new(3);
        let events = vec![failed("10.0.0.5", 20), failed("10.0.0.5", 10)];
        assert!(run(&rule, &events).is_empty());
    }

    #[test]
    fn groups_are_per_ip_in_first_appearance_order() {
        let rule = BruteForceRule::new(2);
        let events = vec![
            failed("10.0.0.9", 50),
            failed("10.0.0.1", 40),
            failed("10.0.0.1", 30),
            failed("10.0.0.9", 20),
            failed("10.0.0.7", 10),
        ];
        let alerts = run(&rule, &events);
        let keys: Vec<&str> = alerts
            .iter()
            .map(|a| a.correlation_key.as_deref().unwrap())
            .collect();
        assert_eq!(keys, vec!["10.0.0.9", "10.0.0.1"]);
    }

    #[test]
    fn filter_requires_failed_and_login() {
        let rule = BruteForceRule::new(1);
        let events = vec![
            Event::at(now(), "Failed password for root from 10.0.0.5"),
            Event::at(now(), "login succeeded from 10.0.0.5"),
            Event::at(now(), "LOGIN FAILED from 10.0.0.6"),
        ];
        let alerts = run(&rule, &events);
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].correlation_key.as_deref(), Some("10.0.0.6"));
    }

    #[test]
    fn events_without_ip_are_excluded() {
        let rule = BruteForceRule::new(1);
        let events = vec![Event::at(now(), "Failed login for admin")];
        assert!(run(&rule, &events).is_empty());
    }

    #[test]
    fn only_first_ip_in_message_is_used() {
        let rule = BruteForceRule::new(2);
        let events = vec![
            Event::at(now(), "Failed login from 10.0.0.1 via 10.0.0.2"),
            Event::at(now(), "Failed login from 10.0.0.2 via 10.0.0.1"),
        ];
        assert!(run(&rule, &events).is_empty());
    }

    #[test]
    fn default_threshold_and_timeframe() {
        let rule = BruteForceRule::default();
        assert_eq!(rule.threshold(), 5);
        assert_eq!(rule.timeframe(), TimeDelta::minutes(15));
    }
}
