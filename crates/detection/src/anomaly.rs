//! 이상 탐지기 -- 배치 단위 단일 이벤트 규칙 적용
//!
//! 과거 이력 없이 한 배치에만 모든 단일 이벤트 규칙을 적용합니다.
//! 규칙은 서로 배타적이지 않으므로 하나의 배치가 여러 규칙을 발동시킬 수 있습니다.

use std::sync::Arc;

use chrono::Utc;
use logwarden_core::metrics as m;
use logwarden_core::types::{Alert, Event};

use crate::rule::RuleRegistry;

/// 이상 탐지기
pub struct AnomalyDetector {
    registry: Arc<RuleRegistry>,
    threshold: usize,
}

impl AnomalyDetector {
    /// 새 탐지기를 생성합니다.
    ///
    /// 규칙별 매칭 수가 `threshold`를 **초과**해야 알림이 생성됩니다.
    pub fn new(registry: Arc<RuleRegistry>, threshold: usize) -> Self {
        Self {
            registry,
            threshold,
        }
    }

    /// 임계값
    pub fn threshold(&self) -> usize {
        self.threshold
    }

    /// 배치를 분석하여 규칙별로 최대 하나의 알림을 생성합니다.
    pub fn analyze(&self, batch: &[Event]) -> Vec<Alert> {
        let now = Utc::now();
        let mut alerts = Vec::new();

        for rule in self.registry.immediate_rules() {
            let matched: Vec<Event> = batch
                .iter()
                .filter(|event| rule.matches(event))
                .cloned()
                .collect();

            if matched.len() <= self.threshold {
                continue;
            }

            let meta = rule.meta();
            let count = matched.len();
            tracing::info!(
                rule_id = %meta.id,
                count,
                threshold = self.threshold,
                "anomaly threshold exceeded"
            );
            metrics::counter!(
                m::ALERTS_GENERATED_TOTAL,
                m::LABEL_RULE_ID => meta.id.clone(),
                m::LABEL_SEVERITY => meta.severity.as_str()
            )
            .increment(1);

            alerts.push(
                Alert::new(
                    meta.id.clone(),
                    meta.name.clone(),
                    meta.severity,
                    format!("{}: {count} matching events", meta.description),
                )
                .with_matches(matched)
                .generated_at(now),
            );
        }

        alerts
    }
}
