//! 상관 분석 엔진 -- 이벤트 버퍼와 상관 규칙 평가
//!
//! [`CorrelationEngine`]은 [`EventBuffer`]를 소유하고, 배치 단위로 이벤트를
//! 받아 보존 기간을 적용한 뒤 각 상관 규칙을 규칙 고유의 시간 창으로 평가합니다.
//!
//! 한 규칙의 에러나 panic은 해당 규칙에만 국한되며, 나머지 규칙은 계속
//! 평가됩니다.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use logwarden_core::metrics as m;
use logwarden_core::types::{Alert, Event};
use tokio::sync::Mutex;

use crate::buffer::EventBuffer;
use crate::config::EngineConfig;
use crate::rule::RuleRegistry;

/// 상관 분석 엔진
///
/// 버퍼는 `tokio::sync::Mutex`로 보호되므로 여러 태스크에서
/// `Arc<CorrelationEngine>`으로 공유할 수 있습니다.
pub struct CorrelationEngine {
    registry: Arc<RuleRegistry>,
    buffer: Mutex<EventBuffer>,
}

impl CorrelationEngine {
    /// 새 엔진을 생성합니다.
    pub fn new(registry: Arc<RuleRegistry>, config: &EngineConfig) -> Self {
        Self {
            registry,
            buffer: Mutex::new(EventBuffer::new(
                config.retention(),
                config.buffer_max_events,
                config.drop_policy,
            )),
        }
    }

    /// 현재 시각 기준으로 이벤트 배치를 버퍼에 추가합니다.
    pub async fn add_events(&self, batch: &[Event]) -> usize {
        self.add_events_at(batch, Utc::now()).await
    }

    /// 이벤트 배치를 버퍼에 추가하고 `now` 기준으로 보존 기간을 적용합니다.
    ///
    /// 타임스탬프를 해석할 수 없는 이벤트는 버려집니다.
    /// 버퍼에 들어간 이벤트 수를 반환합니다.
    pub async fn add_events_at(&self, batch: &[Event], now: DateTime<Utc>) -> usize {
        let mut buffer = self.buffer.lock().await;

        let mut accepted = 0usize;
        let mut dropped = 0u64;
        for event in batch {
            if buffer.push(event.clone()).is_accepted() {
                accepted += 1;
            } else {
                dropped += 1;
            }
        }

        let pruned = buffer.prune(now);
        let size = buffer.len();
        drop(buffer);

        metrics::counter!(m::EVENTS_INGESTED_TOTAL).increment(accepted as u64);
        metrics::counter!(m::EVENTS_DROPPED_TOTAL).increment(dropped);
        metrics::gauge!(m::BUFFER_SIZE).set(size as f64);

        tracing::debug!(
            received = batch.len(),
            accepted,
            dropped,
            pruned,
            buffered = size,
            "events added to correlation buffer"
        );

        accepted
    }

    /// 현재 시각 기준으로 모든 상관 규칙을 평가합니다.
    pub async fn evaluate_rules(&self) -> Vec<Alert> {
        self.evaluate_rules_at(Utc::now()).await
    }

    /// `now` 기준으로 모든 상관 규칙을 등록 순서대로 평가합니다.
    ///
    /// 각 규칙은 `now - timeframe` 이후의 이벤트만 봅니다.
    pub async fn evaluate_rules_at(&self, now: DateTime<Utc>) -> Vec<Alert> {
        let buffer = self.buffer.lock().await;
        let mut alerts = Vec::new();

        for rule in self.registry.correlation_rules() {
            let rule_id = rule.meta().id.as_str();
            let window = buffer.window(now - rule.timeframe());

            let outcome = catch_unwind(AssertUnwindSafe(|| rule.evaluate(&window, now)));
            match outcome {
                Ok(Ok(found)) => {
                    for alert in &found {
                        metrics::counter!(
                            m::ALERTS_GENERATED_TOTAL,
                            m::LABEL_RULE_ID => alert.rule_id.clone(),
                            m::LABEL_SEVERITY => alert.severity.as_str()
                        )
                        .increment(1);
                    }
                    if !found.is_empty() {
                        tracing::info!(
                            rule_id,
                            alerts = found.len(),
                            window_events = window.len(),
                            "correlation rule fired"
                        );
                    }
                    alerts.extend(found);
                }
                Ok(Err(e)) => {
                    metrics::counter!(m::RULE_FAILURES_TOTAL, m::LABEL_RULE_ID => rule_id.to_owned())
                        .increment(1);
                    tracing::error!(rule_id, error = %e, "correlation rule failed");
                }
                Err(panic) => {
                    metrics::counter!(m::RULE_FAILURES_TOTAL, m::LABEL_RULE_ID => rule_id.to_owned())
                        .increment(1);
                    tracing::error!(
                        rule_id,
                        panic = panic_message(&*panic),
                        "correlation rule panicked"
                    );
                }
            }
        }

        alerts
    }

    /// 현재 버퍼에 있는 이벤트 수
    pub async fn buffered(&self) -> usize {
        self.buffer.lock().await.len()
    }

    /// 규칙 레지스트리
    pub fn registry(&self) -> &Arc<RuleRegistry> {
        &self.registry
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "unknown panic"
    }
}
