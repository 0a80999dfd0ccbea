//! 탐지 규칙 -- 단일 이벤트 규칙과 상관 규칙
//!
//! 두 종류의 규칙이 [`RuleMeta`]를 공유합니다.
//!
//! - [`ImmediateRule`]: 이벤트 하나를 검사하는 무상태 규칙.
//!   [`RuleDefinition`]과 [`PredicateRegistry`]로부터 컴파일됩니다.
//! - [`CorrelationRule`]: 시간 창 안의 이벤트 시퀀스를 평가하는 상태 규칙.
//!
//! # 아키텍처
//! - [`RuleRegistry`]: 시작 시 한 번 구성되는 규칙 목록 (등록 순서 유지)
//! - [`loader`]: YAML 파일 로딩 및 유효성 검증
//! - [`matcher`]: 조건 매칭 로직 (exact, contains, regex 등)
//! - [`builtin`]: 내장 판별식과 규칙 정의
//! - [`brute_force`]: 내장 상관 규칙

pub mod brute_force;
pub mod builtin;
pub mod loader;
pub mod matcher;
pub mod predicate;
pub mod types;

pub use brute_force::BruteForceRule;
pub use loader::RuleLoader;
pub use matcher::CompiledMatcher;
pub use predicate::{Predicate, PredicateRegistry};
pub use types::{
    ConditionModifier, DetectionSpec, FieldCondition, RuleDefinition, RuleMeta, RuleStatus,
};

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use logwarden_core::types::{Alert, Event, Severity};

use crate::config::EngineConfig;
use crate::error::EngineError;

/// 상관 규칙 -- 시간 창 안의 이벤트 시퀀스를 평가합니다.
///
/// `window`는 타임스탬프 순으로 정렬되어 있으며 모두
/// `now - timeframe()` 이후의 이벤트입니다.
pub trait CorrelationRule: Send + Sync {
    /// 규칙 메타데이터
    fn meta(&self) -> &RuleMeta;

    /// 규칙 고유 시간 창
    fn timeframe(&self) -> TimeDelta;

    /// 시간 창의 이벤트를 평가하여 알림 목록을 반환합니다.
    fn evaluate(&self, window: &[&Event], now: DateTime<Utc>) -> Result<Vec<Alert>, EngineError>;
}

/// 컴파일된 단일 이벤트 규칙
pub struct ImmediateRule {
    meta: RuleMeta,
    matcher: CompiledMatcher,
}

impl ImmediateRule {
    /// 규칙 정의를 검증하고 컴파일합니다.
    pub fn compile(
        definition: &RuleDefinition,
        predicates: &PredicateRegistry,
    ) -> Result<Self, EngineError> {
        definition.validate()?;
        let matcher = CompiledMatcher::compile(&definition.id, &definition.detection, predicates)?;
        Ok(Self {
            meta: definition.meta(),
            matcher,
        })
    }

    /// 규칙 메타데이터
    pub fn meta(&self) -> &RuleMeta {
        &self.meta
    }

    /// 이벤트를 평가하여 매칭 사유를 반환합니다.
    pub fn evaluate(&self, event: &Event) -> Option<String> {
        self.matcher.evaluate(event)
    }

    /// 이벤트가 규칙에 매칭되는지 확인합니다.
    pub fn matches(&self, event: &Event) -> bool {
        self.evaluate(event).is_some()
    }
}

impl std::fmt::Debug for ImmediateRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImmediateRule")
            .field("meta", &self.meta)
            .field("predicate", &self.matcher.predicate_name())
            .finish()
    }
}

/// 규칙 레지스트리
///
/// 규칙은 시작 시 등록되고 이후 변경되지 않습니다. 엔진들은
/// `Arc<RuleRegistry>`로 같은 레지스트리를 공유합니다.
#[derive(Default)]
pub struct RuleRegistry {
    immediate: Vec<ImmediateRule>,
    correlation: Vec<Arc<dyn CorrelationRule>>,
    ids: HashSet<String>,
}

impl RuleRegistry {
    /// 빈 레지스트리를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 표준 규칙 세트를 구성합니다.
    ///
    /// 등록 순서: 내장 규칙(RULE-001..003), 설정 파일의 부분 문자열 규칙
    /// (`CFG-<n>`), `extra` 규칙(YAML 파일), 그리고 brute force 상관 규칙.
    pub fn standard(
        config: &EngineConfig,
        extra: Vec<RuleDefinition>,
    ) -> Result<Self, EngineError> {
        let predicates = PredicateRegistry::with_builtins();
        let mut registry = Self::new();

        for definition in builtin::builtin_definitions() {
            registry.register_immediate(&definition, &predicates)?;
        }

        for (idx, rule) in config.pattern_rules.iter().enumerate() {
            let id = format!("CFG-{}", idx + 1);
            let severity = Severity::from_str_loose(&rule.severity).ok_or_else(|| {
                EngineError::RuleValidation {
                    rule_id: id.clone(),
                    reason: format!("invalid severity '{}'", rule.severity),
                }
            })?;
            let definition = RuleDefinition::contains(id, &rule.name, &rule.pattern, severity);
            registry.register_immediate(&definition, &predicates)?;
        }

        for definition in &extra {
            registry.register_immediate(definition, &predicates)?;
        }

        registry.register_correlation(Arc::new(
            BruteForceRule::new(config.brute_force_threshold)
                .with_timeframe(config.brute_force_timeframe()),
        ))?;

        tracing::info!(
            immediate = registry.immediate.len(),
            correlation = registry.correlation.len(),
            "rule registry ready"
        );

        Ok(registry)
    }

    /// 단일 이벤트 규칙을 등록합니다.
    ///
    /// 비활성 규칙은 건너뛰고 `Ok(false)`를 반환합니다.
    pub fn register_immediate(
        &mut self,
        definition: &RuleDefinition,
        predicates: &PredicateRegistry,
    ) -> Result<bool, EngineError> {
        if definition.status == RuleStatus::Disabled {
            tracing::debug!(rule_id = %definition.id, "rule disabled, not registered");
            return Ok(false);
        }
        if self.ids.contains(&definition.id) {
            return Err(EngineError::DuplicateRule(definition.id.clone()));
        }

        let rule = ImmediateRule::compile(definition, predicates)?;
        self.ids.insert(definition.id.clone());
        self.immediate.push(rule);
        Ok(true)
    }

    /// 상관 규칙을 등록합니다.
    pub fn register_correlation(
        &mut self,
        rule: Arc<dyn CorrelationRule>,
    ) -> Result<(), EngineError> {
        let id = rule.meta().id.clone();
        if !self.ids.insert(id.clone()) {
            return Err(EngineError::DuplicateRule(id));
        }
        self.correlation.push(rule);
        Ok(())
    }

    /// 단일 이벤트 규칙 (등록 순서)
    pub fn immediate_rules(&self) -> &[ImmediateRule] {
        &self.immediate
    }

    /// 상관 규칙 (등록 순서)
    pub fn correlation_rules(&self) -> &[Arc<dyn CorrelationRule>] {
        &self.correlation
    }

    /// 등록된 전체 규칙 수
    pub fn len(&self) -> usize {
        self.immediate.len() + self.correlation.len()
    }

    /// 등록된 규칙이 없는지 여부
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfigBuilder;

    fn ev(msg: &str) -> Event {
        Event::new("2024-05-01T12:00:00Z", msg)
    }

    #[test]
    fn standard_registry_order() {
        let config = EngineConfigBuilder::new()
            .pattern_rule("failed_password", "Failed password", "med")
            .build()
            .unwrap();
        let extra = vec![RuleDefinition::contains(
            "RULE-100",
            "shadow",
            "/etc/shadow",
            Severity::Low,
        )];
        let registry = RuleRegistry::standard(&config, extra).unwrap();

        let ids: Vec<&str> = registry
            .immediate_rules()
            .iter()
            .map(|r| r.meta().id.as_str())
            .collect();
        assert_eq!(
            ids,
            vec!["RULE-001", "RULE-002", "RULE-003", "CFG-1", "RULE-100"]
        );
        assert_eq!(registry.immediate_rules()[3].meta().severity, Severity::Medium);
        assert_eq!(registry.correlation_rules().len(), 1);
        assert_eq!(registry.correlation_rules()[0].meta().id, "CORR-001");
        assert_eq!(registry.len(), 6);
    }

    #[test]
    fn standard_rejects_bad_severity() {
        let mut config = EngineConfig::default();
        config.pattern_rules.push(logwarden_core::config::PatternRuleConfig {
            name: "x".to_owned(),
            pattern: "y".to_owned(),
            severity: "urgent".to_owned(),
        });
        let err = RuleRegistry::standard(&config, Vec::new()).err().unwrap();
        assert!(err.to_string().contains("CFG-1"));
    }

    #[test]
    fn brute_force_uses_configured_threshold() {
        let config = EngineConfigBuilder::new()
            .brute_force_threshold(3)
            .build()
            .unwrap();
        let registry = RuleRegistry::standard(&config, Vec::new()).unwrap();
        let rule = &registry.correlation_rules()[0];
        assert_eq!(rule.timeframe(), TimeDelta::minutes(15));
    }

    #[test]
    fn duplicate_id_is_rejected() {
        let predicates = PredicateRegistry::with_builtins();
        let mut registry = RuleRegistry::new();
        let def = RuleDefinition::contains("R-1", "a", "a", Severity::Low);
        assert!(registry.register_immediate(&def, &predicates).unwrap());
        let err = registry.register_immediate(&def, &predicates).unwrap_err();
        assert!(matches!(err, EngineError::DuplicateRule(id) if id == "R-1"));
    }

    #[test]
    fn disabled_rule_is_skipped() {
        let predicates = PredicateRegistry::new();
        let mut registry = RuleRegistry::new();
        let mut def = RuleDefinition::contains("R-1", "a", "a", Severity::Low);
        def.status = RuleStatus::Disabled;
        assert!(!registry.register_immediate(&def, &predicates).unwrap());
        assert!(registry.is_empty());
    }

    #[test]
    fn immediate_rule_matches() {
        let predicates = PredicateRegistry::with_builtins();
        let rule = ImmediateRule::compile(&builtin::builtin_definitions()[0], &predicates).unwrap();
        assert!(rule.matches(&ev("sudo su - root")));
        assert!(!rule.matches(&ev("ls -la")));
        assert_eq!(
            rule.evaluate(&ev("sudo -i")).as_deref(),
            Some("Potential privilege escalation detected")
        );
    }
}
