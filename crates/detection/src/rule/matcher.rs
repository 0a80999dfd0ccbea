//! 규칙 매칭 로직 -- 조건 컴파일 및 평가
//!
//! [`CompiledMatcher`]는 [`DetectionSpec`]을 한 번 컴파일하여 보관합니다.
//! 판별식 이름은 등록 시점에 해석되고, 정규식도 그때 컴파일됩니다.
//! 평가 시점에는 실패할 수 있는 작업이 남지 않습니다.

use regex::{Regex, RegexBuilder};

use logwarden_core::types::Event;

use super::predicate::{Predicate, PredicateRegistry};
use super::types::{ConditionModifier, DetectionSpec, FieldCondition};
use crate::error::EngineError;

/// 컴파일된 필드 조건
enum CompiledCondition {
    Text {
        field: String,
        modifier: ConditionModifier,
        value: String,
        case_insensitive: bool,
    },
    Regex {
        field: String,
        regex: Regex,
    },
}

impl CompiledCondition {
    fn compile(rule_id: &str, idx: usize, cond: &FieldCondition) -> Result<Self, EngineError> {
        if cond.modifier == ConditionModifier::Regex {
            let regex = RegexBuilder::new(&cond.value)
                .case_insensitive(cond.case_insensitive)
                .build()
                .map_err(|e| EngineError::RuleValidation {
                    rule_id: rule_id.to_owned(),
                    reason: format!(
                        "invalid regex in condition[{idx}] for field '{}': {e}",
                        cond.field
                    ),
                })?;
            return Ok(Self::Regex {
                field: cond.field.clone(),
                regex,
            });
        }

        let value = if cond.case_insensitive {
            cond.value.to_lowercase()
        } else {
            cond.value.clone()
        };
        Ok(Self::Text {
            field: cond.field.clone(),
            modifier: cond.modifier,
            value,
            case_insensitive: cond.case_insensitive,
        })
    }

    fn matches(&self, event: &Event) -> bool {
        match self {
            Self::Regex { field, regex } => {
                field_value(event, field).is_some_and(|v| regex.is_match(&v))
            }
            Self::Text {
                field,
                modifier,
                value,
                case_insensitive,
            } => {
                let Some(actual) = field_value(event, field) else {
                    return false;
                };
                let actual = if *case_insensitive {
                    actual.to_lowercase()
                } else {
                    actual
                };
                match modifier {
                    ConditionModifier::Exact => actual == *value,
                    ConditionModifier::Contains => actual.contains(value.as_str()),
                    ConditionModifier::StartsWith => actual.starts_with(value.as_str()),
                    ConditionModifier::EndsWith => actual.ends_with(value.as_str()),
                    ConditionModifier::Regex => false,
                }
            }
        }
    }
}

/// 이벤트에서 필드 값을 추출합니다.
fn field_value(event: &Event, field: &str) -> Option<String> {
    match field {
        "message" => Some(event.message.clone()),
        "host" | "hostname" => Some(event.host.clone()),
        "process" => Some(event.process.clone()),
        "source" => Some(event.source.clone()),
        "level" => Some(event.level.clone()),
        "timestamp" => Some(event.timestamp.clone()),
        _ => event.raw.get(field).and_then(|v| match v {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Number(n) => Some(n.to_string()),
            serde_json::Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }),
    }
}

/// 컴파일된 탐지 조건
pub struct CompiledMatcher {
    predicate: Option<(String, Predicate)>,
    conditions: Vec<CompiledCondition>,
}

impl CompiledMatcher {
    /// 탐지 조건을 컴파일합니다.
    ///
    /// # Errors
    /// - 판별식 이름이 레지스트리에 없는 경우
    /// - 정규식이 잘못된 경우
    pub fn compile(
        rule_id: &str,
        spec: &DetectionSpec,
        predicates: &PredicateRegistry,
    ) -> Result<Self, EngineError> {
        let predicate = match &spec.predicate {
            Some(name) => {
                let predicate =
                    predicates
                        .get(name)
                        .ok_or_else(|| EngineError::RuleValidation {
                            rule_id: rule_id.to_owned(),
                            reason: format!("unknown predicate '{name}'"),
                        })?;
                Some((name.clone(), predicate))
            }
            None => None,
        };

        let conditions = spec
            .conditions
            .iter()
            .enumerate()
            .map(|(idx, cond)| CompiledCondition::compile(rule_id, idx, cond))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            predicate,
            conditions,
        })
    }

    /// 이벤트를 평가하여 매칭 사유를 반환합니다.
    ///
    /// 판별식과 모든 조건이 AND로 결합됩니다.
    pub fn evaluate(&self, event: &Event) -> Option<String> {
        if !self.conditions.iter().all(|c| c.matches(event)) {
            return None;
        }
        match &self.predicate {
            Some((_, predicate)) => predicate(event),
            None => Some(format!("{} condition(s) matched", self.conditions.len())),
        }
    }

    /// 판별식 이름
    pub fn predicate_name(&self) -> Option<&str> {
        self.predicate.as_ref().map(|(name, _)| name.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(msg: &str) -> Event {
        Event::new("2024-05-01T12:00:00Z", msg)
            .with_process("sshd")
            .with_host("web-01")
    }

    fn cond(field: &str, modifier: ConditionModifier, value: &str) -> FieldCondition {
        FieldCondition {
            field: field.to_owned(),
            modifier,
            value: value.to_owned(),
            case_insensitive: false,
        }
    }

    fn compile(spec: DetectionSpec) -> CompiledMatcher {
        CompiledMatcher::compile("T-1", &spec, &PredicateRegistry::with_builtins()).unwrap()
    }

    #[test]
    fn contains_is_case_sensitive_by_default() {
        let matcher = compile(DetectionSpec {
            predicate: None,
            conditions: vec![cond("message", ConditionModifier::Contains, "Failed")],
        });
        assert!(matcher.evaluate(&event("Failed password")).is_some());
        assert!(matcher.evaluate(&event("failed password")).is_none());
    }

    #[test]
    fn case_insensitive_flag() {
        let mut c = cond("message", ConditionModifier::Contains, "FAILED");
        c.case_insensitive = true;
        let matcher = compile(DetectionSpec {
            predicate: None,
            conditions: vec![c],
        });
        assert!(matcher.evaluate(&event("failed password")).is_some());
    }

    #[test]
    fn conditions_are_and_combined() {
        let matcher = compile(DetectionSpec {
            predicate: None,
            conditions: vec![
                cond("process", ConditionModifier::Exact, "sshd"),
                cond("message", ConditionModifier::StartsWith, "Accepted"),
            ],
        });
        assert!(matcher.evaluate(&event("Accepted publickey")).is_some());
        assert!(matcher.evaluate(&event("Failed publickey")).is_none());
    }

    #[test]
    fn regex_condition() {
        let matcher = compile(DetectionSpec {
            predicate: None,
            conditions: vec![cond("message", ConditionModifier::Regex, r"port \d+$")],
        });
        assert!(matcher.evaluate(&event("from 1.2.3.4 port 22")).is_some());
        assert!(matcher.evaluate(&event("port x")).is_none());
    }

    #[test]
    fn invalid_regex_fails_compile() {
        let spec = DetectionSpec {
            predicate: None,
            conditions: vec![cond("message", ConditionModifier::Regex, "[unclosed")],
        };
        let result = CompiledMatcher::compile("T-1", &spec, &PredicateRegistry::new());
        assert!(matches!(result, Err(EngineError::RuleValidation { .. })));
    }

    #[test]
    fn unknown_predicate_fails_compile() {
        let spec = DetectionSpec {
            predicate: Some("does_not_exist".to_owned()),
            conditions: Vec::new(),
        };
        let result = CompiledMatcher::compile("T-1", &spec, &PredicateRegistry::with_builtins());
        let err = result.err().unwrap();
        assert!(err.to_string().contains("does_not_exist"));
    }

    #[test]
    fn predicate_combined_with_condition() {
        let matcher = compile(DetectionSpec {
            predicate: Some("privilege_escalation".to_owned()),
            conditions: vec![cond("host", ConditionModifier::Exact, "web-01")],
        });
        assert_eq!(matcher.predicate_name(), Some("privilege_escalation"));
        assert!(matcher.evaluate(&event("sudo su -")).is_some());
        let other_host = event("sudo su -").with_host("db-01");
        assert!(matcher.evaluate(&other_host).is_none());
    }

    #[test]
    fn raw_field_lookup() {
        let mut e = event("x");
        e.raw
            .insert("user".to_owned(), serde_json::Value::String("root".to_owned()));
        let matcher = compile(DetectionSpec {
            predicate: None,
            conditions: vec![cond("user", ConditionModifier::Exact, "root")],
        });
        assert!(matcher.evaluate(&e).is_some());
        assert!(matcher.evaluate(&event("x")).is_none());
    }
}
