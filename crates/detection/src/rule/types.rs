//! 탐지 규칙 데이터 타입
//!
//! YAML 규칙 파일과 설정 파일에서 역직렬화되는 구조체들을 정의합니다.

use logwarden_core::types::Severity;
use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// 모든 규칙이 공유하는 메타데이터
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleMeta {
    /// 규칙 고유 ID
    pub id: String,
    /// 규칙 이름 (알림에 표시)
    pub name: String,
    /// 규칙 설명
    pub description: String,
    /// 심각도
    pub severity: Severity,
}

impl RuleMeta {
    /// 새 메타데이터를 생성합니다.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
        severity: Severity,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: description.into(),
            severity,
        }
    }
}

/// 단일 이벤트 규칙 정의 -- 하나의 YAML 규칙 파일에 대응합니다.
///
/// # YAML 스키마
/// ```yaml
/// id: RULE-100
/// name: shadow_read
/// description: Reads of the shadow file
/// severity: high
/// status: enabled
/// detection:
///   predicate: sensitive_file_access   # 선택: 이름 있는 내장 판별식
///   conditions:                        # 선택: 필드 조건 (AND 결합)
///     - field: message
///       modifier: contains
///       value: "/etc/shadow"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleDefinition {
    /// 규칙 고유 ID
    pub id: String,
    /// 규칙 이름
    pub name: String,
    /// 규칙 설명
    #[serde(default)]
    pub description: String,
    /// 심각도
    pub severity: Severity,
    /// 규칙 상태
    #[serde(default)]
    pub status: RuleStatus,
    /// 탐지 조건
    pub detection: DetectionSpec,
}

impl RuleDefinition {
    /// 메시지 부분 문자열 규칙을 생성합니다 (대소문자 구분).
    pub fn contains(
        id: impl Into<String>,
        name: impl Into<String>,
        pattern: impl Into<String>,
        severity: Severity,
    ) -> Self {
        let pattern = pattern.into();
        Self {
            id: id.into(),
            name: name.into(),
            description: format!("message contains '{pattern}'"),
            severity,
            status: RuleStatus::Enabled,
            detection: DetectionSpec {
                predicate: None,
                conditions: vec![FieldCondition {
                    field: "message".to_owned(),
                    modifier: ConditionModifier::Contains,
                    value: pattern,
                    case_insensitive: false,
                }],
            },
        }
    }

    /// 이름 있는 판별식 규칙을 생성합니다.
    pub fn predicate(meta: RuleMeta, predicate: impl Into<String>) -> Self {
        Self {
            id: meta.id,
            name: meta.name,
            description: meta.description,
            severity: meta.severity,
            status: RuleStatus::Enabled,
            detection: DetectionSpec {
                predicate: Some(predicate.into()),
                conditions: Vec::new(),
            },
        }
    }

    /// 메타데이터를 추출합니다.
    pub fn meta(&self) -> RuleMeta {
        RuleMeta::new(
            self.id.clone(),
            self.name.clone(),
            self.description.clone(),
            self.severity,
        )
    }

    /// 규칙의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.id.is_empty() {
            return Err(EngineError::RuleValidation {
                rule_id: "(empty)".to_owned(),
                reason: "rule id must not be empty".to_owned(),
            });
        }

        if self.id.len() > 256 {
            return Err(EngineError::RuleValidation {
                rule_id: self.id.clone(),
                reason: "rule id must not exceed 256 characters".to_owned(),
            });
        }

        if self.name.is_empty() {
            return Err(EngineError::RuleValidation {
                rule_id: self.id.clone(),
                reason: "rule name must not be empty".to_owned(),
            });
        }

        if self.detection.predicate.is_none() && self.detection.conditions.is_empty() {
            return Err(EngineError::RuleValidation {
                rule_id: self.id.clone(),
                reason: "detection needs a predicate or at least one condition".to_owned(),
            });
        }

        for (idx, condition) in self.detection.conditions.iter().enumerate() {
            if condition.field.is_empty() {
                return Err(EngineError::RuleValidation {
                    rule_id: self.id.clone(),
                    reason: format!("condition[{idx}] field must not be empty"),
                });
            }
        }

        Ok(())
    }
}

/// 규칙 상태
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleStatus {
    /// 활성화 (기본값)
    #[default]
    Enabled,
    /// 비활성화 (레지스트리에 등록되지 않음)
    Disabled,
}

/// 탐지 조건
///
/// `predicate`와 `conditions`는 AND로 결합됩니다.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DetectionSpec {
    /// 이름 있는 판별식
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub predicate: Option<String>,
    /// 필드 매칭 조건 목록 (AND 결합)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<FieldCondition>,
}

/// 필드 매칭 조건
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldCondition {
    /// 대상 필드명 (message, host, process, source, level, 또는 raw 내의 키)
    pub field: String,
    /// 매칭 수정자
    #[serde(default)]
    pub modifier: ConditionModifier,
    /// 매칭할 값
    pub value: String,
    /// 대소문자 무시 여부 (regex에는 적용되지 않음)
    #[serde(default)]
    pub case_insensitive: bool,
}

/// 조건 수정자 -- 매칭 방식을 결정합니다.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConditionModifier {
    /// 정확히 일치
    Exact,
    /// 부분 문자열 포함 (기본값)
    #[default]
    Contains,
    /// 접두사 일치
    StartsWith,
    /// 접미사 일치
    EndsWith,
    /// 정규식 매칭
    Regex,
}
