//! 탐지 엔진 에러 타입
//!
//! [`EngineError`]는 탐지 크레이트 내부에서 발생하는 모든 에러를 표현합니다.
//! `From<EngineError> for LogwardenError` 변환이 구현되어 있어
//! 상위 레이어에서 `?` 연산자로 자연스럽게 전파할 수 있습니다.

use logwarden_core::error::{
    CollectorError, ConfigError, DetectionError, LogwardenError, ParseError,
};

/// 탐지 엔진 도메인 에러
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// 로그 파싱 실패
    #[error("parse error: {format} at offset {offset}: {reason}")]
    Parse {
        /// 파서 형식 (default, syslog, apache, json)
        format: String,
        /// 실패 위치 (바이트 오프셋)
        offset: usize,
        /// 실패 사유
        reason: String,
    },

    /// 지원하지 않는 로그 형식
    #[error("unsupported log format: {0}")]
    UnsupportedFormat(String),

    /// 룰 파일 로딩 실패
    #[error("rule load error: {path}: {reason}")]
    RuleLoad {
        /// 룰 파일 경로
        path: String,
        /// 로딩 실패 사유
        reason: String,
    },

    /// 룰 유효성 검증 실패
    #[error("rule validation error: rule '{rule_id}': {reason}")]
    RuleValidation {
        /// 문제가 된 룰 ID
        rule_id: String,
        /// 검증 실패 사유
        reason: String,
    },

    /// 같은 ID의 룰이 이미 등록됨
    #[error("duplicate rule id: {0}")]
    DuplicateRule(String),

    /// 상관 규칙 평가 실패
    #[error("rule '{rule_id}' evaluation failed: {reason}")]
    Evaluation {
        /// 룰 ID
        rule_id: String,
        /// 실패 사유
        reason: String,
    },

    /// 수집기 에러 (파일 I/O, 네트워크 등)
    #[error("collector error: {source_type}: {reason}")]
    Collector {
        /// 수집 소스 유형 (file, syslog_udp)
        source_type: String,
        /// 에러 사유
        reason: String,
    },

    /// 설정 에러
    #[error("config error: {field}: {reason}")]
    Config {
        /// 설정 필드명
        field: String,
        /// 에러 사유
        reason: String,
    },

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// 정규식 컴파일 에러
    #[error("regex error: {0}")]
    Regex(#[from] regex::Error),
}

impl From<EngineError> for LogwardenError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::Parse {
                offset, reason, ..
            } => LogwardenError::Parse(ParseError::Failed { offset, reason }),
            EngineError::UnsupportedFormat(format) => {
                LogwardenError::Parse(ParseError::UnsupportedFormat(format))
            }
            EngineError::Collector {
                source_type,
                reason,
            } => LogwardenError::Collector(CollectorError::Unavailable {
                source_name: source_type,
                reason,
            }),
            EngineError::Config { field, reason } => {
                LogwardenError::Config(ConfigError::InvalidValue { field, reason })
            }
            EngineError::Evaluation { rule_id, reason } => {
                LogwardenError::Detection(DetectionError::Evaluation { rule_id, reason })
            }
            EngineError::Io(e) => LogwardenError::Io(e),
            other => LogwardenError::Detection(DetectionError::Rule(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_error_display() {
        let err = EngineError::Parse {
            format: "syslog".to_owned(),
            offset: 42,
            reason: "unexpected character".to_owned(),
        };
        let msg = err.to_string();
        assert!(msg.contains("syslog"));
        assert!(msg.contains("42"));
    }

    #[test]
    fn evaluation_error_converts_to_detection() {
        let err = EngineError::Evaluation {
            rule_id: "CORR-001".to_owned(),
            reason: "boom".to_owned(),
        };
        let top: LogwardenError = err.into();
        assert!(matches!(
            top,
            LogwardenError::Detection(DetectionError::Evaluation { .. })
        ));
    }

    #[test]
    fn duplicate_rule_converts_to_rule_error() {
        let top: LogwardenError = EngineError::DuplicateRule("RULE-001".to_owned()).into();
        assert!(top.to_string().contains("RULE-001"));
    }

    #[test]
    fn collector_error_converts() {
        let top: LogwardenError = EngineError::Collector {
            source_type: "file".to_owned(),
            reason: "permission denied".to_owned(),
        }
        .into();
        assert!(matches!(top, LogwardenError::Collector(_)));
    }
}
