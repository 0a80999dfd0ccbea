//! JSON 로그 파서
//!
//! 구조화된 JSON 형식의 로그를 파싱합니다. 필드 이름 매핑을 통해
//! 다양한 JSON 로그 형식을 지원하며, 매핑되지 않은 필드는 `raw`에 보관됩니다.
//!
//! # 사용 예시
//! ```ignore
//! use logwarden_detection::parser::JsonLogParser;
//! use logwarden_core::pipeline::LogParser;
//!
//! let parser = JsonLogParser::default();
//! let raw = br#"{"timestamp":"2024-01-15T12:00:00Z","host":"web-01","message":"sudo su"}"#;
//! let event = parser.parse(raw)?;
//! assert_eq!(event.host, "web-01");
//! ```

use logwarden_core::error::LogwardenError;
use logwarden_core::pipeline::LogParser;
use logwarden_core::types::Event;
use serde_json::{Map, Value};

use super::timestamp;
use crate::error::EngineError;

/// JSON 로그 필드 매핑 설정
#[derive(Debug, Clone)]
pub struct JsonFieldMapping {
    /// 타임스탬프 필드명 (기본: "timestamp")
    pub timestamp_field: String,
    /// 호스트명 필드명 (기본: "host")
    pub host_field: String,
    /// 프로세스명 필드명 (기본: "process")
    pub process_field: String,
    /// 메시지 필드명 (기본: "message")
    pub message_field: String,
    /// 레벨 필드명 (기본: "level")
    pub level_field: String,
}

impl Default for JsonFieldMapping {
    fn default() -> Self {
        Self {
            timestamp_field: "timestamp".to_owned(),
            host_field: "host".to_owned(),
            process_field: "process".to_owned(),
            message_field: "message".to_owned(),
            level_field: "level".to_owned(),
        }
    }
}

/// JSON 로그 파서
pub struct JsonLogParser {
    mapping: JsonFieldMapping,
    /// 최대 허용 입력 크기 (바이트)
    max_input_size: usize,
}

impl JsonLogParser {
    /// 커스텀 필드 매핑으로 새 파서를 생성합니다.
    pub fn new(mapping: JsonFieldMapping) -> Self {
        Self {
            mapping,
            max_input_size: 1024 * 1024, // 1MB
        }
    }

    /// 최대 입력 크기를 설정합니다.
    pub fn with_max_input_size(mut self, size: usize) -> Self {
        self.max_input_size = size;
        self
    }

    /// dot notation 경로로 스칼라 값을 문자열로 추출합니다 (예: "metadata.host").
    fn extract_string(value: &Value, field: &str) -> Option<String> {
        let mut current = value;
        for part in field.split('.') {
            current = current.get(part)?;
        }

        match current {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    fn error(offset: usize, reason: impl Into<String>) -> EngineError {
        EngineError::Parse {
            format: "json".to_owned(),
            offset,
            reason: reason.into(),
        }
    }

    fn parse_json(&self, raw: &[u8]) -> Result<Event, EngineError> {
        if raw.len() > self.max_input_size {
            return Err(Self::error(
                0,
                format!(
                    "input too large: {} bytes (max: {})",
                    raw.len(),
                    self.max_input_size
                ),
            ));
        }

        let value: Value =
            serde_json::from_slice(raw).map_err(|e| Self::error(e.column(), e.to_string()))?;

        let Value::Object(object) = &value else {
            return Err(Self::error(0, "expected JSON object at top level"));
        };

        // 타임스탬프가 없으면 빈 문자열로 두어 버퍼에서 걸러지게 합니다.
        let timestamp = Self::extract_string(&value, &self.mapping.timestamp_field)
            .map(|ts| timestamp::normalize(&ts).unwrap_or(ts))
            .unwrap_or_default();

        let field = |name: &str| Self::extract_string(&value, name).unwrap_or_default();

        let mut event = Event::new(timestamp, field(&self.mapping.message_field))
            .with_host(field(&self.mapping.host_field))
            .with_process(field(&self.mapping.process_field))
            .with_level(field(&self.mapping.level_field));

        let known = [
            &self.mapping.timestamp_field,
            &self.mapping.host_field,
            &self.mapping.process_field,
            &self.mapping.message_field,
            &self.mapping.level_field,
        ];
        event.raw = object
            .iter()
            .filter(|(key, _)| !known.contains(key))
            .filter(|(_, val)| !val.is_null())
            .map(|(key, val)| (key.clone(), val.clone()))
            .collect::<Map<String, Value>>();

        Ok(event)
    }
}

impl Default for JsonLogParser {
    fn default() -> Self {
        Self::new(JsonFieldMapping::default())
    }
}

impl LogParser for JsonLogParser {
    fn format_name(&self) -> &str {
        "json"
    }

    fn parse(&self, raw: &[u8]) -> Result<Event, LogwardenError> {
        self.parse_json(raw).map_err(LogwardenError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_basic_json() {
        let parser = JsonLogParser::default();
        let raw = br#"{"timestamp":"2024-05-01T12:00:00Z","host":"web-01","process":"sshd","message":"sudo su","level":"warn"}"#;
        let event = parser.parse(raw).unwrap();
        assert_eq!(event.timestamp, "2024-05-01T12:00:00Z");
        assert_eq!(event.host, "web-01");
        assert_eq!(event.process, "sshd");
        assert_eq!(event.message, "sudo su");
        assert_eq!(event.level, "warn");
        assert!(event.raw.is_empty());
    }

    #[test]
    fn extra_fields_are_kept_in_raw() {
        let parser = JsonLogParser::default();
        let raw = br#"{"message":"x","user":"root","status":200,"gone":null}"#;
        let event = parser.parse(raw).unwrap();
        assert_eq!(event.raw["user"], "root");
        assert_eq!(event.raw["status"], 200);
        assert!(!event.raw.contains_key("gone"));
    }

    #[test]
    fn unix_timestamp_is_normalized() {
        let parser = JsonLogParser::default();
        let event = parser.parse(br#"{"timestamp":1705320000,"message":"x"}"#).unwrap();
        assert_eq!(event.timestamp, "2024-01-15T12:00:00Z");
    }

    #[test]
    fn missing_timestamp_leaves_event_unbufferable() {
        let parser = JsonLogParser::default();
        let event = parser.parse(br#"{"message":"x"}"#).unwrap();
        assert!(event.instant().is_none());
    }

    #[test]
    fn custom_field_mapping() {
        let mapping = JsonFieldMapping {
            host_field: "server".to_owned(),
            message_field: "msg".to_owned(),
            ..Default::default()
        };
        let parser = JsonLogParser::new(mapping);
        let event = parser.parse(br#"{"server":"db-01","msg":"query slow"}"#).unwrap();
        assert_eq!(event.host, "db-01");
        assert_eq!(event.message, "query slow");
    }

    #[test]
    fn extract_nested_field() {
        let value: Value =
            serde_json::from_str(r#"{"metadata":{"host":"nested-host"},"message":"test"}"#)
                .unwrap();
        let result = JsonLogParser::extract_string(&value, "metadata.host");
        assert_eq!(result.as_deref(), Some("nested-host"));
    }

    #[test]
    fn invalid_inputs_fail() {
        let parser = JsonLogParser::default();
        assert!(parser.parse(b"not json at all").is_err());
        assert!(parser.parse(br#"["not","an","object"]"#).is_err());
        let small = JsonLogParser::default().with_max_input_size(10);
        assert!(small.parse(br#"{"message":"too long for the limit"}"#).is_err());
    }
}
