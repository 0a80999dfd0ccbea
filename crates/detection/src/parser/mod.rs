//! 로그 정규화 모듈 -- 형식별 파서와 라우터
//!
//! [`ParserRouter`]는 원시 레코드의 형식 힌트(또는 기본 형식)에 맞는 파서를
//! 선택합니다. 각 파서는 core의 [`LogParser`] trait을 구현합니다.
//!
//! # 지원 형식
//! - `default`, `syslog`, `apache` ([`PatternLogParser`])
//! - 구조화 JSON ([`JsonLogParser`])
//!
//! [`ParserRouter::normalize`]는 실패하지 않습니다. 파싱에 실패한 레코드는
//! 원문을 `raw.raw`에 담고 `parse_error`가 표시된 fallback 이벤트가 됩니다.

pub mod json;
pub mod pattern;
pub mod timestamp;

pub use json::{JsonFieldMapping, JsonLogParser};
pub use pattern::{PatternFormat, PatternLogParser};

use chrono::{SecondsFormat, Utc};
use logwarden_core::error::LogwardenError;
use logwarden_core::metrics as m;
use logwarden_core::pipeline::LogParser;
use logwarden_core::types::{Event, RawRecord};
use serde_json::Value;

use crate::error::EngineError;

/// fallback 이벤트에 기록되는 사유
pub const NO_PATTERN_MATCHED: &str = "no pattern matched";

/// 파서 라우터
pub struct ParserRouter {
    /// 등록된 파서 목록
    parsers: Vec<Box<dyn LogParser>>,
    /// 형식 힌트가 없을 때 사용할 형식
    default_format: String,
}

impl ParserRouter {
    /// 빈 라우터를 생성합니다.
    pub fn new(default_format: impl Into<String>) -> Self {
        Self {
            parsers: Vec::new(),
            default_format: default_format.into(),
        }
    }

    /// 내장 파서 전체가 등록된 라우터를 생성합니다.
    pub fn with_defaults(default_format: impl Into<String>) -> Self {
        Self::new(default_format)
            .register(Box::new(PatternLogParser::new(PatternFormat::Default)))
            .register(Box::new(PatternLogParser::new(PatternFormat::Syslog)))
            .register(Box::new(PatternLogParser::new(PatternFormat::Apache)))
            .register(Box::new(JsonLogParser::default()))
    }

    /// 파서를 등록합니다. 같은 형식 이름이 있으면 먼저 등록된 파서가 쓰입니다.
    pub fn register(mut self, parser: Box<dyn LogParser>) -> Self {
        self.parsers.push(parser);
        self
    }

    /// 특정 형식 이름의 파서로 직접 파싱합니다.
    pub fn parse_with(&self, format_name: &str, raw: &[u8]) -> Result<Event, LogwardenError> {
        self.parsers
            .iter()
            .find(|p| p.format_name() == format_name)
            .ok_or_else(|| EngineError::UnsupportedFormat(format_name.to_owned()))?
            .parse(raw)
    }

    /// 원시 레코드를 이벤트로 정규화합니다.
    ///
    /// 형식 힌트가 있으면 그 형식을, 없으면 기본 형식을 사용합니다.
    pub fn normalize(&self, record: &RawRecord) -> Event {
        let format = record
            .format_hint
            .as_deref()
            .unwrap_or(&self.default_format);

        let event = match self.parse_with(format, &record.data) {
            Ok(event) => event,
            Err(e) => {
                tracing::debug!(
                    source = %record.source,
                    format,
                    error = %e,
                    "record did not parse, using fallback event"
                );
                metrics::counter!(m::PARSE_FALLBACKS_TOTAL).increment(1);
                Self::fallback(&record.data)
            }
        };

        event.with_source(record.source.clone())
    }

    /// 등록된 파서 형식 이름 목록을 반환합니다.
    pub fn registered_formats(&self) -> Vec<&str> {
        self.parsers.iter().map(|p| p.format_name()).collect()
    }

    fn fallback(data: &[u8]) -> Event {
        let line = String::from_utf8_lossy(data);
        let line = line.trim_end_matches(['\r', '\n']);
        let mut event = Event::new(
            Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true),
            String::new(),
        );
        event
            .raw
            .insert("raw".to_owned(), Value::String(line.to_owned()));
        event.parse_error = Some(NO_PATTERN_MATCHED.to_owned());
        event
    }
}
