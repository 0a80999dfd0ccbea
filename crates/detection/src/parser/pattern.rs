//! 정규식 기반 텍스트 로그 파서
//!
//! 세 가지 한 줄 형식을 지원합니다.
//!
//! | 형식 | 구조 |
//! |------|------|
//! | `default` | `<timestamp> <level> <message>` |
//! | `syslog` | `Mon DD HH:MM:SS host app[pid]: message` |
//! | `apache` | `ip - - [timestamp] "request" status size` |
//!
//! `apache` 형식의 메시지는 요청 부분이 아닌 줄 전체이며, `ip`, `request`,
//! `status`, `size`는 `raw` 필드로 보관됩니다.
//!
//! 타임스탬프는 해석 가능하면 RFC 3339 UTC로 정규화되고, 그렇지 않으면
//! 원문 그대로 보관됩니다 (그런 이벤트는 상관 분석 버퍼에 들어가지 못합니다).

use std::sync::LazyLock;

use logwarden_core::error::LogwardenError;
use logwarden_core::pipeline::LogParser;
use logwarden_core::types::Event;
use regex::Regex;
use serde_json::Value;

use super::timestamp;
use crate::error::EngineError;

static DEFAULT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<timestamp>.*?) (?P<level>\w+) (?P<message>.*)")
        .expect("default log pattern is valid")
});

static SYSLOG_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?P<timestamp>\w+\s+\d+\s+\d+:\d+:\d+) (?P<hostname>\S+) (?P<application>\S+): (?P<message>.*)",
    )
    .expect("syslog pattern is valid")
});

static APACHE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"^(?P<ip>[\d.]+) - - \[(?P<timestamp>.*?)\] "(?P<request>.*?)" (?P<status>\d+) (?P<size>\d+)"#,
    )
    .expect("apache pattern is valid")
});

static APP_PID_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<name>[^\[]+)\[(?P<pid>\d+)\]$").expect("app pid pattern is valid")
});

/// 텍스트 로그 형식
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternFormat {
    /// `<timestamp> <level> <message>`
    Default,
    /// BSD syslog
    Syslog,
    /// Apache common log
    Apache,
}

impl PatternFormat {
    /// 형식 이름
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Syslog => "syslog",
            Self::Apache => "apache",
        }
    }

    /// 이름에서 형식을 찾습니다.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "default" => Some(Self::Default),
            "syslog" => Some(Self::Syslog),
            "apache" => Some(Self::Apache),
            _ => None,
        }
    }

    fn regex(self) -> &'static Regex {
        match self {
            Self::Default => &DEFAULT_RE,
            Self::Syslog => &SYSLOG_RE,
            Self::Apache => &APACHE_RE,
        }
    }
}

/// 정규식 기반 텍스트 로그 파서
#[derive(Debug, Clone)]
pub struct PatternLogParser {
    format: PatternFormat,
    max_line_length: usize,
}

impl PatternLogParser {
    /// 새 파서를 생성합니다.
    pub fn new(format: PatternFormat) -> Self {
        Self {
            format,
            max_line_length: 64 * 1024,
        }
    }

    /// 최대 줄 길이를 설정합니다.
    pub fn with_max_line_length(mut self, max: usize) -> Self {
        self.max_line_length = max;
        self
    }

    /// 파서 형식
    pub fn format(&self) -> PatternFormat {
        self.format
    }

    fn parse_line(&self, line: &str) -> Result<Event, EngineError> {
        if line.len() > self.max_line_length {
            return Err(EngineError::Parse {
                format: self.format.as_str().to_owned(),
                offset: 0,
                reason: format!(
                    "line too long: {} bytes (max: {})",
                    line.len(),
                    self.max_line_length
                ),
            });
        }

        let caps = self
            .format
            .regex()
            .captures(line)
            .ok_or_else(|| EngineError::Parse {
                format: self.format.as_str().to_owned(),
                offset: 0,
                reason: "no pattern matched".to_owned(),
            })?;
        let group = |name: &str| caps.name(name).map_or("", |m| m.as_str());

        let raw_ts = group("timestamp");
        let timestamp = timestamp::normalize(raw_ts).unwrap_or_else(|| raw_ts.to_owned());

        let event = match self.format {
            PatternFormat::Default => {
                Event::new(timestamp, group("message")).with_level(group("level"))
            }
            PatternFormat::Syslog => {
                let application = group("application");
                let mut event = Event::new(timestamp, group("message"))
                    .with_host(group("hostname"));
                match APP_PID_RE.captures(application) {
                    Some(app) => {
                        event.process = app["name"].to_owned();
                        event
                            .raw
                            .insert("pid".to_owned(), Value::String(app["pid"].to_owned()));
                    }
                    None => event.process = application.to_owned(),
                }
                event
            }
            PatternFormat::Apache => {
                // 메시지에 클라이언트 IP가 남아 있어야 위협 인텔리전스 태깅이 가능합니다.
                let mut event = Event::new(timestamp, line.trim_end());
                for key in ["ip", "request", "status", "size"] {
                    event
                        .raw
                        .insert(key.to_owned(), Value::String(group(key).to_owned()));
                }
                event
            }
        };

        Ok(event)
    }
}

impl LogParser for PatternLogParser {
    fn format_name(&self) -> &str {
        self.format.as_str()
    }

    fn parse(&self, raw: &[u8]) -> Result<Event, LogwardenError> {
        let line = String::from_utf8_lossy(raw);
        let line = line.trim_end_matches(['\r', '\n']);
        self.parse_line(line).map_err(LogwardenError::from)
    }
}
