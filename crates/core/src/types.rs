//! 도메인 타입 -- 시스템 전역에서 사용되는 공통 타입
//!
//! 수집기, 정규화기, 탐지 엔진, 위협 인텔리전스, 저장소가 모두 이 타입들로
//! 데이터를 주고받습니다.

use std::fmt;
use std::time::SystemTime;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// 정규화된 로그 이벤트
///
/// 정규화기가 생성하고, 위협 인텔리전스 태깅(`annotate`)으로 한 번 수정된 뒤에는
/// 변경되지 않습니다.
///
/// `timestamp`는 정규화기가 만든 원문 그대로 보관합니다. 버퍼와 상관 분석은
/// [`Event::instant`]로 해석한 시각을 사용하며, 해석할 수 없는 이벤트는 버퍼에
/// 들어가지 못합니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// RFC 3339 타임스탬프 (타임존 포함, `Z`는 UTC)
    pub timestamp: String,
    /// 수집 소스 (파일 경로, syslog 등)
    #[serde(default)]
    pub source: String,
    /// 로그 레벨
    #[serde(default)]
    pub level: String,
    /// 호스트명
    #[serde(default)]
    pub host: String,
    /// 프로세스명
    #[serde(default)]
    pub process: String,
    /// 로그 메시지
    #[serde(default)]
    pub message: String,
    /// 원본 페이로드의 나머지 필드
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub raw: Map<String, Value>,
    /// 정규화 실패 표시 (fallback 이벤트에만 존재)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parse_error: Option<String>,
    /// 위협 인텔리전스 조회 결과
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threat_intel: Option<ThreatIntelResult>,
}

impl Event {
    /// 타임스탬프와 메시지로 이벤트를 생성합니다.
    pub fn new(timestamp: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            timestamp: timestamp.into(),
            source: String::new(),
            level: String::new(),
            host: String::new(),
            process: String::new(),
            message: message.into(),
            raw: Map::new(),
            parse_error: None,
            threat_intel: None,
        }
    }

    /// 주어진 시각으로 이벤트를 생성합니다.
    pub fn at(instant: DateTime<Utc>, message: impl Into<String>) -> Self {
        Self::new(instant.to_rfc3339(), message)
    }

    /// 수집 소스를 설정합니다.
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    /// 로그 레벨을 설정합니다.
    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.level = level.into();
        self
    }

    /// 호스트명을 설정합니다.
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// 프로세스명을 설정합니다.
    pub fn with_process(mut self, process: impl Into<String>) -> Self {
        self.process = process.into();
        self
    }

    /// 타임스탬프를 UTC 시각으로 해석합니다.
    ///
    /// 타임존 정보가 없거나 형식이 잘못된 경우 `None`을 반환합니다.
    pub fn instant(&self) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(self.timestamp.trim())
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
    }

    /// 위협 인텔리전스 결과를 붙입니다.
    pub fn annotate(&mut self, intel: ThreatIntelResult) {
        self.threat_intel = Some(intel);
    }

    /// 정규화 fallback으로 생성된 이벤트인지 확인합니다.
    pub fn is_fallback(&self) -> bool {
        self.parse_error.is_some()
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {}: {}",
            self.timestamp, self.host, self.process, self.message,
        )
    }
}

/// 보안 알림
///
/// 이상 탐지기 또는 상관 엔진이 규칙 매칭 결과로 생성합니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    /// 알림 ID (UUID v4)
    pub id: String,
    /// 규칙 ID
    pub rule_id: String,
    /// 규칙 이름
    pub rule_name: String,
    /// 심각도
    pub severity: Severity,
    /// 사람이 읽을 수 있는 요약
    pub message: String,
    /// 상관 키 (brute force의 경우 출발지 IP)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation_key: Option<String>,
    /// 근거 이벤트
    #[serde(default)]
    pub matches: Vec<Event>,
    /// 근거 이벤트 수
    pub count: usize,
    /// 생성 시각
    pub generated_at: DateTime<Utc>,
}

impl Alert {
    /// 근거 이벤트가 없는 알림을 생성합니다.
    pub fn new(
        rule_id: impl Into<String>,
        rule_name: impl Into<String>,
        severity: Severity,
        message: impl Into<String>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            rule_id: rule_id.into(),
            rule_name: rule_name.into(),
            severity,
            message: message.into(),
            correlation_key: None,
            matches: Vec::new(),
            count: 0,
            generated_at: Utc::now(),
        }
    }

    /// 근거 이벤트를 설정합니다. `count`도 함께 갱신됩니다.
    pub fn with_matches(mut self, matches: Vec<Event>) -> Self {
        self.count = matches.len();
        self.matches = matches;
        self
    }

    /// 상관 키를 설정합니다.
    pub fn with_correlation_key(mut self, key: impl Into<String>) -> Self {
        self.correlation_key = Some(key.into());
        self
    }

    /// 생성 시각을 설정합니다.
    pub fn generated_at(mut self, at: DateTime<Utc>) -> Self {
        self.generated_at = at;
        self
    }
}

impl fmt::Display for Alert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} (rule: {}, count: {})",
            self.severity, self.message, self.rule_id, self.count,
        )
    }
}

/// 심각도 레벨
///
/// `Ord` 구현으로 심각도 비교가 가능합니다 (`Low < Medium < High < Critical`).
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// 낮은 심각도
    #[default]
    Low,
    /// 중간 심각도
    Medium,
    /// 높은 심각도
    High,
    /// 치명적 -- 즉시 대응 필요
    Critical,
}

impl Severity {
    /// 문자열에서 심각도를 파싱합니다.
    ///
    /// 대소문자를 구분하지 않습니다.
    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "low" => Some(Self::Low),
            "medium" | "med" => Some(Self::Medium),
            "high" => Some(Self::High),
            "critical" | "crit" => Some(Self::Critical),
            _ => None,
        }
    }

    /// 소문자 이름
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// IP 평판 조회 결과
///
/// 캐시에 저장된 결과는 캐시 전체가 만료될 때까지 그대로 재사용됩니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreatIntelResult {
    /// 조회한 IP
    pub ip: String,
    /// `score > 50`
    pub is_malicious: bool,
    /// 매칭된 차단 목록 점수 합계
    pub score: u32,
    /// 매칭된 차단 목록 카테고리
    #[serde(default)]
    pub matches: Vec<String>,
    /// 출처 레이블
    pub source: String,
    /// 조회 시각
    pub cached_at: DateTime<Utc>,
}

impl fmt::Display for ThreatIntelResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} score={} malicious={} [{}]",
            self.ip,
            self.score,
            self.is_malicious,
            self.matches.join(","),
        )
    }
}

/// 수집기가 읽어 온 원시 레코드
#[derive(Debug, Clone)]
pub struct RawRecord {
    /// 원시 바이트 (한 줄 또는 한 데이터그램)
    pub data: Bytes,
    /// 수집 소스 식별자
    pub source: String,
    /// 수신 시각
    pub received_at: SystemTime,
    /// 형식 힌트 (json, syslog, apache, default)
    pub format_hint: Option<String>,
}

impl RawRecord {
    /// 새 레코드를 생성합니다.
    pub fn new(data: impl Into<Bytes>, source: impl Into<String>) -> Self {
        Self {
            data: data.into(),
            source: source.into(),
            received_at: SystemTime::now(),
            format_hint: None,
        }
    }

    /// 형식 힌트를 설정합니다.
    pub fn with_format_hint(mut self, hint: impl Into<String>) -> Self {
        self.format_hint = Some(hint.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_instant_accepts_z_suffix() {
        let event = Event::new("2024-05-01T12:00:00Z", "hello");
        let instant = event.instant().unwrap();
        assert_eq!(instant.to_rfc3339(), "2024-05-01T12:00:00+00:00");
    }

    #[test]
    fn event_instant_converts_offset_to_utc() {
        let event = Event::new("2024-05-01T21:00:00+09:00", "hello");
        let instant = event.instant().unwrap();
        assert_eq!(instant.to_rfc3339(), "2024-05-01T12:00:00+00:00");
    }

    #[test]
    fn event_instant_rejects_naive_and_garbage() {
        assert!(Event::new("2024-05-01T12:00:00", "x").instant().is_none());
        assert!(Event::new("yesterday", "x").instant().is_none());
        assert!(Event::new("", "x").instant().is_none());
    }

    #[test]
    fn event_serialization_skips_empty_optionals() {
        let event = Event::new("2024-05-01T12:00:00Z", "hello").with_host("web-1");
        let json = serde_json::to_value(&event).unwrap();
        assert!(json.get("raw").is_none());
        assert!(json.get("parse_error").is_none());
        assert!(json.get("threat_intel").is_none());
        assert_eq!(json["host"], "web-1");
    }

    #[test]
    fn annotate_attaches_intel() {
        let mut event = Event::new("2024-05-01T12:00:00Z", "from 10.0.0.1");
        event.annotate(ThreatIntelResult {
            ip: "10.0.0.1".to_owned(),
            is_malicious: false,
            score: 0,
            matches: Vec::new(),
            source: "local_blocklists".to_owned(),
            cached_at: Utc::now(),
        });
        assert_eq!(event.threat_intel.as_ref().unwrap().ip, "10.0.0.1");
    }

    #[test]
    fn alert_with_matches_sets_count() {
        let events = vec![
            Event::new("2024-05-01T12:00:00Z", "a"),
            Event::new("2024-05-01T12:00:01Z", "b"),
        ];
        let alert = Alert::new("RULE-001", "privilege_escalation", Severity::High, "m")
            .with_matches(events)
            .with_correlation_key("10.0.0.1");
        assert_eq!(alert.count, 2);
        assert_eq!(alert.correlation_key.as_deref(), Some("10.0.0.1"));
        assert!(!alert.id.is_empty());
    }

    #[test]
    fn severity_ordering() {
        assert!(Severity::Low < Severity::Medium);
        assert!(Severity::Medium < Severity::High);
        assert!(Severity::High < Severity::Critical);
    }

    #[test]
    fn severity_from_str_loose() {
        assert_eq!(Severity::from_str_loose("HIGH"), Some(Severity::High));
        assert_eq!(Severity::from_str_loose(" crit "), Some(Severity::Critical));
        assert_eq!(Severity::from_str_loose("unknown"), None);
    }

    #[test]
    fn severity_serializes_lowercase() {
        let json = serde_json::to_string(&Severity::Critical).unwrap();
        assert_eq!(json, "\"critical\"");
        let parsed: Severity = serde_json::from_str("\"medium\"").unwrap();
        assert_eq!(parsed, Severity::Medium);
    }

    #[test]
    fn raw_record_format_hint() {
        let record = RawRecord::new("line", "/var/log/auth.log").with_format_hint("syslog");
        assert_eq!(record.format_hint.as_deref(), Some("syslog"));
        assert_eq!(&record.data[..], b"line");
    }
}
