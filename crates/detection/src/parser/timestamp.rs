//! 타임스탬프 정규화
//!
//! 파서가 추출한 다양한 형식의 타임스탬프를 RFC 3339 UTC 문자열로 변환합니다.
//!
//! 지원 형식:
//! - RFC 3339: `2024-01-15T12:00:00Z`, `2024-01-15T12:00:00+09:00`
//! - 타임존 없는 ISO 날짜/시각 (UTC로 간주): `2024-01-15 12:00:00`, `2024-01-15T12:00:00.123`
//! - BSD syslog (기준 시각의 연도, 하루 넘게 미래면 전년도): `Jan 15 12:00:00`
//! - Apache common log: `15/Jan/2024:12:00:00 +0000`
//! - Unix timestamp (초, 밀리초): `1705320000`, `1705320000000`

use chrono::{DateTime, Datelike, NaiveDateTime, SecondsFormat, TimeDelta, Utc};

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
];

/// 연도 없는 syslog 시각이 기준 시각보다 이만큼 넘게 앞서면 전년도로 봅니다.
const SYSLOG_FUTURE_SLACK: TimeDelta = TimeDelta::days(1);

/// 타임스탬프 문자열을 RFC 3339 UTC로 정규화합니다.
///
/// 인식할 수 없는 형식이면 `None`을 반환합니다.
pub fn normalize(text: &str) -> Option<String> {
    parse(text).map(|dt| dt.to_rfc3339_opts(SecondsFormat::AutoSi, true))
}

/// 타임스탬프 문자열을 UTC 시각으로 해석합니다.
pub fn parse(text: &str) -> Option<DateTime<Utc>> {
    parse_relative_to(text, Utc::now())
}

/// `now`를 기준으로 syslog 타임스탬프의 연도를 정하여 해석합니다.
pub fn parse_relative_to(text: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }

    if let Ok(dt) = DateTime::parse_from_str(text, "%d/%b/%Y:%H:%M:%S %z") {
        return Some(dt.with_timezone(&Utc));
    }

    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Some(naive.and_utc());
        }
    }

    if let Some(dt) = parse_bsd_syslog(text, now) {
        return Some(dt);
    }

    if let Ok(num) = text.parse::<i64>() {
        let secs = if num > 9_999_999_999 { num / 1000 } else { num };
        return DateTime::from_timestamp(secs, 0);
    }

    None
}

/// `Jan  5 12:00:00` 형식 (연도 없음)
///
/// 연말 로그를 새해에 읽으면 `now`의 연도로는 미래가 되므로 전년도를 씁니다.
fn parse_bsd_syslog(text: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    let in_year = |year: i32| {
        NaiveDateTime::parse_from_str(&format!("{year} {collapsed}"), "%Y %b %d %H:%M:%S")
            .ok()
            .map(|naive| naive.and_utc())
    };

    match in_year(now.year()) {
        Some(dt) if dt - now <= SYSLOG_FUTURE_SLACK => Some(dt),
        current => in_year(now.year() - 1).or(current),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap()
    }

    fn at(text: &str) -> Option<String> {
        parse_relative_to(text, now()).map(|dt| dt.to_rfc3339_opts(SecondsFormat::AutoSi, true))
    }

    #[test]
    fn rfc3339_with_offset_is_converted_to_utc() {
        assert_eq!(
            at("2024-01-15T21:00:00+09:00").as_deref(),
            Some("2024-01-15T12:00:00Z")
        );
    }

    #[test]
    fn naive_datetime_is_treated_as_utc() {
        assert_eq!(
            at("2024-01-15 12:00:00").as_deref(),
            Some("2024-01-15T12:00:00Z")
        );
        assert_eq!(
            at("2024-01-15T12:00:00.250").as_deref(),
            Some("2024-01-15T12:00:00.250Z")
        );
    }

    #[test]
    fn bsd_syslog_uses_reference_year() {
        assert_eq!(at("Jan  5 08:15:00").as_deref(), Some("2024-01-05T08:15:00Z"));
        assert_eq!(at("Mar 12 23:59:59").as_deref(), Some("2024-03-12T23:59:59Z"));
    }

    #[test]
    fn bsd_syslog_from_last_year_is_not_in_the_future() {
        let new_year = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 5).unwrap();
        let parsed = parse_relative_to("Dec 31 23:59:59", new_year).unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2024, 12, 31, 23, 59, 59).unwrap());
        assert!(parsed <= new_year);
    }

    #[test]
    fn bsd_syslog_tolerates_small_clock_skew() {
        let new_year = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 5).unwrap();
        let parsed = parse_relative_to("Jan  1 00:10:00", new_year).unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2025, 1, 1, 0, 10, 0).unwrap());
    }

    #[test]
    fn bsd_leap_day_falls_back_to_previous_leap_year() {
        let early_2025 = Utc.with_ymd_and_hms(2025, 1, 10, 0, 0, 0).unwrap();
        let parsed = parse_relative_to("Feb 29 10:00:00", early_2025).unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2024, 2, 29, 10, 0, 0).unwrap());
    }

    #[test]
    fn apache_common_log() {
        assert_eq!(
            at("10/Oct/2023:13:55:36 -0700").as_deref(),
            Some("2023-10-10T20:55:36Z")
        );
    }

    #[test]
    fn unix_seconds_and_millis() {
        assert_eq!(at("1705320000").as_deref(), Some("2024-01-15T12:00:00Z"));
        assert_eq!(at("1705320000000").as_deref(), Some("2024-01-15T12:00:00Z"));
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(at("").is_none());
        assert!(at("yesterday").is_none());
    }
}
