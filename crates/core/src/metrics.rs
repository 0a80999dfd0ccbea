//! 메트릭 상수 및 설명 등록
//!
//! 모든 Prometheus 메트릭의 이름과 설명을 중앙에서 정의합니다.
//! 각 크레이트는 이 상수를 사용하여 `metrics::counter!()`, `metrics::gauge!()`
//! 매크로를 호출합니다. recorder가 설치되지 않았으면 호출은 아무 일도 하지 않습니다.
//!
//! # 네이밍 컨벤션
//!
//! - 접두어: `logwarden_`
//! - 접미어: `_total` (counter), 없음 (gauge)

// ─── 레이블 키 상수 ────────────────────────────────────────────────

/// 심각도 레이블 키 (low, medium, high, critical)
pub const LABEL_SEVERITY: &str = "severity";

/// 규칙 ID 레이블 키
pub const LABEL_RULE_ID: &str = "rule_id";

/// 수집기 레이블 키
pub const LABEL_COLLECTOR: &str = "collector";

/// 차단 목록 이름 레이블 키
pub const LABEL_BLOCKLIST: &str = "blocklist";

/// 결과 레이블 키 (success, failure)
pub const LABEL_RESULT: &str = "result";

// ─── 수집/정규화 ────────────────────────────────────────────────────

/// 수집된 원시 레코드 수 (counter, label: collector)
pub const RECORDS_COLLECTED_TOTAL: &str = "logwarden_records_collected_total";

/// 정규화 fallback 수 (counter)
pub const PARSE_FALLBACKS_TOTAL: &str = "logwarden_parse_fallbacks_total";

// ─── 탐지 엔진 ──────────────────────────────────────────────────────

/// 버퍼에 들어간 이벤트 수 (counter)
pub const EVENTS_INGESTED_TOTAL: &str = "logwarden_events_ingested_total";

/// 타임스탬프 오류 또는 용량 초과로 버려진 이벤트 수 (counter)
pub const EVENTS_DROPPED_TOTAL: &str = "logwarden_events_dropped_total";

/// 현재 버퍼 크기 (gauge)
pub const BUFFER_SIZE: &str = "logwarden_buffer_size";

/// 생성된 알림 수 (counter, label: rule_id, severity)
pub const ALERTS_GENERATED_TOTAL: &str = "logwarden_alerts_generated_total";

/// 규칙 평가 실패 수 (counter, label: rule_id)
pub const RULE_FAILURES_TOTAL: &str = "logwarden_rule_failures_total";

// ─── 위협 인텔리전스 ────────────────────────────────────────────────

/// IP 조회 수 (counter)
pub const THREAT_INTEL_LOOKUPS_TOTAL: &str = "logwarden_threat_intel_lookups_total";

/// 캐시 적중 수 (counter)
pub const THREAT_INTEL_CACHE_HITS_TOTAL: &str = "logwarden_threat_intel_cache_hits_total";

/// 차단 목록 갱신 실패 수 (counter, label: blocklist)
pub const BLOCKLIST_REFRESH_FAILURES_TOTAL: &str = "logwarden_blocklist_refresh_failures_total";

// ─── 데몬 ────────────────────────────────────────────────────────────

/// 발송된 알림 수 (counter, label: result)
pub const ALERTS_DISPATCHED_TOTAL: &str = "logwarden_alerts_dispatched_total";

/// 완료된 처리 주기 수 (counter)
pub const CYCLES_COMPLETED_TOTAL: &str = "logwarden_cycles_completed_total";

/// 빌드 정보 (gauge, 항상 1, label: version)
pub const DAEMON_BUILD_INFO: &str = "logwarden_build_info";

/// 모든 메트릭의 설명을 등록합니다.
///
/// recorder 설치 직후 한 번 호출합니다.
pub fn describe_all() {
    use metrics::{describe_counter, describe_gauge};

    describe_counter!(
        RECORDS_COLLECTED_TOTAL,
        "Raw records read from collectors"
    );
    describe_counter!(
        PARSE_FALLBACKS_TOTAL,
        "Records that matched no parser and were kept as fallback events"
    );
    describe_counter!(
        EVENTS_INGESTED_TOTAL,
        "Events accepted into the correlation buffer"
    );
    describe_counter!(
        EVENTS_DROPPED_TOTAL,
        "Events dropped for malformed timestamps or buffer capacity"
    );
    describe_gauge!(BUFFER_SIZE, "Events currently held in the correlation buffer");
    describe_counter!(ALERTS_GENERATED_TOTAL, "Alerts generated per rule");
    describe_counter!(
        RULE_FAILURES_TOTAL,
        "Correlation rule evaluations that failed or panicked"
    );
    describe_counter!(THREAT_INTEL_LOOKUPS_TOTAL, "IP reputation lookups");
    describe_counter!(
        THREAT_INTEL_CACHE_HITS_TOTAL,
        "IP reputation lookups served from cache"
    );
    describe_counter!(
        BLOCKLIST_REFRESH_FAILURES_TOTAL,
        "Blocklist downloads that failed"
    );
    describe_counter!(ALERTS_DISPATCHED_TOTAL, "Alert notifications attempted");
    describe_counter!(CYCLES_COMPLETED_TOTAL, "Completed orchestration cycles");
    describe_gauge!(DAEMON_BUILD_INFO, "Build information, always 1");
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_METRIC_NAMES: &[&str] = &[
        RECORDS_COLLECTED_TOTAL,
        PARSE_FALLBACKS_TOTAL,
        EVENTS_INGESTED_TOTAL,
        EVENTS_DROPPED_TOTAL,
        BUFFER_SIZE,
        ALERTS_GENERATED_TOTAL,
        RULE_FAILURES_TOTAL,
        THREAT_INTEL_LOOKUPS_TOTAL,
        THREAT_INTEL_CACHE_HITS_TOTAL,
        BLOCKLIST_REFRESH_FAILURES_TOTAL,
        ALERTS_DISPATCHED_TOTAL,
        CYCLES_COMPLETED_TOTAL,
        DAEMON_BUILD_INFO,
    ];

    #[test]
    fn all_metrics_start_with_prefix() {
        for name in ALL_METRIC_NAMES {
            assert!(name.starts_with("logwarden_"), "{name} missing prefix");
        }
    }

    #[test]
    fn metric_names_are_unique() {
        let mut names = ALL_METRIC_NAMES.to_vec();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), ALL_METRIC_NAMES.len());
    }

    #[test]
    fn describe_all_does_not_panic() {
        describe_all();
    }
}
