//! 파이프라인 trait -- 탐지 코어와 외부 협력자 사이의 경계
//!
//! 수집기, 파서, 저장소, 알림 발송기는 모두 이 trait 뒤에 숨습니다.
//! 데몬은 실제 구현을, 테스트는 mock 구현을 주입합니다.

use std::future::Future;

use chrono::{DateTime, Utc};

use crate::error::LogwardenError;
use crate::types::{Alert, Event, RawRecord};

/// 로그 수집기 trait
///
/// 호출될 때마다 마지막 위치 이후의 새 레코드를 반환합니다.
/// 블로킹 없이 즉시 반환해야 합니다.
pub trait Collector: Send {
    /// 수집기 이름 (저장소의 source 레이블로 사용)
    fn name(&self) -> &str;

    /// 새 레코드를 수집
    fn collect(&mut self) -> Result<Vec<RawRecord>, LogwardenError>;
}

/// 로그 파서 trait
///
/// 새로운 로그 형식을 지원하려면 이 trait을 구현합니다.
pub trait LogParser: Send + Sync {
    /// 지원하는 로그 형식 이름
    fn format_name(&self) -> &str;

    /// 원시 바이트를 이벤트로 파싱
    fn parse(&self, raw: &[u8]) -> Result<Event, LogwardenError>;
}

/// 이벤트/알림 저장소 trait
pub trait EventStore: Send + Sync + 'static {
    /// 수집기 단위로 정규화된 이벤트를 저장
    fn store_logs(
        &self,
        events: &[Event],
        source: &str,
    ) -> impl Future<Output = Result<(), LogwardenError>> + Send;

    /// 생성된 알림을 저장
    fn store_alerts(
        &self,
        alerts: &[Alert],
    ) -> impl Future<Output = Result<(), LogwardenError>> + Send;

    /// 보존 기간이 지난 레코드를 삭제하고 삭제 건수를 반환
    fn purge_older_than(
        &self,
        log_cutoff: DateTime<Utc>,
        alert_cutoff: DateTime<Utc>,
    ) -> impl Future<Output = Result<usize, LogwardenError>> + Send;
}

/// 알림 발송 trait
///
/// 전달 보장은 없습니다. 실패 시 `false`를 반환하고 호출자가 기록합니다.
pub trait Notifier: Send + Sync + 'static {
    /// 알림을 발송
    fn deliver(&self, alert: &Alert) -> impl Future<Output = bool> + Send;
}
