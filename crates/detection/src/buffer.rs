//! 이벤트 버퍼 -- 타임스탬프 순서의 시간 창 버퍼
//!
//! [`EventBuffer`]는 상관 분석을 위해 최근 이벤트를 타임스탬프 순으로 보관합니다.
//!
//! # 불변 조건
//! - 이벤트는 항상 타임스탬프 오름차순이며, 같은 타임스탬프는 도착 순서를 유지합니다.
//! - [`EventBuffer::prune`] 이후 `now - retention`보다 오래된 이벤트는 남지 않습니다.
//! - 타임스탬프를 해석할 수 없는 이벤트는 들어오지 못합니다.
//!
//! # 오버플로우 정책
//! 버퍼가 가득 찬 경우:
//! - [`DropPolicy::Oldest`](crate::config::DropPolicy::Oldest): 가장 오래된 이벤트를 드롭
//! - [`DropPolicy::Newest`](crate::config::DropPolicy::Newest): 새 유입을 거부

use std::collections::VecDeque;

use chrono::{DateTime, TimeDelta, Utc};
use logwarden_core::types::Event;

use crate::config::DropPolicy;

/// 해석된 시각과 함께 보관되는 이벤트
#[derive(Debug, Clone)]
struct BufferedEvent {
    at: DateTime<Utc>,
    event: Event,
}

/// 이벤트 추가 결과
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    /// 버퍼에 추가됨
    Accepted,
    /// 버퍼에 추가되었고 가장 오래된 이벤트가 드롭됨
    AcceptedWithEviction,
    /// 타임스탬프를 해석할 수 없어 거부됨
    Malformed,
    /// 버퍼가 가득 차 거부됨
    Rejected,
}

impl PushOutcome {
    /// 이벤트가 버퍼에 들어갔는지 여부
    pub fn is_accepted(self) -> bool {
        matches!(self, Self::Accepted | Self::AcceptedWithEviction)
    }
}

/// 타임스탬프 순서의 인메모리 이벤트 버퍼
pub struct EventBuffer {
    /// 타임스탬프 오름차순 저장소
    events: VecDeque<BufferedEvent>,
    /// 전역 보존 기간
    retention: TimeDelta,
    /// 최대 용량
    capacity: usize,
    /// 드롭 정책
    drop_policy: DropPolicy,
    /// 용량 초과로 드롭된 이벤트 수
    dropped_count: u64,
    /// 타임스탬프 오류로 거부된 이벤트 수
    malformed_count: u64,
    /// 총 유입 이벤트 수
    total_received: u64,
}

impl EventBuffer {
    /// 새 이벤트 버퍼를 생성합니다.
    pub fn new(retention: TimeDelta, capacity: usize, drop_policy: DropPolicy) -> Self {
        Self {
            events: VecDeque::with_capacity(capacity.min(10_000)),
            retention,
            capacity,
            drop_policy,
            dropped_count: 0,
            malformed_count: 0,
            total_received: 0,
        }
    }

    /// 이벤트를 타임스탬프 위치에 삽입합니다.
    ///
    /// 같은 타임스탬프를 가진 이벤트 뒤에 들어가므로 도착 순서가 유지됩니다.
    pub fn push(&mut self, event: Event) -> PushOutcome {
        self.total_received += 1;

        let Some(at) = event.instant() else {
            self.malformed_count += 1;
            tracing::debug!(
                timestamp = %event.timestamp,
                source = %event.source,
                "dropping event with malformed timestamp"
            );
            return PushOutcome::Malformed;
        };

        let mut evicted = false;
        if self.events.len() >= self.capacity {
            match self.drop_policy {
                DropPolicy::Oldest => {
                    self.events.pop_front();
                    self.dropped_count += 1;
                    evicted = true;
                    tracing::warn!(
                        dropped = self.dropped_count,
                        capacity = self.capacity,
                        "event buffer full, dropped oldest event"
                    );
                }
                DropPolicy::Newest => {
                    self.dropped_count += 1;
                    tracing::warn!(
                        dropped = self.dropped_count,
                        capacity = self.capacity,
                        "event buffer full, rejected new event"
                    );
                    return PushOutcome::Rejected;
                }
            }
        }

        // 대부분의 이벤트는 시간 순으로 도착하므로 뒤쪽 삽입이 일반적입니다.
        let pos = self.events.partition_point(|e| e.at <= at);
        self.events.insert(pos, BufferedEvent { at, event });

        if evicted {
            PushOutcome::AcceptedWithEviction
        } else {
            PushOutcome::Accepted
        }
    }

    /// `now - retention`보다 오래된 이벤트를 제거하고 제거된 수를 반환합니다.
    pub fn prune(&mut self, now: DateTime<Utc>) -> usize {
        let cutoff = now - self.retention;
        let mut removed = 0;
        while self.events.front().is_some_and(|e| e.at < cutoff) {
            self.events.pop_front();
            removed += 1;
        }
        removed
    }

    /// `start` 이상의 타임스탬프를 가진 이벤트를 시간 순으로 반환합니다.
    pub fn window(&self, start: DateTime<Utc>) -> Vec<&Event> {
        let idx = self.events.partition_point(|e| e.at < start);
        self.events.range(idx..).map(|e| &e.event).collect()
    }

    /// 모든 이벤트를 시간 순으로 순회합니다.
    pub fn iter(&self) -> impl Iterator<Item = &Event> {
        self.events.iter().map(|e| &e.event)
    }

    /// 가장 오래된 이벤트의 시각
    pub fn oldest(&self) -> Option<DateTime<Utc>> {
        self.events.front().map(|e| e.at)
    }

    /// 가장 최근 이벤트의 시각
    pub fn newest(&self) -> Option<DateTime<Utc>> {
        self.events.back().map(|e| e.at)
    }

    /// 현재 버퍼에 저장된 이벤트 수를 반환합니다.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// 버퍼가 비어있는지 확인합니다.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// 버퍼 최대 용량을 반환합니다.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// 보존 기간을 반환합니다.
    pub fn retention(&self) -> TimeDelta {
        self.retention
    }

    /// 용량 초과로 드롭된 이벤트 수를 반환합니다.
    pub fn dropped_count(&self) -> u64 {
        self.dropped_count
    }

    /// 타임스탬프 오류로 거부된 이벤트 수를 반환합니다.
    pub fn malformed_count(&self) -> u64 {
        self.malformed_count
    }

    /// 총 유입 이벤트 수를 반환합니다.
    pub fn total_received(&self) -> u64 {
        self.total_received
    }

    /// 버퍼 사용률을 0.0~1.0 범위로 반환합니다.
    pub fn utilization(&self) -> f64 {
        if self.capacity == 0 {
            return 0.0;
        }
        f64::from(u32::try_from(self.events.len()).unwrap_or(u32::MAX))
            / f64::from(u32::try_from(self.capacity).unwrap_or(u32::MAX))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn base() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    fn event_at(offset_secs: i64, msg: &str) -> Event {
        Event::at(base() + TimeDelta::seconds(offset_secs), msg)
    }

    fn buffer(capacity: usize, policy: DropPolicy) -> EventBuffer {
        EventBuffer::new(TimeDelta::minutes(60), capacity, policy)
    }

    fn messages(buf: &EventBuffer) -> Vec<&str> {
        buf.iter().map(|e| e.message.as_str()).collect()
    }

    #[test]
    fn out_of_order_events_are_sorted() {
        let mut buf = buffer(100, DropPolicy::Oldest);
        buf.push(event_at(30, "c"));
        buf.push(event_at(10, "a"));
        buf.push(event_at(20, "b"));
        assert_eq!(messages(&buf), vec!["a", "b", "c"]);
    }

    #[test]
    fn equal_timestamps_keep_arrival_order() {
        let mut buf = buffer(100, DropPolicy::Oldest);
        buf.push(event_at(10, "first"));
        buf.push(event_at(20, "later"));
        buf.push(event_at(10, "second"));
        assert_eq!(messages(&buf), vec!["first", "second", "later"]);
    }

    #[test]
    fn malformed_timestamp_is_rejected() {
        let mut buf = buffer(100, DropPolicy::Oldest);
        let outcome = buf.push(Event::new("not a time", "x"));
        assert_eq!(outcome, PushOutcome::Malformed);
        assert!(buf.is_empty());
        assert_eq!(buf.malformed_count(), 1);
        assert_eq!(buf.total_received(), 1);
    }

    #[test]
    fn prune_removes_only_expired() {
        let mut buf = buffer(100, DropPolicy::Oldest);
        buf.push(event_at(0, "old"));
        buf.push(event_at(600, "edge"));
        buf.push(event_at(3000, "new"));

        // now = base + 70분 → cutoff = base + 10분
        let now = base() + TimeDelta::minutes(70);
        let removed = buf.prune(now);
        assert_eq!(removed, 1);
        // cutoff와 같은 시각의 이벤트는 남습니다.
        assert_eq!(messages(&buf), vec!["edge", "new"]);
        assert!(buf.oldest().unwrap() >= now - buf.retention());
    }

    #[test]
    fn window_is_inclusive_lower_bound() {
        let mut buf = buffer(100, DropPolicy::Oldest);
        for (i, msg) in ["a", "b", "c", "d"].iter().enumerate() {
            buf.push(event_at(i as i64 * 60, msg));
        }
        let window = buf.window(base() + TimeDelta::minutes(2));
        let msgs: Vec<&str> = window.iter().map(|e| e.message.as_str()).collect();
        assert_eq!(msgs, vec!["c", "d"]);
    }

    #[test]
    fn oldest_drop_policy_evicts_earliest_timestamp() {
        let mut buf = buffer(2, DropPolicy::Oldest);
        buf.push(event_at(20, "b"));
        buf.push(event_at(10, "a"));
        let outcome = buf.push(event_at(30, "c"));
        assert_eq!(outcome, PushOutcome::AcceptedWithEviction);
        assert_eq!(messages(&buf), vec!["b", "c"]);
        assert_eq!(buf.dropped_count(), 1);
    }

    #[test]
    fn newest_drop_policy_rejects() {
        let mut buf = buffer(1, DropPolicy::Newest);
        buf.push(event_at(10, "a"));
        let outcome = buf.push(event_at(20, "b"));
        assert_eq!(outcome, PushOutcome::Rejected);
        assert!(!outcome.is_accepted());
        assert_eq!(messages(&buf), vec!["a"]);
    }

    #[test]
    fn utilization_calculation() {
        let mut buf = buffer(100, DropPolicy::Oldest);
        assert_eq!(buf.utilization(), 0.0);
        for i in 0..50 {
            buf.push(event_at(i, "x"));
        }
        let util = buf.utilization();
        assert!(util > 0.49 && util < 0.51);
    }
}
