//! 로그 수집 모듈 -- 파일과 UDP syslog에서 원시 레코드를 수집합니다.
//!
//! # 수집 소스
//! - [`FileCollector`]: 파일 감시 (`tail` 방식, 위치 추적)
//! - [`SyslogUdpCollector`]: UDP syslog 수신 (백그라운드 태스크 + bounded 채널)
//!
//! 두 수집기 모두 core의 [`Collector`](logwarden_core::pipeline::Collector)
//! trait을 구현하며, `collect`는 블로킹 없이 즉시 반환합니다.

pub mod file;
pub mod syslog_udp;

pub use file::{FileCollector, FileCollectorConfig};
pub use syslog_udp::{SyslogUdpCollector, SyslogUdpConfig};
