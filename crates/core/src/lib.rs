//! Logwarden 공통 크레이트
//!
//! 도메인 타입, 에러, 설정, 협력자 trait, 메트릭 이름을 정의합니다.
//! 다른 모든 크레이트가 이 크레이트에 의존합니다.

pub mod config;
pub mod error;
pub mod metrics;
pub mod pipeline;
pub mod types;

// --- 주요 타입 re-export ---

// 에러
pub use error::{
    CollectorError, ConfigError, DetectionError, LogwardenError, ParseError, StorageError,
    ThreatIntelError,
};

// 설정
pub use config::LogwardenConfig;

// 파이프라인 trait
pub use pipeline::{Collector, EventStore, LogParser, Notifier};

// 도메인 타입
pub use types::{Alert, Event, RawRecord, Severity, ThreatIntelResult};
