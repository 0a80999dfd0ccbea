//! Logwarden 탐지 엔진
//!
//! # 모듈 구성
//!
//! - [`rule`]: 규칙 레지스트리, 내장 규칙, YAML 규칙 로더
//! - [`buffer`]: 타임스탬프 순서의 시간 창 이벤트 버퍼
//! - [`correlation`]: 버퍼를 소유하고 상관 규칙을 평가하는 엔진
//! - [`anomaly`]: 배치 단위 단일 이벤트 규칙 적용
//! - [`parser`]: 원시 레코드 정규화 (default, syslog, apache, json)
//! - [`collector`]: 파일 및 UDP syslog 수집기
//! - [`extract`]: 메시지의 IPv4 추출
//! - [`config`]: 엔진 설정 (core 설정 확장)
//! - [`error`]: 도메인 에러 타입
//!
//! # 아키텍처
//!
//! ```text
//! Collectors -> ParserRouter -> [threat intel] -> AnomalyDetector ----+--> Alerts
//!                                              \-> CorrelationEngine -/
//!                                                   (EventBuffer)
//! ```

pub mod anomaly;
pub mod buffer;
pub mod collector;
pub mod config;
pub mod correlation;
pub mod error;
pub mod extract;
pub mod parser;
pub mod rule;

// --- 주요 타입 re-export ---

pub use anomaly::AnomalyDetector;
pub use buffer::{EventBuffer, PushOutcome};
pub use collector::{FileCollector, FileCollectorConfig, SyslogUdpCollector, SyslogUdpConfig};
pub use config::{DropPolicy, EngineConfig, EngineConfigBuilder};
pub use correlation::CorrelationEngine;
pub use error::EngineError;
pub use extract::extract_first_ipv4;
pub use parser::{JsonLogParser, ParserRouter, PatternFormat, PatternLogParser};
pub use rule::{
    BruteForceRule, CorrelationRule, ImmediateRule, PredicateRegistry, RuleDefinition, RuleLoader,
    RuleMeta, RuleRegistry,
};
