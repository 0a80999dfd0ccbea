//! Logwarden 위협 인텔리전스
//!
//! 로컬 차단 목록(Tor exit, URLhaus, Spamhaus DROP)으로 IP 평판을 계산하고
//! 결과를 디스크 캐시에 보관합니다.
//!
//! # 모듈 구성
//!
//! - [`intel`]: 조회 진입점 [`ThreatIntel`]
//! - [`cache`]: 캐시 전체 단위로 만료되는 영속 캐시
//! - [`blocklist`]: 차단 목록 소스, 갱신, 점수 계산
//! - [`cidr`]: IPv4 네트워크 매칭
//! - [`config`]: 설정 (core 설정 확장)
//! - [`error`]: 도메인 에러 타입
//!
//! # 점수
//!
//! | 목록 | 카테고리 | 점수 | 비교 |
//! |------|----------|------|------|
//! | `tor_exit_nodes.txt` | `tor_exit_node` | 50 | 문자열 |
//! | `botnet_ips.txt` | `botnet` | 80 | 문자열 |
//! | `spamhaus_drop.txt` | `spamhaus` | 70 | CIDR |
//!
//! 합계가 50을 초과하면 악성입니다.

pub mod blocklist;
pub mod cache;
pub mod cidr;
pub mod config;
pub mod error;
pub mod intel;

pub use blocklist::{
    BlocklistFetcher, BlocklistFormat, BlocklistHits, BlocklistSource, BlocklistStore,
    HttpFetcher, MatchKind,
};
pub use cache::{CacheRecord, ThreatIntelCache};
pub use cidr::Ipv4Cidr;
pub use config::{IntelConfig, IntelConfigBuilder};
pub use error::IntelError;
pub use intel::ThreatIntel;
