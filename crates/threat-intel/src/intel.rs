//! IP 평판 조회
//!
//! [`ThreatIntel::check_ip`]은 캐시를 먼저 확인하고, 없으면 차단 목록을
//! 갱신한 뒤 점수를 계산해 캐시에 넣습니다. 같은 IP에 대한 두 번째
//! 조회는 캐시가 만료될 때까지 첫 결과를 그대로 돌려줍니다.

use std::net::IpAddr;

use chrono::{DateTime, Utc};
use logwarden_core::metrics as m;
use logwarden_core::types::ThreatIntelResult;
use tokio::sync::Mutex;

use crate::blocklist::{BlocklistFetcher, BlocklistStore, HttpFetcher};
use crate::cache::ThreatIntelCache;
use crate::config::IntelConfig;
use crate::error::IntelError;

/// 결과의 출처 레이블
pub const SOURCE_LOCAL_BLOCKLISTS: &str = "local_blocklists";

/// 이 점수를 초과하면 악성으로 판정
pub const MALICIOUS_SCORE_THRESHOLD: u32 = 50;

/// 위협 인텔리전스 조회기
pub struct ThreatIntel<F = HttpFetcher> {
    cache: Mutex<ThreatIntelCache>,
    store: BlocklistStore<F>,
    write_through: bool,
}

impl ThreatIntel<HttpFetcher> {
    /// HTTP 다운로더로 조회기를 생성하고 디스크 캐시를 읽습니다.
    pub async fn open(config: &IntelConfig) -> Result<Self, IntelError> {
        let fetcher = HttpFetcher::new(config.fetch_timeout())?;
        Self::with_fetcher(config, fetcher).await
    }
}

impl<F: BlocklistFetcher> ThreatIntel<F> {
    /// 지정한 다운로더로 조회기를 생성합니다.
    pub async fn with_fetcher(config: &IntelConfig, fetcher: F) -> Result<Self, IntelError> {
        config.validate()?;

        let cache = ThreatIntelCache::load(&config.cache_path, config.cache_ttl(), Utc::now()).await;
        let store = BlocklistStore::new(
            config.blocklist_dir.clone(),
            config.sources.clone(),
            config.refresh_interval(),
            fetcher,
        );

        Ok(Self {
            cache: Mutex::new(cache),
            store,
            write_through: config.write_through,
        })
    }

    /// IP 평판을 조회합니다.
    pub async fn check_ip(&self, ip: &str) -> Result<ThreatIntelResult, IntelError> {
        self.check_ip_at(ip, Utc::now()).await
    }

    /// 기준 시각 `now`로 [`check_ip`](Self::check_ip)을 수행합니다.
    pub async fn check_ip_at(
        &self,
        ip: &str,
        now: DateTime<Utc>,
    ) -> Result<ThreatIntelResult, IntelError> {
        let addr: IpAddr = ip
            .parse()
            .map_err(|_| IntelError::InvalidIp(ip.to_owned()))?;
        metrics::counter!(m::THREAT_INTEL_LOOKUPS_TOTAL).increment(1);

        {
            let mut cache = self.cache.lock().await;
            if cache.is_stale(now) {
                tracing::info!(entries = cache.len(), "threat intel cache expired, discarding");
                cache.reset(now);
            }
            if let Some(hit) = cache.get(ip) {
                metrics::counter!(m::THREAT_INTEL_CACHE_HITS_TOTAL).increment(1);
                return Ok(hit.clone());
            }
        }

        self.store.ensure_fresh_at(now).await;

        let ipv4 = match addr {
            IpAddr::V4(v4) => Some(v4),
            IpAddr::V6(_) => None,
        };
        let hits = self.store.score(ip, ipv4).await;
        let result = ThreatIntelResult {
            ip: ip.to_owned(),
            is_malicious: hits.score > MALICIOUS_SCORE_THRESHOLD,
            score: hits.score,
            matches: hits.matches,
            source: SOURCE_LOCAL_BLOCKLISTS.to_owned(),
            cached_at: now,
        };

        let mut cache = self.cache.lock().await;
        let stored = cache.insert(result).clone();
        if self.write_through {
            if let Err(e) = cache.flush().await {
                tracing::warn!(error = %e, "failed to persist threat intel cache");
            }
        }

        if stored.is_malicious {
            tracing::info!(ip, score = stored.score, matches = ?stored.matches, "malicious ip");
        } else {
            tracing::debug!(ip, score = stored.score, "ip reputation checked");
        }

        Ok(stored)
    }

    /// 캐시 전체를 디스크에 기록합니다.
    pub async fn flush(&self) -> Result<(), IntelError> {
        self.cache.lock().await.flush().await
    }

    /// 캐시된 항목 수
    pub async fn cached_len(&self) -> usize {
        self.cache.lock().await.len()
    }

    /// 차단 목록 저장소
    pub fn blocklists(&self) -> &BlocklistStore<F> {
        &self.store
    }
}
