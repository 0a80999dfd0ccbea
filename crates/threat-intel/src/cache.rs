//! IP 평판 캐시
//!
//! 디스크에는 단일 JSON 레코드로 저장됩니다.
//!
//! ```json
//! { "timestamp": "2024-05-01T12:00:00Z", "data": { "192.0.2.10": { ... } } }
//! ```
//!
//! 만료는 캐시 전체 단위입니다. `timestamp`가 `now - ttl`보다 이후일 때만
//! 유효하며, 개별 항목은 따로 만료되지 않습니다.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, TimeDelta, Utc};
use logwarden_core::types::ThreatIntelResult;
use serde::{Deserialize, Serialize};

use crate::error::IntelError;

/// 디스크에 저장되는 캐시 레코드
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheRecord {
    /// 캐시 생성 시각
    pub timestamp: DateTime<Utc>,
    /// IP 문자열 → 조회 결과
    #[serde(default)]
    pub data: BTreeMap<String, ThreatIntelResult>,
}

impl CacheRecord {
    fn empty(now: DateTime<Utc>) -> Self {
        Self {
            timestamp: now,
            data: BTreeMap::new(),
        }
    }
}

/// 메모리 캐시와 영속화 경로
#[derive(Debug)]
pub struct ThreatIntelCache {
    path: PathBuf,
    ttl: TimeDelta,
    record: CacheRecord,
}

impl ThreatIntelCache {
    /// 빈 캐시를 생성합니다.
    pub fn new(path: impl Into<PathBuf>, ttl: TimeDelta, now: DateTime<Utc>) -> Self {
        Self {
            path: path.into(),
            ttl,
            record: CacheRecord::empty(now),
        }
    }

    /// 디스크에서 캐시를 읽습니다.
    ///
    /// 파일이 없거나, 손상되었거나, 만료되었으면 `now` 시각의 빈 캐시로 시작합니다.
    pub async fn load(path: impl Into<PathBuf>, ttl: TimeDelta, now: DateTime<Utc>) -> Self {
        let path = path.into();
        let mut cache = Self::new(path.clone(), ttl, now);

        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no threat intel cache on disk");
                return cache;
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "failed to read threat intel cache");
                return cache;
            }
        };

        let record: CacheRecord = match serde_json::from_slice(&bytes) {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "corrupt threat intel cache, starting empty");
                return cache;
            }
        };

        if now.checked_sub_signed(ttl).is_none_or(|cutoff| record.timestamp > cutoff) {
            tracing::info!(
                path = %path.display(),
                entries = record.data.len(),
                "threat intel cache loaded"
            );
            cache.record = record;
        } else {
            tracing::info!(
                path = %path.display(),
                cached_at = %record.timestamp,
                "threat intel cache expired, starting empty"
            );
        }
        cache
    }

    /// 캐시 전체가 만료되었는지 확인합니다.
    pub fn is_stale(&self, now: DateTime<Utc>) -> bool {
        now.checked_sub_signed(self.ttl)
            .is_some_and(|cutoff| self.record.timestamp <= cutoff)
    }

    /// 모든 항목을 버리고 `now` 시각으로 다시 시작합니다.
    pub fn reset(&mut self, now: DateTime<Utc>) {
        self.record = CacheRecord::empty(now);
    }

    /// 캐시 생성 시각
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.record.timestamp
    }

    /// 정확히 일치하는 IP 문자열의 결과
    pub fn get(&self, ip: &str) -> Option<&ThreatIntelResult> {
        self.record.data.get(ip)
    }

    /// 결과를 삽입합니다. 같은 IP의 항목이 이미 있으면 기존 항목이 유지됩니다.
    pub fn insert(&mut self, result: ThreatIntelResult) -> &ThreatIntelResult {
        self.record.data.entry(result.ip.clone()).or_insert(result)
    }

    /// 항목 수
    pub fn len(&self) -> usize {
        self.record.data.len()
    }

    /// 비어 있는지 확인합니다.
    pub fn is_empty(&self) -> bool {
        self.record.data.is_empty()
    }

    /// 영속화 경로
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 캐시 전체를 디스크에 기록합니다.
    ///
    /// 임시 파일에 쓴 뒤 rename하므로 중간에 실패해도 기존 파일은 손상되지 않습니다.
    pub async fn flush(&self) -> Result<(), IntelError> {
        let bytes = serde_json::to_vec_pretty(&self.record)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| IntelError::Cache(format!("{}: {e}", parent.display())))?;
        }

        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, bytes)
            .await
            .map_err(|e| IntelError::Cache(format!("{}: {e}", tmp.display())))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| IntelError::Cache(format!("{}: {e}", self.path.display())))?;
        Ok(())
    }
}
