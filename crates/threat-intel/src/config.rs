//! 위협 인텔리전스 설정
//!
//! [`IntelConfig`]는 core의 [`ThreatIntelConfig`]에서 생성되며,
//! 상대 경로는 [`GeneralConfig::resolve`]로 `data_dir` 기준 절대 경로가 됩니다.
//!
//! # 사용 예시
//! ```ignore
//! use logwarden_core::config::LogwardenConfig;
//! use logwarden_threat_intel::config::IntelConfig;
//!
//! let core = LogwardenConfig::default();
//! let config = IntelConfig::from_core(&core.threat_intel, &core.general);
//! ```

use std::path::PathBuf;
use std::time::Duration;

use chrono::TimeDelta;
use logwarden_core::config::{GeneralConfig, ThreatIntelConfig};

use crate::blocklist::BlocklistSource;
use crate::error::IntelError;

/// 캐시 유효 기간 상한 (30일)
const MAX_CACHE_HOURS: u64 = 30 * 24;

/// 차단 목록 갱신 주기 상한 (1년)
const MAX_REFRESH_HOURS: u64 = 365 * 24;

/// 다운로드 제한 시간 상한 (초)
const MAX_FETCH_TIMEOUT_SECS: u64 = 600;

/// 위협 인텔리전스 설정
#[derive(Debug, Clone)]
pub struct IntelConfig {
    /// 활성화 여부
    pub enabled: bool,
    /// 캐시 파일 경로
    pub cache_path: PathBuf,
    /// 캐시 전체 유효 기간 (시간)
    pub cache_hours: u64,
    /// 차단 목록 디렉토리
    pub blocklist_dir: PathBuf,
    /// 차단 목록 갱신 주기 (시간)
    pub refresh_hours: u64,
    /// 다운로드 제한 시간 (초)
    pub fetch_timeout_secs: u64,
    /// 조회 결과를 즉시 디스크에 기록
    pub write_through: bool,
    /// 차단 목록 소스
    pub sources: Vec<BlocklistSource>,
}

impl Default for IntelConfig {
    fn default() -> Self {
        Self::from_core(&ThreatIntelConfig::default(), &GeneralConfig::default())
    }
}

impl IntelConfig {
    /// core 설정에서 생성합니다. 차단 목록 소스는 기본 3종입니다.
    pub fn from_core(core: &ThreatIntelConfig, general: &GeneralConfig) -> Self {
        Self {
            enabled: core.enabled,
            cache_path: general.resolve(&core.cache_file),
            cache_hours: core.cache_hours,
            blocklist_dir: general.resolve(&core.blocklist_dir),
            refresh_hours: core.refresh_hours,
            fetch_timeout_secs: core.fetch_timeout_secs,
            write_through: core.write_through,
            sources: BlocklistSource::defaults(),
        }
    }

    /// 캐시 전체 유효 기간
    pub fn cache_ttl(&self) -> TimeDelta {
        hours(self.cache_hours)
    }

    /// 차단 목록 갱신 주기
    pub fn refresh_interval(&self) -> TimeDelta {
        hours(self.refresh_hours)
    }

    /// 다운로드 제한 시간
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), IntelError> {
        if self.cache_hours == 0 || self.cache_hours > MAX_CACHE_HOURS {
            return Err(invalid(
                "cache_hours",
                format!("must be 1-{MAX_CACHE_HOURS}"),
            ));
        }
        if self.refresh_hours == 0 || self.refresh_hours > MAX_REFRESH_HOURS {
            return Err(invalid(
                "refresh_hours",
                format!("must be 1-{MAX_REFRESH_HOURS}"),
            ));
        }
        if self.fetch_timeout_secs == 0 || self.fetch_timeout_secs > MAX_FETCH_TIMEOUT_SECS {
            return Err(invalid(
                "fetch_timeout_secs",
                format!("must be 1-{MAX_FETCH_TIMEOUT_SECS}"),
            ));
        }
        if self.cache_path.as_os_str().is_empty() {
            return Err(invalid("cache_file", "must not be empty"));
        }

        let mut names = std::collections::HashSet::new();
        for source in &self.sources {
            if source.file_name.is_empty() || source.file_name.contains(['/', '\\']) {
                return Err(invalid(
                    "sources.file_name",
                    format!("'{}' must be a plain file name", source.file_name),
                ));
            }
            if !names.insert(source.file_name.as_str()) {
                return Err(invalid(
                    "sources.file_name",
                    format!("duplicate blocklist '{}'", source.file_name),
                ));
            }
        }
        Ok(())
    }
}

fn invalid(field: &str, reason: impl Into<String>) -> IntelError {
    IntelError::Config {
        field: field.to_owned(),
        reason: reason.into(),
    }
}

fn hours(h: u64) -> TimeDelta {
    TimeDelta::hours(i64::try_from(h).unwrap_or(i64::MAX / 3_600_000))
}

/// 위협 인텔리전스 설정 빌더
pub struct IntelConfigBuilder {
    config: IntelConfig,
}

impl IntelConfigBuilder {
    /// 기본값에서 시작하는 빌더를 생성합니다.
    pub fn new() -> Self {
        Self {
            config: IntelConfig::default(),
        }
    }

    /// 캐시 파일 경로를 설정합니다.
    pub fn cache_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.cache_path = path.into();
        self
    }

    /// 캐시 유효 기간(시간)을 설정합니다.
    pub fn cache_hours(mut self, hours: u64) -> Self {
        self.config.cache_hours = hours;
        self
    }

    /// 차단 목록 디렉토리를 설정합니다.
    pub fn blocklist_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.blocklist_dir = dir.into();
        self
    }

    /// 차단 목록 갱신 주기(시간)를 설정합니다.
    pub fn refresh_hours(mut self, hours: u64) -> Self {
        self.config.refresh_hours = hours;
        self
    }

    /// 다운로드 제한 시간(초)을 설정합니다.
    pub fn fetch_timeout_secs(mut self, secs: u64) -> Self {
        self.config.fetch_timeout_secs = secs;
        self
    }

    /// 즉시 기록 여부를 설정합니다.
    pub fn write_through(mut self, enabled: bool) -> Self {
        self.config.write_through = enabled;
        self
    }

    /// 차단 목록 소스를 교체합니다.
    pub fn sources(mut self, sources: Vec<BlocklistSource>) -> Self {
        self.config.sources = sources;
        self
    }

    /// 설정을 검증하고 `IntelConfig`를 생성합니다.
    pub fn build(self) -> Result<IntelConfig, IntelError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

impl Default for IntelConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
