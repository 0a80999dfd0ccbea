//! 설정 관리 -- logwarden.toml 파싱 및 런타임 설정
//!
//! [`LogwardenConfig`]는 모든 구성 요소의 설정을 담는 최상위 구조체입니다.
//!
//! # 설정 로딩 우선순위
//! 1. CLI 인자 (최고 우선)
//! 2. 환경변수 (`LOGWARDEN_DETECTION_ANOMALY_THRESHOLD=10` 형식)
//! 3. 설정 파일 (`logwarden.toml`)
//! 4. 기본값 (`Default` 구현)
//!
//! # 사용 예시
//! ```no_run
//! # async fn example() -> Result<(), logwarden_core::error::LogwardenError> {
//! use logwarden_core::config::LogwardenConfig;
//!
//! // 파일에서 로드 + 환경변수 오버라이드
//! let config = LogwardenConfig::load("logwarden.toml").await?;
//!
//! // TOML 문자열에서 직접 파싱
//! let config = LogwardenConfig::parse("[general]\nlog_level = \"debug\"")?;
//! # Ok(())
//! # }
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ConfigError, LogwardenError};
use crate::types::Severity;

/// 지원하는 정규화 형식
pub const LOG_FORMATS: &[&str] = &["default", "syslog", "apache", "json"];

/// 위협 인텔리전스 캐시 유효 기간 상한 (30일)
const MAX_CACHE_HOURS: u64 = 30 * 24;

/// 시간 단위 주기 설정의 상한 (1년)
const MAX_PERIOD_HOURS: u64 = 365 * 24;

/// 다운로드 제한 시간 상한 (초)
const MAX_FETCH_TIMEOUT_SECS: u64 = 600;

/// 보존 기간 상한 (100년)
const MAX_RETENTION_DAYS: u32 = 36_500;

/// Logwarden 통합 설정
///
/// `logwarden.toml` 파일의 최상위 구조를 나타냅니다.
/// 각 구성 요소는 자기 섹션만 읽어 사용합니다.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LogwardenConfig {
    /// 일반 설정
    #[serde(default)]
    pub general: GeneralConfig,
    /// 수집기 설정
    #[serde(default)]
    pub collector: CollectorConfig,
    /// 탐지 엔진 설정
    #[serde(default)]
    pub detection: DetectionConfig,
    /// 위협 인텔리전스 설정
    #[serde(default)]
    pub threat_intel: ThreatIntelConfig,
    /// 저장소 설정
    #[serde(default)]
    pub storage: StorageConfig,
    /// 알림 발송 설정
    #[serde(default)]
    pub notifier: NotifierConfig,
    /// Prometheus 메트릭 설정
    #[serde(default)]
    pub metrics: MetricsConfig,
}

impl LogwardenConfig {
    /// TOML 파일에서 설정을 로드하고 환경변수 오버라이드를 적용합니다.
    ///
    /// 설정 로딩 순서:
    /// 1. TOML 파일 파싱
    /// 2. 환경변수 오버라이드 적용
    /// 3. 유효성 검증
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, LogwardenError> {
        let mut config = Self::from_file(path).await?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// TOML 파일에서 설정을 로드합니다 (환경변수 오버라이드 없음).
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, LogwardenError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                LogwardenError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                LogwardenError::Io(e)
            }
        })?;
        Self::parse(&content)
    }

    /// TOML 문자열에서 설정을 파싱합니다.
    pub fn parse(toml_str: &str) -> Result<Self, LogwardenError> {
        toml::from_str(toml_str).map_err(|e| {
            LogwardenError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// 환경변수로 설정값을 오버라이드합니다.
    ///
    /// 환경변수 네이밍 규칙: `LOGWARDEN_{SECTION}_{FIELD}`
    /// 예: `LOGWARDEN_COLLECTOR_POLL_INTERVAL_SECS=10`
    pub fn apply_env_overrides(&mut self) {
        // General
        override_string(&mut self.general.log_level, "LOGWARDEN_GENERAL_LOG_LEVEL");
        override_string(&mut self.general.log_format, "LOGWARDEN_GENERAL_LOG_FORMAT");
        override_string(&mut self.general.data_dir, "LOGWARDEN_GENERAL_DATA_DIR");

        // Collector
        override_csv(
            &mut self.collector.watch_paths,
            "LOGWARDEN_COLLECTOR_WATCH_PATHS",
        );
        override_bool(
            &mut self.collector.syslog_enabled,
            "LOGWARDEN_COLLECTOR_SYSLOG_ENABLED",
        );
        override_string(
            &mut self.collector.syslog_bind,
            "LOGWARDEN_COLLECTOR_SYSLOG_BIND",
        );
        override_string(
            &mut self.collector.log_format,
            "LOGWARDEN_COLLECTOR_LOG_FORMAT",
        );
        override_u64(
            &mut self.collector.poll_interval_secs,
            "LOGWARDEN_COLLECTOR_POLL_INTERVAL_SECS",
        );

        // Detection
        override_usize(
            &mut self.detection.anomaly_threshold,
            "LOGWARDEN_DETECTION_ANOMALY_THRESHOLD",
        );
        override_usize(
            &mut self.detection.brute_force_threshold,
            "LOGWARDEN_DETECTION_BRUTE_FORCE_THRESHOLD",
        );
        override_u64(
            &mut self.detection.brute_force_timeframe_mins,
            "LOGWARDEN_DETECTION_BRUTE_FORCE_TIMEFRAME_MINS",
        );
        override_u64(
            &mut self.detection.buffer_retention_mins,
            "LOGWARDEN_DETECTION_BUFFER_RETENTION_MINS",
        );
        override_usize(
            &mut self.detection.buffer_max_events,
            "LOGWARDEN_DETECTION_BUFFER_MAX_EVENTS",
        );
        override_string(&mut self.detection.rule_dir, "LOGWARDEN_DETECTION_RULE_DIR");

        // Threat intel
        override_bool(
            &mut self.threat_intel.enabled,
            "LOGWARDEN_THREAT_INTEL_ENABLED",
        );
        override_string(
            &mut self.threat_intel.cache_file,
            "LOGWARDEN_THREAT_INTEL_CACHE_FILE",
        );
        override_u64(
            &mut self.threat_intel.cache_hours,
            "LOGWARDEN_THREAT_INTEL_CACHE_HOURS",
        );
        override_string(
            &mut self.threat_intel.blocklist_dir,
            "LOGWARDEN_THREAT_INTEL_BLOCKLIST_DIR",
        );
        override_u64(
            &mut self.threat_intel.refresh_hours,
            "LOGWARDEN_THREAT_INTEL_REFRESH_HOURS",
        );
        override_u64(
            &mut self.threat_intel.fetch_timeout_secs,
            "LOGWARDEN_THREAT_INTEL_FETCH_TIMEOUT_SECS",
        );
        override_bool(
            &mut self.threat_intel.write_through,
            "LOGWARDEN_THREAT_INTEL_WRITE_THROUGH",
        );

        // Storage
        override_string(&mut self.storage.dir, "LOGWARDEN_STORAGE_DIR");
        override_u64(
            &mut self.storage.timeout_secs,
            "LOGWARDEN_STORAGE_TIMEOUT_SECS",
        );
        override_u32(
            &mut self.storage.log_retention_days,
            "LOGWARDEN_STORAGE_LOG_RETENTION_DAYS",
        );
        override_u32(
            &mut self.storage.alert_retention_days,
            "LOGWARDEN_STORAGE_ALERT_RETENTION_DAYS",
        );
        override_u64(
            &mut self.storage.retention_check_hours,
            "LOGWARDEN_STORAGE_RETENTION_CHECK_HOURS",
        );

        // Notifier
        override_string(
            &mut self.notifier.webhook_url,
            "LOGWARDEN_NOTIFIER_WEBHOOK_URL",
        );
        override_u64(
            &mut self.notifier.timeout_secs,
            "LOGWARDEN_NOTIFIER_TIMEOUT_SECS",
        );
        override_csv(
            &mut self.notifier.notify_severities,
            "LOGWARDEN_NOTIFIER_NOTIFY_SEVERITIES",
        );

        // Metrics
        override_bool(&mut self.metrics.enabled, "LOGWARDEN_METRICS_ENABLED");
        override_string(
            &mut self.metrics.listen_addr,
            "LOGWARDEN_METRICS_LISTEN_ADDR",
        );
        override_u16(&mut self.metrics.port, "LOGWARDEN_METRICS_PORT");
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), LogwardenError> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            return Err(invalid(
                "general.log_level",
                format!("must be one of: {}", valid_levels.join(", ")),
            ));
        }

        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.general.log_format.as_str()) {
            return Err(invalid(
                "general.log_format",
                format!("must be one of: {}", valid_formats.join(", ")),
            ));
        }

        if !LOG_FORMATS.contains(&self.collector.log_format.as_str()) {
            return Err(invalid(
                "collector.log_format",
                format!("must be one of: {}", LOG_FORMATS.join(", ")),
            ));
        }

        if self.collector.poll_interval_secs == 0 {
            return Err(invalid("collector.poll_interval_secs", "must be greater than 0"));
        }

        if self.collector.channel_capacity == 0 {
            return Err(invalid("collector.channel_capacity", "must be greater than 0"));
        }

        self.detection.validate()?;

        if self.threat_intel.enabled {
            if !(1..=MAX_CACHE_HOURS).contains(&self.threat_intel.cache_hours) {
                return Err(invalid(
                    "threat_intel.cache_hours",
                    format!("must be 1-{MAX_CACHE_HOURS}"),
                ));
            }
            if !(1..=MAX_PERIOD_HOURS).contains(&self.threat_intel.refresh_hours) {
                return Err(invalid(
                    "threat_intel.refresh_hours",
                    format!("must be 1-{MAX_PERIOD_HOURS}"),
                ));
            }
            if !(1..=MAX_FETCH_TIMEOUT_SECS).contains(&self.threat_intel.fetch_timeout_secs) {
                return Err(invalid(
                    "threat_intel.fetch_timeout_secs",
                    format!("must be 1-{MAX_FETCH_TIMEOUT_SECS}"),
                ));
            }
        }

        if self.storage.timeout_secs == 0 {
            return Err(invalid("storage.timeout_secs", "must be greater than 0"));
        }
        for (field, days) in [
            ("storage.log_retention_days", self.storage.log_retention_days),
            ("storage.alert_retention_days", self.storage.alert_retention_days),
        ] {
            if !(1..=MAX_RETENTION_DAYS).contains(&days) {
                return Err(invalid(field, format!("must be 1-{MAX_RETENTION_DAYS}")));
            }
        }
        if !(1..=MAX_PERIOD_HOURS).contains(&self.storage.retention_check_hours) {
            return Err(invalid(
                "storage.retention_check_hours",
                format!("must be 1-{MAX_PERIOD_HOURS}"),
            ));
        }

        let url = &self.notifier.webhook_url;
        if !url.is_empty() && !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(invalid(
                "notifier.webhook_url",
                "must start with http:// or https://",
            ));
        }
        for severity in &self.notifier.notify_severities {
            if Severity::from_str_loose(severity).is_none() {
                return Err(invalid(
                    "notifier.notify_severities",
                    format!("unknown severity '{severity}'"),
                ));
            }
        }

        if self.metrics.enabled && self.metrics.port == 0 {
            return Err(invalid("metrics.port", "must be greater than 0"));
        }

        Ok(())
    }
}

fn invalid(field: &str, reason: impl Into<String>) -> LogwardenError {
    ConfigError::InvalidValue {
        field: field.to_owned(),
        reason: reason.into(),
    }
    .into()
}

/// 일반 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// 로그 레벨 (trace, debug, info, warn, error)
    pub log_level: String,
    /// 로그 형식 (json, pretty)
    pub log_format: String,
    /// 데이터 디렉토리 (상대 경로 설정의 기준)
    pub data_dir: String,
}

impl GeneralConfig {
    /// 상대 경로를 `data_dir` 기준으로 해석합니다.
    pub fn resolve(&self, path: &str) -> PathBuf {
        let p = Path::new(path);
        if p.is_absolute() {
            p.to_path_buf()
        } else {
            Path::new(&self.data_dir).join(p)
        }
    }
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            log_format: "json".to_owned(),
            data_dir: "/var/lib/logwarden".to_owned(),
        }
    }
}

/// 수집기 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectorConfig {
    /// 감시할 로그 파일
    pub watch_paths: Vec<String>,
    /// UDP syslog 수신 활성화
    pub syslog_enabled: bool,
    /// Syslog 수신 주소
    pub syslog_bind: String,
    /// 정규화 형식 (default, syslog, apache, json)
    pub log_format: String,
    /// 수집 주기 (초)
    pub poll_interval_secs: u64,
    /// syslog 수신 큐 크기
    pub channel_capacity: usize,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            watch_paths: vec!["/var/log/auth.log".to_owned()],
            syslog_enabled: false,
            syslog_bind: "0.0.0.0:5140".to_owned(),
            log_format: "default".to_owned(),
            poll_interval_secs: 30,
            channel_capacity: 1024,
        }
    }
}

/// 탐지 엔진 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// 이상 탐지 임계값 (매칭 수가 이 값을 초과하면 알림)
    pub anomaly_threshold: usize,
    /// Brute force 임계값 (같은 IP의 실패 수가 이 값 이상이면 알림)
    pub brute_force_threshold: usize,
    /// Brute force 탐지 시간 창 (분)
    pub brute_force_timeframe_mins: u64,
    /// 이벤트 버퍼 보존 기간 (분)
    pub buffer_retention_mins: u64,
    /// 이벤트 버퍼 최대 크기
    pub buffer_max_events: usize,
    /// YAML 규칙 디렉토리 (비어 있으면 사용하지 않음)
    pub rule_dir: String,
    /// 설정 파일에 정의된 부분 문자열 규칙
    pub rules: Vec<PatternRuleConfig>,
}

impl DetectionConfig {
    fn validate(&self) -> Result<(), LogwardenError> {
        if self.brute_force_threshold == 0 {
            return Err(invalid(
                "detection.brute_force_threshold",
                "must be greater than 0",
            ));
        }
        if self.brute_force_timeframe_mins == 0 {
            return Err(invalid(
                "detection.brute_force_timeframe_mins",
                "must be greater than 0",
            ));
        }
        if self.buffer_retention_mins < self.brute_force_timeframe_mins {
            return Err(invalid(
                "detection.buffer_retention_mins",
                format!(
                    "must be at least brute_force_timeframe_mins ({})",
                    self.brute_force_timeframe_mins
                ),
            ));
        }
        if self.buffer_max_events == 0 {
            return Err(invalid(
                "detection.buffer_max_events",
                "must be greater than 0",
            ));
        }
        for (idx, rule) in self.rules.iter().enumerate() {
            if rule.name.trim().is_empty() {
                return Err(invalid(
                    &format!("detection.rules[{idx}].name"),
                    "must not be empty",
                ));
            }
            if rule.pattern.is_empty() {
                return Err(invalid(
                    &format!("detection.rules[{idx}].pattern"),
                    "must not be empty",
                ));
            }
            if Severity::from_str_loose(&rule.severity).is_none() {
                return Err(invalid(
                    &format!("detection.rules[{idx}].severity"),
                    format!("unknown severity '{}'", rule.severity),
                ));
            }
        }
        Ok(())
    }
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            anomaly_threshold: 5,
            brute_force_threshold: 3,
            brute_force_timeframe_mins: 15,
            buffer_retention_mins: 60,
            buffer_max_events: 100_000,
            rule_dir: String::new(),
            rules: Vec::new(),
        }
    }
}

/// 설정 파일의 부분 문자열 규칙
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternRuleConfig {
    /// 규칙 이름
    pub name: String,
    /// 메시지에 포함되어야 하는 부분 문자열 (대소문자 구분)
    pub pattern: String,
    /// 심각도
    #[serde(default = "default_rule_severity")]
    pub severity: String,
}

fn default_rule_severity() -> String {
    "medium".to_owned()
}

/// 위협 인텔리전스 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ThreatIntelConfig {
    /// 활성화 여부
    pub enabled: bool,
    /// 캐시 파일 경로 (상대 경로는 data_dir 기준)
    pub cache_file: String,
    /// 캐시 전체 유효 기간 (시간)
    pub cache_hours: u64,
    /// 차단 목록 디렉토리 (상대 경로는 data_dir 기준)
    pub blocklist_dir: String,
    /// 차단 목록 갱신 주기 (시간)
    pub refresh_hours: u64,
    /// 차단 목록 다운로드 제한 시간 (초)
    pub fetch_timeout_secs: u64,
    /// 새 결과를 즉시 디스크에 기록
    pub write_through: bool,
}

impl Default for ThreatIntelConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            cache_file: "threat_intel_cache.json".to_owned(),
            cache_hours: 24,
            blocklist_dir: "blocklists".to_owned(),
            refresh_hours: 24,
            fetch_timeout_secs: 30,
            write_through: true,
        }
    }
}

/// 저장소 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// 저장 디렉토리 (상대 경로는 data_dir 기준)
    pub dir: String,
    /// 저장 호출 제한 시간 (초)
    pub timeout_secs: u64,
    /// 로그 보존 기간 (일)
    pub log_retention_days: u32,
    /// 알림 보존 기간 (일)
    pub alert_retention_days: u32,
    /// 보존 정리 주기 (시간)
    pub retention_check_hours: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            dir: "store".to_owned(),
            timeout_secs: 10,
            log_retention_days: 90,
            alert_retention_days: 365,
            retention_check_hours: 24,
        }
    }
}

/// 알림 발송 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotifierConfig {
    /// Webhook URL (비어 있으면 발송하지 않음)
    pub webhook_url: String,
    /// 추가 HTTP 헤더
    pub headers: BTreeMap<String, String>,
    /// 요청 제한 시간 (초)
    pub timeout_secs: u64,
    /// 발송할 심각도 목록 (정확히 일치하는 경우만 발송)
    pub notify_severities: Vec<String>,
}

impl NotifierConfig {
    /// 발송 대상 심각도를 파싱합니다. 알 수 없는 값은 무시됩니다.
    pub fn severities(&self) -> Vec<Severity> {
        self.notify_severities
            .iter()
            .filter_map(|s| Severity::from_str_loose(s))
            .collect()
    }
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            webhook_url: String::new(),
            headers: BTreeMap::new(),
            timeout_secs: 10,
            notify_severities: vec!["high".to_owned()],
        }
    }
}

/// Prometheus 메트릭 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// 활성화 여부
    pub enabled: bool,
    /// 수신 주소
    pub listen_addr: String,
    /// 수신 포트
    pub port: u16,
    /// 엔드포인트 경로
    pub endpoint: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            listen_addr: "127.0.0.1".to_owned(),
            port: 9100,
            endpoint: "/metrics".to_owned(),
        }
    }
}

// --- 환경변수 오버라이드 헬퍼 ---

fn override_string(target: &mut String, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val;
    }
}

fn override_bool(target: &mut bool, env_key: &str) {
    override_parsed(target, env_key, "bool");
}

fn override_usize(target: &mut usize, env_key: &str) {
    override_parsed(target, env_key, "usize");
}

fn override_u16(target: &mut u16, env_key: &str) {
    override_parsed(target, env_key, "u16");
}

fn override_u32(target: &mut u32, env_key: &str) {
    override_parsed(target, env_key, "u32");
}

fn override_u64(target: &mut u64, env_key: &str) {
    override_parsed(target, env_key, "u64");
}

fn override_parsed<T: std::str::FromStr>(target: &mut T, env_key: &str, type_name: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<T>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                expected = type_name,
                "failed to parse env var, ignoring"
            ),
        }
    }
}

fn override_csv(target: &mut Vec<String>, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val
            .split(',')
            .map(|s| s.trim().to_owned())
            .filter(|s| !s.is_empty())
            .collect();
    }
}
