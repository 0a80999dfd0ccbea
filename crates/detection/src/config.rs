//! 탐지 엔진 설정
//!
//! [`EngineConfig`]는 core의 [`DetectionConfig`](logwarden_core::config::DetectionConfig)를
//! 기반으로 탐지 엔진 전용 설정을 제공합니다.
//!
//! # 사용 예시
//! ```ignore
//! use logwarden_core::config::LogwardenConfig;
//! use logwarden_detection::config::EngineConfig;
//!
//! let core_config = LogwardenConfig::default();
//! let config = EngineConfig::from_core(&core_config.detection);
//! ```

use chrono::TimeDelta;
use logwarden_core::config::{DetectionConfig, PatternRuleConfig};
use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// 버퍼 용량 초과 시 드롭 정책
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DropPolicy {
    /// 가장 오래된 이벤트를 드롭 (기본값)
    #[default]
    Oldest,
    /// 새 이벤트를 거부
    Newest,
}

/// 탐지 엔진 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// 이상 탐지 임계값 (초과 시 알림)
    pub anomaly_threshold: usize,
    /// Brute force 임계값 (이상 시 알림)
    pub brute_force_threshold: usize,
    /// Brute force 시간 창 (분)
    pub brute_force_timeframe_mins: u64,
    /// 버퍼 보존 기간 (분)
    pub buffer_retention_mins: u64,
    /// 버퍼 최대 이벤트 수
    pub buffer_max_events: usize,
    /// 버퍼 드롭 정책
    pub drop_policy: DropPolicy,
    /// YAML 룰 디렉토리 (비어 있으면 사용하지 않음)
    pub rule_dir: String,
    /// 설정 파일의 부분 문자열 규칙
    pub pattern_rules: Vec<PatternRuleConfig>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            anomaly_threshold: 5,
            brute_force_threshold: 5,
            brute_force_timeframe_mins: 15,
            buffer_retention_mins: 60,
            buffer_max_events: 100_000,
            drop_policy: DropPolicy::Oldest,
            rule_dir: String::new(),
            pattern_rules: Vec::new(),
        }
    }
}

impl EngineConfig {
    /// core의 `DetectionConfig`에서 엔진 설정을 생성합니다.
    pub fn from_core(core: &DetectionConfig) -> Self {
        Self {
            anomaly_threshold: core.anomaly_threshold,
            brute_force_threshold: core.brute_force_threshold,
            brute_force_timeframe_mins: core.brute_force_timeframe_mins,
            buffer_retention_mins: core.buffer_retention_mins,
            buffer_max_events: core.buffer_max_events,
            rule_dir: core.rule_dir.clone(),
            pattern_rules: core.rules.clone(),
            ..Self::default()
        }
    }

    /// 버퍼 보존 기간
    pub fn retention(&self) -> TimeDelta {
        minutes(self.buffer_retention_mins)
    }

    /// Brute force 시간 창
    pub fn brute_force_timeframe(&self) -> TimeDelta {
        minutes(self.brute_force_timeframe_mins)
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), EngineError> {
        const MAX_BUFFER_EVENTS: usize = 10_000_000;
        const MAX_RETENTION_MINS: u64 = 7 * 24 * 60;

        if self.brute_force_threshold == 0 {
            return Err(EngineError::Config {
                field: "brute_force_threshold".to_owned(),
                reason: "must be greater than 0".to_owned(),
            });
        }

        if self.brute_force_timeframe_mins == 0 {
            return Err(EngineError::Config {
                field: "brute_force_timeframe_mins".to_owned(),
                reason: "must be greater than 0".to_owned(),
            });
        }

        if self.buffer_retention_mins == 0 || self.buffer_retention_mins > MAX_RETENTION_MINS {
            return Err(EngineError::Config {
                field: "buffer_retention_mins".to_owned(),
                reason: format!("must be 1-{MAX_RETENTION_MINS}"),
            });
        }

        if self.buffer_retention_mins < self.brute_force_timeframe_mins {
            return Err(EngineError::Config {
                field: "buffer_retention_mins".to_owned(),
                reason: "must cover the brute force timeframe".to_owned(),
            });
        }

        if self.buffer_max_events == 0 || self.buffer_max_events > MAX_BUFFER_EVENTS {
            return Err(EngineError::Config {
                field: "buffer_max_events".to_owned(),
                reason: format!("must be 1-{MAX_BUFFER_EVENTS}"),
            });
        }

        Ok(())
    }
}

fn minutes(mins: u64) -> TimeDelta {
    TimeDelta::minutes(i64::try_from(mins).unwrap_or(i64::MAX / 60_000))
}

/// 엔진 설정 빌더
#[derive(Default)]
pub struct EngineConfigBuilder {
    config: EngineConfig,
}

impl EngineConfigBuilder {
    /// 새 빌더를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 이상 탐지 임계값을 설정합니다.
    pub fn anomaly_threshold(mut self, threshold: usize) -> Self {
        self.config.anomaly_threshold = threshold;
        self
    }

    /// Brute force 임계값을 설정합니다.
    pub fn brute_force_threshold(mut self, threshold: usize) -> Self {
        self.config.brute_force_threshold = threshold;
        self
    }

    /// Brute force 시간 창(분)을 설정합니다.
    pub fn brute_force_timeframe_mins(mut self, mins: u64) -> Self {
        self.config.brute_force_timeframe_mins = mins;
        self
    }

    /// 버퍼 보존 기간(분)을 설정합니다.
    pub fn buffer_retention_mins(mut self, mins: u64) -> Self {
        self.config.buffer_retention_mins = mins;
        self
    }

    /// 버퍼 최대 이벤트 수를 설정합니다.
    pub fn buffer_max_events(mut self, max: usize) -> Self {
        self.config.buffer_max_events = max;
        self
    }

    /// 드롭 정책을 설정합니다.
    pub fn drop_policy(mut self, policy: DropPolicy) -> Self {
        self.config.drop_policy = policy;
        self
    }

    /// 룰 디렉토리를 설정합니다.
    pub fn rule_dir(mut self, dir: impl Into<String>) -> Self {
        self.config.rule_dir = dir.into();
        self
    }

    /// 부분 문자열 규칙을 추가합니다.
    pub fn pattern_rule(
        mut self,
        name: impl Into<String>,
        pattern: impl Into<String>,
        severity: impl Into<String>,
    ) -> Self {
        self.config.pattern_rules.push(PatternRuleConfig {
            name: name.into(),
            pattern: pattern.into(),
            severity: severity.into(),
        });
        self
    }

    /// 설정을 검증하고 `EngineConfig`를 생성합니다.
    pub fn build(self) -> Result<EngineConfig, EngineError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        EngineConfig::default().validate().unwrap();
    }

    #[test]
    fn from_core_preserves_values() {
        let core = DetectionConfig {
            anomaly_threshold: 9,
            brute_force_threshold: 3,
            rule_dir: "/etc/logwarden/rules".to_owned(),
            ..Default::default()
        };
        let config = EngineConfig::from_core(&core);
        assert_eq!(config.anomaly_threshold, 9);
        assert_eq!(config.brute_force_threshold, 3);
        assert_eq!(config.rule_dir, "/etc/logwarden/rules");
        assert_eq!(config.drop_policy, DropPolicy::Oldest);
    }

    #[test]
    fn durations_are_minutes() {
        let config = EngineConfig::default();
        assert_eq!(config.retention(), TimeDelta::minutes(60));
        assert_eq!(config.brute_force_timeframe(), TimeDelta::minutes(15));
    }

    #[test]
    fn validate_rejects_zero_threshold() {
        let config = EngineConfig {
            brute_force_threshold: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_retention_shorter_than_timeframe() {
        let config = EngineConfig {
            buffer_retention_mins: 5,
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("buffer_retention_mins"));
    }

    #[test]
    fn builder_creates_valid_config() {
        let config = EngineConfigBuilder::new()
            .anomaly_threshold(2)
            .brute_force_threshold(3)
            .buffer_max_events(10)
            .drop_policy(DropPolicy::Newest)
            .pattern_rule("failed_password", "Failed password", "high")
            .build()
            .unwrap();
        assert_eq!(config.anomaly_threshold, 2);
        assert_eq!(config.buffer_max_events, 10);
        assert_eq!(config.drop_policy, DropPolicy::Newest);
        assert_eq!(config.pattern_rules.len(), 1);
    }

    #[test]
    fn builder_rejects_invalid_config() {
        assert!(EngineConfigBuilder::new().buffer_max_events(0).build().is_err());
    }
}
