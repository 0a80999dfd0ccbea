//! 에러 타입 -- 도메인별 에러 정의

/// Logwarden 최상위 에러 타입
#[derive(Debug, thiserror::Error)]
pub enum LogwardenError {
    /// 설정 관련 에러
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// 수집기 에러
    #[error("collector error: {0}")]
    Collector(#[from] CollectorError),

    /// 탐지 엔진 에러
    #[error("detection error: {0}")]
    Detection(#[from] DetectionError),

    /// 위협 인텔리전스 에러
    #[error("threat intel error: {0}")]
    ThreatIntel(#[from] ThreatIntelError),

    /// 파싱 에러
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// 스토리지 에러
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// 설정 관련 에러
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// 설정 파일을 찾을 수 없음
    #[error("config file not found: {path}")]
    FileNotFound { path: String },

    /// 설정 파싱 실패
    #[error("failed to parse config: {reason}")]
    ParseFailed { reason: String },

    /// 유효하지 않은 설정 값
    #[error("invalid config value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// 수집기 에러
#[derive(Debug, thiserror::Error)]
pub enum CollectorError {
    /// 소스를 읽을 수 없음
    #[error("source '{source_name}' unavailable: {reason}")]
    Unavailable { source_name: String, reason: String },

    /// 수집기가 이미 종료됨
    #[error("collector '{0}' closed")]
    Closed(String),
}

/// 탐지 엔진 에러
#[derive(Debug, thiserror::Error)]
pub enum DetectionError {
    /// 탐지 규칙 에러
    #[error("rule error: {0}")]
    Rule(String),

    /// 규칙 평가 실패
    #[error("rule '{rule_id}' evaluation failed: {reason}")]
    Evaluation { rule_id: String, reason: String },
}

/// 위협 인텔리전스 에러
#[derive(Debug, thiserror::Error)]
pub enum ThreatIntelError {
    /// 조회 실패
    #[error("lookup failed for '{ip}': {reason}")]
    Lookup { ip: String, reason: String },

    /// 캐시 영속화 실패
    #[error("cache persistence failed: {0}")]
    Cache(String),

    /// 차단 목록 갱신 실패
    #[error("blocklist '{name}' refresh failed: {reason}")]
    Blocklist { name: String, reason: String },
}

/// 파싱 에러
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    /// 지원하지 않는 형식
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    /// 파싱 실패
    #[error("parse failed at offset {offset}: {reason}")]
    Failed { offset: usize, reason: String },

    /// 입력 데이터 초과
    #[error("input too large: {size} bytes (max: {max})")]
    TooLarge { size: usize, max: usize },
}

/// 스토리지 에러
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// 쓰기 실패
    #[error("write failed: {0}")]
    Write(String),

    /// 보존 정리 실패
    #[error("retention purge failed: {0}")]
    Purge(String),

    /// 시간 초과
    #[error("operation timed out after {secs}s")]
    Timeout { secs: u64 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_converts_into_top_level() {
        let err: LogwardenError = ConfigError::InvalidValue {
            field: "detection.anomaly_threshold".to_owned(),
            reason: "must be greater than 0".to_owned(),
        }
        .into();
        assert!(matches!(err, LogwardenError::Config(_)));
        assert!(err.to_string().contains("detection.anomaly_threshold"));
    }

    #[test]
    fn detection_error_display_includes_rule_id() {
        let err = DetectionError::Evaluation {
            rule_id: "CORR-001".to_owned(),
            reason: "bad window".to_owned(),
        };
        assert_eq!(
            err.to_string(),
            "rule 'CORR-001' evaluation failed: bad window"
        );
    }

    #[test]
    fn io_error_converts_into_top_level() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: LogwardenError = io.into();
        assert!(matches!(err, LogwardenError::Io(_)));
    }

    #[test]
    fn storage_timeout_display() {
        let err = StorageError::Timeout { secs: 10 };
        assert_eq!(err.to_string(), "operation timed out after 10s");
    }
}
