//! 위협 인텔리전스 에러 타입
//!
//! [`IntelError`]는 `From<IntelError> for LogwardenError` 변환을 제공하므로
//! 데몬에서 `?`로 전파할 수 있습니다.

use logwarden_core::error::{ConfigError, LogwardenError, ThreatIntelError};

/// 위협 인텔리전스 도메인 에러
#[derive(Debug, thiserror::Error)]
pub enum IntelError {
    /// IP 주소로 해석할 수 없는 입력
    #[error("invalid ip address: '{0}'")]
    InvalidIp(String),

    /// 차단 목록 다운로드 실패
    #[error("fetch failed for blocklist '{name}': {reason}")]
    Fetch {
        /// 차단 목록 파일 이름
        name: String,
        /// 실패 사유
        reason: String,
    },

    /// 차단 목록 파일 처리 실패
    #[error("blocklist '{name}': {reason}")]
    Blocklist {
        /// 차단 목록 파일 이름
        name: String,
        /// 실패 사유
        reason: String,
    },

    /// 캐시 영속화 실패
    #[error("cache error: {0}")]
    Cache(String),

    /// 설정 에러
    #[error("config error: {field}: {reason}")]
    Config {
        /// 설정 필드명
        field: String,
        /// 에러 사유
        reason: String,
    },

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON 직렬화 에러
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<IntelError> for LogwardenError {
    fn from(err: IntelError) -> Self {
        match err {
            IntelError::InvalidIp(ip) => LogwardenError::ThreatIntel(ThreatIntelError::Lookup {
                ip,
                reason: "not an ip address".to_owned(),
            }),
            IntelError::Fetch { name, reason } | IntelError::Blocklist { name, reason } => {
                LogwardenError::ThreatIntel(ThreatIntelError::Blocklist { name, reason })
            }
            IntelError::Cache(reason) => {
                LogwardenError::ThreatIntel(ThreatIntelError::Cache(reason))
            }
            IntelError::Json(e) => LogwardenError::ThreatIntel(ThreatIntelError::Cache(e.to_string())),
            IntelError::Config { field, reason } => {
                LogwardenError::Config(ConfigError::InvalidValue { field, reason })
            }
            IntelError::Io(e) => LogwardenError::Io(e),
        }
    }
}
