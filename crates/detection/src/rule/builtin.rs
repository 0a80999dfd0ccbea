//! 내장 단일 이벤트 규칙
//!
//! 권한 상승, 민감 파일 접근, 데이터 유출 판별식과 그 규칙 정의입니다.
//! 판별식은 메시지 문자열만 검사합니다.

use logwarden_core::types::{Event, Severity};

use super::types::{RuleDefinition, RuleMeta};
use crate::extract::contains_ipv4;

/// 권한 상승 판별식 이름
pub const PRIVILEGE_ESCALATION: &str = "privilege_escalation";
/// 민감 파일 접근 판별식 이름
pub const SENSITIVE_FILE_ACCESS: &str = "sensitive_file_access";
/// 데이터 유출 판별식 이름
pub const DATA_EXFILTRATION: &str = "data_exfiltration";

const SENSITIVE_FILES: &[&str] = &[
    "/etc/passwd",
    "/etc/shadow",
    "/etc/sudoers",
    "/etc/ssh",
    "/.ssh/id_rsa",
    ".bash_history",
];

const FILE_ACTIONS: &[&str] = &["access", "read", "modified"];

const TRANSFER_WORDS: &[&str] = &["transfer", "download", "upload"];

const SIZE_UNITS: &[&str] = &["gb", "mb"];

/// `sudo su`, `sudo -i`, `sudo bash`, 또는 `sudo`와 `chmod 777`/`chown root`의 조합
pub fn privilege_escalation(event: &Event) -> Option<String> {
    let message = event.message.to_lowercase();
    let direct = ["sudo su", "sudo -i", "sudo bash"]
        .iter()
        .any(|p| message.contains(p));
    let sudo_combo = message.contains("sudo")
        && (message.contains("chmod 777") || message.contains("chown root"));

    (direct || sudo_combo).then(|| "Potential privilege escalation detected".to_owned())
}

/// 민감 파일 경로(대소문자 구분)와 접근 동사(대소문자 무시)의 조합
pub fn sensitive_file_access(event: &Event) -> Option<String> {
    let lowered = event.message.to_lowercase();
    if !FILE_ACTIONS.iter().any(|a| lowered.contains(a)) {
        return None;
    }
    SENSITIVE_FILES
        .iter()
        .find(|file| event.message.contains(*file))
        .map(|file| format!("Sensitive file access detected: {file}"))
}

/// 전송 동사, 크기 단위, 점 표기 IPv4가 모두 있는 메시지
pub fn data_exfiltration(event: &Event) -> Option<String> {
    let message = event.message.to_lowercase();
    let transfer = TRANSFER_WORDS.iter().any(|w| message.contains(w));
    let sized = SIZE_UNITS.iter().any(|u| message.contains(u));

    (transfer && sized && contains_ipv4(&message))
        .then(|| "Potential data exfiltration detected".to_owned())
}

/// 내장 규칙 정의 (등록 순서대로)
pub fn builtin_definitions() -> Vec<RuleDefinition> {
    vec![
        RuleDefinition::predicate(
            RuleMeta::new(
                "RULE-001",
                PRIVILEGE_ESCALATION,
                "Detects potential privilege escalation attempts",
                Severity::High,
            ),
            PRIVILEGE_ESCALATION,
        ),
        RuleDefinition::predicate(
            RuleMeta::new(
                "RULE-002",
                SENSITIVE_FILE_ACCESS,
                "Detects access to sensitive system files",
                Severity::Medium,
            ),
            SENSITIVE_FILE_ACCESS,
        ),
        RuleDefinition::predicate(
            RuleMeta::new(
                "RULE-003",
                DATA_EXFILTRATION,
                "Detects potential data exfiltration",
                Severity::Critical,
            ),
            DATA_EXFILTRATION,
        ),
    ]
}
