//! 메시지에서 IPv4 주소 추출

use std::sync::LazyLock;

use regex::Regex;

static IPV4: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\d{1,3}\.\d{1,3}\.\d{1,3}\.\d{1,3}").expect("IPv4 pattern is a valid regex")
});

/// 텍스트에 처음 나타나는 점 표기 IPv4 형태의 부분 문자열을 반환합니다.
///
/// 첫 번째 매치만 사용하며 옥텟 범위(0-255)는 검사하지 않습니다.
/// 예: `"999.1.1.1"`도 그대로 반환됩니다.
pub fn extract_first_ipv4(text: &str) -> Option<&str> {
    IPV4.find(text).map(|m| m.as_str())
}

/// 텍스트에 점 표기 IPv4 형태의 부분 문자열이 있는지 확인합니다.
pub fn contains_ipv4(text: &str) -> bool {
    IPV4.is_match(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn extracts_first_of_many() {
        let text = "Failed login from 10.0.0.5 via 192.168.1.1";
        assert_eq!(extract_first_ipv4(text), Some("10.0.0.5"));
    }

    #[test]
    fn no_address_returns_none() {
        assert_eq!(extract_first_ipv4("Failed login for root"), None);
        assert!(!contains_ipv4("version 1.2.3"));
    }

    #[test]
    fn octet_range_is_not_validated() {
        assert_eq!(extract_first_ipv4("host 999.1.1.1 up"), Some("999.1.1.1"));
    }

    #[test]
    fn overlong_octet_takes_trailing_digits() {
        // 앞쪽 숫자가 4자리이면 뒤쪽 3자리부터 매칭됩니다.
        assert_eq!(extract_first_ipv4("x1234.5.6.7"), Some("234.5.6.7"));
    }

    proptest! {
        #[test]
        fn embedded_address_is_found(a in 0u8..=255, b in 0u8..=255, c in 0u8..=255, d in 0u8..=255,
                                     prefix in "[a-z ]{0,20}", suffix in "[a-z ]{0,20}") {
            let ip = format!("{a}.{b}.{c}.{d}");
            let text = format!("{prefix} {ip} {suffix}");
            prop_assert_eq!(extract_first_ipv4(&text), Some(ip.as_str()));
        }

        #[test]
        fn digit_free_text_has_no_address(text in "[a-zA-Z .:/-]{0,64}") {
            prop_assert_eq!(extract_first_ipv4(&text), None);
        }
    }
}
