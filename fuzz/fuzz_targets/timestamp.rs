#![no_main]

use libfuzzer_sys::fuzz_target;
use logwarden_detection::parser::timestamp;

// 정규화 결과를 다시 정규화하면 같은 값이어야 합니다.
fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    if let Some(normalized) = timestamp::normalize(text) {
        if let Some(again) = timestamp::normalize(&normalized) {
            assert_eq!(again, normalized);
        }
    }
});
