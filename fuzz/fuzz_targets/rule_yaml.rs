#![no_main]

use libfuzzer_sys::fuzz_target;
use logwarden_detection::{PredicateRegistry, RuleLoader, RuleRegistry};

fuzz_target!(|data: &[u8]| {
    let Ok(yaml_str) = std::str::from_utf8(data) else {
        return;
    };
    // 파싱에 성공한 규칙은 등록도 panic 없이 처리되어야 합니다.
    if let Ok(def) = RuleLoader::parse_yaml(yaml_str, "fuzz-input.yml") {
        let mut registry = RuleRegistry::new();
        let _ = registry.register_immediate(&def, &PredicateRegistry::with_builtins());
    }
});
