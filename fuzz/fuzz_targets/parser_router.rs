#![no_main]

use libfuzzer_sys::fuzz_target;
use logwarden_core::types::RawRecord;
use logwarden_detection::ParserRouter;

// normalize는 어떤 입력에도 실패하지 않아야 합니다.
fuzz_target!(|data: &[u8]| {
    let router = ParserRouter::with_defaults("default");
    for hint in ["default", "syslog", "apache", "json"] {
        let record = RawRecord::new(data.to_vec(), "fuzz").with_format_hint(hint);
        let event = router.normalize(&record);
        assert_eq!(event.source, "fuzz");
    }
});
