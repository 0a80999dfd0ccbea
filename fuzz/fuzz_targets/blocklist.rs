#![no_main]

use libfuzzer_sys::fuzz_target;
use logwarden_detection::extract_first_ipv4;
use logwarden_threat_intel::BlocklistFormat;
use logwarden_threat_intel::cidr::parse_drop_list;

fuzz_target!(|data: &[u8]| {
    let text = String::from_utf8_lossy(data);
    let _ = parse_drop_list(&text);
    let _ = BlocklistFormat::ExitAddress.transform(&text);
    if let Some(ip) = extract_first_ipv4(&text) {
        assert!(text.contains(ip));
    }
});
