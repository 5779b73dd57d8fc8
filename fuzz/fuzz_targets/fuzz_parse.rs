#![no_main]

use alps_core::SourceFormat;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    for hint in [None, Some(SourceFormat::Json), Some(SourceFormat::Xml)] {
        let _ = alps_parser::parse(text, hint);
        let _ = alps_validate::validate_source(text, hint);
    }
});
