#![no_main]

use libfuzzer_sys::fuzz_target;
use zap2zerolog::{parse_source, transform_source, Config};

// Whatever parses must transform into text that parses again, and a second pass is a no-op.
fuzz_target!(|data: &[u8]| {
    let Ok(src) = std::str::from_utf8(data) else {
        return;
    };
    let cfg = Config::default();
    let Ok(once) = transform_source(src, &cfg) else {
        return;
    };
    if !once.changed {
        return;
    }
    assert!(parse_source(&once.output).is_ok());
    let twice = transform_source(&once.output, &cfg).expect("second pass");
    assert!(!twice.changed);
});
