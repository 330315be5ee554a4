#![no_main]

use libfuzzer_sys::fuzz_target;
use zap2zerolog::lexer::{Lexer, Tok};

fuzz_target!(|data: &[u8]| {
    let s = String::from_utf8_lossy(data);

    let mut frontier = 0usize;
    let mut last_real_end = 0usize;
    let step_limit = s.len().saturating_mul(4) + 64;

    for (steps, (start, tok, end)) in Lexer::new(&s).enumerate() {
        assert!(start <= end && end <= s.len());
        if matches!(tok, Tok::Semi) && start == end {
            assert!(start >= frontier);
        } else {
            assert!(start >= last_real_end);
            last_real_end = end;
        }
        frontier = frontier.max(end);
        assert!(steps <= step_limit);
    }
});
