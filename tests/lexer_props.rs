use proptest::prelude::*;
use zap2zerolog::lexer::{Lexer, Tok};
use zap2zerolog::parse_source;

/// Fragments that combine into token soup close to Go.
fn go_fragment() -> impl Strategy<Value = &'static str> {
    prop::sample::select(vec![
        "package p\n", "func ", "f", "(", ")", "{", "}", "[", "]", "\n", " ", "\t", ":=", "=",
        "utils.Logger.Info", "zap.String", "\"msg\"", "`raw`", "'x'", "0x1F", "1.5e3", "2i",
        ",", ".", "...", "if ", "for ", "range ", "return", "go ", "defer ", "<-", "/* c */",
        "// c\n", "/* a\nb */", "x", "err", ".Error()", "struct", "interface", "map", "chan",
    ])
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256,
        .. ProptestConfig::default()
    })]

    #[test]
    fn lexer_spans_stay_in_bounds_and_advance(s in ".*") {
        let mut frontier = 0usize;
        let mut last_real_end = 0usize;
        let step_limit = s.len().saturating_mul(4) + 64;

        for (steps, (start, tok, end)) in Lexer::new(&s).enumerate() {
            prop_assert!(start <= end && end <= s.len(), "bad span {start}..{end} for {tok:?} in {s:?}");

            if matches!(tok, Tok::Semi) && start == end {
                prop_assert!(start >= frontier, "inserted `;` at {start} behind {frontier} in {s:?}");
            } else {
                prop_assert!(start >= last_real_end, "token at {start} overlaps {last_real_end} in {s:?}");
                last_real_end = end;
            }
            frontier = frontier.max(end);
            prop_assert!(steps <= step_limit, "lexer does not terminate on {s:?}");
        }
    }

    #[test]
    fn newline_after_identifier_ends_the_statement(name in "[a-z][a-z0-9_]{0,8}") {
        prop_assume!(!matches!(
            name.as_str(),
            "break" | "case" | "chan" | "const" | "continue" | "default" | "defer" | "else"
                | "fallthrough" | "for" | "func" | "go" | "goto" | "if" | "import" | "interface"
                | "map" | "package" | "range" | "return" | "select" | "struct" | "switch" | "type"
                | "var"
        ));
        let src = format!("{name}\n");
        let toks: Vec<_> = Lexer::new(&src).map(|(_, t, _)| t).collect();
        prop_assert_eq!(toks, vec![Tok::Ident(name.as_str()), Tok::Semi]);
    }

    #[test]
    fn parser_never_panics_on_token_soup(parts in prop::collection::vec(go_fragment(), 0..40)) {
        let src: String = parts.concat();
        let _ = parse_source(&src);
    }
}
