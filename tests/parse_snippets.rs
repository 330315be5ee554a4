use zap2zerolog::parse_source;
use zap2zerolog::printer::print_program;

fn assert_parses(src: &str) {
    if let Err(f) = parse_source(src) {
        panic!("expected parse ok, got diagnostics: {:#?}", f.diags);
    }
}

/// Printing a parsed file and parsing the output again must give the same text.
fn assert_reprint_stable(src: &str) {
    let first = print_program(&parse_source(src).expect("parse source"));
    let second = print_program(&parse_source(&first).expect("parse reprint"));
    pretty_assertions::assert_eq!(first, second);
}

const DECLS: &str = r#"
package main

import (
	"fmt"
	. "math"
	_ "net/http"
	uzap "go.uber.org/zap"
)

const (
	A = iota
	B int = 2
)

var (
	x = 1
	y, z int
)

type (
	T = int
	U[T any] struct {
		F T `json:"f"`
	}
	V interface {
		M(x int) int
		~int | ~string
	}
)

func main() {
	fmt.Println(Sqrt(4))
	_ = uzap.String
}
"#;

const STATEMENTS: &str = r#"
package p

func f(x int, ch chan int) (n int, err error) {
	if x < 0 {
		return -x, nil
	} else if x == 0 {
		return
	}
	for i := 0; i < 10; i++ {
		if i == 5 {
			break
		}
		continue
	}
	for range []int{1, 2, 3} {
	}
	for k, v := range map[string]int{"a": 1} {
		_, _ = k, v
	}
outer:
	for {
		break outer
	}
	switch y := x; y {
	case 0, 1:
		x++
		fallthrough
	default:
		x = 3
	}
	switch v := any(x).(type) {
	case int, string:
		_ = v
	}
	select {
	case ch <- x:
		return x, nil
	case v, ok := <-ch:
		_, _ = v, ok
	default:
	}
	go func() { ch <- 1 }()
	defer close(ch)
	var local = struct{ A int }{A: 1}
	_ = local
	return 0, nil
}
"#;

const EXPRESSIONS: &str = r#"
package p

func f[T comparable](a, b, c int, ch <-chan int, xs ...T) {
	_ = a + b*c - (a << 2)
	_ = a == b || a < c && b <= c
	_ = &a
	_ = <-ch
	_ = []int{1, 2, 3}[0]
	_ = []int{1, 2, 3}[1:]
	_ = []int{1, 2, 3}[0:2:3]
	_ = map[string][]int{"a": {1}}["a"]
	_ = g[int, string](a)
	_ = h(xs...)
	_ = func(x int) int { return x }(a)
	_ = [...]string{"x"}
	_ = (*T)(nil)
}
"#;

#[test]
fn parses_imports_and_decls() {
    assert_parses(DECLS);
}

#[test]
fn parses_statements() {
    assert_parses(STATEMENTS);
}

#[test]
fn parses_expressions() {
    assert_parses(EXPRESSIONS);
}

#[test]
fn reprint_is_stable() {
    assert_reprint_stable(DECLS);
    assert_reprint_stable(STATEMENTS);
    assert_reprint_stable(EXPRESSIONS);
}

#[test]
fn rejects_broken_sources() {
    for src in [
        "package p\nfunc f( {\n",
        "func f() {}\n",
        "package p\nimport \"fmt\"\nimport \"fmt\"\n",
        "package p\nvar s = \"unterminated\n",
        "package p\n/* never closed\n",
    ] {
        assert!(parse_source(src).is_err(), "expected failure for {src:?}");
    }
}
