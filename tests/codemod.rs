use pretty_assertions::assert_eq;
use zap2zerolog::{transform_source, Config, DiagKind, ErrorPolicy, LoggerScope};

fn run(src: &str) -> String {
    run_with(src, &Config::default())
}

fn run_with(src: &str, cfg: &Config) -> String {
    transform_source(src, cfg)
        .unwrap_or_else(|e| panic!("transform failed: {e}"))
        .output
}

#[test]
fn rewrites_calls_and_swaps_imports() {
    let src = r#"package handlers

import (
	"net/http"

	"go.uber.org/zap"

	"example.com/app/utils"
)

func Get(w http.ResponseWriter, r *http.Request) {
	id := r.URL.Query().Get("id")
	utils.Logger.Info("get item", zap.String("id", id), zap.Int("attempt", 1))
	if err := load(id); err != nil {
		utils.Logger.Error("load failed", zap.Error(err))
		return
	}
}
"#;
    let want = r#"package handlers

import (
	"net/http"
	"example.com/app/utils"
	"github.com/rs/zerolog"
	"github.com/pkg/errors"
)

func Get(w http.ResponseWriter, r *http.Request) {
	id := r.URL.Query().Get("id")
	logger.Info().Str("id", id).Int("attempt", 1).Msg("get item")
	if err := load(id); err != nil {
		logger.Error().Err(errors.Wrap(err, "from error")).Msg("load failed")
		return
	}
}
"#;
    assert_eq!(run(src), want);
}

#[test]
fn second_run_changes_nothing() {
    let src = r#"package p

import "go.uber.org/zap"

func f(err error, n int) {
	utils.Logger.Warn(err.Error(), zap.Int("n", n))
	utils.Logger.Debug("plain")
}
"#;
    let cfg = Config::default();
    let once = transform_source(src, &cfg).unwrap();
    assert!(once.changed);
    let twice = transform_source(&once.output, &cfg).unwrap();
    assert!(!twice.changed);
    assert_eq!(twice.output, once.output);
}

#[test]
fn unrelated_code_is_left_alone() {
    let src = r#"package p

import (
	"log"

	"go.uber.org/zap"
)

// Logger calls through other receivers are not ours.
func f(l *zap.Logger) {
	log.Println("std")
	l.Info("direct", zap.String("k", "v"))
	other.Logger.Info("other package")
	utils.Logger.Sync()
	utils.Logger.Info()
}
"#;
    let t = transform_source(src, &Config::default()).unwrap();
    assert!(!t.changed);
    assert_eq!(t.output, src);
}

#[test]
fn message_expression_is_kept_verbatim() {
    let src = r#"package p

func f(name string) {
	utils.Logger.Info(fmt.Sprintf("hello %s", name) + "!")
	utils.Logger.Info(`raw
message`)
}
"#;
    let want = r#"package p

import (
	"github.com/rs/zerolog"
)

func f(name string) {
	logger.Info().Msg(fmt.Sprintf("hello %s", name) + "!")
	logger.Info().Msg(`raw
message`)
}
"#;
    assert_eq!(run(src), want);
}

#[test]
fn error_message_becomes_wrapped_err_field() {
    let src = r#"package p

import "go.uber.org/zap"

func f(err error) {
	utils.Logger.Error(err.Error())
	utils.Logger.Fatal(wrap(err).Error(), zap.Bool("retry", false))
}
"#;
    let out = run(src);
    assert!(out.contains(r#"logger.Error().Err(errors.Wrap(err, "from error")).Msg("")"#));
    assert!(out.contains(
        r#"logger.Fatal().Bool("retry", false).Err(errors.Wrap(wrap(err), "from error")).Msg("")"#
    ));
    assert!(out.contains("\"github.com/pkg/errors\""));
}

#[test]
fn unknown_field_kind_is_skipped_with_diagnostic() {
    let src = r#"package p

import "go.uber.org/zap"

func f(v any) {
	utils.Logger.Info("m", zap.Reflect("v", v), zap.String("k", "x"))
}
"#;
    let t = transform_source(src, &Config::default()).unwrap();
    assert!(t.output.contains(r#"logger.Info().Str("k", "x").Msg("m")"#));
    assert_eq!(t.diagnostics.len(), 1);
    assert_eq!(t.diagnostics[0].kind, DiagKind::UnknownField);
    // nothing refers to zap any more
    assert!(!t.output.contains("go.uber.org/zap"));
}

#[test]
fn zap_import_survives_remaining_references() {
    let src = r#"package p

import "go.uber.org/zap"

var fields = []zap.Field{zap.String("k", "v")}

func f() {
	utils.Logger.Info("m", zap.Int("n", 1))
}
"#;
    let out = run(src);
    assert!(out.contains("\"go.uber.org/zap\""));
    assert!(out.contains("\"github.com/rs/zerolog\""));
    assert_eq!(out.matches("github.com/rs/zerolog").count(), 1);
}

#[test]
fn aliased_zap_and_std_errors_are_respected() {
    let src = r#"package p

import (
	"errors"

	uzap "go.uber.org/zap"
)

var errBoom = errors.New("boom")

func f() {
	utils.Logger.Error("boom", uzap.Error(errBoom))
}
"#;
    let want = r#"package p

import (
	"errors"
	"github.com/rs/zerolog"
	pkgerrors "github.com/pkg/errors"
)

var errBoom = errors.New("boom")

func f() {
	logger.Error().Err(pkgerrors.Wrap(errBoom, "from error")).Msg("boom")
}
"#;
    assert_eq!(run(src), want);
}

#[test]
fn lenient_policy_skips_malformed_fields_strict_aborts() {
    let src = r#"package p

import "go.uber.org/zap"

func f(extra zap.Field) {
	utils.Logger.Info("m", extra, zap.Int("n", 1))
}
"#;
    let t = transform_source(src, &Config::default()).unwrap();
    assert!(t.output.contains(r#"logger.Info().Int("n", 1).Msg("m")"#));
    assert_eq!(t.diagnostics[0].kind, DiagKind::MalformedField);

    let strict = Config::default().with_policy(ErrorPolicy::Strict);
    assert!(transform_source(src, &strict).is_err());
}

#[test]
fn receiver_scope_rewrites_through_the_receiver() {
    let src = r#"package svc

import (
	"go.uber.org/zap"

	"example.com/app/utils"
)

type Service struct {
	logger *zap.Logger
}

func (s *Service) Run(n int) {
	utils.Logger.Info("running", zap.Int("n", n))
	go func() {
		utils.Logger.Debug("async")
	}()
}

func (*Service) Stop() {
	utils.Logger.Info("stop")
}

func helper() {
	utils.Logger.Warn("free function")
}
"#;
    let cfg = Config::default().with_scope(LoggerScope::Receiver);
    let t = transform_source(src, &cfg).unwrap();
    assert_eq!(t.rewrites, 2);
    assert!(t.output.contains(r#"s.logger.Info().Int("n", n).Msg("running")"#));
    assert!(t.output.contains(r#"s.logger.Debug().Msg("async")"#));
    assert!(t.output.contains(r#"utils.Logger.Info("stop")"#));
    assert!(t.output.contains(r#"utils.Logger.Warn("free function")"#));
    let skipped = t
        .diagnostics
        .iter()
        .filter(|d| d.kind == DiagKind::SkippedFunction)
        .count();
    assert_eq!(skipped, 2);
    // the struct field still refers to zap
    assert!(t.output.contains("\"go.uber.org/zap\""));
}

#[test]
fn receiver_scope_migrates_the_global_accessor_in_a_method() {
    let src = "package p\n\nimport \"go.uber.org/zap\"\n\nfunc (s *S) f() {\n\tutils.Logger.Info(\"a\", zap.String(\"k\", v))\n}\n";
    let cfg = Config::default().with_scope(LoggerScope::Receiver);
    let t = transform_source(src, &cfg).unwrap();
    assert!(t.changed);
    assert_eq!(t.rewrites, 1);
    assert_eq!(
        t.output,
        "package p\n\nimport \"github.com/rs/zerolog\"\n\nfunc (s *S) f() {\n\ts.logger.Info().Str(\"k\", v).Msg(\"a\")\n}\n"
    );
}

#[test]
fn comments_outside_rewritten_calls_are_preserved() {
    let src = r#"package p

import (
	// zap is going away
	"go.uber.org/zap"
)

/*
Package-level docs.
*/

// f logs.
func f() {
	// before
	utils.Logger.Info("m", zap.String("a", "b")) // after
	/* inline */ g()
}
"#;
    let out = run(src);
    assert!(out.contains("/*\nPackage-level docs.\n*/"));
    assert!(out.contains("// f logs.\nfunc f() {\n\t// before\n"));
    assert!(out.contains(r#"logger.Info().Str("a", "b").Msg("m") // after"#));
    assert!(out.contains("/* inline */ g()"));
}
