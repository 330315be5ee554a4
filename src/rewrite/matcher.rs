//! Recognition of source-API logger calls.

use crate::ast::{CallExpr, Expr, ExprKind, Span};
use crate::config::{Config, LoggerScope};

/// A matched `<accessor>.<Level>(message, fields...)` call.
#[derive(Debug, Clone, Copy)]
pub struct LogCall<'a> {
    /// Source level method name.
    pub level: &'a str,
    pub message: &'a Expr,
    /// Field arguments in call order.
    pub fields: &'a [Expr],
    /// Span of the whole call.
    pub span: Span,
}

/// Logger context of the function being rewritten.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Scope<'a> {
    /// Bound receiver name, when the logger is reached through the receiver.
    pub receiver: Option<&'a str>,
}

impl<'a> Scope<'a> {
    pub const GLOBAL: Scope<'static> = Scope { receiver: None };

    pub fn receiver(name: &'a str) -> Self {
        Scope {
            receiver: Some(name),
        }
    }

    /// Same scope, with the receiver hidden.
    pub fn without_receiver(self) -> Scope<'a> {
        Scope { receiver: None }
    }
}

/// True when `x` is the configured source accessor (`utils.Logger`).
pub fn is_source_accessor(x: &Expr, cfg: &Config) -> bool {
    x.is_qualified(&cfg.source.accessor_package, &cfg.source.accessor_name)
}

/// `<source accessor>.<Level>(..)` regardless of scope: the level name.
pub fn source_call_level<'a>(call: &'a CallExpr, cfg: &Config) -> Option<&'a str> {
    let (base, level) = call.fun.as_selector()?;
    (cfg.target_level(level).is_some() && is_source_accessor(base, cfg)).then_some(level)
}

/// Matches `call` against the source idiom.
///
/// The callee must select a configured level on exactly the logger accessor, and there
/// must be at least a message argument. Spread calls (`Info(args...)`) never match.
pub fn match_log_call<'a>(
    call: &'a CallExpr,
    span: Span,
    scope: Scope<'_>,
    cfg: &Config,
) -> Option<LogCall<'a>> {
    let level = source_call_level(call, cfg)?;
    if cfg.scope == LoggerScope::Receiver && scope.receiver.is_none() {
        return None;
    }
    if call.ellipsis {
        return None;
    }
    let (message, fields) = call.args.split_first()?;
    Some(LogCall {
        level,
        message,
        fields,
        span,
    })
}

/// `<expr>.Error()` with no arguments: the receiver expression.
pub fn error_message_operand(message: &Expr) -> Option<&Expr> {
    let ExprKind::Call(call) = &message.kind else {
        return None;
    };
    if !call.args.is_empty() || call.ellipsis {
        return None;
    }
    match call.fun.as_selector() {
        Some((x, "Error")) => Some(x),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Expr;

    fn call_of(e: &Expr) -> &CallExpr {
        e.as_call().expect("call")
    }

    fn logger_call(base: Expr, level: &str, args: Vec<Expr>) -> Expr {
        Expr::method_call(base, level, args)
    }

    fn utils_logger() -> Expr {
        Expr::selector(Expr::ident("utils"), "Logger")
    }

    #[test]
    fn matches_global_accessor_with_message() {
        let cfg = Config::default();
        let e = logger_call(
            utils_logger(),
            "Info",
            vec![Expr::string_lit("hi"), Expr::ident("f")],
        );
        let m = match_log_call(call_of(&e), e.span, Scope::GLOBAL, &cfg).expect("match");
        assert_eq!(m.level, "Info");
        assert_eq!(m.fields.len(), 1);
    }

    #[test]
    fn rejects_no_args_unknown_level_and_other_bases() {
        let cfg = Config::default();
        let no_args = logger_call(utils_logger(), "Info", vec![]);
        assert!(match_log_call(call_of(&no_args), no_args.span, Scope::GLOBAL, &cfg).is_none());

        let sync = logger_call(utils_logger(), "Sync", vec![Expr::string_lit("x")]);
        assert!(match_log_call(call_of(&sync), sync.span, Scope::GLOBAL, &cfg).is_none());

        let other = logger_call(
            Expr::selector(Expr::ident("other"), "Logger"),
            "Info",
            vec![Expr::string_lit("x")],
        );
        assert!(match_log_call(call_of(&other), other.span, Scope::GLOBAL, &cfg).is_none());

        let bare = logger_call(Expr::ident("Logger"), "Info", vec![Expr::string_lit("x")]);
        assert!(match_log_call(call_of(&bare), bare.span, Scope::GLOBAL, &cfg).is_none());
    }

    #[test]
    fn receiver_scope_reads_the_source_accessor_where_a_receiver_is_bound() {
        let cfg = Config::default().with_scope(LoggerScope::Receiver);
        let e = logger_call(utils_logger(), "Warn", vec![Expr::string_lit("x")]);
        let call = call_of(&e);
        assert!(match_log_call(call, e.span, Scope::receiver("s"), &cfg).is_some());
        assert!(match_log_call(call, e.span, Scope::GLOBAL, &cfg).is_none());
        assert_eq!(source_call_level(call, &cfg), Some("Warn"));

        let through_field = logger_call(
            Expr::selector(Expr::ident("s"), "logger"),
            "Warn",
            vec![Expr::string_lit("x")],
        );
        assert!(
            match_log_call(call_of(&through_field), through_field.span, Scope::receiver("s"), &cfg)
                .is_none()
        );
    }

    #[test]
    fn error_message_operand_requires_empty_call() {
        let ok = Expr::method_call(Expr::ident("err"), "Error", vec![]);
        assert_eq!(error_message_operand(&ok).and_then(Expr::as_ident), Some("err"));

        let with_arg = Expr::method_call(Expr::ident("err"), "Error", vec![Expr::ident("x")]);
        assert!(error_message_operand(&with_arg).is_none());
        assert!(error_message_operand(&Expr::string_lit("boom")).is_none());
    }
}
