//! Construction of the replacement call chain.

use tracing::{debug, warn};

use super::matcher::{error_message_operand, LogCall, Scope};
use super::RewriteCtx;
use crate::ast::{CallExpr, Expr, ExprKind};
use crate::config::{Config, ErrorPolicy};
use crate::error::{Diag, DiagKind, RewriteError};

/// The logger the chain starts from: a free identifier, or `<receiver>.<field>`.
pub fn target_accessor(scope: Scope<'_>, cfg: &Config) -> Expr {
    match scope.receiver {
        Some(recv) => Expr::selector(Expr::ident(recv), cfg.target.receiver_field.as_str()),
        None => Expr::ident(cfg.target.logger_ident.as_str()),
    }
}

/// `<wrap ns>.<Wrap>(arg, "<message>")`
fn wrap_error(arg: Expr, ctx: &mut RewriteCtx<'_>) -> Expr {
    ctx.wrap_used = true;
    let cfg = ctx.cfg;
    Expr::call(
        ctx.namespaces.wrap.member(&cfg.wrap.function),
        vec![arg, Expr::string_lit(&cfg.wrap.message)],
    )
}

fn chain_call(acc: Expr, method: &str, args: Vec<Expr>, ellipsis: bool) -> Expr {
    Expr::detached(ExprKind::Call(CallExpr {
        fun: Box::new(Expr::selector(acc, method)),
        args,
        ellipsis,
    }))
}

/// One converted field: the target method and its arguments.
struct FieldCall<'c> {
    method: &'c str,
    args: Vec<Expr>,
    ellipsis: bool,
}

/// Converts one field argument. `Ok(None)` means the field was dropped.
fn convert_field<'c>(
    field: &Expr,
    ctx: &mut RewriteCtx<'c>,
) -> Result<Option<FieldCall<'c>>, RewriteError> {
    let cfg = ctx.cfg;
    let ExprKind::Call(ctor) = &field.kind else {
        return Err(RewriteError::FieldNotCall { span: field.span });
    };
    let Some(kind) = ctx.namespaces.fields.member_name(&ctor.fun) else {
        return Err(RewriteError::FieldNotFromNamespace {
            span: field.span,
            namespace: ctx.namespaces.fields.to_string(),
        });
    };

    let Some(method) = cfg.target_field(kind) else {
        warn!(kind, "unsupported field constructor, leaving it out of the chain");
        ctx.diagnostics.push(Diag::new(
            DiagKind::UnknownField,
            field.span,
            format!("no target method for field constructor `{kind}`; field dropped"),
        ));
        return Ok(None);
    };

    if method == cfg.target.error_method {
        if ctor.args.len() != 1 || ctor.ellipsis {
            return Err(RewriteError::ErrorFieldArity {
                span: field.span,
                namespace: ctx.namespaces.fields.to_string(),
                kind: kind.to_string(),
                found: ctor.args.len(),
            });
        }
        let wrapped = wrap_error(ctor.args[0].clone(), ctx);
        return Ok(Some(FieldCall {
            method,
            args: vec![wrapped],
            ellipsis: false,
        }));
    }

    Ok(Some(FieldCall {
        method,
        args: ctor.args.clone(),
        ellipsis: ctor.ellipsis,
    }))
}

/// Builds the fluent chain replacing `call`.
///
/// Field arguments are converted left to right. Unknown constructors are dropped with a
/// diagnostic. Shape violations are dropped with a diagnostic under the lenient policy and
/// returned as errors under the strict one. Nothing is spliced here; the caller replaces the
/// original call with the returned expression.
pub fn build_replacement(
    call: &LogCall<'_>,
    scope: Scope<'_>,
    ctx: &mut RewriteCtx<'_>,
) -> Result<Expr, RewriteError> {
    let cfg = ctx.cfg;
    let level = cfg.target_level(call.level).unwrap_or(call.level);
    let mut acc = chain_call(target_accessor(scope, cfg), level, Vec::new(), false);

    for field in call.fields {
        match convert_field(field, ctx) {
            Ok(Some(fc)) => acc = chain_call(acc, fc.method, fc.args, fc.ellipsis),
            Ok(None) => {}
            Err(err) => match cfg.policy {
                ErrorPolicy::Strict => return Err(err),
                ErrorPolicy::Lenient => {
                    debug!(%err, "skipping malformed field");
                    ctx.diagnostics.push(err.diag());
                }
            },
        }
    }

    let message = match error_message_operand(call.message) {
        Some(operand) => {
            let wrapped = wrap_error(operand.clone(), ctx);
            acc = chain_call(acc, &cfg.target.error_method, vec![wrapped], false);
            Expr::string_lit("")
        }
        None => call.message.clone(),
    };

    Ok(chain_call(acc, &cfg.target.message_method, vec![message], false))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Decl, StmtKind};
    use crate::config::LoggerScope;
    use crate::imports::resolve_namespaces;
    use crate::parser::parse_source;
    use crate::printer::expr_to_string;
    use crate::rewrite::matcher::match_log_call;
    use pretty_assertions::assert_eq;

    /// Builds the replacement for the first statement of the first function in `body`.
    fn rebuild(body: &str, cfg: &Config) -> (Result<String, RewriteError>, Vec<Diag>) {
        let src = format!(
            "package p\n\nimport \"go.uber.org/zap\"\n\nfunc (s *S) f() {{\n\t{body}\n}}\n"
        );
        let program = parse_source(&src).expect("parse");
        let mut ctx = RewriteCtx::new(cfg, resolve_namespaces(&program, cfg));
        let func = program
            .decls
            .iter()
            .find_map(|d| match d {
                Decl::Func(f) => Some(f),
                _ => None,
            })
            .expect("func");
        let stmt = &func.body.as_ref().expect("body").stmts[0];
        let StmtKind::Expr(e) = &stmt.kind else {
            panic!("expected expression statement");
        };
        let scope = match cfg.scope {
            LoggerScope::Global => Scope::GLOBAL,
            LoggerScope::Receiver => Scope::receiver("s"),
        };
        let call = match_log_call(e.as_call().expect("call"), e.span, scope, cfg).expect("match");
        let out = build_replacement(&call, scope, &mut ctx).map(|e| expr_to_string(&e));
        (out, ctx.diagnostics)
    }

    #[test]
    fn fields_become_chained_methods_in_order() {
        let (out, diags) = rebuild(
            r#"utils.Logger.Info("started", zap.String("k", v), zap.Int("n", 3), zap.Duration("d", d))"#,
            &Config::default(),
        );
        assert_eq!(
            out.unwrap(),
            r#"logger.Info().Str("k", v).Int("n", 3).Dur("d", d).Msg("started")"#
        );
        assert!(diags.is_empty());
    }

    #[test]
    fn dpanic_maps_to_panic() {
        let (out, _) = rebuild(r#"utils.Logger.DPanic("x")"#, &Config::default());
        assert_eq!(out.unwrap(), r#"logger.Panic().Msg("x")"#);
    }

    #[test]
    fn error_field_is_wrapped() {
        let (out, _) = rebuild(
            r#"utils.Logger.Error("failed", zap.Error(err))"#,
            &Config::default(),
        );
        assert_eq!(
            out.unwrap(),
            r#"logger.Error().Err(errors.Wrap(err, "from error")).Msg("failed")"#
        );
    }

    #[test]
    fn error_message_moves_into_err_field() {
        let (out, _) = rebuild(
            r#"utils.Logger.Error(err.Error(), zap.String("id", id))"#,
            &Config::default(),
        );
        assert_eq!(
            out.unwrap(),
            r#"logger.Error().Str("id", id).Err(errors.Wrap(err, "from error")).Msg("")"#
        );
    }

    #[test]
    fn unknown_kind_is_dropped_with_diagnostic() {
        let (out, diags) = rebuild(
            r#"utils.Logger.Info("m", zap.Reflect("r", r), zap.Bool("ok", ok))"#,
            &Config::default(),
        );
        assert_eq!(out.unwrap(), r#"logger.Info().Bool("ok", ok).Msg("m")"#);
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].kind, DiagKind::UnknownField);
    }

    #[test]
    fn malformed_field_follows_policy() {
        let body = r#"utils.Logger.Info("m", fields, zap.Int("n", n))"#;
        let (out, diags) = rebuild(body, &Config::default());
        assert_eq!(out.unwrap(), r#"logger.Info().Int("n", n).Msg("m")"#);
        assert_eq!(diags[0].kind, DiagKind::MalformedField);

        let strict = Config::default().with_policy(ErrorPolicy::Strict);
        let (out, _) = rebuild(body, &strict);
        assert!(matches!(out, Err(RewriteError::FieldNotCall { .. })));
    }

    #[test]
    fn error_field_arity_is_a_shape_violation() {
        let strict = Config::default().with_policy(ErrorPolicy::Strict);
        let (out, _) = rebuild(r#"utils.Logger.Warn("m", zap.Error(a, b))"#, &strict);
        assert!(matches!(
            out,
            Err(RewriteError::ErrorFieldArity { found: 2, .. })
        ));
    }

    #[test]
    fn receiver_scope_starts_from_the_receiver_logger() {
        let cfg = Config::default().with_scope(LoggerScope::Receiver);
        let (out, _) = rebuild(r#"utils.Logger.Debug("tick", zap.Any("v", v))"#, &cfg);
        assert_eq!(out.unwrap(), r#"s.logger.Debug().Interface("v", v).Msg("tick")"#);
    }
}
