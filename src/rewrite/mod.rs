//! Rewriting of logger calls inside function bodies.
//!
//! The traversal is an exhaustive, mutable walk over statements and expressions. Calls are
//! handled post-order: callee and arguments first, then the call itself is matched and, on
//! a match, replaced by its chain. The replacement keeps the span of the call it replaced
//! while its callee is detached, which is how the renderer finds it again.

pub mod chain;
pub mod matcher;

use indexmap::IndexMap;
use tracing::debug;

use crate::ast::*;
use crate::config::{Config, LoggerScope};
use crate::error::{Diag, DiagKind, RewriteError};
use crate::imports::Namespaces;
use crate::walk::{Visitor, Walk};

pub use chain::build_replacement;
pub use matcher::{match_log_call, source_call_level, LogCall, Scope};

/// Per-file state shared by the rewrite passes.
#[derive(Debug)]
pub struct RewriteCtx<'c> {
    pub cfg: &'c Config,
    pub namespaces: Namespaces,
    /// Non-fatal findings, in the order they were made.
    pub diagnostics: Vec<Diag>,
    /// Set once a chain refers to the wrap helper.
    pub wrap_used: bool,
    /// Number of calls replaced so far.
    pub rewrites: usize,
}

impl<'c> RewriteCtx<'c> {
    pub fn new(cfg: &'c Config, namespaces: Namespaces) -> Self {
        Self {
            cfg,
            namespaces,
            diagnostics: Vec::new(),
            wrap_used: false,
            rewrites: 0,
        }
    }
}

// =============================================================================
// Pre-scans
// =============================================================================

/// Method declarations by index, with their usable receiver name.
///
/// An unnamed or blank receiver maps to `None`.
pub fn collect_receivers(program: &Program) -> IndexMap<usize, Option<String>> {
    program
        .decls
        .iter()
        .enumerate()
        .filter_map(|(idx, d)| match d {
            Decl::Func(f) if f.recv.is_some() => {
                let name = f
                    .receiver_name()
                    .filter(|n| !n.is_blank())
                    .map(|n| n.name.clone());
                Some((idx, name))
            }
            _ => None,
        })
        .collect()
}

/// Read-only search for a call the matcher accepts.
struct LogCallFinder<'s, 'c> {
    scope: Scope<'s>,
    cfg: &'c Config,
    found: bool,
}

impl<'ast> Visitor<'ast> for LogCallFinder<'_, '_> {
    fn visit_expr(&mut self, e: &'ast Expr) {
        if self.found {
            return;
        }
        if let ExprKind::Call(call) = &e.kind {
            if match_log_call(call, e.span, self.scope, self.cfg).is_some() {
                self.found = true;
                return;
            }
        }
        e.walk(self);
    }
}

/// True if `body` contains at least one call that would be rewritten in `scope`.
pub fn has_log_calls(body: &Block, scope: Scope<'_>, cfg: &Config) -> bool {
    let mut finder = LogCallFinder {
        scope,
        cfg,
        found: false,
    };
    finder.visit_block(body);
    finder.found
}

/// Finds a `<source accessor>.<Level>(..)` call, whatever the scope.
struct SourceCallFinder<'c> {
    cfg: &'c Config,
    found: bool,
}

impl<'ast> Visitor<'ast> for SourceCallFinder<'_> {
    fn visit_expr(&mut self, e: &'ast Expr) {
        if self.found {
            return;
        }
        if let ExprKind::Call(call) = &e.kind {
            if source_call_level(call, self.cfg).is_some() {
                self.found = true;
                return;
            }
        }
        e.walk(self);
    }
}

/// True if `body` calls the source accessor anywhere, matchable or not.
fn has_source_calls(body: &Block, cfg: &Config) -> bool {
    let mut finder = SourceCallFinder { cfg, found: false };
    finder.visit_block(body);
    finder.found
}

// =============================================================================
// Traversal
// =============================================================================

/// True if the signature of a function literal rebinds `name`.
fn rebinds(typ: &FuncType, name: &str) -> bool {
    typ.params.names().any(|n| n.name == name)
        || typ
            .results
            .as_ref()
            .is_some_and(|r| r.names().any(|n| n.name == name))
}

struct Rewriter<'r, 'c> {
    ctx: &'r mut RewriteCtx<'c>,
}

impl Rewriter<'_, '_> {
    fn block(&mut self, b: &mut Block, scope: Scope<'_>) -> Result<(), RewriteError> {
        self.stmts(&mut b.stmts, scope)
    }

    fn stmts(&mut self, list: &mut [Stmt], scope: Scope<'_>) -> Result<(), RewriteError> {
        for s in list {
            self.stmt(s, scope)?;
        }
        Ok(())
    }

    fn exprs(&mut self, list: &mut [Expr], scope: Scope<'_>) -> Result<(), RewriteError> {
        for e in list {
            self.expr(e, scope)?;
        }
        Ok(())
    }

    fn opt_expr(&mut self, e: &mut Option<Expr>, scope: Scope<'_>) -> Result<(), RewriteError> {
        match e {
            Some(e) => self.expr(e, scope),
            None => Ok(()),
        }
    }

    fn opt_boxed(
        &mut self,
        e: &mut Option<Box<Expr>>,
        scope: Scope<'_>,
    ) -> Result<(), RewriteError> {
        match e {
            Some(e) => self.expr(e, scope),
            None => Ok(()),
        }
    }

    fn opt_stmt(
        &mut self,
        s: &mut Option<Box<Stmt>>,
        scope: Scope<'_>,
    ) -> Result<(), RewriteError> {
        match s {
            Some(s) => self.stmt(s, scope),
            None => Ok(()),
        }
    }

    fn field_list(&mut self, l: &mut FieldList, scope: Scope<'_>) -> Result<(), RewriteError> {
        for f in &mut l.fields {
            self.expr(&mut f.typ, scope)?;
        }
        Ok(())
    }

    fn func_type(&mut self, t: &mut FuncType, scope: Scope<'_>) -> Result<(), RewriteError> {
        self.field_list(&mut t.params, scope)?;
        if let Some(results) = &mut t.results {
            self.field_list(results, scope)?;
        }
        Ok(())
    }

    fn gen_decl(&mut self, g: &mut GenDecl, scope: Scope<'_>) -> Result<(), RewriteError> {
        for spec in &mut g.specs {
            match spec {
                Spec::Value(vs) => {
                    self.opt_expr(&mut vs.typ, scope)?;
                    self.exprs(&mut vs.values, scope)?;
                }
                Spec::Type(ts) => {
                    if let Some(tp) = &mut ts.type_params {
                        self.field_list(tp, scope)?;
                    }
                    self.expr(&mut ts.typ, scope)?;
                }
            }
        }
        Ok(())
    }

    fn stmt(&mut self, s: &mut Stmt, scope: Scope<'_>) -> Result<(), RewriteError> {
        match &mut s.kind {
            StmtKind::Decl(g) => self.gen_decl(g, scope)?,
            StmtKind::Empty => {}
            StmtKind::Labeled { label: _, stmt } => self.stmt(stmt, scope)?,
            StmtKind::Expr(e) | StmtKind::Go(e) | StmtKind::Defer(e) => self.expr(e, scope)?,
            StmtKind::Send { chan, value } => {
                self.expr(chan, scope)?;
                self.expr(value, scope)?;
            }
            StmtKind::IncDec { x, inc: _ } => self.expr(x, scope)?,
            StmtKind::Assign { lhs, op: _, rhs } => {
                self.exprs(lhs, scope)?;
                self.exprs(rhs, scope)?;
            }
            StmtKind::Return(results) => self.exprs(results, scope)?,
            StmtKind::Branch { kind: _, label: _ } => {}
            StmtKind::Block(b) => self.block(b, scope)?,
            StmtKind::If {
                init,
                cond,
                then,
                els,
            } => {
                self.opt_stmt(init, scope)?;
                self.expr(cond, scope)?;
                self.block(then, scope)?;
                self.opt_stmt(els, scope)?;
            }
            StmtKind::Switch { init, tag, clauses } => {
                self.opt_stmt(init, scope)?;
                self.opt_expr(tag, scope)?;
                for c in clauses {
                    if let Some(list) = &mut c.list {
                        self.exprs(list, scope)?;
                    }
                    self.stmts(&mut c.body, scope)?;
                }
            }
            StmtKind::TypeSwitch {
                init,
                assign,
                clauses,
            } => {
                self.opt_stmt(init, scope)?;
                self.stmt(assign, scope)?;
                for c in clauses {
                    if let Some(list) = &mut c.list {
                        self.exprs(list, scope)?;
                    }
                    self.stmts(&mut c.body, scope)?;
                }
            }
            StmtKind::Select { clauses } => {
                for c in clauses {
                    self.opt_stmt(&mut c.comm, scope)?;
                    self.stmts(&mut c.body, scope)?;
                }
            }
            StmtKind::For {
                init,
                cond,
                post,
                body,
            } => {
                self.opt_stmt(init, scope)?;
                self.opt_expr(cond, scope)?;
                self.opt_stmt(post, scope)?;
                self.block(body, scope)?;
            }
            StmtKind::Range {
                key,
                value,
                define: _,
                x,
                body,
            } => {
                self.opt_expr(key, scope)?;
                self.opt_expr(value, scope)?;
                self.expr(x, scope)?;
                self.block(body, scope)?;
            }
        }
        Ok(())
    }

    fn expr(&mut self, e: &mut Expr, scope: Scope<'_>) -> Result<(), RewriteError> {
        match &mut e.kind {
            ExprKind::Ident(_) | ExprKind::BasicLit(_) => {}
            ExprKind::CompositeLit { typ, elts } => {
                self.opt_boxed(typ, scope)?;
                self.exprs(elts, scope)?;
            }
            ExprKind::FuncLit { typ, body } => {
                let inner = match scope.receiver {
                    Some(recv) if rebinds(typ, recv) => {
                        debug!(receiver = recv, "closure rebinds the receiver");
                        scope.without_receiver()
                    }
                    _ => scope,
                };
                self.func_type(typ, scope)?;
                self.block(body, inner)?;
            }
            ExprKind::Paren(x) | ExprKind::Star(x) => self.expr(x, scope)?,
            ExprKind::Selector { x, sel: _ } => self.expr(x, scope)?,
            ExprKind::Index { x, indices } => {
                self.expr(x, scope)?;
                self.exprs(indices, scope)?;
            }
            ExprKind::Slice {
                x,
                low,
                high,
                max,
                slice3: _,
            } => {
                self.expr(x, scope)?;
                self.opt_boxed(low, scope)?;
                self.opt_boxed(high, scope)?;
                self.opt_boxed(max, scope)?;
            }
            ExprKind::TypeAssert { x, typ } => {
                self.expr(x, scope)?;
                self.opt_boxed(typ, scope)?;
            }
            ExprKind::Call(call) => {
                self.expr(&mut call.fun, scope)?;
                self.exprs(&mut call.args, scope)?;
            }
            ExprKind::Unary { op: _, x } => self.expr(x, scope)?,
            ExprKind::Binary { op: _, x, y } => {
                self.expr(x, scope)?;
                self.expr(y, scope)?;
            }
            ExprKind::KeyValue { key, value } => {
                self.expr(key, scope)?;
                self.expr(value, scope)?;
            }
            ExprKind::Ellipsis(elt) => self.opt_boxed(elt, scope)?,
            ExprKind::ArrayType { len, elem } => {
                self.opt_boxed(len, scope)?;
                self.expr(elem, scope)?;
            }
            ExprKind::StructType(fields) | ExprKind::InterfaceType(fields) => {
                self.field_list(fields, scope)?
            }
            ExprKind::FuncType(t) => self.func_type(t, scope)?,
            ExprKind::MapType { key, value } => {
                self.expr(key, scope)?;
                self.expr(value, scope)?;
            }
            ExprKind::ChanType { dir: _, value } => self.expr(value, scope)?,
        }

        let cfg = self.ctx.cfg;
        let replacement = match &e.kind {
            ExprKind::Call(call) => match match_log_call(call, e.span, scope, cfg) {
                Some(log) => Some(build_replacement(&log, scope, self.ctx)?),
                None => None,
            },
            _ => None,
        };
        if let Some(chain) = replacement {
            debug!(start = e.span.start, end = e.span.end, "rewrote logger call");
            e.kind = chain.kind;
            self.ctx.rewrites += 1;
        }
        Ok(())
    }
}

/// Rewrites every matching call in `func`. Returns whether anything was replaced.
///
/// Functions without a body, or whose body holds no matching call, are left untouched.
pub fn rewrite_function(
    func: &mut FuncDecl,
    scope: Scope<'_>,
    ctx: &mut RewriteCtx<'_>,
) -> Result<bool, RewriteError> {
    let Some(body) = func.body.as_mut() else {
        return Ok(false);
    };
    if !has_log_calls(body, scope, ctx.cfg) {
        return Ok(false);
    }
    let before = ctx.rewrites;
    Rewriter { ctx: &mut *ctx }.block(body, scope)?;
    Ok(ctx.rewrites > before)
}

/// Rewrites every function declaration of `program`.
pub fn rewrite_program(program: &mut Program, ctx: &mut RewriteCtx<'_>) -> Result<bool, RewriteError> {
    let receivers = collect_receivers(program);
    let mut changed = false;

    for (idx, decl) in program.decls.iter_mut().enumerate() {
        let Decl::Func(func) = decl else {
            continue;
        };
        let scope = match ctx.cfg.scope {
            LoggerScope::Global => Scope::GLOBAL,
            LoggerScope::Receiver => match receivers.get(&idx) {
                Some(Some(name)) => Scope::receiver(name.as_str()),
                unbound => {
                    if func.body.as_ref().is_some_and(|b| has_source_calls(b, ctx.cfg)) {
                        let why = match unbound {
                            Some(_) => "has an unnamed receiver",
                            None => "is not a method",
                        };
                        debug!(func = %func.name.name, why, "no receiver to log through, skipping");
                        ctx.diagnostics.push(Diag::new(
                            DiagKind::SkippedFunction,
                            func.span,
                            format!(
                                "`{}` {why}; its logger calls were left as is",
                                func.name.name
                            ),
                        ));
                    }
                    continue;
                }
            },
        };
        changed |= rewrite_function(func, scope, ctx)?;
    }
    Ok(changed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imports::resolve_namespaces;
    use crate::parser::parse_source;

    fn run(src: &str, cfg: &Config) -> (Program, Result<bool, RewriteError>, Vec<Diag>) {
        let mut program = parse_source(src).expect("parse");
        let mut ctx = RewriteCtx::new(cfg, resolve_namespaces(&program, cfg));
        let res = rewrite_program(&mut program, &mut ctx);
        let diags = ctx.diagnostics;
        (program, res, diags)
    }

    #[derive(Default)]
    struct Roots(usize);

    impl<'ast> Visitor<'ast> for Roots {
        fn visit_expr(&mut self, e: &'ast Expr) {
            if crate::printer::is_rewrite_root(e) {
                self.0 += 1;
            }
            e.walk(self);
        }
    }

    fn count_roots(p: &Program) -> usize {
        let mut r = Roots::default();
        r.visit_program(p);
        r.0
    }

    #[test]
    fn reaches_calls_in_nested_constructs() {
        let src = r#"package p

func f(xs []int) (err error) {
	defer func() {
		utils.Logger.Info("deferred")
	}()
	for _, x := range xs {
		switch {
		case x > 0:
			utils.Logger.Debug("positive", zap.Int("x", x))
		}
	}
	select {
	case <-done:
		utils.Logger.Warn("done")
	}
	go handle(func() { utils.Logger.Error("in goroutine") })
	return nil
}
"#;
        let (p, res, _) = run(src, &Config::default());
        assert_eq!(res, Ok(true));
        assert_eq!(count_roots(&p), 4);
    }

    #[test]
    fn nested_log_call_in_argument_is_rewritten_too() {
        let src = "package p\n\nfunc f() {\n\tutils.Logger.Info(msg(utils.Logger.Warn(\"inner\")))\n}\n";
        let (p, res, _) = run(src, &Config::default());
        assert_eq!(res, Ok(true));
        let Decl::Func(f) = &p.decls[0] else { panic!() };
        let StmtKind::Expr(e) = &f.body.as_ref().unwrap().stmts[0].kind else {
            panic!()
        };
        assert_eq!(
            crate::printer::expr_to_string(e),
            r#"logger.Info().Msg(msg(logger.Warn().Msg("inner")))"#
        );
    }

    #[test]
    fn functions_without_matches_are_untouched() {
        let src = "package p\n\nfunc f() {\n\tlog.Info(\"x\")\n\tutils.Logger.Sync()\n}\n\nfunc g()\n";
        let (p, res, _) = run(src, &Config::default());
        assert_eq!(res, Ok(false));
        assert_eq!(p, parse_source(src).unwrap());
    }

    #[test]
    fn receiver_scope_uses_each_methods_receiver() {
        let src = r#"package p

func (s *Svc) A() {
	utils.Logger.Info("a")
	s.logger.Info("already through the receiver")
}

func (_ *Svc) B() {
	utils.Logger.Info("b")
}

func C() {
	utils.Logger.Info("c")
}

func D() {}
"#;
        let cfg = Config::default().with_scope(LoggerScope::Receiver);
        let (p, res, diags) = run(src, &cfg);
        assert_eq!(res, Ok(true));
        assert_eq!(count_roots(&p), 1);
        let Decl::Func(a) = &p.decls[0] else { panic!() };
        let StmtKind::Expr(e) = &a.body.as_ref().unwrap().stmts[0].kind else {
            panic!()
        };
        assert_eq!(crate::printer::expr_to_string(e), r#"s.logger.Info().Msg("a")"#);
        let skipped: Vec<_> = diags
            .iter()
            .filter(|d| d.kind == DiagKind::SkippedFunction)
            .collect();
        assert_eq!(skipped.len(), 2);
        assert!(skipped[0].message.contains("unnamed receiver"));
        assert!(skipped[1].message.contains("not a method"));
    }

    #[test]
    fn closure_rebinding_the_receiver_is_not_rewritten() {
        let src = r#"package p

func (s *Svc) A() {
	each(func(s *Other) {
		utils.Logger.Info("inner")
	})
	utils.Logger.Info("outer")
}
"#;
        let cfg = Config::default().with_scope(LoggerScope::Receiver);
        let (p, _, _) = run(src, &cfg);
        assert_eq!(count_roots(&p), 1);
    }

    #[test]
    fn collect_receivers_maps_declaration_indices() {
        let src = "package p\n\nfunc (a A) M() {}\n\nfunc F() {}\n\nfunc (B) N() {}\n";
        let p = parse_source(src).unwrap();
        let r = collect_receivers(&p);
        assert_eq!(r.get(&0), Some(&Some("a".to_string())));
        assert_eq!(r.get(&1), None);
        assert_eq!(r.get(&2), Some(&None));
    }
}
