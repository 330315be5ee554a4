//! Read-only traversal of the syntax tree.
//!
//! [`Walk::walk`] visits the direct children of a node through the matching
//! [`Visitor`] hook; the default hooks walk further. Overriding a hook and not calling
//! `walk` prunes that subtree.

use crate::ast::*;

// Core traits
pub trait Walk<'ast> {
    fn walk<V: Visitor<'ast> + ?Sized>(&'ast self, v: &mut V);
}

pub trait Visitor<'ast> {
    #[inline(always)]
    fn visit_program(&mut self, p: &'ast Program) {
        p.walk(self);
    }

    #[inline(always)]
    fn visit_decl(&mut self, d: &'ast Decl) {
        d.walk(self);
    }

    /// Import declarations hold no expressions.
    #[inline(always)]
    fn visit_import_decl(&mut self, _d: &'ast ImportDecl) {}

    #[inline(always)]
    fn visit_func_decl(&mut self, f: &'ast FuncDecl) {
        f.walk(self);
    }

    #[inline(always)]
    fn visit_gen_decl(&mut self, d: &'ast GenDecl) {
        d.walk(self);
    }

    #[inline(always)]
    fn visit_spec(&mut self, s: &'ast Spec) {
        s.walk(self);
    }

    #[inline(always)]
    fn visit_field_list(&mut self, l: &'ast FieldList) {
        l.walk(self);
    }

    #[inline(always)]
    fn visit_field(&mut self, f: &'ast Field) {
        f.walk(self);
    }

    #[inline(always)]
    fn visit_func_type(&mut self, t: &'ast FuncType) {
        t.walk(self);
    }

    #[inline(always)]
    fn visit_block(&mut self, b: &'ast Block) {
        b.walk(self);
    }

    #[inline(always)]
    fn visit_stmt(&mut self, s: &'ast Stmt) {
        s.walk(self);
    }

    #[inline(always)]
    fn visit_case_clause(&mut self, c: &'ast CaseClause) {
        c.walk(self);
    }

    #[inline(always)]
    fn visit_comm_clause(&mut self, c: &'ast CommClause) {
        c.walk(self);
    }

    #[inline(always)]
    fn visit_expr(&mut self, e: &'ast Expr) {
        e.walk(self);
    }
}

#[inline(always)]
fn exprs<'ast, V: Visitor<'ast> + ?Sized>(v: &mut V, list: &'ast [Expr]) {
    for e in list {
        v.visit_expr(e);
    }
}

#[inline(always)]
fn stmts<'ast, V: Visitor<'ast> + ?Sized>(v: &mut V, list: &'ast [Stmt]) {
    for s in list {
        v.visit_stmt(s);
    }
}

#[inline(always)]
fn opt_expr<'ast, V: Visitor<'ast> + ?Sized>(v: &mut V, e: &'ast Option<Expr>) {
    if let Some(e) = e {
        v.visit_expr(e);
    }
}

#[inline(always)]
fn opt_boxed<'ast, V: Visitor<'ast> + ?Sized>(v: &mut V, e: &'ast Option<Box<Expr>>) {
    if let Some(e) = e {
        v.visit_expr(e);
    }
}

#[inline(always)]
fn opt_stmt<'ast, V: Visitor<'ast> + ?Sized>(v: &mut V, s: &'ast Option<Box<Stmt>>) {
    if let Some(s) = s {
        v.visit_stmt(s);
    }
}

impl<'ast> Walk<'ast> for Program {
    fn walk<V: Visitor<'ast> + ?Sized>(&'ast self, v: &mut V) {
        for d in &self.decls {
            v.visit_decl(d);
        }
    }
}

impl<'ast> Walk<'ast> for Decl {
    fn walk<V: Visitor<'ast> + ?Sized>(&'ast self, v: &mut V) {
        match self {
            Decl::Import(d) => v.visit_import_decl(d),
            Decl::Func(f) => v.visit_func_decl(f),
            Decl::Gen(g) => v.visit_gen_decl(g),
        }
    }
}

impl<'ast> Walk<'ast> for FuncDecl {
    fn walk<V: Visitor<'ast> + ?Sized>(&'ast self, v: &mut V) {
        if let Some(recv) = &self.recv {
            v.visit_field_list(recv);
        }
        if let Some(tp) = &self.type_params {
            v.visit_field_list(tp);
        }
        v.visit_func_type(&self.typ);
        if let Some(body) = &self.body {
            v.visit_block(body);
        }
    }
}

impl<'ast> Walk<'ast> for GenDecl {
    fn walk<V: Visitor<'ast> + ?Sized>(&'ast self, v: &mut V) {
        for s in &self.specs {
            v.visit_spec(s);
        }
    }
}

impl<'ast> Walk<'ast> for Spec {
    fn walk<V: Visitor<'ast> + ?Sized>(&'ast self, v: &mut V) {
        match self {
            Spec::Value(vs) => {
                opt_expr(v, &vs.typ);
                exprs(v, &vs.values);
            }
            Spec::Type(ts) => {
                if let Some(tp) = &ts.type_params {
                    v.visit_field_list(tp);
                }
                v.visit_expr(&ts.typ);
            }
        }
    }
}

impl<'ast> Walk<'ast> for FieldList {
    fn walk<V: Visitor<'ast> + ?Sized>(&'ast self, v: &mut V) {
        for f in &self.fields {
            v.visit_field(f);
        }
    }
}

impl<'ast> Walk<'ast> for Field {
    fn walk<V: Visitor<'ast> + ?Sized>(&'ast self, v: &mut V) {
        v.visit_expr(&self.typ);
    }
}

impl<'ast> Walk<'ast> for FuncType {
    fn walk<V: Visitor<'ast> + ?Sized>(&'ast self, v: &mut V) {
        v.visit_field_list(&self.params);
        if let Some(results) = &self.results {
            v.visit_field_list(results);
        }
    }
}

impl<'ast> Walk<'ast> for Block {
    fn walk<V: Visitor<'ast> + ?Sized>(&'ast self, v: &mut V) {
        stmts(v, &self.stmts);
    }
}

impl<'ast> Walk<'ast> for Stmt {
    fn walk<V: Visitor<'ast> + ?Sized>(&'ast self, v: &mut V) {
        match &self.kind {
            StmtKind::Decl(g) => v.visit_gen_decl(g),
            StmtKind::Empty => {}
            StmtKind::Labeled { label: _, stmt } => v.visit_stmt(stmt),
            StmtKind::Expr(e) => v.visit_expr(e),
            StmtKind::Send { chan, value } => {
                v.visit_expr(chan);
                v.visit_expr(value);
            }
            StmtKind::IncDec { x, inc: _ } => v.visit_expr(x),
            StmtKind::Assign { lhs, op: _, rhs } => {
                exprs(v, lhs);
                exprs(v, rhs);
            }
            StmtKind::Go(e) | StmtKind::Defer(e) => v.visit_expr(e),
            StmtKind::Return(results) => exprs(v, results),
            StmtKind::Branch { .. } => {}
            StmtKind::Block(b) => v.visit_block(b),
            StmtKind::If {
                init,
                cond,
                then,
                els,
            } => {
                opt_stmt(v, init);
                v.visit_expr(cond);
                v.visit_block(then);
                opt_stmt(v, els);
            }
            StmtKind::Switch { init, tag, clauses } => {
                opt_stmt(v, init);
                opt_expr(v, tag);
                for c in clauses {
                    v.visit_case_clause(c);
                }
            }
            StmtKind::TypeSwitch {
                init,
                assign,
                clauses,
            } => {
                opt_stmt(v, init);
                v.visit_stmt(assign);
                for c in clauses {
                    v.visit_case_clause(c);
                }
            }
            StmtKind::Select { clauses } => {
                for c in clauses {
                    v.visit_comm_clause(c);
                }
            }
            StmtKind::For {
                init,
                cond,
                post,
                body,
            } => {
                opt_stmt(v, init);
                opt_expr(v, cond);
                opt_stmt(v, post);
                v.visit_block(body);
            }
            StmtKind::Range {
                key,
                value,
                define: _,
                x,
                body,
            } => {
                opt_expr(v, key);
                opt_expr(v, value);
                v.visit_expr(x);
                v.visit_block(body);
            }
        }
    }
}

impl<'ast> Walk<'ast> for CaseClause {
    fn walk<V: Visitor<'ast> + ?Sized>(&'ast self, v: &mut V) {
        if let Some(list) = &self.list {
            exprs(v, list);
        }
        stmts(v, &self.body);
    }
}

impl<'ast> Walk<'ast> for CommClause {
    fn walk<V: Visitor<'ast> + ?Sized>(&'ast self, v: &mut V) {
        opt_stmt(v, &self.comm);
        stmts(v, &self.body);
    }
}

impl<'ast> Walk<'ast> for Expr {
    fn walk<V: Visitor<'ast> + ?Sized>(&'ast self, v: &mut V) {
        match &self.kind {
            ExprKind::Ident(_) | ExprKind::BasicLit(_) => {}
            ExprKind::CompositeLit { typ, elts } => {
                opt_boxed(v, typ);
                exprs(v, elts);
            }
            ExprKind::FuncLit { typ, body } => {
                v.visit_func_type(typ);
                v.visit_block(body);
            }
            ExprKind::Paren(x) | ExprKind::Star(x) => v.visit_expr(x),
            ExprKind::Selector { x, sel: _ } => v.visit_expr(x),
            ExprKind::Index { x, indices } => {
                v.visit_expr(x);
                exprs(v, indices);
            }
            ExprKind::Slice {
                x,
                low,
                high,
                max,
                slice3: _,
            } => {
                v.visit_expr(x);
                opt_boxed(v, low);
                opt_boxed(v, high);
                opt_boxed(v, max);
            }
            ExprKind::TypeAssert { x, typ } => {
                v.visit_expr(x);
                opt_boxed(v, typ);
            }
            ExprKind::Call(call) => {
                v.visit_expr(&call.fun);
                exprs(v, &call.args);
            }
            ExprKind::Unary { op: _, x } => v.visit_expr(x),
            ExprKind::Binary { op: _, x, y } => {
                v.visit_expr(x);
                v.visit_expr(y);
            }
            ExprKind::KeyValue { key, value } => {
                v.visit_expr(key);
                v.visit_expr(value);
            }
            ExprKind::Ellipsis(elt) => opt_boxed(v, elt),
            ExprKind::ArrayType { len, elem } => {
                opt_boxed(v, len);
                v.visit_expr(elem);
            }
            ExprKind::StructType(fields) | ExprKind::InterfaceType(fields) => {
                v.visit_field_list(fields)
            }
            ExprKind::FuncType(t) => v.visit_func_type(t),
            ExprKind::MapType { key, value } => {
                v.visit_expr(key);
                v.visit_expr(value);
            }
            ExprKind::ChanType { dir: _, value } => v.visit_expr(value),
        }
    }
}
