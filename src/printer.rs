//! Go printer for the syntax tree.
//!
//! Output uses tab indentation and gofmt-like spacing. A printer created with
//! [`Printer::with_source`] copies every node that still has a source span verbatim
//! from the original text, so only nodes built by a pass are laid out fresh. Rewrite
//! roots found inside a copied node are printed in place of their original text.

use crate::ast::*;
use crate::walk::{Visitor, Walk};

/// A rewritten call: it kept the span of the call it replaced while its callee was
/// built by the rewriter.
pub fn is_rewrite_root(e: &Expr) -> bool {
    match &e.kind {
        ExprKind::Call(call) => !e.span.is_detached() && call.fun.span.is_detached(),
        _ => false,
    }
}

/// Collects the outermost rewrite roots below a node, in source order.
#[derive(Default)]
pub struct RootCollector<'ast> {
    pub found: Vec<&'ast Expr>,
}

impl<'ast> RootCollector<'ast> {
    pub fn collect<N: Walk<'ast>>(node: &'ast N) -> Vec<&'ast Expr> {
        let mut c = Self::default();
        node.walk(&mut c);
        c.found.sort_by_key(|e| e.span.start);
        c.found
    }
}

impl<'ast> Visitor<'ast> for RootCollector<'ast> {
    fn visit_expr(&mut self, e: &'ast Expr) {
        if is_rewrite_root(e) {
            self.found.push(e);
        } else {
            e.walk(self);
        }
    }
}

pub struct Printer<'src> {
    out: String,
    indent: usize,
    source: Option<&'src str>,
}

impl Default for Printer<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'src> Printer<'src> {
    /// Printer that lays out every node.
    pub fn new() -> Self {
        Self {
            out: String::new(),
            indent: 0,
            source: None,
        }
    }

    /// Printer that copies nodes with a source span from `source`.
    pub fn with_source(source: &'src str) -> Self {
        Self {
            out: String::new(),
            indent: 0,
            source: Some(source),
        }
    }

    /// Starts at the given indentation depth (used for nested fresh blocks).
    pub fn at_indent(mut self, indent: usize) -> Self {
        self.indent = indent;
        self
    }

    pub fn finish(self) -> String {
        self.out
    }

    // -------------------------------------------------------------------------
    // Low-level output
    // -------------------------------------------------------------------------

    #[inline]
    fn w(&mut self, s: &str) {
        self.out.push_str(s);
    }

    fn newline(&mut self) {
        self.out.push('\n');
        for _ in 0..self.indent {
            self.out.push('\t');
        }
    }

    fn sep_list<T>(&mut self, items: &[T], mut f: impl FnMut(&mut Self, &T)) {
        for (i, item) in items.iter().enumerate() {
            if i > 0 {
                self.w(", ");
            }
            f(self, item);
        }
    }

    fn idents(&mut self, names: &[Ident]) {
        self.sep_list(names, |p, n| p.w(&n.name));
    }

    /// Copies `span` from the source, splicing rewrite roots found below `node`.
    fn try_verbatim<'a, N: Walk<'a>>(&mut self, node: &'a N, span: Span) -> bool {
        let Some(src) = self.source else {
            return false;
        };
        if span.is_detached() || span.end as usize > src.len() || span.start > span.end {
            return false;
        }
        let mut cursor = span.start as usize;
        for root in RootCollector::collect(node) {
            let r = root.span.range();
            if r.start < cursor || r.end > span.end as usize {
                continue;
            }
            self.w(&src[cursor..r.start]);
            self.print_expr(root);
            cursor = r.end;
        }
        self.w(&src[cursor..span.end as usize]);
        true
    }

    // -------------------------------------------------------------------------
    // Declarations
    // -------------------------------------------------------------------------

    pub fn print_program(&mut self, p: &Program) {
        self.w("package ");
        self.w(&p.package.name);
        self.w("\n");
        for d in &p.decls {
            self.w("\n");
            self.print_decl(d);
            self.w("\n");
        }
    }

    pub fn print_decl(&mut self, d: &Decl) {
        match d {
            Decl::Import(imp) => self.print_import_decl(imp),
            Decl::Func(f) => self.print_func_decl(f),
            Decl::Gen(g) => self.print_gen_decl(g),
        }
    }

    /// Import declarations are always laid out fresh.
    pub fn print_import_decl(&mut self, d: &ImportDecl) {
        self.w("import ");
        let grouped = d.grouped || d.specs.len() != 1;
        if !grouped {
            if let Some(spec) = d.specs.iter().next() {
                self.print_import_spec(spec);
            }
            return;
        }
        self.w("(");
        self.indent += 1;
        for spec in d.specs.iter() {
            self.newline();
            self.print_import_spec(spec);
        }
        self.indent -= 1;
        self.newline();
        self.w(")");
    }

    fn print_import_spec(&mut self, spec: &ImportSpec) {
        if let Some(name) = &spec.name {
            self.w(&name.name);
            self.w(" ");
        }
        self.w(&quote(&spec.path));
    }

    pub fn print_func_decl(&mut self, f: &FuncDecl) {
        if self.try_verbatim(f, f.span) {
            return;
        }
        self.w("func ");
        if let Some(recv) = &f.recv {
            self.print_params(recv);
            self.w(" ");
        }
        self.w(&f.name.name);
        if let Some(tp) = &f.type_params {
            self.print_type_params(tp);
        }
        self.print_signature(&f.typ);
        if let Some(body) = &f.body {
            self.w(" ");
            self.print_block(body);
        }
    }

    pub fn print_gen_decl(&mut self, g: &GenDecl) {
        if self.try_verbatim(g, g.span) {
            return;
        }
        self.w(g.kind.keyword());
        self.w(" ");
        if !g.grouped && g.specs.len() == 1 {
            self.print_spec(&g.specs[0]);
            return;
        }
        self.w("(");
        self.indent += 1;
        for s in &g.specs {
            self.newline();
            self.print_spec(s);
        }
        self.indent -= 1;
        self.newline();
        self.w(")");
    }

    fn print_spec(&mut self, s: &Spec) {
        match s {
            Spec::Value(v) => {
                self.idents(&v.names);
                if let Some(t) = &v.typ {
                    self.w(" ");
                    self.print_expr(t);
                }
                if !v.values.is_empty() {
                    self.w(" = ");
                    self.sep_list(&v.values, |p, e| p.print_expr(e));
                }
            }
            Spec::Type(t) => {
                self.w(&t.name.name);
                if let Some(tp) = &t.type_params {
                    self.print_type_params(tp);
                }
                self.w(if t.alias { " = " } else { " " });
                self.print_expr(&t.typ);
            }
        }
    }

    // -------------------------------------------------------------------------
    // Signatures and field lists
    // -------------------------------------------------------------------------

    fn print_signature(&mut self, t: &FuncType) {
        self.print_params(&t.params);
        if let Some(results) = &t.results {
            self.w(" ");
            if results.delimited {
                self.print_params(results);
            } else if let Some(f) = results.fields.first() {
                self.print_expr(&f.typ);
            }
        }
    }

    fn print_params(&mut self, l: &FieldList) {
        self.w("(");
        self.sep_list(&l.fields, |p, f| p.print_param(f));
        self.w(")");
    }

    fn print_type_params(&mut self, l: &FieldList) {
        self.w("[");
        self.sep_list(&l.fields, |p, f| p.print_param(f));
        self.w("]");
    }

    fn print_param(&mut self, f: &Field) {
        if !f.names.is_empty() {
            self.idents(&f.names);
            self.w(" ");
        }
        self.print_expr(&f.typ);
    }

    fn print_struct_fields(&mut self, l: &FieldList) {
        if l.fields.is_empty() {
            self.w("struct{}");
            return;
        }
        self.w("struct {");
        self.indent += 1;
        for f in &l.fields {
            self.newline();
            if !f.names.is_empty() {
                self.idents(&f.names);
                self.w(" ");
            }
            self.print_expr(&f.typ);
            if let Some(tag) = &f.tag {
                self.w(" ");
                self.w(&tag.value);
            }
        }
        self.indent -= 1;
        self.newline();
        self.w("}");
    }

    fn print_interface_elems(&mut self, l: &FieldList) {
        if l.fields.is_empty() {
            self.w("interface{}");
            return;
        }
        self.w("interface {");
        self.indent += 1;
        for f in &l.fields {
            self.newline();
            match (f.names.first(), &f.typ.kind) {
                (Some(name), ExprKind::FuncType(sig)) => {
                    self.w(&name.name);
                    self.print_signature(sig);
                }
                _ => self.print_expr(&f.typ),
            }
        }
        self.indent -= 1;
        self.newline();
        self.w("}");
    }

    // -------------------------------------------------------------------------
    // Statements
    // -------------------------------------------------------------------------

    pub fn print_block(&mut self, b: &Block) {
        if self.try_verbatim(b, b.span) {
            return;
        }
        self.w("{");
        self.indent += 1;
        self.print_stmt_list(&b.stmts);
        self.indent -= 1;
        self.newline();
        self.w("}");
    }

    fn print_stmt_list(&mut self, stmts: &[Stmt]) {
        for s in stmts {
            if matches!(s.kind, StmtKind::Empty) {
                continue;
            }
            self.newline();
            self.print_stmt(s);
        }
    }

    pub fn print_stmt(&mut self, s: &Stmt) {
        if self.try_verbatim(s, s.span) {
            return;
        }
        match &s.kind {
            StmtKind::Decl(g) => self.print_gen_decl(g),
            StmtKind::Empty => {}
            StmtKind::Labeled { label, stmt } => {
                self.w(&label.name);
                self.w(":");
                if !matches!(stmt.kind, StmtKind::Empty) {
                    self.newline();
                    self.print_stmt(stmt);
                }
            }
            StmtKind::Expr(e) => self.print_expr(e),
            StmtKind::Send { chan, value } => {
                self.print_expr(chan);
                self.w(" <- ");
                self.print_expr(value);
            }
            StmtKind::IncDec { x, inc } => {
                self.print_expr(x);
                self.w(if *inc { "++" } else { "--" });
            }
            StmtKind::Assign { lhs, op, rhs } => {
                self.sep_list(lhs, |p, e| p.print_expr(e));
                self.w(" ");
                self.w(op.as_str());
                self.w(" ");
                self.sep_list(rhs, |p, e| p.print_expr(e));
            }
            StmtKind::Go(e) => {
                self.w("go ");
                self.print_expr(e);
            }
            StmtKind::Defer(e) => {
                self.w("defer ");
                self.print_expr(e);
            }
            StmtKind::Return(results) => {
                self.w("return");
                if !results.is_empty() {
                    self.w(" ");
                    self.sep_list(results, |p, e| p.print_expr(e));
                }
            }
            StmtKind::Branch { kind, label } => {
                self.w(kind.keyword());
                if let Some(l) = label {
                    self.w(" ");
                    self.w(&l.name);
                }
            }
            StmtKind::Block(b) => self.print_block(b),
            StmtKind::If {
                init,
                cond,
                then,
                els,
            } => {
                self.w("if ");
                if let Some(init) = init {
                    self.print_stmt(init);
                    self.w("; ");
                }
                self.print_expr(cond);
                self.w(" ");
                self.print_block(then);
                if let Some(els) = els {
                    self.w(" else ");
                    self.print_stmt(els);
                }
            }
            StmtKind::Switch { init, tag, clauses } => {
                self.w("switch ");
                if let Some(init) = init {
                    self.print_stmt(init);
                    self.w("; ");
                }
                if let Some(tag) = tag {
                    self.print_expr(tag);
                    self.w(" ");
                }
                self.print_case_clauses(clauses);
            }
            StmtKind::TypeSwitch {
                init,
                assign,
                clauses,
            } => {
                self.w("switch ");
                if let Some(init) = init {
                    self.print_stmt(init);
                    self.w("; ");
                }
                self.print_stmt(assign);
                self.w(" ");
                self.print_case_clauses(clauses);
            }
            StmtKind::Select { clauses } => {
                self.w("select {");
                for c in clauses {
                    self.newline();
                    match &c.comm {
                        Some(comm) => {
                            self.w("case ");
                            self.print_stmt(comm);
                            self.w(":");
                        }
                        None => self.w("default:"),
                    }
                    self.indent += 1;
                    self.print_stmt_list(&c.body);
                    self.indent -= 1;
                }
                self.newline();
                self.w("}");
            }
            StmtKind::For {
                init,
                cond,
                post,
                body,
            } => {
                self.w("for ");
                if init.is_some() || post.is_some() {
                    if let Some(init) = init {
                        self.print_stmt(init);
                    }
                    self.w("; ");
                    if let Some(cond) = cond {
                        self.print_expr(cond);
                    }
                    self.w("; ");
                    if let Some(post) = post {
                        self.print_stmt(post);
                        self.w(" ");
                    }
                } else if let Some(cond) = cond {
                    self.print_expr(cond);
                    self.w(" ");
                }
                self.print_block(body);
            }
            StmtKind::Range {
                key,
                value,
                define,
                x,
                body,
            } => {
                self.w("for ");
                if let Some(key) = key {
                    self.print_expr(key);
                    if let Some(value) = value {
                        self.w(", ");
                        self.print_expr(value);
                    }
                    self.w(if *define { " := " } else { " = " });
                }
                self.w("range ");
                self.print_expr(x);
                self.w(" ");
                self.print_block(body);
            }
        }
    }

    fn print_case_clauses(&mut self, clauses: &[CaseClause]) {
        self.w("{");
        for c in clauses {
            self.newline();
            match &c.list {
                Some(list) => {
                    self.w("case ");
                    self.sep_list(list, |p, e| p.print_expr(e));
                    self.w(":");
                }
                None => self.w("default:"),
            }
            self.indent += 1;
            self.print_stmt_list(&c.body);
            self.indent -= 1;
        }
        self.newline();
        self.w("}");
    }

    // -------------------------------------------------------------------------
    // Expressions
    // -------------------------------------------------------------------------

    pub fn print_expr(&mut self, e: &Expr) {
        if !is_rewrite_root(e) && self.try_verbatim(e, e.span) {
            return;
        }
        match &e.kind {
            ExprKind::Ident(name) => self.w(name),
            ExprKind::BasicLit(lit) => self.w(&lit.value),
            ExprKind::CompositeLit { typ, elts } => {
                if let Some(t) = typ {
                    self.print_expr(t);
                }
                self.w("{");
                self.sep_list(elts, |p, e| p.print_expr(e));
                self.w("}");
            }
            ExprKind::FuncLit { typ, body } => {
                self.w("func");
                self.print_signature(typ);
                self.w(" ");
                self.print_block(body);
            }
            ExprKind::Paren(x) => {
                self.w("(");
                self.print_expr(x);
                self.w(")");
            }
            ExprKind::Selector { x, sel } => {
                self.print_expr(x);
                self.w(".");
                self.w(&sel.name);
            }
            ExprKind::Index { x, indices } => {
                self.print_expr(x);
                self.w("[");
                self.sep_list(indices, |p, e| p.print_expr(e));
                self.w("]");
            }
            ExprKind::Slice {
                x,
                low,
                high,
                max,
                slice3,
            } => {
                self.print_expr(x);
                self.w("[");
                if let Some(low) = low {
                    self.print_expr(low);
                }
                self.w(":");
                if let Some(high) = high {
                    self.print_expr(high);
                }
                if *slice3 {
                    self.w(":");
                    if let Some(max) = max {
                        self.print_expr(max);
                    }
                }
                self.w("]");
            }
            ExprKind::TypeAssert { x, typ } => {
                self.print_expr(x);
                self.w(".(");
                match typ {
                    Some(t) => self.print_expr(t),
                    None => self.w("type"),
                }
                self.w(")");
            }
            ExprKind::Call(call) => {
                self.print_expr(&call.fun);
                self.w("(");
                self.sep_list(&call.args, |p, e| p.print_expr(e));
                if call.ellipsis {
                    self.w("...");
                }
                self.w(")");
            }
            ExprKind::Star(x) => {
                self.w("*");
                self.print_expr(x);
            }
            ExprKind::Unary { op, x } => {
                self.w(op.as_str());
                self.print_expr(x);
            }
            ExprKind::Binary { op, x, y } => {
                self.print_operand(x, op.precedence(), false);
                self.w(" ");
                self.w(op.as_str());
                self.w(" ");
                self.print_operand(y, op.precedence(), true);
            }
            ExprKind::KeyValue { key, value } => {
                self.print_expr(key);
                self.w(": ");
                self.print_expr(value);
            }
            ExprKind::Ellipsis(elt) => {
                self.w("...");
                if let Some(t) = elt {
                    self.print_expr(t);
                }
            }
            ExprKind::ArrayType { len, elem } => {
                self.w("[");
                if let Some(len) = len {
                    self.print_expr(len);
                }
                self.w("]");
                self.print_expr(elem);
            }
            ExprKind::StructType(fields) => self.print_struct_fields(fields),
            ExprKind::FuncType(t) => {
                self.w("func");
                self.print_signature(t);
            }
            ExprKind::InterfaceType(fields) => self.print_interface_elems(fields),
            ExprKind::MapType { key, value } => {
                self.w("map[");
                self.print_expr(key);
                self.w("]");
                self.print_expr(value);
            }
            ExprKind::ChanType { dir, value } => {
                self.w(match dir {
                    ChanDir::Both => "chan ",
                    ChanDir::Send => "chan<- ",
                    ChanDir::Recv => "<-chan ",
                });
                self.print_expr(value);
            }
        }
    }

    /// Parenthesises a binary operand built by a pass when precedence requires it.
    fn print_operand(&mut self, x: &Expr, parent_prec: u8, right: bool) {
        let needs_parens = match &x.kind {
            ExprKind::Binary { op, .. } if x.span.is_detached() => {
                let p = op.precedence();
                p < parent_prec || (right && p == parent_prec)
            }
            _ => false,
        };
        if needs_parens {
            self.w("(");
            self.print_expr(x);
            self.w(")");
        } else {
            self.print_expr(x);
        }
    }
}

/// Lays out a whole program without reference to any source text.
pub fn print_program(p: &Program) -> String {
    let mut printer = Printer::new();
    printer.print_program(p);
    printer.finish()
}

/// Lays out a single expression without reference to any source text.
pub fn expr_to_string(e: &Expr) -> String {
    let mut printer = Printer::new();
    printer.print_expr(e);
    printer.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_source;
    use pretty_assertions::assert_eq;

    #[test]
    fn builds_call_chain_text() {
        let chain = Expr::method_call(
            Expr::method_call(
                Expr::method_call(Expr::ident("logger"), "Info", vec![]),
                "Str",
                vec![Expr::string_lit("k"), Expr::ident("v")],
            ),
            "Msg",
            vec![Expr::string_lit("hello")],
        );
        assert_eq!(
            expr_to_string(&chain),
            r#"logger.Info().Str("k", v).Msg("hello")"#
        );
    }

    #[test]
    fn reprint_is_stable_under_reparse() {
        let src = r#"package main

import (
	"fmt"
	z "go.uber.org/zap"
)

type Pair[K comparable, V any] struct {
	Key   K `json:"key"`
	Value V
}

func (p *Pair[K, V]) String() string {
	switch v := any(p.Value).(type) {
	case fmt.Stringer:
		return v.String()
	default:
	}
	for i := 0; i < 3; i++ {
		defer func() { recover() }()
	}
	m := map[string][]int{"a": {1, 2}}
	_ = m["a"][1:2]
	return fmt.Sprint(p.Key, z.Skip())
}
"#;
        let first = print_program(&parse_source(src).expect("parse original"));
        let second = print_program(&parse_source(&first).expect("parse reprint"));
        assert_eq!(first, second);
    }

    #[test]
    fn source_mode_copies_untouched_nodes() {
        let src = "package p\n\nfunc f() {\n\tx  :=   1 // keep\n\t_ = x\n}\n";
        let prog = parse_source(src).expect("parse");
        let Decl::Func(f) = &prog.decls[0] else {
            panic!("not a func")
        };
        let mut printer = Printer::with_source(src);
        printer.print_func_decl(f);
        assert_eq!(printer.finish(), &src[f.span.range()]);
    }
}
