//! Recursive-descent parser for Go source files.
//!
//! The parser works over the semicolon-inserted token stream of [`Lexer`] and follows
//! the structure of the Go specification. It stops at the first syntax error; a file
//! with lexical errors is rejected before parsing starts, since such a file cannot be
//! rewritten safely.
//!
//! Composite literals follow the usual Go rule: in the header of `if`, `for` and
//! `switch` a bare type name followed by `{` opens the block, not a literal.

use std::collections::HashSet;

use smallvec::SmallVec;

use crate::ast::*;
use crate::error::{Diag, DiagKind, ParseFailure};
use crate::lexer::{Lexer, SpannedTok, Tok};

type PResult<T> = Result<T, Diag>;

/// Deepest nesting of statements, expressions and types accepted in one file.
pub const MAX_NEST: u32 = 200;

/// Parses a complete Go source file.
pub fn parse_source(src: &str) -> Result<Program, ParseFailure> {
    let mut lexer = Lexer::new(src);
    let toks: Vec<_> = lexer.by_ref().collect();
    let diags = lexer.take_diags();
    if !diags.is_empty() {
        return Err(ParseFailure { diags });
    }

    let mut p = Parser {
        toks,
        pos: 0,
        expr_lev: 0,
        nest: 0,
        last_end: 0,
        src_len: src.len(),
    };
    let mut program = p.parse_file().map_err(|d| ParseFailure { diags: vec![d] })?;
    program.comments = lexer.take_comments();
    Ok(program)
}

struct Parser<'src> {
    toks: Vec<SpannedTok<'src>>,
    pos: usize,
    /// < 0 inside control clauses, >= 0 elsewhere.
    expr_lev: i32,
    /// Current nesting depth, bounded by [`MAX_NEST`].
    nest: u32,
    last_end: usize,
    src_len: usize,
}

/// One comma-separated entry of a parameter list before grouping.
struct ParamEntry {
    name: Option<Ident>,
    typ: Option<Expr>,
    span: Span,
}

/// A simple statement, or the header of a range loop.
enum Simple {
    Stmt(Stmt),
    Range {
        key: Option<Expr>,
        value: Option<Expr>,
        define: bool,
        x: Expr,
    },
}

fn assign_op(t: Tok<'_>) -> Option<AssignOp> {
    Some(match t {
        Tok::Assign => AssignOp::Assign,
        Tok::Define => AssignOp::Define,
        Tok::AddAssign => AssignOp::Add,
        Tok::SubAssign => AssignOp::Sub,
        Tok::MulAssign => AssignOp::Mul,
        Tok::DivAssign => AssignOp::Div,
        Tok::ModAssign => AssignOp::Rem,
        Tok::AndAssign => AssignOp::And,
        Tok::OrAssign => AssignOp::Or,
        Tok::XorAssign => AssignOp::Xor,
        Tok::ShlAssign => AssignOp::Shl,
        Tok::ShrAssign => AssignOp::Shr,
        Tok::AndNotAssign => AssignOp::AndNot,
        _ => return None,
    })
}

fn binary_op(t: Tok<'_>) -> Option<BinaryOp> {
    Some(match t {
        Tok::LOr => BinaryOp::LOr,
        Tok::LAnd => BinaryOp::LAnd,
        Tok::EqEq => BinaryOp::Eq,
        Tok::NotEq => BinaryOp::Ne,
        Tok::Lt => BinaryOp::Lt,
        Tok::Le => BinaryOp::Le,
        Tok::Gt => BinaryOp::Gt,
        Tok::Ge => BinaryOp::Ge,
        Tok::Plus => BinaryOp::Add,
        Tok::Minus => BinaryOp::Sub,
        Tok::Pipe => BinaryOp::Or,
        Tok::Caret => BinaryOp::Xor,
        Tok::Star => BinaryOp::Mul,
        Tok::Slash => BinaryOp::Div,
        Tok::Percent => BinaryOp::Rem,
        Tok::Shl => BinaryOp::Shl,
        Tok::Shr => BinaryOp::Shr,
        Tok::Amp => BinaryOp::And,
        Tok::AndNot => BinaryOp::AndNot,
        _ => return None,
    })
}

fn lit_kind(t: Tok<'_>) -> Option<(LitKind, &str)> {
    Some(match t {
        Tok::IntLit(s) => (LitKind::Int, s),
        Tok::FloatLit(s) => (LitKind::Float, s),
        Tok::ImagLit(s) => (LitKind::Imag, s),
        Tok::RuneLit(s) => (LitKind::Char, s),
        Tok::StringLit(s) | Tok::RawStringLit(s) => (LitKind::String, s),
        _ => return None,
    })
}

fn starts_type(t: Option<Tok<'_>>) -> bool {
    matches!(
        t,
        Some(
            Tok::Ident(_)
                | Tok::LBrack
                | Tok::Star
                | Tok::LParen
                | Tok::Arrow
                | Tok::KwMap
                | Tok::KwChan
                | Tok::KwFunc
                | Tok::KwStruct
                | Tok::KwInterface
        )
    )
}

fn unparen(e: &Expr) -> &Expr {
    match &e.kind {
        ExprKind::Paren(inner) => unparen(inner),
        _ => e,
    }
}

fn is_type_switch_guard(s: &Stmt) -> bool {
    fn is_type_assert(e: &Expr) -> bool {
        matches!(e.kind, ExprKind::TypeAssert { typ: None, .. })
    }
    match &s.kind {
        StmtKind::Expr(e) => is_type_assert(e),
        StmtKind::Assign {
            lhs,
            op: AssignOp::Define,
            rhs,
        } => lhs.len() == 1 && rhs.len() == 1 && is_type_assert(&rhs[0]),
        _ => false,
    }
}

/// Groups parameter entries the way Go does: if any entry is `name Type`, bare
/// identifiers are names sharing the next type; otherwise every entry is a type.
fn resolve_param_list(entries: Vec<ParamEntry>) -> PResult<Vec<Field>> {
    let named = entries.iter().any(|e| e.name.is_some() && e.typ.is_some());
    let mut out = Vec::with_capacity(entries.len());

    if !named {
        for e in entries {
            let typ = match (e.name, e.typ) {
                (Some(n), _) => Expr::new(ExprKind::Ident(n.name), n.span),
                (None, Some(t)) => t,
                (None, None) => continue,
            };
            out.push(Field {
                names: SmallVec::new(),
                typ,
                tag: None,
                span: e.span,
            });
        }
        return Ok(out);
    }

    let mut pending: Idents = SmallVec::new();
    let mut pending_start: Option<u32> = None;
    for e in entries {
        match (e.name, e.typ) {
            (Some(n), None) => {
                pending_start.get_or_insert(e.span.start);
                pending.push(n);
            }
            (Some(n), Some(typ)) => {
                let mut names = std::mem::take(&mut pending);
                names.push(n);
                let start = pending_start.take().unwrap_or(e.span.start);
                out.push(Field {
                    names,
                    typ,
                    tag: None,
                    span: Span {
                        start,
                        end: e.span.end,
                    },
                });
            }
            (None, Some(_)) => {
                return Err(Diag::new(
                    DiagKind::Parse,
                    e.span,
                    "mixed named and unnamed parameters",
                ));
            }
            (None, None) => {}
        }
    }
    if let Some(last) = pending.last() {
        return Err(Diag::new(
            DiagKind::Parse,
            last.span,
            "mixed named and unnamed parameters",
        ));
    }
    Ok(out)
}

impl<'src> Parser<'src> {
    // -------------------------------------------------------------------------
    // Token helpers
    // -------------------------------------------------------------------------

    #[inline]
    fn peek(&self) -> Option<Tok<'src>> {
        self.toks.get(self.pos).map(|t| t.1)
    }

    #[inline]
    fn peek_nth(&self, n: usize) -> Option<Tok<'src>> {
        self.toks.get(self.pos + n).map(|t| t.1)
    }

    #[inline]
    fn at(&self, t: Tok<'_>) -> bool {
        self.peek() == Some(t)
    }

    #[inline]
    fn start(&self) -> usize {
        self.toks.get(self.pos).map_or(self.src_len, |t| t.0)
    }

    fn bump(&mut self) -> SpannedTok<'src> {
        let t = self
            .toks
            .get(self.pos)
            .copied()
            .unwrap_or((self.src_len, Tok::Semi, self.src_len));
        if self.pos < self.toks.len() {
            self.pos += 1;
            // Inserted semicolons are zero-width and must not stretch spans.
            if t.0 != t.2 {
                self.last_end = t.2;
            }
        }
        t
    }

    fn eat(&mut self, t: Tok<'_>) -> bool {
        if self.at(t) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, t: Tok<'_>) -> PResult<usize> {
        if self.at(t) {
            Ok(self.bump().0)
        } else {
            Err(self.unexpected(&format!("`{t}`")))
        }
    }

    /// Statement terminator; optional before a closing `)` or `}` and at end of file.
    fn expect_semi(&mut self) -> PResult<()> {
        match self.peek() {
            Some(Tok::Semi) => {
                self.bump();
                Ok(())
            }
            None | Some(Tok::RParen | Tok::RBrace) => Ok(()),
            Some(_) => Err(self.unexpected("`;` or newline")),
        }
    }

    fn span_from(&self, start: usize) -> Span {
        Span::new(start, self.last_end.max(start))
    }

    fn unexpected(&self, what: &str) -> Diag {
        match self.toks.get(self.pos) {
            Some(&(s, Tok::Semi, e)) if s == e => Diag::new(
                DiagKind::Parse,
                Span::empty_at(s),
                format!("expected {what}, found newline"),
            ),
            Some(&(s, t, e)) => Diag::new(
                DiagKind::Parse,
                Span::new(s, e),
                format!("expected {what}, found `{t}`"),
            ),
            None => Diag::new(
                DiagKind::Parse,
                Span::empty_at(self.src_len),
                format!("expected {what}, found end of file"),
            ),
        }
    }

    /// Enters one nesting level; fails past [`MAX_NEST`].
    fn enter(&mut self) -> PResult<()> {
        if self.nest >= MAX_NEST {
            return Err(Diag::new(
                DiagKind::Parse,
                Span::empty_at(self.start()),
                format!("nesting exceeds {MAX_NEST} levels"),
            ));
        }
        self.nest += 1;
        Ok(())
    }

    fn nested<T>(&mut self, f: impl FnOnce(&mut Self) -> PResult<T>) -> PResult<T> {
        self.enter()?;
        let r = f(self);
        self.nest -= 1;
        r
    }

    /// Runs `f`, which may enter levels of its own, and drops them afterwards.
    fn flat<T>(&mut self, f: impl FnOnce(&mut Self) -> PResult<T>) -> PResult<T> {
        let base = self.nest;
        let r = f(self);
        self.nest = base;
        r
    }

    fn ident(&mut self) -> PResult<Ident> {
        match self.peek() {
            Some(Tok::Ident(name)) => {
                let (s, _, e) = self.bump();
                Ok(Ident::new(name, Span::new(s, e)))
            }
            _ => Err(self.unexpected("identifier")),
        }
    }

    fn ident_list(&mut self) -> PResult<Idents> {
        let mut names = SmallVec::new();
        names.push(self.ident()?);
        while self.eat(Tok::Comma) {
            names.push(self.ident()?);
        }
        Ok(names)
    }

    /// With the cursor on `[`, tests the token after the matching `]`.
    fn after_matching_bracket(&self, pred: impl Fn(Option<Tok<'src>>) -> bool) -> bool {
        let mut depth = 0usize;
        for (i, &(_, t, _)) in self.toks.iter().enumerate().skip(self.pos) {
            match t {
                Tok::LBrack | Tok::LParen | Tok::LBrace => depth += 1,
                Tok::RBrack | Tok::RParen | Tok::RBrace => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        return pred(self.toks.get(i + 1).map(|t| t.1));
                    }
                }
                _ => {}
            }
        }
        false
    }

    // -------------------------------------------------------------------------
    // Declarations
    // -------------------------------------------------------------------------

    fn parse_file(&mut self) -> PResult<Program> {
        self.expect(Tok::KwPackage)?;
        let package = self.ident()?;
        self.expect_semi()?;

        let mut decls = Vec::new();
        let mut seen = HashSet::new();
        while self.at(Tok::KwImport) {
            decls.push(Decl::Import(self.parse_import_decl(&mut seen)?));
            self.expect_semi()?;
        }

        while let Some(t) = self.peek() {
            let decl = match t {
                Tok::KwFunc => Decl::Func(self.parse_func_decl()?),
                Tok::KwConst | Tok::KwVar | Tok::KwType => Decl::Gen(self.parse_gen_decl()?),
                Tok::KwImport => {
                    return Err(Diag::new(
                        DiagKind::Parse,
                        Span::from_range(self.start()..self.start() + 6),
                        "imports must appear before other declarations",
                    ));
                }
                _ => return Err(self.unexpected("declaration")),
            };
            decls.push(decl);
            self.expect_semi()?;
        }

        Ok(Program {
            package,
            decls,
            erased: Vec::new(),
            comments: Vec::new(),
            span: Span::new(0, self.src_len),
        })
    }

    fn parse_import_decl(&mut self, seen: &mut HashSet<String>) -> PResult<ImportDecl> {
        let start = self.expect(Tok::KwImport)?;
        let mut specs = ImportSet::new();
        let grouped = self.eat(Tok::LParen);

        if grouped {
            while !self.at(Tok::RParen) {
                let spec = self.parse_import_spec()?;
                Self::add_import(&mut specs, spec, seen)?;
                self.expect_semi()?;
            }
            self.expect(Tok::RParen)?;
        } else {
            let spec = self.parse_import_spec()?;
            Self::add_import(&mut specs, spec, seen)?;
        }

        Ok(ImportDecl {
            specs,
            grouped,
            touched: false,
            span: self.span_from(start),
        })
    }

    fn add_import(
        specs: &mut ImportSet,
        spec: ImportSpec,
        seen: &mut HashSet<String>,
    ) -> PResult<()> {
        if !seen.insert(spec.path.clone()) {
            return Err(Diag::new(
                DiagKind::Parse,
                spec.span,
                format!("{:?} imported more than once", spec.path),
            ));
        }
        specs.insert(spec).map_err(|dup| {
            Diag::new(
                DiagKind::Parse,
                dup.span,
                format!("{:?} imported more than once", dup.path),
            )
        })
    }

    fn parse_import_spec(&mut self) -> PResult<ImportSpec> {
        let start = self.start();
        let name = match self.peek() {
            Some(Tok::Ident(_)) => Some(self.ident()?),
            Some(Tok::Dot) => {
                let (s, _, e) = self.bump();
                Some(Ident::new(".", Span::new(s, e)))
            }
            _ => None,
        };
        let path = match self.peek() {
            Some(Tok::StringLit(raw) | Tok::RawStringLit(raw)) if raw.len() > 2 => {
                self.bump();
                raw[1..raw.len() - 1].to_string()
            }
            _ => return Err(self.unexpected("import path")),
        };
        Ok(ImportSpec {
            name,
            path,
            span: self.span_from(start),
        })
    }

    fn parse_func_decl(&mut self) -> PResult<FuncDecl> {
        let start = self.expect(Tok::KwFunc)?;
        let recv = if self.at(Tok::LParen) {
            Some(self.parse_parameters()?)
        } else {
            None
        };
        let name = self.ident()?;
        let type_params = if self.at(Tok::LBrack) {
            Some(self.parse_type_params()?)
        } else {
            None
        };
        let typ = self.parse_signature(self.start())?;
        let body = if self.at(Tok::LBrace) {
            Some(self.parse_block()?)
        } else {
            None
        };
        Ok(FuncDecl {
            recv,
            name,
            type_params,
            typ,
            body,
            span: self.span_from(start),
        })
    }

    fn parse_gen_decl(&mut self) -> PResult<GenDecl> {
        let start = self.start();
        let kind = match self.peek() {
            Some(Tok::KwConst) => GenKind::Const,
            Some(Tok::KwVar) => GenKind::Var,
            Some(Tok::KwType) => GenKind::Type,
            _ => return Err(self.unexpected("`const`, `var` or `type`")),
        };
        self.bump();

        let mut specs = Vec::new();
        let grouped = self.eat(Tok::LParen);
        if grouped {
            while !self.at(Tok::RParen) {
                specs.push(self.parse_spec(kind)?);
                self.expect_semi()?;
            }
            self.expect(Tok::RParen)?;
        } else {
            specs.push(self.parse_spec(kind)?);
        }

        Ok(GenDecl {
            kind,
            specs,
            grouped,
            span: self.span_from(start),
        })
    }

    fn parse_spec(&mut self, kind: GenKind) -> PResult<Spec> {
        let start = self.start();
        match kind {
            GenKind::Type => {
                let name = self.ident()?;
                let type_params = if self.at(Tok::LBrack) && self.looks_like_type_params() {
                    Some(self.parse_type_params()?)
                } else {
                    None
                };
                let alias = self.eat(Tok::Assign);
                let typ = self.parse_type()?;
                Ok(Spec::Type(TypeSpec {
                    name,
                    type_params,
                    alias,
                    typ,
                    span: self.span_from(start),
                }))
            }
            GenKind::Const | GenKind::Var => {
                let names = self.ident_list()?;
                let typ = if starts_type(self.peek()) {
                    Some(self.parse_type()?)
                } else {
                    None
                };
                let values = if self.eat(Tok::Assign) {
                    self.parse_expr_list()?
                } else {
                    Vec::new()
                };
                Ok(Spec::Value(ValueSpec {
                    names,
                    typ,
                    values,
                    span: self.span_from(start),
                }))
            }
        }
    }

    /// `type A[T any] ...` versus `type A [N]T`.
    ///
    /// `[P *C]` stays an array length; a comma inside the brackets, as in `[P *C,]`,
    /// makes it a type parameter list.
    fn looks_like_type_params(&self) -> bool {
        match (self.peek_nth(1), self.peek_nth(2)) {
            (
                Some(Tok::Ident(_)),
                Some(
                    Tok::Ident(_)
                    | Tok::Comma
                    | Tok::Tilde
                    | Tok::LBrack
                    | Tok::LParen
                    | Tok::KwInterface
                    | Tok::KwFunc
                    | Tok::KwMap
                    | Tok::KwChan,
                ),
            ) => true,
            (Some(Tok::Ident(_)), Some(Tok::Star)) => self.bracket_has_comma(),
            _ => false,
        }
    }

    /// With the cursor on `[`, true if a `,` sits directly inside the brackets.
    fn bracket_has_comma(&self) -> bool {
        let mut depth = 0usize;
        for &(_, t, _) in self.toks.iter().skip(self.pos) {
            match t {
                Tok::LBrack | Tok::LParen | Tok::LBrace => depth += 1,
                Tok::RBrack | Tok::RParen | Tok::RBrace => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        return false;
                    }
                }
                Tok::Comma if depth == 1 => return true,
                _ => {}
            }
        }
        false
    }

    // -------------------------------------------------------------------------
    // Signatures and field lists
    // -------------------------------------------------------------------------

    fn parse_signature(&mut self, start: usize) -> PResult<FuncType> {
        let params = self.parse_parameters()?;
        let results = self.parse_results()?;
        Ok(FuncType {
            params,
            results,
            span: self.span_from(start),
        })
    }

    fn parse_parameters(&mut self) -> PResult<FieldList> {
        let start = self.expect(Tok::LParen)?;
        let fields = self.parse_param_list(Tok::RParen, false)?;
        self.expect(Tok::RParen)?;
        Ok(FieldList {
            fields,
            delimited: true,
            span: self.span_from(start),
        })
    }

    fn parse_type_params(&mut self) -> PResult<FieldList> {
        let start = self.expect(Tok::LBrack)?;
        let fields = self.parse_param_list(Tok::RBrack, true)?;
        self.expect(Tok::RBrack)?;
        Ok(FieldList {
            fields,
            delimited: true,
            span: self.span_from(start),
        })
    }

    fn parse_results(&mut self) -> PResult<Option<FieldList>> {
        if self.at(Tok::LParen) {
            return self.parse_parameters().map(Some);
        }
        if !starts_type(self.peek()) {
            return Ok(None);
        }
        let typ = self.parse_type()?;
        let span = typ.span;
        Ok(Some(FieldList {
            fields: vec![Field {
                names: SmallVec::new(),
                typ,
                tag: None,
                span,
            }],
            delimited: false,
            span,
        }))
    }

    fn parse_param_list(&mut self, closer: Tok<'_>, constraint: bool) -> PResult<Vec<Field>> {
        let mut entries = Vec::new();
        while !self.at(closer) {
            entries.push(self.parse_param_entry(closer, constraint)?);
            if !self.eat(Tok::Comma) {
                break;
            }
        }
        resolve_param_list(entries)
    }

    fn parse_param_entry(&mut self, closer: Tok<'_>, constraint: bool) -> PResult<ParamEntry> {
        let start = self.start();
        let (name, typ) = match (self.peek(), self.peek_nth(1)) {
            (Some(Tok::Ident(_)), Some(Tok::Dot)) => (None, self.parse_param_type(constraint)?),
            (Some(Tok::Ident(_)), Some(Tok::LBrack)) => {
                let generic_type = {
                    let save = self.pos;
                    self.pos += 1;
                    let r = self.after_matching_bracket(|t| t == Some(Tok::Comma) || t == Some(closer));
                    self.pos = save;
                    r
                };
                if generic_type {
                    (None, self.parse_param_type(constraint)?)
                } else {
                    let name = self.ident()?;
                    (Some(name), self.parse_param_type(constraint)?)
                }
            }
            (Some(Tok::Ident(_)), next) if next == Some(Tok::Comma) || next == Some(closer) => {
                let name = self.ident()?;
                return Ok(ParamEntry {
                    name: Some(name),
                    typ: None,
                    span: self.span_from(start),
                });
            }
            (Some(Tok::Ident(_)), _) => {
                let name = self.ident()?;
                (Some(name), self.parse_param_type(constraint)?)
            }
            _ => (None, self.parse_param_type(constraint)?),
        };
        Ok(ParamEntry {
            name,
            typ: Some(typ),
            span: self.span_from(start),
        })
    }

    fn parse_param_type(&mut self, constraint: bool) -> PResult<Expr> {
        let start = self.start();
        if self.eat(Tok::Ellipsis) {
            let elt = self.parse_type()?;
            return Ok(Expr::new(
                ExprKind::Ellipsis(Some(Box::new(elt))),
                self.span_from(start),
            ));
        }
        if constraint {
            self.parse_constraint()
        } else {
            self.parse_type()
        }
    }

    /// Type element: `~T | U | ...`.
    fn parse_constraint(&mut self) -> PResult<Expr> {
        let start = self.start();
        let mut x = self.parse_constraint_term()?;
        while self.eat(Tok::Pipe) {
            let y = self.parse_constraint_term()?;
            x = Expr::new(
                ExprKind::Binary {
                    op: BinaryOp::Or,
                    x: Box::new(x),
                    y: Box::new(y),
                },
                self.span_from(start),
            );
        }
        Ok(x)
    }

    fn parse_constraint_term(&mut self) -> PResult<Expr> {
        let start = self.start();
        if self.eat(Tok::Tilde) {
            let t = self.parse_type()?;
            return Ok(Expr::new(
                ExprKind::Unary {
                    op: UnaryOp::Tilde,
                    x: Box::new(t),
                },
                self.span_from(start),
            ));
        }
        self.parse_type()
    }

    // -------------------------------------------------------------------------
    // Types
    // -------------------------------------------------------------------------

    fn parse_type(&mut self) -> PResult<Expr> {
        self.nested(Self::type_expr)
    }

    fn type_expr(&mut self) -> PResult<Expr> {
        let start = self.start();
        let kind = match self.peek() {
            Some(Tok::Ident(_)) => return self.parse_type_name(),
            Some(Tok::LBrack) => {
                self.bump();
                let len = if self.eat(Tok::RBrack) {
                    None
                } else {
                    let len = if self.at(Tok::Ellipsis) {
                        let (s, _, e) = self.bump();
                        Expr::new(ExprKind::Ellipsis(None), Span::new(s, e))
                    } else {
                        self.expr_lev += 1;
                        let len = self.parse_expr()?;
                        self.expr_lev -= 1;
                        len
                    };
                    self.expect(Tok::RBrack)?;
                    Some(Box::new(len))
                };
                let elem = self.parse_type()?;
                ExprKind::ArrayType {
                    len,
                    elem: Box::new(elem),
                }
            }
            Some(Tok::Star) => {
                self.bump();
                ExprKind::Star(Box::new(self.parse_type()?))
            }
            Some(Tok::LParen) => {
                self.bump();
                let t = self.parse_type()?;
                self.expect(Tok::RParen)?;
                ExprKind::Paren(Box::new(t))
            }
            Some(Tok::KwMap) => {
                self.bump();
                self.expect(Tok::LBrack)?;
                let key = self.parse_type()?;
                self.expect(Tok::RBrack)?;
                let value = self.parse_type()?;
                ExprKind::MapType {
                    key: Box::new(key),
                    value: Box::new(value),
                }
            }
            Some(Tok::KwChan) => {
                self.bump();
                let dir = if self.eat(Tok::Arrow) {
                    ChanDir::Send
                } else {
                    ChanDir::Both
                };
                ExprKind::ChanType {
                    dir,
                    value: Box::new(self.parse_type()?),
                }
            }
            Some(Tok::Arrow) => {
                self.bump();
                self.expect(Tok::KwChan)?;
                ExprKind::ChanType {
                    dir: ChanDir::Recv,
                    value: Box::new(self.parse_type()?),
                }
            }
            Some(Tok::KwFunc) => {
                self.bump();
                ExprKind::FuncType(self.parse_signature(start)?)
            }
            Some(Tok::KwStruct) => ExprKind::StructType(self.parse_struct_type()?),
            Some(Tok::KwInterface) => ExprKind::InterfaceType(self.parse_interface_type()?),
            _ => return Err(self.unexpected("type")),
        };
        Ok(Expr::new(kind, self.span_from(start)))
    }

    /// `T`, `pkg.T`, and either followed by type arguments.
    fn parse_type_name(&mut self) -> PResult<Expr> {
        let start = self.start();
        let name = self.ident()?;
        let mut x = Expr::new(ExprKind::Ident(name.name), name.span);
        if self.eat(Tok::Dot) {
            let sel = self.ident()?;
            x = Expr::new(
                ExprKind::Selector {
                    x: Box::new(x),
                    sel,
                },
                self.span_from(start),
            );
        }
        if self.eat(Tok::LBrack) {
            self.expr_lev += 1;
            let mut indices = vec![self.parse_type()?];
            while self.eat(Tok::Comma) {
                if self.at(Tok::RBrack) {
                    break;
                }
                indices.push(self.parse_type()?);
            }
            self.expr_lev -= 1;
            self.expect(Tok::RBrack)?;
            x = Expr::new(
                ExprKind::Index {
                    x: Box::new(x),
                    indices,
                },
                self.span_from(start),
            );
        }
        Ok(x)
    }

    fn parse_struct_type(&mut self) -> PResult<FieldList> {
        let start = self.expect(Tok::KwStruct)?;
        self.expect(Tok::LBrace)?;
        let mut fields = Vec::new();
        while !self.at(Tok::RBrace) {
            fields.push(self.parse_struct_field()?);
            self.expect_semi()?;
        }
        self.expect(Tok::RBrace)?;
        Ok(FieldList {
            fields,
            delimited: true,
            span: self.span_from(start),
        })
    }

    fn parse_struct_field(&mut self) -> PResult<Field> {
        let start = self.start();
        let ends_embedded = |t: Option<Tok<'src>>| {
            matches!(
                t,
                None | Some(Tok::Semi | Tok::RBrace | Tok::StringLit(_) | Tok::RawStringLit(_))
            )
        };

        let (names, typ) = match (self.peek(), self.peek_nth(1)) {
            (Some(Tok::Star), _) => (SmallVec::new(), self.parse_type()?),
            (Some(Tok::Ident(_)), next) if next == Some(Tok::Dot) || ends_embedded(next) => {
                (SmallVec::new(), self.parse_type_name()?)
            }
            (Some(Tok::Ident(_)), Some(Tok::LBrack)) => {
                let embedded_generic = {
                    let save = self.pos;
                    self.pos += 1;
                    let r = self.after_matching_bracket(ends_embedded);
                    self.pos = save;
                    r
                };
                if embedded_generic {
                    (SmallVec::new(), self.parse_type_name()?)
                } else {
                    let names = self.ident_list()?;
                    (names, self.parse_type()?)
                }
            }
            (Some(Tok::Ident(_)), _) => {
                let names = self.ident_list()?;
                (names, self.parse_type()?)
            }
            _ => return Err(self.unexpected("field name or embedded type")),
        };

        let tag = match self.peek() {
            Some(Tok::StringLit(raw) | Tok::RawStringLit(raw)) => {
                self.bump();
                Some(BasicLit {
                    kind: LitKind::String,
                    value: raw.to_string(),
                })
            }
            _ => None,
        };

        Ok(Field {
            names,
            typ,
            tag,
            span: self.span_from(start),
        })
    }

    fn parse_interface_type(&mut self) -> PResult<FieldList> {
        let start = self.expect(Tok::KwInterface)?;
        self.expect(Tok::LBrace)?;
        let mut fields = Vec::new();
        while !self.at(Tok::RBrace) {
            let elem_start = self.start();
            let field = if matches!(self.peek(), Some(Tok::Ident(_)))
                && self.peek_nth(1) == Some(Tok::LParen)
            {
                let name = self.ident()?;
                let sig_start = self.start();
                let sig = self.parse_signature(sig_start)?;
                let span = sig.span;
                let mut names = SmallVec::new();
                names.push(name);
                Field {
                    names,
                    typ: Expr::new(ExprKind::FuncType(sig), span),
                    tag: None,
                    span: self.span_from(elem_start),
                }
            } else {
                let typ = self.parse_constraint()?;
                Field {
                    names: SmallVec::new(),
                    typ,
                    tag: None,
                    span: self.span_from(elem_start),
                }
            };
            fields.push(field);
            self.expect_semi()?;
        }
        self.expect(Tok::RBrace)?;
        Ok(FieldList {
            fields,
            delimited: true,
            span: self.span_from(start),
        })
    }

    // -------------------------------------------------------------------------
    // Statements
    // -------------------------------------------------------------------------

    fn parse_block(&mut self) -> PResult<Block> {
        let start = self.expect(Tok::LBrace)?;
        let stmts = self.parse_stmt_list()?;
        self.expect(Tok::RBrace)?;
        Ok(Block {
            stmts,
            span: self.span_from(start),
        })
    }

    fn at_list_end(&self) -> bool {
        matches!(
            self.peek(),
            None | Some(Tok::RBrace | Tok::KwCase | Tok::KwDefault)
        )
    }

    fn parse_stmt_list(&mut self) -> PResult<Vec<Stmt>> {
        let mut stmts = Vec::new();
        while !self.at_list_end() {
            if self.at(Tok::Semi) {
                let (s, _, e) = self.bump();
                if e > s {
                    stmts.push(Stmt {
                        kind: StmtKind::Empty,
                        span: Span::new(s, e),
                    });
                }
                continue;
            }
            stmts.push(self.parse_stmt()?);
            if !self.at_list_end() {
                self.expect_semi()?;
            }
        }
        Ok(stmts)
    }

    fn parse_stmt(&mut self) -> PResult<Stmt> {
        self.nested(Self::stmt)
    }

    fn stmt(&mut self) -> PResult<Stmt> {
        let start = self.start();
        let kind = match self.peek() {
            Some(Tok::KwVar | Tok::KwConst | Tok::KwType) => StmtKind::Decl(self.parse_gen_decl()?),
            Some(Tok::Ident(_)) if self.peek_nth(1) == Some(Tok::Colon) => {
                let label = self.ident()?;
                self.bump();
                let stmt = if self.at_list_end() {
                    Stmt {
                        kind: StmtKind::Empty,
                        span: Span::empty_at(self.last_end),
                    }
                } else {
                    self.parse_stmt()?
                };
                StmtKind::Labeled {
                    label,
                    stmt: Box::new(stmt),
                }
            }
            Some(Tok::KwGo) => {
                self.bump();
                StmtKind::Go(self.parse_expr()?)
            }
            Some(Tok::KwDefer) => {
                self.bump();
                StmtKind::Defer(self.parse_expr()?)
            }
            Some(Tok::KwReturn) => {
                self.bump();
                let results = if self.at(Tok::Semi) || self.at_list_end() {
                    Vec::new()
                } else {
                    self.parse_expr_list()?
                };
                StmtKind::Return(results)
            }
            Some(t @ (Tok::KwBreak | Tok::KwContinue | Tok::KwGoto | Tok::KwFallthrough)) => {
                self.bump();
                let kind = match t {
                    Tok::KwBreak => BranchKind::Break,
                    Tok::KwContinue => BranchKind::Continue,
                    Tok::KwGoto => BranchKind::Goto,
                    _ => BranchKind::Fallthrough,
                };
                let label = match (kind, self.peek()) {
                    (BranchKind::Goto, _) => Some(self.ident()?),
                    (BranchKind::Break | BranchKind::Continue, Some(Tok::Ident(_))) => {
                        Some(self.ident()?)
                    }
                    _ => None,
                };
                StmtKind::Branch { kind, label }
            }
            Some(Tok::LBrace) => StmtKind::Block(self.parse_block()?),
            Some(Tok::KwIf) => return self.parse_if(),
            Some(Tok::KwSwitch) => return self.parse_switch(),
            Some(Tok::KwSelect) => return self.parse_select(),
            Some(Tok::KwFor) => return self.parse_for(),
            _ => return self.parse_simple_stmt_only(),
        };
        Ok(Stmt {
            kind,
            span: self.span_from(start),
        })
    }

    fn parse_simple_stmt_only(&mut self) -> PResult<Stmt> {
        match self.parse_simple_stmt(false)? {
            Simple::Stmt(s) => Ok(s),
            Simple::Range { x, .. } => Err(Diag::new(
                DiagKind::Parse,
                x.span,
                "range clause outside of a for statement",
            )),
        }
    }

    fn parse_simple_stmt(&mut self, range_ok: bool) -> PResult<Simple> {
        let start = self.start();
        if range_ok && self.eat(Tok::KwRange) {
            let x = self.parse_expr()?;
            return Ok(Simple::Range {
                key: None,
                value: None,
                define: false,
                x,
            });
        }

        let mut lhs = self.parse_expr_list()?;
        let kind = match self.peek() {
            Some(t) if assign_op(t).is_some() => {
                let op = assign_op(t).unwrap_or(AssignOp::Assign);
                let op_start = self.bump().0;
                if range_ok
                    && matches!(op, AssignOp::Assign | AssignOp::Define)
                    && self.eat(Tok::KwRange)
                {
                    let x = self.parse_expr()?;
                    if lhs.len() > 2 {
                        return Err(Diag::new(
                            DiagKind::Parse,
                            Span::single_at(op_start),
                            "range clause permits at most two iteration variables",
                        ));
                    }
                    let mut it = lhs.into_iter();
                    return Ok(Simple::Range {
                        key: it.next(),
                        value: it.next(),
                        define: op == AssignOp::Define,
                        x,
                    });
                }
                let rhs = self.parse_expr_list()?;
                StmtKind::Assign { lhs, op, rhs }
            }
            Some(Tok::Arrow) => {
                self.bump();
                let value = self.parse_expr()?;
                let chan = self.single(lhs)?;
                StmtKind::Send { chan, value }
            }
            Some(t @ (Tok::Inc | Tok::Dec)) => {
                self.bump();
                let x = self.single(lhs)?;
                StmtKind::IncDec {
                    x,
                    inc: t == Tok::Inc,
                }
            }
            _ => {
                if lhs.len() != 1 {
                    return Err(self.unexpected("`:=`, `=` or `,`"));
                }
                match lhs.pop() {
                    Some(e) => StmtKind::Expr(e),
                    None => return Err(self.unexpected("expression")),
                }
            }
        };
        Ok(Simple::Stmt(Stmt {
            kind,
            span: self.span_from(start),
        }))
    }

    fn single(&self, mut list: Vec<Expr>) -> PResult<Expr> {
        match (list.pop(), list.is_empty()) {
            (Some(e), true) => Ok(e),
            (Some(e), false) => Err(Diag::new(
                DiagKind::Parse,
                e.span,
                "expected 1 expression",
            )),
            (None, _) => Err(self.unexpected("expression")),
        }
    }

    fn stmt_to_expr(&self, s: Stmt, what: &str) -> PResult<Expr> {
        match s.kind {
            StmtKind::Expr(e) => Ok(e),
            _ => Err(Diag::new(
                DiagKind::Parse,
                s.span,
                format!("cannot use statement as {what}"),
            )),
        }
    }

    fn parse_if(&mut self) -> PResult<Stmt> {
        let start = self.expect(Tok::KwIf)?;
        let prev = self.expr_lev;
        self.expr_lev = -1;

        if self.at(Tok::LBrace) {
            return Err(self.unexpected("condition"));
        }
        let s1 = if self.at(Tok::Semi) {
            None
        } else {
            Some(self.parse_simple_stmt_only()?)
        };
        let (init, cond) = if self.eat(Tok::Semi) {
            if self.at(Tok::LBrace) {
                return Err(self.unexpected("condition"));
            }
            (s1.map(Box::new), self.parse_expr()?)
        } else {
            match s1 {
                Some(s) => (None, self.stmt_to_expr(s, "if condition")?),
                None => return Err(self.unexpected("condition")),
            }
        };
        self.expr_lev = prev;

        let then = self.parse_block()?;
        let els = if self.eat(Tok::KwElse) {
            match self.peek() {
                Some(Tok::KwIf) => Some(Box::new(self.nested(Self::parse_if)?)),
                Some(Tok::LBrace) => {
                    let b = self.parse_block()?;
                    let span = b.span;
                    Some(Box::new(Stmt {
                        kind: StmtKind::Block(b),
                        span,
                    }))
                }
                _ => return Err(self.unexpected("`if` or block after `else`")),
            }
        } else {
            None
        };

        Ok(Stmt {
            kind: StmtKind::If {
                init,
                cond,
                then,
                els,
            },
            span: self.span_from(start),
        })
    }

    fn parse_switch(&mut self) -> PResult<Stmt> {
        let start = self.expect(Tok::KwSwitch)?;
        let prev = self.expr_lev;
        self.expr_lev = -1;

        let mut init = None;
        let mut tag = None;
        if !self.at(Tok::LBrace) {
            let s1 = if self.at(Tok::Semi) {
                None
            } else {
                Some(self.parse_simple_stmt_only()?)
            };
            if self.eat(Tok::Semi) {
                init = s1.map(Box::new);
                if !self.at(Tok::LBrace) {
                    tag = Some(self.parse_simple_stmt_only()?);
                }
            } else {
                tag = s1;
            }
        }
        self.expr_lev = prev;

        let type_switch = tag.as_ref().is_some_and(is_type_switch_guard);
        self.expect(Tok::LBrace)?;
        let mut clauses = Vec::new();
        while self.at(Tok::KwCase) || self.at(Tok::KwDefault) {
            clauses.push(self.parse_case_clause(type_switch)?);
        }
        self.expect(Tok::RBrace)?;

        let kind = match tag {
            Some(assign) if type_switch => StmtKind::TypeSwitch {
                init,
                assign: Box::new(assign),
                clauses,
            },
            tag => StmtKind::Switch {
                init,
                tag: match tag {
                    Some(s) => Some(self.stmt_to_expr(s, "switch expression")?),
                    None => None,
                },
                clauses,
            },
        };
        Ok(Stmt {
            kind,
            span: self.span_from(start),
        })
    }

    fn parse_case_clause(&mut self, type_switch: bool) -> PResult<CaseClause> {
        let start = self.start();
        let list = if self.eat(Tok::KwCase) {
            if type_switch {
                let mut types = vec![self.parse_type()?];
                while self.eat(Tok::Comma) {
                    types.push(self.parse_type()?);
                }
                Some(types)
            } else {
                Some(self.parse_expr_list()?)
            }
        } else {
            self.expect(Tok::KwDefault)?;
            None
        };
        self.expect(Tok::Colon)?;
        let body = self.parse_stmt_list()?;
        Ok(CaseClause {
            list,
            body,
            span: self.span_from(start),
        })
    }

    fn parse_select(&mut self) -> PResult<Stmt> {
        let start = self.expect(Tok::KwSelect)?;
        self.expect(Tok::LBrace)?;
        let mut clauses = Vec::new();
        while self.at(Tok::KwCase) || self.at(Tok::KwDefault) {
            let clause_start = self.start();
            let comm = if self.eat(Tok::KwCase) {
                Some(Box::new(self.parse_simple_stmt_only()?))
            } else {
                self.expect(Tok::KwDefault)?;
                None
            };
            self.expect(Tok::Colon)?;
            let body = self.parse_stmt_list()?;
            clauses.push(CommClause {
                comm,
                body,
                span: self.span_from(clause_start),
            });
        }
        self.expect(Tok::RBrace)?;
        Ok(Stmt {
            kind: StmtKind::Select { clauses },
            span: self.span_from(start),
        })
    }

    fn parse_for(&mut self) -> PResult<Stmt> {
        let start = self.expect(Tok::KwFor)?;
        let prev = self.expr_lev;
        self.expr_lev = -1;

        let mut init = None;
        let mut cond = None;
        let mut post = None;
        let mut range = None;

        if !self.at(Tok::LBrace) {
            let s1 = if self.at(Tok::Semi) {
                None
            } else {
                Some(self.parse_simple_stmt(true)?)
            };
            match s1 {
                Some(Simple::Range {
                    key,
                    value,
                    define,
                    x,
                }) => range = Some((key, value, define, x)),
                Some(Simple::Stmt(s)) if !self.at(Tok::Semi) => {
                    cond = Some(self.stmt_to_expr(s, "for condition")?);
                }
                s1 => {
                    init = s1.and_then(|s| match s {
                        Simple::Stmt(s) => Some(Box::new(s)),
                        Simple::Range { .. } => None,
                    });
                    self.expect(Tok::Semi)?;
                    if !self.at(Tok::Semi) {
                        cond = Some(self.parse_expr()?);
                    }
                    self.expect(Tok::Semi)?;
                    if !self.at(Tok::LBrace) {
                        post = Some(Box::new(self.parse_simple_stmt_only()?));
                    }
                }
            }
        }
        self.expr_lev = prev;

        let body = self.parse_block()?;
        let kind = match range {
            Some((key, value, define, x)) => StmtKind::Range {
                key,
                value,
                define,
                x,
                body,
            },
            None => StmtKind::For {
                init,
                cond,
                post,
                body,
            },
        };
        Ok(Stmt {
            kind,
            span: self.span_from(start),
        })
    }

    // -------------------------------------------------------------------------
    // Expressions
    // -------------------------------------------------------------------------

    fn parse_expr_list(&mut self) -> PResult<Vec<Expr>> {
        let mut list = vec![self.parse_expr()?];
        while self.eat(Tok::Comma) {
            list.push(self.parse_expr()?);
        }
        Ok(list)
    }

    fn parse_expr(&mut self) -> PResult<Expr> {
        self.parse_binary(1)
    }

    fn parse_binary(&mut self, min_prec: u8) -> PResult<Expr> {
        self.flat(|p| p.binary_expr(min_prec))
    }

    /// Each operator folded in deepens the tree by one level.
    fn binary_expr(&mut self, min_prec: u8) -> PResult<Expr> {
        let start = self.start();
        let mut x = self.parse_unary()?;
        loop {
            let Some(op) = self.peek().and_then(binary_op) else {
                return Ok(x);
            };
            let prec = op.precedence();
            if prec < min_prec {
                return Ok(x);
            }
            self.enter()?;
            self.bump();
            let y = self.parse_binary(prec + 1)?;
            x = Expr::new(
                ExprKind::Binary {
                    op,
                    x: Box::new(x),
                    y: Box::new(y),
                },
                self.span_from(start),
            );
        }
    }

    fn parse_unary(&mut self) -> PResult<Expr> {
        self.nested(Self::unary_expr)
    }

    fn unary_expr(&mut self) -> PResult<Expr> {
        let start = self.start();
        let kind = match self.peek() {
            Some(t @ (Tok::Plus | Tok::Minus | Tok::Bang | Tok::Caret | Tok::Amp | Tok::Tilde)) => {
                self.bump();
                let op = match t {
                    Tok::Plus => UnaryOp::Plus,
                    Tok::Minus => UnaryOp::Minus,
                    Tok::Bang => UnaryOp::Not,
                    Tok::Caret => UnaryOp::Xor,
                    Tok::Amp => UnaryOp::Addr,
                    _ => UnaryOp::Tilde,
                };
                ExprKind::Unary {
                    op,
                    x: Box::new(self.parse_unary()?),
                }
            }
            Some(Tok::Arrow) if self.peek_nth(1) == Some(Tok::KwChan) => {
                return self.parse_type();
            }
            Some(Tok::Arrow) => {
                self.bump();
                ExprKind::Unary {
                    op: UnaryOp::Recv,
                    x: Box::new(self.parse_unary()?),
                }
            }
            Some(Tok::Star) => {
                self.bump();
                ExprKind::Star(Box::new(self.parse_unary()?))
            }
            _ => return self.parse_primary(),
        };
        Ok(Expr::new(kind, self.span_from(start)))
    }

    fn parse_operand(&mut self) -> PResult<Expr> {
        let start = self.start();
        match self.peek() {
            Some(Tok::Ident(name)) => {
                let (s, _, e) = self.bump();
                Ok(Expr::new(ExprKind::Ident(name.to_string()), Span::new(s, e)))
            }
            Some(t) if t.is_basic_lit() => {
                let (s, _, e) = self.bump();
                let (kind, value) = lit_kind(t).ok_or_else(|| self.unexpected("literal"))?;
                Ok(Expr::new(
                    ExprKind::BasicLit(BasicLit {
                        kind,
                        value: value.to_string(),
                    }),
                    Span::new(s, e),
                ))
            }
            Some(Tok::LParen) => {
                self.bump();
                self.expr_lev += 1;
                let x = self.parse_expr()?;
                self.expr_lev -= 1;
                self.expect(Tok::RParen)?;
                Ok(Expr::new(
                    ExprKind::Paren(Box::new(x)),
                    self.span_from(start),
                ))
            }
            Some(Tok::KwFunc) => {
                self.bump();
                let typ = self.parse_signature(start)?;
                if self.at(Tok::LBrace) {
                    self.expr_lev += 1;
                    let body = self.parse_block()?;
                    self.expr_lev -= 1;
                    Ok(Expr::new(
                        ExprKind::FuncLit { typ, body },
                        self.span_from(start),
                    ))
                } else {
                    let span = typ.span;
                    Ok(Expr::new(ExprKind::FuncType(typ), span))
                }
            }
            Some(Tok::LBrack | Tok::KwStruct | Tok::KwMap | Tok::KwChan | Tok::KwInterface) => {
                self.parse_type()
            }
            _ => Err(self.unexpected("expression")),
        }
    }

    fn parse_primary(&mut self) -> PResult<Expr> {
        self.flat(Self::primary_expr)
    }

    /// Selectors, calls and index suffixes deepen the tree like binary operators do.
    fn primary_expr(&mut self) -> PResult<Expr> {
        let start = self.start();
        let mut x = self.parse_operand()?;
        loop {
            if matches!(self.peek(), Some(Tok::Dot | Tok::LBrack | Tok::LParen | Tok::LBrace)) {
                self.enter()?;
            }
            match self.peek() {
                Some(Tok::Dot) => {
                    self.bump();
                    match self.peek() {
                        Some(Tok::Ident(_)) => {
                            let sel = self.ident()?;
                            x = Expr::new(
                                ExprKind::Selector {
                                    x: Box::new(x),
                                    sel,
                                },
                                self.span_from(start),
                            );
                        }
                        Some(Tok::LParen) => {
                            self.bump();
                            let typ = if self.eat(Tok::KwType) {
                                None
                            } else {
                                Some(Box::new(self.parse_type()?))
                            };
                            self.expect(Tok::RParen)?;
                            x = Expr::new(
                                ExprKind::TypeAssert {
                                    x: Box::new(x),
                                    typ,
                                },
                                self.span_from(start),
                            );
                        }
                        _ => return Err(self.unexpected("selector or type assertion")),
                    }
                }
                Some(Tok::LBrack) => x = self.parse_index_or_slice(x, start)?,
                Some(Tok::LParen) => x = self.parse_call(x, start)?,
                Some(Tok::LBrace) if self.opens_composite_lit(&x) => {
                    x = self.parse_composite_lit(Some(x), start)?;
                }
                _ => return Ok(x),
            }
        }
    }

    fn opens_composite_lit(&self, x: &Expr) -> bool {
        match &unparen(x).kind {
            ExprKind::Ident(_) | ExprKind::Selector { .. } | ExprKind::Index { .. } => {
                self.expr_lev >= 0
            }
            ExprKind::ArrayType { .. } | ExprKind::StructType(_) | ExprKind::MapType { .. } => {
                true
            }
            _ => false,
        }
    }

    fn parse_index_or_slice(&mut self, x: Expr, start: usize) -> PResult<Expr> {
        self.expect(Tok::LBrack)?;
        self.expr_lev += 1;

        let mut low = None;
        if !self.at(Tok::Colon) {
            let first = self.parse_expr()?;
            if !self.at(Tok::Colon) {
                let mut indices = vec![first];
                while self.eat(Tok::Comma) {
                    if self.at(Tok::RBrack) {
                        break;
                    }
                    indices.push(self.parse_expr()?);
                }
                self.expr_lev -= 1;
                self.expect(Tok::RBrack)?;
                return Ok(Expr::new(
                    ExprKind::Index {
                        x: Box::new(x),
                        indices,
                    },
                    self.span_from(start),
                ));
            }
            low = Some(Box::new(first));
        }

        self.expect(Tok::Colon)?;
        let mut high = None;
        let mut max = None;
        let mut slice3 = false;
        if !self.at(Tok::RBrack) && !self.at(Tok::Colon) {
            high = Some(Box::new(self.parse_expr()?));
        }
        if self.eat(Tok::Colon) {
            slice3 = true;
            if high.is_none() {
                return Err(self.unexpected("middle index in 3-index slice"));
            }
            max = Some(Box::new(self.parse_expr()?));
        }
        self.expr_lev -= 1;
        self.expect(Tok::RBrack)?;
        Ok(Expr::new(
            ExprKind::Slice {
                x: Box::new(x),
                low,
                high,
                max,
                slice3,
            },
            self.span_from(start),
        ))
    }

    fn parse_call(&mut self, fun: Expr, start: usize) -> PResult<Expr> {
        self.expect(Tok::LParen)?;
        self.expr_lev += 1;
        let mut args = Vec::new();
        let mut ellipsis = false;
        while !self.at(Tok::RParen) {
            args.push(self.parse_expr()?);
            if self.eat(Tok::Ellipsis) {
                ellipsis = true;
            }
            if !self.eat(Tok::Comma) {
                break;
            }
        }
        self.expr_lev -= 1;
        self.expect(Tok::RParen)?;
        Ok(Expr::new(
            ExprKind::Call(CallExpr {
                fun: Box::new(fun),
                args,
                ellipsis,
            }),
            self.span_from(start),
        ))
    }

    fn parse_composite_lit(&mut self, typ: Option<Expr>, start: usize) -> PResult<Expr> {
        self.nested(|p| p.composite_lit(typ, start))
    }

    fn composite_lit(&mut self, typ: Option<Expr>, start: usize) -> PResult<Expr> {
        self.expect(Tok::LBrace)?;
        self.expr_lev += 1;
        let mut elts = Vec::new();
        while !self.at(Tok::RBrace) {
            let el_start = self.start();
            let key = self.parse_element_value()?;
            let el = if self.eat(Tok::Colon) {
                let value = self.parse_element_value()?;
                Expr::new(
                    ExprKind::KeyValue {
                        key: Box::new(key),
                        value: Box::new(value),
                    },
                    self.span_from(el_start),
                )
            } else {
                key
            };
            elts.push(el);
            if !self.eat(Tok::Comma) {
                break;
            }
        }
        self.expr_lev -= 1;
        self.expect(Tok::RBrace)?;
        Ok(Expr::new(
            ExprKind::CompositeLit {
                typ: typ.map(Box::new),
                elts,
            },
            self.span_from(start),
        ))
    }

    fn parse_element_value(&mut self) -> PResult<Expr> {
        if self.at(Tok::LBrace) {
            let start = self.start();
            return self.parse_composite_lit(None, start);
        }
        self.parse_expr()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(src: &str) -> Program {
        match parse_source(src) {
            Ok(p) => p,
            Err(e) => panic!("parse failed: {e}\n{src}"),
        }
    }

    fn func_body(p: &Program, idx: usize) -> &Block {
        match &p.decls[idx] {
            Decl::Func(f) => f.body.as_ref().expect("body"),
            other => panic!("not a func: {other:?}"),
        }
    }

    #[test]
    fn parses_grouped_and_single_imports() {
        let p = parse("package main\n\nimport \"fmt\"\nimport (\n\tz \"go.uber.org/zap\"\n\t\"os\"\n)\n");
        let imports: Vec<_> = p.import_decls().collect();
        assert_eq!(imports.len(), 2);
        assert!(!imports[0].grouped);
        assert!(imports[1].grouped);
        let zap = p.find_import("go.uber.org/zap").expect("zap");
        assert_eq!(zap.local_name(), "z");
    }

    #[test]
    fn duplicate_import_is_rejected() {
        let err = parse_source("package p\nimport (\n\"fmt\"\n\"fmt\"\n)\n").unwrap_err();
        assert!(err.diags[0].message.contains("imported more than once"));
    }

    #[test]
    fn composite_literal_not_taken_in_if_header() {
        let p = parse("package p\nfunc f() {\n\tif x == y {\n\t\treturn\n\t}\n}\n");
        let body = func_body(&p, 0);
        match &body.stmts[0].kind {
            StmtKind::If { cond, then, .. } => {
                assert!(matches!(cond.kind, ExprKind::Binary { op: BinaryOp::Eq, .. }));
                assert_eq!(then.stmts.len(), 1);
            }
            other => panic!("expected if, got {other:?}"),
        }
    }

    #[test]
    fn parameter_grouping() {
        let p = parse("package p\nfunc f(a, b int, c ...string) (int, error) { return 0, nil }\n");
        let Decl::Func(f) = &p.decls[0] else {
            panic!("not a func")
        };
        let params = &f.typ.params.fields;
        assert_eq!(params.len(), 2);
        assert_eq!(params[0].names.len(), 2);
        assert!(matches!(params[1].typ.kind, ExprKind::Ellipsis(Some(_))));
        let results = f.typ.results.as_ref().expect("results");
        assert_eq!(results.fields.len(), 2);
        assert!(results.fields.iter().all(|f| f.names.is_empty()));
    }

    #[test]
    fn method_receiver_and_generics() {
        let p = parse(
            "package p\ntype Set[T comparable] map[T]struct{}\nfunc (s *Server) Get() {}\nfunc Keys[K any](m Map[K, int], n []K) {}\n",
        );
        let Decl::Gen(g) = &p.decls[0] else {
            panic!("not a type decl")
        };
        assert!(matches!(&g.specs[0], Spec::Type(ts) if ts.type_params.is_some()));
        let Decl::Func(m) = &p.decls[1] else {
            panic!("not a func")
        };
        assert_eq!(m.receiver_name().map(|i| i.name.as_str()), Some("s"));
        let Decl::Func(f) = &p.decls[2] else {
            panic!("not a func")
        };
        assert!(f.type_params.is_some());
        let params = &f.typ.params.fields;
        assert_eq!(params.len(), 2);
        assert!(matches!(params[0].typ.kind, ExprKind::Index { .. }));
    }

    #[test]
    fn type_switch_and_select() {
        let src = r#"package p
func f(v any, ch chan int) {
	switch x := v.(type) {
	case int, string:
		_ = x
	default:
	}
	select {
	case n := <-ch:
		_ = n
	case ch <- 1:
	default:
	}
}
"#;
        let p = parse(src);
        let body = func_body(&p, 0);
        assert!(matches!(body.stmts[0].kind, StmtKind::TypeSwitch { .. }));
        match &body.stmts[1].kind {
            StmtKind::Select { clauses } => assert_eq!(clauses.len(), 3),
            other => panic!("expected select, got {other:?}"),
        }
    }

    #[test]
    fn for_forms() {
        let src = r#"package p
func f(m map[string]int) {
	for i := 0; i < 10; i++ {
	}
	for k, v := range m {
		_, _ = k, v
	}
	for range m {
	}
	for {
		break
	}
}
"#;
        let p = parse(src);
        let body = func_body(&p, 0);
        assert!(matches!(body.stmts[0].kind, StmtKind::For { cond: Some(_), .. }));
        assert!(matches!(
            body.stmts[1].kind,
            StmtKind::Range { define: true, key: Some(_), value: Some(_), .. }
        ));
        assert!(matches!(body.stmts[2].kind, StmtKind::Range { key: None, .. }));
        assert!(matches!(body.stmts[3].kind, StmtKind::For { cond: None, .. }));
    }

    #[test]
    fn call_span_covers_arguments() {
        let src = "package p\nfunc f() {\n\tutils.Logger.Info(\"hi\", zap.String(\"k\", v))\n}\n";
        let p = parse(src);
        let body = func_body(&p, 0);
        let StmtKind::Expr(e) = &body.stmts[0].kind else {
            panic!("expected expression statement")
        };
        assert_eq!(
            &src[e.span.range()],
            "utils.Logger.Info(\"hi\", zap.String(\"k\", v))"
        );
    }

    #[test]
    fn trailing_comma_disambiguates_pointer_type_param() {
        let p = parse("package p\n\ntype B[P *C,] struct{}\n\ntype A [N * M]int\n");
        let Decl::Gen(b) = &p.decls[0] else { panic!() };
        let Spec::Type(b) = &b.specs[0] else { panic!() };
        let tp = b.type_params.as_ref().expect("type params");
        assert_eq!(tp.fields.len(), 1);
        assert!(matches!(tp.fields[0].typ.kind, ExprKind::Star(_)));

        let Decl::Gen(a) = &p.decls[1] else { panic!() };
        let Spec::Type(a) = &a.specs[0] else { panic!() };
        assert!(a.type_params.is_none());
        assert!(matches!(a.typ.kind, ExprKind::ArrayType { len: Some(_), .. }));
    }

    fn nested_parens(depth: usize) -> String {
        format!(
            "package p\n\nfunc f() {{\n\tx := {}1{}\n}}\n",
            "(".repeat(depth),
            ")".repeat(depth)
        )
    }

    #[test]
    fn moderate_nesting_is_accepted() {
        assert!(parse_source(&nested_parens(50)).is_ok());
    }

    #[test]
    fn excessive_nesting_is_a_parse_error() {
        for src in [
            nested_parens(100_000),
            format!("package p\n\nvar x = {}1\n", "- ".repeat(100_000)),
            format!("package p\n\nvar x = a{}\n", ".b".repeat(100_000)),
            format!("package p\n\nvar x = 1{}\n", " + 1".repeat(100_000)),
            format!("package p\n\nfunc f() {{{}{}}}\n", "{".repeat(100_000), "}".repeat(100_000)),
        ] {
            let err = parse_source(&src).unwrap_err();
            assert_eq!(err.diags.len(), 1);
            assert_eq!(err.diags[0].kind, DiagKind::Parse);
            assert!(err.diags[0].message.contains("nesting"), "{}", err.diags[0].message);
        }
    }

    #[test]
    fn syntax_error_is_reported() {
        let err = parse_source("package p\nfunc f( {\n").unwrap_err();
        assert_eq!(err.diags.len(), 1);
        assert_eq!(err.diags[0].kind, DiagKind::Parse);
    }
}
