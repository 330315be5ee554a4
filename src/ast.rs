//! Syntax tree for Go source files.
//!
//! The tree is owned and mutable: a rewrite pass takes a [`Program`] by value, edits
//! nodes in place and hands it back. Statements and expressions are closed sum types,
//! so every pass that matches on them exhaustively is forced to handle new kinds.
//!
//! ## Architecture
//!
//! - **Owned nodes**: children live in `Box`/`Vec` directly under their parent
//! - **Span tracking**: every node records its byte range in the original source
//! - **Detached nodes**: nodes synthesised by a pass carry [`Span::DETACHED`]
//! - **Import sets**: import groups are ordered sets keyed by path ([`ImportSet`])

use indexmap::IndexMap;
use smallvec::SmallVec;

pub use crate::error::Span;

// =============================================================================
// Core Types
// =============================================================================

/// Identifier with its source location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ident {
    /// Identifier text.
    pub name: String,
    /// Source location.
    pub span: Span,
}

impl Ident {
    pub fn new(name: impl Into<String>, span: Span) -> Self {
        Self {
            name: name.into(),
            span,
        }
    }

    /// Identifier that does not come from the source text.
    pub fn detached(name: impl Into<String>) -> Self {
        Self::new(name, Span::DETACHED)
    }

    #[inline]
    pub fn is_blank(&self) -> bool {
        self.name == "_"
    }
}

/// Identifier lists are almost always one or two names long.
pub type Idents = SmallVec<[Ident; 2]>;

// =============================================================================
// Root Structure and Declarations
// =============================================================================

/// Root node representing a complete Go source file.
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    /// Package name from the `package` clause.
    pub package: Ident,
    /// Top-level declarations in source order.
    pub decls: Vec<Decl>,
    /// Source ranges of declarations removed by a pass.
    pub erased: Vec<Span>,
    /// Comment spans in source order.
    pub comments: Vec<Span>,
    /// Whole-file span.
    pub span: Span,
}

impl Program {
    /// Import declarations in source order.
    pub fn import_decls(&self) -> impl Iterator<Item = &ImportDecl> {
        self.decls.iter().filter_map(|d| match d {
            Decl::Import(imp) => Some(imp),
            Decl::Func(_) | Decl::Gen(_) => None,
        })
    }

    /// Finds the import spec for `path` in any import declaration.
    pub fn find_import(&self, path: &str) -> Option<&ImportSpec> {
        self.import_decls().find_map(|d| d.specs.get(path))
    }
}

/// Top-level declaration.
#[derive(Debug, Clone, PartialEq)]
pub enum Decl {
    /// `import` declaration (single spec or parenthesised group).
    Import(ImportDecl),
    /// Function or method declaration.
    Func(FuncDecl),
    /// `const`, `var` or `type` declaration.
    Gen(GenDecl),
}

impl Decl {
    pub fn span(&self) -> Span {
        match self {
            Decl::Import(d) => d.span,
            Decl::Func(d) => d.span,
            Decl::Gen(d) => d.span,
        }
    }
}

/// Import declaration owning an ordered set of specs.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportDecl {
    /// Specs keyed by import path.
    pub specs: ImportSet,
    /// Whether the source used the parenthesised form.
    pub grouped: bool,
    /// Set once a pass added or removed a spec.
    pub touched: bool,
    /// Source location (detached for a group created by a pass).
    pub span: Span,
}

impl ImportDecl {
    /// Empty, parenthesised group not present in the source.
    pub fn detached() -> Self {
        Self {
            specs: ImportSet::new(),
            grouped: true,
            touched: true,
            span: Span::DETACHED,
        }
    }
}

/// Import specification (`import "path"` or `import name "path"`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportSpec {
    /// Optional local name (alias, `.` or `_`).
    pub name: Option<Ident>,
    /// Import path without quotes.
    pub path: String,
    /// Source location.
    pub span: Span,
}

impl ImportSpec {
    pub fn new(path: impl Into<String>, alias: Option<&str>) -> Self {
        Self {
            name: alias.map(Ident::detached),
            path: path.into(),
            span: Span::DETACHED,
        }
    }

    /// Name under which the package is referenced in this file.
    ///
    /// Without an alias this is the last path element, skipping a trailing major
    /// version element (`github.com/x/y/v2` → `y`). Package clauses that differ from
    /// the directory name cannot be known syntactically.
    pub fn local_name(&self) -> &str {
        if let Some(name) = &self.name {
            return &name.name;
        }
        let mut parts = self.path.rsplit('/');
        let last = parts.next().unwrap_or(self.path.as_str());
        let is_major = last.len() > 1
            && last.starts_with('v')
            && last[1..].bytes().all(|b| b.is_ascii_digit());
        match parts.next() {
            Some(prev) if is_major => prev,
            _ => last,
        }
    }

    /// `import . "path"`
    pub fn is_dot(&self) -> bool {
        self.name.as_ref().is_some_and(|n| n.name == ".")
    }
}

/// Ordered set of import specs, unique by path.
///
/// Additions append; removals keep the relative order of the survivors.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImportSet {
    specs: IndexMap<String, ImportSpec>,
}

impl ImportSet {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.specs.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    #[inline]
    pub fn contains(&self, path: &str) -> bool {
        self.specs.contains_key(path)
    }

    pub fn get(&self, path: &str) -> Option<&ImportSpec> {
        self.specs.get(path)
    }

    /// Appends `spec`. Returns it back if its path is already present.
    pub fn insert(&mut self, spec: ImportSpec) -> Result<(), ImportSpec> {
        if self.specs.contains_key(&spec.path) {
            return Err(spec);
        }
        self.specs.insert(spec.path.clone(), spec);
        Ok(())
    }

    pub fn remove(&mut self, path: &str) -> Option<ImportSpec> {
        self.specs.shift_remove(path)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ImportSpec> {
        self.specs.values()
    }
}

/// Function or method declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct FuncDecl {
    /// Receiver (makes this a method).
    pub recv: Option<FieldList>,
    /// Function name.
    pub name: Ident,
    /// Type parameters of a generic function.
    pub type_params: Option<FieldList>,
    /// Parameters and results.
    pub typ: FuncType,
    /// Body (None for external declarations).
    pub body: Option<Block>,
    /// Source location.
    pub span: Span,
}

impl FuncDecl {
    /// The name bound to the receiver, when one is declared.
    pub fn receiver_name(&self) -> Option<&Ident> {
        self.recv
            .as_ref()
            .and_then(|r| r.fields.first())
            .and_then(|f| f.names.first())
    }
}

/// `const`, `var` or `type` declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct GenDecl {
    /// Declaration keyword.
    pub kind: GenKind,
    /// Specs in source order.
    pub specs: Vec<Spec>,
    /// Whether the source used the parenthesised form.
    pub grouped: bool,
    /// Source location.
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenKind {
    Const,
    Var,
    Type,
}

impl GenKind {
    pub fn keyword(self) -> &'static str {
        match self {
            GenKind::Const => "const",
            GenKind::Var => "var",
            GenKind::Type => "type",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Spec {
    Value(ValueSpec),
    Type(TypeSpec),
}

/// Value specification for const or var declarations.
#[derive(Debug, Clone, PartialEq)]
pub struct ValueSpec {
    /// Names being declared.
    pub names: Idents,
    /// Optional type annotation.
    pub typ: Option<Expr>,
    /// Optional initialisation values.
    pub values: Vec<Expr>,
    /// Source location.
    pub span: Span,
}

/// Type specification.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeSpec {
    /// Name of the type being declared.
    pub name: Ident,
    /// Type parameters of a generic type.
    pub type_params: Option<FieldList>,
    /// Alias (`type A = B`) rather than definition.
    pub alias: bool,
    /// The type.
    pub typ: Expr,
    /// Source location.
    pub span: Span,
}

/// Parameter, result, receiver, struct field or interface element list.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldList {
    /// The fields.
    pub fields: Vec<Field>,
    /// Whether the list was written inside delimiters.
    ///
    /// Only a single unnamed result type is written without parentheses.
    pub delimited: bool,
    /// Source location.
    pub span: Span,
}

impl FieldList {
    pub fn empty(span: Span) -> Self {
        Self {
            fields: Vec::new(),
            delimited: true,
            span,
        }
    }

    /// Iterates over all names declared by the list.
    pub fn names(&self) -> impl Iterator<Item = &Ident> {
        self.fields.iter().flat_map(|f| f.names.iter())
    }
}

/// Single field. Empty `names` is an anonymous parameter, embedded field or embedded
/// interface element.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    /// Field names.
    pub names: Idents,
    /// Field type (a [`ExprKind::FuncType`] for interface methods).
    pub typ: Expr,
    /// Struct tag.
    pub tag: Option<BasicLit>,
    /// Source location.
    pub span: Span,
}

/// Function signature.
#[derive(Debug, Clone, PartialEq)]
pub struct FuncType {
    /// Input parameters.
    pub params: FieldList,
    /// Results.
    pub results: Option<FieldList>,
    /// Source location.
    pub span: Span,
}

// =============================================================================
// Statements
// =============================================================================

/// Block of statements.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    /// Statements in source order.
    pub stmts: Vec<Stmt>,
    /// Source location (braces included).
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Stmt {
    pub kind: StmtKind,
    pub span: Span,
}

/// Statement node.
#[derive(Debug, Clone, PartialEq)]
pub enum StmtKind {
    /// Declaration statement.
    Decl(GenDecl),

    /// Empty statement.
    Empty,

    /// Labeled statement.
    Labeled {
        /// Label name.
        label: Ident,
        /// Statement being labeled.
        stmt: Box<Stmt>,
    },

    /// Expression statement.
    Expr(Expr),

    /// Channel send statement (`chan <- value`).
    Send {
        /// Channel expression.
        chan: Expr,
        /// Value to send.
        value: Expr,
    },

    /// `x++` or `x--`.
    IncDec {
        /// Operand.
        x: Expr,
        /// Increment rather than decrement.
        inc: bool,
    },

    /// Assignment, op-assignment or short variable declaration.
    Assign {
        /// Left-hand side expressions.
        lhs: Vec<Expr>,
        /// Assignment operator.
        op: AssignOp,
        /// Right-hand side expressions.
        rhs: Vec<Expr>,
    },

    /// `go` statement.
    Go(Expr),

    /// `defer` statement.
    Defer(Expr),

    /// Return statement.
    Return(Vec<Expr>),

    /// `break`, `continue`, `goto` or `fallthrough`.
    Branch {
        /// Which branch keyword.
        kind: BranchKind,
        /// Optional label.
        label: Option<Ident>,
    },

    /// Nested block.
    Block(Block),

    /// If statement.
    If {
        /// Optional initialisation statement.
        init: Option<Box<Stmt>>,
        /// Condition expression.
        cond: Expr,
        /// Then branch.
        then: Block,
        /// Else branch (another `If` or a `Block`).
        els: Option<Box<Stmt>>,
    },

    /// Expression switch.
    Switch {
        /// Optional initialisation statement.
        init: Option<Box<Stmt>>,
        /// Optional tag expression.
        tag: Option<Expr>,
        /// Case clauses.
        clauses: Vec<CaseClause>,
    },

    /// Type switch.
    TypeSwitch {
        /// Optional initialisation statement.
        init: Option<Box<Stmt>>,
        /// `x := y.(type)` or `y.(type)`.
        assign: Box<Stmt>,
        /// Case clauses listing types.
        clauses: Vec<CaseClause>,
    },

    /// Select statement.
    Select {
        /// Communication clauses.
        clauses: Vec<CommClause>,
    },

    /// Three-clause, condition-only or infinite loop.
    For {
        /// Initialisation statement.
        init: Option<Box<Stmt>>,
        /// Loop condition.
        cond: Option<Expr>,
        /// Post statement.
        post: Option<Box<Stmt>>,
        /// Loop body.
        body: Block,
    },

    /// Range loop.
    Range {
        /// Key (or index) expression.
        key: Option<Expr>,
        /// Value expression.
        value: Option<Expr>,
        /// `:=` rather than `=`.
        define: bool,
        /// Expression being ranged over.
        x: Expr,
        /// Loop body.
        body: Block,
    },
}

/// `case a, b:` or `default:` clause of a switch.
#[derive(Debug, Clone, PartialEq)]
pub struct CaseClause {
    /// Case expressions (or types); None for `default`.
    pub list: Option<Vec<Expr>>,
    /// Clause body.
    pub body: Vec<Stmt>,
    /// Source location.
    pub span: Span,
}

/// Clause of a select statement.
#[derive(Debug, Clone, PartialEq)]
pub struct CommClause {
    /// Send or receive statement; None for `default`.
    pub comm: Option<Box<Stmt>>,
    /// Clause body.
    pub body: Vec<Stmt>,
    /// Source location.
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BranchKind {
    Break,
    Continue,
    Goto,
    Fallthrough,
}

impl BranchKind {
    pub fn keyword(self) -> &'static str {
        match self {
            BranchKind::Break => "break",
            BranchKind::Continue => "continue",
            BranchKind::Goto => "goto",
            BranchKind::Fallthrough => "fallthrough",
        }
    }
}

/// Assignment operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOp {
    /// `=`
    Assign,
    /// `:=`
    Define,
    /// `+=`
    Add,
    /// `-=`
    Sub,
    /// `*=`
    Mul,
    /// `/=`
    Div,
    /// `%=`
    Rem,
    /// `&=`
    And,
    /// `|=`
    Or,
    /// `^=`
    Xor,
    /// `<<=`
    Shl,
    /// `>>=`
    Shr,
    /// `&^=`
    AndNot,
}

impl AssignOp {
    pub fn as_str(self) -> &'static str {
        match self {
            AssignOp::Assign => "=",
            AssignOp::Define => ":=",
            AssignOp::Add => "+=",
            AssignOp::Sub => "-=",
            AssignOp::Mul => "*=",
            AssignOp::Div => "/=",
            AssignOp::Rem => "%=",
            AssignOp::And => "&=",
            AssignOp::Or => "|=",
            AssignOp::Xor => "^=",
            AssignOp::Shl => "<<=",
            AssignOp::Shr => ">>=",
            AssignOp::AndNot => "&^=",
        }
    }
}

// =============================================================================
// Expressions
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

/// Expression node. Type expressions share the same enum.
#[rustfmt::skip]
#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    /// Identifier reference.
    Ident(String),

    /// Number, rune or string literal.
    BasicLit(BasicLit),

    /// Composite literal (`T{elements}`); elided types inside outer literals are None.
    CompositeLit {
        /// Type being constructed.
        typ: Option<Box<Expr>>,
        /// Elements (plain or [`ExprKind::KeyValue`]).
        elts: Vec<Expr>,
    },

    /// Function literal (closure).
    FuncLit {
        /// Signature.
        typ: FuncType,
        /// Body.
        body: Block,
    },

    /// Parenthesised expression.
    Paren(Box<Expr>),

    /// Selector expression (`x.sel`).
    Selector {
        /// Base expression.
        x: Box<Expr>,
        /// Selected identifier.
        sel: Ident,
    },

    /// Index or generic instantiation (`x[i]`, `f[A, B]`).
    Index {
        /// Base expression.
        x: Box<Expr>,
        /// One or more indices.
        indices: Vec<Expr>,
    },

    /// Slice expression (`x[lo:hi:max]`).
    Slice {
        /// Base expression.
        x: Box<Expr>,
        /// Low bound.
        low: Option<Box<Expr>>,
        /// High bound.
        high: Option<Box<Expr>>,
        /// Capacity bound.
        max: Option<Box<Expr>>,
        /// Three-index form.
        slice3: bool,
    },

    /// Type assertion (`x.(T)`); `typ` is None for `x.(type)`.
    TypeAssert {
        /// Expression being asserted.
        x: Box<Expr>,
        /// Asserted type.
        typ: Option<Box<Expr>>,
    },

    /// Function call.
    Call(CallExpr),

    /// Dereference or pointer type.
    Star(Box<Expr>),

    /// Unary operation.
    Unary {
        /// Operator.
        op: UnaryOp,
        /// Operand.
        x: Box<Expr>,
    },

    /// Binary operation.
    Binary {
        /// Operator.
        op: BinaryOp,
        /// Left operand.
        x: Box<Expr>,
        /// Right operand.
        y: Box<Expr>,
    },

    /// `key: value` element of a composite literal.
    KeyValue {
        /// Key.
        key: Box<Expr>,
        /// Value.
        value: Box<Expr>,
    },

    /// `...T` in a variadic parameter, or `[...]` array length.
    Ellipsis(Option<Box<Expr>>),

    /// Array (`[n]T`) or slice (`[]T`) type.
    ArrayType {
        /// Length (None for slices).
        len: Option<Box<Expr>>,
        /// Element type.
        elem: Box<Expr>,
    },

    /// Struct type.
    StructType(FieldList),

    /// Function type.
    FuncType(FuncType),

    /// Interface type (methods, embedded types, unions).
    InterfaceType(FieldList),

    /// Map type.
    MapType {
        /// Key type.
        key: Box<Expr>,
        /// Value type.
        value: Box<Expr>,
    },

    /// Channel type.
    ChanType {
        /// Direction.
        dir: ChanDir,
        /// Element type.
        value: Box<Expr>,
    },
}

/// Function call.
#[derive(Debug, Clone, PartialEq)]
pub struct CallExpr {
    /// Function being called.
    pub fun: Box<Expr>,
    /// Arguments.
    pub args: Vec<Expr>,
    /// Whether the last argument is spread (`...`).
    pub ellipsis: bool,
}

/// Basic literal with its raw source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasicLit {
    /// Kind of literal.
    pub kind: LitKind,
    /// Raw text, quotes included.
    pub value: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LitKind {
    Int,
    Float,
    Imag,
    Char,
    String,
}

/// Unary operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    /// `+x`
    Plus,
    /// `-x`
    Minus,
    /// `!x`
    Not,
    /// `^x`
    Xor,
    /// `&x`
    Addr,
    /// `<-x`
    Recv,
    /// `~T` in constraints
    Tilde,
}

impl UnaryOp {
    pub fn as_str(self) -> &'static str {
        match self {
            UnaryOp::Plus => "+",
            UnaryOp::Minus => "-",
            UnaryOp::Not => "!",
            UnaryOp::Xor => "^",
            UnaryOp::Addr => "&",
            UnaryOp::Recv => "<-",
            UnaryOp::Tilde => "~",
        }
    }
}

/// Binary operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    LOr,
    LAnd,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Add,
    Sub,
    Or,
    Xor,
    Mul,
    Div,
    Rem,
    Shl,
    Shr,
    And,
    AndNot,
}

impl BinaryOp {
    /// Go operator precedence (5 binds tightest).
    pub fn precedence(self) -> u8 {
        match self {
            BinaryOp::LOr => 1,
            BinaryOp::LAnd => 2,
            BinaryOp::Eq | BinaryOp::Ne | BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => 3,
            BinaryOp::Add | BinaryOp::Sub | BinaryOp::Or | BinaryOp::Xor => 4,
            BinaryOp::Mul
            | BinaryOp::Div
            | BinaryOp::Rem
            | BinaryOp::Shl
            | BinaryOp::Shr
            | BinaryOp::And
            | BinaryOp::AndNot => 5,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BinaryOp::LOr => "||",
            BinaryOp::LAnd => "&&",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Or => "|",
            BinaryOp::Xor => "^",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
            BinaryOp::Shl => "<<",
            BinaryOp::Shr => ">>",
            BinaryOp::And => "&",
            BinaryOp::AndNot => "&^",
        }
    }
}

/// Channel direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChanDir {
    /// `chan T`
    Both,
    /// `chan<- T`
    Send,
    /// `<-chan T`
    Recv,
}

// =============================================================================
// Construction helpers
// =============================================================================

impl Expr {
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Self { kind, span }
    }

    pub fn detached(kind: ExprKind) -> Self {
        Self::new(kind, Span::DETACHED)
    }

    pub fn ident(name: impl Into<String>) -> Self {
        Self::detached(ExprKind::Ident(name.into()))
    }

    /// `x.name`
    pub fn selector(x: Expr, name: impl Into<String>) -> Self {
        Self::detached(ExprKind::Selector {
            x: Box::new(x),
            sel: Ident::detached(name),
        })
    }

    pub fn call(fun: Expr, args: Vec<Expr>) -> Self {
        Self::detached(ExprKind::Call(CallExpr {
            fun: Box::new(fun),
            args,
            ellipsis: false,
        }))
    }

    /// `x.method(args)`
    pub fn method_call(x: Expr, method: impl Into<String>, args: Vec<Expr>) -> Self {
        Self::call(Self::selector(x, method), args)
    }

    /// Interpreted string literal holding `value`.
    pub fn string_lit(value: &str) -> Self {
        Self::detached(ExprKind::BasicLit(BasicLit {
            kind: LitKind::String,
            value: quote(value),
        }))
    }

    pub fn as_ident(&self) -> Option<&str> {
        match &self.kind {
            ExprKind::Ident(name) => Some(name),
            _ => None,
        }
    }

    /// `(base, selected name)` for a selector expression.
    pub fn as_selector(&self) -> Option<(&Expr, &str)> {
        match &self.kind {
            ExprKind::Selector { x, sel } => Some((x, &sel.name)),
            _ => None,
        }
    }

    pub fn as_call(&self) -> Option<&CallExpr> {
        match &self.kind {
            ExprKind::Call(call) => Some(call),
            _ => None,
        }
    }

    /// True for `a.b` where both sides are plain identifiers with the given names.
    pub fn is_qualified(&self, pkg: &str, name: &str) -> bool {
        matches!(self.as_selector(), Some((x, sel)) if sel == name && x.as_ident() == Some(pkg))
    }
}

/// Quotes `s` as a Go interpreted string literal.
pub fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\x07' => out.push_str("\\a"),
            '\x08' => out.push_str("\\b"),
            '\x0C' => out.push_str("\\f"),
            '\x0B' => out.push_str("\\v"),
            c if (c as u32) < 0x20 || c == '\x7F' => {
                out.push_str(&format!("\\x{:02x}", c as u32));
            }
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_name_uses_alias_then_last_element() {
        assert_eq!(ImportSpec::new("go.uber.org/zap", None).local_name(), "zap");
        assert_eq!(
            ImportSpec::new("go.uber.org/zap", Some("uzap")).local_name(),
            "uzap"
        );
        assert_eq!(
            ImportSpec::new("github.com/jackc/pgx/v5", None).local_name(),
            "pgx"
        );
        assert_eq!(ImportSpec::new("errors", None).local_name(), "errors");
    }

    #[test]
    fn import_set_rejects_duplicates_and_keeps_order_on_remove() {
        let mut set = ImportSet::new();
        for p in ["fmt", "go.uber.org/zap", "os"] {
            assert!(set.insert(ImportSpec::new(p, None)).is_ok());
        }
        assert!(set.insert(ImportSpec::new("fmt", Some("f"))).is_err());

        set.remove("go.uber.org/zap");
        let paths: Vec<_> = set.iter().map(|s| s.path.as_str()).collect();
        assert_eq!(paths, ["fmt", "os"]);
    }

    #[test]
    fn quote_escapes_like_go() {
        assert_eq!(quote("from error"), r#""from error""#);
        assert_eq!(quote(""), r#""""#);
        assert_eq!(quote("a\"b\\c\n"), r#""a\"b\\c\n""#);
        assert_eq!(quote("\x01"), r#""\x01""#);
    }

    #[test]
    fn qualified_selector_match() {
        let e = Expr::selector(Expr::ident("utils"), "Logger");
        assert!(e.is_qualified("utils", "Logger"));
        assert!(!e.is_qualified("utils", "logger"));
        assert!(!Expr::ident("utils").is_qualified("utils", "Logger"));
    }
}
