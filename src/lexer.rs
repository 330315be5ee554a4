use std::collections::VecDeque;

use logos::{Lexer as LogosLexer, Logos};
use unicode_ident::{is_xid_continue, is_xid_start};

use crate::error::{Diag, LexError, LexErrorKind, Span};

// =============================================================================
// Raw scanner
// =============================================================================

#[derive(Logos, Debug, Clone, Copy, PartialEq)]
#[logos(error = LexErrorKind)]
enum RawTok {
    // --- Trivia ---
    #[regex(r"[ \t\x0C]+", logos::skip)]
    _Ws,

    // Newlines are kept to implement semicolon insertion.
    #[regex(r"\r\n|\n|\r")]
    Newline,

    #[regex(r"//[^\n\r]*")]
    LineComment,

    // Not skipped: a block comment spanning lines acts as a newline.
    #[token("/*", lex_block_comment)]
    BlockComment,

    // --- Ident & keywords (keywords are mapped in the adapter) ---
    #[regex(r"[_\p{XID_Start}][_\p{XID_Continue}]*")]
    Ident,

    // --- Literals ---
    #[regex(r"`[^`]*`")]
    RawString,

    #[regex(r#""([^"\\\n\r]|\\.)*""#, validate_escapes)]
    String,

    #[regex(r"'([^'\\\n\r]|\\.)+'", validate_escapes)]
    Rune,

    #[regex(r"[0-9][0-9_]*", validate_number)]
    #[regex(r"0[xX][0-9a-fA-F_]+", validate_number)]
    #[regex(r"0[bB][01_]+", validate_number)]
    #[regex(r"0[oO][0-7_]+", validate_number)]
    Int,

    #[regex(r"[0-9][0-9_]*\.[0-9_]*([eE][+-]?[0-9_]+)?", validate_number)]
    #[regex(r"[0-9][0-9_]*[eE][+-]?[0-9_]+", validate_number)]
    #[regex(r"\.[0-9][0-9_]*([eE][+-]?[0-9_]+)?", validate_number)]
    #[regex(r"0[xX][0-9a-fA-F_]*(\.[0-9a-fA-F_]*)?[pP][+-]?[0-9_]+", validate_number)]
    Float,

    #[regex(r"([0-9][0-9_]*(\.[0-9_]*)?([eE][+-]?[0-9_]+)?|\.[0-9][0-9_]*([eE][+-]?[0-9_]+)?|0[xX][0-9a-fA-F_]+)i", validate_number)]
    Imag,

    // --- Operators and delimiters ---
    #[token("...")]
    Ellipsis,

    #[token("<<=")]
    ShlAssign,
    #[token(">>=")]
    ShrAssign,
    #[token("&^=")]
    AndNotAssign,

    #[token("+=")]
    AddAssign,
    #[token("-=")]
    SubAssign,
    #[token("*=")]
    MulAssign,
    #[token("/=")]
    DivAssign,
    #[token("%=")]
    ModAssign,
    #[token("&=")]
    AndAssign,
    #[token("|=")]
    OrAssign,
    #[token("^=")]
    XorAssign,

    #[token("<<")]
    Shl,
    #[token(">>")]
    Shr,
    #[token("&^")]
    AndNot,

    #[token("&&")]
    LAnd,
    #[token("||")]
    LOr,

    #[token("==")]
    EqEq,
    #[token("!=")]
    NotEq,
    #[token("<=")]
    Le,
    #[token(">=")]
    Ge,

    #[token("++")]
    Inc,
    #[token("--")]
    Dec,

    #[token(":=")]
    Define,
    #[token("<-")]
    Arrow,

    #[token("=")]
    Assign,
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("%")]
    Percent,
    #[token("&")]
    Amp,
    #[token("|")]
    Pipe,
    #[token("^")]
    Caret,
    #[token("~")]
    Tilde,
    #[token("!")]
    Bang,
    #[token("<")]
    Lt,
    #[token(">")]
    Gt,

    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("[")]
    LBrack,
    #[token("]")]
    RBrack,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,

    #[token(",")]
    Comma,
    #[token(";")]
    Semi,
    #[token(":")]
    Colon,
    #[token(".")]
    Dot,
}

fn lex_block_comment(lex: &mut LogosLexer<'_, RawTok>) -> Result<(), LexErrorKind> {
    let rem = lex.remainder().as_bytes();
    let mut search_start = 0;

    while let Some(star) = memchr::memchr(b'*', &rem[search_start..]) {
        let at = search_start + star;
        if rem.get(at + 1) == Some(&b'/') {
            lex.bump(at + 2);
            return Ok(());
        }
        search_start = at + 1;
    }

    lex.bump(rem.len());
    Err(LexErrorKind::UnterminatedComment)
}

/// Checks Go escape sequences inside an interpreted string or rune literal.
///
/// The slice includes the surrounding quotes. Rune literals are not checked for
/// holding exactly one code point; the rewriter never looks inside them.
fn validate_escapes(lex: &mut LogosLexer<'_, RawTok>) -> Result<(), LexErrorKind> {
    let s = lex.slice();
    let body = &s[1..s.len() - 1];
    let mut it = body.chars().peekable();

    while let Some(c) = it.next() {
        if c != '\\' {
            continue;
        }
        let hex_digits = match it.next() {
            Some('a' | 'b' | 'f' | 'n' | 'r' | 't' | 'v' | '\\' | '"' | '\'') => 0,
            Some('x') => 2,
            Some('u') => 4,
            Some('U') => 8,
            Some('0'..='7') => {
                for _ in 0..2 {
                    match it.next() {
                        Some('0'..='7') => {}
                        _ => return Err(LexErrorKind::InvalidEscape),
                    }
                }
                0
            }
            _ => return Err(LexErrorKind::InvalidEscape),
        };
        for _ in 0..hex_digits {
            let h = it.next().ok_or(LexErrorKind::InvalidEscape)?;
            if !h.is_ascii_hexdigit() {
                return Err(LexErrorKind::InvalidEscape);
            }
        }
    }
    Ok(())
}

fn validate_number(lex: &mut LogosLexer<'_, RawTok>) -> Result<(), LexErrorKind> {
    let s = lex.slice();
    if s.ends_with('_') || s.contains("__") || s.contains("_.") || s.contains("._") {
        return Err(LexErrorKind::InvalidNumber);
    }
    Ok(())
}

// =============================================================================
// Tokens handed to the parser
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tok<'src> {
    // Identifiers + literals (raw source text)
    Ident(&'src str),
    IntLit(&'src str),
    FloatLit(&'src str),
    ImagLit(&'src str),
    RuneLit(&'src str),
    StringLit(&'src str),
    RawStringLit(&'src str),

    // Keywords
    KwBreak,
    KwCase,
    KwChan,
    KwConst,
    KwContinue,
    KwDefault,
    KwDefer,
    KwElse,
    KwFallthrough,
    KwFor,
    KwFunc,
    KwGo,
    KwGoto,
    KwIf,
    KwImport,
    KwInterface,
    KwMap,
    KwPackage,
    KwRange,
    KwReturn,
    KwSelect,
    KwStruct,
    KwSwitch,
    KwType,
    KwVar,

    // Operators and punctuation
    Ellipsis,

    ShlAssign,
    ShrAssign,
    AndNotAssign,
    AddAssign,
    SubAssign,
    MulAssign,
    DivAssign,
    ModAssign,
    AndAssign,
    OrAssign,
    XorAssign,

    Shl,
    Shr,
    AndNot,

    LAnd,
    LOr,

    EqEq,
    NotEq,
    Le,
    Ge,

    Inc,
    Dec,

    Define,
    Arrow,

    Assign,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Amp,
    Pipe,
    Caret,
    Tilde,
    Bang,
    Lt,
    Gt,

    LParen,
    RParen,
    LBrack,
    RBrack,
    LBrace,
    RBrace,

    Comma,
    Semi,
    Colon,
    Dot,

    /// Stands in for input the scanner rejected; a diagnostic was recorded.
    Error,
}

impl Tok<'_> {
    pub fn is_basic_lit(&self) -> bool {
        matches!(
            self,
            Tok::IntLit(_)
                | Tok::FloatLit(_)
                | Tok::ImagLit(_)
                | Tok::RuneLit(_)
                | Tok::StringLit(_)
                | Tok::RawStringLit(_)
        )
    }

    fn can_insert_semi_after(&self) -> bool {
        self.is_basic_lit()
            || matches!(
                self,
                Tok::Ident(_)
                    | Tok::KwBreak
                    | Tok::KwContinue
                    | Tok::KwFallthrough
                    | Tok::KwReturn
                    | Tok::Inc
                    | Tok::Dec
                    | Tok::RParen
                    | Tok::RBrack
                    | Tok::RBrace
            )
    }
}

impl std::fmt::Display for Tok<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            Tok::Ident(s)
            | Tok::IntLit(s)
            | Tok::FloatLit(s)
            | Tok::ImagLit(s)
            | Tok::RuneLit(s)
            | Tok::StringLit(s)
            | Tok::RawStringLit(s) => s,
            Tok::KwBreak => "break",
            Tok::KwCase => "case",
            Tok::KwChan => "chan",
            Tok::KwConst => "const",
            Tok::KwContinue => "continue",
            Tok::KwDefault => "default",
            Tok::KwDefer => "defer",
            Tok::KwElse => "else",
            Tok::KwFallthrough => "fallthrough",
            Tok::KwFor => "for",
            Tok::KwFunc => "func",
            Tok::KwGo => "go",
            Tok::KwGoto => "goto",
            Tok::KwIf => "if",
            Tok::KwImport => "import",
            Tok::KwInterface => "interface",
            Tok::KwMap => "map",
            Tok::KwPackage => "package",
            Tok::KwRange => "range",
            Tok::KwReturn => "return",
            Tok::KwSelect => "select",
            Tok::KwStruct => "struct",
            Tok::KwSwitch => "switch",
            Tok::KwType => "type",
            Tok::KwVar => "var",
            Tok::Ellipsis => "...",
            Tok::ShlAssign => "<<=",
            Tok::ShrAssign => ">>=",
            Tok::AndNotAssign => "&^=",
            Tok::AddAssign => "+=",
            Tok::SubAssign => "-=",
            Tok::MulAssign => "*=",
            Tok::DivAssign => "/=",
            Tok::ModAssign => "%=",
            Tok::AndAssign => "&=",
            Tok::OrAssign => "|=",
            Tok::XorAssign => "^=",
            Tok::Shl => "<<",
            Tok::Shr => ">>",
            Tok::AndNot => "&^",
            Tok::LAnd => "&&",
            Tok::LOr => "||",
            Tok::EqEq => "==",
            Tok::NotEq => "!=",
            Tok::Le => "<=",
            Tok::Ge => ">=",
            Tok::Inc => "++",
            Tok::Dec => "--",
            Tok::Define => ":=",
            Tok::Arrow => "<-",
            Tok::Assign => "=",
            Tok::Plus => "+",
            Tok::Minus => "-",
            Tok::Star => "*",
            Tok::Slash => "/",
            Tok::Percent => "%",
            Tok::Amp => "&",
            Tok::Pipe => "|",
            Tok::Caret => "^",
            Tok::Tilde => "~",
            Tok::Bang => "!",
            Tok::Lt => "<",
            Tok::Gt => ">",
            Tok::LParen => "(",
            Tok::RParen => ")",
            Tok::LBrack => "[",
            Tok::RBrack => "]",
            Tok::LBrace => "{",
            Tok::RBrace => "}",
            Tok::Comma => ",",
            Tok::Semi => ";",
            Tok::Colon => ":",
            Tok::Dot => ".",
            Tok::Error => "<error>",
        };
        f.write_str(text)
    }
}

fn keyword_or_ident(s: &str) -> Tok<'_> {
    match s {
        "break" => Tok::KwBreak,
        "case" => Tok::KwCase,
        "chan" => Tok::KwChan,
        "const" => Tok::KwConst,
        "continue" => Tok::KwContinue,
        "default" => Tok::KwDefault,
        "defer" => Tok::KwDefer,
        "else" => Tok::KwElse,
        "fallthrough" => Tok::KwFallthrough,
        "for" => Tok::KwFor,
        "func" => Tok::KwFunc,
        "go" => Tok::KwGo,
        "goto" => Tok::KwGoto,
        "if" => Tok::KwIf,
        "import" => Tok::KwImport,
        "interface" => Tok::KwInterface,
        "map" => Tok::KwMap,
        "package" => Tok::KwPackage,
        "range" => Tok::KwRange,
        "return" => Tok::KwReturn,
        "select" => Tok::KwSelect,
        "struct" => Tok::KwStruct,
        "switch" => Tok::KwSwitch,
        "type" => Tok::KwType,
        "var" => Tok::KwVar,
        _ => Tok::Ident(s),
    }
}

fn is_valid_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    (first == '_' || is_xid_start(first)) && chars.all(|c| c == '_' || is_xid_continue(c))
}

// =============================================================================
// Semicolon-inserting adapter
// =============================================================================

pub type SpannedTok<'src> = (usize, Tok<'src>, usize);

/// Go token stream with automatic semicolon insertion.
///
/// Inserted semicolons are zero-width tokens positioned at the newline (or end of input)
/// that triggered them.
pub struct Lexer<'src> {
    logos: LogosLexer<'src, RawTok>,
    pending: VecDeque<SpannedTok<'src>>,
    diags: Vec<Diag>,
    comments: Vec<Span>,
    last_can_insert_semi: bool,
    src_len: usize,
    eof_done: bool,
}

impl<'src> Lexer<'src> {
    pub fn new(input: &'src str) -> Self {
        Self {
            logos: RawTok::lexer(input),
            pending: VecDeque::new(),
            diags: Vec::new(),
            comments: Vec::new(),
            last_can_insert_semi: false,
            src_len: input.len(),
            eof_done: false,
        }
    }

    pub fn take_diags(&mut self) -> Vec<Diag> {
        std::mem::take(&mut self.diags)
    }

    /// Spans of the comments seen so far, in source order.
    pub fn take_comments(&mut self) -> Vec<Span> {
        std::mem::take(&mut self.comments)
    }

    fn push_lex_diag(&mut self, kind: LexErrorKind, span: std::ops::Range<usize>) {
        let err = LexError {
            kind,
            span: Span::from_range(span),
        };
        self.diags.push(err.diag());
    }

    fn emit_semi_at(&mut self, pos: usize) {
        self.pending.push_back((pos, Tok::Semi, pos));
    }

    fn error_token(&mut self, kind: LexErrorKind, span: std::ops::Range<usize>) -> SpannedTok<'src> {
        self.push_lex_diag(kind, span.clone());
        self.last_can_insert_semi = false;
        (span.start, Tok::Error, span.end)
    }
}

impl<'src> Iterator for Lexer<'src> {
    type Item = SpannedTok<'src>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(sp) = self.pending.pop_front() {
                return Some(sp);
            }
            if self.eof_done {
                return None;
            }

            let Some(raw) = self.logos.next() else {
                self.eof_done = true;
                if self.last_can_insert_semi {
                    self.last_can_insert_semi = false;
                    self.emit_semi_at(self.src_len);
                }
                continue;
            };

            let span = self.logos.span();
            let slice: &'src str = self.logos.slice();

            let tok = match raw {
                Err(kind) => return Some(self.error_token(kind, span)),
                Ok(RawTok::Newline) => {
                    if self.last_can_insert_semi {
                        self.last_can_insert_semi = false;
                        self.emit_semi_at(span.start);
                    }
                    continue;
                }
                Ok(RawTok::BlockComment) => {
                    self.comments.push(Span::from_range(span.clone()));
                    if slice.contains(['\n', '\r']) && self.last_can_insert_semi {
                        self.last_can_insert_semi = false;
                        self.emit_semi_at(span.start);
                    }
                    continue;
                }
                Ok(RawTok::LineComment) => {
                    self.comments.push(Span::from_range(span));
                    continue;
                }
                Ok(RawTok::_Ws) => continue,
                Ok(RawTok::Ident) => {
                    if !is_valid_identifier(slice) {
                        return Some(self.error_token(LexErrorKind::InvalidToken, span));
                    }
                    keyword_or_ident(slice)
                }
                Ok(RawTok::Int) => Tok::IntLit(slice),
                Ok(RawTok::Float) => Tok::FloatLit(slice),
                Ok(RawTok::Imag) => Tok::ImagLit(slice),
                Ok(RawTok::Rune) => Tok::RuneLit(slice),
                Ok(RawTok::String) => Tok::StringLit(slice),
                Ok(RawTok::RawString) => Tok::RawStringLit(slice),
                Ok(RawTok::Ellipsis) => Tok::Ellipsis,
                Ok(RawTok::ShlAssign) => Tok::ShlAssign,
                Ok(RawTok::ShrAssign) => Tok::ShrAssign,
                Ok(RawTok::AndNotAssign) => Tok::AndNotAssign,
                Ok(RawTok::AddAssign) => Tok::AddAssign,
                Ok(RawTok::SubAssign) => Tok::SubAssign,
                Ok(RawTok::MulAssign) => Tok::MulAssign,
                Ok(RawTok::DivAssign) => Tok::DivAssign,
                Ok(RawTok::ModAssign) => Tok::ModAssign,
                Ok(RawTok::AndAssign) => Tok::AndAssign,
                Ok(RawTok::OrAssign) => Tok::OrAssign,
                Ok(RawTok::XorAssign) => Tok::XorAssign,
                Ok(RawTok::Shl) => Tok::Shl,
                Ok(RawTok::Shr) => Tok::Shr,
                Ok(RawTok::AndNot) => Tok::AndNot,
                Ok(RawTok::LAnd) => Tok::LAnd,
                Ok(RawTok::LOr) => Tok::LOr,
                Ok(RawTok::EqEq) => Tok::EqEq,
                Ok(RawTok::NotEq) => Tok::NotEq,
                Ok(RawTok::Le) => Tok::Le,
                Ok(RawTok::Ge) => Tok::Ge,
                Ok(RawTok::Inc) => Tok::Inc,
                Ok(RawTok::Dec) => Tok::Dec,
                Ok(RawTok::Define) => Tok::Define,
                Ok(RawTok::Arrow) => Tok::Arrow,
                Ok(RawTok::Assign) => Tok::Assign,
                Ok(RawTok::Plus) => Tok::Plus,
                Ok(RawTok::Minus) => Tok::Minus,
                Ok(RawTok::Star) => Tok::Star,
                Ok(RawTok::Slash) => Tok::Slash,
                Ok(RawTok::Percent) => Tok::Percent,
                Ok(RawTok::Amp) => Tok::Amp,
                Ok(RawTok::Pipe) => Tok::Pipe,
                Ok(RawTok::Caret) => Tok::Caret,
                Ok(RawTok::Tilde) => Tok::Tilde,
                Ok(RawTok::Bang) => Tok::Bang,
                Ok(RawTok::Lt) => Tok::Lt,
                Ok(RawTok::Gt) => Tok::Gt,
                Ok(RawTok::LParen) => Tok::LParen,
                Ok(RawTok::RParen) => Tok::RParen,
                Ok(RawTok::LBrack) => Tok::LBrack,
                Ok(RawTok::RBrack) => Tok::RBrack,
                Ok(RawTok::LBrace) => Tok::LBrace,
                Ok(RawTok::RBrace) => Tok::RBrace,
                Ok(RawTok::Comma) => Tok::Comma,
                Ok(RawTok::Semi) => Tok::Semi,
                Ok(RawTok::Colon) => Tok::Colon,
                Ok(RawTok::Dot) => Tok::Dot,
            };

            self.last_can_insert_semi = tok.can_insert_semi_after();
            return Some((span.start, tok, span.end));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toks(src: &str) -> Vec<Tok<'_>> {
        Lexer::new(src).map(|(_, t, _)| t).collect()
    }

    #[test]
    fn inserts_semicolon_after_call_at_newline() {
        let got = toks("f(x)\ny++\n");
        assert_eq!(
            got,
            vec![
                Tok::Ident("f"),
                Tok::LParen,
                Tok::Ident("x"),
                Tok::RParen,
                Tok::Semi,
                Tok::Ident("y"),
                Tok::Inc,
                Tok::Semi,
            ]
        );
    }

    #[test]
    fn no_semicolon_after_operator_or_comma() {
        let got = toks("a +\nb,\nc");
        assert_eq!(
            got,
            vec![
                Tok::Ident("a"),
                Tok::Plus,
                Tok::Ident("b"),
                Tok::Comma,
                Tok::Ident("c"),
                Tok::Semi,
            ]
        );
    }

    #[test]
    fn multiline_block_comment_acts_as_newline() {
        let got = toks("return /* a\nb */ x");
        assert_eq!(
            got,
            vec![Tok::KwReturn, Tok::Semi, Tok::Ident("x"), Tok::Semi]
        );
    }

    #[test]
    fn line_comment_keeps_the_newline() {
        let got = toks("x // trailing\ny");
        assert_eq!(
            got,
            vec![Tok::Ident("x"), Tok::Semi, Tok::Ident("y"), Tok::Semi]
        );
    }

    #[test]
    fn comment_spans_are_recorded_in_order() {
        let src = "x // one\ny /* two */";
        let mut lx = Lexer::new(src);
        let _ = lx.by_ref().count();
        let got: Vec<_> = lx
            .take_comments()
            .into_iter()
            .map(|c| &src[c.range()])
            .collect();
        assert_eq!(got, vec!["// one", "/* two */"]);
    }

    #[test]
    fn literals_keep_their_raw_text() {
        let got = toks(r#""a\tb" `raw` 'x' 0x1F 1.5e3 2i"#);
        assert_eq!(
            got,
            vec![
                Tok::StringLit(r#""a\tb""#),
                Tok::RawStringLit("`raw`"),
                Tok::RuneLit("'x'"),
                Tok::IntLit("0x1F"),
                Tok::FloatLit("1.5e3"),
                Tok::ImagLit("2i"),
                Tok::Semi,
            ]
        );
    }

    #[test]
    fn bad_escape_is_reported_and_recovered() {
        let mut lx = Lexer::new(r#"x := "\q""#);
        let got: Vec<_> = lx.by_ref().map(|(_, t, _)| t).collect();
        assert!(got.contains(&Tok::Error));
        let diags = lx.take_diags();
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].message, "invalid escape");
    }

    #[test]
    fn unterminated_block_comment_is_an_error() {
        let mut lx = Lexer::new("x /* never closed");
        let _ = lx.by_ref().count();
        let diags = lx.take_diags();
        assert_eq!(diags[0].message, "unterminated comment");
    }
}
