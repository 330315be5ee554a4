use thiserror::Error;

/// Compact byte-span used across the crate.
///
/// Nodes produced by the rewriter instead of the parser carry [`Span::DETACHED`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Span {
    pub start: u32,
    pub end: u32, // exclusive
}

impl Span {
    /// Marker for nodes that have no position in the original source.
    pub const DETACHED: Span = Span {
        start: u32::MAX,
        end: u32::MAX,
    };

    #[inline]
    pub const fn new(start: usize, end: usize) -> Self {
        // Clamp rather than panic; a file over 4GiB is not Go source we care about.
        let s = if start > (u32::MAX - 1) as usize {
            u32::MAX - 1
        } else {
            start as u32
        };
        let e = if end > (u32::MAX - 1) as usize {
            u32::MAX - 1
        } else {
            end as u32
        };
        Self { start: s, end: e }
    }

    #[inline]
    pub const fn empty_at(pos: usize) -> Self {
        Self::new(pos, pos)
    }

    #[inline]
    pub const fn single_at(pos: usize) -> Self {
        Self::new(pos, pos.saturating_add(1))
    }

    pub const fn from_range(range: std::ops::Range<usize>) -> Self {
        Self::new(range.start, range.end)
    }

    #[inline]
    pub const fn is_detached(self) -> bool {
        self.start == u32::MAX
    }

    /// Smallest span covering both. A detached side yields the other side.
    #[inline]
    pub const fn to(self, other: Span) -> Span {
        if self.is_detached() {
            return other;
        }
        if other.is_detached() {
            return self;
        }
        let start = if self.start < other.start {
            self.start
        } else {
            other.start
        };
        let end = if self.end > other.end {
            self.end
        } else {
            other.end
        };
        Span { start, end }
    }

    #[inline]
    pub fn range(self) -> std::ops::Range<usize> {
        self.start as usize..self.end as usize
    }

    #[inline]
    pub const fn contains(self, other: Span) -> bool {
        !self.is_detached()
            && !other.is_detached()
            && self.start <= other.start
            && other.end <= self.end
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagKind {
    Lex,
    Parse,
    /// A field constructor with no entry in the field table.
    UnknownField,
    /// A field argument that is not a `<ns>.<Kind>(..)` call, skipped under the lenient policy.
    MalformedField,
    /// A function whose logger calls could not be rewritten (no usable receiver).
    SkippedFunction,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diag {
    pub kind: DiagKind,
    pub span: Span,
    pub message: String,
}

impl Diag {
    pub fn new(kind: DiagKind, span: Span, message: impl Into<String>) -> Self {
        Self {
            kind,
            span,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for Diag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.span.is_detached() {
            write!(f, "{:?}: {}", self.kind, self.message)
        } else {
            write!(
                f,
                "{:?} at {}..{}: {}",
                self.kind, self.span.start, self.span.end, self.message
            )
        }
    }
}

/// Parsing stops at the first syntax error; lexical diagnostics collected so far ride along.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseFailure {
    pub diags: Vec<Diag>,
}

impl std::fmt::Display for ParseFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.diags.first() {
            Some(first) if self.diags.len() > 1 => {
                write!(f, "{first} (and {} more)", self.diags.len() - 1)
            }
            Some(first) => write!(f, "{first}"),
            None => f.write_str("parse failed"),
        }
    }
}

impl std::error::Error for ParseFailure {}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq, Default)]
pub enum LexErrorKind {
    #[default]
    #[error("invalid token")]
    InvalidToken,
    #[error("invalid numeric literal")]
    InvalidNumber,
    #[error("invalid escape")]
    InvalidEscape,
    #[error("unterminated comment")]
    UnterminatedComment,
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("{kind}: {span:?}")]
pub struct LexError {
    pub kind: LexErrorKind,
    pub span: Span,
}

impl LexError {
    #[inline]
    pub fn diag(&self) -> Diag {
        Diag::new(DiagKind::Lex, self.span, self.kind.to_string())
    }
}

/// Shape violations raised while building a replacement chain.
///
/// Under the lenient policy these become [`DiagKind::MalformedField`] diagnostics; under the
/// strict policy the first one aborts the rewrite of the whole file.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RewriteError {
    #[error("field argument at {}..{} is not a call expression", .span.start, .span.end)]
    FieldNotCall { span: Span },
    #[error("field call at {}..{} is not a `{namespace}.<Kind>(..)` constructor", .span.start, .span.end)]
    FieldNotFromNamespace { span: Span, namespace: String },
    #[error("`{namespace}.{kind}` at {}..{} takes exactly one argument, found {found}", .span.start, .span.end)]
    ErrorFieldArity {
        span: Span,
        namespace: String,
        kind: String,
        found: usize,
    },
}

impl RewriteError {
    pub fn span(&self) -> Span {
        match self {
            RewriteError::FieldNotCall { span }
            | RewriteError::FieldNotFromNamespace { span, .. }
            | RewriteError::ErrorFieldArity { span, .. } => *span,
        }
    }

    pub fn diag(&self) -> Diag {
        Diag::new(DiagKind::MalformedField, self.span(), self.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detached_span_is_absorbed_by_to() {
        let a = Span::new(4, 9);
        assert_eq!(a.to(Span::DETACHED), a);
        assert_eq!(Span::DETACHED.to(a), a);
        assert_eq!(a.to(Span::new(1, 6)), Span::new(1, 9));
    }

    #[test]
    fn contains_ignores_detached() {
        let outer = Span::new(0, 10);
        assert!(outer.contains(Span::new(2, 3)));
        assert!(!outer.contains(Span::DETACHED));
        assert!(!Span::DETACHED.contains(outer));
    }

    #[test]
    fn parse_failure_display_mentions_remaining_count() {
        let f = ParseFailure {
            diags: vec![
                Diag::new(DiagKind::Parse, Span::new(3, 4), "expected `)`"),
                Diag::new(DiagKind::Lex, Span::new(9, 10), "invalid token"),
            ],
        };
        assert_eq!(f.to_string(), "Parse at 3..4: expected `)` (and 1 more)");
    }

    #[test]
    fn rewrite_error_becomes_malformed_field_diag() {
        let err = RewriteError::FieldNotCall {
            span: Span::new(10, 12),
        };
        let d = err.diag();
        assert_eq!(d.kind, DiagKind::MalformedField);
        assert_eq!(d.message, "field argument at 10..12 is not a call expression");
    }
}
