//! Source-preserving output.
//!
//! Only rewritten calls and touched import declarations are printed. Everything else,
//! comments and formatting included, is copied from the original text.

use std::ops::Range;

use crate::ast::{Decl, Expr, ImportDecl, Program, Span};
use crate::printer::{is_rewrite_root, Printer, RootCollector};
use crate::walk::{Visitor, Walk};

#[derive(Debug)]
struct Edit {
    range: Range<usize>,
    text: String,
}

/// Number of leading tabs on the line containing `pos`.
fn line_indent(source: &str, pos: usize) -> usize {
    let line_start = source[..pos].rfind('\n').map_or(0, |i| i + 1);
    source[line_start..]
        .bytes()
        .take_while(|&b| b == b'\t')
        .count()
}

/// The range of an erased declaration, extended over the rest of its line and any
/// blank lines after it.
fn erase_range(source: &str, span: Span) -> Range<usize> {
    let range = span.range();
    let bytes = source.as_bytes();
    let mut end = range.end.min(bytes.len());
    while end < bytes.len() && matches!(bytes[end], b' ' | b'\t') {
        end += 1;
    }
    while end < bytes.len() && matches!(bytes[end], b'\n' | b'\r') {
        end += 1;
    }
    range.start..end
}

/// End of the package clause, past any comments on the same line.
fn after_package_clause(source: &str, program: &Program) -> usize {
    let mut at = (program.package.span.end as usize).min(source.len());
    for c in program.comments.iter().map(|c| c.range()) {
        if c.start < at {
            continue;
        }
        if !source[at..c.start].bytes().all(|b| matches!(b, b' ' | b'\t')) {
            break;
        }
        at = c.end;
    }
    at
}

/// Outermost nodes below an expression that still carry a source span.
#[derive(Default)]
struct Spanned<'ast> {
    found: Vec<&'ast Expr>,
}

impl<'ast> Visitor<'ast> for Spanned<'ast> {
    fn visit_expr(&mut self, e: &'ast Expr) {
        if e.span.is_detached() {
            e.walk(self);
        } else {
            self.found.push(e);
        }
    }
}

/// True when reprinting `root` keeps `comment`: it lies in a node copied verbatim and
/// outside every rewrite root spliced into that node.
fn keeps_comment(root: &Expr, comment: Span) -> bool {
    let mut spanned = Spanned::default();
    root.walk(&mut spanned);
    let Some(node) = spanned.found.into_iter().find(|n| n.span.contains(comment)) else {
        return false;
    };
    if is_rewrite_root(node) {
        return keeps_comment(node, comment);
    }
    match RootCollector::collect(node)
        .into_iter()
        .find(|r| r.span.contains(comment))
    {
        Some(inner) => keeps_comment(inner, comment),
        None => true,
    }
}

/// Comments the reprint of `root` would drop, laid out to go in front of it.
///
/// Line comments end the line and the chain continues on the next one at `indent`.
fn displaced_comments(source: &str, program: &Program, root: &Expr, indent: usize) -> String {
    let mut out = String::new();
    for &c in &program.comments {
        if !root.span.contains(c) || keeps_comment(root, c) {
            continue;
        }
        let text = &source[c.range()];
        out.push_str(text);
        if text.starts_with("//") {
            out.push('\n');
            out.extend(std::iter::repeat('\t').take(indent));
        } else {
            out.push(' ');
        }
    }
    out
}

fn print_import(imp: &ImportDecl) -> String {
    let mut p = Printer::new();
    p.print_import_decl(imp);
    p.finish()
}

/// Regenerates the text of `program`, parsed from `source` and rewritten since.
pub fn render(source: &str, program: &Program) -> String {
    let mut edits = Vec::new();

    for decl in &program.decls {
        match decl {
            Decl::Import(imp) if imp.touched => {
                let text = print_import(imp);
                if imp.span.is_detached() {
                    let at = after_package_clause(source, program);
                    edits.push(Edit {
                        range: at..at,
                        text: format!("\n\n{text}"),
                    });
                } else {
                    edits.push(Edit {
                        range: imp.span.range(),
                        text,
                    });
                }
            }
            Decl::Import(_) => {}
            Decl::Func(_) | Decl::Gen(_) => {
                for root in RootCollector::collect(decl) {
                    let range = root.span.range();
                    let indent = line_indent(source, range.start);
                    let mut p = Printer::with_source(source).at_indent(indent);
                    p.print_expr(root);
                    let mut text = displaced_comments(source, program, root, indent);
                    text.push_str(&p.finish());
                    edits.push(Edit { range, text });
                }
            }
        }
    }

    for span in &program.erased {
        edits.push(Edit {
            range: erase_range(source, *span),
            text: String::new(),
        });
    }

    if edits.is_empty() {
        return source.to_string();
    }
    edits.sort_by_key(|e| (e.range.start, e.range.end));

    let mut out = String::with_capacity(source.len() + 64);
    let mut cursor = 0;
    for edit in edits {
        if edit.range.start < cursor || edit.range.end > source.len() {
            continue;
        }
        out.push_str(&source[cursor..edit.range.start]);
        out.push_str(&edit.text);
        cursor = edit.range.end;
    }
    out.push_str(&source[cursor..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::engine::process_file;
    use crate::parser::parse_source;
    use pretty_assertions::assert_eq;

    fn transform(src: &str) -> String {
        let out = process_file(parse_source(src).unwrap(), &Config::default()).unwrap();
        render(src, &out.program)
    }

    #[test]
    fn unchanged_program_renders_source() {
        let src = "package p\n\n// keep\nfunc f() { x := 1 }\n";
        assert_eq!(render(src, &parse_source(src).unwrap()), src);
    }

    #[test]
    fn comments_and_layout_survive_around_rewrites() {
        let src = r#"package p

import (
	"fmt"

	"go.uber.org/zap"
)

// f does things.
func f(id string) {
	x := 1 // trailing
	utils.Logger.Info("start", zap.String("id", id)) /* after */
	fmt.Println(x)
}
"#;
        let want = r#"package p

import (
	"fmt"
	"github.com/rs/zerolog"
)

// f does things.
func f(id string) {
	x := 1 // trailing
	logger.Info().Str("id", id).Msg("start") /* after */
	fmt.Println(x)
}
"#;
        assert_eq!(transform(src), want);
    }

    #[test]
    fn erased_import_takes_its_blank_lines() {
        let src = "package p\n\nimport \"go.uber.org/zap\"\n\nfunc f() {}\n";
        assert_eq!(transform(src), "package p\n\nfunc f() {}\n");
    }

    #[test]
    fn new_import_group_goes_after_package_clause() {
        let src = "package p\n\nfunc f() {\n\tutils.Logger.Warn(\"w\")\n}\n";
        let want = "package p\n\nimport (\n\t\"github.com/rs/zerolog\"\n)\n\nfunc f() {\n\tlogger.Warn().Msg(\"w\")\n}\n";
        assert_eq!(transform(src), want);
    }

    #[test]
    fn new_import_group_goes_after_package_line_comment() {
        let src = "package p // trailing\n\nfunc f() {\n\tutils.Logger.Warn(\"w\")\n}\n";
        let want = "package p // trailing\n\nimport (\n\t\"github.com/rs/zerolog\"\n)\n\nfunc f() {\n\tlogger.Warn().Msg(\"w\")\n}\n";
        assert_eq!(transform(src), want);
    }

    #[test]
    fn comments_between_arguments_move_in_front_of_the_chain() {
        let src = "package p\n\nimport \"go.uber.org/zap\"\n\nfunc f() {\n\tutils.Logger.Info(\"a\", // c1\n\t\tzap.String(\"k\", v), /* c2 */\n\t)\n}\n";
        let want = "package p\n\nimport \"github.com/rs/zerolog\"\n\nfunc f() {\n\t// c1\n\t/* c2 */ logger.Info().Str(\"k\", v).Msg(\"a\")\n}\n";
        assert_eq!(transform(src), want);
    }

    #[test]
    fn comments_inside_copied_arguments_stay_put() {
        let src = "package p\n\nfunc f() {\n\tutils.Logger.Info(msg(/* kept */ x))\n}\n";
        let out = transform(src);
        assert!(out.contains("\tlogger.Info().Msg(msg(/* kept */ x))\n"), "{out}");
    }

    #[test]
    fn multiline_arguments_are_copied_verbatim() {
        let src = "package p\n\nimport \"go.uber.org/zap\"\n\nfunc f() {\n\tutils.Logger.Info(\"m\",\n\t\tzap.Any(\"cfg\", Config{\n\t\t\tA: 1,\n\t\t}))\n}\n";
        let want = "package p\n\nimport \"github.com/rs/zerolog\"\n\nfunc f() {\n\tlogger.Info().Interface(\"cfg\", Config{\n\t\t\tA: 1,\n\t\t}).Msg(\"m\")\n}\n";
        assert_eq!(transform(src), want);
    }
}
