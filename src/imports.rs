//! Import resolution and reconciliation.
//!
//! Resolution decides under which local names the rewriter refers to the field
//! constructors and the wrap helper. Reconciliation runs after the rewrite: it adds the
//! target and helper imports that the emitted code needs and drops the source import
//! once nothing references it.

use tracing::debug;

use crate::ast::{Decl, Expr, ExprKind, ImportDecl, ImportSpec, Program};
use crate::config::Config;
use crate::walk::{Visitor, Walk};

/// How a package is referenced from code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Namespace {
    /// Through a qualifier: `zap.String`.
    Qualified(String),
    /// Unqualified, through `import . "path"`.
    Dot,
}

impl Namespace {
    fn of(spec: &ImportSpec) -> Self {
        if spec.is_dot() {
            Namespace::Dot
        } else {
            Namespace::Qualified(spec.local_name().to_string())
        }
    }

    /// `<ns>.<name>` or bare `<name>`.
    pub fn member(&self, name: &str) -> Expr {
        match self {
            Namespace::Qualified(ns) => Expr::selector(Expr::ident(ns.clone()), name),
            Namespace::Dot => Expr::ident(name),
        }
    }

    /// The name of the member `e` refers to, when it refers into this namespace.
    pub fn member_name<'e>(&self, e: &'e Expr) -> Option<&'e str> {
        match self {
            Namespace::Qualified(ns) => match e.as_selector() {
                Some((x, name)) if x.as_ident() == Some(ns.as_str()) => Some(name),
                _ => None,
            },
            Namespace::Dot => e.as_ident(),
        }
    }
}

impl std::fmt::Display for Namespace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Namespace::Qualified(ns) => f.write_str(ns),
            Namespace::Dot => f.write_str("."),
        }
    }
}

/// Local names the rewriter uses in one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Namespaces {
    /// Namespace of the source field constructors.
    pub fields: Namespace,
    /// Namespace of the wrap helper.
    pub wrap: Namespace,
    /// Alias to import the wrap helper under, if it is not imported yet and its natural
    /// name is unavailable.
    pub wrap_alias: Option<String>,
}

/// Resolves the namespaces from the file's current imports.
pub fn resolve_namespaces(program: &Program, cfg: &Config) -> Namespaces {
    let fields = match program.find_import(&cfg.source.import_path) {
        Some(spec) => Namespace::of(spec),
        None => Namespace::of(&ImportSpec::new(cfg.source.import_path.as_str(), None)),
    };

    if let Some(spec) = program.find_import(&cfg.wrap.import_path) {
        return Namespaces {
            fields,
            wrap: Namespace::of(spec),
            wrap_alias: None,
        };
    }

    let taken = |name: &str| {
        program
            .import_decls()
            .flat_map(|d| d.specs.iter())
            .any(|s| s.local_name() == name)
    };
    let chosen = if taken(&cfg.wrap.package) {
        cfg.wrap.fallback_alias.clone()
    } else {
        cfg.wrap.package.clone()
    };
    let natural = ImportSpec::new(cfg.wrap.import_path.as_str(), None)
        .local_name()
        .to_string();
    let wrap_alias = (natural != chosen).then(|| chosen.clone());

    Namespaces {
        fields,
        wrap: Namespace::Qualified(chosen),
        wrap_alias,
    }
}

/// Finds a selector rooted at a given identifier anywhere in the tree.
struct NamespaceRefs<'n> {
    name: &'n str,
    found: bool,
}

impl<'ast> Visitor<'ast> for NamespaceRefs<'_> {
    fn visit_expr(&mut self, e: &'ast Expr) {
        if self.found {
            return;
        }
        if let ExprKind::Selector { x, .. } = &e.kind {
            if x.as_ident() == Some(self.name) {
                self.found = true;
                return;
            }
        }
        e.walk(self);
    }
}

/// True when some selector in the program is rooted at `name`.
pub fn references_namespace(program: &Program, name: &str) -> bool {
    let mut refs = NamespaceRefs { name, found: false };
    refs.visit_program(program);
    refs.found
}

/// Adds `path` to the first import declaration, creating one as the first declaration
/// when the file has none. Returns false if the path was already imported.
pub fn ensure_import(program: &mut Program, path: &str, alias: Option<&str>) -> bool {
    if program.find_import(path).is_some() {
        return false;
    }
    let spec = ImportSpec::new(path, alias);
    let first = program.decls.iter_mut().find_map(|d| match d {
        Decl::Import(imp) => Some(imp),
        Decl::Func(_) | Decl::Gen(_) => None,
    });
    match first {
        Some(imp) => {
            if imp.specs.insert(spec).is_err() {
                return false;
            }
            imp.touched = true;
        }
        None => {
            let mut imp = ImportDecl::detached();
            if imp.specs.insert(spec).is_err() {
                return false;
            }
            program.decls.insert(0, Decl::Import(imp));
        }
    }
    debug!(path, "added import");
    true
}

/// Removes `path` from every import declaration. Declarations left empty are dropped
/// and their source range is recorded in [`Program::erased`].
pub fn remove_import(program: &mut Program, path: &str) -> bool {
    let mut removed = false;
    for decl in &mut program.decls {
        if let Decl::Import(imp) = decl {
            if imp.specs.remove(path).is_some() {
                imp.touched = true;
                removed = true;
            }
        }
    }
    if !removed {
        return false;
    }
    let erased = &mut program.erased;
    program.decls.retain(|d| match d {
        Decl::Import(imp) if imp.specs.is_empty() => {
            if !imp.span.is_detached() {
                erased.push(imp.span);
            }
            false
        }
        _ => true,
    });
    debug!(path, "removed import");
    true
}

/// Brings the imports in line with the rewritten code. Returns whether any import changed.
///
/// The source import is kept while anything still refers to its namespace. Dot and
/// blank imports of it are always kept, since their uses cannot be found syntactically.
pub fn reconcile_imports(
    program: &mut Program,
    rewrote: bool,
    needs_wrap_helper: bool,
    namespaces: &Namespaces,
    cfg: &Config,
) -> bool {
    let mut changed = false;
    if rewrote {
        changed |= ensure_import(program, &cfg.target.import_path, None);
    }
    if needs_wrap_helper {
        changed |= ensure_import(
            program,
            &cfg.wrap.import_path,
            namespaces.wrap_alias.as_deref(),
        );
    }

    let source_name = match program.find_import(&cfg.source.import_path) {
        Some(spec) if spec.is_dot() || spec.local_name() == "_" => None,
        Some(spec) => Some(spec.local_name().to_string()),
        None => None,
    };
    if let Some(name) = source_name {
        if !references_namespace(program, &name) {
            changed |= remove_import(program, &cfg.source.import_path);
        }
    }
    changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_source;

    fn paths(program: &Program) -> Vec<Vec<String>> {
        program
            .import_decls()
            .map(|d| d.specs.iter().map(|s| s.path.clone()).collect())
            .collect()
    }

    #[test]
    fn wrap_helper_falls_back_to_alias_when_errors_is_taken() {
        let cfg = Config::default();
        let p = parse_source("package p\n\nimport (\n\t\"errors\"\n\t\"go.uber.org/zap\"\n)\n")
            .expect("parse");
        let ns = resolve_namespaces(&p, &cfg);
        assert_eq!(ns.fields, Namespace::Qualified("zap".into()));
        assert_eq!(ns.wrap, Namespace::Qualified("pkgerrors".into()));
        assert_eq!(ns.wrap_alias.as_deref(), Some("pkgerrors"));
    }

    #[test]
    fn existing_wrap_import_is_reused() {
        let cfg = Config::default();
        let p = parse_source("package p\n\nimport perr \"github.com/pkg/errors\"\n").expect("parse");
        let ns = resolve_namespaces(&p, &cfg);
        assert_eq!(ns.wrap, Namespace::Qualified("perr".into()));
        assert_eq!(ns.wrap_alias, None);
    }

    #[test]
    fn aliased_and_dot_source_imports() {
        let cfg = Config::default();
        let p = parse_source("package p\n\nimport uzap \"go.uber.org/zap\"\n").expect("parse");
        assert_eq!(
            resolve_namespaces(&p, &cfg).fields,
            Namespace::Qualified("uzap".into())
        );
        let p = parse_source("package p\n\nimport . \"go.uber.org/zap\"\n").expect("parse");
        assert_eq!(resolve_namespaces(&p, &cfg).fields, Namespace::Dot);
    }

    #[test]
    fn unused_source_import_is_dropped_and_empty_group_erased() {
        let cfg = Config::default();
        let mut p = parse_source("package p\n\nimport \"go.uber.org/zap\"\n\nfunc f() {}\n")
            .expect("parse");
        let ns = resolve_namespaces(&p, &cfg);
        assert!(reconcile_imports(&mut p, false, false, &ns, &cfg));
        assert!(p.import_decls().next().is_none());
        assert_eq!(p.erased.len(), 1);
    }

    #[test]
    fn referenced_source_import_survives() {
        let cfg = Config::default();
        let src = "package p\n\nimport \"go.uber.org/zap\"\n\nfunc f(l *zap.Logger) {}\n";
        let mut p = parse_source(src).expect("parse");
        let ns = resolve_namespaces(&p, &cfg);
        assert!(!reconcile_imports(&mut p, false, false, &ns, &cfg));
        assert_eq!(paths(&p), vec![vec!["go.uber.org/zap".to_string()]]);
    }

    #[test]
    fn target_import_appended_to_first_group_or_created() {
        let cfg = Config::default();
        let mut p = parse_source("package p\n\nimport (\n\t\"fmt\"\n)\n\nimport \"os\"\n")
            .expect("parse");
        let ns = resolve_namespaces(&p, &cfg);
        reconcile_imports(&mut p, true, true, &ns, &cfg);
        assert_eq!(
            paths(&p),
            vec![
                vec![
                    "fmt".to_string(),
                    "github.com/rs/zerolog".to_string(),
                    "github.com/pkg/errors".to_string()
                ],
                vec!["os".to_string()],
            ]
        );

        let mut bare = parse_source("package p\n\nfunc f() {}\n").expect("parse");
        let ns = resolve_namespaces(&bare, &cfg);
        reconcile_imports(&mut bare, true, false, &ns, &cfg);
        assert!(matches!(&bare.decls[0], Decl::Import(d) if d.span.is_detached() && d.touched));
    }
}
