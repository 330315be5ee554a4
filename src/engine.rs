//! Per-file entry point of the rewrite engine.

use tracing::{debug, warn};

use crate::ast::Program;
use crate::config::Config;
use crate::error::{Diag, RewriteError};
use crate::imports::{reconcile_imports, resolve_namespaces};
use crate::rewrite::{rewrite_program, RewriteCtx};

/// Result of processing one file.
#[derive(Debug, Clone, PartialEq)]
pub struct Processed {
    pub program: Program,
    /// True if any call or import changed.
    pub changed: bool,
    /// Number of logger calls replaced.
    pub rewrites: usize,
    pub diagnostics: Vec<Diag>,
}

/// Rewrites the logger calls of one file and reconciles its imports.
///
/// The tree is taken by value: when the strict policy aborts, the caller gets the error
/// and no partially rewritten tree. Running it again on its own output changes nothing.
pub fn process_file(mut program: Program, cfg: &Config) -> Result<Processed, RewriteError> {
    let namespaces = resolve_namespaces(&program, cfg);
    let mut ctx = RewriteCtx::new(cfg, namespaces);

    let rewrote = rewrite_program(&mut program, &mut ctx).inspect_err(|err| {
        warn!(%err, "rewrite aborted");
    })?;

    let RewriteCtx {
        namespaces,
        diagnostics,
        wrap_used,
        rewrites,
        ..
    } = ctx;

    let imports_changed = reconcile_imports(&mut program, rewrote, wrap_used, &namespaces, cfg);
    debug!(rewrites, imports_changed, "processed file");

    Ok(Processed {
        program,
        changed: rewrote || imports_changed,
        rewrites,
        diagnostics,
    })
}
