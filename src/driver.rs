//! File-level driver: discovery, per-file processing and output.
//!
//! Each file is parsed, rewritten and rendered on its own. A failure is reported for
//! that file and the rest of the batch carries on.

use std::fs;
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use thiserror::Error;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::config::Config;
use crate::engine::process_file;
use crate::error::{Diag, ParseFailure, RewriteError};
use crate::parser::parse_source;
use crate::render::render;

/// Failure to transform a source text.
#[derive(Debug, Error)]
pub enum TransformError {
    #[error("parse error: {0}")]
    Parse(#[from] ParseFailure),
    #[error("rewrite aborted: {0}")]
    Rewrite(#[from] RewriteError),
}

/// Failure on one file; the rest of the batch is unaffected.
#[derive(Debug, Error)]
pub enum FileError {
    #[error("{}: cannot read: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{}: {source}", .path.display())]
    Transform {
        path: PathBuf,
        #[source]
        source: TransformError,
    },
    #[error("{}: cannot write: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot walk {}: {source}", .path.display())]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },
}

impl FileError {
    pub fn path(&self) -> &Path {
        match self {
            FileError::Read { path, .. }
            | FileError::Transform { path, .. }
            | FileError::Write { path, .. }
            | FileError::Walk { path, .. } => path,
        }
    }
}

/// Output of [`transform_source`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transformed {
    /// New text; the input itself when nothing changed.
    pub output: String,
    pub changed: bool,
    pub rewrites: usize,
    pub diagnostics: Vec<Diag>,
}

/// Parses, rewrites and renders one source text.
pub fn transform_source(source: &str, cfg: &Config) -> Result<Transformed, TransformError> {
    let program = parse_source(source)?;
    let processed = process_file(program, cfg)?;
    let output = if processed.changed {
        render(source, &processed.program)
    } else {
        source.to_string()
    };
    Ok(Transformed {
        output,
        changed: processed.changed,
        rewrites: processed.rewrites,
        diagnostics: processed.diagnostics,
    })
}

/// What to process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    File(PathBuf),
    /// Every `.go` file below a directory.
    Dir(PathBuf),
}

/// What to do with a changed file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputMode {
    /// Hand the new text back for printing.
    #[default]
    Print,
    /// Overwrite the file.
    InPlace,
    /// Only report whether the file would change.
    Check,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
    pub target: Target,
    pub mode: OutputMode,
}

/// Outcome for one successfully processed file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileOutcome {
    pub path: PathBuf,
    pub changed: bool,
    pub rewrites: usize,
    pub diagnostics: Vec<Diag>,
    /// New text of a changed file in print mode.
    pub output: Option<String>,
}

/// Outcome of a whole run, in discovery order.
#[derive(Debug, Default)]
pub struct RunSummary {
    pub outcomes: Vec<FileOutcome>,
    pub failures: Vec<FileError>,
}

impl RunSummary {
    pub fn changed_files(&self) -> impl Iterator<Item = &FileOutcome> {
        self.outcomes.iter().filter(|o| o.changed)
    }

    pub fn total_rewrites(&self) -> usize {
        self.outcomes.iter().map(|o| o.rewrites).sum()
    }

    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }
}

fn is_go_file(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "go")
}

/// All `.go` files below `root`, sorted by path.
pub fn discover(root: &Path) -> Result<Vec<PathBuf>, FileError> {
    let mut files = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.map_err(|source| FileError::Walk {
            path: root.to_path_buf(),
            source,
        })?;
        if entry.file_type().is_file() && is_go_file(entry.path()) {
            files.push(entry.into_path());
        }
    }
    debug!(root = %root.display(), count = files.len(), "discovered files");
    Ok(files)
}

/// Processes one file according to `mode`.
pub fn process_path(path: &Path, mode: OutputMode, cfg: &Config) -> Result<FileOutcome, FileError> {
    let source = fs::read_to_string(path).map_err(|source| FileError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let t = transform_source(&source, cfg).map_err(|source| FileError::Transform {
        path: path.to_path_buf(),
        source,
    })?;

    for d in &t.diagnostics {
        warn!(file = %path.display(), "{d}");
    }

    let mut output = None;
    if t.changed {
        match mode {
            OutputMode::InPlace => {
                fs::write(path, &t.output).map_err(|source| FileError::Write {
                    path: path.to_path_buf(),
                    source,
                })?;
                info!(file = %path.display(), rewrites = t.rewrites, "rewrote file");
            }
            OutputMode::Print => output = Some(t.output),
            OutputMode::Check => info!(file = %path.display(), "would rewrite"),
        }
    }

    Ok(FileOutcome {
        path: path.to_path_buf(),
        changed: t.changed,
        rewrites: t.rewrites,
        diagnostics: t.diagnostics,
        output,
    })
}

/// Runs over the configured target. Files are processed in parallel; results keep
/// discovery order.
pub fn run(opts: &Options, cfg: &Config) -> Result<RunSummary, FileError> {
    let files = match &opts.target {
        Target::File(path) => vec![path.clone()],
        Target::Dir(root) => discover(root)?,
    };

    let results: Vec<Result<FileOutcome, FileError>> = files
        .par_iter()
        .map(|path| process_path(path, opts.mode, cfg))
        .collect();

    let mut summary = RunSummary::default();
    for result in results {
        match result {
            Ok(outcome) => summary.outcomes.push(outcome),
            Err(err) => {
                warn!(%err, "file skipped");
                summary.failures.push(err);
            }
        }
    }
    info!(
        files = summary.outcomes.len(),
        changed = summary.changed_files().count(),
        rewrites = summary.total_rewrites(),
        failures = summary.failures.len(),
        "run finished"
    );
    Ok(summary)
}
