//! `zap2zerolog` command line.
//!
//! Usage: `zap2zerolog (--file <path> | --dir <path>) [--inplace | --check]`

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{ArgGroup, Parser};
use tracing::error;
use tracing_subscriber::{fmt, EnvFilter};

use zap2zerolog::driver::{self, OutputMode, Options, Target};
use zap2zerolog::{Config, ErrorPolicy, LoggerScope};

#[derive(Parser, Debug)]
#[command(name = "zap2zerolog", version)]
#[command(about = "Rewrite zap logger calls in Go sources into zerolog call chains")]
#[command(group(ArgGroup::new("input").required(true).args(["file", "dir"])))]
struct Args {
    /// Go source file to process
    #[arg(long, value_name = "PATH")]
    file: Option<PathBuf>,

    /// Directory to process recursively (only `.go` files)
    #[arg(long, value_name = "PATH")]
    dir: Option<PathBuf>,

    /// Overwrite changed files instead of printing them
    #[arg(long, conflicts_with = "check")]
    inplace: bool,

    /// Only report files that would change; exit with status 1 if any
    #[arg(long)]
    check: bool,

    /// YAML configuration file (`version: 1`)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Abort a file on the first malformed field instead of skipping the field
    #[arg(long)]
    strict: bool,

    /// Rewrite `utils.Logger` calls in methods to log through the receiver (`s.logger`)
    #[arg(long)]
    receiver_scope: bool,
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(args: &Args) -> anyhow::Result<Config> {
    let mut cfg = match &args.config {
        Some(path) => Config::from_yaml_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => Config::default(),
    };
    if args.strict {
        cfg.policy = ErrorPolicy::Strict;
    }
    if args.receiver_scope {
        cfg.scope = LoggerScope::Receiver;
    }
    Ok(cfg)
}

fn try_main(args: Args) -> anyhow::Result<ExitCode> {
    let cfg = load_config(&args)?;
    let target = match (args.file, args.dir) {
        (Some(file), _) => Target::File(file),
        (None, Some(dir)) => Target::Dir(dir),
        (None, None) => anyhow::bail!("either --file or --dir is required"),
    };
    let mode = if args.inplace {
        OutputMode::InPlace
    } else if args.check {
        OutputMode::Check
    } else {
        OutputMode::Print
    };

    let summary = driver::run(&Options { target, mode }, &cfg)?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    for outcome in summary.changed_files() {
        match mode {
            OutputMode::Print => {
                if let Some(text) = &outcome.output {
                    out.write_all(text.as_bytes())?;
                }
            }
            OutputMode::Check => writeln!(out, "{}", outcome.path.display())?,
            OutputMode::InPlace => {}
        }
    }

    for failure in &summary.failures {
        error!("{failure}");
    }

    let would_change = mode == OutputMode::Check && summary.changed_files().next().is_some();
    Ok(if summary.has_failures() || would_change {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

fn main() -> ExitCode {
    init_logging();
    let args = Args::parse();
    match try_main(args) {
        Ok(code) => code,
        Err(err) => {
            error!("{err:#}");
            ExitCode::FAILURE
        }
    }
}
