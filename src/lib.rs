//! Codemod migrating Go logging calls from zap to zerolog.
//!
//! - `lexer` and `parser` turn Go source into an owned, span-annotated tree.
//! - `rewrite` replaces `utils.Logger.<Level>(msg, zap.<Kind>(..)...)` calls with
//!   `logger.<Level>().<Method>(..).Msg(msg)` chains; `imports` keeps the imports in line.
//! - `render` regenerates the file, reprinting only what changed.
//! - `driver` runs the whole pipeline over files and directories.

pub mod ast;
pub mod config;
pub mod driver;
pub mod engine;
pub mod error;
pub mod imports;
pub mod lexer;
pub mod parser;
pub mod printer;
pub mod render;
pub mod rewrite;
pub mod walk;

// Re-exports for convenience
pub use config::{Config, ErrorPolicy, LoggerScope};
pub use driver::{transform_source, Transformed};
pub use engine::{process_file, Processed};
pub use error::{Diag, DiagKind, ParseFailure, RewriteError};
pub use lexer::Lexer;
pub use parser::parse_source;
pub use render::render;
