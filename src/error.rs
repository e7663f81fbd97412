//! Error kinds for the optimization core.
//!
//! `spec.md` §7 names four error kinds. `InputNotFound`, `ParseError`, and
//! `UnknownPass` are ordinary user-facing failures the CLI reports and exits
//! on; `IRInvariantViolation` signals a programmer bug in the core itself
//! (a dangling identifier during reconstruction, or the builder being asked
//! to construct a `Label`) and is reported distinctly rather than panicking.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum BrilError {
    #[error("source file not found: {0}")]
    InputNotFound(PathBuf),

    #[error("failed to parse Bril program: {0}")]
    ParseError(String),

    #[error("unknown pass `{0}`")]
    UnknownPass(String),

    #[error("internal invariant violated: {0}")]
    IRInvariantViolation(String),
}

pub type Result<T> = std::result::Result<T, BrilError>;
