//! Error types for the compiler crate.
//!
//! These cover misuse of the compiler itself. Source diagnostics never
//! appear here: the parser records them inside the tree and code generation
//! answers them with the empty artifact.

use rain_spec::SpecError;
use thiserror::Error;

/// Compiler configuration errors.
#[derive(Debug, Error)]
pub enum CompileError {
    /// The placeholder must be a single character that cannot be mistaken
    /// for part of a literal, identifier, or delimiter.
    #[error("invalid placeholder {0:?}: must not be alphanumeric, a delimiter, or whitespace")]
    InvalidPlaceholder(char),

    /// Registry replacement failed.
    #[error(transparent)]
    Spec(#[from] SpecError),
}
