//! Errors for machine-code generation.
use hearth_mc::ProgramError;
use thiserror::Error;

/// Errors that stop code generation.
///
/// Translation is all-or-nothing: the first error propagates to the
/// caller and no partial program is produced.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CodegenError {
    /// The source uses a capability the generator does not support.
    #[error("codegen can't do {0}")]
    CantDo(String),

    /// The generated instruction stream violated a structural rule of the
    /// machine-code builder.
    #[error(transparent)]
    InvalidProgram(#[from] ProgramError),
}

pub(crate) fn cant_do(what: &str) -> CodegenError {
    CodegenError::CantDo(String::from(what))
}
