//! CLI error types with miette diagnostics and stable exit codes.

use miette::Diagnostic;
use thiserror::Error;

use sie_core::UpdateError;

/// Process exit codes.
pub mod exit_code {
    pub const SUCCESS: i32 = 0;
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(sie_update::validation))]
    Validation { field: String, reason: String },

    #[error(transparent)]
    #[diagnostic(code(sie_update::config))]
    Config(Box<figment::Error>),

    #[error(transparent)]
    #[diagnostic(code(sie_update::update))]
    Update(#[from] UpdateError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for CliError {
    fn from(err: figment::Error) -> Self {
        Self::Config(Box::new(err))
    }
}

impl CliError {
    /// Map this error to a process exit code.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Validation { .. } | Self::Config(_) => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}
