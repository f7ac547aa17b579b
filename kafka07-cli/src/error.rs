//! CLI error types.

use kafka07_client::ClientError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    /// Invalid or missing settings.
    #[error("{0}")]
    Config(String),

    #[error(transparent)]
    Client(#[from] ClientError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CliError {
    /// Returns whether the usage text should be shown along with the error.
    pub fn wants_help(&self) -> bool {
        matches!(self, CliError::Config(_))
    }
}
