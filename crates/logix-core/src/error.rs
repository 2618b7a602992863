use std::path::PathBuf;
use thiserror::Error;

use crate::outcome::TransferOutcome;

/// Failures raised by the transfer workflows and the components beneath them.
#[derive(Debug, Error)]
pub enum TransferError {
    /// The project file named on the command line does not exist
    #[error("The file {} could not be found.", .path.display())]
    FileNotFound { path: PathBuf },

    /// The revision the project needs has no installed service
    #[error("The required Logix version is not installed, requires {major}.{minor}")]
    RequiredVersionNotInstalled { major: u32, minor: u32 },

    /// The controller and the offline project cannot be merged
    #[error("Processor returned correlation failed, result code {status}")]
    CanNotCorrelate { status: String },

    /// The project file could not be read or carries no revision metadata
    #[error("Unable to read revision information from {}: {reason}", .path.display())]
    FileAccess { path: PathBuf, reason: String },

    /// The installation directory holds no usable revision
    #[error("No Logix revision is installed")]
    NoRevisionInstalled,

    /// Invalid tool configuration
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Any failure surfaced by the native automation service
    #[error(transparent)]
    Native(#[from] anyhow::Error),
}

impl TransferError {
    pub fn file_access(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::FileAccess {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Outcome reported to the caller for this failure.
    pub fn outcome(&self) -> TransferOutcome {
        match self {
            TransferError::FileNotFound { .. } => TransferOutcome::FileNotFound,
            TransferError::RequiredVersionNotInstalled { .. } => {
                TransferOutcome::RequiredVersionNotInstalled
            }
            TransferError::CanNotCorrelate { .. } => TransferOutcome::CanNotCorrelate,
            TransferError::FileAccess { .. }
            | TransferError::NoRevisionInstalled
            | TransferError::Config { .. }
            | TransferError::Native(_) => TransferOutcome::UnknownError,
        }
    }
}

pub type TransferResult<T> = Result<T, TransferError>;
