//! Result kinds returned by every top-level workflow.

use strum::Display;

/// The single result of an upload, download or info run.
///
/// Each variant maps to exactly one process exit code. A run never reports
/// partial success: whatever stage failed, the caller sees one of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum TransferOutcome {
    #[strum(serialize = "success")]
    Success,
    #[strum(serialize = "invalid arguments")]
    InvalidArguments,
    #[strum(serialize = "unknown error")]
    UnknownError,
    #[strum(serialize = "required version not installed")]
    RequiredVersionNotInstalled,
    #[strum(serialize = "file not found")]
    FileNotFound,
    #[strum(serialize = "correlation failed")]
    CanNotCorrelate,
}

impl TransferOutcome {
    /// Process exit code for this outcome.
    pub fn exit_code(self) -> i32 {
        match self {
            TransferOutcome::Success => 0,
            TransferOutcome::InvalidArguments => 1,
            TransferOutcome::UnknownError => 2,
            TransferOutcome::RequiredVersionNotInstalled => 3,
            TransferOutcome::FileNotFound => 4,
            TransferOutcome::CanNotCorrelate => 5,
        }
    }

    pub fn is_success(self) -> bool {
        self == TransferOutcome::Success
    }
}
