//! Transfer orchestrator
//!
//! Each verb runs as a sequence of fallible stages returning
//! [`TransferResult`]. The first failing stage ends the run; scoped guards
//! then close the session, stop progress reporting and release the service,
//! in that order. [`conclude`] turns the result into the one
//! [`TransferOutcome`] the caller sees and prints the user-visible error.

mod download;
mod info;
mod upload;

pub use download::{DOWNLOAD_RESERVED_0, DOWNLOAD_RESERVED_1, download};
pub use info::{ControllerInfo, info, print_controller_info};
pub use upload::upload;

use std::path::{Path, PathBuf};
use tracing::{debug, error};

use crate::error::{TransferError, TransferResult};
use crate::native::ControllerMode;
use crate::outcome::TransferOutcome;

/// Options for `upload`
#[derive(Debug, Clone, Default)]
pub struct UploadOptions {
    pub filename: PathBuf,
    /// Communication path of the controller to upload from
    pub path: String,
    /// Also upload tag values
    pub tag_values: bool,
}

/// Options for `download`
#[derive(Debug, Clone, Default)]
pub struct DownloadOptions {
    pub filename: PathBuf,
    /// Replaces the communication path stored in the project
    pub path: Option<String>,
    /// Leave the controller in program mode afterwards
    pub program_mode: bool,
    pub forces_on: bool,
}

impl DownloadOptions {
    /// Mode the controller is left in once the download completes.
    pub fn target_mode(&self) -> ControllerMode {
        if self.program_mode {
            ControllerMode::Program
        } else {
            ControllerMode::Run
        }
    }

    fn path_override(&self) -> Option<&str> {
        self.path.as_deref().filter(|p| !p.is_empty())
    }
}

/// Options for `info`
#[derive(Debug, Clone, Default)]
pub struct InfoOptions {
    pub filename: Option<PathBuf>,
}

/// Labels a stage so native failures read "Exception occurred <activity>: ...".
trait Stage<T> {
    fn during(self, activity: &'static str) -> TransferResult<T>;
}

impl<T, E: Into<TransferError>> Stage<T> for Result<T, E> {
    fn during(self, activity: &'static str) -> TransferResult<T> {
        self.map_err(|e| match e.into() {
            TransferError::Native(inner) => TransferError::Native(inner.context(activity)),
            other => other,
        })
    }
}

/// Checked before any native resource is touched.
pub fn ensure_exists(path: &Path) -> TransferResult<()> {
    if path.is_file() {
        Ok(())
    } else {
        Err(TransferError::FileNotFound {
            path: path.to_path_buf(),
        })
    }
}

/// Map a workflow result to its outcome, reporting any failure.
pub fn conclude(result: TransferResult<()>) -> TransferOutcome {
    match result {
        Ok(()) => TransferOutcome::Success,
        Err(e) => {
            report(&e);
            e.outcome()
        }
    }
}

fn report(error: &TransferError) {
    match error {
        TransferError::Native(e) => {
            error!("Exception occurred {e:#}");
            debug!("{e:?}");
        }
        other => error!("{other}"),
    }
}
