//! Transfer of Logix projects between project files and controllers.
//!
//! The workflows in [`orchestrator`] sequence revision resolution, service
//! acquisition, session handling and the transfer itself, and reduce every
//! failure to a [`TransferOutcome`]. The native automation service sits behind
//! the traits in [`native`].

pub mod bridge;
pub mod config;
pub mod context;
pub mod error;
pub mod lifetime;
pub mod native;
pub mod orchestrator;
pub mod outcome;
pub mod process;
pub mod progress;
pub mod revision;

pub use config::ToolConfig;
pub use context::TransferContext;
pub use error::{TransferError, TransferResult};
pub use orchestrator::{
    DownloadOptions, InfoOptions, UploadOptions, conclude, download, ensure_exists, info, upload,
};
pub use outcome::TransferOutcome;
pub use progress::{NoopProgress, ProgressReporter};
