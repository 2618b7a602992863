use tracing::{debug, info};

use super::{DownloadOptions, Stage, conclude, ensure_exists, print_controller_info};
use crate::bridge::EventBridge;
use crate::context::TransferContext;
use crate::error::TransferResult;
use crate::lifetime::ControllerSession;
use crate::native::ControllerMode;
use crate::outcome::TransferOutcome;
use crate::progress::ProgressScope;

const DOWNLOADING: &str = "in download";

/// Passed in the first reserved slot of the native download call.
pub const DOWNLOAD_RESERVED_0: bool = false;
/// Passed in the second reserved slot of the native download call.
pub const DOWNLOAD_RESERVED_1: bool = true;

/// Download the project in `options.filename` to its controller.
///
/// The controller is always switched to program mode before the transfer;
/// `options.target_mode()` is the mode it is left in afterwards.
pub fn download(ctx: &TransferContext, options: &DownloadOptions) -> TransferOutcome {
    conclude(run_download(ctx, options))
}

fn run_download(ctx: &TransferContext, options: &DownloadOptions) -> TransferResult<()> {
    ensure_exists(&options.filename)?;
    let revision = ctx.resolver.require_installed(&options.filename)?;

    let services = ctx.services.acquire(&revision).during(DOWNLOADING)?;
    debug!("Logix services instantiated, opening file...");
    let mut controller = services
        .open_copy_of(&options.filename)
        .during(DOWNLOADING)?;

    download_project(ctx, &mut controller, options).during(DOWNLOADING)
}

fn download_project(
    ctx: &TransferContext,
    controller: &mut ControllerSession<'_>,
    options: &DownloadOptions,
) -> TransferResult<()> {
    print_controller_info(&**controller)?;

    controller.set_auto_flush_events(true)?;
    let mode = options.target_mode();
    EventBridge::attach(&mut **controller, ctx.progress.clone())?;

    if let Some(path) = options.path_override() {
        info!(
            "Using path {path} instead of project stored {}",
            controller.project_comm_path()?
        );
        controller.set_comm_path(path)?;
    }
    info!("Downloading to {}", controller.current_comm_path()?);

    debug!("Connecting to controller...");
    controller.go_connected()?;
    debug!("Setting the controller mode to program...");
    controller.set_mode(ControllerMode::Program)?;

    let progress = ProgressScope::start(ctx.progress.clone(), "Downloading...");
    controller.download(
        options.forces_on,
        DOWNLOAD_RESERVED_0,
        mode,
        DOWNLOAD_RESERVED_1,
    )?;
    drop(progress);

    info!("Complete!");
    Ok(())
}
