use tracing::{debug, info};

use super::{Stage, UploadOptions, conclude, ensure_exists};
use crate::bridge::EventBridge;
use crate::context::TransferContext;
use crate::error::{TransferError, TransferResult};
use crate::lifetime::{ControllerSession, ServiceHandle};
use crate::native::Controller;
use crate::outcome::TransferOutcome;
use crate::progress::ProgressScope;

const INSTANTIATING: &str = "while instantiating services";
const UPLOADING: &str = "while uploading";

/// Upload a controller's project into `options.filename`.
///
/// An existing file is merged with the online image after a correlation
/// check. A missing file is created from scratch using the latest installed
/// revision.
pub fn upload(ctx: &TransferContext, options: &UploadOptions) -> TransferOutcome {
    let result = if options.filename.is_file() {
        upload_into_existing_file(ctx, options)
    } else {
        upload_into_new_file(ctx, options)
    };
    conclude(result)
}

fn upload_into_existing_file(ctx: &TransferContext, options: &UploadOptions) -> TransferResult<()> {
    ensure_exists(&options.filename)?;
    let revision = ctx.resolver.require_installed(&options.filename)?;

    // Locals drop in reverse order: the session closes before the service is released.
    let services = ctx.services.acquire(&revision).during(INSTANTIATING)?;
    info!("Opening ACD file...");
    let mut controller = services
        .open_copy_of(&options.filename)
        .during(INSTANTIATING)?;

    correlate_and_upload(ctx, &mut controller, options).during(UPLOADING)?;
    info!("Complete!");
    Ok(())
}

fn correlate_and_upload(
    ctx: &TransferContext,
    controller: &mut ControllerSession<'_>,
    options: &UploadOptions,
) -> TransferResult<()> {
    debug!("Connecting to controller...");
    controller.set_comm_path(&options.path)?;
    controller.go_online()?;

    debug!("Checking correlation status...");
    let correlation = controller.can_correlate()?;
    debug!(
        needs_log = correlation.needs_log,
        can_merge = correlation.can_merge,
        status = %correlation.status,
        "Correlation result"
    );
    if !correlation.is_ok() {
        return Err(TransferError::CanNotCorrelate {
            status: correlation.status,
        });
    }
    info!("Processor returned correlation OK.");

    EventBridge::attach(&mut **controller, ctx.progress.clone())?;
    transfer_from_controller(ctx, &mut **controller, options.tag_values)?;

    info!("Saving project...");
    controller.save()?;
    Ok(())
}

fn upload_into_new_file(ctx: &TransferContext, options: &UploadOptions) -> TransferResult<()> {
    debug!("Getting revision information...");
    let revision = ctx.resolver.latest_installed().during(INSTANTIATING)?;
    debug!(
        "The latest available revision is {}:{:02}",
        revision.major, revision.minor
    );

    let services = ctx.services.acquire(&revision).during(INSTANTIATING)?;
    debug!("Services created...");
    create_and_upload(ctx, &services, options).during(UPLOADING)?;
    info!("Complete!");
    Ok(())
}

fn create_and_upload(
    ctx: &TransferContext,
    services: &ServiceHandle,
    options: &UploadOptions,
) -> TransferResult<()> {
    info!("Obtaining the processor type from the online controller...");
    let processor = services.project_type_from_controller(&options.path)?;
    debug!("Read {processor} from the online controller");

    info!("Creating the ACD file...");
    let mut controller = services.create(&options.filename, &processor)?;

    EventBridge::attach(&mut *controller, ctx.progress.clone())?;
    transfer_from_controller(ctx, &mut *controller, options.tag_values)?;

    info!("Saving file changes...");
    controller.save()?;
    controller.close();
    Ok(())
}

/// Pull the online image, and tag values when asked, under a progress scope.
fn transfer_from_controller(
    ctx: &TransferContext,
    controller: &mut dyn Controller,
    tag_values: bool,
) -> TransferResult<()> {
    let progress = ProgressScope::start(ctx.progress.clone(), "Starting upload...");
    controller.upload()?;
    if tag_values {
        debug!("Uploading tag values...");
        controller.upload_tag_data()?;
    }
    drop(progress);
    Ok(())
}
