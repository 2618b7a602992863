use std::fmt;
use tracing::{debug, info as log_info};

use super::{InfoOptions, Stage, conclude, ensure_exists};
use crate::context::TransferContext;
use crate::error::TransferResult;
use crate::native::{Controller, MemoryBlocks};
use crate::outcome::TransferOutcome;

const INFO: &str = "in info";

/// Offline summary of a project, as reported by the native service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerInfo {
    pub name: String,
    pub description: String,
    pub project_comm_path: String,
    pub processor_type: String,
    pub pending_edits: bool,
    pub total: MemoryBlocks,
    pub used: MemoryBlocks,
}

impl ControllerInfo {
    pub fn read(controller: &dyn Controller) -> anyhow::Result<Self> {
        Ok(Self {
            name: controller.name()?,
            description: controller.description()?,
            project_comm_path: controller.project_comm_path()?,
            processor_type: controller.processor_type()?,
            pending_edits: controller.pending_edits_exist()?,
            total: controller.total_memory_blocks()?,
            used: controller.used_memory_blocks()?,
        })
    }
}

impl fmt::Display for ControllerInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Controller Info:")?;
        writeln!(f, "Name: {}", self.name)?;
        writeln!(f, "Description: {}", self.description)?;
        writeln!(f, "Project Comm Path: {}", self.project_comm_path)?;
        writeln!(f, "Processor Type: {}", self.processor_type)?;
        writeln!(
            f,
            "Pending Edits? {}",
            if self.pending_edits { "Yes" } else { "No" }
        )?;
        writeln!(
            f,
            "Standard Memory (used/total): {}/{}",
            self.used.standard, self.total.standard
        )?;
        write!(
            f,
            "Safety Memory (used/total): {}/{}",
            self.used.safety, self.total.safety
        )
    }
}

/// Read the project summary and log it as one block.
pub fn print_controller_info(controller: &dyn Controller) -> anyhow::Result<ControllerInfo> {
    let summary = ControllerInfo::read(controller)?;
    log_info!("{summary}");
    Ok(summary)
}

/// Print the summary of the project in `options.filename`. No controller is contacted.
pub fn info(ctx: &TransferContext, options: &InfoOptions) -> TransferOutcome {
    conclude(run_info(ctx, options))
}

fn run_info(ctx: &TransferContext, options: &InfoOptions) -> TransferResult<()> {
    let filename = options.filename.clone().unwrap_or_default();
    ensure_exists(&filename)?;
    let revision = ctx.resolver.require_installed(&filename)?;

    let services = ctx.services.acquire(&revision).during(INFO)?;
    debug!("Logix services instantiated, opening file...");
    let controller = services.open_copy_of(&filename).during(INFO)?;

    print_controller_info(&*controller).during(INFO)?;
    Ok(())
}
