pub mod cli;
pub mod logging;
pub mod progress;

use logix_core::{TransferContext, TransferOutcome, ToolConfig};
use std::sync::Arc;
use tracing::{debug, error};

use crate::cli::Command;
use crate::progress::TerminalProgress;

/// Run one verb against the process-hosted service described by `config`.
pub fn run(command: &Command, config: &ToolConfig) -> TransferOutcome {
    if command.shared().user.is_some() {
        debug!("Ignoring --user/--pass, directory login is not used");
    }

    // A missing project outranks any configuration problem.
    if let Some(path) = command.required_file() {
        if let Err(e) = logix_core::ensure_exists(&path) {
            return logix_core::conclude(Err(e));
        }
    }

    let ctx = match TransferContext::from_config(config, Arc::new(TerminalProgress::new())) {
        Ok(ctx) => ctx,
        Err(e) => {
            error!("{e}");
            return e.outcome();
        }
    };
    dispatch(command, &ctx)
}

/// Map a parsed verb onto its workflow.
pub fn dispatch(command: &Command, ctx: &TransferContext) -> TransferOutcome {
    match command {
        Command::Upload(args) => logix_core::upload(ctx, &args.into()),
        Command::Download(args) => logix_core::download(ctx, &args.into()),
        Command::Info(args) => logix_core::info(ctx, &args.into()),
    }
}
