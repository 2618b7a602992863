use dotenvy::dotenv;
use logix_cli::cli::Cli;
use logix_core::{ToolConfig, TransferOutcome};
use std::process;

fn main() {
    dotenv().ok();

    let cli = match Cli::parse_args(std::env::args_os()) {
        Ok(cli) => cli,
        Err(e) => {
            // Help and version are requests, not failures.
            let code = if e.use_stderr() {
                TransferOutcome::InvalidArguments.exit_code()
            } else {
                TransferOutcome::Success.exit_code()
            };
            let _ = e.print();
            process::exit(code);
        }
    };

    if let Err(e) = logix_cli::logging::init(cli.command.verbose()) {
        eprintln!("Error: {e:#}");
        process::exit(TransferOutcome::UnknownError.exit_code());
    }

    let config = ToolConfig::from_env();
    let outcome = logix_cli::run(&cli.command, &config);
    process::exit(outcome.exit_code());
}
