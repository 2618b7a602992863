//! Console logging setup.

use anyhow::{Context, Result};
use chrono::Local;
use std::fmt;
use std::io::IsTerminal;
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::time::FormatTime;
use tracing_subscriber::{EnvFilter, prelude::*};

/// `19-Oct-2026 14:03:27.512`
pub const TIMESTAMP_FORMAT: &str = "%d-%b-%Y %H:%M:%S%.3f";

const DEFAULT_FILTER: &str = "info";
const VERBOSE_FILTER: &str = "info,logix_core=debug,logix_cli=debug";

/// Local wall-clock timestamp in brackets.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalTimestamp;

impl FormatTime for LocalTimestamp {
    fn format_time(&self, w: &mut Writer<'_>) -> fmt::Result {
        write!(w, "[{}]", Local::now().format(TIMESTAMP_FORMAT))
    }
}

/// `RUST_LOG` wins over the verbosity flag when set.
pub fn env_filter(verbose: bool) -> EnvFilter {
    let default = if verbose { VERBOSE_FILTER } else { DEFAULT_FILTER };
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
}

pub fn init(verbose: bool) -> Result<()> {
    let stdout = std::io::stdout();
    let layer = tracing_subscriber::fmt::layer()
        .with_timer(LocalTimestamp)
        .with_target(false)
        .with_ansi(stdout.is_terminal())
        .with_writer(std::io::stdout);

    tracing_subscriber::registry()
        .with(env_filter(verbose))
        .with(layer)
        .try_init()
        .context("Failed to set global default tracing subscriber")
}
