//! Terminal progress bar backed by `indicatif`.

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use logix_core::ProgressReporter;
use std::io::IsTerminal;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::error;

/// Single progress bar on stdout.
///
/// Disabled when stdout is redirected, in which case every call is a no-op.
pub struct TerminalProgress {
    enabled: bool,
    bar: Mutex<Option<ProgressBar>>,
}

impl TerminalProgress {
    pub fn new() -> Self {
        Self::with_enabled(std::io::stdout().is_terminal())
    }

    pub fn with_enabled(enabled: bool) -> Self {
        Self {
            enabled,
            bar: Mutex::new(None),
        }
    }

    pub fn is_running(&self) -> bool {
        self.bar().is_some()
    }

    /// Label currently shown, if a bar is running.
    pub fn label(&self) -> Option<String> {
        self.bar().as_ref().map(ProgressBar::message)
    }

    pub fn percent(&self) -> Option<u64> {
        self.bar().as_ref().map(ProgressBar::position)
    }

    fn bar(&self) -> MutexGuard<'_, Option<ProgressBar>> {
        self.bar.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn style() -> ProgressStyle {
        ProgressStyle::with_template("{spinner:.green} [{bar:40.green/white}] {pos:>3}% {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=>-")
    }
}

impl Default for TerminalProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressReporter for TerminalProgress {
    fn start(&self, label: &str) {
        let mut bar = self.bar();
        if bar.is_some() {
            error!("Attempt to start a new progress bar with an existing one running.");
            return;
        }
        if !self.enabled {
            return;
        }

        let pb = ProgressBar::with_draw_target(Some(100), ProgressDrawTarget::stdout());
        pb.set_style(Self::style());
        pb.set_message(label.to_string());
        pb.enable_steady_tick(Duration::from_millis(120));
        *bar = Some(pb);
    }

    fn set_percent(&self, percent: u8) {
        if let Some(pb) = self.bar().as_ref() {
            pb.set_position(u64::from(percent.min(100)));
        }
    }

    fn set_label(&self, label: &str) {
        if let Some(pb) = self.bar().as_ref() {
            pb.set_message(label.to_string());
        }
    }

    fn stop(&self) {
        if let Some(pb) = self.bar().take() {
            pb.finish_and_clear();
        }
    }
}
