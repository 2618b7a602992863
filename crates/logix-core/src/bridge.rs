//! Event/progress bridge
//!
//! Forwards controller notifications as they arrive: advisory events become
//! warnings in the log, progress and status text go to the progress reporter.
//! Nothing is buffered or coalesced. Order is preserved within one kind of
//! notification as far as the native layer delivers it in order; there is no
//! ordering between kinds.

use std::sync::Arc;
use tracing::warn;

use crate::error::TransferResult;
use crate::native::{Controller, ControllerEvent, ControllerEventSink};
use crate::progress::ProgressReporter;

pub struct EventBridge {
    progress: Arc<dyn ProgressReporter>,
}

impl EventBridge {
    pub fn new(progress: Arc<dyn ProgressReporter>) -> Self {
        Self { progress }
    }

    /// Subscribe a new bridge to every notification of `controller`.
    pub fn attach(
        controller: &mut dyn Controller,
        progress: Arc<dyn ProgressReporter>,
    ) -> TransferResult<()> {
        controller.subscribe(Arc::new(Self::new(progress)))?;
        Ok(())
    }
}

impl ControllerEventSink for EventBridge {
    fn on_event(&self, event: ControllerEvent) {
        match event {
            ControllerEvent::CommunicationsLost => warn!("Communications lost..."),
            ControllerEvent::ConnectedStateChanged(state) => {
                warn!("Connected state change: {state}")
            }
            ControllerEvent::ForceEnableStateChanged(enabled) => warn!(
                "Force enabled state change: {}",
                if enabled { "Enabled" } else { "Disabled" }
            ),
            ControllerEvent::KeySwitchPositionChanged(position) => {
                warn!("Keyswitch Position changed: {position}")
            }
            ControllerEvent::MajorFaultStateChanged(faulted) => warn!(
                "Major fault status changed: {}",
                if faulted { "Faults" } else { "No Faults" }
            ),
            ControllerEvent::ModeChanged(mode) => warn!("Mode changed: {mode}"),
            ControllerEvent::OnlineImageCorrelationLost => warn!("Online image correlation lost."),
            ControllerEvent::ProgressChanged(percent) => self.progress.set_percent(percent.min(100)),
            ControllerEvent::StatusChanged(text) => self.progress.set_label(&text),
        }
    }
}
