//! Boundary to the native automation service
//!
//! Everything the orchestrator needs from the vendor service is expressed as
//! a trait here. The process-hosted adapter in [`host`] and [`install`] is the
//! implementation used by the command-line tool. It talks to a host shim
//! process that wraps the vendor's COM service, not to the COM service
//! itself. Tests substitute recording fakes.
//!
//! - [`ServiceProvider`]: instantiates a service for one revision
//! - [`LogixServices`]: opens or creates projects, releases the service
//! - [`Controller`]: one opened project and its online session
//! - [`ControllerEventSink`]: receives asynchronous notifications

pub mod host;
pub mod install;
pub mod protocol;

pub use host::HostServiceProvider;
pub use install::InstallDirectory;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use strum::{Display, EnumString};

use crate::revision::RevisionDescriptor;

/// Controller execution state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
pub enum ControllerMode {
    #[strum(serialize = "Program")]
    Program,
    #[strum(serialize = "Run")]
    Run,
    #[strum(serialize = "Test")]
    Test,
}

/// Connectivity of a session to its controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    Offline,
    Connected,
    Online,
}

/// Physical key switch position on the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
pub enum KeySwitchPosition {
    Run,
    Program,
    Remote,
}

/// Processor catalog type reported by a controller, e.g. `1756-L83E`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProcessorType(pub String);

impl fmt::Display for ProcessorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Answer to a correlation query between the offline project and the controller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Correlation {
    pub needs_log: bool,
    pub can_merge: bool,
    pub status: String,
}

impl Correlation {
    /// Upload may only proceed when the native service allows a merge.
    pub fn is_ok(&self) -> bool {
        self.can_merge
    }
}

/// Standard and safety memory block counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryBlocks {
    pub standard: u32,
    pub safety: u32,
}

/// Asynchronous notifications raised by an open controller session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "value", rename_all = "snake_case")]
pub enum ControllerEvent {
    CommunicationsLost,
    ConnectedStateChanged(ConnectionState),
    ForceEnableStateChanged(bool),
    KeySwitchPositionChanged(KeySwitchPosition),
    MajorFaultStateChanged(bool),
    ModeChanged(ControllerMode),
    OnlineImageCorrelationLost,
    ProgressChanged(u8),
    StatusChanged(String),
}

/// Receiver for [`ControllerEvent`]s.
///
/// Called on the native delivery thread, possibly while the orchestrator is
/// blocked inside a long native call. Implementations must return quickly.
pub trait ControllerEventSink: Send + Sync {
    fn on_event(&self, event: ControllerEvent);
}

/// An opened project and its (optional) online session.
pub trait Controller: Send {
    fn name(&self) -> Result<String>;
    fn description(&self) -> Result<String>;
    fn project_comm_path(&self) -> Result<String>;
    fn current_comm_path(&self) -> Result<String>;
    fn set_comm_path(&mut self, path: &str) -> Result<()>;
    fn processor_type(&self) -> Result<String>;
    fn pending_edits_exist(&self) -> Result<bool>;
    fn total_memory_blocks(&self) -> Result<MemoryBlocks>;
    fn used_memory_blocks(&self) -> Result<MemoryBlocks>;
    fn set_auto_flush_events(&mut self, enabled: bool) -> Result<()>;
    fn go_online(&mut self) -> Result<()>;
    fn go_connected(&mut self) -> Result<()>;
    fn can_correlate(&mut self) -> Result<Correlation>;
    fn set_mode(&mut self, mode: ControllerMode) -> Result<()>;
    fn upload(&mut self) -> Result<()>;
    fn upload_tag_data(&mut self) -> Result<()>;

    /// The two `reserved` slots mirror the native signature and carry no
    /// caller-controlled meaning.
    fn download(
        &mut self,
        forces_on: bool,
        reserved0: bool,
        mode: ControllerMode,
        reserved1: bool,
    ) -> Result<()>;

    fn save(&mut self) -> Result<()>;
    fn force_close(&mut self) -> Result<()>;
    fn subscribe(&mut self, sink: Arc<dyn ControllerEventSink>) -> Result<()>;
}

/// A live automation service bound to one revision.
pub trait LogixServices: Send {
    fn open_copy_of(&self, project: &Path) -> Result<Box<dyn Controller>>;
    fn create(&self, project: &Path, processor: &ProcessorType) -> Result<Box<dyn Controller>>;
    fn project_type_from_controller(&self, comm_path: &str) -> Result<ProcessorType>;
    fn release(&mut self) -> Result<()>;
}

/// Instantiates the automation service matching a revision.
pub trait ServiceProvider: Send + Sync {
    fn instantiate(&self, revision: &RevisionDescriptor) -> Result<Box<dyn LogixServices>>;
}
