//! Recording fakes for the native service boundary.
//!
//! Every fake appends to one shared call log so tests can assert the exact
//! order of native calls, progress updates and cleanup.

#![allow(dead_code)]

use anyhow::{Result, bail};
use logix_core::error::{TransferError, TransferResult};
use logix_core::lifetime::ServiceLifetimeManager;
use logix_core::native::{
    Controller, ControllerEvent, ControllerEventSink, ControllerMode, Correlation, LogixServices,
    MemoryBlocks, ProcessorType, ServiceProvider,
};
use logix_core::process::ProcessReaper;
use logix_core::revision::{RevisionDescriptor, RevisionDirectory, RevisionResolver};
use logix_core::{ProgressReporter, TransferContext};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

#[derive(Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<String>>>);

impl CallLog {
    pub fn push(&self, entry: impl Into<String>) {
        self.0.lock().unwrap().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    pub fn contains(&self, entry: &str) -> bool {
        self.entries().iter().any(|e| e == entry)
    }

    pub fn count(&self, entry: &str) -> usize {
        self.entries().iter().filter(|e| *e == entry).count()
    }

    /// Position of the first entry equal to `entry`.
    pub fn position(&self, entry: &str) -> usize {
        self.entries()
            .iter()
            .position(|e| e == entry)
            .unwrap_or_else(|| panic!("{entry} not in call log: {:?}", self.entries()))
    }

    /// Entries that are native calls, without progress updates.
    pub fn native_calls(&self) -> Vec<String> {
        self.entries()
            .into_iter()
            .filter(|e| !e.starts_with("progress."))
            .collect()
    }
}

/// Behavior of the fake native layer for one test.
#[derive(Clone)]
pub struct Script {
    pub project_revision: (u32, u32),
    pub installed: bool,
    pub latest: Option<(u32, u32)>,
    pub can_merge: bool,
    pub correlation_status: String,
    pub processor: String,
    pub stored_comm_path: String,
    /// Native operation that fails when called, matched on its name
    pub fail_on: Option<&'static str>,
    /// Delivered to the subscribed sink during upload and download
    pub transfer_events: Vec<ControllerEvent>,
}

impl Default for Script {
    fn default() -> Self {
        Self {
            project_revision: (33, 1),
            installed: true,
            latest: Some((35, 11)),
            can_merge: true,
            correlation_status: "lgxOK".to_string(),
            processor: "1756-L83E".to_string(),
            stored_comm_path: "AB_ETHIP-1\\10.0.0.5\\Backplane\\0".to_string(),
            fail_on: None,
            transfer_events: Vec::new(),
        }
    }
}

struct Shared {
    log: CallLog,
    script: Script,
}

impl Shared {
    fn step(&self, entry: String) -> Result<()> {
        let op = entry.split(':').next().unwrap_or_default().to_string();
        self.log.push(entry);
        if self.script.fail_on == Some(op.as_str()) {
            bail!("{op} failed in the native layer");
        }
        Ok(())
    }
}

fn token(major: u32, minor: u32) -> String {
    format!("v{major}.{minor:02}")
}

struct FakeDirectory(Arc<Shared>);

impl RevisionDirectory for FakeDirectory {
    fn revision_from_project(&self, _project: &Path) -> TransferResult<RevisionDescriptor> {
        self.0.log.push("revision_from_project");
        let (major, minor) = self.0.script.project_revision;
        Ok(RevisionDescriptor::new(
            major,
            minor,
            token(major, minor),
            self.0.script.installed,
        ))
    }

    fn latest_available(&self) -> TransferResult<RevisionDescriptor> {
        self.0.log.push("latest_available");
        let (major, minor) = self.0.script.latest.ok_or(TransferError::NoRevisionInstalled)?;
        Ok(RevisionDescriptor::new(major, minor, token(major, minor), true))
    }
}

struct FakeProvider(Arc<Shared>);

impl ServiceProvider for FakeProvider {
    fn instantiate(&self, revision: &RevisionDescriptor) -> Result<Box<dyn LogixServices>> {
        self.0
            .step(format!("instantiate:{}", revision.interface_version))?;
        Ok(Box::new(FakeServices(self.0.clone())))
    }
}

struct FakeServices(Arc<Shared>);

impl FakeServices {
    fn controller(&self) -> Box<dyn Controller> {
        Box::new(FakeController {
            shared: self.0.clone(),
            comm_path: self.0.script.stored_comm_path.clone(),
            sink: None,
        })
    }
}

impl LogixServices for FakeServices {
    fn open_copy_of(&self, _project: &Path) -> Result<Box<dyn Controller>> {
        self.0.step("open_copy_of".to_string())?;
        Ok(self.controller())
    }

    fn create(&self, _project: &Path, processor: &ProcessorType) -> Result<Box<dyn Controller>> {
        self.0.step(format!("create:{processor}"))?;
        Ok(self.controller())
    }

    fn project_type_from_controller(&self, comm_path: &str) -> Result<ProcessorType> {
        self.0
            .step(format!("project_type_from_controller:{comm_path}"))?;
        Ok(ProcessorType(self.0.script.processor.clone()))
    }

    fn release(&mut self) -> Result<()> {
        self.0.step("release".to_string())
    }
}

struct FakeController {
    shared: Arc<Shared>,
    comm_path: String,
    sink: Option<Arc<dyn ControllerEventSink>>,
}

impl FakeController {
    fn step(&self, entry: impl Into<String>) -> Result<()> {
        self.shared.step(entry.into())
    }

    fn emit_transfer_events(&self) {
        if let Some(sink) = &self.sink {
            for event in &self.shared.script.transfer_events {
                sink.on_event(event.clone());
            }
        }
    }
}

impl Controller for FakeController {
    fn name(&self) -> Result<String> {
        self.step("name")?;
        Ok("Line1".to_string())
    }

    fn description(&self) -> Result<String> {
        self.step("description")?;
        Ok("Packaging line".to_string())
    }

    fn project_comm_path(&self) -> Result<String> {
        self.step("project_comm_path")?;
        Ok(self.shared.script.stored_comm_path.clone())
    }

    fn current_comm_path(&self) -> Result<String> {
        self.step("current_comm_path")?;
        Ok(self.comm_path.clone())
    }

    fn set_comm_path(&mut self, path: &str) -> Result<()> {
        self.step(format!("set_comm_path:{path}"))?;
        self.comm_path = path.to_string();
        Ok(())
    }

    fn processor_type(&self) -> Result<String> {
        self.step("processor_type")?;
        Ok(self.shared.script.processor.clone())
    }

    fn pending_edits_exist(&self) -> Result<bool> {
        self.step("pending_edits_exist")?;
        Ok(false)
    }

    fn total_memory_blocks(&self) -> Result<MemoryBlocks> {
        self.step("total_memory_blocks")?;
        Ok(MemoryBlocks {
            standard: 1000,
            safety: 200,
        })
    }

    fn used_memory_blocks(&self) -> Result<MemoryBlocks> {
        self.step("used_memory_blocks")?;
        Ok(MemoryBlocks {
            standard: 412,
            safety: 18,
        })
    }

    fn set_auto_flush_events(&mut self, enabled: bool) -> Result<()> {
        self.step(format!("set_auto_flush_events:{enabled}"))
    }

    fn go_online(&mut self) -> Result<()> {
        self.step("go_online")
    }

    fn go_connected(&mut self) -> Result<()> {
        self.step("go_connected")
    }

    fn can_correlate(&mut self) -> Result<Correlation> {
        self.step("can_correlate")?;
        Ok(Correlation {
            needs_log: false,
            can_merge: self.shared.script.can_merge,
            status: self.shared.script.correlation_status.clone(),
        })
    }

    fn set_mode(&mut self, mode: ControllerMode) -> Result<()> {
        self.step(format!("set_mode:{mode}"))
    }

    fn upload(&mut self) -> Result<()> {
        self.emit_transfer_events();
        self.step("upload")
    }

    fn upload_tag_data(&mut self) -> Result<()> {
        self.step("upload_tag_data")
    }

    fn download(
        &mut self,
        forces_on: bool,
        reserved0: bool,
        mode: ControllerMode,
        reserved1: bool,
    ) -> Result<()> {
        self.emit_transfer_events();
        self.step(format!("download:{forces_on},{reserved0},{mode},{reserved1}"))
    }

    fn save(&mut self) -> Result<()> {
        self.step("save")
    }

    fn force_close(&mut self) -> Result<()> {
        self.sink = None;
        self.step("force_close")
    }

    fn subscribe(&mut self, sink: Arc<dyn ControllerEventSink>) -> Result<()> {
        self.step("subscribe")?;
        self.sink = Some(sink);
        Ok(())
    }
}

pub struct RecordingReaper(pub CallLog);

impl ProcessReaper for RecordingReaper {
    fn reap_orphans(&self) -> Result<Vec<u32>> {
        self.0.push("reap");
        Ok(Vec::new())
    }
}

pub struct RecordingProgress(pub CallLog);

impl ProgressReporter for RecordingProgress {
    fn start(&self, label: &str) {
        self.0.push(format!("progress.start:{label}"));
    }

    fn set_percent(&self, percent: u8) {
        self.0.push(format!("progress.percent:{percent}"));
    }

    fn set_label(&self, label: &str) {
        self.0.push(format!("progress.label:{label}"));
    }

    fn stop(&self) {
        self.0.push("progress.stop");
    }
}

pub struct Harness {
    pub ctx: TransferContext,
    pub log: CallLog,
    pub dir: TempDir,
}

impl Harness {
    pub fn new(script: Script) -> Self {
        let log = CallLog::default();
        let shared = Arc::new(Shared {
            log: log.clone(),
            script,
        });

        let ctx = TransferContext::new(
            RevisionResolver::new(Arc::new(FakeDirectory(shared.clone()))),
            ServiceLifetimeManager::new(
                Arc::new(FakeProvider(shared)),
                Arc::new(RecordingReaper(log.clone())),
            ),
            Arc::new(RecordingProgress(log.clone())),
        );

        Self {
            ctx,
            log,
            dir: TempDir::new().unwrap(),
        }
    }

    /// A project file that exists on disk.
    pub fn project(&self) -> PathBuf {
        let path = self.dir.path().join("line1.ACD");
        std::fs::write(&path, b"SoftwareRevision 33.01").unwrap();
        path
    }

    /// A path inside the fixture directory that does not exist.
    pub fn missing(&self) -> PathBuf {
        self.dir.path().join("missing.ACD")
    }
}

/// Runs `f` with a subscriber that records formatted log lines, one per event.
pub fn capture_logs<T>(f: impl FnOnce() -> T) -> (T, Vec<String>) {
    let buffer = Arc::new(Mutex::new(Vec::new()));
    let writer = buffer.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_ansi(false)
        .without_time()
        .with_writer(move || LogBuffer(writer.clone()))
        .finish();

    let result = tracing::subscriber::with_default(subscriber, f);
    let text = String::from_utf8_lossy(&buffer.lock().unwrap()).into_owned();
    (result, text.lines().map(str::to_string).collect())
}

struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl std::io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

pub fn is_error_line(line: &str) -> bool {
    line.trim_start().starts_with("ERROR")
}
