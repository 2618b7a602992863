//! Automation service hosted in a child process
//!
//! Each revision folder under the install root carries a service executable.
//! [`HostServiceProvider`] spawns it in line-protocol mode and exposes it as
//! [`LogixServices`]. Calls block the caller until the matching response line
//! arrives; notifications are dispatched from the reader thread as they are
//! read, in the order the child wrote them.
//!
//! The vendor automation service is a COM server and has no line-protocol
//! mode of its own. The executable spawned here is a companion host shim
//! installed next to each revision: it creates the COM objects for that
//! revision and relays them over stdin/stdout as described in
//! [`protocol`](super::protocol). Without the shim this adapter cannot drive
//! an installed service directly.

use anyhow::{Context, Result, anyhow, bail};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, error, warn};

use super::install::executable_name;
use super::protocol::{self, Incoming, Request, Response};
use super::{
    Controller, ControllerEventSink, ControllerMode, Correlation, LogixServices, MemoryBlocks,
    ProcessorType, ServiceProvider,
};
use crate::config::ToolConfig;
use crate::revision::RevisionDescriptor;

const EXIT_GRACE: Duration = Duration::from_secs(5);

type SinkMap = HashMap<u64, Arc<dyn ControllerEventSink>>;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Spawns one service process per acquired revision.
pub struct HostServiceProvider {
    install_dir: PathBuf,
    process_name: String,
    call_timeout: Option<Duration>,
}

impl HostServiceProvider {
    pub fn new(config: &ToolConfig) -> Self {
        Self {
            install_dir: config.install_dir.clone(),
            process_name: config.service_process.clone(),
            call_timeout: config.call_timeout,
        }
    }

    fn executable(&self, revision: &RevisionDescriptor) -> PathBuf {
        self.install_dir
            .join(&revision.interface_version)
            .join(executable_name(&self.process_name))
    }
}

impl ServiceProvider for HostServiceProvider {
    fn instantiate(&self, revision: &RevisionDescriptor) -> Result<Box<dyn LogixServices>> {
        let executable = self.executable(revision);
        let connection = HostConnection::spawn(&executable, self.call_timeout)?;
        Ok(Box::new(HostServices {
            connection: Arc::new(connection),
        }))
    }
}

/// Pipes to a running service process.
struct HostConnection {
    child: Mutex<Child>,
    stdin: Mutex<Option<ChildStdin>>,
    responses: Mutex<Receiver<Response>>,
    sinks: Arc<Mutex<SinkMap>>,
    next_id: AtomicU64,
    call_timeout: Option<Duration>,
    reader: Mutex<Option<JoinHandle<()>>>,
}

impl HostConnection {
    fn spawn(executable: &Path, call_timeout: Option<Duration>) -> Result<Self> {
        debug!(executable = %executable.display(), "Spawning Logix services host");

        let mut child = Command::new(executable)
            .arg(protocol::STDIO_FLAG)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .with_context(|| format!("Failed to spawn {}", executable.display()))?;

        let stdin = child.stdin.take().context("Service stdin was not captured")?;
        let stdout = child
            .stdout
            .take()
            .context("Service stdout was not captured")?;

        let (tx, rx) = mpsc::channel();
        let sinks: Arc<Mutex<SinkMap>> = Arc::new(Mutex::new(HashMap::new()));
        let reader_sinks = sinks.clone();
        let reader = thread::Builder::new()
            .name("logix-events".to_string())
            .spawn(move || read_loop(stdout, tx, reader_sinks))
            .context("Failed to start service reader thread")?;

        debug!(pid = child.id(), "Logix services host started");

        Ok(Self {
            child: Mutex::new(child),
            stdin: Mutex::new(Some(stdin)),
            responses: Mutex::new(rx),
            sinks,
            next_id: AtomicU64::new(1),
            call_timeout,
            reader: Mutex::new(Some(reader)),
        })
    }

    fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let line = protocol::encode_request(&Request { id, method, params })?;

        // One call in flight at a time
        let responses = lock(&self.responses);
        {
            let mut stdin = lock(&self.stdin);
            let pipe = stdin
                .as_mut()
                .ok_or_else(|| anyhow!("Logix services connection is closed"))?;
            pipe.write_all(line.as_bytes())
                .and_then(|_| pipe.flush())
                .with_context(|| format!("Failed to send '{method}' to Logix services"))?;
        }

        loop {
            let response = match self.call_timeout {
                Some(limit) => match responses.recv_timeout(limit) {
                    Ok(response) => response,
                    Err(RecvTimeoutError::Timeout) => bail!(
                        "'{method}' did not complete within {limit:?}, the operation may be unresponsive"
                    ),
                    Err(RecvTimeoutError::Disconnected) => {
                        bail!("Logix services exited during '{method}'")
                    }
                },
                None => responses
                    .recv()
                    .map_err(|_| anyhow!("Logix services exited during '{method}'"))?,
            };

            if response.id != id {
                debug!(expected = id, received = response.id, "Discarding stale response");
                continue;
            }

            if let Some(message) = response.error {
                bail!("{method} failed: {message}");
            }

            return serde_json::from_value(response.result)
                .with_context(|| format!("Unexpected result from '{method}'"));
        }
    }

    fn register_sink(&self, session: u64, sink: Arc<dyn ControllerEventSink>) {
        lock(&self.sinks).insert(session, sink);
    }

    fn remove_sink(&self, session: u64) {
        lock(&self.sinks).remove(&session);
    }

    /// Close stdin and give the child a grace period to exit.
    fn shutdown(&self) {
        lock(&self.stdin).take();

        let deadline = Instant::now() + EXIT_GRACE;
        let mut child = lock(&self.child);
        loop {
            match child.try_wait() {
                Ok(Some(status)) => {
                    debug!(?status, "Logix services host exited");
                    break;
                }
                Ok(None) if Instant::now() < deadline => {
                    thread::sleep(Duration::from_millis(100));
                }
                Ok(None) => {
                    warn!(pid = child.id(), "Logix services host did not exit, killing it");
                    if let Err(e) = child.kill() {
                        error!(error = %e, "Failed to kill Logix services host");
                    }
                    let _ = child.wait();
                    break;
                }
                Err(e) => {
                    warn!(error = %e, "Failed to query Logix services host status");
                    break;
                }
            }
        }
        drop(child);

        if let Some(reader) = lock(&self.reader).take() {
            let _ = reader.join();
        }
    }
}

impl Drop for HostConnection {
    fn drop(&mut self) {
        let mut child = lock(&self.child);
        if let Ok(None) = child.try_wait() {
            if let Err(e) = child.kill() {
                error!(pid = child.id(), error = %e, "Failed to kill Logix services host during drop");
            }
        }
    }
}

fn read_loop(stdout: ChildStdout, responses: Sender<Response>, sinks: Arc<Mutex<SinkMap>>) {
    for line in BufReader::new(stdout).lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                debug!(error = %e, "Service output closed");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        match protocol::parse_incoming(&line) {
            Ok(Incoming::Response(response)) => {
                if responses.send(response).is_err() {
                    break;
                }
            }
            Ok(Incoming::Notification { session, event }) => {
                let targets: Vec<Arc<dyn ControllerEventSink>> = {
                    let sinks = lock(&sinks);
                    match session {
                        Some(id) => sinks.get(&id).cloned().into_iter().collect(),
                        None => sinks.values().cloned().collect(),
                    }
                };
                for sink in targets {
                    sink.on_event(event.clone());
                }
            }
            Err(e) => debug!(%line, error = %e, "Ignoring unrecognised service output"),
        }
    }
}

struct HostServices {
    connection: Arc<HostConnection>,
}

impl HostServices {
    fn controller(&self, session: u64) -> Box<dyn Controller> {
        Box::new(HostController {
            connection: self.connection.clone(),
            session,
        })
    }
}

impl LogixServices for HostServices {
    fn open_copy_of(&self, project: &Path) -> Result<Box<dyn Controller>> {
        let session = self
            .connection
            .call("open_copy_of", json!({ "path": project.to_string_lossy() }))?;
        Ok(self.controller(session))
    }

    fn create(&self, project: &Path, processor: &ProcessorType) -> Result<Box<dyn Controller>> {
        let session = self.connection.call(
            "create",
            json!({ "path": project.to_string_lossy(), "processor_type": processor.0 }),
        )?;
        Ok(self.controller(session))
    }

    fn project_type_from_controller(&self, comm_path: &str) -> Result<ProcessorType> {
        self.connection
            .call("project_type_from_controller", json!({ "comm_path": comm_path }))
    }

    fn release(&mut self) -> Result<()> {
        let result = self.connection.call::<()>("release", json!({}));
        self.connection.shutdown();
        result
    }
}

struct HostController {
    connection: Arc<HostConnection>,
    session: u64,
}

impl HostController {
    fn call<T: DeserializeOwned>(&self, method: &str) -> Result<T> {
        self.call_with(method, json!({}))
    }

    fn call_with<T: DeserializeOwned>(&self, method: &str, mut params: Value) -> Result<T> {
        params["session"] = json!(self.session);
        self.connection.call(&format!("controller.{method}"), params)
    }
}

impl Controller for HostController {
    fn name(&self) -> Result<String> {
        self.call("name")
    }

    fn description(&self) -> Result<String> {
        self.call("description")
    }

    fn project_comm_path(&self) -> Result<String> {
        self.call("project_comm_path")
    }

    fn current_comm_path(&self) -> Result<String> {
        self.call("current_comm_path")
    }

    fn set_comm_path(&mut self, path: &str) -> Result<()> {
        self.call_with("set_comm_path", json!({ "path": path }))
    }

    fn processor_type(&self) -> Result<String> {
        self.call("processor_type")
    }

    fn pending_edits_exist(&self) -> Result<bool> {
        self.call("pending_edits_exist")
    }

    fn total_memory_blocks(&self) -> Result<MemoryBlocks> {
        self.call("total_memory_blocks")
    }

    fn used_memory_blocks(&self) -> Result<MemoryBlocks> {
        self.call("used_memory_blocks")
    }

    fn set_auto_flush_events(&mut self, enabled: bool) -> Result<()> {
        self.call_with("set_auto_flush_events", json!({ "enabled": enabled }))
    }

    fn go_online(&mut self) -> Result<()> {
        self.call("go_online")
    }

    fn go_connected(&mut self) -> Result<()> {
        self.call("go_connected")
    }

    fn can_correlate(&mut self) -> Result<Correlation> {
        self.call("can_correlate")
    }

    fn set_mode(&mut self, mode: ControllerMode) -> Result<()> {
        self.call_with("set_mode", json!({ "mode": mode }))
    }

    fn upload(&mut self) -> Result<()> {
        self.call("upload")
    }

    fn upload_tag_data(&mut self) -> Result<()> {
        self.call("upload_tag_data")
    }

    fn download(
        &mut self,
        forces_on: bool,
        reserved0: bool,
        mode: ControllerMode,
        reserved1: bool,
    ) -> Result<()> {
        self.call_with(
            "download",
            json!({
                "forces_on": forces_on,
                "reserved0": reserved0,
                "mode": mode,
                "reserved1": reserved1,
            }),
        )
    }

    fn save(&mut self) -> Result<()> {
        self.call("save")
    }

    fn force_close(&mut self) -> Result<()> {
        self.connection.remove_sink(self.session);
        self.call("force_close")
    }

    fn subscribe(&mut self, sink: Arc<dyn ControllerEventSink>) -> Result<()> {
        self.connection.register_sink(self.session, sink);
        self.call("subscribe")
    }
}
