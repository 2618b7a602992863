//! Service lifetime management
//!
//! [`ServiceLifetimeManager::acquire`] hands out a [`ServiceHandle`] that owns
//! the native service for one revision. Projects opened through the handle are
//! [`ControllerSession`]s that borrow it, so a session cannot outlive the
//! service and is always closed before the service is released.
//!
//! Release runs exactly once per handle: explicitly through
//! [`ServiceHandle::release`], or on drop along any early-return path.
//! Failures during release are logged and swallowed because release already
//! runs inside cleanup.

use std::marker::PhantomData;
use std::ops::{Deref, DerefMut};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::{TransferError, TransferResult};
use crate::native::{Controller, LogixServices, ProcessorType, ServiceProvider};
use crate::process::ProcessReaper;
use crate::revision::RevisionDescriptor;

/// Acquires and releases automation service instances.
#[derive(Clone)]
pub struct ServiceLifetimeManager {
    provider: Arc<dyn ServiceProvider>,
    reaper: Arc<dyn ProcessReaper>,
}

impl ServiceLifetimeManager {
    pub fn new(provider: Arc<dyn ServiceProvider>, reaper: Arc<dyn ProcessReaper>) -> Self {
        Self { provider, reaper }
    }

    /// Instantiate the service bound to `revision`.
    pub fn acquire(&self, revision: &RevisionDescriptor) -> TransferResult<ServiceHandle> {
        if !revision.available {
            return Err(revision.not_installed());
        }

        info!("Please wait, instantiating Logix services (this can take a while)...");
        let services = self.provider.instantiate(revision)?;
        debug!(revision = %revision, token = %revision.interface_version, "Logix services instantiated");

        Ok(ServiceHandle {
            services: Some(services),
            reaper: self.reaper.clone(),
            revision: revision.clone(),
        })
    }

    /// Release a handle. Equivalent to dropping it.
    pub fn release(&self, handle: ServiceHandle) {
        handle.release();
    }
}

/// Exclusive owner of a live automation service.
pub struct ServiceHandle {
    services: Option<Box<dyn LogixServices>>,
    reaper: Arc<dyn ProcessReaper>,
    revision: RevisionDescriptor,
}

impl ServiceHandle {
    pub fn revision(&self) -> &RevisionDescriptor {
        &self.revision
    }

    pub fn open_copy_of(&self, project: &Path) -> TransferResult<ControllerSession<'_>> {
        let controller = self.services()?.open_copy_of(project)?;
        Ok(ControllerSession::new(controller))
    }

    pub fn create(
        &self,
        project: &Path,
        processor: &ProcessorType,
    ) -> TransferResult<ControllerSession<'_>> {
        let controller = self.services()?.create(project, processor)?;
        Ok(ControllerSession::new(controller))
    }

    pub fn project_type_from_controller(&self, comm_path: &str) -> TransferResult<ProcessorType> {
        Ok(self.services()?.project_type_from_controller(comm_path)?)
    }

    /// Release the native service and reap any process it left behind.
    pub fn release(mut self) {
        self.release_inner();
    }

    fn services(&self) -> TransferResult<&dyn LogixServices> {
        self.services
            .as_deref()
            .ok_or_else(|| TransferError::Native(anyhow::anyhow!("Logix services already released")))
    }

    fn release_inner(&mut self) {
        let Some(mut services) = self.services.take() else {
            return;
        };

        debug!("Shutting down Logix...");
        if let Err(e) = services.release() {
            warn!(error = %e, "Logix services release call failed");
        }
        drop(services);

        match self.reaper.reap_orphans() {
            Ok(pids) if !pids.is_empty() => debug!(?pids, "Reaped orphaned service processes"),
            Ok(_) => {}
            Err(e) => warn!(error = %e, "Failed to reap orphaned service processes"),
        }
    }
}

impl Drop for ServiceHandle {
    fn drop(&mut self) {
        self.release_inner();
    }
}

/// An opened project, logically owned by the [`ServiceHandle`] it came from.
///
/// Dereferences to the underlying [`Controller`]. Force-closed on drop unless
/// already closed.
pub struct ControllerSession<'a> {
    controller: Box<dyn Controller>,
    closed: bool,
    _service: PhantomData<&'a ServiceHandle>,
}

impl ControllerSession<'_> {
    fn new(controller: Box<dyn Controller>) -> Self {
        Self {
            controller,
            closed: false,
            _service: PhantomData,
        }
    }

    /// Force-close the project. Safe to call more than once.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        if let Err(e) = self.controller.force_close() {
            warn!(error = %e, "Failed to close controller session");
        }
    }
}

impl Deref for ControllerSession<'_> {
    type Target = dyn Controller;

    fn deref(&self) -> &Self::Target {
        self.controller.as_ref()
    }
}

impl DerefMut for ControllerSession<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.controller.as_mut()
    }
}

impl Drop for ControllerSession<'_> {
    fn drop(&mut self) {
        self.close();
    }
}
