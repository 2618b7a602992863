use std::sync::Arc;

use crate::config::ToolConfig;
use crate::error::TransferResult;
use crate::lifetime::ServiceLifetimeManager;
use crate::native::{HostServiceProvider, InstallDirectory};
use crate::process::{NoopReaper, ProcessReaper, ServiceProcessReaper};
use crate::progress::ProgressReporter;
use crate::revision::RevisionResolver;

/// Everything a workflow needs, passed explicitly instead of held globally.
#[derive(Clone)]
pub struct TransferContext {
    pub resolver: RevisionResolver,
    pub services: ServiceLifetimeManager,
    pub progress: Arc<dyn ProgressReporter>,
}

impl TransferContext {
    pub fn new(
        resolver: RevisionResolver,
        services: ServiceLifetimeManager,
        progress: Arc<dyn ProgressReporter>,
    ) -> Self {
        Self {
            resolver,
            services,
            progress,
        }
    }

    /// Wire the process-hosted native adapter described by `config`.
    pub fn from_config(
        config: &ToolConfig,
        progress: Arc<dyn ProgressReporter>,
    ) -> TransferResult<Self> {
        config.validate()?;

        let directory = Arc::new(InstallDirectory::new(config)?);
        let provider = Arc::new(HostServiceProvider::new(config));
        let reaper: Arc<dyn ProcessReaper> = if config.reap_orphans {
            Arc::new(ServiceProcessReaper::new(&config.service_process))
        } else {
            Arc::new(NoopReaper)
        };

        Ok(Self::new(
            RevisionResolver::new(directory),
            ServiceLifetimeManager::new(provider, reaper),
            progress,
        ))
    }
}
