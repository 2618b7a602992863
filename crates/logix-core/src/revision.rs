//! Revision resolution
//!
//! Works out which controller-software revision a project needs and whether a
//! matching automation service is installed. Installation state is queried on
//! every call; nothing is cached between calls.

use std::cmp::Ordering;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

use crate::error::{TransferError, TransferResult};

/// Identifies one controller-software release.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevisionDescriptor {
    pub major: u32,
    pub minor: u32,
    /// Opaque token used to instantiate the matching service
    pub interface_version: String,
    pub available: bool,
}

impl RevisionDescriptor {
    pub fn new(major: u32, minor: u32, interface_version: impl Into<String>, available: bool) -> Self {
        Self {
            major,
            minor,
            interface_version: interface_version.into(),
            available,
        }
    }

    /// Error to report when this revision is needed but missing.
    pub fn not_installed(&self) -> TransferError {
        TransferError::RequiredVersionNotInstalled {
            major: self.major,
            minor: self.minor,
        }
    }

    fn version_cmp(&self, other: &Self) -> Ordering {
        (self.major, self.minor).cmp(&(other.major, other.minor))
    }
}

impl fmt::Display for RevisionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// Picks the highest revision among installed ones.
pub fn latest_of<'a, I>(revisions: I) -> Option<&'a RevisionDescriptor>
where
    I: IntoIterator<Item = &'a RevisionDescriptor>,
{
    revisions
        .into_iter()
        .filter(|r| r.available)
        .max_by(|a, b| a.version_cmp(b))
}

/// Local registry of installed revisions.
pub trait RevisionDirectory: Send + Sync {
    /// Revision embedded in a project file, with its current availability.
    fn revision_from_project(&self, project: &Path) -> TransferResult<RevisionDescriptor>;

    /// Highest revision installed right now.
    fn latest_available(&self) -> TransferResult<RevisionDescriptor>;
}

/// Applies the resolution policy on top of a [`RevisionDirectory`].
#[derive(Clone)]
pub struct RevisionResolver {
    directory: Arc<dyn RevisionDirectory>,
}

impl RevisionResolver {
    pub fn new(directory: Arc<dyn RevisionDirectory>) -> Self {
        Self { directory }
    }

    pub fn resolve_from_project(&self, project: &Path) -> TransferResult<RevisionDescriptor> {
        let revision = self.directory.revision_from_project(project)?;
        debug!(
            project = %project.display(),
            revision = %revision,
            available = revision.available,
            "Resolved project revision"
        );
        Ok(revision)
    }

    /// `false` is an ordinary answer here, not an error.
    pub fn required_version_installed(&self, project: &Path) -> TransferResult<bool> {
        Ok(self.resolve_from_project(project)?.available)
    }

    pub fn latest_installed(&self) -> TransferResult<RevisionDescriptor> {
        let revision = self.directory.latest_available()?;
        if !revision.available {
            return Err(TransferError::NoRevisionInstalled);
        }
        Ok(revision)
    }

    /// Resolves the project revision and fails unless it is installed.
    ///
    /// The installation check resolves again instead of trusting the first
    /// answer, so a revision removed in between is caught here.
    pub fn require_installed(&self, project: &Path) -> TransferResult<RevisionDescriptor> {
        debug!("Getting revision information...");
        let revision = self.resolve_from_project(project)?;
        debug!("Revision info found, Version {revision}");

        debug!("Checking if revision is installed...");
        if !self.required_version_installed(project)? {
            return Err(revision.not_installed());
        }
        debug!("Version is installed!");
        Ok(revision)
    }
}
