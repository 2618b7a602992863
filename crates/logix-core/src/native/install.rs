//! Installed revision directory
//!
//! The install root holds one folder per revision, named `v<major>.<minor>`,
//! normally with a two-digit minor (`v33.01`) though `v33.1` is accepted too.
//! A revision is available when its folder carries the service executable.
//! The folder name doubles as the interface version token handed to the
//! service provider.

use regex::bytes::Regex;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::config::ToolConfig;
use crate::error::{TransferError, TransferResult};
use crate::revision::{RevisionDescriptor, RevisionDirectory, latest_of};

const REVISION_MARKER: &str = r"(?:Software)?Revision\W{0,4}(\d{1,3})\.(\d{1,3})";
const REVISION_FOLDER: &str = r"^v(\d{1,3})\.(\d{1,3})$";

/// File name of the service executable on this platform.
pub fn executable_name(process_name: &str) -> String {
    if cfg!(windows) && !process_name.to_ascii_lowercase().ends_with(".exe") {
        format!("{process_name}.exe")
    } else {
        process_name.to_string()
    }
}

/// Interface version token for a revision.
pub fn interface_token(major: u32, minor: u32) -> String {
    format!("v{major}.{minor:02}")
}

/// [`RevisionDirectory`] backed by an installation folder on disk.
pub struct InstallDirectory {
    root: PathBuf,
    executable: String,
    header_scan_bytes: usize,
    marker: Regex,
    folder: regex::Regex,
}

impl InstallDirectory {
    pub fn new(config: &ToolConfig) -> TransferResult<Self> {
        let marker = Regex::new(REVISION_MARKER).map_err(anyhow::Error::from)?;
        let folder = regex::Regex::new(REVISION_FOLDER).map_err(anyhow::Error::from)?;
        Ok(Self {
            root: config.install_dir.clone(),
            executable: executable_name(&config.service_process),
            header_scan_bytes: config.header_scan_bytes,
            marker,
            folder,
        })
    }

    fn descriptor(&self, folder: String, major: u32, minor: u32) -> RevisionDescriptor {
        let available = self.root.join(&folder).join(&self.executable).is_file();
        RevisionDescriptor::new(major, minor, folder, available)
    }

    /// Descriptor for a revision named by number, preferring the padded folder.
    fn descriptor_for(&self, major: u32, minor: u32) -> TransferResult<RevisionDescriptor> {
        let padded = self.descriptor(interface_token(major, minor), major, minor);
        if padded.available {
            return Ok(padded);
        }
        let installed = self
            .revisions()?
            .into_iter()
            .find(|r| r.major == major && r.minor == minor && r.available);
        Ok(installed.unwrap_or(padded))
    }

    /// Every revision folder present under the root, available or not.
    pub fn revisions(&self) -> TransferResult<Vec<RevisionDescriptor>> {
        let entries = match std::fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(root = %self.root.display(), "Install directory does not exist");
                return Ok(Vec::new());
            }
            Err(e) => return Err(TransferError::file_access(&self.root, e.to_string())),
        };

        let mut revisions = Vec::new();
        for entry in entries.flatten() {
            if !entry.path().is_dir() {
                continue;
            }
            let name = entry.file_name();
            let name = name.to_string_lossy();
            let Some(captures) = self.folder.captures(&name) else {
                continue;
            };
            if let (Ok(major), Ok(minor)) =
                (captures[1].parse::<u32>(), captures[2].parse::<u32>())
            {
                revisions.push(self.descriptor(name.to_string(), major, minor));
            }
        }
        Ok(revisions)
    }

    /// Revision embedded in the leading bytes of a project file.
    fn read_project_revision(&self, project: &Path) -> TransferResult<(u32, u32)> {
        let file =
            File::open(project).map_err(|e| TransferError::file_access(project, e.to_string()))?;
        let mut header = Vec::with_capacity(self.header_scan_bytes.min(1 << 20));
        file.take(self.header_scan_bytes as u64)
            .read_to_end(&mut header)
            .map_err(|e| TransferError::file_access(project, e.to_string()))?;

        let captures = self
            .marker
            .captures(&header)
            .ok_or_else(|| TransferError::file_access(project, "no revision marker in header"))?;

        let number = |i: usize| {
            std::str::from_utf8(&captures[i])
                .ok()
                .and_then(|s| s.parse::<u32>().ok())
                .ok_or_else(|| TransferError::file_access(project, "malformed revision marker"))
        };
        Ok((number(1)?, number(2)?))
    }
}

impl RevisionDirectory for InstallDirectory {
    fn revision_from_project(&self, project: &Path) -> TransferResult<RevisionDescriptor> {
        let (major, minor) = self.read_project_revision(project)?;
        self.descriptor_for(major, minor)
    }

    fn latest_available(&self) -> TransferResult<RevisionDescriptor> {
        let revisions = self.revisions()?;
        latest_of(&revisions)
            .cloned()
            .ok_or(TransferError::NoRevisionInstalled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    struct Fixture {
        root: TempDir,
        directory: InstallDirectory,
    }

    fn fixture(installed: &[&str], empty: &[&str]) -> Fixture {
        let root = TempDir::new().unwrap();
        let config = ToolConfig {
            install_dir: root.path().to_path_buf(),
            ..Default::default()
        };
        let exe = executable_name(&config.service_process);
        for folder in installed {
            std::fs::create_dir_all(root.path().join(folder)).unwrap();
            std::fs::write(root.path().join(folder).join(&exe), b"").unwrap();
        }
        for folder in empty {
            std::fs::create_dir_all(root.path().join(folder)).unwrap();
        }
        let directory = InstallDirectory::new(&config).unwrap();
        Fixture { root, directory }
    }

    fn project(fixture: &Fixture, header: &[u8]) -> PathBuf {
        let path = fixture.root.path().join("line1.ACD");
        let mut bytes = vec![0u8; 32];
        bytes.extend_from_slice(header);
        bytes.extend_from_slice(&[0xFF; 64]);
        std::fs::write(&path, bytes).unwrap();
        path
    }

    #[test]
    fn test_revision_from_project_checks_installation() {
        let fixture = fixture(&["v33.01"], &["v32.11"]);

        let installed = project(&fixture, b"SoftwareRevision=\"33.01\"");
        let revision = fixture.directory.revision_from_project(&installed).unwrap();
        assert_eq!((revision.major, revision.minor), (33, 1));
        assert_eq!(revision.interface_version, "v33.01");
        assert!(revision.available);

        let missing = project(&fixture, b"Revision 32.11");
        let revision = fixture.directory.revision_from_project(&missing).unwrap();
        assert_eq!(revision.interface_version, "v32.11");
        assert!(!revision.available);
    }

    #[test]
    fn test_revision_from_project_without_marker() {
        let fixture = fixture(&["v33.01"], &[]);
        let path = project(&fixture, b"no metadata here");

        let err = fixture.directory.revision_from_project(&path).unwrap_err();
        assert!(matches!(err, TransferError::FileAccess { .. }));

        let err = fixture
            .directory
            .revision_from_project(&fixture.root.path().join("absent.ACD"))
            .unwrap_err();
        assert!(matches!(err, TransferError::FileAccess { .. }));
    }

    #[test]
    fn test_latest_available_ignores_folders_without_service() {
        let fixture = fixture(&["v32.11", "v33.01"], &["v35.00", "backup", "v36"]);

        let latest = fixture.directory.latest_available().unwrap();
        assert_eq!(latest.interface_version, "v33.01");
        assert_eq!(fixture.directory.revisions().unwrap().len(), 3);
    }

    #[test]
    fn test_unpadded_folder_is_used_as_is() {
        let fixture = fixture(&["v32.1"], &[]);

        let latest = fixture.directory.latest_available().unwrap();
        assert_eq!((latest.major, latest.minor), (32, 1));
        assert_eq!(latest.interface_version, "v32.1");
        assert!(latest.available);

        let path = project(&fixture, b"SoftwareRevision 32.01");
        let revision = fixture.directory.revision_from_project(&path).unwrap();
        assert_eq!(revision.interface_version, "v32.1");
        assert!(revision.available);
    }

    #[test]
    fn test_latest_available_on_empty_root() {
        let fixture = fixture(&[], &[]);
        assert!(matches!(
            fixture.directory.latest_available(),
            Err(TransferError::NoRevisionInstalled)
        ));
    }

    #[test]
    fn test_interface_token_pads_minor() {
        assert_eq!(interface_token(33, 1), "v33.01");
        assert_eq!(interface_token(20, 11), "v20.11");
    }
}
