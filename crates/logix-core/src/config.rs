//! Tool configuration

use std::path::PathBuf;
use std::time::Duration;

use crate::error::TransferError;

/// Default install root for the automation service revisions
#[cfg(windows)]
pub const DEFAULT_INSTALL_DIR: &str = r"C:\Program Files (x86)\Rockwell Software\RSLogix 5000";
#[cfg(not(windows))]
pub const DEFAULT_INSTALL_DIR: &str = "/opt/rockwell/logix";

pub const DEFAULT_SERVICE_PROCESS: &str = "RSLogix5000Services";
pub const DEFAULT_HEADER_SCAN_BYTES: usize = 64 * 1024;

/// Configuration for locating and driving the automation service
#[derive(Debug, Clone)]
pub struct ToolConfig {
    /// Root directory holding one `v<major>.<minor>` folder per installed revision
    pub install_dir: PathBuf,

    /// Executable and process name of the native service
    pub service_process: String,

    /// Upper bound on a single native call; `None` waits forever
    pub call_timeout: Option<Duration>,

    /// How much of a project file is scanned for its revision marker
    pub header_scan_bytes: usize,

    /// Whether to kill service processes left running after release
    pub reap_orphans: bool,
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            install_dir: PathBuf::from(DEFAULT_INSTALL_DIR),
            service_process: DEFAULT_SERVICE_PROCESS.to_string(),
            call_timeout: None,
            header_scan_bytes: DEFAULT_HEADER_SCAN_BYTES,
            reap_orphans: true,
        }
    }
}

impl ToolConfig {
    /// Load configuration from environment variables with defaults
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(path) = std::env::var("LOGIX_INSTALL_DIR") {
            config.install_dir = PathBuf::from(path);
        }

        if let Ok(name) = std::env::var("LOGIX_SERVICE_PROCESS") {
            config.service_process = name;
        }

        if let Ok(secs) = std::env::var("LOGIX_CALL_TIMEOUT_SECS") {
            if let Ok(secs) = secs.parse::<u64>() {
                config.call_timeout = (secs > 0).then(|| Duration::from_secs(secs));
            }
        }

        if let Ok(bytes) = std::env::var("LOGIX_HEADER_SCAN_BYTES") {
            if let Ok(bytes) = bytes.parse() {
                config.header_scan_bytes = bytes;
            }
        }

        if let Ok(val) = std::env::var("LOGIX_REAP_ORPHANS") {
            config.reap_orphans = val.to_lowercase() != "false" && val != "0";
        }

        config
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), TransferError> {
        if self.service_process.trim().is_empty() {
            return Err(TransferError::Config {
                message: "service_process cannot be empty".to_string(),
            });
        }

        if self.header_scan_bytes == 0 {
            return Err(TransferError::Config {
                message: "header_scan_bytes must be greater than 0".to_string(),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clear_env() {
        for key in [
            "LOGIX_INSTALL_DIR",
            "LOGIX_SERVICE_PROCESS",
            "LOGIX_CALL_TIMEOUT_SECS",
            "LOGIX_HEADER_SCAN_BYTES",
            "LOGIX_REAP_ORPHANS",
        ] {
            std::env::remove_var(key);
        }
    }

    #[test]
    #[serial]
    fn test_from_env_defaults() {
        clear_env();
        let config = ToolConfig::from_env();

        assert_eq!(config.install_dir, PathBuf::from(DEFAULT_INSTALL_DIR));
        assert_eq!(config.service_process, "RSLogix5000Services");
        assert_eq!(config.call_timeout, None);
        assert_eq!(config.header_scan_bytes, 65536);
        assert!(config.reap_orphans);
        assert!(config.validate().is_ok());
    }

    #[test]
    #[serial]
    fn test_from_env_overrides() {
        clear_env();
        std::env::set_var("LOGIX_INSTALL_DIR", "/tmp/logix");
        std::env::set_var("LOGIX_CALL_TIMEOUT_SECS", "90");
        std::env::set_var("LOGIX_REAP_ORPHANS", "false");
        std::env::set_var("LOGIX_HEADER_SCAN_BYTES", "not-a-number");

        let config = ToolConfig::from_env();
        clear_env();

        assert_eq!(config.install_dir, PathBuf::from("/tmp/logix"));
        assert_eq!(config.call_timeout, Some(Duration::from_secs(90)));
        assert!(!config.reap_orphans);
        assert_eq!(config.header_scan_bytes, DEFAULT_HEADER_SCAN_BYTES);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = ToolConfig::default();
        config.service_process = " ".to_string();
        assert!(config.validate().is_err());

        let config = ToolConfig {
            header_scan_bytes: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
