//! Configuration, log and executable paths

use std::io;
use std::path::PathBuf;

/// Name used for the configuration and data directories
const APP_NAME: &str = "ltest";

/// Get the configuration directory path
///
/// Uses the directories crate for platform-appropriate locations:
/// - Linux: `~/.config/ltest/`
/// - macOS: `~/Library/Application Support/ltest/`
/// - Windows: `%APPDATA%\ltest\`
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", APP_NAME).map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the configuration file
pub fn config_path() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join("config.toml"))
}

/// Get the path to the log directory
pub fn log_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", APP_NAME).map(|dirs| dirs.data_dir().join("logs"))
}

/// Path of the running binary
///
/// The fork server and clean-spawn entry workers re-execute this binary
/// in one of its hidden modes.
pub fn worker_executable() -> io::Result<PathBuf> {
    std::env::current_exe()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_path_ends_with_toml() {
        if let Some(path) = config_path() {
            assert_eq!(path.file_name().unwrap(), "config.toml");
        }
    }

    #[test]
    fn test_log_dir_is_under_app_dir() {
        if let Some(dir) = log_dir() {
            assert!(dir.ends_with("logs"));
            assert!(dir.to_string_lossy().contains(APP_NAME));
        }
    }
}
