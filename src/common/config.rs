//! Configuration file handling

use serde::Deserialize;
use std::path::Path;

use super::paths::config_path;
use super::Result;
use crate::launcher::LaunchMode;

/// Main configuration structure
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    /// Listen address and initial launch mode
    #[serde(default)]
    pub server: ServerConfig,

    /// Test runner invoked for every `run` request
    #[serde(default)]
    pub runner: RunnerConfig,

    /// Modules loaded into the fork server template
    #[serde(default)]
    pub preload: PreloadConfig,

    /// One-shot client settings
    #[serde(default)]
    pub client: ClientConfig,
}

/// Server settings
#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Launch mode used when the context is first created
    #[serde(default)]
    pub method: LaunchMode,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            method: LaunchMode::default(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    7070
}

/// Test runner settings
#[derive(Debug, Deserialize)]
pub struct RunnerConfig {
    /// External runner program, resolved on PATH
    #[serde(default = "default_runner")]
    pub program: String,

    /// Entry point exported by a preloaded module; takes precedence over `program`
    #[serde(default)]
    pub entry: Option<String>,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            program: default_runner(),
            entry: None,
        }
    }
}

fn default_runner() -> String {
    "pytest".to_string()
}

/// Preload settings
#[derive(Debug, Deserialize, Default)]
pub struct PreloadConfig {
    #[serde(default)]
    pub modules: Vec<String>,
}

/// Client settings
#[derive(Debug, Deserialize)]
pub struct ClientConfig {
    /// Connect/read timeout for a single request
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout(),
        }
    }
}

fn default_timeout() -> u64 {
    120
}

impl Config {
    /// Load configuration from the default config file
    ///
    /// Returns default configuration if file doesn't exist
    pub fn load() -> Result<Self> {
        match config_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Load configuration from an explicit path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| super::Error::FileRead {
            path: path.display().to_string(),
            error: e.to_string(),
        })?;
        Self::parse(&content)
    }

    /// Parse configuration from TOML text
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| super::Error::ConfigParse(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_protocol_defaults() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 7070);
        assert_eq!(config.server.method, LaunchMode::ForkServer);
        assert_eq!(config.runner.program, "pytest");
        assert!(config.runner.entry.is_none());
        assert!(config.preload.modules.is_empty());
        assert_eq!(config.client.timeout_secs, 120);
    }

    #[test]
    fn test_parse_full_file() {
        let config = Config::parse(
            r#"
[server]
host = "0.0.0.0"
port = 9000
method = "spawn"

[runner]
program = "cargo-nextest"
entry = "run_suite"

[preload]
modules = ["libtorch.so", "/opt/lib/libheavy.so"]

[client]
timeout_secs = 30
"#,
        )
        .unwrap();

        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.method, LaunchMode::Spawn);
        assert_eq!(config.runner.program, "cargo-nextest");
        assert_eq!(config.runner.entry.as_deref(), Some("run_suite"));
        assert_eq!(config.preload.modules.len(), 2);
        assert_eq!(config.client.timeout_secs, 30);
    }

    #[test]
    fn test_unknown_method_is_rejected() {
        let err = Config::parse("[server]\nmethod = \"vfork\"\n").unwrap_err();
        assert!(matches!(err, crate::Error::ConfigParse(_)));
    }

    #[test]
    fn test_load_from_missing_file() {
        let err = Config::load_from(Path::new("/nonexistent/ltest/config.toml")).unwrap_err();
        assert!(matches!(err, crate::Error::FileRead { .. }));
    }
}
