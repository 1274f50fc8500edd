//! Command line definition
//!
//! One binary, several roles: daemon (`--listen`), one-shot client (the
//! default), and two hidden modes the launch strategies re-execute.

use std::path::PathBuf;
use std::time::Duration;

use clap::{ArgGroup, Parser};

use crate::common::config::Config;
use crate::daemon::DaemonSettings;
use crate::launcher::{LaunchMode, ModuleList, Task};

#[derive(Parser, Debug)]
#[command(
    name = "ltest",
    about = "Testing server that preloads modules once and forks a fresh worker for every run"
)]
#[command(version, long_about = None)]
#[command(group(
    ArgGroup::new("action").args(["listen", "ping", "restart", "shutdown", "status"])
))]
pub struct Cli {
    /// TCP address to listen on or connect to (default: 127.0.0.1)
    #[arg(short = 'H', long)]
    pub host: Option<String>,

    /// TCP port to listen on or connect to (default: 7070)
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Run in testing server mode
    #[arg(short, long)]
    pub listen: bool,

    /// Module to preload; can be given multiple times
    #[arg(short, long = "module-name", value_name = "MODULE")]
    pub module_name: Vec<String>,

    /// Initial launch mode of the testing server (fork, forkserver, spawn)
    #[arg(long, value_name = "METHOD")]
    pub method: Option<LaunchMode>,

    /// Test runner program (default: pytest)
    #[arg(long, value_name = "PROGRAM")]
    pub runner: Option<String>,

    /// Run this entry point of a preloaded module instead of a runner program
    #[arg(long, value_name = "SYMBOL")]
    pub entry: Option<String>,

    /// Client connect/read timeout in seconds (default: 120)
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Check that the testing server is alive
    #[arg(long)]
    pub ping: bool,

    /// Rebuild the server's template, optionally with another launch mode
    #[arg(long, value_name = "METHOD", num_args = 0..=1, default_missing_value = "")]
    pub restart: Option<String>,

    /// Stop the testing server
    #[arg(long)]
    pub shutdown: bool,

    /// Show the server's launch mode, modules and run count
    #[arg(long)]
    pub status: bool,

    /// Exit with the remote test outcome instead of always exiting 0
    #[arg(long)]
    pub propagate_exit: bool,

    #[arg(long, hide = true)]
    pub fork_server: bool,

    #[arg(long, hide = true, value_name = "SYMBOL")]
    pub worker_entry: Option<String>,

    /// Arguments to pass to the test runner
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub args: Vec<String>,
}

/// What the one-shot client sends
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientAction {
    Run(Vec<String>),
    Ping,
    Restart(Option<String>),
    Shutdown,
    Status,
}

/// Where and how the one-shot client connects
#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub host: String,
    pub port: u16,
    pub timeout: Duration,
}

impl Cli {
    /// Runner arguments with a leading `--` separator removed
    pub fn runner_args(&self) -> Vec<String> {
        match self.args.split_first() {
            Some((first, rest)) if first == "--" => rest.to_vec(),
            _ => self.args.clone(),
        }
    }

    pub fn modules(&self) -> ModuleList {
        ModuleList::new(self.module_name.iter().cloned())
    }

    pub fn daemon_settings(&self, config: &Config, worker_exe: PathBuf) -> DaemonSettings {
        let modules = if self.module_name.is_empty() {
            ModuleList::new(config.preload.modules.iter().cloned())
        } else {
            self.modules()
        };

        let runner = match self.entry.as_ref().or(config.runner.entry.as_ref()) {
            Some(symbol) => Task::entry(symbol.clone()),
            None => Task::exec(
                self.runner
                    .clone()
                    .unwrap_or_else(|| config.runner.program.clone()),
            ),
        };

        DaemonSettings {
            host: self.host(config),
            port: self.port(config),
            modules,
            method: self.method.unwrap_or(config.server.method),
            runner,
            worker_exe,
        }
    }

    pub fn client_settings(&self, config: &Config) -> ClientSettings {
        ClientSettings {
            host: self.host(config),
            port: self.port(config),
            timeout: Duration::from_secs(self.timeout.unwrap_or(config.client.timeout_secs)),
        }
    }

    pub fn client_action(&self) -> ClientAction {
        if self.ping {
            ClientAction::Ping
        } else if let Some(method) = &self.restart {
            ClientAction::Restart(Some(method.clone()).filter(|m| !m.is_empty()))
        } else if self.shutdown {
            ClientAction::Shutdown
        } else if self.status {
            ClientAction::Status
        } else {
            ClientAction::Run(self.runner_args())
        }
    }

    fn host(&self, config: &Config) -> String {
        self.host.clone().unwrap_or_else(|| config.server.host.clone())
    }

    fn port(&self, config: &Config) -> u16 {
        self.port.unwrap_or(config.server.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("ltest").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_defaults() {
        let cli = parse(&[]);
        let config = Config::default();
        let client = cli.client_settings(&config);
        assert_eq!(client.host, "127.0.0.1");
        assert_eq!(client.port, 7070);
        assert_eq!(client.timeout, Duration::from_secs(120));
        assert_eq!(cli.client_action(), ClientAction::Run(vec![]));
    }

    #[test]
    fn test_separator_is_stripped() {
        let cli = parse(&["--", "-k", "test_pass"]);
        assert_eq!(cli.runner_args(), vec!["-k", "test_pass"]);

        let cli = parse(&["tests/test_api.py", "-x"]);
        assert_eq!(cli.runner_args(), vec!["tests/test_api.py", "-x"]);
    }

    #[test]
    fn test_daemon_flags() {
        let cli = parse(&[
            "-l", "-H", "0.0.0.0", "-p", "9000", "-m", "liba.so", "-m", "libb.so", "--method",
            "spawn",
        ]);
        assert!(cli.listen);
        let settings = cli.daemon_settings(&Config::default(), PathBuf::from("/usr/bin/ltest"));
        assert_eq!(settings.host, "0.0.0.0");
        assert_eq!(settings.port, 9000);
        assert_eq!(settings.modules, ModuleList::new(["liba.so", "libb.so"]));
        assert_eq!(settings.method, LaunchMode::Spawn);
        assert!(matches!(settings.runner, Task::Exec { ref program } if program == "pytest"));
    }

    #[test]
    fn test_config_fills_missing_flags() {
        let config = Config::parse(
            r#"
[server]
port = 8080
method = "fork"

[preload]
modules = ["libheavy.so"]

[runner]
entry = "run_tests"
"#,
        )
        .unwrap();
        let settings = parse(&["--listen"]).daemon_settings(&config, PathBuf::from("ltest"));
        assert_eq!(settings.port, 8080);
        assert_eq!(settings.method, LaunchMode::Fork);
        assert_eq!(settings.modules, ModuleList::new(["libheavy.so"]));
        assert!(matches!(settings.runner, Task::Entry { ref symbol } if symbol == "run_tests"));
    }

    #[test]
    fn test_bogus_method_flag_is_rejected() {
        assert!(Cli::try_parse_from(["ltest", "-l", "--method", "bogus"]).is_err());
    }

    #[test]
    fn test_client_actions() {
        assert_eq!(parse(&["--ping"]).client_action(), ClientAction::Ping);
        assert_eq!(parse(&["--shutdown"]).client_action(), ClientAction::Shutdown);
        assert_eq!(parse(&["--status"]).client_action(), ClientAction::Status);
        assert_eq!(parse(&["--restart"]).client_action(), ClientAction::Restart(None));
        assert_eq!(
            parse(&["--restart", "spawn"]).client_action(),
            ClientAction::Restart(Some("spawn".to_string()))
        );
    }

    #[test]
    fn test_actions_are_exclusive() {
        assert!(Cli::try_parse_from(["ltest", "--ping", "--shutdown"]).is_err());
        assert!(Cli::try_parse_from(["ltest", "--listen", "--status"]).is_err());
    }
}
