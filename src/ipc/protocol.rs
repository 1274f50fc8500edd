//! Wire message types
//!
//! Two protocols live here:
//! - the HTTP control protocol bodies exchanged between client and daemon
//! - the length-prefixed JSON frames exchanged between the daemon and its
//!   fork server over the fork server's stdin/stdout

use serde::{Deserialize, Serialize};

use crate::launcher::{LaunchMode, ModuleList};

// === HTTP control protocol ===

/// Body of `POST /run`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunRequest {
    /// Arguments for the test runner
    #[serde(default)]
    pub args: Vec<String>,
}

/// Body of a `POST /run` response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunResponse {
    /// Worker exit status; `null` only when the daemon could not report one
    pub code: Option<i32>,
    /// Why the worker could not be launched
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RunResponse {
    pub fn exited(code: i32) -> Self {
        Self { code: Some(code), error: None }
    }

    pub fn launch_failed(code: i32, error: String) -> Self {
        Self {
            code: Some(code),
            error: Some(error),
        }
    }

    /// A missing code and a zero code both mean the tests passed
    pub fn passed(&self) -> bool {
        matches!(self.code, None | Some(0))
    }
}

/// Server lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServerState {
    Running,
    ShuttingDown,
}

/// Body of `GET /status`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub state: ServerState,
    pub mode: LaunchMode,
    pub modules: ModuleList,
    /// Modules actually resident in the template
    #[serde(default)]
    pub loaded: Vec<String>,
    /// Fork server process id, in `forkserver` mode
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_pid: Option<u32>,
    /// Workers that ran to completion since startup
    pub runs: u64,
}

// === Fork server protocol ===

/// Task as understood by the fork server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WireTask {
    Exec { program: String },
    Entry { symbol: String },
}

/// Daemon → fork server: run one worker
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerRequest {
    pub task: WireTask,
    pub args: Vec<String>,
}

/// Fork server → daemon
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ForkServerReply {
    /// Sent once after the module list is loaded
    Ready { pid: u32, loaded: Vec<String> },
    /// The worker terminated
    Exited { code: i32 },
    /// The worker could not be created
    Failed { message: String },
}
