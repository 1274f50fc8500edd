//! Preloading fork server
//!
//! The daemon re-executes its own binary with the hidden `--fork-server`
//! flag. That process is single-threaded: it loads the module list once,
//! reports `Ready`, then forks one worker per request and reports the exit
//! status. It never runs a task itself and exits when its stdin closes.
//!
//! A fork server that died is started again, with the same modules, on
//! the next request.

use std::fs::File;
use std::io::{self, BufReader, BufWriter};
use std::os::fd::AsRawFd;
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::time::{Duration, Instant};

use super::child::{fork_and_wait, ChildStdio, Prepared};
use super::preload::Preloaded;
use super::task::{ModuleList, Task};
use super::{LaunchMode, WorkerFactory};
use crate::common::{Error, Result};
use crate::ipc::protocol::{ForkServerReply, WorkerRequest};
use crate::ipc::transport;

/// Hidden flag selecting fork server mode
pub const FORK_SERVER_FLAG: &str = "--fork-server";

/// How long a closed fork server gets to exit before it is killed
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

/// Daemon-side handle to a running fork server
pub struct ForkServerHandle {
    modules: ModuleList,
    worker_exe: PathBuf,
    child: Child,
    stdin: Option<ChildStdin>,
    stdout: BufReader<ChildStdout>,
    loaded: Vec<String>,
}

impl ForkServerHandle {
    /// Start a fork server from `worker_exe` and wait until its modules are loaded
    pub fn start(modules: &ModuleList, worker_exe: &Path) -> Result<Self> {
        let mut command = Command::new(worker_exe);
        command.arg(FORK_SERVER_FLAG);
        for module in modules.iter() {
            command.arg("--module-name").arg(module);
        }

        let mut child = command
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|e| {
                Error::launch_failed(format!(
                    "failed to start fork server {}: {}",
                    worker_exe.display(),
                    e
                ))
            })?;

        let (stdin, stdout) = match (child.stdin.take(), child.stdout.take()) {
            (Some(stdin), Some(stdout)) => (stdin, stdout),
            _ => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(Error::Internal("fork server pipes were not created".to_string()));
            }
        };

        let mut handle = Self {
            modules: modules.clone(),
            worker_exe: worker_exe.to_path_buf(),
            child,
            stdin: Some(stdin),
            stdout: BufReader::new(stdout),
            loaded: Vec::new(),
        };

        match handle.recv()? {
            ForkServerReply::Ready { pid, loaded } => {
                tracing::info!(pid, loaded = ?loaded, "Fork server ready");
                handle.loaded = loaded;
                Ok(handle)
            }
            other => Err(Error::ForkServer(format!(
                "expected ready message, got {:?}",
                other
            ))),
        }
    }

    /// Relaunch the fork server if it is no longer running
    fn ensure_running(&mut self) -> Result<()> {
        match self.child.try_wait() {
            Ok(None) => Ok(()),
            Ok(Some(status)) => {
                tracing::warn!(pid = self.child.id(), %status, "Fork server exited, relaunching");
                self.relaunch()
            }
            Err(e) => Err(Error::ForkServer(format!("cannot poll fork server: {}", e))),
        }
    }

    /// Replace this handle with a freshly started fork server
    fn relaunch(&mut self) -> Result<()> {
        let fresh = Self::start(&self.modules, &self.worker_exe)?;
        drop(std::mem::replace(self, fresh));
        Ok(())
    }

    fn recv(&mut self) -> Result<ForkServerReply> {
        transport::recv_json(&mut self.stdout).map_err(|e| self.lost(e))
    }

    fn send(&mut self, request: &WorkerRequest) -> Result<()> {
        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| Error::ForkServer("fork server is shut down".to_string()))?;
        let result = transport::send_json(stdin, request);
        result.map_err(|e| self.lost(e))
    }

    fn lost(&mut self, e: io::Error) -> Error {
        match self.child.try_wait() {
            Ok(Some(status)) => {
                Error::ForkServer(format!("fork server exited ({}): {}", status, e))
            }
            _ => Error::ForkServer(e.to_string()),
        }
    }

    /// Close the request pipe and reap the fork server
    fn shutdown(&mut self) {
        drop(self.stdin.take());

        let deadline = Instant::now() + SHUTDOWN_GRACE;
        loop {
            match self.child.try_wait() {
                Ok(Some(status)) => {
                    tracing::debug!(%status, "Fork server exited");
                    return;
                }
                Ok(None) if Instant::now() < deadline => {
                    std::thread::sleep(Duration::from_millis(20));
                }
                _ => break,
            }
        }

        tracing::warn!(pid = self.child.id(), "Fork server did not exit, killing it");
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

impl WorkerFactory for ForkServerHandle {
    fn mode(&self) -> LaunchMode {
        LaunchMode::ForkServer
    }

    fn run_worker(&mut self, task: &Task, args: &[String]) -> Result<i32> {
        let request = WorkerRequest {
            task: task.to_wire()?,
            args: args.to_vec(),
        };

        self.ensure_running()?;
        if let Err(e) = self.send(&request) {
            // Died between the liveness check and the write.
            tracing::warn!(error = %e, "Fork server lost, relaunching");
            self.relaunch()?;
            self.send(&request)?;
        }

        match self.recv()? {
            ForkServerReply::Exited { code } => Ok(code),
            ForkServerReply::Failed { message } => Err(Error::LaunchFailed(message)),
            ForkServerReply::Ready { .. } => Err(Error::ForkServer(
                "unexpected ready message".to_string(),
            )),
        }
    }

    fn loaded(&self) -> Vec<String> {
        self.loaded.clone()
    }

    fn template_pid(&self) -> Option<u32> {
        Some(self.child.id())
    }
}

impl Drop for ForkServerHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Body of the hidden fork server mode
///
/// Runs until the daemon closes stdin. Modules that fail to load are
/// logged and skipped.
pub fn serve(modules: &ModuleList) -> Result<()> {
    let preloaded = Preloaded::load_lenient(modules);
    let null = File::open("/dev/null")?;

    let stdin = io::stdin();
    let mut reader = stdin.lock();
    let stdout = io::stdout();
    let mut writer = BufWriter::new(stdout.lock());

    transport::send_json(
        &mut writer,
        &ForkServerReply::Ready {
            pid: std::process::id(),
            loaded: preloaded.loaded(),
        },
    )?;

    loop {
        let request: WorkerRequest = match transport::recv_json(&mut reader) {
            Ok(request) => request,
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                tracing::debug!("Request pipe closed, fork server exiting");
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };

        let task = Task::from(request.task);
        tracing::debug!(%task, args = ?request.args, "Forking worker");

        let reply = match Prepared::new(&task, &request.args, &preloaded).and_then(|prepared| {
            fork_and_wait(
                &prepared,
                ChildStdio::Detached {
                    null: null.as_raw_fd(),
                },
            )
        }) {
            Ok(code) => ForkServerReply::Exited { code },
            Err(e) => ForkServerReply::Failed {
                message: e.to_string(),
            },
        };

        transport::send_json(&mut writer, &reply)?;
    }
}
