//! Owner thread for the execution context
//!
//! The context lives on one dedicated thread and is only reachable through
//! [`ContextHandle`]. Commands are handled strictly one at a time, so a
//! reset can never overlap a running worker and at most one worker exists.

use serde::Serialize;
use tokio::sync::{mpsc, oneshot};

use super::ExecutionContext;
use crate::common::{Error, Result};
use crate::launcher::{LaunchMode, ModuleList, Task};

/// Commands queued beyond this block the sender
const QUEUE_DEPTH: usize = 64;

enum Command {
    Reset {
        mode: LaunchMode,
        reply: oneshot::Sender<Result<()>>,
    },
    Submit {
        task: Task,
        args: Vec<String>,
        reply: oneshot::Sender<Result<i32>>,
    },
    Status {
        reply: oneshot::Sender<ContextStatus>,
    },
    Close {
        reply: oneshot::Sender<()>,
    },
}

/// Snapshot of the context configuration
#[derive(Debug, Clone, Serialize)]
pub struct ContextStatus {
    pub mode: LaunchMode,
    pub modules: ModuleList,
    /// Modules resident in the template
    pub loaded: Vec<String>,
    /// Fork server process, when the mode has one
    pub template_pid: Option<u32>,
    /// Workers that ran to completion
    pub runs: u64,
}

/// Cloneable async handle to the context's owner thread
#[derive(Clone)]
pub struct ContextHandle {
    tx: mpsc::Sender<Command>,
}

/// Move `context` onto its owner thread
pub fn spawn(context: ExecutionContext) -> Result<ContextHandle> {
    let (tx, rx) = mpsc::channel(QUEUE_DEPTH);
    std::thread::Builder::new()
        .name("ltest-context".to_string())
        .spawn(move || run(context, rx))?;
    Ok(ContextHandle { tx })
}

fn run(mut context: ExecutionContext, mut rx: mpsc::Receiver<Command>) {
    let mut runs: u64 = 0;

    while let Some(command) = rx.blocking_recv() {
        match command {
            Command::Reset { mode, reply } => {
                let _ = reply.send(context.reset(mode));
            }
            Command::Submit { task, args, reply } => {
                let result = context.submit(&task, &args);
                if result.is_ok() {
                    runs += 1;
                }
                let _ = reply.send(result);
            }
            Command::Status { reply } => {
                let _ = reply.send(ContextStatus {
                    mode: context.mode(),
                    modules: context.modules().clone(),
                    loaded: context.loaded(),
                    template_pid: context.template_pid(),
                    runs,
                });
            }
            Command::Close { reply } => {
                drop(context);
                tracing::debug!("Execution context closed");
                let _ = reply.send(());
                return;
            }
        }
    }

    tracing::debug!("All context handles dropped");
}

impl ContextHandle {
    async fn request<T>(&self, make: impl FnOnce(oneshot::Sender<T>) -> Command) -> Result<T> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(make(reply))
            .await
            .map_err(|_| Error::ContextClosed)?;
        rx.await.map_err(|_| Error::ContextClosed)
    }

    /// Rebuild the template with `mode`
    pub async fn reset(&self, mode: LaunchMode) -> Result<()> {
        self.request(|reply| Command::Reset { mode, reply }).await?
    }

    /// Run one worker and wait for its exit status
    pub async fn submit(&self, task: Task, args: Vec<String>) -> Result<i32> {
        self.request(|reply| Command::Submit { task, args, reply })
            .await?
    }

    pub async fn status(&self) -> Result<ContextStatus> {
        self.request(|reply| Command::Status { reply }).await
    }

    /// Tear down the template and stop the owner thread
    ///
    /// Waits for any queued commands first.
    pub async fn close(&self) -> Result<()> {
        self.request(|reply| Command::Close { reply }).await
    }
}
