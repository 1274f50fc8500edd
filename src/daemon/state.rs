//! Shared state of the control server

use tokio::sync::watch;

use crate::context::ContextHandle;
use crate::ipc::protocol::ServerState;
use crate::launcher::Task;

/// State shared by every request handler
pub struct AppState {
    /// The single execution context, reached through its owner thread
    pub context: ContextHandle,
    /// Task run for every `POST /run`
    pub runner: Task,
    state: watch::Sender<ServerState>,
}

impl AppState {
    pub fn new(context: ContextHandle, runner: Task) -> Self {
        let (state, _) = watch::channel(ServerState::Running);
        Self {
            context,
            runner,
            state,
        }
    }

    pub fn state(&self) -> ServerState {
        *self.state.borrow()
    }

    pub fn is_running(&self) -> bool {
        self.state() == ServerState::Running
    }

    /// Move to `ShuttingDown`; returns false if that already happened
    pub fn begin_shutdown(&self) -> bool {
        self.state.send_if_modified(|state| {
            if *state == ServerState::Running {
                *state = ServerState::ShuttingDown;
                true
            } else {
                false
            }
        })
    }

    /// Resolves once the server has left `Running`
    pub async fn shutting_down(&self) {
        let mut rx = self.state.subscribe();
        let _ = rx.wait_for(|state| *state == ServerState::ShuttingDown).await;
    }
}
