//! Daemon mode - the HTTP control server owning one execution context
//!
//! The daemon:
//! 1. Creates the execution context (starting the fork server if needed)
//! 2. Serves the control protocol until `POST /shutdown` or SIGINT/SIGTERM
//! 3. Lets in-flight requests finish, then tears the context down

mod error;
mod server;
mod state;

use std::path::PathBuf;
use std::sync::Arc;

use tokio::net::TcpListener;

use crate::common::{Error, Result};
use crate::context::{self, ContextHandle, ExecutionContext};
use crate::launcher::{LaunchMode, ModuleList, Task};

pub use error::ApiError;
pub use server::router;
pub use state::AppState;

/// Everything the daemon needs at startup
#[derive(Debug, Clone)]
pub struct DaemonSettings {
    pub host: String,
    pub port: u16,
    pub modules: ModuleList,
    pub method: LaunchMode,
    pub runner: Task,
    /// Binary re-executed for the fork server and clean-spawn entry workers
    pub worker_exe: PathBuf,
}

/// Run in daemon mode
pub async fn run(settings: DaemonSettings) -> Result<()> {
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        pid = std::process::id(),
        "Starting ltest daemon"
    );

    let DaemonSettings {
        host,
        port,
        modules,
        method,
        runner,
        worker_exe,
    } = settings;

    tracing::info!(%method, %modules, "Creating execution context");
    let context =
        tokio::task::spawn_blocking(move || ExecutionContext::new(modules, method, worker_exe))
            .await
            .map_err(|e| Error::Internal(format!("context creation panicked: {}", e)))??;
    let context = context::spawn(context)?;

    let listener = TcpListener::bind((host.as_str(), port)).await?;
    tracing::info!(addr = %listener.local_addr()?, "Testing server listening");

    let served = serve(listener, context.clone(), runner).await;

    tracing::info!("Closing execution context");
    if let Err(e) = context.close().await {
        tracing::warn!("Error closing execution context: {}", e);
    }

    served?;
    tracing::info!("Daemon shutdown complete");
    Ok(())
}

/// Serve the control protocol on `listener` until shutdown
pub async fn serve(listener: TcpListener, context: ContextHandle, runner: Task) -> Result<()> {
    let state = Arc::new(AppState::new(context, runner));
    let app = router(state.clone());

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(state))
        .await?;

    tracing::info!("Listener stopped");
    Ok(())
}

/// Resolves on `POST /shutdown`, SIGINT or SIGTERM
async fn shutdown_signal(state: Arc<AppState>) {
    let ctrl_c = async {
        if tokio::signal::ctrl_c().await.is_err() {
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::warn!("Could not install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = state.shutting_down() => {
            tracing::info!("Stopping listener after shutdown request");
        }
        _ = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl+C), shutting down gracefully");
            state.begin_shutdown();
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, shutting down gracefully");
            state.begin_shutdown();
        }
    }
}
