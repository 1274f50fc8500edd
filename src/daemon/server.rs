//! HTTP control protocol - routes and verb dispatch
//!
//! | Verb                     | Response                        |
//! |--------------------------|---------------------------------|
//! | `GET /ping`              | 200 `Pong.\n`                   |
//! | `POST /restart?method=`  | 200, or 400 for an unknown mode |
//! | `POST /run`              | 200 `{"code": n}`               |
//! | `POST /shutdown`         | 200, then the listener stops    |
//! | `GET /status`            | 200 context snapshot            |
//!
//! Anything else is 404. Verbs that touch the context answer 503 once
//! shutdown has begun.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{rejection::QueryRejection, Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};

use super::error::ApiError;
use super::state::AppState;
use crate::ipc::protocol::{RunRequest, RunResponse, StatusResponse};
use crate::launcher::{LaunchMode, LAUNCH_FAILED_CODE};

/// Create the router with all routes
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/ping", get(ping).fallback(not_found))
        .route("/restart", post(restart).fallback(not_found))
        .route("/run", post(run).fallback(not_found))
        .route("/shutdown", post(shutdown).fallback(not_found))
        .route("/status", get(status).fallback(not_found))
        .fallback(not_found)
        .with_state(state)
}

async fn not_found() -> StatusCode {
    StatusCode::NOT_FOUND
}

async fn ping() -> &'static str {
    "Pong.\n"
}

async fn restart(
    State(app): State<Arc<AppState>>,
    query: Result<Query<Vec<(String, String)>>, QueryRejection>,
) -> Result<StatusCode, ApiError> {
    if !app.is_running() {
        return Err(ApiError::ShuttingDown);
    }

    let Query(pairs) = query.map_err(|e| ApiError::InvalidQuery(e.body_text()))?;

    // First `method` wins; a blank value counts as omitted.
    let method = pairs
        .into_iter()
        .find(|(key, _)| key == "method")
        .map(|(_, value)| value);
    let mode = match method.as_deref() {
        None | Some("") => LaunchMode::default(),
        Some(method) => method.parse::<LaunchMode>()?,
    };

    tracing::info!(%mode, "Restarting execution context");
    app.context.reset(mode).await?;
    Ok(StatusCode::OK)
}

async fn run(State(app): State<Arc<AppState>>, body: Bytes) -> Result<Json<RunResponse>, ApiError> {
    if !app.is_running() {
        return Err(ApiError::ShuttingDown);
    }

    let request: RunRequest = if body.iter().all(u8::is_ascii_whitespace) {
        RunRequest::default()
    } else {
        serde_json::from_slice(&body).map_err(|e| ApiError::BadRequest(e.to_string()))?
    };

    tracing::info!(args = ?request.args, "Run requested");
    match app.context.submit(app.runner.clone(), request.args).await {
        Ok(code) => Ok(Json(RunResponse::exited(code))),
        Err(e) if e.is_launch_failure() => Ok(Json(RunResponse::launch_failed(
            LAUNCH_FAILED_CODE,
            e.to_string(),
        ))),
        Err(e) => Err(e.into()),
    }
}

async fn shutdown(State(app): State<Arc<AppState>>) -> Result<StatusCode, ApiError> {
    if !app.begin_shutdown() {
        return Err(ApiError::ShuttingDown);
    }
    tracing::info!("Shutdown requested");
    Ok(StatusCode::OK)
}

async fn status(State(app): State<Arc<AppState>>) -> Result<Json<StatusResponse>, ApiError> {
    let context = app.context.status().await?;
    Ok(Json(StatusResponse {
        state: app.state(),
        mode: context.mode,
        modules: context.modules,
        loaded: context.loaded,
        template_pid: context.template_pid,
        runs: context.runs,
    }))
}
