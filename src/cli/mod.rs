//! One-shot client mode
//!
//! Sends a single request and logs the outcome. Failures never escape as
//! errors; the caller gets an outcome code it may or may not propagate.

mod client;

pub use client::ControlClient;

use crate::commands::{ClientAction, ClientSettings};

/// Dispatch one client action; returns the outcome (0 on success)
pub async fn dispatch(action: ClientAction, settings: &ClientSettings) -> i32 {
    let client = match ControlClient::new(&settings.host, settings.port, settings.timeout) {
        Ok(client) => client,
        Err(e) => {
            tracing::error!("{}", e);
            return 1;
        }
    };

    match action {
        ClientAction::Run(args) => run(&client, settings, args).await,

        ClientAction::Ping => match client.ping().await {
            Ok(body) => {
                print!("{}", body);
                0
            }
            Err(e) => failed(e),
        },

        ClientAction::Restart(method) => match client.restart(method.as_deref()).await {
            Ok(()) => {
                let method = method.as_deref().unwrap_or("forkserver");
                tracing::info!(method, "Testing server restarted");
                0
            }
            Err(e) => failed(e),
        },

        ClientAction::Shutdown => match client.shutdown().await {
            Ok(()) => {
                tracing::info!("Testing server is shutting down");
                0
            }
            Err(e) => failed(e),
        },

        ClientAction::Status => match client.status().await {
            Ok(status) => match serde_json::to_string_pretty(&status) {
                Ok(json) => {
                    println!("{}", json);
                    0
                }
                Err(e) => failed(e.into()),
            },
            Err(e) => failed(e),
        },
    }
}

async fn run(client: &ControlClient, settings: &ClientSettings, args: Vec<String>) -> i32 {
    tracing::info!(
        "submit testing request to {}:{}",
        settings.host,
        settings.port
    );

    match client.run(args).await {
        Ok(response) if response.passed() => {
            tracing::info!("testing was successfully completed");
            0
        }
        Ok(response) => {
            let code = response.code.unwrap_or(1);
            if let Some(error) = &response.error {
                tracing::error!("worker could not be launched: {}", error);
            }
            tracing::info!(code, "testing was failed with exit code {}", code);
            code
        }
        Err(e) => failed(e),
    }
}

fn failed(e: crate::Error) -> i32 {
    tracing::error!("{}", e);
    1
}

/// Process exit code for a propagated outcome
///
/// Signals and sentinels are negative; anything outside `1..=255` becomes 1.
pub fn exit_code(outcome: i32) -> i32 {
    match outcome {
        0 => 0,
        1..=255 => outcome,
        _ => 1,
    }
}
