//! ltest - testing server that preloads modules and forks a worker per run
//!
//! Without `--listen` the binary submits one run request to a running
//! server and logs the outcome.

use clap::Parser;
use ltest::commands::Cli;
use ltest::common::{config::Config, logging, paths};
use ltest::{cli, daemon, launcher, Result};

fn main() {
    let args = Cli::parse();

    // Template modes stay single-threaded: no async runtime before fork.
    if args.fork_server {
        logging::init_template();
        std::process::exit(run_fork_server(&args));
    }
    if let Some(symbol) = &args.worker_entry {
        logging::init_template();
        let code = launcher::spawn::run_entry_worker(&args.modules(), symbol, &args.runner_args());
        std::process::exit(code);
    }

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Error: failed to start async runtime: {e}");
            std::process::exit(1);
        }
    };

    let code = runtime.block_on(async {
        match run(args).await {
            Ok(code) => code,
            Err(e) => {
                tracing::error!("{e}");
                eprintln!("Error: {e}");
                1
            }
        }
    });

    std::process::exit(code);
}

async fn run(args: Cli) -> Result<i32> {
    if args.listen {
        if let Some(log_file) = logging::init_daemon() {
            tracing::debug!(path = %log_file.display(), "Logging to file");
        }
        let config = Config::load()?;
        let worker_exe = paths::worker_executable()?;
        daemon::run(args.daemon_settings(&config, worker_exe)).await?;
        return Ok(0);
    }

    logging::init_cli();
    let config = Config::load().unwrap_or_else(|e| {
        tracing::warn!("{e}, using defaults");
        Config::default()
    });
    let outcome = cli::dispatch(args.client_action(), &args.client_settings(&config)).await;

    // The outcome is logged either way; exiting 0 is the default contract.
    if args.propagate_exit {
        Ok(cli::exit_code(outcome))
    } else {
        Ok(0)
    }
}

#[cfg(unix)]
fn run_fork_server(args: &Cli) -> i32 {
    match launcher::forkserver::serve(&args.modules()) {
        Ok(()) => 0,
        Err(e) => {
            tracing::error!("Fork server failed: {e}");
            1
        }
    }
}

#[cfg(not(unix))]
fn run_fork_server(_args: &Cli) -> i32 {
    tracing::error!("Fork server mode is only available on Unix");
    1
}
