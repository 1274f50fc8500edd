//! Clean spawn: a fresh process per worker, nothing inherited from the daemon

use std::path::PathBuf;
use std::process::Command;

use super::argv::{resolve_program, CArgv};
use super::preload::Preloaded;
use super::status::{self, EXEC_FAILED_CODE};
use super::task::{ModuleList, Task};
use super::{LaunchMode, WorkerFactory};
use crate::common::{Error, Result};

/// Hidden flag selecting entry-point worker mode
pub const WORKER_ENTRY_FLAG: &str = "--worker-entry";

/// Every worker is a new process
///
/// Exec tasks start the runner directly. Entry tasks start this binary in
/// hidden worker mode, which loads the modules itself, so nothing is
/// preloaded and every run pays the full load cost.
pub struct SpawnTemplate {
    modules: ModuleList,
    worker_exe: PathBuf,
}

impl SpawnTemplate {
    pub fn new(modules: ModuleList, worker_exe: PathBuf) -> Self {
        Self { modules, worker_exe }
    }

    fn command(&self, task: &Task, args: &[String]) -> Result<Command> {
        match task {
            Task::Exec { program } => {
                let mut command = Command::new(resolve_program(program)?);
                command.args(args);
                Ok(command)
            }
            Task::Entry { symbol } => {
                let mut command = Command::new(&self.worker_exe);
                command.arg(WORKER_ENTRY_FLAG).arg(symbol);
                for module in self.modules.iter() {
                    command.arg("--module-name").arg(module);
                }
                command.arg("--").args(args);
                Ok(command)
            }
            Task::Inline(_) => Err(Error::launch_failed(
                "inline tasks can only run in 'fork' mode",
            )),
        }
    }
}

impl WorkerFactory for SpawnTemplate {
    fn mode(&self) -> LaunchMode {
        LaunchMode::Spawn
    }

    fn run_worker(&mut self, task: &Task, args: &[String]) -> Result<i32> {
        let status = self
            .command(task, args)?
            .status()
            .map_err(|e| Error::launch_failed(format!("spawn failed: {}", e)))?;
        Ok(status::exit_code(status))
    }
}

/// Body of the hidden entry-point worker mode
///
/// Returns the process exit code.
pub fn run_entry_worker(modules: &ModuleList, symbol: &str, args: &[String]) -> i32 {
    let preloaded = Preloaded::load_lenient(modules);
    let resolved = preloaded
        .entry(symbol)
        .and_then(|func| CArgv::new(symbol, args).map(|argv| (func, argv)));

    match resolved {
        Ok((func, argv)) => unsafe { func(argv.argc(), argv.as_ptr()) },
        Err(e) => {
            tracing::error!("{}", e);
            EXEC_FAILED_CODE
        }
    }
}
