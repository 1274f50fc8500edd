//! Worker launcher - one isolated child process per task
//!
//! A template is created from a (module list, launch mode) pair. Each
//! strategy implements [`WorkerFactory`]:
//!
//! | Mode         | Template                         | Preloads modules |
//! |--------------|----------------------------------|------------------|
//! | `fork`       | the daemon itself                | lazily, on first entry task |
//! | `forkserver` | a dedicated fork server process  | yes, before any worker |
//! | `spawn`      | none, fresh process every time   | no |
//!
//! Unix provides all three. Other platforms only provide `spawn`.

pub mod argv;
#[cfg(unix)]
pub mod child;
#[cfg(unix)]
pub mod fork;
#[cfg(unix)]
pub mod forkserver;
pub mod mode;
pub mod preload;
pub mod spawn;
pub mod status;
pub mod task;

use std::path::Path;
use std::time::Instant;

use crate::common::{Error, Result};

pub use mode::LaunchMode;
pub use status::LAUNCH_FAILED_CODE;
pub use task::{InlineFn, ModuleList, Task};

/// A process template that can produce workers
pub trait WorkerFactory: Send {
    /// Strategy this template implements
    fn mode(&self) -> LaunchMode;

    /// Create one worker running `task(args)`, wait for it, return its exit code
    fn run_worker(&mut self, task: &Task, args: &[String]) -> Result<i32>;

    /// Modules resident in the template, in load order
    fn loaded(&self) -> Vec<String> {
        Vec::new()
    }

    /// Process id of a template that runs outside the daemon
    fn template_pid(&self) -> Option<u32> {
        None
    }
}

/// Build a template for `mode` from `modules`
///
/// `worker_exe` is the binary re-executed by the fork server and by
/// clean-spawn entry workers.
pub fn create_template(
    mode: LaunchMode,
    modules: &ModuleList,
    worker_exe: &Path,
) -> Result<Box<dyn WorkerFactory>> {
    if !mode.is_supported() {
        return Err(Error::LaunchModeUnsupported(mode.to_string()));
    }

    tracing::debug!(%mode, %modules, "Creating worker template");

    match mode {
        #[cfg(unix)]
        LaunchMode::Fork => Ok(Box::new(fork::ForkTemplate::new(modules.clone()))),
        #[cfg(unix)]
        LaunchMode::ForkServer => Ok(Box::new(forkserver::ForkServerHandle::start(
            modules, worker_exe,
        )?)),
        LaunchMode::Spawn => Ok(Box::new(spawn::SpawnTemplate::new(
            modules.clone(),
            worker_exe.to_path_buf(),
        ))),
        #[allow(unreachable_patterns)]
        other => Err(Error::LaunchModeUnsupported(other.to_string())),
    }
}

/// Start one worker from `template`, wait for it, return its exit status
///
/// No retries: a worker that cannot be created is reported as
/// [`Error::LaunchFailed`] (or another launch failure), never as an exit code.
pub fn launch_and_wait(
    template: &mut dyn WorkerFactory,
    task: &Task,
    args: &[String],
) -> Result<i32> {
    let mode = template.mode();
    tracing::info!(%mode, %task, ?args, "Launching worker");

    let started = Instant::now();
    match template.run_worker(task, args) {
        Ok(code) => {
            let elapsed_ms = started.elapsed().as_millis() as u64;
            tracing::info!(%mode, code, elapsed_ms, "Worker finished");
            Ok(code)
        }
        Err(e) => {
            tracing::warn!(%mode, error = %e, "Worker launch failed");
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sh(script: &str) -> Vec<String> {
        vec!["-c".to_string(), script.to_string()]
    }

    #[test]
    fn test_spawn_template() {
        let mut template =
            create_template(LaunchMode::Spawn, &ModuleList::default(), Path::new("/bin/false"))
                .unwrap();
        assert_eq!(template.mode(), LaunchMode::Spawn);
        assert!(template.loaded().is_empty());
        assert_eq!(template.template_pid(), None);
        let code = launch_and_wait(template.as_mut(), &Task::exec("sh"), &sh("exit 3")).unwrap();
        assert_eq!(code, 3);
    }

    #[cfg(unix)]
    #[test]
    fn test_fork_template() {
        let mut template =
            create_template(LaunchMode::Fork, &ModuleList::default(), Path::new("/bin/false"))
                .unwrap();
        assert_eq!(template.mode(), LaunchMode::Fork);
        let code = launch_and_wait(template.as_mut(), &Task::exec("sh"), &sh("exit 0")).unwrap();
        assert_eq!(code, 0);
    }

    #[cfg(unix)]
    #[test]
    fn test_fork_server_with_bad_executable_fails() {
        // /bin/false exits without sending the ready message.
        let err = create_template(
            LaunchMode::ForkServer,
            &ModuleList::default(),
            Path::new("/bin/false"),
        )
        .err()
        .unwrap();
        assert!(err.is_launch_failure());
    }
}
