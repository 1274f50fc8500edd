//! Copy-on-write fork of the daemon process
//!
//! The daemon runs a multi-threaded async runtime, and `fork` copies only
//! the calling thread. Exec tasks stay within async-signal-safe calls in
//! the child. Entry and inline tasks run arbitrary code there instead, and
//! any lock another daemon thread held at fork time stays locked forever
//! in the child. Entry points run in this mode must not take locks shared
//! with the daemon; `forkserver` forks from a single-threaded template and
//! has no such restriction.

use super::child::{fork_and_wait, ChildStdio, Prepared};
use super::preload::Preloaded;
use super::task::{ModuleList, Task};
use super::{LaunchMode, WorkerFactory};
use crate::common::Result;

/// Workers are forked directly from the daemon
///
/// The module list is not loaded at reset. It is loaded into the daemon the
/// first time an entry-point task needs it and shared by every later child.
pub struct ForkTemplate {
    modules: ModuleList,
    preloaded: Option<Preloaded>,
}

impl ForkTemplate {
    pub fn new(modules: ModuleList) -> Self {
        Self {
            modules,
            preloaded: None,
        }
    }
}

impl WorkerFactory for ForkTemplate {
    fn mode(&self) -> LaunchMode {
        LaunchMode::Fork
    }

    fn run_worker(&mut self, task: &Task, args: &[String]) -> Result<i32> {
        let prepared = match task {
            Task::Entry { .. } => {
                let modules = &self.modules;
                let preloaded = self
                    .preloaded
                    .get_or_insert_with(|| Preloaded::load_lenient(modules));
                Prepared::new(task, args, preloaded)?
            }
            _ => Prepared::new(task, args, &Preloaded::default())?,
        };
        fork_and_wait(&prepared, ChildStdio::Inherit)
    }

    fn loaded(&self) -> Vec<String> {
        self.preloaded
            .as_ref()
            .map(Preloaded::loaded)
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    static POLLUTED: AtomicBool = AtomicBool::new(false);

    fn pollute(_: &[String]) -> i32 {
        POLLUTED.store(true, Ordering::SeqCst);
        0
    }

    fn check_clean(_: &[String]) -> i32 {
        if POLLUTED.load(Ordering::SeqCst) {
            1
        } else {
            0
        }
    }

    #[test]
    fn test_global_state_does_not_leak_between_workers() {
        let mut template = ForkTemplate::new(ModuleList::default());
        assert_eq!(template.run_worker(&Task::Inline(pollute), &[]).unwrap(), 0);
        assert_eq!(template.run_worker(&Task::Inline(check_clean), &[]).unwrap(), 0);
        assert!(!POLLUTED.load(Ordering::SeqCst));
    }

    #[test]
    fn test_modules_are_not_loaded_for_exec() {
        let mut template = ForkTemplate::new(ModuleList::new(["mymodule"]));
        let args = vec!["-c".to_string(), "exit 0".to_string()];
        assert_eq!(template.run_worker(&Task::exec("sh"), &args).unwrap(), 0);
        assert!(template.preloaded.is_none());
        assert!(template.loaded().is_empty());
    }

    #[test]
    fn test_missing_entry_is_launch_failure() {
        let mut template = ForkTemplate::new(ModuleList::new(["mymodule"]));
        let err = template.run_worker(&Task::entry("run_tests"), &[]).unwrap_err();
        assert!(err.is_launch_failure());
    }
}
