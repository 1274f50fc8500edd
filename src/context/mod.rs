//! Execution context - owner of the preload configuration and the current template
//!
//! The template is always derived from the current (module list, launch
//! mode) pair. A reset builds the new template before dropping the old one,
//! so a failed reset leaves the context exactly as it was.

mod handle;

use std::path::PathBuf;

use crate::common::Result;
use crate::launcher::{self, LaunchMode, ModuleList, Task, WorkerFactory};

pub use handle::{spawn, ContextHandle, ContextStatus};

/// Preload configuration plus the template built from it
pub struct ExecutionContext {
    modules: ModuleList,
    worker_exe: PathBuf,
    template: Box<dyn WorkerFactory>,
}

impl ExecutionContext {
    /// Create a context and its first template
    pub fn new(
        modules: ModuleList,
        mode: LaunchMode,
        worker_exe: impl Into<PathBuf>,
    ) -> Result<Self> {
        let worker_exe = worker_exe.into();
        let template = launcher::create_template(mode, &modules, &worker_exe)?;
        tracing::info!(%mode, %modules, "Execution context created");

        Ok(Self {
            modules,
            worker_exe,
            template,
        })
    }

    /// Rebuild the template with the stored module list and `mode`
    pub fn reset(&mut self, mode: LaunchMode) -> Result<()> {
        let template = launcher::create_template(mode, &self.modules, &self.worker_exe)?;
        let previous = std::mem::replace(&mut self.template, template);
        tracing::info!(from = %previous.mode(), to = %mode, "Execution context reset");
        drop(previous);
        Ok(())
    }

    /// Run `task(args)` in exactly one fresh worker and return its exit status
    pub fn submit(&mut self, task: &Task, args: &[String]) -> Result<i32> {
        launcher::launch_and_wait(self.template.as_mut(), task, args)
    }

    pub fn modules(&self) -> &ModuleList {
        &self.modules
    }

    pub fn mode(&self) -> LaunchMode {
        self.template.mode()
    }

    /// Modules actually resident in the current template
    pub fn loaded(&self) -> Vec<String> {
        self.template.loaded()
    }

    pub fn template_pid(&self) -> Option<u32> {
        self.template.template_pid()
    }
}
