//! What a worker runs, and what the template preloads

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::common::{Error, Result};
use crate::ipc::protocol::WireTask;

/// Function linked into the current binary, runnable only in a forked child
pub type InlineFn = fn(&[String]) -> i32;

/// Work executed by exactly one worker process
#[derive(Clone)]
pub enum Task {
    /// Replace the worker image with an external runner program
    Exec { program: String },
    /// Call a C-ABI `(argc, argv) -> int` entry point exported by a preloaded module
    Entry { symbol: String },
    /// Call a function of this binary in a copy-on-write child
    Inline(InlineFn),
}

impl Task {
    pub fn exec(program: impl Into<String>) -> Self {
        Task::Exec {
            program: program.into(),
        }
    }

    pub fn entry(symbol: impl Into<String>) -> Self {
        Task::Entry {
            symbol: symbol.into(),
        }
    }

    /// Form sent to the fork server
    ///
    /// Inline functions cannot cross a process boundary.
    pub fn to_wire(&self) -> Result<WireTask> {
        match self {
            Task::Exec { program } => Ok(WireTask::Exec {
                program: program.clone(),
            }),
            Task::Entry { symbol } => Ok(WireTask::Entry {
                symbol: symbol.clone(),
            }),
            Task::Inline(_) => Err(Error::launch_failed(
                "inline tasks can only run in 'fork' mode",
            )),
        }
    }
}

impl From<WireTask> for Task {
    fn from(task: WireTask) -> Self {
        match task {
            WireTask::Exec { program } => Task::Exec { program },
            WireTask::Entry { symbol } => Task::Entry { symbol },
        }
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Task::Exec { program } => f.debug_struct("Exec").field("program", program).finish(),
            Task::Entry { symbol } => f.debug_struct("Entry").field("symbol", symbol).finish(),
            Task::Inline(func) => f
                .debug_tuple("Inline")
                .field(&(*func as *const ()))
                .finish(),
        }
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Task::Exec { program } => write!(f, "exec {}", program),
            Task::Entry { symbol } => write!(f, "entry {}", symbol),
            Task::Inline(_) => f.write_str("inline function"),
        }
    }
}

/// Ordered list of shared modules loaded into the template before any worker
///
/// Fixed for the lifetime of an execution context; resets reuse it as is.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModuleList(Vec<String>);

impl ModuleList {
    pub fn new(names: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self(names.into_iter().map(Into::into).collect())
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for ModuleList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop(_: &[String]) -> i32 {
        0
    }

    #[test]
    fn test_module_list_keeps_order() {
        let modules = ModuleList::new(["libb.so", "liba.so", "libb.so"]);
        assert_eq!(modules.len(), 3);
        assert_eq!(
            modules.iter().collect::<Vec<_>>(),
            vec!["libb.so", "liba.so", "libb.so"]
        );
        assert_eq!(modules.to_string(), "libb.so, liba.so, libb.so");
    }

    #[test]
    fn test_module_list_serializes_as_array() {
        let modules = ModuleList::new(["mymodule"]);
        assert_eq!(serde_json::to_string(&modules).unwrap(), r#"["mymodule"]"#);
    }

    #[test]
    fn test_inline_task_has_no_wire_form() {
        let err = Task::Inline(noop).to_wire().unwrap_err();
        assert!(err.is_launch_failure());
    }

    #[test]
    fn test_wire_conversion_keeps_target() {
        let task: Task = Task::exec("pytest").to_wire().unwrap().into();
        assert!(matches!(task, Task::Exec { ref program } if program == "pytest"));

        let task: Task = Task::entry("run_tests").to_wire().unwrap().into();
        assert!(matches!(task, Task::Entry { ref symbol } if symbol == "run_tests"));
    }
}
