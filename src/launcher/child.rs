//! Forking one worker and reaping it
//!
//! Shared by the copy-on-write fork strategy (forking the daemon) and the
//! fork server (forking the preloaded template).

use std::io;
use std::os::fd::RawFd;
use std::panic::{self, AssertUnwindSafe};

use super::argv::{resolve_program, CArgv};
use super::preload::{EntryFn, Preloaded};
use super::status::{self, EXEC_FAILED_CODE};
use super::task::{InlineFn, Task};
use crate::common::{Error, Result};

/// Exit code of an inline task that panicked, same as a panicking Rust binary
const PANIC_EXIT_CODE: i32 = 101;

/// A task with everything the child needs resolved in the parent
pub enum Prepared<'a> {
    Exec { argv: CArgv },
    Entry { func: EntryFn, argv: CArgv },
    Inline { func: InlineFn, args: &'a [String] },
}

impl<'a> Prepared<'a> {
    /// Resolve `task` against the modules resident in this process
    pub fn new(task: &Task, args: &'a [String], preloaded: &Preloaded) -> Result<Self> {
        match task {
            Task::Exec { program } => {
                let path = resolve_program(program)?;
                Ok(Prepared::Exec {
                    argv: CArgv::for_program(&path, args)?,
                })
            }
            Task::Entry { symbol } => Ok(Prepared::Entry {
                func: preloaded.entry(symbol)?,
                argv: CArgv::new(symbol.as_str(), args)?,
            }),
            Task::Inline(func) => Ok(Prepared::Inline { func: *func, args }),
        }
    }
}

/// What the child does with its standard streams
#[derive(Debug, Clone, Copy)]
pub enum ChildStdio {
    Inherit,
    /// stdin from the given `/dev/null` descriptor, stdout onto stderr
    Detached { null: RawFd },
}

/// Fork one child running `prepared`, wait for it, return its exit code
pub fn fork_and_wait(prepared: &Prepared<'_>, stdio: ChildStdio) -> Result<i32> {
    let pid = unsafe { libc::fork() };
    match pid {
        -1 => Err(Error::launch_failed(format!(
            "fork failed: {}",
            io::Error::last_os_error()
        ))),
        0 => unsafe { run_child(prepared, stdio) },
        pid => {
            tracing::debug!(pid, "Worker forked");
            wait_pid(pid)
        }
    }
}

/// Child side of the fork. Never returns.
///
/// Only the exec path is async-signal-safe. Entry and inline tasks are
/// only as safe as the code they call; see the `fork` module.
unsafe fn run_child(prepared: &Prepared<'_>, stdio: ChildStdio) -> ! {
    libc::signal(libc::SIGINT, libc::SIG_DFL);
    libc::signal(libc::SIGTERM, libc::SIG_DFL);
    libc::signal(libc::SIGCHLD, libc::SIG_DFL);

    if let ChildStdio::Detached { null } = stdio {
        libc::dup2(null, libc::STDIN_FILENO);
        libc::dup2(libc::STDERR_FILENO, libc::STDOUT_FILENO);
    }

    let code = match prepared {
        Prepared::Exec { argv } => {
            libc::execv(argv.program(), argv.as_ptr());
            EXEC_FAILED_CODE
        }
        Prepared::Entry { func, argv } => (*func)(argv.argc(), argv.as_ptr()),
        Prepared::Inline { func, args } => {
            panic::catch_unwind(AssertUnwindSafe(|| (*func)(args))).unwrap_or(PANIC_EXIT_CODE)
        }
    };

    libc::fflush(std::ptr::null_mut());
    libc::_exit(code)
}

fn wait_pid(pid: libc::pid_t) -> Result<i32> {
    let mut raw_status: libc::c_int = 0;
    loop {
        let ret = unsafe { libc::waitpid(pid, &mut raw_status, 0) };
        if ret == pid {
            return Ok(status::from_wait_status(raw_status));
        }
        let err = io::Error::last_os_error();
        if err.kind() != io::ErrorKind::Interrupted {
            return Err(Error::Internal(format!("waitpid({}) failed: {}", pid, err)));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exit_seven(_: &[String]) -> i32 {
        7
    }

    fn count_args(args: &[String]) -> i32 {
        args.len() as i32
    }

    fn panics(_: &[String]) -> i32 {
        panic!("worker panicked")
    }

    fn run(task: Task, args: &[String]) -> Result<i32> {
        let preloaded = Preloaded::default();
        let prepared = Prepared::new(&task, args, &preloaded)?;
        fork_and_wait(&prepared, ChildStdio::Inherit)
    }

    #[test]
    fn test_inline_exit_code() {
        assert_eq!(run(Task::Inline(exit_seven), &[]).unwrap(), 7);
        let args = vec!["a".to_string(), "b".to_string()];
        assert_eq!(run(Task::Inline(count_args), &args).unwrap(), 2);
    }

    #[test]
    fn test_inline_panic_is_not_success() {
        assert_eq!(run(Task::Inline(panics), &[]).unwrap(), PANIC_EXIT_CODE);
    }

    #[test]
    fn test_exec_exit_code() {
        let args = vec!["-c".to_string(), "exit 3".to_string()];
        assert_eq!(run(Task::exec("sh"), &args).unwrap(), 3);
    }

    #[test]
    fn test_signal_is_reported_negative() {
        let args = vec!["-c".to_string(), "kill -9 $$".to_string()];
        assert_eq!(run(Task::exec("sh"), &args).unwrap(), -libc::SIGKILL);
    }

    #[test]
    fn test_entry_without_module_fails_before_fork() {
        let err = run(Task::entry("run_tests"), &[]).unwrap_err();
        assert!(matches!(err, Error::EntryNotFound(_)));
    }
}
