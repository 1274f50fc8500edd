//! ltest - a testing server that preloads heavy modules once
//!
//! The daemon owns one execution context: a process template built from a
//! module list and a launch mode. Every `run` request forks (or spawns) a
//! fresh worker from that template, waits for it and reports its exit code.

pub mod cli;
pub mod commands;
pub mod common;
pub mod context;
pub mod daemon;
pub mod ipc;
pub mod launcher;

pub use common::{Error, Result};
pub use context::{ContextHandle, ExecutionContext};
pub use launcher::{LaunchMode, ModuleList, Task, WorkerFactory, LAUNCH_FAILED_CODE};
