//! C argument vectors built before a worker is created
//!
//! A forked child may only make async-signal-safe calls, so every
//! allocation happens here, in the parent.

use std::ffi::CString;
use std::os::raw::{c_char, c_int};
use std::path::{Path, PathBuf};

use crate::common::{Error, Result};

/// NUL-terminated `argv` array owning its strings
#[derive(Debug)]
pub struct CArgv {
    strings: Vec<CString>,
    ptrs: Vec<*const c_char>,
}

impl CArgv {
    /// Build `argv` from `argv[0]` followed by the request arguments
    pub fn new(first: impl Into<Vec<u8>>, rest: &[String]) -> Result<Self> {
        let mut strings = Vec::with_capacity(rest.len() + 1);
        strings.push(to_cstring(first.into())?);
        for arg in rest {
            strings.push(to_cstring(arg.as_bytes().to_vec())?);
        }

        let mut ptrs: Vec<*const c_char> = strings.iter().map(|s| s.as_ptr()).collect();
        ptrs.push(std::ptr::null());

        Ok(Self { strings, ptrs })
    }

    /// Build `argv` whose first element is a program path
    pub fn for_program(program: &Path, rest: &[String]) -> Result<Self> {
        #[cfg(unix)]
        let bytes = {
            use std::os::unix::ffi::OsStrExt;
            program.as_os_str().as_bytes().to_vec()
        };
        #[cfg(not(unix))]
        let bytes = program.to_string_lossy().into_owned().into_bytes();

        Self::new(bytes, rest)
    }

    pub fn argc(&self) -> c_int {
        self.strings.len() as c_int
    }

    pub fn as_ptr(&self) -> *const *const c_char {
        self.ptrs.as_ptr()
    }

    /// `argv[0]`
    pub fn program(&self) -> *const c_char {
        self.ptrs[0]
    }
}

fn to_cstring(bytes: Vec<u8>) -> Result<CString> {
    CString::new(bytes)
        .map_err(|e| Error::launch_failed(format!("argument contains a NUL byte: {e}")))
}

/// Resolve a runner program the way a shell would
pub fn resolve_program(program: &str) -> Result<PathBuf> {
    which::which(program)
        .map_err(|e| Error::launch_failed(format!("runner '{}' not found: {}", program, e)))
}
