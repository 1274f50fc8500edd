//! Loading the module list and resolving entry points

use std::os::raw::{c_char, c_int};

use libloading::{Library, Symbol};

use super::task::ModuleList;
use crate::common::{Error, Result};

/// Signature of an entry point exported by a preloaded module
pub type EntryFn = unsafe extern "C" fn(argc: c_int, argv: *const *const c_char) -> c_int;

/// Shared modules resident in the current process
///
/// Libraries stay loaded until this value is dropped, so entry points
/// resolved from it must not outlive it.
#[derive(Default)]
pub struct Preloaded {
    libraries: Vec<(String, Library)>,
}

impl Preloaded {
    /// Load what can be loaded; missing modules are logged and skipped
    pub fn load_lenient(modules: &ModuleList) -> Self {
        let mut libraries = Vec::with_capacity(modules.len());
        for name in modules.iter() {
            match open(name) {
                Ok(lib) => {
                    tracing::debug!(module = name, "Preloaded module");
                    libraries.push((name.to_string(), lib));
                }
                Err(e) => tracing::warn!("{}", e),
            }
        }
        Self { libraries }
    }

    /// Names of the modules that are actually resident
    pub fn loaded(&self) -> Vec<String> {
        self.libraries.iter().map(|(name, _)| name.clone()).collect()
    }

    /// Find `symbol` in the loaded modules, in module-list order
    pub fn entry(&self, symbol: &str) -> Result<EntryFn> {
        for (name, library) in &self.libraries {
            let found: std::result::Result<Symbol<EntryFn>, _> =
                unsafe { library.get(symbol.as_bytes()) };
            if let Ok(func) = found {
                tracing::trace!(module = %name, symbol, "Resolved entry point");
                return Ok(*func);
            }
        }
        Err(Error::EntryNotFound(symbol.to_string()))
    }
}

fn open(name: &str) -> Result<Library> {
    // Loading runs the library's initializers; the module list is trusted configuration.
    unsafe { Library::new(name) }.map_err(|e| Error::preload(name, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_failure_names_module() {
        match open("libltest-definitely-missing.so") {
            Err(Error::Preload { module, .. }) => {
                assert_eq!(module, "libltest-definitely-missing.so")
            }
            Err(e) => panic!("unexpected error: {e}"),
            Ok(_) => panic!("missing module loaded"),
        }
    }

    #[test]
    fn test_lenient_load_skips_missing() {
        let modules = ModuleList::new(["mymodule"]);
        let preloaded = Preloaded::load_lenient(&modules);
        assert!(preloaded.loaded().is_empty());
    }

    #[test]
    fn test_entry_without_modules() {
        let preloaded = Preloaded::default();
        assert!(matches!(
            preloaded.entry("run_tests"),
            Err(Error::EntryNotFound(ref s)) if s == "run_tests"
        ));
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_entry_lookup_in_system_library() {
        let modules = ModuleList::new(["libm.so.6"]);
        let preloaded = Preloaded::load_lenient(&modules);
        assert_eq!(preloaded.loaded(), vec!["libm.so.6".to_string()]);
        // Resolved only, never called: the signature does not match.
        assert!(preloaded.entry("cos").is_ok());
        assert!(preloaded.entry("ltest_no_such_symbol").is_err());
    }
}
