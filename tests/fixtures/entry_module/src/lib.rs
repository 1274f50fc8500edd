//! Entry points loaded by ltest's end-to-end tests
//!
//! Nothing here allocates or locks, so the entry points are also safe to
//! call in a child forked from the multi-threaded daemon.

use std::ffi::CStr;
use std::os::raw::{c_char, c_int};
use std::sync::atomic::{AtomicI32, Ordering};

/// Calls made to `count_calls` in this process
static CALLS: AtomicI32 = AtomicI32::new(0);

unsafe fn arg<'a>(argv: *const *const c_char, index: c_int) -> &'a [u8] {
    CStr::from_ptr(*argv.add(index as usize)).to_bytes()
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|window| window == needle)
}

/// Behaves like `pytest -k <selection>`
///
/// Exits 1 when an argument selects `test_fail`, 3 for `test_exit3` and 0
/// otherwise. Exits 2 if `argv[0]` is not the entry point's own name.
#[no_mangle]
pub unsafe extern "C" fn run_suite(argc: c_int, argv: *const *const c_char) -> c_int {
    if argc < 1 || arg(argv, 0) != b"run_suite" {
        return 2;
    }

    for index in 1..argc {
        let value = arg(argv, index);
        if contains(value, b"test_fail") {
            return 1;
        }
        if contains(value, b"test_exit3") {
            return 3;
        }
    }
    0
}

/// Returns how many earlier calls this process has seen
///
/// Every worker starting from a clean template returns 0.
#[no_mangle]
pub extern "C" fn count_calls(_argc: c_int, _argv: *const *const c_char) -> c_int {
    CALLS.fetch_add(1, Ordering::SeqCst)
}
