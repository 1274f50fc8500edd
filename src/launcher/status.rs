//! Exit status encoding shared by every launch strategy
//!
//! - normal exit: the exit code, `0..=255`
//! - killed by signal `N`: `-N`
//! - never started: [`LAUNCH_FAILED_CODE`]

use std::process::ExitStatus;

/// Reported to clients when the worker could not be launched at all
pub const LAUNCH_FAILED_CODE: i32 = -255;

/// Reported when the platform gives neither an exit code nor a signal
pub const ABNORMAL_EXIT_CODE: i32 = -1;

/// Exit code of a worker whose runner program could not be exec'd
pub const EXEC_FAILED_CODE: i32 = 127;

/// Convert an observed exit status to the integer reported to clients
pub fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return -signal;
        }
    }

    ABNORMAL_EXIT_CODE
}

/// Convert a raw `waitpid` status
#[cfg(unix)]
pub fn from_wait_status(raw: libc::c_int) -> i32 {
    use std::os::unix::process::ExitStatusExt;
    exit_code(ExitStatus::from_raw(raw))
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn test_normal_exit_codes() {
        assert_eq!(from_wait_status(0), 0);
        assert_eq!(from_wait_status(3 << 8), 3);
        assert_eq!(from_wait_status(255 << 8), 255);
    }

    #[test]
    fn test_signal_is_negative() {
        assert_eq!(from_wait_status(libc::SIGKILL), -libc::SIGKILL);
        assert_eq!(from_wait_status(libc::SIGSEGV), -libc::SIGSEGV);
    }

    #[test]
    fn test_sentinels_never_look_like_success() {
        assert_ne!(LAUNCH_FAILED_CODE, 0);
        assert!(LAUNCH_FAILED_CODE < -64);
        assert_ne!(ABNORMAL_EXIT_CODE, 0);
    }
}
