use std::fmt;
use std::future::Future;
use std::io;
use std::pin::Pin;

use crate::error::Result;

/// Future returned by [`ProcessControl::write_input`].
pub type InputFuture<'a> = Pin<Box<dyn Future<Output = io::Result<()>> + Send + 'a>>;

/// The process-directed actions available once the helper is running.
///
/// Implemented by [`crate::ChildControl`] for a real helper and by fakes in
/// tests.
pub trait ProcessControl: Send + Sync + 'static {
    /// Deliver the named signal (e.g. `"SIGTERM"`) to the helper.
    fn signal(&self, name: &str) -> Result<()>;

    /// Write a chunk to the helper's input sink.
    fn write_input<'a>(&'a self, chunk: &'a [u8]) -> InputFuture<'a>;
}

/// How the helper process ended, as reported by the OS.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessExit {
    /// Exit code, if the process exited normally.
    pub code: Option<i32>,
    /// Terminating signal number, if the process was killed by a signal.
    pub signal: Option<i32>,
}

impl ProcessExit {
    /// A normal exit with the given code.
    pub fn code(code: i32) -> Self {
        Self {
            code: Some(code),
            signal: None,
        }
    }

    /// Termination by the given signal.
    pub fn signaled(signal: i32) -> Self {
        Self {
            code: None,
            signal: Some(signal),
        }
    }

    /// True for a nonzero exit code or a terminating signal.
    pub fn is_abnormal(&self) -> bool {
        self.code.is_some_and(|code| code != 0) || self.signal.is_some()
    }
}

impl From<std::process::ExitStatus> for ProcessExit {
    fn from(status: std::process::ExitStatus) -> Self {
        #[cfg(unix)]
        let signal = std::os::unix::process::ExitStatusExt::signal(&status);
        #[cfg(not(unix))]
        let signal = None;

        Self {
            code: status.code(),
            signal,
        }
    }
}

impl fmt::Display for ProcessExit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.code, self.signal) {
            (_, Some(signal)) => write!(f, "signal {signal}"),
            (Some(code), None) => write!(f, "exit code {code}"),
            (None, None) => write!(f, "unknown status"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn abnormal_exit_classification() {
        assert!(!ProcessExit::code(0).is_abnormal());
        assert!(ProcessExit::code(1).is_abnormal());
        assert!(ProcessExit::code(120).is_abnormal());
        assert!(ProcessExit::signaled(15).is_abnormal());
        assert!(!ProcessExit {
            code: None,
            signal: None
        }
        .is_abnormal());
    }

    #[test]
    fn display() {
        assert_eq!(ProcessExit::code(3).to_string(), "exit code 3");
        assert_eq!(ProcessExit::signaled(9).to_string(), "signal 9");
    }

    #[test]
    #[cfg(unix)]
    fn from_exit_status() {
        use std::os::unix::process::ExitStatusExt;

        let exited = ProcessExit::from(std::process::ExitStatus::from_raw(2 << 8));
        assert_eq!(exited, ProcessExit::code(2));

        let killed = ProcessExit::from(std::process::ExitStatus::from_raw(15));
        assert_eq!(killed, ProcessExit::signaled(15));
    }
}
