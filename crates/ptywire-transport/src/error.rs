use std::io;
use std::path::PathBuf;

/// Errors that can occur while launching or driving the helper process.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The helper executable does not exist.
    #[error("{}: command not found", path.display())]
    CommandNotFound { path: PathBuf },

    /// The helper executable exists but may not be executed.
    #[error("{}: Permission denied", path.display())]
    PermissionDenied { path: PathBuf },

    /// Any other failure to start the helper.
    #[error("Error launching pty: {0}")]
    Launch(#[source] io::Error),

    /// The signal name does not name a known signal.
    #[error("unknown signal: {0}")]
    UnknownSignal(String),

    /// The signal could not be delivered.
    #[cfg(unix)]
    #[error("failed to deliver {signal} to pid {pid}: {source}")]
    Signal {
        signal: String,
        pid: u32,
        #[source]
        source: nix::errno::Errno,
    },

    /// The spawned process was created without one of the required pipes.
    #[error("child process has no {0} pipe")]
    MissingPipe(&'static str),

    /// The process has already been reaped; it has no pid to signal.
    #[error("process has already exited")]
    Exited,

    /// An I/O error occurred on one of the process pipes.
    #[error("transport I/O error: {0}")]
    Io(#[from] io::Error),
}

impl TransportError {
    /// Translate a failed spawn into a user-facing error.
    pub fn from_spawn(path: impl Into<PathBuf>, err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => Self::CommandNotFound { path: path.into() },
            io::ErrorKind::PermissionDenied => Self::PermissionDenied { path: path.into() },
            _ => Self::Launch(err),
        }
    }

    /// True for errors raised before the helper ever ran.
    pub fn is_spawn_failure(&self) -> bool {
        matches!(
            self,
            Self::CommandNotFound { .. } | Self::PermissionDenied { .. } | Self::Launch(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, TransportError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spawn_errors_are_translated() {
        let not_found = TransportError::from_spawn(
            "/opt/pty",
            io::Error::new(io::ErrorKind::NotFound, "No such file or directory"),
        );
        assert_eq!(not_found.to_string(), "/opt/pty: command not found");
        assert!(not_found.is_spawn_failure());

        let denied = TransportError::from_spawn(
            "/opt/pty",
            io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        );
        assert_eq!(denied.to_string(), "/opt/pty: Permission denied");

        let other = TransportError::from_spawn("/opt/pty", io::Error::other("too many open files"));
        assert_eq!(other.to_string(), "Error launching pty: too many open files");
        assert!(std::error::Error::source(&other).is_some());
    }

    #[test]
    fn runtime_errors_are_not_spawn_failures() {
        assert!(!TransportError::UnknownSignal("SIGNOPE".into()).is_spawn_failure());
        assert!(!TransportError::Exited.is_spawn_failure());
    }
}
