use std::ffi::OsString;
use std::io;
use std::path::PathBuf;
use std::process::Stdio;

use tokio::io::AsyncWriteExt;
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::error::{Result, TransportError};
use crate::signal::send_signal;
use crate::traits::{InputFuture, ProcessControl};

/// How to launch the pty helper.
#[derive(Debug, Clone, Default)]
pub struct SpawnConfig {
    /// Path of the helper executable.
    pub helper: PathBuf,
    /// Arguments passed to the helper (the command it should run under a pty).
    pub args: Vec<OsString>,
    /// Working directory for the helper.
    pub cwd: Option<PathBuf>,
    /// Extra environment variables.
    pub env: Vec<(OsString, OsString)>,
    /// Let the helper write its own diagnostics to our stderr.
    pub inherit_stderr: bool,
}

impl SpawnConfig {
    /// Launch `helper` with no arguments.
    pub fn new(helper: impl Into<PathBuf>) -> Self {
        Self {
            helper: helper.into(),
            ..Self::default()
        }
    }

    /// Append one argument.
    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append several arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Set the working directory.
    pub fn cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    /// Add an environment variable.
    pub fn env(mut self, key: impl Into<OsString>, value: impl Into<OsString>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }
}

/// A running helper, split into the pieces the session layer consumes.
#[derive(Debug)]
pub struct PtyProcess {
    /// The helper's framed output stream.
    pub output: ChildStdout,
    /// Signal and input capability.
    pub control: ChildControl,
    /// The child itself, for exit notification.
    pub child: Child,
}

/// Launch the helper described by `config`.
///
/// The child is killed if the returned [`Child`] is dropped before it exits.
pub fn spawn(config: &SpawnConfig) -> Result<PtyProcess> {
    let mut command = Command::new(&config.helper);
    command
        .args(&config.args)
        .envs(config.env.iter().map(|(k, v)| (k, v)))
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(if config.inherit_stderr {
            Stdio::inherit()
        } else {
            Stdio::null()
        })
        .kill_on_drop(true);
    if let Some(cwd) = &config.cwd {
        command.current_dir(cwd);
    }

    let mut child = command
        .spawn()
        .map_err(|err| TransportError::from_spawn(&config.helper, err))?;

    let output = child.stdout.take().ok_or(TransportError::MissingPipe("stdout"))?;
    let stdin = child.stdin.take().ok_or(TransportError::MissingPipe("stdin"))?;
    let pid = child.id().ok_or(TransportError::Exited)?;

    info!(helper = %config.helper.display(), pid, "pty helper started");

    Ok(PtyProcess {
        output,
        control: ChildControl::new(pid, stdin),
        child,
    })
}

/// [`ProcessControl`] for a helper launched by [`spawn`].
#[derive(Debug)]
pub struct ChildControl {
    pid: u32,
    stdin: Mutex<Option<ChildStdin>>,
}

impl ChildControl {
    fn new(pid: u32, stdin: ChildStdin) -> Self {
        Self {
            pid,
            stdin: Mutex::new(Some(stdin)),
        }
    }

    /// Process id of the helper.
    pub fn pid(&self) -> u32 {
        self.pid
    }

    /// Close the helper's input sink. Later writes fail with `BrokenPipe`.
    pub async fn close_input(&self) {
        if self.stdin.lock().await.take().is_some() {
            debug!(pid = self.pid, "closed helper stdin");
        }
    }
}

impl ProcessControl for ChildControl {
    fn signal(&self, name: &str) -> Result<()> {
        send_signal(self.pid, name)
    }

    fn write_input<'a>(&'a self, chunk: &'a [u8]) -> InputFuture<'a> {
        Box::pin(async move {
            let mut guard = self.stdin.lock().await;
            let stdin = guard
                .as_mut()
                .ok_or_else(|| io::Error::new(io::ErrorKind::BrokenPipe, "stdin is closed"))?;
            stdin.write_all(chunk).await?;
            stdin.flush().await
        })
    }
}
