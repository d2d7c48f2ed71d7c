use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use futures_core::Stream;
use futures_util::StreamExt;
use ptywire_transport::ProcessControl;
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, RwLock, RwLockReadGuard};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::{Result, SessionError};
use crate::event::{EventSink, SessionEvent, STDIN_STREAM};

/// A process-directed action requested by a control source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ControlCommand {
    /// Deliver a signal, by name, to the helper.
    Signal { signal: String },
    /// Write a chunk to a named input stream. Only `stdin` exists.
    StreamData { stream: String, chunk: Bytes },
}

impl ControlCommand {
    /// Signal command for `name`.
    pub fn signal(name: impl Into<String>) -> Self {
        Self::Signal {
            signal: name.into(),
        }
    }

    /// Input command for the `stdin` stream.
    pub fn stdin(chunk: impl Into<Bytes>) -> Self {
        Self::StreamData {
            stream: STDIN_STREAM.to_string(),
            chunk: chunk.into(),
        }
    }
}

/// Shared "session still running" flag. Cleared once, when the output
/// sequence terminates.
///
/// Adapters hold the gate's read side while applying a command, so
/// [`Liveness::quiesce`] returns only after every in-flight effect has been
/// queued.
#[derive(Debug, Clone)]
pub(crate) struct Liveness(Arc<LivenessState>);

#[derive(Debug)]
struct LivenessState {
    live: AtomicBool,
    gate: RwLock<()>,
}

impl Liveness {
    pub(crate) fn new() -> Self {
        Self(Arc::new(LivenessState {
            live: AtomicBool::new(true),
            gate: RwLock::new(()),
        }))
    }

    pub(crate) fn is_live(&self) -> bool {
        self.0.live.load(Ordering::Acquire)
    }

    /// Clear the flag without waiting for in-flight commands.
    pub(crate) fn terminate(&self) {
        self.0.live.store(false, Ordering::Release);
    }

    /// Wait for in-flight commands, then clear the flag.
    pub(crate) async fn quiesce(&self) {
        let _gate = self.0.gate.write().await;
        self.terminate();
    }

    /// Enter the gate, or `None` once the session has terminated.
    async fn enter(&self) -> Option<RwLockReadGuard<'_, ()>> {
        let guard = self.0.gate.read().await;
        self.is_live().then_some(guard)
    }
}

/// Everything a [`ControlHandle`] needs, owned by the multiplexer so it can
/// mint a handle whenever the helper announces readiness.
#[derive(Clone)]
pub(crate) struct ControlContext {
    process: Arc<dyn ProcessControl>,
    effects: EventSink,
    live: Liveness,
}

impl ControlContext {
    pub(crate) fn new(process: Arc<dyn ProcessControl>, effects: EventSink, live: Liveness) -> Self {
        Self {
            process,
            effects,
            live,
        }
    }
}

impl fmt::Debug for ControlContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ControlContext")
            .field("live", &self.live.is_live())
            .finish_non_exhaustive()
    }
}

/// Capability to steer the running child, delivered with
/// [`SessionEvent::Ready`].
///
/// Each handle owns one adapter task that applies commands strictly in
/// arrival order. Effects (`ProcessSignaled`, stdin echoes, control errors)
/// show up on the session's event stream. Once the session has terminated
/// the handle is inert: attaching fails with [`SessionError::Inert`] and
/// queued commands are dropped.
#[derive(Clone)]
pub struct ControlHandle {
    inner: Arc<Inner>,
}

struct Inner {
    commands: mpsc::UnboundedSender<ControlCommand>,
    live: Liveness,
    runtime: tokio::runtime::Handle,
}

impl ControlHandle {
    /// Must be called from within a tokio runtime.
    pub(crate) fn new(context: &ControlContext) -> Self {
        let runtime = tokio::runtime::Handle::current();
        let (commands, rx) = mpsc::unbounded_channel();
        runtime.spawn(run_adapter(
            rx,
            Arc::clone(&context.process),
            context.effects.clone(),
            context.live.clone(),
        ));
        Self {
            inner: Arc::new(Inner {
                commands,
                live: context.live.clone(),
                runtime,
            }),
        }
    }

    /// False once the session's output sequence has terminated.
    pub fn is_live(&self) -> bool {
        self.inner.live.is_live()
    }

    /// Forward every command of `source` to the adapter.
    pub fn attach_control_stream<S, E>(&self, source: S) -> Result<JoinHandle<()>>
    where
        S: Stream<Item = std::result::Result<ControlCommand, E>> + Send + 'static,
        E: fmt::Display + Send + 'static,
    {
        self.attach("control", source, |command| command)
    }

    /// Forward every signal name of `source` as a signal command.
    pub fn attach_signal_stream<S, T, E>(&self, source: S) -> Result<JoinHandle<()>>
    where
        S: Stream<Item = std::result::Result<T, E>> + Send + 'static,
        T: Into<String> + Send + 'static,
        E: fmt::Display + Send + 'static,
    {
        self.attach("signal", source, |name: T| ControlCommand::Signal {
            signal: name.into(),
        })
    }

    /// Forward every chunk of `source` as input for the stream `name`.
    ///
    /// Only `stdin` is accepted downstream; any other name produces one
    /// [`SessionError::UnknownChannel`] event per chunk.
    pub fn attach_named_input_stream<S, T, E>(
        &self,
        name: impl Into<String>,
        source: S,
    ) -> Result<JoinHandle<()>>
    where
        S: Stream<Item = std::result::Result<T, E>> + Send + 'static,
        T: Into<Bytes> + Send + 'static,
        E: fmt::Display + Send + 'static,
    {
        let stream = name.into();
        self.attach("input", source, move |chunk: T| ControlCommand::StreamData {
            stream: stream.clone(),
            chunk: chunk.into(),
        })
    }

    /// Queue a single command.
    pub fn send(&self, command: ControlCommand) -> Result<()> {
        if !self.is_live() {
            return Err(SessionError::Inert);
        }
        self.inner
            .commands
            .send(command)
            .map_err(|_| SessionError::Inert)
    }

    /// Queue a signal by name.
    pub fn signal(&self, name: impl Into<String>) -> Result<()> {
        self.send(ControlCommand::signal(name))
    }

    /// Queue a chunk for the child's stdin.
    pub fn write_stdin(&self, chunk: impl Into<Bytes>) -> Result<()> {
        self.send(ControlCommand::stdin(chunk))
    }

    fn attach<S, T, E, F>(&self, label: &'static str, source: S, wrap: F) -> Result<JoinHandle<()>>
    where
        S: Stream<Item = std::result::Result<T, E>> + Send + 'static,
        T: Send + 'static,
        E: fmt::Display + Send + 'static,
        F: FnMut(T) -> ControlCommand + Send + 'static,
    {
        if !self.is_live() {
            return Err(SessionError::Inert);
        }
        debug!(source = label, "control source attached");
        Ok(self.inner.runtime.spawn(forward(
            label,
            source,
            self.inner.commands.clone(),
            self.inner.live.clone(),
            wrap,
        )))
    }
}

impl fmt::Debug for ControlHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ControlHandle")
            .field("live", &self.is_live())
            .finish_non_exhaustive()
    }
}

async fn forward<S, T, E, F>(
    label: &'static str,
    source: S,
    commands: mpsc::UnboundedSender<ControlCommand>,
    live: Liveness,
    mut wrap: F,
) where
    S: Stream<Item = std::result::Result<T, E>> + Send + 'static,
    E: fmt::Display,
    F: FnMut(T) -> ControlCommand,
{
    let mut source = Box::pin(source);
    loop {
        match source.next().await {
            Some(Ok(item)) => {
                if !live.is_live() || commands.send(wrap(item)).is_err() {
                    debug!(source = label, "session ended; detaching control source");
                    return;
                }
            }
            Some(Err(err)) => {
                warn!(source = label, error = %err, "control source failed; detaching");
                return;
            }
            None => {
                debug!(source = label, "control source ended");
                return;
            }
        }
    }
}

async fn run_adapter(
    mut commands: mpsc::UnboundedReceiver<ControlCommand>,
    process: Arc<dyn ProcessControl>,
    effects: EventSink,
    live: Liveness,
) {
    while let Some(command) = commands.recv().await {
        let Some(_gate) = live.enter().await else {
            debug!("session ended; dropping control commands");
            return;
        };
        let event = apply(process.as_ref(), command).await;
        if !effects.emit(event) {
            return;
        }
    }
}

async fn apply(process: &dyn ProcessControl, command: ControlCommand) -> SessionEvent {
    match command {
        ControlCommand::Signal { signal } => {
            if let Err(err) = process.signal(&signal) {
                warn!(%signal, error = %err, "signal delivery failed");
            }
            SessionEvent::ProcessSignaled { signal }
        }
        ControlCommand::StreamData { stream, chunk } if stream == STDIN_STREAM => {
            match process.write_input(&chunk).await {
                Ok(()) => SessionEvent::StreamData { stream, chunk },
                Err(source) => {
                    warn!(error = %source, "write to helper input failed");
                    SessionEvent::Error(SessionError::ControlWrite { stream, source })
                }
            }
        }
        ControlCommand::StreamData { stream, .. } => {
            SessionEvent::Error(SessionError::UnknownChannel(stream))
        }
    }
}
