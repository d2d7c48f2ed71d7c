use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use tokio::sync::mpsc;

use crate::control::ControlHandle;
use crate::error::SessionError;

/// Stream name for the child's stdout.
pub const STDOUT_STREAM: &str = "stdout";
/// Stream name for the child's stderr.
pub const STDERR_STREAM: &str = "stderr";
/// Stream name for bytes written to the child's stdin.
pub const STDIN_STREAM: &str = "stdin";

/// One item of a session's output sequence.
///
/// The end of the sequence is the end of the [`EventStream`].
#[derive(Debug)]
pub enum SessionEvent {
    /// Pid of the child running under the pty.
    Pid(u64),
    /// Exit code reported by the helper for the child.
    ExitCode(u64),
    /// Terminating signal number reported by the helper for the child.
    Signal(u64),
    /// A chunk of one of the named byte streams.
    StreamData { stream: String, chunk: Bytes },
    /// The child is running; control is now possible.
    Ready(ControlHandle),
    /// A signal was handed to the helper on behalf of a control source.
    ProcessSignaled { signal: String },
    /// Terminal or non-terminal failure. See [`SessionError::is_terminal`].
    Error(SessionError),
}

impl SessionEvent {
    /// Short label for logs and output.
    pub fn kind(&self) -> &'static str {
        match self {
            SessionEvent::Pid(_) => "pid",
            SessionEvent::ExitCode(_) => "exit-code",
            SessionEvent::Signal(_) => "signal",
            SessionEvent::StreamData { .. } => "stream-data",
            SessionEvent::Ready(_) => "ready",
            SessionEvent::ProcessSignaled { .. } => "process-signaled",
            SessionEvent::Error(_) => "error",
        }
    }

    /// True for an error that ends the stream.
    pub fn is_terminal_error(&self) -> bool {
        matches!(self, SessionEvent::Error(err) if err.is_terminal())
    }
}

/// Receiving end of a session's output sequence.
///
/// Exactly one reader consumes the events. `None` from [`EventStream::next`]
/// is the completion marker.
#[derive(Debug)]
pub struct EventStream {
    rx: mpsc::UnboundedReceiver<SessionEvent>,
}

impl EventStream {
    pub(crate) fn new(rx: mpsc::UnboundedReceiver<SessionEvent>) -> Self {
        Self { rx }
    }

    /// Wait for the next event; `None` once the session has completed.
    pub async fn next(&mut self) -> Option<SessionEvent> {
        self.rx.recv().await
    }

    /// Read the whole sequence until completion.
    pub async fn collect_events(mut self) -> Vec<SessionEvent> {
        let mut events = Vec::new();
        while let Some(event) = self.next().await {
            events.push(event);
        }
        events
    }
}

impl futures_core::Stream for EventStream {
    type Item = SessionEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

/// Sending end used by the supervisor and the control adapters.
#[derive(Debug, Clone)]
pub(crate) struct EventSink {
    tx: mpsc::UnboundedSender<SessionEvent>,
}

impl EventSink {
    pub(crate) fn channel() -> (Self, mpsc::UnboundedReceiver<SessionEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Push an event. Returns false once the receiving side is gone.
    pub(crate) fn emit(&self, event: SessionEvent) -> bool {
        tracing::trace!(kind = event.kind(), "event");
        self.tx.send(event).is_ok()
    }
}
