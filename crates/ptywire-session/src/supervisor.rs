use std::future::Future;
use std::io;
use std::sync::Arc;

use ptywire_frame::{Frame, FrameDecoder, FrameError};
use ptywire_transport::{ProcessControl, ProcessExit};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::config::SessionOptions;
use crate::control::{ControlContext, Liveness};
use crate::error::SessionError;
use crate::event::{EventSink, EventStream, SessionEvent};
use crate::multiplex::EventMultiplexer;

/// Launch the helper and supervise it.
///
/// Must be called from within a tokio runtime. A launch failure is reported
/// as the only event of the returned stream.
#[cfg(unix)]
pub fn spawn(config: crate::config::SessionConfig) -> EventStream {
    let (sink, rx) = EventSink::channel();
    match ptywire_transport::spawn(&config.spawn) {
        Ok(ptywire_transport::PtyProcess {
            output,
            control,
            mut child,
        }) => {
            let exit = async move { child.wait().await.map(ProcessExit::from) };
            tokio::spawn(run(output, exit, Arc::new(control), config.options, sink));
        }
        Err(err) => {
            warn!(helper = %config.spawn.helper.display(), error = %err, "failed to launch pty helper");
            sink.emit(SessionEvent::Error(SessionError::Spawn(err)));
        }
    }
    EventStream::new(rx)
}

/// Supervise an already running helper.
///
/// `output` is the helper's framed output, `exit` resolves once the helper
/// has exited, and `process` carries signals and input back to it.
pub fn supervise<R, X>(
    output: R,
    exit: X,
    process: Arc<dyn ProcessControl>,
    options: SessionOptions,
) -> EventStream
where
    R: AsyncRead + Unpin + Send + 'static,
    X: Future<Output = io::Result<ProcessExit>> + Send + 'static,
{
    let (sink, rx) = EventSink::channel();
    tokio::spawn(run(output, exit, process, options, sink));
    EventStream::new(rx)
}

async fn run<R, X>(
    mut output: R,
    exit: X,
    process: Arc<dyn ProcessControl>,
    options: SessionOptions,
    sink: EventSink,
) where
    R: AsyncRead + Unpin,
    X: Future<Output = io::Result<ProcessExit>>,
{
    let live = Liveness::new();
    let (effects, mut effects_rx) = EventSink::channel();
    let mux = EventMultiplexer::new(
        options.stream_names,
        ControlContext::new(process, effects, live.clone()),
    );
    let mut decoder = FrameDecoder::with_config(options.frame);
    let mut buf = vec![0u8; options.read_chunk_size.max(1)];
    let mut frames = Vec::new();

    tokio::pin!(exit);
    let mut output_open = true;

    let status = loop {
        tokio::select! {
            read = output.read(&mut buf), if output_open => {
                match ingest(read, &buf, &mut decoder, &mut frames, &mux, &sink) {
                    Ingest::Open => {}
                    Ingest::Closed => {
                        output_open = false;
                        drain(&mut effects_rx, &sink);
                        flush(&mut decoder, &sink);
                    }
                    Ingest::Malformed(err) => {
                        live.terminate();
                        drain(&mut effects_rx, &sink);
                        sink.emit(SessionEvent::Error(err.into()));
                        return;
                    }
                }
            }
            exited = &mut exit => break exited,
            Some(event) = effects_rx.recv() => {
                sink.emit(event);
            }
        }
    };

    debug!("pty helper exited");
    // The pid may be reused from here on; no more signals.
    live.quiesce().await;

    // Frames written just before exit can still be in the pipe.
    if output_open {
        let settle = async {
            loop {
                let read = output.read(&mut buf).await;
                match ingest(read, &buf, &mut decoder, &mut frames, &mux, &sink) {
                    Ingest::Open => {}
                    Ingest::Closed => return None,
                    Ingest::Malformed(err) => return Some(err),
                }
            }
        };
        match timeout(options.exit_grace, settle).await {
            Ok(Some(err)) => {
                drain(&mut effects_rx, &sink);
                sink.emit(SessionEvent::Error(err.into()));
                return;
            }
            Ok(None) => {}
            Err(_) => debug!(grace = ?options.exit_grace, "pty output still open after exit"),
        }
    }

    drain(&mut effects_rx, &sink);

    match status {
        Ok(exit) if exit.is_abnormal() => {
            info!(%exit, "pty exited unexpectedly");
            sink.emit(SessionEvent::Error(SessionError::AbnormalExit { exit }));
        }
        Ok(exit) => debug!(%exit, "pty exited"),
        Err(err) => {
            warn!(error = %err, "waiting for pty helper failed");
            sink.emit(SessionEvent::Error(SessionError::Wait(err)));
        }
    }

    flush(&mut decoder, &sink);
    debug!("session complete");
}

enum Ingest {
    Open,
    Closed,
    Malformed(FrameError),
}

/// Decode one read and dispatch every frame it completed.
fn ingest(
    read: io::Result<usize>,
    buf: &[u8],
    decoder: &mut FrameDecoder,
    frames: &mut Vec<Frame>,
    mux: &EventMultiplexer,
    sink: &EventSink,
) -> Ingest {
    match read {
        Ok(0) => {
            debug!("pty output closed");
            Ingest::Closed
        }
        Ok(n) => {
            let decoded = decoder.decode(&buf[..n], frames);
            for frame in frames.drain(..) {
                if let Some(event) = mux.dispatch(frame) {
                    sink.emit(event);
                }
            }
            match decoded {
                Ok(()) => Ingest::Open,
                Err(err) => {
                    warn!(error = %err, "undecodable pty output; ending session");
                    Ingest::Malformed(err)
                }
            }
        }
        Err(err) if err.kind() == io::ErrorKind::Interrupted => Ingest::Open,
        Err(err) => {
            warn!(error = %err, "error reading pty output; treating as end of output");
            Ingest::Closed
        }
    }
}

/// Report a partial frame once. The decoder is cleared so a later flush
/// stays quiet.
fn flush(decoder: &mut FrameDecoder, sink: &EventSink) {
    if let Err(err) = decoder.finish() {
        warn!(error = %err, "pty output ended mid frame");
        sink.emit(SessionEvent::Error(err.into()));
        decoder.reset();
    }
}

/// Forward effects already queued by control adapters.
fn drain(effects: &mut UnboundedReceiver<SessionEvent>, sink: &EventSink) {
    while let Ok(event) = effects.try_recv() {
        sink.emit(event);
    }
}
