use std::convert::Infallible;
use std::io;

use futures_util::stream::{self, Stream};
use ptywire_session::{
    ControlHandle, SessionConfig, SessionEvent, SessionOptions, STDIN_STREAM,
};
use ptywire_transport::SpawnConfig;
use tokio::io::AsyncReadExt;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::cmd::RunArgs;
use crate::exit::{io_error, session_error, CliError, CliResult, INTERNAL, SIGNAL_BASE, SUCCESS};
use crate::output::{print_event, OutputFormat};

const STDIN_CHUNK: usize = 4096;

pub fn run(args: RunArgs, format: OutputFormat) -> CliResult<i32> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|err| io_error("runtime setup failed", err))?;
    let result = runtime.block_on(drive(args, format));
    // A pending stdin read would otherwise hold shutdown open.
    runtime.shutdown_background();
    result
}

async fn drive(args: RunArgs, format: OutputFormat) -> CliResult<i32> {
    let interrupts = install_ctrlc_handler()?;
    let mut interrupts = Some(interrupts);

    let mut spawn = SpawnConfig::new(&args.helper).args(&args.command);
    spawn.inherit_stderr = true;
    if let Some(cwd) = &args.cwd {
        spawn = spawn.cwd(cwd);
    }
    let config = SessionConfig::new(spawn)
        .with_options(SessionOptions::default().with_max_payload_size(args.max_payload));

    let mut events = ptywire_session::spawn(config);
    let mut exit = ChildExit::default();
    let mut failure: Option<CliError> = None;

    while let Some(event) = events.next().await {
        print_event(&event, format);
        match event {
            SessionEvent::Ready(handle) => {
                if let Some(rx) = interrupts.take() {
                    attach(&handle, rx, !args.no_stdin)?;
                }
            }
            SessionEvent::ExitCode(code) => exit.code = Some(code),
            SessionEvent::Signal(signal) => exit.signal = Some(signal),
            SessionEvent::Error(err) if err.is_terminal() => {
                if failure.is_none() {
                    failure = Some(session_error("run failed", err));
                }
            }
            SessionEvent::Error(err) => warn!(error = %err, "control error"),
            _ => {}
        }
    }

    match failure {
        Some(err) => Err(err),
        None => Ok(exit.code()),
    }
}

/// What the helper reported about the child.
#[derive(Debug, Default)]
struct ChildExit {
    code: Option<u64>,
    signal: Option<u64>,
}

impl ChildExit {
    fn code(&self) -> i32 {
        match (self.code, self.signal) {
            (Some(code), _) => i32::try_from(code).unwrap_or(i32::MAX),
            (None, Some(signal)) => {
                SIGNAL_BASE.saturating_add(i32::try_from(signal).unwrap_or(i32::MAX))
            }
            (None, None) => SUCCESS,
        }
    }
}

fn attach(
    handle: &ControlHandle,
    interrupts: mpsc::UnboundedReceiver<&'static str>,
    forward_stdin: bool,
) -> CliResult<()> {
    handle
        .attach_signal_stream(signal_source(interrupts))
        .map_err(|err| session_error("attach signals failed", err))?;
    if forward_stdin {
        handle
            .attach_named_input_stream(STDIN_STREAM, stdin_source())
            .map_err(|err| session_error("attach stdin failed", err))?;
    }
    debug!(forward_stdin, "control sources attached");
    Ok(())
}

fn install_ctrlc_handler() -> CliResult<mpsc::UnboundedReceiver<&'static str>> {
    let (tx, rx) = mpsc::unbounded_channel();
    ctrlc::set_handler(move || {
        let _ = tx.send("SIGINT");
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))?;
    Ok(rx)
}

fn signal_source(
    rx: mpsc::UnboundedReceiver<&'static str>,
) -> impl Stream<Item = Result<&'static str, Infallible>> {
    stream::unfold(rx, |mut rx| async move {
        let name = rx.recv().await?;
        Some((Ok(name), rx))
    })
}

fn stdin_source() -> impl Stream<Item = io::Result<Vec<u8>>> {
    stream::unfold(Some(tokio::io::stdin()), |state| async move {
        let mut stdin = state?;
        let mut buf = vec![0u8; STDIN_CHUNK];
        match stdin.read(&mut buf).await {
            Ok(0) => None,
            Ok(n) => {
                buf.truncate(n);
                Some((Ok(buf), Some(stdin)))
            }
            Err(err) => Some((Err(err), None)),
        }
    })
}
