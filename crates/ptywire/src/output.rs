use std::io::{IsTerminal, Write};
use std::time::{SystemTime, UNIX_EPOCH};

use clap::ValueEnum;
use ptywire_frame::{mnemonic_name, Frame, Token};
use ptywire_session::{SessionEvent, STDERR_STREAM, STDIN_STREAM};
use serde::Serialize;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    /// One JSON object per line.
    Json,
    /// One human-readable line per item.
    Pretty,
    /// Stream bytes only, exactly as the child produced them.
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Raw
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize, Default)]
struct EventOutput<'a> {
    event: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    value: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stream: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    size: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    signal: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    timestamp: String,
}

pub fn print_event(event: &SessionEvent, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let mut out = EventOutput {
                event: event.kind(),
                timestamp: now_unix_seconds(),
                ..EventOutput::default()
            };
            match event {
                SessionEvent::Pid(value)
                | SessionEvent::ExitCode(value)
                | SessionEvent::Signal(value) => out.value = Some(*value),
                SessionEvent::StreamData { stream, chunk } => {
                    out.stream = Some(stream.as_str());
                    out.size = Some(chunk.len());
                    out.data = Some(payload_preview(chunk));
                }
                SessionEvent::ProcessSignaled { signal } => out.signal = Some(signal.as_str()),
                SessionEvent::Error(err) => out.error = Some(err.to_string()),
                SessionEvent::Ready(_) => {}
            }
            print_json(&out);
        }
        OutputFormat::Pretty => match event {
            SessionEvent::Pid(pid) => println!("pid {pid}"),
            SessionEvent::ExitCode(code) => println!("exit code {code}"),
            SessionEvent::Signal(signal) => println!("signal {signal}"),
            SessionEvent::StreamData { stream, chunk } => {
                println!("{stream} size={} data={}", chunk.len(), payload_preview(chunk))
            }
            SessionEvent::Ready(_) => println!("ready"),
            SessionEvent::ProcessSignaled { signal } => println!("sent {signal}"),
            SessionEvent::Error(err) => println!("error: {err}"),
        },
        OutputFormat::Raw => match event {
            SessionEvent::StreamData { stream, .. } if stream == STDIN_STREAM => {}
            SessionEvent::StreamData { stream, chunk } if stream == STDERR_STREAM => {
                let mut err = std::io::stderr();
                let _ = err.write_all(chunk);
                let _ = err.flush();
            }
            SessionEvent::StreamData { chunk, .. } => print_raw(chunk),
            _ => {}
        },
    }
}

#[derive(Serialize)]
struct FrameOutput<'a> {
    mnemonic: String,
    name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    arg: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    payload_size: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    payload: Option<String>,
}

pub fn print_frame(frame: &Frame, format: OutputFormat) {
    let mnemonic = frame.mnemonic();
    match format {
        OutputFormat::Json => {
            let mut out = FrameOutput {
                mnemonic: char::from(mnemonic).to_string(),
                name: mnemonic_name(mnemonic),
                arg: None,
                payload_size: None,
                payload: None,
            };
            match frame {
                Frame::Bare(Token { arg, .. }) => out.arg = Some(*arg),
                Frame::Payload { payload, .. } => {
                    out.payload_size = Some(payload.len());
                    out.payload = Some(payload_preview(payload));
                }
            }
            print_json(&out);
        }
        OutputFormat::Pretty => match frame {
            Frame::Bare(Token { arg, .. }) => {
                println!("{} ({}) arg={arg}", char::from(mnemonic), mnemonic_name(mnemonic))
            }
            Frame::Payload { payload, .. } => println!(
                "{} ({}) size={} payload={}",
                char::from(mnemonic),
                mnemonic_name(mnemonic),
                payload.len(),
                payload_preview(payload)
            ),
        },
        OutputFormat::Raw => {
            if let Frame::Payload { payload, .. } = frame {
                print_raw(payload);
            }
        }
    }
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

fn print_json<T: Serialize>(value: &T) {
    println!(
        "{}",
        serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
    );
}

fn payload_preview(payload: &[u8]) -> String {
    match std::str::from_utf8(payload) {
        Ok(text) => text.to_string(),
        Err(_) => format!("<binary {} bytes>", payload.len()),
    }
}

fn now_unix_seconds() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs().to_string())
        .unwrap_or_else(|_| "0".to_string())
}
