use std::str::FromStr;

use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;

use crate::error::{Result, TransportError};

/// Resolve a signal name. Accepts `SIGTERM` as well as the short `TERM`.
pub fn parse_signal(name: &str) -> Result<Signal> {
    let trimmed = name.trim();
    let parsed = if trimmed.starts_with("SIG") {
        Signal::from_str(trimmed)
    } else {
        Signal::from_str(&format!("SIG{trimmed}"))
    };
    parsed.map_err(|_| TransportError::UnknownSignal(name.to_string()))
}

/// Deliver the named signal to `pid`.
pub fn send_signal(pid: u32, name: &str) -> Result<()> {
    let signal = parse_signal(name)?;
    let raw = i32::try_from(pid).map_err(|_| TransportError::Exited)?;
    tracing::debug!(pid, %signal, "delivering signal");
    kill(Pid::from_raw(raw), signal).map_err(|source| TransportError::Signal {
        signal: name.to_string(),
        pid,
        source,
    })
}
