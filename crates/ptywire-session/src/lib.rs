//! Session layer for the pty helper.
//!
//! A session turns the helper's framed output into one ordered sequence of
//! [`SessionEvent`]s and hands out a [`ControlHandle`] once the child is
//! running. The sequence ends either cleanly, or after one or two terminal
//! errors (abnormal exit, then desync).
//!
//! ```no_run
//! # async fn demo() {
//! use ptywire_session::{spawn, SessionConfig, SessionEvent};
//! use ptywire_transport::SpawnConfig;
//!
//! let mut events = spawn(SessionConfig::new(
//!     SpawnConfig::new("/usr/libexec/pty-helper").args(["/bin/sh", "-c", "ls"]),
//! ));
//! while let Some(event) = events.next().await {
//!     if let SessionEvent::StreamData { stream, chunk } = event {
//!         println!("{stream}: {chunk:?}");
//!     }
//! }
//! # }
//! ```

pub mod config;
pub mod control;
pub mod error;
pub mod event;
pub mod multiplex;
pub mod supervisor;

#[cfg(test)]
mod testing;

#[cfg(unix)]
pub use config::SessionConfig;
pub use config::{SessionOptions, DEFAULT_EXIT_GRACE, DEFAULT_READ_CHUNK};
pub use control::{ControlCommand, ControlHandle};
pub use error::{Result, SessionError};
pub use event::{EventStream, SessionEvent, STDERR_STREAM, STDIN_STREAM, STDOUT_STREAM};
pub use multiplex::{StreamNames, READY_MESSAGE};
#[cfg(unix)]
pub use supervisor::spawn;
pub use supervisor::supervise;
