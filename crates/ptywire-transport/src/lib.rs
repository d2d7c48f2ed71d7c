//! Process seam for the pty helper.
//!
//! The decoder only ever sees the helper through four things:
//! - a readable output byte stream
//! - a writable input sink
//! - a signal-delivery primitive
//! - an exit notification
//!
//! [`ProcessControl`] abstracts the two process-directed actions so the
//! session layer can be driven by fakes in tests. [`spawn`] launches the real
//! helper with `tokio::process`.

pub mod error;
pub mod traits;

#[cfg(unix)]
pub mod process;
#[cfg(unix)]
pub mod signal;

pub use error::{Result, TransportError};
pub use traits::{InputFuture, ProcessControl, ProcessExit};

#[cfg(unix)]
pub use process::{spawn, ChildControl, PtyProcess, SpawnConfig};
#[cfg(unix)]
pub use signal::{parse_signal, send_signal};
