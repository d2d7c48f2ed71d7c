//! Decoder, supervisor and control channel for pty helper processes.
//!
//! A pty helper runs a command under a pseudo-terminal and reports
//! everything about it (pid, output, exit) on its own stdout as a framed
//! token stream. This crate re-exports the layers that turn that stream
//! into typed events.
//!
//! # Crate Structure
//!
//! - [`frame`]: incremental token decoder, encoder and blocking reader
//! - [`transport`]: helper process seam (spawn, signals, input)
//! - [`session`]: event multiplexing, control handles and lifecycle
//!   supervision (behind the `session` feature)

/// Re-export frame types.
pub mod frame {
    pub use ptywire_frame::*;
}

/// Re-export transport types.
pub mod transport {
    pub use ptywire_transport::*;
}

/// Re-export session types (requires `session` feature).
#[cfg(feature = "session")]
pub mod session {
    pub use ptywire_session::*;
}
