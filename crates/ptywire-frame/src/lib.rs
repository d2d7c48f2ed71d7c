//! Incremental decoder for the pty helper's wire protocol.
//!
//! The helper multiplexes everything it knows about the child onto its own
//! stdout as a sequence of tokens:
//! - `Mnemonic Digit+ ':'` for bare commands (exit code, signal, pid)
//! - the same token followed by exactly `N` raw bytes for payload-bearing
//!   commands (stdout, stderr, stdin echo, control messages)
//!
//! Chunks can split the stream anywhere; [`FrameDecoder`] carries the
//! partial state between chunks.

pub mod codec;
pub mod error;
pub mod mnemonic;
pub mod reader;
pub mod writer;

pub use codec::{
    encode_frame, encode_payload, encode_token, parse_token, Frame, FrameConfig, FrameDecoder,
    Token, DEFAULT_MAX_PAYLOAD, MAX_TOKEN_LEN,
};
pub use error::{FrameError, Result};
pub use mnemonic::{
    has_payload, mnemonic_name, CONTROL, EXIT_CODE, MASTER_PID, PID, SIGNAL, STDERR, STDIN, STDOUT,
};
pub use reader::FrameReader;
pub use writer::FrameWriter;
