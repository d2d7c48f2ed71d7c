use std::collections::VecDeque;
use std::io::{ErrorKind, Read};

use crate::codec::{Frame, FrameConfig, FrameDecoder};
use crate::error::{FrameError, Result};

const READ_CHUNK_SIZE: usize = 8 * 1024;

/// Reads complete frames from any `Read` stream.
///
/// Handles partial reads internally; callers always get complete frames.
/// Useful for replaying a captured helper stream outside of a live session.
pub struct FrameReader<T> {
    inner: T,
    decoder: FrameDecoder,
    ready: VecDeque<Frame>,
    failed: Option<FrameError>,
    eof: bool,
}

impl<T: Read> FrameReader<T> {
    /// Create a new frame reader with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Create a new frame reader with explicit configuration.
    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        Self {
            inner,
            decoder: FrameDecoder::with_config(config),
            ready: VecDeque::new(),
            failed: None,
            eof: false,
        }
    }

    /// Read the next complete frame (blocking).
    ///
    /// Returns `Ok(None)` at EOF on a frame boundary and
    /// `Err(FrameError::ProtocolDesync)` at EOF inside a frame.
    pub fn read_frame(&mut self) -> Result<Option<Frame>> {
        loop {
            if let Some(frame) = self.ready.pop_front() {
                return Ok(Some(frame));
            }
            // Frames that preceded a bad token are handed out before the error.
            if let Some(err) = self.failed.take() {
                return Err(err);
            }
            if self.eof {
                return Ok(None);
            }

            let mut chunk = [0u8; READ_CHUNK_SIZE];
            let read = match self.inner.read(&mut chunk) {
                Ok(n) => n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            };

            if read == 0 {
                self.eof = true;
                self.decoder.finish()?;
                continue;
            }

            let mut decoded = Vec::new();
            let result = self.decoder.decode(&chunk[..read], &mut decoded);
            self.ready.extend(decoded);
            if let Err(err) = result {
                self.failed = Some(err);
                self.eof = true;
            }
        }
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Consume the reader and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }
}
