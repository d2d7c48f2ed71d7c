use std::time::Duration;

use ptywire_frame::FrameConfig;
#[cfg(unix)]
use ptywire_transport::SpawnConfig;

use crate::multiplex::StreamNames;

/// Default size of a single read from the helper's output.
pub const DEFAULT_READ_CHUNK: usize = 8 * 1024;

/// How long output is still read after the helper has exited.
pub const DEFAULT_EXIT_GRACE: Duration = Duration::from_millis(100);

/// Options for decoding and dispatching a helper's output.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Decoder limits.
    pub frame: FrameConfig,
    /// Payload mnemonic to stream name table.
    pub stream_names: StreamNames,
    /// Buffer size for reads from the helper's output.
    pub read_chunk_size: usize,
    /// Bound on reading leftover output once the helper has exited. Output
    /// held open past this (by a grandchild, say) does not keep the session
    /// alive.
    pub exit_grace: Duration,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            frame: FrameConfig::default(),
            stream_names: StreamNames::default(),
            read_chunk_size: DEFAULT_READ_CHUNK,
            exit_grace: DEFAULT_EXIT_GRACE,
        }
    }
}

impl SessionOptions {
    pub fn with_frame_config(mut self, frame: FrameConfig) -> Self {
        self.frame = frame;
        self
    }

    pub fn with_max_payload_size(mut self, max: usize) -> Self {
        self.frame.max_payload_size = max;
        self
    }

    pub fn with_stream_names(mut self, names: StreamNames) -> Self {
        self.stream_names = names;
        self
    }

    /// Zero is treated as one.
    pub fn with_read_chunk_size(mut self, size: usize) -> Self {
        self.read_chunk_size = size.max(1);
        self
    }

    pub fn with_exit_grace(mut self, grace: Duration) -> Self {
        self.exit_grace = grace;
        self
    }
}

/// Everything needed to start a session against a real helper.
#[cfg(unix)]
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub spawn: SpawnConfig,
    pub options: SessionOptions,
}

#[cfg(unix)]
impl SessionConfig {
    pub fn new(spawn: SpawnConfig) -> Self {
        Self {
            spawn,
            options: SessionOptions::default(),
        }
    }

    pub fn with_options(mut self, options: SessionOptions) -> Self {
        self.options = options;
        self
    }
}

#[cfg(unix)]
impl From<SpawnConfig> for SessionConfig {
    fn from(spawn: SpawnConfig) -> Self {
        Self::new(spawn)
    }
}
