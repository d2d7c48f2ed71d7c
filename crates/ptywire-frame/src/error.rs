/// Errors that can occur during frame encoding/decoding.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The bytes before a delimiter are not `Mnemonic Digit+`.
    #[error("malformed token {token:?}")]
    MalformedToken { token: String },

    /// A payload-bearing token announced more bytes than the configured maximum.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: u64, max: usize },

    /// A frame was encoded with a mnemonic of the other kind (bare vs. payload-bearing).
    #[error("mnemonic {mnemonic:?} used with the wrong frame kind")]
    WrongFrameKind { mnemonic: char },

    /// The stream ended while a token or payload was still incomplete.
    #[error("pty terminated mid output")]
    ProtocolDesync,

    /// An I/O error occurred while reading or writing frames.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl FrameError {
    pub(crate) fn malformed(token: &[u8]) -> Self {
        Self::MalformedToken {
            token: String::from_utf8_lossy(token).into_owned(),
        }
    }
}

pub type Result<T> = std::result::Result<T, FrameError>;
