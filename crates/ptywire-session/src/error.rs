use std::io;

use ptywire_frame::FrameError;
use ptywire_transport::{ProcessExit, TransportError};

/// Errors reported on a session's event stream, or by control operations.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The helper could not be started. Nothing was ever decoded.
    #[error(transparent)]
    Spawn(#[from] TransportError),

    /// The helper wrote bytes that are not a `Mnemonic Digit+ ':'` token.
    #[error("malformed token {token:?}")]
    MalformedToken { token: String },

    /// A payload-bearing token announced more bytes than allowed.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: u64, max: usize },

    /// Output ended while a token or payload was incomplete.
    #[error("pty terminated mid output")]
    ProtocolDesync,

    /// The helper exited nonzero or was killed by a signal.
    #[error("pty exited unexpectedly")]
    AbnormalExit { exit: ProcessExit },

    /// The exit notification itself failed.
    #[error("error waiting for pty: {0}")]
    Wait(#[source] io::Error),

    /// A frame-layer failure outside of decoding, such as an I/O error
    /// from a blocking reader or an encoder misuse.
    #[error(transparent)]
    Frame(FrameError),

    /// Writing a control chunk to the helper's input failed.
    #[error("Error writing to {stream}")]
    ControlWrite {
        stream: String,
        #[source]
        source: io::Error,
    },

    /// A control command named a stream the helper does not accept.
    #[error("Unknown stream: {0}")]
    UnknownChannel(String),

    /// The session has terminated; its control handles no longer act.
    #[error("session has ended")]
    Inert,
}

impl SessionError {
    /// True for errors that end the event stream.
    pub fn is_terminal(&self) -> bool {
        !matches!(
            self,
            Self::ControlWrite { .. } | Self::UnknownChannel(_) | Self::Inert
        )
    }
}

impl From<FrameError> for SessionError {
    fn from(err: FrameError) -> Self {
        match err {
            FrameError::MalformedToken { token } => Self::MalformedToken { token },
            FrameError::PayloadTooLarge { size, max } => Self::PayloadTooLarge { size, max },
            FrameError::ProtocolDesync => Self::ProtocolDesync,
            other @ (FrameError::Io(_) | FrameError::WrongFrameKind { .. }) => Self::Frame(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, SessionError>;

#[cfg(test)]
mod tests {
    use std::error::Error as _;

    use super::*;

    #[test]
    fn messages() {
        assert_eq!(
            SessionError::ProtocolDesync.to_string(),
            "pty terminated mid output"
        );
        assert_eq!(
            SessionError::AbnormalExit {
                exit: ProcessExit::code(1)
            }
            .to_string(),
            "pty exited unexpectedly"
        );
        assert_eq!(
            SessionError::UnknownChannel("bogus".into()).to_string(),
            "Unknown stream: bogus"
        );
    }

    #[test]
    fn control_write_chains_its_cause() {
        let err = SessionError::ControlWrite {
            stream: "stdin".into(),
            source: io::Error::new(io::ErrorKind::BrokenPipe, "pipe closed"),
        };
        assert_eq!(err.to_string(), "Error writing to stdin");
        let cause = err.source().expect("cause should be chained");
        assert_eq!(cause.to_string(), "pipe closed");
        assert!(!err.is_terminal());
    }

    #[test]
    fn spawn_error_keeps_translated_message() {
        let err = SessionError::from(TransportError::CommandNotFound {
            path: "/opt/pty".into(),
        });
        assert_eq!(err.to_string(), "/opt/pty: command not found");
        assert!(err.is_terminal());
    }

    #[test]
    fn frame_errors_map_to_session_errors() {
        assert!(matches!(
            SessionError::from(FrameError::ProtocolDesync),
            SessionError::ProtocolDesync
        ));
        assert!(matches!(
            SessionError::from(FrameError::MalformedToken { token: "zz".into() }),
            SessionError::MalformedToken { token } if token == "zz"
        ));
    }

    #[test]
    fn encoder_misuse_keeps_its_own_variant() {
        let err = SessionError::from(FrameError::WrongFrameKind { mnemonic: 'O' });
        assert!(matches!(
            &err,
            SessionError::Frame(FrameError::WrongFrameKind { mnemonic: 'O' })
        ));
        assert_eq!(
            err.to_string(),
            FrameError::WrongFrameKind { mnemonic: 'O' }.to_string()
        );
    }
}
