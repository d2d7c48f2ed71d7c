use std::collections::BTreeMap;

use ptywire_frame::{
    has_payload, mnemonic_name, Frame, Token, CONTROL, EXIT_CODE, PID, SIGNAL, STDERR, STDIN,
    STDOUT,
};
use tracing::{debug, trace, warn};

use crate::control::{ControlContext, ControlHandle};
use crate::event::{SessionEvent, STDERR_STREAM, STDIN_STREAM, STDOUT_STREAM};

/// Control payload announcing that the child is running.
pub const READY_MESSAGE: &str = "START\n";

/// Payload mnemonic to stream name table.
///
/// Defaults to `O → stdout`, `E → stderr`, `I → stdin`. The control mnemonic
/// is never part of the table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamNames {
    names: BTreeMap<u8, String>,
}

impl Default for StreamNames {
    fn default() -> Self {
        let names = [
            (STDOUT, STDOUT_STREAM),
            (STDERR, STDERR_STREAM),
            (STDIN, STDIN_STREAM),
        ]
        .into_iter()
        .map(|(mnemonic, name)| (mnemonic, name.to_string()))
        .collect();
        Self { names }
    }
}

impl StreamNames {
    /// Add or rename an entry.
    pub fn with(mut self, mnemonic: u8, name: impl Into<String>) -> Self {
        if mnemonic == CONTROL {
            warn!("control mnemonic cannot be mapped to a stream; ignoring");
            return self;
        }
        self.names.insert(mnemonic, name.into());
        self
    }

    /// Stream name for `mnemonic`, if any.
    pub fn get(&self, mnemonic: u8) -> Option<&str> {
        self.names.get(&mnemonic).map(String::as_str)
    }

    /// All entries, ordered by mnemonic.
    pub fn iter(&self) -> impl Iterator<Item = (u8, &str)> {
        self.names.iter().map(|(m, name)| (*m, name.as_str()))
    }

    /// Entries whose mnemonic never carries a payload, so no frame can
    /// ever select them.
    pub fn unreachable(&self) -> impl Iterator<Item = (u8, &str)> {
        self.iter().filter(|(m, _)| !has_payload(*m))
    }
}

/// Turns decoded frames into session events.
#[derive(Debug)]
pub(crate) struct EventMultiplexer {
    names: StreamNames,
    control: ControlContext,
}

impl EventMultiplexer {
    pub(crate) fn new(names: StreamNames, control: ControlContext) -> Self {
        for (mnemonic, name) in names.unreachable() {
            debug!(
                mnemonic = %char::from(mnemonic),
                stream = name,
                "stream name has no payload-bearing mnemonic and will never be emitted"
            );
        }
        Self { names, control }
    }

    /// Event for `frame`, or `None` for frames that produce nothing.
    pub(crate) fn dispatch(&self, frame: Frame) -> Option<SessionEvent> {
        match frame {
            Frame::Bare(Token { mnemonic, arg }) => match mnemonic {
                EXIT_CODE => Some(SessionEvent::ExitCode(arg)),
                SIGNAL => Some(SessionEvent::Signal(arg)),
                PID => Some(SessionEvent::Pid(arg)),
                other => {
                    trace!(mnemonic = %char::from(other), name = mnemonic_name(other), arg, "ignoring token");
                    None
                }
            },
            Frame::Payload {
                mnemonic: CONTROL,
                payload,
            } => match std::str::from_utf8(&payload) {
                Ok(READY_MESSAGE) => {
                    debug!("pty helper reports child running");
                    Some(SessionEvent::Ready(ControlHandle::new(&self.control)))
                }
                Ok(message) => {
                    debug!(message, "control message");
                    None
                }
                Err(_) => {
                    debug!(len = payload.len(), "non-utf8 control message");
                    None
                }
            },
            Frame::Payload { mnemonic, payload } => match self.names.get(mnemonic) {
                Some(stream) => Some(SessionEvent::StreamData {
                    stream: stream.to_string(),
                    chunk: payload,
                }),
                None => {
                    debug!(mnemonic = %char::from(mnemonic), len = payload.len(), "payload for unnamed stream");
                    None
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use bytes::Bytes;
    use ptywire_frame::MASTER_PID;

    use super::*;
    use crate::control::Liveness;
    use crate::event::EventSink;
    use crate::testing::FakeProcess;

    fn multiplexer(names: StreamNames) -> EventMultiplexer {
        let (effects, _rx) = EventSink::channel();
        let context =
            ControlContext::new(Arc::new(FakeProcess::default()), effects, Liveness::new());
        EventMultiplexer::new(names, context)
    }

    #[test]
    fn bare_tokens_map_to_numeric_events() {
        let mux = multiplexer(StreamNames::default());
        assert!(matches!(
            mux.dispatch(Frame::bare(PID, 42)),
            Some(SessionEvent::Pid(42))
        ));
        assert!(matches!(
            mux.dispatch(Frame::bare(EXIT_CODE, 0)),
            Some(SessionEvent::ExitCode(0))
        ));
        assert!(matches!(
            mux.dispatch(Frame::bare(SIGNAL, 9)),
            Some(SessionEvent::Signal(9))
        ));
    }

    #[test]
    fn master_pid_and_unknown_tokens_are_silent() {
        let mux = multiplexer(StreamNames::default());
        assert!(mux.dispatch(Frame::bare(MASTER_PID, 7)).is_none());
        assert!(mux.dispatch(Frame::bare(b'Z', 1)).is_none());
    }

    #[test]
    fn payloads_become_named_stream_data() {
        let mux = multiplexer(StreamNames::default());
        for (mnemonic, name) in [(STDOUT, "stdout"), (STDERR, "stderr"), (STDIN, "stdin")] {
            match mux.dispatch(Frame::payload(mnemonic, Bytes::from_static(b"\x00\xffabc"))) {
                Some(SessionEvent::StreamData { stream, chunk }) => {
                    assert_eq!(stream, name);
                    assert_eq!(chunk, &b"\x00\xffabc"[..]);
                }
                other => panic!("unexpected event: {other:?}"),
            }
        }
    }

    #[test]
    fn custom_names_replace_defaults() {
        let mux = multiplexer(StreamNames::default().with(STDOUT, "out"));
        assert!(matches!(
            mux.dispatch(Frame::payload(STDOUT, &b"x"[..])),
            Some(SessionEvent::StreamData { stream, .. }) if stream == "out"
        ));
    }

    #[test]
    fn control_mnemonic_is_never_a_stream() {
        let names = StreamNames::default().with(CONTROL, "control");
        assert_eq!(names.get(CONTROL), None);
    }

    #[test]
    fn unreachable_names_are_reported() {
        let names = StreamNames::default().with(b'D', "debug");
        let unreachable: Vec<_> = names.unreachable().collect();
        assert_eq!(unreachable, vec![(b'D', "debug")]);

        // A bare D token still produces nothing.
        let mux = multiplexer(names);
        assert!(mux.dispatch(Frame::bare(b'D', 3)).is_none());
    }

    #[tokio::test]
    async fn start_control_message_yields_ready() {
        let mux = multiplexer(StreamNames::default());
        match mux.dispatch(Frame::payload(CONTROL, READY_MESSAGE.as_bytes().to_vec())) {
            Some(SessionEvent::Ready(handle)) => assert!(handle.is_live()),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn other_control_messages_are_ignored() {
        let mux = multiplexer(StreamNames::default());
        assert!(mux
            .dispatch(Frame::payload(CONTROL, &b"END\n"[..]))
            .is_none());
        assert!(mux
            .dispatch(Frame::payload(CONTROL, &b"START"[..]))
            .is_none());
        assert!(mux
            .dispatch(Frame::payload(CONTROL, &b"START\r\n"[..]))
            .is_none());
        assert!(mux
            .dispatch(Frame::payload(CONTROL, &b"HELLO\n"[..]))
            .is_none());
        assert!(mux
            .dispatch(Frame::payload(CONTROL, &b"\xff\xfe"[..]))
            .is_none());
    }
}
