use std::io::{ErrorKind, Write};

use bytes::BytesMut;

use crate::codec::{encode_frame, encode_payload, encode_token, Frame};
use crate::error::{FrameError, Result};

const INITIAL_BUFFER_CAPACITY: usize = 8 * 1024;

/// Writes complete frames to any `Write` stream.
///
/// Produces the same byte stream the pty helper writes to its stdout.
pub struct FrameWriter<T> {
    inner: T,
    buf: BytesMut,
}

impl<T: Write> FrameWriter<T> {
    /// Create a new frame writer.
    pub fn new(inner: T) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
        }
    }

    /// Write a complete frame (blocking).
    pub fn write_frame(&mut self, frame: &Frame) -> Result<()> {
        self.buf.clear();
        encode_frame(frame, &mut self.buf)?;
        self.write_buffered()
    }

    /// Encode and send a bare token.
    pub fn send_bare(&mut self, mnemonic: u8, arg: u64) -> Result<()> {
        self.buf.clear();
        encode_token(mnemonic, arg, &mut self.buf)?;
        self.write_buffered()
    }

    /// Encode and send a payload-bearing token with its payload.
    pub fn send_payload(&mut self, mnemonic: u8, payload: &[u8]) -> Result<()> {
        self.buf.clear();
        encode_payload(mnemonic, payload, &mut self.buf)?;
        self.write_buffered()
    }

    fn write_buffered(&mut self) -> Result<()> {
        let mut offset = 0usize;
        while offset < self.buf.len() {
            match self.inner.write(&self.buf[offset..]) {
                Ok(0) => return Err(FrameError::Io(ErrorKind::WriteZero.into())),
                Ok(n) => offset += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
        }

        self.flush()
    }

    /// Flush the underlying stream.
    pub fn flush(&mut self) -> Result<()> {
        loop {
            match self.inner.flush() {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
        }
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Consume the writer and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    use super::*;
    use crate::codec::FrameDecoder;
    use crate::mnemonic::{CONTROL, EXIT_CODE, PID, STDOUT};

    fn written(writer: FrameWriter<Cursor<Vec<u8>>>) -> Vec<u8> {
        writer.into_inner().into_inner()
    }

    #[test]
    fn writes_helper_wire_format() {
        let mut writer = FrameWriter::new(Cursor::new(Vec::new()));

        writer.send_bare(PID, 4242).unwrap();
        writer.send_payload(CONTROL, b"START\n").unwrap();
        writer.send_payload(STDOUT, b"hi").unwrap();
        writer.send_bare(EXIT_CODE, 0).unwrap();

        assert_eq!(written(writer), b"P4242:C6:START\nO2:hiX0:");
    }

    #[test]
    fn write_frame_method() {
        let mut writer = FrameWriter::new(Cursor::new(Vec::new()));
        writer.write_frame(&Frame::payload(b'E', "abc")).unwrap();
        writer.write_frame(&Frame::bare(b'S', 15)).unwrap();

        let wire = written(writer);
        let frames = FrameDecoder::new().decode_chunk(&wire).unwrap();
        assert_eq!(
            frames,
            vec![Frame::payload(b'E', "abc"), Frame::bare(b'S', 15)]
        );
    }

    #[test]
    fn wrong_frame_kind_writes_nothing() {
        let mut writer = FrameWriter::new(Cursor::new(Vec::new()));
        assert!(matches!(
            writer.send_bare(STDOUT, 1),
            Err(FrameError::WrongFrameKind { .. })
        ));
        assert!(written(writer).is_empty());
    }

    #[test]
    fn flush_propagates() {
        let sink = FlushTrackingWriter::default();
        let flag = Arc::clone(&sink.flushed);
        let mut writer = FrameWriter::new(sink);

        writer.send_bare(EXIT_CODE, 1).unwrap();

        assert!(flag.load(Ordering::SeqCst));
        assert_eq!(writer.get_ref().data, b"X1:");
    }

    #[test]
    fn handles_interrupted_write_and_flush() {
        let writer_impl = InterruptedWriteThenFlush {
            wrote_once: false,
            flush_interrupted: false,
            data: Vec::new(),
        };

        let mut writer = FrameWriter::new(writer_impl);
        writer.send_payload(STDOUT, b"retry").unwrap();

        assert_eq!(writer.into_inner().data, b"O5:retry");
    }

    #[test]
    fn write_zero_is_an_error() {
        let mut writer = FrameWriter::new(ZeroWriter);
        let err = writer.send_bare(EXIT_CODE, 0).unwrap_err();
        assert!(matches!(err, FrameError::Io(e) if e.kind() == ErrorKind::WriteZero));
    }

    #[derive(Default)]
    struct FlushTrackingWriter {
        flushed: Arc<AtomicBool>,
        data: Vec<u8>,
    }

    impl Write for FlushTrackingWriter {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.data.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            self.flushed.store(true, Ordering::SeqCst);
            Ok(())
        }
    }

    struct InterruptedWriteThenFlush {
        wrote_once: bool,
        flush_interrupted: bool,
        data: Vec<u8>,
    }

    impl Write for InterruptedWriteThenFlush {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            if !self.wrote_once {
                self.wrote_once = true;
                return Err(std::io::Error::from(ErrorKind::Interrupted));
            }
            self.data.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            if !self.flush_interrupted {
                self.flush_interrupted = true;
                return Err(std::io::Error::from(ErrorKind::Interrupted));
            }
            Ok(())
        }
    }

    struct ZeroWriter;

    impl Write for ZeroWriter {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Ok(0)
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }
}
