use std::io;
use std::sync::Mutex;

use ptywire_transport::{InputFuture, ProcessControl, TransportError};

/// In-memory [`ProcessControl`] that records what the session asked of it.
#[derive(Debug, Default)]
pub(crate) struct FakeProcess {
    signals: Mutex<Vec<String>>,
    writes: Mutex<Vec<Vec<u8>>>,
    fail_signals: bool,
    fail_writes: bool,
}

impl FakeProcess {
    pub(crate) fn failing_signals(mut self) -> Self {
        self.fail_signals = true;
        self
    }

    pub(crate) fn failing_writes(mut self) -> Self {
        self.fail_writes = true;
        self
    }

    pub(crate) fn signals(&self) -> Vec<String> {
        self.signals.lock().unwrap().clone()
    }

    pub(crate) fn writes(&self) -> Vec<Vec<u8>> {
        self.writes.lock().unwrap().clone()
    }
}

impl ProcessControl for FakeProcess {
    fn signal(&self, name: &str) -> ptywire_transport::Result<()> {
        if self.fail_signals {
            return Err(TransportError::Exited);
        }
        self.signals.lock().unwrap().push(name.to_string());
        Ok(())
    }

    fn write_input<'a>(&'a self, chunk: &'a [u8]) -> InputFuture<'a> {
        Box::pin(async move {
            if self.fail_writes {
                return Err(io::Error::new(io::ErrorKind::BrokenPipe, "pipe closed"));
            }
            self.writes.lock().unwrap().push(chunk.to_vec());
            Ok(())
        })
    }
}
