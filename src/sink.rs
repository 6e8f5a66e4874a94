//! Reader and writer handles shared between the evaluator and the pipe
//! forwarding threads.

use std::io::{self, BufWriter, Read, Write};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::record::Input;

/// Boxed writer behind a sink
pub type Output = Box<dyn Write + Send>;

/// Cloneable handle to the interpreter's standard input
#[derive(Clone)]
pub struct SharedReader(Arc<Mutex<Input>>);

impl SharedReader {
    pub fn new(input: Input) -> Self {
        Self(Arc::new(Mutex::new(input)))
    }

    pub fn stdin() -> Self {
        Self::new(Box::new(io::stdin()))
    }
}

impl Read for SharedReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.0.lock().read(buf)
    }
}

/// Cloneable handle to an output or error sink
#[derive(Clone)]
pub struct SharedWriter(Arc<Mutex<Output>>);

impl SharedWriter {
    pub fn new(output: Output) -> Self {
        Self(Arc::new(Mutex::new(output)))
    }

    /// Wrap `output` in a `BufWriter` when `buffered`; flushed at shutdown
    pub fn with_buffering(output: Output, buffered: bool) -> Self {
        if buffered {
            Self::new(Box::new(BufWriter::new(output)))
        } else {
            Self::new(output)
        }
    }

    pub fn stdout(buffered: bool) -> Self {
        Self::with_buffering(Box::new(io::stdout()), buffered)
    }

    pub fn stderr(buffered: bool) -> Self {
        Self::with_buffering(Box::new(io::stderr()), buffered)
    }
}

impl Write for SharedWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().write(buf)
    }

    // Hold the lock for the whole buffer so forwarded output never splits it
    fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        self.0.lock().write_all(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.0.lock().flush()
    }
}

/// In-memory sink, handy for embedding and tests
#[derive(Clone, Default)]
pub struct MemorySink(Arc<Mutex<Vec<u8>>>);

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock()).into_owned()
    }
}

impl Write for MemorySink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
