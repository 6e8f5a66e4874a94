//! Name-keyed cache of redirected files and commands.
//!
//! The first redirection to a name opens the stream; later ones reuse it,
//! so `print > "out"` in a loop truncates once. Names are compared as plain
//! strings: `"out"` and `"./out"` are two different streams.

mod subprocess;

use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::process::ChildStdin;

use crate::config::IoConfig;
use crate::error::{Error, Result};
use crate::record::RecordReader;
use crate::sink::{SharedReader, SharedWriter};

pub use subprocess::{SubprocessBridge, SubprocessHandle};

/// Redirection operators handed over by the evaluator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Redirection {
    /// `print > file`
    Truncate,
    /// `print >> file`
    Append,
    /// `print | command`
    PipeTo,
    /// `command | getline`
    PipeFrom,
    /// `getline < file`
    ReadFile,
}

impl Redirection {
    pub fn from_operator(op: &str) -> Result<Self> {
        match op {
            ">" => Ok(Redirection::Truncate),
            ">>" => Ok(Redirection::Append),
            "|" => Ok(Redirection::PipeTo),
            "|&" | "| getline" => Ok(Redirection::PipeFrom),
            "<" => Ok(Redirection::ReadFile),
            _ => Err(Error::invariant(format!("unexpected redirect type {:?}", op))),
        }
    }

    pub fn is_output(&self) -> bool {
        matches!(self, Redirection::Truncate | Redirection::Append | Redirection::PipeTo)
    }
}

/// Output destination for print/printf redirection
pub enum OutputStream {
    File(BufWriter<File>),
    Pipe(ChildStdin),
    /// A command that failed to start swallows everything
    Discard,
}

impl Write for OutputStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            OutputStream::File(f) => f.write(buf),
            OutputStream::Pipe(p) => p.write(buf),
            OutputStream::Discard => Ok(buf.len()),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            OutputStream::File(f) => f.flush(),
            OutputStream::Pipe(p) => p.flush(),
            OutputStream::Discard => Ok(()),
        }
    }
}

/// A cached stream, tagged by the way it can be used
pub enum StreamHandle {
    Writer(OutputStream),
    Reader(RecordReader),
}

impl StreamHandle {
    /// Flush (for writers) and release the underlying descriptor
    fn close(self) -> io::Result<()> {
        match self {
            StreamHandle::Writer(OutputStream::File(f)) => {
                f.into_inner().map(drop).map_err(|e| e.into_error())
            }
            StreamHandle::Writer(mut w) => w.flush(),
            StreamHandle::Reader(_) => Ok(()),
        }
    }
}

/// Everything the registry needs to open a new stream
pub struct Streams<'a> {
    pub config: &'a IoConfig,
    pub stdin: &'a SharedReader,
    pub output: &'a SharedWriter,
    pub errors: &'a SharedWriter,
}

/// What teardown released
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CloseSummary {
    pub streams_closed: usize,
    pub commands_waited: usize,
}

#[derive(Default)]
pub struct StreamRegistry {
    streams: BTreeMap<String, StreamHandle>,
    commands: BTreeMap<String, SubprocessHandle>,
    bridge: SubprocessBridge,
    opened: usize,
}

impl StreamRegistry {
    pub fn new(bridge: SubprocessBridge) -> Self {
        Self {
            bridge,
            ..Self::default()
        }
    }

    /// Number of streams created so far (reuses don't count)
    pub fn open_count(&self) -> usize {
        self.opened
    }

    pub fn len(&self) -> usize {
        self.streams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.streams.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.streams.contains_key(name)
    }

    /// Writer for `name`, opening it on first use
    pub fn writer(&mut self, name: &str, kind: Redirection, env: &Streams<'_>) -> Result<&mut OutputStream> {
        if !kind.is_output() {
            return Err(Error::invariant(format!("{:?} is not an output redirection", kind)));
        }
        if !self.streams.contains_key(name) {
            let stream = self.open_writer(name, kind, env)?;
            self.streams.insert(name.to_string(), StreamHandle::Writer(stream));
            self.opened += 1;
        }
        match self.streams.get_mut(name) {
            Some(StreamHandle::Writer(w)) => Ok(w),
            Some(StreamHandle::Reader(_)) => Err(Error::WriteToReader { name: name.to_string() }),
            None => Err(Error::invariant("redirection vanished from the registry")),
        }
    }

    /// Record reader for `name`, opening it on first use
    pub fn reader(&mut self, name: &str, kind: Redirection, env: &Streams<'_>) -> Result<&mut RecordReader> {
        if kind.is_output() {
            return Err(Error::invariant(format!("{:?} is not an input redirection", kind)));
        }
        if !self.streams.contains_key(name) {
            let reader = self.open_reader(name, kind, env)?;
            self.streams.insert(name.to_string(), StreamHandle::Reader(reader));
            self.opened += 1;
        }
        match self.streams.get_mut(name) {
            Some(StreamHandle::Reader(r)) => Ok(r),
            Some(StreamHandle::Writer(_)) => Err(Error::ReadFromWriter { name: name.to_string() }),
            None => Err(Error::invariant("redirection vanished from the registry")),
        }
    }

    fn open_writer(&mut self, name: &str, kind: Redirection, env: &Streams<'_>) -> Result<OutputStream> {
        match kind {
            Redirection::Truncate | Redirection::Append => {
                let mut options = OpenOptions::new();
                options.create(true).write(true);
                if kind == Redirection::Append {
                    options.append(true);
                } else {
                    options.truncate(true);
                }
                let file = options.open(name).map_err(|e| Error::open(name, e))?;
                tracing::debug!(name, ?kind, "opened output file");
                Ok(OutputStream::File(BufWriter::new(file)))
            }
            Redirection::PipeTo => match self.bridge.spawn_writer(name, env.output, env.errors) {
                Some((handle, stdin)) => {
                    self.commands.insert(name.to_string(), handle);
                    Ok(OutputStream::Pipe(stdin))
                }
                None => Ok(OutputStream::Discard),
            },
            Redirection::PipeFrom | Redirection::ReadFile => {
                Err(Error::invariant(format!("unexpected redirect type {:?}", kind)))
            }
        }
    }

    fn open_reader(&mut self, name: &str, kind: Redirection, env: &Streams<'_>) -> Result<RecordReader> {
        match kind {
            Redirection::ReadFile => {
                if env.config.no_file_reads {
                    return Err(Error::FileReadsDisabled);
                }
                let file = File::open(name).map_err(|e| Error::open(name, e))?;
                tracing::debug!(name, "opened input file");
                Ok(RecordReader::new(Box::new(file), env.config))
            }
            Redirection::PipeFrom => match self.bridge.spawn_reader(name, env.stdin, env.errors) {
                Some((handle, stdout)) => {
                    self.commands.insert(name.to_string(), handle);
                    Ok(RecordReader::new(Box::new(stdout), env.config))
                }
                None => Ok(RecordReader::empty(env.config)),
            },
            Redirection::Truncate | Redirection::Append | Redirection::PipeTo => {
                Err(Error::invariant(format!("unexpected redirect type {:?}", kind)))
            }
        }
    }

    /// Flush one writer. `Ok(false)` if `name` isn't an open writer.
    pub fn flush(&mut self, name: &str) -> Result<bool> {
        match self.streams.get_mut(name) {
            Some(StreamHandle::Writer(w)) => {
                w.flush()?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    pub fn flush_all(&mut self) -> Result<()> {
        for handle in self.streams.values_mut() {
            if let StreamHandle::Writer(w) = handle {
                w.flush()?;
            }
        }
        Ok(())
    }

    /// `close(name)`: the command's exit status, 0 for files, -1 if `name`
    /// isn't open or closing failed. The name may be opened again later.
    pub fn close(&mut self, name: &str) -> i32 {
        let Some(handle) = self.streams.remove(name) else {
            return -1;
        };
        let mut status = 0;
        if let Err(e) = handle.close() {
            tracing::warn!(name, error = %e, "error closing stream");
            status = -1;
        }
        if let Some(command) = self.commands.remove(name) {
            status = match command.wait() {
                Ok(code) => code,
                Err(e) => {
                    tracing::warn!(name, error = %e, "error waiting for command");
                    -1
                }
            };
        }
        status
    }

    /// Close every stream, then reap every command. Errors are logged and
    /// otherwise ignored.
    pub fn close_all(&mut self) -> CloseSummary {
        let mut summary = CloseSummary::default();
        for (name, handle) in std::mem::take(&mut self.streams) {
            if let Err(e) = handle.close() {
                tracing::warn!(name, error = %e, "error closing stream");
            }
            summary.streams_closed += 1;
        }
        for (name, command) in std::mem::take(&mut self.commands) {
            if let Err(e) = command.wait() {
                tracing::warn!(name, error = %e, "error waiting for command");
            }
            summary.commands_waited += 1;
        }
        tracing::debug!(?summary, "closed all redirections");
        summary
    }
}
