//! The I/O state of one interpreter run.
//!
//! [`IoContext`] is passed by reference wherever the evaluator needs input
//! or output; nothing here is global. It owns the main input sequencer, the
//! redirection registry, the current record and the standard streams, and
//! tears them down in a fixed order in [`IoContext::shutdown`].

use std::io::Write;

use crate::config::IoConfig;
use crate::error::{Error, Result};
use crate::fields::{CurrentRecord, FieldSplitter};
use crate::input::InputSequencer;
use crate::output::OutputWriter;
use crate::record::Record;
use crate::redirect::{CloseSummary, Redirection, StreamRegistry, Streams, SubprocessBridge};
use crate::runtime::Runtime;
use crate::sink::{SharedReader, SharedWriter};

/// Live settings: the config plus the field splitter compiled from it
#[derive(Debug, Clone)]
pub struct Settings {
    config: IoConfig,
    fields: FieldSplitter,
}

impl Settings {
    pub fn new(config: IoConfig) -> Result<Self> {
        let fields = FieldSplitter::from_config(&config)?;
        Ok(Self { config, fields })
    }

    pub fn config(&self) -> &IoConfig {
        &self.config
    }

    pub fn field_splitter(&self) -> &FieldSplitter {
        &self.fields
    }

    /// RS = "" also makes newline a field separator
    pub fn paragraph_mode(&self) -> bool {
        self.config.rs.is_empty()
    }

    /// Takes effect for sources opened from now on
    pub fn set_rs(&mut self, rs: &str) {
        self.config.rs = rs.to_string();
    }

    /// Setting FS clears FPAT and FIELDWIDTHS
    pub fn set_fs(&mut self, fs: &str) -> Result<()> {
        self.fields = FieldSplitter::from_fs(fs)?;
        self.config.fs = fs.to_string();
        self.config.fpat.clear();
        self.config.fieldwidths.clear();
        Ok(())
    }

    pub fn set_fpat(&mut self, fpat: &str) -> Result<()> {
        self.config.fpat = fpat.to_string();
        self.config.fieldwidths.clear();
        self.recompile()
    }

    pub fn set_fieldwidths(&mut self, widths: &str) -> Result<()> {
        self.config.fieldwidths = widths.to_string();
        self.config.fpat.clear();
        self.recompile()
    }

    fn recompile(&mut self) -> Result<()> {
        self.fields = FieldSplitter::from_config(&self.config)?;
        Ok(())
    }

    /// Apply an assignment to one of the separators this layer owns.
    /// Returns false when `name` isn't one of them.
    pub fn assign_special(&mut self, name: &str, value: &str) -> Result<bool> {
        match name {
            "RS" => self.set_rs(value),
            "FS" => self.set_fs(value)?,
            "OFS" => self.config.ofs = value.to_string(),
            "ORS" => self.config.ors = value.to_string(),
            "FPAT" => self.set_fpat(value)?,
            "FIELDWIDTHS" => self.set_fieldwidths(value)?,
            _ => return Ok(false),
        }
        Ok(true)
    }
}

/// Standard streams handed to a context
pub struct StdStreams {
    pub stdin: SharedReader,
    pub stdout: SharedWriter,
    pub stderr: SharedWriter,
}

impl StdStreams {
    /// The process's own stdin/stdout/stderr, buffered as configured
    pub fn process(config: &IoConfig) -> Self {
        Self {
            stdin: SharedReader::stdin(),
            stdout: SharedWriter::stdout(config.buffer_output),
            stderr: SharedWriter::stderr(config.buffer_errors),
        }
    }
}

pub struct IoContext {
    settings: Settings,
    stdin: SharedReader,
    stdout: SharedWriter,
    stderr: SharedWriter,
    sequencer: InputSequencer,
    registry: StreamRegistry,
    record: CurrentRecord,
    writer: OutputWriter,
    shut_down: bool,
}

/// What shutdown released
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ShutdownSummary {
    pub input_closed: bool,
    pub streams_closed: usize,
    pub commands_waited: usize,
}

impl IoContext {
    pub fn new(config: IoConfig, streams: StdStreams) -> Result<Self> {
        let writer = OutputWriter::new(config.crlf);
        let registry = StreamRegistry::new(SubprocessBridge::new(&config.shell));
        Ok(Self {
            settings: Settings::new(config)?,
            stdin: streams.stdin,
            stdout: streams.stdout,
            stderr: streams.stderr,
            sequencer: InputSequencer::new(),
            registry,
            record: CurrentRecord::default(),
            writer,
            shut_down: false,
        })
    }

    fn ensure_open(&self) -> Result<()> {
        if self.shut_down {
            return Err(Error::invariant("I/O context used after shutdown"));
        }
        Ok(())
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut Settings {
        &mut self.settings
    }

    pub fn sequencer(&self) -> &InputSequencer {
        &self.sequencer
    }

    pub fn registry(&self) -> &StreamRegistry {
        &self.registry
    }

    pub fn record(&self) -> &CurrentRecord {
        &self.record
    }

    /// NR
    pub fn nr(&self) -> usize {
        self.sequencer.nr()
    }

    /// FNR
    pub fn fnr(&self) -> usize {
        self.sequencer.fnr()
    }

    /// FILENAME
    pub fn filename(&self) -> &str {
        self.sequencer.filename()
    }

    /// Read the next main-input record into `$0` and the fields.
    /// `Ok(false)` when the input is exhausted.
    pub fn next_record<R: Runtime>(&mut self, runtime: &mut R) -> Result<bool> {
        match self.getline(runtime)? {
            Some(record) => {
                self.set_record(record);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Plain `getline`/`getline var`: the next main-input record, left to
    /// the caller to store
    pub fn getline<R: Runtime>(&mut self, runtime: &mut R) -> Result<Option<Record>> {
        self.ensure_open()?;
        self.sequencer.next_record(runtime, &mut self.settings, &self.stdin)
    }

    /// `getline < file` and `cmd | getline`. Command reads count toward NR.
    pub fn getline_from(&mut self, name: &str, kind: Redirection) -> Result<Option<Record>> {
        self.ensure_open()?;
        let streams = Streams {
            config: self.settings.config(),
            stdin: &self.stdin,
            output: &self.stdout,
            errors: &self.stderr,
        };
        let record = self.registry.reader(name, kind, &streams)?.next_record()?;
        if record.is_some() && kind == Redirection::PipeFrom {
            self.sequencer.count_record();
        }
        Ok(record)
    }

    /// Install `record` as `$0` and split it
    pub fn set_record(&mut self, record: Record) {
        let paragraph = self.settings.paragraph_mode();
        self.record.set_record(record, self.settings.field_splitter(), paragraph);
    }

    /// Assign `$0` from text, re-splitting fields
    pub fn set_line(&mut self, line: &str) {
        let paragraph = self.settings.paragraph_mode();
        self.record.set_line(line, self.settings.field_splitter(), paragraph);
    }

    /// Assign `$index`
    pub fn set_field(&mut self, index: usize, value: String) {
        let ofs = self.settings.config().ofs.clone();
        self.record.set_field(index, value, &ofs, self.settings.field_splitter());
    }

    /// `nextfile`
    pub fn skip_file(&mut self) {
        self.sequencer.skip_file();
    }

    /// `print`: `text` plus ORS, to stdout or a redirection
    pub fn print(&mut self, text: &str, redirect: Option<(Redirection, &str)>) -> Result<()> {
        let ors = self.settings.config().ors.clone();
        let writer = self.writer;
        match redirect {
            None => writer.print_line(&mut self.stdout, text, &ors),
            Some((kind, name)) => {
                let stream = self.output_stream(kind, name)?;
                writer.print_line(stream, text, &ors)
            }
        }
    }

    /// `printf`: `text` as is, to stdout or a redirection
    pub fn write(&mut self, text: &str, redirect: Option<(Redirection, &str)>) -> Result<()> {
        let writer = self.writer;
        match redirect {
            None => writer.write(&mut self.stdout, text),
            Some((kind, name)) => {
                let stream = self.output_stream(kind, name)?;
                writer.write(stream, text)
            }
        }
    }

    fn output_stream(&mut self, kind: Redirection, name: &str) -> Result<&mut dyn Write> {
        self.ensure_open()?;
        let streams = Streams {
            config: self.settings.config(),
            stdin: &self.stdin,
            output: &self.stdout,
            errors: &self.stderr,
        };
        Ok(self.registry.writer(name, kind, &streams)?)
    }

    /// Report a non-fatal problem on the error sink
    pub fn warn(&mut self, message: &str) {
        tracing::warn!(message);
        let _ = writeln!(self.stderr, "{}", message);
    }

    /// `close(name)`
    pub fn close(&mut self, name: &str) -> i32 {
        self.registry.close(name)
    }

    /// `fflush()` with no argument flushes stdout and every redirection;
    /// with a name, just that stream. `Ok(false)` for an unknown name.
    pub fn flush(&mut self, name: Option<&str>) -> Result<bool> {
        match name {
            None | Some("") => {
                self.stdout.flush()?;
                self.registry.flush_all()?;
                Ok(true)
            }
            Some(name) => self.registry.flush(name),
        }
    }

    /// Release everything, in order: the current input, every redirection,
    /// every command, then the buffered standard sinks. Safe to call twice;
    /// the second call does nothing.
    pub fn shutdown(&mut self) -> ShutdownSummary {
        if self.shut_down {
            return ShutdownSummary::default();
        }
        self.shut_down = true;

        let input_closed = self.sequencer.current().is_some();
        self.sequencer.close_current();

        let CloseSummary {
            streams_closed,
            commands_waited,
        } = self.registry.close_all();

        if self.settings.config().buffer_output {
            if let Err(e) = self.stdout.flush() {
                tracing::warn!(error = %e, "can't flush output");
            }
        }
        if self.settings.config().buffer_errors {
            if let Err(e) = self.stderr.flush() {
                tracing::warn!(error = %e, "can't flush error output");
            }
        }

        ShutdownSummary {
            input_closed,
            streams_closed,
            commands_waited,
        }
    }
}

impl Drop for IoContext {
    fn drop(&mut self) {
        self.shutdown();
    }
}
