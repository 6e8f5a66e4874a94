//! Main input: walking ARGV and pulling records from each source in turn.

use std::fs::File;

use crate::context::Settings;
use crate::error::{Error, Result};
use crate::record::{Record, RecordReader, RecordSplitter};
use crate::runtime::Runtime;
use crate::sink::SharedReader;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Stdin,
    File,
    Command,
}

/// The source records are currently read from, with its bound splitter
pub struct InputSource {
    kind: SourceKind,
    name: String,
    records: RecordReader,
}

impl InputSource {
    pub fn stdin(stdin: &SharedReader, settings: &Settings) -> Self {
        tracing::debug!("reading standard input");
        Self {
            kind: SourceKind::Stdin,
            name: String::new(),
            records: RecordReader::new(Box::new(stdin.clone()), settings.config()),
        }
    }

    pub fn file(name: &str, settings: &Settings) -> Result<Self> {
        if settings.config().no_file_reads {
            return Err(Error::FileReadsDisabled);
        }
        let file = File::open(name).map_err(|e| Error::open(name, e))?;
        tracing::debug!(name, "opened input file");
        Ok(Self {
            kind: SourceKind::File,
            name: name.to_string(),
            records: RecordReader::new(Box::new(file), settings.config()),
        })
    }

    pub fn kind(&self) -> SourceKind {
        self.kind
    }

    /// FILENAME for this source; empty for stdin
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn splitter(&self) -> RecordSplitter {
        self.records.splitter()
    }

    /// Release the source. Standard input itself stays open.
    pub fn close(self) {
        if self.kind != SourceKind::Stdin {
            tracing::debug!(name = %self.name, "closing input source");
        }
    }
}

/// Position in ARGV. Only ever moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArgvCursor {
    /// Next ARGV index to look at
    pub index: usize,
    /// ARGC as of the last advance
    pub argc: usize,
    /// Set once a file (or "-") was selected, so stdin isn't used as fallback
    pub had_files: bool,
    /// Regular files opened so far
    pub files_opened: usize,
}

impl Default for ArgvCursor {
    fn default() -> Self {
        Self {
            index: 1,
            argc: 0,
            had_files: false,
            files_opened: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequencerState {
    NoSource,
    Sourced,
    Exhausted,
}

/// Drives the multi-file input loop and keeps NR, FNR and FILENAME
#[derive(Default)]
pub struct InputSequencer {
    cursor: ArgvCursor,
    current: Option<InputSource>,
    exhausted: bool,
    filename: String,
    nr: usize,
    fnr: usize,
}

impl InputSequencer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cursor(&self) -> &ArgvCursor {
        &self.cursor
    }

    pub fn current(&self) -> Option<&InputSource> {
        self.current.as_ref()
    }

    pub fn state(&self) -> SequencerState {
        match (&self.current, self.exhausted) {
            (Some(_), _) => SequencerState::Sourced,
            (None, true) => SequencerState::Exhausted,
            (None, false) => SequencerState::NoSource,
        }
    }

    pub fn nr(&self) -> usize {
        self.nr
    }

    pub fn fnr(&self) -> usize {
        self.fnr
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Count a record read outside the main input (`cmd | getline`)
    pub fn count_record(&mut self) {
        self.nr += 1;
    }

    /// Next record from the main input, opening sources from ARGV as needed.
    /// `Ok(None)` once every source is exhausted.
    pub fn next_record<R: Runtime>(
        &mut self,
        runtime: &mut R,
        settings: &mut Settings,
        stdin: &SharedReader,
    ) -> Result<Option<Record>> {
        loop {
            if self.current.is_none() {
                match self.open_next(runtime, settings, stdin)? {
                    Some(source) => {
                        self.filename = source.name().to_string();
                        self.fnr = 0;
                        self.exhausted = false;
                        self.current = Some(source);
                    }
                    None => {
                        self.exhausted = true;
                        return Ok(None);
                    }
                }
            }
            let Some(source) = self.current.as_mut() else {
                continue;
            };

            match source.records.next_record()? {
                Some(record) => {
                    self.nr += 1;
                    self.fnr += 1;
                    return Ok(Some(record));
                }
                None => self.close_current(),
            }
        }
    }

    /// `nextfile`: drop the current source; the next read moves on in ARGV
    pub fn skip_file(&mut self) {
        self.close_current();
    }

    /// Close the current source, if any
    pub fn close_current(&mut self) {
        if let Some(source) = self.current.take() {
            source.close();
        }
    }

    fn open_next<R: Runtime>(
        &mut self,
        runtime: &mut R,
        settings: &mut Settings,
        stdin: &SharedReader,
    ) -> Result<Option<InputSource>> {
        loop {
            self.cursor.argc = runtime.argc();
            if self.cursor.index >= self.cursor.argc {
                if self.cursor.had_files {
                    return Ok(None);
                }
                // No file arguments at all: read stdin, once
                self.cursor.had_files = true;
                return Ok(Some(InputSource::stdin(stdin, settings)));
            }

            // Read ARGV without creating missing elements
            let arg = runtime
                .argv(self.cursor.index)
                .map(|value| runtime.value_to_string(value))
                .unwrap_or_default();
            self.cursor.index += 1;

            if let Some((name, value)) = parse_assignment(&arg) {
                tracing::debug!(name, "assignment from ARGV");
                runtime.set_var(name, &value)?;
                settings.assign_special(name, &value)?;
                continue;
            }
            if arg.is_empty() {
                continue;
            }
            if arg == "-" {
                self.cursor.had_files = true;
                return Ok(Some(InputSource::stdin(stdin, settings)));
            }

            let source = InputSource::file(&arg, settings)?;
            self.cursor.had_files = true;
            self.cursor.files_opened += 1;
            return Ok(Some(source));
        }
    }
}

/// Split a `name=value` argument. The value has escape sequences processed.
pub fn parse_assignment(arg: &str) -> Option<(&str, String)> {
    let (name, value) = arg.split_once('=')?;
    let mut chars = name.chars();
    let first = chars.next()?;
    if !(first == '_' || first.is_ascii_alphabetic()) {
        return None;
    }
    if !chars.all(|c| c == '_' || c.is_ascii_alphanumeric()) {
        return None;
    }
    Some((name, unescape(value)))
}

fn unescape(value: &str) -> String {
    if !value.contains('\\') {
        return value.to_string();
    }

    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('a') => out.push('\x07'),
            Some('b') => out.push('\x08'),
            Some('f') => out.push('\x0c'),
            Some('v') => out.push('\x0b'),
            Some('\\') => out.push('\\'),
            Some('"') => out.push('"'),
            Some('/') => out.push('/'),
            Some(d @ '0'..='7') => {
                let mut code = d.to_digit(8).unwrap_or(0);
                for _ in 0..2 {
                    match chars.peek().and_then(|c| c.to_digit(8)) {
                        Some(digit) => {
                            code = code * 8 + digit;
                            chars.next();
                        }
                        None => break,
                    }
                }
                out.push(char::from_u32(code).unwrap_or('\u{fffd}'));
            }
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}
