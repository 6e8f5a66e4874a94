//! Turning byte streams into records.
//!
//! A [`RecordReader`] owns one input stream together with the splitter that
//! was chosen for it when it was opened. Text sources go through a
//! [`Scanner`], JSON sources through [`JsonRecords`].

mod json;
mod split;

use std::collections::BTreeMap;
use std::io::{ErrorKind, Read};

use crate::config::IoConfig;
use crate::error::{Error, Result};

pub use json::JsonRecords;
pub use split::{RecordSplitter, Step};

/// Boxed byte source behind a reader
pub type Input = Box<dyn Read + Send>;

/// One record as produced by a reader
#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    /// A text record, terminator excluded
    Text(String),
    /// A JSON object: its text as it appeared in the input, and its members
    /// flattened to key -> string (nested values stay JSON text)
    Object {
        text: String,
        fields: BTreeMap<String, String>,
    },
    /// A JSON value that carried no object (null, or tolerated junk)
    NoObject,
}

impl Record {
    /// The record as `$0` sees it
    pub fn text(&self) -> String {
        match self {
            Record::Text(s) => s.clone(),
            Record::Object { text, .. } => text.clone(),
            Record::NoObject => String::new(),
        }
    }
}

/// Buffered reader that cuts records out of a byte stream
pub struct Scanner {
    input: Input,
    splitter: RecordSplitter,
    buf: Vec<u8>,
    start: usize,
    at_eof: bool,
    read_size: usize,
    max_record_length: usize,
}

impl Scanner {
    pub fn new(input: Input, splitter: RecordSplitter, config: &IoConfig) -> Self {
        Self {
            input,
            splitter,
            buf: Vec::with_capacity(config.input_buf_size.min(config.max_record_length)),
            start: 0,
            at_eof: false,
            read_size: config.input_buf_size.max(1),
            max_record_length: config.max_record_length,
        }
    }

    pub fn splitter(&self) -> RecordSplitter {
        self.splitter
    }

    /// Next record, `Ok(None)` once the stream is exhausted
    pub fn next_record(&mut self) -> Result<Option<String>> {
        loop {
            let data = &self.buf[self.start..];
            match self.splitter.split(data, self.at_eof) {
                Step::Record { advance, text } => {
                    // The record and its terminator must fit in the limit
                    let limit = self.max_record_length;
                    if text.len() > limit || (text.len() == limit && advance > text.end) {
                        return Err(Error::RecordTooLong { limit });
                    }
                    let record = String::from_utf8_lossy(&data[text]).into_owned();
                    self.start += advance;
                    return Ok(Some(record));
                }
                Step::Skip(advance) => self.start += advance,
                Step::End => {
                    self.buf.clear();
                    self.start = 0;
                    return Ok(None);
                }
                Step::NeedMore => {
                    if self.at_eof {
                        return Err(Error::invariant("splitter asked for more data at EOF"));
                    }
                    self.fill()?;
                }
            }
        }
    }

    fn fill(&mut self) -> Result<()> {
        let cap = self.max_record_length + self.splitter.lookahead();
        if self.buf.len() - self.start >= cap {
            return Err(Error::RecordTooLong {
                limit: self.max_record_length,
            });
        }
        if self.start > 0 {
            self.buf.drain(..self.start);
            self.start = 0;
        }

        let room = cap - self.buf.len();
        let want = self.read_size.min(room);
        let old_len = self.buf.len();
        self.buf.resize(old_len + want, 0);
        let n = loop {
            match self.input.read(&mut self.buf[old_len..]) {
                Ok(n) => break n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    self.buf.truncate(old_len);
                    return Err(Error::read(e));
                }
            }
        };
        self.buf.truncate(old_len + n);
        if n == 0 {
            self.at_eof = true;
        }
        Ok(())
    }
}

/// A source's record stream: text or NDJSON
pub enum RecordReader {
    Text(Scanner),
    Json(JsonRecords),
}

impl RecordReader {
    /// Bind a fresh splitter, chosen from the current RS, to `input`
    pub fn new(input: Input, config: &IoConfig) -> Self {
        let splitter = RecordSplitter::from_rs(&config.rs);
        tracing::debug!(?splitter, "binding record splitter");
        if splitter.is_json() {
            RecordReader::Json(JsonRecords::new(input, config))
        } else {
            RecordReader::Text(Scanner::new(input, splitter, config))
        }
    }

    /// A reader that is exhausted from the start
    pub fn empty(config: &IoConfig) -> Self {
        Self::new(Box::new(std::io::empty()), config)
    }

    pub fn splitter(&self) -> RecordSplitter {
        match self {
            RecordReader::Text(scanner) => scanner.splitter(),
            RecordReader::Json(_) => RecordSplitter::Json,
        }
    }

    pub fn next_record(&mut self) -> Result<Option<Record>> {
        match self {
            RecordReader::Text(scanner) => Ok(scanner.next_record()?.map(Record::Text)),
            RecordReader::Json(json) => json.next_record(),
        }
    }
}
