//! rawk-io - the input/output layer of an AWK interpreter
//!
//! This crate turns files, standard input and shell commands into records,
//! walks `ARGV` the way AWK does (including `var=value` arguments), caches
//! redirected files and pipes by name, and tears everything down in order
//! when the program ends. The evaluator plugs in through the [`Runtime`]
//! trait.
//!
//! # Example
//!
//! ```
//! use std::io::Cursor;
//! use rawk_io::{Globals, IoConfig, IoContext, MemorySink, SharedReader, SharedWriter, StdStreams};
//!
//! let out = MemorySink::new();
//! let streams = StdStreams {
//!     stdin: SharedReader::new(Box::new(Cursor::new(b"hello world\nfoo bar\n".to_vec()))),
//!     stdout: SharedWriter::new(Box::new(out.clone())),
//!     stderr: SharedWriter::new(Box::new(std::io::sink())),
//! };
//! let mut ctx = IoContext::new(IoConfig::default(), streams).unwrap();
//! let mut globals = Globals::new(vec!["awk".to_string()]);
//!
//! while ctx.next_record(&mut globals).unwrap() {
//!     let first = ctx.record().field(1).to_string();
//!     ctx.print(&first, None).unwrap();
//! }
//! ctx.shutdown();
//!
//! assert_eq!(out.contents(), "hello\nfoo\n");
//! ```
//!
//! # Paragraph Mode Example
//!
//! ```
//! use std::io::Cursor;
//! use rawk_io::{Globals, IoConfig, IoContext, MemorySink, SharedReader, SharedWriter, StdStreams};
//!
//! let streams = StdStreams {
//!     stdin: SharedReader::new(Box::new(Cursor::new(b"a\nb\n\n\n\nc\n".to_vec()))),
//!     stdout: SharedWriter::new(Box::new(MemorySink::new())),
//!     stderr: SharedWriter::new(Box::new(MemorySink::new())),
//! };
//! let mut ctx = IoContext::new(IoConfig::default().with_rs(""), streams).unwrap();
//! let mut globals = Globals::new(vec!["awk".to_string()]);
//!
//! let mut records = Vec::new();
//! while ctx.next_record(&mut globals).unwrap() {
//!     records.push(ctx.record().text().to_string());
//! }
//! assert_eq!(records, vec!["a\nb", "c"]);
//! ```

pub mod config;
pub mod context;
pub mod error;
pub mod fields;
pub mod input;
pub mod output;
pub mod record;
pub mod redirect;
pub mod runtime;
pub mod sink;

pub use config::{IoConfig, JSON_RS, JsonPolicy};
pub use context::{IoContext, Settings, ShutdownSummary, StdStreams};
pub use error::{Error, Result};
pub use fields::{CurrentRecord, FieldSplitter};
pub use input::{InputSequencer, InputSource, SourceKind};
pub use output::{OutputWriter, normalize_crlf};
pub use record::{Record, RecordReader, RecordSplitter};
pub use redirect::{Redirection, StreamHandle, StreamRegistry, SubprocessBridge};
pub use runtime::{Globals, Runtime};
pub use sink::{MemorySink, SharedReader, SharedWriter};
