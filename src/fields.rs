//! Field splitting and the current record (`$0`, `$1`..`$NF`).

use std::collections::BTreeMap;

use regex::Regex;

use crate::config::IoConfig;
use crate::error::Result;
use crate::record::Record;

/// How a record is cut into fields
#[derive(Debug, Clone)]
pub enum FieldSplitter {
    /// FS = " ": runs of blanks and newlines separate, ends are trimmed
    Whitespace,
    /// Single-character FS, taken literally
    Char(char),
    /// Any longer FS is a regex
    Regex(Regex),
    /// FPAT: each match is a field
    Pattern(Regex),
    /// FIELDWIDTHS: fixed column widths
    Widths(Vec<usize>),
}

impl FieldSplitter {
    /// Compile the active policy. FPAT wins over FIELDWIDTHS, which wins over FS.
    pub fn from_config(config: &IoConfig) -> Result<Self> {
        if !config.fpat.is_empty() {
            return Ok(FieldSplitter::Pattern(Regex::new(&config.fpat)?));
        }
        if !config.fieldwidths.is_empty() {
            let widths = config
                .fieldwidths
                .split_whitespace()
                .filter_map(|s| s.parse().ok())
                .collect();
            return Ok(FieldSplitter::Widths(widths));
        }
        Self::from_fs(&config.fs)
    }

    pub fn from_fs(fs: &str) -> Result<Self> {
        if fs == " " {
            return Ok(FieldSplitter::Whitespace);
        }
        let mut chars = fs.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Ok(FieldSplitter::Char(c)),
            _ => Ok(FieldSplitter::Regex(Regex::new(fs)?)),
        }
    }

    /// Split `record` into fields. In paragraph mode newline always separates.
    pub fn split(&self, record: &str, paragraph: bool) -> Vec<String> {
        if record.is_empty() {
            return Vec::new();
        }

        match self {
            FieldSplitter::Whitespace => record.split_whitespace().map(String::from).collect(),
            FieldSplitter::Char(sep) => {
                if paragraph {
                    record
                        .split(|c: char| c == *sep || c == '\n')
                        .map(String::from)
                        .collect()
                } else {
                    record.split(*sep).map(String::from).collect()
                }
            }
            FieldSplitter::Regex(regex) => {
                if paragraph {
                    record
                        .split('\n')
                        .flat_map(|line| regex.split(line))
                        .map(String::from)
                        .collect()
                } else {
                    regex.split(record).map(String::from).collect()
                }
            }
            FieldSplitter::Pattern(regex) => regex
                .find_iter(record)
                .map(|m| m.as_str().to_string())
                .collect(),
            FieldSplitter::Widths(widths) => {
                let chars: Vec<char> = record.chars().collect();
                let mut fields = Vec::with_capacity(widths.len());
                let mut pos = 0;
                for &width in widths {
                    if pos >= chars.len() {
                        break;
                    }
                    let end = (pos + width).min(chars.len());
                    fields.push(chars[pos..end].iter().collect());
                    pos = end;
                }
                fields
            }
        }
    }
}

/// The record currently being processed and its fields
#[derive(Debug, Clone, Default)]
pub struct CurrentRecord {
    text: String,
    fields: Vec<String>,
    object: Option<BTreeMap<String, String>>,
    no_object: bool,
}

impl CurrentRecord {
    /// Replace `$0` and recompute the fields
    pub fn set_line(&mut self, line: &str, splitter: &FieldSplitter, paragraph: bool) {
        self.text = line.to_string();
        self.fields = splitter.split(line, paragraph);
        self.object = None;
        self.no_object = false;
    }

    /// Install a record produced by a reader
    pub fn set_record(&mut self, record: Record, splitter: &FieldSplitter, paragraph: bool) {
        match record {
            Record::Text(line) => {
                self.fields = splitter.split(&line, paragraph);
                self.text = line;
                self.object = None;
                self.no_object = false;
            }
            Record::Object { text, fields } => {
                self.text = text;
                self.fields.clear();
                self.object = Some(fields);
                self.no_object = false;
            }
            Record::NoObject => {
                self.text.clear();
                self.fields.clear();
                self.object = None;
                self.no_object = true;
            }
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn nf(&self) -> usize {
        self.fields.len()
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// `$index`; out-of-range fields are empty
    pub fn field(&self, index: usize) -> &str {
        if index == 0 {
            &self.text
        } else {
            self.fields.get(index - 1).map(String::as_str).unwrap_or("")
        }
    }

    /// Assign `$index`, rebuilding `$0` with OFS (or re-splitting for `$0`)
    pub fn set_field(&mut self, index: usize, value: String, ofs: &str, splitter: &FieldSplitter) {
        if index == 0 {
            self.set_line(&value, splitter, false);
            return;
        }
        if self.fields.len() < index {
            self.fields.resize(index, String::new());
        }
        self.fields[index - 1] = value;
        self.text = self.fields.join(ofs);
    }

    /// Value for `key` when the record came from a JSON object
    pub fn json_field(&self, key: &str) -> Option<&str> {
        self.object.as_ref()?.get(key).map(String::as_str)
    }

    pub fn is_object(&self) -> bool {
        self.object.is_some()
    }

    /// Whether the record was a JSON value with no object in it
    pub fn is_no_object(&self) -> bool {
        self.no_object
    }
}
