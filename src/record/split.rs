use std::ops::Range;

use crate::config::JSON_RS;

/// Record boundary policy, chosen from RS when a source is opened
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordSplitter {
    /// RS = "\n": one line per record, trailing CR dropped
    Newline,
    /// RS = "": records are separated by one or more blank lines
    Paragraph,
    /// Any other RS: split on its first byte
    Byte(u8),
    /// RS = JSON_RS: one JSON value per record
    Json,
}

/// Outcome of looking for one record in the buffered bytes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Consume `advance` bytes; the record is `text` within the same buffer
    Record { advance: usize, text: Range<usize> },
    /// Consume `advance` bytes that hold no record
    Skip(usize),
    /// No boundary yet and the source isn't exhausted
    NeedMore,
    /// Source exhausted and nothing left
    End,
}

impl RecordSplitter {
    pub fn from_rs(rs: &str) -> Self {
        match rs {
            "\n" => RecordSplitter::Newline,
            "" => RecordSplitter::Paragraph,
            JSON_RS => RecordSplitter::Json,
            _ => RecordSplitter::Byte(rs.as_bytes()[0]),
        }
    }

    pub fn is_json(&self) -> bool {
        matches!(self, RecordSplitter::Json)
    }

    /// Bytes past a record's terminator the splitter may need to see before
    /// it can decide. Paragraph mode looks at the next line for a blank one.
    pub fn lookahead(&self) -> usize {
        match self {
            RecordSplitter::Paragraph => 2,
            _ => 0,
        }
    }

    /// Find the next record in `data`. The JSON policy isn't byte oriented
    /// and always reports `End` here.
    pub fn split(&self, data: &[u8], at_eof: bool) -> Step {
        match *self {
            RecordSplitter::Newline => split_lines(data, at_eof),
            RecordSplitter::Paragraph => split_paragraphs(data, at_eof),
            RecordSplitter::Byte(sep) => split_on_byte(data, at_eof, sep),
            RecordSplitter::Json => Step::End,
        }
    }
}

fn drop_cr(data: &[u8], mut end: usize, start: usize) -> usize {
    if end > start && data[end - 1] == b'\r' {
        end -= 1;
    }
    end
}

fn split_lines(data: &[u8], at_eof: bool) -> Step {
    if at_eof && data.is_empty() {
        return Step::End;
    }
    if let Some(i) = data.iter().position(|&b| b == b'\n') {
        return Step::Record {
            advance: i + 1,
            text: 0..drop_cr(data, i, 0),
        };
    }
    if at_eof {
        return Step::Record {
            advance: data.len(),
            text: 0..drop_cr(data, data.len(), 0),
        };
    }
    Step::NeedMore
}

fn split_on_byte(data: &[u8], at_eof: bool, sep: u8) -> Step {
    if at_eof && data.is_empty() {
        return Step::End;
    }
    if let Some(i) = data.iter().position(|&b| b == sep) {
        return Step::Record {
            advance: i + 1,
            text: 0..i,
        };
    }
    if at_eof {
        return Step::Record {
            advance: data.len(),
            text: 0..data.len(),
        };
    }
    Step::NeedMore
}

fn is_blank_byte(b: u8) -> bool {
    b == b'\n' || b == b'\r'
}

/// Does a blank line start at `pos`? `None` means more data is needed to tell.
fn blank_line_at(data: &[u8], pos: usize, at_eof: bool) -> Option<bool> {
    match data.get(pos) {
        None => at_eof.then_some(false),
        Some(b'\n') => Some(true),
        Some(b'\r') => match data.get(pos + 1) {
            None => at_eof.then_some(false),
            Some(&b) => Some(b == b'\n'),
        },
        Some(_) => Some(false),
    }
}

fn split_paragraphs(data: &[u8], at_eof: bool) -> Step {
    let start = data.iter().position(|&b| !is_blank_byte(b)).unwrap_or(data.len());
    if start == data.len() {
        // Only blank lines so far
        return match (at_eof, start) {
            (true, 0) => Step::End,
            (_, 0) => Step::NeedMore,
            _ => Step::Skip(start),
        };
    }

    let mut search = start;
    while let Some(offset) = data[search..].iter().position(|&b| b == b'\n') {
        let i = search + offset;
        match blank_line_at(data, i + 1, at_eof) {
            Some(true) => {
                let mut advance = i + 1;
                while advance < data.len() && is_blank_byte(data[advance]) {
                    advance += 1;
                }
                return Step::Record {
                    advance,
                    text: start..drop_cr(data, i, start),
                };
            }
            Some(false) => search = i + 1,
            None => return Step::NeedMore,
        }
    }

    if at_eof {
        let mut end = data.len();
        while end > start && is_blank_byte(data[end - 1]) {
            end -= 1;
        }
        return Step::Record {
            advance: data.len(),
            text: start..end,
        };
    }
    Step::NeedMore
}
