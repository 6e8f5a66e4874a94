use std::borrow::Cow;
use std::io::Write;

use crate::error::Result;

/// Collapse "\r\n" to "\n", then expand every "\n" to "\r\n"
pub fn normalize_crlf(s: &str) -> Cow<'_, str> {
    if !s.contains('\n') {
        return Cow::Borrowed(s);
    }
    Cow::Owned(s.replace("\r\n", "\n").replace('\n', "\r\n"))
}

/// Writes text to a stream, producing CRLF line endings when configured
#[derive(Debug, Clone, Copy)]
pub struct OutputWriter {
    crlf: bool,
}

impl OutputWriter {
    pub fn new(crlf: bool) -> Self {
        Self { crlf }
    }

    pub fn write<W: Write + ?Sized>(&self, writer: &mut W, text: &str) -> Result<()> {
        if self.crlf {
            writer.write_all(normalize_crlf(text).as_bytes())?;
        } else {
            writer.write_all(text.as_bytes())?;
        }
        Ok(())
    }

    /// `text` followed by the output record separator
    pub fn print_line<W: Write + ?Sized>(&self, writer: &mut W, text: &str, ors: &str) -> Result<()> {
        self.write(writer, text)?;
        self.write(writer, ors)
    }
}
