//! Settings consulted by the I/O layer.
//!
//! Most of these are read-only for the life of a run. The separators (`RS`,
//! `FS`, `OFS`, `ORS`, `FPAT`, `FIELDWIDTHS`) can be changed by the program
//! or by `var=value` arguments; a changed `RS` only affects sources opened
//! afterwards.

/// Record separator value that selects newline-delimited JSON input
pub const JSON_RS: &str = "\0json";

/// Default cap on a single buffered record
pub const DEFAULT_MAX_RECORD_LENGTH: usize = 1024 * 1024;

/// Default size of one read from an input source
pub const DEFAULT_INPUT_BUF_SIZE: usize = 64 * 1024;

/// How the NDJSON reader treats values it can't turn into a record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JsonPolicy {
    /// Decode errors and non-object values are errors
    #[default]
    Strict,
    /// Decode errors end the source, non-object values become empty records
    Lenient,
}

#[derive(Debug, Clone)]
pub struct IoConfig {
    /// Record separator (RS)
    pub rs: String,
    /// Field separator (FS)
    pub fs: String,
    /// Output field separator (OFS)
    pub ofs: String,
    /// Output record separator (ORS)
    pub ors: String,
    /// Field pattern (FPAT) - gawk extension
    pub fpat: String,
    /// Fixed field widths (FIELDWIDTHS) - gawk extension
    pub fieldwidths: String,

    pub max_record_length: usize,
    pub input_buf_size: usize,

    /// Wrap the primary output in a buffer that is flushed at shutdown
    pub buffer_output: bool,
    /// Same for the error sink
    pub buffer_errors: bool,

    /// Translate "\n" to "\r\n" on output
    pub crlf: bool,

    /// Sandbox: refuse to open files for reading
    pub no_file_reads: bool,

    pub json_policy: JsonPolicy,

    /// Shell used to run pipe commands, invoked as `<shell> -c <command>`
    pub shell: String,
}

impl Default for IoConfig {
    fn default() -> Self {
        Self {
            rs: "\n".to_string(),
            fs: " ".to_string(),
            ofs: " ".to_string(),
            ors: "\n".to_string(),
            fpat: String::new(),
            fieldwidths: String::new(),
            max_record_length: DEFAULT_MAX_RECORD_LENGTH,
            input_buf_size: DEFAULT_INPUT_BUF_SIZE,
            buffer_output: false,
            buffer_errors: false,
            crlf: cfg!(windows),
            no_file_reads: false,
            json_policy: JsonPolicy::Strict,
            shell: "sh".to_string(),
        }
    }
}

impl IoConfig {
    pub fn with_rs(mut self, rs: &str) -> Self {
        self.rs = rs.to_string();
        self
    }

    pub fn with_fs(mut self, fs: &str) -> Self {
        self.fs = fs.to_string();
        self
    }

    pub fn with_ofs(mut self, ofs: &str) -> Self {
        self.ofs = ofs.to_string();
        self
    }

    pub fn with_ors(mut self, ors: &str) -> Self {
        self.ors = ors.to_string();
        self
    }

    pub fn with_max_record_length(mut self, limit: usize) -> Self {
        self.max_record_length = limit;
        self
    }

    pub fn with_input_buf_size(mut self, size: usize) -> Self {
        self.input_buf_size = size.max(1);
        self
    }

    pub fn with_buffered_output(mut self, output: bool, errors: bool) -> Self {
        self.buffer_output = output;
        self.buffer_errors = errors;
        self
    }

    pub fn with_crlf(mut self, crlf: bool) -> Self {
        self.crlf = crlf;
        self
    }

    pub fn with_no_file_reads(mut self, enabled: bool) -> Self {
        self.no_file_reads = enabled;
        self
    }

    pub fn with_shell(mut self, shell: &str) -> Self {
        self.shell = shell.to_string();
        self
    }

    pub fn with_json_policy(mut self, policy: JsonPolicy) -> Self {
        self.json_policy = policy;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = IoConfig::default();
        assert_eq!(config.rs, "\n");
        assert_eq!(config.fs, " ");
        assert_eq!(config.ors, "\n");
        assert_eq!(config.max_record_length, DEFAULT_MAX_RECORD_LENGTH);
        assert!(!config.no_file_reads);
        assert_eq!(config.json_policy, JsonPolicy::Strict);
    }

    #[test]
    fn test_builders() {
        let config = IoConfig::default()
            .with_rs(";")
            .with_fs(",")
            .with_input_buf_size(0)
            .with_no_file_reads(true);
        assert_eq!(config.rs, ";");
        assert_eq!(config.fs, ",");
        assert_eq!(config.input_buf_size, 1);
        assert!(config.no_file_reads);
    }
}
