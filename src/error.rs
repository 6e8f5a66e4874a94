use thiserror::Error;

/// All error types for rawk-io
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("can't open {name}: {source}")]
    Open {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("error reading from input: {source}")]
    Read {
        #[source]
        source: std::io::Error,
    },

    #[error("record too long (limit is {limit} bytes)")]
    RecordTooLong { limit: usize },

    #[error("can't write to reader stream")]
    WriteToReader { name: String },

    #[error("can't read from writer stream")]
    ReadFromWriter { name: String },

    #[error("can't assign to {name}: {message}")]
    Assignment { name: String, message: String },

    #[error("can't read from file due to sandbox mode")]
    FileReadsDisabled,

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("JSON record is not an object")]
    NotAnObject,

    #[error("regex error: {0}")]
    Regex(#[from] regex::Error),

    #[error("internal error: {message}")]
    InvariantViolated { message: String },
}

impl Error {
    pub fn open(name: impl Into<String>, source: std::io::Error) -> Self {
        Self::Open {
            name: name.into(),
            source,
        }
    }

    pub fn read(source: std::io::Error) -> Self {
        Self::Read { source }
    }

    pub fn assignment(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Assignment {
            name: name.into(),
            message: message.into(),
        }
    }

    pub fn invariant(message: impl Into<String>) -> Self {
        Self::InvariantViolated {
            message: message.into(),
        }
    }
}

/// Result type alias for rawk-io operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err = Error::open("data.txt", io_err);
        assert!(matches!(err, Error::Open { .. }));
        let msg = format!("{}", err);
        assert!(msg.contains("data.txt"));
        assert!(msg.contains("file not found"));
    }

    #[test]
    fn test_mismatch_messages() {
        let err = Error::WriteToReader { name: "in.txt".into() };
        assert_eq!(format!("{}", err), "can't write to reader stream");
        let err = Error::ReadFromWriter { name: "out.txt".into() };
        assert_eq!(format!("{}", err), "can't read from writer stream");
    }

    #[test]
    fn test_record_too_long() {
        let err = Error::RecordTooLong { limit: 16 };
        assert!(format!("{}", err).contains("16 bytes"));
    }

    #[test]
    fn test_read_error_is_not_io() {
        let io_err = std::io::Error::other("disk on fire");
        let err = Error::read(io_err);
        assert!(matches!(err, Error::Read { .. }));
        assert!(format!("{}", err).contains("error reading from input"));
    }

    #[test]
    fn test_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
        assert!(format!("{}", err).contains("I/O error"));
    }

    #[test]
    fn test_regex_error() {
        let re_err = regex::Regex::new("[invalid").unwrap_err();
        let err: Error = re_err.into();
        assert!(matches!(err, Error::Regex(_)));
        assert!(format!("{}", err).contains("regex error"));
    }

    #[test]
    fn test_invariant_error() {
        let err = Error::invariant("unexpected redirect type");
        assert!(format!("{}", err).contains("unexpected redirect type"));
    }
}
