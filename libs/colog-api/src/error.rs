use std::fmt;

/// Error kind for log file errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Open/create/read/write/close failed, or the file content is corrupt.
    Io,
    /// Payload matches none of the accepted encodings, or fails validation.
    Decode,
    /// No message type is registered for the topic.
    Schema,
    /// Requested compression codec is unknown or unsupported.
    Codec,
    /// Invalid configuration. Permanent; fail at startup.
    Config,
    /// Malformed log file path.
    Path,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::Io => f.write_str("io"),
            ErrorKind::Decode => f.write_str("decode"),
            ErrorKind::Schema => f.write_str("schema"),
            ErrorKind::Codec => f.write_str("codec"),
            ErrorKind::Config => f.write_str("config"),
            ErrorKind::Path => f.write_str("path"),
        }
    }
}

/// Error returned by every reader, writer and factory method.
///
/// Nothing is retried or downgraded on the way out: the caller owns the
/// skip/retry policy and decides it from `kind`.
#[derive(Debug)]
pub struct LogFileError {
    pub kind: ErrorKind,
    pub message: String,
}

impl LogFileError {
    pub fn io(msg: impl Into<String>) -> Self {
        Self { kind: ErrorKind::Io, message: msg.into() }
    }

    pub fn decode(msg: impl Into<String>) -> Self {
        Self { kind: ErrorKind::Decode, message: msg.into() }
    }

    pub fn schema(msg: impl Into<String>) -> Self {
        Self { kind: ErrorKind::Schema, message: msg.into() }
    }

    pub fn codec(msg: impl Into<String>) -> Self {
        Self { kind: ErrorKind::Codec, message: msg.into() }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self { kind: ErrorKind::Config, message: msg.into() }
    }

    pub fn path(msg: impl Into<String>) -> Self {
        Self { kind: ErrorKind::Path, message: msg.into() }
    }

    /// Add context to the error, preserving the original ErrorKind.
    ///
    /// Produces: `"context: original message"`.
    pub fn with_context(self, ctx: impl fmt::Display) -> Self {
        Self {
            kind: self.kind,
            message: format!("{ctx}: {}", self.message),
        }
    }
}

impl fmt::Display for LogFileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for LogFileError {}

// ---------------------------------------------------------------------------
// From impls: standard error types → LogFileError with correct ErrorKind
// ---------------------------------------------------------------------------

impl From<std::io::Error> for LogFileError {
    fn from(e: std::io::Error) -> Self {
        Self::io(e.to_string())
    }
}

impl From<serde_json::Error> for LogFileError {
    fn from(e: serde_json::Error) -> Self {
        Self::decode(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_context_keeps_kind() {
        let err = LogFileError::schema("no message type").with_context("topic 'clicks'");
        assert_eq!(err.kind, ErrorKind::Schema);
        assert_eq!(err.message, "topic 'clicks': no message type");
        assert_eq!(err.to_string(), "schema: topic 'clicks': no message type");
    }

    #[test]
    fn test_io_error_maps_to_io_kind() {
        let err: LogFileError = std::io::Error::new(std::io::ErrorKind::NotFound, "gone").into();
        assert_eq!(err.kind, ErrorKind::Io);
    }

    #[test]
    fn test_json_error_maps_to_decode_kind() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: LogFileError = json_err.into();
        assert_eq!(err.kind, ErrorKind::Decode);
    }
}
