//! Error and result types.

use std::sync::Arc;

/// Convenience alias used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// All errors the codec can produce.
///
/// `Clone` is deliberate: a row-stream session that fails becomes terminal
/// and replays its first error on every subsequent call, which requires
/// handing the same error out more than once. I/O errors are wrapped in an
/// [`Arc`] to keep that cheap.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    /// Underlying transport failure, including truncated input
    /// (`ErrorKind::UnexpectedEof`).
    #[error("io error: {0}")]
    Io(Arc<std::io::Error>),

    /// Malformed bytes: bad discriminants, oversized lengths, varint
    /// overflow, out-of-range indexes.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// A column's negotiated type disagrees with the caller's expectation.
    #[error("type mismatch: expected {expected}, got {actual}")]
    TypeMismatch { expected: String, actual: String },

    /// A value cannot be represented by the target type.
    #[error("invalid value: {0}")]
    InvalidValue(String),

    /// The construct is recognised but not supported by this codec.
    #[error("unsupported: {0}")]
    Unsupported(String),

    /// The textual type grammar could not be parsed.
    #[error("cannot parse type: {0}")]
    TypeParse(String),

    /// A timezone name that `chrono-tz` does not know.
    #[error("unknown timezone: {0}")]
    UnknownTimezone(String),

    /// A [`Value`](crate::Value) narrowing accessor hit the wrong variant.
    #[error("unexpected value: expected {expected}, got {actual}")]
    UnexpectedValue { expected: &'static str, actual: String },
}

impl From<std::io::Error> for Error {
    fn from(value: std::io::Error) -> Self {
        Self::Io(Arc::new(value))
    }
}

impl From<std::string::FromUtf8Error> for Error {
    fn from(value: std::string::FromUtf8Error) -> Self {
        Self::Protocol(format!("invalid utf-8: {value}"))
    }
}
