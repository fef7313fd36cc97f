//! Error types for the `scrubber` crate.

/// Errors surfaced while reading markup in or writing sanitized markup out.
///
/// Policy decisions never fail: a URL that doesn't parse just fails validation.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Reading the input or writing the serialized output failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The serializer produced bytes that aren't UTF-8.
    #[error("Serialized markup is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// A type alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;
