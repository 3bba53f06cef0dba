//! Error types for Ferry.

use std::io;

/// Errors produced while adapting envelopes and serving requests.
#[derive(Debug, thiserror::Error)]
pub enum FerryError {
    /// The inbound event is not valid JSON for the detected envelope shape.
    #[error("malformed envelope: {0}")]
    MalformedEnvelope(#[from] serde_json::Error),

    /// The `version` discriminant is outside `""`, `"1.0"` and `"2.0"`.
    #[error("payload Version {0} is not supported")]
    UnsupportedVersion(String),

    /// A body flagged as base64 could not be decoded.
    #[error("invalid base64 body: {0}")]
    InvalidBodyEncoding(#[from] base64::DecodeError),

    /// The translated request is missing a method or a usable URL.
    #[error("{0}")]
    Validation(String),

    /// The standalone listener could not bind its address.
    #[error("couldn't listen to {address}: {source}")]
    ListenerBind {
        /// Address that failed to bind.
        address: String,
        /// Underlying socket error.
        source: io::Error,
    },

    /// A streaming producer went away without committing headers.
    #[error("stream closed before response headers were committed")]
    StreamClosedPrematurely,

    /// The serverless host event loop exited with an error.
    #[error("serverless runtime error: {0}")]
    Runtime(String),

    /// Reading a request or response body failed.
    #[error("body error: {0}")]
    Body(String),

    /// I/O error.
    #[error(transparent)]
    Io(#[from] io::Error),

    /// Error building an HTTP message.
    #[error(transparent)]
    Http(#[from] http::Error),
}

impl FerryError {
    /// Create a validation error with the given message.
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}

/// Convenience result type for Ferry operations.
pub type FerryResult<T> = Result<T, FerryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_format_unsupported_version_exactly() {
        let err = FerryError::UnsupportedVersion("3.0".to_owned());
        assert_eq!(err.to_string(), "payload Version 3.0 is not supported");
    }

    #[test]
    fn test_should_format_validation_message_verbatim() {
        let err = FerryError::validation("http method is empty");
        assert_eq!(err.to_string(), "http method is empty");
    }

    #[test]
    fn test_should_format_listener_bind_error() {
        let err = FerryError::ListenerBind {
            address: "127.0.0.1:1".to_owned(),
            source: io::Error::new(io::ErrorKind::AddrInUse, "address in use"),
        };
        assert_eq!(
            err.to_string(),
            "couldn't listen to 127.0.0.1:1: address in use"
        );
    }
}
