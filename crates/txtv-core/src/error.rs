//! Error types for txtv-core operations.
//!
//! All fetch failures are caught at the job-consumer boundary and turned into
//! [`PageEvent::Failed`](crate::PageEvent::Failed) events; errors never
//! propagate out of the navigation facade as panics or `Err` returns. The
//! [`Error::kind`] classification decides how a failure is presented, and
//! whether relative navigation is allowed its single neighbor-page retry.

use thiserror::Error;

/// Failure classification as reported to the front-end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The server reported that the requested page does not exist.
    NotFound,
    /// Any other failure: transport errors, non-404 HTTP errors, bad
    /// response bodies.
    Other,
}

/// The main error type for txtv-core operations.
#[derive(Error, Debug)]
pub enum Error {
    /// The server responded 404 for a page.
    #[error("page {page} not found")]
    NotFound {
        /// The page that was requested.
        page: u16,
    },

    /// The server responded with a non-success, non-404 status.
    #[error("server returned status {status}")]
    Http {
        /// HTTP status code.
        status: u16,
    },

    /// Transport-level failure (connection, TLS, timeout).
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The response body did not match the expected shape.
    #[error("malformed response: {0}")]
    Decode(String),

    /// Configuration is invalid or inaccessible.
    #[error("configuration error: {0}")]
    Config(String),

    /// File I/O failed (configuration, statistics, favorites).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization or deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl Error {
    /// Classify this error for event reporting.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::NotFound,
            _ => ErrorKind::Other,
        }
    }

    /// HTTP status code behind this error, when there is one.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::NotFound { .. } => Some(404),
            Self::Http { status } => Some(*status),
            Self::Network(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

/// Convenience alias used throughout txtv-core.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_classifies_as_not_found() {
        let err = Error::NotFound { page: 999 };
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(err.status(), Some(404));
    }

    #[test]
    fn http_errors_classify_as_other() {
        let err = Error::Http { status: 503 };
        assert_eq!(err.kind(), ErrorKind::Other);
        assert_eq!(err.status(), Some(503));
    }

    #[test]
    fn decode_errors_have_no_status() {
        let err = Error::Decode("missing field".to_string());
        assert_eq!(err.kind(), ErrorKind::Other);
        assert_eq!(err.status(), None);
    }

    #[test]
    fn display_messages_name_the_page() {
        let err = Error::NotFound { page: 123 };
        assert!(err.to_string().contains("123"));
    }
}
