//! Error types for the store facade.
//!
//! Every fallible operation in the crate returns [`Error`]. Native client
//! failures are passed through in the per-backend variants so callers can
//! still reach the underlying error with `source()`.

use thiserror::Error;

use crate::session::SessionState;
use crate::traits::BackendKind;

/// Boxed native error carried by [`Error::Connection`].
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors produced by descriptor parsing, session lifecycle and the
/// read/write paths.
#[derive(Debug, Error)]
pub enum Error {
    /// The connection string (or a part of it) could not be parsed.
    #[error("invalid connection string `{input}`: {reason}")]
    Parse { input: String, reason: String },

    /// The scheme is unknown, or names a backend that has no implementation.
    #[error("unsupported backend: {0}")]
    UnsupportedBackend(String),

    /// Opening or verifying the native client failed.
    #[error("failed to connect to {kind} backend: {source}")]
    Connection {
        kind: BackendKind,
        #[source]
        source: BoxError,
    },

    /// An operation was attempted on a session that is not connected.
    #[error("session is not connected (state: {0})")]
    NotInitialized(SessionState),

    /// A data row does not have as many columns as the header.
    #[error("row {row} has {actual} columns, expected {expected}")]
    SchemaMismatch {
        row: usize,
        expected: usize,
        actual: usize,
    },

    /// A read without filters against a backend that cannot recover columns.
    #[error("no schema available for table `{table}` on {kind} backend; pass an explicit filter list")]
    MissingSchema { kind: BackendKind, table: String },

    /// The connection string has no table segment.
    #[error("connection string does not name a table")]
    MissingTableName,

    /// The batch is structurally unusable (no header, empty or duplicate columns).
    #[error("invalid batch: {0}")]
    InvalidBatch(String),

    /// A predicate or comparator could not be parsed.
    #[error("invalid predicate `{0}`")]
    InvalidPredicate(String),

    /// The configuration could not be read or decoded.
    #[error("configuration error: {0}")]
    Config(String),

    #[error("key-value backend error: {0}")]
    KeyValue(#[from] redis::RedisError),

    #[error("relational backend error: {0}")]
    Relational(#[from] sqlx::Error),

    #[error("document backend error: {0}")]
    Document(#[from] mongodb::error::Error),
}

impl Error {
    pub(crate) fn parse(input: &str, reason: impl Into<String>) -> Self {
        Self::Parse {
            input: input.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn connection(kind: BackendKind, source: impl Into<BoxError>) -> Self {
        Self::Connection {
            kind,
            source: source.into(),
        }
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_mismatch_message() {
        let err = Error::SchemaMismatch {
            row: 3,
            expected: 3,
            actual: 2,
        };
        assert_eq!(err.to_string(), "row 3 has 2 columns, expected 3");
    }

    #[test]
    fn test_connection_error_keeps_source() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        let err = Error::connection(BackendKind::KeyValue, io);

        assert!(err.to_string().contains("key-value"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_not_initialized_names_state() {
        let err = Error::NotInitialized(SessionState::Closed);
        assert_eq!(err.to_string(), "session is not connected (state: closed)");
    }
}
