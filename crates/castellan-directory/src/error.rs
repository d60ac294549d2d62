//! Error types for directory operations.
//!
//! Fatal startup errors (configuration, discovery, connection) are kept
//! distinct from request-scoped errors (`BadRequest`). Authorization
//! outcomes are never represented here; they are ordinary return values.

use thiserror::Error;

/// Error that can occur while establishing or querying the directory.
#[derive(Debug, Error)]
pub enum DirectoryError {
    /// The client configuration is unusable; fatal at startup.
    #[error("invalid configuration: {message}")]
    Configuration { message: String },

    /// Domain or directory servers could not be determined and no
    /// override was given; fatal at startup.
    #[error("discovery failed: {message}")]
    Discovery { message: String },

    /// Transport connect, STARTTLS upgrade, or bind failed; fatal at
    /// startup.
    #[error("connection failed: {message}")]
    Connection {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The caller supplied an unrecognized search property. Surfaced to
    /// the immediate caller of a search operation, never fatal.
    #[error("bad request: {message}")]
    BadRequest { message: String },
}

impl DirectoryError {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn discovery(message: impl Into<String>) -> Self {
        Self::Discovery {
            message: message.into(),
        }
    }

    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
            source: None,
        }
    }

    pub fn connection_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Connection {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest {
            message: message.into(),
        }
    }

    /// Whether this error should abort process startup.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::BadRequest { .. })
    }
}

/// Result type for directory operations.
pub type DirectoryResult<T> = Result<T, DirectoryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fatal_classification() {
        assert!(DirectoryError::configuration("x").is_fatal());
        assert!(DirectoryError::discovery("x").is_fatal());
        assert!(DirectoryError::connection("x").is_fatal());
        assert!(!DirectoryError::bad_request("x").is_fatal());
    }

    #[test]
    fn connection_error_carries_source() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        let err = DirectoryError::connection_with_source("bind failed", io);
        assert!(std::error::Error::source(&err).is_some());
        assert!(err.to_string().contains("bind failed"));
    }
}
