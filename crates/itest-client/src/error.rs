//! Error types for harness operations

use std::time::Duration;

use reqwest::Method;
use thiserror::Error;

/// Result type alias for harness operations
pub type Result<T> = std::result::Result<T, HarnessError>;

/// No response was obtained for a request.
///
/// Every variant keeps the method and URL of the attempted request so a
/// failure can be reported without the request itself.
#[derive(Error, Debug)]
pub enum TransportError {
    /// DNS resolution or TCP/TLS connection failed
    #[error("{method} {url}: connection failed: {source}")]
    Connect {
        method: Method,
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// No complete response within the request timeout
    #[error("{method} {url}: timed out after {timeout:?}")]
    Timeout {
        method: Method,
        url: String,
        timeout: Duration,
    },

    /// Response headers arrived but the body stream was malformed or cut off
    #[error("{method} {url}: malformed response stream: {source}")]
    Body {
        method: Method,
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The request could not be built or sent for any other reason
    #[error("{method} {url}: request failed: {source}")]
    Request {
        method: Method,
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

/// Coarse classification of a [`TransportError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    Connect,
    Timeout,
    Body,
    Request,
}

impl TransportError {
    /// Which kind of transport failure this is
    pub fn kind(&self) -> TransportErrorKind {
        match self {
            Self::Connect { .. } => TransportErrorKind::Connect,
            Self::Timeout { .. } => TransportErrorKind::Timeout,
            Self::Body { .. } => TransportErrorKind::Body,
            Self::Request { .. } => TransportErrorKind::Request,
        }
    }

    /// Method of the attempted request
    pub fn method(&self) -> &Method {
        match self {
            Self::Connect { method, .. }
            | Self::Timeout { method, .. }
            | Self::Body { method, .. }
            | Self::Request { method, .. } => method,
        }
    }

    /// URL of the attempted request
    pub fn url(&self) -> &str {
        match self {
            Self::Connect { url, .. }
            | Self::Timeout { url, .. }
            | Self::Body { url, .. }
            | Self::Request { url, .. } => url,
        }
    }

    /// Classify a reqwest error raised while sending or reading a response
    pub(crate) fn classify(
        method: Method,
        url: impl Into<String>,
        timeout: Duration,
        source: reqwest::Error,
    ) -> Self {
        let url = url.into();
        if source.is_timeout() {
            Self::Timeout {
                method,
                url,
                timeout,
            }
        } else if source.is_connect() {
            Self::Connect {
                method,
                url,
                source,
            }
        } else if source.is_body() || source.is_decode() {
            Self::Body {
                method,
                url,
                source,
            }
        } else {
            Self::Request {
                method,
                url,
                source,
            }
        }
    }
}

/// A response body could not be parsed into the expected model
#[derive(Error, Debug)]
#[error("failed to parse {resource} from {url} (HTTP {status}): {message}")]
pub struct ParseError {
    /// Model that was expected (e.g. `Deployment`)
    pub resource: &'static str,
    pub url: String,
    pub status: u16,
    pub message: String,
}

/// Errors that can occur while driving the services under test
#[derive(Error, Debug)]
pub enum HarnessError {
    /// No response was obtained
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Invalid URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Base address cannot carry resource paths
    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),

    /// Failed to parse response
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// A response arrived with a status the caller did not expect
    #[error("{method} {url}: expected HTTP {expected}, got {actual}: {body}")]
    UnexpectedStatus {
        expected: u16,
        actual: u16,
        method: Method,
        url: String,
        body: String,
    },

    /// The poller exhausted its attempt budget
    #[error("precondition not met after {attempts} attempt(s): {what}")]
    PreconditionNotMet { what: String, attempts: u32 },

    /// A response field did not match
    #[error("assertion failed: {0}")]
    Assertion(String),

    /// A request model could not be turned into a JSON body
    #[error("unserializable request body: {0}")]
    Serialize(#[source] serde_json::Error),

    /// Invalid harness configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl HarnessError {
    /// Create an assertion failure
    pub fn assertion(message: impl Into<String>) -> Self {
        Self::Assertion(message.into())
    }

    /// Short category used in reports
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Transport(_) => "transport",
            Self::InvalidUrl(_) | Self::InvalidEndpoint(_) | Self::Config(_) => "config",
            Self::Parse(_) => "parse",
            Self::Serialize(_) => "serialize",
            Self::UnexpectedStatus { .. } => "status",
            Self::PreconditionNotMet { .. } => "precondition",
            Self::Assertion(_) => "assertion",
            Self::Io(_) => "io",
        }
    }

    /// True when the poller gave up waiting for a precondition
    pub fn is_precondition(&self) -> bool {
        matches!(self, Self::PreconditionNotMet { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(HarnessError::assertion("x").kind(), "assertion");
        let err = HarnessError::PreconditionNotMet {
            what: "device groups".into(),
            attempts: 5,
        };
        assert_eq!(err.kind(), "precondition");
        assert!(err.is_precondition());
        assert_eq!(
            err.to_string(),
            "precondition not met after 5 attempt(s): device groups"
        );
    }

    #[test]
    fn test_unexpected_status_message() {
        let err = HarnessError::UnexpectedStatus {
            expected: 200,
            actual: 404,
            method: Method::GET,
            url: "http://localhost/v1/rules/x".into(),
            body: String::new(),
        };
        assert_eq!(err.kind(), "status");
        assert!(err.to_string().contains("expected HTTP 200, got 404"));
    }

    #[test]
    fn test_serialize_is_not_config() {
        let source = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = HarnessError::Serialize(source);
        assert_eq!(err.kind(), "serialize");
        assert!(err.to_string().starts_with("unserializable request body"));
    }
}
