//! Error handling for the atermscan scanner
//!
//! Errors fall into two groups: scan-level failures that stop a scan before
//! it starts (bad target, bad configuration), and per-address failures that
//! only drop that one address from the results. The latter are further split
//! into *ignorable* noise (nothing listens there) and failures worth
//! reporting (something answered, but not like an Aterm device).

use thiserror::Error;

/// Socket-level messages that mean "nothing is there".
const IGNORABLE_MESSAGES: &[&str] = &[
    "no route to host",
    "connection refused",
    "network is unreachable",
];

/// Main error type for scanning operations
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("Unsupported range: {0}")]
    UnsupportedRange(String),

    #[error("Network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Unsupported system mode {0}")]
    UnsupportedMode(i64),

    #[error("Timeout error")]
    Timeout,

    #[error("Scan cancelled")]
    Cancelled,

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Task failed: {0}")]
    TaskError(String),
}

/// Result type alias for scan operations
pub type ScanResult<T> = Result<T, ScanError>;

impl ScanError {
    /// Whether the error is expected noise from sweeping an address where no
    /// device lives. Ignorable errors are not reported to the user, but the
    /// address is still left out of the results.
    pub fn is_ignorable(&self) -> bool {
        match self {
            ScanError::NetworkUnreachable(_) | ScanError::Timeout | ScanError::Cancelled => true,
            ScanError::Network(msg) => {
                let msg = msg.to_lowercase();
                IGNORABLE_MESSAGES.iter().any(|m| msg.contains(m))
            }
            _ => false,
        }
    }

    /// Whether a host answered with something that is not a valid reply.
    pub fn is_protocol_error(&self) -> bool {
        matches!(self, ScanError::Protocol(_) | ScanError::UnsupportedMode(_))
    }

    /// Whether the error aborts the whole scan rather than a single address.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ScanError::UnsupportedRange(_) | ScanError::ConfigError(_)
        )
    }
}

impl From<std::net::AddrParseError> for ScanError {
    fn from(e: std::net::AddrParseError) -> Self {
        ScanError::UnsupportedRange(e.to_string())
    }
}

impl From<ipnetwork::IpNetworkError> for ScanError {
    fn from(e: ipnetwork::IpNetworkError) -> Self {
        ScanError::UnsupportedRange(e.to_string())
    }
}

impl From<std::num::ParseIntError> for ScanError {
    fn from(e: std::num::ParseIntError) -> Self {
        ScanError::ParseError(e.to_string())
    }
}

impl From<tokio::time::error::Elapsed> for ScanError {
    fn from(_: tokio::time::error::Elapsed) -> Self {
        ScanError::Timeout
    }
}

impl From<tokio::task::JoinError> for ScanError {
    fn from(e: tokio::task::JoinError) -> Self {
        ScanError::TaskError(e.to_string())
    }
}

impl From<reqwest::Error> for ScanError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ScanError::Timeout
        } else if e.is_connect() {
            ScanError::NetworkUnreachable(error_chain(&e))
        } else {
            ScanError::Network(error_chain(&e))
        }
    }
}

/// Flatten an error and its sources into one line, so the underlying socket
/// message ("connection refused", ...) survives for classification.
fn error_chain(e: &dyn std::error::Error) -> String {
    let mut msg = e.to_string();
    let mut source = e.source();
    while let Some(inner) = source {
        msg.push_str(": ");
        msg.push_str(&inner.to_string());
        source = inner.source();
    }
    msg
}
