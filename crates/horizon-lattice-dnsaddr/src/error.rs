//! Error types for DNSADDR resolution.

use std::time::Duration;

/// Errors produced while resolving a `dnsaddr` multiaddress.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// The input is not a `dnsaddr`-rooted address carrying a peer id.
    #[error("invalid dnsaddr address: {0}")]
    InvalidAddress(String),

    /// No DNS transport is available in this environment.
    #[error("DNSADDR resolution is not supported on this platform")]
    UnsupportedPlatform,

    /// The TXT query did not complete within its deadline.
    #[error("TXT query for '{name}' timed out after {timeout:?}")]
    Timeout {
        /// The queried domain name.
        name: String,
        /// The deadline that elapsed.
        timeout: Duration,
    },

    /// The transport reported a failure for the TXT query.
    #[error("TXT query for '{name}' failed: {message}")]
    QueryFailed {
        /// The queried domain name.
        name: String,
        /// Transport error message.
        message: String,
    },

    /// The lookup succeeded but no record carried the expected peer id.
    #[error("no host matching the peer id was found under '{domain}'")]
    NoMatchingHost {
        /// The `_dnsaddr.` name whose answers were rejected.
        domain: String,
    },

    /// The resolver has not been started, or has been stopped.
    #[error("DNSADDR resolver is not started")]
    NotStarted,

    /// The resolution was cancelled before it completed.
    #[error("DNSADDR resolution was cancelled")]
    Cancelled,

    /// Invalid resolver configuration.
    #[error("invalid DNSADDR configuration: {0}")]
    InvalidConfig(String),
}

impl Error {
    /// Create an invalid address error.
    pub fn invalid_address(message: impl Into<String>) -> Self {
        Self::InvalidAddress(message.into())
    }

    /// Create a query failure error.
    pub fn query_failed(name: impl Into<String>, message: impl ToString) -> Self {
        Self::QueryFailed {
            name: name.into(),
            message: message.to_string(),
        }
    }

    /// Create a no-matching-host error.
    pub fn no_matching_host(domain: impl Into<String>) -> Self {
        Self::NoMatchingHost {
            domain: domain.into(),
        }
    }

    /// Whether the error came from the DNS transport rather than the records.
    pub fn is_dns_failure(&self) -> bool {
        matches!(
            self,
            Self::UnsupportedPlatform | Self::Timeout { .. } | Self::QueryFailed { .. }
        )
    }

    /// Whether a caller may reasonably retry the same request later.
    ///
    /// Nothing is retried internally.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::QueryFailed { .. })
    }
}

impl From<multiaddr::Error> for Error {
    fn from(err: multiaddr::Error) -> Self {
        Self::InvalidAddress(err.to_string())
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Self::InvalidConfig(err.to_string())
    }
}

/// A specialized Result type for DNSADDR operations.
pub type Result<T> = std::result::Result<T, Error>;
