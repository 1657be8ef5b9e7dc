//! Error handling for domain prospecting.
//!
//! Per-candidate lookup failures never surface as errors from the engine:
//! they are classified into [`IndeterminateReason`](crate::IndeterminateReason)
//! values. `ProspectError` covers configuration problems detected before a
//! search starts and the provider-level failures an oracle classifies.

use crate::types::IndeterminateReason;
use std::fmt;
use std::time::Duration;

/// Main error type for the library.
#[derive(Debug, Clone)]
pub enum ProspectError {
    /// Invalid search or engine configuration
    ConfigError { message: String },

    /// Invalid alphabet specification
    InvalidAlphabet { alphabet: String, reason: String },

    /// File I/O errors when reading configuration or checkpoints
    FileError { path: String, message: String },

    /// Network-related errors (connection refused, DNS, reset)
    NetworkError {
        message: String,
        source: Option<String>,
    },

    /// RDAP protocol specific errors
    RdapError {
        domain: String,
        message: String,
        status_code: Option<u16>,
    },

    /// WHOIS protocol specific errors
    WhoisError { domain: String, message: String },

    /// Response could not be interpreted
    ParseError {
        message: String,
        content: Option<String>,
    },

    /// Operation exceeded its deadline
    Timeout {
        operation: String,
        duration: Duration,
    },

    /// The registry rejected the request for exceeding its quota
    RateLimited {
        service: String,
        message: String,
        retry_after: Option<Duration>,
    },

    /// Generic internal errors that don't fit other categories
    Internal { message: String },
}

impl ProspectError {
    /// Create a new configuration error.
    pub fn config<M: Into<String>>(message: M) -> Self {
        Self::ConfigError {
            message: message.into(),
        }
    }

    /// Create a new invalid alphabet error.
    pub fn invalid_alphabet<A: Into<String>, R: Into<String>>(alphabet: A, reason: R) -> Self {
        Self::InvalidAlphabet {
            alphabet: alphabet.into(),
            reason: reason.into(),
        }
    }

    /// Create a new file error.
    pub fn file_error<P: Into<String>, M: Into<String>>(path: P, message: M) -> Self {
        Self::FileError {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a new network error.
    pub fn network<M: Into<String>>(message: M) -> Self {
        Self::NetworkError {
            message: message.into(),
            source: None,
        }
    }

    /// Create a new network error with source information.
    pub fn network_with_source<M: Into<String>, S: Into<String>>(message: M, source: S) -> Self {
        Self::NetworkError {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Create a new RDAP error.
    pub fn rdap<D: Into<String>, M: Into<String>>(domain: D, message: M) -> Self {
        Self::RdapError {
            domain: domain.into(),
            message: message.into(),
            status_code: None,
        }
    }

    /// Create a new RDAP error with HTTP status code.
    pub fn rdap_with_status<D: Into<String>, M: Into<String>>(
        domain: D,
        message: M,
        status_code: u16,
    ) -> Self {
        Self::RdapError {
            domain: domain.into(),
            message: message.into(),
            status_code: Some(status_code),
        }
    }

    /// Create a new WHOIS error.
    pub fn whois<D: Into<String>, M: Into<String>>(domain: D, message: M) -> Self {
        Self::WhoisError {
            domain: domain.into(),
            message: message.into(),
        }
    }

    /// Create a new parse error.
    pub fn parse<M: Into<String>>(message: M) -> Self {
        Self::ParseError {
            message: message.into(),
            content: None,
        }
    }

    /// Create a new timeout error.
    pub fn timeout<O: Into<String>>(operation: O, duration: Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            duration,
        }
    }

    /// Create a new rate limit error.
    pub fn rate_limited<S: Into<String>, M: Into<String>>(service: S, message: M) -> Self {
        Self::RateLimited {
            service: service.into(),
            message: message.into(),
            retry_after: None,
        }
    }

    /// Create a new internal error.
    pub fn internal<M: Into<String>>(message: M) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Classify this error as the cause of an indeterminate lookup.
    ///
    /// RDAP errors carrying HTTP 429 count as rate limiting. Any WHOIS or
    /// RDAP error that is not otherwise classified is a transport problem:
    /// the registry could not be asked, which is never evidence that the
    /// name is free.
    pub fn indeterminate_reason(&self) -> IndeterminateReason {
        match self {
            Self::Timeout { .. } => IndeterminateReason::Timeout,
            Self::RateLimited { .. } => IndeterminateReason::RateLimited,
            Self::RdapError {
                status_code: Some(429),
                ..
            } => IndeterminateReason::RateLimited,
            Self::ParseError { .. } => IndeterminateReason::ParseError,
            _ => IndeterminateReason::TransportError,
        }
    }

    /// Whether this error was detected before any lookup was attempted.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            Self::ConfigError { .. } | Self::InvalidAlphabet { .. } | Self::FileError { .. }
        )
    }
}

impl fmt::Display for ProspectError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigError { message } => {
                write!(f, "Configuration error: {}", message)
            }
            Self::InvalidAlphabet { alphabet, reason } => {
                write!(f, "Invalid alphabet '{}': {}", alphabet, reason)
            }
            Self::FileError { path, message } => {
                write!(f, "File error at '{}': {}", path, message)
            }
            Self::NetworkError { message, source } => {
                if let Some(source) = source {
                    write!(f, "Network error: {} (source: {})", message, source)
                } else {
                    write!(f, "Network error: {}", message)
                }
            }
            Self::RdapError {
                domain,
                message,
                status_code,
            } => {
                if let Some(code) = status_code {
                    write!(f, "RDAP error for '{}' (HTTP {}): {}", domain, code, message)
                } else {
                    write!(f, "RDAP error for '{}': {}", domain, message)
                }
            }
            Self::WhoisError { domain, message } => {
                write!(f, "WHOIS error for '{}': {}", domain, message)
            }
            Self::ParseError { message, content: _ } => {
                write!(f, "Parse error: {}", message)
            }
            Self::Timeout {
                operation,
                duration,
            } => {
                write!(f, "Timeout after {:?} during: {}", duration, operation)
            }
            Self::RateLimited {
                service,
                message,
                retry_after,
            } => {
                if let Some(retry) = retry_after {
                    write!(
                        f,
                        "Rate limited by {} (retry after {:?}): {}",
                        service, retry, message
                    )
                } else {
                    write!(f, "Rate limited by {}: {}", service, message)
                }
            }
            Self::Internal { message } => {
                write!(f, "Internal error: {}", message)
            }
        }
    }
}

impl std::error::Error for ProspectError {}

impl From<reqwest::Error> for ProspectError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::timeout("HTTP request", Duration::from_secs(0))
        } else if err.is_connect() {
            Self::network_with_source("Connection failed", err.to_string())
        } else if err.is_decode() {
            Self::parse(format!("Failed to decode response body: {}", err))
        } else if err.status().map(|s| s.as_u16()) == Some(429) {
            Self::rate_limited("HTTP", err.to_string())
        } else {
            Self::network_with_source("HTTP request failed", err.to_string())
        }
    }
}

impl From<serde_json::Error> for ProspectError {
    fn from(err: serde_json::Error) -> Self {
        Self::ParseError {
            message: format!("JSON parsing failed: {}", err),
            content: None,
        }
    }
}

impl From<std::io::Error> for ProspectError {
    fn from(err: std::io::Error) -> Self {
        Self::Internal {
            message: format!("I/O error: {}", err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_indeterminate_reason_mapping() {
        assert_eq!(
            ProspectError::timeout("whois", Duration::from_secs(5)).indeterminate_reason(),
            IndeterminateReason::Timeout
        );
        assert_eq!(
            ProspectError::rate_limited("whois", "quota exceeded").indeterminate_reason(),
            IndeterminateReason::RateLimited
        );
        assert_eq!(
            ProspectError::rdap_with_status("abc.com", "too many", 429).indeterminate_reason(),
            IndeterminateReason::RateLimited
        );
        assert_eq!(
            ProspectError::parse("garbled").indeterminate_reason(),
            IndeterminateReason::ParseError
        );
        assert_eq!(
            ProspectError::network("connection reset").indeterminate_reason(),
            IndeterminateReason::TransportError
        );
        assert_eq!(
            ProspectError::whois("abc.com", "command not found").indeterminate_reason(),
            IndeterminateReason::TransportError
        );
    }

    #[test]
    fn test_config_errors_are_flagged() {
        assert!(ProspectError::config("max length must be at least 3").is_config_error());
        assert!(ProspectError::invalid_alphabet("", "empty").is_config_error());
        assert!(!ProspectError::network("down").is_config_error());
    }

    #[test]
    fn test_display_messages() {
        let err = ProspectError::rdap_with_status("abc.com", "server error", 503);
        assert_eq!(
            err.to_string(),
            "RDAP error for 'abc.com' (HTTP 503): server error"
        );

        let err = ProspectError::invalid_alphabet("AB", "uppercase characters are not allowed");
        assert_eq!(
            err.to_string(),
            "Invalid alphabet 'AB': uppercase characters are not allowed"
        );
    }
}
