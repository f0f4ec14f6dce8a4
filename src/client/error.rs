//! Error types for the GitHub client

use std::time::Duration;

use chrono::{DateTime, Utc};
use compact_str::{CompactString, ToCompactString};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ClientError>;

#[derive(Debug, Error)]
pub enum ClientError {
    /// No usable credential or an invalid setting at construction time
    #[error("Invalid configuration for {field}: {message}")]
    Configuration {
        field: CompactString,
        message: CompactString,
    },

    #[error("Authentication failed: {message}")]
    Authentication { message: CompactString },

    #[error("Not found: {resource}")]
    NotFound { resource: CompactString },

    /// Rejected input (HTTP 422 or a bad argument) or a malformed response payload
    #[error("Validation failed: {message}")]
    Validation { message: CompactString },

    #[error("HTTP {status}: {message}")]
    Client { status: u16, message: CompactString },

    #[error("Transient failure{}: {message}", .status.map(|s| format!(" (HTTP {s})")).unwrap_or_default())]
    Transient {
        status: Option<u16>,
        message: CompactString,
    },

    #[error("Rate limit exceeded{}", .reset_at.map(|r| format!(", resets at {r}")).unwrap_or_default())]
    RateLimited { reset_at: Option<DateTime<Utc>> },

    #[error("Giving up after {attempts} attempts: {source}")]
    RetryExhausted {
        attempts: u32,
        #[source]
        source: Box<ClientError>,
    },

    #[error("Operation did not complete within {budget:?}")]
    Timeout { budget: Duration },
}

impl ClientError {
    pub fn config(field: impl Into<CompactString>, message: impl Into<CompactString>) -> Self {
        Self::Configuration { field: field.into(), message: message.into() }
    }

    pub fn authentication(message: impl Into<CompactString>) -> Self {
        Self::Authentication { message: message.into() }
    }

    pub fn not_found(resource: impl Into<CompactString>) -> Self {
        Self::NotFound { resource: resource.into() }
    }

    pub fn validation(message: impl Into<CompactString>) -> Self {
        Self::Validation { message: message.into() }
    }

    /// A 2xx body that does not match the expected shape
    pub fn malformed_payload(endpoint: &str, error: &serde_json::Error) -> Self {
        Self::Validation {
            message: compact_str::format_compact!("malformed response from {endpoint}: {error}"),
        }
    }

    pub fn transient(status: Option<u16>, message: impl Into<CompactString>) -> Self {
        Self::Transient { status, message: message.into() }
    }

    pub fn from_transport(error: &reqwest::Error) -> Self {
        Self::Transient { status: error.status().map(|s| s.as_u16()), message: error.to_compact_string() }
    }

    /// Whether the request loop may try again after this error
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient { .. } | Self::RateLimited { .. })
    }

    /// HTTP status carried by the error, looking through retry exhaustion
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Authentication { .. } => Some(401),
            Self::NotFound { .. } => Some(404),
            Self::Client { status, .. } => Some(*status),
            Self::Transient { status, .. } => *status,
            Self::RetryExhausted { source, .. } => source.status(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retry_exhausted_reports_status_of_cause() {
        let error = ClientError::RetryExhausted {
            attempts: 4,
            source: Box::new(ClientError::transient(Some(503), "Service Unavailable")),
        };
        assert_eq!(error.status(), Some(503));
        assert!(!error.is_retryable());
        assert_eq!(
            error.to_string(),
            "Giving up after 4 attempts: Transient failure (HTTP 503): Service Unavailable"
        );
    }

    #[test]
    fn only_transient_and_rate_limited_are_retryable() {
        assert!(ClientError::transient(None, "connection reset").is_retryable());
        assert!(ClientError::RateLimited { reset_at: None }.is_retryable());
        assert!(!ClientError::not_found("/repos/a/b").is_retryable());
        assert!(!ClientError::validation("bad").is_retryable());
        assert!(!ClientError::Client { status: 400, message: "bad".into() }.is_retryable());
    }
}
