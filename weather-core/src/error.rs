use std::{path::PathBuf, time::Duration};

use thiserror::Error;

pub type Result<T> = std::result::Result<T, WeatherError>;

/// Boxed underlying cause, so transports other than reqwest can report failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Everything the client and the location store can fail with.
#[derive(Debug, Error)]
pub enum WeatherError {
    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Network error: {source}")]
    Network {
        #[source]
        source: BoxError,
    },

    #[error("Weather request timed out after {}s", .0.as_secs_f64())]
    Timeout(Duration),

    #[error("Provider error {code} ({kind}): {message}")]
    Provider {
        code: i64,
        kind: String,
        message: String,
    },

    #[error("Malformed provider response: missing or invalid field `{field}`")]
    MalformedResponse { field: String },

    #[error("Malformed provider response: body is not valid JSON: {0}")]
    InvalidJson(#[source] serde_json::Error),

    #[error("Storage error for {}: {source}", .path.display())]
    Storage {
        path: PathBuf,
        #[source]
        source: BoxError,
    },

    #[error("Location {0} is not stored")]
    NotFound(String),
}

/// Coarse classification of [`WeatherError`] for callers that map kinds to messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Validation,
    Configuration,
    Network,
    Timeout,
    Provider,
    MalformedResponse,
    Storage,
    NotFound,
}

impl WeatherError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            WeatherError::Validation(_) => ErrorKind::Validation,
            WeatherError::Configuration(_) => ErrorKind::Configuration,
            WeatherError::Network { .. } => ErrorKind::Network,
            WeatherError::Timeout(_) => ErrorKind::Timeout,
            WeatherError::Provider { .. } => ErrorKind::Provider,
            WeatherError::MalformedResponse { .. } | WeatherError::InvalidJson(_) => {
                ErrorKind::MalformedResponse
            }
            WeatherError::Storage { .. } => ErrorKind::Storage,
            WeatherError::NotFound(_) => ErrorKind::NotFound,
        }
    }

    /// Network failures and timeouts may succeed on a later attempt. Nothing retries automatically.
    pub fn is_transient(&self) -> bool {
        matches!(self.kind(), ErrorKind::Network | ErrorKind::Timeout)
    }

    pub(crate) fn network(source: impl Into<BoxError>) -> Self {
        WeatherError::Network { source: source.into() }
    }

    pub(crate) fn storage(path: impl Into<PathBuf>, source: impl Into<BoxError>) -> Self {
        WeatherError::Storage { path: path.into(), source: source.into() }
    }

    pub(crate) fn missing(field: impl Into<String>) -> Self {
        WeatherError::MalformedResponse { field: field.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_network_and_timeout_are_transient() {
        assert!(WeatherError::network("connection reset").is_transient());
        assert!(WeatherError::Timeout(Duration::from_secs(10)).is_transient());

        assert!(!WeatherError::Validation("bad zip".into()).is_transient());
        assert!(!WeatherError::missing("current.temperature").is_transient());
        let provider = WeatherError::Provider {
            code: 101,
            kind: "invalid_access_key".into(),
            message: "nope".into(),
        };
        assert!(!provider.is_transient());
    }

    #[test]
    fn invalid_json_is_reported_as_malformed() {
        let err = serde_json::from_str::<serde_json::Value>("<html>").unwrap_err();
        assert_eq!(WeatherError::InvalidJson(err).kind(), ErrorKind::MalformedResponse);
    }

    #[test]
    fn messages_carry_detail() {
        let err = WeatherError::missing("current.temperature");
        assert!(err.to_string().contains("current.temperature"));

        let err = WeatherError::storage("/tmp/locations.json", "permission denied");
        let msg = err.to_string();
        assert!(msg.contains("/tmp/locations.json"));
        assert!(msg.contains("permission denied"));

        let err = WeatherError::Timeout(Duration::from_secs(10));
        assert!(err.to_string().contains("10s"));
    }
}
