//! Error taxonomy for remote calls.
//!
//! Every failure a caller can observe from the API is one of five kinds.
//! Errors are `Clone` so they can be recorded in session and query state.

use thiserror::Error;

/// Errors surfaced by [`RemoteClient`](super::RemoteClient).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// No response was received (DNS, connect, reset, body read).
    #[error("Network error: {0}")]
    Network(String),

    /// 401: credential missing, invalid or expired.
    #[error("Unauthorized: {message}")]
    Unauthorized { message: String },

    /// 409: e.g. duplicate registration.
    #[error("Conflict: {message}")]
    Conflict { message: String },

    /// Any other 4xx, a malformed response, or a request rejected locally.
    #[error("Request rejected ({status}): {message}")]
    ClientError { status: u16, message: String },

    /// 5xx.
    #[error("Server error ({status}): {message}")]
    ServerError { status: u16, message: String },
}

impl ApiError {
    /// Classify a non-success HTTP status.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            401 => ApiError::Unauthorized { message },
            409 => ApiError::Conflict { message },
            500..=599 => ApiError::ServerError { status, message },
            _ => ApiError::ClientError { status, message },
        }
    }

    /// A 2xx response whose body did not match the endpoint schema.
    pub fn malformed(status: u16, detail: impl std::fmt::Display) -> Self {
        ApiError::ClientError {
            status,
            message: format!("Malformed response: {}", detail),
        }
    }

    /// Request refused before it reached the network.
    pub fn invalid(message: impl Into<String>) -> Self {
        ApiError::ClientError {
            status: 400,
            message: message.into(),
        }
    }

    /// HTTP status, if the server answered.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Network(_) => None,
            ApiError::Unauthorized { .. } => Some(401),
            ApiError::Conflict { .. } => Some(409),
            ApiError::ClientError { status, .. } | ApiError::ServerError { status, .. } => {
                Some(*status)
            }
        }
    }

    /// Error kind string for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::Network(_) => "network",
            ApiError::Unauthorized { .. } => "unauthorized",
            ApiError::Conflict { .. } => "conflict",
            ApiError::ClientError { .. } => "client_error",
            ApiError::ServerError { .. } => "server_error",
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Unauthorized { .. })
    }

    /// True when the server never answered, so the outcome of a write is unknown.
    pub fn is_ambiguous(&self) -> bool {
        matches!(self, ApiError::Network(_))
    }

    /// Human-readable message without the kind prefix.
    pub fn message(&self) -> &str {
        match self {
            ApiError::Network(message)
            | ApiError::Unauthorized { message }
            | ApiError::Conflict { message }
            | ApiError::ClientError { message, .. }
            | ApiError::ServerError { message, .. } => message,
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        ApiError::Network(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_classification() {
        assert!(matches!(
            ApiError::from_status(401, "expired"),
            ApiError::Unauthorized { .. }
        ));
        assert!(matches!(
            ApiError::from_status(409, "taken"),
            ApiError::Conflict { .. }
        ));
        assert_eq!(
            ApiError::from_status(422, "bad"),
            ApiError::ClientError {
                status: 422,
                message: "bad".into()
            }
        );
        assert_eq!(
            ApiError::from_status(503, "down").kind(),
            "server_error"
        );
        assert_eq!(ApiError::from_status(404, "nope").status(), Some(404));
    }

    #[test]
    fn only_network_errors_are_ambiguous() {
        assert!(ApiError::Network("reset".into()).is_ambiguous());
        assert!(!ApiError::from_status(500, "boom").is_ambiguous());
        assert!(ApiError::Network("reset".into()).status().is_none());
    }

    #[test]
    fn message_strips_kind() {
        let err = ApiError::from_status(409, "Email already exists");
        assert_eq!(err.message(), "Email already exists");
        assert_eq!(err.to_string(), "Conflict: Email already exists");
    }
}
