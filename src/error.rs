//! Client-observed error model and mapping helpers.
//! This module provides the common error enum used across the session facade,
//! the typed endpoint wrappers and the CLI, along with mappers from HTTP
//! status codes and transport failures.

use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// 401 on an authenticated call; recoverable via the refresh protocol.
    AuthExpired { message: String },
    /// Refresh itself failed; terminal for the session.
    AuthRejected { message: String },
    /// 4xx carrying a server-provided human-readable message.
    Validation { status: u16, message: String },
    NotFound { message: String },
    /// No response within the configured deadline.
    Timeout { message: String },
    /// No response received at all.
    Network { message: String },
    /// 2xx with a payload the client could not interpret.
    Decode { message: String },
    /// 5xx from the backend.
    Internal { status: u16, message: String },
}

impl ApiError {
    pub fn kind_str(&self) -> &'static str {
        match self {
            ApiError::AuthExpired { .. } => "auth_expired",
            ApiError::AuthRejected { .. } => "auth_rejected",
            ApiError::Validation { .. } => "validation",
            ApiError::NotFound { .. } => "not_found",
            ApiError::Timeout { .. } => "timeout",
            ApiError::Network { .. } => "network",
            ApiError::Decode { .. } => "decode",
            ApiError::Internal { .. } => "internal",
        }
    }

    pub fn message(&self) -> &str {
        match self {
            ApiError::AuthExpired { message }
            | ApiError::AuthRejected { message }
            | ApiError::Validation { message, .. }
            | ApiError::NotFound { message }
            | ApiError::Timeout { message }
            | ApiError::Network { message }
            | ApiError::Decode { message }
            | ApiError::Internal { message, .. } => message.as_str(),
        }
    }

    pub fn auth_expired<S: Into<String>>(msg: S) -> Self { ApiError::AuthExpired { message: msg.into() } }
    pub fn auth_rejected<S: Into<String>>(msg: S) -> Self { ApiError::AuthRejected { message: msg.into() } }
    pub fn validation<S: Into<String>>(status: u16, msg: S) -> Self { ApiError::Validation { status, message: msg.into() } }
    pub fn not_found<S: Into<String>>(msg: S) -> Self { ApiError::NotFound { message: msg.into() } }
    pub fn timeout<S: Into<String>>(msg: S) -> Self { ApiError::Timeout { message: msg.into() } }
    pub fn network<S: Into<String>>(msg: S) -> Self { ApiError::Network { message: msg.into() } }
    pub fn decode<S: Into<String>>(msg: S) -> Self { ApiError::Decode { message: msg.into() } }
    pub fn internal<S: Into<String>>(status: u16, msg: S) -> Self { ApiError::Internal { status, message: msg.into() } }

    /// True for the 401 class that triggers the refresh protocol.
    pub fn is_auth_expired(&self) -> bool {
        matches!(self, ApiError::AuthExpired { .. })
    }

    /// True when the caller may simply try again (no response was received);
    /// validation and auth errors are never retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ApiError::Timeout { .. } | ApiError::Network { .. })
    }

    /// True when this error terminates the session (the caller should expect
    /// the store to have been cleared already).
    pub fn is_session_fatal(&self) -> bool {
        matches!(self, ApiError::AuthRejected { .. })
    }

    /// Map a non-2xx HTTP status plus the server's message (when one was
    /// decodable) to the client taxonomy.
    pub fn from_status(status: u16, message: Option<String>) -> Self {
        match status {
            401 => ApiError::AuthExpired { message: message.unwrap_or_else(|| "authentication expired".to_string()) },
            404 => ApiError::NotFound { message: message.unwrap_or_else(|| "not found".to_string()) },
            s if (400..500).contains(&s) => ApiError::Validation { status: s, message: message.unwrap_or_else(|| format!("request rejected: HTTP {}", s)) },
            s => ApiError::Internal { status: s, message: message.unwrap_or_else(|| format!("server error: HTTP {}", s)) },
        }
    }
}

impl Display for ApiError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.kind_str(), self.message())
    }
}

impl std::error::Error for ApiError {}

pub type ApiResult<T> = Result<T, ApiError>;

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ApiError::Timeout { message: err.to_string() }
        } else if err.is_decode() {
            ApiError::Decode { message: err.to_string() }
        } else {
            ApiError::Network { message: err.to_string() }
        }
    }
}
