//! Error types for Google OAuth and Calendar API operations.

use std::fmt;
use thiserror::Error;

/// The category of a Google error.
///
/// Commands use the code to choose a user-facing message, and the calendar
/// service uses [`ErrorCode::InsufficientScope`] to decide whether to
/// re-authenticate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// No usable token, or the token was rejected (401).
    AuthenticationFailed,
    /// The token is valid but was granted without a required scope.
    InsufficientScope,
    /// The user lacks permission on the resource (403).
    AuthorizationFailed,
    /// Connection failed, timed out, etc.
    NetworkError,
    /// Too many requests (429, or 403 with a rate-limit reason).
    RateLimited,
    /// 5xx from Google.
    ServerError,
    /// The response could not be parsed.
    InvalidResponse,
    /// 404 / 410.
    NotFound,
    /// 400: invalid parameters or event body.
    BadRequest,
    /// Missing or invalid credentials, paths or settings.
    ConfigurationError,
    /// Unexpected state.
    InternalError,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AuthenticationFailed => "authentication_failed",
            Self::InsufficientScope => "insufficient_scope",
            Self::AuthorizationFailed => "authorization_failed",
            Self::NetworkError => "network_error",
            Self::RateLimited => "rate_limited",
            Self::ServerError => "server_error",
            Self::InvalidResponse => "invalid_response",
            Self::NotFound => "not_found",
            Self::BadRequest => "bad_request",
            Self::ConfigurationError => "configuration_error",
            Self::InternalError => "internal_error",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An error from the OAuth flow, token storage, or the Calendar API.
#[derive(Debug, Error)]
pub struct GoogleError {
    code: ErrorCode,
    message: String,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl GoogleError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            source: None,
        }
    }

    pub fn authentication(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::AuthenticationFailed, message)
    }

    pub fn insufficient_scope(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InsufficientScope, message)
    }

    pub fn authorization(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::AuthorizationFailed, message)
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NetworkError, message)
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::RateLimited, message)
    }

    pub fn server(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ServerError, message)
    }

    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidResponse, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::BadRequest, message)
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ConfigurationError, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }

    /// Attaches the underlying cause.
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.source = Some(Box::new(source));
        self
    }

    pub fn code(&self) -> ErrorCode {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns true if the cached token lacks a permission the call needs.
    ///
    /// Besides the dedicated code, any message mentioning an insufficient
    /// scope counts, since Google reports this through several shapes of
    /// error body.
    pub fn is_scope_error(&self) -> bool {
        if self.code == ErrorCode::InsufficientScope {
            return true;
        }
        let message = self.message.to_ascii_lowercase();
        message.contains("insufficient") && message.contains("scope")
    }
}

impl fmt::Display for GoogleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

/// Result type for Google operations.
pub type GoogleResult<T> = Result<T, GoogleError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scope_error_by_code() {
        let err = GoogleError::insufficient_scope("missing calendar scope");
        assert!(err.is_scope_error());
        assert_eq!(err.code(), ErrorCode::InsufficientScope);
    }

    #[test]
    fn scope_error_by_message() {
        let err = GoogleError::authorization("Request had insufficient authentication scopes.");
        assert!(err.is_scope_error());

        let err = GoogleError::authorization("The caller does not have permission");
        assert!(!err.is_scope_error());

        let err = GoogleError::bad_request("Insufficient quota");
        assert!(!err.is_scope_error());
    }

    #[test]
    fn display_includes_code_and_message() {
        let err = GoogleError::not_found("event abc");
        assert_eq!(err.to_string(), "not_found: event abc");
    }

    #[test]
    fn with_source_is_exposed() {
        use std::error::Error;
        let io_err = std::io::Error::other("disk full");
        let err = GoogleError::internal("failed to write token").with_source(io_err);
        assert!(err.source().is_some());
    }
}
