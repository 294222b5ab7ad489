//! CLI error types.

use gcal_core::{FormatError, I18n, TimeParseError};
use gcal_google::{ErrorCode, GoogleError};
use thiserror::Error;

use crate::config::ConfigError;

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

/// Errors surfaced to the user by `main`.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Format(#[from] FormatError),

    #[error(transparent)]
    Time(#[from] TimeParseError),

    /// Missing or unreadable OAuth client credentials.
    #[error("{0}")]
    Credentials(String),

    /// Invalid combination of arguments.
    #[error("{0}")]
    Usage(String),

    /// A Google error already translated for display.
    #[error("{0}")]
    Api(String),

    #[error("prompt failed: {0}")]
    Prompt(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CliError {
    /// Translates a Google error into a user-facing message.
    pub fn from_google(err: GoogleError, i18n: &I18n) -> Self {
        let message = err.message();
        let text = match err.code() {
            ErrorCode::AuthenticationFailed if message.contains("gcal init") => message.to_string(),
            ErrorCode::AuthenticationFailed => i18n.t("auth.not_authenticated"),
            ErrorCode::NetworkError => i18n.tf("error.network", &[("message", message)]),
            ErrorCode::RateLimited => i18n.t("error.rate_limited"),
            ErrorCode::AuthorizationFailed | ErrorCode::InsufficientScope => {
                i18n.tf("error.permission", &[("message", message)])
            }
            ErrorCode::ConfigurationError => return Self::Credentials(message.to_string()),
            _ => i18n.tf("error.api", &[("message", message)]),
        };
        Self::Api(text)
    }
}
