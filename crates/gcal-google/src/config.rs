//! OAuth credentials and Google client configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::{GoogleError, GoogleResult};

/// Environment variable overriding the OAuth client ID.
pub const CLIENT_ID_ENV: &str = "GOOGLE_CLIENT_ID";
/// Environment variable overriding the OAuth client secret.
pub const CLIENT_SECRET_ENV: &str = "GOOGLE_CLIENT_SECRET";

/// OAuth 2.0 client credentials for an installed application.
///
/// Google requires every application to be registered, so users supply
/// their own client ID and secret from the Cloud Console.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OAuthCredentials {
    pub client_id: String,
    pub client_secret: String,
}

/// Shape of the credentials JSON downloaded from the Cloud Console.
///
/// Accepts the `installed` and `web` sections as well as a flat
/// `client_id`/`client_secret` object.
#[derive(Debug, Deserialize)]
struct CredentialsFile {
    installed: Option<NestedCredentials>,
    web: Option<NestedCredentials>,
    client_id: Option<String>,
    client_secret: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NestedCredentials {
    client_id: String,
    client_secret: String,
}

impl OAuthCredentials {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }

    /// Loads credentials from a Cloud Console JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> GoogleResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            GoogleError::configuration(format!(
                "failed to read credentials file {}: {}",
                path.display(),
                e
            ))
            .with_source(e)
        })?;
        Self::from_json(&content)
    }

    /// Parses credentials from a Cloud Console JSON string.
    pub fn from_json(json: &str) -> GoogleResult<Self> {
        let file: CredentialsFile = serde_json::from_str(json).map_err(|e| {
            GoogleError::configuration(format!("failed to parse credentials JSON: {}", e))
        })?;

        if let Some(creds) = file.installed.or(file.web) {
            return Ok(Self::new(creds.client_id, creds.client_secret));
        }

        if let (Some(client_id), Some(client_secret)) = (file.client_id, file.client_secret) {
            return Ok(Self::new(client_id, client_secret));
        }

        Err(GoogleError::configuration(
            "credentials file must contain an 'installed' or 'web' section, or 'client_id' and 'client_secret'",
        ))
    }

    /// Reads credentials from `GOOGLE_CLIENT_ID` and `GOOGLE_CLIENT_SECRET`.
    ///
    /// Returns `None` unless both are set and non-empty.
    pub fn from_env() -> Option<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Option<Self> {
        let client_id = lookup(CLIENT_ID_ENV).filter(|v| !v.trim().is_empty())?;
        let client_secret = lookup(CLIENT_SECRET_ENV).filter(|v| !v.trim().is_empty())?;
        Some(Self::new(client_id.trim(), client_secret.trim()))
    }

    /// Checks that the credentials look like a Google OAuth client.
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.client_id.is_empty() {
            return Err("client_id is required");
        }
        if !self.client_id.ends_with(".apps.googleusercontent.com") {
            return Err("client_id should end with .apps.googleusercontent.com");
        }
        if self.client_secret.is_empty() {
            return Err("client_secret is required");
        }
        Ok(())
    }
}

/// Settings for the OAuth flow and the Calendar API client.
#[derive(Debug, Clone)]
pub struct GoogleConfig {
    pub credentials: OAuthCredentials,

    /// Where the token JSON is stored.
    ///
    /// Defaults to `<config_dir>/gcal/token.json`.
    pub token_path: PathBuf,

    /// OAuth scopes to request.
    pub scopes: Vec<String>,

    /// Per-request timeout.
    pub timeout: Duration,

    pub user_agent: String,

    /// Ports tried, in order, for the loopback redirect server.
    pub loopback_port_range: (u16, u16),

    /// How long to wait for the browser to hit the loopback server.
    pub callback_timeout: Duration,

    /// Calendar API v3 base URL.
    pub api_base: String,

    /// OAuth authorization endpoint.
    pub auth_url: String,

    /// OAuth token endpoint.
    pub token_url: String,
}

impl GoogleConfig {
    pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

    /// Read/write calendar access; `events create` needs it.
    pub const DEFAULT_SCOPE: &'static str = "https://www.googleapis.com/auth/calendar";

    pub const DEFAULT_API_BASE: &'static str = "https://www.googleapis.com/calendar/v3";
    pub const DEFAULT_AUTH_URL: &'static str = "https://accounts.google.com/o/oauth2/v2/auth";
    pub const DEFAULT_TOKEN_URL: &'static str = "https://oauth2.googleapis.com/token";

    pub fn new(credentials: OAuthCredentials) -> Self {
        Self {
            credentials,
            token_path: Self::default_token_path(),
            scopes: vec![Self::DEFAULT_SCOPE.to_string()],
            timeout: Duration::from_secs(Self::DEFAULT_TIMEOUT_SECS),
            user_agent: format!("gcal/{}", env!("CARGO_PKG_VERSION")),
            loopback_port_range: (8080, 8090),
            callback_timeout: Duration::from_secs(300),
            api_base: Self::DEFAULT_API_BASE.to_string(),
            auth_url: Self::DEFAULT_AUTH_URL.to_string(),
            token_url: Self::DEFAULT_TOKEN_URL.to_string(),
        }
    }

    /// `<config_dir>/gcal`, or `./.gcal` when no config directory is known.
    pub fn default_dir() -> PathBuf {
        dirs::config_dir()
            .map(|d| d.join("gcal"))
            .unwrap_or_else(|| PathBuf::from(".gcal"))
    }

    pub fn default_token_path() -> PathBuf {
        Self::default_dir().join("token.json")
    }

    pub fn default_credentials_path() -> PathBuf {
        Self::default_dir().join("credentials.json")
    }

    pub fn with_token_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.token_path = path.into();
        self
    }

    pub fn with_scopes(mut self, scopes: Vec<String>) -> Self {
        self.scopes = scopes;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_loopback_port_range(mut self, start: u16, end: u16) -> Self {
        self.loopback_port_range = (start, end);
        self
    }

    /// Points the Calendar client at another base URL (used by tests).
    pub fn with_api_base(mut self, base: impl Into<String>) -> Self {
        self.api_base = base.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_token_url(mut self, url: impl Into<String>) -> Self {
        self.token_url = url.into();
        self
    }

    pub fn validate(&self) -> GoogleResult<()> {
        self.credentials
            .validate()
            .map_err(|e| GoogleError::configuration(format!("invalid credentials: {}", e)))?;

        if self.scopes.is_empty() {
            return Err(GoogleError::configuration(
                "at least one OAuth scope is required",
            ));
        }

        if self.loopback_port_range.0 > self.loopback_port_range.1 {
            return Err(GoogleError::configuration("invalid loopback port range"));
        }

        url::Url::parse(&self.api_base).map_err(|e| {
            GoogleError::configuration(format!("invalid API base URL '{}': {}", self.api_base, e))
        })?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn test_credentials() -> OAuthCredentials {
        OAuthCredentials::new("test-client.apps.googleusercontent.com", "test-secret")
    }

    #[test]
    fn credentials_validation() {
        assert!(test_credentials().validate().is_ok());
        assert!(OAuthCredentials::new("", "secret").validate().is_err());
        assert!(OAuthCredentials::new("bad-id", "secret").validate().is_err());
        assert!(
            OAuthCredentials::new("test.apps.googleusercontent.com", "")
                .validate()
                .is_err()
        );
    }

    #[test]
    fn credentials_from_json_installed() {
        let json = r#"{
            "installed": {
                "client_id": "test-id.apps.googleusercontent.com",
                "client_secret": "test-secret",
                "project_id": "my-project",
                "redirect_uris": ["http://localhost"]
            }
        }"#;

        let creds = OAuthCredentials::from_json(json).unwrap();
        assert_eq!(creds.client_id, "test-id.apps.googleusercontent.com");
        assert_eq!(creds.client_secret, "test-secret");
    }

    #[test]
    fn credentials_from_json_web_and_flat() {
        let web = r#"{"web": {"client_id": "w.apps.googleusercontent.com", "client_secret": "s"}}"#;
        assert_eq!(
            OAuthCredentials::from_json(web).unwrap().client_id,
            "w.apps.googleusercontent.com"
        );

        let flat = r#"{"client_id": "f.apps.googleusercontent.com", "client_secret": "s", "refresh_token": "x"}"#;
        assert_eq!(
            OAuthCredentials::from_json(flat).unwrap().client_id,
            "f.apps.googleusercontent.com"
        );
    }

    #[test]
    fn credentials_from_json_errors() {
        let err = OAuthCredentials::from_json(r#"{ "other": {} }"#).unwrap_err();
        assert!(err.message().contains("client_id"));

        let err = OAuthCredentials::from_json("not json").unwrap_err();
        assert!(err.message().contains("parse"));
    }

    #[test]
    fn credentials_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");
        std::fs::write(
            &path,
            r#"{"installed": {"client_id": "a.apps.googleusercontent.com", "client_secret": "b"}}"#,
        )
        .unwrap();

        let creds = OAuthCredentials::from_file(&path).unwrap();
        assert_eq!(creds.client_secret, "b");

        let missing = OAuthCredentials::from_file(dir.path().join("nope.json"));
        assert!(missing.is_err());
    }

    #[test]
    fn credentials_from_lookup_requires_both() {
        let env: HashMap<&str, &str> = HashMap::from([
            (CLIENT_ID_ENV, "env.apps.googleusercontent.com"),
            (CLIENT_SECRET_ENV, " secret "),
        ]);
        let creds = OAuthCredentials::from_lookup(|k| env.get(k).map(|v| v.to_string())).unwrap();
        assert_eq!(creds.client_id, "env.apps.googleusercontent.com");
        assert_eq!(creds.client_secret, "secret");

        let partial: HashMap<&str, &str> = HashMap::from([(CLIENT_ID_ENV, "only-id")]);
        assert!(OAuthCredentials::from_lookup(|k| partial.get(k).map(|v| v.to_string())).is_none());

        let blank: HashMap<&str, &str> =
            HashMap::from([(CLIENT_ID_ENV, "id"), (CLIENT_SECRET_ENV, "  ")]);
        assert!(OAuthCredentials::from_lookup(|k| blank.get(k).map(|v| v.to_string())).is_none());
    }

    #[test]
    fn config_defaults() {
        let config = GoogleConfig::new(test_credentials());
        assert_eq!(config.scopes, vec![GoogleConfig::DEFAULT_SCOPE.to_string()]);
        assert_eq!(config.api_base, GoogleConfig::DEFAULT_API_BASE);
        assert!(config.token_path.ends_with("gcal/token.json"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn config_builder_methods() {
        let config = GoogleConfig::new(test_credentials())
            .with_token_path("/tmp/token.json")
            .with_timeout(Duration::from_secs(60))
            .with_loopback_port_range(9000, 9010)
            .with_api_base("http://127.0.0.1:1234/");

        assert_eq!(config.token_path, PathBuf::from("/tmp/token.json"));
        assert_eq!(config.timeout, Duration::from_secs(60));
        assert_eq!(config.loopback_port_range, (9000, 9010));
        assert_eq!(config.api_base, "http://127.0.0.1:1234");
    }

    #[test]
    fn config_validation_errors() {
        let no_scopes = GoogleConfig::new(test_credentials()).with_scopes(vec![]);
        assert!(no_scopes.validate().is_err());

        let bad_ports = GoogleConfig::new(test_credentials()).with_loopback_port_range(9010, 9000);
        assert!(bad_ports.validate().is_err());

        let bad_base = GoogleConfig::new(test_credentials()).with_api_base("not a url");
        assert!(bad_base.validate().is_err());
    }
}
