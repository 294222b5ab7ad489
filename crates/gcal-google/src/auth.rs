//! Access-token management.
//!
//! [`TokenSource`] is the seam the calendar service depends on; [`GoogleAuth`]
//! is the real implementation backed by the token file and the OAuth client.

use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::config::GoogleConfig;
use crate::error::{GoogleError, GoogleResult};
use crate::oauth::OAuthClient;
use crate::tokens::{TokenInfo, TokenStore};

/// A boxed future, so [`TokenSource`] stays object-safe.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Supplies bearer tokens to API calls.
pub trait TokenSource: Send + Sync {
    /// Returns a usable access token, refreshing it if it has expired.
    ///
    /// Fails with `InsufficientScope` when the stored token was granted
    /// without a required scope.
    fn access_token(&self) -> BoxFuture<'_, GoogleResult<String>>;

    /// Discards the stored token, runs the consent flow again and returns
    /// the new access token.
    fn reauthenticate(&self) -> BoxFuture<'_, GoogleResult<String>>;
}

/// State of the stored token, as reported by `gcal auth status`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthStatus {
    /// No token file (or an unreadable one).
    NotAuthenticated,
    /// Token present and unexpired.
    Valid {
        path: PathBuf,
        expires_at: Option<DateTime<Utc>>,
    },
    /// Access token expired; `refreshable` if a refresh token is stored.
    Expired { path: PathBuf, refreshable: bool },
    /// Token granted without a required scope.
    MissingScope { path: PathBuf, missing: Vec<String> },
}

impl AuthStatus {
    /// Returns true if API calls can proceed without the browser flow.
    pub fn is_usable(&self) -> bool {
        matches!(
            self,
            Self::Valid { .. }
                | Self::Expired {
                    refreshable: true,
                    ..
                }
        )
    }
}

/// Outcome of [`GoogleAuth::login`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginOutcome {
    /// A usable token already existed and `force` was not set.
    AlreadyAuthenticated,
    /// The consent flow ran and a new token was saved.
    Authenticated,
}

/// Inspects a token file without touching the network.
pub fn token_status(store: &TokenStore, required_scopes: &[String]) -> GoogleResult<AuthStatus> {
    let Some(token) = store.load()? else {
        return Ok(AuthStatus::NotAuthenticated);
    };
    let path = store.path().to_path_buf();

    let missing: Vec<String> = required_scopes
        .iter()
        .filter(|s| !token.scopes.contains(s))
        .cloned()
        .collect();
    if !missing.is_empty() {
        return Ok(AuthStatus::MissingScope { path, missing });
    }

    if token.is_expired() {
        return Ok(AuthStatus::Expired {
            path,
            refreshable: token.can_refresh(),
        });
    }

    Ok(AuthStatus::Valid {
        path,
        expires_at: token.expires_at,
    })
}

/// Token source backed by the token file and Google's OAuth endpoints.
pub struct GoogleAuth {
    scopes: Vec<String>,
    store: TokenStore,
    oauth: OAuthClient,
    /// Token loaded for this invocation; `None` until first use.
    cached: Mutex<Option<TokenInfo>>,
}

impl GoogleAuth {
    pub fn new(config: &GoogleConfig) -> GoogleResult<Self> {
        config.validate()?;
        Ok(Self {
            scopes: config.scopes.clone(),
            store: TokenStore::new(&config.token_path),
            oauth: OAuthClient::new(config)?,
            cached: Mutex::new(None),
        })
    }

    pub fn token_path(&self) -> &std::path::Path {
        self.store.path()
    }

    pub fn status(&self) -> GoogleResult<AuthStatus> {
        token_status(&self.store, &self.scopes)
    }

    /// Runs the consent flow unless a usable token exists.
    ///
    /// `force` always runs the flow.
    pub async fn login(&self, force: bool) -> GoogleResult<LoginOutcome> {
        if !force && self.status()?.is_usable() {
            debug!("existing token is usable, skipping consent flow");
            return Ok(LoginOutcome::AlreadyAuthenticated);
        }

        self.authorize_and_store().await?;
        Ok(LoginOutcome::Authenticated)
    }

    /// Removes the stored token. Returns whether a token file existed.
    pub async fn logout(&self) -> GoogleResult<bool> {
        *self.cached.lock().await = None;
        self.store.clear()
    }

    async fn authorize_and_store(&self) -> GoogleResult<TokenInfo> {
        let token = self.oauth.authorize().await?;
        self.store.save(&token)?;
        info!("saved new token to {:?}", self.store.path());
        *self.cached.lock().await = Some(token.clone());
        Ok(token)
    }

    async fn current_access_token(&self) -> GoogleResult<String> {
        let mut cached = self.cached.lock().await;
        if cached.is_none() {
            *cached = self.store.load()?;
        }
        let token = cached.as_mut().ok_or_else(|| {
            GoogleError::authentication("not authenticated, run `gcal init`")
        })?;

        if !token.has_scopes(&self.scopes) {
            return Err(GoogleError::insufficient_scope(format!(
                "stored token lacks required scopes: {}",
                self.scopes.join(" ")
            )));
        }

        if token.is_expired() {
            let refresh_token = token.refresh_token.clone().filter(|t| !t.is_empty()).ok_or_else(|| {
                GoogleError::authentication(
                    "access token expired and no refresh token is stored, run `gcal init`",
                )
            })?;

            debug!("access token expired, refreshing");
            let refreshed = self.oauth.refresh(&refresh_token).await.map_err(|e| {
                warn!("token refresh failed: {}", e);
                GoogleError::authentication(format!(
                    "{}; run `gcal init --force` to sign in again",
                    e.message()
                ))
                .with_source(e)
            })?;
            token.apply_refresh(
                refreshed.access_token,
                refreshed.expires_in,
                refreshed.scopes,
            );
            self.store.save(token)?;
        }

        Ok(token.access_token.clone())
    }

    async fn reauthenticate_now(&self) -> GoogleResult<String> {
        warn!("re-authenticating to obtain the required scopes");
        *self.cached.lock().await = None;
        self.store.clear()?;
        let token = self.authorize_and_store().await?;
        Ok(token.access_token)
    }
}

impl TokenSource for GoogleAuth {
    fn access_token(&self) -> BoxFuture<'_, GoogleResult<String>> {
        Box::pin(self.current_access_token())
    }

    fn reauthenticate(&self) -> BoxFuture<'_, GoogleResult<String>> {
        Box::pin(self.reauthenticate_now())
    }
}

impl std::fmt::Debug for GoogleAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoogleAuth")
            .field("scopes", &self.scopes)
            .field("token_path", &self.store.path())
            .finish_non_exhaustive()
    }
}
