//! OAuth 2.0 authorization code flow with PKCE for installed applications.
//!
//! # Flow Overview
//!
//! 1. Generate a code verifier, its SHA-256 challenge and a random state
//! 2. Bind a loopback server on the first free port in the configured range
//! 3. Open the browser on Google's consent page
//! 4. Google redirects to `http://127.0.0.1:<port>/callback?code=...&state=...`
//! 5. Check the state and exchange the code (with the verifier) for tokens
//!
//! The loopback server only listens on 127.0.0.1 and gives up after the
//! configured callback timeout.

use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::Rng as _;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, info, warn};

use crate::config::{GoogleConfig, OAuthCredentials};
use crate::error::{GoogleError, GoogleResult};
use crate::tokens::TokenInfo;

/// Bytes of randomness in the code verifier (43 chars once encoded).
const CODE_VERIFIER_LENGTH: usize = 32;

const CALLBACK_PATH: &str = "/callback";

const SUCCESS_PAGE: &str = "HTTP/1.1 200 OK\r\nContent-Type: text/html; charset=utf-8\r\nConnection: close\r\n\r\n\
    <html><body><h1>Authorization successful</h1>\
    <p>You can close this window and return to the terminal.</p></body></html>";

const FAILURE_PAGE: &str = "HTTP/1.1 400 Bad Request\r\nContent-Type: text/html; charset=utf-8\r\nConnection: close\r\n\r\n\
    <html><body><h1>Authorization failed</h1>\
    <p>You can close this window.</p></body></html>";

const NOT_FOUND_PAGE: &str = "HTTP/1.1 404 Not Found\r\nConnection: close\r\n\r\n";

/// OAuth client for the installed-app flow and token refresh.
#[derive(Debug, Clone)]
pub struct OAuthClient {
    credentials: OAuthCredentials,
    http_client: reqwest::Client,
    auth_url: String,
    token_url: String,
    scopes: Vec<String>,
    port_range: (u16, u16),
    callback_timeout: Duration,
}

/// Result of a refresh grant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshedToken {
    pub access_token: String,
    pub expires_in: Option<i64>,
    /// Granted scopes, when Google reports them.
    pub scopes: Option<Vec<String>>,
}

impl OAuthClient {
    pub fn new(config: &GoogleConfig) -> GoogleResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| {
                GoogleError::internal(format!("failed to create HTTP client: {}", e))
                    .with_source(e)
            })?;

        Ok(Self {
            credentials: config.credentials.clone(),
            http_client,
            auth_url: config.auth_url.clone(),
            token_url: config.token_url.clone(),
            scopes: config.scopes.clone(),
            port_range: config.loopback_port_range,
            callback_timeout: config.callback_timeout,
        })
    }

    /// Runs the browser flow and returns a fresh token set.
    ///
    /// # Errors
    ///
    /// Fails if no loopback port is free, the user denies access, the
    /// callback times out, the state does not match, or the exchange fails.
    pub async fn authorize(&self) -> GoogleResult<TokenInfo> {
        let pkce = PkceFlow::new();

        let (listener, port) = bind_loopback_server(self.port_range).await?;
        let redirect_uri = format!("http://127.0.0.1:{}{}", port, CALLBACK_PATH);

        let auth_url = pkce.build_auth_url(
            &self.auth_url,
            &self.credentials.client_id,
            &redirect_uri,
            &self.scopes,
        );

        info!("starting OAuth flow, opening browser");
        debug!("authorization URL: {}", auth_url);

        if let Err(e) = open::that(&auth_url) {
            warn!("failed to open browser: {}", e);
        }
        // Always print the URL; headless sessions have no browser.
        eprintln!("\nIf the browser did not open, visit this URL:\n\n{}\n", auth_url);

        let callback = wait_for_callback(listener, self.callback_timeout).await?;

        if callback.state != pkce.state {
            return Err(GoogleError::authentication(
                "OAuth state mismatch, the callback did not come from this login attempt",
            ));
        }

        info!("received authorization code, exchanging for tokens");
        self.exchange_code(&callback.code, &pkce.verifier, &redirect_uri)
            .await
    }

    /// Exchanges an authorization code for tokens.
    pub async fn exchange_code(
        &self,
        code: &str,
        verifier: &str,
        redirect_uri: &str,
    ) -> GoogleResult<TokenInfo> {
        let params = [
            ("client_id", self.credentials.client_id.as_str()),
            ("client_secret", self.credentials.client_secret.as_str()),
            ("code", code),
            ("code_verifier", verifier),
            ("grant_type", "authorization_code"),
            ("redirect_uri", redirect_uri),
        ];

        let response = self.post_token(&params, "token exchange").await?;
        info!("obtained OAuth tokens");

        let scopes = response
            .granted_scopes()
            .unwrap_or_else(|| self.scopes.clone());
        Ok(TokenInfo::new(
            response.access_token,
            response.refresh_token,
            response.expires_in,
            scopes,
        ))
    }

    /// Obtains a new access token from a refresh token.
    pub async fn refresh(&self, refresh_token: &str) -> GoogleResult<RefreshedToken> {
        let params = [
            ("client_id", self.credentials.client_id.as_str()),
            ("client_secret", self.credentials.client_secret.as_str()),
            ("refresh_token", refresh_token),
            ("grant_type", "refresh_token"),
        ];

        let response = self.post_token(&params, "token refresh").await?;
        info!("refreshed access token");

        let scopes = response.granted_scopes();
        Ok(RefreshedToken {
            access_token: response.access_token,
            expires_in: response.expires_in,
            scopes,
        })
    }

    async fn post_token(
        &self,
        params: &[(&str, &str)],
        what: &str,
    ) -> GoogleResult<TokenResponse> {
        let response = self
            .http_client
            .post(&self.token_url)
            .form(params)
            .send()
            .await
            .map_err(|e| GoogleError::network(format!("{} request failed: {}", what, e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| GoogleError::network(format!("failed to read response: {}", e)))?;

        if !status.is_success() {
            return Err(GoogleError::authentication(format!(
                "{} failed ({}): {}",
                what,
                status,
                token_error_message(&body)
            )));
        }

        serde_json::from_str(&body).map_err(|e| {
            GoogleError::invalid_response(format!("invalid token response: {}", e))
        })
    }
}

/// Tries each port in the range until one binds.
async fn bind_loopback_server(port_range: (u16, u16)) -> GoogleResult<(TcpListener, u16)> {
    for port in port_range.0..=port_range.1 {
        if let Ok(listener) = TcpListener::bind(("127.0.0.1", port)).await {
            let port = listener.local_addr().map(|a| a.port()).unwrap_or(port);
            debug!("bound loopback server on port {}", port);
            return Ok((listener, port));
        }
    }
    Err(GoogleError::configuration(format!(
        "no available port in range {}-{}",
        port_range.0, port_range.1
    )))
}

/// Accepts connections until one carries the OAuth callback.
async fn wait_for_callback(
    listener: TcpListener,
    timeout: Duration,
) -> GoogleResult<CallbackParams> {
    let accept_loop = async {
        loop {
            let (stream, peer) = listener.accept().await.map_err(|e| {
                GoogleError::internal(format!("failed to accept connection: {}", e))
            })?;
            debug!("loopback connection from {}", peer);
            if let Some(result) = handle_connection(stream).await {
                return result;
            }
        }
    };

    tokio::time::timeout(timeout, accept_loop)
        .await
        .map_err(|_| GoogleError::authentication("timed out waiting for the OAuth callback"))?
}

/// Handles one HTTP request. Returns `None` for requests that are not the
/// callback (favicon requests and the like).
async fn handle_connection(mut stream: TcpStream) -> Option<GoogleResult<CallbackParams>> {
    let mut request_line = String::new();
    {
        let mut reader = BufReader::new(&mut stream);
        if reader.read_line(&mut request_line).await.is_err() {
            return None;
        }
    }

    let mut parts = request_line.split_whitespace();
    let (Some("GET"), Some(target)) = (parts.next(), parts.next()) else {
        return None;
    };

    if !target.starts_with(CALLBACK_PATH) {
        let _ = stream.write_all(NOT_FOUND_PAGE.as_bytes()).await;
        return None;
    }

    let result = parse_callback(target);
    let page = if result.is_ok() { SUCCESS_PAGE } else { FAILURE_PAGE };
    let _ = stream.write_all(page.as_bytes()).await;
    let _ = stream.flush().await;

    Some(result)
}

/// Query parameters of a successful redirect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbackParams {
    pub code: String,
    pub state: String,
}

/// Parses the request target of the loopback redirect.
pub fn parse_callback(target: &str) -> GoogleResult<CallbackParams> {
    let url = url::Url::parse(&format!("http://127.0.0.1{}", target))
        .map_err(|e| GoogleError::authentication(format!("malformed callback URL: {}", e)))?;

    let mut code = None;
    let mut state = None;
    let mut error = None;
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "code" => code = Some(value.into_owned()),
            "state" => state = Some(value.into_owned()),
            "error" => error = Some(value.into_owned()),
            _ => {}
        }
    }

    if let Some(error) = error {
        return Err(GoogleError::authentication(format!(
            "authorization denied: {}",
            error
        )));
    }

    match code {
        Some(code) if !code.is_empty() => Ok(CallbackParams {
            code,
            state: state.unwrap_or_default(),
        }),
        _ => Err(GoogleError::authentication(
            "missing authorization code in callback",
        )),
    }
}

/// PKCE parameters (RFC 7636) for one authorization attempt.
#[derive(Debug)]
pub struct PkceFlow {
    /// High-entropy random string sent with the token exchange.
    pub verifier: String,
    /// Base64url SHA-256 of the verifier.
    pub challenge: String,
    /// Random value echoed back by the redirect.
    pub state: String,
}

impl PkceFlow {
    pub fn new() -> Self {
        let verifier = random_token(CODE_VERIFIER_LENGTH);
        let challenge = Self::compute_challenge(&verifier);
        Self {
            verifier,
            challenge,
            state: random_token(16),
        }
    }

    fn compute_challenge(verifier: &str) -> String {
        let digest = Sha256::digest(verifier.as_bytes());
        URL_SAFE_NO_PAD.encode(digest)
    }

    /// Builds the consent page URL.
    ///
    /// `access_type=offline` and `prompt=consent` make Google return a
    /// refresh token every time.
    pub fn build_auth_url(
        &self,
        auth_url: &str,
        client_id: &str,
        redirect_uri: &str,
        scopes: &[String],
    ) -> String {
        let scope = scopes.join(" ");

        format!(
            "{}?client_id={}&redirect_uri={}&response_type=code&scope={}&\
            code_challenge={}&code_challenge_method=S256&state={}&\
            access_type=offline&prompt=consent",
            auth_url,
            urlencoding::encode(client_id),
            urlencoding::encode(redirect_uri),
            urlencoding::encode(&scope),
            urlencoding::encode(&self.challenge),
            urlencoding::encode(&self.state),
        )
    }
}

impl Default for PkceFlow {
    fn default() -> Self {
        Self::new()
    }
}

fn random_token(len: usize) -> String {
    let mut rng = rand::rng();
    let bytes: Vec<u8> = (0..len).map(|_| rng.random()).collect();
    URL_SAFE_NO_PAD.encode(&bytes)
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
    /// Space-separated granted scopes.
    #[serde(default)]
    scope: Option<String>,
}

impl TokenResponse {
    fn granted_scopes(&self) -> Option<Vec<String>> {
        self.scope
            .as_deref()
            .map(|s| s.split_whitespace().map(String::from).collect())
    }
}

#[derive(Debug, Deserialize)]
struct TokenErrorResponse {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

/// `invalid_grant: Token has been expired or revoked.` from Google's error
/// body, or the raw body when it is not the standard shape.
fn token_error_message(body: &str) -> String {
    match serde_json::from_str::<TokenErrorResponse>(body) {
        Ok(TokenErrorResponse {
            error,
            error_description: Some(description),
        }) => format!("{}: {}", error, description),
        Ok(TokenErrorResponse { error, .. }) => error,
        Err(_) => body.trim().to_string(),
    }
}
