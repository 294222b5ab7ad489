//! OAuth token persistence.
//!
//! The token file is the only auth state shared between invocations. It is
//! written through a temp file and renamed into place, with 0600 permissions
//! on Unix.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{GoogleError, GoogleResult};

/// Seconds subtracted from the reported lifetime so tokens refresh early.
const EXPIRY_BUFFER_SECS: i64 = 60;

/// An OAuth token set as stored on disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenInfo {
    pub access_token: String,

    pub refresh_token: Option<String>,

    /// When the access token expires (already shortened by the buffer).
    pub expires_at: Option<DateTime<Utc>>,

    /// Scopes Google reported as granted.
    #[serde(default)]
    pub scopes: Vec<String>,

    pub last_refresh: DateTime<Utc>,
}

impl TokenInfo {
    pub fn new(
        access_token: impl Into<String>,
        refresh_token: Option<String>,
        expires_in_secs: Option<i64>,
        scopes: Vec<String>,
    ) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token,
            expires_at: expires_in_secs.map(expiry_from_now),
            scopes,
            last_refresh: Utc::now(),
        }
    }

    /// Returns true if the access token is expired or about to expire.
    ///
    /// Tokens without an expiry are treated as valid.
    pub fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|at| Utc::now() >= at)
    }

    /// Returns true if every required scope was granted.
    pub fn has_scopes(&self, required: &[String]) -> bool {
        required.iter().all(|scope| self.scopes.contains(scope))
    }

    pub fn can_refresh(&self) -> bool {
        self.refresh_token.as_deref().is_some_and(|t| !t.is_empty())
    }

    /// Applies the result of a refresh grant.
    ///
    /// Google omits `refresh_token` and sometimes `scope` on refresh; the
    /// existing values are kept in that case.
    pub fn apply_refresh(
        &mut self,
        access_token: impl Into<String>,
        expires_in_secs: Option<i64>,
        scopes: Option<Vec<String>>,
    ) {
        self.access_token = access_token.into();
        self.expires_at = expires_in_secs.map(expiry_from_now);
        if let Some(scopes) = scopes {
            self.scopes = scopes;
        }
        self.last_refresh = Utc::now();
    }

    pub fn time_until_expiry(&self) -> Option<Duration> {
        self.expires_at.map(|at| at - Utc::now())
    }
}

fn expiry_from_now(secs: i64) -> DateTime<Utc> {
    Utc::now() + Duration::seconds(secs) - Duration::seconds(EXPIRY_BUFFER_SECS)
}

/// File-backed token store.
#[derive(Debug, Clone)]
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the stored token.
    ///
    /// A missing file yields `Ok(None)`. A corrupt file is logged and also
    /// treated as absent so that `gcal init` can overwrite it.
    pub fn load(&self) -> GoogleResult<Option<TokenInfo>> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("no token file at {:?}", self.path);
                return Ok(None);
            }
            Err(e) => {
                return Err(GoogleError::configuration(format!(
                    "failed to read token file {}: {}",
                    self.path.display(),
                    e
                ))
                .with_source(e));
            }
        };

        match serde_json::from_str::<TokenInfo>(&content) {
            Ok(token) => {
                debug!("loaded token from {:?}", self.path);
                Ok(Some(token))
            }
            Err(e) => {
                warn!("ignoring unreadable token file {:?}: {}", self.path, e);
                Ok(None)
            }
        }
    }

    /// Writes the token atomically.
    pub fn save(&self, token: &TokenInfo) -> GoogleResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                GoogleError::configuration(format!("failed to create token directory: {}", e))
            })?;
        }

        let content = serde_json::to_string_pretty(token)
            .map_err(|e| GoogleError::internal(format!("failed to serialize token: {}", e)))?;

        let temp_path = self.path.with_extension("json.tmp");
        fs::write(&temp_path, content).map_err(|e| {
            GoogleError::configuration(format!("failed to write token file: {}", e))
        })?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = fs::Permissions::from_mode(0o600);
            if let Err(e) = fs::set_permissions(&temp_path, perms) {
                warn!("failed to restrict token file permissions: {}", e);
            }
        }

        fs::rename(&temp_path, &self.path).map_err(|e| {
            GoogleError::configuration(format!("failed to rename token file: {}", e))
        })?;

        debug!("saved token to {:?}", self.path);
        Ok(())
    }

    /// Deletes the token file. Returns whether a file was removed.
    pub fn clear(&self) -> GoogleResult<bool> {
        match fs::remove_file(&self.path) {
            Ok(()) => {
                info!("removed token file {:?}", self.path);
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(GoogleError::configuration(format!(
                "failed to remove token file: {}",
                e
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scope(s: &str) -> Vec<String> {
        vec![s.to_string()]
    }

    #[test]
    fn token_info_creation() {
        let token = TokenInfo::new(
            "access-token",
            Some("refresh-token".to_string()),
            Some(3600),
            scope("calendar"),
        );

        assert_eq!(token.access_token, "access-token");
        assert!(token.can_refresh());
        assert!(!token.is_expired());
        let remaining = token.time_until_expiry().unwrap();
        assert!(remaining <= Duration::seconds(3600 - EXPIRY_BUFFER_SECS));
    }

    #[test]
    fn token_info_expired() {
        let mut token = TokenInfo::new("access", None, Some(3600), vec![]);
        token.expires_at = Some(Utc::now() - Duration::hours(1));
        assert!(token.is_expired());
        assert!(!token.can_refresh());

        let no_expiry = TokenInfo::new("access", None, None, vec![]);
        assert!(!no_expiry.is_expired());
    }

    #[test]
    fn token_info_scope_check() {
        let token = TokenInfo::new(
            "access",
            None,
            None,
            vec!["scope1".to_string(), "scope2".to_string()],
        );

        assert!(token.has_scopes(&scope("scope1")));
        assert!(token.has_scopes(&["scope1".to_string(), "scope2".to_string()]));
        assert!(!token.has_scopes(&scope("scope3")));
    }

    #[test]
    fn apply_refresh_keeps_scopes_when_omitted() {
        let mut token = TokenInfo::new("old", Some("r".to_string()), Some(10), scope("a"));
        token.apply_refresh("new", Some(3600), None);
        assert_eq!(token.access_token, "new");
        assert_eq!(token.scopes, scope("a"));
        assert_eq!(token.refresh_token.as_deref(), Some("r"));

        token.apply_refresh("newer", None, Some(scope("b")));
        assert_eq!(token.scopes, scope("b"));
        assert!(token.expires_at.is_none());
    }

    #[test]
    fn store_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore::new(dir.path().join("nested").join("token.json"));

        let token = TokenInfo::new(
            "access-token",
            Some("refresh-token".to_string()),
            Some(3600),
            scope("calendar"),
        );
        store.save(&token).unwrap();
        assert!(store.path().exists());

        let loaded = TokenStore::new(store.path()).load().unwrap().unwrap();
        assert_eq!(loaded, token);
    }

    #[cfg(unix)]
    #[test]
    fn store_restricts_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore::new(dir.path().join("token.json"));
        store
            .save(&TokenInfo::new("a", None, None, vec![]))
            .unwrap();

        let mode = fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn store_missing_and_corrupt_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore::new(dir.path().join("token.json"));
        assert!(store.load().unwrap().is_none());

        fs::write(store.path(), "{ not json").unwrap();
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn store_clear() {
        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore::new(dir.path().join("token.json"));
        store
            .save(&TokenInfo::new("access", None, None, vec![]))
            .unwrap();

        assert!(store.clear().unwrap());
        assert!(!store.path().exists());
        assert!(!store.clear().unwrap());
    }
}
