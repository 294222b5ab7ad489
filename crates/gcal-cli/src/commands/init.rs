//! `gcal init`: install OAuth credentials and sign in.

use std::fs;
use std::path::{Path, PathBuf};

use gcal_google::{LoginOutcome, OAuthCredentials};
use tracing::{debug, info};

use crate::container::Services;
use crate::error::{CliError, CliResult};

/// Installs credentials if needed, then runs the consent flow.
///
/// Credentials come from `--credentials`, or are asked for when none are
/// installed yet. An existing usable token is kept unless `force` is set.
pub async fn run(services: &Services, credentials: Option<PathBuf>, force: bool) -> CliResult<()> {
    let i18n = services.i18n();

    match credentials {
        Some(source) => install_credentials(services, &source)?,
        None if !services.has_credentials() => {
            let answer = services
                .prompt()
                .input(&i18n.t("prompt.credentials_path"), None)?;
            install_credentials(services, &expand_path(&answer))?;
        }
        None => debug!("using installed credentials"),
    }

    let auth = services.auth()?;
    if !force
        && auth
            .status()
            .map_err(|e| CliError::from_google(e, i18n))?
            .is_usable()
    {
        return services.console().info(&i18n.t("init.already_authenticated"));
    }

    services.console().info(&i18n.t("init.starting"))?;
    if auth
        .login(true)
        .await
        .map_err(|e| CliError::from_google(e, i18n))?
        == LoginOutcome::Authenticated
    {
        info!("authentication complete");
    }

    let path = auth.token_path().display().to_string();
    services
        .console()
        .info(&i18n.tf("init.success", &[("path", &path)]))
}

/// Validates a downloaded credentials file and copies it into place.
fn install_credentials(services: &Services, source: &Path) -> CliResult<()> {
    let creds = OAuthCredentials::from_file(source)
        .map_err(|e| CliError::Credentials(e.message().to_string()))?;
    creds.validate().map_err(|e| {
        CliError::Credentials(format!("invalid credentials in {}: {}", source.display(), e))
    })?;

    let dest = &services.paths().credentials;
    if source != dest.as_path() {
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::copy(source, dest)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(dest, fs::Permissions::from_mode(0o600))?;
        }
        info!("installed credentials from {:?}", source);
    }

    let path = dest.display().to_string();
    services
        .console()
        .info(&services.i18n().tf("init.credentials_saved", &[("path", &path)]))
}

/// Strips quotes left by drag-and-drop and expands a leading `~`.
fn expand_path(input: &str) -> PathBuf {
    let trimmed = input.trim().trim_matches(|c| c == '"' || c == '\'');
    match trimmed.strip_prefix("~/") {
        Some(rest) => dirs::home_dir()
            .map(|home| home.join(rest))
            .unwrap_or_else(|| PathBuf::from(trimmed)),
        None => PathBuf::from(trimmed),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::OutputOptions;
    use crate::container::testing::{api_harness, harness};
    use crate::prompt::ScriptedPrompt;
    use gcal_google::{GoogleConfig, TokenInfo, TokenStore};

    const CREDENTIALS: &str = r#"{"installed": {
        "client_id": "123.apps.googleusercontent.com",
        "client_secret": "shh",
        "redirect_uris": ["http://localhost"]
    }}"#;

    #[test]
    fn installs_valid_credentials() {
        let h = harness(OutputOptions::default(), &[]);
        let download = h.dir.path().join("client_secret_123.json");
        fs::write(&download, CREDENTIALS).unwrap();

        install_credentials(&h.services, &download).unwrap();

        let installed = &h.services.paths().credentials;
        assert_eq!(fs::read_to_string(installed).unwrap(), CREDENTIALS);
        assert!(h.output.contents().starts_with("Credentials saved to "));
        assert_eq!(
            h.services.credentials().unwrap().client_id,
            "123.apps.googleusercontent.com"
        );
    }

    #[test]
    fn rejects_invalid_credentials() {
        let h = harness(OutputOptions::default(), &[]);
        let download = h.dir.path().join("bad.json");
        fs::write(&download, r#"{"something": "else"}"#).unwrap();

        let err = install_credentials(&h.services, &download).unwrap_err();
        assert!(matches!(err, CliError::Credentials(_)));
        assert!(!h.services.paths().credentials.exists());

        let missing = h.dir.path().join("missing.json");
        assert!(install_credentials(&h.services, &missing).is_err());
    }

    #[tokio::test]
    async fn prompts_for_credentials_when_none_installed() {
        let mut h = harness(OutputOptions::default(), &[]);
        let download = h.dir.path().join("downloaded.json");
        fs::write(&download, CREDENTIALS).unwrap();
        let token = TokenInfo::new(
            "access",
            Some("1//refresh".to_string()),
            Some(3600),
            vec![GoogleConfig::DEFAULT_SCOPE.to_string()],
        );
        TokenStore::new(&h.services.paths().token).save(&token).unwrap();

        let answer = format!("'{}'", download.display());
        h.services = h
            .services
            .with_prompt(Box::new(ScriptedPrompt::new([answer])));
        run(&h.services, None, false).await.unwrap();

        assert!(h.services.paths().credentials.exists());
        assert!(
            h.output
                .contents()
                .ends_with("Already authenticated. Use --force to re-authenticate.\n")
        );
    }

    #[tokio::test]
    async fn keeps_usable_token_without_force() {
        let h = api_harness(OutputOptions::default(), "http://127.0.0.1:9");
        let token = TokenInfo::new(
            "access",
            None,
            Some(3600),
            vec![GoogleConfig::DEFAULT_SCOPE.to_string()],
        );
        TokenStore::new(&h.services.paths().token).save(&token).unwrap();

        run(&h.services, None, false).await.unwrap();
        assert_eq!(
            h.output.contents(),
            "Already authenticated. Use --force to re-authenticate.\n"
        );
    }

    #[test]
    fn expand_path_handles_quotes_and_home() {
        assert_eq!(
            expand_path(" \"/tmp/creds.json\" "),
            PathBuf::from("/tmp/creds.json")
        );
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_path("~/creds.json"), home.join("creds.json"));
        }
    }
}
