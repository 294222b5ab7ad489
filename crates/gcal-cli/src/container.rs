//! Service wiring for one invocation.
//!
//! [`Services`] is built once in `main` from the parsed CLI and handed to
//! every command. Google services are created on demand because `config`
//! and `auth` commands must work before credentials exist.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use gcal_core::{I18n, Locale, OutputFormatter};
use gcal_google::{
    CalendarClient, CalendarService, GoogleAuth, GoogleConfig, OAuthCredentials, TokenSource,
};
use tracing::debug;

use crate::cli::{Cli, OutputOptions};
use crate::config::ConfigStore;
use crate::error::{CliError, CliResult};
use crate::output::Console;
use crate::prompt::{Prompt, TerminalPrompt};

/// Files the Google services read and write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GooglePaths {
    pub credentials: PathBuf,
    pub token: PathBuf,
}

impl Default for GooglePaths {
    fn default() -> Self {
        Self {
            credentials: GoogleConfig::default_credentials_path(),
            token: GoogleConfig::default_token_path(),
        }
    }
}

pub struct Services {
    config: ConfigStore,
    i18n: I18n,
    prompt: Box<dyn Prompt>,
    console: Console,
    options: OutputOptions,
    paths: GooglePaths,
    google: Option<GoogleConfig>,
    tokens: Option<Arc<dyn TokenSource>>,
}

impl Services {
    pub fn new(
        config: ConfigStore,
        prompt: Box<dyn Prompt>,
        console: Console,
        options: OutputOptions,
        paths: GooglePaths,
    ) -> Self {
        let i18n = I18n::new(Locale::resolve(config.language().as_deref()));
        Self {
            config,
            i18n,
            prompt,
            console,
            options,
            paths,
            google: None,
            tokens: None,
        }
    }

    /// Production wiring: config from `--config`/default path, terminal
    /// prompts, stdout.
    pub fn from_cli(cli: &Cli) -> CliResult<Self> {
        let config_path = cli.config.clone().unwrap_or_else(ConfigStore::default_path);
        debug!("using config file {:?}", config_path);
        let config = ConfigStore::open(config_path)?;
        let options = cli.output_options();
        Ok(Self::new(
            config,
            Box::new(TerminalPrompt),
            Console::stdout(options.quiet),
            options,
            GooglePaths::default(),
        ))
    }

    /// Uses a prepared Google configuration instead of loading credentials.
    pub fn with_google_config(mut self, config: GoogleConfig) -> Self {
        self.google = Some(config);
        self
    }

    /// Overrides the locale resolved from `language` and the environment.
    pub fn with_locale(mut self, locale: Locale) -> Self {
        self.i18n = I18n::new(locale);
        self
    }

    pub fn with_prompt(mut self, prompt: Box<dyn Prompt>) -> Self {
        self.prompt = prompt;
        self
    }

    /// Uses the given token source instead of [`GoogleAuth`].
    pub fn with_token_source(mut self, tokens: Arc<dyn TokenSource>) -> Self {
        self.tokens = Some(tokens);
        self
    }

    pub fn config(&self) -> &ConfigStore {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut ConfigStore {
        &mut self.config
    }

    pub fn i18n(&self) -> &I18n {
        &self.i18n
    }

    pub fn prompt(&self) -> &dyn Prompt {
        self.prompt.as_ref()
    }

    pub fn console(&self) -> &Console {
        &self.console
    }

    pub fn options(&self) -> &OutputOptions {
        &self.options
    }

    pub fn paths(&self) -> &GooglePaths {
        &self.paths
    }

    /// Formatter for `--format`, falling back to `output.format`.
    pub fn formatter(&self) -> OutputFormatter<'_> {
        let format = self
            .options
            .format
            .unwrap_or_else(|| self.config.output_format());
        OutputFormatter::new(format, &self.i18n)
    }

    /// Credentials from the environment, else the credentials file.
    pub fn credentials(&self) -> CliResult<OAuthCredentials> {
        if let Some(creds) = OAuthCredentials::from_env() {
            debug!("using OAuth credentials from the environment");
            return Ok(creds);
        }
        load_credentials(&self.paths.credentials)
    }

    /// Whether credentials are available without asking the user.
    pub fn has_credentials(&self) -> bool {
        self.google.is_some()
            || OAuthCredentials::from_env().is_some()
            || self.paths.credentials.exists()
    }

    pub fn google_config(&self) -> CliResult<GoogleConfig> {
        if let Some(config) = &self.google {
            return Ok(config.clone());
        }
        let credentials = self.credentials()?;
        Ok(GoogleConfig::new(credentials).with_token_path(&self.paths.token))
    }

    pub fn auth(&self) -> CliResult<GoogleAuth> {
        let config = self.google_config()?;
        GoogleAuth::new(&config).map_err(|e| CliError::from_google(e, &self.i18n))
    }

    pub fn calendar(&self) -> CliResult<CalendarService> {
        let config = self.google_config()?;
        let tokens: Arc<dyn TokenSource> = match &self.tokens {
            Some(tokens) => Arc::clone(tokens),
            None => Arc::new(self.auth()?),
        };
        let client =
            CalendarClient::new(&config).map_err(|e| CliError::from_google(e, &self.i18n))?;
        Ok(CalendarService::new(client, tokens))
    }
}

impl std::fmt::Debug for Services {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Services")
            .field("config", &self.config.path())
            .field("locale", &self.i18n.locale())
            .field("options", &self.options)
            .field("paths", &self.paths)
            .finish_non_exhaustive()
    }
}

fn load_credentials(path: &Path) -> CliResult<OAuthCredentials> {
    if !path.exists() {
        return Err(CliError::Credentials(format!(
            "no OAuth credentials found at {}, run `gcal init --credentials <file>`",
            path.display()
        )));
    }
    let creds =
        OAuthCredentials::from_file(path).map_err(|e| CliError::Credentials(e.message().to_string()))?;
    creds
        .validate()
        .map_err(|e| CliError::Credentials(format!("invalid credentials in {}: {}", path.display(), e)))?;
    Ok(creds)
}
