//! `gcal auth`: inspect or discard the stored token.

use gcal_google::{AuthStatus, GoogleConfig, TokenStore, token_status};
use tracing::info;

use crate::container::Services;
use crate::error::{CliError, CliResult};

/// Reports the state of the token file without contacting Google.
pub fn status(services: &Services) -> CliResult<()> {
    let store = TokenStore::new(&services.paths().token);
    let scopes = vec![GoogleConfig::DEFAULT_SCOPE.to_string()];
    let status =
        token_status(&store, &scopes).map_err(|e| CliError::from_google(e, services.i18n()))?;

    let i18n = services.i18n();
    let message = match &status {
        AuthStatus::Valid { path, .. } => {
            i18n.tf("auth.status.valid", &[("path", &path.display().to_string())])
        }
        AuthStatus::Expired {
            path,
            refreshable: true,
        } => i18n.tf("auth.status.expired", &[("path", &path.display().to_string())]),
        AuthStatus::MissingScope { .. } => i18n.t("auth.status.missing_scope"),
        AuthStatus::Expired {
            refreshable: false, ..
        }
        | AuthStatus::NotAuthenticated => i18n.t("auth.status.none"),
    };
    services.console().print(&message)
}

/// Deletes the token file.
pub fn logout(services: &Services) -> CliResult<()> {
    let store = TokenStore::new(&services.paths().token);
    let removed = store
        .clear()
        .map_err(|e| CliError::from_google(e, services.i18n()))?;

    let i18n = services.i18n();
    if removed {
        info!("removed token {:?}", store.path());
        services.console().info(&i18n.t("auth.logout"))
    } else {
        services.console().info(&i18n.t("auth.status.none"))
    }
}
