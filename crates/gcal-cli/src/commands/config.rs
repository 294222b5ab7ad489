//! `gcal config`: read and change settings.

use gcal_core::{Tabular, cell_text};
use serde_json::Value;

use crate::config::{ConfigEntry, ConfigSource, key_spec};
use crate::container::Services;
use crate::error::CliResult;
use crate::output::print_list;

/// Prints the effective value of `key`.
pub fn get(services: &Services, key: &str) -> CliResult<()> {
    let value = services.config().get(key)?;
    let text = if services.formatter().format().is_json() {
        value.to_string()
    } else {
        cell_text(&value)
    };
    services.console().print(&text)
}

pub fn set(services: &mut Services, key: &str, raw: &str) -> CliResult<()> {
    let value = services.config_mut().set(key, raw)?;
    let message = services.i18n().tf(
        "config.set",
        &[("key", key_spec(key)?.key), ("value", &cell_text(&value))],
    );
    services.console().info(&message)
}

pub fn list(services: &Services) -> CliResult<()> {
    let i18n = services.i18n();
    let rows: Vec<ConfigRow> = services
        .config()
        .list()
        .into_iter()
        .map(|entry| {
            let label = match entry.source {
                ConfigSource::File => i18n.t("config.source.file"),
                ConfigSource::Default => i18n.t("config.source.default"),
            };
            ConfigRow { entry, label }
        })
        .collect();
    print_list(services, &rows, "config.none")
}

pub fn unset(services: &mut Services, key: &str) -> CliResult<()> {
    let removed = services.config_mut().unset(key)?;
    let message_key = if removed { "config.unset" } else { "config.not_set" };
    let message = services
        .i18n()
        .tf(message_key, &[("key", key_spec(key)?.key)]);
    services.console().info(&message)
}

/// Deletes the config file after confirmation (skipped with `--yes`).
pub fn reset(services: &mut Services) -> CliResult<()> {
    if !services.options().yes {
        let question = services.i18n().t("prompt.confirm_reset");
        if !services.prompt().confirm(&question, false)? {
            let message = services.i18n().t("config.reset_cancelled");
            return services.console().info(&message);
        }
    }
    services.config_mut().reset()?;
    let message = services.i18n().t("config.reset");
    services.console().info(&message)
}

/// A `config list` row with its translated source label.
struct ConfigRow {
    entry: ConfigEntry,
    label: String,
}

impl Tabular for ConfigRow {
    const FIELDS: &'static [&'static str] = &["key", "value", "source"];
    const DEFAULT_FIELDS: &'static [&'static str] = &["key", "value", "source"];

    fn id(&self) -> &str {
        self.entry.key
    }

    fn field(&self, name: &str) -> Value {
        match name {
            "key" => Value::from(self.entry.key),
            "value" => self.entry.value.clone(),
            "source" => Value::from(match self.entry.source {
                ConfigSource::File => "file",
                ConfigSource::Default => "default",
            }),
            _ => Value::Null,
        }
    }

    fn display(&self, name: &str) -> String {
        match name {
            "source" => self.label.clone(),
            _ => cell_text(&self.field(name)),
        }
    }
}
