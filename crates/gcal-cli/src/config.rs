//! User configuration.
//!
//! Settings live in a JSON document at `<config_dir>/gcal/config.json`,
//! addressed by dot-separated keys such as `events.maxResults`. Only the
//! keys in [`KEYS`] can be read or written; each carries a type, a
//! constraint and a default.

use std::fs;
use std::path::{Path, PathBuf};

use gcal_core::OutputFormat;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Environment variable overriding the config file location.
pub const CONFIG_ENV: &str = "GCAL_CONFIG";

/// Errors from reading, validating or writing the config document.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unknown configuration key '{key}' (valid keys: {valid})")]
    UnknownKey { key: String, valid: String },

    #[error("invalid value '{value}' for {key}: expected {expected}")]
    InvalidValue {
        key: String,
        value: String,
        expected: String,
    },

    #[error("configuration file {} must contain a JSON object", .path.display())]
    NotAnObject { path: PathBuf },

    #[error("failed to parse configuration file {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to access configuration file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// The type and constraint of a config value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    /// A string from a fixed set.
    Choice(&'static [&'static str]),
    /// Any non-empty string.
    Text,
    /// An integer in `min..=max`.
    Integer { min: i64, max: i64 },
    Boolean,
}

impl ValueKind {
    /// Human-readable constraint, used in error messages.
    pub fn describe(&self) -> String {
        match self {
            Self::Choice(choices) => format!("one of {}", choices.join(", ")),
            Self::Text => "a non-empty string".to_string(),
            Self::Integer { min, max } => format!("an integer between {} and {}", min, max),
            Self::Boolean => "true or false".to_string(),
        }
    }

    /// Parses command-line input into a JSON value of this kind.
    pub fn parse(&self, raw: &str) -> Option<Value> {
        let raw = raw.trim();
        match self {
            Self::Choice(choices) => choices
                .iter()
                .find(|c| c.eq_ignore_ascii_case(raw))
                .map(|c| Value::from(*c)),
            Self::Text => (!raw.is_empty()).then(|| Value::from(raw)),
            Self::Integer { min, max } => raw
                .parse::<i64>()
                .ok()
                .filter(|n| (*min..=*max).contains(n))
                .map(Value::from),
            Self::Boolean => match raw.to_ascii_lowercase().as_str() {
                "true" | "yes" | "1" => Some(Value::Bool(true)),
                "false" | "no" | "0" => Some(Value::Bool(false)),
                _ => None,
            },
        }
    }

    /// Returns true if a stored JSON value satisfies this kind.
    pub fn accepts(&self, value: &Value) -> bool {
        match (self, value) {
            (Self::Choice(choices), Value::String(s)) => choices.contains(&s.as_str()),
            (Self::Text, Value::String(s)) => !s.trim().is_empty(),
            (Self::Integer { min, max }, Value::Number(n)) => {
                n.as_i64().is_some_and(|n| (*min..=*max).contains(&n))
            }
            (Self::Boolean, Value::Bool(_)) => true,
            _ => false,
        }
    }
}

/// Default of a config key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefaultValue {
    Str(&'static str),
    Int(i64),
    Bool(bool),
}

impl DefaultValue {
    pub fn to_value(self) -> Value {
        match self {
            Self::Str(s) => Value::from(s),
            Self::Int(n) => Value::from(n),
            Self::Bool(b) => Value::Bool(b),
        }
    }
}

/// One allowed configuration key.
#[derive(Debug, Clone, Copy)]
pub struct KeySpec {
    pub key: &'static str,
    pub kind: ValueKind,
    pub default: DefaultValue,
}

pub const LANGUAGE: &str = "language";
pub const OUTPUT_FORMAT: &str = "output.format";
pub const EVENTS_MAX_RESULTS: &str = "events.maxResults";
pub const EVENTS_DAYS: &str = "events.days";
pub const EVENTS_DEFAULT_CALENDAR: &str = "events.defaultCalendar";
pub const EVENTS_DEFAULT_DURATION: &str = "events.defaultDuration";
pub const CALENDARS_SHOW_HIDDEN: &str = "calendars.showHidden";

/// The allowlist of configuration keys, in display order.
pub static KEYS: &[KeySpec] = &[
    KeySpec {
        key: LANGUAGE,
        kind: ValueKind::Choice(&["en", "ja"]),
        default: DefaultValue::Str("en"),
    },
    KeySpec {
        key: OUTPUT_FORMAT,
        kind: ValueKind::Choice(&["table", "json", "pretty-json"]),
        default: DefaultValue::Str("table"),
    },
    KeySpec {
        key: EVENTS_MAX_RESULTS,
        kind: ValueKind::Integer { min: 1, max: 2500 },
        default: DefaultValue::Int(10),
    },
    KeySpec {
        key: EVENTS_DAYS,
        kind: ValueKind::Integer { min: 1, max: 365 },
        default: DefaultValue::Int(7),
    },
    KeySpec {
        key: EVENTS_DEFAULT_CALENDAR,
        kind: ValueKind::Text,
        default: DefaultValue::Str("primary"),
    },
    KeySpec {
        key: EVENTS_DEFAULT_DURATION,
        kind: ValueKind::Integer { min: 1, max: 1440 },
        default: DefaultValue::Int(60),
    },
    KeySpec {
        key: CALENDARS_SHOW_HIDDEN,
        kind: ValueKind::Boolean,
        default: DefaultValue::Bool(false),
    },
];

/// Looks up a key in the allowlist.
pub fn key_spec(key: &str) -> Result<&'static KeySpec, ConfigError> {
    KEYS.iter()
        .find(|spec| spec.key == key)
        .ok_or_else(|| ConfigError::UnknownKey {
            key: key.to_string(),
            valid: KEYS.iter().map(|s| s.key).collect::<Vec<_>>().join(", "),
        })
}

/// Where an effective value comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSource {
    File,
    Default,
}

/// One row of `config list`.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigEntry {
    pub key: &'static str,
    pub value: Value,
    pub source: ConfigSource,
}

/// The config document and its location.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
    doc: Map<String, Value>,
}

impl ConfigStore {
    /// `<config_dir>/gcal/config.json`.
    pub fn default_path() -> PathBuf {
        gcal_google::GoogleConfig::default_dir().join("config.json")
    }

    /// Opens the document at `path`; a missing file is an empty document.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let doc = match fs::read_to_string(&path) {
            Ok(content) if content.trim().is_empty() => Map::new(),
            Ok(content) => {
                let value: Value =
                    serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
                        path: path.clone(),
                        source,
                    })?;
                match value {
                    Value::Object(map) => map,
                    _ => return Err(ConfigError::NotAnObject { path }),
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("no config file at {:?}", path);
                Map::new()
            }
            Err(source) => return Err(ConfigError::Io { path, source }),
        };

        for key in unknown_keys(&doc) {
            warn!("ignoring unknown configuration key '{}' in {:?}", key, path);
        }

        Ok(Self { path, doc })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The raw stored value, if any.
    pub fn stored(&self, key: &str) -> Option<&Value> {
        lookup(&self.doc, key)
    }

    /// The effective value: stored, or the key's default.
    pub fn get(&self, key: &str) -> Result<Value, ConfigError> {
        let spec = key_spec(key)?;
        Ok(self
            .stored(spec.key)
            .cloned()
            .unwrap_or_else(|| spec.default.to_value()))
    }

    /// Validates `raw`, stores it and writes the file. Returns the stored value.
    pub fn set(&mut self, key: &str, raw: &str) -> Result<Value, ConfigError> {
        let spec = key_spec(key)?;
        let value = spec
            .kind
            .parse(raw)
            .ok_or_else(|| ConfigError::InvalidValue {
                key: spec.key.to_string(),
                value: raw.to_string(),
                expected: spec.kind.describe(),
            })?;

        insert(&mut self.doc, spec.key, value.clone());
        self.save()?;
        info!("set {} = {}", spec.key, value);
        Ok(value)
    }

    /// Removes a stored value. Returns false if it was not set.
    pub fn unset(&mut self, key: &str) -> Result<bool, ConfigError> {
        let spec = key_spec(key)?;
        if remove(&mut self.doc, spec.key).is_none() {
            return Ok(false);
        }
        self.save()?;
        info!("unset {}", spec.key);
        Ok(true)
    }

    /// Every allowed key with its effective value.
    pub fn list(&self) -> Vec<ConfigEntry> {
        KEYS.iter()
            .map(|spec| match self.stored(spec.key) {
                Some(value) => ConfigEntry {
                    key: spec.key,
                    value: value.clone(),
                    source: ConfigSource::File,
                },
                None => ConfigEntry {
                    key: spec.key,
                    value: spec.default.to_value(),
                    source: ConfigSource::Default,
                },
            })
            .collect()
    }

    /// Deletes the config file. Returns whether a file existed.
    pub fn reset(&mut self) -> Result<bool, ConfigError> {
        self.doc.clear();
        match fs::remove_file(&self.path) {
            Ok(()) => {
                info!("removed config file {:?}", self.path);
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(source) => Err(ConfigError::Io {
                path: self.path.clone(),
                source,
            }),
        }
    }

    /// Writes the document through a temp file and rename.
    fn save(&self) -> Result<(), ConfigError> {
        let io_err = |source| ConfigError::Io {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_err)?;
        }

        let mut content = serde_json::to_string_pretty(&Value::Object(self.doc.clone()))
            .map_err(|source| ConfigError::Parse {
                path: self.path.clone(),
                source,
            })?;
        content.push('\n');

        let temp_path = self.path.with_extension("json.tmp");
        fs::write(&temp_path, content).map_err(io_err)?;
        fs::rename(&temp_path, &self.path).map_err(io_err)?;
        debug!("saved config to {:?}", self.path);
        Ok(())
    }

    /// A stored value that satisfies the key's constraint, else the default.
    ///
    /// Hand-edited files can hold anything; invalid values are logged and
    /// ignored rather than failing every command.
    fn effective(&self, key: &'static str) -> Value {
        let Ok(spec) = key_spec(key) else {
            return Value::Null;
        };
        match self.stored(key) {
            Some(value) if spec.kind.accepts(value) => value.clone(),
            Some(value) => {
                warn!(
                    "ignoring invalid value {} for {} (expected {})",
                    value,
                    key,
                    spec.kind.describe()
                );
                spec.default.to_value()
            }
            None => spec.default.to_value(),
        }
    }

    /// The configured language, only when explicitly set.
    pub fn language(&self) -> Option<String> {
        self.stored(LANGUAGE)?;
        self.effective(LANGUAGE).as_str().map(String::from)
    }

    pub fn output_format(&self) -> OutputFormat {
        self.effective(OUTPUT_FORMAT)
            .as_str()
            .and_then(|s| s.parse().ok())
            .unwrap_or_default()
    }

    pub fn events_max_results(&self) -> u32 {
        self.effective(EVENTS_MAX_RESULTS)
            .as_u64()
            .and_then(|n| u32::try_from(n).ok())
            .unwrap_or(10)
    }

    pub fn events_days(&self) -> i64 {
        self.effective(EVENTS_DAYS).as_i64().unwrap_or(7)
    }

    pub fn default_calendar(&self) -> String {
        self.effective(EVENTS_DEFAULT_CALENDAR)
            .as_str()
            .unwrap_or("primary")
            .to_string()
    }

    /// Default event length in minutes.
    pub fn default_duration(&self) -> i64 {
        self.effective(EVENTS_DEFAULT_DURATION)
            .as_i64()
            .unwrap_or(60)
    }

    pub fn show_hidden(&self) -> bool {
        self.effective(CALENDARS_SHOW_HIDDEN)
            .as_bool()
            .unwrap_or(false)
    }
}

fn lookup<'a>(doc: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    let mut segments = key.split('.');
    let mut current = doc.get(segments.next()?)?;
    for segment in segments {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

/// Sets `key`, creating intermediate objects and replacing any non-object
/// value in the way.
fn insert(doc: &mut Map<String, Value>, key: &str, value: Value) {
    match key.split_once('.') {
        None => {
            doc.insert(key.to_string(), value);
        }
        Some((head, rest)) => {
            let child = doc
                .entry(head.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if !child.is_object() {
                *child = Value::Object(Map::new());
            }
            if let Value::Object(map) = child {
                insert(map, rest, value);
            }
        }
    }
}

/// Removes `key`, pruning parent objects left empty.
fn remove(doc: &mut Map<String, Value>, key: &str) -> Option<Value> {
    match key.split_once('.') {
        None => doc.remove(key),
        Some((head, rest)) => {
            let Value::Object(child) = doc.get_mut(head)? else {
                return None;
            };
            let removed = remove(child, rest)?;
            if child.is_empty() {
                doc.remove(head);
            }
            Some(removed)
        }
    }
}

/// Dot paths of stored leaves that are not allowed keys.
fn unknown_keys(doc: &Map<String, Value>) -> Vec<String> {
    fn walk(prefix: &str, map: &Map<String, Value>, out: &mut Vec<String>) {
        for (name, value) in map {
            let path = if prefix.is_empty() {
                name.clone()
            } else {
                format!("{}.{}", prefix, name)
            };
            if KEYS.iter().any(|s| s.key == path) {
                continue;
            }
            match value {
                Value::Object(child) if !child.is_empty() => walk(&path, child, out),
                _ => out.push(path),
            }
        }
    }

    let mut out = Vec::new();
    walk("", doc, &mut out);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn store_in(dir: &tempfile::TempDir) -> ConfigStore {
        ConfigStore::open(dir.path().join("gcal").join("config.json")).unwrap()
    }

    fn read_file(store: &ConfigStore) -> Value {
        serde_json::from_str(&fs::read_to_string(store.path()).unwrap()).unwrap()
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        assert_eq!(store.get("events.maxResults").unwrap(), json!(10));
        assert_eq!(store.get("language").unwrap(), json!("en"));
        assert_eq!(store.output_format(), OutputFormat::Table);
        assert!(store.language().is_none());
        assert!(!store.path().exists());
    }

    #[test]
    fn unknown_key_is_rejected_everywhere() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = store_in(&dir);

        let err = store.get("events.colour").unwrap_err();
        assert!(err.to_string().contains("valid keys: language, output.format"));
        assert!(store.set("events.colour", "red").is_err());
        assert!(store.unset("nope").is_err());
    }

    #[test]
    fn set_creates_nested_objects_and_persists() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = store_in(&dir);

        assert_eq!(store.set("events.maxResults", "25").unwrap(), json!(25));
        assert_eq!(store.set("calendars.showHidden", "yes").unwrap(), json!(true));
        assert_eq!(store.set("output.format", "Pretty-JSON").unwrap(), json!("pretty-json"));

        assert_eq!(
            read_file(&store),
            json!({
                "events": {"maxResults": 25},
                "calendars": {"showHidden": true},
                "output": {"format": "pretty-json"}
            })
        );
        assert!(!store.path().with_extension("json.tmp").exists());

        let reopened = ConfigStore::open(store.path()).unwrap();
        assert_eq!(reopened.events_max_results(), 25);
        assert!(reopened.show_hidden());
        assert_eq!(reopened.output_format(), OutputFormat::PrettyJson);
    }

    #[test]
    fn set_validates_type_and_range() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = store_in(&dir);

        let err = store.set("events.maxResults", "0").unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid value '0' for events.maxResults: expected an integer between 1 and 2500"
        );
        assert!(store.set("events.days", "366").is_err());
        assert!(store.set("events.days", "seven").is_err());
        assert!(store.set("calendars.showHidden", "maybe").is_err());
        assert!(store.set("language", "fr").is_err());
        assert!(store.set("events.defaultCalendar", "  ").is_err());
        assert!(!store.path().exists());
    }

    #[test]
    fn set_replaces_non_object_parent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"events": 3}"#).unwrap();

        let mut store = ConfigStore::open(&path).unwrap();
        store.set("events.days", "14").unwrap();
        assert_eq!(read_file(&store), json!({"events": {"days": 14}}));
    }

    #[test]
    fn unset_prunes_empty_parents() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = store_in(&dir);
        store.set("events.days", "3").unwrap();
        store.set("language", "ja").unwrap();

        assert!(store.unset("events.days").unwrap());
        assert_eq!(read_file(&store), json!({"language": "ja"}));
        assert!(!store.unset("events.days").unwrap());
        assert_eq!(store.get("events.days").unwrap(), json!(7));
    }

    #[test]
    fn list_reports_sources() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = store_in(&dir);
        store.set("events.defaultCalendar", "work@example.com").unwrap();

        let entries = store.list();
        assert_eq!(entries.len(), KEYS.len());
        let calendar = entries
            .iter()
            .find(|e| e.key == EVENTS_DEFAULT_CALENDAR)
            .unwrap();
        assert_eq!(calendar.value, json!("work@example.com"));
        assert_eq!(calendar.source, ConfigSource::File);
        assert_eq!(entries[0].source, ConfigSource::Default);
    }

    #[test]
    fn reset_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = store_in(&dir);
        store.set("language", "ja").unwrap();

        assert!(store.reset().unwrap());
        assert!(!store.path().exists());
        assert!(store.stored("language").is_none());
        assert!(!store.reset().unwrap());
    }

    #[test]
    fn non_object_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "[1, 2]").unwrap();
        assert!(matches!(
            ConfigStore::open(&path),
            Err(ConfigError::NotAnObject { .. })
        ));

        fs::write(&path, "{ broken").unwrap();
        assert!(matches!(
            ConfigStore::open(&path),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn unknown_stored_keys_survive_writes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"theme": "dark", "events": {"colour": "red"}}"#).unwrap();

        let mut store = ConfigStore::open(&path).unwrap();
        assert_eq!(
            unknown_keys(&store.doc),
            vec!["theme".to_string(), "events.colour".to_string()]
        );
        store.set("events.days", "2").unwrap();
        assert_eq!(
            read_file(&store),
            json!({"theme": "dark", "events": {"colour": "red", "days": 2}})
        );
    }

    #[test]
    fn invalid_stored_values_fall_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(
            &path,
            r#"{"events": {"maxResults": 99999, "days": "x"}, "output": {"format": "xml"}}"#,
        )
        .unwrap();

        let store = ConfigStore::open(&path).unwrap();
        assert_eq!(store.events_max_results(), 10);
        assert_eq!(store.events_days(), 7);
        assert_eq!(store.output_format(), OutputFormat::Table);
        // `get` shows what is stored, even when invalid.
        assert_eq!(store.get("events.maxResults").unwrap(), json!(99999));
    }
}
