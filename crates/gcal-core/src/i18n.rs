//! Message catalog for user-facing strings.
//!
//! Messages are looked up by key in the active [`Locale`]. A key missing from
//! a translation falls back to English, and a key missing from English is
//! returned as-is so a typo never hides output.
//!
//! Placeholders use `{name}` syntax and are filled by [`I18n::tf`].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Supported display languages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    En,
    Ja,
}

impl Locale {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::En => "en",
            Self::Ja => "ja",
        }
    }

    /// Parses a language tag such as `ja`, `ja_JP.UTF-8` or `en-US`.
    ///
    /// Only the primary subtag is considered.
    pub fn from_tag(tag: &str) -> Option<Self> {
        let primary = tag
            .split(['_', '-', '.', '@'])
            .next()
            .unwrap_or_default()
            .to_ascii_lowercase();
        match primary.as_str() {
            "en" => Some(Self::En),
            "ja" => Some(Self::Ja),
            _ => None,
        }
    }

    /// Resolves the locale from an explicit setting, then `GCAL_LANG`, then
    /// `LANG`, defaulting to English.
    pub fn resolve(explicit: Option<&str>) -> Self {
        explicit
            .and_then(Self::from_tag)
            .or_else(|| std::env::var("GCAL_LANG").ok().as_deref().and_then(Self::from_tag))
            .or_else(|| std::env::var("LANG").ok().as_deref().and_then(Self::from_tag))
            .unwrap_or_default()
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Locale {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_tag(s).ok_or_else(|| format!("unsupported language: {}", s))
    }
}

/// One catalog entry.
struct Message {
    key: &'static str,
    en: &'static str,
    ja: Option<&'static str>,
}

const fn msg(key: &'static str, en: &'static str, ja: &'static str) -> Message {
    Message {
        key,
        en,
        ja: Some(ja),
    }
}

const fn msg_en(key: &'static str, en: &'static str) -> Message {
    Message { key, en, ja: None }
}

static CATALOG: &[Message] = &[
    // Table headers
    msg_en("field.id", "ID"),
    msg("field.summary", "Summary", "タイトル"),
    msg("field.start", "Start", "開始"),
    msg("field.end", "End", "終了"),
    msg("field.location", "Location", "場所"),
    msg("field.status", "Status", "ステータス"),
    msg("field.description", "Description", "説明"),
    msg("field.htmlLink", "Link", "リンク"),
    msg("field.attendees", "Attendees", "参加者"),
    msg("field.organizer", "Organizer", "主催者"),
    msg("field.primary", "Primary", "メイン"),
    msg("field.accessRole", "Access", "権限"),
    msg("field.timeZone", "Time zone", "タイムゾーン"),
    msg("field.hidden", "Hidden", "非表示"),
    msg("field.key", "Key", "キー"),
    msg("field.value", "Value", "値"),
    msg("field.source", "Source", "設定元"),
    // Events
    msg("events.none", "No events found.", "予定はありません。"),
    msg("events.created", "Event created: {id}", "予定を作成しました: {id}"),
    msg("events.not_found", "event not found: {id}", "予定が見つかりません: {id}"),
    msg(
        "events.end_before_start",
        "the end time must be after the start time",
        "終了時刻は開始時刻より後にしてください",
    ),
    msg(
        "events.title_required",
        "the event title must not be empty",
        "予定のタイトルを入力してください",
    ),
    msg(
        "events.duration_with_all_day",
        "--duration cannot be used with --all-day",
        "--duration と --all-day は同時に指定できません",
    ),
    msg(
        "events.duration_too_long",
        "the event would end past the supported date range",
        "終了日時が扱える日付の範囲を超えています",
    ),
    // Calendars
    msg("calendars.none", "No calendars found.", "カレンダーはありません。"),
    msg(
        "calendars.not_found",
        "calendar not found: {id}",
        "カレンダーが見つかりません: {id}",
    ),
    // Prompts
    msg("prompt.title", "Event title", "予定のタイトル"),
    msg(
        "prompt.start",
        "Start (YYYY-MM-DD HH:MM, or YYYY-MM-DD with --all-day)",
        "開始日時 (YYYY-MM-DD HH:MM、--all-day の場合は YYYY-MM-DD)",
    ),
    msg(
        "prompt.credentials_path",
        "Path to the OAuth client credentials JSON downloaded from Google Cloud Console",
        "Google Cloud Console からダウンロードした OAuth クライアント認証情報 JSON のパス",
    ),
    msg(
        "prompt.confirm_reset",
        "Reset the configuration to defaults?",
        "設定を初期値に戻しますか?",
    ),
    // Config
    msg("config.set", "Set {key} = {value}", "{key} を {value} に設定しました"),
    msg("config.unset", "Unset {key}", "{key} の設定を削除しました"),
    msg("config.not_set", "{key} is not set", "{key} は設定されていません"),
    msg("config.reset", "Configuration reset to defaults.", "設定を初期値に戻しました。"),
    msg("config.reset_cancelled", "Reset cancelled.", "リセットを中止しました。"),
    msg("config.none", "No settings.", "設定はありません。"),
    msg("config.source.file", "file", "ファイル"),
    msg("config.source.default", "default", "既定値"),
    // Init / auth
    msg(
        "init.credentials_saved",
        "Credentials saved to {path}",
        "認証情報を {path} に保存しました",
    ),
    msg(
        "init.already_authenticated",
        "Already authenticated. Use --force to re-authenticate.",
        "認証済みです。再認証するには --force を指定してください。",
    ),
    msg(
        "init.starting",
        "Opening a browser to authorize access to Google Calendar...",
        "Google カレンダーへのアクセスを許可するためにブラウザを開きます...",
    ),
    msg(
        "init.success",
        "Authentication successful. Token saved to {path}",
        "認証に成功しました。トークンを {path} に保存しました",
    ),
    msg(
        "auth.not_authenticated",
        "not authenticated, run `gcal init`",
        "認証されていません。`gcal init` を実行してください",
    ),
    msg(
        "auth.status.valid",
        "Authenticated (token: {path})",
        "認証済み (トークン: {path})",
    ),
    msg(
        "auth.status.expired",
        "Access token expired; it will be refreshed on next use (token: {path})",
        "アクセストークンの有効期限が切れています。次回使用時に更新されます (トークン: {path})",
    ),
    msg(
        "auth.status.missing_scope",
        "The stored token lacks calendar write access; run `gcal init --force`",
        "保存されたトークンに書き込み権限がありません。`gcal init --force` を実行してください",
    ),
    msg(
        "auth.status.none",
        "Not authenticated. Run `gcal init`.",
        "認証されていません。`gcal init` を実行してください。",
    ),
    msg("auth.logout", "Token removed.", "トークンを削除しました。"),
    // API errors
    msg(
        "error.network",
        "could not reach Google: {message}",
        "Google に接続できませんでした: {message}",
    ),
    msg(
        "error.rate_limited",
        "Google rate limit exceeded, try again later",
        "Google のレート制限を超えました。しばらくしてから再試行してください",
    ),
    msg(
        "error.permission",
        "permission denied: {message}",
        "権限がありません: {message}",
    ),
    msg(
        "error.api",
        "Google Calendar API error: {message}",
        "Google カレンダー API エラー: {message}",
    ),
];

/// Translator bound to one locale.
#[derive(Debug, Clone, Copy, Default)]
pub struct I18n {
    locale: Locale,
}

impl I18n {
    pub fn new(locale: Locale) -> Self {
        Self { locale }
    }

    pub fn locale(&self) -> Locale {
        self.locale
    }

    /// Looks up a message by key.
    pub fn t(&self, key: &str) -> String {
        let Some(entry) = CATALOG.iter().find(|m| m.key == key) else {
            return key.to_string();
        };
        let text = match self.locale {
            Locale::En => entry.en,
            Locale::Ja => entry.ja.unwrap_or(entry.en),
        };
        text.to_string()
    }

    /// Looks up a message and fills its `{name}` placeholders.
    ///
    /// Placeholders without a matching argument are left untouched.
    pub fn tf(&self, key: &str, args: &[(&str, &str)]) -> String {
        args.iter().fold(self.t(key), |text, (name, value)| {
            text.replace(&format!("{{{}}}", name), value)
        })
    }
}
