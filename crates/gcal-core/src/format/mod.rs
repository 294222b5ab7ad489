//! Output formatting for command results.
//!
//! Commands produce items implementing [`Tabular`]. The formatter renders
//! them in one of three [`OutputFormat`]s:
//! - **table**: aligned columns with translated headers
//! - **json**: a compact JSON array (or object for a single item)
//! - **pretty-json**: the same, pretty-printed
//!
//! Which fields are shown is controlled by `--fields`; see [`select_fields`].

use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::i18n::I18n;

/// Cells longer than this (in terminal columns) are truncated in tables.
pub const MAX_CELL_WIDTH: usize = 50;

const COLUMN_GAP: &str = "  ";

/// Errors from output formatting.
#[derive(Debug, Error)]
pub enum FormatError {
    #[error("unknown output format '{0}', expected one of: table, json, pretty-json")]
    UnknownFormat(String),

    #[error("unknown field '{field}', available fields: {}", .available.join(", "))]
    UnknownField {
        field: String,
        available: Vec<&'static str>,
    },

    #[error("failed to serialize output: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// The output format for command results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
    PrettyJson,
}

impl OutputFormat {
    pub const ALL: [OutputFormat; 3] = [Self::Table, Self::Json, Self::PrettyJson];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Table => "table",
            Self::Json => "json",
            Self::PrettyJson => "pretty-json",
        }
    }

    pub fn is_json(&self) -> bool {
        !matches!(self, Self::Table)
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputFormat {
    type Err = FormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "table" => Ok(Self::Table),
            "json" => Ok(Self::Json),
            "pretty-json" | "pretty_json" | "prettyjson" => Ok(Self::PrettyJson),
            _ => Err(FormatError::UnknownFormat(s.to_string())),
        }
    }
}

/// An item that can be shown as a table row or a JSON object.
pub trait Tabular {
    /// Every field this item can expose, in canonical order.
    const FIELDS: &'static [&'static str];
    /// Fields shown when `--fields` is not given.
    const DEFAULT_FIELDS: &'static [&'static str];

    /// Identifier printed in `--quiet` mode.
    fn id(&self) -> &str;

    /// Value of one field (`Value::Null` when absent).
    fn field(&self, name: &str) -> Value;

    /// Text shown in a table cell; defaults to the plain text of [`Tabular::field`].
    fn display(&self, name: &str) -> String {
        cell_text(&self.field(name))
    }
}

/// Resolves the fields to display.
///
/// `requested` is the raw `--fields` list; entries are trimmed, empty entries
/// are skipped and duplicates keep their first position. `None` or an empty
/// selection yields `T::DEFAULT_FIELDS`.
pub fn select_fields<T: Tabular>(
    requested: Option<&[String]>,
) -> Result<Vec<&'static str>, FormatError> {
    let Some(requested) = requested else {
        return Ok(T::DEFAULT_FIELDS.to_vec());
    };

    let mut selected: Vec<&'static str> = Vec::new();
    for raw in requested.iter().flat_map(|r| r.split(',')) {
        let name = raw.trim();
        if name.is_empty() {
            continue;
        }
        let field = T::FIELDS
            .iter()
            .find(|f| f.eq_ignore_ascii_case(name))
            .ok_or_else(|| FormatError::UnknownField {
                field: name.to_string(),
                available: T::FIELDS.to_vec(),
            })?;
        if !selected.contains(field) {
            selected.push(field);
        }
    }

    if selected.is_empty() {
        return Ok(T::DEFAULT_FIELDS.to_vec());
    }
    Ok(selected)
}

/// Renders [`Tabular`] items in the chosen format.
#[derive(Debug, Clone, Copy)]
pub struct OutputFormatter<'a> {
    format: OutputFormat,
    i18n: &'a I18n,
}

impl<'a> OutputFormatter<'a> {
    pub fn new(format: OutputFormat, i18n: &'a I18n) -> Self {
        Self { format, i18n }
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    /// Renders a list of items.
    ///
    /// An empty list renders as `[]` in JSON formats and as an empty string
    /// in table format, leaving the "nothing found" message to the caller.
    pub fn render_list<T: Tabular>(
        &self,
        items: &[T],
        fields: &[&str],
    ) -> Result<String, FormatError> {
        match self.format {
            OutputFormat::Table => {
                if items.is_empty() {
                    return Ok(String::new());
                }
                let headers: Vec<String> = fields.iter().map(|f| self.header(f)).collect();
                let rows: Vec<Vec<String>> = items
                    .iter()
                    .map(|item| fields.iter().map(|f| item.display(f)).collect())
                    .collect();
                Ok(render_table(&headers, &rows))
            }
            OutputFormat::Json | OutputFormat::PrettyJson => {
                let values: Vec<Value> = items
                    .iter()
                    .map(|item| Value::Object(to_object(item, fields)))
                    .collect();
                self.to_json(&Value::Array(values))
            }
        }
    }

    /// Renders a single item.
    ///
    /// Table format uses a two-column field/value layout.
    pub fn render_item<T: Tabular>(&self, item: &T, fields: &[&str]) -> Result<String, FormatError> {
        match self.format {
            OutputFormat::Table => {
                let rows: Vec<Vec<String>> = fields
                    .iter()
                    .map(|f| vec![self.header(f), item.display(f)])
                    .collect();
                Ok(render_rows(&rows))
            }
            OutputFormat::Json | OutputFormat::PrettyJson => {
                self.to_json(&Value::Object(to_object(item, fields)))
            }
        }
    }

    fn to_json(&self, value: &Value) -> Result<String, FormatError> {
        let out = if self.format == OutputFormat::PrettyJson {
            serde_json::to_string_pretty(value)?
        } else {
            serde_json::to_string(value)?
        };
        Ok(out)
    }

    /// Translated column header, falling back to the raw field name.
    fn header(&self, field: &str) -> String {
        let key = format!("field.{}", field);
        let label = self.i18n.t(&key);
        if label == key { field.to_string() } else { label }
    }
}

fn to_object<T: Tabular>(item: &T, fields: &[&str]) -> Map<String, Value> {
    fields
        .iter()
        .map(|f| ((*f).to_string(), item.field(f)))
        .collect()
}

/// Plain-text representation of a JSON value for a table cell.
pub fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(items) => items.iter().map(cell_text).collect::<Vec<_>>().join(", "),
        Value::Object(_) => value.to_string(),
    }
}

/// Renders a header, a dashed separator and the rows.
fn render_table(headers: &[String], rows: &[Vec<String>]) -> String {
    let separator: Vec<String> = column_widths(headers, rows)
        .iter()
        .map(|w| "-".repeat(*w))
        .collect();

    let mut all = Vec::with_capacity(rows.len() + 2);
    all.push(headers.to_vec());
    all.push(separator);
    all.extend(rows.iter().cloned());
    render_rows(&all)
}

/// Renders rows as left-aligned padded columns.
fn render_rows(rows: &[Vec<String>]) -> String {
    let cells: Vec<Vec<Cow<'_, str>>> = rows
        .iter()
        .map(|row| row.iter().map(|c| ellipsis(c, MAX_CELL_WIDTH)).collect())
        .collect();

    let columns = cells.iter().map(Vec::len).max().unwrap_or(0);
    let widths: Vec<usize> = (0..columns)
        .map(|i| {
            cells
                .iter()
                .filter_map(|row| row.get(i))
                .map(|c| display_width(c))
                .max()
                .unwrap_or(0)
        })
        .collect();

    cells
        .iter()
        .map(|row| {
            let line: Vec<String> = row
                .iter()
                .zip(&widths)
                .map(|(cell, width)| pad(cell, *width))
                .collect();
            line.join(COLUMN_GAP).trim_end().to_string()
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn column_widths(headers: &[String], rows: &[Vec<String>]) -> Vec<usize> {
    (0..headers.len())
        .map(|i| {
            std::iter::once(&headers[i])
                .chain(rows.iter().filter_map(|r| r.get(i)))
                .map(|c| display_width(&ellipsis(c, MAX_CELL_WIDTH)))
                .max()
                .unwrap_or(0)
        })
        .collect()
}

fn pad(cell: &str, width: usize) -> String {
    let fill = width.saturating_sub(display_width(cell));
    format!("{}{}", cell, " ".repeat(fill))
}

/// Terminal column width of a string; wide characters and emoji count as
/// two columns, combining marks as zero.
pub fn display_width(s: &str) -> usize {
    UnicodeWidthStr::width(s)
}

fn char_width(c: char) -> usize {
    UnicodeWidthChar::width(c).unwrap_or(0)
}

/// Truncates a string with `...` if it is wider than `max_width` columns.
///
/// Newlines are flattened to spaces so a cell never spans several lines.
pub fn ellipsis(s: &str, max_width: usize) -> Cow<'_, str> {
    let flat: Cow<'_, str> = if s.contains(['\n', '\r']) {
        Cow::Owned(s.replace("\r\n", " ").replace(['\n', '\r'], " "))
    } else {
        Cow::Borrowed(s)
    };

    if display_width(&flat) <= max_width {
        return flat;
    }

    let budget = max_width.saturating_sub(3);
    let mut used = 0;
    let truncated: String = flat
        .chars()
        .take_while(|c| {
            used += char_width(*c);
            used <= budget
        })
        .collect();
    Cow::Owned(format!("{}...", truncated))
}
