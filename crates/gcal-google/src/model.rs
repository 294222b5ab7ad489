//! Calendar API v3 resources.
//!
//! Field names follow the REST representation (camelCase), so these types
//! serialize straight into request bodies and `--format json` output.

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use gcal_core::{EventTime, Tabular, TimeWindow};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

/// An entry of the user's calendar list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Calendar {
    pub id: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub primary: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_zone: Option<String>,
    #[serde(default)]
    pub hidden: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_color: Option<String>,
}

impl Tabular for Calendar {
    const FIELDS: &'static [&'static str] = &[
        "id",
        "summary",
        "primary",
        "accessRole",
        "timeZone",
        "hidden",
        "description",
    ];
    const DEFAULT_FIELDS: &'static [&'static str] = &["id", "summary", "primary", "accessRole"];

    fn id(&self) -> &str {
        &self.id
    }

    fn field(&self, name: &str) -> Value {
        match name {
            "id" => Value::from(self.id.as_str()),
            "summary" => Value::from(self.summary.as_str()),
            "primary" => Value::Bool(self.primary),
            "accessRole" => opt_str(&self.access_role),
            "timeZone" => opt_str(&self.time_zone),
            "hidden" => Value::Bool(self.hidden),
            "description" => opt_str(&self.description),
            _ => Value::Null,
        }
    }

    fn display(&self, name: &str) -> String {
        match name {
            "primary" if self.primary => "*".to_string(),
            "primary" => String::new(),
            "hidden" if self.hidden => "yes".to_string(),
            "hidden" => String::new(),
            _ => gcal_core::cell_text(&self.field(name)),
        }
    }
}

/// Start or end of an event.
///
/// Exactly one of `date` (all-day) and `date_time` is set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDateTime {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_rfc3339"
    )]
    pub date_time: Option<DateTime<FixedOffset>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_zone: Option<String>,
}

impl EventDateTime {
    pub fn from_utc(dt: DateTime<Utc>) -> Self {
        Self {
            date_time: Some(dt.fixed_offset()),
            ..Self::default()
        }
    }

    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            date: Some(date),
            ..Self::default()
        }
    }

    /// The instant or date, preferring `dateTime` when both are present.
    pub fn to_event_time(&self) -> Option<EventTime> {
        match (self.date_time, self.date) {
            (Some(dt), _) => Some(EventTime::from_utc(dt.with_timezone(&Utc))),
            (None, Some(date)) => Some(EventTime::from_date(date)),
            (None, None) => None,
        }
    }

    /// The value as it appears in the API: RFC 3339 or `YYYY-MM-DD`.
    fn to_value(&self) -> Value {
        match (self.date_time, self.date) {
            (Some(dt), _) => Value::from(dt.to_rfc3339()),
            (None, Some(date)) => Value::from(date.format("%Y-%m-%d").to_string()),
            (None, None) => Value::Null,
        }
    }

    fn display_local(&self) -> String {
        self.to_event_time()
            .map(|t| t.display_local())
            .unwrap_or_default()
    }
}

/// Writes `+00:00` rather than `Z` for UTC, matching [`DateTime::to_rfc3339`].
fn serialize_rfc3339<S: Serializer>(
    value: &Option<DateTime<FixedOffset>>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match value {
        Some(dt) => serializer.serialize_str(&dt.to_rfc3339()),
        None => serializer.serialize_none(),
    }
}

/// An event attendee or organizer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attendee {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organizer: Option<bool>,
    #[serde(rename = "self", default, skip_serializing_if = "Option::is_none")]
    pub is_self: Option<bool>,
}

impl Attendee {
    pub fn with_email(email: impl Into<String>) -> Self {
        Self {
            email: Some(email.into()),
            ..Self::default()
        }
    }

    /// Display name if known, otherwise the email address.
    pub fn label(&self) -> &str {
        self.display_name
            .as_deref()
            .or(self.email.as_deref())
            .unwrap_or_default()
    }
}

/// A calendar event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html_link: Option<String>,
    #[serde(default)]
    pub start: EventDateTime,
    #[serde(default)]
    pub end: EventDateTime,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attendees: Vec<Attendee>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organizer: Option<Attendee>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recurring_event_id: Option<String>,
}

impl Event {
    pub fn is_all_day(&self) -> bool {
        self.start.date.is_some() && self.start.date_time.is_none()
    }
}

impl Tabular for Event {
    const FIELDS: &'static [&'static str] = &[
        "id",
        "summary",
        "start",
        "end",
        "location",
        "status",
        "description",
        "htmlLink",
        "attendees",
        "organizer",
    ];
    const DEFAULT_FIELDS: &'static [&'static str] = &["id", "summary", "start", "end", "location"];

    fn id(&self) -> &str {
        &self.id
    }

    fn field(&self, name: &str) -> Value {
        match name {
            "id" => Value::from(self.id.as_str()),
            "summary" => Value::from(self.summary.as_str()),
            "start" => self.start.to_value(),
            "end" => self.end.to_value(),
            "location" => opt_str(&self.location),
            "status" => opt_str(&self.status),
            "description" => opt_str(&self.description),
            "htmlLink" => opt_str(&self.html_link),
            "attendees" => Value::Array(
                self.attendees
                    .iter()
                    .filter_map(|a| a.email.as_deref().map(Value::from))
                    .collect(),
            ),
            "organizer" => self
                .organizer
                .as_ref()
                .and_then(|o| o.email.as_deref())
                .map_or(Value::Null, Value::from),
            _ => Value::Null,
        }
    }

    fn display(&self, name: &str) -> String {
        match name {
            "start" => self.start.display_local(),
            "end" => self.end.display_local(),
            "attendees" => self
                .attendees
                .iter()
                .map(Attendee::label)
                .collect::<Vec<_>>()
                .join(", "),
            "organizer" => self
                .organizer
                .as_ref()
                .map(|o| o.label().to_string())
                .unwrap_or_default(),
            _ => gcal_core::cell_text(&self.field(name)),
        }
    }
}

/// Request body for `events.insert`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewEvent {
    pub summary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    pub start: EventDateTime,
    pub end: EventDateTime,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub attendees: Vec<Attendee>,
}

impl NewEvent {
    /// A timed event from `start` to `end`.
    pub fn timed(summary: impl Into<String>, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self::with_times(
            summary,
            EventDateTime::from_utc(start),
            EventDateTime::from_utc(end),
        )
    }

    /// An all-day event; `end` is exclusive, as in the API.
    pub fn all_day(summary: impl Into<String>, start: NaiveDate, end: NaiveDate) -> Self {
        Self::with_times(
            summary,
            EventDateTime::from_date(start),
            EventDateTime::from_date(end),
        )
    }

    fn with_times(summary: impl Into<String>, start: EventDateTime, end: EventDateTime) -> Self {
        Self {
            summary: summary.into(),
            description: None,
            location: None,
            start,
            end,
            attendees: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: Option<String>) -> Self {
        self.description = description.filter(|d| !d.is_empty());
        self
    }

    pub fn with_location(mut self, location: Option<String>) -> Self {
        self.location = location.filter(|l| !l.is_empty());
        self
    }

    pub fn with_attendees<I, S>(mut self, emails: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.attendees = emails.into_iter().map(Attendee::with_email).collect();
        self
    }
}

/// Parameters for `events.list`.
#[derive(Debug, Clone, PartialEq)]
pub struct EventQuery {
    pub calendar_id: String,
    pub window: TimeWindow,
    /// Upper bound on the number of events returned across all pages.
    pub max_results: u32,
    /// Free-text search (`q`).
    pub query: Option<String>,
}

impl EventQuery {
    pub fn new(calendar_id: impl Into<String>, window: TimeWindow, max_results: u32) -> Self {
        Self {
            calendar_id: calendar_id.into(),
            window,
            max_results,
            query: None,
        }
    }

    pub fn with_query(mut self, query: Option<String>) -> Self {
        self.query = query.filter(|q| !q.trim().is_empty());
        self
    }
}

fn opt_str(value: &Option<String>) -> Value {
    value.as_deref().map_or(Value::Null, Value::from)
}
