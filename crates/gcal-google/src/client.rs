//! Google Calendar API v3 HTTP client.
//!
//! The client is stateless with respect to auth: every call takes the access
//! token to use, so a caller can swap tokens between attempts.

use reqwest::StatusCode;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::config::GoogleConfig;
use crate::error::{GoogleError, GoogleResult};
use crate::model::{Calendar, Event, EventQuery, NewEvent};

/// Largest page the API accepts for `events.list`.
const MAX_PAGE_SIZE: u32 = 2500;

/// Error reasons Google uses when a token lacks a scope.
const SCOPE_REASONS: &[&str] = &["insufficientPermissions", "ACCESS_TOKEN_SCOPE_INSUFFICIENT"];

/// Error reasons Google uses for quota exhaustion (sent with 403).
const RATE_LIMIT_REASONS: &[&str] = &["rateLimitExceeded", "userRateLimitExceeded", "quotaExceeded"];

#[derive(Debug, Clone)]
pub struct CalendarClient {
    http_client: reqwest::Client,
    api_base: String,
}

impl CalendarClient {
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
            http_client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
        })
    }

    /// Lists the user's calendars, following `nextPageToken`.
    pub async fn list_calendars(
        &self,
        access_token: &str,
        show_hidden: bool,
    ) -> GoogleResult<Vec<Calendar>> {
        let url = format!("{}/users/me/calendarList", self.api_base);
        let mut calendars = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut params = vec![("showHidden", show_hidden.to_string())];
            if let Some(token) = &page_token {
                params.push(("pageToken", token.clone()));
            }

            let page: ListResponse<Calendar> = self.get_json(&url, access_token, &params).await?;
            calendars.extend(page.items);

            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        debug!("fetched {} calendars", calendars.len());
        Ok(calendars)
    }

    /// Lists events in the query window, expanded and ordered by start time.
    ///
    /// Pages are followed until `max_results` events are collected.
    pub async fn list_events(
        &self,
        access_token: &str,
        query: &EventQuery,
    ) -> GoogleResult<Vec<Event>> {
        let url = format!(
            "{}/calendars/{}/events",
            self.api_base,
            urlencoding::encode(&query.calendar_id)
        );
        let limit = query.max_results as usize;
        let mut events = Vec::new();
        if limit == 0 {
            return Ok(events);
        }
        let mut page_token: Option<String> = None;

        loop {
            let remaining = (limit - events.len()).min(MAX_PAGE_SIZE as usize);
            let mut params = vec![
                ("timeMin", query.window.start.to_rfc3339()),
                ("timeMax", query.window.end.to_rfc3339()),
                ("singleEvents", "true".to_string()),
                ("orderBy", "startTime".to_string()),
                ("maxResults", remaining.to_string()),
            ];
            if let Some(q) = &query.query {
                params.push(("q", q.clone()));
            }
            if let Some(token) = &page_token {
                params.push(("pageToken", token.clone()));
            }

            let page: ListResponse<Event> = self.get_json(&url, access_token, &params).await?;
            events.extend(page.items);

            if events.len() >= limit {
                events.truncate(limit);
                break;
            }
            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        debug!(
            "fetched {} events from calendar {}",
            events.len(),
            query.calendar_id
        );
        Ok(events)
    }

    pub async fn get_event(
        &self,
        access_token: &str,
        calendar_id: &str,
        event_id: &str,
    ) -> GoogleResult<Event> {
        let url = format!(
            "{}/calendars/{}/events/{}",
            self.api_base,
            urlencoding::encode(calendar_id),
            urlencoding::encode(event_id)
        );
        self.get_json(&url, access_token, &[]).await
    }

    pub async fn insert_event(
        &self,
        access_token: &str,
        calendar_id: &str,
        event: &NewEvent,
    ) -> GoogleResult<Event> {
        let url = format!(
            "{}/calendars/{}/events",
            self.api_base,
            urlencoding::encode(calendar_id)
        );
        debug!("POST {}", url);

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(access_token)
            .json(event)
            .send()
            .await
            .map_err(map_send_error)?;

        parse_response(response).await
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        access_token: &str,
        params: &[(&str, String)],
    ) -> GoogleResult<T> {
        debug!("GET {}", url);

        let response = self
            .http_client
            .get(url)
            .bearer_auth(access_token)
            .query(params)
            .send()
            .await
            .map_err(map_send_error)?;

        parse_response(response).await
    }
}

fn map_send_error(e: reqwest::Error) -> GoogleError {
    if e.is_timeout() {
        GoogleError::network("request timeout")
    } else if e.is_connect() {
        GoogleError::network(format!("connection failed: {}", e))
    } else {
        GoogleError::network(format!("request failed: {}", e))
    }
}

async fn parse_response<T: DeserializeOwned>(response: reqwest::Response) -> GoogleResult<T> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| GoogleError::network(format!("failed to read response: {}", e)))?;

    if !status.is_success() {
        return Err(error_from_response(status, &body));
    }

    serde_json::from_str(&body)
        .map_err(|e| GoogleError::invalid_response(format!("failed to parse response: {}", e)))
}

/// Maps an unsuccessful response to a [`GoogleError`].
pub fn error_from_response(status: StatusCode, body: &str) -> GoogleError {
    let detail = serde_json::from_str::<ErrorEnvelope>(body)
        .ok()
        .map(|e| e.error);
    let message = detail
        .as_ref()
        .and_then(|d| d.message.clone())
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| {
            let trimmed = body.trim();
            if trimmed.is_empty() {
                status.to_string()
            } else {
                trimmed.to_string()
            }
        });
    let has_reason = |reasons: &[&str]| detail.as_ref().is_some_and(|d| d.has_reason(reasons));

    match status {
        StatusCode::UNAUTHORIZED => GoogleError::authentication(message),
        StatusCode::FORBIDDEN if has_reason(SCOPE_REASONS) => {
            GoogleError::insufficient_scope(message)
        }
        StatusCode::FORBIDDEN if has_reason(RATE_LIMIT_REASONS) => {
            GoogleError::rate_limited(message)
        }
        StatusCode::FORBIDDEN => {
            let err = GoogleError::authorization(message);
            if err.is_scope_error() {
                GoogleError::insufficient_scope(err.message())
            } else {
                err
            }
        }
        StatusCode::TOO_MANY_REQUESTS => GoogleError::rate_limited(message),
        StatusCode::NOT_FOUND | StatusCode::GONE => GoogleError::not_found(message),
        StatusCode::BAD_REQUEST => GoogleError::bad_request(message),
        s if s.is_server_error() => GoogleError::server(format!("{} ({})", message, s)),
        s => GoogleError::bad_request(format!("{} ({})", message, s)),
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListResponse<T> {
    #[serde(default = "Vec::new")]
    items: Vec<T>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorDetail,
}

/// Google's JSON error body, covering both the legacy `errors[].reason`
/// and the newer `status` / `details[].reason` shapes.
#[derive(Debug, Deserialize)]
struct ErrorDetail {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    errors: Vec<ReasonEntry>,
    #[serde(default)]
    details: Vec<ReasonEntry>,
}

#[derive(Debug, Deserialize)]
struct ReasonEntry {
    #[serde(default)]
    reason: Option<String>,
}

impl ErrorDetail {
    fn has_reason(&self, reasons: &[&str]) -> bool {
        let matches = |r: &Option<String>| r.as_deref().is_some_and(|r| reasons.contains(&r));
        matches(&self.status)
            || self.errors.iter().any(|e| matches(&e.reason))
            || self.details.iter().any(|d| matches(&d.reason))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OAuthCredentials;
    use crate::error::ErrorCode;
    use chrono::{TimeZone, Utc};
    use gcal_core::TimeWindow;
    use wiremock::matchers::{body_partial_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> CalendarClient {
        let config = GoogleConfig::new(OAuthCredentials::new(
            "test.apps.googleusercontent.com",
            "secret",
        ))
        .with_api_base(server.uri());
        CalendarClient::new(&config).unwrap()
    }

    fn window() -> TimeWindow {
        TimeWindow::days_from(Utc.with_ymd_and_hms(2024, 3, 15, 0, 0, 0).unwrap(), 7)
    }

    fn event_json(id: &str) -> serde_json::Value {
        serde_json::json!({
            "id": id,
            "summary": format!("Event {}", id),
            "start": {"dateTime": "2024-03-15T10:00:00Z"},
            "end": {"dateTime": "2024-03-15T11:00:00Z"}
        })
    }

    #[tokio::test]
    async fn list_calendars_follows_pages() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/users/me/calendarList"))
            .and(query_param("pageToken", "p2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "items": [{"id": "team@example.com", "summary": "Team", "hidden": true}]
            })))
            .with_priority(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/users/me/calendarList"))
            .and(query_param("showHidden", "true"))
            .and(header("authorization", "Bearer tok"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "items": [{"id": "me@example.com", "summary": "Me", "primary": true}],
                "nextPageToken": "p2"
            })))
            .mount(&server)
            .await;

        let calendars = client_for(&server)
            .list_calendars("tok", true)
            .await
            .unwrap();
        let ids: Vec<&str> = calendars.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["me@example.com", "team@example.com"]);
        assert!(calendars[0].primary);
        assert!(calendars[1].hidden);
    }

    #[tokio::test]
    async fn list_events_sends_query_parameters() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/calendars/work%40example.com/events"))
            .and(query_param("singleEvents", "true"))
            .and(query_param("orderBy", "startTime"))
            .and(query_param("maxResults", "5"))
            .and(query_param("q", "standup"))
            .and(query_param("timeMin", "2024-03-15T00:00:00+00:00"))
            .and(query_param("timeMax", "2024-03-22T00:00:00+00:00"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "items": [event_json("a"), event_json("b")]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let query = EventQuery::new("work@example.com", window(), 5)
            .with_query(Some("standup".to_string()));
        let events = client_for(&server).list_events("tok", &query).await.unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].summary, "Event a");
    }

    #[tokio::test]
    async fn list_events_stops_at_max_results() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/calendars/primary/events"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "items": [event_json("a"), event_json("b"), event_json("c")],
                "nextPageToken": "more"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let query = EventQuery::new("primary", window(), 2);
        let events = client_for(&server).list_events("tok", &query).await.unwrap();
        assert_eq!(events.len(), 2);
    }

    #[tokio::test]
    async fn get_event_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/calendars/primary/events/missing"))
            .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({
                "error": {"code": 404, "message": "Not Found", "errors": [{"reason": "notFound"}]}
            })))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .get_event("tok", "primary", "missing")
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::NotFound);
        assert_eq!(err.message(), "Not Found");
    }

    #[tokio::test]
    async fn insert_event_posts_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/calendars/primary/events"))
            .and(body_partial_json(serde_json::json!({
                "summary": "Review",
                "start": {"dateTime": "2024-03-15T10:00:00+00:00"}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(event_json("new1")))
            .expect(1)
            .mount(&server)
            .await;

        let start = Utc.with_ymd_and_hms(2024, 3, 15, 10, 0, 0).unwrap();
        let event = NewEvent::timed("Review", start, start + chrono::Duration::hours(1));
        let created = client_for(&server)
            .insert_event("tok", "primary", &event)
            .await
            .unwrap();
        assert_eq!(created.id, "new1");
    }

    #[test]
    fn scope_errors_are_detected() {
        let legacy = r#"{"error": {"code": 403, "message": "Insufficient Permission",
            "errors": [{"reason": "insufficientPermissions"}]}}"#;
        assert_eq!(
            error_from_response(StatusCode::FORBIDDEN, legacy).code(),
            ErrorCode::InsufficientScope
        );

        let modern = r#"{"error": {"code": 403, "message": "Request had insufficient authentication scopes.",
            "status": "PERMISSION_DENIED",
            "details": [{"@type": "type.googleapis.com/google.rpc.ErrorInfo", "reason": "ACCESS_TOKEN_SCOPE_INSUFFICIENT"}]}}"#;
        assert_eq!(
            error_from_response(StatusCode::FORBIDDEN, modern).code(),
            ErrorCode::InsufficientScope
        );

        let message_only = r#"{"error": {"message": "Request had insufficient authentication scopes."}}"#;
        assert!(error_from_response(StatusCode::FORBIDDEN, message_only).is_scope_error());
    }

    #[test]
    fn other_statuses_map_to_codes() {
        let denied = r#"{"error": {"message": "Forbidden", "errors": [{"reason": "forbidden"}]}}"#;
        assert_eq!(
            error_from_response(StatusCode::FORBIDDEN, denied).code(),
            ErrorCode::AuthorizationFailed
        );

        let quota = r#"{"error": {"message": "Rate Limit Exceeded", "errors": [{"reason": "rateLimitExceeded"}]}}"#;
        assert_eq!(
            error_from_response(StatusCode::FORBIDDEN, quota).code(),
            ErrorCode::RateLimited
        );

        assert_eq!(
            error_from_response(StatusCode::UNAUTHORIZED, "").code(),
            ErrorCode::AuthenticationFailed
        );
        assert_eq!(
            error_from_response(StatusCode::TOO_MANY_REQUESTS, "").code(),
            ErrorCode::RateLimited
        );
        assert_eq!(
            error_from_response(StatusCode::BAD_REQUEST, "bad").message(),
            "bad"
        );
        assert_eq!(
            error_from_response(StatusCode::BAD_GATEWAY, "").code(),
            ErrorCode::ServerError
        );
    }
}
