//! Calendar operations with one-shot re-authentication on scope errors.
//!
//! A token obtained with a narrower scope (for example from an older,
//! read-only login) makes write calls fail with 403. Each operation here
//! catches that once, discards the token, runs the consent flow again and
//! repeats the call with the new token.

use std::future::Future;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::auth::TokenSource;
use crate::client::CalendarClient;
use crate::error::GoogleResult;
use crate::model::{Calendar, Event, EventQuery, NewEvent};

pub struct CalendarService {
    client: CalendarClient,
    tokens: Arc<dyn TokenSource>,
}

impl CalendarService {
    pub fn new(client: CalendarClient, tokens: Arc<dyn TokenSource>) -> Self {
        Self { client, tokens }
    }

    pub async fn list_calendars(&self, show_hidden: bool) -> GoogleResult<Vec<Calendar>> {
        let client = &self.client;
        self.with_scope_retry(|token| async move {
            client.list_calendars(&token, show_hidden).await
        })
        .await
    }

    pub async fn list_events(&self, query: &EventQuery) -> GoogleResult<Vec<Event>> {
        let client = &self.client;
        self.with_scope_retry(|token| async move { client.list_events(&token, query).await })
            .await
    }

    pub async fn get_event(&self, calendar_id: &str, event_id: &str) -> GoogleResult<Event> {
        let client = &self.client;
        self.with_scope_retry(|token| async move {
            client.get_event(&token, calendar_id, event_id).await
        })
        .await
    }

    pub async fn insert_event(&self, calendar_id: &str, event: &NewEvent) -> GoogleResult<Event> {
        let client = &self.client;
        self.with_scope_retry(|token| async move {
            client.insert_event(&token, calendar_id, event).await
        })
        .await
    }

    /// Runs `op` with an access token, re-authenticating at most once.
    ///
    /// A scope error from either the token source or the call itself uses up
    /// the single retry. Any other error, or a second scope error, is
    /// returned unchanged.
    async fn with_scope_retry<T, F, Fut>(&self, op: F) -> GoogleResult<T>
    where
        F: Fn(String) -> Fut,
        Fut: Future<Output = GoogleResult<T>>,
    {
        let mut retried = false;

        let mut token = match self.tokens.access_token().await {
            Err(e) if e.is_scope_error() => {
                warn!("stored token lacks required scope: {}", e.message());
                retried = true;
                self.tokens.reauthenticate().await?
            }
            result => result?,
        };

        loop {
            match op(token).await {
                Err(e) if e.is_scope_error() && !retried => {
                    warn!("insufficient scope, re-authenticating: {}", e.message());
                    retried = true;
                    token = self.tokens.reauthenticate().await?;
                    debug!("retrying request with new token");
                }
                result => return result,
            }
        }
    }
}
