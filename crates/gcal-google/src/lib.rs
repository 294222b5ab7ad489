//! Google OAuth2 and Calendar API v3 client.
//!
//! - [`GoogleAuth`] loads, refreshes and re-acquires tokens ([`TokenSource`])
//! - [`CalendarClient`] talks to the REST API with a given access token
//! - [`CalendarService`] combines the two and re-authenticates once when a
//!   call fails for lack of scope
//!
//! # Example
//!
//! ```ignore
//! let config = GoogleConfig::new(OAuthCredentials::from_file(path)?);
//! let auth = Arc::new(GoogleAuth::new(&config)?);
//! let service = CalendarService::new(CalendarClient::new(&config)?, auth);
//! let calendars = service.list_calendars(false).await?;
//! ```

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod model;
pub mod oauth;
pub mod service;
pub mod tokens;

pub use auth::{AuthStatus, BoxFuture, GoogleAuth, LoginOutcome, TokenSource, token_status};
pub use client::CalendarClient;
pub use config::{GoogleConfig, OAuthCredentials};
pub use error::{ErrorCode, GoogleError, GoogleResult};
pub use model::{Attendee, Calendar, Event, EventDateTime, EventQuery, NewEvent};
pub use oauth::{OAuthClient, PkceFlow};
pub use service::CalendarService;
pub use tokens::{TokenInfo, TokenStore};
