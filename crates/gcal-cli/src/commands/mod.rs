//! Command implementations.
//!
//! Each submodule handles one top-level command. Commands write through the
//! [`Services`](crate::container::Services) console so tests can capture
//! their output.

pub mod auth;
pub mod calendars;
pub mod config;
pub mod events;
pub mod init;

use crate::cli::{AuthAction, CalendarsAction, Command, ConfigAction, EventsAction};
use crate::container::Services;
use crate::error::CliResult;

/// Runs one parsed command.
pub async fn run(services: &mut Services, command: Command) -> CliResult<()> {
    match command {
        Command::Init { credentials, force } => init::run(services, credentials, force).await,
        Command::Calendars { action } => match action {
            CalendarsAction::List { show_hidden } => calendars::list(services, show_hidden).await,
        },
        Command::Events { action } => match action {
            EventsAction::List(args) => events::list(services, args).await,
            EventsAction::Create(args) => events::create(services, args).await,
            EventsAction::Show { event_id, calendar } => {
                events::show(services, &event_id, calendar).await
            }
        },
        Command::Config { action } => match action {
            ConfigAction::Get { key } => config::get(services, &key),
            ConfigAction::Set { key, value } => config::set(services, &key, &value),
            ConfigAction::List => config::list(services),
            ConfigAction::Unset { key } => config::unset(services, &key),
            ConfigAction::Reset => config::reset(services),
        },
        Command::Auth { action } => match action {
            AuthAction::Status => auth::status(services),
            AuthAction::Logout => auth::logout(services),
        },
    }
}
