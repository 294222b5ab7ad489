//! Command-line interface definition.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use gcal_core::OutputFormat;

/// gcal - Google Calendar from the terminal
#[derive(Debug, Parser)]
#[command(name = "gcal")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to the configuration file
    #[arg(long, global = true, env = "GCAL_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable debug output
    #[arg(long, short = 'v', global = true)]
    pub debug: bool,

    /// Output format: table, json or pretty-json (default from config)
    #[arg(long, global = true, value_parser = parse_format)]
    pub format: Option<OutputFormat>,

    /// Comma-separated fields to show (e.g. id,summary,start)
    #[arg(long, global = true, value_delimiter = ',')]
    pub fields: Option<Vec<String>>,

    /// Print only identifiers and suppress informational messages
    #[arg(long, short, global = true)]
    pub quiet: bool,

    /// Answer yes to confirmation prompts
    #[arg(long, short, global = true)]
    pub yes: bool,

    #[command(subcommand)]
    pub command: Command,
}

fn parse_format(s: &str) -> Result<OutputFormat, String> {
    s.parse().map_err(|e: gcal_core::FormatError| e.to_string())
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Install OAuth credentials and sign in to Google
    Init {
        /// Credentials JSON downloaded from Google Cloud Console
        #[arg(long)]
        credentials: Option<PathBuf>,

        /// Sign in again even if a valid token exists
        #[arg(long, short)]
        force: bool,
    },

    /// Calendar commands
    Calendars {
        #[command(subcommand)]
        action: CalendarsAction,
    },

    /// Event commands
    Events {
        #[command(subcommand)]
        action: EventsAction,
    },

    /// Read and change settings
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Inspect or discard the stored token
    Auth {
        #[command(subcommand)]
        action: AuthAction,
    },
}

/// Calendar actions.
#[derive(Debug, Subcommand)]
pub enum CalendarsAction {
    /// List calendars in your calendar list
    List {
        /// Include calendars hidden in the Google Calendar UI
        #[arg(long)]
        show_hidden: bool,
    },
}

/// Event actions.
#[derive(Debug, Subcommand)]
pub enum EventsAction {
    /// List upcoming events
    List(ListEventsArgs),

    /// Create an event
    Create(CreateEventArgs),

    /// Show one event
    Show {
        /// Event ID
        event_id: String,

        /// Calendar ID (default from config)
        #[arg(long, short)]
        calendar: Option<String>,
    },
}

#[derive(Debug, Args)]
pub struct ListEventsArgs {
    /// Calendar ID (default from config)
    #[arg(long, short)]
    pub calendar: Option<String>,

    /// Number of days to look ahead (default from config)
    #[arg(long, short, value_parser = clap::value_parser!(i64).range(1..=365))]
    pub days: Option<i64>,

    /// Maximum number of events (default from config)
    #[arg(long = "max", short = 'n', value_parser = clap::value_parser!(u32).range(1..=2500))]
    pub max_results: Option<u32>,

    /// Start of the window: YYYY-MM-DD, today or tomorrow (default: now)
    #[arg(long)]
    pub from: Option<String>,

    /// Last day of the window: YYYY-MM-DD, today or tomorrow (inclusive)
    #[arg(long, conflicts_with = "days")]
    pub to: Option<String>,

    /// Free-text search
    #[arg(long)]
    pub query: Option<String>,
}

#[derive(Debug, Args)]
pub struct CreateEventArgs {
    /// Calendar ID (default from config)
    #[arg(long, short)]
    pub calendar: Option<String>,

    /// Event title (prompted for when missing)
    #[arg(long, short)]
    pub title: Option<String>,

    /// Start: 'YYYY-MM-DD HH:MM', RFC 3339, 'today 14:00', or a date with --all-day
    #[arg(long, short)]
    pub start: Option<String>,

    /// End, in the same forms as --start
    #[arg(long, short, conflicts_with = "duration")]
    pub end: Option<String>,

    /// Length: 90, 45m, 1h, 1h30m (default from config)
    #[arg(long)]
    pub duration: Option<String>,

    /// Create an all-day event
    #[arg(long)]
    pub all_day: bool,

    #[arg(long)]
    pub description: Option<String>,

    #[arg(long)]
    pub location: Option<String>,

    /// Attendee email (repeatable)
    #[arg(long = "attendee", action = clap::ArgAction::Append)]
    pub attendees: Vec<String>,
}

/// Configuration actions.
#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    /// Show the effective value of a key
    Get { key: String },

    /// Set a key
    Set { key: String, value: String },

    /// List all keys with their values
    List,

    /// Remove a key, restoring its default
    Unset { key: String },

    /// Delete the configuration file
    Reset,
}

/// Authentication actions.
#[derive(Debug, Subcommand)]
pub enum AuthAction {
    /// Show whether a usable token is stored
    Status,

    /// Delete the stored token
    Logout,
}

/// Output options shared by all commands.
#[derive(Debug, Clone, Default)]
pub struct OutputOptions {
    pub format: Option<OutputFormat>,
    pub fields: Option<Vec<String>>,
    pub quiet: bool,
    pub yes: bool,
}

impl Cli {
    pub fn output_options(&self) -> OutputOptions {
        OutputOptions {
            format: self.format,
            fields: self.fields.clone(),
            quiet: self.quiet,
            yes: self.yes,
        }
    }
}
